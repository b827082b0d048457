//! Root application module.
//!
//! Contains the App component and the [`AppContext`] wiring every store to one
//! session, gateway and alert surface.

use std::rc::Rc;

use leptos::prelude::*;
use tracing::{error, info};
use wasm_bindgen_futures::spawn_local;

use crate::config::{APP_NAME, APP_VERSION, ApiConfig};
use crate::core::{
    AlertStore, BrowserSpawner, BrowserStorage, BrowserTransport, FetchGateway, HashNavigator,
    KeyValueStorage, Navigator, Session, Spawner, Transport,
};
use crate::stores::{
    AuthStore, BlogStore, EventStore, GardenTaskStore, GardensStore, InstructionStore,
    LocationTrackingStore, MediaStore, MessagesStore, ProjectsStore, RecurringTemplateStore,
    SmsCampaignStore, UserGardenInterestStore, VehiclesStore, WeekSchedulerStore,
};

// ============================================================================
// AppContext
// ============================================================================

/// Application-wide services.
///
/// Built once at start-up and provided at the root of the component tree;
/// read it with [`use_app`]. Stores never reach for globals: the session is
/// injected into the gateway and the gateway and alerts into each store.
#[derive(Clone)]
pub struct AppContext {
    pub config: ApiConfig,
    pub session: Rc<Session>,
    pub gateway: Rc<FetchGateway>,
    pub alerts: Rc<AlertStore>,

    pub auth: Rc<AuthStore>,
    pub gardens: Rc<GardensStore>,
    pub events: Rc<EventStore>,
    pub garden_tasks: Rc<GardenTaskStore>,
    pub media: Rc<MediaStore>,
    pub projects: Rc<ProjectsStore>,
    pub recurring_templates: Rc<RecurringTemplateStore>,
    pub week_scheduler: Rc<WeekSchedulerStore>,
    pub sms_campaigns: Rc<SmsCampaignStore>,
    pub blogs: Rc<BlogStore>,
    pub location_tracking: Rc<LocationTrackingStore>,
    pub messages: Rc<MessagesStore>,
    pub instructions: Rc<InstructionStore>,
    pub garden_interests: Rc<UserGardenInterestStore>,
    pub vehicles: Rc<VehiclesStore>,
}

impl AppContext {
    /// Wire the stores over the given platform services.
    pub fn new(
        config: ApiConfig,
        transport: Rc<dyn Transport>,
        spawner: Rc<dyn Spawner>,
        storage: Rc<dyn KeyValueStorage>,
        navigator: Rc<dyn Navigator>,
    ) -> Self {
        let session = Rc::new(Session::restore(storage, navigator));
        let gateway = Rc::new(FetchGateway::new(
            config.clone(),
            Rc::clone(&session),
            transport,
            spawner,
        ));
        let alerts = Rc::new(AlertStore::new());
        let g = || Rc::clone(&gateway);
        let a = || Rc::clone(&alerts);

        Self {
            auth: Rc::new(AuthStore::new(g(), a())),
            gardens: Rc::new(GardensStore::new(g(), a())),
            events: Rc::new(EventStore::new(g(), a())),
            garden_tasks: Rc::new(GardenTaskStore::new(g(), a())),
            media: Rc::new(MediaStore::new(g(), a())),
            projects: Rc::new(ProjectsStore::new(g(), a())),
            recurring_templates: Rc::new(RecurringTemplateStore::new(g(), a())),
            week_scheduler: Rc::new(WeekSchedulerStore::new(g(), a())),
            sms_campaigns: Rc::new(SmsCampaignStore::new(g(), a())),
            blogs: Rc::new(BlogStore::new(g(), a())),
            location_tracking: Rc::new(LocationTrackingStore::new(g(), a())),
            messages: Rc::new(MessagesStore::new(g(), a())),
            instructions: Rc::new(InstructionStore::new(g(), a())),
            garden_interests: Rc::new(UserGardenInterestStore::new(g(), a())),
            vehicles: Rc::new(VehiclesStore::new(g(), a())),
            config,
            session,
            gateway,
            alerts,
        }
    }

    /// Context backed by `fetch`, `localStorage` and the location hash.
    pub fn browser() -> Result<Self, url::ParseError> {
        Ok(Self::new(
            ApiConfig::from_env()?,
            Rc::new(BrowserTransport),
            Rc::new(BrowserSpawner),
            Rc::new(BrowserStorage),
            Rc::new(HashNavigator),
        ))
    }
}

/// The [`AppContext`] provided by [`App`].
pub fn use_app() -> Option<AppContext> {
    use_context::<StoredValue<AppContext, LocalStorage>>().map(|stored| stored.get_value())
}

/// Root application component.
///
/// Provides the [`AppContext`] and starts loading the garden list, which
/// every page needs.
#[component]
pub fn App() -> impl IntoView {
    let ctx = match AppContext::browser() {
        Ok(ctx) => ctx,
        Err(err) => {
            error!(error = %err, "invalid API base URL");
            return view! {
                <main id=APP_NAME>
                    <p class="alert alert-error">"The app is misconfigured: invalid API URL."</p>
                </main>
            }
            .into_any();
        }
    };
    info!(version = APP_VERSION, api = %ctx.config.base_url(), "starting");

    let gardens = Rc::clone(&ctx.gardens);
    spawn_local(async move {
        let loaded = gardens.get_all().await;
        info!(count = loaded.len(), "gardens loaded");
    });

    let signed_in = ctx.auth.user().map(|user| user.display_name());
    provide_context(StoredValue::new_local(ctx));

    view! {
        <main id=APP_NAME>
            {signed_in.map(|name| view! { <p class="session">"Signed in as " {name}</p> })}
        </main>
    }
    .into_any()
}
