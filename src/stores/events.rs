//! Volunteer-day events, paged per garden.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::config::pagination::EVENTS_PAGE_SIZE;
use crate::core::alert::AlertStore;
use crate::core::cache::{CacheStatus, FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::FetchGateway;
use crate::core::payload::PayloadShape;
use crate::models::{Fields, Loaded, Pagination, Record, RecordId, replace_by_id};
use crate::stores::collection::Collection;
use crate::utils::Query;

/// What an event list is scoped to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventScope {
    /// Events of one garden, by slug.
    Garden(String),
    /// Events the logged-in user signed up for.
    User,
}

const SHAPE: PayloadShape = PayloadShape::open();

pub struct EventStore {
    api: Collection,
    lists: ResourceCache<EventScope, Vec<Record>>,
    details: ResourceCache<RecordId, Record>,
    current_garden: RefCell<Option<String>>,
}

impl EventStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "volunteer-days");
        Self {
            lists: api.cache("events"),
            details: api.cache("event"),
            current_garden: RefCell::new(None),
            api,
        }
    }

    /// Events of a garden. `page` and `page_size` only apply when the garden
    /// is not cached yet; a cached list is returned as is.
    pub async fn get_by_garden(&self, slug: &str, page: u32, page_size: u32) -> Vec<Record> {
        *self.current_garden.borrow_mut() = Some(slug.to_string());
        self.fetch_garden(slug, FetchMode::Cached, page, page_size)
            .await
            .unwrap_or_default()
    }

    /// First page of a garden's events at the default page size.
    pub async fn get_first_page(&self, slug: &str) -> Vec<Record> {
        self.get_by_garden(slug, 1, EVENTS_PAGE_SIZE).await
    }

    /// Append the next page of the current garden and return it.
    ///
    /// Returns an empty list without a request when nothing is selected, a
    /// load is running or the last page is already loaded.
    pub async fn load_more_events(&self) -> Vec<Record> {
        let Some(slug) = self.current_garden.borrow().clone() else {
            return Vec::new();
        };
        let scope = EventScope::Garden(slug.clone());
        if self.lists.is_loading(&scope) {
            return Vec::new();
        }
        let Some(next) = self.lists.pagination(&scope).and_then(|p| p.next_page().map(|n| (n, p.page_size))) else {
            debug!(garden = %slug, "no more events to load");
            return Vec::new();
        };
        self.fetch_garden(&slug, FetchMode::Append, next.0, next.1)
            .await
            .unwrap_or_default()
    }

    fn fetch_garden(
        &self,
        slug: &str,
        mode: FetchMode,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<Record>, ApiError>> + 'static {
        let api = self.api.clone();
        let url = Query::new()
            .page(page)
            .page_size(page_size)
            .apply(&self.api.url_segments(&["garden", slug]));
        self.lists.fetch(EventScope::Garden(slug.to_string()), mode, move || async move {
            api.list(&url).await
        })
    }

    pub async fn find_by_id(&self, id: RecordId) -> Option<Record> {
        let api = self.api.clone();
        let url = Query::new().populate_each("garden").apply(&self.api.url(&format!("/{}", id)));
        self.details
            .fetch(id, FetchMode::Refresh, move || async move {
                api.one(&url).await.map(Loaded::unpaged)
            })
            .await
            .ok()
    }

    pub async fn get_user_events(&self) -> Vec<Record> {
        let api = self.api.clone();
        let url = self.api.url("/user");
        self.lists
            .fetch(EventScope::User, FetchMode::Refresh, move || async move {
                api.list(&url).await
            })
            .await
            .unwrap_or_default()
    }

    /// Create an event and put it at the head of its garden's list.
    pub async fn register(&self, data: Fields) -> Result<Record, ApiError> {
        let url = Query::new().populate_all().apply(&self.api.url(""));
        let record = self.api.create(&url, data, &SHAPE).await?;

        let slug = record
            .get("garden")
            .and_then(|g| g.get("slug"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.current_garden.borrow().clone());
        if let Some(slug) = slug {
            self.lists
                .update(&EventScope::Garden(slug), |list| list.insert(0, record.clone()));
        }
        self.details.insert(record.id, record.clone());
        Ok(record)
    }

    pub async fn update(&self, id: RecordId, data: Fields) -> Result<Record, ApiError> {
        let url = Query::new()
            .populate_all()
            .apply(&self.api.url(&format!("/{}", id)));
        let record = self.api.update(&url, data, &SHAPE).await?;
        self.lists.update_all(|list| {
            replace_by_id(list, &record);
        });
        self.details.insert(record.id, record.clone());
        Ok(record)
    }

    /// Ask the server to send a test SMS for an event.
    pub async fn test_sms(&self, id: RecordId) -> Result<Value, ApiError> {
        self.api.get(&self.api.url(&format!("/sms/{}", id))).await
    }

    /// Send the event's SMS to its volunteers.
    pub async fn send_sms(&self, id: RecordId) -> Result<Value, ApiError> {
        self.api.post(&self.api.url(&format!("/sms/{}", id)), None).await
    }

    pub fn events(&self, slug: &str) -> Vec<Record> {
        self.lists
            .data(&EventScope::Garden(slug.to_string()))
            .unwrap_or_default()
    }

    pub fn pagination(&self, slug: &str) -> Option<Pagination> {
        self.lists.pagination(&EventScope::Garden(slug.to_string()))
    }

    pub fn status(&self, slug: &str) -> CacheStatus {
        self.lists.status(&EventScope::Garden(slug.to_string()))
    }

    pub fn current_garden(&self) -> Option<String> {
        self.current_garden.borrow().clone()
    }

    pub fn clear(&self) {
        self.lists.clear();
        self.details.clear();
        self.current_garden.borrow_mut().take();
    }
}
