//! Per-resource stores.
//!
//! Each store owns its caches, talks to the CMS through a shared
//! [`FetchGateway`](crate::core::FetchGateway) and reports failures to the
//! [`AlertStore`](crate::core::AlertStore).

mod auth;
mod blogs;
mod collection;
mod events;
mod garden_tasks;
mod gardens;
mod instructions;
mod location_tracking;
mod media;
mod messages;
mod projects;
mod recurring_templates;
mod sms_campaigns;
mod user_garden_interests;
mod vehicles;
mod week_scheduler;

pub use auth::AuthStore;
pub use blogs::BlogStore;
pub use events::{EventScope, EventStore};
pub use garden_tasks::GardenTaskStore;
pub use gardens::GardensStore;
pub use instructions::InstructionStore;
pub use location_tracking::LocationTrackingStore;
pub use media::MediaStore;
pub use messages::MessagesStore;
pub use projects::ProjectsStore;
pub use recurring_templates::{PreviewItem, RecurringTemplateStore};
pub use sms_campaigns::SmsCampaignStore;
pub use user_garden_interests::UserGardenInterestStore;
pub use vehicles::VehiclesStore;
pub use week_scheduler::{DayGroup, WeekSchedule, WeekSchedulerStore};
