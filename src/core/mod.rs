//! Core data-access layer.
//!
//! This module provides:
//! - [`FetchGateway`] over a [`Transport`], the single HTTP chokepoint
//! - [`Session`] persistence and termination
//! - [`ResourceCache`] per-key caching with in-flight de-duplication
//! - [`normalize`] and [`PayloadShape`] between the CMS envelope and flat records
//! - [`AlertStore`] for user-facing notifications

pub mod alert;
pub mod cache;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod payload;
pub mod session;
pub mod task;
pub mod transport;

pub use alert::{Alert, AlertKind, AlertStore};
pub use cache::{CachePayload, CacheStatus, FetchMode, ResourceCache};
pub use error::{ApiError, StorageError};
pub use gateway::{Body, FetchGateway};
pub use normalize::{normalize, record_from_response, records_from_response};
pub use payload::PayloadShape;
pub use session::{
    BrowserStorage, HashNavigator, KeyValueStorage, MemoryStorage, Navigator, RecordingNavigator,
    Session,
};
pub use task::{BrowserSpawner, Spawner};
pub use transport::{BrowserTransport, Method, MultipartForm, Transport};
