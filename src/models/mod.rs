//! Data models and types for the application.
//!
//! Contains domain types for:
//! - [`Record`], [`RecordId`], [`Fields`] - Flat CMS records and write payloads
//! - [`Pagination`], [`Loaded`] - Paged collection metadata
//! - [`User`] - Authenticated user
//! - [`UploadedFile`] - Upload endpoint descriptors

mod pagination;
mod record;
mod upload;
mod user;

pub use pagination::{Loaded, Pagination};
pub use record::{
    Fields, Record, RecordId, id_from_value, reference_id, remove_by_id, replace_by_id,
};
pub use upload::UploadedFile;
pub use user::User;
