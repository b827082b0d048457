//! Utility modules for browser, logging and presentation helpers.
//!
//! Provides:
//! - [`Query`] - Strapi query-string builder
//! - [`garden_color`], [`volunteer_color`] - Deterministic badge colours
//! - [`haversine_km`] - Great-circle distance
//! - [`init_logging`] - `tracing` subscriber writing to the browser console

pub mod color;
mod console;
pub mod dom;
mod geo;
mod query;

pub use color::{color_for_identifier, garden_color, volunteer_color};
pub use console::{ConsoleWriter, init_logging};
pub use geo::haversine_km;
pub use query::Query;
