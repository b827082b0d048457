//! Data-access core of the community-garden single-page app.
//!
//! [`core`] holds the fetch gateway, session, resource cache and CMS
//! normalization; [`stores`] builds one store per resource on top of it.

pub mod app;
pub mod config;
pub mod core;
pub mod models;
pub mod stores;
pub mod utils;

pub use app::{App, AppContext, use_app};
