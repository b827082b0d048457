//! DOM and Web API utility functions.
//!
//! Provides safe, consistent access to browser APIs. Missing APIs (no window,
//! storage disabled) become `None` or a no-op.

use web_sys::{Storage, Window};

/// Get the browser window object.
#[inline]
pub fn window() -> Option<Window> {
    web_sys::window()
}

/// Get localStorage.
#[inline]
pub fn local_storage() -> Option<Storage> {
    window()?.local_storage().ok()?
}

/// Set the URL hash (adds to browser history).
///
/// The hash should include the '#' prefix.
pub fn set_hash(hash: &str) {
    if let Some(window) = window() {
        let _ = window.location().set_hash(hash);
    }
}

/// Leave the app for another URL.
pub fn redirect(url: &str) {
    if let Some(window) = window() {
        let _ = window.location().set_href(url);
    }
}
