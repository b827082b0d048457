//! Browser-only checks, run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use gardenlink::AppContext;
use gardenlink::core::{BrowserStorage, KeyValueStorage};
use gardenlink::utils::init_logging;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn local_storage_round_trip() {
    let storage = BrowserStorage;
    storage.set("gardenlink_test", "sprout").unwrap();
    assert_eq!(storage.get("gardenlink_test").as_deref(), Some("sprout"));
    storage.remove("gardenlink_test").unwrap();
    assert_eq!(storage.get("gardenlink_test"), None);
}

#[wasm_bindgen_test]
fn browser_context_starts_signed_out() {
    init_logging();
    // A second install only warns.
    init_logging();

    let ctx = AppContext::browser().unwrap();
    assert!(!ctx.auth.is_logged_in());
    assert!(ctx.config.base_url().has_host());
}
