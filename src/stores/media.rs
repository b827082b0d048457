//! Media library per garden, with local search.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::FetchGateway;
use crate::models::{Record, RecordId};
use crate::stores::collection::Collection;

pub struct MediaStore {
    api: Collection,
    media: ResourceCache<RecordId, Vec<Record>>,
    selected_garden: RefCell<Option<RecordId>>,
    search_term: RefCell<String>,
}

impl MediaStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "volunteer-days");
        Self {
            media: api.cache("media"),
            selected_garden: RefCell::new(None),
            search_term: RefCell::new(String::new()),
            api,
        }
    }

    /// Load a garden's media (cached per garden) and select that garden.
    ///
    /// Failures are reported and returned: the media picker keeps its dialog
    /// open on error.
    pub async fn fetch_garden_media(&self, garden_id: RecordId) -> Result<Vec<Record>, ApiError> {
        *self.selected_garden.borrow_mut() = Some(garden_id);
        let api = self.api.clone();
        let url = self.api.url(&format!("/garden/{}/media", garden_id));
        self.media
            .fetch(garden_id, FetchMode::Cached, move || async move { api.list(&url).await })
            .await
    }

    /// Filter the selected garden's media by name, alt text or caption.
    ///
    /// A blank term returns everything.
    pub fn search_media(&self, term: &str) -> Vec<Record> {
        *self.search_term.borrow_mut() = term.to_string();
        let selected = *self.selected_garden.borrow();
        let source = selected
            .and_then(|id| self.media.data(&id))
            .unwrap_or_default();

        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return source;
        }
        source
            .into_iter()
            .filter(|media| matches_term(media, &term))
            .collect()
    }

    pub fn media_by_garden(&self, garden_id: RecordId) -> Vec<Record> {
        self.media.data(&garden_id).unwrap_or_default()
    }

    pub fn search_term(&self) -> String {
        self.search_term.borrow().clone()
    }

    pub fn clear_cache(&self) {
        self.media.clear();
        self.selected_garden.borrow_mut().take();
        self.search_term.borrow_mut().clear();
    }
}

fn first_text<'a>(media: &'a Record, fields: &[&str]) -> &'a str {
    fields
        .iter()
        .find_map(|field| media.str(field).filter(|s| !s.is_empty()))
        .unwrap_or("")
}

fn matches_term(media: &Record, term: &str) -> bool {
    [
        first_text(media, &["name", "title", "filename"]),
        first_text(media, &["alternativeText", "alt"]),
        first_text(media, &["caption"]),
    ]
    .iter()
    .any(|text| text.to_lowercase().contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::Method;
    use crate::stores::collection::testing::*;
    use serde_json::json;

    const MEDIA: &str = "https://cms.test/api/volunteer-days/garden/4/media";

    fn library() -> serde_json::Value {
        json!([
            {"id": 1, "name": "tomato-bed.jpg", "alternativeText": "", "caption": "Summer harvest"},
            {"id": 2, "name": "compost.png", "alternativeText": "Compost bins", "caption": null},
            {"id": 3, "title": "Volunteers", "alt": "Group photo"}
        ])
    }

    #[tokio::test]
    async fn test_search_by_name_alt_and_caption() {
        let h = Harness::new();
        let media = MediaStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport.respond_json(Method::Get, MEDIA, 200, library());

        assert_eq!(media.fetch_garden_media(4).await.unwrap().len(), 3);

        let ids = |found: Vec<Record>| found.iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(media.search_media("HARVEST")), vec![1]);
        assert_eq!(ids(media.search_media("bins")), vec![2]);
        assert_eq!(ids(media.search_media("group")), vec![3]);
        assert_eq!(ids(media.search_media("  ")), vec![1, 2, 3]);
        assert!(media.search_media("orchard").is_empty());
    }

    #[tokio::test]
    async fn test_media_is_cached_until_cleared() {
        let h = Harness::new();
        let media = MediaStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport
            .respond_json(Method::Get, MEDIA, 200, json!({"data": [{"id": 1, "attributes": {"name": "a"}}]}));

        media.fetch_garden_media(4).await.unwrap();
        media.fetch_garden_media(4).await.unwrap();
        assert_eq!(h.transport.total_calls(), 1);
        assert_eq!(media.media_by_garden(4).len(), 1);

        media.clear_cache();
        assert!(media.media_by_garden(4).is_empty());
        assert!(media.search_media("a").is_empty());
        media.fetch_garden_media(4).await.unwrap();
        assert_eq!(h.transport.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_returned() {
        let h = Harness::new();
        let media = MediaStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport.respond_json(Method::Get, MEDIA, 403, json!({"message": "Forbidden"}));

        let err = media.fetch_garden_media(4).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(h.alerts.error_count(), 1);
    }
}
