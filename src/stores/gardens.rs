//! Gardens: the top-level entity every other store is scoped to.

use std::rc::Rc;

use crate::core::alert::AlertStore;
use crate::core::cache::{CacheStatus, FetchMode, ResourceCache};
use crate::core::gateway::FetchGateway;
use crate::models::{Loaded, Record};
use crate::stores::collection::Collection;
use crate::utils::Query;

pub struct GardensStore {
    api: Collection,
    all: ResourceCache<(), Vec<Record>>,
    by_slug: ResourceCache<String, Option<Record>>,
}

impl GardensStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "gardens");
        Self {
            all: api.cache("gardens"),
            by_slug: api.cache("garden"),
            api,
        }
    }

    pub async fn get_all(&self) -> Vec<Record> {
        let api = self.api.clone();
        let url = self.api.url("");
        self.all
            .fetch((), FetchMode::Cached, move || async move { api.list(&url).await })
            .await
            .unwrap_or_default()
    }

    /// The garden with `slug`, or `None` if there is none (or the load failed).
    pub async fn get_slug(&self, slug: &str) -> Option<Record> {
        let api = self.api.clone();
        let url = Query::new()
            .filter_eq(&["slug"], slug)
            .apply(&self.api.url(""));
        self.by_slug
            .fetch(slug.to_string(), FetchMode::Cached, move || async move {
                api.list(&url)
                    .await
                    .map(|list| Loaded::unpaged(list.data.into_iter().next()))
            })
            .await
            .ok()
            .flatten()
    }

    pub fn status(&self) -> CacheStatus {
        self.all.status(&())
    }

    pub fn clear(&self) {
        self.all.clear();
        self.by_slug.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::Method;
    use crate::stores::collection::testing::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_slug_takes_first_match() {
        let h = Harness::new();
        let gardens = GardensStore::new(h.gateway.clone(), h.alerts.clone());
        let url = "https://cms.test/api/gardens?filters[slug][$eq]=oak-park";
        h.transport.respond_json(
            Method::Get,
            url,
            200,
            json!({"data": [{"id": 2, "attributes": {"slug": "oak-park", "title": "Oak Park"}}]}),
        );

        let garden = gardens.get_slug("oak-park").await.unwrap();
        assert_eq!(garden.id, 2);
        assert_eq!(garden.str("title"), Some("Oak Park"));

        gardens.get_slug("oak-park").await;
        assert_eq!(h.transport.calls(Method::Get, url), 1);
    }

    #[tokio::test]
    async fn test_unknown_slug_is_none() {
        let h = Harness::new();
        let gardens = GardensStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport.respond_json(
            Method::Get,
            "https://cms.test/api/gardens?filters[slug][$eq]=nowhere",
            200,
            json!({"data": []}),
        );
        assert_eq!(gardens.get_slug("nowhere").await, None);
        assert_eq!(h.alerts.error_count(), 0);
    }

    #[tokio::test]
    async fn test_get_all_is_cached() {
        let h = Harness::new();
        let gardens = GardensStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport.respond_json(
            Method::Get,
            "https://cms.test/api/gardens",
            200,
            json!({"data": [{"id": 1, "attributes": {}}, {"id": 2, "attributes": {}}]}),
        );

        assert_eq!(gardens.get_all().await.len(), 2);
        assert_eq!(gardens.get_all().await.len(), 2);
        assert_eq!(h.transport.total_calls(), 1);
        assert_eq!(gardens.status(), CacheStatus::Ready);
    }
}
