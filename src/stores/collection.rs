//! Shared plumbing for the per-resource stores.
//!
//! A [`Collection`] is one CMS collection endpoint plus the gateway and alert
//! surface. Every call made through it reports failures to alerts exactly
//! once, so stores only decide whether to swallow or return the error.

use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use serde_json::{Value, json};
use tracing::warn;
use url::Url;

use crate::core::alert::AlertStore;
use crate::core::cache::{CachePayload, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::{Body, FetchGateway};
use crate::core::normalize::{record_from_response, records_from_response};
use crate::core::payload::PayloadShape;
use crate::models::{Fields, Loaded, Record};

#[derive(Clone)]
pub struct Collection {
    gateway: Rc<FetchGateway>,
    alerts: Rc<AlertStore>,
    base: Rc<str>,
    name: &'static str,
}

impl Collection {
    /// `name` is the collection path under `/api`, e.g. `volunteer-days`.
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>, name: &'static str) -> Self {
        let base = gateway.config().collection(name).into();
        Self {
            gateway,
            alerts,
            base,
            name,
        }
    }

    /// Absolute URL of `path` under the collection (`""` for the collection itself).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Absolute URL of `segments` under the collection, each percent-encoded
    /// as one path segment.
    pub fn url_segments(&self, segments: &[&str]) -> String {
        let Ok(mut url) = Url::parse(&self.base) else {
            return format!("{}/{}", self.base, segments.join("/"));
        };
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    /// A cache whose requests run on the gateway's spawner.
    pub fn cache<K, T>(&self, name: &'static str) -> ResourceCache<K, T>
    where
        K: Eq + Hash + Clone + Debug + 'static,
        T: CachePayload,
    {
        ResourceCache::new(name, self.gateway.spawner())
    }

    pub fn gateway(&self) -> &FetchGateway {
        &self.gateway
    }

    pub fn alerts(&self) -> &AlertStore {
        &self.alerts
    }

    /// Report a failure to alerts and pass the result through.
    pub fn report<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(err) = &result {
            warn!(collection = self.name, error = %err, "store operation failed");
            self.alerts.error(err);
        }
        result
    }

    pub async fn get(&self, url: &str) -> Result<Value, ApiError> {
        self.report(self.gateway.get(url).await)
    }

    pub async fn post(&self, url: &str, body: Option<Body>) -> Result<Value, ApiError> {
        self.report(self.gateway.post(url, body).await)
    }

    /// GET a collection response as records plus pagination.
    pub async fn list(&self, url: &str) -> Result<Loaded<Vec<Record>>, ApiError> {
        let result = match self.gateway.get(url).await {
            Ok(value) => records_from_response(value),
            Err(err) => Err(err),
        };
        self.report(result)
    }

    /// GET a single record.
    pub async fn one(&self, url: &str) -> Result<Record, ApiError> {
        let result = match self.gateway.get(url).await {
            Ok(value) => record_from_response(value),
            Err(err) => Err(err),
        };
        self.report(result)
    }

    /// POST `{data: shaped}` and decode the created record.
    pub async fn create(&self, url: &str, data: Fields, shape: &PayloadShape) -> Result<Record, ApiError> {
        let result = self.write(url, data, shape, true).await;
        self.report(result)
    }

    /// PUT `{data: shaped}` and decode the updated record.
    pub async fn update(&self, url: &str, data: Fields, shape: &PayloadShape) -> Result<Record, ApiError> {
        let result = self.write(url, data, shape, false).await;
        self.report(result)
    }

    pub async fn delete(&self, url: &str) -> Result<Value, ApiError> {
        self.report(self.gateway.delete(url).await)
    }

    async fn write(
        &self,
        url: &str,
        data: Fields,
        shape: &PayloadShape,
        create: bool,
    ) -> Result<Record, ApiError> {
        let payload = shape.apply(data);
        if payload.is_empty() {
            return Err(ApiError::validation(if shape.fields.is_some() {
                "payload has no recognised fields"
            } else {
                "nothing to save"
            }));
        }
        let body = Some(Body::Json(json!({ "data": payload })));
        let response = if create {
            self.gateway.post(url, body).await?
        } else {
            self.gateway.put(url, body).await?
        };
        record_from_response(response)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::core::transport::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_failure_is_reported_once() {
        let h = Harness::new();
        let gardens = Collection::new(h.gateway.clone(), h.alerts.clone(), "gardens");
        h.transport
            .respond_json(Method::Get, &Harness::url("/api/gardens"), 500, json!({"error": {"message": "db down"}}));

        let err = gardens.list(&gardens.url("")).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(h.alerts.error_count(), 1);
        assert_eq!(h.alerts.current().map(|a| a.message), Some("db down".to_string()));
    }

    #[test]
    fn test_url_segments_are_encoded() {
        let h = Harness::new();
        let events = Collection::new(h.gateway.clone(), h.alerts.clone(), "volunteer-days");
        assert_eq!(
            events.url_segments(&["garden", "oak park/east"]),
            "https://cms.test/api/volunteer-days/garden/oak%20park%2Feast"
        );
        assert_eq!(
            events.url_segments(&["garden", "oak-park"]),
            "https://cms.test/api/volunteer-days/garden/oak-park"
        );
    }

    #[tokio::test]
    async fn test_empty_update_never_reaches_the_network() {
        let h = Harness::new();
        let blogs = Collection::new(h.gateway.clone(), h.alerts.clone(), "blogs");
        let err = blogs
            .update(&blogs.url("/1"), Fields::new(), &PayloadShape::open())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(h.transport.total_calls(), 0);
        assert_eq!(h.alerts.error_count(), 1);
    }

    #[tokio::test]
    async fn test_create_wraps_payload_in_data() {
        let h = Harness::new();
        let blogs = Collection::new(h.gateway.clone(), h.alerts.clone(), "blogs");
        h.transport.respond_json(
            Method::Post,
            &Harness::url("/api/blogs"),
            200,
            json!({"data": {"id": 3, "attributes": {"title": "Seed swap"}}}),
        );

        let record = blogs
            .create(&blogs.url(""), fields(json!({"title": "Seed swap"})), &PayloadShape::open())
            .await
            .unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(h.sent_json(0), json!({"data": {"title": "Seed swap"}}));
    }
}
