//! SMS campaigns sent to a garden's volunteers.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::{Body, FetchGateway};
use crate::core::payload::PayloadShape;
use crate::models::{Fields, Record, RecordId, replace_by_id};
use crate::stores::collection::Collection;
use crate::utils::Query;

const SHAPE: PayloadShape = PayloadShape::open();

pub struct SmsCampaignStore {
    api: Collection,
    by_garden: ResourceCache<String, Vec<Record>>,
    current_garden: RefCell<Option<String>>,
}

impl SmsCampaignStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "sms-campaigns");
        Self {
            by_garden: api.cache("sms-campaigns"),
            current_garden: RefCell::new(None),
            api,
        }
    }

    pub async fn get_by_garden(&self, slug: &str) -> Vec<Record> {
        *self.current_garden.borrow_mut() = Some(slug.to_string());
        let api = self.api.clone();
        let url = self.api.url_segments(&["garden", slug]);
        self.by_garden
            .fetch(slug.to_string(), FetchMode::Refresh, move || async move {
                api.list(&url).await
            })
            .await
            .unwrap_or_default()
    }

    pub fn campaigns(&self, slug: &str) -> Vec<Record> {
        self.by_garden.data(&slug.to_string()).unwrap_or_default()
    }

    /// Save a campaign; it goes to the head of the current garden's list.
    pub async fn register(&self, data: Fields) -> Result<Record, ApiError> {
        let url = Query::new().populate_all().apply(&self.api.url(""));
        let record = self.api.create(&url, data, &SHAPE).await?;
        let current = self.current_garden.borrow().clone();
        if let Some(slug) = current {
            self.by_garden
                .update(&slug, |list| list.insert(0, record.clone()));
        }
        Ok(record)
    }

    pub async fn update(&self, id: RecordId, data: Fields) -> Result<Record, ApiError> {
        let url = Query::new()
            .populate_all()
            .apply(&self.api.url(&format!("/{}", id)));
        let record = self.api.update(&url, data, &SHAPE).await?;
        self.by_garden.update_all(|list| {
            replace_by_id(list, &record);
        });
        Ok(record)
    }

    /// Send the message to the sender's own phone.
    pub async fn test_sms(&self, request: Fields) -> Result<Value, ApiError> {
        self.send(self.api.url("/sms/test"), request).await
    }

    /// Send the message to the whole group.
    pub async fn send_sms(&self, request: Fields) -> Result<Value, ApiError> {
        self.send(self.api.url("/sms/group"), request).await
    }

    async fn send(&self, url: String, request: Fields) -> Result<Value, ApiError> {
        let body = request.get("body").and_then(Value::as_str).unwrap_or_default();
        if body.trim().is_empty() {
            return self
                .api
                .report(Err(ApiError::validation("message body is empty")));
        }
        self.api
            .post(&url, Some(Body::Json(Value::Object(request))))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::Method;
    use crate::stores::collection::testing::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_body_is_not_sent() {
        let h = Harness::new();
        let sms = SmsCampaignStore::new(h.gateway.clone(), h.alerts.clone());

        let err = sms
            .send_sms(fields(json!({"body": "   ", "garden": 4})))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(sms.test_sms(fields(json!({}))).await.is_err());
        assert_eq!(h.transport.total_calls(), 0);
        assert_eq!(h.alerts.error_count(), 2);
    }

    #[tokio::test]
    async fn test_send_posts_request_unwrapped() {
        let h = Harness::new();
        let sms = SmsCampaignStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport.respond_json(
            Method::Post,
            "https://cms.test/api/sms-campaigns/sms/group",
            200,
            json!({"sent": 30}),
        );

        let request = json!({"body": "Workday Saturday 9am", "garden": 4});
        let response = sms.send_sms(fields(request.clone())).await.unwrap();
        assert_eq!(response["sent"], 30);
        assert_eq!(h.sent_json(0), request);
    }

    #[tokio::test]
    async fn test_register_goes_to_head_of_current_garden() {
        let h = Harness::new();
        let sms = SmsCampaignStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport.respond_json(
            Method::Get,
            "https://cms.test/api/sms-campaigns/garden/oak-park",
            200,
            json!([{"id": 1, "body": "old"}]),
        );
        h.transport.respond_json(
            Method::Post,
            "https://cms.test/api/sms-campaigns?populate=*",
            200,
            json!({"data": {"id": 2, "attributes": {"body": "new"}}}),
        );

        sms.get_by_garden("oak-park").await;
        sms.register(fields(json!({"body": "new"}))).await.unwrap();
        assert_eq!(
            sms.campaigns("oak-park").iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![2, 1]
        );
    }
}
