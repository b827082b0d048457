//! Task messages posted to a garden.

use std::rc::Rc;

use serde_json::Value;

use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::FetchGateway;
use crate::models::{Loaded, RecordId};
use crate::stores::collection::Collection;

pub struct MessagesStore {
    api: Collection,
    by_garden: ResourceCache<RecordId, Vec<Value>>,
}

impl MessagesStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "message");
        Self {
            by_garden: api.cache("messages"),
            api,
        }
    }

    /// Messages of a garden. The endpoint answers `{messages: [...]}`.
    pub async fn fetch_by_garden(&self, garden_id: RecordId) -> Vec<Value> {
        let api = self.api.clone();
        let url = self.api.url(&format!("/garden/{}", garden_id));
        self.by_garden
            .fetch(garden_id, FetchMode::Refresh, move || async move {
                let result = api.get(&url).await.and_then(|response| match response.get("messages") {
                    Some(Value::Array(messages)) => Ok(Loaded::unpaged(messages.clone())),
                    Some(Value::Null) | None => Ok(Loaded::unpaged(Vec::new())),
                    Some(_) => Err(ApiError::Decode("`messages` is not a list".to_string())),
                });
                if let Err(err @ ApiError::Decode(_)) = &result {
                    api.alerts().error(err);
                }
                result
            })
            .await
            .unwrap_or_default()
    }

    /// Messages already loaded for a garden.
    pub fn by_garden(&self, garden_id: RecordId) -> Vec<Value> {
        self.by_garden.data(&garden_id).unwrap_or_default()
    }
}
