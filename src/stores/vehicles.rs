//! Vehicles in the signed-in user's garage.

use std::rc::Rc;

use serde_json::Value;

use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::FetchGateway;
use crate::models::Loaded;
use crate::stores::collection::Collection;

pub struct VehiclesStore {
    api: Collection,
    garage: ResourceCache<(), Vec<Value>>,
}

impl VehiclesStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "Vehicle");
        Self {
            garage: api.cache("vehicles"),
            api,
        }
    }

    /// The user's vehicles. The endpoint answers `{vehicles: [...]}`.
    pub async fn get_all(&self) -> Vec<Value> {
        let api = self.api.clone();
        let url = self.api.url("/myGarage");
        self.garage
            .fetch((), FetchMode::Refresh, move || async move {
                let response = api.get(&url).await?;
                match response.get("vehicles") {
                    Some(Value::Array(vehicles)) => Ok(Loaded::unpaged(vehicles.clone())),
                    Some(Value::Null) | None => Ok(Loaded::unpaged(Vec::new())),
                    Some(_) => api.report(Err(ApiError::Decode("`vehicles` is not a list".to_string()))),
                }
            })
            .await
            .unwrap_or_default()
    }

    pub fn vehicles(&self) -> Vec<Value> {
        self.garage.data(&()).unwrap_or_default()
    }
}
