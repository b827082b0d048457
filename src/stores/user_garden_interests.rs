//! Gardens a user asked to hear about.

use std::rc::Rc;

use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::FetchGateway;
use crate::core::payload::PayloadShape;
use crate::models::{Fields, Record, RecordId, replace_by_id};
use crate::stores::collection::Collection;
use crate::utils::Query;

const SHAPE: PayloadShape = PayloadShape::open().with_relations(&["garden", "user"]);

pub struct UserGardenInterestStore {
    api: Collection,
    all: ResourceCache<(), Vec<Record>>,
}

impl UserGardenInterestStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "user-garden-interests");
        Self {
            all: api.cache("user-garden-interests"),
            api,
        }
    }

    pub async fn find(&self) -> Vec<Record> {
        let api = self.api.clone();
        let url = self.api.url("");
        self.all
            .fetch((), FetchMode::Refresh, move || async move { api.list(&url).await })
            .await
            .unwrap_or_default()
    }

    pub fn interests(&self) -> Vec<Record> {
        self.all.data(&()).unwrap_or_default()
    }

    pub async fn register(&self, data: Fields) -> Result<Record, ApiError> {
        let url = Query::new().populate_all().apply(&self.api.url(""));
        let record = self.api.create(&url, data, &SHAPE).await?;
        self.all.update(&(), |list| list.insert(0, record.clone()));
        Ok(record)
    }

    pub async fn update(&self, id: RecordId, data: Fields) -> Result<Record, ApiError> {
        let url = Query::new()
            .populate_all()
            .apply(&self.api.url(&format!("/{}", id)));
        let record = self.api.update(&url, data, &SHAPE).await?;
        self.all.update(&(), |list| {
            replace_by_id(list, &record);
        });
        Ok(record)
    }
}
