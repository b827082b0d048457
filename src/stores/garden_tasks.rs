//! Tasks posted by a garden for its volunteers.

use std::rc::Rc;

use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::FetchGateway;
use crate::core::payload::PayloadShape;
use crate::models::{Fields, Record, RecordId, reference_id, remove_by_id, replace_by_id};
use crate::stores::collection::Collection;
use crate::utils::Query;

const SHAPE: PayloadShape = PayloadShape::open().with_relations(&["garden"]);

pub struct GardenTaskStore {
    api: Collection,
    tasks: ResourceCache<RecordId, Vec<Record>>,
}

impl GardenTaskStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "garden-tasks");
        Self {
            tasks: api.cache("garden-tasks"),
            api,
        }
    }

    pub async fn get_by_garden(&self, garden_id: RecordId) -> Vec<Record> {
        let api = self.api.clone();
        let url = Query::new()
            .filter_eq(&["garden", "id"], garden_id)
            .populate_all()
            .apply(&self.api.url(""));
        self.tasks
            .fetch(garden_id, FetchMode::Cached, move || async move { api.list(&url).await })
            .await
            .unwrap_or_default()
    }

    pub fn tasks(&self, garden_id: RecordId) -> Vec<Record> {
        self.tasks.data(&garden_id).unwrap_or_default()
    }

    /// Create a task; it goes to the head of its garden's list if that is loaded.
    pub async fn register(&self, data: Fields) -> Result<Record, ApiError> {
        let garden = data.get("garden").and_then(reference_id);
        let record = self.api.create(&self.api.url(""), data, &SHAPE).await?;
        if let Some(garden) = record.relation_id("garden").or(garden) {
            self.tasks.update(&garden, |list| list.insert(0, record.clone()));
        }
        Ok(record)
    }

    /// Update a task. A task moved to another garden leaves the old garden's
    /// list and heads the new one's.
    pub async fn update(&self, id: RecordId, data: Fields) -> Result<Record, ApiError> {
        let garden = data.get("garden").and_then(reference_id);
        let record = self
            .api
            .update(&self.api.url(&format!("/{}", id)), data, &SHAPE)
            .await?;
        let Some(garden) = record.relation_id("garden").or(garden) else {
            self.tasks.update_all(|list| {
                replace_by_id(list, &record);
            });
            return Ok(record);
        };
        for key in self.tasks.keys() {
            self.tasks.update(&key, |list| {
                if key != garden {
                    remove_by_id(list, record.id);
                } else if !replace_by_id(list, &record) {
                    list.insert(0, record.clone());
                }
            });
        }
        Ok(record)
    }
}
