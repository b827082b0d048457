//! Garden instructions: how-to pages volunteers follow and approve.

use std::rc::Rc;

use serde_json::{Value, json};

use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::{Body, FetchGateway};
use crate::core::payload::PayloadShape;
use crate::models::{Fields, Loaded, Record, RecordId, remove_by_id, replace_by_id};
use crate::stores::collection::Collection;
use crate::utils::Query;

const SHAPE: PayloadShape = PayloadShape::open().with_relations(&["garden"]);

pub struct InstructionStore {
    api: Collection,
    all: ResourceCache<(), Vec<Record>>,
    by_slug: ResourceCache<String, Option<Record>>,
}

impl InstructionStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "instructions");
        Self {
            all: api.cache("instructions"),
            by_slug: api.cache("instruction"),
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

    /// The instruction with `slug`, its garden populated with the organization.
    pub async fn find_slug(&self, slug: &str) -> Option<Record> {
        let api = self.api.clone();
        let url = Query::new()
            .filter_eq(&["slug"], slug)
            .param("populate[garden][populate]", "organization")
            .apply(&self.api.url(""));
        self.by_slug
            .fetch(slug.to_string(), FetchMode::Refresh, move || async move {
                api.list(&url)
                    .await
                    .map(|list| Loaded::unpaged(list.data.into_iter().next()))
            })
            .await
            .ok()
            .flatten()
    }

    pub fn instructions(&self) -> Vec<Record> {
        self.all.data(&()).unwrap_or_default()
    }

    pub fn instruction(&self, slug: &str) -> Option<Record> {
        self.by_slug.data(&slug.to_string()).flatten()
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
        self.by_slug.update_all(|slot| {
            if let Some(current) = slot
                && current.id == record.id
            {
                *current = record.clone();
            }
        });
        Ok(record)
    }

    /// Mark a volunteer's task done under an instruction.
    pub async fn approve_task(&self, data: Fields) -> Result<Value, ApiError> {
        let url = Query::new().populate_all().apply(&self.api.url("/approve"));
        self.api
            .post(&url, Some(Body::Json(json!({ "data": data }))))
            .await
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), ApiError> {
        self.api.delete(&self.api.url(&format!("/{}", id))).await?;
        self.all.update(&(), |list| {
            remove_by_id(list, id);
        });
        self.by_slug
            .update_all(|slot| {
                if slot.as_ref().is_some_and(|current| current.id == id) {
                    *slot = None;
                }
            });
        Ok(())
    }
}
