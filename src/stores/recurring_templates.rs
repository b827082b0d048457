//! Recurring event templates: schedules the server expands into events.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;

use crate::config::pagination::{PREVIEW_COUNT, TEMPLATES_PAGE_SIZE};
use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::FetchGateway;
use crate::core::payload::PayloadShape;
use crate::models::{
    Fields, Loaded, Pagination, Record, RecordId, reference_id, remove_by_id, replace_by_id,
};
use crate::stores::collection::Collection;
use crate::utils::Query;

/// Fields the template content type accepts. Everything else is stripped
/// before a write.
pub const SCHEMA_FIELDS: &[&str] = &[
    "title_template",
    "naming_convention",
    "recurrence_type",
    "day_of_month",
    "nth_occurrence",
    "weekday",
    "start_time",
    "end_text",
    "blurb",
    "content",
    "garden",
    "interest",
    "accessibility",
    "type",
    "hero_image",
    "is_active",
    "first_occurrence_date",
    "max_future_instances",
];

const SHAPE: PayloadShape = PayloadShape::strict(SCHEMA_FIELDS);

/// One row of a template preview.
#[derive(Clone, Debug, PartialEq)]
pub enum PreviewItem {
    /// An event the template already created.
    Existing(Value),
    /// An occurrence the template would create next.
    Upcoming { title: String, date: String },
}

impl PreviewItem {
    pub fn exists(&self) -> bool {
        matches!(self, Self::Existing(_))
    }

    fn upcoming(item: &Value) -> Self {
        let text = |field: &str| item.get(field).and_then(Value::as_str).unwrap_or_default();
        let (date, time) = (text("date"), text("time"));
        Self::Upcoming {
            title: text("title").to_string(),
            date: if time.is_empty() {
                date.to_string()
            } else {
                format!("{}T{}:00", date, time)
            },
        }
    }
}

/// Parse a preview response: `{existing_instances, upcoming_previews}`,
/// optionally wrapped in `data`.
pub fn parse_preview(response: &Value) -> Vec<PreviewItem> {
    let data = response.get("data").unwrap_or(response);
    let items = |field: &str| {
        data.get(field)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    };
    items("existing_instances")
        .iter()
        .cloned()
        .map(PreviewItem::Existing)
        .chain(items("upcoming_previews").iter().map(PreviewItem::upcoming))
        .collect()
}

pub struct RecurringTemplateStore {
    api: Collection,
    by_garden: ResourceCache<RecordId, Vec<Record>>,
    details: ResourceCache<RecordId, Record>,
    preview_items: RefCell<Vec<PreviewItem>>,
    preview_loading: Cell<bool>,
}

impl RecurringTemplateStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "recurring-event-templates");
        Self {
            by_garden: api.cache("recurring-templates"),
            details: api.cache("recurring-template"),
            preview_items: RefCell::new(Vec::new()),
            preview_loading: Cell::new(false),
            api,
        }
    }

    /// Templates of a garden, newest first.
    pub async fn get_by_garden(&self, garden_id: RecordId) -> Vec<Record> {
        let api = self.api.clone();
        let url = Query::new()
            .filter_eq(&["garden", "id"], garden_id)
            .populate("garden")
            .sort("createdAt:desc")
            .apply(&self.api.url(""));
        self.by_garden
            .fetch(garden_id, FetchMode::Refresh, move || async move { api.list(&url).await })
            .await
            .unwrap_or_default()
    }

    pub fn templates(&self, garden_id: RecordId) -> Vec<Record> {
        self.by_garden.data(&garden_id).unwrap_or_default()
    }

    /// Pagination reported by the last load, or a first empty page.
    pub fn pagination(&self, garden_id: RecordId) -> Pagination {
        self.by_garden.pagination(&garden_id).unwrap_or(Pagination {
            page: 1,
            page_size: TEMPLATES_PAGE_SIZE,
            page_count: 0,
            total: 0,
        })
    }

    pub async fn find_by_id(&self, id: RecordId) -> Option<Record> {
        let api = self.api.clone();
        let url = Query::new()
            .populate("garden")
            .apply(&self.api.url(&format!("/{}", id)));
        self.details
            .fetch(id, FetchMode::Refresh, move || async move {
                api.one(&url).await.map(Loaded::unpaged)
            })
            .await
            .ok()
    }

    /// Create a template from the schema fields of `data`.
    pub async fn create(&self, data: Fields) -> Result<Record, ApiError> {
        let garden = data.get("garden").and_then(reference_id);
        let record = self.api.create(&self.api.url(""), data, &SHAPE).await?;
        if let Some(garden) = record.relation_id("garden").or(garden) {
            self.by_garden
                .update(&garden, |list| list.insert(0, record.clone()));
        }
        self.details.insert(record.id, record.clone());
        Ok(record)
    }

    pub async fn update(&self, id: RecordId, data: Fields) -> Result<Record, ApiError> {
        let record = self
            .api
            .update(&self.api.url(&format!("/{}", id)), data, &SHAPE)
            .await?;
        self.by_garden.update_all(|list| {
            replace_by_id(list, &record);
        });
        self.details.insert(record.id, record.clone());
        Ok(record)
    }

    /// Delete a template. Active templates are refused: they must be
    /// deactivated first so no further events are generated mid-delete.
    pub async fn delete(&self, id: RecordId) -> Result<(), ApiError> {
        if self.is_known_active(id) {
            return self.api.report(Err(ApiError::validation(
                "deactivate the template before deleting it",
            )));
        }
        self.api.delete(&self.api.url(&format!("/{}", id))).await?;
        self.by_garden.update_all(|list| {
            remove_by_id(list, id);
        });
        self.details.invalidate(&id);
        Ok(())
    }

    fn is_known_active(&self, id: RecordId) -> bool {
        let active = |record: &Record| record.get("is_active") == Some(&Value::Bool(true));
        if let Some(record) = self.details.data(&id) {
            return active(&record);
        }
        self.by_garden.keys().into_iter().any(|garden| {
            self.templates(garden)
                .iter()
                .any(|record| record.id == id && active(record))
        })
    }

    /// Existing and upcoming occurrences of a template.
    pub async fn preview(&self, id: RecordId, count: Option<u32>) -> Result<Vec<PreviewItem>, ApiError> {
        self.preview_loading.set(true);
        self.preview_items.borrow_mut().clear();
        let url = Query::new()
            .param("count", count.unwrap_or(PREVIEW_COUNT).to_string())
            .apply(&self.api.url(&format!("/{}/preview", id)));
        let result = self.api.get(&url).await.map(|response| parse_preview(&response));
        self.preview_loading.set(false);

        let items = result?;
        *self.preview_items.borrow_mut() = items.clone();
        Ok(items)
    }

    pub fn preview_items(&self) -> Vec<PreviewItem> {
        self.preview_items.borrow().clone()
    }

    pub fn is_preview_loading(&self) -> bool {
        self.preview_loading.get()
    }

    pub fn clear_preview(&self) {
        self.preview_items.borrow_mut().clear();
        self.preview_loading.set(false);
    }

    /// Generate due events for one template now.
    pub async fn process(&self, id: RecordId) -> Result<Value, ApiError> {
        self.api
            .post(&self.api.url(&format!("/{}/process", id)), None)
            .await
    }

    /// Generate due events for every active template.
    pub async fn process_all(&self) -> Result<Value, ApiError> {
        self.api.post(&self.api.url("/process-all"), None).await
    }
}
