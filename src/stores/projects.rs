//! Garden projects with hero images, galleries and linked events.

use std::rc::Rc;

use tracing::warn;

use crate::config::UPLOAD_PATH;
use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::{Body, FetchGateway};
use crate::core::normalize::ensure_list;
use crate::core::payload::PayloadShape;
use crate::core::transport::MultipartForm;
use crate::models::{Fields, Loaded, Record, RecordId, UploadedFile, remove_by_id, replace_by_id};
use crate::stores::collection::Collection;
use crate::utils::Query;

const SHAPE: PayloadShape = PayloadShape::open()
    .with_relations(&["hero_image", "featured_gallery", "related_events"])
    .with_dates(&["date_start", "date_end"]);

/// To-many relations that are always present as lists.
const LIST_FIELDS: [&str; 2] = ["featured_gallery", "related_events"];

/// Relations populated on write responses.
const WRITE_POPULATE: [&str; 3] = ["hero_image", "featured_gallery", "impact_metrics"];

pub struct ProjectsStore {
    api: Collection,
    by_garden: ResourceCache<RecordId, Vec<Record>>,
    by_slug: ResourceCache<String, Option<Record>>,
}

impl ProjectsStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "projects");
        Self {
            by_garden: api.cache("projects"),
            by_slug: api.cache("project"),
            api,
        }
    }

    pub async fn get_projects(&self, garden_id: RecordId) -> Vec<Record> {
        let api = self.api.clone();
        let url = [
            "hero_image",
            "featured_gallery",
            "garden",
            "related_events",
            "related_events.title",
            "impact_metrics",
        ]
        .into_iter()
        .fold(Query::new(), Query::populate)
        .filter_eq(&["garden", "id"], garden_id)
        .apply(&self.api.url(""));

        self.by_garden
            .fetch(garden_id, FetchMode::Cached, move || async move {
                api.list(&url).await.map(|loaded| {
                    loaded.map(|records| records.into_iter().map(with_lists).collect::<Vec<_>>())
                })
            })
            .await
            .unwrap_or_default()
    }

    pub async fn get_slug(&self, slug: &str) -> Option<Record> {
        let api = self.api.clone();
        let url = [
            "hero_image",
            "featured_gallery",
            "garden",
            "garden.organization",
            "related_events",
            "related_events.title",
            "related_events.startDatetime",
            "related_events.hero_image",
            "impact_metrics",
        ]
        .into_iter()
        .fold(Query::new().filter_eq(&["slug"], slug), Query::populate)
        .apply(&self.api.url(""));

        self.by_slug
            .fetch(slug.to_string(), FetchMode::Refresh, move || async move {
                api.list(&url)
                    .await
                    .map(|list| Loaded::unpaged(list.data.into_iter().next().map(with_lists)))
            })
            .await
            .ok()
            .flatten()
    }

    pub fn projects(&self, garden_id: RecordId) -> Vec<Record> {
        self.by_garden.data(&garden_id).unwrap_or_default()
    }

    /// Create a project. Cached garden lists are dropped so the next read
    /// picks the new project up in server order.
    pub async fn register(&self, data: Fields) -> Result<Record, ApiError> {
        let url = self.write_url("");
        let record = self.api.create(&url, data, &SHAPE).await.map(with_lists)?;
        self.by_garden.clear();
        Ok(record)
    }

    pub async fn update(&self, id: RecordId, data: Fields) -> Result<Record, ApiError> {
        let url = self.write_url(&format!("/{}", id));
        let record = self.api.update(&url, data, &SHAPE).await.map(with_lists)?;
        self.by_garden.update_all(|list| {
            replace_by_id(list, &record);
        });
        self.by_slug.update_all(|project| {
            if project.as_ref().is_some_and(|p| p.id == record.id) {
                *project = Some(record.clone());
            }
        });
        Ok(record)
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), ApiError> {
        self.api.delete(&self.api.url(&format!("/{}", id))).await?;
        self.by_garden.update_all(|list| {
            remove_by_id(list, id);
        });
        self.by_slug.update_all(|project| {
            if project.as_ref().is_some_and(|p| p.id == id) {
                *project = None;
            }
        });
        Ok(())
    }

    /// Upload an image to the media library.
    pub async fn upload_image(&self, form: MultipartForm) -> Result<UploadedFile, ApiError> {
        let gateway = self.api.gateway();
        let url = gateway.config().endpoint(UPLOAD_PATH);
        let result = match gateway.post(&url, Some(Body::Multipart(form))).await {
            Ok(response) => UploadedFile::from_response(response),
            Err(err) => Err(err),
        };
        result.inspect_err(|err| {
            warn!(error = %err, "image upload failed");
            self.api.alerts().error_message("Failed to upload image");
        })
    }

    fn write_url(&self, path: &str) -> String {
        WRITE_POPULATE
            .into_iter()
            .fold(Query::new(), Query::populate)
            .apply(&self.api.url(path))
    }
}

fn with_lists(mut record: Record) -> Record {
    for field in LIST_FIELDS {
        ensure_list(&mut record, field);
    }
    record
}
