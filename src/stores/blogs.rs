//! Blog posts.

use std::rc::Rc;

use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::FetchGateway;
use crate::core::payload::PayloadShape;
use crate::models::{Fields, Loaded, Record, RecordId, remove_by_id, replace_by_id};
use crate::stores::collection::Collection;
use crate::utils::Query;

const SHAPE: PayloadShape = PayloadShape::open();

pub struct BlogStore {
    api: Collection,
    all: ResourceCache<(), Vec<Record>>,
    posts: ResourceCache<RecordId, Record>,
}

impl BlogStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "blogs");
        Self {
            all: api.cache("blogs"),
            posts: api.cache("blog"),
            api,
        }
    }

    /// All posts, newest first.
    pub async fn fetch_all(&self) -> Vec<Record> {
        let api = self.api.clone();
        let url = Query::new()
            .populate_all()
            .param("sort[0]", "createdAt:desc")
            .apply(&self.api.url(""));
        self.all
            .fetch((), FetchMode::Refresh, move || async move { api.list(&url).await })
            .await
            .unwrap_or_default()
    }

    pub async fn fetch_by_id(&self, id: RecordId) -> Option<Record> {
        let api = self.api.clone();
        let url = self.api.url(&format!("/{}", id));
        self.posts
            .fetch(id, FetchMode::Refresh, move || async move {
                api.one(&url).await.map(Loaded::unpaged)
            })
            .await
            .ok()
    }

    pub fn blogs(&self) -> Vec<Record> {
        self.all.data(&()).unwrap_or_default()
    }

    pub async fn create(&self, data: Fields) -> Result<Record, ApiError> {
        let record = self.api.create(&self.api.url(""), data, &SHAPE).await?;
        self.all.update(&(), |list| list.insert(0, record.clone()));
        self.posts.insert(record.id, record.clone());
        Ok(record)
    }

    pub async fn update(&self, id: RecordId, data: Fields) -> Result<Record, ApiError> {
        let record = self
            .api
            .update(&self.api.url(&format!("/{}", id)), data, &SHAPE)
            .await?;
        self.all.update(&(), |list| {
            replace_by_id(list, &record);
        });
        self.posts.insert(record.id, record.clone());
        Ok(record)
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), ApiError> {
        self.api.delete(&self.api.url(&format!("/{}", id))).await?;
        self.all.update(&(), |list| {
            remove_by_id(list, id);
        });
        self.posts.invalidate(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::Method;
    use crate::stores::collection::testing::*;
    use serde_json::json;

    const ALL: &str = "https://cms.test/api/blogs?populate=*&sort[0]=createdAt%3Adesc";

    #[tokio::test]
    async fn test_create_update_delete_keep_list_in_sync() {
        let h = Harness::new();
        let blogs = BlogStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport.respond_json(
            Method::Get,
            ALL,
            200,
            json!({"data": [{"id": 1, "attributes": {"title": "Spring"}}, {"id": 2, "attributes": {"title": "Winter"}}]}),
        );
        h.transport.respond_json(
            Method::Post,
            "https://cms.test/api/blogs",
            200,
            json!({"data": {"id": 3, "attributes": {"title": "Summer"}}}),
        );
        h.transport.respond_json(
            Method::Put,
            "https://cms.test/api/blogs/1",
            200,
            json!({"data": {"id": 1, "attributes": {"title": "Early Spring"}}}),
        );
        h.transport
            .respond_json(Method::Delete, "https://cms.test/api/blogs/2", 200, json!({}));

        blogs.fetch_all().await;
        blogs.create(fields(json!({"title": "Summer"}))).await.unwrap();
        blogs.update(1, fields(json!({"title": "Early Spring"}))).await.unwrap();
        blogs.delete(2).await.unwrap();

        let titles: Vec<_> = blogs
            .blogs()
            .iter()
            .map(|b| b.str("title").unwrap_or_default().to_string())
            .collect();
        assert_eq!(titles, vec!["Summer", "Early Spring"]);
    }

    #[tokio::test]
    async fn test_missing_post_is_none() {
        let h = Harness::new();
        let blogs = BlogStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport.respond_json(
            Method::Get,
            "https://cms.test/api/blogs/9",
            404,
            json!({"data": null, "error": {"status": 404, "message": "Not Found"}}),
        );
        assert_eq!(blogs.fetch_by_id(9).await, None);
        assert_eq!(h.alerts.current().map(|a| a.message), Some("Not Found".to_string()));
    }
}
