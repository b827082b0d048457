//! Plant location reports, optionally filtered to a garden's surroundings.

use std::rc::Rc;

use serde_json::Value;

use crate::config::DEFAULT_GARDEN_RADIUS_KM;
use crate::config::pagination::LOCATION_PAGE_SIZE;
use crate::core::alert::AlertStore;
use crate::core::cache::{FetchMode, ResourceCache};
use crate::core::gateway::FetchGateway;
use crate::models::Record;
use crate::stores::collection::Collection;
use crate::utils::{Query, haversine_km};

/// Which populated variant of the tracking list is cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum TrackingSet {
    Summary,
    Detailed,
}

pub struct LocationTrackingStore {
    api: Collection,
    trackings: ResourceCache<TrackingSet, Vec<Record>>,
}

impl LocationTrackingStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "location-trackings");
        Self {
            trackings: api.cache("location-trackings"),
            api,
        }
    }

    pub async fn fetch_all(&self) -> Vec<Record> {
        let url = ["plant", "plant_image", "user"]
            .into_iter()
            .fold(Query::new(), Query::populate_each)
            .apply(&self.api.url(""));
        self.load(TrackingSet::Summary, url).await
    }

    /// Trackings within `radius_km` of a garden. Without garden coordinates
    /// every tracking is returned; trackings without coordinates never match.
    pub async fn fetch_by_garden(
        &self,
        garden_lat: Option<f64>,
        garden_lng: Option<f64>,
        radius_km: Option<f64>,
    ) -> Vec<Record> {
        let url = [
            "plant",
            "plant.Benefits",
            "plant_image",
            "location_image",
            "user",
        ]
        .into_iter()
        .fold(Query::new(), Query::populate_each)
        .page_size(LOCATION_PAGE_SIZE)
        .apply(&self.api.url(""));
        let all = self.load(TrackingSet::Detailed, url).await;

        let (Some(lat), Some(lng)) = (garden_lat, garden_lng) else {
            return all;
        };
        let radius = radius_km.unwrap_or(DEFAULT_GARDEN_RADIUS_KM);
        all.into_iter()
            .filter(|tracking| {
                coordinates(tracking)
                    .is_some_and(|(t_lat, t_lng)| haversine_km(lat, lng, t_lat, t_lng) <= radius)
            })
            .collect()
    }

    async fn load(&self, set: TrackingSet, url: String) -> Vec<Record> {
        let api = self.api.clone();
        self.trackings
            .fetch(set, FetchMode::Refresh, move || async move {
                api.list(&url)
                    .await
                    .map(|loaded| loaded.map(|records| records.into_iter().map(with_derived_fields).collect::<Vec<_>>()))
            })
            .await
            .unwrap_or_default()
    }
}

/// Add the image URLs and uploader name the map views read directly.
fn with_derived_fields(mut tracking: Record) -> Record {
    let url_at = |field: &str, path: &[&str]| -> Option<Value> {
        let image = tracking.get(field)?;
        path.iter()
            .try_fold(image, |value, key| value.get(key))
            .filter(|url| url.is_string())
            .cloned()
    };

    let thumbnail = url_at("plant_image", &["formats", "thumbnail", "url"]);
    let small_image = url_at("plant_image", &["formats", "small", "url"])
        .or_else(|| url_at("plant_image", &["url"]));
    let location_thumbnail = url_at("location_image", &["formats", "thumbnail", "url"]);
    let user = tracking
        .get("user")
        .and_then(|user| user.get("username"))
        .cloned();

    for (field, value) in [
        ("thumbnail", thumbnail),
        ("small_image", small_image),
        ("location_thumbnail", location_thumbnail),
        ("user", user),
    ] {
        tracking.set(field, value.unwrap_or(Value::Null));
    }
    tracking
}

fn coordinates(tracking: &Record) -> Option<(f64, f64)> {
    let number = |field: &str| match tracking.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Some((number("latitude")?, number("longitude")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::Method;
    use crate::stores::collection::testing::*;
    use serde_json::json;

    const DETAILED: &str = "https://cms.test/api/location-trackings?populate=plant&populate=plant.Benefits&populate=plant_image&populate=location_image&populate=user&pagination[pageSize]=100";

    fn trackings() -> Value {
        json!({"data": [
            {"id": 1, "attributes": {
                "latitude": 45.5231, "longitude": -122.6765,
                "plant_image": {"data": {"id": 5, "attributes": {
                    "url": "/uploads/fern.jpg",
                    "formats": {"thumbnail": {"url": "/uploads/thumb_fern.jpg"}}
                }}},
                "user": {"data": {"id": 3, "attributes": {"username": "fern"}}}
            }},
            {"id": 2, "attributes": {"latitude": "45.5240", "longitude": "-122.6770"}},
            {"id": 3, "attributes": {"latitude": 45.60, "longitude": -122.60}},
            {"id": 4, "attributes": {"latitude": null}}
        ]})
    }

    #[tokio::test]
    async fn test_filters_by_radius() {
        let h = Harness::new();
        let store = LocationTrackingStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport.respond_json(Method::Get, DETAILED, 200, trackings());

        let near = store
            .fetch_by_garden(Some(45.5231), Some(-122.6765), None)
            .await;
        assert_eq!(near.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);

        let all = store.fetch_by_garden(None, None, None).await;
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_derived_fields() {
        let h = Harness::new();
        let store = LocationTrackingStore::new(h.gateway.clone(), h.alerts.clone());
        h.transport.respond_json(Method::Get, DETAILED, 200, trackings());

        let all = store.fetch_by_garden(None, None, None).await;
        assert_eq!(all[0].str("thumbnail"), Some("/uploads/thumb_fern.jpg"));
        assert_eq!(all[0].str("small_image"), Some("/uploads/fern.jpg"));
        assert_eq!(all[0].str("user"), Some("fern"));
        assert_eq!(all[1].get("thumbnail"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_fetch_all_uses_summary_populate() {
        let h = Harness::new();
        let store = LocationTrackingStore::new(h.gateway.clone(), h.alerts.clone());
        let url = "https://cms.test/api/location-trackings?populate=plant&populate=plant_image&populate=user";
        h.transport.respond_json(Method::Get, url, 200, json!({"data": []}));

        assert!(store.fetch_all().await.is_empty());
        assert_eq!(h.transport.calls(Method::Get, url), 1);
    }
}
