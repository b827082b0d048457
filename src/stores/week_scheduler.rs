//! Weekly volunteer schedule, grouped by day.

use std::cell::Cell;
use std::rc::Rc;

use crate::core::alert::AlertStore;
use crate::core::cache::{CachePayload, FetchMode, ResourceCache};
use crate::core::error::ApiError;
use crate::core::gateway::FetchGateway;
use crate::core::payload::PayloadShape;
use crate::models::{Fields, Record, RecordId, reference_id};
use crate::stores::collection::Collection;
use crate::utils::Query;

const SHAPE: PayloadShape = PayloadShape::open();

/// Entries of one day, in API order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DayGroup {
    pub day: String,
    pub entries: Vec<Record>,
}

/// Schedule entries grouped by their `day` field.
///
/// Days appear in the order they were first seen; entries within a day keep
/// API order. Entries without a `day` are grouped under `""`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeekSchedule {
    pub days: Vec<DayGroup>,
}

impl WeekSchedule {
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut schedule = Self::default();
        for record in records {
            schedule.push(record);
        }
        schedule
    }

    pub fn day(&self, day: &str) -> &[Record] {
        self.days
            .iter()
            .find(|group| group.day == day)
            .map(|group| group.entries.as_slice())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.days.iter().map(|group| group.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an entry to the end of its day.
    pub fn push(&mut self, record: Record) {
        let day = day_of(&record);
        match self.days.iter_mut().find(|group| group.day == day) {
            Some(group) => group.entries.push(record),
            None => self.days.push(DayGroup {
                day,
                entries: vec![record],
            }),
        }
    }

    /// Replace an entry in place. If its day changed it moves to the end of
    /// the new day. Returns `false` if the id is unknown.
    pub fn replace(&mut self, record: &Record) -> bool {
        let found = self.days.iter().enumerate().find_map(|(g, group)| {
            group
                .entries
                .iter()
                .position(|r| r.id == record.id)
                .map(|index| (g, index))
        });
        let Some((g, index)) = found else {
            return false;
        };
        let group = &mut self.days[g];
        if group.day == day_of(record) {
            group.entries[index] = record.clone();
        } else {
            group.entries.remove(index);
            self.push(record.clone());
        }
        true
    }

    pub fn remove(&mut self, id: RecordId) -> bool {
        self.days.iter_mut().any(|group| {
            let before = group.entries.len();
            group.entries.retain(|r| r.id != id);
            group.entries.len() != before
        })
    }
}

impl CachePayload for WeekSchedule {
    fn append(&mut self, more: Self) {
        *self = more;
    }
}

fn day_of(record: &Record) -> String {
    record.str("day").unwrap_or_default().to_string()
}

pub struct WeekSchedulerStore {
    api: Collection,
    schedules: ResourceCache<RecordId, WeekSchedule>,
    current_garden: Cell<Option<RecordId>>,
}

impl WeekSchedulerStore {
    pub fn new(gateway: Rc<FetchGateway>, alerts: Rc<AlertStore>) -> Self {
        let api = Collection::new(gateway, alerts, "schedulers");
        Self {
            schedules: api.cache("week-schedule"),
            current_garden: Cell::new(None),
            api,
        }
    }

    /// The garden's schedule grouped by day.
    pub async fn find(&self, garden_id: RecordId) -> WeekSchedule {
        self.current_garden.set(Some(garden_id));
        let api = self.api.clone();
        let url = Query::new()
            .populate_all()
            .param("filters[garden]", garden_id.to_string())
            .apply(&self.api.url(""));
        self.schedules
            .fetch(garden_id, FetchMode::Refresh, move || async move {
                api.list(&url)
                    .await
                    .map(|loaded| loaded.map(WeekSchedule::from_records))
            })
            .await
            .unwrap_or_default()
    }

    pub fn schedule(&self, garden_id: RecordId) -> WeekSchedule {
        self.schedules.data(&garden_id).unwrap_or_default()
    }

    pub async fn register(&self, data: Fields) -> Result<Record, ApiError> {
        let garden = data.get("garden").and_then(reference_id);
        let url = Query::new().populate_all().apply(&self.api.url(""));
        let record = self.api.create(&url, data, &SHAPE).await?;
        let garden = record
            .relation_id("garden")
            .or(garden)
            .or(self.current_garden.get());
        if let Some(garden) = garden {
            self.schedules.update(&garden, |schedule| schedule.push(record.clone()));
        }
        Ok(record)
    }

    pub async fn update(&self, id: RecordId, data: Fields) -> Result<Record, ApiError> {
        let url = Query::new()
            .populate_all()
            .apply(&self.api.url(&format!("/{}", id)));
        let record = self.api.update(&url, data, &SHAPE).await?;
        self.schedules.update_all(|schedule| {
            schedule.replace(&record);
        });
        Ok(record)
    }

    pub async fn delete(&self, id: RecordId) -> Result<(), ApiError> {
        self.api.delete(&self.api.url(&format!("/{}", id))).await?;
        self.schedules.update_all(|schedule| {
            schedule.remove(id);
        });
        Ok(())
    }
}
