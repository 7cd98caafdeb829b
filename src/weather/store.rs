//! Query contract the weather tools need from the observation store.
//!
//! Timestamps cross this boundary as ISO-8601 text. The in-memory store
//! keeps a parsed copy internally for ordering and exact-match lookups.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::tool::ToolError;

/// One observation document.
pub type Document = Map<String, Value>;

/// Station identifier field.
pub const STATION_FIELD: &str = "callLetters";
/// Observation timestamp field.
pub const TIMESTAMP_FIELD: &str = "ts";

/// Errors from the observation store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The data file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The data file is not valid observation JSON
    #[error("invalid observation data: {0}")]
    Parse(String),
    /// The query itself is invalid
    #[error("invalid query: {0}")]
    Query(String),
}

impl From<StoreError> for ToolError {
    fn from(error: StoreError) -> Self {
        ToolError::ExecutionFailed(error.to_string())
    }
}

/// Number of observations recorded for one station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationCount {
    #[serde(rename = "_id")]
    pub station: Option<String>,
    pub count: u64,
}

/// Read access to weather observations.
#[async_trait]
pub trait WeatherStore: Send + Sync {
    /// Any one observation for the station.
    async fn find_station(&self, call_letters: &str) -> Result<Option<Document>, StoreError>;
    /// The observation for the station at exactly `timestamp`.
    async fn find_at(&self, call_letters: &str, timestamp: &str) -> Result<Option<Document>, StoreError>;
    /// The station's most recent observation.
    async fn latest(&self, call_letters: &str) -> Result<Option<Document>, StoreError>;
    /// Observation counts per station, largest first.
    async fn count_by_station(&self) -> Result<Vec<StationCount>, StoreError>;
    /// Up to `limit` of the station's observations, newest first. A limit of
    /// zero returns them all.
    async fn recent(&self, call_letters: &str, limit: usize) -> Result<Vec<Document>, StoreError>;
}

/// Parses the ISO-8601 forms the tools accept, as naive UTC.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Formats a timestamp the way documents carry it.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

#[derive(Debug, Clone)]
struct Record {
    station: Option<String>,
    ts: Option<NaiveDateTime>,
    doc: Document,
}

/// Observation store held in memory, loaded from a JSON export.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Vec<Record>,
}

impl InMemoryStore {
    /// Builds a store from observation documents.
    ///
    /// `ts` may be an ISO-8601 string or an extended-JSON `{"$date": ...}`
    /// object; it is normalized to an ISO-8601 string either way.
    pub fn from_documents(documents: Vec<Value>) -> Result<Self, StoreError> {
        let records = documents
            .into_iter()
            .enumerate()
            .map(|(index, value)| match value {
                Value::Object(doc) => Ok(Record::new(doc)),
                other => Err(StoreError::Parse(format!(
                    "document {} is not an object: {}",
                    index, other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = records.len(), "Loaded observations");
        Ok(Self { records })
    }

    /// Loads a JSON array or newline-delimited JSON export.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let documents = if content.trim_start().starts_with('[') {
            serde_json::from_str::<Vec<Value>>(&content).map_err(|e| StoreError::Parse(e.to_string()))?
        } else {
            content
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(number, line)| {
                    serde_json::from_str::<Value>(line)
                        .map_err(|e| StoreError::Parse(format!("line {}: {}", number + 1, e)))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let store = Self::from_documents(documents)?;
        info!(path = %path.display(), observations = store.len(), "Observation store ready");
        Ok(store)
    }

    /// Number of loaded observations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn for_station<'a>(&'a self, call_letters: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records
            .iter()
            .filter(move |r| r.station.as_deref() == Some(call_letters))
    }

    fn newest_first<'a>(&'a self, call_letters: &'a str) -> Vec<&'a Record> {
        let mut records: Vec<&Record> = self.for_station(call_letters).collect();
        // Undated observations sort after every dated one.
        records.sort_by_key(|r| (r.ts.is_none(), Reverse(r.ts)));
        records
    }
}

impl Record {
    fn new(mut doc: Document) -> Self {
        let station = doc
            .get(STATION_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string);

        let ts = match doc.get(TIMESTAMP_FIELD) {
            Some(Value::String(text)) => parse_timestamp(text),
            Some(Value::Object(wrapped)) => wrapped
                .get("$date")
                .and_then(Value::as_str)
                .and_then(parse_timestamp),
            _ => None,
        };
        if let Some(ts) = &ts {
            doc.insert(TIMESTAMP_FIELD.to_string(), Value::String(format_timestamp(ts)));
        }

        Self { station, ts, doc }
    }
}

#[async_trait]
impl WeatherStore for InMemoryStore {
    async fn find_station(&self, call_letters: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.for_station(call_letters).next().map(|r| r.doc.clone()))
    }

    async fn find_at(&self, call_letters: &str, timestamp: &str) -> Result<Option<Document>, StoreError> {
        let wanted = parse_timestamp(timestamp)
            .ok_or_else(|| StoreError::Query(format!("unparseable timestamp '{}'", timestamp)))?;
        Ok(self
            .for_station(call_letters)
            .find(|r| r.ts == Some(wanted))
            .map(|r| r.doc.clone()))
    }

    async fn latest(&self, call_letters: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.newest_first(call_letters).first().map(|r| r.doc.clone()))
    }

    async fn count_by_station(&self) -> Result<Vec<StationCount>, StoreError> {
        let mut counts: HashMap<Option<&str>, u64> = HashMap::new();
        for record in &self.records {
            *counts.entry(record.station.as_deref()).or_default() += 1;
        }

        let mut counts: Vec<StationCount> = counts
            .into_iter()
            .map(|(station, count)| StationCount {
                station: station.map(str::to_string),
                count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.station.cmp(&b.station)));
        Ok(counts)
    }

    async fn recent(&self, call_letters: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .newest_first(call_letters)
            .into_iter()
            .take(if limit == 0 { usize::MAX } else { limit })
            .map(|r| r.doc.clone())
            .collect())
    }
}
