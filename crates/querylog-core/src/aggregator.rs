//! Per-unit-of-work batch state.

use crate::record::QueryRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Telemetry for one unit of work; one element of the daily JSON array.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogBatch {
    /// UTC time of the first recorded query, `YYYY-MM-DDTHH:MM:SSZ`.
    pub timestamp: String,
    pub total_query_count: usize,
    pub total_time_ms: f64,
    pub queries: Vec<QueryRecord>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

/// Owns the [`LogBatch`] while a unit of work is running.
///
/// Counters are updated together with every append so they always agree with
/// `queries`. The aggregator is consumed by [`BatchAggregator::snapshot`], which
/// makes the handoff to the writer happen at most once.
#[derive(Debug, Default)]
pub struct BatchAggregator {
    batch: LogBatch,
}

impl BatchAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next record should carry.
    pub fn next_sequence(&self) -> usize {
        self.batch.queries.len() + 1
    }

    pub fn record(&mut self, record: QueryRecord) {
        self.record_at(record, Utc::now());
    }

    /// Append `record`; `now` becomes the batch timestamp if this is the first one.
    ///
    /// The record is renumbered to [`BatchAggregator::next_sequence`], so `sl`
    /// always runs 1, 2, 3... in append order.
    pub fn record_at(&mut self, mut record: QueryRecord, now: DateTime<Utc>) {
        record.sequence = self.next_sequence();

        if self.batch.queries.is_empty() {
            self.batch.timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        }
        self.batch.total_time_ms += record.duration_ms;
        self.batch.queries.push(record);
        self.batch.total_query_count = self.batch.queries.len();
    }

    pub fn is_empty(&self) -> bool {
        self.batch.queries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.batch.queries.len()
    }

    /// Merge unit-of-work metadata. Later calls overwrite colliding keys.
    pub fn attach_meta(&mut self, meta: Map<String, Value>) {
        self.batch.meta.extend(meta);
    }

    pub fn batch(&self) -> &LogBatch {
        &self.batch
    }

    pub fn snapshot(self) -> LogBatch {
        self.batch
    }
}
