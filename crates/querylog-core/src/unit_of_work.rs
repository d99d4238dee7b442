//! Capture for a single unit of work: query subscription plus teardown flush.

use crate::aggregator::{BatchAggregator, LogBatch};
use crate::context::{Identity, RequestContext};
use crate::event::QueryExecuted;
use crate::query_log::Pipeline;
use chrono::{DateTime, Utc};
use querylog_common::Result;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};

/// Typed handler for "query executed" events.
pub trait QueryListener {
    /// Returns `true` when the query was recorded, `false` when it was filtered out.
    fn on_query(&mut self, event: &QueryExecuted) -> bool;
}

/// Exclusively owns the batch of one request. Never shared between requests.
pub struct UnitOfWork {
    pipeline: Arc<Pipeline>,
    aggregator: BatchAggregator,
    identity: Option<Identity>,
}

impl UnitOfWork {
    pub(crate) fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline, aggregator: BatchAggregator::new(), identity: None }
    }

    /// Record who the unit of work runs as. Takes precedence over the
    /// identity in the [`RequestContext`] handed to [`UnitOfWork::finish`].
    pub fn identify(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregator.is_empty()
    }

    pub fn len(&self) -> usize {
        self.aggregator.len()
    }

    pub fn batch(&self) -> &LogBatch {
        self.aggregator.batch()
    }

    /// Flush at teardown. See [`UnitOfWork::finish_at`].
    pub fn finish(self, ctx: &RequestContext) -> Result<Option<PathBuf>> {
        self.finish_at(ctx, Utc::now())
    }

    /// Attach request metadata and, if anything was captured, append the batch
    /// to the log file for `now`'s date.
    ///
    /// Returns the file written, or `None` when no query was recorded (nothing
    /// on disk is created or touched). Writer errors are returned as-is.
    pub fn finish_at(mut self, ctx: &RequestContext, now: DateTime<Utc>) -> Result<Option<PathBuf>> {
        let mut ctx = ctx.clone();
        if let Some(identity) = self.identity.take() {
            ctx.authenticated_user = Some(identity);
        }

        let mut meta = self.pipeline.static_meta.clone();
        meta.extend(ctx.to_meta());
        self.aggregator.attach_meta(meta);

        if self.aggregator.is_empty() {
            trace!("No queries captured for {} {}", ctx.method, ctx.url);
            return Ok(None);
        }

        let path = self.pipeline.paths.for_date(now.date_naive());
        let batch = self.aggregator.snapshot();
        self.pipeline.writer.write(&path, &batch)?;

        debug!(
            "Logged {} queries ({:.3} ms) for {} {}",
            batch.total_query_count, batch.total_time_ms, ctx.method, ctx.url
        );
        Ok(Some(path))
    }
}

impl QueryListener for UnitOfWork {
    fn on_query(&mut self, event: &QueryExecuted) -> bool {
        let Some(site) = self.pipeline.resolver.resolve(&event.stack) else {
            trace!("Skipping query without application frame: {}", event.sql);
            return false;
        };
        let record = self
            .pipeline
            .builder
            .build(self.aggregator.next_sequence(), event, &site);
        self.aggregator.record(record);
        true
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("aggregator", &self.aggregator)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
