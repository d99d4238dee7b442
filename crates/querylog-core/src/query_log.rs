//! Entry point wiring configuration into the capture pipeline.

use crate::call_site::{AppRootResolver, CallSiteResolver};
use crate::path::LogPath;
use crate::record::QueryRecordBuilder;
use crate::unit_of_work::UnitOfWork;
use crate::writer::LogFileWriter;
use querylog_common::Result;
use querylog_config::Config;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Read-only collaborators shared by every unit of work.
pub(crate) struct Pipeline {
    pub(crate) resolver: Arc<dyn CallSiteResolver>,
    pub(crate) builder: QueryRecordBuilder,
    pub(crate) writer: LogFileWriter,
    pub(crate) paths: LogPath,
    pub(crate) static_meta: Map<String, Value>,
}

/// Process-wide query log handle. Cheap to clone; hands out one [`UnitOfWork`] per request.
#[derive(Clone)]
pub struct QueryLog {
    inner: Arc<Pipeline>,
}

impl QueryLog {
    /// Validate `config` and build the pipeline.
    ///
    /// Returns `Ok(None)` when capture is disabled. An unsupported format is an
    /// error regardless of the switch.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        config.validate()?;
        if !config.enabled {
            return Ok(None);
        }

        info!(
            "Query log enabled: format={}, storage={}, app_root={}",
            config.log_format()?,
            config.storage_root.display(),
            config.app_root.display()
        );
        Ok(Some(Self::with_resolver(config, AppRootResolver::new(&config.app_root))))
    }

    /// Build with a custom call-site strategy. Skips the enabled check.
    pub fn with_resolver(config: &Config, resolver: impl CallSiteResolver + 'static) -> Self {
        let pipeline = Pipeline {
            resolver: Arc::new(resolver),
            builder: QueryRecordBuilder::new(config.environment.clone()),
            writer: LogFileWriter::new(config.pretty),
            paths: LogPath::new(&config.storage_root, &config.log_level),
            static_meta: config.meta_data.clone(),
        };
        Self { inner: Arc::new(pipeline) }
    }

    /// Start capturing for a new unit of work.
    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork::new(Arc::clone(&self.inner))
    }

    pub fn paths(&self) -> &LogPath {
        &self.inner.paths
    }
}

impl fmt::Debug for QueryLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryLog")
            .field("paths", &self.inner.paths)
            .field("writer", &self.inner.writer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querylog_common::QueryLogError;

    #[test]
    fn test_disabled_config_yields_none() {
        let config = Config::default();
        assert!(QueryLog::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_bad_format_fails_even_when_disabled() {
        let config = Config { format: "text".into(), ..Config::default() };
        assert!(matches!(
            QueryLog::from_config(&config),
            Err(QueryLogError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_enabled_config_builds_pipeline() {
        let config = Config { enabled: true, ..Config::default() };
        let log = QueryLog::from_config(&config).unwrap().unwrap();
        assert_eq!(log.paths().storage_root(), std::path::Path::new("storage/logs"));
        assert!(log.begin().is_empty());
    }
}
