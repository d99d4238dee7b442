//! Persistence formats understood by the log writer.

use crate::error::{QueryLogError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// On-disk layout of a daily query log file.
///
/// Only the JSON array layout exists today; anything else is rejected at startup
/// so capture never activates with a writer that cannot honour the setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON array per file, one element per unit of work.
    #[default]
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = QueryLogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            _ => Err(QueryLogError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
