//! Daily log file locations.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

const QUERY_DIR: &str = "data_base_queries";

/// `<storage_root>/<log_level>/<YYYY-MM>/data_base_queries/<YYYY-MM-DD>.log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPath {
    storage_root: PathBuf,
    log_level: String,
}

impl LogPath {
    pub fn new(storage_root: impl Into<PathBuf>, log_level: impl Into<String>) -> Self {
        Self { storage_root: storage_root.into(), log_level: log_level.into() }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn for_date(&self, date: NaiveDate) -> PathBuf {
        self.storage_root
            .join(&self.log_level)
            .join(date.format("%Y-%m").to_string())
            .join(QUERY_DIR)
            .join(format!("{}.log", date.format("%Y-%m-%d")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_layout() {
        let paths = LogPath::new("/var/app/storage/logs", "info");
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(
            paths.for_date(date),
            PathBuf::from("/var/app/storage/logs/info/2024-05/data_base_queries/2024-05-01.log")
        );
    }

    #[test]
    fn test_days_of_one_month_share_a_directory() {
        let paths = LogPath::new("logs", "debug");
        let a = paths.for_date(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        let b = paths.for_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(a.parent(), b.parent());
        assert_ne!(a, b);
    }
}
