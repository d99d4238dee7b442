//! querylog core — capture, aggregate and persist database query telemetry
//! for one unit of work at a time.
//!
//! # Pipeline
//!
//! - [`QueryLog`] is built once from [`Config`] and hands out a [`UnitOfWork`]
//!   per request.
//! - The host feeds every executed query to [`QueryListener::on_query`] (or
//!   [`scope::report`] inside [`scope::run`]). Queries without an application
//!   frame are skipped.
//! - At teardown [`UnitOfWork::finish`] attaches request metadata and, when
//!   anything was captured, appends the batch to the daily JSON array file.
//!
//! # Example
//!
//! ```rust,no_run
//! use querylog_config::Config;
//! use querylog_core::{Binding, QueryExecuted, QueryListener, QueryLog, RequestContext};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let Some(log) = QueryLog::from_config(&config)? else {
//!         return Ok(());
//!     };
//!
//!     let mut uow = log.begin();
//!     uow.on_query(&QueryExecuted::new(
//!         "select * from users where id = ?",
//!         vec![Binding::from(1)],
//!         2.5,
//!         "mysql",
//!     ));
//!     uow.finish(&RequestContext::new("GET", "https://x/users/1"))?;
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod call_site;
pub mod context;
pub mod event;
pub mod path;
pub mod query_log;
pub mod record;
pub mod scope;
pub mod unit_of_work;
pub mod writer;

pub use aggregator::{BatchAggregator, LogBatch};
pub use call_site::{AppRootResolver, CallSite, CallSiteResolver};
pub use context::{Identity, RequestContext};
pub use event::{Binding, QueryExecuted, StackFrame};
pub use path::LogPath;
pub use query_log::QueryLog;
pub use record::{render_sql, QueryRecord, QueryRecordBuilder};
pub use unit_of_work::{QueryListener, UnitOfWork};
pub use writer::{read_entries, LogFileWriter};

pub use querylog_common::{LogFormat, QueryLogError, Result};
pub use querylog_config::Config;
