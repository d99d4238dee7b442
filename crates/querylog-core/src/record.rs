//! Normalized per-query records.

use crate::call_site::CallSite;
use crate::event::{Binding, QueryExecuted};
use serde::{Deserialize, Serialize};

/// One executed query as stored inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// 1-based position within the batch.
    #[serde(rename = "sl")]
    pub sequence: usize,

    #[serde(rename = "query")]
    pub sql_template: String,

    pub bindings: Vec<Binding>,

    #[serde(rename = "final_query")]
    pub rendered_sql: String,

    #[serde(rename = "time")]
    pub duration_ms: f64,

    /// `duration_ms` rounded to three decimals.
    pub time_precise: f64,

    /// `<file>:<line>` of the application frame that issued the query.
    #[serde(rename = "file")]
    pub call_site: String,

    pub line: u32,

    #[serde(rename = "connection")]
    pub connection_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Turns raw events into [`QueryRecord`]s. Stateless apart from the environment stamp.
#[derive(Debug, Clone, Default)]
pub struct QueryRecordBuilder {
    environment: Option<String>,
}

impl QueryRecordBuilder {
    pub fn new(environment: Option<String>) -> Self {
        Self { environment }
    }

    /// Non-finite durations are stored as `0.0`; JSON has no NaN or infinity.
    pub fn build(&self, sequence: usize, event: &QueryExecuted, call_site: &CallSite) -> QueryRecord {
        let duration_ms = if event.duration_ms.is_finite() {
            event.duration_ms
        } else {
            tracing::warn!(
                duration_ms = event.duration_ms,
                "Non-finite query duration recorded as 0"
            );
            0.0
        };

        QueryRecord {
            sequence,
            sql_template: event.sql.clone(),
            bindings: event.bindings.clone(),
            rendered_sql: render_sql(&event.sql, &event.bindings),
            duration_ms,
            time_precise: (duration_ms * 1000.0).round() / 1000.0,
            call_site: call_site.to_string(),
            line: call_site.line,
            connection_name: event.connection.clone(),
            environment: self.environment.clone(),
        }
    }
}

/// Substitute each `?` left to right with its binding; numbers bare, text single-quoted.
///
/// Rendering is all-or-nothing: when the placeholder count differs from the
/// binding count the template is returned untouched.
pub fn render_sql(template: &str, bindings: &[Binding]) -> String {
    let placeholders = template.matches('?').count();
    if placeholders != bindings.len() {
        tracing::debug!(
            placeholders,
            bindings = bindings.len(),
            "Placeholder/binding count mismatch, keeping unrendered SQL"
        );
        return template.to_string();
    }

    let mut rendered = String::with_capacity(template.len() + bindings.len() * 8);
    let mut values = bindings.iter();
    for ch in template.chars() {
        if ch != '?' {
            rendered.push(ch);
            continue;
        }
        match values.next() {
            Some(b) if b.is_numeric() => rendered.push_str(&b.to_string()),
            Some(b) => {
                rendered.push('\'');
                rendered.push_str(&b.to_string());
                rendered.push('\'');
            }
            None => rendered.push(ch),
        }
    }
    rendered
}
