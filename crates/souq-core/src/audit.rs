//! Bounded in-process activity log.
//!
//! Every entry is also emitted through `tracing`, so the log is a queryable
//! copy of what the pipeline did during this run.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::clean::TableReport;

/// Log timestamps are kept to whole seconds.
const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Oldest entries are dropped beyond this many.
pub const MAX_LOG_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogCategory {
    DataInput,
    DataCleaning,
    Analysis,
    Export,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::DataInput => "DATA_INPUT",
            LogCategory::DataCleaning => "DATA_CLEANING",
            LogCategory::Analysis => "ANALYSIS",
            LogCategory::Export => "EXPORT",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub level: LogLevel,
    pub category: LogCategory,
    pub message: String,
    pub details: Value,
}

impl LogEntry {
    pub const COLUMNS: [&'static str; 5] = ["timestamp", "level", "category", "message", "details"];

    /// Cells in [`LogEntry::COLUMNS`] order; details as compact JSON.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.format(LOG_TIMESTAMP_FORMAT).to_string(),
            self.level.to_string(),
            self.category.to_string(),
            self.message.clone(),
            self.details.to_string(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn log(&mut self, level: LogLevel, category: LogCategory, message: impl Into<String>, details: Value) {
        let message = message.into();
        match level {
            LogLevel::Info => info!(category = %category, %details, "{message}"),
            LogLevel::Warning => warn!(category = %category, %details, "{message}"),
            LogLevel::Error => error!(category = %category, %details, "{message}"),
        }

        self.entries.push_back(LogEntry {
            timestamp: Local::now().naive_local(),
            level,
            category,
            message,
            details,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn info(&mut self, category: LogCategory, message: impl Into<String>, details: Value) {
        self.log(LogLevel::Info, category, message, details);
    }

    pub fn warning(&mut self, category: LogCategory, message: impl Into<String>, details: Value) {
        self.log(LogLevel::Warning, category, message, details);
    }

    pub fn error(&mut self, category: LogCategory, message: impl Into<String>, details: Value) {
        self.log(LogLevel::Error, category, message, details);
    }

    /// Log a cleaning summary plus one warning per detected issue.
    pub fn record_cleaning(&mut self, report: &TableReport) {
        self.info(
            LogCategory::DataCleaning,
            format!("cleaned {}", report.table),
            json!({
                "input_rows": report.input_rows,
                "output_rows": report.output_rows,
                "duplicates_removed": report.duplicates_removed,
            }),
        );
        for issue in &report.issues {
            self.warning(
                LogCategory::DataCleaning,
                issue.description.clone(),
                json!({
                    "dataset": issue.table,
                    "issue_type": issue.kind,
                    "affected_rows": issue.affected_rows,
                    "pct": issue.pct,
                }),
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// The most recent `limit` entries matching the optional filters, oldest first.
    pub fn query(&self, level: Option<LogLevel>, category: Option<LogCategory>, limit: usize) -> Vec<&LogEntry> {
        let matching: Vec<&LogEntry> = self
            .entries
            .iter()
            .filter(|e| level.is_none_or(|l| e.level == l))
            .filter(|e| category.is_none_or(|c| e.category == c))
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).collect()
    }

    pub fn counts_by_level(&self) -> BTreeMap<LogLevel, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.level).or_insert(0) += 1;
        }
        counts
    }

    pub fn counts_by_category(&self) -> BTreeMap<LogCategory, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.category).or_insert(0) += 1;
        }
        counts
    }
}
