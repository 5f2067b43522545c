//! Data-quality report: what the cleaner found and fixed, per table.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::model::RawTable;
use crate::schema::TableKind;
use crate::stats::{pct, round2};

/// Kind of data-quality issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    InvalidDate,
    InvalidNumber,
    MissingValue,
    Duplicates,
    Outliers,
    NegativeValues,
    UnmappedCity,
    UnknownCategory,
    UnknownChannel,
    StockAnomaly,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::InvalidDate => "INVALID_DATE",
            IssueKind::InvalidNumber => "INVALID_NUMBER",
            IssueKind::MissingValue => "MISSING_VALUE",
            IssueKind::Duplicates => "DUPLICATES",
            IssueKind::Outliers => "OUTLIERS",
            IssueKind::NegativeValues => "NEGATIVE_VALUES",
            IssueKind::UnmappedCity => "UNMAPPED_CITY",
            IssueKind::UnknownCategory => "UNKNOWN_CATEGORY",
            IssueKind::UnknownChannel => "UNKNOWN_CHANNEL",
            IssueKind::StockAnomaly => "STOCK_ANOMALY",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected issue with its row count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityIssue {
    pub table: TableKind,
    pub kind: IssueKind,
    pub description: String,
    pub affected_rows: usize,
    /// Share of the table's input rows, in percent.
    pub pct: f64,
}

/// Shape and completeness of a raw table before cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    pub completeness_pct: f64,
    pub duplicate_rows: usize,
}

impl TableSummary {
    pub fn of(table: &RawTable) -> Self {
        let cells = table.len() * table.columns.len();
        let missing_cells = table.missing_cells();
        let completeness_pct = if cells == 0 {
            100.0
        } else {
            round2(100.0 - pct(missing_cells as f64, cells as f64))
        };
        Self {
            rows: table.len(),
            columns: table.columns.len(),
            missing_cells,
            completeness_pct,
            duplicate_rows: table.duplicate_rows(),
        }
    }
}

/// Cleaning outcome for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub table: TableKind,
    pub input_rows: usize,
    pub output_rows: usize,
    pub duplicates_removed: usize,
    pub summary: TableSummary,
    pub issues: Vec<QualityIssue>,
}

impl TableReport {
    pub fn issue(&self, kind: IssueKind) -> Option<&QualityIssue> {
        self.issues.iter().find(|i| i.kind == kind)
    }

    /// Rows affected by issues of `kind`, summed over columns.
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues
            .iter()
            .filter(|i| i.kind == kind)
            .map(|i| i.affected_rows)
            .sum()
    }
}

/// Reports for every cleaned table, in [`TableKind::ALL`] order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub tables: Vec<TableReport>,
}

impl QualityReport {
    /// Insert or replace the report for a table.
    pub fn upsert(&mut self, report: TableReport) {
        self.tables.retain(|t| t.table != report.table);
        self.tables.push(report);
        self.tables.sort_by_key(|t| t.table);
    }

    pub fn get(&self, table: TableKind) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn issues(&self) -> impl Iterator<Item = &QualityIssue> {
        self.tables.iter().flat_map(|t| t.issues.iter())
    }

    pub fn total_affected_rows(&self) -> usize {
        self.issues().map(|i| i.affected_rows).sum()
    }

    pub fn total_duplicates_removed(&self) -> usize {
        self.tables.iter().map(|t| t.duplicates_removed).sum()
    }

    /// Affected rows per issue kind across all tables.
    pub fn counts_by_kind(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts = BTreeMap::new();
        for issue in self.issues() {
            *counts.entry(issue.kind).or_insert(0) += issue.affected_rows;
        }
        counts
    }
}

/// Collects issues for one table while it is being cleaned.
pub(crate) struct IssueTally {
    table: TableKind,
    input_rows: usize,
    issues: Vec<QualityIssue>,
}

impl IssueTally {
    pub(crate) fn new(table: TableKind, input_rows: usize) -> Self {
        Self {
            table,
            input_rows,
            issues: Vec::new(),
        }
    }

    /// Record an issue; zero counts are dropped.
    pub(crate) fn record(&mut self, kind: IssueKind, affected_rows: usize, description: impl Into<String>) {
        if affected_rows == 0 {
            return;
        }
        self.issues.push(QualityIssue {
            table: self.table,
            kind,
            description: description.into(),
            affected_rows,
            pct: round2(pct(affected_rows as f64, self.input_rows as f64)),
        });
    }

    pub(crate) fn finish(
        self,
        raw: &RawTable,
        output_rows: usize,
        duplicates_removed: usize,
    ) -> TableReport {
        TableReport {
            table: self.table,
            input_rows: self.input_rows,
            output_rows,
            duplicates_removed,
            summary: TableSummary::of(raw),
            issues: self.issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(table: TableKind, issues: &[(IssueKind, usize)]) -> TableReport {
        let raw = RawTable::new(table, vec!["a".to_string()]);
        let mut tally = IssueTally::new(table, 200);
        for (kind, count) in issues {
            tally.record(*kind, *count, "test");
        }
        tally.finish(&raw, 200, 0)
    }

    #[test]
    fn test_tally_drops_zero_counts_and_computes_pct() {
        let report = report(
            TableKind::Sales,
            &[(IssueKind::InvalidDate, 3), (IssueKind::Outliers, 0)],
        );
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].pct, 1.5);
        assert_eq!(report.count(IssueKind::Outliers), 0);
    }

    #[test]
    fn test_upsert_replaces_and_orders() {
        let mut quality = QualityReport::default();
        quality.upsert(report(TableKind::Sales, &[(IssueKind::Duplicates, 4)]));
        quality.upsert(report(TableKind::Products, &[(IssueKind::MissingValue, 2)]));
        quality.upsert(report(TableKind::Sales, &[(IssueKind::Duplicates, 1)]));

        assert_eq!(quality.tables.len(), 2);
        assert_eq!(quality.tables[0].table, TableKind::Products);
        assert_eq!(quality.total_affected_rows(), 3);
        assert_eq!(quality.counts_by_kind()[&IssueKind::Duplicates], 1);
    }

    #[test]
    fn test_summary_completeness() {
        let mut raw = RawTable::new(TableKind::Stores, vec!["a".into(), "b".into()]);
        raw.push_row(vec!["x".into(), "".into()]);
        raw.push_row(vec!["x".into(), "y".into()]);
        let summary = TableSummary::of(&raw);
        assert_eq!(summary.missing_cells, 1);
        assert_eq!(summary.completeness_pct, 75.0);
    }

    #[test]
    fn test_issue_kind_serializes_screaming() {
        let json = serde_json::to_string(&IssueKind::UnmappedCity).unwrap();
        assert_eq!(json, "\"UNMAPPED_CITY\"");
    }
}
