//! Report rows: flat, ordered cells for a table renderer or a
//! spreadsheet writer. Field ordering and naming only; no business logic.
//!
//! Column layout (every sheet):
//!   code | name | responsible | total | total_allocated | 8 bucket columns

use crate::{
    aggregator::{AggregateRow, AgingReport, SalesLine, TraceRecord},
    bucket::{Bucket, BucketMap},
    filter::FilterSelection,
    types::Amount,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportCell {
    Text(String),
    Amount(Amount),
    Count(usize),
}

impl ReportCell {
    pub fn as_amount(&self) -> Option<Amount> {
        match self {
            ReportCell::Amount(a) => Some(*a),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportCell::Text(s) => f.write_str(s),
            ReportCell::Amount(a) => write!(f, "{a}"),
            ReportCell::Count(n) => write!(f, "{n}"),
        }
    }
}

pub type ReportRow = Vec<ReportCell>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSheet {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub total_row: ReportRow,
}

/// Index of the first bucket column.
pub const FIRST_BUCKET_COLUMN: usize = 5;
pub const TOTAL_COLUMN: usize = 3;
pub const ALLOCATED_COLUMN: usize = 4;

pub struct ReportRowBuilder;

impl ReportRowBuilder {
    pub fn header() -> Vec<String> {
        ["code", "name", "responsible", "total", "total_allocated"]
            .iter()
            .map(|s| s.to_string())
            .chain(Bucket::ALL.iter().map(|b| b.key().to_string()))
            .collect()
    }

    fn row(
        code: ReportCell,
        name: &str,
        responsible: ReportCell,
        total: Amount,
        allocated: Amount,
        buckets: &BucketMap,
    ) -> ReportRow {
        let mut row = vec![
            code,
            ReportCell::Text(name.to_string()),
            responsible,
            ReportCell::Amount(total),
            ReportCell::Amount(allocated),
        ];
        row.extend(buckets.iter().map(|(_, a)| ReportCell::Amount(a)));
        row
    }

    /// Pivot row: code = key, name = label, responsible = customer count.
    pub fn from_aggregate(row: &AggregateRow) -> ReportRow {
        Self::row(
            ReportCell::Text(row.key.clone()),
            &row.label,
            ReportCell::Count(row.count),
            row.total,
            row.total,
            &row.buckets,
        )
    }

    /// Detail row: full customer debt next to the allocated share.
    pub fn from_trace(trace: &TraceRecord) -> ReportRow {
        Self::row(
            ReportCell::Text(trace.record.customer_code.clone()),
            &trace.record.customer_name,
            ReportCell::Text(trace.display_manager.clone()),
            trace.record.total_debt,
            trace.effective_total,
            &trace.effective_buckets,
        )
    }

    pub fn from_sales_line(line: &SalesLine) -> ReportRow {
        Self::row(
            ReportCell::Text(line.customer_code.clone()),
            &line.customer_name,
            ReportCell::Text(line.salesperson.clone()),
            line.customer_total,
            line.amount,
            &line.buckets,
        )
    }

    fn total_row(
        label: &str,
        count: usize,
        total: Amount,
        allocated: Amount,
        buckets: &BucketMap,
    ) -> ReportRow {
        Self::row(
            ReportCell::Text(label.to_string()),
            "",
            ReportCell::Count(count),
            total,
            allocated,
            buckets,
        )
    }

    /// One row per matched customer. The total row's allocated and bucket
    /// cells equal the report's grand total.
    pub fn trace_sheet(report: &AgingReport) -> ReportSheet {
        let grand = &report.grand_total;
        ReportSheet {
            title: "trace".into(),
            header: Self::header(),
            rows: report.trace.iter().map(Self::from_trace).collect(),
            total_row: Self::total_row(
                "TOTAL",
                grand.count,
                report.unfiltered_total(),
                grand.total,
                &grand.buckets,
            ),
        }
    }

    /// One row per (salesperson, customer) line. The total row equals
    /// the sales-pivot total.
    pub fn sales_sheet(report: &AgingReport) -> ReportSheet {
        let buckets: BucketMap = report.sales_lines.iter().map(|l| &l.buckets).sum();
        let allocated: Amount = report.sales_lines.iter().map(|l| l.amount).sum();
        ReportSheet {
            title: "sales".into(),
            header: Self::header(),
            rows: report.sales_lines.iter().map(Self::from_sales_line).collect(),
            total_row: Self::total_row(
                "TOTAL",
                report.sales_lines.len(),
                report.unfiltered_total(),
                allocated,
                &buckets,
            ),
        }
    }

    /// One row per pivot row; the total row is the sum of the pivot.
    pub fn pivot_sheet(title: &str, rows: &[AggregateRow]) -> ReportSheet {
        let total: Amount = rows.iter().map(|r| r.total).sum();
        let buckets: BucketMap = rows.iter().map(|r| &r.buckets).sum();
        let count = rows.iter().map(|r| r.count).sum();
        ReportSheet {
            title: title.to_string(),
            header: Self::header(),
            rows: rows.iter().map(Self::from_aggregate).collect(),
            total_row: Self::total_row("TOTAL", count, total, total, &buckets),
        }
    }

    /// Every sheet of a report, in export order.
    pub fn all_sheets(report: &AgingReport) -> Vec<ReportSheet> {
        vec![
            Self::trace_sheet(report),
            Self::sales_sheet(report),
            Self::pivot_sheet("by_employee", &report.by_employee),
            Self::pivot_sheet("by_group", &report.by_group),
            Self::pivot_sheet("by_salesperson", &report.by_salesperson),
        ]
    }
}

/// Relabel by-employee rows for display: a single selected employee
/// replaces every label with that name, several become "(N) employees".
/// Keys and amounts are untouched.
pub fn relabel_employee_rows(
    rows: &[AggregateRow],
    selection: &FilterSelection,
) -> Vec<AggregateRow> {
    let label = match selection.employees.len() {
        0 => None,
        1 => selection.employees.iter().next().cloned(),
        n => Some(format!("({n}) employees")),
    };
    rows.iter()
        .map(|row| AggregateRow {
            label: label.clone().unwrap_or_else(|| row.label.clone()),
            ..row.clone()
        })
        .collect()
}
