//! Aggregator: folds filtered, allocated records into the report views.
//!
//! One pass over the snapshot produces:
//!   1. Grand total + 8 bucket sums
//!   2. By-employee pivot (keyed by manager, or display manager)
//!   3. By-group pivot
//!   4. Sales pivot, flattened by salesman slice
//! plus the trace (detail) list and the flattened sales lines.
//!
//! In the sales pivot a customer with several slices appears once per
//! salesperson, so its counts add up to more than the customer count,
//! and its money total matches the grand total only when every
//! customer's slices reconcile with its total. That is expected.
//!
//! Pivots are sorted by total descending, ties by key ascending, so
//! reports and exports are reproducible.

use crate::{
    allocation::effective_amounts,
    bucket::BucketMap,
    config::{EmployeeKeyPolicy, EngineConfig},
    error::AgingResult,
    filter::{matches, FilterSelection, SegmentClassifier},
    record::CustomerDebtRecord,
    types::{Amount, CustomerCode, OverdueDays},
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: String,
    pub label: String,
    /// Distinct customer codes contributing to the row.
    pub count: usize,
    pub total: Amount,
    pub buckets: BucketMap,
}

impl AggregateRow {
    pub fn past_due(&self) -> Amount {
        self.buckets.past_due()
    }

    pub fn reconciles(&self, tolerance: Amount) -> bool {
        self.buckets.reconciles_with(self.total, tolerance)
    }
}

/// A matched customer with both its full and its attributable debt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    #[serde(flatten)]
    pub record: CustomerDebtRecord,
    pub segment: String,
    pub display_manager: String,
    pub effective_total: Amount,
    pub effective_buckets: BucketMap,
}

/// One (salesperson, customer) line of the flattened sales view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesLine {
    pub salesperson: String,
    pub customer_code: CustomerCode,
    pub customer_name: String,
    pub group: String,
    pub overdue_days: OverdueDays,
    /// The customer's full, unfiltered debt.
    pub customer_total: Amount,
    pub amount: Amount,
    pub buckets: BucketMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportDiagnostics {
    pub records_in: usize,
    pub records_matched: usize,
    /// Rows (grand total included) whose buckets don't sum to their total.
    pub unreconciled_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingReport {
    pub grand_total: AggregateRow,
    pub by_employee: Vec<AggregateRow>,
    pub by_group: Vec<AggregateRow>,
    pub by_salesperson: Vec<AggregateRow>,
    pub trace: Vec<TraceRecord>,
    pub sales_lines: Vec<SalesLine>,
    pub diagnostics: ReportDiagnostics,
}

impl AgingReport {
    /// Sum of the unfiltered totals of every matched customer.
    pub fn unfiltered_total(&self) -> Amount {
        self.trace.iter().map(|t| t.record.total_debt).sum()
    }
}

// ── Accumulation ─────────────────────────────────────────────────────────────

/// Distinct-customer key: the customer code, or the row position for a
/// record that arrived without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CustomerKey<'r> {
    Code(&'r str),
    Row(usize),
}

impl<'r> CustomerKey<'r> {
    fn of(row: usize, record: &'r CustomerDebtRecord) -> Self {
        match record.customer_code.as_str() {
            "" => CustomerKey::Row(row),
            code => CustomerKey::Code(code),
        }
    }
}

#[derive(Default)]
struct Acc<'r> {
    customers: BTreeSet<CustomerKey<'r>>,
    total: Amount,
    buckets: BucketMap,
}

impl<'r> Acc<'r> {
    fn add(&mut self, customer: CustomerKey<'r>, total: Amount, buckets: &BucketMap) {
        self.customers.insert(customer);
        self.total += total;
        self.buckets += buckets;
    }

    fn into_row(self, key: String) -> AggregateRow {
        AggregateRow {
            label: key.clone(),
            key,
            count: self.customers.len(),
            total: self.total,
            buckets: self.buckets,
        }
    }
}

fn into_sorted_rows(groups: BTreeMap<String, Acc<'_>>) -> Vec<AggregateRow> {
    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(key, acc)| acc.into_row(key))
        .collect();
    sort_rows(&mut rows);
    rows
}

/// Total descending, key ascending.
pub fn sort_rows(rows: &mut [AggregateRow]) {
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
}

/// The name a record is shown under when an employee filter is active:
/// the single selected person it matched, or "(N) employees".
pub fn display_manager(record: &CustomerDebtRecord, selection: &FilterSelection) -> String {
    if !selection.has_employee_filter() || !record.has_breakdown() {
        return record.manager.clone();
    }
    let matched: BTreeSet<&str> = record
        .salesman_breakdown
        .iter()
        .map(|s| s.salesperson_name.as_str())
        .filter(|name| selection.employees.contains(*name))
        .collect();
    match matched.len() {
        0 => record.manager.clone(),
        1 => matched.into_iter().next().unwrap_or_default().to_string(),
        n => format!("({n}) employees"),
    }
}

// ── Core function ────────────────────────────────────────────────────────────

/// Filter, allocate and aggregate a record snapshot.
pub fn aggregate(
    records: &[CustomerDebtRecord],
    selection: &FilterSelection,
    classifier: &dyn SegmentClassifier,
    config: &EngineConfig,
) -> AgingResult<AgingReport> {
    let tolerance = config.tolerance;
    let filtered = selection.has_employee_filter();

    let mut grand = Acc::default();
    let mut by_employee: BTreeMap<String, Acc<'_>> = BTreeMap::new();
    let mut by_group: BTreeMap<String, Acc<'_>> = BTreeMap::new();
    let mut by_salesperson: BTreeMap<String, Acc<'_>> = BTreeMap::new();
    let mut trace = Vec::new();
    let mut sales_lines = Vec::new();

    let mut records_matched = 0;

    for (row, record) in records.iter().enumerate() {
        if !matches(record, selection, classifier) {
            continue;
        }
        records_matched += 1;
        let customer = CustomerKey::of(row, record);
        let eff = effective_amounts(record, selection, tolerance)?;

        grand.add(customer, eff.total, &eff.buckets);

        let shown_as = display_manager(record, selection);
        let employee_key = match config.employee_key {
            EmployeeKeyPolicy::Manager => record.manager.clone(),
            EmployeeKeyPolicy::DisplayManager => shown_as.clone(),
        };
        by_employee
            .entry(employee_key)
            .or_default()
            .add(customer, eff.total, &eff.buckets);

        by_group
            .entry(record.group.clone())
            .or_default()
            .add(customer, eff.total, &eff.buckets);

        // Flatten into sales lines.
        let mut line = |salesperson: &str, amount: Amount, buckets: BucketMap| {
            by_salesperson
                .entry(salesperson.to_string())
                .or_default()
                .add(customer, amount, &buckets);
            sales_lines.push(SalesLine {
                salesperson: salesperson.to_string(),
                customer_code: record.customer_code.clone(),
                customer_name: record.customer_name.clone(),
                group: record.group.clone(),
                overdue_days: record.overdue_days,
                customer_total: record.total_debt,
                amount,
                buckets,
            });
        };
        if !record.has_breakdown() {
            line(&record.manager, eff.total, eff.buckets);
        } else if filtered {
            for slice in &eff.slices {
                line(&slice.salesperson_name, slice.amount, slice.bucket_breakdown);
            }
        } else {
            for slice in &record.salesman_breakdown {
                line(&slice.salesperson_name, slice.amount, slice.bucket_breakdown);
            }
        }

        trace.push(TraceRecord {
            record: record.clone(),
            segment: classifier.segment_of(record),
            display_manager: shown_as,
            effective_total: eff.total,
            effective_buckets: eff.buckets,
        });
    }

    let mut grand_total = grand.into_row("total".into());
    grand_total.label = "Total".into();

    let by_employee = into_sorted_rows(by_employee);
    let by_group = into_sorted_rows(by_group);
    let by_salesperson = into_sorted_rows(by_salesperson);

    trace.sort_by(|a, b| {
        b.effective_total
            .cmp(&a.effective_total)
            .then_with(|| a.record.customer_code.cmp(&b.record.customer_code))
    });
    sales_lines.sort_by(|a, b| {
        a.salesperson
            .cmp(&b.salesperson)
            .then_with(|| b.amount.cmp(&a.amount))
            .then_with(|| a.customer_code.cmp(&b.customer_code))
    });

    let unreconciled_rows = std::iter::once(&grand_total)
        .chain(&by_employee)
        .chain(&by_group)
        .chain(&by_salesperson)
        .filter(|row| !row.reconciles(tolerance))
        .inspect(|row| {
            log::warn!(
                "aggregate: row '{}' buckets {} != total {}",
                row.key,
                row.buckets.sum(),
                row.total,
            )
        })
        .count();

    log::debug!(
        "aggregate: {} of {} records matched, grand total {}",
        records_matched,
        records.len(),
        grand_total.total,
    );

    Ok(AgingReport {
        grand_total,
        by_employee,
        by_group,
        by_salesperson,
        trace,
        sales_lines,
        diagnostics: ReportDiagnostics {
            records_in: records.len(),
            records_matched,
            unreconciled_rows,
        },
    })
}
