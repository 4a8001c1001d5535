//! Aggregation: grand total, pivots, reconciliation and ordering.

use debtrisk_core::{
    aggregate, config::EmployeeKeyPolicy, distribute, AgingReport, Bucket, CustomerDebtRecord,
    EngineConfig, FilterSelection, KeywordSegmentClassifier, SalesmanSlice,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn record(
    code: &str,
    group: &str,
    manager: &str,
    total: Decimal,
    days: i64,
    slices: &[(&str, Decimal)],
) -> CustomerDebtRecord {
    CustomerDebtRecord {
        customer_code: code.into(),
        customer_name: format!("Customer {code}"),
        group: group.into(),
        manager: manager.into(),
        total_debt: total,
        overdue_days: days,
        bucket_breakdown: distribute(total, days),
        salesman_breakdown: slices
            .iter()
            .map(|(name, amount)| SalesmanSlice {
                salesperson_name: name.to_string(),
                amount: *amount,
                bucket_breakdown: distribute(*amount, days),
            })
            .collect(),
    }
}

/// A: 500k at 5 days under Linh. B: 2M at 95 days under Hoa, split
/// Hoa 1.2M / Minh 800k. C: settled.
fn scenario() -> Vec<CustomerDebtRecord> {
    vec![
        record("A", "Retail", "Linh", dec!(500000), 5, &[]),
        record(
            "B",
            "Hospital",
            "Hoa",
            dec!(2000000),
            95,
            &[("Hoa", dec!(1200000)), ("Minh", dec!(800000))],
        ),
        record("C", "Retail", "Linh", dec!(0), 0, &[]),
    ]
}

fn run(records: &[CustomerDebtRecord], selection: &FilterSelection) -> AgingReport {
    run_with(records, selection, &EngineConfig::default())
}

fn run_with(
    records: &[CustomerDebtRecord],
    selection: &FilterSelection,
    config: &EngineConfig,
) -> AgingReport {
    let classifier = KeywordSegmentClassifier::from_config(config);
    aggregate(records, selection, &classifier, config).expect("aggregate succeeds")
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Unfiltered totals land in the right buckets.
#[test]
fn unfiltered_grand_total() {
    let report = run(&scenario(), &FilterSelection::all());
    let grand = &report.grand_total;
    assert_eq!(grand.total, dec!(2500000));
    assert_eq!(grand.buckets[Bucket::D3To7], dec!(500000));
    assert_eq!(grand.buckets[Bucket::DGt90], dec!(2000000));
    assert_eq!(grand.buckets.past_due(), dec!(2500000));
    assert_eq!(grand.count, 3);
    assert_eq!(report.diagnostics.records_matched, 3);
    assert_eq!(report.diagnostics.unreconciled_rows, 0);
}

/// Selecting one salesperson of a shared customer yields only their slice.
#[test]
fn single_salesperson_filter() {
    let sel = FilterSelection::all().with_employees(["Minh"]);
    let report = run(&scenario(), &sel);
    assert_eq!(report.grand_total.total, dec!(800000));
    assert_eq!(report.grand_total.buckets[Bucket::DGt90], dec!(800000));
    assert_eq!(report.trace.len(), 1);
    assert_eq!(report.trace[0].record.customer_code, "B");
    assert_eq!(report.trace[0].effective_total, dec!(800000));
    assert_eq!(report.trace[0].record.total_debt, dec!(2000000), "full debt kept for trace");
    assert_eq!(report.trace[0].display_manager, "Minh");
}

/// Every pivot row and the grand total reconcile bucket-to-total.
#[test]
fn rows_reconcile() {
    for sel in [
        FilterSelection::all(),
        FilterSelection::all().with_employees(["Hoa"]),
        FilterSelection::all().with_employees(["Linh", "Minh"]),
        FilterSelection::all().with_groups(["Retail"]),
    ] {
        let report = run(&scenario(), &sel);
        assert!(report.grand_total.reconciles(Decimal::ONE), "grand for {sel:?}");
        for row in report.by_employee.iter().chain(&report.by_group) {
            assert_eq!(row.buckets.sum(), row.total, "row {} for {sel:?}", row.key);
        }
    }
}

/// Group pivot sums to the grand total.
#[test]
fn group_pivot_sums_to_grand_total() {
    let sel = FilterSelection::all().with_employees(["Hoa", "Linh"]);
    let report = run(&scenario(), &sel);
    let sum: Decimal = report.by_group.iter().map(|r| r.total).sum();
    assert_eq!(sum, report.grand_total.total);
    assert_eq!(report.grand_total.total, dec!(1700000));
}

/// Employee pivot keyed by manager, sorted by total descending.
#[test]
fn employee_pivot_by_manager() {
    let report = run(&scenario(), &FilterSelection::all());
    let keys: Vec<_> = report.by_employee.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["Hoa", "Linh"]);
    assert_eq!(report.by_employee[1].count, 2, "Linh owns A and C");
}

/// Ties on total break by key ascending.
#[test]
fn ties_break_by_key() {
    let records = vec![
        record("X", "Zeta", "M", dec!(100), 1, &[]),
        record("Y", "Alpha", "M", dec!(100), 1, &[]),
        record("Z", "Mid", "M", dec!(300), 1, &[]),
    ];
    let report = run(&records, &FilterSelection::all());
    let keys: Vec<_> = report.by_group.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["Mid", "Alpha", "Zeta"]);
}

/// The sales pivot lists a shared customer once per salesperson.
#[test]
fn sales_pivot_flattens_slices() {
    let report = run(&scenario(), &FilterSelection::all());
    let minh = report.by_salesperson.iter().find(|r| r.key == "Minh").unwrap();
    assert_eq!(minh.total, dec!(800000));
    let hoa = report.by_salesperson.iter().find(|r| r.key == "Hoa").unwrap();
    assert_eq!(hoa.total, dec!(1200000));
    let linh = report.by_salesperson.iter().find(|r| r.key == "Linh").unwrap();
    assert_eq!(linh.count, 2);
    assert_eq!(report.sales_lines.len(), 4);
    let sum: Decimal = report.by_salesperson.iter().map(|r| r.total).sum();
    assert_eq!(sum, report.grand_total.total);
}

/// With an employee filter, the sales pivot keeps only matching slices.
#[test]
fn sales_pivot_respects_employee_filter() {
    let sel = FilterSelection::all().with_employees(["Minh", "Linh"]);
    let report = run(&scenario(), &sel);
    let keys: Vec<_> = report.by_salesperson.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["Minh", "Linh"]);
    assert_eq!(report.grand_total.total, dec!(1300000));
}

/// Same input, same output.
#[test]
fn aggregation_is_idempotent() {
    let records = scenario();
    let sel = FilterSelection::all().with_groups(["Hospital", "Retail"]);
    assert_eq!(run(&records, &sel), run(&records, &sel));
}

/// An empty result is a valid, all-zero report.
#[test]
fn empty_result_is_zero_report() {
    let sel = FilterSelection::all().with_groups(["Nowhere"]);
    let report = run(&scenario(), &sel);
    assert!(report.grand_total.total.is_zero());
    assert!(report.grand_total.buckets.is_zero());
    assert_eq!(report.grand_total.count, 0);
    assert!(report.by_employee.is_empty());
    assert!(report.trace.is_empty());
}

/// The display-manager policy keys the employee pivot by the matched person.
#[test]
fn display_manager_policy() {
    let config = EngineConfig {
        employee_key: EmployeeKeyPolicy::DisplayManager,
        ..EngineConfig::default()
    };
    let sel = FilterSelection::all().with_employees(["Minh"]);
    let report = run_with(&scenario(), &sel, &config);
    assert_eq!(report.by_employee.len(), 1);
    assert_eq!(report.by_employee[0].key, "Minh");

    let sel = FilterSelection::all().with_employees(["Hoa", "Minh"]);
    let report = run_with(&scenario(), &sel, &config);
    assert_eq!(report.by_employee[0].key, "(2) employees");
    assert_eq!(report.by_employee[0].total, dec!(2000000));
}

/// Mismatched input rows are counted, not corrected.
#[test]
fn unreconciled_rows_are_counted() {
    let mut records = scenario();
    records[0].bucket_breakdown[Bucket::Future] += dec!(10);
    let report = run(&records, &FilterSelection::all());
    assert!(report.diagnostics.unreconciled_rows > 0);
    assert_eq!(report.grand_total.total, dec!(2500000));
    assert_eq!(report.grand_total.buckets.sum(), dec!(2500010));
}

/// Two upstream rows for one customer code count as one customer.
#[test]
fn duplicate_codes_count_once() {
    let records = vec![
        record("D", "Retail", "Linh", dec!(100), 5, &[]),
        record("D", "Retail", "Linh", dec!(50), 40, &[]),
        record("E", "Retail", "Linh", dec!(10), 5, &[]),
    ];
    let report = run(&records, &FilterSelection::all());
    assert_eq!(report.grand_total.count, 2);
    assert_eq!(report.by_group[0].count, 2);
    assert_eq!(report.grand_total.total, dec!(160), "both rows still add up");
    assert_eq!(report.diagnostics.records_matched, 3, "rows, not customers");
}

/// Records without a code are never merged with each other.
#[test]
fn uncoded_rows_count_separately() {
    let records = vec![
        record("", "Retail", "Linh", dec!(1), 5, &[]),
        record("", "Retail", "Linh", dec!(2), 5, &[]),
    ];
    let report = run(&records, &FilterSelection::all());
    assert_eq!(report.grand_total.count, 2);
}
