//! aging-runner: headless receivables aging report.
//!
//! Usage:
//!   aging-runner --input debts.json
//!   aging-runner --input debts.json --config engine.json --employee Minh --employee Hoa
//!   aging-runner --input debts.json --group Hospital --json
//!   aging-runner --input debts.json --segment state --export-dir ./out

use anyhow::{Context, Result};
use debtrisk_core::{
    aggregator::AggregateRow, filter::FilterOptions, normalizer::NormalizeStats,
    report::relabel_employee_rows, AgingEngine, AgingReport, Bucket, EngineConfig,
    FilterSelection, ReportRowBuilder,
};
use rust_decimal::Decimal;
use std::env;
use std::path::Path;

const TOP_ROWS: usize = 5;

#[derive(serde::Serialize)]
struct JsonOutput<'a> {
    records_version: u64,
    selection: &'a FilterSelection,
    normalize: &'a NormalizeStats,
    options: FilterOptions,
    report: &'a AgingReport,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = flag_value(&args, "--input").context("--input FILE is required")?;
    let config_path = flag_value(&args, "--config");
    let json_mode = args.iter().any(|a| a == "--json");
    let export_dir = flag_value(&args, "--export-dir");

    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let mut selection = FilterSelection::all()
        .with_groups(flag_values(&args, "--group"))
        .with_employees(flag_values(&args, "--employee"))
        .with_segments(flag_values(&args, "--segment"));
    if let Some(search) = flag_value(&args, "--search") {
        selection = selection.with_search(search);
    }

    let raw = std::fs::read_to_string(input)
        .map_err(|e| anyhow::anyhow!("Cannot read {input}: {e}"))?;
    let payload: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Cannot parse {input}: {e}"))?;

    let mut engine = AgingEngine::new(config);
    let version = engine.refresh(&payload)?;
    let options = engine.filter_options();
    let stats = engine.normalize_stats().clone();
    let report = engine.compute(&selection)?;

    if json_mode {
        let out = JsonOutput {
            records_version: version,
            selection: &selection,
            normalize: &stats,
            options,
            report,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(input, &selection, &stats, report);
    }

    if let Some(dir) = export_dir {
        export_csv(Path::new(dir), report)?;
    }

    Ok(())
}

fn print_summary(
    input: &str,
    selection: &FilterSelection,
    stats: &NormalizeStats,
    report: &AgingReport,
) {
    println!("aging-runner: receivables aging report");
    println!("  input:      {input}");
    println!("  groups:     {}", list_or_all(&selection.groups));
    println!("  employees:  {}", list_or_all(&selection.employees));
    println!("  segments:   {}", list_or_all(&selection.segments));
    if let Some(search) = &selection.search {
        println!("  search:     {search}");
    }
    println!();

    let grand = &report.grand_total;
    println!("=== GRAND TOTAL ===");
    println!("  customers:  {}", grand.count);
    println!("  total:      {}", money(grand.total));
    println!("  past due:   {}", money(grand.past_due()));
    for bucket in Bucket::ALL {
        println!("  {:<10}  {}", bucket.key(), money(grand.buckets[bucket]));
    }

    let by_employee = relabel_employee_rows(&report.by_employee, selection);
    print_rows("BY EMPLOYEE", &by_employee);
    print_rows("BY GROUP", &report.by_group);
    print_rows("BY SALESPERSON", &report.by_salesperson);

    println!();
    println!("=== DIAGNOSTICS ===");
    println!("  records seen:       {}", stats.records_seen);
    println!("  records skipped:    {}", stats.records_skipped);
    println!("  records matched:    {}", report.diagnostics.records_matched);
    println!("  bucket mismatches:  {}", stats.bucket_mismatches);
    println!("  slice mismatches:   {}", stats.slice_mismatches);
    println!("  coerced fields:     {}", stats.coerced_fields);
    println!("  unreconciled rows:  {}", report.diagnostics.unreconciled_rows);
}

fn print_rows(title: &str, rows: &[AggregateRow]) {
    println!();
    println!("=== {title} (top {TOP_ROWS} of {}) ===", rows.len());
    if rows.is_empty() {
        println!("  (no matching customers)");
        return;
    }
    for row in rows.iter().take(TOP_ROWS) {
        println!(
            "  {:<24} | {:>4} cust | total {:>18} | past due {:>18}",
            row.label,
            row.count,
            money(row.total),
            money(row.past_due()),
        );
    }
}

fn export_csv(dir: &Path, report: &AgingReport) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    for sheet in ReportRowBuilder::all_sheets(report) {
        let path = dir.join(format!("{}.csv", sheet.title));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        writer.write_record(&sheet.header)?;
        for row in sheet.rows.iter().chain(std::iter::once(&sheet.total_row)) {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer.flush()?;
        log::info!("exported {} rows to {}", sheet.rows.len(), path.display());
    }
    Ok(())
}

fn money(amount: Decimal) -> String {
    amount.round_dp(2).normalize().to_string()
}

fn list_or_all<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = values.into_iter().map(String::as_str).collect();
    if joined.is_empty() {
        "(all)".to_string()
    } else {
        joined.join(", ")
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Every value of a repeatable flag, in order.
fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .collect()
}
