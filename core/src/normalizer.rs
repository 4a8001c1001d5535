//! Debt record normalizer: the single ingestion boundary.
//!
//! Upstream sends loosely-typed JSON with several historical spellings
//! for the same field. All of that is resolved here through the alias
//! table in `EngineConfig`; nothing downstream looks at raw JSON.
//!
//! RULES:
//!   - Malformed numbers coerce to zero. Normalization never fails per record.
//!   - A supplied bucket breakdown is trusted as-is, even if it does not
//!     reconcile with the total. Mismatches are counted and logged, not fixed.

use crate::{
    bucket::{distribute, Bucket, BucketMap},
    config::EngineConfig,
    error::{AgingError, AgingResult},
    record::{CustomerDebtRecord, SalesmanSlice},
    types::{amount_in_range, Amount, OverdueDays},
};
use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Data-quality counters gathered while normalizing one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub records_seen: usize,
    pub records_skipped: usize,
    /// Records whose bucket breakdown does not sum to the total debt.
    pub bucket_mismatches: usize,
    /// Records whose slice amounts do not sum to the total debt.
    pub slice_mismatches: usize,
    /// Slices whose own breakdown does not sum to the slice amount.
    pub slice_bucket_mismatches: usize,
    /// Numeric fields that were present but unparseable.
    pub coerced_fields: usize,
}

pub struct Normalizer<'a> {
    config: &'a EngineConfig,
    stats: NormalizeStats,
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            stats: NormalizeStats::default(),
        }
    }

    pub fn stats(&self) -> &NormalizeStats {
        &self.stats
    }

    pub fn into_stats(self) -> NormalizeStats {
        self.stats
    }

    /// Normalize a whole payload: a bare array, or an object wrapping
    /// the array under `data`, `records` or `items`.
    pub fn normalize_payload(&mut self, payload: &Value) -> AgingResult<Vec<CustomerDebtRecord>> {
        let items = match payload {
            Value::Array(items) => items,
            Value::Object(obj) => ["data", "records", "items"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_array))
                .ok_or_else(|| AgingError::InvalidInput {
                    reason: "object payload has no data/records/items array".into(),
                })?,
            other => {
                return Err(AgingError::InvalidInput {
                    reason: format!("expected an array of records, got {}", kind_of(other)),
                })
            }
        };
        Ok(self.normalize_all(items))
    }

    /// Normalize every element; non-object elements are skipped.
    pub fn normalize_all(&mut self, raw: &[Value]) -> Vec<CustomerDebtRecord> {
        let records: Vec<CustomerDebtRecord> =
            raw.iter().filter_map(|v| self.normalize(v)).collect();
        log::debug!(
            "normalizer: {} records in, {} out, {} bucket mismatches",
            self.stats.records_seen,
            records.len(),
            self.stats.bucket_mismatches,
        );
        records
    }

    /// Normalize one raw record. Returns `None` only for non-object input.
    pub fn normalize(&mut self, raw: &Value) -> Option<CustomerDebtRecord> {
        self.stats.records_seen += 1;
        let Some(obj) = raw.as_object() else {
            self.stats.records_skipped += 1;
            log::warn!("normalizer: skipping non-object record ({})", kind_of(raw));
            return None;
        };
        let config = self.config;
        let aliases = &config.aliases;

        let customer_code = text(obj, &aliases.customer_code).unwrap_or_default();
        let customer_name = text(obj, &aliases.customer_name).unwrap_or_default();
        let group = text(obj, &aliases.group).unwrap_or_else(|| config.default_group.clone());
        let manager = text(obj, &aliases.manager).unwrap_or_else(|| config.default_manager.clone());
        let total_debt = self.amount(obj, &aliases.total_debt);
        let overdue_days = self.overdue_days(obj);

        let bucket_breakdown = match lookup(obj, &aliases.bucket_breakdown) {
            Some(Value::Object(map)) => self.bucket_map(map),
            _ => distribute(total_debt, overdue_days),
        };

        let salesman_breakdown = match lookup(obj, &aliases.salesman_breakdown) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| self.slice(item, overdue_days))
                .collect(),
            _ => Vec::new(),
        };

        let record = CustomerDebtRecord {
            customer_code,
            customer_name,
            group,
            manager,
            total_debt,
            overdue_days,
            bucket_breakdown,
            salesman_breakdown,
        };
        self.check(&record);
        Some(record)
    }

    fn slice(&mut self, raw: &Value, overdue_days: OverdueDays) -> Option<SalesmanSlice> {
        let obj = raw.as_object()?;
        let config = self.config;
        let aliases = &config.aliases;
        let salesperson_name = text(obj, &aliases.salesperson_name)
            .unwrap_or_else(|| config.default_manager.clone());
        let amount = self.amount(obj, &aliases.slice_amount);
        let bucket_breakdown = match lookup(obj, &aliases.bucket_breakdown) {
            Some(Value::Object(map)) => self.bucket_map(map),
            _ => distribute(amount, overdue_days),
        };
        Some(SalesmanSlice {
            salesperson_name,
            amount,
            bucket_breakdown,
        })
    }

    fn bucket_map(&mut self, raw: &Map<String, Value>) -> BucketMap {
        let mut map = BucketMap::zero();
        for (key, value) in raw {
            match Bucket::from_key(key) {
                Some(bucket) => map[bucket] += self.coerce(value),
                None => log::debug!("normalizer: ignoring unknown bucket key '{key}'"),
            }
        }
        map
    }

    fn overdue_days(&mut self, obj: &Map<String, Value>) -> OverdueDays {
        let config = self.config;
        if let Some(value) = lookup(obj, &config.aliases.overdue_days) {
            match coerce_amount(value).and_then(|d| d.trunc().to_i64()) {
                Some(days) => return days,
                // Unparseable count: try the due date before giving up.
                None => self.stats.coerced_fields += 1,
            }
        }
        let due = text(obj, &config.aliases.due_date)
            .and_then(|s| NaiveDate::parse_from_str(s.get(..10).unwrap_or(&s), "%Y-%m-%d").ok());
        match (due, config.as_of) {
            (Some(due), Some(as_of)) => (as_of - due).num_days(),
            _ => 0,
        }
    }

    fn amount(&mut self, obj: &Map<String, Value>, keys: &[String]) -> Amount {
        match lookup(obj, keys) {
            Some(value) => self.coerce(value),
            None => Decimal::ZERO,
        }
    }

    fn coerce(&mut self, value: &Value) -> Amount {
        match coerce_amount(value) {
            Some(amount) => amount,
            None => {
                if !value.is_null() {
                    self.stats.coerced_fields += 1;
                }
                Decimal::ZERO
            }
        }
    }

    fn check(&mut self, record: &CustomerDebtRecord) {
        let tolerance = self.config.tolerance;
        if !record.bucket_breakdown.reconciles_with(record.total_debt, tolerance) {
            self.stats.bucket_mismatches += 1;
            log::warn!(
                "customer {}: bucket sum {} != total debt {}",
                record.customer_code,
                record.bucket_breakdown.sum(),
                record.total_debt,
            );
        }
        if record.has_breakdown() {
            if (record.slice_total() - record.total_debt).abs() > tolerance {
                self.stats.slice_mismatches += 1;
                log::warn!(
                    "customer {}: slice sum {} != total debt {}",
                    record.customer_code,
                    record.slice_total(),
                    record.total_debt,
                );
            }
            for slice in &record.salesman_breakdown {
                if !slice.bucket_breakdown.reconciles_with(slice.amount, tolerance) {
                    self.stats.slice_bucket_mismatches += 1;
                    log::warn!(
                        "customer {} / {}: slice bucket sum {} != slice amount {}",
                        record.customer_code,
                        slice.salesperson_name,
                        slice.bucket_breakdown.sum(),
                        slice.amount,
                    );
                }
            }
        }
    }
}

/// Convenience wrapper: normalize a payload with a throwaway normalizer.
pub fn normalize_payload(
    config: &EngineConfig,
    payload: &Value,
) -> AgingResult<(Vec<CustomerDebtRecord>, NormalizeStats)> {
    let mut normalizer = Normalizer::new(config);
    let records = normalizer.normalize_payload(payload)?;
    Ok((records, normalizer.into_stats()))
}

/// Parse a JSON number or numeric string. Thousands separators and
/// surrounding whitespace are tolerated; anything else, or a magnitude
/// above [`crate::types::MAX_AMOUNT_UNITS`], is `None`.
pub fn coerce_amount(value: &Value) -> Option<Amount> {
    let amount = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => Decimal::from_str(&n.to_string())
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        },
        Value::String(s) => parse_amount_text(s),
        _ => None,
    }?;
    amount_in_range(amount).then_some(amount)
}

fn parse_amount_text(raw: &str) -> Option<Amount> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(*c, '_' | ' ' | '\u{a0}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let canonical = if uses_dot_grouping(&cleaned) {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned.replace(',', "")
    };
    Decimal::from_str(&canonical)
        .ok()
        .or_else(|| Decimal::from_scientific(&canonical).ok())
}

/// `1.250.000` and `1.250,5` group thousands with dots and mark decimals
/// with a comma. A lone `1.250` stays a decimal point.
fn uses_dot_grouping(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (int_part, fraction) = match unsigned.split_once(',') {
        Some((int_part, fraction)) => (int_part, Some(fraction)),
        None => (unsigned, None),
    };
    let groups: Vec<&str> = int_part.split('.').collect();
    if groups.len() < 2 || (groups.len() == 2 && fraction.is_none()) {
        return false;
    }
    let all_digits = |g: &str| !g.is_empty() && g.chars().all(|c| c.is_ascii_digit());
    (1..=3).contains(&groups[0].len())
        && groups.iter().all(|g| all_digits(g))
        && groups[1..].iter().all(|g| g.len() == 3)
        && fraction.map_or(true, all_digits)
}

fn lookup<'v>(obj: &'v Map<String, Value>, keys: &[String]) -> Option<&'v Value> {
    keys.iter()
        .filter_map(|k| obj.get(k))
        .find(|v| !v.is_null())
}

fn text(obj: &Map<String, Value>, keys: &[String]) -> Option<String> {
    let value = lookup(obj, keys)?;
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
