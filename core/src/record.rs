//! Canonical customer debt records, as produced by the normalizer.
//!
//! Records are immutable snapshots: rebuilt on every refresh, never
//! mutated by filtering, allocation or aggregation.

use crate::{
    bucket::BucketMap,
    types::{amount_in_range, Amount, CustomerCode, OverdueDays},
};
use serde::Serialize;

/// A named portion of a customer's debt attributed to one salesperson.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesmanSlice {
    pub salesperson_name: String,
    pub amount: Amount,
    pub bucket_breakdown: BucketMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDebtRecord {
    pub customer_code: CustomerCode,
    pub customer_name: String,
    pub group: String,
    /// Employee responsible for the overall relationship.
    pub manager: String,
    pub total_debt: Amount,
    pub overdue_days: OverdueDays,
    pub bucket_breakdown: BucketMap,
    /// Empty means the manager is the sole implicit salesperson.
    pub salesman_breakdown: Vec<SalesmanSlice>,
}

impl CustomerDebtRecord {
    pub fn has_breakdown(&self) -> bool {
        !self.salesman_breakdown.is_empty()
    }

    pub fn slice_total(&self) -> Amount {
        self.salesman_breakdown.iter().map(|s| s.amount).sum()
    }

    /// Every name that carries responsibility for part of this debt:
    /// the manager plus each slice salesperson.
    pub fn responsible_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.manager.as_str())
            .chain(self.salesman_breakdown.iter().map(|s| s.salesperson_name.as_str()))
    }

    /// Every amount on the record, slices included, is within range.
    pub fn amounts_in_range(&self) -> bool {
        let buckets_ok = |b: &BucketMap| b.iter().all(|(_, a)| amount_in_range(a));
        amount_in_range(self.total_debt)
            && buckets_ok(&self.bucket_breakdown)
            && self
                .salesman_breakdown
                .iter()
                .all(|s| amount_in_range(s.amount) && buckets_ok(&s.bucket_breakdown))
    }
}
