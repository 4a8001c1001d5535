//! Allocation engine: how much of a customer's debt the current
//! employee filter is entitled to.
//!
//! With no employee filter, the whole customer counts once.
//! With one, only the slices of selected salespeople count, so a
//! customer shared by two salesmen is split, never duplicated.

use crate::{
    bucket::BucketMap,
    error::{AgingError, AgingResult},
    filter::FilterSelection,
    record::{CustomerDebtRecord, SalesmanSlice},
    types::Amount,
};

/// The portion of a record attributable to the current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveAmounts<'r> {
    pub total: Amount,
    pub buckets: BucketMap,
    /// Slices that contributed. Empty when the whole record counts
    /// through its manager (no employee filter, or no breakdown).
    pub slices: Vec<&'r SalesmanSlice>,
}

/// Slices of `record` whose salesperson is in the employee selection.
pub fn matching_slices<'r>(
    record: &'r CustomerDebtRecord,
    selection: &FilterSelection,
) -> Vec<&'r SalesmanSlice> {
    record
        .salesman_breakdown
        .iter()
        .filter(|s| selection.employees.contains(&s.salesperson_name))
        .collect()
}

/// Effective total and buckets for a record that already passed the filter.
///
/// Fails if the record has no selected owner or slice (it should never
/// have passed the filter), or if the matched slices add up to more than
/// the customer owes. Both mean upstream data or wiring is broken.
pub fn effective_amounts<'r>(
    record: &'r CustomerDebtRecord,
    selection: &FilterSelection,
    tolerance: Amount,
) -> AgingResult<EffectiveAmounts<'r>> {
    if !selection.has_employee_filter() {
        return Ok(EffectiveAmounts {
            total: record.total_debt,
            buckets: record.bucket_breakdown,
            slices: Vec::new(),
        });
    }

    let slices = matching_slices(record, selection);
    let manager_selected = selection.employees.contains(&record.manager);

    if slices.is_empty() && !manager_selected {
        log::error!(
            "allocation: customer {} has no selected owner or salesperson",
            record.customer_code
        );
        return Err(AgingError::AllocationContract {
            customer_code: record.customer_code.clone(),
        });
    }

    if !record.has_breakdown() {
        // Manager is the single implicit owner.
        return Ok(EffectiveAmounts {
            total: record.total_debt,
            buckets: record.bucket_breakdown,
            slices: Vec::new(),
        });
    }

    let total: Amount = slices.iter().map(|s| s.amount).sum();
    let buckets: BucketMap = slices.iter().map(|s| &s.bucket_breakdown).sum();

    if total.abs() > record.total_debt.abs() + tolerance {
        log::error!(
            "allocation: customer {} allocated {} exceeds total debt {}",
            record.customer_code,
            total,
            record.total_debt,
        );
        return Err(AgingError::AllocationExceedsTotal {
            customer_code: record.customer_code.clone(),
            allocated: total,
            total: record.total_debt,
        });
    }

    Ok(EffectiveAmounts {
        total,
        buckets,
        slices,
    })
}
