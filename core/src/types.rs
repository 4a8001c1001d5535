//! Shared primitive types used across the entire engine.

use rust_decimal::Decimal;

/// A monetary amount. Signed; credit balances are negative.
pub type Amount = Decimal;

/// Largest magnitude a single amount may carry. Keeps every sum over a
/// snapshot far below `Decimal::MAX`.
pub const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000_000_000;

/// True when `amount` is within `MAX_AMOUNT_UNITS` either side of zero.
pub fn amount_in_range(amount: Amount) -> bool {
    amount.abs() <= Decimal::from(MAX_AMOUNT_UNITS)
}

/// Days past the due date. Zero or negative means not yet due.
pub type OverdueDays = i64;

/// A stable customer identifier as delivered by upstream.
pub type CustomerCode = String;

/// Monotonic version of the record snapshot held by the engine.
pub type RecordsVersion = u64;
