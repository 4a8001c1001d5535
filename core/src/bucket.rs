//! Aging buckets: the eight fixed overdue-day ranges.
//!
//! Ranges are half-open and ordered:
//!   future   d <= 0
//!   d_lt_3   0  < d < 3
//!   d_3_7    3  <= d < 7
//!   d_7_15   7  <= d < 15
//!   d_15_30  15 <= d < 30
//!   d_30_60  30 <= d < 60
//!   d_60_90  60 <= d < 90
//!   d_gt_90  d >= 90
//!
//! Every integer lands in exactly one bucket.

use crate::types::{Amount, OverdueDays};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::ops::{Add, AddAssign, Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bucket {
    #[serde(rename = "future")]
    Future,
    #[serde(rename = "d_lt_3")]
    DLt3,
    #[serde(rename = "d_3_7")]
    D3To7,
    #[serde(rename = "d_7_15")]
    D7To15,
    #[serde(rename = "d_15_30")]
    D15To30,
    #[serde(rename = "d_30_60")]
    D30To60,
    #[serde(rename = "d_60_90")]
    D60To90,
    #[serde(rename = "d_gt_90")]
    DGt90,
}

impl Bucket {
    pub const COUNT: usize = 8;

    /// All buckets in column order.
    pub const ALL: [Bucket; Bucket::COUNT] = [
        Bucket::Future,
        Bucket::DLt3,
        Bucket::D3To7,
        Bucket::D7To15,
        Bucket::D15To30,
        Bucket::D30To60,
        Bucket::D60To90,
        Bucket::DGt90,
    ];

    /// Classify an overdue-day count. Total over all of `i64`.
    pub fn for_days(days: OverdueDays) -> Self {
        match days {
            i64::MIN..=0 => Bucket::Future,
            1..=2 => Bucket::DLt3,
            3..=6 => Bucket::D3To7,
            7..=14 => Bucket::D7To15,
            15..=29 => Bucket::D15To30,
            30..=59 => Bucket::D30To60,
            60..=89 => Bucket::D60To90,
            _ => Bucket::DGt90,
        }
    }

    /// Canonical key, also used as the export column name.
    pub fn key(self) -> &'static str {
        match self {
            Bucket::Future => "future",
            Bucket::DLt3 => "d_lt_3",
            Bucket::D3To7 => "d_3_7",
            Bucket::D7To15 => "d_7_15",
            Bucket::D15To30 => "d_15_30",
            Bucket::D30To60 => "d_30_60",
            Bucket::D60To90 => "d_60_90",
            Bucket::DGt90 => "d_gt_90",
        }
    }

    /// Parse a canonical key or one of the legacy spellings upstream has used.
    pub fn from_key(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let bucket = match key.as_str() {
            "future" | "not_due" | "current" | "in_term" => Bucket::Future,
            "d_lt_3" | "lt3" | "lt_3" | "0_3" => Bucket::DLt3,
            "d_3_7" | "3_7" => Bucket::D3To7,
            "d_7_15" | "7_15" => Bucket::D7To15,
            "d_15_30" | "15_30" => Bucket::D15To30,
            "d_30_60" | "30_60" => Bucket::D30To60,
            "d_60_90" | "60_90" => Bucket::D60To90,
            "d_gt_90" | "gt90" | "gt_90" | "over_90" | "90_plus" => Bucket::DGt90,
            _ => return None,
        };
        Some(bucket)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Shorthand for [`Bucket::for_days`].
pub fn bucket_for(days: OverdueDays) -> Bucket {
    Bucket::for_days(days)
}

/// Place the whole amount into the bucket for `days`; all others are zero.
pub fn distribute(amount: Amount, days: OverdueDays) -> BucketMap {
    let mut map = BucketMap::zero();
    map[bucket_for(days)] = amount;
    map
}

/// Per-bucket amounts, always holding all eight keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BucketMap([Amount; Bucket::COUNT]);

impl BucketMap {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn sum(&self) -> Amount {
        self.0.iter().copied().sum()
    }

    /// Everything already due (all buckets except `future`).
    pub fn past_due(&self) -> Amount {
        self.sum() - self[Bucket::Future]
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|a| a.is_zero())
    }

    /// True when the bucket sum is within `tolerance` of `total`.
    pub fn reconciles_with(&self, total: Amount, tolerance: Amount) -> bool {
        (self.sum() - total).abs() <= tolerance
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bucket, Amount)> + '_ {
        Bucket::ALL.iter().map(move |b| (*b, self[*b]))
    }
}

impl Index<Bucket> for BucketMap {
    type Output = Amount;

    fn index(&self, bucket: Bucket) -> &Amount {
        &self.0[bucket.index()]
    }
}

impl IndexMut<Bucket> for BucketMap {
    fn index_mut(&mut self, bucket: Bucket) -> &mut Amount {
        &mut self.0[bucket.index()]
    }
}

impl AddAssign<&BucketMap> for BucketMap {
    fn add_assign(&mut self, rhs: &BucketMap) {
        for bucket in Bucket::ALL {
            self[bucket] += rhs[bucket];
        }
    }
}

impl Add for BucketMap {
    type Output = BucketMap;

    fn add(mut self, rhs: BucketMap) -> BucketMap {
        self += &rhs;
        self
    }
}

impl<'a> std::iter::Sum<&'a BucketMap> for BucketMap {
    fn sum<I: Iterator<Item = &'a BucketMap>>(iter: I) -> Self {
        iter.fold(BucketMap::zero(), |mut acc, m| {
            acc += m;
            acc
        })
    }
}

// Ordered JSON object keyed by canonical bucket keys.
impl Serialize for BucketMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Bucket::COUNT))?;
        for (bucket, amount) in self.iter() {
            map.serialize_entry(bucket.key(), &amount)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn boundaries_are_half_open() {
        assert_eq!(bucket_for(i64::MIN), Bucket::Future);
        assert_eq!(bucket_for(0), Bucket::Future);
        assert_eq!(bucket_for(1), Bucket::DLt3);
        assert_eq!(bucket_for(2), Bucket::DLt3);
        assert_eq!(bucket_for(3), Bucket::D3To7);
        assert_eq!(bucket_for(6), Bucket::D3To7);
        assert_eq!(bucket_for(7), Bucket::D7To15);
        assert_eq!(bucket_for(15), Bucket::D15To30);
        assert_eq!(bucket_for(30), Bucket::D30To60);
        assert_eq!(bucket_for(60), Bucket::D60To90);
        assert_eq!(bucket_for(89), Bucket::D60To90);
        assert_eq!(bucket_for(90), Bucket::DGt90);
        assert_eq!(bucket_for(i64::MAX), Bucket::DGt90);
    }

    #[test]
    fn legacy_keys_parse() {
        assert_eq!(Bucket::from_key("gt90"), Some(Bucket::DGt90));
        assert_eq!(Bucket::from_key("3-7"), Some(Bucket::D3To7));
        assert_eq!(Bucket::from_key("NOT_DUE"), Some(Bucket::Future));
        assert_eq!(Bucket::from_key("d_30_60"), Some(Bucket::D30To60));
        assert_eq!(Bucket::from_key("bogus"), None);
    }

    #[test]
    fn past_due_excludes_future() {
        let mut map = distribute(dec!(100), 0);
        map[Bucket::D30To60] = dec!(40);
        assert_eq!(map.sum(), dec!(140));
        assert_eq!(map.past_due(), dec!(40));
    }

    #[test]
    fn serializes_in_column_order() {
        let json = serde_json::to_string(&distribute(dec!(5), 95)).unwrap();
        assert!(json.starts_with("{\"future\":"), "got {json}");
        assert!(json.contains("\"d_gt_90\":\"5\""), "got {json}");
    }
}
