//! Filter engine: multi-select predicates over debt records.
//!
//! Within a dimension, selected values are OR-ed (union).
//! Across dimensions, results are AND-ed (intersection).
//! An empty selection in a dimension means "no restriction".
//!
//! The employee test is customer-level: a record passes if its manager
//! OR any contributing salesperson is selected. Which slices actually
//! count toward totals is decided later by allocation.

use crate::{config::EngineConfig, record::CustomerDebtRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The caller's current multi-select state. A plain value object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSelection {
    pub groups: BTreeSet<String>,
    pub employees: BTreeSet<String>,
    pub segments: BTreeSet<String>,
    /// Case-insensitive substring over customer code and name.
    pub search: Option<String>,
}

impl FilterSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn with_employees<I, S>(mut self, employees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.employees.extend(employees.into_iter().map(Into::into));
        self
    }

    pub fn with_segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments.extend(segments.into_iter().map(Into::into));
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn has_employee_filter(&self) -> bool {
        !self.employees.is_empty()
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

// ── Segment classification ─────────────────────────────────────────

/// Places a record in an account-type segment. Injected by the caller
/// because the business rule changes independently of the engine.
pub trait SegmentClassifier {
    fn segment_of(&self, record: &CustomerDebtRecord) -> String;
}

impl<F> SegmentClassifier for F
where
    F: Fn(&CustomerDebtRecord) -> String,
{
    fn segment_of(&self, record: &CustomerDebtRecord) -> String {
        self(record)
    }
}

/// Keyword rules over customer name and group; first matching rule wins.
#[derive(Debug, Clone)]
pub struct KeywordSegmentClassifier {
    rules: Vec<(String, Vec<String>)>,
    fallback: String,
}

impl KeywordSegmentClassifier {
    pub fn from_config(config: &EngineConfig) -> Self {
        let rules = config
            .segments
            .iter()
            .map(|rule| {
                let keywords = rule.keywords.iter().map(|k| k.to_lowercase()).collect();
                (rule.id.clone(), keywords)
            })
            .collect();
        Self {
            rules,
            fallback: config.fallback_segment.clone(),
        }
    }
}

impl SegmentClassifier for KeywordSegmentClassifier {
    fn segment_of(&self, record: &CustomerDebtRecord) -> String {
        let haystack = format!("{} {}", record.customer_name, record.group).to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k.as_str())))
            .map(|(id, _)| id.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

// ── Predicates ─────────────────────────────────────────────────────

pub fn matches_group(record: &CustomerDebtRecord, selection: &FilterSelection) -> bool {
    selection.groups.is_empty() || selection.groups.contains(&record.group)
}

pub fn matches_employee(record: &CustomerDebtRecord, selection: &FilterSelection) -> bool {
    selection.employees.is_empty()
        || record
            .responsible_names()
            .any(|name| selection.employees.contains(name))
}

pub fn matches_segment(
    record: &CustomerDebtRecord,
    selection: &FilterSelection,
    classifier: &dyn SegmentClassifier,
) -> bool {
    selection.segments.is_empty() || selection.segments.contains(&classifier.segment_of(record))
}

pub fn matches_search(record: &CustomerDebtRecord, selection: &FilterSelection) -> bool {
    match selection.search_term() {
        None => true,
        Some(term) => {
            record.customer_code.to_lowercase().contains(&term)
                || record.customer_name.to_lowercase().contains(&term)
        }
    }
}

/// All dimensions must pass for the record to go downstream.
pub fn matches(
    record: &CustomerDebtRecord,
    selection: &FilterSelection,
    classifier: &dyn SegmentClassifier,
) -> bool {
    matches_group(record, selection)
        && matches_employee(record, selection)
        && matches_search(record, selection)
        && matches_segment(record, selection, classifier)
}

// ── Option lists ───────────────────────────────────────────────────

/// Distinct values available to each multi-select, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub groups: Vec<String>,
    pub employees: Vec<String>,
    pub segments: Vec<String>,
}

pub fn filter_options(
    records: &[CustomerDebtRecord],
    classifier: &dyn SegmentClassifier,
) -> FilterOptions {
    let mut groups = BTreeSet::new();
    let mut employees = BTreeSet::new();
    let mut segments = BTreeSet::new();
    for record in records {
        groups.insert(record.group.clone());
        employees.extend(record.responsible_names().map(str::to_string));
        segments.insert(classifier.segment_of(record));
    }
    FilterOptions {
        groups: groups.into_iter().collect(),
        employees: employees.into_iter().collect(),
        segments: segments.into_iter().collect(),
    }
}
