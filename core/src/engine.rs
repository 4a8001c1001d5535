//! The aging engine: owns the current record snapshot and recomputes
//! the report whenever the records or the filter selection change.
//!
//! PIPELINE (fixed order):
//!   1. Normalizer      raw JSON -> CustomerDebtRecord   (on refresh)
//!   2. FilterEngine    predicate per record              (on compute)
//!   3. Allocation      effective amounts per match       (on compute)
//!   4. Aggregator      totals, pivots, trace, sales lines (on compute)
//!
//! RULES:
//!   - Records are never mutated after a refresh; a refresh replaces them.
//!   - Every compute starts from scratch. The memo only skips a compute
//!     whose (records_version, selection) equals the last one.

use crate::{
    aggregator::{aggregate, AgingReport},
    config::EngineConfig,
    error::{AgingError, AgingResult},
    filter::{
        filter_options, FilterOptions, FilterSelection, KeywordSegmentClassifier,
        SegmentClassifier,
    },
    normalizer::{normalize_payload, NormalizeStats},
    record::CustomerDebtRecord,
    types::RecordsVersion,
};
use serde_json::Value;

struct Memo {
    version: RecordsVersion,
    selection: FilterSelection,
    report: AgingReport,
}

pub struct AgingEngine {
    config: EngineConfig,
    classifier: Box<dyn SegmentClassifier + Send + Sync>,
    records: Vec<CustomerDebtRecord>,
    version: RecordsVersion,
    stats: NormalizeStats,
    memo: Option<Memo>,
}

impl AgingEngine {
    /// Engine with the keyword segment classifier built from `config`.
    pub fn new(config: EngineConfig) -> Self {
        let classifier = KeywordSegmentClassifier::from_config(&config);
        Self {
            config,
            classifier: Box::new(classifier),
            records: Vec::new(),
            version: 0,
            stats: NormalizeStats::default(),
            memo: None,
        }
    }

    /// Replace the segment classifier. Invalidates the memo.
    pub fn with_classifier<C>(mut self, classifier: C) -> Self
    where
        C: SegmentClassifier + Send + Sync + 'static,
    {
        self.classifier = Box::new(classifier);
        self.memo = None;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn records(&self) -> &[CustomerDebtRecord] {
        &self.records
    }

    pub fn records_version(&self) -> RecordsVersion {
        self.version
    }

    /// Data-quality counters from the last refresh.
    pub fn normalize_stats(&self) -> &NormalizeStats {
        &self.stats
    }

    /// Normalize a raw payload and make it the current snapshot.
    pub fn refresh(&mut self, payload: &Value) -> AgingResult<RecordsVersion> {
        let (records, stats) = normalize_payload(&self.config, payload)?;
        Ok(self.install(records, stats))
    }

    /// Install already-normalized records as the current snapshot.
    /// Rejects the whole batch if any amount is outside the accepted
    /// range; the previous snapshot is kept.
    pub fn load_records(
        &mut self,
        records: Vec<CustomerDebtRecord>,
    ) -> AgingResult<RecordsVersion> {
        if let Some(bad) = records.iter().find(|r| !r.amounts_in_range()) {
            log::error!(
                "load_records: customer {} has an out-of-range amount",
                bad.customer_code
            );
            return Err(AgingError::AmountOutOfRange {
                customer_code: bad.customer_code.clone(),
            });
        }
        let stats = NormalizeStats {
            records_seen: records.len(),
            ..NormalizeStats::default()
        };
        Ok(self.install(records, stats))
    }

    fn install(
        &mut self,
        records: Vec<CustomerDebtRecord>,
        stats: NormalizeStats,
    ) -> RecordsVersion {
        self.version += 1;
        log::info!(
            "refresh v{}: {} records ({} bucket mismatches, {} slice mismatches, {} coerced fields)",
            self.version,
            records.len(),
            stats.bucket_mismatches,
            stats.slice_mismatches,
            stats.coerced_fields,
        );
        self.records = records;
        self.stats = stats;
        self.memo = None;
        self.version
    }

    /// Filter-widget option lists for the current snapshot.
    pub fn filter_options(&self) -> FilterOptions {
        filter_options(&self.records, self.classifier.as_ref())
    }

    /// Run the pipeline for `selection`, reusing the last result when
    /// neither the snapshot nor the selection changed.
    pub fn compute(&mut self, selection: &FilterSelection) -> AgingResult<&AgingReport> {
        let memo = match self.memo.take() {
            Some(m) if m.version == self.version && &m.selection == selection => {
                log::debug!("compute: memo hit for v{}", self.version);
                m
            }
            _ => Memo {
                version: self.version,
                selection: selection.clone(),
                report: self.compute_uncached(selection)?,
            },
        };
        Ok(&self.memo.insert(memo).report)
    }

    /// Run the pipeline from scratch, ignoring and not touching the memo.
    pub fn compute_uncached(&self, selection: &FilterSelection) -> AgingResult<AgingReport> {
        let report = aggregate(&self.records, selection, self.classifier.as_ref(), &self.config)?;
        log::info!(
            "compute v{}: {} of {} customers, grand total {}",
            self.version,
            report.diagnostics.records_matched,
            report.diagnostics.records_in,
            report.grand_total.total,
        );
        Ok(report)
    }
}
