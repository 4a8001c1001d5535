//! `debtrisk-core`: accounts-receivable aging and risk aggregation.
//!
//! Pure engine crate: receives raw receivable records, returns aging
//! totals, pivots and export-ready rows. No network or persistence.

pub mod aggregator;
pub mod allocation;
pub mod bucket;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod normalizer;
pub mod record;
pub mod report;
pub mod types;

pub use aggregator::{aggregate, AggregateRow, AgingReport, SalesLine, TraceRecord};
pub use bucket::{bucket_for, distribute, Bucket, BucketMap};
pub use config::EngineConfig;
pub use engine::AgingEngine;
pub use error::{AgingError, AgingResult};
pub use filter::{FilterSelection, KeywordSegmentClassifier, SegmentClassifier};
pub use record::{CustomerDebtRecord, SalesmanSlice};
pub use report::ReportRowBuilder;
