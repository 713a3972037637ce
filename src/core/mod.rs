//! Core module - configuration, CSV ingest and field normalization

pub mod config;
pub mod ingest;
pub mod normalize;

pub use config::{ChildTitlePolicy, Config, ConfigError, RemainingEstimatePolicy};
pub use ingest::{read_export, IngestError, SourceRecord};
pub use normalize::NormalizedFields;
