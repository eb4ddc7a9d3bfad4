#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Presence checks of the project files.
pub mod completeness;

/// Three-way comparison of raw images, reconstruction and dataset names.
pub mod consistency;

/// Threshold based diagnostics of the camera geometry.
pub mod diagnostics;

/// Error types for the validation module.
pub mod error;

/// Findings and the validation report.
pub mod report;

pub use consistency::{compare, ConsistencyDiff};
pub use diagnostics::{diagnose, QualityThresholds};
pub use error::ValidationError;
pub use report::{Finding, ReportBuilder, Status, ValidationReport};
