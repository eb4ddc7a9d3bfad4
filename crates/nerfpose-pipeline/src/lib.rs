#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pipeline configuration and its environment overlay.
pub mod config;

/// The external reconstruction engine.
pub mod engine;

/// Error types for the pipeline.
pub mod error;

/// Directory layout of a project.
pub mod layout;

/// The staged pipeline.
pub mod pipeline;

pub use config::{ColmapOptions, PipelineConfig};
pub use engine::{ColmapCli, EngineError, ReconstructionEngine};
pub use error::{ConfigError, PipelineError};
pub use layout::ProjectLayout;
pub use pipeline::{Conversion, Pipeline, PipelineOutcome, SkipReason, SkippedImage, Stage};
