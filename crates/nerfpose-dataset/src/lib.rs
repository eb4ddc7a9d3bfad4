#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Mapping of recorded image names to files on disk.
pub mod correspondence;

/// The `transforms.json` dataset schema.
pub mod dataset;

/// Error types for the dataset module.
pub mod error;

/// Listing of image files in a directory.
pub mod images;

pub use correspondence::{resolve, CorrespondenceConfig, FileCorrespondenceMap, MatchKind};
pub use dataset::{ConvertedFrame, Dataset};
pub use error::DatasetError;
