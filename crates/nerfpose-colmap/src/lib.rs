#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Readers for the `cameras.bin` / `images.bin` binary model files.
pub mod binary;

/// Error types for the COLMAP readers.
pub mod error;

/// Validated reconstruction model assembled from the raw records.
pub mod model;

/// Readers for the `cameras.txt` / `images.txt` text model files.
pub mod text;

mod types;

pub use error::ColmapError;
pub use model::{read_model, CameraIntrinsics, ReconstructionModel};
pub use types::*;
