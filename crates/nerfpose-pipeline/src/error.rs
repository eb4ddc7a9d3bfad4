use std::path::PathBuf;

use crate::engine::EngineError;

/// An error type for the pipeline configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Error reading the config file
    #[error(transparent)]
    FileError(#[from] std::io::Error),

    /// The config file is not valid json
    #[error("Failed to parse config: {0}")]
    JsonError(#[from] serde_json::Error),

    /// An environment variable holds an unusable value
    #[error("Invalid value {value:?} for {name}: {reason}")]
    InvalidEnv {
        /// Variable name
        name: String,
        /// Offending value
        value: String,
        /// Expected format
        reason: String,
    },
}

/// An error type for the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Invalid configuration
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    /// The external reconstruction failed
    #[error(transparent)]
    EngineError(#[from] EngineError),

    /// The reconstruction model could not be read
    #[error(transparent)]
    ColmapError(#[from] nerfpose_colmap::ColmapError),

    /// A pose could not be converted
    #[error(transparent)]
    PoseError(#[from] nerfpose_3d::PoseError),

    /// The dataset could not be built or written
    #[error(transparent)]
    DatasetError(#[from] nerfpose_dataset::DatasetError),

    /// Error reading or writing file
    #[error(transparent)]
    FileError(#[from] std::io::Error),

    /// The source directory holds no supported image
    #[error("No supported images found in {0}")]
    NoImages(PathBuf),

    /// The reconstruction has no camera
    #[error("Reconstruction has no cameras")]
    NoCameras,

    /// Every reconstructed image was skipped
    #[error("No valid images left after skipping {skipped} of them")]
    NoValidImages {
        /// Number of skipped images
        skipped: usize,
    },
}
