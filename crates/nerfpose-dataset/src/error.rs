use std::path::PathBuf;

/// An error type for the dataset module.
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// Error reading or writing file
    #[error(transparent)]
    FileError(#[from] std::io::Error),

    /// Error encoding or decoding the dataset json
    #[error("Failed to serialize dataset: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The directory does not exist
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A dataset needs at least one frame
    #[error("Dataset has no frames")]
    EmptyFrames,

    /// The field of view is not a finite positive angle
    #[error("Invalid camera_angle_x: {0}")]
    InvalidFieldOfView(f64),
}
