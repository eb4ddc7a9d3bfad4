use std::path::PathBuf;

/// Error types for the COLMAP module.
#[derive(Debug, thiserror::Error)]
pub enum ColmapError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),

    /// A model file is absent
    #[error("Model file not found: {0}")]
    MissingFile(PathBuf),

    /// A record ended before all its fields could be read
    #[error("Truncated record in {path}: could not read {field}")]
    Truncated {
        /// File being read
        path: PathBuf,
        /// Field that could not be read
        field: String,
    },

    /// Invalid number of camera parameters
    #[error("Invalid number of camera parameters: {0}")]
    InvalidNumCameraParams(usize),

    /// The model id is not a known camera model
    #[error("Unknown camera model: {0}")]
    UnknownCameraModel(String),

    /// Only the distortion-free pinhole model is interpreted
    #[error("Unsupported camera model {model} for camera {camera_id}, expected PINHOLE")]
    UnsupportedModel {
        /// Camera id
        camera_id: u32,
        /// Offending model tag
        model: String,
    },

    /// The quaternion cannot be normalized
    #[error("Invalid rotation for image {image_id}: {reason}")]
    InvalidRotation {
        /// Image id
        image_id: u32,
        /// What is wrong with the quaternion
        reason: String,
    },

    /// An image refers to a camera that is not in the model
    #[error("Image {image_id} refers to unknown camera {camera_id}")]
    UnknownCamera {
        /// Image id
        image_id: u32,
        /// Camera id
        camera_id: u32,
    },

    /// Parse error
    #[error("Parse error {0}")]
    ParseError(String),
}
