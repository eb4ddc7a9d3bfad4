/// Error types for the pose module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PoseError {
    /// NaN or infinity in the input
    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),

    /// The quaternion has zero norm
    #[error("Cannot build a rotation from a zero-norm quaternion")]
    ZeroQuaternion,

    /// A view direction has zero length
    #[error("View direction {0} has zero length")]
    ZeroDirection(usize),

    /// Nothing to process
    #[error("Empty pose set")]
    EmptyPoses,

    /// Positions and directions differ in length
    #[error("Got {0} positions but {1} view directions")]
    LengthMismatch(usize, usize),

    /// Percentile outside of [0, 100]
    #[error("Invalid percentile {0}, expected a value in [0, 100]")]
    InvalidPercentile(f64),
}
