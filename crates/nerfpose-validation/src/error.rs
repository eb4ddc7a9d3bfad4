/// An error type for the validation module.
#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    /// Error reading or writing file
    #[error(transparent)]
    FileError(#[from] std::io::Error),

    /// Error encoding the report
    #[error("Failed to serialize report: {0}")]
    JsonError(#[from] serde_json::Error),
}
