use std::path::{Path, PathBuf};

use serde_json::json;

use crate::Finding;

/// A file or directory the project is expected to contain.
#[derive(Debug, Clone)]
pub struct RequiredPath {
    /// Location on disk.
    pub path: PathBuf,
    /// What the path holds, used in the messages.
    pub description: String,
}

impl RequiredPath {
    /// Create a new required path.
    pub fn new(path: impl AsRef<Path>, description: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            description: description.into(),
        }
    }
}

/// Report every missing path as an error, or a single success when all exist.
pub fn check_required_paths(required: &[RequiredPath]) -> Vec<Finding> {
    let mut findings = required
        .iter()
        .filter(|r| !r.path.exists())
        .map(|r| {
            Finding::error(
                "Missing project file",
                format!("{} not found: {}", r.description, r.path.display()),
                json!({ "path": r.path.display().to_string(), "description": r.description }),
            )
        })
        .collect::<Vec<_>>();

    if findings.is_empty() {
        findings.push(Finding::success(
            "Project completeness",
            "All required files and directories are present",
            json!({ "checked_paths": required.len() }),
        ));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;

    #[test]
    fn test_missing_paths() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        std::fs::create_dir(tmp_dir.path().join("images"))?;

        let required = [
            RequiredPath::new(tmp_dir.path().join("images"), "image directory"),
            RequiredPath::new(tmp_dir.path().join("database.db"), "feature database"),
        ];
        let findings = check_required_paths(&required);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, Status::Error);
        assert_eq!(findings[0].details["description"], "feature database");

        std::fs::write(tmp_dir.path().join("database.db"), b"")?;
        let findings = check_required_paths(&required);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, Status::Success);
        Ok(())
    }
}
