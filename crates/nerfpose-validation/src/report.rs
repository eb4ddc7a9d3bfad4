use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use nerfpose_3d::quality::{CameraRays, QualityMetrics};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The check passed.
    Success,
    /// Advisory, the run continues.
    Warning,
    /// The data is unusable as it is.
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Warning => write!(f, "warning"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// The outcome of a single check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Short name of the check.
    pub title: String,
    /// Human readable outcome.
    pub message: String,
    /// Severity.
    pub status: Status,
    /// Structured payload, e.g. the offending names or the measured value.
    pub details: serde_json::Value,
}

impl Finding {
    /// Create a new finding.
    pub fn new(
        status: Status,
        title: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            status,
            details,
        }
    }

    /// Create a passing finding.
    pub fn success(
        title: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::new(Status::Success, title, message, details)
    }

    /// Create an advisory finding.
    pub fn warning(
        title: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::new(Status::Warning, title, message, details)
    }

    /// Create a failing finding.
    pub fn error(
        title: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::new(Status::Error, title, message, details)
    }
}

/// Findings grouped by category, plus the measured camera geometry.
///
/// Built once through [`ReportBuilder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    status: Status,
    sections: BTreeMap<String, Vec<Finding>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<QualityMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cameras: Option<CameraRays>,
}

impl ValidationReport {
    /// Worst status over all findings, success for an empty report.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Findings of a category.
    pub fn section(&self, name: &str) -> &[Finding] {
        self.sections.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Category names, sorted.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// All findings with their category.
    pub fn findings(&self) -> impl Iterator<Item = (&str, &Finding)> {
        self.sections
            .iter()
            .flat_map(|(name, findings)| findings.iter().map(move |f| (name.as_str(), f)))
    }

    /// Number of findings with the given status.
    pub fn count(&self, status: Status) -> usize {
        self.findings().filter(|(_, f)| f.status == status).count()
    }

    /// True when no finding is an error.
    pub fn is_ok(&self) -> bool {
        self.status != Status::Error
    }

    /// Measured quality metrics, if the geometry was analyzed.
    pub fn metrics(&self) -> Option<&QualityMetrics> {
        self.metrics.as_ref()
    }

    /// Camera centers and axes for plotting.
    pub fn cameras(&self) -> Option<&CameraRays> {
        self.cameras.as_ref()
    }

    /// Log every finding at the level matching its status.
    pub fn log(&self) {
        for (category, finding) in self.findings() {
            match finding.status {
                Status::Success => {
                    log::info!("[{category}] {}: {}", finding.title, finding.message)
                }
                Status::Warning => {
                    log::warn!("[{category}] {}: {}", finding.title, finding.message)
                }
                Status::Error => {
                    log::error!("[{category}] {}: {}", finding.title, finding.message)
                }
            }
        }
    }

    /// Write the report as pretty-printed json.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ValidationError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Accumulates findings into a [`ValidationReport`].
#[derive(Debug, Default)]
pub struct ReportBuilder {
    sections: BTreeMap<String, Vec<Finding>>,
    metrics: Option<QualityMetrics>,
    cameras: Option<CameraRays>,
}

impl ReportBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finding to a category.
    pub fn push(&mut self, category: &str, finding: Finding) -> &mut Self {
        self.sections
            .entry(category.to_string())
            .or_default()
            .push(finding);
        self
    }

    /// Add several findings to a category.
    pub fn extend(
        &mut self,
        category: &str,
        findings: impl IntoIterator<Item = Finding>,
    ) -> &mut Self {
        self.sections
            .entry(category.to_string())
            .or_default()
            .extend(findings);
        self
    }

    /// Attach the quality metrics.
    pub fn metrics(&mut self, metrics: QualityMetrics) -> &mut Self {
        self.metrics = Some(metrics);
        self
    }

    /// Attach the camera rays.
    pub fn cameras(&mut self, cameras: CameraRays) -> &mut Self {
        self.cameras = Some(cameras);
        self
    }

    /// Freeze the report.
    pub fn build(self) -> ValidationReport {
        let status = self
            .sections
            .values()
            .flatten()
            .map(|f| f.status)
            .max()
            .unwrap_or(Status::Success);

        ValidationReport {
            status,
            sections: self.sections,
            metrics: self.metrics,
            cameras: self.cameras,
        }
    }
}
