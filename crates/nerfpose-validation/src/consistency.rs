use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::json;

use crate::Finding;

/// Set differences between the raw images, the dataset frames and the
/// reconstruction records. All name lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyDiff {
    /// Number of raw images.
    pub num_raw: usize,
    /// Number of dataset frames.
    pub num_dataset: usize,
    /// Number of reconstruction records.
    pub num_reconstruction: usize,
    /// In the dataset but not on disk.
    pub dataset_not_in_raw: Vec<String>,
    /// In the dataset but not reconstructed.
    pub dataset_not_in_reconstruction: Vec<String>,
    /// Reconstructed but not on disk.
    pub reconstruction_not_in_raw: Vec<String>,
    /// Reconstructed but missing from the dataset.
    pub reconstruction_not_in_dataset: Vec<String>,
    /// On disk but neither reconstructed nor in the dataset.
    pub raw_unused: Vec<String>,
}

impl ConsistencyDiff {
    /// All three sets have the same size and every difference is empty.
    pub fn is_perfect_match(&self) -> bool {
        self.num_raw == self.num_dataset
            && self.num_dataset == self.num_reconstruction
            && self.dataset_not_in_raw.is_empty()
            && self.dataset_not_in_reconstruction.is_empty()
            && self.reconstruction_not_in_raw.is_empty()
            && self.reconstruction_not_in_dataset.is_empty()
            && self.raw_unused.is_empty()
    }

    /// Turn the differences into report findings.
    ///
    /// Dataset frames without an image or a pose are errors; everything else is
    /// a warning. A perfect match yields a single success.
    pub fn findings(&self) -> Vec<Finding> {
        let counts = json!({
            "raw_images": self.num_raw,
            "dataset_frames": self.num_dataset,
            "reconstruction_images": self.num_reconstruction,
        });

        if self.is_perfect_match() {
            return vec![Finding::success(
                "Consistency",
                format!(
                    "Raw images, reconstruction and dataset agree on {} images",
                    self.num_raw
                ),
                counts,
            )];
        }

        let mut findings = Vec::new();

        if self.num_raw != self.num_dataset || self.num_dataset != self.num_reconstruction {
            findings.push(Finding::warning(
                "Image count mismatch",
                format!(
                    "raw images ({}), reconstruction ({}) and dataset ({}) differ in size",
                    self.num_raw, self.num_reconstruction, self.num_dataset
                ),
                counts,
            ));
        }

        let checks = [
            (
                &self.dataset_not_in_raw,
                "Dataset frames without image",
                "dataset frames have no raw image",
                true,
            ),
            (
                &self.dataset_not_in_reconstruction,
                "Dataset frames without pose",
                "dataset frames are not in the reconstruction",
                true,
            ),
            (
                &self.reconstruction_not_in_raw,
                "Reconstructed images missing",
                "reconstructed images have no raw image",
                false,
            ),
            (
                &self.reconstruction_not_in_dataset,
                "Reconstructed images dropped",
                "reconstructed images are not in the dataset",
                false,
            ),
            (
                &self.raw_unused,
                "Unused raw images",
                "raw images are neither reconstructed nor in the dataset",
                false,
            ),
        ];

        for (names, title, what, is_error) in checks {
            if names.is_empty() {
                continue;
            }
            let message = format!("{} {}: {}", names.len(), what, names.join(", "));
            let details = json!({ "count": names.len(), "names": names });
            findings.push(if is_error {
                Finding::error(title, message, details)
            } else {
                Finding::warning(title, message, details)
            });
        }

        findings
    }
}

fn to_set<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> BTreeSet<String> {
    names.into_iter().map(|s| s.as_ref().to_string()).collect()
}

fn difference(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Vec<String> {
    a.difference(b).cloned().collect()
}

/// Compare the three name sets.
///
/// Names are compared verbatim; callers that need to ignore extensions or
/// directories should map them to a common key first. Duplicates are ignored.
///
/// # Arguments
///
/// * `raw` - Image names found on disk.
/// * `dataset` - File names of the dataset frames.
/// * `reconstruction` - Image names recorded by the reconstruction.
///
/// Example:
///
/// ```
/// use nerfpose_validation::compare;
///
/// let diff = compare(["a", "b", "c"], ["a", "b"], ["a", "b"]);
/// assert!(!diff.is_perfect_match());
/// assert_eq!(diff.raw_unused, vec!["c".to_string()]);
/// ```
pub fn compare<R, D, C>(
    raw: impl IntoIterator<Item = R>,
    dataset: impl IntoIterator<Item = D>,
    reconstruction: impl IntoIterator<Item = C>,
) -> ConsistencyDiff
where
    R: AsRef<str>,
    D: AsRef<str>,
    C: AsRef<str>,
{
    let raw = to_set(raw);
    let dataset = to_set(dataset);
    let reconstruction = to_set(reconstruction);

    let used = dataset
        .union(&reconstruction)
        .cloned()
        .collect::<BTreeSet<_>>();

    let diff = ConsistencyDiff {
        num_raw: raw.len(),
        num_dataset: dataset.len(),
        num_reconstruction: reconstruction.len(),
        dataset_not_in_raw: difference(&dataset, &raw),
        dataset_not_in_reconstruction: difference(&dataset, &reconstruction),
        reconstruction_not_in_raw: difference(&reconstruction, &raw),
        reconstruction_not_in_dataset: difference(&reconstruction, &dataset),
        raw_unused: difference(&raw, &used),
    };

    log::debug!("consistency: {:?}", diff);

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;

    #[test]
    fn test_perfect_match() {
        let diff = compare(["b", "a"], ["a", "b"], ["a", "b"]);
        assert!(diff.is_perfect_match());

        let findings = diff.findings();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, Status::Success);
    }

    #[test]
    fn test_extra_raw_image() {
        let diff = compare(["a", "b", "c"], ["a", "b"], ["a", "b"]);
        assert!(!diff.is_perfect_match());
        assert_eq!(diff.raw_unused, ["c"]);
        assert!(diff.dataset_not_in_raw.is_empty());
        assert!(diff.dataset_not_in_reconstruction.is_empty());
        assert!(diff.reconstruction_not_in_raw.is_empty());

        let findings = diff.findings();
        let unused = findings
            .iter()
            .find(|f| f.title == "Unused raw images")
            .map(|f| f.message.clone())
            .unwrap_or_default();
        assert!(unused.contains('c'));
        assert!(findings.iter().all(|f| f.status == Status::Warning));
    }

    #[test]
    fn test_dataset_frame_without_pose_is_error() {
        let diff = compare(["a", "b"], ["a", "b"], ["a"]);
        assert_eq!(diff.dataset_not_in_reconstruction, ["b"]);
        assert!(diff.raw_unused.is_empty());

        let findings = diff.findings();
        let error = findings
            .iter()
            .find(|f| f.status == Status::Error)
            .map(|f| f.details.clone());
        assert_eq!(
            error,
            Some(serde_json::json!({"count": 1, "names": ["b"]}))
        );
    }

    #[test]
    fn test_names_are_sorted() {
        let diff = compare(["z", "y", "x"], Vec::<String>::new(), Vec::<String>::new());
        assert_eq!(diff.raw_unused, ["x", "y", "z"]);
    }
}
