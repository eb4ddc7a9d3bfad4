use nerfpose_3d::quality::QualityMetrics;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::Finding;

/// Limits of the geometric diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Largest cosine similarity allowed between any two views.
    pub max_view_similarity: f64,
    /// Largest mean cosine similarity over all view pairs.
    pub max_mean_view_similarity: f64,
    /// Smallest distance allowed between two camera centers.
    pub min_camera_distance: f64,
    /// Smallest mean baseline.
    pub min_mean_baseline: f64,
    /// Smallest std of the distances to the centroid.
    pub min_position_std: f64,
    /// Largest std of the distances to the centroid.
    pub max_position_std: f64,
    /// Smallest mean alignment of the views with the centroid.
    pub min_center_alignment: f64,
    /// Fewest frames for a usable dataset.
    pub min_frame_count: usize,
    /// Most frames before training gets slow.
    pub max_frame_count: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            max_view_similarity: 0.99,
            max_mean_view_similarity: 0.8,
            min_camera_distance: 0.05,
            min_mean_baseline: 0.1,
            min_position_std: 0.1,
            max_position_std: 10.0,
            min_center_alignment: 0.3,
            min_frame_count: 10,
            max_frame_count: 1000,
        }
    }
}

fn advise(
    title: &str,
    message: impl Into<String>,
    mut details: serde_json::Value,
    suggestion: &str,
) -> Finding {
    if let Some(object) = details.as_object_mut() {
        object.insert("suggestion".to_string(), json!(suggestion));
    }
    Finding::warning(title, message, details)
}

/// Check the camera geometry against the thresholds.
///
/// All diagnostics are advisory, failing checks produce warnings carrying a
/// capture `suggestion` in their details. A single success finding is
/// returned when everything passes.
pub fn diagnose(metrics: &QualityMetrics, thresholds: &QualityThresholds) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(diversity) = &metrics.view_diversity {
        if diversity.max > thresholds.max_view_similarity {
            findings.push(advise(
                "Views too similar",
                format!(
                    "max view similarity {:.4} exceeds {}",
                    diversity.max, thresholds.max_view_similarity
                ),
                json!({ "max_similarity": diversity.max, "threshold": thresholds.max_view_similarity }),
                "Add photos from more angles, especially from different heights and azimuths",
            ));
        }
        if diversity.mean > thresholds.max_mean_view_similarity {
            findings.push(advise(
                "Low view diversity",
                format!(
                    "mean view similarity {:.4} exceeds {}",
                    diversity.mean, thresholds.max_mean_view_similarity
                ),
                json!({ "mean_similarity": diversity.mean, "threshold": thresholds.max_mean_view_similarity }),
                "Walk around the subject through 360 degrees and vary the camera height",
            ));
        }
    }

    if let Some(distances) = &metrics.inter_camera_distances {
        if distances.min < thresholds.min_camera_distance {
            findings.push(advise(
                "Cameras too close",
                format!(
                    "closest camera pair is {:.4} apart, below {}; the set may contain duplicates",
                    distances.min, thresholds.min_camera_distance
                ),
                json!({ "min_distance": distances.min, "threshold": thresholds.min_camera_distance }),
                "Move further between shots and drop near-identical consecutive photos",
            ));
        }
    }

    if let Some(baseline) = metrics.baseline() {
        if baseline.mean < thresholds.min_mean_baseline {
            findings.push(advise(
                "Short baseline",
                format!(
                    "mean baseline {:.4} is below {}",
                    baseline.mean, thresholds.min_mean_baseline
                ),
                json!({ "mean_baseline": baseline.mean, "threshold": thresholds.min_mean_baseline }),
                "Increase the camera motion between shots to give better depth cues",
            ));
        }
    }

    let spread = &metrics.position_spread;
    if spread.std < thresholds.min_position_std {
        findings.push(advise(
            "Positions too concentrated",
            format!(
                "std of the distances to the center {:.4} is below {}",
                spread.std, thresholds.min_position_std
            ),
            json!({ "std_distance": spread.std, "threshold": thresholds.min_position_std }),
            "Photograph the subject from more distances",
        ));
    } else if spread.std > thresholds.max_position_std {
        findings.push(advise(
            "Positions too spread",
            format!(
                "std of the distances to the center {:.4} exceeds {}",
                spread.std, thresholds.max_position_std
            ),
            json!({ "std_distance": spread.std, "threshold": thresholds.max_position_std }),
            "Keep a more consistent distance to the subject",
        ));
    }

    if let Some(alignment) = &metrics.center_alignment {
        if alignment.mean < thresholds.min_center_alignment {
            findings.push(advise(
                "Cameras not facing the subject",
                format!(
                    "mean alignment with the scene center {:.4} is below {}",
                    alignment.mean, thresholds.min_center_alignment
                ),
                json!({ "mean_alignment": alignment.mean, "threshold": thresholds.min_center_alignment }),
                "Keep the subject near the center of every frame",
            ));
        }
    }

    if findings.is_empty() {
        findings.push(Finding::success(
            "Camera geometry",
            format!("{} cameras passed all geometry checks", metrics.num_cameras),
            json!({ "num_cameras": metrics.num_cameras }),
        ));
    }

    findings
}

/// Check the number of frames against the thresholds.
pub fn check_frame_count(num_frames: usize, thresholds: &QualityThresholds) -> Finding {
    let details = json!({
        "num_frames": num_frames,
        "min": thresholds.min_frame_count,
        "max": thresholds.max_frame_count,
    });
    if num_frames < thresholds.min_frame_count {
        advise(
            "Too few frames",
            format!(
                "{num_frames} frames, at least {} recommended",
                thresholds.min_frame_count
            ),
            details,
            "Capture more photos around the subject",
        )
    } else if num_frames > thresholds.max_frame_count {
        advise(
            "Too many frames",
            format!(
                "{num_frames} frames, at most {} recommended",
                thresholds.max_frame_count
            ),
            details,
            "Subsample the capture or drop redundant frames",
        )
    } else {
        Finding::success("Frame count", format!("{num_frames} frames"), details)
    }
}
