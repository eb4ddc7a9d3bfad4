use serde::{Deserialize, Serialize};

use crate::{
    linalg::{centroid, euclidean_distance, gram_matrix, norm3, pairwise_distances},
    transforms::{camera_position, up_vector, view_direction},
    PoseError,
};

/// Summary statistics of a set of distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceStats {
    /// Mean
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Minimum
    pub min: f64,
    /// Maximum
    pub max: f64,
}

/// Summary statistics of pairwise view-direction cosine similarities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityStats {
    /// Maximum
    pub max: f64,
    /// Mean
    pub mean: f64,
    /// Minimum
    pub min: f64,
    /// Population standard deviation
    pub std: f64,
}

/// How well the cameras look towards the centroid of the camera centers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentStats {
    /// Mean cosine between view direction and direction to the centroid
    pub mean: f64,
    /// Worst cosine
    pub min: f64,
    /// Number of cameras that contributed; cameras on the centroid are skipped
    pub num_cameras: usize,
}

/// Geometric diagnostics of a camera set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Number of cameras analyzed
    pub num_cameras: usize,
    /// Distances of the camera centers to their centroid
    pub position_spread: DistanceStats,
    /// All pairwise distances between camera centers, absent with fewer than two cameras
    pub inter_camera_distances: Option<DistanceStats>,
    /// Pairwise view-direction similarities, absent with fewer than two cameras
    pub view_diversity: Option<SimilarityStats>,
    /// Alignment of the view directions with the centroid
    pub center_alignment: Option<AlignmentStats>,
}

impl QualityMetrics {
    /// Stereo baseline statistics.
    ///
    /// The baseline between two cameras is their center distance, so this is
    /// the same computation as [`QualityMetrics::inter_camera_distances`].
    pub fn baseline(&self) -> Option<&DistanceStats> {
        self.inter_camera_distances.as_ref()
    }
}

/// Camera centers and axes, ready to be handed to a plotting tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraRays {
    /// Camera centers
    pub positions: Vec<[f64; 3]>,
    /// Unit viewing directions
    pub directions: Vec<[f64; 3]>,
    /// Up vectors
    pub up_vectors: Vec<[f64; 3]>,
}

impl CameraRays {
    /// Extract the camera rays from NeRF camera-to-world matrices.
    pub fn from_poses(poses: &[[[f64; 4]; 4]]) -> Self {
        Self {
            positions: poses.iter().map(camera_position).collect(),
            directions: poses.iter().map(view_direction).collect(),
            up_vectors: poses.iter().map(up_vector).collect(),
        }
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

fn distance_stats(values: &[f64]) -> Option<DistanceStats> {
    if values.is_empty() {
        return None;
    }
    let (mean, std) = mean_std(values);
    let (min, max) = min_max(values);
    Some(DistanceStats {
        mean,
        std,
        min,
        max,
    })
}

fn normalize_direction(index: usize, v: &[f64; 3]) -> Result<[f64; 3], PoseError> {
    let norm = norm3(v);
    if !norm.is_finite() || norm < f64::EPSILON {
        return Err(PoseError::ZeroDirection(index));
    }
    Ok([v[0] / norm, v[1] / norm, v[2] / norm])
}

/// Off-diagonal cosine similarities of the view directions.
fn view_similarities(directions: &[[f64; 3]]) -> Vec<f64> {
    let n = directions.len();
    let gram = gram_matrix(directions);

    // mask out the diagonal, each camera is identical to itself
    let mut similarities = Vec::with_capacity(n * n.saturating_sub(1));
    for i in 0..n {
        for j in 0..n {
            if i != j {
                similarities.push(gram.read(i, j));
            }
        }
    }
    similarities
}

fn center_alignment(
    positions: &[[f64; 3]],
    directions: &[[f64; 3]],
    center: &[f64; 3],
) -> Option<AlignmentStats> {
    let cosines = positions
        .iter()
        .zip(directions.iter())
        .filter_map(|(p, d)| {
            let to_center = [center[0] - p[0], center[1] - p[1], center[2] - p[2]];
            let norm = norm3(&to_center);
            if norm < 1e-12 {
                return None;
            }
            Some((d[0] * to_center[0] + d[1] * to_center[1] + d[2] * to_center[2]) / norm)
        })
        .collect::<Vec<_>>();

    if cosines.is_empty() {
        return None;
    }

    let (mean, _) = mean_std(&cosines);
    let (min, _) = min_max(&cosines);
    Some(AlignmentStats {
        mean,
        min,
        num_cameras: cosines.len(),
    })
}

/// Compute geometric quality metrics of a camera set.
///
/// # Arguments
///
/// * `positions` - Camera centers.
/// * `view_directions` - Viewing directions, normalized internally.
///
/// # Returns
///
/// The [`QualityMetrics`]; pairwise sections are `None` for a single camera.
pub fn analyze(
    positions: &[[f64; 3]],
    view_directions: &[[f64; 3]],
) -> Result<QualityMetrics, PoseError> {
    if positions.len() != view_directions.len() {
        return Err(PoseError::LengthMismatch(
            positions.len(),
            view_directions.len(),
        ));
    }
    if positions.is_empty() {
        return Err(PoseError::EmptyPoses);
    }
    if positions.iter().flatten().any(|v| !v.is_finite()) {
        return Err(PoseError::NonFinite("camera positions"));
    }

    let directions = view_directions
        .iter()
        .enumerate()
        .map(|(i, d)| normalize_direction(i, d))
        .collect::<Result<Vec<_>, _>>()?;

    let center = centroid(positions);
    let spread = positions
        .iter()
        .map(|p| euclidean_distance(p, &center))
        .collect::<Vec<_>>();

    let position_spread = distance_stats(&spread).ok_or(PoseError::EmptyPoses)?;
    let inter_camera_distances = distance_stats(&pairwise_distances(positions));

    let view_diversity = {
        let similarities = view_similarities(&directions);
        distance_stats(&similarities).map(|stats| SimilarityStats {
            max: stats.max,
            mean: stats.mean,
            min: stats.min,
            std: stats.std,
        })
    };

    let metrics = QualityMetrics {
        num_cameras: positions.len(),
        position_spread,
        inter_camera_distances,
        view_diversity,
        center_alignment: center_alignment(positions, &directions, &center),
    };

    log::debug!("quality metrics: {:?}", metrics);

    Ok(metrics)
}

/// Compute the quality metrics of NeRF camera-to-world matrices.
pub fn analyze_poses(poses: &[[[f64; 4]; 4]]) -> Result<QualityMetrics, PoseError> {
    let rays = CameraRays::from_poses(poses);
    analyze(&rays.positions, &rays.directions)
}
