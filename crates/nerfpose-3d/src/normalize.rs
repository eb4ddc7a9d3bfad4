use serde::{Deserialize, Serialize};

use crate::{
    linalg::{centroid, euclidean_distance, translation_column},
    PoseError,
};

/// Parameters for [`normalize_poses`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Subtract the centroid of the camera centers.
    pub center: bool,
    /// Divide by the distance percentile.
    pub scale: bool,
    /// Percentile of the distances to the centroid used as scene scale.
    pub percentile: f64,
    /// Scales below this value fall back to 1.
    pub min_scale: f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            center: true,
            scale: true,
            percentile: 90.0,
            min_scale: 1e-8,
        }
    }
}

/// Result of [`normalize_poses`].
#[derive(Debug, Clone)]
pub struct NormalizedPoses {
    /// The recentered and rescaled camera-to-world matrices.
    pub poses: Vec<[[f64; 4]; 4]>,
    /// The center that was subtracted.
    pub center: [f64; 3],
    /// The scale the translations were divided by.
    pub scale: f64,
}

/// Compute a percentile with linear interpolation between order statistics.
///
/// # Arguments
///
/// * `values` - The samples, in any order.
/// * `percentile` - The percentile in [0, 100].
pub fn percentile(values: &[f64], percentile: f64) -> Result<f64, PoseError> {
    if !(0.0..=100.0).contains(&percentile) {
        return Err(PoseError::InvalidPercentile(percentile));
    }
    if values.is_empty() {
        return Err(PoseError::EmptyPoses);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = percentile / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

// 1 when scaling is disabled or the cameras collapse to a point
fn scene_scale(distances: &[f64], config: &NormalizationConfig) -> Result<f64, PoseError> {
    if !config.scale {
        return Ok(1.0);
    }

    let scale = percentile(distances, config.percentile)?;
    if scale < config.min_scale {
        log::warn!(
            "scene scale {:e} is below {:e}, camera centers are nearly identical; using 1",
            scale,
            config.min_scale
        );
        return Ok(1.0);
    }
    Ok(scale)
}

/// Recenter and rescale a batch of camera-to-world matrices.
///
/// The centroid of the camera centers is moved to the origin and the
/// translations are divided by the configured percentile of the distances to
/// the centroid. Rotations are left untouched.
///
/// # Arguments
///
/// * `poses` - Camera-to-world matrices.
/// * `config` - Normalization parameters.
///
/// # Returns
///
/// The normalized poses with the applied center and scale.
pub fn normalize_poses(
    poses: &[[[f64; 4]; 4]],
    config: &NormalizationConfig,
) -> Result<NormalizedPoses, PoseError> {
    if poses.is_empty() {
        return Err(PoseError::EmptyPoses);
    }

    let positions = poses.iter().map(translation_column).collect::<Vec<_>>();
    let scene_center = centroid(&positions);

    let distances = positions
        .iter()
        .map(|p| euclidean_distance(p, &scene_center))
        .collect::<Vec<_>>();

    let scale = scene_scale(&distances, config)?;
    let center = if config.center {
        scene_center
    } else {
        [0.0; 3]
    };

    log::debug!("scene center: {:?}, scene scale: {}", center, scale);

    let poses = poses
        .iter()
        .map(|pose| {
            let mut out = *pose;
            for i in 0..3 {
                out[i][3] = (pose[i][3] - center[i]) / scale;
            }
            out
        })
        .collect();

    Ok(NormalizedPoses {
        poses,
        center,
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{compose_rigid, rotation_block};
    use approx::assert_relative_eq;

    const IDENTITY3: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    fn poses_at(positions: &[[f64; 3]]) -> Vec<[[f64; 4]; 4]> {
        positions
            .iter()
            .map(|t| compose_rigid(&IDENTITY3, t))
            .collect()
    }

    #[test]
    fn test_percentile() -> Result<(), PoseError> {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_relative_eq!(percentile(&values, 50.0)?, 3.0);
        assert_relative_eq!(percentile(&values, 90.0)?, 4.6);
        assert_relative_eq!(percentile(&values, 100.0)?, 5.0);
        assert_relative_eq!(percentile(&[7.0], 90.0)?, 7.0);
        assert_eq!(
            percentile(&values, 120.0),
            Err(PoseError::InvalidPercentile(120.0))
        );
        Ok(())
    }

    #[test]
    fn test_three_cameras() -> Result<(), PoseError> {
        let poses = poses_at(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let result = normalize_poses(&poses, &NormalizationConfig::default())?;

        assert_relative_eq!(result.center[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.center[1], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.center[2], 0.0);
        assert_relative_eq!(result.scale, 5.0_f64.sqrt() / 3.0, epsilon = 1e-12);

        // the two outer cameras define the 90th percentile and land on the unit sphere
        let positions = result
            .poses
            .iter()
            .map(translation_column)
            .collect::<Vec<_>>();
        let new_center = centroid(&positions);
        assert_relative_eq!(
            euclidean_distance(&positions[1], &new_center),
            1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            euclidean_distance(&positions[2], &new_center),
            1.0,
            epsilon = 1e-12
        );

        for (pose, normalized) in poses.iter().zip(result.poses.iter()) {
            assert_eq!(rotation_block(pose), rotation_block(normalized));
        }
        Ok(())
    }

    #[test]
    fn test_centroid_and_scale() -> Result<(), PoseError> {
        let poses = poses_at(&[
            [10.0, 2.0, -3.0],
            [12.0, 5.0, -1.0],
            [9.0, -4.0, 0.5],
            [15.0, 1.0, 2.0],
            [11.0, 0.0, -7.0],
            [40.0, 30.0, 20.0],
        ]);
        let result = normalize_poses(&poses, &NormalizationConfig::default())?;

        let positions = result
            .poses
            .iter()
            .map(translation_column)
            .collect::<Vec<_>>();
        let new_center = centroid(&positions);
        for c in new_center {
            assert_relative_eq!(c, 0.0, epsilon = 1e-12);
        }

        let distances = positions
            .iter()
            .map(|p| euclidean_distance(p, &new_center))
            .collect::<Vec<_>>();
        assert_relative_eq!(percentile(&distances, 90.0)?, 1.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_identical_positions_clamp_scale() -> Result<(), PoseError> {
        let poses = poses_at(&[[2.0, 2.0, 2.0], [2.0, 2.0, 2.0], [2.0, 2.0, 2.0]]);
        let result = normalize_poses(&poses, &NormalizationConfig::default())?;

        assert_eq!(result.scale, 1.0);
        for pose in &result.poses {
            let t = translation_column(pose);
            assert!(t.iter().all(|v| v.is_finite()));
            assert_relative_eq!(t[0], 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_disabled_normalization() -> Result<(), PoseError> {
        let poses = poses_at(&[[1.0, 0.0, 0.0], [3.0, 0.0, 0.0]]);
        let config = NormalizationConfig {
            center: false,
            scale: false,
            ..Default::default()
        };
        let result = normalize_poses(&poses, &config)?;
        assert_eq!(result.poses, poses);
        assert_eq!(result.scale, 1.0);
        Ok(())
    }

    #[test]
    fn test_scene_scale_only_when_scaling() -> Result<(), PoseError> {
        let collapsed = [0.0, 0.0, 0.0];
        let config = NormalizationConfig::default();
        assert_eq!(scene_scale(&collapsed, &config)?, 1.0);
        assert_relative_eq!(scene_scale(&[1.0, 2.0, 3.0], &config)?, 2.8, epsilon = 1e-12);

        // the percentile is not even evaluated with scaling off
        let disabled = NormalizationConfig {
            scale: false,
            percentile: 150.0,
            ..Default::default()
        };
        assert_eq!(scene_scale(&collapsed, &disabled)?, 1.0);
        Ok(())
    }

    #[test]
    fn test_empty() {
        assert!(matches!(
            normalize_poses(&[], &NormalizationConfig::default()),
            Err(PoseError::EmptyPoses)
        ));
    }
}
