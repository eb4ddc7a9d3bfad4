use crate::{
    linalg::{compose_rigid, invert_rigid, matmul44, translation_column},
    PoseError,
};

/// Change of basis from the SfM camera axes (x right, y down, z forward) to
/// the NeRF / OpenGL camera axes (x right, y up, z backward).
///
/// It flips the second and third axes, which is a rotation of pi about x and
/// therefore its own inverse.
pub const COLMAP_TO_NERF: [[f64; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, -1.0, 0.0, 0.0],
    [0.0, 0.0, -1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Compute the rotation matrix from a scalar-first quaternion.
///
/// The quaternion is normalized before use.
///
/// # Arguments
///
/// * `q` - The quaternion as `[qw, qx, qy, qz]`.
///
/// # Returns
///
/// The rotation matrix.
///
/// Example:
///
/// ```
/// use nerfpose_3d::transforms::quaternion_to_rotation_matrix;
///
/// let rotation = quaternion_to_rotation_matrix(&[1.0, 0.0, 0.0, 0.0]).unwrap();
/// assert_eq!(rotation, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
/// ```
pub fn quaternion_to_rotation_matrix(q: &[f64; 4]) -> Result<[[f64; 3]; 3], PoseError> {
    if q.iter().any(|v| !v.is_finite()) {
        return Err(PoseError::NonFinite("quaternion"));
    }

    let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if norm < f64::EPSILON {
        return Err(PoseError::ZeroQuaternion);
    }

    let w = q[0] / norm;
    let x = q[1] / norm;
    let y = q[2] / norm;
    let z = q[3] / norm;

    Ok([
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
        ],
        [
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
        ],
        [
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ],
    ])
}

/// Express a camera-to-world transform in another set of axes.
///
/// Computes `C * M * C^-1`. The inverse is taken as the rigid inverse of `C`,
/// so `C` must be an orthonormal change of basis without translation.
pub fn change_basis(m: &[[f64; 4]; 4], basis: &[[f64; 4]; 4]) -> [[f64; 4]; 4] {
    matmul44(&matmul44(basis, m), &invert_rigid(basis))
}

/// Convert an SfM world-to-camera pose to a NeRF camera-to-world matrix.
///
/// # Arguments
///
/// * `rotation` - World-to-camera rotation as `[qw, qx, qy, qz]`.
/// * `translation` - World-to-camera translation.
///
/// # Returns
///
/// The 4x4 camera-to-world matrix in the NeRF axis convention.
pub fn colmap_to_nerf(
    rotation: &[f64; 4],
    translation: &[f64; 3],
) -> Result<[[f64; 4]; 4], PoseError> {
    if translation.iter().any(|v| !v.is_finite()) {
        return Err(PoseError::NonFinite("translation"));
    }

    let world_r_cam = quaternion_to_rotation_matrix(rotation)?;
    let cam_from_world = compose_rigid(&world_r_cam, translation);
    let world_from_cam = invert_rigid(&cam_from_world);

    Ok(change_basis(&world_from_cam, &COLMAP_TO_NERF))
}

/// Horizontal field of view in radians, `2 * atan(width / (2 * fx))`.
pub fn horizontal_fov(width: f64, fx: f64) -> f64 {
    2.0 * (width / (2.0 * fx)).atan()
}

/// Camera center of a camera-to-world matrix.
pub fn camera_position(m: &[[f64; 4]; 4]) -> [f64; 3] {
    translation_column(m)
}

/// Viewing direction of a NeRF camera-to-world matrix.
///
/// NeRF cameras look down their negative z axis.
pub fn view_direction(m: &[[f64; 4]; 4]) -> [f64; 3] {
    [-m[0][2], -m[1][2], -m[2][2]]
}

/// Up vector of a NeRF camera-to-world matrix.
pub fn up_vector(m: &[[f64; 4]; 4]) -> [f64; 3] {
    [m[0][1], m[1][1], m[2][1]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{det33, is_rotation, rotation_block, IDENTITY4};
    use approx::assert_relative_eq;
    use rand::Rng;

    #[test]
    fn test_flip_is_an_involution() {
        let squared = matmul44(&COLMAP_TO_NERF, &COLMAP_TO_NERF);
        assert_eq!(squared, IDENTITY4);
        assert_eq!(invert_rigid(&COLMAP_TO_NERF), COLMAP_TO_NERF);

        // so C * M * C^-1, C * M * C and C * M * C^T agree for this basis
        let m = colmap_to_nerf(&[0.9, 0.1, -0.3, 0.2], &[0.5, -1.0, 2.0]).unwrap();
        let via_c = matmul44(&matmul44(&COLMAP_TO_NERF, &m), &COLMAP_TO_NERF);
        let via_inv = change_basis(&m, &COLMAP_TO_NERF);
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(via_c[i][j], via_inv[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_identity_pose() -> Result<(), PoseError> {
        let m = colmap_to_nerf(&[1.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 0.0])?;
        assert_eq!(m, IDENTITY4);
        Ok(())
    }

    #[test]
    fn test_camera_center() -> Result<(), PoseError> {
        // camera at (0, 0, -5) in SfM world coordinates looking along +z
        let m = colmap_to_nerf(&[1.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 5.0])?;
        let position = camera_position(&m);
        // y and z flip in the target frame
        assert_relative_eq!(position[0], 0.0);
        assert_relative_eq!(position[1], 0.0);
        assert_relative_eq!(position[2], 5.0);

        // SfM forward +z becomes NeRF -z, the camera still looks at the origin
        let direction = view_direction(&m);
        assert_relative_eq!(direction[2], -1.0);
        Ok(())
    }

    #[test]
    fn test_quaternion_is_normalized() -> Result<(), PoseError> {
        let r_unit = quaternion_to_rotation_matrix(&[0.5, 0.5, 0.5, 0.5])?;
        let r_scaled = quaternion_to_rotation_matrix(&[2.0, 2.0, 2.0, 2.0])?;
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(r_unit[i][j], r_scaled[i][j], epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_random_poses_are_rigid() -> Result<(), PoseError> {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let q = [
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            ];
            let t = [
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            ];
            if q.iter().map(|v: &f64| v * v).sum::<f64>() < 1e-6 {
                continue;
            }
            let m = colmap_to_nerf(&q, &t)?;
            let rotation = rotation_block(&m);
            assert!(is_rotation(&rotation, 1e-9));
            assert_relative_eq!(det33(&rotation), 1.0, epsilon = 1e-9);
            assert_eq!(m[3], [0.0, 0.0, 0.0, 1.0]);
        }
        Ok(())
    }

    #[test]
    fn test_non_finite_input() {
        assert_eq!(
            colmap_to_nerf(&[f64::NAN, 0.0, 0.0, 0.0], &[0.0; 3]),
            Err(PoseError::NonFinite("quaternion"))
        );
        assert_eq!(
            colmap_to_nerf(&[1.0, 0.0, 0.0, 0.0], &[0.0, f64::INFINITY, 0.0]),
            Err(PoseError::NonFinite("translation"))
        );
        assert_eq!(
            colmap_to_nerf(&[0.0; 4], &[0.0; 3]),
            Err(PoseError::ZeroQuaternion)
        );
    }

    #[test]
    fn test_horizontal_fov() {
        // width equal to 2 * fx gives 90 degrees
        assert_relative_eq!(
            horizontal_fov(1000.0, 500.0),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
    }
}
