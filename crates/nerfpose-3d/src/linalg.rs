/// Identity 4x4 matrix.
pub const IDENTITY4: [[f64; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Multiply two 4x4 matrices.
pub fn matmul44(a: &[[f64; 4]; 4], b: &[[f64; 4]; 4]) -> [[f64; 4]; 4] {
    let mut out = [[0.0; 4]; 4];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = (0..4).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Multiply two 3x3 matrices.
pub fn matmul33(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Transpose a 3x3 matrix.
pub fn transpose33(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in m.iter().enumerate() {
        for (j, val) in row.iter().enumerate() {
            out[j][i] = *val;
        }
    }
    out
}

/// Multiply a 3x3 matrix by a 3-vector.
pub fn matvec33(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Determinant of a 3x3 matrix.
pub fn det33(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Upper-left 3x3 block of a homogeneous transform.
pub fn rotation_block(m: &[[f64; 4]; 4]) -> [[f64; 3]; 3] {
    [
        [m[0][0], m[0][1], m[0][2]],
        [m[1][0], m[1][1], m[1][2]],
        [m[2][0], m[2][1], m[2][2]],
    ]
}

/// Translation column of a homogeneous transform.
pub fn translation_column(m: &[[f64; 4]; 4]) -> [f64; 3] {
    [m[0][3], m[1][3], m[2][3]]
}

/// Assemble a homogeneous transform from a rotation and a translation.
pub fn compose_rigid(rotation: &[[f64; 3]; 3], translation: &[f64; 3]) -> [[f64; 4]; 4] {
    let mut out = IDENTITY4;
    for i in 0..3 {
        out[i][..3].copy_from_slice(&rotation[i]);
        out[i][3] = translation[i];
    }
    out
}

/// Invert a rigid transform.
///
/// R' = R^T, t' = -R^T * t
///
/// PRECONDITION: the rotation block is orthonormal.
pub fn invert_rigid(m: &[[f64; 4]; 4]) -> [[f64; 4]; 4] {
    let rotation_inv = transpose33(&rotation_block(m));
    let t = matvec33(&rotation_inv, &translation_column(m));
    compose_rigid(&rotation_inv, &[-t[0], -t[1], -t[2]])
}

/// Largest absolute entry of R * R^T - I.
pub fn orthonormality_error(rotation: &[[f64; 3]; 3]) -> f64 {
    let rrt = matmul33(rotation, &transpose33(rotation));
    let mut max_err: f64 = 0.0;
    for (i, row) in rrt.iter().enumerate() {
        for (j, val) in row.iter().enumerate() {
            let expected = if i == j { 1.0 } else { 0.0 };
            max_err = max_err.max((val - expected).abs());
        }
    }
    max_err
}

/// Check that a rotation block is orthonormal with determinant +1.
pub fn is_rotation(rotation: &[[f64; 3]; 3], tol: f64) -> bool {
    orthonormality_error(rotation) < tol && (det33(rotation) - 1.0).abs() < tol
}

/// Euclidean norm of a 3-vector.
pub fn norm3(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Euclidean distance between two points.
pub fn euclidean_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    norm3(&[a[0] - b[0], a[1] - b[1], a[2] - b[2]])
}

/// Arithmetic mean of a set of points.
///
/// PRECONDITION: points is not empty.
pub fn centroid(points: &[[f64; 3]]) -> [f64; 3] {
    let n = points.len() as f64;
    let sum = points.iter().fold([0.0; 3], |acc, p| {
        [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]
    });
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

/// Compute the Gram matrix V * V^T of a set of 3-vectors.
///
/// Entry (i, j) holds the dot product of vectors i and j.
pub fn gram_matrix(vectors: &[[f64; 3]]) -> faer::Mat<f64> {
    let n = vectors.len();
    let v = faer::Mat::<f64>::from_fn(n, 3, |i, j| vectors[i][j]);

    let mut gram = faer::Mat::<f64>::zeros(n, n);
    faer::linalg::matmul::matmul(
        gram.as_mut(),
        v.as_ref(),
        v.as_ref().transpose(),
        None,
        1.0,
        faer::Parallelism::None,
    );

    gram
}

/// Pairwise Euclidean distances of the upper triangle, row by row.
///
/// Uses |a - b|^2 = a.a + b.b - 2 a.b on the Gram matrix of the centered
/// points, so the result has `n * (n - 1) / 2` entries.
pub fn pairwise_distances(points: &[[f64; 3]]) -> Vec<f64> {
    if points.len() < 2 {
        return Vec::new();
    }

    let c = centroid(points);
    let centered = points
        .iter()
        .map(|p| [p[0] - c[0], p[1] - c[1], p[2] - c[2]])
        .collect::<Vec<_>>();
    let gram = gram_matrix(&centered);

    let n = points.len();
    let mut distances = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let sq = gram.read(i, i) + gram.read(j, j) - 2.0 * gram.read(i, j);
            distances.push(sq.max(0.0).sqrt());
        }
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invert_rigid_roundtrip() {
        // 90 degrees about x
        let rotation = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        let m = compose_rigid(&rotation, &[1.0, 2.0, 3.0]);
        let identity = matmul44(&m, &invert_rigid(&m));
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(identity[i][j], IDENTITY4[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_det33() {
        let m = [[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]];
        assert_relative_eq!(det33(&m), 24.0);
        let flip = [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(!is_rotation(&flip, 1e-9));
    }

    #[test]
    fn test_gram_matrix() {
        let vectors = [[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [1.0, 1.0, 0.0]];
        let gram = gram_matrix(&vectors);
        assert_eq!(gram.nrows(), 3);
        assert_relative_eq!(gram.read(0, 0), 1.0);
        assert_relative_eq!(gram.read(1, 1), 4.0);
        assert_relative_eq!(gram.read(0, 1), 0.0);
        assert_relative_eq!(gram.read(1, 2), 2.0);
        assert_relative_eq!(gram.read(2, 0), 1.0);
    }

    #[test]
    fn test_pairwise_distances() {
        let points = [[0.0, 0.0, 0.0], [3.0, 4.0, 0.0], [0.0, 0.0, 1.0]];
        let distances = pairwise_distances(&points);
        assert_eq!(distances.len(), 3);
        assert_relative_eq!(distances[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(distances[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(distances[2], 26.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_pairwise_distances_single_point() {
        assert!(pairwise_distances(&[[1.0, 2.0, 3.0]]).is_empty());
    }
}
