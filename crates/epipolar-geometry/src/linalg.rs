use crate::error::GeometryError;
use glam::{DMat3, DVec3};

/// Singular value decomposition `M = U · diag(s) · Vᵗ` of a 3x3 matrix.
#[derive(Clone, Copy, Debug)]
pub struct Svd3 {
    /// Left singular vectors, one per column.
    pub u: DMat3,
    /// Singular values in non-increasing order.
    pub s: DVec3,
    /// Right singular vectors, one per column.
    pub v: DMat3,
}

impl Svd3 {
    /// Rebuild `U · diag(s) · Vᵗ` with replaced singular values.
    pub fn recompose(&self, s: DVec3) -> DMat3 {
        self.u * DMat3::from_diagonal(s) * self.v.transpose()
    }
}

/// Compute the singular value decomposition of a 3x3 matrix.
///
/// Fails with [`GeometryError::SvdFailed`] when the input or any factor is not finite.
pub fn svd3(m: &DMat3) -> Result<Svd3, GeometryError> {
    if !m.is_finite() {
        return Err(GeometryError::SvdFailed);
    }

    let a = faer::Mat::<f64>::from_fn(3, 3, |i, j| m.col(j)[i]);
    let svd = a.svd();
    let s = svd.s_diagonal();

    let result = Svd3 {
        u: mat3_from_faer(svd.u()),
        s: DVec3::new(s.read(0), s.read(1), s.read(2)),
        v: mat3_from_faer(svd.v()),
    };

    if !(result.u.is_finite() && result.s.is_finite() && result.v.is_finite()) {
        return Err(GeometryError::SvdFailed);
    }

    Ok(result)
}

/// Build a matrix from its rows.
pub fn mat3_from_rows(rows: [[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols_array_2d(&rows).transpose()
}

/// The cross product matrix `[v]ₓ`, such that `[v]ₓ · w = v × w`.
pub fn skew(v: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, v.z, -v.y),
        DVec3::new(-v.z, 0.0, v.x),
        DVec3::new(v.y, -v.x, 0.0),
    )
}

/// Square root of the sum of squared entries.
pub fn frobenius_norm(m: &DMat3) -> f64 {
    m.to_cols_array().iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn mat3_from_faer(m: faer::MatRef<'_, f64>) -> DMat3 {
    DMat3::from_cols_array_2d(&[
        [m.read(0, 0), m.read(1, 0), m.read(2, 0)],
        [m.read(0, 1), m.read(1, 1), m.read(2, 1)],
        [m.read(0, 2), m.read(1, 2), m.read(2, 2)],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_svd3_reconstructs() -> Result<(), GeometryError> {
        let m = mat3_from_rows([[0.1, 0.4, -0.2], [0.2, -0.1, 0.5], [-0.3, 0.2, 0.3]]);
        let svd = svd3(&m)?;

        assert!(svd.s.x >= svd.s.y && svd.s.y >= svd.s.z);
        let rebuilt = svd.recompose(svd.s);
        for (a, b) in rebuilt.to_cols_array().iter().zip(m.to_cols_array()) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_svd3_rejects_non_finite() {
        let mut m = DMat3::IDENTITY;
        m.y_axis.z = f64::NAN;
        assert_eq!(svd3(&m).unwrap_err(), GeometryError::SvdFailed);
    }

    #[test]
    fn test_skew_is_cross_product() {
        let v = DVec3::new(1.0, -2.0, 0.5);
        let w = DVec3::new(0.3, 4.0, -1.0);
        let expected = v.cross(w);
        let actual = skew(v) * w;
        assert_relative_eq!(actual.x, expected.x);
        assert_relative_eq!(actual.y, expected.y);
        assert_relative_eq!(actual.z, expected.z);
    }

    #[test]
    fn test_mat3_from_rows() {
        let m = mat3_from_rows([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        assert_eq!(m.row(0), DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(m.col(0), DVec3::new(1.0, 4.0, 7.0));
        assert_relative_eq!(frobenius_norm(&m), 285.0f64.sqrt());
    }
}
