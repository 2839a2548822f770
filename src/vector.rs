//! Fixed-dimension vectors with checked arithmetic.
//!
//! [`VectorN`] is a plain value type. Binary operations between two vectors check that
//! both sides share a dimension and fail with [`MathError::DimensionMismatch`]
//! otherwise; scalar operations are infallible and use the `std::ops` operators.
//!
//! In-place variants (`add_in_place`, `normalize`, `transform_into`, `*=`, `/=`) are
//! provided for the per-frame hot path, expression-style variants return new vectors.

use std::fmt;
use std::ops::{Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg};

use glam::{Vec3, Vec4};

use crate::error::{MathError, Result};
use crate::matrix::MatrixView;

/// Divisors at or below this magnitude make a homogeneous divide degenerate.
pub(crate) const DIVISOR_EPSILON: f32 = f32::EPSILON;

/// Whether dividing by `divisor` would produce an infinite or undefined result.
pub(crate) fn is_degenerate_divisor(divisor: f32) -> bool {
    !divisor.is_finite() || divisor.abs() <= DIVISOR_EPSILON
}

/// An ordered sequence of `dimension` floats.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorN {
    components: Vec<f32>,
}

impl VectorN {
    /// A zero vector of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            components: vec![0.0; dimension],
        }
    }

    pub fn from_slice(components: &[f32]) -> Self {
        Self {
            components: components.to_vec(),
        }
    }

    /// Builds a vector from `f(index)` for each component.
    pub fn from_fn(dimension: usize, f: impl FnMut(usize) -> f32) -> Self {
        Self {
            components: (0..dimension).map(f).collect(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.components.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.components
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.components
    }

    /// The first component.
    ///
    /// # Panics
    ///
    /// `x`, `y`, `z` and `q` panic when the vector is too short to have the component.
    /// Use [`get`](Self::get) for a checked read.
    pub fn x(&self) -> f32 {
        self.components[0]
    }

    pub fn y(&self) -> f32 {
        self.components[1]
    }

    pub fn z(&self) -> f32 {
        self.components[2]
    }

    /// The fourth component.
    pub fn q(&self) -> f32 {
        self.components[3]
    }

    /// The last component, i.e. the highest coordinate used for dimension collapse.
    pub fn highest(&self) -> f32 {
        self.components.last().copied().unwrap_or(0.0)
    }

    /// Returns component `index`.
    pub fn get(&self, index: usize) -> Result<f32> {
        self.components
            .get(index)
            .copied()
            .ok_or(MathError::out_of_range(index, self.dimension()))
    }

    /// Sets component `index` to `value`.
    pub fn set(&mut self, index: usize, value: f32) -> Result<()> {
        let dimension = self.dimension();
        let slot = self
            .components
            .get_mut(index)
            .ok_or(MathError::out_of_range(index, dimension))?;
        *slot = value;
        Ok(())
    }

    /// Overwrites this vector with `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &VectorN) {
        self.components.clear();
        self.components.extend_from_slice(&other.components);
    }

    fn require_same(&self, rhs: &VectorN) -> Result<()> {
        if self.dimension() != rhs.dimension() {
            return Err(MathError::mismatch(self.dimension(), rhs.dimension()));
        }
        Ok(())
    }

    /// Scalar product.
    pub fn dot(&self, rhs: &VectorN) -> Result<f32> {
        self.require_same(rhs)?;
        Ok(self
            .components
            .iter()
            .zip(&rhs.components)
            .map(|(a, b)| a * b)
            .sum())
    }

    pub fn length(&self) -> f32 {
        self.components.iter().map(|c| c * c).sum::<f32>().sqrt()
    }

    /// Vector product. Only defined for 3D vectors.
    pub fn cross(&self, rhs: &VectorN) -> Result<VectorN> {
        if self.dimension() != 3 {
            return Err(MathError::mismatch(3, self.dimension()));
        }
        if rhs.dimension() != 3 {
            return Err(MathError::mismatch(3, rhs.dimension()));
        }
        let c = crate::matrix::cross3(
            [self.x(), self.y(), self.z()],
            [rhs.x(), rhs.y(), rhs.z()],
        );
        Ok(VectorN::from_slice(&c))
    }

    /// Scales this vector to unit length. Fails with `DivideByZero` on a zero vector,
    /// leaving the vector untouched.
    pub fn normalize(&mut self) -> Result<()> {
        let length = self.length();
        if length == 0.0 {
            return Err(MathError::DivideByZero);
        }
        *self /= length;
        Ok(())
    }

    pub fn normalized(&self) -> Result<VectorN> {
        let mut v = self.clone();
        v.normalize()?;
        Ok(v)
    }

    pub fn try_add(&self, rhs: &VectorN) -> Result<VectorN> {
        let mut v = self.clone();
        v.add_in_place(rhs)?;
        Ok(v)
    }

    pub fn try_sub(&self, rhs: &VectorN) -> Result<VectorN> {
        let mut v = self.clone();
        v.sub_in_place(rhs)?;
        Ok(v)
    }

    pub fn add_in_place(&mut self, rhs: &VectorN) -> Result<()> {
        self.require_same(rhs)?;
        for (a, b) in self.components.iter_mut().zip(&rhs.components) {
            *a += b;
        }
        Ok(())
    }

    pub fn sub_in_place(&mut self, rhs: &VectorN) -> Result<()> {
        self.require_same(rhs)?;
        for (a, b) in self.components.iter_mut().zip(&rhs.components) {
            *a -= b;
        }
        Ok(())
    }

    /// Returns `self * matrix`.
    ///
    /// - `dimension == rows`: explicit homogeneous product, no division.
    /// - `dimension + 1 == rows`: an implicit trailing `1` is appended, and the result is
    ///   divided by the sum of the virtual homogeneous column. A divisor that is not finite
    ///   or lies within [`f32::EPSILON`] of zero fails with `DegenerateProjection`.
    ///
    /// Any other pairing, or a non-quadratic matrix, fails with `DimensionMismatch`.
    pub fn transformed<M: MatrixView + ?Sized>(&self, matrix: &M) -> Result<VectorN> {
        let mut out = VectorN::new(self.dimension());
        self.transform_into(matrix, &mut out)?;
        Ok(out)
    }

    /// Allocation-free form of [`transformed`](Self::transformed); `out` is resized to
    /// this vector's dimension. On error `out` is left unspecified.
    pub fn transform_into<M: MatrixView + ?Sized>(&self, matrix: &M, out: &mut VectorN) -> Result<()> {
        if !matrix.is_quadratic() {
            return Err(MathError::mismatch(matrix.rows(), matrix.cols()));
        }
        let n = matrix.rows();
        let dim = self.dimension();
        let implicit = if dim == n {
            false
        } else if dim + 1 == n {
            true
        } else {
            return Err(MathError::mismatch(n, dim));
        };

        let cells = matrix.cells();
        let column_sum = |col: usize| -> f32 {
            let sum: f32 = (0..dim).map(|i| self.components[i] * cells[i * n + col]).sum();
            if implicit { sum + cells[dim * n + col] } else { sum }
        };

        out.components.resize(dim, 0.0);
        if implicit {
            let divisor = column_sum(dim);
            if is_degenerate_divisor(divisor) {
                return Err(MathError::DegenerateProjection);
            }
            for col in 0..dim {
                out.components[col] = column_sum(col) / divisor;
            }
        } else {
            for col in 0..dim {
                out.components[col] = column_sum(col);
            }
        }
        Ok(())
    }

    /// The first three components as a glam vector. Missing components read as zero.
    pub fn to_vec3(&self) -> Vec3 {
        let c = |i: usize| self.components.get(i).copied().unwrap_or(0.0);
        Vec3::new(c(0), c(1), c(2))
    }
}

impl From<Vec3> for VectorN {
    fn from(v: Vec3) -> Self {
        Self::from_slice(&v.to_array())
    }
}

impl From<Vec4> for VectorN {
    fn from(v: Vec4) -> Self {
        Self::from_slice(&v.to_array())
    }
}

impl From<Vec<f32>> for VectorN {
    fn from(components: Vec<f32>) -> Self {
        Self { components }
    }
}

impl Index<usize> for VectorN {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.components[index]
    }
}

impl IndexMut<usize> for VectorN {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.components[index]
    }
}

impl MulAssign<f32> for VectorN {
    fn mul_assign(&mut self, factor: f32) {
        for c in &mut self.components {
            *c *= factor;
        }
    }
}

impl DivAssign<f32> for VectorN {
    fn div_assign(&mut self, divisor: f32) {
        for c in &mut self.components {
            *c /= divisor;
        }
    }
}

impl Mul<f32> for &VectorN {
    type Output = VectorN;

    fn mul(self, factor: f32) -> VectorN {
        let mut v = self.clone();
        v *= factor;
        v
    }
}

impl Div<f32> for &VectorN {
    type Output = VectorN;

    fn div(self, divisor: f32) -> VectorN {
        let mut v = self.clone();
        v /= divisor;
        v
    }
}

impl Neg for &VectorN {
    type Output = VectorN;

    fn neg(self) -> VectorN {
        self * -1.0
    }
}

impl fmt::Display for VectorN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( [{}d] ", self.dimension())?;
        for (i, c) in self.components.iter().enumerate() {
            write!(f, "{:.3}", c)?;
            f.write_str(if i + 1 == self.components.len() { " )" } else { " | " })?;
        }
        if self.components.is_empty() {
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;
    use approx::assert_abs_diff_eq;

    fn v(components: &[f32]) -> VectorN {
        VectorN::from_slice(components)
    }

    #[test]
    fn dot_and_length() {
        let a = v(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.dot(&v(&[4.0, 3.0, 2.0, 1.0])).unwrap(), 20.0);
        assert_abs_diff_eq!(v(&[3.0, 4.0]).length(), 5.0);
    }

    #[test]
    fn mismatched_operands_fail() {
        let a = v(&[1.0, 2.0, 3.0]);
        let b = v(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.dot(&b), Err(MathError::DimensionMismatch { expected: 3, found: 4 }));
        assert!(a.try_add(&b).is_err());
        assert!(a.try_sub(&b).is_err());
    }

    #[test]
    fn in_place_subtraction_actually_subtracts() {
        let mut a = v(&[5.0, 5.0, 5.0]);
        a.sub_in_place(&v(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(a.as_slice(), &[4.0, 3.0, 2.0]);
    }

    #[test]
    fn cross_is_three_dimensional_only() {
        let x = v(&[1.0, 0.0, 0.0]);
        let y = v(&[0.0, 1.0, 0.0]);
        assert_eq!(x.cross(&y).unwrap().as_slice(), &[0.0, 0.0, 1.0]);
        assert!(v(&[1.0, 0.0, 0.0, 0.0]).cross(&y).is_err());
    }

    #[test]
    fn normalize_zero_vector_fails_explicitly() {
        let mut zero = VectorN::new(4);
        assert_eq!(zero.normalize(), Err(MathError::DivideByZero));
        assert_eq!(zero.as_slice(), &[0.0; 4]);

        let unit = v(&[0.0, 3.0, 4.0]).normalized().unwrap();
        assert_abs_diff_eq!(unit.length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn scalar_operators() {
        let a = v(&[2.0, 4.0]);
        assert_eq!((&a * 2.0).as_slice(), &[4.0, 8.0]);
        assert_eq!((&a / 2.0).as_slice(), &[1.0, 2.0]);
        assert_eq!((-&a).as_slice(), &[-2.0, -4.0]);
    }

    #[test]
    fn explicit_homogeneous_product() {
        let rows: [&[f32]; 4] = [
            &[1.0, 2.0, 3.0, 4.0],
            &[5.0, 6.0, 7.0, 8.0],
            &[9.0, 10.0, 11.0, 12.0],
            &[13.0, 14.0, 15.0, 16.0],
        ];
        let m = Matrix::from_rows(&rows).unwrap();
        let p = v(&[1.0, 2.0, 3.0, 4.0]).transformed(&m).unwrap();
        assert_eq!(p.as_slice(), &[90.0, 100.0, 110.0, 120.0]);
    }

    #[test]
    fn implicit_homogeneous_product_divides() {
        // Scale the homogeneous column by 2: every point shrinks by half after the divide.
        let m = Matrix::scale(5, &v(&[1.0, 1.0, 1.0, 1.0, 2.0])).unwrap();
        let p = v(&[2.0, 4.0, 6.0, 8.0]).transformed(&m).unwrap();
        assert_eq!(p.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn implicit_translation() {
        let m = Matrix::translation(5, &v(&[1.0, 0.0, 0.0, -1.0])).unwrap();
        let p = v(&[1.0, 1.0, 1.0, 1.0]).transformed(&m).unwrap();
        assert_eq!(p.as_slice(), &[2.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn three_d_vector_against_five_by_five_fails() {
        let m = Matrix::identity(5).unwrap();
        assert_eq!(
            v(&[1.0, 2.0, 3.0]).transformed(&m),
            Err(MathError::DimensionMismatch { expected: 5, found: 3 })
        );
    }

    #[test]
    fn zero_homogeneous_divisor_is_degenerate() {
        let m = Matrix::scale(4, &v(&[1.0, 1.0, 1.0, 0.0])).unwrap();
        assert_eq!(
            v(&[1.0, 1.0, 1.0]).transformed(&m),
            Err(MathError::DegenerateProjection)
        );
    }

    #[test]
    #[should_panic]
    fn q_of_a_3d_vector_panics() {
        let p = v(&[1.0, 2.0, 3.0]);
        assert_eq!(p.get(3), Err(MathError::OutOfRange { index: 3, extent: 3 }));
        p.q();
    }

    #[test]
    fn tiny_or_nan_homogeneous_divisor_is_degenerate() {
        for w in [1e-45, -1e-10, f32::EPSILON, f32::NAN, f32::INFINITY] {
            let m = Matrix::scale(4, &v(&[1.0, 1.0, 1.0, w])).unwrap();
            assert_eq!(
                v(&[1.0, 1.0, 1.0]).transformed(&m),
                Err(MathError::DegenerateProjection),
                "w = {w}"
            );
        }
        // Small but well above epsilon still divides.
        let m = Matrix::scale(4, &v(&[1.0, 1.0, 1.0, 1.0 / 1024.0])).unwrap();
        assert_eq!(
            v(&[1.0, 1.0, 1.0]).transformed(&m).unwrap().as_slice(),
            &[1024.0, 1024.0, 1024.0]
        );
    }

    #[test]
    fn transform_into_reuses_output() {
        let m = Matrix::identity(4).unwrap();
        let mut out = VectorN::new(0);
        v(&[1.0, 2.0, 3.0, 1.0]).transform_into(&m, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn display_format() {
        assert_eq!(v(&[1.0, 0.5]).to_string(), "( [2d] 1.000 | 0.500 )");
    }

    #[test]
    fn glam_conversions() {
        let from3 = VectorN::from(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(from3.dimension(), 3);
        let from4 = VectorN::from(Vec4::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(from4.q(), 4.0);
        assert_eq!(from4.to_vec3(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(v(&[1.0]).to_vec3(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn checked_component_access() {
        let mut a = VectorN::new(2);
        assert!(a.set(2, 1.0).is_err());
        a.set(1, 3.0).unwrap();
        assert_eq!(a.get(1).unwrap(), 3.0);
        assert_eq!(a.get(5), Err(MathError::OutOfRange { index: 5, extent: 2 }));
    }
}
