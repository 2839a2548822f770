//! Row-major matrices of arbitrary size and the cell kernels shared with [`MatrixBuffer`].
//!
//! All transforms in this crate follow the **row-vector** convention: a point `p` is
//! transformed as `p * M`, and a chain `A * B * C` applies `A` first. The last row of a
//! quadratic `n × n` matrix is the *base row* holding the translation, the last column
//! carries the homogeneous divisor.
//!
//! The loaders (`load_*`) operate on flat `n × n` cell slices so that an owned
//! [`Matrix`] and a slot inside a [`MatrixBuffer`] share one implementation.
//!
//! # Rotation convention
//!
//! A rotation in the `a`-`b` plane by `θ` starts from identity and sets
//!
//! | cell     | value    |
//! |----------|----------|
//! | `(a, a)` | `cos θ`  |
//! | `(a, b)` | `sin θ`  |
//! | `(b, a)` | `-sin θ` |
//! | `(b, b)` | `cos θ`  |
//!
//! ```
//! use tesseract::{Matrix, RotationPlane, VectorN};
//!
//! let m = Matrix::rotation(4, RotationPlane::YX, std::f32::consts::FRAC_PI_2).unwrap();
//! let p = VectorN::from_slice(&[0.0, 1.0, 0.0, 1.0]).transformed(&m).unwrap();
//! assert!((p.x() - 1.0).abs() < 1e-5);
//! assert!(p.y().abs() < 1e-5);
//! ```
//!
//! [`MatrixBuffer`]: crate::MatrixBuffer

use std::fmt;
use std::ops::{Index, IndexMut};

use glam::Mat4;

use crate::error::{MathError, Result};
use crate::vector::VectorN;

/// Read access to a row-major matrix, owned or borrowed from a buffer slot.
pub trait MatrixView {
    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    /// All cells in row-major order, `rows * cols` long.
    fn cells(&self) -> &[f32];

    /// Cell at `row`/`col`. Panics when out of bounds, like slice indexing.
    #[inline]
    fn at(&self, row: usize, col: usize) -> f32 {
        self.cells()[row * self.cols() + col]
    }

    fn is_quadratic(&self) -> bool {
        self.rows() == self.cols()
    }
}

/// A coordinate plane a rotation takes place in, named by its two axes.
///
/// `YX` and `XY` span the same plane with opposite orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RotationPlane {
    YZ,
    ZX,
    XY,
    YX,
    /// The plane spanned by X and the fourth spatial axis Q.
    XQ,
}

impl RotationPlane {
    /// Every plane, in declaration order.
    pub const ALL: [RotationPlane; 5] = [
        RotationPlane::YZ,
        RotationPlane::ZX,
        RotationPlane::XY,
        RotationPlane::YX,
        RotationPlane::XQ,
    ];

    /// The `(a, b)` axis pair fed to the rotation loader.
    pub const fn axes(self) -> (usize, usize) {
        match self {
            RotationPlane::YZ => (1, 2),
            RotationPlane::ZX => (2, 0),
            RotationPlane::XY => (0, 1),
            RotationPlane::YX => (1, 0),
            RotationPlane::XQ => (0, 3),
        }
    }

    /// Highest axis index touched by this plane.
    pub const fn max_axis(self) -> usize {
        let (a, b) = self.axes();
        if a > b { a } else { b }
    }
}

/// A `rows × cols` matrix of `f32`, stored row-major.
///
/// Constructors fill the matrix from identity, so a freshly created quadratic matrix
/// is the identity transform and non-quadratic matrices have ones on their main
/// diagonal.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    cells: Vec<f32>,
}

impl Matrix {
    /// Creates a `rows × cols` matrix initialized from identity.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        Self::from_fn(rows, cols, |row, col| if row == col { 1.0 } else { 0.0 })
    }

    /// Creates a matrix whose cells are produced by `f(row, col)`.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f32) -> Result<Self> {
        if rows == 0 {
            return Err(MathError::out_of_range(0, rows));
        }
        if cols == 0 {
            return Err(MathError::out_of_range(0, cols));
        }
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(f(row, col));
            }
        }
        Ok(Self { rows, cols, cells })
    }

    /// Creates a matrix from equally long rows.
    pub fn from_rows(rows: &[&[f32]]) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(MathError::mismatch(cols, bad.len()));
        }
        Self::from_fn(rows.len(), cols, |row, col| rows[row][col])
    }

    /// The `n × n` identity matrix.
    pub fn identity(n: usize) -> Result<Self> {
        Self::new(n, n)
    }

    /// Rotation by `radians` in `plane`. Fails with `OutOfRange` when the plane's axes
    /// do not fit into an `n × n` matrix.
    pub fn rotation(n: usize, plane: RotationPlane, radians: f32) -> Result<Self> {
        let mut m = Self::identity(n)?;
        let (a, b) = plane.axes();
        load_rotation(&mut m.cells, n, a, b, radians)?;
        Ok(m)
    }

    /// Translation by `v` (spatial `n-1` or homogeneous `n` components).
    pub fn translation(n: usize, v: &VectorN) -> Result<Self> {
        let mut m = Self::identity(n)?;
        load_translation(&mut m.cells, n, v.as_slice())?;
        Ok(m)
    }

    /// Scale by `v` (spatial `n-1` or homogeneous `n` components).
    pub fn scale(n: usize, v: &VectorN) -> Result<Self> {
        let mut m = Self::identity(n)?;
        load_scale(&mut m.cells, n, v.as_slice())?;
        Ok(m)
    }

    /// A 4×4 perspective matrix mapping depth `-near` to 0 and `-far` to 1.
    pub fn perspective(near: f32, far: f32) -> Result<Self> {
        let mut m = Self::identity(4)?;
        load_perspective(&mut m.cells, 4, near, far)?;
        Ok(m)
    }

    /// A 4×4 camera matrix positioned at `eye`, looking at `target`, upper edge
    /// oriented towards `ref_up`.
    pub fn look_at(eye: &VectorN, target: &VectorN, ref_up: &VectorN) -> Result<Self> {
        let mut m = Self::identity(4)?;
        load_look_at(&mut m.cells, 4, eye, target, ref_up)?;
        Ok(m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_quadratic(&self) -> bool {
        self.rows == self.cols
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.cells
    }

    /// Returns the cell at `row`/`col`.
    pub fn get(&self, row: usize, col: usize) -> Result<f32> {
        self.check(row, col)?;
        Ok(self.cells[row * self.cols + col])
    }

    /// Sets the cell at `row`/`col`.
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        self.check(row, col)?;
        self.cells[row * self.cols + col] = value;
        Ok(())
    }

    fn check(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.rows {
            return Err(MathError::out_of_range(row, self.rows));
        }
        if col >= self.cols {
            return Err(MathError::out_of_range(col, self.cols));
        }
        Ok(())
    }

    /// Matrix product `self * rhs`.
    ///
    /// Requires `self.cols == rhs.rows`; the result is `self.rows × rhs.cols`.
    pub fn multiply(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(MathError::mismatch(self.cols, rhs.rows));
        }
        Self::from_fn(self.rows, rhs.cols, |row, col| {
            (0..self.cols)
                .map(|i| self.cells[row * self.cols + i] * rhs.cells[i * rhs.cols + col])
                .sum()
        })
    }

    /// Returns the transposed `cols × rows` matrix.
    pub fn transposed(&self) -> Matrix {
        let mut cells = Vec::with_capacity(self.cells.len());
        for row in 0..self.cols {
            for col in 0..self.rows {
                cells.push(self.cells[col * self.cols + row]);
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            cells,
        }
    }

    /// Transposes a quadratic matrix in place.
    pub fn transpose(&mut self) -> Result<()> {
        if !self.is_quadratic() {
            return Err(MathError::mismatch(self.rows, self.cols));
        }
        transpose_cells(&mut self.cells, self.rows);
        Ok(())
    }

    /// Converts a 4×4 matrix into the equivalent column-vector `glam` matrix.
    ///
    /// Our cells are row-major for row vectors, which is exactly glam's column-major
    /// layout for column vectors, so no transposition is needed.
    pub fn to_mat4(&self) -> Result<Mat4> {
        if self.rows != 4 || self.cols != 4 {
            return Err(MathError::mismatch(16, self.cells.len()));
        }
        let mut cols = [0.0; 16];
        cols.copy_from_slice(&self.cells);
        Ok(Mat4::from_cols_array(&cols))
    }
}

impl From<Mat4> for Matrix {
    fn from(m: Mat4) -> Self {
        Matrix {
            rows: 4,
            cols: 4,
            cells: m.to_cols_array().to_vec(),
        }
    }
}

impl MatrixView for Matrix {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn cells(&self) -> &[f32] {
        &self.cells
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        &self.cells[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f32 {
        &mut self.cells[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_cells(f, &self.cells, self.rows, self.cols)
    }
}

/// Formats cells as `[ a , b | c , d ]`.
pub(crate) fn write_cells(f: &mut fmt::Formatter<'_>, cells: &[f32], rows: usize, cols: usize) -> fmt::Result {
    write!(f, "[ ")?;
    for row in 0..rows {
        for col in 0..cols {
            write!(f, "{:.3}", cells[row * cols + col])?;
            if col + 1 < cols {
                write!(f, " , ")?;
            } else if row + 1 < rows {
                write!(f, " | ")?;
            }
        }
    }
    write!(f, " ]")
}

/// Multiplies a chain of matrices left to right.
///
/// The first matrix is the most local transform, the last one the most global.
pub fn transform_chain(matrices: &[Matrix]) -> Result<Matrix> {
    let (first, rest) = matrices
        .split_first()
        .ok_or(MathError::mismatch(1, 0))?;
    rest.iter().try_fold(first.clone(), |acc, m| acc.multiply(m))
}

// ============================================================================
// Cell kernels on flat n × n slices
// ============================================================================

pub(crate) fn load_identity(cells: &mut [f32], n: usize) {
    for row in 0..n {
        for col in 0..n {
            cells[row * n + col] = if row == col { 1.0 } else { 0.0 };
        }
    }
}

fn check_axis(axis: usize, n: usize) -> Result<()> {
    if axis >= n {
        return Err(MathError::out_of_range(axis, n));
    }
    Ok(())
}

pub(crate) fn load_rotation(cells: &mut [f32], n: usize, a: usize, b: usize, radians: f32) -> Result<()> {
    check_axis(a, n)?;
    check_axis(b, n)?;
    let (sin, cos) = radians.sin_cos();
    load_identity(cells, n);
    cells[a * n + a] = cos;
    cells[a * n + b] = sin;
    cells[b * n + a] = -sin;
    cells[b * n + b] = cos;
    Ok(())
}

/// `M := M * R(a, b, radians)`. Only columns `a` and `b` change, so no scratch is needed.
pub(crate) fn post_rotate(cells: &mut [f32], n: usize, a: usize, b: usize, radians: f32) -> Result<()> {
    check_axis(a, n)?;
    check_axis(b, n)?;
    let (sin, cos) = radians.sin_cos();
    for row in 0..n {
        let ma = cells[row * n + a];
        let mb = cells[row * n + b];
        cells[row * n + a] = ma * cos - mb * sin;
        cells[row * n + b] = ma * sin + mb * cos;
    }
    Ok(())
}

pub(crate) fn load_translation(cells: &mut [f32], n: usize, v: &[f32]) -> Result<()> {
    let homogeneous = homogeneous_len(n, v.len())?;
    load_identity(cells, n);
    let base = (n - 1) * n;
    cells[base..base + v.len()].copy_from_slice(v);
    if !homogeneous {
        cells[base + n - 1] = 1.0;
    }
    Ok(())
}

pub(crate) fn load_scale(cells: &mut [f32], n: usize, v: &[f32]) -> Result<()> {
    homogeneous_len(n, v.len())?;
    load_identity(cells, n);
    for (i, factor) in v.iter().enumerate() {
        cells[i * n + i] = *factor;
    }
    Ok(())
}

/// Accepts spatial (`n-1`) or homogeneous (`n`) vector lengths. Returns whether `len` is homogeneous.
fn homogeneous_len(n: usize, len: usize) -> Result<bool> {
    if len == n {
        Ok(true)
    } else if len + 1 == n {
        Ok(false)
    } else {
        Err(MathError::mismatch(n - 1, len))
    }
}

fn require_spatial_3d(n: usize) -> Result<()> {
    if n < 4 {
        return Err(MathError::mismatch(4, n));
    }
    Ok(())
}

/// Depth axis is `n-2`, homogeneous axis `n-1`.
pub(crate) fn load_perspective(cells: &mut [f32], n: usize, near: f32, far: f32) -> Result<()> {
    require_spatial_3d(n)?;
    if !(near > 0.0 && far > near) {
        return Err(MathError::InvalidFrustum { near, far });
    }
    let depth = n - 2;
    let w = n - 1;
    load_identity(cells, n);
    cells[depth * n + w] = -1.0;
    cells[w * n + w] = 0.0;
    cells[depth * n + depth] = -far / (far - near);
    cells[w * n + depth] = -(far * near) / (far - near);
    Ok(())
}

/// Builds the rotation rows, transposes, then folds `-eye` through the rotation part
/// into the base row. The order matters.
pub(crate) fn load_look_at(
    cells: &mut [f32],
    n: usize,
    eye: &VectorN,
    target: &VectorN,
    ref_up: &VectorN,
) -> Result<()> {
    require_spatial_3d(n)?;
    let eye = xyz(eye)?;
    let target = xyz(target)?;
    let ref_up = xyz(ref_up)?;

    let forward = normalize3(sub3(eye, target))?;
    let right = normalize3(cross3(ref_up, forward))?;
    let up = normalize3(cross3(forward, right))?;

    load_identity(cells, n);
    for (row, axis) in [right, up, forward].iter().enumerate() {
        cells[row * n..row * n + 3].copy_from_slice(axis);
    }
    transpose_cells(cells, n);

    let base = (n - 1) * n;
    for col in 0..3 {
        cells[base + col] = (0..3).map(|i| -eye[i] * cells[i * n + col]).sum();
    }
    Ok(())
}

pub(crate) fn transpose_cells(cells: &mut [f32], n: usize) {
    for row in 0..n {
        for col in row + 1..n {
            cells.swap(row * n + col, col * n + row);
        }
    }
}

fn xyz(v: &VectorN) -> Result<[f32; 3]> {
    if v.dimension() < 3 {
        return Err(MathError::mismatch(3, v.dimension()));
    }
    Ok([v[0], v[1], v[2]])
}

fn sub3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn cross3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize3(v: [f32; 3]) -> Result<[f32; 3]> {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len == 0.0 {
        return Err(MathError::DivideByZero);
    }
    Ok([v[0] / len, v[1] / len, v[2] / len])
}
