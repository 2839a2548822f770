//! A packed array of equally sized quadratic matrices, addressed by slot.
//!
//! The buffer is laid out exactly as a GPU uniform array expects it: matrix after
//! matrix, each one `columns × columns` floats in row-major order. Operations write
//! straight into the slots, so the region can be uploaded without a conversion pass.
//!
//! A [`MemorySpace`] is a plain `(buffer, offset, extent)` triple. It owns nothing and
//! is freely copied; every access validates it against the buffer it is used with.
//!
//! ```
//! use tesseract::{MatrixBuffer, RotationPlane, VectorN};
//!
//! let mut buffer = MatrixBuffer::new(4, 3).unwrap();
//! let memory = buffer.memory();
//!
//! let (a, b) = RotationPlane::YX.axes();
//! buffer.rotation(memory, 0, a, b, std::f32::consts::FRAC_PI_2).unwrap();
//! buffer.translation(memory, 1, &VectorN::from_slice(&[0.0, 1.0, 0.0])).unwrap();
//! buffer.multiply(memory, 1, 0, 2).unwrap();
//!
//! let p = buffer.multiply_vector(memory, &VectorN::from_slice(&[0.0, 1.0, 0.0, 1.0]), 2).unwrap();
//! assert!((p.x() - 2.0).abs() < 1e-5);
//! ```

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{MathError, Result};
use crate::matrix::{self, Matrix, MatrixView};
use crate::vector::VectorN;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies the buffer a [`MemorySpace`] was created by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

/// A window of `extent` consecutive matrices starting at matrix `offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemorySpace {
    buffer: BufferId,
    offset: usize,
    extent: usize,
}

impl MemorySpace {
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Index of the first matrix, counted from the start of the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of matrices in this space.
    pub fn extent(&self) -> usize {
        self.extent
    }

    pub fn contains(&self, slot: usize) -> bool {
        slot < self.extent
    }

    /// Refers to `slot` within this space. Bounds are checked when the reference is used.
    pub fn at(self, slot: usize) -> SlotRef {
        SlotRef { space: self, slot }
    }

    /// A sub-window of this space, `extent` matrices long, starting at `start`.
    pub fn subspace(&self, start: usize, extent: usize) -> Result<MemorySpace> {
        if start + extent > self.extent {
            return Err(MathError::out_of_range(start + extent, self.extent));
        }
        Ok(MemorySpace {
            buffer: self.buffer,
            offset: self.offset + start,
            extent,
        })
    }
}

/// One slot inside a memory space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotRef {
    pub space: MemorySpace,
    pub slot: usize,
}

/// A borrowed, read-only matrix living in a buffer slot.
#[derive(Clone, Copy, Debug)]
pub struct SlotView<'a> {
    columns: usize,
    cells: &'a [f32],
}

impl MatrixView for SlotView<'_> {
    fn rows(&self) -> usize {
        self.columns
    }

    fn cols(&self) -> usize {
        self.columns
    }

    fn cells(&self) -> &[f32] {
        self.cells
    }
}

impl SlotView<'_> {
    /// Copies the slot into an owned matrix.
    pub fn to_matrix(&self) -> Result<Matrix> {
        Matrix::from_fn(self.columns, self.columns, |row, col| self.at(row, col))
    }
}

impl fmt::Display for SlotView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        matrix::write_cells(f, self.cells, self.columns, self.columns)
    }
}

/// Contiguous storage for `capacity` matrices of `columns × columns` floats.
///
/// All matrices start out as identity.
#[derive(Debug)]
pub struct MatrixBuffer {
    id: BufferId,
    columns: usize,
    capacity: usize,
    data: Vec<f32>,
    /// Product staging area, one matrix long. Lets `multiply` write into one of its
    /// own operands.
    scratch: Vec<f32>,
}

impl MatrixBuffer {
    /// Allocates `max_matrices` identity matrices of size `columns × columns`.
    pub fn new(columns: usize, max_matrices: usize) -> Result<Self> {
        if columns < 2 {
            return Err(MathError::mismatch(2, columns));
        }
        if max_matrices == 0 {
            return Err(MathError::out_of_range(0, 0));
        }
        let len = columns * columns;
        let mut data = vec![0.0; len * max_matrices];
        for cells in data.chunks_exact_mut(len) {
            matrix::load_identity(cells, columns);
        }
        Ok(Self {
            id: BufferId(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed)),
            columns,
            capacity: max_matrices,
            data,
            scratch: vec![0.0; len],
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Rows (and columns) of every matrix.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Floats per matrix.
    pub fn matrix_len(&self) -> usize {
        self.columns * self.columns
    }

    /// Number of matrices the buffer holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A space covering the whole buffer.
    pub fn memory(&self) -> MemorySpace {
        MemorySpace {
            buffer: self.id,
            offset: 0,
            extent: self.capacity,
        }
    }

    /// A space of `extent` matrices starting at matrix `offset`.
    pub fn space(&self, offset: usize, extent: usize) -> Result<MemorySpace> {
        if offset + extent > self.capacity {
            return Err(MathError::out_of_range(offset + extent, self.capacity));
        }
        Ok(MemorySpace {
            buffer: self.id,
            offset,
            extent,
        })
    }

    /// The whole buffer, row-major, matrix after matrix.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// All floats covered by `space`.
    pub fn floats(&self, space: MemorySpace) -> Result<&[f32]> {
        self.check_space(space)?;
        let len = self.matrix_len();
        let start = space.offset * len;
        let end = (space.offset + space.extent) * len;
        if end > self.data.len() {
            return Err(MathError::out_of_range(space.offset + space.extent, self.capacity));
        }
        Ok(&self.data[start..end])
    }

    fn check_space(&self, space: MemorySpace) -> Result<()> {
        if space.buffer != self.id {
            return Err(MathError::ForeignMemorySpace);
        }
        Ok(())
    }

    /// Float range of `slot` in `space`, validated against the space and the buffer.
    fn range(&self, space: MemorySpace, slot: usize) -> Result<Range<usize>> {
        self.check_space(space)?;
        if slot >= space.extent {
            return Err(MathError::out_of_range(slot, space.extent));
        }
        let index = space.offset + slot;
        if index >= self.capacity {
            return Err(MathError::out_of_range(index, self.capacity));
        }
        let len = self.matrix_len();
        Ok(index * len..(index + 1) * len)
    }

    fn cells(&self, space: MemorySpace, slot: usize) -> Result<&[f32]> {
        let range = self.range(space, slot)?;
        Ok(&self.data[range])
    }

    fn cells_mut(&mut self, space: MemorySpace, slot: usize) -> Result<&mut [f32]> {
        let range = self.range(space, slot)?;
        Ok(&mut self.data[range])
    }

    fn check_cell(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.columns {
            return Err(MathError::out_of_range(row, self.columns));
        }
        if col >= self.columns {
            return Err(MathError::out_of_range(col, self.columns));
        }
        Ok(row * self.columns + col)
    }

    pub fn get(&self, space: MemorySpace, slot: usize, row: usize, col: usize) -> Result<f32> {
        let cell = self.check_cell(row, col)?;
        Ok(self.cells(space, slot)?[cell])
    }

    pub fn set(&mut self, space: MemorySpace, slot: usize, row: usize, col: usize, value: f32) -> Result<()> {
        let cell = self.check_cell(row, col)?;
        self.cells_mut(space, slot)?[cell] = value;
        Ok(())
    }

    /// Row `row` of the matrix at `slot`.
    pub fn row(&self, space: MemorySpace, slot: usize, row: usize) -> Result<&[f32]> {
        let start = self.check_cell(row, 0)?;
        let n = self.columns;
        Ok(&self.cells(space, slot)?[start..start + n])
    }

    /// Overwrites row `row` of the matrix at `slot`. `values` must be `columns` long.
    pub fn set_row(&mut self, space: MemorySpace, slot: usize, row: usize, values: &[f32]) -> Result<()> {
        if values.len() != self.columns {
            return Err(MathError::mismatch(self.columns, values.len()));
        }
        let start = self.check_cell(row, 0)?;
        let n = self.columns;
        self.cells_mut(space, slot)?[start..start + n].copy_from_slice(values);
        Ok(())
    }

    /// Borrows a slot as a matrix view.
    pub fn view(&self, slot: SlotRef) -> Result<SlotView<'_>> {
        Ok(SlotView {
            columns: self.columns,
            cells: self.cells(slot.space, slot.slot)?,
        })
    }

    /// Copies a slot out into an owned matrix.
    pub fn matrix(&self, space: MemorySpace, slot: usize) -> Result<Matrix> {
        self.view(space.at(slot))?.to_matrix()
    }

    /// Writes an owned `columns × columns` matrix into a slot.
    pub fn load(&mut self, space: MemorySpace, slot: usize, m: &Matrix) -> Result<()> {
        if m.rows() != self.columns || m.cols() != self.columns {
            return Err(MathError::mismatch(self.columns, m.rows().max(m.cols())));
        }
        self.cells_mut(space, slot)?.copy_from_slice(m.as_slice());
        Ok(())
    }

    pub fn identity(&mut self, space: MemorySpace, slot: usize) -> Result<()> {
        let n = self.columns;
        matrix::load_identity(self.cells_mut(space, slot)?, n);
        Ok(())
    }

    /// Copies matrix `src` over matrix `dst`, both in `space`.
    pub fn copy(&mut self, space: MemorySpace, dst: usize, src: usize) -> Result<()> {
        self.copy_across(space.at(dst), space.at(src))
    }

    /// Copies between two spaces of this buffer.
    pub fn copy_across(&mut self, dst: SlotRef, src: SlotRef) -> Result<()> {
        let src = self.range(src.space, src.slot)?;
        let dst = self.range(dst.space, dst.slot)?;
        self.data.copy_within(src, dst.start);
        Ok(())
    }

    /// Copies a matrix from another buffer with the same matrix size.
    pub fn copy_from(&mut self, dst: SlotRef, other: &MatrixBuffer, src: SlotRef) -> Result<()> {
        if other.columns != self.columns {
            return Err(MathError::mismatch(self.columns, other.columns));
        }
        let cells = other.cells(src.space, src.slot)?;
        self.cells_mut(dst.space, dst.slot)?.copy_from_slice(cells);
        Ok(())
    }

    /// `dst := lhs * rhs`, all slots in `space`. `dst` may alias either operand.
    pub fn multiply(&mut self, space: MemorySpace, lhs: usize, rhs: usize, dst: usize) -> Result<()> {
        self.multiply_slots(space.at(lhs), space.at(rhs), space.at(dst))
    }

    /// `dst := lhs * rhs` across spaces of this buffer. `dst` may alias either operand.
    pub fn multiply_slots(&mut self, lhs: SlotRef, rhs: SlotRef, dst: SlotRef) -> Result<()> {
        let lhs = self.range(lhs.space, lhs.slot)?;
        let rhs = self.range(rhs.space, rhs.slot)?;
        let dst = self.range(dst.space, dst.slot)?;
        let n = self.columns;
        let (a, b) = (&self.data[lhs], &self.data[rhs]);
        for row in 0..n {
            for col in 0..n {
                self.scratch[row * n + col] = (0..n).map(|i| a[row * n + i] * b[i * n + col]).sum();
            }
        }
        self.data[dst].copy_from_slice(&self.scratch);
        Ok(())
    }

    /// Transforms `v` by the matrix at `slot`, following the [`VectorN::transformed`] rules.
    pub fn multiply_vector(&self, space: MemorySpace, v: &VectorN, slot: usize) -> Result<VectorN> {
        v.transformed(&self.view(space.at(slot))?)
    }

    pub fn transpose(&mut self, space: MemorySpace, slot: usize) -> Result<()> {
        let n = self.columns;
        matrix::transpose_cells(self.cells_mut(space, slot)?, n);
        Ok(())
    }

    /// Loads a translation. `v` is spatial (`columns - 1`) or homogeneous (`columns`).
    pub fn translation(&mut self, space: MemorySpace, slot: usize, v: &VectorN) -> Result<()> {
        let n = self.columns;
        matrix::load_translation(self.cells_mut(space, slot)?, n, v.as_slice())
    }

    /// Loads a scale. `v` is spatial (`columns - 1`) or homogeneous (`columns`).
    pub fn scale(&mut self, space: MemorySpace, slot: usize, v: &VectorN) -> Result<()> {
        let n = self.columns;
        matrix::load_scale(self.cells_mut(space, slot)?, n, v.as_slice())
    }

    /// Loads a rotation by `radians` in the plane spanned by axes `a` and `b`.
    pub fn rotation(&mut self, space: MemorySpace, slot: usize, a: usize, b: usize, radians: f32) -> Result<()> {
        let n = self.columns;
        matrix::load_rotation(self.cells_mut(space, slot)?, n, a, b, radians)
    }

    /// Post-multiplies the matrix at `slot` by a rotation in the `a`-`b` plane.
    pub fn rotate_in_place(&mut self, space: MemorySpace, slot: usize, a: usize, b: usize, radians: f32) -> Result<()> {
        let n = self.columns;
        matrix::post_rotate(self.cells_mut(space, slot)?, n, a, b, radians)
    }

    /// Loads a camera matrix. Only the first three components of each vector are read.
    pub fn look_at(
        &mut self,
        space: MemorySpace,
        slot: usize,
        eye: &VectorN,
        target: &VectorN,
        ref_up: &VectorN,
    ) -> Result<()> {
        let n = self.columns;
        matrix::load_look_at(self.cells_mut(space, slot)?, n, eye, target, ref_up)
    }

    /// Loads a perspective matrix mapping depth `-near` to 0 and `-far` to 1.
    ///
    /// The depth axis is `columns - 2`, the homogeneous axis `columns - 1`.
    pub fn perspective(&mut self, space: MemorySpace, slot: usize, near: f32, far: f32) -> Result<()> {
        let n = self.columns;
        matrix::load_perspective(self.cells_mut(space, slot)?, n, near, far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn v(components: &[f32]) -> VectorN {
        VectorN::from_slice(components)
    }

    fn setup() -> (MatrixBuffer, MemorySpace) {
        let buffer = MatrixBuffer::new(4, 3).unwrap();
        let memory = buffer.space(0, 3).unwrap();
        (buffer, memory)
    }

    fn fill_rows(buffer: &mut MatrixBuffer, space: MemorySpace, slot: usize, rows: [[f32; 4]; 4]) {
        for (i, row) in rows.iter().enumerate() {
            buffer.set_row(space, slot, i, row).unwrap();
        }
    }

    const COUNTING: [[f32; 4]; 4] = [
        [1.0, 2.0, 3.0, 4.0],
        [5.0, 6.0, 7.0, 8.0],
        [9.0, 10.0, 11.0, 12.0],
        [13.0, 14.0, 15.0, 16.0],
    ];

    fn assert_counting_product(p: &VectorN) {
        assert_eq!(p.as_slice(), &[90.0, 100.0, 110.0, 120.0]);
    }

    #[test]
    fn initialized_to_identity() {
        let (buffer, memory) = setup();
        for slot in 0..3 {
            for row in 0..4 {
                for col in 0..4 {
                    let expected = if row == col { 1.0 } else { 0.0 };
                    assert_eq!(buffer.get(memory, slot, row, col).unwrap(), expected);
                }
            }
        }
    }

    #[test]
    fn identity_resets_a_slot() {
        let (mut buffer, memory) = setup();
        buffer.rotation(memory, 1, 0, 2, PI).unwrap();
        buffer.identity(memory, 1).unwrap();
        assert_eq!(buffer.matrix(memory, 1).unwrap(), Matrix::identity(4).unwrap());
    }

    #[test]
    fn rows_and_vector_product() {
        let (mut buffer, memory) = setup();
        fill_rows(&mut buffer, memory, 1, COUNTING);
        assert_eq!(buffer.row(memory, 1, 2).unwrap(), &[9.0, 10.0, 11.0, 12.0]);
        assert_counting_product(&buffer.multiply_vector(memory, &v(&[1.0, 2.0, 3.0, 4.0]), 1).unwrap());
    }

    #[test]
    fn copy_within_space() {
        let (mut buffer, memory) = setup();
        fill_rows(&mut buffer, memory, 1, COUNTING);
        buffer.copy(memory, 2, 1).unwrap();
        assert_counting_product(&buffer.multiply_vector(memory, &v(&[1.0, 2.0, 3.0, 4.0]), 2).unwrap());
    }

    #[test]
    fn copy_from_other_buffer() {
        let (mut buffer, memory) = setup();
        let mut other = MatrixBuffer::new(4, 3).unwrap();
        let tail = other.space(1, 2).unwrap();
        fill_rows(&mut other, tail, 1, COUNTING);

        let last = other.space(2, 1).unwrap();
        buffer.copy_from(memory.at(2), &other, last.at(0)).unwrap();
        assert_counting_product(&buffer.multiply_vector(memory, &v(&[1.0, 2.0, 3.0, 4.0]), 2).unwrap());
    }

    #[test]
    fn copy_from_requires_matching_sizes() {
        let (mut buffer, memory) = setup();
        let other = MatrixBuffer::new(5, 1).unwrap();
        assert!(buffer.copy_from(memory.at(0), &other, other.memory().at(0)).is_err());
    }

    #[test]
    fn multiply_matrices() {
        let (mut buffer, memory) = setup();
        let zero = [0.0; 4];
        fill_rows(&mut buffer, memory, 0, [[2.0, 3.0, 0.0, 0.0], [4.0, 5.0, 0.0, 0.0], zero, zero]);
        fill_rows(&mut buffer, memory, 1, [[6.0, 7.0, 0.0, 0.0], [8.0, 9.0, 0.0, 0.0], zero, zero]);

        buffer.multiply(memory, 0, 1, 2).unwrap();
        assert_eq!(buffer.get(memory, 2, 0, 0).unwrap(), 2.0 * 6.0 + 3.0 * 8.0);
        assert_eq!(buffer.get(memory, 2, 0, 1).unwrap(), 2.0 * 7.0 + 3.0 * 9.0);
        assert_eq!(buffer.get(memory, 2, 1, 0).unwrap(), 4.0 * 6.0 + 5.0 * 8.0);
        assert_eq!(buffer.get(memory, 2, 1, 1).unwrap(), 4.0 * 7.0 + 5.0 * 9.0);
    }

    #[test]
    fn multiply_into_own_operand() {
        let (mut buffer, memory) = setup();
        fill_rows(&mut buffer, memory, 0, COUNTING);
        fill_rows(&mut buffer, memory, 1, COUNTING);
        let expected = buffer
            .matrix(memory, 0)
            .unwrap()
            .multiply(&buffer.matrix(memory, 1).unwrap())
            .unwrap();

        buffer.multiply(memory, 0, 1, 0).unwrap();
        assert_eq!(buffer.matrix(memory, 0).unwrap(), expected);

        fill_rows(&mut buffer, memory, 0, COUNTING);
        buffer.multiply(memory, 0, 0, 0).unwrap();
        assert_eq!(buffer.matrix(memory, 0).unwrap(), expected);
    }

    #[test]
    fn multiply_across_spaces() {
        let mut buffer = MatrixBuffer::new(4, 4).unwrap();
        let global = buffer.space(0, 2).unwrap();
        let local = buffer.space(2, 2).unwrap();
        buffer.translation(local, 0, &v(&[1.0, 0.0, 0.0])).unwrap();
        buffer.translation(global, 1, &v(&[0.0, 2.0, 0.0])).unwrap();

        buffer.multiply_slots(local.at(0), global.at(1), global.at(0)).unwrap();
        let p = buffer.multiply_vector(global, &v(&[0.0, 0.0, 0.0, 1.0]), 0).unwrap();
        assert_eq!(p.as_slice(), &[1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn scale_slot() {
        let (mut buffer, memory) = setup();
        buffer.scale(memory, 1, &v(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        let p = buffer.multiply_vector(memory, &v(&[1.0, 2.0, 3.0, 4.0]), 1).unwrap();
        assert_eq!(p.as_slice(), &[1.0, 4.0, 9.0, 16.0]);
    }

    #[test]
    fn rotation_slot() {
        let (mut buffer, memory) = setup();
        buffer.rotation(memory, 2, 1, 3, FRAC_PI_2).unwrap();
        let p = buffer.multiply_vector(memory, &v(&[0.0, 3.0, 0.0, 5.0]), 2).unwrap();
        assert_abs_diff_eq!(p.x(), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y(), -5.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.z(), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.q(), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn rotate_in_place_composes() {
        let (mut buffer, memory) = setup();
        buffer.rotation(memory, 0, 1, 0, 0.25).unwrap();
        buffer.rotate_in_place(memory, 0, 1, 0, 0.5).unwrap();
        buffer.rotation(memory, 1, 1, 0, 0.75).unwrap();
        let (a, b) = (buffer.matrix(memory, 0).unwrap(), buffer.matrix(memory, 1).unwrap());
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-5);
        }
    }

    #[test]
    fn translation_slot() {
        let (mut buffer, memory) = setup();
        buffer.translation(memory, 2, &v(&[1.0, 2.0, 3.0, 1.0])).unwrap();
        let p = buffer.multiply_vector(memory, &v(&[1.0, 2.0, 3.0, 1.0]), 2).unwrap();
        assert_eq!(p.as_slice(), &[2.0, 4.0, 6.0, 1.0]);
    }

    #[test]
    fn transpose_slot() {
        let (mut buffer, memory) = setup();
        fill_rows(
            &mut buffer,
            memory,
            1,
            [
                [1.0, 5.0, 9.0, 13.0],
                [2.0, 6.0, 10.0, 14.0],
                [3.0, 7.0, 11.0, 15.0],
                [4.0, 8.0, 12.0, 16.0],
            ],
        );
        buffer.transpose(memory, 1).unwrap();
        assert_counting_product(&buffer.multiply_vector(memory, &v(&[1.0, 2.0, 3.0, 4.0]), 1).unwrap());
    }

    #[test]
    fn perspective_slot() {
        let (mut buffer, memory) = setup();
        buffer.perspective(memory, 0, 5.0, 10.0).unwrap();

        let project = |buffer: &MatrixBuffer, z: f32| {
            let mut p = buffer.multiply_vector(memory, &v(&[2.0, 3.0, z, 1.0]), 0).unwrap();
            let w = p.highest();
            p /= w;
            p
        };

        let far = project(&buffer, -10.0);
        assert_abs_diff_eq!(far.z(), 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(far.x(), 0.2, epsilon = 1e-4);
        assert_abs_diff_eq!(far.y(), 0.3, epsilon = 1e-4);

        let near = project(&buffer, -5.0);
        assert_abs_diff_eq!(near.z(), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(near.x(), 0.4, epsilon = 1e-4);

        let between = project(&buffer, -7.0);
        assert!(0.0 < between.z() && between.z() < 1.0);
        assert_abs_diff_eq!(between.x(), 2.0 / 7.0, epsilon = 1e-4);

        let before_near = project(&buffer, -2.0);
        assert!(before_near.z() < 0.0);
        assert_abs_diff_eq!(before_near.y(), 1.5, epsilon = 1e-4);
    }

    #[test]
    fn perspective_in_five_columns_uses_second_to_last_axis_as_depth() {
        let mut buffer = MatrixBuffer::new(5, 1).unwrap();
        let memory = buffer.memory();
        buffer.perspective(memory, 0, 1.0, 2.0).unwrap();
        assert_eq!(buffer.get(memory, 0, 3, 4).unwrap(), -1.0);
        assert_eq!(buffer.get(memory, 0, 4, 4).unwrap(), 0.0);
        assert_eq!(buffer.get(memory, 0, 2, 2).unwrap(), 1.0);
    }

    #[test]
    fn look_at_slot() {
        let (mut buffer, memory) = setup();
        buffer
            .look_at(
                memory,
                0,
                &v(&[2.0, 2.0, 2.0, 1.0]),
                &v(&[0.0, 0.0, 0.0, 1.0]),
                &v(&[0.0, 1.0, 0.0, 0.0]),
            )
            .unwrap();

        let m = buffer.matrix(memory, 0).unwrap().transposed();
        let axis = |row: usize| v(&[m[(row, 0)], m[(row, 1)], m[(row, 2)]]);
        let (right, up, forward) = (axis(0), axis(1), axis(2));
        assert_abs_diff_eq!(forward.dot(&right).unwrap(), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(right.dot(&up).unwrap(), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(up.dot(&forward).unwrap(), 0.0, epsilon = 1e-5);
        for a in [&right, &up, &forward] {
            assert_abs_diff_eq!(a.length(), 1.0, epsilon = 1e-5);
        }

        let origin = buffer.multiply_vector(memory, &v(&[0.0, 0.0, 0.0, 1.0]), 0).unwrap();
        assert_abs_diff_eq!(origin.x(), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(origin.y(), 0.0, epsilon = 1e-5);
        assert!(origin.z() < 0.0);
    }

    #[test]
    fn out_of_range_slots_are_rejected() {
        let (mut buffer, _) = setup();
        let tail = buffer.space(1, 2).unwrap();
        assert_eq!(
            buffer.identity(tail, 2),
            Err(MathError::OutOfRange { index: 2, extent: 2 })
        );
        assert!(buffer.get(tail, 0, 4, 0).is_err());
        assert!(buffer.space(2, 2).is_err());
        assert!(buffer.multiply(tail, 0, 1, 5).is_err());
        // The untouched neighbour keeps its identity.
        assert_eq!(buffer.matrix(tail, 1).unwrap(), Matrix::identity(4).unwrap());
    }

    #[test]
    fn spaces_from_other_buffers_are_rejected() {
        let (mut buffer, _) = setup();
        let other = MatrixBuffer::new(4, 3).unwrap();
        assert_eq!(
            buffer.identity(other.memory(), 0),
            Err(MathError::ForeignMemorySpace)
        );
    }

    #[test]
    fn floats_cover_the_space_only() {
        let (buffer, _) = setup();
        let tail = buffer.space(1, 2).unwrap();
        assert_eq!(buffer.floats(tail).unwrap().len(), 32);
        assert_eq!(buffer.as_slice().len(), 48);
        let sub = tail.subspace(1, 1).unwrap();
        assert_eq!(sub.offset(), 2);
        assert!(tail.subspace(1, 2).is_err());
    }

    #[test]
    fn load_requires_matching_size() {
        let (mut buffer, memory) = setup();
        assert!(buffer.load(memory, 0, &Matrix::identity(5).unwrap()).is_err());
        let m = Matrix::rotation(4, crate::RotationPlane::ZX, 0.3).unwrap();
        buffer.load(memory, 0, &m).unwrap();
        assert_eq!(buffer.matrix(memory, 0).unwrap(), m);
        assert_eq!(buffer.view(memory.at(0)).unwrap().to_string(), m.to_string());
    }
}
