//! Error taxonomy shared by the math kernel, the matrix buffer and the node hierarchy.
//!
//! Every variant describes a contract violation or degenerate input detected at the
//! boundary of an operation. Nothing here is transient: retrying with the same input
//! fails the same way. The one error callers commonly recover from is
//! [`MathError::DegenerateProjection`], which the frame driver replaces with a
//! sentinel point instead of dropping the whole frame.

use thiserror::Error;

/// Errors raised by vector, matrix, buffer and hierarchy operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MathError {
    /// Operand sizes disagree (vector/vector, vector/matrix or matrix/matrix).
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A slot, row, column or component index lies outside its bounds.
    #[error("index {index} out of range (extent {extent})")]
    OutOfRange { index: usize, extent: usize },

    /// A transform operation was issued on a node that holds no buffer slots.
    #[error("node is not attached to the hierarchy")]
    NotAttached,

    /// The homogeneous (or highest) coordinate used as divisor is zero.
    #[error("degenerate projection: divisor is zero")]
    DegenerateProjection,

    /// The slot allocator has no free slot left.
    #[error("slot allocation exhausted (capacity {capacity})")]
    AllocationExhausted { capacity: usize },

    /// Normalizing a vector of zero length.
    #[error("division by zero")]
    DivideByZero,

    /// A memory space was used against a buffer that did not create it.
    #[error("memory space belongs to a different matrix buffer")]
    ForeignMemorySpace,

    /// Perspective planes must satisfy `0 < near < far`.
    #[error("invalid frustum: near = {near}, far = {far}")]
    InvalidFrustum { near: f32, far: f32 },

    /// The node handle does not refer to a live node (or key is not registered).
    #[error("unknown node")]
    UnknownNode,

    /// Attaching would make a node its own ancestor.
    #[error("attaching would create a cycle in the hierarchy")]
    CyclicHierarchy,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MathError>;

impl MathError {
    /// Shorthand used by bounds checks.
    pub(crate) fn out_of_range(index: usize, extent: usize) -> Self {
        MathError::OutOfRange { index, extent }
    }

    /// Shorthand used by size checks.
    pub(crate) fn mismatch(expected: usize, found: usize) -> Self {
        MathError::DimensionMismatch { expected, found }
    }
}
