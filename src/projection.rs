//! Dimension collapse: mapping transformed 4D points to displayable positions.
//!
//! Both strategies take a point and an already recomputed model matrix. Neither one
//! touches the hierarchy, so the same global matrices serve either visualization.

use std::fmt;

use crate::error::{MathError, Result};
use crate::matrix::MatrixView;
use crate::vector::{VectorN, is_degenerate_divisor};

/// Smallest dimension a collapsed point may have.
const MIN_DIMENSION: usize = 4;

/// How the fourth coordinate is folded into a 3D image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visualizer {
    /// Perspective-style: divide the transformed point by its highest coordinate.
    #[default]
    Wireframe,
    /// Substitute the highest coordinate for depth.
    CollapseZ,
}

impl Visualizer {
    pub const ALL: [Visualizer; 2] = [Visualizer::Wireframe, Visualizer::CollapseZ];

    pub fn project<M: MatrixView + ?Sized>(self, point: &VectorN, model: &M) -> Result<VectorN> {
        match self {
            Visualizer::Wireframe => project_wireframe(point, model),
            Visualizer::CollapseZ => collapse_z(point, model),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Visualizer::Wireframe => "wireframe",
            Visualizer::CollapseZ => "collapse-z",
        }
    }
}

impl fmt::Display for Visualizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `point * model` for a spatial point, so the result's last coordinate is the
/// highest spatial axis and never the homogeneous one.
fn transform<M: MatrixView + ?Sized>(point: &VectorN, model: &M) -> Result<VectorN> {
    if point.dimension() < MIN_DIMENSION {
        return Err(MathError::mismatch(MIN_DIMENSION, point.dimension()));
    }
    if point.dimension() + 1 != model.rows() {
        return Err(MathError::mismatch(model.rows().saturating_sub(1), point.dimension()));
    }
    point.transformed(model)
}

fn finite(v: VectorN) -> Result<VectorN> {
    if v.as_slice().iter().all(|c| c.is_finite()) {
        Ok(v)
    } else {
        Err(MathError::DegenerateProjection)
    }
}

/// `(point * model) / highest`, where `highest` is the last coordinate of the product.
///
/// `point` is spatial (one shorter than the matrix). Fails with `DegenerateProjection`
/// when `highest` is within [`f32::EPSILON`] of zero or the result is not finite.
pub fn project_wireframe<M: MatrixView + ?Sized>(point: &VectorN, model: &M) -> Result<VectorN> {
    let mut transformed = transform(point, model)?;
    let highest = transformed.highest();
    if is_degenerate_divisor(highest) {
        return Err(MathError::DegenerateProjection);
    }
    transformed /= highest;
    finite(transformed)
}

/// `(x, y, highest, 0)` of `point * model`.
pub fn collapse_z<M: MatrixView + ?Sized>(point: &VectorN, model: &M) -> Result<VectorN> {
    let transformed = transform(point, model)?;
    finite(VectorN::from_slice(&[
        transformed.x(),
        transformed.y(),
        transformed.highest(),
        0.0,
    ]))
}
