//! The vertex stream handed to the renderer.
//!
//! Every projected line contributes two [`LineVertex`] values, start then end. The
//! renderer draws them as a line list.
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset |
//! |-----------|-----------|--------|
//! | position  | Float32x3 | 0      |
//! | color     | Uint32    | 12     |
//!
//! `color` is a [`SymbolicColor`] palette index, resolved in the shader.

use glam::Vec3;

use crate::geometry::SymbolicColor;

/// A projected line endpoint ready for GPU upload.
///
/// # Example
///
/// ```
/// use tesseract::{LineVertex, SymbolicColor};
///
/// let vertices = [
///     LineVertex::new([0.0, 0.0, 0.0], SymbolicColor::X),
///     LineVertex::new([1.0, 0.0, 0.0], SymbolicColor::X),
/// ];
/// assert_eq!(LineVertex::as_bytes(&vertices).len(), 2 * LineVertex::STRIDE);
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    /// Palette index of the line's [`SymbolicColor`].
    pub color: u32,
}

impl LineVertex {
    /// Bytes per vertex.
    pub const STRIDE: usize = std::mem::size_of::<LineVertex>();

    pub fn new(position: [f32; 3], color: SymbolicColor) -> Self {
        Self {
            position,
            color: color.index(),
        }
    }

    pub fn from_vec3(position: Vec3, color: SymbolicColor) -> Self {
        Self::new(position.to_array(), color)
    }

    /// Views a vertex slice as raw bytes.
    pub fn as_bytes(vertices: &[LineVertex]) -> &[u8] {
        bytemuck::cast_slice(vertices)
    }
}
