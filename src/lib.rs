//! # Tesseract
//!
//! **N-dimensional affine transforms, packed matrix buffers and 4D wireframe projection.**
//!
//! Build a tree of transform nodes, rotate them in any coordinate plane (including the
//! fourth-dimension plane XQ), and fold 4D geometry down to a 3D line list once per
//! frame. Global matrices live in one contiguous row-major buffer, ready for upload.
//!
//! ## Quick Start
//!
//! ```
//! use tesseract::*;
//!
//! let mut render_loop = RenderLoop::new(AppConfig::new().visualizer(Visualizer::Wireframe)).unwrap();
//! let hypercube = render_loop.add_geometry(Geometry::tesseract(1.0).unwrap(), None).unwrap();
//! render_loop.add_geometry(Geometry::axis(), Some(hypercube)).unwrap();
//!
//! // Input threads mutate through a handle; the frame sees all or nothing.
//! render_loop.handle().with(|data| {
//!     data.hierarchy.rotate(hypercube, RotationPlane::XQ, 0.25).unwrap();
//!     data.camera.orbit(0.1, 0.0);
//! });
//!
//! let frame = render_loop.frame().unwrap();
//! assert_eq!(frame.vertices.len(), 2 * (32 + 4));
//! assert_eq!(frame.global_matrices.len(), frame.active_count * 25);
//! ```
//!
//! ## Conventions
//!
//! - **Row vectors**: points are transformed as `p * M`; in a chain `A * B` the
//!   transform `A` applies first.
//! - **One rotation convention**: `M[a,a] = cos`, `M[a,b] = sin`, `M[b,a] = -sin`,
//!   `M[b,b] = cos` for every plane `(a, b)`.
//! - **Implicit homogeneous coordinate**: a vector one shorter than the matrix gets a
//!   trailing `1` and is divided by the resulting homogeneous coordinate.
//! - **Type-safe handles**: nodes are addressed by [`NodeId`], buffer regions by
//!   [`MemorySpace`], never by pointers.

mod app;
mod camera;
mod ecs;
mod error;
mod geometry;
mod hierarchy;
mod matrix;
mod matrix_buffer;
mod projection;
mod slot_allocator;
mod vector;
mod vertex;

pub use app::{AppConfig, Frame, RenderHandle, RenderLoop, SharedRenderData};
pub use camera::{Camera, aspect_correction};
pub use error::{MathError, Result};
pub use geometry::{Geometry, Line, LineIndices, POINT_DIMENSION, SymbolicColor, extruded, quadrilateral};
pub use hierarchy::{Hierarchy, SUB_MATRICES};
pub use matrix::{Matrix, MatrixView, RotationPlane, transform_chain};
pub use matrix_buffer::{BufferId, MatrixBuffer, MemorySpace, SlotRef, SlotView};
pub use projection::{Visualizer, collapse_z, project_wireframe};
pub use slot_allocator::SlotAllocator;
pub use vector::VectorN;
pub use vertex::LineVertex;

// ECS support and type-safe handles
pub use ecs::{Links, NodeId, NodeState};

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec3, Vec4};
