//! Per-node components stored in the hierarchy's `hecs` world.
//!
//! Nodes are plain `hecs` entities. Tree links are stored as [`NodeId`] handles inside
//! a [`Links`] component, so re-parenting only rewrites handles and never moves
//! ownership.

use crate::matrix::RotationPlane;
use crate::vector::VectorN;

/// Type-safe handle to a node of a [`Hierarchy`](crate::Hierarchy).
///
/// Obtained from [`Hierarchy::create_node`](crate::Hierarchy::create_node). Handles are
/// generational: a handle to a removed node never aliases a node created later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) hecs::Entity);

/// Parent and child handles of a node.
#[derive(Clone, Debug, Default)]
pub struct Links {
    pub parent: Option<NodeId>,
    /// Children in attachment order.
    pub children: Vec<NodeId>,
}

/// Local transform state of a node.
///
/// Kept outside the matrix buffer so that it survives detaching: re-attaching a node
/// reloads its local matrices from here.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeState {
    pub zx: f32,
    pub yz: f32,
    /// Rotation in the YX plane. `XY` rotations are stored here with flipped sign.
    pub yx: f32,
    pub xq: f32,
    /// Spatial translation, one component less than the buffer's matrix columns.
    pub translation: VectorN,
}

impl NodeState {
    /// No rotation, no translation, in a space of `spatial_dimension` axes.
    pub fn new(spatial_dimension: usize) -> Self {
        Self {
            zx: 0.0,
            yz: 0.0,
            yx: 0.0,
            xq: 0.0,
            translation: VectorN::new(spatial_dimension),
        }
    }

    /// Current rotation angle in `plane`, in radians.
    pub fn angle(&self, plane: RotationPlane) -> f32 {
        match plane {
            RotationPlane::ZX => self.zx,
            RotationPlane::YZ => self.yz,
            RotationPlane::YX => self.yx,
            RotationPlane::XY => -self.yx,
            RotationPlane::XQ => self.xq,
        }
    }

    pub fn set_angle(&mut self, plane: RotationPlane, radians: f32) {
        match plane {
            RotationPlane::ZX => self.zx = radians,
            RotationPlane::YZ => self.yz = radians,
            RotationPlane::YX => self.yx = radians,
            RotationPlane::XY => self.yx = -radians,
            RotationPlane::XQ => self.xq = radians,
        }
    }

    /// Planes composed into the first intermediate rotation, in multiplication order.
    pub(crate) fn first_rotation(&self) -> [(RotationPlane, f32); 2] {
        [(RotationPlane::ZX, self.zx), (RotationPlane::YZ, self.yz)]
    }

    /// Planes composed into the second intermediate rotation, in multiplication order.
    pub(crate) fn second_rotation(&self) -> [(RotationPlane, f32); 2] {
        [(RotationPlane::YX, self.yx), (RotationPlane::XQ, self.xq)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xy_is_the_flipped_yx_angle() {
        let mut state = NodeState::new(3);
        state.set_angle(RotationPlane::XY, 0.5);
        assert_eq!(state.yx, -0.5);
        assert_eq!(state.angle(RotationPlane::XY), 0.5);
        assert_eq!(state.angle(RotationPlane::YX), -0.5);
    }

    #[test]
    fn new_state_is_neutral() {
        let state = NodeState::new(4);
        assert_eq!(state.translation.as_slice(), &[0.0; 4]);
        for plane in RotationPlane::ALL {
            assert_eq!(state.angle(plane), 0.0);
        }
    }
}
