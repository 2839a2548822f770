//! The transform node tree and its packed matrix storage.
//!
//! Every attached node owns one global matrix and five local sub-matrices inside a
//! single [`MatrixBuffer`]:
//!
//! ```text
//! matrices 0 .. max_nodes                global region, one per node slot
//! matrices max_nodes .. 6 * max_nodes    local region, five per node slot
//! ```
//!
//! The global region comes first so that `active_count` global matrices can be
//! uploaded as one contiguous, row-major float run.
//!
//! Transform setters only rewrite a node's local sub-matrices and mark the tree dirty.
//! Global matrices are brought up to date by [`Hierarchy::recompute_all`], normally once
//! per frame.
//!
//! ```
//! use tesseract::{Hierarchy, RotationPlane, VectorN};
//!
//! let mut tree = Hierarchy::new(8, 4).unwrap();
//! let root = tree.create_node();
//! let child = tree.create_node();
//! tree.attach(root, None).unwrap();
//! tree.attach(child, Some(root)).unwrap();
//!
//! tree.rotate(root, RotationPlane::YX, std::f32::consts::FRAC_PI_2).unwrap();
//! tree.translate(child, &VectorN::from_slice(&[0.0, 1.0, 0.0])).unwrap();
//! tree.recompute_all().unwrap();
//!
//! let global = tree.global_matrix(child).unwrap();
//! let p = VectorN::from_slice(&[0.0, 1.0, 0.0, 1.0]).transformed(&global).unwrap();
//! assert!((p.x() - 2.0).abs() < 1e-5);
//! ```

use log::{debug, trace};

use crate::ecs::{Links, NodeId, NodeState};
use crate::error::{MathError, Result};
use crate::matrix::{Matrix, RotationPlane};
use crate::matrix_buffer::{MatrixBuffer, MemorySpace, SlotRef, SlotView};
use crate::projection::Visualizer;
use crate::slot_allocator::SlotAllocator;
use crate::vector::VectorN;

/// Local sub-matrices per node.
pub const SUB_MATRICES: usize = 5;

const LOCAL: usize = 0;
const ROTATION: usize = 1;
const ROTATION_ZX: usize = 2;
const ROTATION_YX: usize = 3;
const TRANSLATION: usize = 4;

/// A tree of transform nodes backed by one packed matrix buffer.
pub struct Hierarchy {
    world: hecs::World,
    buffer: MatrixBuffer,
    global: MemorySpace,
    local: MemorySpace,
    slots: SlotAllocator<NodeId>,
    roots: Vec<NodeId>,
    dirty: bool,
}

impl Hierarchy {
    /// Creates an empty tree able to attach `max_nodes` nodes at once, using
    /// `columns × columns` matrices (4 for 3D, 5 for 4D).
    pub fn new(max_nodes: usize, columns: usize) -> Result<Self> {
        let buffer = MatrixBuffer::new(columns, max_nodes * (1 + SUB_MATRICES))?;
        let global = buffer.space(0, max_nodes)?;
        let local = buffer.space(max_nodes, max_nodes * SUB_MATRICES)?;
        Ok(Self {
            world: hecs::World::new(),
            buffer,
            global,
            local,
            slots: SlotAllocator::new(max_nodes),
            roots: Vec::new(),
            dirty: false,
        })
    }

    pub fn columns(&self) -> usize {
        self.buffer.columns()
    }

    pub fn max_nodes(&self) -> usize {
        self.slots.capacity()
    }

    /// The backing buffer. Read-only: slots are managed by the tree.
    pub fn buffer(&self) -> &MatrixBuffer {
        &self.buffer
    }

    /// The global matrix region of the backing buffer.
    pub fn global_space(&self) -> MemorySpace {
        self.global
    }

    /// Spawns a new detached node with neutral transform state.
    pub fn create_node(&mut self) -> NodeId {
        let state = NodeState::new(self.columns() - 1);
        NodeId(self.world.spawn((Links::default(), state)))
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.world.contains(node.0)
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.slots.contains(node)
    }

    /// Whether global matrices are stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of global matrices that must be uploaded, holes included.
    pub fn active_count(&self) -> usize {
        self.slots.active_count()
    }

    /// Number of attached nodes.
    pub fn attached_count(&self) -> usize {
        self.slots.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.links(node)?.parent)
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.links(node)?.children.clone())
    }

    fn links(&self, node: NodeId) -> Result<hecs::Ref<'_, Links>> {
        self.world
            .get::<&Links>(node.0)
            .map_err(|_| MathError::UnknownNode)
    }

    fn state(&self, node: NodeId) -> Result<hecs::Ref<'_, NodeState>> {
        self.world
            .get::<&NodeState>(node.0)
            .map_err(|_| MathError::UnknownNode)
    }

    fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.links(node).ok()?.children.get(index).copied()
    }

    /// Slot of an attached node.
    fn slot(&self, node: NodeId) -> Result<usize> {
        if !self.contains(node) {
            return Err(MathError::UnknownNode);
        }
        self.slots.slot_of(node).ok_or(MathError::NotAttached)
    }

    /// `node` followed by all of its descendants, depth first.
    fn subtree(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let mut nodes = vec![node];
        let mut next = 0;
        while next < nodes.len() {
            let current = nodes[next];
            nodes.extend(self.links(current)?.children.iter().copied());
            next += 1;
        }
        Ok(nodes)
    }

    /// Attaches `node` below `parent`, or as a root-level node when `parent` is `None`.
    ///
    /// An attached node is re-parented; its slots are kept. A detached node is
    /// registered together with its whole subtree, and the subtree's local matrices are
    /// reloaded from the stored transform state.
    pub fn attach(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<()> {
        let subtree = self.subtree(node)?;
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(MathError::UnknownNode);
            }
            if subtree.contains(&parent) {
                return Err(MathError::CyclicHierarchy);
            }
            if !self.is_attached(parent) {
                return Err(MathError::NotAttached);
            }
        }

        if !self.is_attached(node) {
            let free = self.slots.capacity() - self.slots.len();
            if subtree.len() > free {
                return Err(MathError::AllocationExhausted {
                    capacity: self.slots.capacity(),
                });
            }
            for &member in &subtree {
                let slot = self.slots.register(member)?;
                self.load_local_matrices(member, slot)?;
                debug!("registered {:?} at slot {}", member, slot);
            }
        }

        self.unlink(node)?;
        self.links_mut(node)?.parent = parent;
        match parent {
            Some(parent) => self.links_mut(parent)?.children.push(node),
            None => self.roots.push(node),
        }
        debug!("attached {:?} to {:?}", node, parent);
        self.dirty = true;
        Ok(())
    }

    /// Detaches `node` from its parent and releases the slots of its whole subtree.
    ///
    /// The subtree stays linked below `node` and keeps its transform state, so a
    /// later [`attach`](Self::attach) restores it.
    pub fn detach(&mut self, node: NodeId) -> Result<()> {
        self.slot(node)?;
        self.unlink(node)?;
        self.links_mut(node)?.parent = None;
        self.release(node)?;
        debug!("detached {:?}", node);
        self.dirty = true;
        Ok(())
    }

    /// Detaches `node` if needed and despawns it together with its descendants.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        let subtree = self.subtree(node)?;
        self.unlink(node)?;
        if self.is_attached(node) {
            self.release(node)?;
            self.dirty = true;
        }
        for member in subtree {
            self.world
                .despawn(member.0)
                .map_err(|_| MathError::UnknownNode)?;
        }
        debug!("removed {:?}", node);
        Ok(())
    }

    fn links_mut(&self, node: NodeId) -> Result<hecs::RefMut<'_, Links>> {
        self.world
            .get::<&mut Links>(node.0)
            .map_err(|_| MathError::UnknownNode)
    }

    /// Removes `node` from its parent's child list or from the roots.
    fn unlink(&mut self, node: NodeId) -> Result<()> {
        let parent = self.links(node)?.parent;
        match parent {
            Some(parent) => self.links_mut(parent)?.children.retain(|&c| c != node),
            None => self.roots.retain(|&r| r != node),
        }
        Ok(())
    }

    /// Unregisters the subtree and resets its freed matrices to identity.
    fn release(&mut self, node: NodeId) -> Result<()> {
        for member in self.subtree(node)? {
            if !self.is_attached(member) {
                continue;
            }
            let slot = self.slots.unregister(member)?;
            self.buffer.identity(self.global, slot)?;
            for sub in 0..SUB_MATRICES {
                self.buffer.identity(self.local, slot * SUB_MATRICES + sub)?;
            }
            debug!("released slot {} of {:?}", slot, member);
        }
        Ok(())
    }

    /// Fails with `OutOfRange` when `plane` reaches the homogeneous axis or beyond.
    fn check_plane(&self, plane: RotationPlane) -> Result<()> {
        let spatial = self.columns() - 1;
        if plane.max_axis() >= spatial {
            return Err(MathError::out_of_range(plane.max_axis(), spatial));
        }
        Ok(())
    }

    /// Rotates `node` by `delta` radians in `plane`.
    pub fn rotate(&mut self, node: NodeId, plane: RotationPlane, delta: f32) -> Result<()> {
        self.slot(node)?;
        let current = self.rotation(node, plane)?;
        self.set_rotation(node, plane, current + delta)
    }

    /// Sets the absolute rotation angle of `node` in `plane`.
    pub fn set_rotation(&mut self, node: NodeId, plane: RotationPlane, radians: f32) -> Result<()> {
        let slot = self.slot(node)?;
        self.check_plane(plane)?;
        self.world
            .get::<&mut NodeState>(node.0)
            .map_err(|_| MathError::UnknownNode)?
            .set_angle(plane, radians);
        self.load_rotations(node, slot)?;
        self.dirty = true;
        Ok(())
    }

    pub fn rotation(&self, node: NodeId, plane: RotationPlane) -> Result<f32> {
        Ok(self.state(node)?.angle(plane))
    }

    /// Moves `node` by the spatial vector `delta`.
    pub fn translate(&mut self, node: NodeId, delta: &VectorN) -> Result<()> {
        self.slot(node)?;
        let mut translation = self.translation(node)?;
        translation.add_in_place(delta)?;
        self.set_translation(node, &translation)
    }

    /// Sets the spatial translation of `node`.
    pub fn set_translation(&mut self, node: NodeId, v: &VectorN) -> Result<()> {
        let slot = self.slot(node)?;
        let spatial = self.columns() - 1;
        if v.dimension() != spatial {
            return Err(MathError::mismatch(spatial, v.dimension()));
        }
        self.world
            .get::<&mut NodeState>(node.0)
            .map_err(|_| MathError::UnknownNode)?
            .translation
            .copy_from(v);
        self.buffer
            .translation(self.local, slot * SUB_MATRICES + TRANSLATION, v)?;
        self.dirty = true;
        Ok(())
    }

    pub fn translation(&self, node: NodeId) -> Result<VectorN> {
        Ok(self.state(node)?.translation.clone())
    }

    fn load_local_matrices(&mut self, node: NodeId, slot: usize) -> Result<()> {
        let base = slot * SUB_MATRICES;
        self.buffer.identity(self.local, base + LOCAL)?;
        self.buffer.identity(self.local, base + ROTATION)?;
        self.load_rotations(node, slot)?;
        let translation = self.translation(node)?;
        self.buffer
            .translation(self.local, base + TRANSLATION, &translation)
    }

    /// Rebuilds both intermediate rotation matrices from the stored angles.
    fn load_rotations(&mut self, node: NodeId, slot: usize) -> Result<()> {
        let (first, second) = {
            let state = self.state(node)?;
            (state.first_rotation(), state.second_rotation())
        };
        let base = slot * SUB_MATRICES;
        for (sub, planes) in [(ROTATION_ZX, first), (ROTATION_YX, second)] {
            self.buffer.identity(self.local, base + sub)?;
            for (plane, radians) in planes {
                if self.check_plane(plane).is_err() {
                    continue;
                }
                let (a, b) = plane.axes();
                self.buffer
                    .rotate_in_place(self.local, base + sub, a, b, radians)?;
            }
        }
        Ok(())
    }

    /// Composes the local matrix of `node`, folds it into `parent_global` and recurses
    /// into the children.
    ///
    /// `local = (rotation_zx * rotation_yx) * translation`, then
    /// `global = local * parent_global`, or `global = local` for root-level nodes.
    pub fn compute_global_recursively(&mut self, node: NodeId, parent_global: Option<SlotRef>) -> Result<()> {
        let slot = self.slot(node)?;
        let base = slot * SUB_MATRICES;
        let (local, global) = (self.local, self.global);

        self.buffer
            .multiply(local, base + ROTATION_ZX, base + ROTATION_YX, base + ROTATION)?;
        self.buffer
            .multiply(local, base + ROTATION, base + TRANSLATION, base + LOCAL)?;
        match parent_global {
            Some(parent) => self
                .buffer
                .multiply_slots(local.at(base + LOCAL), parent, global.at(slot))?,
            None => self
                .buffer
                .copy_across(global.at(slot), local.at(base + LOCAL))?,
        }
        trace!("recomputed global matrix of {:?} at slot {}", node, slot);

        let mut index = 0;
        while let Some(child) = self.child_at(node, index) {
            self.compute_global_recursively(child, Some(global.at(slot)))?;
            index += 1;
        }
        Ok(())
    }

    /// Recomputes every global matrix if anything changed since the last call.
    ///
    /// Returns whether a recomputation took place.
    pub fn recompute_all(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        for index in 0..self.roots.len() {
            let root = self.roots[index];
            self.compute_global_recursively(root, None)?;
        }
        self.dirty = false;
        Ok(true)
    }

    /// Marks global matrices as stale.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Borrows the global matrix of an attached node.
    pub fn global_view(&self, node: NodeId) -> Result<SlotView<'_>> {
        let slot = self.slot(node)?;
        self.buffer.view(self.global.at(slot))
    }

    pub fn global_matrix(&self, node: NodeId) -> Result<Matrix> {
        self.global_view(node)?.to_matrix()
    }

    /// The composed local matrix of an attached node, as of the last recomputation.
    pub fn local_matrix(&self, node: NodeId) -> Result<Matrix> {
        let slot = self.slot(node)?;
        self.buffer.matrix(self.local, slot * SUB_MATRICES + LOCAL)
    }

    /// The active global matrices, row-major, `active_count × columns²` floats.
    pub fn global_floats(&self) -> &[f32] {
        let len = self.active_count() * self.buffer.matrix_len();
        &self.buffer.as_slice()[..len]
    }

    /// [`global_floats`](Self::global_floats) as raw bytes for GPU upload.
    pub fn global_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.global_floats())
    }

    /// Projects `point` through the global matrix of `node`.
    pub fn project(&self, point: &VectorN, node: NodeId, visualizer: Visualizer) -> Result<VectorN> {
        visualizer.project(point, &self.global_view(node)?)
    }
}
