//! Frame driver: shared render state, the input-thread handle and per-frame output.
//!
//! Input threads mutate [`SharedRenderData`] through a [`RenderHandle`]. Once per frame
//! [`RenderLoop::frame`] takes the same lock, recomputes the hierarchy and turns every
//! geometry into [`LineVertex`] pairs ready for upload.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, MutexGuard};

use crate::camera::Camera;
use crate::ecs::NodeId;
use crate::error::{MathError, Result};
use crate::geometry::Geometry;
use crate::hierarchy::Hierarchy;
use crate::matrix::Matrix;
use crate::projection::Visualizer;
use crate::vertex::LineVertex;

/// Render loop configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Nodes that can be attached at once.
    pub max_nodes: usize,
    /// Columns of every transform matrix: 4 for 3D scenes, 5 for 4D scenes.
    pub matrix_columns: usize,
    /// Initial dimension-collapse strategy.
    pub visualizer: Visualizer,
    pub near: f32,
    pub far: f32,
    /// Position substituted for points whose projection degenerates.
    pub sentinel: [f32; 3],
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_nodes: 64,
            matrix_columns: 5,
            visualizer: Visualizer::Wireframe,
            near: 0.1,
            far: 100.0,
            sentinel: [0.0; 3],
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn matrix_columns(mut self, columns: usize) -> Self {
        self.matrix_columns = columns;
        self
    }

    pub fn visualizer(mut self, visualizer: Visualizer) -> Self {
        self.visualizer = visualizer;
        self
    }

    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn sentinel(mut self, sentinel: [f32; 3]) -> Self {
        self.sentinel = sentinel;
        self
    }
}

/// Everything a frame reads, guarded by one lock.
pub struct SharedRenderData {
    pub hierarchy: Hierarchy,
    pub camera: Camera,
    /// Geometries and the node whose global matrix places them.
    pub geometries: Vec<(Geometry, NodeId)>,
    pub visualizer: Visualizer,
}

impl SharedRenderData {
    /// Drops geometries whose node no longer exists, e.g. after
    /// [`Hierarchy::remove_node`] through a handle.
    fn prune_geometries(&mut self) {
        let hierarchy = &self.hierarchy;
        self.geometries.retain(|(geometry, node)| {
            let alive = hierarchy.contains(*node);
            if !alive {
                debug!("dropping geometry {} of removed {:?}", geometry.name, node);
            }
            alive
        });
    }
}

/// Cloneable access to the shared render data for input threads.
///
/// Mutations made while holding the lock are either fully visible to a frame or not
/// at all: the frame holds the same lock from recomputation to vertex hand-off.
#[derive(Clone)]
pub struct RenderHandle(Arc<Mutex<SharedRenderData>>);

impl RenderHandle {
    pub fn lock(&self) -> MutexGuard<'_, SharedRenderData> {
        self.0.lock()
    }

    /// Runs `f` with the lock held.
    pub fn with<R>(&self, f: impl FnOnce(&mut SharedRenderData) -> R) -> R {
        f(&mut self.0.lock())
    }
}

/// Output of one frame, detached from the shared data.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Line list, two vertices per line.
    pub vertices: Vec<LineVertex>,
    /// Active global matrices, row-major, `active_count × columns²` floats.
    pub global_matrices: Vec<f32>,
    pub active_count: usize,
    pub view: Matrix,
    pub projection: Matrix,
    /// Frames produced before this one.
    pub index: u64,
    /// Total elapsed time in seconds.
    pub time: f32,
    /// Delta time since last frame in seconds.
    pub dt: f32,
}

impl Frame {
    /// Current frames per second.
    pub fn fps(&self) -> f32 {
        if self.dt > 0.0 { 1.0 / self.dt } else { 0.0 }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        LineVertex::as_bytes(&self.vertices)
    }

    pub fn matrix_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.global_matrices)
    }
}

/// Drives recomputation and projection once per frame.
///
/// # Example
/// ```
/// use tesseract::{AppConfig, Geometry, RenderLoop, RotationPlane};
///
/// let mut render_loop = RenderLoop::new(AppConfig::new().max_nodes(8)).unwrap();
/// let node = render_loop.add_geometry(Geometry::tesseract(1.0).unwrap(), None).unwrap();
///
/// let handle = render_loop.handle();
/// handle.with(|data| data.hierarchy.rotate(node, RotationPlane::XQ, 0.3)).unwrap();
///
/// let frame = render_loop.frame().unwrap();
/// assert_eq!(frame.vertices.len(), 64);
/// ```
pub struct RenderLoop {
    config: AppConfig,
    shared: RenderHandle,
    start: Instant,
    last_frame: Instant,
    frame_index: u64,
}

impl RenderLoop {
    pub fn new(config: AppConfig) -> Result<Self> {
        let hierarchy = Hierarchy::new(config.max_nodes, config.matrix_columns)?;
        let data = SharedRenderData {
            hierarchy,
            camera: Camera::default(),
            geometries: Vec::new(),
            visualizer: config.visualizer,
        };
        info!(
            "render loop ready: {} nodes of {}x{} matrices, {} visualizer",
            config.max_nodes, config.matrix_columns, config.matrix_columns, config.visualizer
        );
        let now = Instant::now();
        Ok(Self {
            config,
            shared: RenderHandle(Arc::new(Mutex::new(data))),
            start: now,
            last_frame: now,
            frame_index: 0,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn handle(&self) -> RenderHandle {
        self.shared.clone()
    }

    /// Creates a node below `parent` (or at root level) and places `geometry` on it.
    pub fn add_geometry(&self, geometry: Geometry, parent: Option<NodeId>) -> Result<NodeId> {
        let mut data = self.shared.lock();
        let node = data.hierarchy.create_node();
        if let Err(e) = data.hierarchy.attach(node, parent) {
            data.hierarchy.remove_node(node)?;
            return Err(e);
        }
        info!("added geometry {} on {:?}", geometry.name, node);
        data.geometries.push((geometry, node));
        Ok(node)
    }

    /// Removes `node` with its subtree, and every geometry placed on a removed node.
    pub fn remove_geometry(&self, node: NodeId) -> Result<()> {
        let mut data = self.shared.lock();
        data.hierarchy.remove_node(node)?;
        data.prune_geometries();
        info!("removed geometry node {:?}", node);
        Ok(())
    }

    /// Recomputes global matrices, projects every geometry and copies the matrices out,
    /// all under one lock.
    pub fn frame(&mut self) -> Result<Frame> {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        let mut guard = self.shared.lock();
        guard.prune_geometries();
        guard.hierarchy.recompute_all()?;
        let data = &*guard;

        let mut vertices = Vec::new();
        for (geometry, node) in &data.geometries {
            let start = vertices.len();
            if let Err(e) = project_geometry(data, geometry, *node, self.config.sentinel, &mut vertices) {
                vertices.truncate(start);
                error!("skipping geometry {} this frame: {}", geometry.name, e);
            }
        }

        let frame = Frame {
            vertices,
            global_matrices: data.hierarchy.global_floats().to_vec(),
            active_count: data.hierarchy.active_count(),
            view: data.camera.view_matrix()?,
            projection: data.camera.projection_matrix(self.config.near, self.config.far)?,
            index: self.frame_index,
            time: (now - self.start).as_secs_f32(),
            dt,
        };
        self.frame_index += 1;
        Ok(frame)
    }
}

/// Appends two vertices per line of `geometry`, placed by the global matrix of `node`.
fn project_geometry(
    data: &SharedRenderData,
    geometry: &Geometry,
    node: NodeId,
    sentinel: [f32; 3],
    out: &mut Vec<LineVertex>,
) -> Result<()> {
    let global = data.hierarchy.global_view(node)?;
    let mut positions = Vec::with_capacity(geometry.points.len());
    for point in &geometry.points {
        let projected = if geometry.four_dimensional {
            data.visualizer.project(point, &global)
        } else {
            point.transformed(&global)
        };
        let position = match projected.map(|p| p.to_vec3()) {
            Ok(p) if p.is_finite() => p.to_array(),
            Ok(_) | Err(MathError::DegenerateProjection) => {
                warn!("degenerate point {} in {}, using sentinel", point, geometry.name);
                sentinel
            }
            Err(e) => return Err(e),
        };
        positions.push(position);
    }

    for line in &geometry.lines {
        let (Some(&from), Some(&to)) = (positions.get(line.from), positions.get(line.to)) else {
            return Err(MathError::out_of_range(line.from.max(line.to), positions.len()));
        };
        out.push(LineVertex::new(from, line.color));
        out.push(LineVertex::new(to, line.color));
    }
    Ok(())
}
