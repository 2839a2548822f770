//! Orbiting camera for viewing the projected scene.
//!
//! The camera circles the origin and returns plain [`Matrix`] values, so it can
//! be used without a GPU context.

use crate::error::Result;
use crate::matrix::{Matrix, RotationPlane};
use crate::vector::VectorN;

/// An orbiting camera looking at the origin from the positive x-axis.
///
/// Input handling and smoothing live with the caller; the camera only turns its four
/// parameters into matrices.
///
/// # Example
/// ```
/// use tesseract::Camera;
///
/// let camera = Camera::new()
///     .distance(8.0)
///     .aspect_ratio(16.0 / 9.0)
///     .horizontal_rotation(0.4);
///
/// let view = camera.view_matrix().unwrap();
/// let projection = camera.projection_matrix(0.1, 100.0).unwrap();
/// let view_projection = view.multiply(&projection).unwrap();
/// assert_eq!(view_projection.rows(), 4);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Distance of the eye from the origin.
    pub distance: f32,
    /// Viewport width over height.
    pub aspect_ratio: f32,
    /// Rotation around the vertical axis, in radians.
    pub horizontal_rotation: f32,
    /// Rotation in the XY plane, in radians.
    pub vertical_rotation: f32,
    /// Minimum distance from the origin.
    pub min_distance: f32,
    /// Maximum distance from the origin.
    pub max_distance: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            distance: 5.0,
            aspect_ratio: 1.0,
            horizontal_rotation: 0.0,
            vertical_rotation: 0.0,
            min_distance: 0.5,
            max_distance: 100.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the distance from the origin.
    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self
    }

    /// Set the viewport aspect ratio (width over height).
    pub fn aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn horizontal_rotation(mut self, radians: f32) -> Self {
        self.horizontal_rotation = radians;
        self
    }

    pub fn vertical_rotation(mut self, radians: f32) -> Self {
        self.vertical_rotation = radians;
        self
    }

    /// Set distance limits.
    pub fn distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self.distance = self.distance.clamp(min, max);
        self
    }

    /// Turns the camera by the given angles.
    pub fn orbit(&mut self, horizontal: f32, vertical: f32) {
        self.horizontal_rotation += horizontal;
        self.vertical_rotation += vertical;
    }

    /// Moves the eye towards (negative) or away from (positive) the origin.
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance + delta).clamp(self.min_distance, self.max_distance);
    }

    /// `R(ZX, horizontal) * R(XY, vertical) * look_at * aspect_correction`.
    pub fn view_matrix(&self) -> Result<Matrix> {
        let eye = VectorN::from_slice(&[self.distance, 0.0, 0.0]);
        let origin = VectorN::new(3);
        let up = VectorN::from_slice(&[0.0, 1.0, 0.0]);
        crate::matrix::transform_chain(&[
            Matrix::rotation(4, RotationPlane::ZX, self.horizontal_rotation)?,
            Matrix::rotation(4, RotationPlane::XY, self.vertical_rotation)?,
            Matrix::look_at(&eye, &origin, &up)?,
            aspect_correction(self.aspect_ratio)?,
        ])
    }

    pub fn projection_matrix(&self, near: f32, far: f32) -> Result<Matrix> {
        Matrix::perspective(near, far)
    }

    /// View followed by projection.
    pub fn view_projection(&self, near: f32, far: f32) -> Result<Matrix> {
        self.view_matrix()?.multiply(&self.projection_matrix(near, far)?)
    }
}

/// Scales the image so that a square of side 2 always fits the viewport: wide viewports
/// shrink x, tall viewports shrink y.
pub fn aspect_correction(aspect_ratio: f32) -> Result<Matrix> {
    let factors = if aspect_ratio > 1.0 {
        [1.0 / aspect_ratio, 1.0, 1.0]
    } else {
        [1.0, aspect_ratio, 1.0]
    };
    Matrix::scale(4, &VectorN::from_slice(&factors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn v(components: &[f32]) -> VectorN {
        VectorN::from_slice(components)
    }

    #[test]
    fn origin_lies_in_front_of_the_eye() {
        let camera = Camera::new().distance(4.0);
        let view = camera.view_matrix().unwrap();
        let p = v(&[0.0, 0.0, 0.0, 1.0]).transformed(&view).unwrap();
        assert_abs_diff_eq!(p.x(), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y(), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.z(), -4.0, epsilon = 1e-5);
    }

    #[test]
    fn distance_is_clamped() {
        let mut camera = Camera::new().distance_limits(1.0, 10.0).distance(50.0);
        assert_eq!(camera.distance, 10.0);
        camera.zoom(-20.0);
        assert_eq!(camera.distance, 1.0);
    }

    #[test]
    fn aspect_correction_shrinks_the_long_side() {
        let wide = aspect_correction(2.0).unwrap();
        assert_eq!(wide[(0, 0)], 0.5);
        assert_eq!(wide[(1, 1)], 1.0);

        let tall = aspect_correction(0.5).unwrap();
        assert_eq!(tall[(0, 0)], 1.0);
        assert_eq!(tall[(1, 1)], 0.5);
    }

    #[test]
    fn horizontal_rotation_keeps_the_origin_centered() {
        let mut camera = Camera::new();
        camera.orbit(1.2, 0.3);
        let view = camera.view_matrix().unwrap();
        let p = v(&[0.0, 0.0, 0.0, 1.0]).transformed(&view).unwrap();
        assert_abs_diff_eq!(p.x(), 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn view_projection_places_origin_inside_depth_range() {
        let camera = Camera::new().distance(5.0);
        let m = camera.view_projection(1.0, 10.0).unwrap();
        let mut p = v(&[0.0, 0.0, 0.0, 1.0]).transformed(&m).unwrap();
        let w = p.highest();
        p /= w;
        assert!(p.z() > 0.0 && p.z() < 1.0);
        assert!(camera.projection_matrix(2.0, 1.0).is_err());
    }
}
