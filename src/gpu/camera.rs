//! Orbit camera with a slow idle drift.

use glam::{Mat4, Vec3};

/// Yaw swing amplitude in radians.
const DRIFT_AMPLITUDE: f32 = 0.35;
/// Yaw swing angular rate in radians per second.
const DRIFT_RATE: f32 = 0.05;

/// Orbit camera looking at the deck's working volume.
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    drift: f32,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.12,
            distance: 9.0,
            target: Vec3::ZERO,
            fov_y: 45.0_f32.to_radians(),
            drift: 0.0,
        }
    }

    /// Set the drift from elapsed time. Reduced motion pins it at rest.
    pub fn update_drift(&mut self, time: f32, reduced_motion: bool) {
        self.drift = if reduced_motion {
            0.0
        } else {
            DRIFT_AMPLITUDE * (time * DRIFT_RATE * std::f32::consts::TAU).sin()
        };
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let yaw = self.yaw + self.drift;
        let x = self.distance * self.pitch.cos() * yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let proj = Mat4::perspective_rh(self.fov_y, aspect.max(1e-3), 0.1, 100.0);
        proj * self.view_matrix()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_kept_under_drift() {
        let mut camera = Camera::new();
        camera.update_drift(3.7, false);
        assert!((camera.position().length() - camera.distance).abs() < 1e-4);
    }

    #[test]
    fn test_reduced_motion_pins_camera() {
        let mut camera = Camera::new();
        let rest = camera.position();
        camera.update_drift(5.0, true);
        assert_eq!(camera.position(), rest);
    }

    #[test]
    fn test_origin_projects_to_center() {
        let camera = Camera::new();
        let clip = camera.view_proj(16.0 / 9.0) * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
    }
}
