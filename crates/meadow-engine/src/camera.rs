//! First-person camera.
//!
//! The view direction is given by two angles in degrees: `theta`, measured
//! from straight down (0) through horizontal (90) to straight up (180), and
//! `phi`, the heading around the Y axis starting at +X. Projection uses
//! OpenGL clip conventions so the kernel's frustum extraction applies as is.

use glam::{Mat4, Vec3};

use crate::config::CameraSettings;

/// Smallest allowed vertical angle.
pub const MIN_THETA: f32 = 0.01;

/// Largest allowed vertical angle.
pub const MAX_THETA: f32 = 179.9;

/// Camera that moves along its view direction.
#[derive(Debug, Clone)]
pub struct FpsCamera {
    position: Vec3,
    last_position: Vec3,
    theta: f32,
    phi: f32,
    dir: Vec3,
    right: Vec3,
    up: Vec3,
    fov: f32,
    near: f32,
    far: f32,
    aspect: f32,
    speed: f32,
}

impl FpsCamera {
    /// Creates a level camera at `position` looking along +X.
    #[must_use]
    pub fn new(position: Vec3, settings: &CameraSettings) -> Self {
        let mut camera = Self {
            position,
            last_position: position,
            theta: 90.0,
            phi: 0.0,
            dir: Vec3::X,
            right: Vec3::Z,
            up: Vec3::Y,
            fov: settings.fov,
            near: settings.near,
            far: settings.far,
            aspect: settings.width as f32 / settings.height.max(1) as f32,
            speed: settings.speed,
        };
        camera.update_basis();
        camera
    }

    /// Eye position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit view direction.
    #[must_use]
    pub const fn direction(&self) -> Vec3 {
        self.dir
    }

    /// Vertical angle in degrees.
    #[must_use]
    pub const fn theta(&self) -> f32 {
        self.theta
    }

    /// Heading in degrees, in `[0, 360)`.
    #[must_use]
    pub const fn phi(&self) -> f32 {
        self.phi
    }

    /// Near plane distance.
    #[must_use]
    pub const fn near(&self) -> f32 {
        self.near
    }

    /// Far plane distance.
    #[must_use]
    pub const fn far(&self) -> f32 {
        self.far
    }

    /// Vertical field of view in degrees.
    #[must_use]
    pub const fn fov(&self) -> f32 {
        self.fov
    }

    /// Moves the eye to `position`.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Adds `d_theta` and `d_phi` degrees to the view angles.
    pub fn rotate(&mut self, d_theta: f32, d_phi: f32) {
        self.theta = (self.theta + d_theta).clamp(MIN_THETA, MAX_THETA);
        self.phi = (self.phi + d_phi).rem_euclid(360.0);
        self.update_basis();
    }

    /// Moves `steps` times the speed along the view direction.
    pub fn advance(&mut self, steps: f32) {
        self.position += self.dir * (self.speed * steps);
    }

    /// Moves `steps` times the speed to the right.
    pub fn strafe(&mut self, steps: f32) {
        self.position += self.right * (self.speed * steps);
    }

    /// Movement since the last [`end_frame`](Self::end_frame).
    #[must_use]
    pub fn frame_delta(&self) -> Vec3 {
        self.position - self.last_position
    }

    /// Marks the end of a frame for [`frame_delta`](Self::frame_delta).
    pub fn end_frame(&mut self) {
        self.last_position = self.position;
    }

    /// View matrix.
    #[must_use]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.dir, self.up)
    }

    /// Perspective projection.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    /// `projection * view`.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    fn update_basis(&mut self) {
        let theta = self.theta.to_radians();
        let phi = self.phi.to_radians();
        self.dir = Vec3::new(theta.sin() * phi.cos(), -theta.cos(), theta.sin() * phi.sin()).normalize();

        let look = -self.dir;
        self.right = Vec3::Y.cross(look).normalize();
        self.up = look.cross(self.right);
    }
}
