use crate::config::CameraConfig;
use crate::math::{Mat4, Vec3};

/// Per-update steering. Deltas are radians; movement axes are unitless
/// weights, normalised together before speed is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    pub yaw_delta: f32,
    pub pitch_delta: f32,
    pub move_forward: f32,
    pub move_right: f32,
    pub move_up: f32,
}

/// Yaw/pitch fly camera. Yaw 0 and pitch 0 look down -Z.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    pitch_limit: f32,
    fov_y: f32,
    near: f32,
    far: f32,
    move_speed: f32,
    look_speed: f32,
    aspect: f32,

    forward: Vec3,
    right: Vec3,
    up: Vec3,

    view: Mat4,
    proj: Mat4,
    view_proj: Mat4,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_config(&CameraConfig::default(), width, height)
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 0.3, 2.2),
            yaw: 0.0,
            pitch: 0.0,
            pitch_limit: config.pitch_limit_degrees.to_radians(),
            fov_y: config.fov_y_degrees.to_radians(),
            near: config.near,
            far: config.far,
            move_speed: config.move_speed,
            look_speed: config.look_speed,
            aspect: 1.0,
            forward: Vec3::new(0.0, 0.0, -1.0),
            right: Vec3::new(1.0, 0.0, 0.0),
            up: Vec3::UP,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
        };
        camera.resize(width, height);
        camera.recompute();
        camera
    }

    /// Rebuilds the projection for a new surface size. The view matrix is
    /// left as is.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = (width as f32 / height.max(1) as f32).max(1e-6);
        self.proj = Mat4::perspective(self.fov_y, self.aspect, self.near, self.far);
        self.view_proj = self.proj * self.view;
    }

    /// Applies `input` over `dt` seconds, then refreshes every matrix.
    pub fn update(&mut self, dt: f32, input: Option<&CameraInput>) {
        if let Some(input) = input {
            self.yaw += input.yaw_delta * self.look_speed;
            self.pitch = self.clamp_pitch(self.pitch + input.pitch_delta * self.look_speed);
        }

        self.compute_basis();

        if let Some(input) = input {
            let mut velocity = Vec3::ZERO;
            if input.move_forward != 0.0 {
                velocity = Vec3::scale_and_add(velocity, self.forward, input.move_forward);
            }
            if input.move_right != 0.0 {
                velocity = Vec3::scale_and_add(velocity, self.right, input.move_right);
            }
            if input.move_up != 0.0 {
                velocity = Vec3::scale_and_add(velocity, self.up, input.move_up);
            }
            if velocity.squared_length() > 0.0 {
                self.position = Vec3::scale_and_add(
                    self.position,
                    velocity.normalize(),
                    self.move_speed * dt,
                );
            }
        }

        self.recompute();
    }

    /// Turns to face `target` from the current position.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize();
        self.yaw = dir.x.atan2(-dir.z);
        self.pitch = self.clamp_pitch(dir.y.clamp(-1.0, 1.0).asin());
        self.recompute();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.recompute();
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    pub fn projection(&self) -> &Mat4 {
        &self.proj
    }

    pub fn view_projection(&self) -> &Mat4 {
        &self.view_proj
    }

    fn clamp_pitch(&self, pitch: f32) -> f32 {
        pitch.clamp(-self.pitch_limit, self.pitch_limit)
    }

    fn compute_basis(&mut self) {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.forward = Vec3::new(sy * cp, sp, -cy * cp).normalize();
        self.right = Vec3::cross(self.forward, Vec3::UP).normalize();
        self.up = Vec3::cross(self.right, self.forward).normalize();
    }

    fn recompute(&mut self) {
        self.compute_basis();
        let target = self.position + self.forward;
        self.view = Mat4::look_at(self.position, target, Vec3::UP);
        self.view_proj = self.proj * self.view;
    }
}
