//! TOML-backed tuning knobs. Every field has a default, so an empty document
//! is a valid configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// What happens when mipmaps are requested for a non-power-of-two image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NpotMipmaps {
    /// Upload without mipmaps, clamp-to-edge wrapping and linear filtering.
    #[default]
    Downgrade,
    /// Fail the upload with `TextureError::NonPowerOfTwo`.
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    pub textures: TextureConfig,
    pub camera: CameraConfig,
    pub model_scene: ModelSceneConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TextureConfig {
    pub npot_mipmaps: NpotMipmaps,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub pitch_limit_degrees: f32,
    pub move_speed: f32,
    pub look_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            near: 0.01,
            far: 1000.0,
            pitch_limit_degrees: 89.0,
            move_speed: 2.5,
            look_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSceneConfig {
    pub ambience: f32,
    pub half_lambert_pow: f32,
    pub light_color: [f32; 3],
    pub light_intensity: f32,
    /// Distance of the orbiting light from the origin.
    pub light_radius: f32,
    /// Tilt reached when the pointer sits on the edge of the surface.
    pub max_tilt_degrees: f32,
    /// Radians of spin about Y per millisecond.
    pub spin_rate: f32,
    pub camera_distance: f32,
}

impl Default for ModelSceneConfig {
    fn default() -> Self {
        Self {
            ambience: 0.01,
            half_lambert_pow: 2.0,
            light_color: [1.0, 1.0, 1.0],
            light_intensity: 30.0,
            light_radius: 1.6,
            max_tilt_degrees: 90.0,
            spin_rate: 0.001,
            camera_distance: 2.2,
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: RenderConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if !(camera.fov_y_degrees > 0.0 && camera.fov_y_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov_y_degrees must be in (0, 180); got {}",
                camera.fov_y_degrees
            )));
        }
        if !(camera.near > 0.0) || camera.near >= camera.far {
            return Err(ConfigError::Invalid(format!(
                "camera clip range must satisfy 0 < near < far; got near={} far={}",
                camera.near, camera.far
            )));
        }
        if !(camera.pitch_limit_degrees > 0.0 && camera.pitch_limit_degrees < 90.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.pitch_limit_degrees must be in (0, 90); got {}",
                camera.pitch_limit_degrees
            )));
        }
        if camera.move_speed < 0.0 || camera.look_speed < 0.0 {
            return Err(ConfigError::Invalid(
                "camera speeds must be >= 0".into(),
            ));
        }

        let scene = &self.model_scene;
        if !(scene.light_radius > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "model_scene.light_radius must be greater than zero; got {}",
                scene.light_radius
            )));
        }
        if !(scene.camera_distance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "model_scene.camera_distance must be greater than zero; got {}",
                scene.camera_distance
            )));
        }
        if scene.light_intensity < 0.0 || scene.ambience < 0.0 {
            return Err(ConfigError::Invalid(
                "model_scene light terms must be >= 0".into(),
            ));
        }
        Ok(())
    }
}
