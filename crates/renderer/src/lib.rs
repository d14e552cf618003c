//! Retained-mode rendering core for WebGL2/GLES3-class devices.
//!
//! Everything is written against the narrow [`gl::Gl`] seam, so the same code
//! drives a native `glow` context or the recording backend used by the tests.
//! A frame flows like this:
//!
//! ```text
//!   host loop
//!      │ width, height
//!      ▼
//!   FrameDriver::frame ──▶ viewport (on size change)
//!      │
//!      ├─▶ Scene::resize ─┐
//!      ├─▶ Scene::update  ├─▶ first call starts SceneLogic::setup (async)
//!      └─▶ Scene::render ─┘        │
//!                                  ▼
//!              Program::bind ──▶ PbrMaterial / Texture2D ──▶ Mesh::draw
//! ```
//!
//! [`context::RenderContext`] is shared by every scene on a surface; it owns
//! the graphics seam, the texture policy from [`config::RenderConfig`] and
//! the lazily created fallback textures that fill empty material slots.

use std::future::Future;
use std::pin::Pin;

pub mod camera;
pub mod config;
pub mod context;
pub mod gl;
pub mod logging;
pub mod material;
pub mod math;
pub mod mesh;
pub mod model;
pub mod runtime;
pub mod scene;
pub mod shader;
pub mod texture;

/// Boxed single-threaded future, as returned by asset loaders and scene setup.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

pub use camera::{Camera, CameraInput};
pub use config::{ConfigError, RenderConfig};
pub use context::RenderContext;
#[cfg(feature = "glow")]
pub use gl::GlowBackend;
pub use gl::{Gl, GlError};
pub use material::{AlphaMode, MaterialError, PbrMaterial};
pub use math::{Mat4, Vec2, Vec3, Vec4};
pub use mesh::{Mesh, MeshError, VertexLayout};
pub use model::{MeshData, Model, ModelError, ModelLoader, ModelPart, PartData};
pub use runtime::{FrameDriver, TimeSource};
pub use scene::{
    DrivenScene, FrameInfo, GradientScene, ModelScene, Scene, SceneError, SceneLogic, SceneStatus, SpriteScene,
};
pub use shader::{Binding, BindingValue, Program, ShaderError, ShaderSource};
pub use texture::{Texture2D, TextureError, TextureOptions};
