//! The graphics seam.
//!
//! [`Gl`] is the narrow slice of a WebGL2 / GLES3 context the rendering core
//! talks to. Handles are associated types so that native GL (integer names)
//! and WebGL (JS objects) backends each keep their own representation. The
//! enums below replace raw GL enumerants at the seam so that nothing above it
//! depends on `glow` constants.
//!
//! Backends:
//! - `GlowBackend` (feature `glow`) drives a real context through `glow`.
//! - `recording::RecordingGl` (tests only) records every call for assertions.

#[cfg(feature = "glow")]
mod glow_backend;
#[cfg(test)]
pub(crate) mod recording;

use std::fmt::Debug;
use std::hash::Hash;

#[cfg(feature = "glow")]
pub use glow_backend::GlowBackend;

/// Allocation failures reported by the context.
#[derive(Debug, thiserror::Error)]
pub enum GlError {
    #[error("failed to allocate {kind}: {detail}")]
    Allocation { kind: ResourceKind, detail: String },
}

impl GlError {
    pub fn allocation(kind: ResourceKind, detail: impl Into<String>) -> Self {
        GlError::Allocation {
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    Buffer,
    VertexArray,
    Shader,
    Program,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceKind::Texture => "texture",
            ResourceKind::Buffer => "buffer",
            ResourceKind::VertexArray => "vertex array",
            ResourceKind::Shader => "shader",
            ResourceKind::Program => "program",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// Element width of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub fn byte_width(self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    Repeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Blend,
    DepthTest,
    CullFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
}

/// Buffers affected by [`Gl::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const COLOR: Self = Self {
        color: true,
        depth: false,
    };
    pub const COLOR_DEPTH: Self = Self {
        color: true,
        depth: true,
    };
}

/// GLSL type of an active uniform as reported by program reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    Int,
    IntVec2,
    IntVec3,
    IntVec4,
    Bool,
    BoolVec2,
    BoolVec3,
    BoolVec4,
    FloatMat2,
    FloatMat3,
    FloatMat4,
    Sampler2D,
    /// A type the core has no setter for (cube samplers, unsigned ints, ...).
    Other(u32),
}

impl UniformKind {
    /// Scalar components per element (16 for a `mat4`, 1 for samplers).
    pub fn components(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int | UniformKind::Bool | UniformKind::Sampler2D => 1,
            UniformKind::FloatVec2 | UniformKind::IntVec2 | UniformKind::BoolVec2 => 2,
            UniformKind::FloatVec3 | UniformKind::IntVec3 | UniformKind::BoolVec3 => 3,
            UniformKind::FloatVec4 | UniformKind::IntVec4 | UniformKind::BoolVec4 => 4,
            UniformKind::FloatMat2 => 4,
            UniformKind::FloatMat3 => 9,
            UniformKind::FloatMat4 => 16,
            UniformKind::Other(_) => 0,
        }
    }
}

/// One entry of a program's active uniform list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    /// Name as reported by the driver; arrays carry a `[0]` suffix.
    pub name: String,
    /// Array length, 1 for non-arrays.
    pub size: i32,
    pub kind: UniformKind,
}

/// The low-level graphics API the core renders through.
///
/// Every method maps onto a single WebGL2 call. Binding state (bound
/// texture, buffer, vertex array, program) lives in the context, exactly as
/// in GL.
pub trait Gl {
    type Texture: Copy + Eq + Hash + Debug;
    type Buffer: Copy + Eq + Hash + Debug;
    type VertexArray: Copy + Eq + Hash + Debug;
    type Shader: Copy + Eq + Hash + Debug;
    type Program: Copy + Eq + Hash + Debug;
    type UniformLocation: Clone + Debug;

    fn create_texture(&self) -> Result<Self::Texture, GlError>;
    fn delete_texture(&self, texture: Self::Texture);
    /// Selects texture unit `unit` (0-based, not `TEXTURE0 + unit`).
    fn active_texture(&self, unit: u32);
    fn bind_texture_2d(&self, texture: Option<Self::Texture>);
    fn tex_image_2d_rgba8(&self, width: u32, height: u32, pixels: &[u8]);
    fn tex_filters(&self, min: MinFilter, mag: MagFilter);
    fn tex_wrap(&self, s: Wrap, t: Wrap);
    fn generate_mipmap_2d(&self);

    fn create_buffer(&self) -> Result<Self::Buffer, GlError>;
    fn delete_buffer(&self, buffer: Self::Buffer);
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>);
    fn buffer_data_static(&self, target: BufferTarget, data: &[u8]);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, GlError>;
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn enable_vertex_attrib_array(&self, index: u32);
    /// Float attribute pointer; `stride` and `offset` are in bytes.
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);

    /// Non-indexed triangle list draw.
    fn draw_arrays(&self, first: i32, count: i32);
    /// Indexed triangle list draw reading from the bound element buffer.
    fn draw_elements(&self, count: i32, index_type: IndexType, offset: i32);

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, GlError>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, GlError>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);
    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveUniform>;
    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;

    fn uniform_f32_slice(&self, location: &Self::UniformLocation, components: usize, values: &[f32]);
    fn uniform_i32_slice(&self, location: &Self::UniformLocation, components: usize, values: &[i32]);
    /// Column-major matrix upload; `dimension` is 2, 3 or 4.
    fn uniform_matrix_f32_slice(&self, location: &Self::UniformLocation, dimension: usize, values: &[f32]);

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: ClearMask);
    fn enable(&self, capability: Capability);
    fn disable(&self, capability: Capability);
    fn blend_func(&self, src: BlendFactor, dst: BlendFactor);
    fn cull_face(&self, face: Face);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
}
