use glow::HasContext as _;

use super::{
    ActiveUniform, BlendFactor, BufferTarget, Capability, ClearMask, Face, Gl, GlError, IndexType,
    MagFilter, MinFilter, ResourceKind, ShaderStage, UniformKind, Wrap,
};

/// [`Gl`] over a native or WebGL2 context obtained through `glow`.
///
/// The wrapped context must stay current on the calling thread for as long
/// as the backend is used; every method forwards to exactly one `glow` call.
pub struct GlowBackend {
    gl: glow::Context,
}

impl GlowBackend {
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn capability(cap: Capability) -> u32 {
    match cap {
        Capability::Blend => glow::BLEND,
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
    }
}

fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
    }
}

fn wrap_mode(wrap: Wrap) -> i32 {
    match wrap {
        Wrap::Repeat => glow::REPEAT as i32,
        Wrap::ClampToEdge => glow::CLAMP_TO_EDGE as i32,
    }
}

fn uniform_kind(utype: u32) -> UniformKind {
    match utype {
        glow::FLOAT => UniformKind::Float,
        glow::FLOAT_VEC2 => UniformKind::FloatVec2,
        glow::FLOAT_VEC3 => UniformKind::FloatVec3,
        glow::FLOAT_VEC4 => UniformKind::FloatVec4,
        glow::INT => UniformKind::Int,
        glow::INT_VEC2 => UniformKind::IntVec2,
        glow::INT_VEC3 => UniformKind::IntVec3,
        glow::INT_VEC4 => UniformKind::IntVec4,
        glow::BOOL => UniformKind::Bool,
        glow::BOOL_VEC2 => UniformKind::BoolVec2,
        glow::BOOL_VEC3 => UniformKind::BoolVec3,
        glow::BOOL_VEC4 => UniformKind::BoolVec4,
        glow::FLOAT_MAT2 => UniformKind::FloatMat2,
        glow::FLOAT_MAT3 => UniformKind::FloatMat3,
        glow::FLOAT_MAT4 => UniformKind::FloatMat4,
        glow::SAMPLER_2D => UniformKind::Sampler2D,
        other => UniformKind::Other(other),
    }
}

// SAFETY (all `unsafe` blocks below): glow marks every GL entry point unsafe
// because the context must be current and handles must belong to it. The
// backend owns its context and handles only ever come from the same backend.
impl Gl for GlowBackend {
    type Texture = <glow::Context as glow::HasContext>::Texture;
    type Buffer = <glow::Context as glow::HasContext>::Buffer;
    type VertexArray = <glow::Context as glow::HasContext>::VertexArray;
    type Shader = <glow::Context as glow::HasContext>::Shader;
    type Program = <glow::Context as glow::HasContext>::Program;
    type UniformLocation = <glow::Context as glow::HasContext>::UniformLocation;

    fn create_texture(&self) -> Result<Self::Texture, GlError> {
        unsafe { self.gl.create_texture() }
            .map_err(|err| GlError::allocation(ResourceKind::Texture, err))
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture_2d(&self, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn tex_image_2d_rgba8(&self, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width.min(i32::MAX as u32) as i32,
                height.min(i32::MAX as u32) as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn tex_filters(&self, min: MinFilter, mag: MagFilter) {
        let min = match min {
            MinFilter::Nearest => glow::NEAREST,
            MinFilter::Linear => glow::LINEAR,
            MinFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
        };
        let mag = match mag {
            MagFilter::Nearest => glow::NEAREST,
            MagFilter::Linear => glow::LINEAR,
        };
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag as i32);
        }
    }

    fn tex_wrap(&self, s: Wrap, t: Wrap) {
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap_mode(s));
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap_mode(t));
        }
    }

    fn generate_mipmap_2d(&self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, GlError> {
        unsafe { self.gl.create_buffer() }
            .map_err(|err| GlError::allocation(ResourceKind::Buffer, err))
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(buffer_target(target), buffer) }
    }

    fn buffer_data_static(&self, target: BufferTarget, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(buffer_target(target), data, glow::STATIC_DRAW)
        }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, GlError> {
        unsafe { self.gl.create_vertex_array() }
            .map_err(|err| GlError::allocation(ResourceKind::VertexArray, err))
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, stride, offset)
        }
    }

    fn draw_arrays(&self, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(glow::TRIANGLES, first, count) }
    }

    fn draw_elements(&self, count: i32, index_type: IndexType, offset: i32) {
        let element_type = match index_type {
            IndexType::U16 => glow::UNSIGNED_SHORT,
            IndexType::U32 => glow::UNSIGNED_INT,
        };
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, count, element_type, offset)
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, GlError> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe { self.gl.create_shader(kind) }
            .map_err(|err| GlError::allocation(ResourceKind::Shader, err))
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<Self::Program, GlError> {
        unsafe { self.gl.create_program() }
            .map_err(|err| GlError::allocation(ResourceKind::Program, err))
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.detach_shader(program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveUniform> {
        let count = unsafe { self.gl.get_active_uniforms(program) };
        (0..count)
            .filter_map(|index| unsafe { self.gl.get_active_uniform(program, index) })
            .map(|info| ActiveUniform {
                name: info.name,
                size: info.size,
                kind: uniform_kind(info.utype),
            })
            .collect()
    }

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn uniform_f32_slice(&self, location: &Self::UniformLocation, components: usize, values: &[f32]) {
        let location = Some(location);
        unsafe {
            match components {
                1 => self.gl.uniform_1_f32_slice(location, values),
                2 => self.gl.uniform_2_f32_slice(location, values),
                3 => self.gl.uniform_3_f32_slice(location, values),
                _ => self.gl.uniform_4_f32_slice(location, values),
            }
        }
    }

    fn uniform_i32_slice(&self, location: &Self::UniformLocation, components: usize, values: &[i32]) {
        let location = Some(location);
        unsafe {
            match components {
                1 => self.gl.uniform_1_i32_slice(location, values),
                2 => self.gl.uniform_2_i32_slice(location, values),
                3 => self.gl.uniform_3_i32_slice(location, values),
                _ => self.gl.uniform_4_i32_slice(location, values),
            }
        }
    }

    fn uniform_matrix_f32_slice(&self, location: &Self::UniformLocation, dimension: usize, values: &[f32]) {
        let location = Some(location);
        unsafe {
            match dimension {
                2 => self.gl.uniform_matrix_2_f32_slice(location, false, values),
                3 => self.gl.uniform_matrix_3_f32_slice(location, false, values),
                _ => self.gl.uniform_matrix_4_f32_slice(location, false, values),
            }
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&self, mask: ClearMask) {
        let mut bits = 0;
        if mask.color {
            bits |= glow::COLOR_BUFFER_BIT;
        }
        if mask.depth {
            bits |= glow::DEPTH_BUFFER_BIT;
        }
        unsafe { self.gl.clear(bits) }
    }

    fn enable(&self, cap: Capability) {
        unsafe { self.gl.enable(capability(cap)) }
    }

    fn disable(&self, cap: Capability) {
        unsafe { self.gl.disable(capability(cap)) }
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        unsafe { self.gl.blend_func(blend_factor(src), blend_factor(dst)) }
    }

    fn cull_face(&self, face: Face) {
        let face = match face {
            Face::Front => glow::FRONT,
            Face::Back => glow::BACK,
        };
        unsafe { self.gl.cull_face(face) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }
}
