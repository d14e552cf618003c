//! In-memory [`Gl`] that records calls instead of rendering.
//!
//! Uniform reflection parses `uniform <type> <name>;` declarations out of the
//! attached sources, which is enough for the shaders the crate ships and for
//! hand-written test shaders.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::{
    ActiveUniform, BlendFactor, BufferTarget, Capability, ClearMask, Face, Gl, GlError, IndexType,
    MagFilter, MinFilter, ResourceKind, ShaderStage, UniformKind, Wrap,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GlCall {
    CreateTexture(u32),
    DeleteTexture(u32),
    ActiveTexture(u32),
    BindTexture(Option<u32>),
    TexImage { width: u32, height: u32, bytes: usize },
    TexFilters(MinFilter, MagFilter),
    TexWrap(Wrap, Wrap),
    GenerateMipmap,
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer(BufferTarget, Option<u32>),
    BufferData { target: BufferTarget, bytes: usize },
    CreateVertexArray(u32),
    DeleteVertexArray(u32),
    BindVertexArray(Option<u32>),
    EnableAttrib(u32),
    AttribPointer { index: u32, size: i32, stride: i32, offset: i32 },
    DrawArrays { first: i32, count: i32 },
    DrawElements { count: i32, index_type: IndexType, offset: i32 },
    CreateShader(u32, ShaderStage),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    UniformF32 { name: String, values: Vec<f32> },
    UniformI32 { name: String, values: Vec<i32> },
    UniformMatrix { name: String, values: Vec<f32> },
    ClearColor([f32; 4]),
    Clear(ClearMask),
    Enable(Capability),
    Disable(Capability),
    BlendFunc(BlendFactor, BlendFactor),
    CullFace(Face),
    Viewport(i32, i32, i32, i32),
}

impl GlCall {
    pub(crate) fn is_draw(&self) -> bool {
        matches!(self, GlCall::DrawArrays { .. } | GlCall::DrawElements { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedLocation {
    pub program: u32,
    pub name: String,
}

#[derive(Default)]
struct State {
    next_id: u32,
    calls: Vec<GlCall>,
    live: HashSet<(ResourceKind, u32)>,
    sources: HashMap<u32, String>,
    stages: HashMap<u32, ShaderStage>,
    attached: HashMap<u32, Vec<u32>>,
    reflected: HashMap<u32, Vec<ActiveUniform>>,
    compile_failure: Option<(ShaderStage, String)>,
    link_failure: Option<String>,
    allocation_failure: Option<ResourceKind>,
}

#[derive(Default)]
pub(crate) struct RecordingGl {
    state: RefCell<State>,
}

impl RecordingGl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    pub(crate) fn take_calls(&self) -> Vec<GlCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub(crate) fn draw_count(&self) -> usize {
        self.state.borrow().calls.iter().filter(|c| c.is_draw()).count()
    }

    pub(crate) fn live(&self, kind: ResourceKind) -> usize {
        self.state
            .borrow()
            .live
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Most recent float upload (vector or matrix) to `name`.
    pub(crate) fn last_f32(&self, name: &str) -> Option<Vec<f32>> {
        self.state.borrow().calls.iter().rev().find_map(|call| match call {
            GlCall::UniformF32 { name: n, values } | GlCall::UniformMatrix { name: n, values }
                if n == name =>
            {
                Some(values.clone())
            }
            _ => None,
        })
    }

    pub(crate) fn last_i32(&self, name: &str) -> Option<Vec<i32>> {
        self.state.borrow().calls.iter().rev().find_map(|call| match call {
            GlCall::UniformI32 { name: n, values } if n == name => Some(values.clone()),
            _ => None,
        })
    }

    pub(crate) fn fail_compile(&self, stage: ShaderStage, log: &str) {
        self.state.borrow_mut().compile_failure = Some((stage, log.to_owned()));
    }

    pub(crate) fn fail_link(&self, log: &str) {
        self.state.borrow_mut().link_failure = Some(log.to_owned());
    }

    pub(crate) fn fail_allocation(&self, kind: Option<ResourceKind>) {
        self.state.borrow_mut().allocation_failure = kind;
    }

    fn record(&self, call: GlCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn allocate(&self, kind: ResourceKind) -> Result<u32, GlError> {
        let mut state = self.state.borrow_mut();
        if state.allocation_failure == Some(kind) {
            return Err(GlError::allocation(kind, "context lost"));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.live.insert((kind, id));
        Ok(id)
    }

    fn release(&self, kind: ResourceKind, id: u32) {
        self.state.borrow_mut().live.remove(&(kind, id));
    }
}

fn parse_kind(ty: &str) -> UniformKind {
    match ty {
        "float" => UniformKind::Float,
        "vec2" => UniformKind::FloatVec2,
        "vec3" => UniformKind::FloatVec3,
        "vec4" => UniformKind::FloatVec4,
        "int" => UniformKind::Int,
        "ivec2" => UniformKind::IntVec2,
        "ivec3" => UniformKind::IntVec3,
        "ivec4" => UniformKind::IntVec4,
        "bool" => UniformKind::Bool,
        "bvec2" => UniformKind::BoolVec2,
        "bvec3" => UniformKind::BoolVec3,
        "bvec4" => UniformKind::BoolVec4,
        "mat2" => UniformKind::FloatMat2,
        "mat3" => UniformKind::FloatMat3,
        "mat4" => UniformKind::FloatMat4,
        "sampler2D" => UniformKind::Sampler2D,
        _ => UniformKind::Other(0),
    }
}

fn reflect(source: &str, out: &mut Vec<ActiveUniform>) {
    for line in source.lines() {
        let Some(rest) = line.trim().strip_prefix("uniform ") else {
            continue;
        };
        let mut tokens = rest
            .split_whitespace()
            .filter(|t| !matches!(*t, "lowp" | "mediump" | "highp"));
        let (Some(ty), Some(decl)) = (tokens.next(), tokens.next()) else {
            continue;
        };
        let decl = decl.trim_end_matches(';');
        let (name, size) = match decl.split_once('[') {
            Some((base, len)) => {
                let len = len.trim_end_matches(']').parse().unwrap_or(1);
                (format!("{base}[0]"), len)
            }
            None => (decl.to_owned(), 1),
        };
        if out.iter().any(|u| u.name == name) {
            continue;
        }
        out.push(ActiveUniform {
            name,
            size,
            kind: parse_kind(ty),
        });
    }
}

impl Gl for RecordingGl {
    type Texture = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type Shader = u32;
    type Program = u32;
    type UniformLocation = RecordedLocation;

    fn create_texture(&self) -> Result<u32, GlError> {
        let id = self.allocate(ResourceKind::Texture)?;
        self.record(GlCall::CreateTexture(id));
        Ok(id)
    }

    fn delete_texture(&self, texture: u32) {
        self.release(ResourceKind::Texture, texture);
        self.record(GlCall::DeleteTexture(texture));
    }

    fn active_texture(&self, unit: u32) {
        self.record(GlCall::ActiveTexture(unit));
    }

    fn bind_texture_2d(&self, texture: Option<u32>) {
        self.record(GlCall::BindTexture(texture));
    }

    fn tex_image_2d_rgba8(&self, width: u32, height: u32, pixels: &[u8]) {
        self.record(GlCall::TexImage {
            width,
            height,
            bytes: pixels.len(),
        });
    }

    fn tex_filters(&self, min: MinFilter, mag: MagFilter) {
        self.record(GlCall::TexFilters(min, mag));
    }

    fn tex_wrap(&self, s: Wrap, t: Wrap) {
        self.record(GlCall::TexWrap(s, t));
    }

    fn generate_mipmap_2d(&self) {
        self.record(GlCall::GenerateMipmap);
    }

    fn create_buffer(&self) -> Result<u32, GlError> {
        let id = self.allocate(ResourceKind::Buffer)?;
        self.record(GlCall::CreateBuffer(id));
        Ok(id)
    }

    fn delete_buffer(&self, buffer: u32) {
        self.release(ResourceKind::Buffer, buffer);
        self.record(GlCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<u32>) {
        self.record(GlCall::BindBuffer(target, buffer));
    }

    fn buffer_data_static(&self, target: BufferTarget, data: &[u8]) {
        self.record(GlCall::BufferData {
            target,
            bytes: data.len(),
        });
    }

    fn create_vertex_array(&self) -> Result<u32, GlError> {
        let id = self.allocate(ResourceKind::VertexArray)?;
        self.record(GlCall::CreateVertexArray(id));
        Ok(id)
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.release(ResourceKind::VertexArray, vertex_array);
        self.record(GlCall::DeleteVertexArray(vertex_array));
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.record(GlCall::BindVertexArray(vertex_array));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::EnableAttrib(index));
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        self.record(GlCall::AttribPointer {
            index,
            size,
            stride,
            offset,
        });
    }

    fn draw_arrays(&self, first: i32, count: i32) {
        self.record(GlCall::DrawArrays { first, count });
    }

    fn draw_elements(&self, count: i32, index_type: IndexType, offset: i32) {
        self.record(GlCall::DrawElements {
            count,
            index_type,
            offset,
        });
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, GlError> {
        let id = self.allocate(ResourceKind::Shader)?;
        self.state.borrow_mut().stages.insert(id, stage);
        self.record(GlCall::CreateShader(id, stage));
        Ok(id)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        self.state
            .borrow_mut()
            .sources
            .insert(shader, source.to_owned());
    }

    fn compile_shader(&self, _shader: u32) {}

    fn shader_compile_status(&self, shader: u32) -> bool {
        let state = self.state.borrow();
        match (&state.compile_failure, state.stages.get(&shader)) {
            (Some((stage, _)), Some(actual)) => stage != actual,
            _ => true,
        }
    }

    fn shader_info_log(&self, _shader: u32) -> String {
        self.state
            .borrow()
            .compile_failure
            .as_ref()
            .map(|(_, log)| log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        self.release(ResourceKind::Shader, shader);
        self.record(GlCall::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<u32, GlError> {
        let id = self.allocate(ResourceKind::Program)?;
        self.record(GlCall::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.state
            .borrow_mut()
            .attached
            .entry(program)
            .or_default()
            .push(shader);
        self.record(GlCall::AttachShader { program, shader });
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        if let Some(list) = self.state.borrow_mut().attached.get_mut(&program) {
            list.retain(|s| *s != shader);
        }
        self.record(GlCall::DetachShader { program, shader });
    }

    fn link_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        let mut uniforms = Vec::new();
        for shader in state.attached.get(&program).into_iter().flatten() {
            if let Some(source) = state.sources.get(shader) {
                reflect(source, &mut uniforms);
            }
        }
        state.reflected.insert(program, uniforms);
        state.calls.push(GlCall::LinkProgram(program));
    }

    fn program_link_status(&self, _program: u32) -> bool {
        self.state.borrow().link_failure.is_none()
    }

    fn program_info_log(&self, _program: u32) -> String {
        self.state.borrow().link_failure.clone().unwrap_or_default()
    }

    fn delete_program(&self, program: u32) {
        self.release(ResourceKind::Program, program);
        self.record(GlCall::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(GlCall::UseProgram(program));
    }

    fn active_uniforms(&self, program: u32) -> Vec<ActiveUniform> {
        self.state
            .borrow()
            .reflected
            .get(&program)
            .cloned()
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<RecordedLocation> {
        let state = self.state.borrow();
        let base = name.strip_suffix("[0]").unwrap_or(name);
        state
            .reflected
            .get(&program)?
            .iter()
            .any(|u| u.name.strip_suffix("[0]").unwrap_or(&u.name) == base)
            .then(|| RecordedLocation {
                program,
                name: base.to_owned(),
            })
    }

    fn uniform_f32_slice(&self, location: &RecordedLocation, _components: usize, values: &[f32]) {
        self.record(GlCall::UniformF32 {
            name: location.name.clone(),
            values: values.to_vec(),
        });
    }

    fn uniform_i32_slice(&self, location: &RecordedLocation, _components: usize, values: &[i32]) {
        self.record(GlCall::UniformI32 {
            name: location.name.clone(),
            values: values.to_vec(),
        });
    }

    fn uniform_matrix_f32_slice(&self, location: &RecordedLocation, _dimension: usize, values: &[f32]) {
        self.record(GlCall::UniformMatrix {
            name: location.name.clone(),
            values: values.to_vec(),
        });
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(GlCall::ClearColor([r, g, b, a]));
    }

    fn clear(&self, mask: ClearMask) {
        self.record(GlCall::Clear(mask));
    }

    fn enable(&self, capability: Capability) {
        self.record(GlCall::Enable(capability));
    }

    fn disable(&self, capability: Capability) {
        self.record(GlCall::Disable(capability));
    }

    fn blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        self.record(GlCall::BlendFunc(src, dst));
    }

    fn cull_face(&self, face: Face) {
        self.record(GlCall::CullFace(face));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Viewport(x, y, width, height));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflects_declared_uniforms_once() {
        let mut out = Vec::new();
        reflect(
            "uniform highp mat4 u_view;\nuniform vec3 u_lights[4];\nvoid main() {}",
            &mut out,
        );
        reflect("uniform mat4 u_view;\nuniform sampler2D u_tex;", &mut out);
        let names: Vec<_> = out.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["u_view", "u_lights[0]", "u_tex"]);
        assert_eq!(out[1].size, 4);
        assert_eq!(out[2].kind, UniformKind::Sampler2D);
    }
}
