//! Shader programs with name-based uniform binding.
//!
//! A [`Program`] compiles and links its stages, then reflects every active
//! uniform once into a name → [`UniformSetter`] table. After that the only
//! way to touch GPU uniform state is [`Program::bind`], which takes a batch
//! of typed [`Binding`]s:
//!
//! ```text
//!   &[Binding]  ──validate──▶ all kinds match? ──no──▶ ShaderError::KindMismatch
//!                                   │ yes
//!                                   ▼
//!                       use_program + one setter call per binding
//!                       (unknown names: warn once, report as skipped)
//! ```

mod uniforms;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

pub use uniforms::{Binding, BindingValue};
pub(crate) use uniforms::UniformSetter;

use crate::context::RenderContext;
use crate::gl::{Gl, GlError, ShaderStage, UniformKind};

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error(transparent)]
    Gl(#[from] GlError),
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
    #[error("program has no {0} stage")]
    MissingStage(ShaderStage),
    #[error("uniform '{name}' is {expected:?}; binding supplied {supplied}")]
    KindMismatch {
        name: String,
        expected: UniformKind,
        supplied: &'static str,
    },
    #[error("program has been destroyed")]
    Destroyed,
}

/// One stage of a program.
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource<'a> {
    pub stage: ShaderStage,
    pub source: &'a str,
}

impl<'a> ShaderSource<'a> {
    pub fn vertex(source: &'a str) -> Self {
        Self {
            stage: ShaderStage::Vertex,
            source,
        }
    }

    pub fn fragment(source: &'a str) -> Self {
        Self {
            stage: ShaderStage::Fragment,
            source,
        }
    }
}

/// Outcome of a successful [`Program::bind`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    pub applied: usize,
    /// Names with no active uniform in this program.
    pub skipped: Vec<String>,
}

pub struct Program<G: Gl> {
    handle: Cell<Option<G::Program>>,
    uniforms: HashMap<String, UniformSetter<G::UniformLocation>>,
    warned: RefCell<HashSet<String>>,
}

impl<G: Gl> Program<G> {
    pub fn new(ctx: &RenderContext<G>, stages: &[ShaderSource<'_>]) -> Result<Self, ShaderError> {
        for required in [ShaderStage::Vertex, ShaderStage::Fragment] {
            if !stages.iter().any(|s| s.stage == required) {
                return Err(ShaderError::MissingStage(required));
            }
        }

        let gl = ctx.gl();
        let mut compiled = Vec::with_capacity(stages.len());
        for stage in stages {
            match compile(gl, stage) {
                Ok(shader) => compiled.push(shader),
                Err(err) => {
                    compiled.into_iter().for_each(|s| gl.delete_shader(s));
                    return Err(err);
                }
            }
        }

        let program = match link(gl, &compiled) {
            Ok(program) => program,
            Err(err) => {
                compiled.into_iter().for_each(|s| gl.delete_shader(s));
                return Err(err);
            }
        };
        for shader in compiled {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }

        let uniforms = reflect(gl, program);
        tracing::debug!(uniforms = uniforms.len(), "linked shader program");

        Ok(Self {
            handle: Cell::new(Some(program)),
            uniforms,
            warned: RefCell::new(HashSet::new()),
        })
    }

    pub fn handle(&self) -> Option<G::Program> {
        self.handle.get()
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    pub fn uniform_kind(&self, name: &str) -> Option<UniformKind> {
        self.uniforms.get(name).map(|setter| setter.kind)
    }

    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.keys().map(String::as_str)
    }

    pub fn use_program(&self, ctx: &RenderContext<G>) {
        ctx.gl().use_program(self.handle.get());
    }

    /// Makes the program current and applies every binding.
    ///
    /// All bindings are checked against the reflected kinds before any GPU
    /// call is issued, so a mismatch leaves uniform state untouched.
    pub fn bind(
        &self,
        ctx: &RenderContext<G>,
        bindings: &[Binding<'_, G::Texture>],
    ) -> Result<BindReport, ShaderError> {
        let program = self.handle.get().ok_or(ShaderError::Destroyed)?;

        let mut report = BindReport::default();
        let mut resolved = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let Some(setter) = self.uniforms.get(binding.name.as_ref()) else {
                self.warn_unknown(&binding.name);
                report.skipped.push(binding.name.to_string());
                continue;
            };
            if !setter.accepts(&binding.value) {
                return Err(ShaderError::KindMismatch {
                    name: binding.name.to_string(),
                    expected: setter.kind,
                    supplied: binding.value.describe(),
                });
            }
            resolved.push((setter, &binding.value));
        }

        let gl = ctx.gl();
        gl.use_program(Some(program));
        for (setter, value) in &resolved {
            setter.apply(gl, value);
        }
        report.applied = resolved.len();
        tracing::trace!(applied = report.applied, skipped = report.skipped.len(), "bound uniforms");
        Ok(report)
    }

    pub fn destroy(&self, ctx: &RenderContext<G>) {
        if let Some(program) = self.handle.take() {
            ctx.gl().delete_program(program);
        }
    }

    fn warn_unknown(&self, name: &str) {
        if self.warned.borrow_mut().insert(name.to_owned()) {
            tracing::warn!(uniform = %name, "binding for unknown uniform ignored");
        }
    }
}

fn compile<G: Gl>(gl: &G, stage: &ShaderSource<'_>) -> Result<G::Shader, ShaderError> {
    let shader = gl.create_shader(stage.stage)?;
    gl.shader_source(shader, stage.source);
    gl.compile_shader(shader);
    if !gl.shader_compile_status(shader) {
        let log = gl.shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(ShaderError::Compile {
            stage: stage.stage,
            log,
        });
    }
    Ok(shader)
}

fn link<G: Gl>(gl: &G, shaders: &[G::Shader]) -> Result<G::Program, ShaderError> {
    let program = gl.create_program()?;
    for &shader in shaders {
        gl.attach_shader(program, shader);
    }
    gl.link_program(program);
    if !gl.program_link_status(program) {
        let log = gl.program_info_log(program);
        gl.delete_program(program);
        return Err(ShaderError::Link { log });
    }
    Ok(program)
}

fn reflect<G: Gl>(gl: &G, program: G::Program) -> HashMap<String, UniformSetter<G::UniformLocation>> {
    let mut table = HashMap::new();
    for info in gl.active_uniforms(program) {
        let name = info.name.strip_suffix("[0]").unwrap_or(&info.name).to_owned();
        if let UniformKind::Other(raw) = info.kind {
            tracing::warn!(uniform = %name, kind = raw, "uniform type has no setter; skipping");
            continue;
        }
        // Uniform block members report no location.
        let Some(location) = gl.uniform_location(program, &info.name) else {
            continue;
        };
        table.insert(
            name,
            UniformSetter {
                location,
                kind: info.kind,
                count: info.size.max(1) as usize,
            },
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::recording::{GlCall, RecordingGl};
    use crate::gl::ResourceKind;
    use crate::math::{Mat4, Vec3};

    const PASS_THROUGH_VS: &str = "#version 300 es
in vec3 a_pos;
void main() { gl_Position = vec4(a_pos, 1.0); }
";

    const SOLID_FS: &str = "#version 300 es
precision mediump float;
uniform vec4 u_color;
out vec4 outColor;
void main() { outColor = u_color; }
";

    const ARRAY_FS: &str = "#version 300 es
precision mediump float;
uniform mat4 u_world;
uniform vec3 u_lights[4];
uniform sampler2D u_tex;
uniform bool u_flag;
out vec4 outColor;
void main() { outColor = vec4(u_lights[0], 1.0); }
";

    fn build(ctx: &RenderContext<RecordingGl>, fs: &str) -> Program<RecordingGl> {
        Program::new(ctx, &[ShaderSource::vertex(PASS_THROUGH_VS), ShaderSource::fragment(fs)])
            .expect("program links")
    }

    #[test]
    fn solid_colour_binds_without_skips() {
        let ctx = RenderContext::new(RecordingGl::new());
        let program = build(&ctx, SOLID_FS);
        assert!(program.has_uniform("u_color"));
        assert_eq!(program.uniform_kind("u_color"), Some(UniformKind::FloatVec4));

        let report = program
            .bind(&ctx, &[Binding::new("u_color", [1.0f32, 0.0, 0.0, 1.0])])
            .unwrap();
        assert_eq!(report.applied, 1);
        assert!(report.skipped.is_empty());
        assert_eq!(ctx.gl().last_f32("u_color"), Some(vec![1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn stage_objects_are_released_after_link() {
        let ctx = RenderContext::new(RecordingGl::new());
        build(&ctx, SOLID_FS);
        assert_eq!(ctx.gl().live(ResourceKind::Shader), 0);
        assert_eq!(ctx.gl().live(ResourceKind::Program), 1);
        let detaches = ctx
            .gl()
            .calls()
            .iter()
            .filter(|c| matches!(c, GlCall::DetachShader { .. }))
            .count();
        assert_eq!(detaches, 2);
    }

    #[test]
    fn compile_failure_carries_driver_log() {
        let ctx = RenderContext::new(RecordingGl::new());
        ctx.gl().fail_compile(ShaderStage::Fragment, "0:3: syntax error");
        let err = Program::new(
            &ctx,
            &[ShaderSource::vertex(PASS_THROUGH_VS), ShaderSource::fragment(SOLID_FS)],
        )
        .err()
        .expect("compile fails");
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(log, "0:3: syntax error");
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(ctx.gl().live(ResourceKind::Shader), 0);
    }

    #[test]
    fn link_failure_releases_everything() {
        let ctx = RenderContext::new(RecordingGl::new());
        ctx.gl().fail_link("varying mismatch");
        let err = Program::new(
            &ctx,
            &[ShaderSource::vertex(PASS_THROUGH_VS), ShaderSource::fragment(SOLID_FS)],
        )
        .err();
        assert!(matches!(err, Some(ShaderError::Link { ref log }) if log == "varying mismatch"));
        assert_eq!(ctx.gl().live(ResourceKind::Shader), 0);
        assert_eq!(ctx.gl().live(ResourceKind::Program), 0);
    }

    #[test]
    fn missing_fragment_stage_is_rejected() {
        let ctx = RenderContext::new(RecordingGl::new());
        let err = Program::new(&ctx, &[ShaderSource::vertex(PASS_THROUGH_VS)]).err();
        assert!(matches!(err, Some(ShaderError::MissingStage(ShaderStage::Fragment))));
    }

    #[test]
    fn unknown_names_are_skipped_and_reported() {
        let ctx = RenderContext::new(RecordingGl::new());
        let program = build(&ctx, SOLID_FS);
        let bindings = [
            Binding::new("u_time", 1.0f32),
            Binding::new("u_color", [0.0f32, 1.0, 0.0, 1.0]),
        ];
        let report = program.bind(&ctx, &bindings).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, ["u_time"]);
        // Warned once; a second bind still reports it.
        let again = program.bind(&ctx, &bindings).unwrap();
        assert_eq!(again.skipped, ["u_time"]);
        assert_eq!(program.warned.borrow().len(), 1);
    }

    #[test]
    fn kind_mismatch_rejects_the_whole_batch() {
        let ctx = RenderContext::new(RecordingGl::new());
        let program = build(&ctx, SOLID_FS);
        ctx.gl().take_calls();
        let err = program
            .bind(&ctx, &[Binding::new("u_color", 1.0f32)])
            .unwrap_err();
        assert!(matches!(
            err,
            ShaderError::KindMismatch { expected: UniformKind::FloatVec4, supplied: "float", .. }
        ));
        assert!(ctx.gl().calls().is_empty());
    }

    #[test]
    fn arrays_matrices_samplers_and_bools() {
        let ctx = RenderContext::new(RecordingGl::new());
        let program = build(&ctx, ARRAY_FS);
        assert!(program.has_uniform("u_lights"));

        let lights = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let report = program
            .bind(
                &ctx,
                &[
                    Binding::new("u_world", Mat4::translation(Vec3::new(1.0, 2.0, 3.0))),
                    Binding::new("u_lights", &lights[..]),
                    Binding::sampler("u_tex", Some(42), 3),
                    Binding::new("u_flag", true),
                ],
            )
            .unwrap();
        assert_eq!(report.applied, 4);

        let gl = ctx.gl();
        assert_eq!(gl.last_f32("u_world").map(|m| m[12..15].to_vec()), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(gl.last_f32("u_lights"), Some(lights.to_vec()));
        assert_eq!(gl.last_i32("u_tex"), Some(vec![3]));
        assert_eq!(gl.last_i32("u_flag"), Some(vec![1]));
        let calls = gl.calls();
        assert!(calls.contains(&GlCall::ActiveTexture(3)));
        assert!(calls.contains(&GlCall::BindTexture(Some(42))));
    }

    #[test]
    fn destroyed_program_refuses_to_bind() {
        let ctx = RenderContext::new(RecordingGl::new());
        let program = build(&ctx, SOLID_FS);
        program.destroy(&ctx);
        program.destroy(&ctx);
        assert_eq!(ctx.gl().live(ResourceKind::Program), 0);
        assert!(matches!(program.bind(&ctx, &[]), Err(ShaderError::Destroyed)));
    }
}
