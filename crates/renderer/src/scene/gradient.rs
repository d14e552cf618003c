use std::rc::Rc;

use anyhow::Context as _;

use super::{FrameInfo, SceneLogic};
use crate::context::RenderContext;
use crate::gl::{ClearMask, Gl};
use crate::mesh::{Mesh, VertexLayout};
use crate::shader::{Binding, Program, ShaderSource};
use crate::LocalBoxFuture;

const GRADIENT_VERT_GLSL: &str = r#"#version 300 es
precision highp float;

layout(location = 0) in vec2 a_pos;
out vec2 v_uv;

void main() {
    v_uv = a_pos * 0.5 + 0.5;
    gl_Position = vec4(a_pos, 0.0, 1.0);
}
"#;

const GRADIENT_FRAG_GLSL: &str = r#"#version 300 es
precision highp float;

in vec2 v_uv;
out vec4 outColor;

uniform float u_time;
uniform vec2 u_resolution;

void main() {
    float t = u_time * 0.001;
    float wave = 0.5 + 0.5 * sin(t + v_uv.x * 6.2831);
    outColor = vec4(v_uv.x, v_uv.y, wave, 1.0);
}
"#;

/// One triangle whose clipped interior covers the whole viewport.
const FULL_SCREEN_TRIANGLE: [f32; 6] = [-1.0, -1.0, 3.0, -1.0, -1.0, 3.0];

/// Animated full-screen colour gradient.
#[derive(Debug, Default)]
pub struct GradientScene;

pub struct GradientResources<G: Gl> {
    program: Program<G>,
    triangle: Mesh<G>,
}

impl<G: Gl + 'static> SceneLogic<G> for GradientScene {
    type Resources = GradientResources<G>;

    fn setup(&mut self, ctx: Rc<RenderContext<G>>) -> LocalBoxFuture<'static, anyhow::Result<Self::Resources>> {
        Box::pin(async move {
            let program = Program::new(
                &ctx,
                &[
                    ShaderSource::vertex(GRADIENT_VERT_GLSL),
                    ShaderSource::fragment(GRADIENT_FRAG_GLSL),
                ],
            )
            .context("failed to build gradient program")?;

            let mut layout = VertexLayout {
                attributes: Vec::new(),
                stride: 0,
            };
            layout.push(VertexLayout::POSITION, 2);
            let triangle = match Mesh::from_vertices(&ctx, &FULL_SCREEN_TRIANGLE, &layout) {
                Ok(mesh) => mesh,
                Err(err) => {
                    program.destroy(&ctx);
                    return Err(err).context("failed to upload full-screen triangle");
                }
            };
            Ok::<_, anyhow::Error>(GradientResources { program, triangle })
        })
    }

    fn render(&mut self, ctx: &RenderContext<G>, res: &mut Self::Resources, frame: FrameInfo) -> anyhow::Result<()> {
        let gl = ctx.gl();
        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.clear(ClearMask::COLOR);

        res.program.bind(
            ctx,
            &[
                Binding::new("u_time", frame.time_ms as f32),
                Binding::new("u_resolution", [frame.width as f32, frame.height as f32]),
            ],
        )?;
        res.triangle.draw(ctx);
        Ok(())
    }

    fn teardown(&mut self, ctx: &RenderContext<G>, res: Self::Resources) {
        res.triangle.dispose(ctx);
        res.program.destroy(ctx);
    }
}
