use std::rc::Rc;

use anyhow::Context as _;
use image::RgbaImage;

use super::{FrameInfo, SceneLogic};
use crate::context::RenderContext;
use crate::gl::{BlendFactor, Capability, ClearMask, Gl};
use crate::mesh::{Mesh, VertexLayout};
use crate::shader::{Binding, Program, ShaderSource};
use crate::texture::{Texture2D, TextureOptions};
use crate::LocalBoxFuture;

const SPRITE_VERT_GLSL: &str = r#"#version 300 es
precision highp float;

layout(location = 0) in vec2 a_pos;
layout(location = 2) in vec2 a_uv;

out vec2 v_uv;

uniform vec2 u_translate;
uniform float u_rotate;
uniform vec2 u_scale;

mat2 rot(float a) {
    float c = cos(a), s = sin(a);
    return mat2(c, -s, s, c);
}

void main() {
    v_uv = a_uv;
    vec2 p = rot(u_rotate) * (a_pos * u_scale) + u_translate;
    gl_Position = vec4(p, 0.0, 1.0);
}
"#;

const FLOAT_ROTATE_FRAG_GLSL: &str = r#"#version 300 es
precision highp float;

in vec2 v_uv;
out vec4 outColor;

uniform sampler2D u_tex;

void main() {
    outColor = texture(u_tex, v_uv);
}
"#;

const WAVE_DISTORT_FRAG_GLSL: &str = r#"#version 300 es
precision highp float;

in vec2 v_uv;
out vec4 outColor;

uniform sampler2D u_tex;
uniform float u_time;

void main() {
    float t = u_time * 0.001;
    vec2 uv = v_uv;
    uv.y += 0.03 * sin(uv.x * 12.0 + t * 2.0);
    uv.x += 0.02 * sin(uv.y * 10.0 + t * 1.3);
    uv = clamp(uv, 0.0, 1.0);

    vec4 col = texture(u_tex, uv);
    col.rgb *= 0.95 + 0.05 * sin(t + uv.x * 20.0);
    outColor = col;
}
"#;

/// Clip-space quad, two triangles of `x, y, u, v`.
const QUAD: [f32; 24] = [
    -1.0, -1.0, 0.0, 0.0, //
    1.0, -1.0, 1.0, 0.0, //
    -1.0, 1.0, 0.0, 1.0, //
    -1.0, 1.0, 0.0, 1.0, //
    1.0, -1.0, 1.0, 0.0, //
    1.0, 1.0, 1.0, 1.0,
];

const SPRITE_UNIT: u32 = 0;

/// Asynchronous provider of the sprite bitmap.
pub trait ImageSource {
    fn load(&self) -> LocalBoxFuture<'static, anyhow::Result<RgbaImage>>;
}

/// An already decoded bitmap.
impl ImageSource for RgbaImage {
    fn load(&self) -> LocalBoxFuture<'static, anyhow::Result<RgbaImage>> {
        let image = self.clone();
        Box::pin(async move { Ok(image) })
    }
}

/// Encoded PNG or JPEG bytes, decoded on load.
#[derive(Debug, Clone)]
pub struct EncodedImage(pub Rc<[u8]>);

impl ImageSource for EncodedImage {
    fn load(&self) -> LocalBoxFuture<'static, anyhow::Result<RgbaImage>> {
        let bytes = Rc::clone(&self.0);
        Box::pin(async move {
            let decoded = image::load_from_memory(&bytes).context("failed to decode sprite image")?;
            Ok::<_, anyhow::Error>(decoded.to_rgba8())
        })
    }
}

/// Per-frame placement of the sprite in clip space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteTransform {
    pub translate: [f32; 2],
    /// Radians.
    pub rotate: f32,
    pub scale: [f32; 2],
}

type TransformFn = Box<dyn Fn(&FrameInfo) -> SpriteTransform>;
type ExtraUniformsFn = Box<dyn Fn(&FrameInfo) -> Vec<(&'static str, f32)>>;

/// A textured quad animated by a per-frame transform and drawn with
/// premultiplied alpha.
pub struct SpriteScene {
    source: Rc<dyn ImageSource>,
    fragment: &'static str,
    transform: TransformFn,
    extra_uniforms: Option<ExtraUniformsFn>,
}

fn aspect_of(frame: &FrameInfo) -> f32 {
    frame.width as f32 / frame.height.max(1) as f32
}

fn fitted_scale(frame: &FrameInfo, base: f32) -> [f32; 2] {
    let aspect = aspect_of(frame);
    let sx = if aspect >= 1.0 { 0.6 } else { 0.6 * aspect };
    [base * sx, base * 0.6]
}

impl SpriteScene {
    pub fn new(
        source: Rc<dyn ImageSource>,
        fragment: &'static str,
        transform: impl Fn(&FrameInfo) -> SpriteTransform + 'static,
    ) -> Self {
        Self {
            source,
            fragment,
            transform: Box::new(transform),
            extra_uniforms: None,
        }
    }

    /// Float uniforms bound after the transform every frame.
    pub fn with_extra_uniforms(
        mut self,
        extra: impl Fn(&FrameInfo) -> Vec<(&'static str, f32)> + 'static,
    ) -> Self {
        self.extra_uniforms = Some(Box::new(extra));
        self
    }

    /// Bobs and sways the sprite around the centre.
    pub fn float_rotate(source: Rc<dyn ImageSource>) -> Self {
        Self::new(source, FLOAT_ROTATE_FRAG_GLSL, |frame| {
            let t = (frame.time_ms * 0.001) as f32;
            SpriteTransform {
                translate: [0.05 * (t * 0.8).sin(), 0.08 * (t * 1.5).sin()],
                rotate: 0.25 * t.sin(),
                scale: fitted_scale(frame, 1.0),
            }
        })
    }

    /// Holds the sprite still and ripples its texture coordinates.
    pub fn wave_distort(source: Rc<dyn ImageSource>) -> Self {
        Self::new(source, WAVE_DISTORT_FRAG_GLSL, |frame| SpriteTransform {
            translate: [0.0, 0.0],
            rotate: 0.0,
            scale: fitted_scale(frame, 0.6),
        })
        .with_extra_uniforms(|frame| vec![("u_time", frame.time_ms as f32)])
    }

    pub fn transform_at(&self, frame: &FrameInfo) -> SpriteTransform {
        (self.transform)(frame)
    }
}

pub struct SpriteResources<G: Gl> {
    program: Program<G>,
    quad: Mesh<G>,
    texture: Texture2D<G>,
}

impl<G: Gl + 'static> SceneLogic<G> for SpriteScene {
    type Resources = SpriteResources<G>;

    fn setup(&mut self, ctx: Rc<RenderContext<G>>) -> LocalBoxFuture<'static, anyhow::Result<Self::Resources>> {
        let source = Rc::clone(&self.source);
        let fragment = self.fragment;
        Box::pin(async move {
            // Every GPU object is created after the last await, so a dispose
            // during the image load leaves nothing behind.
            let image = source.load().await?;

            let program = Program::new(
                &ctx,
                &[ShaderSource::vertex(SPRITE_VERT_GLSL), ShaderSource::fragment(fragment)],
            )
            .context("failed to build sprite program")?;

            let mut layout = VertexLayout {
                attributes: Vec::new(),
                stride: 0,
            };
            layout.push(VertexLayout::POSITION, 2).push(VertexLayout::UV, 2);
            let quad = match Mesh::from_vertices(&ctx, &QUAD, &layout) {
                Ok(quad) => quad,
                Err(err) => {
                    program.destroy(&ctx);
                    return Err(err).context("failed to upload sprite quad");
                }
            };

            let options = TextureOptions {
                flip_y: true,
                generate_mipmaps: true,
            };
            let texture = match Texture2D::from_image(&ctx, &image, options) {
                Ok(texture) => texture,
                Err(err) => {
                    quad.dispose(&ctx);
                    program.destroy(&ctx);
                    return Err(err).context("failed to upload sprite texture");
                }
            };
            tracing::debug!(width = texture.width(), height = texture.height(), "sprite ready");

            Ok::<_, anyhow::Error>(SpriteResources {
                program,
                quad,
                texture,
            })
        })
    }

    fn render(&mut self, ctx: &RenderContext<G>, res: &mut Self::Resources, frame: FrameInfo) -> anyhow::Result<()> {
        let gl = ctx.gl();
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        gl.clear(ClearMask::COLOR);
        gl.enable(Capability::Blend);
        gl.blend_func(BlendFactor::One, BlendFactor::OneMinusSrcAlpha);

        let placement = self.transform_at(&frame);
        let mut bindings = vec![
            Binding::new("u_translate", placement.translate),
            Binding::new("u_rotate", placement.rotate),
            Binding::new("u_scale", placement.scale),
            Binding::sampler("u_tex", res.texture.handle(), SPRITE_UNIT),
        ];
        if let Some(extra) = &self.extra_uniforms {
            bindings.extend(
                extra(&frame)
                    .into_iter()
                    .map(|(name, value)| Binding::new(name, value)),
            );
        }
        res.program.bind(ctx, &bindings)?;
        res.quad.draw(ctx);
        gl.bind_texture_2d(None);
        Ok(())
    }

    fn teardown(&mut self, ctx: &RenderContext<G>, res: Self::Resources) {
        res.texture.destroy(ctx);
        res.quad.dispose(ctx);
        res.program.destroy(ctx);
    }
}
