use std::rc::Rc;

use anyhow::Context as _;

use super::{FrameInfo, SceneLogic};
use crate::camera::Camera;
use crate::config::{CameraConfig, ModelSceneConfig, RenderConfig};
use crate::context::RenderContext;
use crate::gl::{Capability, ClearMask, Face, Gl};
use crate::math::{Mat4, Vec3};
use crate::model::{Model, ModelLoader};
use crate::shader::{Binding, Program, ShaderSource};
use crate::LocalBoxFuture;

const PBR_VERT_GLSL: &str = r#"#version 300 es
precision highp float;

layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;
layout(location = 2) in vec2 a_uv;
layout(location = 3) in vec4 a_tangent;

uniform mat4 u_world;
uniform mat4 u_view;
uniform mat4 u_proj;

out vec3 v_worldPos;
out vec3 v_normal;
out vec2 v_uv;
out vec4 v_tangent;

void main() {
    vec4 world = u_world * vec4(a_position, 1.0);
    mat3 normalMatrix = mat3(u_world);
    v_worldPos = world.xyz;
    v_normal = normalize(normalMatrix * a_normal);
    v_tangent = vec4(normalize(normalMatrix * a_tangent.xyz), a_tangent.w);
    v_uv = a_uv;
    gl_Position = u_proj * u_view * world;
}
"#;

const PBR_FRAG_GLSL: &str = r#"#version 300 es
precision highp float;

in vec3 v_worldPos;
in vec3 v_normal;
in vec2 v_uv;
in vec4 v_tangent;

out vec4 outColor;

uniform sampler2D u_baseColorTex;
uniform sampler2D u_normalTex;
uniform sampler2D u_metallicRoughnessTex;
uniform sampler2D u_occlusionTex;
uniform sampler2D u_emissiveTex;

uniform vec4 u_baseColorFactor;
uniform float u_metallicFactor;
uniform float u_roughnessFactor;
uniform vec3 u_emissiveFactor;
uniform float u_normalScale;
uniform float u_occlusionStrength;
uniform int u_alphaMode;
uniform float u_alphaCutoff;

uniform vec3 u_viewPos;
uniform vec3 u_lightPos;
uniform vec3 u_lightClr;
uniform float u_lightIntensity;
uniform float u_ambience;
uniform float u_halfLambertPow;

const float PI = 3.14159265;

float distributionGGX(float NdotH, float roughness) {
    float a = roughness * roughness;
    float a2 = a * a;
    float d = NdotH * NdotH * (a2 - 1.0) + 1.0;
    return a2 / (PI * d * d);
}

float geometrySmith(float NdotV, float NdotL, float roughness) {
    float k = (roughness + 1.0) * (roughness + 1.0) / 8.0;
    float gv = NdotV / (NdotV * (1.0 - k) + k);
    float gl = NdotL / (NdotL * (1.0 - k) + k);
    return gv * gl;
}

vec3 fresnelSchlick(float cosTheta, vec3 f0) {
    return f0 + (1.0 - f0) * pow(clamp(1.0 - cosTheta, 0.0, 1.0), 5.0);
}

vec3 surfaceNormal() {
    vec3 n = normalize(v_normal);
    vec3 t = normalize(v_tangent.xyz - n * dot(n, v_tangent.xyz));
    vec3 b = cross(n, t) * v_tangent.w;
    vec3 sampled = texture(u_normalTex, v_uv).xyz * 2.0 - 1.0;
    sampled.xy *= u_normalScale;
    return normalize(mat3(t, b, n) * sampled);
}

void main() {
    vec4 base = texture(u_baseColorTex, v_uv) * u_baseColorFactor;
    if (u_alphaMode == 1 && base.a < u_alphaCutoff) {
        discard;
    }

    vec2 mr = texture(u_metallicRoughnessTex, v_uv).bg;
    float metallic = clamp(mr.x * u_metallicFactor, 0.0, 1.0);
    float roughness = clamp(mr.y * u_roughnessFactor, 0.04, 1.0);
    float ao = mix(1.0, texture(u_occlusionTex, v_uv).r, u_occlusionStrength);

    vec3 N = surfaceNormal();
    vec3 V = normalize(u_viewPos - v_worldPos);
    vec3 toLight = u_lightPos - v_worldPos;
    float dist = length(toLight);
    vec3 L = toLight / dist;
    vec3 H = normalize(V + L);

    float NdotL = dot(N, L);
    float wrapped = pow(NdotL * 0.5 + 0.5, u_halfLambertPow);
    float NdotV = max(dot(N, V), 1e-4);
    float NdotH = max(dot(N, H), 0.0);

    vec3 f0 = mix(vec3(0.04), base.rgb, metallic);
    vec3 F = fresnelSchlick(max(dot(H, V), 0.0), f0);
    float D = distributionGGX(NdotH, roughness);
    float G = geometrySmith(NdotV, max(NdotL, 0.0), roughness);
    vec3 specular = D * G * F / (4.0 * NdotV * max(NdotL, 1e-4));

    vec3 kd = (1.0 - F) * (1.0 - metallic);
    vec3 radiance = u_lightClr * u_lightIntensity / (dist * dist);
    vec3 diffuse = kd * base.rgb / PI * wrapped;
    vec3 lit = (diffuse + specular * max(NdotL, 0.0)) * radiance;

    vec3 ambient = u_ambience * base.rgb * ao;
    vec3 emissive = texture(u_emissiveTex, v_uv).rgb * u_emissiveFactor;
    vec3 color = ambient + lit * ao + emissive;

    color = color / (color + 1.0);
    color = pow(color, vec3(1.0 / 2.2));
    outColor = vec4(color, u_alphaMode == 2 ? base.a : 1.0);
}
"#;

/// A loaded model lit by one point light that orbits the origin on a
/// hemisphere facing the camera.
pub struct ModelScene<G: Gl> {
    loader: Rc<dyn ModelLoader<G>>,
    url: String,
    settings: ModelSceneConfig,
    camera: Camera,
    light_pos: Vec3,
    rotation: Vec3,
    transform: Mat4,
}

pub struct ModelResources<G: Gl> {
    model: Model<G>,
    program: Program<G>,
}

impl<G: Gl> ModelScene<G> {
    pub fn new(loader: Rc<dyn ModelLoader<G>>, url: impl Into<String>, config: &RenderConfig) -> Self {
        Self::with_settings(loader, url, &config.camera, config.model_scene.clone())
    }

    pub fn with_settings(
        loader: Rc<dyn ModelLoader<G>>,
        url: impl Into<String>,
        camera: &CameraConfig,
        settings: ModelSceneConfig,
    ) -> Self {
        Self {
            loader,
            url: url.into(),
            settings,
            camera: Camera::from_config(camera, 1, 1),
            light_pos: Vec3::new(0.0, 1.0, 0.0),
            rotation: Vec3::ZERO,
            transform: Mat4::IDENTITY,
        }
    }

    /// Steers the light from a pointer position normalised to the surface:
    /// `(0, 0)` is the centre, `±1` the edges, `+y` up. The centre puts the
    /// light straight in front of the model; the edge tilts it by the
    /// configured maximum.
    pub fn set_pointer(&mut self, nx: f32, ny: f32) {
        let phi = ny.atan2(nx);
        let theta = nx.hypot(ny).min(1.0) * self.settings.max_tilt_degrees.to_radians();
        let r = self.settings.light_radius;
        self.light_pos = Vec3::new(
            theta.sin() * phi.cos() * r,
            theta.sin() * phi.sin() * r,
            theta.cos() * r,
        );
    }

    pub fn light_position(&self) -> Vec3 {
        self.light_pos
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }
}

impl<G: Gl + 'static> SceneLogic<G> for ModelScene<G> {
    type Resources = ModelResources<G>;

    fn setup(&mut self, ctx: Rc<RenderContext<G>>) -> LocalBoxFuture<'static, anyhow::Result<Self::Resources>> {
        let gl = ctx.gl();
        gl.enable(Capability::DepthTest);
        gl.enable(Capability::CullFace);
        gl.cull_face(Face::Back);

        self.rotation = Vec3::ZERO;
        self.transform = Mat4::IDENTITY;
        self.camera
            .set_position(Vec3::new(0.0, 0.0, self.settings.camera_distance));
        self.camera.look_at(Vec3::ZERO);

        let loader = Rc::clone(&self.loader);
        let url = self.url.clone();
        Box::pin(async move {
            let model = loader
                .load(Rc::clone(&ctx), &url)
                .await
                .with_context(|| format!("failed to load model {url}"))?;

            let stages = [
                ShaderSource::vertex(PBR_VERT_GLSL),
                ShaderSource::fragment(PBR_FRAG_GLSL),
            ];
            let program = match Program::new(&ctx, &stages) {
                Ok(program) => program,
                Err(err) => {
                    model.dispose(&ctx);
                    return Err(err).context("failed to build PBR program");
                }
            };
            tracing::debug!(url = %url, parts = model.parts().len(), "model scene ready");
            Ok::<_, anyhow::Error>(ModelResources { model, program })
        })
    }

    fn update(&mut self, _res: &mut Self::Resources, dt_ms: f32) {
        self.rotation.y += self.settings.spin_rate * dt_ms;
        self.transform = Mat4::from_trs(Vec3::ZERO, self.rotation, Vec3::new(1.0, 1.0, 1.0));
    }

    fn resize(&mut self, _ctx: &RenderContext<G>, _res: &mut Self::Resources, width: u32, height: u32) {
        self.camera.resize(width, height);
    }

    fn render(&mut self, ctx: &RenderContext<G>, res: &mut Self::Resources, frame: FrameInfo) -> anyhow::Result<()> {
        let gl = ctx.gl();
        gl.viewport(0, 0, frame.width as i32, frame.height as i32);
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        gl.clear(ClearMask::COLOR_DEPTH);

        self.camera.resize(frame.width, frame.height);
        self.camera.update((frame.time_ms / 1000.0) as f32, None);

        let settings = &self.settings;
        res.program.bind(
            ctx,
            &[
                Binding::new("u_view", *self.camera.view()),
                Binding::new("u_proj", *self.camera.projection()),
                Binding::new("u_viewPos", self.camera.position()),
                Binding::new("u_lightPos", self.light_pos),
                Binding::new("u_lightClr", settings.light_color),
                Binding::new("u_lightIntensity", settings.light_intensity),
                Binding::new("u_ambience", settings.ambience),
                Binding::new("u_halfLambertPow", settings.half_lambert_pow),
            ],
        )?;

        let program = &res.program;
        let scene_world = self.transform;
        res.model.draw(ctx, program, |node_world| {
            let world = scene_world * *node_world;
            program.bind(ctx, &[Binding::new("u_world", world)]).map(|_| ())
        })?;
        Ok(())
    }

    fn teardown(&mut self, ctx: &RenderContext<G>, res: Self::Resources) {
        res.model.dispose(ctx);
        res.program.destroy(ctx);
    }
}
