use std::rc::Rc;

use crate::context::{FallbackTextures, RenderContext};
use crate::gl::{BlendFactor, Capability, Gl};
use crate::shader::{BindReport, Binding, Program, ShaderError};
use crate::texture::{Texture2D, TextureError};

#[derive(Debug, thiserror::Error)]
pub enum MaterialError {
    #[error("failed to create fallback textures: {0}")]
    Fallbacks(#[from] TextureError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlphaMode {
    #[default]
    Opaque,
    /// Alpha-tested against `alpha_cutoff`.
    Mask,
    Blend,
}

impl AlphaMode {
    /// Encoding read by the fragment shader's `u_alphaMode`.
    pub fn as_uniform(self) -> i32 {
        match self {
            AlphaMode::Opaque => 0,
            AlphaMode::Mask => 1,
            AlphaMode::Blend => 2,
        }
    }
}

/// Texture unit assignments, fixed for every PBR program.
pub const BASE_COLOR_UNIT: u32 = 0;
pub const NORMAL_UNIT: u32 = 1;
pub const METALLIC_ROUGHNESS_UNIT: u32 = 2;
pub const OCCLUSION_UNIT: u32 = 3;
pub const EMISSIVE_UNIT: u32 = 4;

/// Metallic-roughness material.
///
/// Textures are shared with whoever loaded them; absent slots are filled
/// from the context's fallback set at bind time.
pub struct PbrMaterial<G: Gl> {
    pub base_color_texture: Option<Rc<Texture2D<G>>>,
    pub normal_texture: Option<Rc<Texture2D<G>>>,
    pub metallic_roughness_texture: Option<Rc<Texture2D<G>>>,
    pub occlusion_texture: Option<Rc<Texture2D<G>>>,
    pub emissive_texture: Option<Rc<Texture2D<G>>>,

    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: [f32; 3],
    pub normal_scale: f32,
    pub occlusion_strength: f32,

    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
}

impl<G: Gl> Default for PbrMaterial<G> {
    fn default() -> Self {
        Self {
            base_color_texture: None,
            normal_texture: None,
            metallic_roughness_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            emissive_factor: [0.0, 0.0, 0.0],
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
        }
    }
}

impl<G: Gl> Clone for PbrMaterial<G> {
    fn clone(&self) -> Self {
        Self {
            base_color_texture: self.base_color_texture.clone(),
            normal_texture: self.normal_texture.clone(),
            metallic_roughness_texture: self.metallic_roughness_texture.clone(),
            occlusion_texture: self.occlusion_texture.clone(),
            emissive_texture: self.emissive_texture.clone(),
            ..*self
        }
    }
}

fn slot<'t, G: Gl>(texture: &'t Option<Rc<Texture2D<G>>>, fallback: &'t Texture2D<G>) -> Option<G::Texture> {
    texture.as_deref().unwrap_or(fallback).handle()
}

impl<G: Gl> PbrMaterial<G> {
    /// The complete binding set for this material, with every texture slot
    /// resolved.
    pub fn bindings(&self, fallbacks: &FallbackTextures<G>) -> Vec<Binding<'static, G::Texture>> {
        vec![
            Binding::sampler(
                "u_baseColorTex",
                slot(&self.base_color_texture, &fallbacks.white),
                BASE_COLOR_UNIT,
            ),
            Binding::sampler("u_normalTex", slot(&self.normal_texture, &fallbacks.normal), NORMAL_UNIT),
            Binding::sampler(
                "u_metallicRoughnessTex",
                slot(&self.metallic_roughness_texture, &fallbacks.white),
                METALLIC_ROUGHNESS_UNIT,
            ),
            Binding::sampler(
                "u_occlusionTex",
                slot(&self.occlusion_texture, &fallbacks.white),
                OCCLUSION_UNIT,
            ),
            Binding::sampler(
                "u_emissiveTex",
                slot(&self.emissive_texture, &fallbacks.black),
                EMISSIVE_UNIT,
            ),
            Binding::new("u_baseColorFactor", self.base_color_factor),
            Binding::new("u_metallicFactor", self.metallic_factor),
            Binding::new("u_roughnessFactor", self.roughness_factor),
            Binding::new("u_emissiveFactor", self.emissive_factor),
            Binding::new("u_normalScale", self.normal_scale),
            Binding::new("u_occlusionStrength", self.occlusion_strength),
            Binding::new("u_alphaMode", self.alpha_mode.as_uniform()),
            Binding::new("u_alphaCutoff", self.alpha_cutoff),
        ]
    }

    /// Binds textures and factors in one program call, then sets the blend
    /// state for the alpha mode.
    pub fn bind(&self, ctx: &RenderContext<G>, program: &Program<G>) -> Result<BindReport, MaterialError> {
        let fallbacks = ctx.fallbacks()?;
        let report = program.bind(ctx, &self.bindings(&fallbacks))?;

        let gl = ctx.gl();
        if self.alpha_mode == AlphaMode::Blend {
            gl.enable(Capability::Blend);
            gl.blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        } else {
            gl.disable(Capability::Blend);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::recording::{GlCall, RecordingGl};
    use crate::gl::ResourceKind;
    use crate::shader::{BindingValue, ShaderSource};

    const VS: &str = "#version 300 es
in vec3 a_pos;
void main() { gl_Position = vec4(a_pos, 1.0); }
";

    const PBR_FS: &str = "#version 300 es
precision highp float;
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
out vec4 outColor;
void main() { outColor = u_baseColorFactor; }
";

    fn sampler_handles(bindings: &[Binding<'_, u32>]) -> Vec<(String, Option<u32>)> {
        bindings
            .iter()
            .filter_map(|b| match b.value {
                BindingValue::Sampler2D { texture, .. } => Some((b.name.to_string(), texture)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn untextured_material_resolves_every_slot_to_fallbacks() {
        let ctx = RenderContext::new(RecordingGl::new());
        let fallbacks = ctx.fallbacks().unwrap();
        let material = PbrMaterial::<RecordingGl>::default();

        let samplers = sampler_handles(&material.bindings(&fallbacks));
        let white = fallbacks.white.handle();
        assert_eq!(
            samplers,
            [
                ("u_baseColorTex".to_string(), white),
                ("u_normalTex".to_string(), fallbacks.normal.handle()),
                ("u_metallicRoughnessTex".to_string(), white),
                ("u_occlusionTex".to_string(), white),
                ("u_emissiveTex".to_string(), fallbacks.black.handle()),
            ]
        );
        assert!(samplers.iter().all(|(_, handle)| handle.is_some()));
    }

    #[test]
    fn binds_against_a_pbr_program_without_skips() {
        let ctx = RenderContext::new(RecordingGl::new());
        let program = Program::new(&ctx, &[ShaderSource::vertex(VS), ShaderSource::fragment(PBR_FS)]).unwrap();
        let material = PbrMaterial::<RecordingGl>::default();

        let report = material.bind(&ctx, &program).unwrap();
        assert_eq!(report.applied, 13);
        assert!(report.skipped.is_empty());
        assert_eq!(ctx.gl().last_i32("u_alphaMode"), Some(vec![0]));
        assert_eq!(ctx.gl().last_f32("u_alphaCutoff"), Some(vec![0.5]));
        assert!(ctx.gl().calls().contains(&GlCall::Disable(Capability::Blend)));

        // Fallbacks are shared by later binds.
        material.bind(&ctx, &program).unwrap();
        assert_eq!(ctx.gl().live(ResourceKind::Texture), 3);
    }

    #[test]
    fn assigned_texture_replaces_fallback() {
        let ctx = RenderContext::new(RecordingGl::new());
        let fallbacks = ctx.fallbacks().unwrap();
        let emissive = Rc::new(Texture2D::solid(&ctx, [255, 0, 0, 255]).unwrap());
        let material = PbrMaterial {
            emissive_texture: Some(Rc::clone(&emissive)),
            ..PbrMaterial::default()
        };
        let samplers = sampler_handles(&material.bindings(&fallbacks));
        assert_eq!(samplers[4].1, emissive.handle());
    }

    #[test]
    fn blend_mode_enables_source_alpha_blending() {
        let ctx = RenderContext::new(RecordingGl::new());
        let program = Program::new(&ctx, &[ShaderSource::vertex(VS), ShaderSource::fragment(PBR_FS)]).unwrap();
        let material = PbrMaterial::<RecordingGl> {
            alpha_mode: AlphaMode::Blend,
            ..PbrMaterial::default()
        };
        material.bind(&ctx, &program).unwrap();

        let calls = ctx.gl().calls();
        assert!(calls.contains(&GlCall::Enable(Capability::Blend)));
        assert!(calls.contains(&GlCall::BlendFunc(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)));
        assert_eq!(ctx.gl().last_i32("u_alphaMode"), Some(vec![2]));
    }
}
