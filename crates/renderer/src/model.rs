use std::rc::Rc;

use crate::context::RenderContext;
use crate::gl::Gl;
use crate::material::{MaterialError, PbrMaterial};
use crate::math::Mat4;
use crate::mesh::{interleave, Mesh, MeshError};
use crate::shader::{Program, ShaderError};
use crate::LocalBoxFuture;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model contains no meshes")]
    Empty,
    #[error("failed to upload part {index}: {source}")]
    Part {
        index: usize,
        #[source]
        source: MeshError,
    },
}

/// CPU-side geometry for one part, as produced by an asset decoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 4]>>,
    pub indices: Option<Vec<u32>>,
}

pub struct PartData<G: Gl> {
    pub mesh: MeshData,
    /// Local-to-model transform, already baked through the node hierarchy.
    pub transform: Mat4,
    pub material: PbrMaterial<G>,
}

pub struct ModelPart<G: Gl> {
    pub mesh: Mesh<G>,
    pub transform: Mat4,
    pub material: PbrMaterial<G>,
}

/// Drawable parts sharing one context. Owns its meshes; material textures
/// stay with whoever loaded them.
pub struct Model<G: Gl> {
    parts: Vec<ModelPart<G>>,
}

/// The external asset collaborator: resolves `url` into GPU-resident parts.
pub trait ModelLoader<G: Gl> {
    fn load(&self, ctx: Rc<RenderContext<G>>, url: &str) -> LocalBoxFuture<'static, anyhow::Result<Model<G>>>;
}

impl<G: Gl> Model<G> {
    pub fn new(parts: Vec<ModelPart<G>>) -> Self {
        Self { parts }
    }

    /// Uploads every part. On failure the meshes created so far are
    /// released before the error is returned.
    pub fn upload(ctx: &RenderContext<G>, parts: Vec<PartData<G>>) -> Result<Self, ModelError> {
        if parts.is_empty() {
            return Err(ModelError::Empty);
        }
        let mut uploaded: Vec<ModelPart<G>> = Vec::with_capacity(parts.len());
        for (index, part) in parts.into_iter().enumerate() {
            let data = &part.mesh;
            let (vertices, layout) = interleave(
                &data.positions,
                data.normals.as_deref(),
                data.uvs.as_deref(),
                data.tangents.as_deref(),
            );
            let mesh = match &data.indices {
                Some(indices) => Mesh::from_indexed(ctx, &vertices, &layout, indices),
                None => Mesh::from_vertices(ctx, &vertices, &layout),
            };
            match mesh {
                Ok(mesh) => uploaded.push(ModelPart {
                    mesh,
                    transform: part.transform,
                    material: part.material,
                }),
                Err(source) => {
                    uploaded.iter().for_each(|p| p.mesh.dispose(ctx));
                    return Err(ModelError::Part { index, source });
                }
            }
        }
        tracing::debug!(parts = uploaded.len(), "uploaded model");
        Ok(Self { parts: uploaded })
    }

    pub fn parts(&self) -> &[ModelPart<G>] {
        &self.parts
    }

    /// Binds each part's material, hands its transform to `set_world`, and
    /// draws it.
    pub fn draw<F>(&self, ctx: &RenderContext<G>, program: &Program<G>, mut set_world: F) -> Result<(), MaterialError>
    where
        F: FnMut(&Mat4) -> Result<(), ShaderError>,
    {
        for part in &self.parts {
            part.material.bind(ctx, program)?;
            set_world(&part.transform)?;
            part.mesh.draw(ctx);
        }
        Ok(())
    }

    pub fn dispose(&self, ctx: &RenderContext<G>) {
        for part in &self.parts {
            part.mesh.dispose(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::recording::{GlCall, RecordingGl};
    use crate::gl::ResourceKind;
    use crate::math::Vec3;
    use crate::shader::{Binding, ShaderSource};

    const VS: &str = "#version 300 es
uniform mat4 u_world;
in vec3 a_pos;
void main() { gl_Position = u_world * vec4(a_pos, 1.0); }
";

    const FS: &str = "#version 300 es
precision highp float;
uniform vec4 u_baseColorFactor;
out vec4 outColor;
void main() { outColor = u_baseColorFactor; }
";

    fn triangle(indexed: bool) -> MeshData {
        MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: Some(vec![[0.0, 0.0, 1.0]; 3]),
            indices: indexed.then(|| vec![0, 1, 2]),
            ..MeshData::default()
        }
    }

    fn part(mesh: MeshData, x: f32) -> PartData<RecordingGl> {
        PartData {
            mesh,
            transform: Mat4::translation(Vec3::new(x, 0.0, 0.0)),
            material: PbrMaterial::default(),
        }
    }

    #[test]
    fn draws_each_part_with_its_transform() {
        let ctx = RenderContext::new(RecordingGl::new());
        let program = Program::new(&ctx, &[ShaderSource::vertex(VS), ShaderSource::fragment(FS)]).unwrap();
        let model = Model::upload(&ctx, vec![part(triangle(true), 1.0), part(triangle(false), 2.0)]).unwrap();

        let mut seen = Vec::new();
        model
            .draw(&ctx, &program, |world| {
                seen.push(world.get(0, 3));
                program.bind(&ctx, &[Binding::new("u_world", *world)]).map(|_| ())
            })
            .unwrap();

        assert_eq!(seen, [1.0, 2.0]);
        assert_eq!(ctx.gl().draw_count(), 2);
        assert_eq!(ctx.gl().last_f32("u_world").map(|m| m[12]), Some(2.0));
    }

    #[test]
    fn dispose_releases_meshes_but_not_textures() {
        let ctx = RenderContext::new(RecordingGl::new());
        let program = Program::new(&ctx, &[ShaderSource::vertex(VS), ShaderSource::fragment(FS)]).unwrap();
        let model = Model::upload(&ctx, vec![part(triangle(true), 0.0)]).unwrap();
        model.draw(&ctx, &program, |_| Ok(())).unwrap();

        model.dispose(&ctx);
        assert_eq!(ctx.gl().live(ResourceKind::Buffer), 0);
        assert_eq!(ctx.gl().live(ResourceKind::VertexArray), 0);
        assert_eq!(ctx.gl().live(ResourceKind::Texture), 3);
    }

    #[test]
    fn empty_model_is_rejected() {
        let ctx = RenderContext::new(RecordingGl::new());
        assert!(matches!(Model::upload(&ctx, Vec::new()), Err(ModelError::Empty)));
    }

    #[test]
    fn failed_part_releases_earlier_parts() {
        let ctx = RenderContext::new(RecordingGl::new());
        let bad = MeshData::default();
        let err = Model::upload(&ctx, vec![part(triangle(false), 0.0), part(bad, 1.0)]).err();
        assert!(matches!(err, Some(ModelError::Part { index: 1, .. })));
        assert_eq!(ctx.gl().live(ResourceKind::Buffer), 0);
        assert!(!ctx.gl().calls().iter().any(GlCall::is_draw));
    }
}
