use std::cell::Cell;

use crate::context::RenderContext;
use crate::gl::{BufferTarget, Gl, GlError, IndexType};

const FLOAT_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error(transparent)]
    Gl(#[from] GlError),
    #[error("invalid vertex layout: {0}")]
    InvalidLayout(String),
    #[error("mesh has no vertices")]
    EmptyVertices,
}

/// One float attribute inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: i32,
    pub offset: usize,
}

/// Attribute list plus the byte stride of one vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub attributes: Vec<VertexAttribute>,
    pub stride: usize,
}

impl VertexLayout {
    pub const POSITION: u32 = 0;
    pub const NORMAL: u32 = 1;
    pub const UV: u32 = 2;
    pub const TANGENT: u32 = 3;

    /// Position at slot 0, then each present optional stream in slot order,
    /// packed back to back.
    pub fn standard(normal: bool, uv: bool, tangent: bool) -> Self {
        let mut layout = Self {
            attributes: Vec::with_capacity(4),
            stride: 0,
        };
        layout.push(Self::POSITION, 3);
        if normal {
            layout.push(Self::NORMAL, 3);
        }
        if uv {
            layout.push(Self::UV, 2);
        }
        if tangent {
            layout.push(Self::TANGENT, 4);
        }
        layout
    }

    /// Appends an attribute at the current end of the vertex.
    pub fn push(&mut self, location: u32, components: i32) -> &mut Self {
        self.attributes.push(VertexAttribute {
            location,
            components,
            offset: self.stride,
        });
        self.stride += components.max(0) as usize * FLOAT_BYTES;
        self
    }

    fn validate(&self) -> Result<(), MeshError> {
        if self.stride == 0 || self.stride % FLOAT_BYTES != 0 {
            return Err(MeshError::InvalidLayout(format!(
                "stride {} is not a positive multiple of {FLOAT_BYTES}",
                self.stride
            )));
        }
        for attr in &self.attributes {
            if !(1..=4).contains(&attr.components) {
                return Err(MeshError::InvalidLayout(format!(
                    "attribute {} has {} components",
                    attr.location, attr.components
                )));
            }
            let end = attr.offset + attr.components as usize * FLOAT_BYTES;
            if end > self.stride {
                return Err(MeshError::InvalidLayout(format!(
                    "attribute {} ends at byte {end}, past stride {}",
                    attr.location, self.stride
                )));
            }
        }
        Ok(())
    }
}

/// Packs separate attribute streams into one interleaved buffer matching
/// [`VertexLayout::standard`]. Vertex count follows `positions`; optional
/// streams shorter than that are zero-filled.
pub fn interleave(
    positions: &[[f32; 3]],
    normals: Option<&[[f32; 3]]>,
    uvs: Option<&[[f32; 2]]>,
    tangents: Option<&[[f32; 4]]>,
) -> (Vec<f32>, VertexLayout) {
    let layout = VertexLayout::standard(normals.is_some(), uvs.is_some(), tangents.is_some());
    let floats_per_vertex = layout.stride / FLOAT_BYTES;
    let mut out = Vec::with_capacity(positions.len() * floats_per_vertex);

    for (i, position) in positions.iter().enumerate() {
        out.extend_from_slice(position);
        if let Some(normals) = normals {
            out.extend_from_slice(&normals.get(i).copied().unwrap_or_default());
        }
        if let Some(uvs) = uvs {
            out.extend_from_slice(&uvs.get(i).copied().unwrap_or_default());
        }
        if let Some(tangents) = tangents {
            out.extend_from_slice(&tangents.get(i).copied().unwrap_or_default());
        }
    }
    (out, layout)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrawMode {
    Arrays,
    Elements(IndexType),
}

/// Vertex array, vertex buffer and optional index buffer for one triangle
/// list.
pub struct Mesh<G: Gl> {
    vao: Cell<Option<G::VertexArray>>,
    vbo: Cell<Option<G::Buffer>>,
    ebo: Cell<Option<G::Buffer>>,
    count: i32,
    mode: DrawMode,
}

impl<G: Gl> Mesh<G> {
    pub fn from_vertices(
        ctx: &RenderContext<G>,
        vertices: &[f32],
        layout: &VertexLayout,
    ) -> Result<Self, MeshError> {
        layout.validate()?;
        if vertices.is_empty() {
            return Err(MeshError::EmptyVertices);
        }
        let count = (vertices.len() * FLOAT_BYTES / layout.stride) as i32;
        let (vao, vbo, ebo) = upload(ctx.gl(), vertices, layout, None)?;
        Ok(Self {
            vao: Cell::new(Some(vao)),
            vbo: Cell::new(Some(vbo)),
            ebo: Cell::new(ebo),
            count,
            mode: DrawMode::Arrays,
        })
    }

    /// Indices are narrowed to 16 bits unless one of them exceeds 65535.
    pub fn from_indexed(
        ctx: &RenderContext<G>,
        vertices: &[f32],
        layout: &VertexLayout,
        indices: &[u32],
    ) -> Result<Self, MeshError> {
        layout.validate()?;
        if vertices.is_empty() || indices.is_empty() {
            return Err(MeshError::EmptyVertices);
        }
        let index_type = if indices.iter().any(|&i| i > u32::from(u16::MAX)) {
            IndexType::U32
        } else {
            IndexType::U16
        };
        let index_bytes: Vec<u8> = match index_type {
            IndexType::U16 => indices
                .iter()
                .flat_map(|&i| (i as u16).to_ne_bytes())
                .collect(),
            IndexType::U32 => bytemuck::cast_slice::<u32, u8>(indices).to_vec(),
        };

        let (vao, vbo, ebo) = upload(ctx.gl(), vertices, layout, Some(&index_bytes))?;
        Ok(Self {
            vao: Cell::new(Some(vao)),
            vbo: Cell::new(Some(vbo)),
            ebo: Cell::new(ebo),
            count: indices.len() as i32,
            mode: DrawMode::Elements(index_type),
        })
    }

    /// Vertices for array draws, indices for indexed draws.
    pub fn count(&self) -> i32 {
        self.count
    }

    pub fn index_type(&self) -> Option<IndexType> {
        match self.mode {
            DrawMode::Arrays => None,
            DrawMode::Elements(index_type) => Some(index_type),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.vao.get().is_none()
    }

    pub fn draw(&self, ctx: &RenderContext<G>) {
        let Some(vao) = self.vao.get() else {
            tracing::warn!("draw called on disposed mesh");
            return;
        };
        let gl = ctx.gl();
        gl.bind_vertex_array(Some(vao));
        match self.mode {
            DrawMode::Arrays => gl.draw_arrays(0, self.count),
            DrawMode::Elements(index_type) => gl.draw_elements(self.count, index_type, 0),
        }
        gl.bind_vertex_array(None);
    }

    pub fn dispose(&self, ctx: &RenderContext<G>) {
        let gl = ctx.gl();
        if let Some(ebo) = self.ebo.take() {
            gl.delete_buffer(ebo);
        }
        if let Some(vbo) = self.vbo.take() {
            gl.delete_buffer(vbo);
        }
        if let Some(vao) = self.vao.take() {
            gl.delete_vertex_array(vao);
        }
    }
}

type Handles<G> = (
    <G as Gl>::VertexArray,
    <G as Gl>::Buffer,
    Option<<G as Gl>::Buffer>,
);

fn upload<G: Gl>(
    gl: &G,
    vertices: &[f32],
    layout: &VertexLayout,
    indices: Option<&[u8]>,
) -> Result<Handles<G>, MeshError> {
    let vao = gl.create_vertex_array()?;
    let vbo = match gl.create_buffer() {
        Ok(vbo) => vbo,
        Err(err) => {
            gl.delete_vertex_array(vao);
            return Err(err.into());
        }
    };
    let ebo = match indices.map(|_| gl.create_buffer()).transpose() {
        Ok(ebo) => ebo,
        Err(err) => {
            gl.delete_buffer(vbo);
            gl.delete_vertex_array(vao);
            return Err(err.into());
        }
    };

    gl.bind_vertex_array(Some(vao));
    gl.bind_buffer(BufferTarget::Array, Some(vbo));
    gl.buffer_data_static(BufferTarget::Array, bytemuck::cast_slice(vertices));
    if let (Some(ebo), Some(bytes)) = (ebo, indices) {
        gl.bind_buffer(BufferTarget::ElementArray, Some(ebo));
        gl.buffer_data_static(BufferTarget::ElementArray, bytes);
    }
    let stride = layout.stride as i32;
    for attr in &layout.attributes {
        gl.enable_vertex_attrib_array(attr.location);
        gl.vertex_attrib_pointer_f32(attr.location, attr.components, stride, attr.offset as i32);
    }
    gl.bind_vertex_array(None);
    gl.bind_buffer(BufferTarget::Array, None);

    Ok((vao, vbo, ebo))
}
