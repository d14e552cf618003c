//! Typed uniform values and the per-uniform setters built at link time.

use std::borrow::Cow;

use crate::gl::{Gl, UniformKind};
use crate::math::{Mat4, Vec2, Vec3, Vec4};

/// A value supplied for one uniform. `T` is the backend's texture handle.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingValue<'a, T> {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    Bool(bool),
    BVec2([bool; 2]),
    BVec3([bool; 3]),
    BVec4([bool; 4]),
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4(Mat4),
    /// Raw floats for any float, vector or matrix uniform, including arrays.
    Floats(Cow<'a, [f32]>),
    /// Raw ints for any int or bool uniform, including arrays.
    Ints(Cow<'a, [i32]>),
    /// Binds `texture` to `unit` and points the sampler at that unit.
    Sampler2D { texture: Option<T>, unit: u32 },
}

impl<T> BindingValue<'_, T> {
    pub fn describe(&self) -> &'static str {
        match self {
            BindingValue::Float(_) => "float",
            BindingValue::Vec2(_) => "vec2",
            BindingValue::Vec3(_) => "vec3",
            BindingValue::Vec4(_) => "vec4",
            BindingValue::Int(_) => "int",
            BindingValue::IVec2(_) => "ivec2",
            BindingValue::IVec3(_) => "ivec3",
            BindingValue::IVec4(_) => "ivec4",
            BindingValue::Bool(_) => "bool",
            BindingValue::BVec2(_) => "bvec2",
            BindingValue::BVec3(_) => "bvec3",
            BindingValue::BVec4(_) => "bvec4",
            BindingValue::Mat2(_) => "mat2",
            BindingValue::Mat3(_) => "mat3",
            BindingValue::Mat4(_) => "mat4",
            BindingValue::Floats(_) => "float[]",
            BindingValue::Ints(_) => "int[]",
            BindingValue::Sampler2D { .. } => "sampler2D",
        }
    }
}

impl<T> From<f32> for BindingValue<'_, T> {
    fn from(value: f32) -> Self {
        BindingValue::Float(value)
    }
}

impl<T> From<[f32; 2]> for BindingValue<'_, T> {
    fn from(value: [f32; 2]) -> Self {
        BindingValue::Vec2(value)
    }
}

impl<T> From<[f32; 3]> for BindingValue<'_, T> {
    fn from(value: [f32; 3]) -> Self {
        BindingValue::Vec3(value)
    }
}

impl<T> From<[f32; 4]> for BindingValue<'_, T> {
    fn from(value: [f32; 4]) -> Self {
        BindingValue::Vec4(value)
    }
}

impl<T> From<Vec2> for BindingValue<'_, T> {
    fn from(value: Vec2) -> Self {
        BindingValue::Vec2(value.to_array())
    }
}

impl<T> From<Vec3> for BindingValue<'_, T> {
    fn from(value: Vec3) -> Self {
        BindingValue::Vec3(value.to_array())
    }
}

impl<T> From<Vec4> for BindingValue<'_, T> {
    fn from(value: Vec4) -> Self {
        BindingValue::Vec4(value.to_array())
    }
}

impl<T> From<i32> for BindingValue<'_, T> {
    fn from(value: i32) -> Self {
        BindingValue::Int(value)
    }
}

impl<T> From<bool> for BindingValue<'_, T> {
    fn from(value: bool) -> Self {
        BindingValue::Bool(value)
    }
}

impl<T> From<Mat4> for BindingValue<'_, T> {
    fn from(value: Mat4) -> Self {
        BindingValue::Mat4(value)
    }
}

impl<'a, T> From<&'a [f32]> for BindingValue<'a, T> {
    fn from(value: &'a [f32]) -> Self {
        BindingValue::Floats(Cow::Borrowed(value))
    }
}

impl<'a, T> From<&'a [i32]> for BindingValue<'a, T> {
    fn from(value: &'a [i32]) -> Self {
        BindingValue::Ints(Cow::Borrowed(value))
    }
}

/// A named uniform assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding<'a, T> {
    pub name: Cow<'a, str>,
    pub value: BindingValue<'a, T>,
}

impl<'a, T> Binding<'a, T> {
    pub fn new(name: impl Into<Cow<'a, str>>, value: impl Into<BindingValue<'a, T>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn sampler(name: impl Into<Cow<'a, str>>, texture: Option<T>, unit: u32) -> Self {
        Self {
            name: name.into(),
            value: BindingValue::Sampler2D { texture, unit },
        }
    }
}

/// Reflected uniform: where it lives and what it accepts.
#[derive(Debug, Clone)]
pub(crate) struct UniformSetter<L> {
    pub location: L,
    pub kind: UniformKind,
    /// Array length, 1 for plain uniforms.
    pub count: usize,
}

fn is_float_kind(kind: UniformKind) -> bool {
    matches!(
        kind,
        UniformKind::Float
            | UniformKind::FloatVec2
            | UniformKind::FloatVec3
            | UniformKind::FloatVec4
            | UniformKind::FloatMat2
            | UniformKind::FloatMat3
            | UniformKind::FloatMat4
    )
}

fn is_int_kind(kind: UniformKind) -> bool {
    matches!(
        kind,
        UniformKind::Int
            | UniformKind::IntVec2
            | UniformKind::IntVec3
            | UniformKind::IntVec4
            | UniformKind::Bool
            | UniformKind::BoolVec2
            | UniformKind::BoolVec3
            | UniformKind::BoolVec4
    )
}

fn fits(len: usize, kind: UniformKind, count: usize) -> bool {
    let per = kind.components();
    per > 0 && len > 0 && len % per == 0 && len <= per * count
}

fn bools<const N: usize>(values: [bool; N]) -> [i32; N] {
    values.map(i32::from)
}

impl<L> UniformSetter<L> {
    pub fn accepts<T>(&self, value: &BindingValue<'_, T>) -> bool {
        use UniformKind as K;
        match value {
            BindingValue::Float(_) => self.kind == K::Float,
            BindingValue::Vec2(_) => self.kind == K::FloatVec2,
            BindingValue::Vec3(_) => self.kind == K::FloatVec3,
            BindingValue::Vec4(_) => self.kind == K::FloatVec4,
            BindingValue::Int(_) => matches!(self.kind, K::Int | K::Bool),
            BindingValue::IVec2(_) => matches!(self.kind, K::IntVec2 | K::BoolVec2),
            BindingValue::IVec3(_) => matches!(self.kind, K::IntVec3 | K::BoolVec3),
            BindingValue::IVec4(_) => matches!(self.kind, K::IntVec4 | K::BoolVec4),
            BindingValue::Bool(_) => self.kind == K::Bool,
            BindingValue::BVec2(_) => self.kind == K::BoolVec2,
            BindingValue::BVec3(_) => self.kind == K::BoolVec3,
            BindingValue::BVec4(_) => self.kind == K::BoolVec4,
            BindingValue::Mat2(_) => self.kind == K::FloatMat2,
            BindingValue::Mat3(_) => self.kind == K::FloatMat3,
            BindingValue::Mat4(_) => self.kind == K::FloatMat4,
            BindingValue::Floats(values) => {
                is_float_kind(self.kind) && fits(values.len(), self.kind, self.count)
            }
            BindingValue::Ints(values) => {
                is_int_kind(self.kind) && fits(values.len(), self.kind, self.count)
            }
            BindingValue::Sampler2D { .. } => self.kind == K::Sampler2D,
        }
    }
}

impl<L: Clone> UniformSetter<L> {
    /// Uploads `value`; the caller has checked [`accepts`](Self::accepts)
    /// and made the owning program current.
    pub fn apply<G>(&self, gl: &G, value: &BindingValue<'_, G::Texture>)
    where
        G: Gl<UniformLocation = L>,
    {
        let loc = &self.location;
        match value {
            BindingValue::Float(v) => gl.uniform_f32_slice(loc, 1, &[*v]),
            BindingValue::Vec2(v) => gl.uniform_f32_slice(loc, 2, v),
            BindingValue::Vec3(v) => gl.uniform_f32_slice(loc, 3, v),
            BindingValue::Vec4(v) => gl.uniform_f32_slice(loc, 4, v),
            BindingValue::Int(v) => gl.uniform_i32_slice(loc, 1, &[*v]),
            BindingValue::IVec2(v) => gl.uniform_i32_slice(loc, 2, v),
            BindingValue::IVec3(v) => gl.uniform_i32_slice(loc, 3, v),
            BindingValue::IVec4(v) => gl.uniform_i32_slice(loc, 4, v),
            BindingValue::Bool(v) => gl.uniform_i32_slice(loc, 1, &[i32::from(*v)]),
            BindingValue::BVec2(v) => gl.uniform_i32_slice(loc, 2, &bools(*v)),
            BindingValue::BVec3(v) => gl.uniform_i32_slice(loc, 3, &bools(*v)),
            BindingValue::BVec4(v) => gl.uniform_i32_slice(loc, 4, &bools(*v)),
            BindingValue::Mat2(m) => gl.uniform_matrix_f32_slice(loc, 2, m),
            BindingValue::Mat3(m) => gl.uniform_matrix_f32_slice(loc, 3, m),
            BindingValue::Mat4(m) => gl.uniform_matrix_f32_slice(loc, 4, m.as_slice()),
            BindingValue::Floats(values) => match self.kind {
                UniformKind::FloatMat2 => gl.uniform_matrix_f32_slice(loc, 2, values),
                UniformKind::FloatMat3 => gl.uniform_matrix_f32_slice(loc, 3, values),
                UniformKind::FloatMat4 => gl.uniform_matrix_f32_slice(loc, 4, values),
                kind => gl.uniform_f32_slice(loc, kind.components(), values),
            },
            BindingValue::Ints(values) => {
                gl.uniform_i32_slice(loc, self.kind.components(), values)
            }
            BindingValue::Sampler2D { texture, unit } => {
                gl.active_texture(*unit);
                gl.bind_texture_2d(*texture);
                gl.uniform_i32_slice(loc, 1, &[*unit as i32]);
            }
        }
    }
}
