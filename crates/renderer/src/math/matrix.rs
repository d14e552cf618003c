use std::ops::Mul;

use bytemuck::{Pod, Zeroable};

use super::Vec3;

/// Determinants at or below this magnitude are treated as singular.
const SINGULAR_EPSILON: f32 = 1e-12;

/// Column-major 4×4 matrix.
///
/// Element `(row, col)` lives at `data[col * 4 + row]`, which is the layout
/// `glUniformMatrix4fv` expects with `transpose = false`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    pub data: [f32; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        data: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub const ZERO: Self = Self { data: [0.0; 16] };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn from_cols_array(data: [f32; 16]) -> Self {
        Self { data }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[col * 4 + row]
    }

    /// `a * b`: the result applies `b` first, then `a`.
    pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = (0..4).map(|k| a.get(row, k) * b.get(k, col)).sum();
            }
        }
        Mat4 { data: out }
    }

    pub fn translation(t: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.data[12] = t.x;
        m.data[13] = t.y;
        m.data[14] = t.z;
        m
    }

    pub fn scaling(s: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.data[0] = s.x;
        m.data[5] = s.y;
        m.data[10] = s.z;
        m
    }

    pub fn rotation_x(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        let mut m = Self::IDENTITY;
        m.data[5] = c;
        m.data[6] = s;
        m.data[9] = -s;
        m.data[10] = c;
        m
    }

    pub fn rotation_y(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        let mut m = Self::IDENTITY;
        m.data[0] = c;
        m.data[2] = -s;
        m.data[8] = s;
        m.data[10] = c;
        m
    }

    pub fn rotation_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        let mut m = Self::IDENTITY;
        m.data[0] = c;
        m.data[1] = s;
        m.data[4] = -s;
        m.data[5] = c;
        m
    }

    /// Translate · Rz · Ry · Rx · Scale, with `rotation` given as Euler angles in radians.
    pub fn from_trs(translate: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        let rotate = Self::rotation_z(rotation.z) * Self::rotation_y(rotation.y) * Self::rotation_x(rotation.x);
        Self::translation(translate) * rotate * Self::scaling(scale)
    }

    /// Right-handed perspective projection into GL clip space (z in `[-w, w]`).
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y * 0.5).tan();
        let nf = 1.0 / (near - far);
        let mut m = Self::ZERO;
        m.data[0] = f / aspect;
        m.data[5] = f;
        m.data[10] = (far + near) * nf;
        m.data[11] = -1.0;
        m.data[14] = 2.0 * far * near * nf;
        m
    }

    /// View matrix for an eye at `eye` looking towards `target`.
    ///
    /// Degenerate inputs (eye on target, `up` parallel to the view direction)
    /// fall back to unit lengths instead of producing NaN.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let z = (eye - target).normalize();
        let x = Vec3::cross(up, z).normalize();
        let y = Vec3::cross(z, x);

        Self {
            data: [
                x.x,
                y.x,
                z.x,
                0.0,
                x.y,
                y.y,
                z.y,
                0.0,
                x.z,
                y.z,
                z.z,
                0.0,
                -Vec3::dot(x, eye),
                -Vec3::dot(y, eye),
                -Vec3::dot(z, eye),
                1.0,
            ],
        }
    }

    pub fn transpose(&self) -> Self {
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[row * 4 + col] = self.data[col * 4 + row];
            }
        }
        Self { data: out }
    }

    pub fn determinant(&self) -> f32 {
        Cofactors::of(self).determinant()
    }

    /// Inverse of `self`, or `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Self> {
        let c = Cofactors::of(self);
        let det = c.determinant();
        if !det.is_finite() || det.abs() <= SINGULAR_EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        let m = &self.data;
        let (a00, a01, a02, a03) = (m[0], m[1], m[2], m[3]);
        let (a10, a11, a12, a13) = (m[4], m[5], m[6], m[7]);
        let (a20, a21, a22, a23) = (m[8], m[9], m[10], m[11]);
        let (a30, a31, a32, a33) = (m[12], m[13], m[14], m[15]);
        let b = &c.0;

        Some(Self {
            data: [
                (a11 * b[11] - a12 * b[10] + a13 * b[9]) * inv,
                (-a01 * b[11] + a02 * b[10] - a03 * b[9]) * inv,
                (a31 * b[5] - a32 * b[4] + a33 * b[3]) * inv,
                (-a21 * b[5] + a22 * b[4] - a23 * b[3]) * inv,
                (-a10 * b[11] + a12 * b[8] - a13 * b[7]) * inv,
                (a00 * b[11] - a02 * b[8] + a03 * b[7]) * inv,
                (-a30 * b[5] + a32 * b[2] - a33 * b[1]) * inv,
                (a20 * b[5] - a22 * b[2] + a23 * b[1]) * inv,
                (a10 * b[10] - a11 * b[8] + a13 * b[6]) * inv,
                (-a00 * b[10] + a01 * b[8] - a03 * b[6]) * inv,
                (a30 * b[4] - a31 * b[2] + a33 * b[0]) * inv,
                (-a20 * b[4] + a21 * b[2] - a23 * b[0]) * inv,
                (-a10 * b[9] + a11 * b[7] - a12 * b[6]) * inv,
                (a00 * b[9] - a01 * b[7] + a02 * b[6]) * inv,
                (-a30 * b[3] + a31 * b[1] - a32 * b[0]) * inv,
                (a20 * b[3] - a21 * b[1] + a22 * b[0]) * inv,
            ],
        })
    }

    /// Applies the full transform to a point (w = 1) and returns the homogeneous result.
    pub fn transform_point(&self, p: Vec3) -> [f32; 4] {
        let v = [p.x, p.y, p.z, 1.0];
        let mut out = [0.0f32; 4];
        for (row, slot) in out.iter_mut().enumerate() {
            *slot = (0..4).map(|k| self.get(row, k) * v[k]).sum();
        }
        out
    }
}

/// The twelve 2×2 sub-determinants shared by `determinant` and `invert`.
struct Cofactors([f32; 12]);

impl Cofactors {
    fn of(m: &Mat4) -> Self {
        let m = &m.data;
        let (a00, a01, a02, a03) = (m[0], m[1], m[2], m[3]);
        let (a10, a11, a12, a13) = (m[4], m[5], m[6], m[7]);
        let (a20, a21, a22, a23) = (m[8], m[9], m[10], m[11]);
        let (a30, a31, a32, a33) = (m[12], m[13], m[14], m[15]);
        Self([
            a00 * a11 - a01 * a10,
            a00 * a12 - a02 * a10,
            a00 * a13 - a03 * a10,
            a01 * a12 - a02 * a11,
            a01 * a13 - a03 * a11,
            a02 * a13 - a03 * a12,
            a20 * a31 - a21 * a30,
            a20 * a32 - a22 * a30,
            a20 * a33 - a23 * a30,
            a21 * a32 - a22 * a31,
            a21 * a33 - a23 * a31,
            a22 * a33 - a23 * a32,
        ])
    }

    fn determinant(&self) -> f32 {
        let b = &self.0;
        b[0] * b[11] - b[1] * b[10] + b[2] * b[9] + b[3] * b[8] - b[4] * b[7] + b[5] * b[6]
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        Mat4::multiply(&self, &rhs)
    }
}
