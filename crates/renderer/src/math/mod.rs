//! Value types for vectors and 4×4 matrices.
//!
//! Everything here is pure and GPU-agnostic. Matrices are column-major so
//! [`Mat4::as_slice`] can be handed straight to a `uniform mat4` upload.

mod matrix;
mod vector;

pub use matrix::Mat4;
pub use vector::{Vec2, Vec3, Vec4};
