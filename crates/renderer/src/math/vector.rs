use std::ops::{Add, Mul, Neg, Sub};

use bytemuck::{Pod, Zeroable};

/// Length used by `normalize` when the input has none, so the result stays finite.
fn safe_length(squared: f32) -> f32 {
    let length = squared.sqrt();
    if length > 0.0 {
        length
    } else {
        1.0
    }
}

macro_rules! impl_vector {
    ($name:ident, $len:literal, $($field:ident),+) => {
        impl $name {
            pub const ZERO: Self = Self { $($field: 0.0),+ };

            pub const fn new($($field: f32),+) -> Self {
                Self { $($field),+ }
            }

            pub fn add(a: Self, b: Self) -> Self {
                Self { $($field: a.$field + b.$field),+ }
            }

            pub fn sub(a: Self, b: Self) -> Self {
                Self { $($field: a.$field - b.$field),+ }
            }

            /// `a + b * scale`.
            pub fn scale_and_add(a: Self, b: Self, scale: f32) -> Self {
                Self { $($field: a.$field + b.$field * scale),+ }
            }

            pub fn dot(a: Self, b: Self) -> f32 {
                0.0 $(+ a.$field * b.$field)+
            }

            pub fn squared_length(self) -> f32 {
                Self::dot(self, self)
            }

            pub fn length(self) -> f32 {
                self.squared_length().sqrt()
            }

            /// Unit-length copy of `self`; the zero vector comes back unchanged.
            pub fn normalize(self) -> Self {
                let length = safe_length(self.squared_length());
                Self { $($field: self.$field / length),+ }
            }

            pub fn to_array(self) -> [f32; $len] {
                [$(self.$field),+]
            }
        }

        impl From<[f32; $len]> for $name {
            fn from(value: [f32; $len]) -> Self {
                let [$($field),+] = value;
                Self { $($field),+ }
            }
        }

        impl From<$name> for [f32; $len] {
            fn from(value: $name) -> Self {
                value.to_array()
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                $name::add(self, rhs)
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                $name::sub(self, rhs)
            }
        }

        impl Mul<f32> for $name {
            type Output = Self;

            fn mul(self, rhs: f32) -> Self {
                Self { $($field: self.$field * rhs),+ }
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self { $($field: -self.$field),+ }
            }
        }
    };
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl_vector!(Vec2, 2, x, y);
impl_vector!(Vec3, 3, x, y, z);
impl_vector!(Vec4, 4, x, y, z, w);

impl Vec3 {
    pub const UP: Self = Self::new(0.0, 1.0, 0.0);

    pub fn cross(a: Self, b: Self) -> Self {
        Self {
            x: a.y * b.z - a.z * b.y,
            y: a.z * b.x - a.x * b.z,
            z: a.x * b.y - a.y * b.x,
        }
    }
}
