//! Canonical quaternion and offset types.
//!
//! Pose files spell a joint rotation either as `{"x":..,"y":..,"z":..,"w":..}`
//! or as `[x, y, z, w]` (and a root/IK offset as `{"x","y","z"}` or
//! `[x, y, z]`). Both spellings deserialize into the same value; the spelling
//! used when writing is chosen with [`BoneLayout`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// On-disk spelling of rotations and offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoneLayout {
    /// Named fields: `{"x":0,"y":0,"z":0,"w":1}`.
    #[default]
    Verbose,
    /// Ordered sequences: `[0, 0, 0, 1]`.
    Compact,
}

/// A joint rotation as a quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuatRepr")]
pub struct Quat {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
    /// W (scalar) component.
    pub w: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuatRepr {
    Object { x: f64, y: f64, z: f64, w: f64 },
    Sequence([f64; 4]),
}

impl From<QuatRepr> for Quat {
    fn from(repr: QuatRepr) -> Self {
        match repr {
            QuatRepr::Object { x, y, z, w } => Quat { x, y, z, w },
            QuatRepr::Sequence([x, y, z, w]) => Quat { x, y, z, w },
        }
    }
}

impl Quat {
    /// The rest rotation.
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Create a quaternion from components.
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Euclidean norm of the four components.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Whether the norm is within `tolerance` of one.
    pub fn is_unit(&self, tolerance: f64) -> bool {
        (self.norm() - 1.0).abs() <= tolerance
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    /// Components in `[x, y, z, w]` order.
    pub fn to_array(self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Apply `f` to every component.
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z), f(self.w))
    }

    /// Render in the requested layout.
    pub fn to_value(self, layout: BoneLayout) -> Value {
        match layout {
            BoneLayout::Verbose => json!({"x": self.x, "y": self.y, "z": self.z, "w": self.w}),
            BoneLayout::Compact => json!(self.to_array()),
        }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A root or IK bone offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec3Repr")]
pub struct Vec3 {
    /// X offset.
    pub x: f64,
    /// Y offset.
    pub y: f64,
    /// Z offset.
    pub z: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Vec3Repr {
    Object { x: f64, y: f64, z: f64 },
    Sequence([f64; 3]),
}

impl From<Vec3Repr> for Vec3 {
    fn from(repr: Vec3Repr) -> Self {
        match repr {
            Vec3Repr::Object { x, y, z } => Vec3 { x, y, z },
            Vec3Repr::Sequence([x, y, z]) => Vec3 { x, y, z },
        }
    }
}

impl Vec3 {
    /// The zero offset.
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create an offset from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Components in `[x, y, z]` order.
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Apply `f` to every component.
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z))
    }

    /// Render in the requested layout.
    pub fn to_value(self, layout: BoneLayout) -> Value {
        match layout {
            BoneLayout::Verbose => json!({"x": self.x, "y": self.y, "z": self.z}),
            BoneLayout::Compact => json!(self.to_array()),
        }
    }
}
