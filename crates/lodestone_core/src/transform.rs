//! # Transforms and Wire Quantization
//!
//! Live transforms are real-valued. The wire carries fixed-point values:
//!
//! ```text
//! position:  1 unit = 1/32 world unit     (i32)
//! angle:     1 unit = 360° / 256           (one byte, wraps)
//! ```
//!
//! Quantization is a pure function of the live value, so the encoder and the
//! receiver always agree on what a transform looks like on the wire.

/// Fixed-point scale for positions (units per world unit).
pub const POSITION_SCALE: f64 = 32.0;

/// Angle resolution: steps per full turn.
pub const ANGLE_STEPS: f32 = 256.0;

/// Quantizes a world coordinate to 1/32 units, rounding toward negative infinity.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn quantize_position(value: f64) -> i32 {
    // `as` saturates at the i32 bounds
    (value * POSITION_SCALE).floor() as i32
}

/// Quantizes an angle in degrees to a byte, wrapping every 360°.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn quantize_angle(degrees: f32) -> i8 {
    let steps = (degrees * ANGLE_STEPS / 360.0).floor() as i64;
    steps.rem_euclid(256) as u8 as i8
}

/// Converts a quantized position back to world units.
#[inline]
#[must_use]
pub fn dequantize_position(value: i32) -> f64 {
    f64::from(value) / POSITION_SCALE
}

/// Converts a quantized angle back to degrees in `[0, 360)`.
#[inline]
#[must_use]
pub fn dequantize_angle(value: i8) -> f32 {
    f32::from(value as u8) * 360.0 / ANGLE_STEPS
}

/// A point in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate (up).
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Vec3 {
    /// Creates a new vector.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Live transform of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    /// Position in world units.
    pub position: Vec3,
    /// Body yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
    /// Head yaw in degrees, independent of the body.
    pub head_yaw: f32,
}

impl Transform {
    /// Creates a transform whose head faces the same way as the body.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, yaw: f32, pitch: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            yaw,
            pitch,
            head_yaw: yaw,
        }
    }

    /// Returns a copy with a different head yaw.
    #[must_use]
    pub const fn with_head_yaw(mut self, head_yaw: f32) -> Self {
        self.head_yaw = head_yaw;
        self
    }

    /// Quantizes every component to its wire resolution.
    #[must_use]
    pub fn quantize(&self) -> QuantizedTransform {
        QuantizedTransform {
            x: quantize_position(self.position.x),
            y: quantize_position(self.position.y),
            z: quantize_position(self.position.z),
            yaw: quantize_angle(self.yaw),
            pitch: quantize_angle(self.pitch),
            head_yaw: quantize_angle(self.head_yaw),
        }
    }
}

/// A transform in wire units.
///
/// This is the only form a synchronizer remembers as "last sent": deltas are
/// always computed between two quantized values, never between floats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct QuantizedTransform {
    /// X in 1/32 units.
    pub x: i32,
    /// Y in 1/32 units.
    pub y: i32,
    /// Z in 1/32 units.
    pub z: i32,
    /// Body yaw in 1/256 turns.
    pub yaw: i8,
    /// Pitch in 1/256 turns.
    pub pitch: i8,
    /// Head yaw in 1/256 turns.
    pub head_yaw: i8,
}

impl QuantizedTransform {
    /// Per-axis position difference `self - base`, widened to avoid overflow.
    #[inline]
    #[must_use]
    pub fn position_delta(&self, base: &Self) -> [i64; 3] {
        [
            i64::from(self.x) - i64::from(base.x),
            i64::from(self.y) - i64::from(base.y),
            i64::from(self.z) - i64::from(base.z),
        ]
    }

    /// True if body yaw or pitch differ.
    #[inline]
    #[must_use]
    pub fn rotation_differs(&self, other: &Self) -> bool {
        self.yaw != other.yaw || self.pitch != other.pitch
    }

    /// Converts back to a live transform (lossy by at most one unit).
    #[must_use]
    pub fn to_transform(&self) -> Transform {
        Transform {
            position: Vec3::new(
                dequantize_position(self.x),
                dequantize_position(self.y),
                dequantize_position(self.z),
            ),
            yaw: dequantize_angle(self.yaw),
            pitch: dequantize_angle(self.pitch),
            head_yaw: dequantize_angle(self.head_yaw),
        }
    }
}
