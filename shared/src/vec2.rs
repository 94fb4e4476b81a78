/// 2D vector utilities for the playfield.
/// The field is centred on the origin: x grows toward team 1's goal, y is up.

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Lift into the 3-component form used on the wire (z is always 0).
    pub fn to_wire(self) -> [f32; 3] {
        [self.x, self.y, 0.0]
    }

    pub fn from_wire(pos: [f32; 3]) -> Self {
        Self::new(pos[0], pos[1])
    }
}

/// Shorthand constructor
pub fn vec2(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

/// Vector length
pub fn length(v: Vec2) -> f32 {
    (v.x * v.x + v.y * v.y).sqrt()
}

/// Normalize vector to unit length. Degenerate input falls back to +x.
pub fn normalize(v: Vec2) -> Vec2 {
    let len = length(v);
    if !len.is_finite() || len < 1e-6 {
        return Vec2::new(1.0, 0.0);
    }
    Vec2::new(v.x / len, v.y / len)
}

/// Scale vector by scalar
pub fn scale(v: Vec2, s: f32) -> Vec2 {
    Vec2::new(v.x * s, v.y * s)
}

/// Add two vectors
pub fn add(a: Vec2, b: Vec2) -> Vec2 {
    Vec2::new(a.x + b.x, a.y + b.y)
}

/// Sign of `v` as ±1, with 0 mapped to +1.
pub fn sign(v: f32) -> f32 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Unit vector at `angle` radians from +x, with its x component multiplied by `x_sign`.
pub fn from_angle(angle: f32, x_sign: f32) -> Vec2 {
    normalize(Vec2::new(angle.cos() * x_sign, angle.sin()))
}
