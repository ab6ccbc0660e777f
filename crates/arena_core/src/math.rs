//! Fixed-point math utilities for deterministic simulation.
//!
//! All combat math uses fixed-point arithmetic so that the same inputs
//! produce the same hits, spreads, and target choices on every platform.
//! Angles are expressed in degrees at the API surface and converted with
//! the fixed-point trig helpers below.

use fixed::types::{I32F32, I64F64};
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Wide fixed-point type for squared distances.
///
/// A squared distance between two [`Fixed`] positions can exceed the
/// [`Fixed`] range once they are about 46,341 units apart.
pub type WideFixed = I64F64;

/// π as a fixed-point constant (`round(π * 2^32)`).
pub const PI: Fixed = Fixed::from_bits(13_493_037_705);

/// Tolerance below which a vector counts as zero (matches a 1e-4 length).
pub const NEARLY_ZERO_SQ: Fixed = Fixed::from_bits(43);

/// Fixed-point 3D vector.
///
/// World space is Z-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
    /// Z coordinate (up).
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for hand-written configuration values.
///
/// Config files carry decimal literals (`reload: 0.6`, `absorption: 0.5`).
/// The literal is parsed once at load time and converted to fixed-point, so
/// the simulation itself never touches floats.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal literal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a decimal literal into a fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(serde::de::Error::custom("expected a finite number"));
        }
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom("number out of fixed-point range"))
    }
}

/// Serde support for hand-written positions: a `(x, y, z)` tuple of
/// decimal literals.
pub mod vec3_decimal {
    use super::{Fixed, Vec3Fixed};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a vector as a tuple of decimals.
    pub fn serialize<S>(value: &Vec3Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (
            value.x.to_num::<f64>(),
            value.y.to_num::<f64>(),
            value.z.to_num::<f64>(),
        )
            .serialize(serializer)
    }

    /// Deserialize a tuple of decimals into a vector.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec3Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (x, y, z) = <(f64, f64, f64)>::deserialize(deserializer)?;
        let convert = |v: f64| {
            Fixed::checked_from_num(v)
                .filter(|_| v.is_finite())
                .ok_or_else(|| serde::de::Error::custom("coordinate out of fixed-point range"))
        };
        Ok(Vec3Fixed::new(convert(x)?, convert(y)?, convert(z)?))
    }
}

impl Vec3Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Create a vector from integer components.
    #[must_use]
    pub fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y), Fixed::from_num(z))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// World up (+Z).
    pub const UP: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ONE,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at [`Fixed::MAX`]; use [`Vec3Fixed::distance_squared_wide`]
    /// where far-apart positions must still compare correctly.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        (self - other).length_squared()
    }

    /// Exact squared distance in [`WideFixed`].
    #[must_use]
    pub fn distance_squared_wide(self, other: Self) -> WideFixed {
        let axis = |a: Fixed, b: Fixed| {
            let delta = WideFixed::from_num(a) - WideFixed::from_num(b);
            delta.saturating_mul(delta)
        };
        axis(self.x, other.x)
            .saturating_add(axis(self.y, other.y))
            .saturating_add(axis(self.z, other.z))
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        (self - other).length()
    }

    /// Dot product of two vectors, saturating at the [`Fixed`] range.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
            .saturating_add(self.z.saturating_mul(other.z))
    }

    /// Largest absolute component.
    #[must_use]
    pub fn max_abs_component(self) -> Fixed {
        self.x.saturating_abs().max(self.y.saturating_abs()).max(self.z.saturating_abs())
    }

    /// Same direction, scaled so the largest component is 1 in magnitude.
    fn scaled_down(self) -> Self {
        let largest = self.max_abs_component();
        Self::new(self.x / largest, self.y / largest, self.z / largest)
    }

    /// Cross product of two vectors.
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Squared length.
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    /// Length.
    #[must_use]
    pub fn length(self) -> Fixed {
        let len_sq = self.length_squared();
        if len_sq < Fixed::MAX {
            return fixed_sqrt(len_sq);
        }
        // Squared length saturated: measure the scaled-down vector instead
        self.max_abs_component()
            .saturating_mul(fixed_sqrt(self.scaled_down().length_squared()))
    }

    /// Multiply every component by `factor`.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }

    /// True when the vector is too short to have a usable direction.
    #[must_use]
    pub fn is_nearly_zero(self) -> bool {
        self.length_squared() <= NEARLY_ZERO_SQ
    }

    /// Normalize vector using fixed-point math.
    ///
    /// Returns [`Vec3Fixed::ZERO`] for a zero-length input.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.length_squared();

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }
        if len_sq == Fixed::MAX {
            return self.scaled_down().normalize();
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len, self.z / len)
    }

    /// Any unit vector perpendicular to `self` (which must be normalized).
    #[must_use]
    pub fn any_orthonormal(self) -> Self {
        // Pick the world axis least aligned with self to keep the cross product well-conditioned.
        let helper = if self.z.abs() < Fixed::from_num(0.9) {
            Self::UP
        } else {
            Self::new(Fixed::ONE, Fixed::ZERO, Fixed::ZERO)
        };
        self.cross(helper).normalize()
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    // Bisection never lands on its upper bound, which is exact for 1
    if high.saturating_mul(high) <= value {
        high
    } else {
        low
    }
}

/// Convert degrees to radians.
#[must_use]
pub fn degrees_to_radians(degrees: Fixed) -> Fixed {
    degrees * PI / Fixed::from_num(180)
}

/// Sine of an angle in degrees.
///
/// Reduces into `[0, 90]` by symmetry and evaluates a Taylor series there,
/// which stays within ~1e-8 of the true value.
#[must_use]
pub fn sin_degrees(degrees: Fixed) -> Fixed {
    let full_turn = Fixed::from_num(360);
    let half_turn = Fixed::from_num(180);
    let quarter_turn = Fixed::from_num(90);

    let mut d = degrees % full_turn;
    if d > half_turn {
        d -= full_turn;
    } else if d < -half_turn {
        d += full_turn;
    }

    let negative = d < Fixed::ZERO;
    if negative {
        d = -d;
    }
    if d > quarter_turn {
        d = half_turn - d;
    }

    let x = degrees_to_radians(d);
    let x_sq = x * x;
    let mut term = x;
    let mut sum = x;
    for n in 1..8_i32 {
        let denom = Fixed::from_num((2 * n) * (2 * n + 1));
        term = -(term * x_sq) / denom;
        sum += term;
    }

    if negative {
        -sum
    } else {
        sum
    }
}

/// Cosine of an angle in degrees.
#[must_use]
pub fn cos_degrees(degrees: Fixed) -> Fixed {
    sin_degrees(Fixed::from_num(90) - degrees)
}

/// Tangent of an angle in degrees.
///
/// Returns `None` where the cosine vanishes (±90°).
#[must_use]
pub fn tan_degrees(degrees: Fixed) -> Option<Fixed> {
    let cos = cos_degrees(degrees);
    if cos.abs() <= Fixed::from_bits(1 << 8) {
        return None;
    }
    Some(sin_degrees(degrees) / cos)
}

/// Simple deterministic RNG for weapon spread.
///
/// Seeded once per combatant so that a replayed scenario sprays pellets
/// along exactly the same directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create an RNG from a seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(0x5851_F42D_4C95_7F2D)
            .wrapping_add(0x1405_7B7E_F767_814F);
        self.state
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_unit(&mut self) -> Fixed {
        // The high half of the state becomes the 32 fractional bits.
        Fixed::from_bits((self.next_u64() >> 32) as i64)
    }

    /// Uniform value in `[-1, 1)`.
    pub fn next_signed_unit(&mut self) -> Fixed {
        self.next_unit() * Fixed::from_num(2) - Fixed::ONE
    }

    /// Uniform point inside the unit disk, by rejection sampling.
    pub fn next_in_unit_disk(&mut self) -> (Fixed, Fixed) {
        loop {
            let a = self.next_signed_unit();
            let b = self.next_signed_unit();
            if a * a + b * b <= Fixed::ONE {
                return (a, b);
            }
        }
    }
}

/// Random unit direction within `half_angle_degrees` of `direction`.
///
/// Samples a point uniformly on the disk of radius `tan(half_angle)` that
/// sits one unit along `direction`, then renormalizes. A half angle of zero
/// (or a zero direction) returns the normalized base direction unchanged.
pub fn random_direction_in_cone(
    direction: Vec3Fixed,
    half_angle_degrees: Fixed,
    rng: &mut SimRng,
) -> Vec3Fixed {
    let base = direction.normalize();
    if base == Vec3Fixed::ZERO || half_angle_degrees <= Fixed::ZERO {
        return base;
    }
    let Some(radius) = tan_degrees(half_angle_degrees) else {
        return base;
    };

    let u = base.any_orthonormal();
    let v = base.cross(u);
    let (a, b) = rng.next_in_unit_disk();

    (base + u.scale(a * radius) + v.scale(b * radius)).normalize()
}

impl std::ops::Add for Vec3Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::Sub for Vec3Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl std::ops::Neg for Vec3Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}
