use crate::error::{DlpError, Result};
use num_complex::Complex;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

const EXCEPTIONAL_TOLERANCE: f64 = 1e-9;

/// Chern character `(ch0, ch1, ch2)` of a sheaf on P^2.
///
/// `ch0` and `ch1` are exact integers. `ch2` is a half-integer for every
/// character produced by the dyadic recurrence and is stored as `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChernCharacter {
    pub ch0: i128,
    pub ch1: i128,
    pub ch2: f64,
}

impl ChernCharacter {
    pub fn new(ch0: i128, ch1: i128, ch2: f64) -> Self {
        Self { ch0, ch1, ch2 }
    }

    /// Character of the line bundle `O(d)`.
    pub fn line_bundle(d: i128) -> Self {
        let d_f = d as f64;
        Self::new(1, d, d_f * d_f / 2.0)
    }

    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        Some(Self::new(
            self.ch0.checked_add(rhs.ch0)?,
            self.ch1.checked_add(rhs.ch1)?,
            self.ch2 + rhs.ch2,
        ))
    }

    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        Some(Self::new(
            self.ch0.checked_sub(rhs.ch0)?,
            self.ch1.checked_sub(rhs.ch1)?,
            self.ch2 - rhs.ch2,
        ))
    }

    pub fn checked_scale(&self, k: i128) -> Option<Self> {
        Some(Self::new(
            self.ch0.checked_mul(k)?,
            self.ch1.checked_mul(k)?,
            self.ch2 * k as f64,
        ))
    }

    /// Slope `mu = ch1 / ch0`, the x-coordinate in the DLP plane.
    pub fn slope(&self) -> f64 {
        self.ch1 as f64 / self.ch0 as f64
    }

    /// `ch2 / ch0`, the y-coordinate in the DLP plane.
    pub fn normalized_ch2(&self) -> f64 {
        self.ch2 / self.ch0 as f64
    }

    /// Discriminant `Delta = mu^2 / 2 - ch2 / ch0`.
    pub fn discriminant(&self) -> f64 {
        let mu = self.slope();
        mu * mu / 2.0 - self.normalized_ch2()
    }

    /// Euler pairing `chi(self, other)` from Riemann-Roch on P^2.
    pub fn euler_characteristic(&self, other: &Self) -> f64 {
        let (r, c, d) = (self.ch0 as f64, self.ch1 as f64, self.ch2);
        let (r2, c2, d2) = (other.ch0 as f64, other.ch1 as f64, other.ch2);
        r * r2 + 1.5 * (r * c2 - c * r2) + (r * d2 + d * r2 - c * c2)
    }

    /// True when `chi(E, E) = 1`, the numerical condition for an exceptional bundle.
    pub fn is_exceptional(&self) -> bool {
        if self.ch0 == 0 {
            return false;
        }
        let rank = self.ch0 as f64;
        let chi = self.euler_characteristic(self);
        (chi - 1.0).abs() <= EXCEPTIONAL_TOLERANCE * (rank * rank).max(1.0)
    }

    /// Central charge `Z(s, q) = (-ch2 + q ch0) + i (ch1 - s ch0)`.
    pub fn central_charge(&self, s: f64, q: f64) -> Result<Complex<f64>> {
        if !s.is_finite() || !q.is_finite() {
            return Err(DlpError::InvalidParameter(format!(
                "central charge parameters must be finite (s = {s}, q = {q})"
            )));
        }
        if self.is_zero() {
            return Err(DlpError::UninitializedCharacter);
        }
        let r = self.ch0 as f64;
        Ok(Complex::new(-self.ch2 + q * r, self.ch1 as f64 - s * r))
    }

    /// Phase of the central charge, normalized to `(-1, 1]`.
    pub fn phase(&self, s: f64, q: f64) -> Result<f64> {
        Ok(self.central_charge(s, q)?.arg() / PI)
    }
}

impl fmt::Display for ChernCharacter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.ch0, self.ch1, self.ch2)
    }
}

impl Zero for ChernCharacter {
    fn zero() -> Self {
        Self::new(0, 0, 0.0)
    }
    fn is_zero(&self) -> bool {
        self.ch0 == 0 && self.ch1 == 0 && self.ch2 == 0.0
    }
}

impl Add for ChernCharacter {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.ch0 + rhs.ch0, self.ch1 + rhs.ch1, self.ch2 + rhs.ch2)
    }
}

impl Sub for ChernCharacter {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.ch0 - rhs.ch0, self.ch1 - rhs.ch1, self.ch2 - rhs.ch2)
    }
}

impl Neg for ChernCharacter {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.ch0, -self.ch1, -self.ch2)
    }
}

impl Mul<i128> for ChernCharacter {
    type Output = Self;
    fn mul(self, k: i128) -> Self {
        Self::new(self.ch0 * k, self.ch1 * k, self.ch2 * k as f64)
    }
}

impl Mul<ChernCharacter> for i128 {
    type Output = ChernCharacter;
    fn mul(self, rhs: ChernCharacter) -> ChernCharacter {
        rhs * self
    }
}
