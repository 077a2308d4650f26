use crate::boundary::TangentSide;
use thiserror::Error;

/// Errors raised while resolving dyadic characters, building the curve, or querying it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DlpError {
    #[error("Invalid dyadic index ({p}, {m}): {reason}")]
    InvalidIndex { p: i64, m: i64, reason: String },

    #[error("Invalid curve configuration: {0}")]
    InvalidConfiguration(String),

    #[error("x = {x} is outside the range of the curve [{min}, {max}]")]
    OutOfRange { x: f64, min: f64, max: f64 },

    #[error("Degenerate secant for the {side} point of index {p}/2^{m}: both endpoints have x = {x}")]
    DegenerateSecant {
        p: i64,
        m: u32,
        side: TangentSide,
        x: f64,
    },

    #[error("Degenerate interpolation interval at x = {x}")]
    DegenerateInterval { x: f64 },

    #[error("Secant through the {side} point of index {p}/2^{m} misses the quadric (discriminant {discriminant})")]
    NoTangentIntersection {
        p: i64,
        m: u32,
        side: TangentSide,
        discriminant: f64,
    },

    #[error("Chern character overflow while resolving index {p}/2^{m}")]
    CharacterOverflow { p: i64, m: u32 },

    #[error("Chern character is zero; cannot compute central charge")]
    UninitializedCharacter,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, DlpError>;
