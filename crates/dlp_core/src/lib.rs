//! The `dlp_core` crate computes the Drézet-Le Potier curve of exceptional
//! bundles on P^2 in the `(ch1/ch0, ch2/ch0)` plane.
//!
//! Key components:
//! - **Chern characters**: `ChernCharacter` arithmetic and invariants (slope, discriminant, Euler pairing, central charge).
//! - **Dyadic resolver**: the memoized recurrence mapping `p / 2^m` to an exceptional character.
//! - **Boundary points**: plus, left and right points per index, with tangency root selection.
//! - **Curve model**: the sorted point cloud and its interpolation queries.
pub mod boundary;
pub mod chern;
pub mod curve;
pub mod dyadic;
pub mod error;
pub mod traits;

pub use boundary::{
    BoundaryFamily, BoundaryPoint, BoundaryPointGenerator, RootChoice, RootFallback, TangentPoint,
    TangentSide,
};
pub use chern::ChernCharacter;
pub use curve::{
    ChamberSampling, CurveConfig, CurveModel, Segment, MAX_CHAMBER_SAMPLES, MAX_INDEX_COUNT,
};
pub use dyadic::{resolve_uncached, DyadicIndex, DyadicResolver};
pub use error::{DlpError, Result};
pub use traits::CurveQuery;
