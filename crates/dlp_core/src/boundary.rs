//! Boundary points of the DLP curve in the `(ch1/ch0, ch2/ch0)` plane.
//!
//! For each dyadic index the curve gets the `plus` point (the regular point
//! lowered by `1 / ch0^2`) and two tangent points. A tangent point lies where
//! the secant from `plus` to a neighboring regular point meets the quadric
//! `y = x^2 / 2 - 1 / 2`.

use crate::chern::ChernCharacter;
use crate::dyadic::{DyadicIndex, DyadicResolver};
use crate::error::{DlpError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPoint {
    pub x: f64,
    pub y: f64,
}

impl BoundaryPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn regular_of(character: &ChernCharacter) -> Self {
        Self::new(character.slope(), character.normalized_ch2())
    }

    fn plus_of(character: &ChernCharacter) -> Self {
        let rank = character.ch0 as f64;
        Self::new(
            character.slope(),
            character.normalized_ch2() - 1.0 / (rank * rank),
        )
    }
}

/// Which neighbor the secant runs to: `p - 1` or `p + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TangentSide {
    Left,
    Right,
}

impl TangentSide {
    fn neighbor_offset(self) -> i64 {
        match self {
            TangentSide::Left => -1,
            TangentSide::Right => 1,
        }
    }
}

impl fmt::Display for TangentSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TangentSide::Left => f.write_str("left"),
            TangentSide::Right => f.write_str("right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootChoice {
    /// `s + sqrt(D)` lies on the secant segment.
    Plus,
    /// `s + sqrt(D)` is off the segment and `s - sqrt(D)` is on it.
    Minus,
    /// Neither root lies on the segment; `s - sqrt(D)` is used anyway.
    MinusUncontained,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TangentPoint {
    pub point: BoundaryPoint,
    pub root: RootChoice,
}

/// Recorded whenever neither root of the tangency quadratic lies between
/// the secant endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootFallback {
    pub index: DyadicIndex,
    pub side: TangentSide,
    pub x_plus: f64,
    pub x_minus: f64,
    pub interval: (f64, f64),
}

/// All points derived from a single dyadic index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryFamily {
    pub index: DyadicIndex,
    pub regular: BoundaryPoint,
    pub plus: BoundaryPoint,
    pub left: BoundaryPoint,
    pub right: BoundaryPoint,
}

impl BoundaryFamily {
    /// The three points that make up the curve: plus, left, right.
    pub fn curve_points(&self) -> [BoundaryPoint; 3] {
        [self.plus, self.left, self.right]
    }
}

fn within_closed(x: f64, a: f64, b: f64) -> bool {
    (a <= x && x <= b) || (b <= x && x <= a)
}

#[derive(Debug)]
pub struct BoundaryPointGenerator {
    resolver: DyadicResolver,
    fallbacks: Vec<RootFallback>,
}

impl BoundaryPointGenerator {
    pub fn new() -> Self {
        Self::with_resolver(DyadicResolver::new())
    }

    pub fn with_resolver(resolver: DyadicResolver) -> Self {
        Self {
            resolver,
            fallbacks: Vec::new(),
        }
    }

    pub fn resolver(&self) -> &DyadicResolver {
        &self.resolver
    }

    pub fn fallbacks(&self) -> &[RootFallback] {
        &self.fallbacks
    }

    pub fn into_fallbacks(self) -> Vec<RootFallback> {
        self.fallbacks
    }

    pub fn regular(&mut self, index: DyadicIndex) -> Result<BoundaryPoint> {
        let character = self.resolver.resolve_index(index)?;
        Ok(BoundaryPoint::regular_of(&character))
    }

    pub fn plus(&mut self, index: DyadicIndex) -> Result<BoundaryPoint> {
        let character = self.resolver.resolve_index(index)?;
        Ok(BoundaryPoint::plus_of(&character))
    }

    pub fn left(&mut self, index: DyadicIndex) -> Result<BoundaryPoint> {
        Ok(self.tangent(index, TangentSide::Left)?.point)
    }

    pub fn right(&mut self, index: DyadicIndex) -> Result<BoundaryPoint> {
        Ok(self.tangent(index, TangentSide::Right)?.point)
    }

    /// Intersects the secant `plus(p) -> regular(p -/+ 1)` with the quadric.
    pub fn tangent(&mut self, index: DyadicIndex, side: TangentSide) -> Result<TangentPoint> {
        let a = self.plus(index)?;
        let neighbor = DyadicIndex::new(
            index
                .p
                .checked_add(side.neighbor_offset())
                .ok_or_else(|| DlpError::InvalidIndex {
                    p: index.p,
                    m: i64::from(index.m),
                    reason: format!("{side} neighbor overflows i64"),
                })?,
            index.m,
        );
        let b = self.regular(neighbor)?;

        if b.x == a.x {
            return Err(DlpError::DegenerateSecant {
                p: index.p,
                m: index.m,
                side,
                x: a.x,
            });
        }
        let slope = (b.y - a.y) / (b.x - a.x);
        let discriminant = slope * slope - 2.0 * slope * a.x + 2.0 * a.y + 1.0;
        if !discriminant.is_finite() || discriminant < 0.0 {
            return Err(DlpError::NoTangentIntersection {
                p: index.p,
                m: index.m,
                side,
                discriminant,
            });
        }

        let root = discriminant.sqrt();
        let x_plus = slope + root;
        let (x, choice) = if within_closed(x_plus, a.x, b.x) {
            (x_plus, RootChoice::Plus)
        } else {
            let x_minus = slope - root;
            if within_closed(x_minus, a.x, b.x) {
                (x_minus, RootChoice::Minus)
            } else {
                warn!(
                    p = index.p,
                    m = index.m,
                    %side,
                    x_plus,
                    x_minus,
                    "no tangency root on the secant segment; using the minus root"
                );
                self.fallbacks.push(RootFallback {
                    index,
                    side,
                    x_plus,
                    x_minus,
                    interval: (a.x.min(b.x), a.x.max(b.x)),
                });
                (x_minus, RootChoice::MinusUncontained)
            }
        };

        Ok(TangentPoint {
            point: BoundaryPoint::new(x, slope * x + (a.y - slope * a.x)),
            root: choice,
        })
    }

    pub fn family(&mut self, index: DyadicIndex) -> Result<BoundaryFamily> {
        Ok(BoundaryFamily {
            index,
            regular: self.regular(index)?,
            plus: self.plus(index)?,
            left: self.left(index)?,
            right: self.right(index)?,
        })
    }
}

impl Default for BoundaryPointGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point(actual: BoundaryPoint, x: f64, y: f64) {
        assert!(
            (actual.x - x).abs() < 1e-12 && (actual.y - y).abs() < 1e-12,
            "expected ({x}, {y}), got ({}, {})",
            actual.x,
            actual.y
        );
    }

    #[test]
    fn regular_and_plus_points() {
        let mut generator = BoundaryPointGenerator::new();
        let index = DyadicIndex::new(1, 1);
        // ch = (2, 1, -1/2)
        assert_point(generator.regular(index).expect("regular"), 0.5, -0.25);
        assert_point(generator.plus(index).expect("plus"), 0.5, -0.5);
        // Line bundles drop by a full unit.
        assert_point(
            generator.plus(DyadicIndex::new(0, 1)).expect("plus"),
            0.0,
            -1.0,
        );
    }

    #[test]
    fn tangent_points_lie_on_quadric_and_secant() {
        let mut generator = BoundaryPointGenerator::new();
        for p in -8..=8 {
            let index = DyadicIndex::new(p, 2);
            let a = generator.plus(index).expect("plus");
            for side in [TangentSide::Left, TangentSide::Right] {
                let tangent = generator.tangent(index, side).expect("tangent");
                let point = tangent.point;
                assert!(
                    (point.y - (point.x * point.x / 2.0 - 0.5)).abs() < 1e-9,
                    "({}, {}) off quadric at {p}/4 {side}",
                    point.x,
                    point.y
                );
                let b = generator
                    .regular(DyadicIndex::new(p + side.neighbor_offset(), 2))
                    .expect("neighbor");
                assert!(within_closed(point.x, a.x, b.x));
                assert_ne!(tangent.root, RootChoice::MinusUncontained);
            }
        }
        assert!(generator.fallbacks().is_empty());
    }

    #[test]
    fn root_selection_prefers_plus_root() {
        let mut generator = BoundaryPointGenerator::new();
        let index = DyadicIndex::new(0, 1);
        let left = generator.tangent(index, TangentSide::Left).expect("left");
        let right = generator.tangent(index, TangentSide::Right).expect("right");
        assert_eq!(left.root, RootChoice::Plus);
        assert_eq!(right.root, RootChoice::Minus);
        assert_point(left.point, -0.3819660112501051, -0.42705098312484235);
        assert_point(right.point, 0.3819660112501051, -0.42705098312484235);
    }

    #[test]
    fn family_is_symmetric_about_zero() {
        let mut generator = BoundaryPointGenerator::new();
        let pos = generator.family(DyadicIndex::new(1, 1)).expect("family");
        let neg = generator.family(DyadicIndex::new(-1, 1)).expect("family");
        assert_point(neg.plus, -pos.plus.x, pos.plus.y);
        assert_point(neg.left, -pos.right.x, pos.right.y);
        assert_point(neg.right, -pos.left.x, pos.left.y);
        assert_eq!(pos.curve_points(), [pos.plus, pos.left, pos.right]);
    }

    #[test]
    fn side_display_names() {
        assert_eq!(TangentSide::Left.to_string(), "left");
        assert_eq!(TangentSide::Right.to_string(), "right");
    }
}
