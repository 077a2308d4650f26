use crate::boundary::BoundaryPoint;
use crate::error::Result;

/// Read-only queries against a sampled DLP curve.
pub trait CurveQuery {
    /// Boundary points sorted ascending by x.
    fn boundary_points(&self) -> &[BoundaryPoint];

    /// Interpolated curve height at `x`.
    fn curve_estimate(&self, x: f64) -> Result<f64>;

    /// True when `(x, y)` lies strictly above the curve.
    fn is_above_curve(&self, x: f64, y: f64) -> Result<bool> {
        Ok(y > self.curve_estimate(x)?)
    }
}
