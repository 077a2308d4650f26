use crate::boundary::{BoundaryFamily, BoundaryPoint, BoundaryPointGenerator, RootFallback};
use crate::dyadic::DyadicIndex;
use crate::error::{DlpError, Result};
use crate::traits::CurveQuery;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::RangeInclusive;
use tracing::{debug, trace};

/// Upper bound on enumerated dyadic indices per curve.
pub const MAX_INDEX_COUNT: usize = 1 << 22;
/// Upper bound on points produced by one chamber sampling.
pub const MAX_CHAMBER_SAMPLES: usize = 1 << 24;

/// Precision and extent of the enumerated dyadic indices.
///
/// Indices `p / 2^granularity` are enumerated for
/// `p` in `[-width * 2^granularity, width * 2^granularity]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveConfig {
    pub granularity: u32,
    pub width: u32,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            granularity: 5,
            width: 5,
        }
    }
}

impl CurveConfig {
    pub fn new(granularity: i64, width: i64) -> Result<Self> {
        if granularity < 0 {
            return Err(DlpError::InvalidConfiguration(format!(
                "granularity must be non-negative, got {granularity}"
            )));
        }
        if width < 1 {
            return Err(DlpError::InvalidConfiguration(format!(
                "width must be at least 1, got {width}"
            )));
        }
        let config = Self {
            granularity: u32::try_from(granularity).map_err(|_| {
                DlpError::InvalidConfiguration(format!("granularity {granularity} is too large"))
            })?,
            width: u32::try_from(width).map_err(|_| {
                DlpError::InvalidConfiguration(format!("width {width} is too large"))
            })?,
        };
        config.index_count()?;
        Ok(config)
    }

    /// `width * 2^granularity`, the largest enumerated numerator.
    pub fn half_range(&self) -> Result<i64> {
        if self.width < 1 {
            return Err(DlpError::InvalidConfiguration(format!(
                "width must be at least 1, got {}",
                self.width
            )));
        }
        1i64.checked_shl(self.granularity)
            .filter(|scale| *scale > 0)
            .and_then(|scale| scale.checked_mul(i64::from(self.width)))
            // Keep p + 1 and p - 3 representable at both ends.
            .filter(|bound| *bound <= i64::MAX - 3)
            .ok_or_else(|| {
                DlpError::InvalidConfiguration(format!(
                    "width * 2^granularity overflows for granularity {} and width {}",
                    self.granularity, self.width
                ))
            })
    }

    pub fn index_range(&self) -> Result<RangeInclusive<i64>> {
        let bound = self.half_range()?;
        Ok(-bound..=bound)
    }

    pub fn index_count(&self) -> Result<usize> {
        let bound = self.half_range()?;
        usize::try_from(bound)
            .ok()
            .and_then(|b| b.checked_mul(2))
            .and_then(|b| b.checked_add(1))
            .filter(|count| *count <= MAX_INDEX_COUNT)
            .ok_or_else(|| {
                DlpError::InvalidConfiguration(format!(
                    "granularity {} and width {} enumerate more than {MAX_INDEX_COUNT} indices",
                    self.granularity, self.width
                ))
            })
    }
}

/// Grid of sample points lying between the curve and `y_max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChamberSampling {
    pub x_min: f64,
    pub x_max: f64,
    pub x_count: usize,
    pub y_max: f64,
    pub y_count: usize,
}

impl Default for ChamberSampling {
    fn default() -> Self {
        Self {
            x_min: -5.0,
            x_max: 5.0,
            x_count: 200,
            y_max: 11.5,
            y_count: 150,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: DyadicIndex,
    pub from: BoundaryPoint,
    pub to: BoundaryPoint,
}

/// The DLP curve for one configuration: boundary points sorted by x.
#[derive(Debug, Clone, Serialize)]
pub struct CurveModel {
    config: CurveConfig,
    families: Vec<BoundaryFamily>,
    boundary_points: Vec<BoundaryPoint>,
    fallbacks: Vec<RootFallback>,
}

impl CurveModel {
    pub fn new(config: CurveConfig) -> Result<Self> {
        let range = config.index_range()?;
        let mut families = Vec::with_capacity(config.index_count()?);
        let mut generator = BoundaryPointGenerator::new();

        for p in range {
            families.push(generator.family(DyadicIndex::new(p, config.granularity))?);
        }

        let mut boundary_points: Vec<BoundaryPoint> = families
            .iter()
            .flat_map(BoundaryFamily::curve_points)
            .collect();
        boundary_points.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        trace!(
            cached = generator.resolver().cached_len(),
            hits = generator.resolver().cache_hits(),
            "dyadic resolver cache"
        );
        let fallbacks = generator.into_fallbacks();
        debug!(
            granularity = config.granularity,
            width = config.width,
            indices = families.len(),
            points = boundary_points.len(),
            fallbacks = fallbacks.len(),
            "built DLP curve"
        );

        Ok(Self {
            config,
            families,
            boundary_points,
            fallbacks,
        })
    }

    pub fn from_parts(granularity: i64, width: i64) -> Result<Self> {
        Self::new(CurveConfig::new(granularity, width)?)
    }

    pub fn config(&self) -> CurveConfig {
        self.config
    }

    pub fn boundary_points(&self) -> &[BoundaryPoint] {
        &self.boundary_points
    }

    pub fn families(&self) -> &[BoundaryFamily] {
        &self.families
    }

    pub fn fallbacks(&self) -> &[RootFallback] {
        &self.fallbacks
    }

    pub fn x_range(&self) -> (f64, f64) {
        let first = self.boundary_points.first().map_or(f64::NAN, |p| p.x);
        let last = self.boundary_points.last().map_or(f64::NAN, |p| p.x);
        (first, last)
    }

    /// Linear interpolation between the first pair of adjacent boundary
    /// points with `x1 <= x <= x2`.
    pub fn curve_estimate(&self, x: f64) -> Result<f64> {
        let (min, max) = self.x_range();
        if x.is_nan() || !(min <= x && x <= max) {
            return Err(DlpError::OutOfRange { x, min, max });
        }

        let points = &self.boundary_points;
        let upper = points.partition_point(|p| p.x < x).max(1);
        let (lo, hi) = (points[upper - 1], points[upper]);

        if lo.x == hi.x {
            return Err(DlpError::DegenerateInterval { x });
        }
        if x == lo.x {
            return Ok(lo.y);
        }
        if x == hi.x {
            return Ok(hi.y);
        }
        Ok(lo.y + (hi.y - lo.y) * ((x - lo.x) / (hi.x - lo.x)))
    }

    pub fn is_above_curve(&self, x: f64, y: f64) -> Result<bool> {
        Ok(y > self.curve_estimate(x)?)
    }

    /// The two tangent segments `plus -> left` and `plus -> right` of every index.
    pub fn segments(&self) -> Vec<Segment> {
        self.families
            .iter()
            .flat_map(|family| {
                [family.left, family.right].map(|to| Segment {
                    index: family.index,
                    from: family.plus,
                    to,
                })
            })
            .collect()
    }

    /// Chamber walls `plus -> regular`.
    pub fn walls(&self) -> Vec<Segment> {
        self.families
            .iter()
            .map(|family| Segment {
                index: family.index,
                from: family.plus,
                to: family.regular,
            })
            .collect()
    }

    pub fn chamber_samples(&self, sampling: &ChamberSampling) -> Result<Vec<BoundaryPoint>> {
        if sampling.x_count == 0 || sampling.y_count == 0 {
            return Err(DlpError::InvalidConfiguration(
                "chamber sampling needs at least one sample per axis".to_string(),
            ));
        }
        if !sampling.x_min.is_finite()
            || !sampling.x_max.is_finite()
            || !sampling.y_max.is_finite()
            || sampling.x_max < sampling.x_min
        {
            return Err(DlpError::InvalidConfiguration(
                "chamber sampling bounds must be finite with x_max >= x_min".to_string(),
            ));
        }

        let total = sampling
            .x_count
            .checked_mul(sampling.y_count)
            .filter(|total| *total <= MAX_CHAMBER_SAMPLES)
            .ok_or_else(|| {
                DlpError::InvalidConfiguration(format!(
                    "chamber sampling of {} x {} points exceeds {MAX_CHAMBER_SAMPLES}",
                    sampling.x_count, sampling.y_count
                ))
            })?;
        let mut samples = Vec::with_capacity(total);
        for x in linspace(sampling.x_min, sampling.x_max, sampling.x_count) {
            let floor = self.curve_estimate(x)?;
            samples.extend(
                linspace(floor, sampling.y_max, sampling.y_count).map(|y| BoundaryPoint::new(x, y)),
            );
        }
        Ok(samples)
    }
}

impl CurveQuery for CurveModel {
    fn boundary_points(&self) -> &[BoundaryPoint] {
        CurveModel::boundary_points(self)
    }

    fn curve_estimate(&self, x: f64) -> Result<f64> {
        CurveModel::curve_estimate(self, x)
    }
}

fn linspace(start: f64, end: f64, count: usize) -> impl Iterator<Item = f64> {
    let step = if count > 1 {
        (end - start) / (count - 1) as f64
    } else {
        0.0
    };
    (0..count).map(move |i| {
        if count > 1 && i == count - 1 {
            end
        } else {
            start + step * i as f64
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    fn small_model() -> CurveModel {
        CurveModel::from_parts(1, 1).expect("model should build")
    }

    #[test]
    fn config_validation() {
        assert!(matches!(
            CurveConfig::new(-1, 1),
            Err(DlpError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            CurveConfig::new(1, 0),
            Err(DlpError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            CurveConfig::new(63, 1),
            Err(DlpError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            CurveConfig::new(40, 1 << 30),
            Err(DlpError::InvalidConfiguration(_))
        ));
        let config = CurveConfig::new(2, 3).expect("valid config");
        assert_eq!(config.index_range().expect("range"), -12..=12);
        assert_eq!(config.index_count().expect("count"), 25);
        assert_eq!(CurveConfig::default(), CurveConfig { granularity: 5, width: 5 });
    }

    #[test]
    fn oversized_index_ranges_are_rejected() {
        for granularity in [21, 45, 60, 62] {
            assert!(matches!(
                CurveModel::from_parts(granularity, 1),
                Err(DlpError::InvalidConfiguration(_))
            ));
        }
        // Field-built configs bypass `CurveConfig::new` and must still be checked.
        let config = CurveConfig {
            granularity: 45,
            width: 1,
        };
        assert!(matches!(
            CurveModel::new(config),
            Err(DlpError::InvalidConfiguration(_))
        ));
        let config = CurveConfig::new(20, 1).expect("largest width-1 granularity");
        assert_eq!(config.index_count().expect("count"), (1 << 21) + 1);
    }

    #[test]
    fn oversized_chamber_sampling_is_rejected() {
        let model = small_model();
        for (x_count, y_count) in [(usize::MAX, 2), (1 << 13, 1 << 13)] {
            let sampling = ChamberSampling {
                x_min: -1.0,
                x_max: 1.0,
                x_count,
                y_max: 2.0,
                y_count,
            };
            assert!(matches!(
                model.chamber_samples(&sampling),
                Err(DlpError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn small_model_matches_known_points() {
        let model = small_model();
        let points = model.boundary_points();
        assert_eq!(model.families().len(), 5);
        assert_eq!(points.len(), 15);

        let expected = [
            (-1.381966011250105, 0.45491502812526274),
            (-1.0, -0.5),
            (-0.6180339887498949, -0.30901699437494745),
            (-0.5857864376269049, -0.3284271247461903),
            (-0.5, -0.5),
            (-0.41421356237309515, -0.41421356237309515),
            (-0.3819660112501051, -0.42705098312484235),
            (0.0, -1.0),
            (0.3819660112501051, -0.42705098312484235),
            (0.41421356237309515, -0.41421356237309515),
            (0.5, -0.5),
            (0.5857864376269049, -0.3284271247461903),
            (0.6180339887498949, -0.30901699437494745),
            (1.0, -0.5),
            (1.381966011250105, 0.45491502812526274),
        ];
        for (point, (x, y)) in points.iter().zip(expected) {
            assert_close(point.x, x);
            assert_close(point.y, y);
        }
        assert!(model.fallbacks().is_empty());
    }

    #[test]
    fn estimate_interpolates_and_hits_endpoints() {
        let model = small_model();
        assert_eq!(model.curve_estimate(0.0).expect("in range"), -1.0);
        assert_eq!(model.curve_estimate(-0.5).expect("in range"), -0.5);
        // Midway between (-0.5, -0.5) and (-0.41421356237309515, -0.41421356237309515).
        let x = (-0.5 + -0.41421356237309515) / 2.0;
        assert_close(model.curve_estimate(x).expect("in range"), x);
    }

    #[test]
    fn estimate_rejects_out_of_range() {
        let model = small_model();
        let (min, max) = model.x_range();
        for x in [min - 1e-9, max + 1e-9, f64::NAN, f64::INFINITY] {
            let err = model.curve_estimate(x).expect_err("out of range");
            assert!(matches!(err, DlpError::OutOfRange { .. }), "{err}");
        }
        assert!(model.is_above_curve(max + 1.0, 0.0).is_err());
    }

    #[test]
    fn duplicate_leading_points_are_degenerate() {
        let point = BoundaryPoint::new(0.0, 1.0);
        let model = CurveModel {
            config: CurveConfig::default(),
            families: Vec::new(),
            boundary_points: vec![point, BoundaryPoint::new(0.0, 2.0), BoundaryPoint::new(1.0, 3.0)],
            fallbacks: Vec::new(),
        };
        assert_eq!(
            model.curve_estimate(0.0),
            Err(DlpError::DegenerateInterval { x: 0.0 })
        );
        assert_close(model.curve_estimate(0.5).expect("in range"), 2.5);
    }

    #[test]
    fn above_and_below() {
        let model = small_model();
        assert!(model.is_above_curve(0.0, -0.999).expect("in range"));
        assert!(!model.is_above_curve(0.0, -1.0).expect("in range"));
        assert!(!model.is_above_curve(0.2, -1.0).expect("in range"));
    }

    #[test]
    fn segments_and_walls() {
        let model = small_model();
        let segments = model.segments();
        let walls = model.walls();
        assert_eq!(segments.len(), 10);
        assert_eq!(walls.len(), 5);

        let wall = walls
            .iter()
            .find(|w| w.index == DyadicIndex::new(1, 1))
            .expect("wall for 1/2");
        assert_eq!(wall.from, BoundaryPoint::new(0.5, -0.5));
        assert_eq!(wall.to, BoundaryPoint::new(0.5, -0.25));
        for (pair, family) in segments.chunks(2).zip(model.families()) {
            assert_eq!(pair[0].from, family.plus);
            assert_eq!(pair[0].to, family.left);
            assert_eq!(pair[1].to, family.right);
        }
    }

    #[test]
    fn chamber_samples_sit_on_or_above_curve() {
        let model = CurveModel::from_parts(2, 2).expect("model should build");
        let sampling = ChamberSampling {
            x_min: -1.5,
            x_max: 1.5,
            x_count: 7,
            y_max: 4.0,
            y_count: 5,
        };
        let samples = model.chamber_samples(&sampling).expect("samples");
        assert_eq!(samples.len(), 35);
        for column in samples.chunks(5) {
            let floor = model.curve_estimate(column[0].x).expect("in range");
            assert_eq!(column[0].y, floor);
            assert_eq!(column[4].y, 4.0);
            assert!(column.iter().all(|p| p.x == column[0].x && p.y >= floor));
        }
        assert_eq!(samples[0].x, -1.5);
        assert_eq!(samples[34].x, 1.5);

        let bad = ChamberSampling {
            x_count: 0,
            ..sampling
        };
        assert!(model.chamber_samples(&bad).is_err());
        let wide = ChamberSampling {
            x_min: -10.0,
            ..sampling
        };
        assert!(matches!(
            model.chamber_samples(&wide),
            Err(DlpError::OutOfRange { .. })
        ));
    }

    #[test]
    fn linspace_includes_endpoints() {
        let values: Vec<f64> = linspace(0.0, 1.0, 5).collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1).collect::<Vec<_>>(), vec![2.0]);
    }
}
