//! Cubic Hermite curves.
//!
//! A [`Curve`] interpolates an ordered list of control points over a single
//! global parameter `t` in `[0, 1]`. Each point carries a position and an
//! optional explicit tangent; missing tangents are derived from the
//! neighbors (Catmull-Rom style).
//!
//! Tangents are stored in whole-curve units, i.e. the derivative with respect
//! to the global `t`. Evaluation rescales them by the reciprocal segment count
//! so each segment sees per-segment units.

use glam::Vec3;

use crate::error::CurveError;

/// Default number of chord samples per segment for [`Curve::arc_length`].
pub const ARC_LENGTH_SAMPLES: usize = 100;

/// A single control point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlPoint {
    pub position: Vec3,
    /// Explicit tangent, or `None` to derive it from the neighbors.
    pub tangent: Option<Vec3>,
}

/// A piecewise cubic Hermite curve.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Curve {
    points: Vec<ControlPoint>,
}

impl Curve {
    /// An empty curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a curve through `positions` with derived tangents.
    pub fn from_positions(positions: impl IntoIterator<Item = Vec3>) -> Self {
        Self {
            points: positions
                .into_iter()
                .map(|position| ControlPoint {
                    position,
                    tangent: None,
                })
                .collect(),
        }
    }

    /// Number of control points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the curve has no control points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Control points in order.
    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Append a control point with a derived tangent.
    pub fn add_point(&mut self, position: Vec3) {
        self.points.push(ControlPoint {
            position,
            tangent: None,
        });
    }

    /// Append a control point with an explicit tangent.
    pub fn add_point_with_tangent(&mut self, position: Vec3, tangent: Vec3) {
        self.points.push(ControlPoint {
            position,
            tangent: Some(tangent),
        });
    }

    /// Move an existing control point.
    pub fn set_point(&mut self, index: usize, position: Vec3) -> Result<(), CurveError> {
        let len = self.points.len();
        let point = self
            .points
            .get_mut(index)
            .ok_or(CurveError::IndexOutOfRange { index, len })?;
        point.position = position;
        Ok(())
    }

    /// Pin the tangent of an existing control point. `None` reverts to the
    /// derived tangent.
    pub fn set_tangent(&mut self, index: usize, tangent: Option<Vec3>) -> Result<(), CurveError> {
        let len = self.points.len();
        let point = self
            .points
            .get_mut(index)
            .ok_or(CurveError::IndexOutOfRange { index, len })?;
        point.tangent = tangent;
        Ok(())
    }

    /// Parameter width of one segment.
    fn segment_scale(&self) -> f32 {
        1.0 / (self.points.len() - 1) as f32
    }

    fn require_segments(&self) -> Result<(), CurveError> {
        if self.points.len() < 2 {
            return Err(CurveError::TooFewPoints {
                count: self.points.len(),
            });
        }
        Ok(())
    }

    /// Tangent at control point `index` in whole-curve units.
    pub fn point_tangent(&self, index: usize) -> Result<Vec3, CurveError> {
        self.require_segments()?;
        let len = self.points.len();
        let point = self
            .points
            .get(index)
            .ok_or(CurveError::IndexOutOfRange { index, len })?;
        if let Some(tangent) = point.tangent {
            return Ok(tangent);
        }

        let scale = self.segment_scale();
        let p = |i: usize| self.points[i].position;
        let tangent = if index == 0 {
            (p(1) - p(0)) / scale
        } else if index == len - 1 {
            (p(len - 1) - p(len - 2)) / scale
        } else {
            (p(index + 1) - p(index - 1)) / (2.0 * scale)
        };
        Ok(tangent)
    }

    /// Segment index and local parameter for global `t`.
    fn locate(&self, t: f32) -> (usize, f32) {
        let segments = self.points.len() - 1;
        let scaled = t.clamp(0.0, 1.0) * segments as f32;
        let i = (scaled.floor() as usize).min(segments - 1);
        (i, scaled - i as f32)
    }

    /// Position at global parameter `t`, clamped to `[0, 1]`.
    pub fn position(&self, t: f32) -> Result<Vec3, CurveError> {
        self.require_segments()?;
        let (i, s) = self.locate(t);
        let scale = self.segment_scale();

        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        let p0 = self.points[i].position;
        let p1 = self.points[i + 1].position;
        let m0 = self.point_tangent(i)? * scale;
        let m1 = self.point_tangent(i + 1)? * scale;

        Ok(h00 * p0 + h10 * m0 + h01 * p1 + h11 * m1)
    }

    /// Derivative of [`Curve::position`] with respect to the global `t`.
    pub fn tangent_at(&self, t: f32) -> Result<Vec3, CurveError> {
        self.require_segments()?;
        let (i, s) = self.locate(t);
        let scale = self.segment_scale();

        let s2 = s * s;
        let d00 = 6.0 * s2 - 6.0 * s;
        let d10 = 3.0 * s2 - 4.0 * s + 1.0;
        let d01 = -6.0 * s2 + 6.0 * s;
        let d11 = 3.0 * s2 - 2.0 * s;

        let p0 = self.points[i].position;
        let p1 = self.points[i + 1].position;
        let m0 = self.point_tangent(i)? * scale;
        let m1 = self.point_tangent(i + 1)? * scale;

        // ds/dt is the segment count.
        Ok((d00 * p0 + d10 * m0 + d01 * p1 + d11 * m1) / scale)
    }

    /// Approximate arc length as the sum of chords between
    /// `samples_per_segment` uniform samples in every segment.
    ///
    /// This is a lower bound that converges to the true length as the sample
    /// count grows; it is not exact.
    pub fn arc_length(&self, samples_per_segment: usize) -> Result<f32, CurveError> {
        self.require_segments()?;
        let total = (samples_per_segment.max(1) * (self.points.len() - 1)) as f32;
        let steps = total as usize;

        let mut length = 0.0;
        let mut prev = self.position(0.0)?;
        for k in 1..=steps {
            let next = self.position(k as f32 / total)?;
            length += prev.distance(next);
            prev = next;
        }
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_point_round_trip() {
        let mut curve = Curve::new();
        curve.add_point_with_tangent(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 5.0, 0.0));
        curve.add_point_with_tangent(Vec3::new(-4.0, 0.5, 7.0), Vec3::new(1.0, 0.0, -2.0));

        assert_eq!(curve.position(0.0).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(curve.position(1.0).unwrap(), Vec3::new(-4.0, 0.5, 7.0));
    }

    #[test]
    fn test_passes_through_interior_points() {
        let positions = [
            Vec3::ZERO,
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 0.0, 1.0),
            Vec3::new(3.0, -1.0, 0.0),
        ];
        let curve = Curve::from_positions(positions);
        for (i, p) in positions.iter().enumerate() {
            let t = i as f32 / 3.0;
            assert!(curve.position(t).unwrap().distance(*p) < 1e-5);
        }
    }

    #[test]
    fn test_too_few_points() {
        let mut curve = Curve::new();
        assert_eq!(
            curve.position(0.5),
            Err(CurveError::TooFewPoints { count: 0 })
        );
        curve.add_point(Vec3::ONE);
        assert_eq!(
            curve.arc_length(ARC_LENGTH_SAMPLES),
            Err(CurveError::TooFewPoints { count: 1 })
        );
    }

    #[test]
    fn test_edit_out_of_range() {
        let mut curve = Curve::from_positions([Vec3::ZERO, Vec3::X]);
        assert_eq!(
            curve.set_point(2, Vec3::Y),
            Err(CurveError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            curve.set_tangent(9, None),
            Err(CurveError::IndexOutOfRange { index: 9, len: 2 })
        );
        // The failed edit leaves the curve untouched.
        assert_eq!(curve.points()[1].position, Vec3::X);
    }

    #[test]
    fn test_derived_tangents() {
        let curve = Curve::from_positions([Vec3::ZERO, Vec3::X, Vec3::new(3.0, 0.0, 0.0)]);
        // segment scale is 0.5
        assert_eq!(curve.point_tangent(0).unwrap(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(curve.point_tangent(1).unwrap(), Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(curve.point_tangent(2).unwrap(), Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_straight_line_arc_length() {
        let curve = Curve::from_positions([Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)]);
        let length = curve.arc_length(ARC_LENGTH_SAMPLES).unwrap();
        assert!((length - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_arc_length_grows_with_samples() {
        let curve = Curve::from_positions([
            Vec3::ZERO,
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(3.0, -1.0, 1.0),
        ]);
        let coarse = curve.arc_length(2).unwrap();
        let fine = curve.arc_length(200).unwrap();
        assert!(fine >= coarse);
    }

    #[test]
    fn test_tangent_at_matches_finite_difference() {
        let curve = Curve::from_positions([
            Vec3::ZERO,
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(3.0, -1.0, 1.0),
            Vec3::new(4.0, 0.0, 2.0),
        ]);
        let t = 0.4;
        let h = 1e-3;
        let fd = (curve.position(t + h).unwrap() - curve.position(t - h).unwrap()) / (2.0 * h);
        let analytic = curve.tangent_at(t).unwrap();
        assert!(fd.distance(analytic) < 1e-2 * analytic.length().max(1.0));
    }

    #[test]
    fn test_set_tangent_overrides_and_reverts() {
        let mut curve = Curve::from_positions([Vec3::ZERO, Vec3::X]);
        curve.set_tangent(0, Some(Vec3::Y)).unwrap();
        assert_eq!(curve.point_tangent(0).unwrap(), Vec3::Y);
        curve.set_tangent(0, None).unwrap();
        assert_eq!(curve.point_tangent(0).unwrap(), Vec3::X);
    }
}
