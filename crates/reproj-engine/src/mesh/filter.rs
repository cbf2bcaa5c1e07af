use crate::coords::Point;
use crate::geo::GridGeometry;
use crate::geometry::{GeometryBuffer, GeometryError};

use super::MeshKey;

/// Drops triangles too large to come from one reasonable mesh cell.
///
/// Projection singularities (the antipode of a stereographic origin, say)
/// turn single cells into triangles spanning the whole map. Rather than
/// detect each singularity, any strip point farther than `limit` target
/// pixels from either of its two predecessors, along x or y, starts a new
/// strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LargeTriangleFilter {
    limit: f64,
}

impl LargeTriangleFilter {
    pub fn new(key: MeshKey, target: &GridGeometry, source: &GridGeometry) -> Self {
        // Pixel products overflow integers on large grids.
        let limit = (target.pixel_count() * source.pixel_count() / key.division_count()).sqrt();
        Self::with_limit(limit)
    }

    pub fn with_limit(limit: f64) -> Self {
        Self { limit }
    }

    #[inline]
    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Axis-aligned check; NaN coordinates never pass.
    #[inline]
    fn accepts(&self, a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < self.limit && (a.y - b.y).abs() < self.limit
    }

    /// Splits a strip before every rejected point.
    ///
    /// Runs are returned in order and together cover every input point.
    pub fn split<'a>(&self, segment: &'a [Point]) -> Vec<&'a [Point]> {
        let mut runs = Vec::new();
        let mut start = 0;
        for i in 0..segment.len() {
            let len = i - start;
            let next = segment[i];
            let valid = (len < 1 || self.accepts(next, segment[i - 1]))
                && (len < 2 || self.accepts(next, segment[i - 2]));
            if !valid {
                runs.push(&segment[start..i]);
                start = i;
            }
        }
        runs.push(&segment[start..]);
        runs
    }

    /// Filters `segment` into `out`.
    pub fn add_segment<B>(
        &self,
        segment: &[Point],
        out: &mut GeometryBuffer<B>,
    ) -> Result<(), GeometryError> {
        for run in self.split(segment) {
            out.add_segment(run)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(xs: &[(f64, f64)]) -> Vec<Point> {
        xs.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn limit_scales_with_pixels_per_cell() {
        use crate::geo::Equirectangular;
        use std::sync::Arc;
        let grid = |w, h| {
            GridGeometry::covering(
                w,
                h,
                Point::new(0.0, 0.0),
                Point::new(1.0, 1.0),
                Arc::new(Equirectangular::geographic()),
            )
        };
        let filter = LargeTriangleFilter::new(MeshKey::new(10, 10, 0), &grid(100, 100), &grid(10, 10));
        assert!((filter.limit() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn small_strip_is_untouched() {
        let filter = LargeTriangleFilter::with_limit(10.0);
        let strip = pts(&[(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)]);
        let runs = filter.split(&strip);
        assert_eq!(runs, vec![&strip[..]]);
    }

    #[test]
    fn far_point_is_isolated() {
        let filter = LargeTriangleFilter::with_limit(10.0);
        let strip = pts(&[
            (0.0, 0.0),
            (0.0, 1.0),
            (1e9, 0.0),
            (1.0, 1.0),
            (2.0, 0.0),
        ]);
        let runs = filter.split(&strip);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].len(), 2);
        assert_eq!(runs[1], &strip[2..3]);
        assert_eq!(runs[2].len(), 2);
        assert_eq!(runs.iter().map(|r| r.len()).sum::<usize>(), strip.len());
    }

    #[test]
    fn second_predecessor_is_checked_too() {
        let filter = LargeTriangleFilter::with_limit(10.0);
        // Close to its neighbour, far from the point before it.
        let strip = pts(&[(0.0, 0.0), (9.0, 0.0), (18.0, 0.0)]);
        assert_eq!(filter.split(&strip).len(), 2);
    }

    #[test]
    fn nan_points_never_connect() {
        let filter = LargeTriangleFilter::with_limit(10.0);
        let strip = vec![Point::new(0.0, 0.0), Point::nan(), Point::new(1.0, 0.0)];
        assert_eq!(filter.split(&strip).len(), 3);
    }

    #[test]
    fn runs_land_in_the_buffer() {
        let filter = LargeTriangleFilter::with_limit(10.0);
        let strip = pts(&[(0.0, 0.0), (0.0, 1.0), (500.0, 0.0)]);
        let mut out = GeometryBuffer::<()>::vertices("test");
        filter.add_segment(&strip, &mut out).unwrap();
        assert_eq!(out.segment_count(), 2);
        assert_eq!(out.point_count(), 3);
    }
}
