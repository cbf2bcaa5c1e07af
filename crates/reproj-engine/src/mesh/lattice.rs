use std::fmt;

use crate::coords::Point;
use crate::geo::{GridGeometry, PointTransform, TransformError};

use super::MeshKey;

/// Longitude/latitude samples on the `(h + 1) × (v + 1)` corners of a mesh.
///
/// Row-major, row 0 first. Built once per calculation and dropped after.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLattice {
    key: MeshKey,
    points: Vec<Point>,
}

impl WorldLattice {
    /// Samples `f(column, row)` for every lattice corner of `key`.
    pub fn try_from_fn<E>(
        key: MeshKey,
        mut f: impl FnMut(u32, u32) -> Result<Point, E>,
    ) -> Result<Self, E> {
        let columns = key.horizontal_divisions() + 1;
        let rows = key.vertical_divisions() + 1;
        let mut points = Vec::with_capacity(columns as usize * rows as usize);
        for row in 0..rows {
            for column in 0..columns {
                points.push(f(column, row)?);
            }
        }
        Ok(Self { key, points })
    }

    /// Wraps precomputed samples; `None` if the count does not match `key`.
    pub fn from_points(key: MeshKey, points: Vec<Point>) -> Option<Self> {
        let expected =
            (key.horizontal_divisions() as usize + 1) * (key.vertical_divisions() as usize + 1);
        (points.len() == expected).then_some(Self { key, points })
    }

    #[inline]
    pub fn key(&self) -> MeshKey {
        self.key
    }

    #[inline]
    pub fn columns(&self) -> u32 {
        self.key.horizontal_divisions() + 1
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.key.vertical_divisions() + 1
    }

    pub fn get(&self, column: u32, row: u32) -> Point {
        self.points[row as usize * self.columns() as usize + column as usize]
    }

    #[inline]
    pub fn strip_count(&self) -> u32 {
        self.key.vertical_divisions()
    }

    /// Points of triangle strip `strip`, alternating rows `strip` and `strip + 1`.
    pub fn strip(&self, strip: u32) -> impl Iterator<Item = Point> + '_ {
        (0..self.key.strip_len()).map(move |j| self.get(j / 2, strip + j % 2))
    }
}

/// Chooses mesh density and samples the source grid.
pub trait LatticeSampler: Send + Sync + fmt::Debug {
    /// Key for meshes over `source`; equal keys must mean equal lattice layouts.
    fn key(&self, source: &GridGeometry) -> MeshKey;

    /// Longitude/latitude of every lattice corner.
    fn sample(
        &self,
        source: &GridGeometry,
        key: MeshKey,
        to_lat_lon: &dyn PointTransform,
    ) -> Result<WorldLattice, TransformError>;
}

/// Uniform sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    /// Source pixels per mesh division along each axis.
    pub pixels_per_division: f64,
    pub max_divisions: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            pixels_per_division: 4.0,
            max_divisions: 256,
        }
    }
}

/// Evenly spaced lattice over the source grid, corners on pixel edges.
#[derive(Debug, Clone, Default)]
pub struct UniformSampler {
    config: SamplerConfig,
}

impl UniformSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    fn divisions(&self, span: u32) -> u32 {
        let per = self.config.pixels_per_division.max(f64::MIN_POSITIVE);
        let wanted = (f64::from(span) / per).ceil();
        (wanted as u32).clamp(1, self.config.max_divisions.max(1))
    }
}

impl LatticeSampler for UniformSampler {
    fn key(&self, source: &GridGeometry) -> MeshKey {
        MeshKey::new(
            self.divisions(source.width()),
            self.divisions(source.height()),
            0,
        )
    }

    fn sample(
        &self,
        source: &GridGeometry,
        key: MeshKey,
        to_lat_lon: &dyn PointTransform,
    ) -> Result<WorldLattice, TransformError> {
        let dx = f64::from(source.width()) / f64::from(key.horizontal_divisions());
        let dy = f64::from(source.height()) / f64::from(key.vertical_divisions());
        // Pixel centers are integral, so the outer edges sit at -0.5.
        WorldLattice::try_from_fn(key, |column, row| {
            let pixel = Point::new(
                -0.5 + f64::from(column) * dx,
                -0.5 + f64::from(row) * dy,
            );
            to_lat_lon.transform(pixel)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::geo::Equirectangular;
    use approx::assert_relative_eq;

    fn world(width: u32, height: u32) -> GridGeometry {
        GridGeometry::covering(
            width,
            height,
            Point::new(-180.0, -90.0),
            Point::new(180.0, 90.0),
            Arc::new(Equirectangular::geographic()),
        )
    }

    // ── keys ──────────────────────────────────────────────────────────────

    #[test]
    fn divisions_follow_pixel_density() {
        let sampler = UniformSampler::default();
        let key = sampler.key(&world(360, 180));
        assert_eq!(key, MeshKey::new(90, 45, 0));
    }

    #[test]
    fn divisions_are_clamped() {
        let sampler = UniformSampler::new(SamplerConfig {
            pixels_per_division: 1.0,
            max_divisions: 16,
        });
        assert_eq!(sampler.key(&world(360, 1)), MeshKey::new(16, 1, 0));
        assert_eq!(sampler.key(&world(1, 1)), MeshKey::new(1, 1, 0));
    }

    // ── sampling ──────────────────────────────────────────────────────────

    #[test]
    fn corners_land_on_outer_pixel_edges() {
        let source = world(360, 180);
        let sampler = UniformSampler::default();
        let key = sampler.key(&source);
        let to_ll = source.to_lat_lon().unwrap();
        let lattice = sampler.sample(&source, key, &to_ll).unwrap();

        assert_eq!((lattice.columns(), lattice.rows()), (91, 46));
        let first = lattice.get(0, 0);
        assert_relative_eq!(first.x, -180.0, epsilon = 1e-9);
        assert_relative_eq!(first.y, 90.0, epsilon = 1e-9);
        let last = lattice.get(90, 45);
        assert_relative_eq!(last.x, 180.0, epsilon = 1e-9);
        assert_relative_eq!(last.y, -90.0, epsilon = 1e-9);
    }

    #[test]
    fn strips_interleave_rows() {
        let key = MeshKey::new(2, 1, 0);
        let lattice =
            WorldLattice::try_from_fn::<()>(key, |c, r| Ok(Point::new(c.into(), r.into()))).unwrap();
        let strip: Vec<_> = lattice.strip(0).collect();
        assert_eq!(
            strip,
            vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(2.0, 0.0),
                Point::new(2.0, 1.0),
            ]
        );
    }

    #[test]
    fn from_points_checks_count() {
        let key = MeshKey::new(1, 1, 0);
        assert!(WorldLattice::from_points(key, vec![Point::default(); 4]).is_some());
        assert!(WorldLattice::from_points(key, vec![Point::default(); 3]).is_none());
    }
}
