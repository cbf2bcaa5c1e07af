//! Shared fixtures for mesh integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use reproj_engine::cache::SharedCoordinateCache;
use reproj_engine::coords::Point;
use reproj_engine::device::{RecordedBuffer, RecordingDevice, RecordingPainter};
use reproj_engine::geo::{
    Equirectangular, GridGeometry, MapProjection, PointTransform, TransformError,
};
use reproj_engine::mesh::{
    LatticeSampler, Mesh, MeshKey, PaintProperties, PaintStatus, SamplerConfig, UniformSampler,
    WorldLattice,
};
use reproj_engine::scheduler::DeferredScheduler;

// ── grids ─────────────────────────────────────────────────────────────────

/// North-up lat/lon grid covering `min..max` degrees.
pub fn lat_lon_grid(width: u32, height: u32, min: (f64, f64), max: (f64, f64)) -> GridGeometry {
    projected_grid(width, height, min, max, Arc::new(Equirectangular::geographic()))
}

pub fn projected_grid(
    width: u32,
    height: u32,
    min: (f64, f64),
    max: (f64, f64),
    projection: Arc<dyn MapProjection>,
) -> GridGeometry {
    GridGeometry::covering(
        width,
        height,
        Point::new(min.0, min.1),
        Point::new(max.0, max.1),
        projection,
    )
}

/// 1° global grid centered on the prime meridian.
pub fn world_grid() -> GridGeometry {
    lat_lon_grid(360, 180, (-180.0, -90.0), (180.0, 90.0))
}

// ── samplers ──────────────────────────────────────────────────────────────

/// Sampler returning a fixed lattice whatever the source grid.
#[derive(Debug)]
pub struct FixedLattice {
    pub lattice: WorldLattice,
}

impl FixedLattice {
    /// Every row uses `lons`; row `r` sits at latitude `top - r * step`.
    pub fn rows(lons: &[f64], rows: u32, top: f64, step: f64) -> Self {
        let key = MeshKey::new(lons.len() as u32 - 1, rows - 1, 42);
        let lattice = WorldLattice::try_from_fn::<()>(key, |c, r| {
            Ok(Point::new(lons[c as usize], top - f64::from(r) * step))
        })
        .unwrap();
        Self { lattice }
    }
}

impl LatticeSampler for FixedLattice {
    fn key(&self, _source: &GridGeometry) -> MeshKey {
        self.lattice.key()
    }

    fn sample(
        &self,
        _source: &GridGeometry,
        _key: MeshKey,
        _to_lat_lon: &dyn PointTransform,
    ) -> Result<WorldLattice, TransformError> {
        Ok(self.lattice.clone())
    }
}

pub fn uniform_sampler(pixels_per_division: f64) -> Arc<dyn LatticeSampler> {
    Arc::new(UniformSampler::new(SamplerConfig {
        pixels_per_division,
        max_divisions: 128,
    }))
}

// ── projections ───────────────────────────────────────────────────────────

/// Lat/lon projection that sends one longitude/latitude to a huge value,
/// like the antipode of a stereographic origin.
#[derive(Debug)]
pub struct Singularity {
    pub at: Point,
}

impl MapProjection for Singularity {
    fn name(&self) -> &str {
        "singularity"
    }

    fn project(&self, lon_lat: Point) -> Result<Point, TransformError> {
        if lon_lat.distance(self.at) < 1e-6 {
            Ok(Point::new(1e12, -1e12))
        } else {
            Ok(lon_lat)
        }
    }

    fn unproject(&self, crs: Point) -> Result<Point, TransformError> {
        Ok(crs)
    }

    fn central_meridian(&self) -> Option<f64> {
        None
    }
}

/// Lat/lon projection that cannot project one longitude/latitude.
#[derive(Debug)]
pub struct Hole {
    pub at: Point,
}

impl MapProjection for Hole {
    fn name(&self) -> &str {
        "hole"
    }

    fn project(&self, lon_lat: Point) -> Result<Point, TransformError> {
        if lon_lat.distance(self.at) < 1e-6 {
            Err(TransformError::OutOfDomain {
                transform: "hole",
                x: lon_lat.x,
                y: lon_lat.y,
            })
        } else {
            Ok(lon_lat)
        }
    }

    fn unproject(&self, crs: Point) -> Result<Point, TransformError> {
        Ok(crs)
    }

    fn central_meridian(&self) -> Option<f64> {
        None
    }
}

// ── harness ───────────────────────────────────────────────────────────────

/// Software device, deferred scheduler and one shared cache.
pub struct Harness {
    pub device: RecordingDevice,
    pub scheduler: Arc<DeferredScheduler>,
    pub cache: Arc<SharedCoordinateCache<RecordedBuffer>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_device(RecordingDevice::single_draw())
    }

    pub fn with_device(device: RecordingDevice) -> Self {
        reproj_engine::logging::init_logging(Default::default());
        Self {
            device,
            scheduler: Arc::new(DeferredScheduler::new()),
            cache: Arc::new(SharedCoordinateCache::new()),
        }
    }

    pub fn mesh(
        &self,
        source: GridGeometry,
        target: GridGeometry,
        sampler: Arc<dyn LatticeSampler>,
    ) -> Mesh<RecordedBuffer> {
        Mesh::create(
            source,
            target,
            sampler,
            self.scheduler.clone(),
            Arc::clone(&self.cache),
        )
        .unwrap()
    }

    /// Runs pending calculations and paints once.
    pub fn calculate_and_paint(
        &self,
        mesh: &Mesh<RecordedBuffer>,
        painter: &mut RecordingPainter<'_>,
    ) -> PaintStatus {
        self.scheduler.run_pending();
        mesh.paint(painter, &PaintProperties::default()).unwrap()
    }
}

/// Largest axis-aligned step between a strip point and its two predecessors.
pub fn max_strip_step(segment: &[Point]) -> f64 {
    let mut max = 0.0f64;
    for i in 1..segment.len() {
        for back in 1..=2.min(i) {
            let a = segment[i];
            let b = segment[i - back];
            max = max.max((a.x - b.x).abs()).max((a.y - b.y).abs());
        }
    }
    max
}
