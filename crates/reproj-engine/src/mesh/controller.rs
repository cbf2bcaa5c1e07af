use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::cache::{SharedCoordinateCache, SharedCoordinates};
use crate::coords::Point;
use crate::device::{DrawPass, MeshDevice, MeshPainter, StripDraw, TextureWrap};
use crate::geo::{source_wrap_columns, GridGeometry, GridToLatLon, LatLonToGrid, WorldWrapChecker};
use crate::scheduler::{Job, JobHandle, Scheduler};

use super::calculate::{Calculation, MeshGeometry};
use super::{LatticeSampler, MeshError, MeshKey, MeshState, PaintProperties, PaintStatus};

/// Geometry uploaded to the device plus the shared texture coordinates.
struct CompiledMesh<B> {
    geometry: MeshGeometry<B>,
    shared: Arc<SharedCoordinates<B>>,
}

/// The single state word guarding every buffer a mesh owns.
enum Phase<B> {
    New,
    Calculating,
    Calculated(MeshGeometry<B>),
    Compiled(CompiledMesh<B>),
    Invalid,
}

impl<B> Phase<B> {
    fn state(&self) -> MeshState {
        match self {
            Phase::New => MeshState::New,
            Phase::Calculating => MeshState::Calculating,
            Phase::Calculated(_) => MeshState::Calculated,
            Phase::Compiled(_) => MeshState::Compiled,
            Phase::Invalid => MeshState::Invalid,
        }
    }
}

/// Everything fixed by `initialize`.
struct Inputs {
    source: GridGeometry,
    target: GridGeometry,
    key: MeshKey,
    to_lat_lon: GridToLatLon,
    to_target: LatLonToGrid,
    wraps_texture: bool,
}

/// CPU copies of a calculated mesh, for inspection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshSnapshot {
    /// Target-pixel strips after wrap splitting and filtering.
    pub primary: Vec<Vec<Point>>,
    /// Wrap-fill triangles and quads, in target pixels.
    pub wrap_fill: Vec<Vec<Point>>,
    /// Texture coordinates of `wrap_fill`, flattened.
    pub wrap_fill_tex: Vec<Point>,
}

/// A reprojected grid mesh.
///
/// Construct with [`Mesh::new`], then call [`Mesh::initialize`] exactly once
/// (or use [`Mesh::create`]). The calculation runs on the scheduler; the
/// render thread calls [`Mesh::paint`] each frame until it reports
/// [`PaintStatus::Painted`].
///
/// A mesh is reference counted for owners that share it: [`Mesh::acquire`]
/// adds a reference and [`Mesh::dispose`] drops one. The last dispose cancels
/// pending work and releases every device buffer.
pub struct Mesh<B> {
    phase: Arc<Mutex<Phase<B>>>,
    inputs: OnceLock<Arc<Inputs>>,
    job: Mutex<Option<JobHandle>>,
    ref_count: AtomicUsize,
    sampler: Arc<dyn LatticeSampler>,
    scheduler: Arc<dyn Scheduler>,
    cache: Arc<SharedCoordinateCache<B>>,
}

impl<B> Mesh<B>
where
    B: Send + Sync + 'static,
{
    /// A mesh in the `New` state with one reference.
    pub fn new(
        sampler: Arc<dyn LatticeSampler>,
        scheduler: Arc<dyn Scheduler>,
        cache: Arc<SharedCoordinateCache<B>>,
    ) -> Self {
        Self {
            phase: Arc::new(Mutex::new(Phase::New)),
            inputs: OnceLock::new(),
            job: Mutex::new(None),
            ref_count: AtomicUsize::new(1),
            sampler,
            scheduler,
            cache,
        }
    }

    /// [`new`](Self::new) followed by [`initialize`](Self::initialize).
    pub fn create(
        source: GridGeometry,
        target: GridGeometry,
        sampler: Arc<dyn LatticeSampler>,
        scheduler: Arc<dyn Scheduler>,
        cache: Arc<SharedCoordinateCache<B>>,
    ) -> Result<Self, MeshError> {
        let mesh = Self::new(sampler, scheduler, cache);
        mesh.initialize(source, target)?;
        Ok(mesh)
    }

    /// Derives transforms and schedules the calculation.
    ///
    /// A transform that cannot be derived invalidates the mesh.
    pub fn initialize(&self, source: GridGeometry, target: GridGeometry) -> Result<(), MeshError> {
        let mut phase = self.phase.lock();
        if !matches!(*phase, Phase::New) || self.inputs.get().is_some() {
            return Err(MeshError::Contract("initialize called more than once"));
        }

        let derived = source
            .to_lat_lon()
            .map_err(|source| MeshError::Configuration {
                what: "source grid to lat/lon",
                source,
            })
            .and_then(|to_lat_lon| {
                let to_target = target.from_lat_lon().map_err(|source| {
                    MeshError::Configuration {
                        what: "lat/lon to target grid",
                        source,
                    }
                })?;
                Ok((to_lat_lon, to_target))
            });
        let (to_lat_lon, to_target) = match derived {
            Ok(t) => t,
            Err(e) => {
                *phase = Phase::Invalid;
                return Err(e);
            }
        };

        let key = self.sampler.key(&source);
        let wraps_texture = source_wrap_columns(&source) == Some(source.width());
        let inputs = Arc::new(Inputs {
            source,
            target,
            key,
            to_lat_lon,
            to_target,
            wraps_texture,
        });
        if self.inputs.set(Arc::clone(&inputs)).is_err() {
            return Err(MeshError::Contract("initialize called more than once"));
        }

        *phase = Phase::Calculating;
        log::debug!("mesh {key} calculating");

        let (job, handle) = Job::new(format!("mesh {key}"), {
            let phase = Arc::clone(&self.phase);
            let sampler = Arc::clone(&self.sampler);
            move || calculate(&phase, &inputs, sampler.as_ref())
        });
        *self.job.lock() = Some(handle);
        drop(phase);

        self.scheduler.schedule(job);
        Ok(())
    }

    /// Draws the mesh if it can, compiling it first when freshly calculated.
    ///
    /// Painting a mesh that was never initialized is a contract error. An
    /// invalid mesh reports [`PaintStatus::Error`] and draws nothing; one still
    /// calculating requests a repaint.
    pub fn paint<P>(
        &self,
        painter: &mut P,
        properties: &PaintProperties,
    ) -> Result<PaintStatus, MeshError>
    where
        P: MeshPainter,
        P::Device: MeshDevice<Buffer = B>,
    {
        let mut phase = self.phase.lock();
        match &*phase {
            Phase::New => {
                log::error!("mesh painted before initialize");
                return Err(MeshError::Contract("paint called before initialize"));
            }
            Phase::Invalid => return Ok(PaintStatus::Error),
            Phase::Calculating => {
                painter.request_repaint();
                return Ok(PaintStatus::Repaint);
            }
            Phase::Calculated(_) | Phase::Compiled(_) => {}
        }

        if let Phase::Calculated(_) = &*phase {
            // Invalid until the upload succeeds.
            if let Phase::Calculated(geometry) = std::mem::replace(&mut *phase, Phase::Invalid) {
                let compiled = self.compile(geometry, painter.device()).inspect_err(|e| {
                    log::error!("mesh compile failed: {e}");
                })?;
                *phase = Phase::Compiled(compiled);
                log::debug!("mesh {} compiled", self.key_or_default());
            }
        }

        let Phase::Compiled(compiled) = &*phase else {
            return Ok(PaintStatus::Error);
        };
        let wrap = if self.wraps_texture() {
            TextureWrap::Repeat
        } else {
            TextureWrap::Clamp
        };
        painter.set_texture_wrap(wrap);

        let primary = &compiled.geometry.primary;
        if let (Some(vertices), Some(tex_coords), Some(ranges)) = (
            primary.device_buffer(),
            compiled.shared.buffer(),
            primary.draw_ranges(),
        ) {
            painter.draw_strips(StripDraw {
                pass: DrawPass::Primary,
                vertices,
                tex_coords,
                ranges,
                alpha: properties.alpha,
            });
        }

        if let Some(fill) = &compiled.geometry.wrap_fill {
            if let (Some(vertices), Some(tex_coords), Some(ranges)) = (
                fill.vertices.device_buffer(),
                fill.tex_coords.device_buffer(),
                fill.vertices.draw_ranges(),
            ) {
                painter.draw_strips(StripDraw {
                    pass: DrawPass::WrapFill,
                    vertices,
                    tex_coords,
                    ranges,
                    alpha: properties.alpha,
                });
            }
        }

        Ok(PaintStatus::Painted)
    }

    /// Uploads calculated geometry. Called with the phase lock held; takes the
    /// cache lock second.
    fn compile<D>(&self, mut geometry: MeshGeometry<B>, device: &D) -> Result<CompiledMesh<B>, MeshError>
    where
        D: MeshDevice<Buffer = B>,
    {
        let key = self.key_or_default();
        let shared = self.cache.get(key, device)?;

        let uploaded = (|| {
            geometry.primary.compile(device)?;
            if let Some(fill) = &mut geometry.wrap_fill {
                fill.vertices.compile(device)?;
                fill.tex_coords.compile(device)?;
            }
            Ok::<_, MeshError>(())
        })();

        if let Err(e) = uploaded {
            geometry.dispose();
            drop(shared);
            self.cache.remove(key);
            return Err(e);
        }
        Ok(CompiledMesh { geometry, shared })
    }

    /// Adds an owner reference. Fails on a mesh already torn down.
    pub fn acquire(&self) -> bool {
        self.ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count > 0).then_some(count + 1)
            })
            .is_ok()
    }

    /// Drops an owner reference; the last one tears the mesh down.
    ///
    /// Extra calls after teardown are ignored.
    pub fn dispose(&self) {
        match self
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1))
        {
            Ok(1) => self.teardown(),
            Ok(_) => {}
            Err(_) => log::debug!("mesh {} already disposed", self.key_or_default()),
        }
    }

    fn teardown(&self) {
        let mut phase = self.phase.lock();

        if let Some(job) = self.job.lock().take() {
            if self.scheduler.cancel(&job) {
                log::debug!("cancelled pending calculation '{}'", job.name());
            }
        }

        match std::mem::replace(&mut *phase, Phase::Invalid) {
            Phase::Compiled(CompiledMesh {
                mut geometry,
                shared,
            }) => {
                geometry.dispose();
                let key = shared.key();
                drop(shared);
                self.cache.remove(key);
            }
            Phase::Calculated(mut geometry) => geometry.dispose(),
            Phase::New | Phase::Calculating | Phase::Invalid => {}
        }
        log::debug!("mesh {} disposed", self.key_or_default());
    }

    /// Builds and initializes a mesh over the same source for a new target.
    ///
    /// The caller disposes this mesh when the new one is in place.
    pub fn reproject(&self, target: GridGeometry) -> Result<Mesh<B>, MeshError> {
        let inputs = self
            .inputs
            .get()
            .ok_or(MeshError::Contract("reproject called before initialize"))?;
        Mesh::create(
            inputs.source.clone(),
            target,
            Arc::clone(&self.sampler),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.cache),
        )
    }
}

impl<B> Mesh<B> {
    pub fn state(&self) -> MeshState {
        self.phase.lock().state()
    }

    /// Lattice key, known once initialized.
    pub fn key(&self) -> Option<MeshKey> {
        self.inputs.get().map(|i| i.key)
    }

    fn key_or_default(&self) -> MeshKey {
        self.key().unwrap_or_else(|| MeshKey::new(1, 1, 0))
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }

    /// True when the source repeats the globe across exactly its width.
    pub fn wraps_texture(&self) -> bool {
        self.inputs.get().is_some_and(|i| i.wraps_texture)
    }

    pub fn source_geometry(&self) -> Option<&GridGeometry> {
        self.inputs.get().map(|i| &i.source)
    }

    pub fn target_geometry(&self) -> Option<&GridGeometry> {
        self.inputs.get().map(|i| &i.target)
    }

    /// Copies of the calculated geometry; `None` unless `Calculated`.
    pub fn geometry_snapshot(&self) -> Option<MeshSnapshot> {
        let phase = self.phase.lock();
        let Phase::Calculated(geometry) = &*phase else {
            return None;
        };
        let mut snapshot = MeshSnapshot {
            primary: geometry.primary.segments(),
            ..MeshSnapshot::default()
        };
        if let Some(fill) = &geometry.wrap_fill {
            snapshot.wrap_fill = fill.vertices.segments();
            snapshot.wrap_fill_tex = fill.tex_coords.segments().concat();
        }
        Some(snapshot)
    }
}

impl<B> Drop for Mesh<B> {
    fn drop(&mut self) {
        if self.ref_count.swap(0, Ordering::AcqRel) == 0 {
            return;
        }
        // Dropped while still referenced: release what the mesh holds.
        let phase = std::mem::replace(&mut *self.phase.lock(), Phase::Invalid);
        if let Some(job) = self.job.get_mut().take() {
            job.cancel();
        }
        if let Phase::Compiled(CompiledMesh { shared, .. }) = phase {
            let key = shared.key();
            drop(shared);
            self.cache.remove(key);
        }
    }
}

/// Background calculation body.
///
/// Runs only while the mesh is still calculating, and commits only if it still
/// is afterwards; a mesh disposed meanwhile discards the work silently.
fn calculate<B>(phase: &Mutex<Phase<B>>, inputs: &Inputs, sampler: &dyn LatticeSampler) {
    if !matches!(*phase.lock(), Phase::Calculating) {
        log::debug!("mesh {} no longer calculating; skipping", inputs.key);
        return;
    }

    let result = sampler
        .sample(&inputs.source, inputs.key, &inputs.to_lat_lon)
        .map_err(MeshError::from)
        .and_then(|lattice| {
            let wrap_check = WorldWrapChecker::new(&inputs.target);
            Calculation {
                lattice: &lattice,
                source: &inputs.source,
                target: &inputs.target,
                to_target: &inputs.to_target,
                wrap_check: &wrap_check,
            }
            .run()
        });

    let mut phase = phase.lock();
    if !matches!(*phase, Phase::Calculating) {
        log::debug!("mesh {} disposed during calculation; discarding", inputs.key);
        return;
    }
    *phase = match result {
        Ok(geometry) => {
            log::debug!(
                "mesh {} calculated: {} points in {} strips",
                inputs.key,
                geometry.primary.point_count(),
                geometry.primary.segment_count()
            );
            Phase::Calculated(geometry)
        }
        Err(e) => {
            log::error!("error calculating mesh {}: {e}", inputs.key);
            Phase::Invalid
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{RecordedBuffer, RecordingDevice, RecordingPainter};
    use crate::geo::Equirectangular;
    use crate::mesh::{SamplerConfig, UniformSampler};
    use crate::scheduler::DeferredScheduler;

    struct Fixture {
        device: RecordingDevice,
        scheduler: Arc<DeferredScheduler>,
        cache: Arc<SharedCoordinateCache<RecordedBuffer>>,
        sampler: Arc<dyn LatticeSampler>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                device: RecordingDevice::single_draw(),
                scheduler: Arc::new(DeferredScheduler::new()),
                cache: Arc::new(SharedCoordinateCache::new()),
                sampler: Arc::new(UniformSampler::new(SamplerConfig {
                    pixels_per_division: 10.0,
                    max_divisions: 64,
                })),
            }
        }

        fn mesh(&self) -> Mesh<RecordedBuffer> {
            Mesh::new(
                Arc::clone(&self.sampler),
                self.scheduler.clone(),
                Arc::clone(&self.cache),
            )
        }
    }

    fn grid(width: u32, height: u32, min: (f64, f64), max: (f64, f64)) -> GridGeometry {
        GridGeometry::covering(
            width,
            height,
            Point::new(min.0, min.1),
            Point::new(max.0, max.1),
            Arc::new(Equirectangular::geographic()),
        )
    }

    fn regional() -> GridGeometry {
        grid(40, 20, (0.0, 0.0), (40.0, 20.0))
    }

    // ── state machine ─────────────────────────────────────────────────────

    #[test]
    fn paint_before_initialize_is_a_contract_error() {
        let fx = Fixture::new();
        let mesh = fx.mesh();
        let mut painter = RecordingPainter::new(&fx.device);
        let err = mesh.paint(&mut painter, &PaintProperties::default()).unwrap_err();
        assert!(matches!(err, MeshError::Contract(_)));
        assert_eq!(mesh.state(), MeshState::New);
    }

    #[test]
    fn calculating_mesh_requests_repaint() {
        let fx = Fixture::new();
        let mesh = fx.mesh();
        mesh.initialize(regional(), regional()).unwrap();
        assert_eq!(mesh.state(), MeshState::Calculating);

        let mut painter = RecordingPainter::new(&fx.device);
        let status = mesh.paint(&mut painter, &PaintProperties::default()).unwrap();
        assert_eq!(status, PaintStatus::Repaint);
        assert!(painter.repaint_requested());
        assert!(painter.draws().is_empty());
        assert_eq!(fx.device.buffers_created(), 0);
    }

    #[test]
    fn calculated_mesh_compiles_then_draws() {
        let fx = Fixture::new();
        let mesh = fx.mesh();
        mesh.initialize(regional(), regional()).unwrap();
        fx.scheduler.run_pending();
        assert_eq!(mesh.state(), MeshState::Calculated);

        let mut painter = RecordingPainter::new(&fx.device);
        let status = mesh.paint(&mut painter, &PaintProperties { alpha: 0.5 }).unwrap();
        assert_eq!(status, PaintStatus::Painted);
        assert_eq!(mesh.state(), MeshState::Compiled);
        assert_eq!(painter.draws().len(), 1);
        assert_eq!(painter.draws()[0].pass, DrawPass::Primary);
        assert_eq!(painter.draws()[0].alpha, 0.5);
        assert_eq!(painter.draws()[0].wrap, TextureWrap::Clamp);
        assert_eq!(fx.cache.ref_count(mesh.key().unwrap()), 1);
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let fx = Fixture::new();
        let mesh = fx.mesh();
        mesh.initialize(regional(), regional()).unwrap();
        assert!(matches!(
            mesh.initialize(regional(), regional()),
            Err(MeshError::Contract(_))
        ));
    }

    #[test]
    fn singular_target_is_a_configuration_error() {
        let fx = Fixture::new();
        let mesh = fx.mesh();
        let singular = GridGeometry::new(
            10,
            10,
            crate::coords::Affine2::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            Arc::new(Equirectangular::geographic()),
        );
        let err = mesh.initialize(regional(), singular).unwrap_err();
        assert!(matches!(err, MeshError::Configuration { .. }));
        assert_eq!(mesh.state(), MeshState::Invalid);
    }

    #[test]
    fn failed_upload_invalidates_and_releases_cache() {
        let fx = Fixture::new();
        let mesh = fx.mesh();
        mesh.initialize(regional(), regional()).unwrap();
        fx.scheduler.run_pending();

        // The shared coordinates upload fine, then the mesh upload fails.
        let key = mesh.key().unwrap();
        let warm = fx.cache.get(key, &fx.device).unwrap();
        fx.device.set_fail_uploads(true);

        let mut painter = RecordingPainter::new(&fx.device);
        let err = mesh.paint(&mut painter, &PaintProperties::default()).unwrap_err();
        assert!(matches!(err, MeshError::Device(_)));
        assert_eq!(mesh.state(), MeshState::Invalid);
        assert_eq!(fx.cache.ref_count(key), 1);

        let status = mesh.paint(&mut painter, &PaintProperties::default()).unwrap();
        assert_eq!(status, PaintStatus::Error);
        drop(warm);
        fx.cache.remove(key);
    }

    // ── disposal ──────────────────────────────────────────────────────────

    #[test]
    fn dispose_before_calculation_cancels_job() {
        let fx = Fixture::new();
        let mesh = fx.mesh();
        mesh.initialize(regional(), regional()).unwrap();
        mesh.dispose();

        assert_eq!(fx.scheduler.run_pending(), 0);
        assert_eq!(mesh.state(), MeshState::Invalid);
    }

    #[test]
    fn dispose_twice_releases_cache_once() {
        let fx = Fixture::new();
        let a = fx.mesh();
        let b = fx.mesh();
        a.initialize(regional(), regional()).unwrap();
        b.initialize(regional(), regional()).unwrap();
        fx.scheduler.run_pending();

        let mut painter = RecordingPainter::new(&fx.device);
        a.paint(&mut painter, &PaintProperties::default()).unwrap();
        b.paint(&mut painter, &PaintProperties::default()).unwrap();
        let key = a.key().unwrap();
        assert_eq!(fx.cache.ref_count(key), 2);

        a.dispose();
        a.dispose();
        assert_eq!(fx.cache.ref_count(key), 1);
        assert_eq!(a.state(), MeshState::Invalid);
        assert_eq!(b.state(), MeshState::Compiled);
    }

    #[test]
    fn acquired_mesh_survives_one_dispose() {
        let fx = Fixture::new();
        let mesh = fx.mesh();
        mesh.initialize(regional(), regional()).unwrap();
        assert!(mesh.acquire());
        mesh.dispose();
        assert_eq!(mesh.ref_count(), 1);
        assert_eq!(mesh.state(), MeshState::Calculating);
        mesh.dispose();
        assert_eq!(mesh.state(), MeshState::Invalid);
        assert!(!mesh.acquire());
    }

    #[test]
    fn drop_releases_device_buffers() {
        let fx = Fixture::new();
        {
            let mesh = fx.mesh();
            mesh.initialize(regional(), regional()).unwrap();
            fx.scheduler.run_pending();
            let mut painter = RecordingPainter::new(&fx.device);
            mesh.paint(&mut painter, &PaintProperties::default()).unwrap();
            assert!(fx.device.live_buffers() > 0);
        }
        assert_eq!(fx.device.live_buffers(), 0);
        assert!(fx.cache.is_empty());
    }

    // ── introspection ─────────────────────────────────────────────────────

    #[test]
    fn worldwide_source_repeats_texture() {
        let fx = Fixture::new();
        let world = grid(360, 180, (-180.0, -90.0), (180.0, 90.0));
        let mesh = Mesh::create(
            world.clone(),
            world,
            Arc::clone(&fx.sampler),
            fx.scheduler.clone(),
            Arc::clone(&fx.cache),
        )
        .unwrap();
        assert!(mesh.wraps_texture());
        assert!(!fx.mesh().wraps_texture());
    }

    #[test]
    fn reproject_builds_a_fresh_mesh() {
        let fx = Fixture::new();
        let mesh = fx.mesh();
        mesh.initialize(regional(), regional()).unwrap();
        let target = grid(80, 40, (0.0, 0.0), (40.0, 20.0));
        let next = mesh.reproject(target).unwrap();
        assert_eq!(next.state(), MeshState::Calculating);
        assert_eq!(next.key(), mesh.key());
        assert_eq!(next.target_geometry().unwrap().width(), 80);
        assert_eq!(next.source_geometry().unwrap().width(), 40);
    }
}
