//! Headless probe: reprojects a 1° global grid onto two world maps, one
//! centered on Greenwich and one on the antimeridian, and reports what the
//! mesh layer built.
//!
//! Draws through wgpu when an adapter is available, through the recording
//! device otherwise (or with `--software`).

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reproj_engine::cache::SharedCoordinateCache;
use reproj_engine::coords::Point;
use reproj_engine::device::{DrawPass, HeadlessInit, RecordingDevice, RecordingPainter, WgpuDevice};
use reproj_engine::geo::{Equirectangular, GridGeometry, MapProjection};
use reproj_engine::logging::{init_logging, LoggingConfig};
use reproj_engine::mesh::{
    LatticeSampler, Mesh, MeshState, PaintProperties, PaintStatus, SamplerConfig, UniformSampler,
};
use reproj_engine::render::{MeshPipeline, WgpuPainter};
use reproj_engine::scheduler::{JobPool, PoolConfig, Scheduler};

const MAX_FRAMES: usize = 600;
const FRAME: Duration = Duration::from_millis(16);
const TARGET_SIZE: (u32, u32) = (720, 360);
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

fn main() -> Result<()> {
    init_logging(LoggingConfig::with_filter("info,reproj_engine=debug,wgpu=warn"));

    let source = world(360, 180, Equirectangular::geographic());
    let targets = vec![
        world(TARGET_SIZE.0, TARGET_SIZE.1, Equirectangular::new(0.0)),
        world(TARGET_SIZE.0, TARGET_SIZE.1, Equirectangular::new(180.0)),
    ];

    let pool = Arc::new(JobPool::new(PoolConfig::default()).context("starting calculator pool")?);
    let scheduler: Arc<dyn Scheduler> = pool.clone();
    let sampler: Arc<dyn LatticeSampler> = Arc::new(UniformSampler::new(SamplerConfig {
        pixels_per_division: 4.0,
        max_divisions: 128,
    }));

    let software = std::env::args().any(|a| a == "--software");
    let gpu = if software {
        None
    } else {
        match WgpuDevice::new_blocking(HeadlessInit::default()) {
            Ok(device) => Some(device),
            Err(e) => {
                log::warn!("no GPU available ({e:#}); using the recording device");
                None
            }
        }
    };

    match gpu {
        Some(device) => run_wgpu(&device, &source, &targets, &sampler, &scheduler)?,
        None => run_recording(&source, &targets, &sampler, &scheduler)?,
    }

    pool.shutdown();
    Ok(())
}

/// Whole-world grid in `projection`, outer pixel edges on ±180°/±90°.
fn world(width: u32, height: u32, projection: Equirectangular) -> GridGeometry {
    let name = projection.name().to_string();
    let central = projection.central_meridian().unwrap_or(0.0);
    log::debug!("{name} {width}x{height} target centered at {central}°");
    GridGeometry::covering(
        width,
        height,
        Point::new(-180.0, -90.0),
        Point::new(180.0, 90.0),
        Arc::new(projection),
    )
}

/// One mesh per target; all but the first are reprojections of it.
fn build_meshes<B>(
    source: &GridGeometry,
    targets: &[GridGeometry],
    sampler: &Arc<dyn LatticeSampler>,
    scheduler: &Arc<dyn Scheduler>,
    cache: &Arc<SharedCoordinateCache<B>>,
) -> Result<Vec<Mesh<B>>>
where
    B: Send + Sync + 'static,
{
    let Some((first, rest)) = targets.split_first() else {
        bail!("no targets");
    };
    let base = Mesh::create(
        source.clone(),
        first.clone(),
        Arc::clone(sampler),
        Arc::clone(scheduler),
        Arc::clone(cache),
    )?;
    let mut meshes = Vec::with_capacity(targets.len());
    for target in rest {
        meshes.push(base.reproject(target.clone())?);
    }
    meshes.insert(0, base);
    Ok(meshes)
}

/// Folds one paint status into "every mesh is done".
fn settled(status: PaintStatus, index: usize) -> bool {
    match status {
        PaintStatus::Painted => true,
        PaintStatus::Repaint => false,
        PaintStatus::Error => {
            log::warn!("mesh {index} is invalid and will not draw");
            true
        }
    }
}

fn dispose_all<B>(meshes: &[Mesh<B>], cache: &SharedCoordinateCache<B>) -> Result<()>
where
    B: Send + Sync + 'static,
{
    for mesh in meshes {
        mesh.dispose();
        debug_assert_eq!(mesh.state(), MeshState::Invalid);
    }
    if !cache.is_empty() {
        bail!("{} shared coordinate entries outlived their meshes", cache.len());
    }
    Ok(())
}

fn run_recording(
    source: &GridGeometry,
    targets: &[GridGeometry],
    sampler: &Arc<dyn LatticeSampler>,
    scheduler: &Arc<dyn Scheduler>,
) -> Result<()> {
    let device = RecordingDevice::default();
    let cache = Arc::new(SharedCoordinateCache::new());
    let meshes = build_meshes(source, targets, sampler, scheduler, &cache)?;
    let props = PaintProperties::default();

    let mut painter = RecordingPainter::new(&device);
    let mut frames = 0;
    loop {
        painter.begin_frame();
        let mut done = true;
        for (i, mesh) in meshes.iter().enumerate() {
            done &= settled(mesh.paint(&mut painter, &props)?, i);
        }
        frames += 1;
        if done {
            break;
        }
        if frames >= MAX_FRAMES {
            bail!("meshes still calculating after {frames} frames");
        }
        thread::sleep(FRAME);
    }

    for draw in painter.draws() {
        let pass = match draw.pass {
            DrawPass::Primary => "primary",
            DrawPass::WrapFill => "wrap fill",
        };
        let points: u32 = draw.strips.iter().map(|&(_, count)| count).sum();
        log::info!(
            "{pass}: {} strips, {points} points, {:?} texture, {} draw calls",
            draw.strips.len(),
            draw.wrap,
            draw.driver_calls
        );
    }
    log::info!(
        "painted after {frames} frames; {} buffers live, {} shared coordinate sets",
        device.live_buffers(),
        cache.len()
    );

    dispose_all(&meshes, &cache)?;
    log::info!("disposed; {} buffers live", device.live_buffers());
    Ok(())
}

fn run_wgpu(
    device: &WgpuDevice,
    source: &GridGeometry,
    targets: &[GridGeometry],
    sampler: &Arc<dyn LatticeSampler>,
    scheduler: &Arc<dyn Scheduler>,
) -> Result<()> {
    log::info!("drawing on {}", device.adapter_info().name);
    let pipeline = MeshPipeline::new(device.device(), FORMAT);
    let source_view = checkerboard(device, source.width(), source.height());
    let bindings = pipeline.bind(device.device(), &source_view, TARGET_SIZE);
    let views: Vec<_> = targets.iter().map(|_| render_target(device)).collect();

    let cache = Arc::new(SharedCoordinateCache::new());
    let meshes = build_meshes(source, targets, sampler, scheduler, &cache)?;
    let props = PaintProperties { alpha: 1.0 };

    let mut frames = 0;
    loop {
        let mut encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("reproj probe frame"),
            });
        let mut done = true;
        let mut driver_calls = 0;

        for (i, (mesh, view)) in meshes.iter().zip(&views).enumerate() {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("reproj probe pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            let mut painter = WgpuPainter::new(device, &pipeline, &mut pass, &bindings);
            done &= settled(mesh.paint(&mut painter, &props)?, i);
            driver_calls += painter.driver_calls();
        }

        device.queue().submit(std::iter::once(encoder.finish()));
        frames += 1;
        if done {
            log::info!("painted after {frames} frames with {driver_calls} draw calls");
            break;
        }
        if frames >= MAX_FRAMES {
            bail!("meshes still calculating after {frames} frames");
        }
        thread::sleep(FRAME);
    }

    for (i, mesh) in meshes.iter().enumerate() {
        if let Some(key) = mesh.key() {
            log::info!(
                "mesh {i}: {key}, {:?}, texture wraps: {}",
                mesh.state(),
                mesh.wraps_texture()
            );
        }
    }
    dispose_all(&meshes, &cache)?;
    log::info!("disposed {} meshes", meshes.len());
    Ok(())
}

fn render_target(device: &WgpuDevice) -> wgpu::TextureView {
    let texture = device.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("reproj probe target"),
        size: wgpu::Extent3d {
            width: TARGET_SIZE.0,
            height: TARGET_SIZE.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// 10-pixel checkerboard source texture.
fn checkerboard(device: &WgpuDevice, width: u32, height: u32) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("reproj probe source"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let texels: Vec<[u8; 4]> = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                if (x / 10 + y / 10) % 2 == 0 {
                    [230, 230, 230, 255]
                } else {
                    [40, 90, 160, 255]
                }
            })
        })
        .collect();

    device.queue().write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&texels),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
