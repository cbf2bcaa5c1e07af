//! Compiles and draws a mesh on a real adapter. Skipped when none is found.

mod common;

use common::{Harness, lat_lon_grid, uniform_sampler, world_grid};
use reproj_engine::device::{HeadlessInit, MeshDevice, WgpuDevice};
use reproj_engine::mesh::{Mesh, MeshState, PaintProperties, PaintStatus};
use reproj_engine::render::{MeshPipeline, WgpuPainter};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn view(device: &WgpuDevice, width: u32, height: u32, usage: wgpu::TextureUsages) -> wgpu::TextureView {
    device
        .device()
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("headless test texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

#[test]
fn mesh_compiles_and_draws_on_wgpu() {
    let device = match WgpuDevice::new_blocking(HeadlessInit {
        force_fallback_adapter: true,
        ..Default::default()
    }) {
        Ok(device) => device,
        Err(e) => {
            eprintln!("skipping: {e:#}");
            return;
        }
    };

    let h = Harness::new();
    let cache = std::sync::Arc::new(reproj_engine::cache::SharedCoordinateCache::new());
    let mesh: Mesh<wgpu::Buffer> = Mesh::create(
        lat_lon_grid(40, 20, (0.0, 0.0), (40.0, 20.0)),
        world_grid(),
        uniform_sampler(4.0),
        h.scheduler.clone(),
        std::sync::Arc::clone(&cache),
    )
    .unwrap();
    h.scheduler.run_pending();

    let pipeline = MeshPipeline::new(device.device(), FORMAT);
    let source = view(&device, 40, 20, wgpu::TextureUsages::TEXTURE_BINDING);
    let target = view(&device, 360, 180, wgpu::TextureUsages::RENDER_ATTACHMENT);
    let bindings = pipeline.bind(device.device(), &source, (360, 180));

    let mut encoder = device
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("headless test frame"),
        });
    let driver_calls = {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("headless test pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        let mut painter = WgpuPainter::new(&device, &pipeline, &mut pass, &bindings);
        let status = mesh.paint(&mut painter, &PaintProperties { alpha: 0.75 }).unwrap();
        assert_eq!(status, PaintStatus::Painted);
        painter.driver_calls()
    };
    device.queue().submit(std::iter::once(encoder.finish()));

    assert_eq!(mesh.state(), MeshState::Compiled);
    let strips = mesh.key().unwrap().vertical_divisions() as usize;
    if device.capabilities().multi_draw {
        assert_eq!(driver_calls, 1);
    } else {
        assert_eq!(driver_calls, strips);
    }

    mesh.dispose();
    assert!(cache.is_empty());
}
