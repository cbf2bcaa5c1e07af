use crate::device::{DrawRanges, MeshDevice, MeshPainter, StripDraw, TextureWrap, WgpuDevice};

use super::{MeshBindings, MeshPipeline};

/// Issues mesh draws into an open render pass.
///
/// One painter per pass. Repaint requests are collected so the host can
/// schedule another frame after submitting this one.
pub struct WgpuPainter<'a, 'p> {
    device: &'a WgpuDevice,
    pass: &'a mut wgpu::RenderPass<'p>,
    bindings: &'a MeshBindings,
    wrap: TextureWrap,
    repaint_requested: bool,
    driver_calls: usize,
}

impl<'a, 'p> WgpuPainter<'a, 'p> {
    /// Sets the mesh pipeline on `pass`.
    pub fn new(
        device: &'a WgpuDevice,
        pipeline: &MeshPipeline,
        pass: &'a mut wgpu::RenderPass<'p>,
        bindings: &'a MeshBindings,
    ) -> Self {
        pass.set_pipeline(pipeline.pipeline());
        Self {
            device,
            pass,
            bindings,
            wrap: TextureWrap::Clamp,
            repaint_requested: false,
            driver_calls: 0,
        }
    }

    pub fn repaint_requested(&self) -> bool {
        self.repaint_requested
    }

    /// Draw calls issued so far.
    pub fn driver_calls(&self) -> usize {
        self.driver_calls
    }
}

impl MeshPainter for WgpuPainter<'_, '_> {
    type Device = WgpuDevice;

    fn device(&self) -> &WgpuDevice {
        self.device
    }

    fn set_texture_wrap(&mut self, wrap: TextureWrap) {
        self.wrap = wrap;
    }

    fn draw_strips(&mut self, draw: StripDraw<'_, <WgpuDevice as MeshDevice>::Buffer>) {
        let bindings = self.bindings;
        let group = match self.wrap {
            TextureWrap::Clamp => &bindings.clamp,
            TextureWrap::Repeat => &bindings.repeat,
        };
        let alpha = f64::from(draw.alpha.clamp(0.0, 1.0));

        self.pass.set_bind_group(0, group, &[]);
        self.pass.set_blend_constant(wgpu::Color {
            r: alpha,
            g: alpha,
            b: alpha,
            a: alpha,
        });
        self.pass.set_vertex_buffer(0, draw.vertices.slice(..));
        self.pass.set_vertex_buffer(1, draw.tex_coords.slice(..));

        match &draw.ranges {
            DrawRanges::MultiDraw { indirect, starts, .. } => {
                self.pass.multi_draw_indirect(indirect, 0, starts.len() as u32);
                self.driver_calls += 1;
            }
            DrawRanges::Segments(_) => {
                for (first, count) in draw.ranges.iter() {
                    self.pass.draw(first..first + count, 0..1);
                    self.driver_calls += 1;
                }
            }
        }
    }

    fn request_repaint(&mut self) {
        self.repaint_requested = true;
    }
}
