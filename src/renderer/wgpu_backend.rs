//! wgpu implementation of [`RenderBackend`].
//!
//! Owns the device context and every GPU object the passthrough view
//! needs. Resource creation runs inside validation error scopes so that
//! shader and framebuffer problems come back as values instead of
//! uncaptured device errors.

use wgpu::util::DeviceExt;

use super::backend::{DrawTarget, Extent, ProgramStatus, RenderBackend};
use super::quad;
use super::RenderError;
use crate::gpu::pipeline_helpers::{
    create_quad_pipeline, filtering_sampler, linear_sampler,
    passthrough_depth, texture_2d,
};
use crate::gpu::readback::read_texture_rgba8;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::gpu::texture::{
    DepthTarget, OffscreenTarget, RenderTarget, VideoTexture, CAPTURE_FORMAT,
    DEPTH_FORMAT,
};

/// Linked passthrough program: one pipeline per target format.
struct Program {
    bind_group_layout: wgpu::BindGroupLayout,
    screen: wgpu::RenderPipeline,
    offscreen: wgpu::RenderPipeline,
}

/// Passthrough renderer backend over a wgpu [`RenderContext`].
///
/// With a window surface, screen draws are presented to the swapchain.
/// Without one (texture-only mode), they land in an internal
/// [`RenderTarget`] sized like the surface configuration.
pub struct WgpuBackend {
    context: RenderContext,
    clear_color: wgpu::Color,
    quad: Option<wgpu::Buffer>,
    video: Option<VideoTexture>,
    sampler: Option<wgpu::Sampler>,
    program: Option<Program>,
    bind_group: Option<wgpu::BindGroup>,
    offscreen: Option<OffscreenTarget>,
    depth: Option<DepthTarget>,
    headless_screen: Option<RenderTarget>,
}

impl WgpuBackend {
    /// Wrap an initialized render context.
    #[must_use]
    pub fn new(context: RenderContext) -> Self {
        context.device.on_uncaptured_error(Box::new(|e| {
            log::error!("uncaptured wgpu error: {e}");
        }));
        Self {
            context,
            clear_color: wgpu::Color::BLACK,
            quad: None,
            video: None,
            sampler: None,
            program: None,
            bind_group: None,
            offscreen: None,
            depth: None,
            headless_screen: None,
        }
    }

    /// Backend on the default adapter with no window surface.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Context`] if no adapter or device is
    /// available.
    pub fn headless(width: u32, height: u32) -> Result<Self, RenderError> {
        let context = pollster::block_on(RenderContext::headless(
            CAPTURE_FORMAT,
            width,
            height,
        ))?;
        Ok(Self::new(context))
    }

    /// The underlying device context.
    #[must_use]
    pub const fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Mutable access to the device context, e.g. to swap the window
    /// surface across a suspend.
    pub fn context_mut(&mut self) -> &mut RenderContext {
        &mut self.context
    }

    /// Screen target of texture-only mode, if one has been drawn to.
    #[must_use]
    pub const fn headless_screen(&self) -> Option<&RenderTarget> {
        self.headless_screen.as_ref()
    }

    fn push_validation_scope(&self) {
        self.context
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);
    }

    fn pop_validation_scope(&self) -> Option<String> {
        pollster::block_on(self.context.device.pop_error_scope())
            .map(|e| e.to_string())
    }

    fn check_dimensions(&self, extent: Extent) -> Result<(), String> {
        let max = self.context.device.limits().max_texture_dimension_2d;
        if extent.is_empty() {
            Err(format!("{extent} has a zero dimension"))
        } else if extent.width > max || extent.height > max {
            Err(format!("{extent} exceeds the device limit of {max}"))
        } else {
            Ok(())
        }
    }

    fn rebuild_bind_group(&mut self) {
        self.bind_group = match (&self.program, &self.video, &self.sampler) {
            (Some(program), Some(video), Some(sampler)) => Some(
                self.context.device.create_bind_group(
                    &wgpu::BindGroupDescriptor {
                        label: Some("Passthrough Bind Group"),
                        layout: &program.bind_group_layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: wgpu::BindingResource::TextureView(
                                    &video.view,
                                ),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: wgpu::BindingResource::Sampler(
                                    sampler,
                                ),
                            },
                        ],
                    },
                ),
            ),
            _ => None,
        };
    }

    fn build_program(&self) -> Result<Program, String> {
        let mut composer = ShaderComposer::new()?;
        let module =
            composer.compose(&self.context.device, Shader::Passthrough)?;

        let device = &self.context.device;
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Passthrough Bind Group Layout"),
                entries: &[texture_2d(0), filtering_sampler(1)],
            });
        let screen = create_quad_pipeline(
            device,
            "Passthrough Screen",
            &module,
            self.context.format(),
            Some(passthrough_depth(DEPTH_FORMAT)),
            quad::vertex_layout(),
            &[&bind_group_layout],
        );
        let offscreen = create_quad_pipeline(
            device,
            "Passthrough Offscreen",
            &module,
            CAPTURE_FORMAT,
            None,
            quad::vertex_layout(),
            &[&bind_group_layout],
        );
        Ok(Program {
            bind_group_layout,
            screen,
            offscreen,
        })
    }

    /// Make sure the depth buffer matches the current surface size.
    fn ensure_depth(&mut self) {
        let (width, height) = (self.context.width(), self.context.height());
        let stale = self.depth.as_ref().is_none_or(|d| {
            d.texture.width() != width || d.texture.height() != height
        });
        if stale {
            self.depth =
                Some(DepthTarget::new(&self.context.device, width, height));
        }
    }

    fn ensure_headless_screen(&mut self) {
        let (width, height) = (self.context.width(), self.context.height());
        let stale = self.headless_screen.as_ref().is_none_or(|t| {
            t.texture.width() != width || t.texture.height() != height
        });
        if stale {
            self.headless_screen = Some(RenderTarget::new(
                &self.context.device,
                width,
                height,
                self.context.format(),
            ));
        }
    }

    /// Record the quad draw, or nothing if the program is not usable.
    fn encode_quad(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        pipeline: Option<&wgpu::RenderPipeline>,
    ) {
        if let (Some(pipeline), Some(bind_group), Some(quad)) =
            (pipeline, &self.bind_group, &self.quad)
        {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.set_vertex_buffer(0, quad.slice(..));
            pass.draw(0..quad::QUAD_VERTEX_COUNT, 0..1);
        }
    }

    fn draw_screen(&mut self) -> Result<(), RenderError> {
        self.ensure_depth();
        let frame = if self.context.has_surface() {
            match self.context.get_next_frame() {
                Ok(frame) => Some(frame),
                Err(e) => {
                    if matches!(
                        e,
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated
                    ) {
                        self.context.reconfigure();
                    }
                    return Err(e.into());
                }
            }
        } else {
            self.ensure_headless_screen();
            None
        };

        let surface_view = frame.as_ref().map(|f| {
            f.texture
                .create_view(&wgpu::TextureViewDescriptor::default())
        });
        let view = match (&surface_view, &self.headless_screen) {
            (Some(view), _) => view,
            (None, Some(target)) => &target.view,
            (None, None) => {
                return Err(RenderError::MissingResource("screen target"))
            }
        };
        let depth = self
            .depth
            .as_ref()
            .ok_or(RenderError::MissingResource("depth buffer"))?;

        let mut encoder = self.context.create_encoder();
        {
            let mut pass =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Passthrough Screen Pass"),
                    color_attachments: &[Some(
                        wgpu::RenderPassColorAttachment {
                            view,
                            depth_slice: None,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(self.clear_color),
                                store: wgpu::StoreOp::Store,
                            },
                        },
                    )],
                    depth_stencil_attachment: Some(
                        wgpu::RenderPassDepthStencilAttachment {
                            view: &depth.view,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Discard,
                            }),
                            stencil_ops: None,
                        },
                    ),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
            self.encode_quad(&mut pass, self.program.as_ref().map(|p| &p.screen));
        }
        self.context.submit(encoder);
        if let Some(frame) = frame {
            frame.present();
        }
        Ok(())
    }

    fn draw_offscreen(&self) -> Result<(), RenderError> {
        let target = self
            .offscreen
            .as_ref()
            .ok_or(RenderError::MissingResource("offscreen target"))?;

        let mut encoder = self.context.create_encoder();
        {
            let mut pass =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Passthrough Offscreen Pass"),
                    color_attachments: &[Some(
                        wgpu::RenderPassColorAttachment {
                            view: &target.view,
                            depth_slice: None,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(self.clear_color),
                                store: wgpu::StoreOp::Store,
                            },
                        },
                    )],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
            self.encode_quad(
                &mut pass,
                self.program.as_ref().map(|p| &p.offscreen),
            );
        }
        self.context.submit(encoder);
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    type Texture = VideoTexture;

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba;
        self.clear_color = wgpu::Color {
            r: f64::from(r),
            g: f64::from(g),
            b: f64::from(b),
            a: f64::from(a),
        };
    }

    fn create_quad(
        &mut self,
        vertices: &[[f32; 2]; 4],
    ) -> Result<(), RenderError> {
        self.quad = Some(self.context.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Passthrough Quad"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            },
        ));
        Ok(())
    }

    fn create_video_texture(
        &mut self,
        extent: Extent,
    ) -> Result<VideoTexture, RenderError> {
        self.check_dimensions(extent)
            .map_err(RenderError::Validation)?;
        self.push_validation_scope();
        let video = VideoTexture::new(
            &self.context.device,
            extent.width,
            extent.height,
        );
        let sampler = linear_sampler(&self.context.device, "Video Sampler");
        if let Some(msg) = self.pop_validation_scope() {
            return Err(RenderError::Validation(msg));
        }
        self.video = Some(video.clone());
        self.sampler = Some(sampler);
        self.rebuild_bind_group();
        Ok(video)
    }

    fn create_program(&mut self) -> ProgramStatus {
        self.push_validation_scope();
        let built = self.build_program();
        let scope_error = self.pop_validation_scope();
        match (built, scope_error) {
            (Ok(program), None) => {
                self.program = Some(program);
                self.rebuild_bind_group();
                ProgramStatus::linked()
            }
            (Ok(_), Some(msg)) | (Err(msg), None) => {
                self.program = None;
                self.bind_group = None;
                ProgramStatus::failed(msg)
            }
            (Err(compose), Some(validation)) => {
                self.program = None;
                self.bind_group = None;
                ProgramStatus::failed(format!("{compose}\n{validation}"))
            }
        }
    }

    fn create_offscreen_target(
        &mut self,
        extent: Extent,
    ) -> Result<(), RenderError> {
        self.check_dimensions(extent)
            .map_err(RenderError::FramebufferIncomplete)?;
        self.push_validation_scope();
        let target = OffscreenTarget::new(
            &self.context.device,
            extent.width,
            extent.height,
        );
        if let Some(msg) = self.pop_validation_scope() {
            return Err(RenderError::FramebufferIncomplete(msg));
        }
        self.offscreen = Some(target);
        Ok(())
    }

    fn resize_screen(&mut self, extent: Extent) {
        self.context.resize(extent.width, extent.height);
        if !extent.is_empty() {
            self.ensure_depth();
            if !self.context.has_surface() {
                self.ensure_headless_screen();
            }
        }
    }

    fn draw(&mut self, target: DrawTarget) -> Result<(), RenderError> {
        match target {
            DrawTarget::Screen => self.draw_screen(),
            DrawTarget::Offscreen => self.draw_offscreen(),
        }
    }

    fn read_pixels(&mut self) -> Result<Vec<u8>, RenderError> {
        let target = self
            .offscreen
            .as_ref()
            .ok_or(RenderError::MissingResource("offscreen target"))?;
        Ok(read_texture_rgba8(
            &self.context.device,
            &self.context.queue,
            &target.texture,
        )?)
    }

    fn release(&mut self) {
        self.bind_group = None;
        self.program = None;
        self.sampler = None;
        self.video = None;
        self.quad = None;
        self.offscreen = None;
        self.depth = None;
        self.headless_screen = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::test_pattern;

    /// Skips silently on machines without any wgpu adapter.
    fn backend() -> Option<WgpuBackend> {
        WgpuBackend::headless(64, 32).ok()
    }

    #[test]
    fn offscreen_capture_reproduces_video_frame() {
        let Some(mut backend) = backend() else {
            return;
        };
        let extent = Extent::new(16, 8);
        backend.set_clear_color([0.3, 0.3, 0.3, 1.0]);
        backend.create_quad(&quad::QUAD_VERTICES).unwrap();
        let video = backend.create_video_texture(extent).unwrap();
        let status = backend.create_program();
        assert!(status.linked, "{}", status.diagnostics);
        backend.create_offscreen_target(extent).unwrap();

        let frame = test_pattern(extent.width, extent.height, 3);
        video.write_rgba(&backend.context().queue, &frame).unwrap();
        backend.draw(DrawTarget::Offscreen).unwrap();
        let pixels = backend.read_pixels().unwrap();

        assert_eq!(pixels.len(), extent.rgba8_len());
        for (got, want) in pixels.iter().zip(&frame) {
            assert!(got.abs_diff(*want) <= 1, "{got} vs {want}");
        }
    }

    #[test]
    fn oversized_offscreen_target_is_incomplete() {
        let Some(mut backend) = backend() else {
            return;
        };
        let max = backend.context().device.limits().max_texture_dimension_2d;
        let err = backend
            .create_offscreen_target(Extent::new(max + 1, 4))
            .unwrap_err();
        assert!(matches!(err, RenderError::FramebufferIncomplete(_)));
    }

    #[test]
    fn headless_screen_follows_resize() {
        let Some(mut backend) = backend() else {
            return;
        };
        backend.create_quad(&quad::QUAD_VERTICES).unwrap();
        backend.resize_screen(Extent::new(40, 20));
        backend.draw(DrawTarget::Screen).unwrap();
        let screen = backend.headless_screen().unwrap();
        assert_eq!(screen.texture.width(), 40);
        assert_eq!(screen.texture.height(), 20);
        backend.release();
        assert!(backend.headless_screen().is_none());
    }

    #[test]
    fn detached_surface_keeps_the_device_usable() {
        let Some(mut backend) = backend() else {
            return;
        };
        backend.context_mut().detach_surface();
        assert!(!backend.context().has_surface());
        backend.create_quad(&quad::QUAD_VERTICES).unwrap();
        backend
            .create_offscreen_target(Extent::new(8, 8))
            .unwrap();
        backend.draw(DrawTarget::Offscreen).unwrap();
        assert_eq!(backend.read_pixels().unwrap().len(), 8 * 8 * 4);
    }
}
