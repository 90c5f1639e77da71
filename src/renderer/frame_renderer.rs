//! Render-thread state machine for the passthrough view.
//!
//! [`FrameRenderer`] is driven by the host's surface lifecycle. Every frame
//! it refreshes the camera texture and draws the quad to exactly one
//! target: the screen normally, or the sensor-sized offscreen target when a
//! capture was pending at the start of the frame. Capture frames are read
//! back and handed to the [`CaptureSink`].

use std::sync::Arc;
use std::time::Duration;

use super::backend::{DrawTarget, Extent, ProgramStatus, RenderBackend};
use super::quad::QUAD_VERTICES;
use super::RenderError;
use crate::camera::{
    AttachHandle, AttachState, CameraSession, CameraStream, Dispatcher,
};
use crate::capture::{
    CaptureError, CaptureListener, CaptureRequest, CaptureSink,
    CaptureStatus, CaptureTrigger, CapturedFrame,
};
use crate::options::Options;

/// Renderer behavior taken from [`Options`].
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    /// Clear color of both targets.
    pub clear_color: [f32; 4],
    /// Camera stream to display.
    pub stream: CameraStream,
    /// Abort surface creation when the program does not link.
    pub strict_shaders: bool,
    /// How long surface creation waits for the texture attachment;
    /// `None` to not wait.
    pub attach_timeout: Option<Duration>,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self::from(&Options::default())
    }
}

impl From<&Options> for RendererSettings {
    fn from(options: &Options) -> Self {
        Self {
            clear_color: options.render.clear_color,
            stream: options.camera.stream,
            strict_shaders: options.render.strict_shaders,
            attach_timeout: options
                .camera
                .await_attach
                .then(|| Duration::from_millis(options.camera.attach_timeout_ms)),
        }
    }
}

/// What a single [`FrameRenderer::on_draw_frame`] call did.
#[derive(Debug)]
pub struct FrameReport {
    /// Sequence number of the frame, starting at zero.
    pub frame_index: u64,
    /// Target that received the draw; `None` without a live surface or
    /// when the draw failed (e.g. the surface was lost).
    pub target: Option<DrawTarget>,
    /// Capture outcome, on capture frames only.
    pub capture: Option<CaptureStatus>,
}

/// Resources that live as long as one rendering surface.
struct SurfaceState {
    offscreen: Extent,
    attach: AttachHandle,
    program: ProgramStatus,
}

/// Camera passthrough renderer with one-shot offscreen capture.
///
/// All lifecycle methods must be called from the render thread, in order
/// and never concurrently. Captures are requested from any thread through
/// [`CaptureTrigger`].
pub struct FrameRenderer<B: RenderBackend> {
    backend: B,
    camera: Arc<dyn CameraSession<B::Texture>>,
    dispatcher: Arc<dyn Dispatcher>,
    settings: RendererSettings,
    request: Arc<CaptureRequest>,
    sink: CaptureSink,
    surface: Option<SurfaceState>,
    frame_index: u64,
    camera_healthy: bool,
}

impl<B: RenderBackend> FrameRenderer<B> {
    /// Create a renderer. No GPU work happens until
    /// [`on_surface_created`](Self::on_surface_created).
    pub fn new(
        backend: B,
        camera: Arc<dyn CameraSession<B::Texture>>,
        dispatcher: Arc<dyn Dispatcher>,
        sink: CaptureSink,
        settings: RendererSettings,
    ) -> Self {
        Self {
            backend,
            camera,
            dispatcher,
            settings,
            request: Arc::new(CaptureRequest::new()),
            sink,
            surface: None,
            frame_index: 0,
            camera_healthy: true,
        }
    }

    /// Call `listener` whenever a capture finishes or is dropped.
    #[must_use]
    pub fn with_listener(mut self, listener: CaptureListener) -> Self {
        self.sink.set_listener(Some(listener));
        self
    }

    /// Replace or clear the capture listener.
    pub fn set_listener(&mut self, listener: Option<CaptureListener>) {
        self.sink.set_listener(listener);
    }

    /// Handle UI code can use to request captures from any thread.
    #[must_use]
    pub fn capture_trigger(&self) -> CaptureTrigger {
        CaptureTrigger::new(Arc::clone(&self.request))
    }

    /// Request that the next frame be captured.
    ///
    /// Returns `true` if this call created the request, `false` if one was
    /// already pending.
    pub fn save_frame(&self) -> bool {
        self.request.request()
    }

    /// Size of the offscreen capture target, once a surface exists.
    #[must_use]
    pub fn offscreen_extent(&self) -> Option<Extent> {
        self.surface.as_ref().map(|s| s.offscreen)
    }

    /// Link status of the passthrough program, once a surface exists.
    #[must_use]
    pub fn program_status(&self) -> Option<&ProgramStatus> {
        self.surface.as_ref().map(|s| &s.program)
    }

    /// Last known state of the camera texture attachment.
    #[must_use]
    pub fn attach_state(&self) -> Option<&AttachState> {
        self.surface.as_ref().map(|s| s.attach.state())
    }

    /// Renderer settings.
    #[must_use]
    pub const fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// The GPU backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the GPU backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Allocate every GPU resource for a new surface.
    ///
    /// Safe to call again after the surface is recreated: resources from
    /// the previous surface are released first. On error, everything
    /// allocated so far is released before returning.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the camera reports no usable image size,
    /// the texture cannot be registered, the offscreen target is
    /// incomplete, or (in strict mode) the program fails to link.
    pub fn on_surface_created(&mut self) -> Result<(), RenderError> {
        if self.surface.take().is_some() {
            log::info!("surface recreated; releasing previous GPU resources");
            self.backend.release();
        }
        match self.init_surface() {
            Ok(state) => {
                log::info!(
                    "passthrough ready: {} stream, capture target {}",
                    self.settings.stream,
                    state.offscreen
                );
                self.surface = Some(state);
                Ok(())
            }
            Err(e) => {
                log::error!("surface initialization failed: {e}");
                self.backend.release();
                Err(e)
            }
        }
    }

    fn init_surface(&mut self) -> Result<SurfaceState, RenderError> {
        let stream = self.settings.stream;
        self.backend.set_clear_color(self.settings.clear_color);
        self.backend.create_quad(&QUAD_VERTICES)?;

        // Textures are sized at creation, so intrinsics come first.
        let intrinsics = self
            .camera
            .intrinsics(stream)
            .map_err(RenderError::Intrinsics)?;
        let offscreen = Extent::new(intrinsics.width, intrinsics.height);
        if offscreen.is_empty() {
            return Err(RenderError::InvalidIntrinsics {
                width: offscreen.width,
                height: offscreen.height,
            });
        }

        let texture = self.backend.create_video_texture(offscreen)?;
        let mut attach = self.attach_texture(stream, texture)?;
        if let Some(timeout) = self.settings.attach_timeout {
            match attach.wait(timeout) {
                AttachState::Attached => {
                    log::debug!("video texture attached to {stream}");
                }
                AttachState::Pending => log::warn!(
                    "video texture attachment still pending after {}ms",
                    timeout.as_millis()
                ),
                AttachState::Failed(e) => {
                    log::error!("camera rejected video texture: {e}");
                }
                AttachState::Abandoned => {
                    log::error!("video texture attachment was abandoned");
                }
            }
        }

        let program = self.backend.create_program();
        if !program.diagnostics.is_empty() {
            log::warn!("passthrough shader diagnostics:\n{}", program.diagnostics);
        }
        if !program.linked {
            if self.settings.strict_shaders {
                return Err(RenderError::ProgramLink(program.diagnostics));
            }
            log::error!(
                "passthrough program did not link; frames will be cleared \
                 without drawing"
            );
        }

        self.backend.create_offscreen_target(offscreen)?;

        Ok(SurfaceState {
            offscreen,
            attach,
            program,
        })
    }

    /// Register `texture` with the camera on the camera-owning thread.
    fn attach_texture(
        &self,
        stream: CameraStream,
        texture: B::Texture,
    ) -> Result<AttachHandle, RenderError> {
        let (done, handle) = AttachHandle::channel();
        let camera = Arc::clone(&self.camera);
        self.dispatcher.dispatch(Box::new(move || {
            let _ = done.send(camera.attach_external_texture(stream, texture));
        }))?;
        Ok(handle)
    }

    /// Follow a surface size change.
    ///
    /// Only screen attachments follow the surface; the capture target keeps
    /// the camera's size.
    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        log::debug!("surface changed to {width}x{height}");
        self.backend.resize_screen(Extent::new(width, height));
    }

    /// Render one frame.
    ///
    /// Never fails: camera, draw and capture errors are logged and reported
    /// in the returned [`FrameReport`].
    pub fn on_draw_frame(&mut self) -> FrameReport {
        let frame_index = self.frame_index;
        self.frame_index += 1;
        let _ = self.sink.poll_completed();

        let Some(offscreen) = self.poll_surface() else {
            return FrameReport {
                frame_index,
                target: None,
                capture: None,
            };
        };

        self.update_camera();

        // Sampled once; a request arriving after this point waits for the
        // next frame.
        if !self.request.take() {
            let target = match self.backend.draw(DrawTarget::Screen) {
                Ok(()) => Some(DrawTarget::Screen),
                Err(e) => {
                    log::warn!("frame {frame_index} not presented: {e}");
                    None
                }
            };
            return FrameReport {
                frame_index,
                target,
                capture: None,
            };
        }

        let (target, status) = self.capture(frame_index, offscreen);
        FrameReport {
            frame_index,
            target,
            capture: Some(status),
        }
    }

    /// Check on the texture attachment and return the capture extent, or
    /// `None` without a live surface.
    fn poll_surface(&mut self) -> Option<Extent> {
        let state = self.surface.as_mut()?;
        if !state.attach.state().is_settled() {
            match state.attach.poll() {
                AttachState::Pending => {}
                AttachState::Attached => log::debug!("video texture attached"),
                AttachState::Failed(e) => {
                    log::error!("camera rejected video texture: {e}");
                }
                AttachState::Abandoned => {
                    log::error!("video texture attachment was abandoned");
                }
            }
        }
        Some(state.offscreen)
    }

    fn update_camera(&mut self) {
        match self.camera.update_texture(self.settings.stream) {
            Ok(()) => {
                if !self.camera_healthy {
                    log::info!("camera texture updates resumed");
                    self.camera_healthy = true;
                }
            }
            Err(e) => {
                if self.camera_healthy {
                    log::warn!("camera texture update failed: {e}");
                    self.camera_healthy = false;
                }
            }
        }
    }

    /// Draw the capture frame and hand it off. The returned target is
    /// `None` when the offscreen draw itself failed.
    fn capture(
        &mut self,
        frame_index: u64,
        extent: Extent,
    ) -> (Option<DrawTarget>, CaptureStatus) {
        if let Err(e) = self.backend.draw(DrawTarget::Offscreen) {
            log::error!("capture frame {frame_index} could not be drawn: {e}");
            let status = self
                .sink
                .fail(frame_index, CaptureError::Render(e.to_string()));
            return (None, status);
        }
        let drawn = Some(DrawTarget::Offscreen);
        let pixels = match self.backend.read_pixels() {
            Ok(pixels) => pixels,
            Err(e) => {
                log::error!("capture frame {frame_index} readback failed: {e}");
                let status = self
                    .sink
                    .fail(frame_index, CaptureError::Render(e.to_string()));
                return (drawn, status);
            }
        };
        let status = match CapturedFrame::new(
            extent.width,
            extent.height,
            pixels,
            frame_index,
        ) {
            Ok(frame) => self.sink.deliver(frame),
            Err(e) => {
                log::error!("capture frame {frame_index} rejected: {e}");
                self.sink.fail(frame_index, e)
            }
        };
        (drawn, status)
    }

    /// Release every GPU resource of the current surface.
    ///
    /// Frames drawn before the next
    /// [`on_surface_created`](Self::on_surface_created) do nothing and
    /// leave pending capture requests in place.
    pub fn on_surface_destroyed(&mut self) {
        if self.surface.take().is_some() {
            self.backend.release();
            log::info!("surface destroyed; GPU resources released");
        }
    }

    /// Release the surface and finish any background capture writes.
    pub fn shutdown(&mut self) {
        self.on_surface_destroyed();
        self.sink.shutdown();
    }
}

impl<B: RenderBackend> Drop for FrameRenderer<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
