//! Standalone passthrough window backed by winit.
//!
//! Hosts a [`FrameRenderer`] over a windowed [`WgpuBackend`] and feeds it
//! from a [`SyntheticCamera`]. `Space` or `S` captures the next frame,
//! `Escape` quits.
//!
//! ```no_run
//! # use arpass::Viewer;
//! Viewer::builder()
//!     .with_title("Capture")
//!     .build()
//!     .run()
//!     .unwrap();
//! ```

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    camera::{CameraSession, CameraThread, Intrinsics, SyntheticCamera},
    capture::{CaptureListener, CaptureOutcome, CaptureSink},
    error::ArpassError,
    gpu::{render_context::RenderContext, texture::VideoTexture},
    options::Options,
    renderer::{FrameRenderer, RenderError, RendererSettings, WgpuBackend},
    util::frame_timing::FrameTiming,
};

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    options: Option<Options>,
    title: String,
}

impl ViewerBuilder {
    /// Create a builder with sensible defaults (title "arpass", default
    /// options).
    fn new() -> Self {
        Self {
            options: None,
            title: "arpass".into(),
        }
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            options: self.options.unwrap_or_default(),
            title: self.title,
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A standalone window showing the camera passthrough.
///
/// Construct via [`Viewer::builder`], then call [`run`](Self::run) to
/// enter the event loop.
pub struct Viewer {
    options: Options,
    title: String,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns [`ArpassError`] if the event loop cannot start or the
    /// renderer fails to initialize.
    pub fn run(self) -> Result<(), ArpassError> {
        let event_loop =
            EventLoop::new().map_err(|e| ArpassError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            window: None,
            renderer: None,
            timing: FrameTiming::new(0),
            options: self.options,
            title: self.title,
            error: None,
        };

        event_loop
            .run_app(&mut app)
            .map_err(|e| ArpassError::Viewer(e.to_string()))?;
        app.error.map_or(Ok(()), Err)
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

/// Internal winit application handler.
struct ViewerApp {
    window: Option<Arc<Window>>,
    renderer: Option<FrameRenderer<WgpuBackend>>,
    timing: FrameTiming,
    options: Options,
    title: String,
    /// Initialization failure, returned from [`Viewer::run`].
    error: Option<ArpassError>,
}

fn log_outcome(outcome: &CaptureOutcome) {
    match &outcome.result {
        Ok(path) => log::info!(
            "frame {} captured to {}",
            outcome.frame_index,
            path.display()
        ),
        Err(e) => {
            log::warn!("frame {} capture dropped: {e}", outcome.frame_index);
        }
    }
}

impl ViewerApp {
    /// Build the GPU context, camera feed and renderer for `window`.
    fn create_renderer(
        &self,
        window: Arc<Window>,
    ) -> Result<FrameRenderer<WgpuBackend>, ArpassError> {
        let size = window.inner_size();
        let context = pollster::block_on(RenderContext::new(
            window,
            (size.width, size.height),
            self.options.render.vsync,
        ))
        .map_err(RenderError::from)?;
        let backend = WgpuBackend::new(context);

        let camera_options = &self.options.camera;
        let camera: Arc<dyn CameraSession<VideoTexture>> =
            Arc::new(
                SyntheticCamera::start(
                    backend.context().queue.clone(),
                    camera_options.stream,
                    Intrinsics::new(
                        camera_options.synthetic_width,
                        camera_options.synthetic_height,
                    ),
                    camera_options.synthetic_fps,
                )
                .map_err(ArpassError::ThreadSpawn)?,
            );
        let dispatcher =
            Arc::new(CameraThread::spawn().map_err(ArpassError::ThreadSpawn)?);
        let sink = CaptureSink::from_options(&self.options.capture)
            .map_err(ArpassError::ThreadSpawn)?;
        let listener: CaptureListener = Arc::new(log_outcome);

        let mut renderer = FrameRenderer::new(
            backend,
            camera,
            dispatcher,
            sink,
            RendererSettings::from(&self.options),
        )
        .with_listener(listener);
        renderer.on_surface_created()?;
        renderer.on_surface_changed(size.width, size.height);
        Ok(renderer)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: ArpassError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn handle_key(&self, event_loop: &ActiveEventLoop, code: KeyCode) {
        match code {
            KeyCode::Space | KeyCode::KeyS => {
                if let Some(renderer) = &self.renderer {
                    if renderer.save_frame() {
                        log::info!("capture requested");
                    } else {
                        log::debug!("capture already pending");
                    }
                }
            }
            KeyCode::Escape => event_loop.exit(),
            _ => {}
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let (Some(window), Some(renderer)) =
            (&self.window, &mut self.renderer)
        {
            // Surface came back after a suspend.
            let size = window.inner_size();
            let recreated = renderer
                .backend_mut()
                .context_mut()
                .attach_surface(Arc::clone(window), (size.width, size.height))
                .map_err(RenderError::from)
                .and_then(|()| renderer.on_surface_created());
            match recreated {
                Ok(()) => {
                    renderer.on_surface_changed(size.width, size.height);
                    window.request_redraw();
                }
                Err(e) => self.fail(event_loop, e.into()),
            }
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.options.camera.synthetic_width,
                self.options.camera.synthetic_height,
            ));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                self.fail(event_loop, ArpassError::Viewer(e.to_string()));
                return;
            }
        };

        match self.create_renderer(Arc::clone(&window)) {
            Ok(renderer) => {
                window.request_redraw();
                self.window = Some(window);
                self.renderer = Some(renderer);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &mut self.renderer {
            renderer.on_surface_destroyed();
            // The platform may invalidate the window surface while suspended.
            renderer.backend_mut().context_mut().detach_surface();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.shutdown();
                }
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.on_surface_changed(size.width, size.height);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => {
                if let (Some(window), Some(renderer)) =
                    (&self.window, &mut self.renderer)
                {
                    let report = renderer.on_draw_frame();
                    log::trace!(
                        "frame {} -> {:?}",
                        report.frame_index,
                        report.target
                    );
                    self.timing.end_frame();
                    if let Some(fps) = self.timing.take_report() {
                        log::info!(
                            "{fps:.1} fps ({} frames)",
                            self.timing.frames()
                        );
                    }
                    window.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        self.handle_key(event_loop, code);
                    }
                }
            }

            _ => (),
        }
    }
}
