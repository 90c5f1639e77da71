use std::fmt;

use crate::camera::{CameraError, DispatchError};
use crate::gpu::readback::ReadbackError;
use crate::gpu::render_context::RenderContextError;

/// Errors raised while setting up or driving the renderer.
#[derive(Debug)]
pub enum RenderError {
    /// GPU device or surface initialization failed.
    Context(RenderContextError),
    /// The camera reported a zero-sized image.
    InvalidIntrinsics {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },
    /// The camera could not report intrinsics.
    Intrinsics(CameraError),
    /// Texture registration could not be handed to the camera thread.
    Dispatch(DispatchError),
    /// The passthrough program failed to link (strict mode only).
    ProgramLink(String),
    /// The offscreen target cannot be rendered to.
    FramebufferIncomplete(String),
    /// A draw or readback needed a resource that was never created.
    MissingResource(&'static str),
    /// The presentation surface could not be acquired.
    Surface(wgpu::SurfaceError),
    /// Offscreen readback failed.
    Readback(ReadbackError),
    /// wgpu rejected a resource or pipeline.
    Validation(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context(e) => write!(f, "GPU context: {e}"),
            Self::InvalidIntrinsics { width, height } => write!(
                f,
                "camera reported an empty image ({width}x{height})"
            ),
            Self::Intrinsics(e) => write!(f, "intrinsics query failed: {e}"),
            Self::Dispatch(e) => write!(f, "texture registration: {e}"),
            Self::ProgramLink(msg) => {
                write!(f, "passthrough program failed to link: {msg}")
            }
            Self::FramebufferIncomplete(msg) => {
                write!(f, "offscreen target incomplete: {msg}")
            }
            Self::MissingResource(what) => write!(f, "missing {what}"),
            Self::Surface(e) => write!(f, "surface acquisition failed: {e}"),
            Self::Readback(e) => write!(f, "{e}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Context(e) => Some(e),
            Self::Intrinsics(e) => Some(e),
            Self::Dispatch(e) => Some(e),
            Self::Surface(e) => Some(e),
            Self::Readback(e) => Some(e),
            Self::InvalidIntrinsics { .. }
            | Self::ProgramLink(_)
            | Self::FramebufferIncomplete(_)
            | Self::MissingResource(_)
            | Self::Validation(_) => None,
        }
    }
}

impl From<RenderContextError> for RenderError {
    fn from(e: RenderContextError) -> Self {
        Self::Context(e)
    }
}

impl From<DispatchError> for RenderError {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(e: wgpu::SurfaceError) -> Self {
        Self::Surface(e)
    }
}

impl From<ReadbackError> for RenderError {
    fn from(e: ReadbackError) -> Self {
        Self::Readback(e)
    }
}
