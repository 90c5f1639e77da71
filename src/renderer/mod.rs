//! Camera passthrough rendering.
//!
//! [`FrameRenderer`] is the render-thread state machine; it reaches the GPU
//! only through the [`RenderBackend`] trait, implemented for wgpu by
//! [`WgpuBackend`].

mod backend;
mod error;
mod frame_renderer;
pub mod quad;
mod wgpu_backend;

pub use backend::{DrawTarget, Extent, ProgramStatus, RenderBackend};
pub use error::RenderError;
pub use frame_renderer::{FrameRenderer, FrameReport, RendererSettings};
pub use wgpu_backend::WgpuBackend;
