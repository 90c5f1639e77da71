// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! GPU camera passthrough view with one-shot offscreen frame capture.
//!
//! A live camera stream is bound to a GPU texture and drawn full-screen
//! every frame. On request, exactly one frame is redirected to an
//! offscreen RGBA8 target sized to the camera sensor, read back, and
//! written to disk as a numbered still image.
//!
//! # Key entry points
//!
//! - [`renderer::FrameRenderer`] - the render-thread state machine driven
//!   by the host's lifecycle callbacks
//! - [`renderer::WgpuBackend`] - the wgpu implementation of the GPU seam
//! - [`capture::CaptureTrigger`] - thread-safe handle for requesting a
//!   capture from UI code
//! - [`camera::CameraSession`] - the camera collaborator contract
//! - [`options::Options`] - runtime configuration (render, camera,
//!   capture, logging)
//!
//! # Architecture
//!
//! The host owns a single render thread and calls
//! [`FrameRenderer::on_surface_created`](renderer::FrameRenderer::on_surface_created),
//! [`on_surface_changed`](renderer::FrameRenderer::on_surface_changed) and
//! [`on_draw_frame`](renderer::FrameRenderer::on_draw_frame) strictly in
//! sequence. Texture registration with the camera is dispatched to the
//! camera-owning thread; the only state shared with other threads is the
//! atomic capture request.

pub mod camera;
pub mod capture;
mod error;
pub mod gpu;
pub mod options;
pub mod renderer;
pub mod util;
#[cfg(feature = "viewer")]
mod viewer;

pub use error::ArpassError;
#[cfg(feature = "viewer")]
pub use viewer::{Viewer, ViewerBuilder};
