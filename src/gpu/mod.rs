//! GPU resource management utilities.
//!
//! Provides wgpu device/surface initialization, the passthrough textures
//! and render targets, pipeline boilerplate, texture readback, and shader
//! composition.

/// Shared wgpu boilerplate helpers for the quad pipelines.
pub mod pipeline_helpers;
/// Blocking texture readback with row-padding removal.
pub mod readback;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Video texture, offscreen capture target and depth/screen targets.
pub mod texture;
