//! Shared utilities for the render loop.

/// Frame pacing and FPS measurement.
pub mod frame_timing;
