//! The GPU seam between the frame state machine and a graphics API.

use std::fmt;

use super::RenderError;

/// Width and height of a render target, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// A `width` x `height` extent.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size of a tightly packed RGBA8 image of this extent.
    #[must_use]
    pub const fn rgba8_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where a frame's draw output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTarget {
    /// The presentation surface, cleared with color and depth.
    Screen,
    /// The sensor-sized capture target, cleared with color only.
    Offscreen,
}

/// Outcome of building the passthrough program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramStatus {
    /// Whether the program can be drawn with.
    pub linked: bool,
    /// Compiler and validation output, empty when clean.
    pub diagnostics: String,
}

impl ProgramStatus {
    /// A clean, linked program.
    #[must_use]
    pub const fn linked() -> Self {
        Self {
            linked: true,
            diagnostics: String::new(),
        }
    }

    /// A program that failed to link, with the reason.
    #[must_use]
    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Self {
            linked: false,
            diagnostics: diagnostics.into(),
        }
    }
}

/// GPU operations the [`FrameRenderer`](super::FrameRenderer) needs.
///
/// All methods run on the render thread. Resource-creating methods replace
/// any previous resource of the same kind.
pub trait RenderBackend {
    /// Handle to the external video texture, shared with the camera
    /// session.
    type Texture: Clone + Send + 'static;

    /// Set the color both targets are cleared to.
    fn set_clear_color(&mut self, rgba: [f32; 4]);

    /// Upload the static quad vertices.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the buffer cannot be created.
    fn create_quad(&mut self, vertices: &[[f32; 2]; 4])
        -> Result<(), RenderError>;

    /// Allocate the linear-filtered, single-mip video texture.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if allocation fails.
    fn create_video_texture(
        &mut self,
        extent: Extent,
    ) -> Result<Self::Texture, RenderError>;

    /// Compile and link the passthrough program.
    ///
    /// Link failure is reported through [`ProgramStatus`], not as an error,
    /// so the caller decides whether it is fatal.
    fn create_program(&mut self) -> ProgramStatus;

    /// Allocate the RGBA8 offscreen capture target.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::FramebufferIncomplete`] if the target cannot
    /// be rendered to.
    fn create_offscreen_target(
        &mut self,
        extent: Extent,
    ) -> Result<(), RenderError>;

    /// Follow a surface size change. Screen-only attachments may be
    /// resized; the offscreen target must not be touched.
    fn resize_screen(&mut self, extent: Extent);

    /// Clear `target` and draw the quad into it (clear only when the
    /// program did not link).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the target is missing or cannot be
    /// acquired.
    fn draw(&mut self, target: DrawTarget) -> Result<(), RenderError>;

    /// Read the whole offscreen target back as tightly packed RGBA8 rows.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if there is no target or readback fails.
    fn read_pixels(&mut self) -> Result<Vec<u8>, RenderError>;

    /// Drop every resource created through this trait.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_helpers() {
        let extent = Extent::new(640, 480);
        assert_eq!(extent.to_string(), "640x480");
        assert_eq!(extent.rgba8_len(), 640 * 480 * 4);
        assert!(!extent.is_empty());
        assert!(Extent::new(0, 480).is_empty());
        assert!(Extent::default().is_empty());
    }
}
