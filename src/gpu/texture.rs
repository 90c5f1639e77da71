//! Textures and render targets used by the passthrough renderer.
//!
//! The video texture and the offscreen capture target share an sRGB RGBA8
//! format, so sampling one and rendering into the other reproduces the
//! camera bytes exactly, while the swapchain still receives correctly
//! encoded color.

use crate::camera::CameraError;

/// Pixel format of the video texture and the offscreen capture target.
pub const CAPTURE_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Rgba8UnormSrgb;

/// Depth format of the screen pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// A render-target texture and its default view.
///
/// Used as the screen target in texture-only mode, where there is no
/// swapchain to present to. Created with
/// `RENDER_ATTACHMENT | TEXTURE_BINDING | COPY_SRC` so an embedding host
/// can composite or read it back.
pub struct RenderTarget {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    /// Create a new render-target texture with the given dimensions and format.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("RenderTarget"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Offscreen color attachment sized to the camera sensor.
///
/// Rendered into only on capture frames, then copied to a readback
/// buffer. Its size never follows the window.
pub struct OffscreenTarget {
    /// Color texture (`RENDER_ATTACHMENT | COPY_SRC`).
    pub texture: wgpu::Texture,
    /// Default view for the render pass.
    pub view: wgpu::TextureView,
}

impl OffscreenTarget {
    /// Allocate a `width` x `height` capture target.
    #[must_use]
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Capture Target"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CAPTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Depth attachment for the screen pass, resized with the surface.
pub struct DepthTarget {
    /// Depth texture.
    pub texture: wgpu::Texture,
    /// Default view for the render pass.
    pub view: wgpu::TextureView,
}

impl DepthTarget {
    /// Allocate a `width` x `height` depth buffer.
    #[must_use]
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Screen Depth"),
            size: extent(width.max(1), height.max(1)),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Texture the camera writes decoded frames into.
///
/// Cheap to clone; clones refer to the same GPU texture, so the copy handed
/// to the camera session and the one bound by the renderer stay in sync.
#[derive(Debug, Clone)]
pub struct VideoTexture {
    /// Sampled texture (`TEXTURE_BINDING | COPY_DST`).
    pub texture: wgpu::Texture,
    /// Default view bound to the passthrough shader.
    pub view: wgpu::TextureView,
}

impl VideoTexture {
    /// Allocate a single-mip `width` x `height` video texture.
    #[must_use]
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Camera Video Texture"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CAPTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Texture width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    /// Texture height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    /// Upload a full tightly packed RGBA8 frame.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::Backend`] if `pixels` does not cover the
    /// whole texture.
    pub fn write_rgba(
        &self,
        queue: &wgpu::Queue,
        pixels: &[u8],
    ) -> Result<(), CameraError> {
        let (width, height) = (self.width(), self.height());
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(CameraError::Backend(format!(
                "frame has {} bytes, video texture needs {expected}",
                pixels.len()
            )));
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            extent(width, height),
        );
        Ok(())
    }
}
