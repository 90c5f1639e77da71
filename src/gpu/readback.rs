//! Blocking texture-to-CPU readback.
//!
//! Texture copies must use row pitches aligned to
//! [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`]; the padding is stripped again
//! after mapping so callers always see tightly packed rows.

use std::fmt;
use std::sync::mpsc;

/// Bytes per RGBA8 pixel.
const BYTES_PER_PIXEL: u32 = 4;

/// Errors from reading a texture back to the CPU.
#[derive(Debug)]
pub enum ReadbackError {
    /// Mapping the staging buffer failed.
    Map(wgpu::BufferAsyncError),
    /// Waiting for the GPU failed.
    Poll(wgpu::PollError),
    /// The map callback was dropped without reporting.
    CallbackDropped,
}

impl fmt::Display for ReadbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(e) => write!(f, "failed to map readback buffer: {e}"),
            Self::Poll(e) => write!(f, "device poll failed: {e}"),
            Self::CallbackDropped => {
                write!(f, "readback map callback was never invoked")
            }
        }
    }
}

impl std::error::Error for ReadbackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Map(e) => Some(e),
            Self::Poll(e) => Some(e),
            Self::CallbackDropped => None,
        }
    }
}

/// Row pitch of a `width`-pixel RGBA8 row in a texture copy.
#[must_use]
pub const fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drop the per-row padding from a mapped copy of `height` rows.
#[must_use]
pub fn strip_row_padding(
    padded: &[u8],
    width: u32,
    height: u32,
    padded_row: u32,
) -> Vec<u8> {
    let row = (width * BYTES_PER_PIXEL) as usize;
    let mut pixels = Vec::with_capacity(row * height as usize);
    for chunk in padded.chunks(padded_row as usize).take(height as usize) {
        pixels.extend_from_slice(&chunk[..row.min(chunk.len())]);
    }
    pixels
}

/// Copy a whole RGBA8 `texture` to the CPU, blocking until the GPU is done.
///
/// # Errors
///
/// Returns [`ReadbackError`] if the device cannot be polled or the staging
/// buffer cannot be mapped.
pub fn read_texture_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<Vec<u8>, ReadbackError> {
    let (width, height) = (texture.width(), texture.height());
    let padded_row = padded_bytes_per_row(width);
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Capture Readback"),
        size: u64::from(padded_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    let _ = queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device
        .poll(wgpu::PollType::Wait)
        .map_err(ReadbackError::Poll)?;
    rx.recv()
        .map_err(|_| ReadbackError::CallbackDropped)?
        .map_err(ReadbackError::Map)?;

    let pixels = {
        let mapped = slice.get_mapped_range();
        strip_row_padding(&mapped, width, height, padded_row)
    };
    staging.unmap();
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(640), 2560);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn padding_is_stripped_per_row() {
        let (width, height) = (3u32, 2u32);
        let padded_row = padded_bytes_per_row(width);
        let mut padded = vec![0xEE; (padded_row * height) as usize];
        for y in 0..height {
            for i in 0..width * 4 {
                padded[(y * padded_row + i) as usize] = (y * 100 + i) as u8;
            }
        }
        let pixels = strip_row_padding(&padded, width, height, padded_row);
        assert_eq!(pixels.len(), 24);
        assert_eq!(pixels[0], 0);
        assert_eq!(pixels[11], 11);
        assert_eq!(pixels[12], 100);
        assert!(!pixels.contains(&0xEE));
    }
}
