//! Synthetic camera feed for hosts without camera hardware.
//!
//! A producer thread renders a moving test pattern at a fixed rate and
//! publishes each frame through a triple buffer. The render thread picks
//! up the newest frame in [`CameraSession::update_texture`] and uploads it
//! into the attached [`VideoTexture`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{CameraError, CameraSession, CameraStream, Intrinsics};
use crate::gpu::texture::VideoTexture;

/// Camera session backed by a generated test pattern.
pub struct SyntheticCamera {
    stream: CameraStream,
    intrinsics: Intrinsics,
    queue: wgpu::Queue,
    attached: Mutex<Option<VideoTexture>>,
    frames: Mutex<triple_buffer::Output<Option<Vec<u8>>>>,
    running: Arc<AtomicBool>,
    producer: Option<std::thread::JoinHandle<()>>,
}

impl SyntheticCamera {
    /// Start producing `intrinsics`-sized frames for `stream` at `fps`.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if the producer thread fails to spawn.
    pub fn start(
        queue: wgpu::Queue,
        stream: CameraStream,
        intrinsics: Intrinsics,
        fps: u32,
    ) -> Result<Self, std::io::Error> {
        let (mut input, output) = triple_buffer::triple_buffer(&None);
        let running = Arc::new(AtomicBool::new(true));
        let period = Duration::from_secs(1) / fps.max(1);

        let flag = Arc::clone(&running);
        let Intrinsics { width, height } = intrinsics;
        let producer = std::thread::Builder::new()
            .name("synthetic-camera".into())
            .spawn(move || {
                let mut tick = 0u32;
                while flag.load(Ordering::Acquire) {
                    input.write(Some(test_pattern(width, height, tick)));
                    tick = tick.wrapping_add(1);
                    std::thread::sleep(period);
                }
            })?;

        log::info!(
            "synthetic camera started: {stream} stream, {width}x{height} @ \
             {fps} fps"
        );

        Ok(Self {
            stream,
            intrinsics,
            queue,
            attached: Mutex::new(None),
            frames: Mutex::new(output),
            running,
            producer: Some(producer),
        })
    }

    /// Stop the producer thread. Further updates report
    /// [`CameraError::Disconnected`].
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
    }

    fn check_stream(&self, stream: CameraStream) -> Result<(), CameraError> {
        if stream == self.stream {
            Ok(())
        } else {
            Err(CameraError::StreamUnavailable(stream))
        }
    }
}

impl CameraSession<VideoTexture> for SyntheticCamera {
    fn attach_external_texture(
        &self,
        stream: CameraStream,
        texture: VideoTexture,
    ) -> Result<(), CameraError> {
        self.check_stream(stream)?;
        let mut attached = self
            .attached
            .lock()
            .map_err(|_| CameraError::Backend("attach lock poisoned".into()))?;
        *attached = Some(texture);
        log::debug!("synthetic camera: texture attached to {stream}");
        Ok(())
    }

    fn update_texture(&self, stream: CameraStream) -> Result<(), CameraError> {
        self.check_stream(stream)?;
        if !self.running.load(Ordering::Acquire) {
            return Err(CameraError::Disconnected);
        }
        let attached = self
            .attached
            .lock()
            .map_err(|_| CameraError::Backend("attach lock poisoned".into()))?;
        let texture =
            attached.as_ref().ok_or(CameraError::NotAttached(stream))?;

        let mut frames = self
            .frames
            .lock()
            .map_err(|_| CameraError::Backend("frame lock poisoned".into()))?;
        if !frames.update() {
            return Ok(());
        }
        if let Some(pixels) = frames.output_buffer_mut().take() {
            texture.write_rgba(&self.queue, &pixels)?;
        }
        Ok(())
    }

    fn intrinsics(
        &self,
        stream: CameraStream,
    ) -> Result<Intrinsics, CameraError> {
        self.check_stream(stream)?;
        Ok(self.intrinsics)
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Generate one RGBA8 test-pattern frame.
///
/// Diagonal color gradient with a bright vertical bar that sweeps across
/// the image as `tick` advances.
#[must_use]
pub fn test_pattern(width: u32, height: u32, tick: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    let bar_width = (width / 16).max(1);
    let bar_x = if width == 0 {
        0
    } else {
        tick.wrapping_mul(4) % width
    };
    for y in 0..height {
        for x in 0..width {
            let in_bar = x >= bar_x && x < bar_x.saturating_add(bar_width);
            if in_bar {
                pixels.extend_from_slice(&[255, 255, 255, 255]);
            } else {
                let r = (x * 255 / width.max(1)) as u8;
                let g = (y * 255 / height.max(1)) as u8;
                let b = (tick % 256) as u8;
                pixels.extend_from_slice(&[r, g, b, 255]);
            }
        }
    }
    pixels
}
