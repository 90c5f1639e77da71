//! Camera collaborator contract.
//!
//! The renderer never decodes camera frames itself. A [`CameraSession`]
//! owns the device session, writes decoded frames into a texture the
//! renderer registered with it, and reports the sensor intrinsics used to
//! size the offscreen capture target.

mod dispatch;
mod synthetic;

use std::fmt;

pub use dispatch::{
    AttachHandle, AttachState, CameraThread, DispatchError, Dispatcher,
    InlineDispatcher, Task,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use synthetic::{test_pattern, SyntheticCamera};

/// Named camera stream on the device.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CameraStream {
    /// The color (RGB) sensor stream.
    #[default]
    Color,
    /// The wide-angle fisheye stream.
    Fisheye,
}

impl CameraStream {
    /// Stable lowercase name, matching the serialized form.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Fisheye => "fisheye",
        }
    }
}

impl fmt::Display for CameraStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sensor intrinsics reported by the camera for one stream.
///
/// Only the image dimensions matter to the renderer; they fix the size of
/// the offscreen capture target for the lifetime of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intrinsics {
    /// Sensor image width in pixels.
    pub width: u32,
    /// Sensor image height in pixels.
    pub height: u32,
}

impl Intrinsics {
    /// Intrinsics for a `width` x `height` sensor image.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Errors reported by a camera session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// The session does not provide the requested stream.
    StreamUnavailable(CameraStream),
    /// No texture has been attached to the stream yet.
    NotAttached(CameraStream),
    /// The camera session has been closed.
    Disconnected,
    /// Device-specific failure.
    Backend(String),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamUnavailable(stream) => {
                write!(f, "camera stream '{stream}' is not available")
            }
            Self::NotAttached(stream) => {
                write!(f, "no texture attached to camera stream '{stream}'")
            }
            Self::Disconnected => write!(f, "camera session disconnected"),
            Self::Backend(msg) => write!(f, "camera backend error: {msg}"),
        }
    }
}

impl std::error::Error for CameraError {}

/// Camera session consumed by the renderer.
///
/// `T` is the backend's texture handle. Implementations must be callable
/// from several threads: attachment happens on the camera-owning thread
/// (see [`Dispatcher`]), updates and intrinsics queries on the render
/// thread.
pub trait CameraSession<T>: Send + Sync {
    /// Bind `texture` to `stream` so subsequent updates write into it.
    ///
    /// Must not be called from the render thread.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] if the stream is unknown or the session is
    /// closed.
    fn attach_external_texture(
        &self,
        stream: CameraStream,
        texture: T,
    ) -> Result<(), CameraError>;

    /// Refresh the attached texture with the latest available frame.
    ///
    /// May block briefly when no new frame is ready, or do nothing when the
    /// texture is already current.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] if nothing is attached or the session is
    /// closed.
    fn update_texture(&self, stream: CameraStream) -> Result<(), CameraError>;

    /// Image dimensions of `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] if the stream is unknown.
    fn intrinsics(&self, stream: CameraStream)
        -> Result<Intrinsics, CameraError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_serializes_to_lowercase_name() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            stream: CameraStream,
        }
        let text = toml::to_string(&Wrapper {
            stream: CameraStream::Fisheye,
        })
        .unwrap();
        assert_eq!(text.trim(), "stream = \"fisheye\"");
        let parsed: Wrapper = toml::from_str("stream = \"color\"").unwrap();
        assert_eq!(parsed.stream, CameraStream::Color);
        assert_eq!(CameraStream::Color.to_string(), "color");
    }
}
