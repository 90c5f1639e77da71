use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::camera::CameraStream;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Camera", inline)]
#[serde(default)]
/// Camera stream selection and texture attachment parameters.
pub struct CameraOptions {
    /// Stream drawn by the renderer.
    #[schemars(title = "Stream")]
    pub stream: CameraStream,
    /// Block surface creation until the camera confirms the texture
    /// attachment (bounded by `attach_timeout_ms`).
    #[schemars(title = "Await Attach")]
    pub await_attach: bool,
    /// Upper bound on the attachment wait, in milliseconds.
    #[schemars(title = "Attach Timeout (ms)", range(min = 0, max = 10_000))]
    pub attach_timeout_ms: u64,
    /// Synthetic feed width when no camera hardware is present.
    #[schemars(skip)]
    pub synthetic_width: u32,
    /// Synthetic feed height when no camera hardware is present.
    #[schemars(skip)]
    pub synthetic_height: u32,
    /// Synthetic feed frame rate.
    #[schemars(skip)]
    pub synthetic_fps: u32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            stream: CameraStream::Color,
            await_attach: true,
            attach_timeout_ms: 1000,
            synthetic_width: 640,
            synthetic_height: 480,
            synthetic_fps: 30,
        }
    }
}
