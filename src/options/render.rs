use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Render", inline)]
#[serde(default)]
/// Draw and presentation parameters.
pub struct RenderOptions {
    /// RGBA clear color behind the camera quad.
    #[schemars(title = "Clear Color")]
    pub clear_color: [f32; 4],
    /// Fail surface creation when the passthrough shader does not link,
    /// instead of clearing frames without drawing.
    #[schemars(title = "Strict Shaders")]
    pub strict_shaders: bool,
    /// Present in sync with the display refresh.
    #[schemars(title = "VSync")]
    pub vsync: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            clear_color: [0.3, 0.3, 0.3, 1.0],
            strict_shaders: false,
            vsync: true,
        }
    }
}
