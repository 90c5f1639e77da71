//! Runtime options with TOML file support.
//!
//! Render, camera, capture and logging settings are consolidated here.
//! Options serialize to/from TOML; the binary takes an optional path to
//! such a file on its command line.

mod camera;
mod capture;
mod logging;
mod render;

use std::path::Path;

pub use camera::CameraOptions;
pub use capture::CaptureOptions;
pub use logging::LoggingOptions;
pub use render::RenderOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ArpassError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[capture]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Clear color, shader strictness and presentation.
    pub render: RenderOptions,
    /// Camera stream and attachment parameters.
    pub camera: CameraOptions,
    /// Capture output parameters.
    pub capture: CaptureOptions,
    /// Log filter for the binary.
    #[schemars(skip)]
    pub logging: LoggingOptions,
}

impl Options {
    /// Generate JSON Schema describing the user-facing options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ArpassError::Io`] if the file cannot be read, or
    /// [`ArpassError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, ArpassError> {
        let content =
            std::fs::read_to_string(path).map_err(ArpassError::Io)?;
        toml::from_str(&content)
            .map_err(|e| ArpassError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`ArpassError`] if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ArpassError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ArpassError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ArpassError::Io)?;
        }
        std::fs::write(path, content).map_err(ArpassError::Io)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::camera::CameraStream;
    use crate::capture::CaptureFormat;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn defaults_match_capture_conventions() {
        let opts = Options::default();
        assert_eq!(opts.render.clear_color, [0.3, 0.3, 0.3, 1.0]);
        assert!(!opts.render.strict_shaders);
        assert_eq!(opts.capture.quality, 90);
        assert_eq!(opts.capture.format, CaptureFormat::Png);
        assert_eq!(opts.camera.stream, CameraStream::Color);
        assert_eq!(opts.logging.filter, "info");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[capture]
format = "jpeg"
directory = "/tmp/shots"
"#;
        let opts: Options = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.capture.format, CaptureFormat::Jpeg);
        assert_eq!(opts.capture.directory, PathBuf::from("/tmp/shots"));
        // Everything else should be default
        assert_eq!(opts.capture.file_prefix, "capture");
        assert_eq!(opts.render, RenderOptions::default());
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir()
            .join(format!("arpass-options-{}", std::process::id()));
        let path = dir.join("options.toml");
        let mut opts = Options::default();
        opts.camera.stream = CameraStream::Fisheye;
        opts.capture.background_writer = true;
        opts.save(&path).unwrap();
        assert_eq!(Options::load(&path).unwrap(), opts);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = std::env::temp_dir()
            .join(format!("arpass-options-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("options.toml");
        std::fs::write(&path, "[render]\nvsync = \"often\"\n").unwrap();
        assert!(matches!(
            Options::load(&path),
            Err(ArpassError::OptionsParse(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("render"));
        assert!(props.contains_key("camera"));
        assert!(props.contains_key("capture"));
        assert!(!props.contains_key("logging"));

        let camera = &props["camera"]["properties"];
        assert!(camera.get("stream").is_some());
        assert!(camera.get("synthetic_width").is_none());
        let capture = &props["capture"]["properties"];
        assert!(capture.get("quality").is_some());
        assert!(capture.get("counter_file").is_none());
    }
}
