use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureFormat;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Capture", inline)]
#[serde(default)]
/// Where and how captured frames are written.
pub struct CaptureOptions {
    /// Output directory, created on first capture.
    #[schemars(title = "Directory")]
    pub directory: PathBuf,
    /// File name prefix; names are `{prefix}{NNNNN}.{ext}`.
    #[schemars(title = "File Prefix")]
    pub file_prefix: String,
    /// Image format.
    #[schemars(title = "Format")]
    pub format: CaptureFormat,
    /// Encoder quality (JPEG only).
    #[schemars(title = "Quality", range(min = 1, max = 100))]
    pub quality: u8,
    /// Counter file holding the next index. Relative paths are resolved
    /// against `directory`.
    #[schemars(skip)]
    pub counter_file: PathBuf,
    /// Encode and write on a background thread.
    #[schemars(title = "Background Writer")]
    pub background_writer: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("captures"),
            file_prefix: "capture".to_owned(),
            format: CaptureFormat::Png,
            quality: 90,
            counter_file: PathBuf::from("index.toml"),
            background_writer: false,
        }
    }
}
