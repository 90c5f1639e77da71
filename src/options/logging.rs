use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Logging", inline)]
#[serde(default)]
/// Log output configuration for the binary.
pub struct LoggingOptions {
    /// `env_logger` filter directive used when `RUST_LOG` is unset.
    #[schemars(title = "Filter")]
    pub filter: String,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}
