//! Crate-level error types.

use std::fmt;

use crate::renderer::RenderError;

/// Errors produced by the arpass crate.
#[derive(Debug)]
pub enum ArpassError {
    /// GPU initialization or surface setup failure.
    Render(RenderError),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a background thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for ArpassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(e) => write!(f, "render error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for ArpassError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(e) => Some(e),
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            Self::OptionsParse(_) | Self::Viewer(_) => None,
        }
    }
}

impl From<RenderError> for ArpassError {
    fn from(e: RenderError) -> Self {
        Self::Render(e)
    }
}

impl From<std::io::Error> for ArpassError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn render_errors_keep_their_source() {
        let err = ArpassError::from(RenderError::InvalidIntrinsics {
            width: 0,
            height: 480,
        });
        assert!(err.to_string().starts_with("render error: "));
        assert!(err.source().is_some());
    }

    #[test]
    fn message_variants_have_no_source() {
        let err = ArpassError::OptionsParse("expected `=`".into());
        assert_eq!(err.to_string(), "options parse error: expected `=`");
        assert!(err.source().is_none());
    }
}
