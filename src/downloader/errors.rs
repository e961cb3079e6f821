// Error types for the playlist pipeline

use std::fmt;

use thiserror::Error;

/// Step of the metadata pipeline that produced nothing usable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyStep {
    /// `-j --flat-playlist` yielded no `playlist_title`
    PlaylistTitle,
    /// `--get-id --playlist-items 1` yielded no id
    FirstVideoId,
    /// `-J --no-playlist` yielded no JSON document
    FormatListing,
}

impl fmt::Display for EmptyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaylistTitle => write!(f, "could not fetch playlist title"),
            Self::FirstVideoId => write!(f, "could not fetch the first playlist item"),
            Self::FormatListing => write!(f, "could not fetch the format listing"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    /// yt-dlp could not be started (missing binary, permission denied)
    #[error("failed to start {program}: {source}")]
    ToolLaunchFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but produced nothing usable for a step
    #[error("{0} (private, unavailable or malformed playlist?)")]
    EmptyResult(EmptyStep),

    /// The child was spawned without one of its output pipes
    #[error("{program}: {pipe} was not captured")]
    PipeUnavailable { program: String, pipe: &'static str },

    /// A batch call exceeded its time bound
    #[error("{program} did not finish within {secs}s")]
    Timeout { program: String, secs: u64 },

    /// Failed to parse yt-dlp JSON output
    #[error("parse error: {0}")]
    ParseError(String),

    /// Invalid or unreadable configuration
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    pub fn launch(program: &str, source: std::io::Error) -> Self {
        Self::ToolLaunchFailure {
            program: program.to_string(),
            source,
        }
    }

    /// Whether retrying the same step could help
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_failure_names_program() {
        let err = DownloadError::launch(
            "yt-dlp",
            std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        );
        let msg = err.to_string();
        assert!(msg.contains("yt-dlp"));
        assert!(msg.contains("No such file"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn missing_pipe_is_not_retryable() {
        let err = DownloadError::PipeUnavailable {
            program: "yt-dlp".to_string(),
            pipe: "stdout",
        };
        assert_eq!(err.to_string(), "yt-dlp: stdout was not captured");
        assert!(!err.is_retryable());
    }

    #[test]
    fn empty_result_describes_step() {
        let err = DownloadError::EmptyResult(EmptyStep::PlaylistTitle);
        assert!(err.to_string().starts_with("could not fetch playlist title"));
    }
}
