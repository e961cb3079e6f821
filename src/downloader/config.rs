// Application configuration (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::connectivity::ConnectivityConfig;
use super::errors::DownloadError;
use super::models::NetworkConfig;

pub const DEFAULT_VIDEO_URL_TEMPLATE: &str = "https://www.youtube.com/watch?v={id}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Explicit yt-dlp executable
    pub ytdlp_path: Option<String>,
    /// Parent of the per-playlist folders (current directory when unset)
    pub output_root: Option<PathBuf>,
    /// Single-video URL built from a playlist item id; `{id}` is replaced
    pub video_url_template: String,
    /// Container for merged video+audio output
    pub merge_output_format: String,
    /// Upper bound for metadata calls
    pub capture_timeout_secs: Option<u64>,
    pub network: NetworkConfig,
    pub connectivity: ConnectivityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            output_root: None,
            video_url_template: DEFAULT_VIDEO_URL_TEMPLATE.to_string(),
            merge_output_format: "mp4".to_string(),
            capture_timeout_secs: Some(120),
            network: NetworkConfig::default(),
            connectivity: ConnectivityConfig::default(),
        }
    }
}

impl AppConfig {
    /// `<config_dir>/playlist-downloader/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("playlist-downloader").join("config.toml"))
    }

    /// Load from `path`, or from the default location when it exists.
    /// An explicit path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, DownloadError> {
        match path {
            Some(p) => Self::from_file(p),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(p) => Self::from_file(&p),
                None => {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, DownloadError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DownloadError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&content)
            .map_err(|e| DownloadError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, DownloadError> {
        let config: Self =
            toml::from_str(content).map_err(|e| DownloadError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DownloadError> {
        if !self.video_url_template.contains("{id}") {
            return Err(DownloadError::Config(
                "video_url_template must contain {id}".to_string(),
            ));
        }
        if self.merge_output_format.trim().is_empty() {
            return Err(DownloadError::Config(
                "merge_output_format must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn capture_timeout(&self) -> Option<Duration> {
        self.capture_timeout_secs.map(Duration::from_secs)
    }

    /// Folder that receives the per-playlist folders
    pub fn output_root(&self) -> std::io::Result<PathBuf> {
        match &self.output_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir(),
        }
    }
}
