// Playlist metadata queries
//
// Three batch calls feed the catalog: the playlist title (for the folder name),
// the id of the first item, and the full format listing of that item, which
// stands in for the whole playlist.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::{DownloadError, EmptyStep};
use super::format_selector::FormatSelector;
use super::models::{CapturedOutput, CatalogEntry, FormatDescriptor, NetworkConfig};
use super::traits::ToolRunner;
use super::utils::{first_lines, get_network_args};
use crate::downloader::config::DEFAULT_VIDEO_URL_TEMPLATE;

pub struct PlaylistInspector {
    runner: Arc<dyn ToolRunner>,
    network: NetworkConfig,
    video_url_template: String,
}

impl PlaylistInspector {
    pub fn new(runner: Arc<dyn ToolRunner>, network: NetworkConfig) -> Self {
        Self {
            runner,
            network,
            video_url_template: DEFAULT_VIDEO_URL_TEMPLATE.to_string(),
        }
    }

    pub fn with_video_url_template(mut self, template: impl Into<String>) -> Self {
        self.video_url_template = template.into();
        self
    }

    fn build_args(&self, flags: &[&str], url: &str) -> Vec<String> {
        let mut args: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
        args.extend(get_network_args(&self.network));
        args.push(url.to_string());
        args
    }

    async fn capture(&self, args: Vec<String>) -> Result<CapturedOutput, DownloadError> {
        let out = self.runner.run_capture(&args).await?;
        if out.stdout.trim().is_empty() && !out.stderr.trim().is_empty() {
            warn!("{} stderr: {}", self.runner.program(), first_lines(&out.stderr, 6));
        }
        if !out.success() {
            debug!(code = ?out.exit_code, "{} exited with failure", self.runner.program());
        }
        Ok(out)
    }

    /// Title of the playlist behind `url`
    pub async fn fetch_playlist_title(&self, url: &str) -> Result<String, DownloadError> {
        let out = self
            .capture(self.build_args(&["-j", "--flat-playlist"], url))
            .await?;
        let title = parse_playlist_title(&out.stdout)
            .ok_or(DownloadError::EmptyResult(EmptyStep::PlaylistTitle))?;
        info!(%title, "playlist title");
        Ok(title)
    }

    /// Single-video URL of the first playlist item
    pub async fn fetch_first_video_url(&self, url: &str) -> Result<String, DownloadError> {
        let out = self
            .capture(self.build_args(
                &["--get-id", "--skip-download", "--playlist-items", "1"],
                url,
            ))
            .await?;
        let id = out
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or(DownloadError::EmptyResult(EmptyStep::FirstVideoId))?;
        Ok(self.video_url_template.replace("{id}", id))
    }

    /// Raw format listing of one video
    pub async fn fetch_format_listing(
        &self,
        video_url: &str,
    ) -> Result<Vec<FormatDescriptor>, DownloadError> {
        let out = self
            .capture(self.build_args(&["-J", "--no-playlist"], video_url))
            .await?;
        if out.stdout.trim().is_empty() {
            return Err(DownloadError::EmptyResult(EmptyStep::FormatListing));
        }
        let json = parse_document(&out.stdout)?;
        Ok(parse_formats(&json))
    }

    /// Catalog for the playlist, built from its first item.
    /// May be empty; the caller decides how to report that.
    pub async fn fetch_catalog(&self, playlist_url: &str) -> Result<Vec<CatalogEntry>, DownloadError> {
        let video_url = self.fetch_first_video_url(playlist_url).await?;
        debug!(%video_url, "representative video");
        let listing = self.fetch_format_listing(&video_url).await?;
        let catalog = FormatSelector::build_catalog(&listing);
        info!(raw = listing.len(), offered = catalog.len(), "format catalog");
        Ok(catalog)
    }
}

/// First `playlist_title` string found in JSON-lines output.
/// Lines that are not JSON are skipped.
pub fn parse_playlist_title(stdout: &str) -> Option<String> {
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let json: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "skipping non-JSON line");
                continue;
            }
        };
        if let Some(title) = json["playlist_title"].as_str() {
            if !title.trim().is_empty() {
                return Some(title.to_string());
            }
        }
    }
    None
}

/// The `-J` document; falls back to the first line that parses as an object
fn parse_document(stdout: &str) -> Result<Value, DownloadError> {
    match serde_json::from_str::<Value>(stdout.trim()) {
        Ok(v) => Ok(v),
        Err(whole_err) => stdout
            .lines()
            .filter_map(|l| serde_json::from_str::<Value>(l.trim()).ok())
            .find(Value::is_object)
            .ok_or_else(|| DownloadError::ParseError(format!("Invalid JSON: {}", whole_err))),
    }
}

/// Format descriptors from a `-J` document; no `formats` array means none
pub fn parse_formats(json: &Value) -> Vec<FormatDescriptor> {
    let Some(formats_array) = json["formats"].as_array() else {
        return Vec::new();
    };

    formats_array
        .iter()
        .map(|f| FormatDescriptor {
            format_id: str_field(f, "format_id").unwrap_or_default(),
            ext: str_field(f, "ext").unwrap_or_default(),
            vcodec: str_field(f, "vcodec"),
            acodec: str_field(f, "acodec"),
            height: u64_field(f, "height").and_then(|h| u32::try_from(h).ok()),
            fps: f["fps"].as_f64(),
            tbr: f["tbr"].as_f64(),
            filesize: u64_field(f, "filesize"),
            filesize_approx: u64_field(f, "filesize_approx"),
        })
        .collect()
}

fn str_field(f: &Value, name: &str) -> Option<String> {
    f[name].as_str().map(|s| s.to_string())
}

/// Integer field, accepting whole-valued floats as some extractors emit them
fn u64_field(f: &Value, name: &str) -> Option<u64> {
    f[name].as_u64().or_else(|| {
        f[name]
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
    })
}
