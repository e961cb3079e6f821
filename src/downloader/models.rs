// Common data models for the playlist pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One rendition of a video as reported by yt-dlp's `formats` array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Format ID (e.g., "137", "140")
    pub format_id: String,
    /// File extension (mp4, webm, m4a)
    pub ext: String,
    /// Video codec (avc1, vp9, av01, none)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    pub acodec: Option<String>,
    /// Video height in pixels
    pub height: Option<u32>,
    /// Frames per second
    pub fps: Option<f64>,
    /// Total bitrate in kbps
    pub tbr: Option<f64>,
    /// File size in bytes
    pub filesize: Option<u64>,
    /// Approximate file size (when exact is unknown)
    pub filesize_approx: Option<u64>,
}

impl FormatDescriptor {
    /// Get effective file size (exact or approximate)
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }

    /// No video stream at all (audio-only rendition)
    pub fn is_audio_only(&self) -> bool {
        is_none_codec(self.vcodec.as_deref())
    }

    /// Video stream without an audio track
    pub fn is_video_only(&self) -> bool {
        is_none_codec(self.acodec.as_deref())
    }
}

fn is_none_codec(codec: Option<&str>) -> bool {
    codec.is_some_and(|c| c.eq_ignore_ascii_case("none"))
}

/// A selectable entry of the format catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub format_id: String,
    /// e.g. "137 | mp4 | 1080p/30fps | v:avc1.640028 a:none | ~4400kbps | ~210MB"
    pub display_label: String,
    /// Needs a separate audio stream merged in at download time
    pub is_video_only: bool,
    /// Height in pixels, 0 when unknown
    pub height: u32,
    /// Whole frames per second, 0 when unknown
    pub fps: u32,
}

impl CatalogEntry {
    /// Ordering key: height, then has-audio, then fps (all descending in the catalog)
    pub fn rank_key(&self) -> (u32, bool, u32) {
        (self.height, !self.is_video_only, self.fps)
    }

    /// yt-dlp `-f` argument; video-only streams are paired with the best audio
    pub fn format_selector(&self) -> String {
        selector_for(&self.format_id, self.is_video_only)
    }
}

fn selector_for(format_id: &str, is_video_only: bool) -> String {
    if is_video_only {
        format!("{}+bestaudio", format_id)
    } else {
        format_id.to_string()
    }
}

/// Which pipe of the child process a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// Result of a batch (non-streaming) tool call
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// None when the child was terminated by a signal
    pub exit_code: Option<i32>,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Structured meaning of one line of yt-dlp output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// `[download]  42.5% of ...`; not clamped here
    PercentUpdate { percent: f64 },
    /// `[download] Destination: <path>`
    NewDestination { raw_line: String, path: String },
    /// `[download] Downloading item 3 of 12`
    ItemStarted { index: u32, total: u32 },
    /// `[Merger] Merging formats into ...`
    Merging { raw_line: String },
    /// `... has already been downloaded`
    AlreadyDownloaded { raw_line: String },
    Ignored,
}

/// One playlist download run
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub playlist_url: String,
    pub output_directory: PathBuf,
    pub selected_format_id: String,
    pub is_video_only: bool,
    /// File currently being written, as announced by the last destination line
    pub current_file: Option<String>,
    /// Progress of `current_file`, always within [0, 100]
    pub current_file_progress: f64,
    /// (index, total) of the playlist item in flight
    pub current_item: Option<(u32, u32)>,
    pub files_started: usize,
    /// `ERROR:` lines seen during the run
    pub error_lines: Vec<String>,
}

impl DownloadJob {
    pub fn new(
        playlist_url: impl Into<String>,
        output_directory: impl Into<PathBuf>,
        entry: &CatalogEntry,
    ) -> Self {
        Self {
            playlist_url: playlist_url.into(),
            output_directory: output_directory.into(),
            selected_format_id: entry.format_id.clone(),
            is_video_only: entry.is_video_only,
            current_file: None,
            current_file_progress: 0.0,
            current_item: None,
            files_started: 0,
            error_lines: Vec::new(),
        }
    }

    /// `-f` argument for this job
    pub fn format_selector(&self) -> String {
        selector_for(&self.selected_format_id, self.is_video_only)
    }

    /// Fold one parsed event into the running state
    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PercentUpdate { percent } => {
                self.current_file_progress = percent.clamp(0.0, 100.0);
            }
            ProgressEvent::NewDestination { path, .. } => {
                self.current_file = Some(path.clone());
                self.current_file_progress = 0.0;
                self.files_started += 1;
            }
            ProgressEvent::ItemStarted { index, total } => {
                self.current_item = Some((*index, *total));
            }
            ProgressEvent::AlreadyDownloaded { .. } => {
                self.current_file_progress = 100.0;
            }
            ProgressEvent::Merging { .. } | ProgressEvent::Ignored => {}
        }
    }
}

/// How a download run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadOutcome {
    Completed,
    /// Non-zero exit; files already written stay in place for a resumed retry
    ToolFailed { exit_code: Option<i32> },
}

impl DownloadOutcome {
    pub fn from_exit_code(exit_code: Option<i32>) -> Self {
        match exit_code {
            Some(0) => Self::Completed,
            other => Self::ToolFailed { exit_code: other },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Network configuration forwarded to yt-dlp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Socket timeout in seconds
    pub timeout: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Some(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, video_only: bool) -> CatalogEntry {
        CatalogEntry {
            format_id: id.to_string(),
            display_label: id.to_string(),
            is_video_only: video_only,
            height: 720,
            fps: 30,
        }
    }

    #[test]
    fn selector_pairs_video_only_with_bestaudio() {
        assert_eq!(entry("136", true).format_selector(), "136+bestaudio");
        assert_eq!(entry("22", false).format_selector(), "22");

        let job = DownloadJob::new("https://example.com/list", "/tmp/x", &entry("136", true));
        assert_eq!(job.format_selector(), "136+bestaudio");
    }

    #[test]
    fn job_selector_matches_its_entry() {
        for e in [entry("136", true), entry("22", false)] {
            let job = DownloadJob::new("u", "/tmp/x", &e);
            assert_eq!(job.format_selector(), e.format_selector());
        }
    }

    #[test]
    fn destination_resets_progress() {
        let mut job = DownloadJob::new("u", "/tmp/x", &entry("22", false));
        job.apply(&ProgressEvent::PercentUpdate { percent: 64.0 });
        assert_eq!(job.current_file_progress, 64.0);

        job.apply(&ProgressEvent::NewDestination {
            raw_line: "[download] Destination: /tmp/x/b.mp4".to_string(),
            path: "/tmp/x/b.mp4".to_string(),
        });
        assert_eq!(job.current_file_progress, 0.0);
        assert_eq!(job.current_file.as_deref(), Some("/tmp/x/b.mp4"));
        assert_eq!(job.files_started, 1);
    }

    #[test]
    fn percent_is_clamped_when_applied() {
        let mut job = DownloadJob::new("u", "/tmp/x", &entry("22", false));
        job.apply(&ProgressEvent::PercentUpdate { percent: 130.0 });
        assert_eq!(job.current_file_progress, 100.0);
        job.apply(&ProgressEvent::PercentUpdate { percent: -2.0 });
        assert_eq!(job.current_file_progress, 0.0);
    }

    #[test]
    fn item_and_already_downloaded() {
        let mut job = DownloadJob::new("u", "/tmp/x", &entry("22", false));
        job.apply(&ProgressEvent::ItemStarted { index: 2, total: 5 });
        job.apply(&ProgressEvent::AlreadyDownloaded {
            raw_line: "[download] a.mp4 has already been downloaded".to_string(),
        });
        job.apply(&ProgressEvent::Ignored);
        assert_eq!(job.current_item, Some((2, 5)));
        assert_eq!(job.current_file_progress, 100.0);
    }

    #[test]
    fn outcome_from_exit_code() {
        assert_eq!(DownloadOutcome::from_exit_code(Some(0)), DownloadOutcome::Completed);
        assert_eq!(
            DownloadOutcome::from_exit_code(Some(1)),
            DownloadOutcome::ToolFailed { exit_code: Some(1) }
        );
        assert!(!DownloadOutcome::from_exit_code(None).is_success());
    }

    #[test]
    fn video_only_detection_ignores_case() {
        let f = FormatDescriptor {
            format_id: "136".to_string(),
            vcodec: Some("avc1.4d401f".to_string()),
            acodec: Some("NONE".to_string()),
            ..Default::default()
        };
        assert!(f.is_video_only());
        assert!(!f.is_audio_only());
    }
}
