//! Playlist downloader built on yt-dlp.
//!
//! The pipeline: query the playlist title and the formats of its first item,
//! let the user pick one entry of the ranked catalog, wait for connectivity,
//! then run a single resumable yt-dlp download for the whole playlist while
//! turning its console output into [`ProgressEvent`]s.

pub mod downloader;

pub use downloader::{
    AppConfig, CatalogEntry, ConnectivityMonitor, DownloadError, DownloadJob, DownloadOrchestrator,
    DownloadOutcome, FormatSelector, PlaylistInspector, ProgressEvent, ProgressSink, ToolRunner,
    YtDlpClient,
};
