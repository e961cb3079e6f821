// Downloader module - playlist format discovery and download orchestration

pub mod client;
pub mod config;
pub mod connectivity;
pub mod errors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod playlist;
pub mod progress;
pub mod tools;
pub mod traits;
pub mod utils;

pub use client::YtDlpClient;
pub use config::AppConfig;
pub use connectivity::{ConnectivityConfig, ConnectivityMonitor, HttpProbe, Probe, ProbeKind, TcpProbe};
pub use errors::{DownloadError, EmptyStep};
pub use format_selector::FormatSelector;
pub use models::{
    CapturedOutput, CatalogEntry, DownloadJob, DownloadOutcome, FormatDescriptor, NetworkConfig,
    OutputSource, ProgressEvent,
};
pub use orchestrator::DownloadOrchestrator;
pub use playlist::PlaylistInspector;
pub use tools::{ToolInfo, ToolManager};
pub use traits::{ChannelSink, ProgressSink, ProgressUpdate, ToolRunner};
