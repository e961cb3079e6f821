// Seams between the pipeline and its collaborators

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use super::errors::DownloadError;
use super::models::{CapturedOutput, DownloadJob, OutputSource, ProgressEvent};

/// Runs the external extraction tool
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Name of the program (for logging)
    fn program(&self) -> &str;

    /// Run to completion and capture both pipes.
    /// A non-zero exit is reported in the output, not as an error.
    async fn run_capture(&self, args: &[String]) -> Result<CapturedOutput, DownloadError>;

    /// Run to completion, handing every output line to `on_line` as it arrives.
    /// Lines keep their order within a pipe and are delivered one at a time.
    async fn run_streaming(
        &self,
        args: &[String],
        on_line: &mut (dyn for<'a> FnMut(OutputSource, &'a str) + Send),
    ) -> Result<Option<i32>, DownloadError>;
}

/// Receives progress events together with the job state they produced
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &ProgressEvent, job: &DownloadJob);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent, &DownloadJob) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent, job: &DownloadJob) {
        self(event, job)
    }
}

/// Snapshot pushed through a [`ChannelSink`]
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub event: ProgressEvent,
    pub current_file: Option<String>,
    pub current_file_progress: f64,
}

/// Forwards updates to a UI that drains them on its own loop
pub struct ChannelSink {
    tx: UnboundedSender<ProgressUpdate>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ProgressUpdate>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn on_event(&self, event: &ProgressEvent, job: &DownloadJob) {
        // receiver gone means the UI stopped listening; the download goes on
        let _ = self.tx.send(ProgressUpdate {
            event: event.clone(),
            current_file: job.current_file.clone(),
            current_file_progress: job.current_file_progress,
        });
    }
}
