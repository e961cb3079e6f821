// Download orchestrator: one yt-dlp run for a whole playlist

use std::sync::Arc;
use tracing::{info, trace, warn};

use super::errors::DownloadError;
use super::models::{DownloadJob, DownloadOutcome, NetworkConfig, OutputSource};
use super::progress;
use super::traits::{ProgressSink, ToolRunner};
use super::utils::{get_network_args, output_template};

pub struct DownloadOrchestrator {
    runner: Arc<dyn ToolRunner>,
    network: NetworkConfig,
    merge_output_format: String,
}

impl DownloadOrchestrator {
    pub fn new(runner: Arc<dyn ToolRunner>, network: NetworkConfig) -> Self {
        Self {
            runner,
            network,
            merge_output_format: "mp4".to_string(),
        }
    }

    pub fn with_merge_output_format(mut self, format: impl Into<String>) -> Self {
        self.merge_output_format = format.into();
        self
    }

    /// Full argument list for `job`
    pub fn build_args(&self, job: &DownloadJob) -> Vec<String> {
        let mut args = vec![
            // resume partial files
            "-c".to_string(),
            "--newline".to_string(),
            "-f".to_string(),
            job.format_selector(),
            "--merge-output-format".to_string(),
            self.merge_output_format.clone(),
            "--yes-playlist".to_string(),
            "-o".to_string(),
            output_template(&job.output_directory),
        ];
        args.extend(get_network_args(&self.network));
        args.push(job.playlist_url.clone());
        args
    }

    /// Run the download to process exit, feeding every output line through the
    /// parser into `job` and then `sink`.
    ///
    /// A non-zero exit is an outcome, not an error: files written so far stay
    /// and a rerun with the same job resumes them.
    pub async fn run(
        &self,
        job: &mut DownloadJob,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutcome, DownloadError> {
        let args = self.build_args(job);
        info!(
            url = %job.playlist_url,
            format = %job.format_selector(),
            dir = %job.output_directory.display(),
            "starting playlist download"
        );

        let exit_code = {
            let mut on_line = |source: OutputSource, line: &str| {
                trace!(?source, "{}", line);
                if let Some(message) = progress::error_message(line) {
                    job.error_lines.push(message.to_string());
                }
                let event = progress::parse_line(line);
                job.apply(&event);
                sink.on_event(&event, job);
            };
            self.runner.run_streaming(&args, &mut on_line).await?
        };

        let outcome = DownloadOutcome::from_exit_code(exit_code);
        match outcome {
            DownloadOutcome::Completed => {
                info!(files = job.files_started, "playlist download finished")
            }
            DownloadOutcome::ToolFailed { exit_code } => warn!(
                code = ?exit_code,
                errors = job.error_lines.len(),
                "{} exited with failure",
                self.runner.program()
            ),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::{CapturedOutput, CatalogEntry, ProgressEvent};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned output lines and exits with a fixed code
    struct ReplayRunner {
        lines: Vec<(OutputSource, &'static str)>,
        exit_code: Option<i32>,
        args: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolRunner for ReplayRunner {
        fn program(&self) -> &str {
            "yt-dlp"
        }

        async fn run_capture(&self, _args: &[String]) -> Result<CapturedOutput, DownloadError> {
            Ok(CapturedOutput::default())
        }

        async fn run_streaming(
            &self,
            args: &[String],
            on_line: &mut (dyn for<'a> FnMut(OutputSource, &'a str) + Send),
        ) -> Result<Option<i32>, DownloadError> {
            *self.args.lock().unwrap() = args.to_vec();
            for (source, line) in &self.lines {
                on_line(*source, line);
            }
            Ok(self.exit_code)
        }
    }

    fn entry(id: &str, video_only: bool) -> CatalogEntry {
        CatalogEntry {
            format_id: id.to_string(),
            display_label: id.to_string(),
            is_video_only: video_only,
            height: 720,
            fps: 30,
        }
    }

    fn orchestrator(lines: Vec<(OutputSource, &'static str)>, exit_code: Option<i32>) -> (DownloadOrchestrator, Arc<ReplayRunner>) {
        let runner = Arc::new(ReplayRunner {
            lines,
            exit_code,
            args: Mutex::new(Vec::new()),
        });
        let network = NetworkConfig {
            proxy: None,
            timeout: None,
        };
        (DownloadOrchestrator::new(runner.clone(), network), runner)
    }

    #[test]
    fn args_for_video_only_entry() {
        let (orch, _) = orchestrator(vec![], Some(0));
        let job = DownloadJob::new("https://example.com/list", "/tmp/list", &entry("136", true));

        let args = orch.build_args(&job);

        assert_eq!(
            args,
            vec![
                "-c".to_string(),
                "--newline".to_string(),
                "-f".to_string(),
                "136+bestaudio".to_string(),
                "--merge-output-format".to_string(),
                "mp4".to_string(),
                "--yes-playlist".to_string(),
                "-o".to_string(),
                output_template(std::path::Path::new("/tmp/list")),
                "https://example.com/list".to_string(),
            ]
        );
    }

    #[test]
    fn args_for_muxed_entry_and_proxy() {
        let runner = Arc::new(ReplayRunner {
            lines: vec![],
            exit_code: Some(0),
            args: Mutex::new(Vec::new()),
        });
        let network = NetworkConfig {
            proxy: Some("http://127.0.0.1:8080".to_string()),
            timeout: Some(20),
        };
        let orch = DownloadOrchestrator::new(runner, network).with_merge_output_format("mkv");
        let job = DownloadJob::new("u", "/tmp/list", &entry("22", false));

        let args = orch.build_args(&job);

        assert_eq!(args[3], "22");
        assert_eq!(args[5], "mkv");
        assert!(args.windows(2).any(|w| w[0] == "--proxy" && w[1] == "http://127.0.0.1:8080"));
        assert_eq!(args.last().map(String::as_str), Some("u"));
    }

    #[tokio::test]
    async fn run_folds_events_into_job_and_sink() {
        let lines = vec![
            (OutputSource::Stdout, "[download] Downloading item 1 of 2"),
            (OutputSource::Stdout, "[download] Destination: /tmp/list/First.mp4"),
            (OutputSource::Stdout, "[download]  50.0% of 10.00MiB"),
            (OutputSource::Stdout, "[download] 100% of 10.00MiB"),
            (OutputSource::Stdout, "[download] Downloading item 2 of 2"),
            (OutputSource::Stdout, "[download] Destination: /tmp/list/Second.mp4"),
            (OutputSource::Stdout, "[download]  12.0% of 20.00MiB"),
        ];
        let (orch, runner) = orchestrator(lines, Some(0));
        let mut job = DownloadJob::new("u", "/tmp/list", &entry("22", false));

        let seen: Mutex<Vec<(ProgressEvent, f64)>> = Mutex::new(Vec::new());
        let sink = |event: &ProgressEvent, job: &DownloadJob| {
            seen.lock().unwrap().push((event.clone(), job.current_file_progress));
        };

        let outcome = orch.run(&mut job, &sink).await.unwrap();

        assert_eq!(outcome, DownloadOutcome::Completed);
        assert_eq!(job.files_started, 2);
        assert_eq!(job.current_file.as_deref(), Some("/tmp/list/Second.mp4"));
        assert_eq!(job.current_file_progress, 12.0);
        assert_eq!(job.current_item, Some((2, 2)));
        assert!(runner.args.lock().unwrap().contains(&"--yes-playlist".to_string()));

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 7);
        // destination resets the running progress before the next update
        assert_eq!(seen[5].1, 0.0);
        assert_eq!(seen[3].1, 100.0);
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_not_raised() {
        let lines = vec![
            (OutputSource::Stdout, "[download] Destination: /tmp/list/First.mp4"),
            (OutputSource::Stderr, "ERROR: [youtube] xyz: Video unavailable"),
        ];
        let (orch, _) = orchestrator(lines, Some(1));
        let mut job = DownloadJob::new("u", "/tmp/list", &entry("136", true));

        let outcome = orch.run(&mut job, &|_: &ProgressEvent, _: &DownloadJob| {}).await.unwrap();

        assert_eq!(outcome, DownloadOutcome::ToolFailed { exit_code: Some(1) });
        assert_eq!(job.error_lines, vec!["ERROR: [youtube] xyz: Video unavailable".to_string()]);
        assert_eq!(job.files_started, 1);
    }
}
