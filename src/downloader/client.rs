// Subprocess client for yt-dlp
//
// Batch calls read both pipes to the end; streaming calls forward each pipe
// line by line through a single queue so the caller sees one line at a time.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::timeout;
use tracing::debug;

use super::errors::DownloadError;
use super::models::{CapturedOutput, OutputSource};
use super::traits::ToolRunner;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub struct YtDlpClient {
    program: String,
    capture_timeout: Option<Duration>,
}

impl YtDlpClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            capture_timeout: None,
        }
    }

    /// Bound batch calls; streaming downloads are never time-limited
    pub fn with_capture_timeout(mut self, limit: Option<Duration>) -> Self {
        self.capture_timeout = limit;
        self
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);
        cmd
    }

    fn missing_pipe(&self, pipe: &'static str) -> DownloadError {
        DownloadError::PipeUnavailable {
            program: self.program.clone(),
            pipe,
        }
    }
}

#[async_trait]
impl ToolRunner for YtDlpClient {
    fn program(&self) -> &str {
        &self.program
    }

    async fn run_capture(&self, args: &[String]) -> Result<CapturedOutput, DownloadError> {
        debug!(program = %self.program, args = %args.join(" "), "capture");

        let mut child = self
            .command(args)
            .spawn()
            .map_err(|e| DownloadError::launch(&self.program, e))?;

        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| self.missing_pipe("stdout"))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| self.missing_pipe("stderr"))?;

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
        });

        let status = match self.capture_timeout {
            Some(limit) => match timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    let _ = child.kill().await;
                    stdout_task.abort();
                    stderr_task.abort();
                    return Err(DownloadError::Timeout {
                        program: self.program.clone(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait().await?,
        };

        let stdout = join_pipe(stdout_task).await?;
        let stderr = join_pipe(stderr_task).await?;

        Ok(CapturedOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
        })
    }

    async fn run_streaming(
        &self,
        args: &[String],
        on_line: &mut (dyn for<'a> FnMut(OutputSource, &'a str) + Send),
    ) -> Result<Option<i32>, DownloadError> {
        debug!(program = %self.program, args = %args.join(" "), "stream");

        let mut child = self
            .command(args)
            .spawn()
            .map_err(|e| DownloadError::launch(&self.program, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.missing_pipe("stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| self.missing_pipe("stderr"))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let stdout_task = tokio::spawn(forward_lines(stdout, OutputSource::Stdout, tx.clone()));
        let stderr_task = tokio::spawn(forward_lines(stderr, OutputSource::Stderr, tx));

        // closes once both readers hit EOF and drop their senders
        while let Some((source, line)) = rx.recv().await {
            on_line(source, &line);
        }

        let _ = stdout_task.await;
        let _ = stderr_task.await;
        let status = child.wait().await?;
        debug!(program = %self.program, code = ?status.code(), "exited");
        Ok(status.code())
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::Io(std::io::Error::other(e)))?
        .map_err(DownloadError::from)
}

/// Read `reader` to EOF, sending every non-blank line.
/// Carriage returns split lines too, and invalid UTF-8 is replaced.
async fn forward_lines<R>(reader: R, source: OutputSource, tx: UnboundedSender<(OutputSource, String)>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                for segment in split_segments(&text) {
                    if tx.send((source, segment.to_string())).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                debug!(?source, error = %e, "pipe read failed");
                break;
            }
        }
    }
}

fn split_segments(text: &str) -> impl Iterator<Item = &str> {
    text.split(&['\r', '\n'][..]).filter(|s| !s.trim().is_empty())
}
