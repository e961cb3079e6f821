use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, InquireError, Select, Text};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use playlist_downloader::downloader::progress::short_name;
use playlist_downloader::downloader::utils::create_playlist_folder;
use playlist_downloader::downloader::{
    AppConfig, CatalogEntry, ConnectivityMonitor, DownloadJob, DownloadOrchestrator,
    DownloadOutcome, FormatSelector, PlaylistInspector, ProgressEvent, ProgressSink, ToolManager,
    ToolRunner, YtDlpClient,
};

/// Download every video of a playlist in one chosen format
#[derive(Parser, Debug)]
#[command(name = "playlist-downloader", version, about)]
struct Args {
    /// Playlist URL (prompted when omitted)
    url: Option<String>,

    /// Format id from the catalog (prompted when omitted)
    #[arg(short, long)]
    format: Option<String>,

    /// Folder that receives the per-playlist folder
    #[arg(short, long)]
    output_root: Option<PathBuf>,

    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// yt-dlp executable
    #[arg(long)]
    ytdlp: Option<String>,

    /// Proxy URL passed to yt-dlp (e.g. socks5://127.0.0.1:1080)
    #[arg(long)]
    proxy: Option<String>,

    /// Handle one playlist and exit without asking for another
    #[arg(long)]
    once: bool,

    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Errors reach the user through `error!` only, so even `--quiet` keeps them
fn log_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    tracing_subscriber::registry()
        .with(log_filter(verbose, quiet))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(args: Args) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if args.ytdlp.is_some() {
        config.ytdlp_path = args.ytdlp.clone();
    }
    if args.proxy.is_some() {
        config.network.proxy = args.proxy.clone();
    }
    if args.output_root.is_some() {
        config.output_root = args.output_root.clone();
    }

    let tool = ToolManager::new(config.ytdlp_path.clone()).detect().await;
    match &tool.version {
        Some(version) => info!(path = %tool.path, %version, "using yt-dlp"),
        None => warn!(path = %tool.path, "yt-dlp did not answer --version"),
    }

    let runner: Arc<dyn ToolRunner> = Arc::new(
        YtDlpClient::new(tool.path.clone()).with_capture_timeout(config.capture_timeout()),
    );
    let inspector = PlaylistInspector::new(runner.clone(), config.network.clone())
        .with_video_url_template(config.video_url_template.clone());
    let orchestrator = DownloadOrchestrator::new(runner, config.network.clone())
        .with_merge_output_format(config.merge_output_format.clone());
    let monitor =
        ConnectivityMonitor::from_config(&config.connectivity, config.network.proxy.as_deref())
            .context("Failed to set up the connectivity probe")?;
    let root = config
        .output_root()
        .context("Failed to resolve the output folder")?;

    let mut preset_url = args.url.clone();
    let mut preset_format = args.format.clone();

    loop {
        let url = match preset_url.take() {
            Some(url) => url,
            None => Text::new("📥 Enter playlist URL:").prompt()?,
        };
        let url = url.trim();

        let session = Session {
            inspector: &inspector,
            orchestrator: &orchestrator,
            monitor: &monitor,
            root: &root,
        };
        let attempt = if url.is_empty() {
            Err(anyhow!("Invalid URL."))
        } else {
            session.download(url, preset_format.take()).await.map(|_| ())
        };

        if let Err(e) = attempt {
            // Ctrl-C / Esc at a prompt ends the program
            if args.once || e.downcast_ref::<InquireError>().is_some() {
                return Err(e);
            }
            error!("{:#}", e);
        }

        if args.once {
            break;
        }
        let again = Confirm::new("Do you want to download another playlist?")
            .with_default(false)
            .prompt()?;
        if !again {
            break;
        }
    }

    Ok(())
}

/// Collaborators for one pass of the console flow
struct Session<'a> {
    inspector: &'a PlaylistInspector,
    orchestrator: &'a DownloadOrchestrator,
    monitor: &'a ConnectivityMonitor,
    root: &'a Path,
}

impl Session<'_> {
    async fn download(&self, url: &str, preset_format: Option<String>) -> Result<DownloadOutcome> {
        println!("🔍 Fetching playlist title...");
        let title = self
            .inspector
            .fetch_playlist_title(url)
            .await
            .context("Playlist lookup failed")?;

        let folder = create_playlist_folder(self.root, &title)
            .with_context(|| format!("Failed to create folder for {}", title))?;
        println!("📁 Download folder: {}", folder.display());

        println!("🎞️ Fetching available formats...");
        let catalog = self
            .inspector
            .fetch_catalog(url)
            .await
            .context("Format lookup failed")?;
        if catalog.is_empty() {
            bail!("No formats found.");
        }

        let chosen = choose_format(&catalog, preset_format.as_deref())?;
        println!(
            "\n🚀 Downloading all videos in format: {} ({})",
            chosen.format_id,
            if chosen.is_video_only {
                "video-only + bestaudio"
            } else {
                "video+audio"
            }
        );

        self.monitor.wait_until_online().await;
        println!("✅ Internet connection available.");

        let mut job = DownloadJob::new(url, folder, chosen);
        let progress = ConsoleProgress::new();
        let outcome = self.orchestrator.run(&mut job, &progress).await?;
        progress.finish();

        match outcome {
            DownloadOutcome::Completed => println!("\n✅ Done! All videos downloaded."),
            DownloadOutcome::ToolFailed { exit_code } => {
                let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                println!(
                    "\n⚠️ yt-dlp stopped with exit code {}. Files already downloaded are kept; run again to resume.",
                    code
                );
                for line in &job.error_lines {
                    println!("   {}", line);
                }
            }
        }
        Ok(outcome)
    }
}

fn choose_format<'a>(catalog: &'a [CatalogEntry], preset: Option<&str>) -> Result<&'a CatalogEntry> {
    if let Some(id) = preset {
        return FormatSelector::find(catalog, id)
            .with_context(|| format!("Format {} is not offered for this playlist", id));
    }

    println!("\n📌 Available formats:");
    let labels: Vec<String> = catalog
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {}", i + 1, e.display_label))
        .collect();
    let picked = Select::new("🔢 Choose a format:", labels)
        .with_page_size(15)
        .raw_prompt()?;
    Ok(&catalog[picked.index])
}

/// Console bar for the file in flight
struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("📦 {prefix} [{bar:25.green}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█ "),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_event(&self, event: &ProgressEvent, job: &DownloadJob) {
        match event {
            ProgressEvent::PercentUpdate { .. } => {
                self.bar.set_position(job.current_file_progress.round() as u64);
                self.bar
                    .set_message(format!("{:.1}%", job.current_file_progress));
            }
            ProgressEvent::NewDestination { path, .. } => {
                self.bar.println(format!("🎬 {}", short_name(path)));
                self.bar.set_position(0);
                self.bar.set_message("0.0%");
            }
            ProgressEvent::ItemStarted { index, total } => {
                self.bar.set_prefix(format!("{}/{}", index, total));
            }
            ProgressEvent::Merging { .. } => {
                self.bar.set_message("🔄 Merging video and audio...");
            }
            ProgressEvent::AlreadyDownloaded { .. } => {
                self.bar.set_position(100);
                self.bar.set_message("✅ Already downloaded");
            }
            ProgressEvent::Ignored => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_still_reports_errors() {
        assert_eq!(log_filter(false, true).to_string(), "error");
        assert_eq!(log_filter(true, false).to_string(), "debug");
    }
}
