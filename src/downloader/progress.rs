// Line classifier for yt-dlp console output
//
// yt-dlp has no machine-readable progress channel on a plain download, so the
// text lines are the contract. A percent update needs the bracketed
// `[download]` tag as the first tag on the line, so file names that happen
// to contain "download 50%" never count as progress.

use lazy_static::lazy_static;
use regex::Regex;

use super::models::ProgressEvent;

lazy_static! {
    // [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)
    static ref PERCENT_RE: Regex =
        Regex::new(r"^[^\[]*\[\s*download\s*\]\s+(\d{1,3}(?:\.\d+)?)%").unwrap();
    static ref ITEM_RE: Regex =
        Regex::new(r"Downloading (?:item|video) (\d+) of (\d+)").unwrap();
    static ref MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
}

const DESTINATION_MARKER: &str = "Destination:";

/// Map one output line to its event. Pure: the same line always yields the same event.
pub fn parse_line(line: &str) -> ProgressEvent {
    if let Some(percent) = PERCENT_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        return ProgressEvent::PercentUpdate { percent };
    }

    if let Some(pos) = line.find(DESTINATION_MARKER) {
        let path = line[pos + DESTINATION_MARKER.len()..].trim().to_string();
        return ProgressEvent::NewDestination {
            raw_line: line.to_string(),
            path,
        };
    }

    if let Some(caps) = ITEM_RE.captures(line) {
        let index = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let total = caps.get(2).and_then(|m| m.as_str().parse().ok());
        if let (Some(index), Some(total)) = (index, total) {
            return ProgressEvent::ItemStarted { index, total };
        }
    }

    if MERGE_RE.is_match(line) {
        return ProgressEvent::Merging {
            raw_line: line.to_string(),
        };
    }

    if line.contains("has already been downloaded") {
        return ProgressEvent::AlreadyDownloaded {
            raw_line: line.to_string(),
        };
    }

    ProgressEvent::Ignored
}

/// `ERROR:` lines carry the reason behind a failed exit; they stay `Ignored`
/// as progress but callers may keep them for the final report.
pub fn error_message(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed.starts_with("ERROR:").then_some(trimmed)
}

/// File name portion of a destination path, for compact display
pub fn short_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path)
}
