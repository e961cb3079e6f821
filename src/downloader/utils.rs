// Helper functions shared by the inspector and the orchestrator

use std::path::{Path, PathBuf};

use crate::downloader::models::NetworkConfig;

/// Characters no major filesystem accepts in a file name
const RESERVED_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace every filesystem-invalid character with `_`, one for one.
/// All other characters keep their position. A name made only of dots
/// (`.`, `..`) would point at an existing directory, so its dots become `_` too.
pub fn make_valid_file_name(name: &str) -> String {
    let only_dots = !name.is_empty() && name.chars().all(|c| c == '.');
    name.chars()
        .map(|c| {
            if only_dots || c.is_control() || RESERVED_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Create (if needed) the folder `<root>/<sanitized title>` and return it
pub fn create_playlist_folder(root: &Path, playlist_title: &str) -> std::io::Result<PathBuf> {
    let folder = root.join(make_valid_file_name(playlist_title));
    std::fs::create_dir_all(&folder)?;
    Ok(folder)
}

/// yt-dlp output template placing `{title}.{ext}` inside `dir`
pub fn output_template(dir: &Path) -> String {
    dir.join("%(title)s.%(ext)s").to_string_lossy().into_owned()
}

/// Build proxy arguments for yt-dlp
pub fn get_proxy_args(config: &NetworkConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        args.push("--proxy".to_string());
        args.push(proxy.to_string());
    }

    args
}

/// Build timeout arguments for yt-dlp
pub fn get_timeout_args(config: &NetworkConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(timeout) = config.timeout {
        args.push("--socket-timeout".to_string());
        args.push(timeout.to_string());
    }

    args
}

/// Proxy and timeout arguments together
pub fn get_network_args(config: &NetworkConfig) -> Vec<String> {
    let mut args = get_proxy_args(config);
    args.extend(get_timeout_args(config));
    args
}

/// First `count` non-empty lines of `text`
pub fn first_lines(text: &str, count: usize) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .take(count)
        .collect::<Vec<_>>()
        .join("\n")
}
