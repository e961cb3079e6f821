use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::warn;

/// Environment override for the yt-dlp executable
pub const YTDLP_PATH_ENV: &str = "YTDLP_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: Option<String>,
    pub path: String,
    pub is_available: bool,
}

pub struct ToolManager {
    explicit_path: Option<String>,
}

impl ToolManager {
    pub fn new(explicit_path: Option<String>) -> Self {
        Self { explicit_path }
    }

    pub fn binary_name() -> &'static str {
        if cfg!(windows) {
            "yt-dlp.exe"
        } else {
            "yt-dlp"
        }
    }

    /// Resolve the executable: config/CLI, then env, then common paths, then PATH
    pub fn locate(&self) -> String {
        if let Some(path) = self.explicit_path.as_deref().filter(|p| !p.trim().is_empty()) {
            return path.to_string();
        }

        if let Ok(path) = std::env::var(YTDLP_PATH_ENV) {
            if !path.trim().is_empty() {
                return path;
            }
        }

        let binary_name = Self::binary_name();

        // 1. Try common paths first
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name),
            format!("/usr/local/bin/{}", binary_name),
            format!("/usr/bin/{}", binary_name),
        ];

        for path in common_paths {
            if Path::new(&path).exists() {
                return path;
            }
        }

        // 2. Try PATH
        let finder = if cfg!(windows) { "where" } else { "which" };
        if let Ok(output) = Command::new(finder).arg(binary_name).output() {
            if output.status.success() {
                let found = String::from_utf8_lossy(&output.stdout);
                if let Some(first) = found.lines().map(str::trim).find(|l| !l.is_empty()) {
                    return first.to_string();
                }
            }
        }

        // Last resort: hope it's in PATH
        binary_name.to_string()
    }

    pub fn tool_info(&self) -> ToolInfo {
        let path = self.locate();
        let version = Self::version(&path);
        ToolInfo {
            name: "yt-dlp".to_string(),
            is_available: version.is_some(),
            version,
            path,
        }
    }

    /// [`tool_info`](Self::tool_info) on the blocking pool, for async callers.
    /// The PATH lookup and `--version` run synchronous child processes.
    pub async fn detect(self) -> ToolInfo {
        let fallback = self
            .explicit_path
            .clone()
            .unwrap_or_else(|| Self::binary_name().to_string());
        match tokio::task::spawn_blocking(move || self.tool_info()).await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "tool detection did not finish");
                ToolInfo {
                    name: "yt-dlp".to_string(),
                    version: None,
                    path: fallback,
                    is_available: false,
                }
            }
        }
    }

    fn version(path: &str) -> Option<String> {
        match Command::new(path).arg("--version").output() {
            Ok(output) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (!out.is_empty()).then_some(out)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let manager = ToolManager::new(Some("/custom/yt-dlp".to_string()));
        assert_eq!(manager.locate(), "/custom/yt-dlp");
    }

    #[test]
    fn missing_tool_is_unavailable() {
        let manager = ToolManager::new(Some("/definitely/not/here/yt-dlp".to_string()));
        let info = manager.tool_info();
        assert!(!info.is_available);
        assert!(info.version.is_none());
    }

    #[tokio::test]
    async fn detect_keeps_explicit_path() {
        let info = ToolManager::new(Some("/definitely/not/here/yt-dlp".to_string()))
            .detect()
            .await;
        assert_eq!(info.path, "/definitely/not/here/yt-dlp");
        assert!(!info.is_available);
    }
}
