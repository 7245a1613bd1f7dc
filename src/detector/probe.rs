//! Desktop activity probes.
//!
//! The primary probe enumerates visible windows with their owning process;
//! the fallback lists running process names only. Both shell out, so either
//! can fail; callers treat failures as "no detection this tick".

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// A visible window and the process that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub process: String,
    pub title: String,
}

#[async_trait]
pub trait ActivityProbe: Send + Sync {
    /// Enumerate visible windows. Precise but may fail (permissions, etc.).
    async fn list_windows(&self) -> Result<Vec<WindowInfo>>;

    /// Cheaper fallback: running process names only.
    async fn list_processes(&self) -> Result<Vec<String>>;
}

const LIST_WINDOWS_SCRIPT: &str = r#"
tell application "System Events"
    set appList to ""
    repeat with proc in (every process whose background only is false)
        set procName to name of proc
        try
            repeat with win in (every window of proc)
                set winTitle to name of win
                set appList to appList & procName & "|" & winTitle & "\n"
            end repeat
        end try
    end repeat
    return appList
end tell
"#;

/// Probe backed by System Events (windows) and `ps` (processes).
#[derive(Debug, Default)]
pub struct SystemProbe;

impl SystemProbe {
    fn parse_window_list(output: &str) -> Vec<WindowInfo> {
        output
            .lines()
            .filter_map(|line| {
                let (process, title) = line.split_once('|')?;
                if process.is_empty() || title.is_empty() {
                    return None;
                }
                Some(WindowInfo {
                    process: process.to_string(),
                    title: title.to_string(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ActivityProbe for SystemProbe {
    async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(LIST_WINDOWS_SCRIPT)
            .output()
            .await
            .context("Failed to run window enumeration script")?;

        if !output.status.success() {
            bail!(
                "window enumeration exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Self::parse_window_list(&stdout))
    }

    async fn list_processes(&self) -> Result<Vec<String>> {
        let output = Command::new("ps")
            .args(["-axo", "comm="])
            .output()
            .await
            .context("Failed to list processes")?;

        if !output.status.success() {
            bail!("process listing exited with {}", output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_list() {
        let parsed = SystemProbe::parse_window_list(
            "zoom.us|Zoom Meeting\nGoogle Chrome|Inbox - Gmail\n",
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].process, "zoom.us");
        assert_eq!(parsed[0].title, "Zoom Meeting");
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let parsed = SystemProbe::parse_window_list("no-separator\n|empty process\nSlack|\n");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_parse_keeps_extra_separators_in_title() {
        let parsed = SystemProbe::parse_window_list("Slack|Huddle | #standup\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "Huddle | #standup");
    }
}
