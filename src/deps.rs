// Startup check for the two external tools the engine drives
// Missing tools are warned about, not fatal - the kiosk keeps running

use crate::config::Config;
use serde::Serialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub search_command: String,
    pub search_version: Option<String>,
    pub player_command: String,
    pub player_version: Option<String>,
}

impl DependencyReport {
    pub fn all_present(&self) -> bool {
        self.search_version.is_some() && self.player_version.is_some()
    }
}

/// First line of `<command> --version`, `None` if it can't be run
pub async fn command_version(command: &str, timeout: Duration) -> Option<String> {
    let run = Command::new(command)
        .arg("--version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, run).await.ok()?.ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

pub async fn check_dependencies(config: &Config) -> DependencyReport {
    let (search_version, player_version) = tokio::join!(
        command_version(&config.search.command, PROBE_TIMEOUT),
        command_version(&config.player.command, PROBE_TIMEOUT),
    );

    match &search_version {
        Some(version) => info!("{} found: {}", config.search.command, version),
        None => warn!("{} not found. Please install: pip install yt-dlp", config.search.command),
    }
    match &player_version {
        Some(version) => info!("{} found: {}", config.player.command, version),
        None => warn!("{} not found. Please install: sudo apt-get install mpv", config.player.command),
    }

    DependencyReport {
        search_command: config.search.command.clone(),
        search_version,
        player_command: config.player.command.clone(),
        player_version,
    }
}
