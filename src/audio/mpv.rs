use super::{RenderHandle, Renderer, Track};
use crate::config::PlayerConfig;
use std::io;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// mpv as the audio renderer. mpv pulls the stream through yt-dlp itself,
/// so all we hand it is the watch URL.
#[derive(Debug, Clone)]
pub struct Mpv {
    command: String,
    extra_args: Vec<String>,
}

impl Mpv {
    pub fn new(command: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            extra_args,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(config.command.clone(), config.extra_args.clone())
    }

    pub fn args_for(&self, track: &Track, volume: u8) -> Vec<String> {
        let mut args = vec![
            "--no-video".to_string(),      // audio only
            "--no-terminal".to_string(),
            "--really-quiet".to_string(),
            "--audio-display=no".to_string(), // no album art window
            "--ytdl-format=bestaudio".to_string(),
            format!("--volume={}", volume.min(100)),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(track.source_url.clone());
        args
    }
}

impl Renderer for Mpv {
    fn spawn(&self, track: &Track, volume: u8) -> io::Result<Arc<dyn RenderHandle>> {
        let child = Command::new(&self.command)
            .args(self.args_for(track, volume))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        debug!(pid = child.id(), url = %track.source_url, "spawned {}", self.command);
        Ok(Arc::new(MpvProcess::new(child)))
    }
}

/// A running mpv child. Killed and reaped on drop so nothing outlives us.
pub struct MpvProcess {
    pid: u32,
    child: Mutex<Child>,
}

impl MpvProcess {
    fn new(child: Child) -> Self {
        Self {
            pid: child.id(),
            child: Mutex::new(child),
        }
    }

    fn child(&self) -> MutexGuard<'_, Child> {
        // A panic while holding the guard can't leave Child in a bad state
        self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RenderHandle for MpvProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn is_running(&self) -> bool {
        matches!(self.child().try_wait(), Ok(None))
    }

    #[cfg(unix)]
    fn terminate(&self) -> io::Result<()> {
        // Hold the lock so the pid can't be reaped (and recycled) under us
        let mut child = self.child();
        if !matches!(child.try_wait(), Ok(None)) {
            return Ok(());
        }
        let rc = unsafe { libc::kill(self.pid as libc::pid_t, libc::SIGTERM) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self) -> io::Result<()> {
        self.kill()
    }

    fn kill(&self) -> io::Result<()> {
        let mut child = self.child();
        if !matches!(child.try_wait(), Ok(None)) {
            return Ok(());
        }
        child.kill()?;
        // SIGKILL can't be ignored, reaping is immediate
        child.wait()?;
        Ok(())
    }
}

impl Drop for MpvProcess {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.kill() {
                warn!(pid = self.pid, "failed to kill renderer on drop: {}", e);
            }
        }
    }
}
