//! Output volume, read through `pactl`.
//!
//! A long-running `pactl subscribe` child turns mixer events into payload-free
//! wake-ups; every wake-up pulls mute and volume and emits only on change.

use std::process::{Command, Output, Stdio};
use std::sync::Arc;

use deskstat_core::StatusValue;
use deskstat_core::theme::VolumeIcons;
use deskstat_core::volume::{VolumeReading, volume_status};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::AudioError;
use crate::orchestrator::Emitter;

/// Synchronous access to the default output.
pub trait AudioMixer: Send + Sync + 'static {
    fn mute(&self) -> Result<bool, AudioError>;
    /// Linear volume, 1.0 being 100 %.
    fn volume(&self) -> Result<f32, AudioError>;
}

// ─── pactl ────────────────────────────────────────────────────────

/// Each call spawns a new `pactl` process; the mixer itself holds no state.
#[derive(Debug, Clone)]
pub struct PactlMixer {
    bin: String,
}

impl Default for PactlMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl PactlMixer {
    pub fn new() -> Self {
        Self::with_bin("pactl")
    }

    pub fn with_bin(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// pactl translates its output; the parsers expect the C locale.
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.env("LC_ALL", "C").stdin(Stdio::null());
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<String, AudioError> {
        let output: Output = self
            .command()
            .args(args)
            .output()
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::CommandFailed(format!(
                "exit {}: {}",
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".into()),
                stderr.trim(),
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Start `pactl subscribe`. The child is killed when the returned value
    /// is dropped.
    pub fn events(&self) -> Result<PactlEvents, AudioError> {
        let mut child = tokio::process::Command::from(self.command())
            .arg("subscribe")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AudioError::CommandFailed("pactl subscribe has no stdout".into()))?;
        Ok(PactlEvents {
            child,
            lines: BufReader::new(stdout).lines(),
        })
    }
}

fn spawn_error(e: std::io::Error) -> AudioError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AudioError::NotFound
    } else {
        AudioError::Io(e)
    }
}

impl AudioMixer for PactlMixer {
    fn mute(&self) -> Result<bool, AudioError> {
        parse_mute(&self.run(&["get-sink-mute", "@DEFAULT_SINK@"])?)
    }

    fn volume(&self) -> Result<f32, AudioError> {
        parse_volume(&self.run(&["get-sink-volume", "@DEFAULT_SINK@"])?)
    }
}

/// `Mute: yes` / `Mute: no`
pub fn parse_mute(output: &str) -> Result<bool, AudioError> {
    match output.trim().strip_prefix("Mute:").map(str::trim) {
        Some("yes") => Ok(true),
        Some("no") => Ok(false),
        _ => Err(AudioError::Parse(output.trim().to_string())),
    }
}

/// First percentage of `pactl get-sink-volume`, as a linear level.
pub fn parse_volume(output: &str) -> Result<f32, AudioError> {
    output
        .split_whitespace()
        .find_map(|token| token.strip_suffix('%')?.parse::<u32>().ok())
        .map(|percent| percent as f32 / 100.0)
        .ok_or_else(|| AudioError::Parse(output.trim().to_string()))
}

/// True for `pactl subscribe` lines about sinks or the server, which is where
/// the default output's mute, volume and identity change.
pub fn is_mixer_event(line: &str) -> bool {
    line.split_once(" on ")
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .is_some_and(|facility| facility == "sink" || facility == "server")
}

/// Event lines of a running `pactl subscribe`.
pub struct PactlEvents {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl PactlEvents {
    /// Turn mixer events into wake-ups until cancelled or the child exits.
    /// Wake-ups coalesce while the monitor is busy.
    pub async fn forward(mut self, wake: mpsc::Sender<()>, cancel: CancellationToken) {
        loop {
            let line = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                line = self.lines.next_line() => line,
            };
            match line {
                Ok(Some(line)) if is_mixer_event(&line) => {
                    let _ = wake.try_send(());
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!("pactl subscribe exited");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reading pactl events failed");
                    break;
                }
            }
        }
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "pactl subscribe already gone");
        }
    }
}

// ─── Monitor ──────────────────────────────────────────────────────

pub struct AudioMonitor<M> {
    mixer: Arc<M>,
    icons: VolumeIcons,
    last: VolumeReading,
}

impl<M: AudioMixer> AudioMonitor<M> {
    /// The published starting point is unmuted at 0 %.
    pub fn new(mixer: Arc<M>, icons: VolumeIcons) -> Self {
        Self {
            mixer,
            icons,
            last: VolumeReading {
                muted: false,
                percent: 0,
            },
        }
    }

    /// Record a reading; a status comes back only when mute or the rounded
    /// percentage changed.
    pub fn update(&mut self, muted: bool, volume: f32) -> Option<StatusValue> {
        let reading = VolumeReading::from_level(muted, volume);
        if reading == self.last {
            return None;
        }
        self.last = reading;
        Some(volume_status(&self.icons, reading))
    }

    /// Pull mute and volume off the runtime threads. Mixer errors are
    /// logged and skip this round.
    pub async fn pull(&mut self) -> Option<StatusValue> {
        let mixer = Arc::clone(&self.mixer);
        let read = tokio::task::spawn_blocking(move || -> Result<(bool, f32), AudioError> {
            Ok((mixer.mute()?, mixer.volume()?))
        })
        .await;
        match read {
            Ok(Ok((muted, volume))) => self.update(muted, volume),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "cannot read mixer");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "mixer read task failed");
                None
            }
        }
    }

    /// Initial pull, then one pull per wake-up, until cancelled or the
    /// wake-up source is gone.
    pub async fn run(mut self, mut wake: mpsc::Receiver<()>, emitter: Emitter, cancel: CancellationToken) {
        loop {
            if let Some(status) = self.pull().await {
                if !emitter.emit(status).await {
                    return;
                }
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                woke = wake.recv() => {
                    if woke.is_none() {
                        return;
                    }
                }
            }
        }
    }
}
