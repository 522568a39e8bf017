use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::AlertSettings;

/// Plays the alarm clip through an external player command.
///
/// Playback is fire-and-forget: the player runs as a child process and is
/// reaped on a helper thread, so the monitoring loop never waits on it. A
/// missing clip or a player that fails to start is logged at debug level and
/// otherwise ignored; the visual alert is unaffected.
#[derive(Clone, Debug)]
pub struct AudioCue {
    sound_path: PathBuf,
    player: String,
}

impl AudioCue {
    pub fn new(sound_path: impl Into<PathBuf>, player: impl Into<String>) -> Self {
        Self {
            sound_path: sound_path.into(),
            player: player.into(),
        }
    }

    /// Build from settings; `None` when no clip is configured.
    pub fn from_settings(settings: &AlertSettings) -> Option<Self> {
        settings
            .sound_path
            .as_ref()
            .map(|path| Self::new(path.clone(), settings.player.clone()))
    }

    /// Start playback. Returns whether a player process was started.
    pub fn play(&self) -> bool {
        if !self.sound_path.is_file() {
            log::debug!(
                "alert sound {} not found; skipping audio cue",
                self.sound_path.display()
            );
            return false;
        }
        let spawned = Command::new(&self.player)
            .arg(&self.sound_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
                true
            }
            Err(err) => {
                log::debug!("failed to start alert player '{}': {}", self.player, err);
                false
            }
        }
    }
}
