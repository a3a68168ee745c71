use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;
use thiserror::Error;

/// Sound file shipped by the freedesktop sound theme on most Linux desktops.
const ALARM_SOUND_PATH: &str = "/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga";

#[derive(Error, Debug)]
pub enum AlarmError {
    #[error("Failed to launch {tool}: {source}")]
    Launch {
        tool: &'static str,
        source: std::io::Error,
    },

    #[error("{tool} exited with status {status}")]
    NonZeroExit { tool: &'static str, status: i32 },
}

/// One way of making noise. Strategies are attempted in order until one
/// succeeds; playback is blocking from the strategy's point of view.
pub trait AlarmStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn play(&self, duration: Duration, output_device: Option<&str>) -> Result<(), AlarmError>;
}

/// PulseAudio playback of the freedesktop alarm sample at full volume.
/// The sample has its own length; `duration` is ignored here.
pub struct Paplay;

impl AlarmStrategy for Paplay {
    fn name(&self) -> &'static str {
        "paplay"
    }

    fn play(&self, _duration: Duration, output_device: Option<&str>) -> Result<(), AlarmError> {
        let mut cmd = Command::new("paplay");
        cmd.arg("--volume=65536").arg(ALARM_SOUND_PATH);
        if let Some(device) = output_device {
            cmd.arg(format!("--device={}", device));
        }
        run(cmd, "paplay")
    }
}

/// SoX tone synthesis: a 1 kHz sine for the configured alarm duration.
pub struct SoxSynth;

impl AlarmStrategy for SoxSynth {
    fn name(&self) -> &'static str {
        "play"
    }

    fn play(&self, duration: Duration, _output_device: Option<&str>) -> Result<(), AlarmError> {
        let mut cmd = Command::new("play");
        cmd.args(["-q", "-n", "synth"])
            .arg(format!("{}", duration.as_secs_f32()))
            .args(["sine", "1000", "vol", "0.7"]);
        run(cmd, "play")
    }
}

/// Last resort: the terminal bell character. Never fails.
pub struct TerminalBell;

impl AlarmStrategy for TerminalBell {
    fn name(&self) -> &'static str {
        "terminal bell"
    }

    fn play(&self, _duration: Duration, _output_device: Option<&str>) -> Result<(), AlarmError> {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
        Ok(())
    }
}

fn run(mut cmd: Command, tool: &'static str) -> Result<(), AlarmError> {
    let status = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|source| AlarmError::Launch { tool, source })?;
    if status.success() {
        Ok(())
    } else {
        Err(AlarmError::NonZeroExit {
            tool,
            status: status.code().unwrap_or(-1),
        })
    }
}
