use std::process::{Command, Stdio};

/// A playback tool we know how to use, plus the package that provides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTool {
    pub command: &'static str,
    pub package_hint: &'static str,
}

const TOOLS: &[PlaybackTool] = &[
    PlaybackTool {
        command: "paplay",
        package_hint: "pulseaudio-utils",
    },
    PlaybackTool {
        command: "play",
        package_hint: "sox",
    },
];

/// Setup-time check for the playback tools the alarm chain prefers.
/// Returns the tools that are missing; the terminal bell works regardless.
pub fn missing_playback_tools() -> Vec<PlaybackTool> {
    TOOLS
        .iter()
        .copied()
        .filter(|tool| !tool_available(tool.command))
        .collect()
}

fn tool_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}
