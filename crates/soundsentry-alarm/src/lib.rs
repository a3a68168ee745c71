pub mod chain;
pub mod probe;
pub mod strategy;

pub use chain::{AlarmChain, AlarmTrigger};
pub use probe::{missing_playback_tools, PlaybackTool};
pub use strategy::{AlarmError, AlarmStrategy, Paplay, SoxSynth, TerminalBell};
