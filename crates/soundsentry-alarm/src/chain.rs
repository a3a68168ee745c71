use std::sync::Arc;
use std::time::Duration;

use crate::strategy::{AlarmStrategy, Paplay, SoxSynth, TerminalBell};

/// Fire-and-forget alarm side effect consumed by the monitor loop.
pub trait AlarmTrigger: Send + Sync {
    fn trigger(&self, duration: Duration);
}

/// Ordered list of playback strategies. Each is attempted in sequence until
/// one succeeds; failures are logged and never propagate to the caller.
pub struct AlarmChain {
    strategies: Arc<Vec<Box<dyn AlarmStrategy>>>,
    output_device: Option<String>,
}

impl AlarmChain {
    /// The default chain: PulseAudio sample, then SoX tone, then the
    /// terminal bell (which cannot fail).
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(Paplay),
            Box::new(SoxSynth),
            Box::new(TerminalBell),
        ])
    }

    pub fn new(strategies: Vec<Box<dyn AlarmStrategy>>) -> Self {
        Self {
            strategies: Arc::new(strategies),
            output_device: None,
        }
    }

    pub fn with_output_device(mut self, device: Option<String>) -> Self {
        self.output_device = device;
        self
    }

    /// Run the chain synchronously. Returns the name of the strategy that
    /// made the sound, if any.
    pub fn sound_once(&self, duration: Duration) -> Option<&'static str> {
        run_chain(&self.strategies, duration, self.output_device.as_deref())
    }
}

fn run_chain(
    strategies: &[Box<dyn AlarmStrategy>],
    duration: Duration,
    output_device: Option<&str>,
) -> Option<&'static str> {
    for strategy in strategies {
        match strategy.play(duration, output_device) {
            Ok(()) => {
                tracing::debug!("Alarm played via {}", strategy.name());
                return Some(strategy.name());
            }
            Err(e) => {
                tracing::warn!("Alarm strategy {} failed: {}", strategy.name(), e);
            }
        }
    }
    tracing::error!("Every alarm strategy failed; no sound produced");
    None
}

impl AlarmTrigger for AlarmChain {
    /// Playback runs on its own short-lived thread so a slow subprocess
    /// never stalls the monitor cadence.
    fn trigger(&self, duration: Duration) {
        let strategies = Arc::clone(&self.strategies);
        let output_device = self.output_device.clone();
        let result = std::thread::Builder::new()
            .name("alarm-playback".to_string())
            .spawn(move || {
                run_chain(&strategies, duration, output_device.as_deref());
            });
        if let Err(e) = result {
            tracing::error!("Failed to spawn alarm playback thread: {}", e);
        }
    }
}
