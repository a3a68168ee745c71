use crate::error::AppError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;

/// Monitor lifecycle. `Stopped` is terminal: a handle is not restartable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

pub struct StateManager {
    state: Arc<RwLock<MonitorState>>,
    state_tx: Sender<MonitorState>,
    state_rx: Receiver<MonitorState>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(MonitorState::Idle)),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: MonitorState) -> Result<(), AppError> {
        let mut current = self.state.write();

        let valid = matches!(
            (*current, new_state),
            (MonitorState::Idle, MonitorState::Running)
                | (MonitorState::Running, MonitorState::Stopping)
                | (MonitorState::Stopping, MonitorState::Stopped)
        );

        if !valid {
            return Err(AppError::Fatal(format!(
                "Invalid state transition: {:?} -> {:?}",
                *current, new_state
            )));
        }

        tracing::info!("State transition: {:?} -> {:?}", *current, new_state);
        *current = new_state;
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> MonitorState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> Receiver<MonitorState> {
        self.state_rx.clone()
    }
}
