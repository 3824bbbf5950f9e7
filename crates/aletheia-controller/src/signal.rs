//! Emergency stop signal.
//!
//! A single shared flag plus the bounded history of commands that raised it.
//! In-process tasks can observe flag changes through [`StopSignal::watch`].

use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use aletheia_core::{StopCommand, StopStatus};

use crate::buffer::RingBuffer;

/// Number of stop commands retained in the history.
pub const STOP_HISTORY_SIZE: usize = 50;

struct StopState {
    active: bool,
    history: RingBuffer<StopCommand>,
}

impl StopState {
    fn status(&self) -> StopStatus {
        StopStatus {
            active: self.active,
            last_command: self.history.last().cloned(),
        }
    }
}

/// Shared emergency-stop flag.
pub struct StopSignal {
    state: Mutex<StopState>,
    active_tx: watch::Sender<bool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::with_history(STOP_HISTORY_SIZE)
    }

    pub fn with_history(capacity: usize) -> Self {
        let (active_tx, _) = watch::channel(false);
        Self {
            state: Mutex::new(StopState {
                active: false,
                history: RingBuffer::new(capacity),
            }),
            active_tx,
        }
    }

    /// Record a stop command and raise the flag.
    ///
    /// Triggering while already active still records the command. Returns the
    /// status observed right after the mutation.
    pub async fn trigger(&self, command: StopCommand) -> StopStatus {
        let mut state = self.state.lock().await;
        warn!(
            initiator = %command.initiator,
            reason = command.reason.as_deref().unwrap_or(""),
            already_active = state.active,
            "Stop command received"
        );
        state.history.push(command);
        state.active = true;
        // Published under the lock so watchers see changes in mutation order.
        self.active_tx.send_replace(true);
        state.status()
    }

    /// Lower the flag.
    ///
    /// Fails with [`StopSignalError::AlreadyCleared`] when the flag is not
    /// raised; the state is left untouched in that case.
    pub async fn clear(&self) -> Result<StopStatus, StopSignalError> {
        let mut state = self.state.lock().await;
        if !state.active {
            return Err(StopSignalError::AlreadyCleared);
        }
        state.active = false;
        self.active_tx.send_replace(false);
        info!("Stop signal cleared");
        Ok(state.status())
    }

    /// Current flag value and the most recent command.
    pub async fn status(&self) -> StopStatus {
        self.state.lock().await.status()
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    /// Recorded commands, oldest first.
    pub async fn history(&self) -> Vec<StopCommand> {
        let state = self.state.lock().await;
        state.history.tail(state.history.len()).cloned().collect()
    }

    /// Receiver observing every flag change.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.active_tx.subscribe()
    }

    /// Resolve once the flag is raised (immediately if it already is).
    pub async fn wait_until_active(&self) {
        let mut rx = self.active_tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|active| *active).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Stop signal errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StopSignalError {
    #[error("Stop signal already cleared")]
    AlreadyCleared,
}
