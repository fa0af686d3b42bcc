//! Pause, resume and cancel signals for a running organizer.
//!
//! Signals are only looked at between files, so a file that is being moved
//! or copied always finishes first.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Run,
    Pause,
    Cancel,
}

/// Handle for steering a run from another task. Clones control the same run.
#[derive(Debug, Clone)]
pub struct RunControl {
    signal: Arc<watch::Sender<Signal>>,
}
impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(Signal::Run);
        Self { signal: Arc::new(signal) }
    }

    pub fn current(&self) -> Signal {
        *self.signal.borrow()
    }

    /// Ignored once cancelled.
    pub fn pause(&self) {
        self.signal.send_if_modified(|signal| match signal {
            Signal::Run => {
                *signal = Signal::Pause;
                true
            },
            _ => false,
        });
    }

    /// Ignored once cancelled.
    pub fn resume(&self) {
        self.signal.send_if_modified(|signal| match signal {
            Signal::Pause => {
                *signal = Signal::Run;
                true
            },
            _ => false,
        });
    }

    /// Final; a cancelled run cannot be resumed.
    pub fn cancel(&self) {
        self.signal.send_replace(Signal::Cancel);
    }

    pub fn is_cancelled(&self) -> bool {
        self.current() == Signal::Cancel
    }

    /// Waits out a pause, returning the signal that ended it.
    pub(crate) async fn wait_while_paused(&self) -> Signal {
        let mut receiver = self.signal.subscribe();
        match receiver.wait_for(|signal| *signal != Signal::Pause).await {
            Ok(signal) => *signal,
            // The sender lives in `self`, so this cannot happen while we wait.
            Err(_) => Signal::Cancel,
        }
    }
}
