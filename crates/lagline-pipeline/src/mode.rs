//! Process-wide mode flag shared by every stage.

use crate::error::Result;
use lagline_core::Mode;
use tokio::sync::watch;
use tracing::info;

/// Holds the current [`Mode`] and notifies watchers when it changes.
///
/// The store sets whatever it is told; keeping the flag moving only
/// `BOOT -> LIVE` is the caller's contract.
#[derive(Debug)]
pub struct ModeStore {
    tx: watch::Sender<Mode>,
}

impl ModeStore {
    /// Create a store in `BOOT`.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Mode::Boot);
        Self { tx }
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        *self.tx.borrow()
    }

    /// Set the mode, returning the previous value.
    pub fn set_mode(&self, mode: Mode) -> Mode {
        let previous = self.tx.send_replace(mode);
        if previous != mode {
            info!(from = %previous, to = %mode, "mode changed");
        }
        previous
    }

    /// Parse and set the mode. Unrecognized values are rejected with
    /// `InvalidMode` and leave the mode untouched.
    pub fn set_mode_str(&self, raw: &str) -> Result<Mode> {
        let mode: Mode = raw.parse()?;
        Ok(self.set_mode(mode))
    }

    /// Watch mode changes.
    pub fn subscribe(&self) -> watch::Receiver<Mode> {
        self.tx.subscribe()
    }

    /// Wait until the mode equals `target`.
    pub async fn wait_for(&self, target: Mode) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|mode| *mode == target).await;
    }
}

impl Default for ModeStore {
    fn default() -> Self {
        Self::new()
    }
}
