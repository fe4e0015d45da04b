use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default trailing-edge window used by the search boxes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Trailing-edge text debouncer, decoupled from any UI reactivity.
///
/// Raw keystrokes go to [`input`](Debouncer::input) as fast as they arrive;
/// the committed value only changes once the window elapses without another
/// keystroke. Scheduling is cancel-and-reschedule, so at most one timer is
/// ever in flight.
pub struct Debouncer {
    window: Duration,
    committed_tx: watch::Sender<String>,
    committed_rx: watch::Receiver<String>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        let (committed_tx, committed_rx) = watch::channel(String::new());
        Self {
            window,
            committed_tx,
            committed_rx,
            pending: Mutex::new(None),
        }
    }

    /// Feeds one keystroke's worth of input, rescheduling the commit.
    pub fn input(&self, value: impl Into<String>) {
        let value = value.into();
        let tx = self.committed_tx.clone();
        let window = self.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            tx.send_replace(value);
        });
        self.replace_pending(Some(handle));
    }

    /// Drops any uncommitted input. The committed value stays as-is.
    pub fn cancel(&self) {
        self.replace_pending(None);
    }

    /// The last committed search text.
    pub fn current(&self) -> String {
        self.committed_rx.borrow().clone()
    }

    /// Receiver that observes commits as they land.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.committed_rx.clone()
    }

    /// Clears both pending and committed state back to empty. Idempotent;
    /// used by `reset_filters` flows.
    pub fn reset(&self) {
        self.replace_pending(None);
        self.committed_tx.send_replace(String::new());
    }

    fn replace_pending(&self, next: Option<JoinHandle<()>>) {
        if let Ok(mut guard) = self.pending.lock() {
            if let Some(previous) = guard.take() {
                previous.abort();
            }
            *guard = next;
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
