//! Shift observer
//!
//! Subscribes to shift-change notifications and resets shift-scoped state
//! at each boundary. Initialization is idempotent: a second call while an
//! observer is live refuses to create a duplicate subscription, so state
//! can never be double-reset by parallel observers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::types::Shift;

/// State holders that reset at shift boundaries.
pub trait ShiftResettable: Send + 'static {
    fn reset_shift_stats(&mut self);
}

/// Gate plus spawner for the shift-reset subscription.
#[derive(Debug, Default)]
pub struct ShiftObserver {
    initialized: Arc<AtomicBool>,
}

/// Cleanup handle for a live observer. Dropping it aborts the
/// subscription task and re-arms the observer for initialization.
pub struct ShiftObserverHandle {
    task: JoinHandle<()>,
    initialized: Arc<AtomicBool>,
}

impl ShiftObserverHandle {
    /// Stop observing and allow a future re-initialization.
    pub fn shutdown(self) {
        // Drop does the work
    }
}

impl Drop for ShiftObserverHandle {
    fn drop(&mut self) {
        self.task.abort();
        self.initialized.store(false, Ordering::SeqCst);
    }
}

impl ShiftObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the reset subscription. Returns None if an observer is
    /// already live, never a second subscription.
    pub fn initialize<T: ShiftResettable>(
        &self,
        target: Arc<Mutex<T>>,
        mut shifts: broadcast::Receiver<Shift>,
    ) -> Option<ShiftObserverHandle> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Shift observer already initialized, ignoring duplicate request");
            return None;
        }

        let flag = Arc::clone(&self.initialized);
        let task = tokio::spawn(async move {
            loop {
                match shifts.recv().await {
                    Ok(shift) => {
                        info!(shift = %shift, "Shift boundary: resetting shift-scoped stats");
                        match target.lock() {
                            Ok(mut guard) => guard.reset_shift_stats(),
                            Err(poisoned) => poisoned.into_inner().reset_shift_stats(),
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // A missed boundary still warrants one reset
                        warn!(missed, "Shift observer lagged behind notifications");
                        match target.lock() {
                            Ok(mut guard) => guard.reset_shift_stats(),
                            Err(poisoned) => poisoned.into_inner().reset_shift_stats(),
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Shift channel closed, observer stopping");
                        break;
                    }
                }
            }
        });

        Some(ShiftObserverHandle {
            task,
            initialized: flag,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}
