use crate::service::LoopSummary;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

/// Cloneable request to stop a detection loop at its next iteration boundary.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// The underlying flag, for `signal_hook::flag::register`.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Read-only view of the loop's presence state.
#[derive(Debug, Clone, Default)]
pub struct PresenceMirror {
    present: Arc<AtomicBool>,
}

impl PresenceMirror {
    pub(crate) fn set(&self, present: bool) {
        self.present.store(present, Ordering::Release);
    }

    pub fn is_present(&self) -> bool {
        self.present.load(Ordering::Acquire)
    }
}

/// Handle to a detection loop running on its own thread.
pub struct LoopHandle {
    thread: JoinHandle<anyhow::Result<LoopSummary>>,
    stop: StopHandle,
    presence: PresenceMirror,
}

impl LoopHandle {
    pub(crate) fn new(
        thread: JoinHandle<anyhow::Result<LoopSummary>>,
        stop: StopHandle,
        presence: PresenceMirror,
    ) -> Self {
        Self {
            thread,
            stop,
            presence,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_present(&self) -> bool {
        self.presence.is_present()
    }

    pub fn presence(&self) -> PresenceMirror {
        self.presence.clone()
    }

    /// Wait for the loop to end. A panic on the loop thread becomes an error.
    pub fn join(self) -> anyhow::Result<LoopSummary> {
        match self.thread.join() {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                anyhow::bail!("Detection loop panicked: {}", message)
            }
        }
    }
}
