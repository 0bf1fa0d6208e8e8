pub mod annotate;
pub mod config;
pub mod display;
pub mod handle;
pub mod presence;
pub mod service;
pub mod state_machine;

pub use config::ControllerConfig;
pub use display::{FrameSink, HeadlessSink, SnapshotSink, StopFile};
pub use handle::{LoopHandle, PresenceMirror, StopHandle};
pub use presence::PresenceRule;
pub use service::{DetectionLoop, LoopSettings, LoopSummary};
pub use state_machine::{PresenceState, PresenceTracker, Transition};
