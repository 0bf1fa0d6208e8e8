pub mod config;
pub mod logging;
pub mod retry;
pub mod telemetry;
pub mod wait;

pub use config::{Environment, env_or, env_string};
pub use logging::setup_logging;
pub use retry::retry_with_backoff;
pub use telemetry::{TelemetryGuard, init_observability};
pub use wait::wait_for_resource;
