use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Poll `connect` until it succeeds. Returns `None` if `shutdown` is raised
/// while waiting.
pub fn wait_for_resource<F, T, E>(
    mut connect: F,
    poll_interval_ms: u64,
    resource_name: &str,
    shutdown: &AtomicBool,
) -> Option<T>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut logged = false;
    while !shutdown.load(Ordering::Relaxed) {
        match connect() {
            Ok(resource) => {
                tracing::info!("{} connected", resource_name);
                return Some(resource);
            }
            Err(e) => {
                if logged {
                    tracing::debug!("Waiting for {} ({})", resource_name, e);
                } else {
                    tracing::info!("Waiting for {} ({})", resource_name, e);
                    logged = true;
                }
                std::thread::sleep(Duration::from_millis(poll_interval_ms));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_resource_once_available() {
        let shutdown = AtomicBool::new(false);
        let mut attempts = 0;
        let resource = wait_for_resource(
            || {
                attempts += 1;
                if attempts < 3 { Err("missing") } else { Ok("port") }
            },
            1,
            "Serial port",
            &shutdown,
        );
        assert_eq!(resource, Some("port"));
        assert_eq!(attempts, 3);
    }

    #[test]
    fn gives_up_when_shutdown_requested() {
        let shutdown = AtomicBool::new(true);
        let resource: Option<()> =
            wait_for_resource(|| Err::<(), _>("missing"), 1, "Serial port", &shutdown);
        assert!(resource.is_none());
    }
}
