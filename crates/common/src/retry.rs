use std::time::Duration;

/// Retry a function with exponential backoff
///
/// # Arguments
/// * `f` - The function to retry
/// * `max_retries` - Maximum number of attempts (at least one attempt is always made)
/// * `base_delay_ms` - Initial delay in milliseconds (doubles each retry)
/// * `operation_name` - Human-readable name for logging
pub fn retry_with_backoff<F, T, E>(
    mut f: F,
    max_retries: u32,
    base_delay_ms: u64,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let max_retries = max_retries.max(1);
    let mut attempt = 0;

    loop {
        match f() {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 < max_retries => {
                let delay_ms = base_delay_ms.saturating_mul(2_u64.saturating_pow(attempt));
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {}ms...",
                    operation_name,
                    attempt + 1,
                    max_retries,
                    e,
                    delay_ms
                );
                std::thread::sleep(Duration::from_millis(delay_ms));
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    "{} failed after {} attempts: {}",
                    operation_name,
                    max_retries,
                    e
                );
                return Err(e);
            }
        }
    }
}
