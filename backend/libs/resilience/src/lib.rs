/// Retry primitives shared by long-running background loops
///
/// This library provides:
/// - **Backoff**: exponential growth with a ceiling, jitter, and a give-up point
///   measured in attempts or elapsed time
/// - **Timeout**: a deadline for a single call to an external provider
///
/// # Example: spacing out retries
///
/// ```rust,no_run
/// use resilience::{BackOffStrategy, BackoffConfig, ExponentialBackOff};
///
/// #[tokio::main]
/// async fn main() {
///     let mut backoff = ExponentialBackOff::new(BackoffConfig::default()).unwrap();
///
///     while let Some(delay) = backoff.next_backoff() {
///         tokio::time::sleep(delay).await;
///         // Your call here; on success:
///         backoff.reset();
///         break;
///     }
/// }
/// ```

pub mod backoff;
pub mod timeout;

pub use backoff::{BackOffStrategy, BackoffConfig, BackoffConfigError, ExponentialBackOff};
pub use timeout::{with_timeout, TimeoutError};
