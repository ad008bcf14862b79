//! Background renewal of a single gateway credential.
//!
//! `CredentialRefreshManager::start` blocks (asynchronously) until the source
//! has issued a first credential, retrying at a fixed short delay, and only then
//! spawns the renewal task. The task sleeps until the credential approaches
//! expiry, renews it, and after failures retries with the configured backoff.
//! When the backoff gives up the manager stops and reports
//! [`RefreshError::BackoffExhausted`] through [`CredentialRefreshManager::stopped`].
//!
//! Readers get the current credential lock-free via `ArcSwap`; the renewal
//! task is the only writer. Subscribers are notified of each new credential
//! through a `watch` channel.

use arc_swap::ArcSwap;
use chrono::Utc;
use resilience::{with_timeout, BackOffStrategy, ExponentialBackOff, TimeoutError};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RefreshConfig;
use crate::credential::{Credential, RenewalFailure, RenewalOutcome};
use crate::error::RefreshError;
use crate::expiry::ExpiryPolicy;
use crate::metrics::CredentialMetrics;
use crate::source::CredentialSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Waiting for the first successful renewal. `start` only returns once
    /// this has passed, so handles observe `Running` or `Stopped`.
    Starting,
    /// Background renewal active
    Running,
    /// Terminal: stopped on request or after backoff exhaustion
    Stopped,
}

impl ManagerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State shared between the manager, its handles and the renewal task
struct Shared<T> {
    source_name: String,
    current: ArcSwap<Credential<T>>,
    updates: watch::Sender<Arc<Credential<T>>>,
    state: watch::Sender<ManagerState>,
    fatal: OnceLock<RefreshError>,
}

/// Read-only view of a manager's credential for the connection layer.
///
/// Cheap to clone; stays valid after the manager stops (it then keeps
/// returning the last credential, which `is_running` lets callers distrust).
pub struct CredentialHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for CredentialHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for CredentialHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHandle")
            .field("source", &self.shared.source_name)
            .field("state", &*self.shared.state.borrow())
            .finish()
    }
}

impl<T> CredentialHandle<T> {
    /// Most recently published credential. Never blocks.
    pub fn current(&self) -> Arc<Credential<T>> {
        self.shared.current.load_full()
    }

    /// Receiver that is marked changed whenever a renewed credential is published
    pub fn subscribe(&self) -> watch::Receiver<Arc<Credential<T>>> {
        self.shared.updates.subscribe()
    }

    pub fn state(&self) -> ManagerState {
        *self.shared.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ManagerState::Running
    }

    pub fn source_name(&self) -> &str {
        &self.shared.source_name
    }
}

pub struct CredentialRefreshManager<T> {
    handle: CredentialHandle<T>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<Result<(), RefreshError>>>>,
}

impl<T> fmt::Debug for CredentialRefreshManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRefreshManager")
            .field("source", &self.handle.source_name())
            .field("state", &self.handle.state())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl<T: Send + Sync + 'static> CredentialRefreshManager<T> {
    /// Start a manager using an [`ExponentialBackOff`] built from `config.backoff`.
    ///
    /// Does not return until `source` has issued a credential. There is no
    /// upper bound on that wait; wrap the call in `tokio::time::timeout` when
    /// startup time must be bounded.
    pub async fn start<S>(source: S, config: RefreshConfig) -> Result<Self, RefreshError>
    where
        S: CredentialSource<Secret = T>,
    {
        let backoff = ExponentialBackOff::new(config.backoff.clone())
            .map_err(|e| RefreshError::InvalidConfig(e.into()))?;
        Self::start_with_backoff(source, backoff, config).await
    }

    /// Start a manager with a caller-supplied backoff strategy.
    ///
    /// `config.backoff` is still validated but otherwise unused.
    pub async fn start_with_backoff<S, B>(
        source: S,
        backoff: B,
        config: RefreshConfig,
    ) -> Result<Self, RefreshError>
    where
        S: CredentialSource<Secret = T>,
        B: BackOffStrategy + 'static,
    {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| RefreshError::Spawn(e.to_string()))?;

        let source_name = source.name().to_string();
        info!(
            source = %source_name,
            state = %ManagerState::Starting,
            "Credential refresh manager starting"
        );

        let initial = Arc::new(initial_renewal(&source, &config).await);
        CredentialMetrics::record_expiry(&source_name, initial.expires_at().timestamp());

        let (updates, _) = watch::channel(initial.clone());
        let (state, _) = watch::channel(ManagerState::Starting);
        let shared = Arc::new(Shared {
            source_name: source_name.clone(),
            current: ArcSwap::new(initial.clone()),
            updates,
            state,
            fatal: OnceLock::new(),
        });

        let cancel = CancellationToken::new();
        let renewal = RefreshLoop {
            policy: ExpiryPolicy::new(config.lookahead),
            source,
            backoff,
            config,
            shared: shared.clone(),
            cancel: cancel.clone(),
        };
        let task = runtime.spawn(renewal.run());
        // The task may already have stopped; never overwrite `Stopped`.
        shared.state.send_if_modified(|state| {
            if *state == ManagerState::Starting {
                *state = ManagerState::Running;
                true
            } else {
                false
            }
        });

        info!(
            source = %source_name,
            expires_at = %initial.expires_at(),
            state = %ManagerState::Running,
            "Credential refresh manager running"
        );

        Ok(Self {
            handle: CredentialHandle { shared },
            cancel,
            task: Mutex::new(Some(task)),
        })
    }
}

impl<T> CredentialRefreshManager<T> {
    /// Most recently published credential. Never blocks and is never unset.
    ///
    /// After the manager stops this keeps returning the last credential.
    pub fn current_credential(&self) -> Arc<Credential<T>> {
        self.handle.current()
    }

    pub fn handle(&self) -> CredentialHandle<T> {
        self.handle.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Credential<T>>> {
        self.handle.subscribe()
    }

    pub fn state(&self) -> ManagerState {
        self.handle.state()
    }

    pub fn source_name(&self) -> &str {
        self.handle.source_name()
    }

    /// Request cancellation of the renewal task. Idempotent.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            info!(source = %self.source_name(), "Credential refresh manager stop requested");
            self.cancel.cancel();
        }
    }

    /// Stop and wait for the renewal task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(
                        source = %self.source_name(),
                        error = %e,
                        "Credential renewal task panicked"
                    );
                }
            }
        }
    }

    /// Wait until the manager reaches [`ManagerState::Stopped`].
    ///
    /// Returns the fatal error when the renewal task gave up, `None` when it
    /// was stopped on request.
    pub async fn stopped(&self) -> Option<RefreshError> {
        let mut state = self.handle.shared.state.subscribe();
        // the sender lives in `Shared`, which we keep alive
        let _ = state.wait_for(|s| *s == ManagerState::Stopped).await;
        self.handle.shared.fatal.get().cloned()
    }

    /// The fatal error, if the renewal task has given up
    pub fn fatal_error(&self) -> Option<RefreshError> {
        self.handle.shared.fatal.get().cloned()
    }
}

impl<T> Drop for CredentialRefreshManager<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Retry `renew` at a fixed delay until it succeeds.
async fn initial_renewal<S: CredentialSource>(
    source: &S,
    config: &RefreshConfig,
) -> Credential<S::Secret> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match renew_once(source, config.renew_timeout).await {
            RenewalOutcome::Success(credential) => {
                CredentialMetrics::record_renewal(source.name(), "success");
                return credential;
            }
            RenewalOutcome::TransientFailure(failure) => {
                CredentialMetrics::record_renewal(source.name(), failure.kind.as_str());
                warn!(
                    source = %source.name(),
                    attempt,
                    kind = %failure.kind,
                    error = %failure.message,
                    retry_in_ms = config.startup_retry_delay.as_millis() as u64,
                    "Initial credential renewal failed; retrying"
                );
                sleep(config.startup_retry_delay).await;
            }
        }
    }
}

async fn renew_once<S: CredentialSource>(
    source: &S,
    deadline: Duration,
) -> RenewalOutcome<S::Secret> {
    match with_timeout(deadline, source.renew()).await {
        Ok(outcome) => outcome,
        Err(TimeoutError::Elapsed(after)) => {
            RenewalOutcome::TransientFailure(RenewalFailure::timeout(after))
        }
    }
}

/// Moves the manager to `Stopped` however the renewal task ends, panics included
struct StopGuard<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Drop for StopGuard<T> {
    fn drop(&mut self) {
        self.shared.state.send_replace(ManagerState::Stopped);
        info!(
            source = %self.shared.source_name,
            state = %ManagerState::Stopped,
            "Credential refresh manager stopped"
        );
    }
}

struct RefreshLoop<S: CredentialSource, B> {
    source: S,
    backoff: B,
    config: RefreshConfig,
    policy: ExpiryPolicy,
    shared: Arc<Shared<S::Secret>>,
    cancel: CancellationToken,
}

impl<S, B> RefreshLoop<S, B>
where
    S: CredentialSource,
    B: BackOffStrategy,
{
    async fn run(mut self) -> Result<(), RefreshError> {
        let _guard = StopGuard {
            shared: self.shared.clone(),
        };

        let mut failures: u32 = 0;
        let mut failing_since: Option<Instant> = None;

        loop {
            let delay = if failures == 0 {
                self.scheduled_delay()
            } else {
                match self.backoff.next_backoff() {
                    Some(delay) => delay,
                    None => {
                        let elapsed = failing_since.map(|t| t.elapsed()).unwrap_or_default();
                        return Err(self.give_up(failures, elapsed));
                    }
                }
            };

            debug!(
                source = %self.shared.source_name,
                delay_ms = delay.as_millis() as u64,
                consecutive_failures = failures,
                "Next credential renewal scheduled"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                _ = sleep(delay) => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                outcome = renew_once(&self.source, self.config.renew_timeout) => outcome,
            };

            match outcome {
                RenewalOutcome::Success(credential) => {
                    let credential = Arc::new(credential);
                    self.shared.current.store(credential.clone());
                    self.backoff.reset();
                    self.shared.updates.send_replace(credential.clone());

                    CredentialMetrics::record_renewal(&self.shared.source_name, "success");
                    CredentialMetrics::record_expiry(
                        &self.shared.source_name,
                        credential.expires_at().timestamp(),
                    );
                    info!(
                        source = %self.shared.source_name,
                        expires_at = %credential.expires_at(),
                        recovered_after = failures,
                        "Credential renewed"
                    );

                    failures = 0;
                    failing_since = None;
                }
                RenewalOutcome::TransientFailure(failure) => {
                    failures += 1;
                    failing_since.get_or_insert_with(Instant::now);

                    CredentialMetrics::record_renewal(
                        &self.shared.source_name,
                        failure.kind.as_str(),
                    );
                    warn!(
                        source = %self.shared.source_name,
                        attempt = failures,
                        kind = %failure.kind,
                        error = %failure.message,
                        "Credential renewal failed"
                    );
                }
            }
        }
    }

    /// Wait after a success: until the credential enters its lookahead window,
    /// capped by `refresh_interval` and floored at `min_refresh_interval`.
    fn scheduled_delay(&self) -> Duration {
        let current = self.shared.current.load();
        let mut delay = self.policy.renew_delay(current.expires_at(), Utc::now());
        if let Some(cap) = self.config.refresh_interval {
            delay = delay.min(cap);
        }
        delay.max(self.config.min_refresh_interval)
    }

    fn give_up(&self, attempts: u32, elapsed: Duration) -> RefreshError {
        let err = RefreshError::BackoffExhausted {
            source_name: self.shared.source_name.clone(),
            attempts,
            elapsed,
        };
        let expires_at = self.shared.current.load().expires_at();
        error!(
            source = %self.shared.source_name,
            attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            last_expires_at = %expires_at,
            "Credential renewal backoff exhausted; stopping refresh manager"
        );
        CredentialMetrics::record_exhausted(&self.shared.source_name);
        let _ = self.shared.fatal.set(err.clone());
        err
    }
}
