//! Generic blocking condition poller
//!
//! [`wait_until`] repeatedly evaluates a [`Condition`] on a fixed cadence
//! until it reports completion, a deadline expires, or the caller's
//! [`CancellationToken`] fires, whichever comes first.
//!
//! ## Outcomes
//!
//! | Outcome                         | Result                          |
//! |---------------------------------|---------------------------------|
//! | `check()` returned `Ok(true)`   | `Ok(())`                        |
//! | `check()` returned `Err(e)`     | `Err(e)`, no further checks     |
//! | deadline expired                | `Err(Error::Timeout(..))`       |
//! | token cancelled                 | `Err(Error::Cancelled)`         |
//! | interval is zero                | `Err(Error::Config(..))`, no check |
//!
//! ## Timing
//!
//! ```text
//! start      +interval   +2·interval          +timeout
//!   │ [immediate] │ check      │ check   ...     │ timeout
//!   ▼             ▼            ▼                 ▼
//! ──●─────────────●────────────●─────────────────●──▶
//! ```
//!
//! The deadline is measured from the moment `wait_until` is entered. A tick
//! that lands exactly on the deadline still runs its check, and a check that
//! has started is allowed to finish; its result wins over the deadline.
//! Cancellation is observed before every check, while a check is in flight
//! and while waiting for the next tick.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{DEFAULT_TIMEOUT_MESSAGE, Error, Result};

/// Interval used by [`WaitSpec::default`]
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for a single poll
///
/// A `WaitSpec` carries no state and may be reused across any number of
/// calls to [`wait_until`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    interval: Duration,
    timeout: Option<Duration>,
    immediate: bool,
    timeout_message: Option<String>,
}

impl WaitSpec {
    /// Poll every `interval`, forever, without an immediate check
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
            immediate: false,
            timeout_message: None,
        }
    }

    /// Give up after `timeout`; a zero timeout means "no timeout"
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Evaluate the condition once before the first interval elapses
    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Message of the [`Error::Timeout`] returned when the deadline expires
    pub fn with_timeout_message(mut self, message: impl Into<String>) -> Self {
        self.timeout_message = Some(message.into());
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn immediate(&self) -> bool {
        self.immediate
    }

    pub fn timeout_message(&self) -> Option<&str> {
        self.timeout_message.as_deref()
    }

    /// Reject specs that cannot be polled
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::config("wait interval must be positive"));
        }
        Ok(())
    }

    /// The error returned when the deadline expires
    pub fn timeout_error(&self) -> Error {
        Error::timeout(
            self.timeout_message
                .as_deref()
                .unwrap_or(DEFAULT_TIMEOUT_MESSAGE),
        )
    }
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_INTERVAL)
    }
}

/// A predicate polled by [`wait_until`]
///
/// `Ok(true)` means the awaited state was reached, `Ok(false)` means "not
/// yet", and any `Err` aborts the wait. Conditions that want to tolerate a
/// transient remote answer (an entity not visible yet) must map it to
/// `Ok(false)` themselves.
///
/// Any `FnMut() -> impl Future<Output = Result<bool>>` closure is a
/// `Condition`, provided the future it returns is `'static`. A closure over
/// a client must therefore move an owned or reference-counted handle into
/// each future:
///
/// ```rust
/// # use converge_core::{CancellationToken, MemoryEnvironment, WaitSpec, wait_until};
/// # use converge_core::traits::EnvironmentApi;
/// # async fn example(store: MemoryEnvironment) -> converge_core::Result<()> {
/// let mut has_port = move || {
///     let store = store.clone();
///     async move {
///         let variables = store.list_variables("my-app").await?;
///         Ok::<_, converge_core::Error>(variables.iter().any(|v| v.name == "PORT"))
///     }
/// };
/// wait_until(&CancellationToken::new(), &WaitSpec::default(), &mut has_port).await
/// # }
/// ```
///
/// A condition that borrows its client implements this trait on a struct
/// instead, as the checkers in [`crate::checkers`] do.
#[async_trait]
pub trait Condition: Send {
    /// Evaluate the condition once
    async fn check(&mut self) -> Result<bool>;
}

#[async_trait]
impl<F, Fut> Condition for F
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    async fn check(&mut self) -> Result<bool> {
        (self)().await
    }
}

/// Block until `condition` is satisfied, the spec's timeout expires, or
/// `cancel` fires
///
/// Checks are strictly sequential. See the module documentation for the
/// exact timing rules.
pub async fn wait_until<C>(
    cancel: &CancellationToken,
    spec: &WaitSpec,
    condition: &mut C,
) -> Result<()>
where
    C: Condition + ?Sized,
{
    spec.validate()?;

    let started = Instant::now();
    let deadline = spec.timeout.map(|timeout| started + timeout);
    let mut attempts: u64 = 0;

    if spec.immediate {
        attempts += 1;
        if check_once(cancel, condition).await? {
            debug!(attempts, "condition satisfied on immediate check");
            return Ok(());
        }
    }

    let mut ticker = time::interval_at(started + spec.interval, spec.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let expired = async move {
        match deadline {
            Some(deadline) => time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(expired);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(attempts, "wait cancelled");
                return Err(Error::Cancelled);
            }

            _ = ticker.tick() => {
                // A tick delayed by a slow check must not start another one
                if deadline.is_some_and(|deadline| Instant::now() > deadline) {
                    debug!(attempts, "deadline passed before tick");
                    return Err(spec.timeout_error());
                }

                attempts += 1;
                if check_once(cancel, condition).await? {
                    debug!(attempts, elapsed = ?started.elapsed(), "condition satisfied");
                    return Ok(());
                }
                trace!(attempts, "condition not satisfied yet");
            }

            _ = &mut expired => {
                debug!(attempts, timeout = ?spec.timeout, "wait timed out");
                return Err(spec.timeout_error());
            }
        }
    }
}

/// Run one check, racing it against cancellation
async fn check_once<C>(cancel: &CancellationToken, condition: &mut C) -> Result<bool>
where
    C: Condition + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = condition.check() => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_means_forever() {
        let spec = WaitSpec::new(Duration::from_secs(1)).with_timeout(Duration::ZERO);
        assert_eq!(spec.timeout(), None);
    }

    #[test]
    fn test_zero_interval_is_config_error() {
        let err = WaitSpec::new(Duration::ZERO).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_timeout_error_message() {
        let spec = WaitSpec::default();
        assert_eq!(spec.timeout_error().to_string(), DEFAULT_TIMEOUT_MESSAGE);

        let spec = spec.with_timeout_message("addon provisioning timed out");
        assert_eq!(
            spec.timeout_error().to_string(),
            "addon provisioning timed out"
        );
        assert!(spec.timeout_error().is_timeout());
    }

    #[tokio::test]
    async fn test_zero_interval_never_checks() {
        let cancel = CancellationToken::new();
        let mut called = false;
        let mut condition = || {
            called = true;
            async { Ok::<_, Error>(true) }
        };

        let result = wait_until(&cancel, &WaitSpec::new(Duration::ZERO), &mut condition).await;

        assert!(matches!(result, Err(Error::Config(_))));
        assert!(!called);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_over_shared_client() {
        use crate::state::MemoryEnvironment;
        use crate::traits::{EnvironmentApi, VariableInput};

        let store = MemoryEnvironment::new();
        let writer = store.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(7)).await;
            writer
                .set_variables("app", &[VariableInput::new("PORT", "8080")])
                .await
        });

        let reader = store.clone();
        let mut has_port = move || {
            let reader = reader.clone();
            async move {
                let variables = reader.list_variables("app").await?;
                Ok::<_, Error>(variables.iter().any(|v| v.name == "PORT"))
            }
        };
        let spec = WaitSpec::new(Duration::from_secs(5)).with_timeout(Duration::from_secs(60));

        let started = Instant::now();
        wait_until(&CancellationToken::new(), &spec, &mut has_port)
            .await
            .unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_returns_before_checking() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let spec = WaitSpec::new(Duration::from_secs(1)).with_immediate(true);
        let mut calls = 0u32;
        let mut condition = || {
            calls += 1;
            async { Ok::<_, Error>(true) }
        };

        let result = wait_until(&cancel, &spec, &mut condition).await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls, 0);
    }
}
