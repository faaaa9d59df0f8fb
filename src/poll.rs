//! Bounded waiting for asynchronous CA operations.

use std::{future::Future, time::Duration};

use crate::error::Result;

/// Time between two status checks.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of a single status check.
pub(crate) enum Attempt<T> {
    /// Terminal state reached.
    Done(T),

    /// The CA is still working on it.
    Pending(T),
}

/// Outcome of a whole poll.
#[derive(Debug)]
pub(crate) enum Polled<T> {
    Done(T),

    /// Still pending when the timeout ran out; holds the last pending observation.
    TimedOut(T),
}

/// Calls `check` until it reports [`Attempt::Done`] or `timeout` worth of intervals has passed.
///
/// Elapsed time is counted per interval slept, not read from a clock, so the real wait can
/// exceed `timeout` by the latency of the checks themselves. An error from `check` ends the poll.
/// Dropping the returned future cancels the wait.
pub(crate) async fn poll_until<T, F, Fut>(timeout: Duration, mut check: F) -> Result<Polled<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>>>,
{
    let mut elapsed = Duration::ZERO;

    loop {
        match check().await? {
            Attempt::Done(value) => return Ok(Polled::Done(value)),

            Attempt::Pending(value) => {
                tokio::time::sleep(POLL_INTERVAL).await;
                elapsed += POLL_INTERVAL;

                if elapsed >= timeout {
                    log::debug!("Gave up polling after {elapsed:?}");
                    return Ok(Polled::TimedOut(value));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::Error;

    #[tokio::test(start_paused = true)]
    async fn test_done_stops_early() {
        let calls = &AtomicUsize::new(0);

        let started = tokio::time::Instant::now();
        let polled = poll_until(Duration::from_secs(180), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(if n == 3 {
                Attempt::Done(n)
            } else {
                Attempt::Pending(n)
            })
        })
        .await
        .unwrap();

        assert!(matches!(polled, Polled::Done(3)));
        // two intervals slept, nowhere near the timeout
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_with_last_value() {
        let calls = &AtomicUsize::new(0);

        let polled = poll_until(Duration::from_secs(2), move || async move {
            Ok(Attempt::Pending(calls.fetch_add(1, Ordering::SeqCst) + 1))
        })
        .await
        .unwrap();

        assert!(matches!(polled, Polled::TimedOut(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_ends_poll() {
        let calls = &AtomicUsize::new(0);

        let res = poll_until(Duration::from_secs(10), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 1 {
                Err(Error::InvalidArgument("boom"))
            } else {
                Ok(Attempt::<()>::Pending(()))
            }
        })
        .await;

        assert!(matches!(res, Err(Error::InvalidArgument("boom"))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
