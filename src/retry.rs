use embedded_hal::blocking::delay::DelayMs;
use std::{fmt, marker::PhantomData};

/// A bounded retry policy with a fixed backoff between attempts.
///
/// An operation is attempted once, and then retried up to `max_retries`
/// more times for as long as the retry predicate accepts the error.
pub struct Retry<E, F = fn(&E) -> bool> {
    max_retries: usize,
    backoff_ms: u32,
    should_retry: F,
    target: &'static str,
    _error: PhantomData<fn(E)>,
}

/// The last error returned by an operation that was given up on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryError<E> {
    pub error: E,
    /// Total number of times the operation was attempted.
    pub attempts: usize,
}

impl<E> Retry<E> {
    pub const fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            backoff_ms: 0,
            should_retry: |_: &E| true,
            target: "retry",
            _error: PhantomData,
        }
    }

    pub const fn with_target(self, target: &'static str) -> Self {
        Self {
            max_retries: self.max_retries,
            backoff_ms: self.backoff_ms,
            should_retry: self.should_retry,
            target,
            _error: PhantomData,
        }
    }

    pub const fn with_backoff_ms(self, backoff_ms: u32) -> Self {
        Self {
            max_retries: self.max_retries,
            backoff_ms,
            should_retry: self.should_retry,
            target: self.target,
            _error: PhantomData,
        }
    }
}

impl<E, F> Retry<E, F>
where
    F: Fn(&E) -> bool,
    E: fmt::Debug,
{
    pub fn with_predicate<F2>(self, should_retry: F2) -> Retry<E, F2>
    where
        F2: Fn(&E) -> bool,
    {
        Retry {
            max_retries: self.max_retries,
            backoff_ms: self.backoff_ms,
            should_retry,
            target: self.target,
            _error: PhantomData,
        }
    }

    #[must_use]
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    #[must_use]
    pub fn backoff_ms(&self) -> u32 {
        self.backoff_ms
    }

    /// Runs `op` until it succeeds, the predicate rejects its error, or the
    /// retry budget is spent, waiting `backoff_ms` on `delay` between
    /// attempts.
    pub fn run<T>(
        &self,
        delay: &mut impl DelayMs<u32>,
        mut op: impl FnMut() -> Result<T, E>,
    ) -> Result<T, RetryError<E>> {
        let mut retries = self.max_retries;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match op() {
                Ok(val) => return Ok(val),
                Err(error) if (self.should_retry)(&error) && retries > 0 => {
                    retries -= 1;
                    log::warn!(target: self.target, "retrying: {error:?} ({retries} retries remaining)");
                    if self.backoff_ms > 0 {
                        delay.delay_ms(self.backoff_ms);
                    }
                }
                Err(error) => return Err(RetryError { error, attempts }),
            }
        }
    }
}

impl<E, F> fmt::Debug for Retry<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("max_retries", &self.max_retries)
            .field("backoff_ms", &self.backoff_ms)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordDelay(Vec<u32>);

    impl DelayMs<u32> for RecordDelay {
        fn delay_ms(&mut self, ms: u32) {
            self.0.push(ms);
        }
    }

    /// Fails `failures` times, then succeeds.
    fn flaky(failures: usize) -> impl FnMut() -> Result<usize, &'static str> {
        let mut calls = 0;
        move || {
            calls += 1;
            if calls <= failures {
                Err("nack")
            } else {
                Ok(calls)
            }
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut delay = RecordDelay::default();
        let retry = Retry::new(5).with_backoff_ms(20);

        let calls = retry.run(&mut delay, flaky(3)).unwrap();
        assert_eq!(calls, 4);
        assert_eq!(delay.0, vec![20, 20, 20]);
    }

    #[test]
    fn gives_up_when_budget_is_spent() {
        let mut delay = RecordDelay::default();
        let retry = Retry::new(2).with_backoff_ms(5);

        let err = retry.run(&mut delay, flaky(10)).unwrap_err();
        assert_eq!(
            err,
            RetryError {
                error: "nack",
                attempts: 3
            }
        );
        // no backoff after the final attempt
        assert_eq!(delay.0, vec![5, 5]);
    }

    #[test]
    fn predicate_stops_retrying() {
        let mut delay = RecordDelay::default();
        let retry = Retry::new(10).with_predicate(|error: &&str| *error != "nack");

        let err = retry.run(&mut delay, flaky(10)).unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(delay.0.is_empty());
    }

    #[test]
    fn zero_backoff_never_sleeps() {
        let mut delay = RecordDelay::default();
        let retry = Retry::new(3);

        retry.run(&mut delay, flaky(2)).unwrap();
        assert!(delay.0.is_empty());
    }
}
