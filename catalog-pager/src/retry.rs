use std::future::Future;

use crate::{FetchError, FetchResult};

/// Caller-side retry policy: immediately retry transient failures a bounded number of times,
/// never retry [`FetchError::NotFound`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 2;

    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn never() -> Self {
        Self::new(0)
    }

    /// `retries_so_far` counts the retries already issued (0 after the first failure).
    pub fn should_retry(&self, retries_so_far: u32, err: &FetchError) -> bool {
        err.is_transient() && retries_so_far < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES)
    }
}

/// Runs `attempt` until it succeeds or `policy` gives up, returning the last error.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut attempt: F) -> FetchResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if policy.should_retry(retries, &err) => {
                retries += 1;
                pdebug!(retries, error = %err, "retrying request");
            }
            Err(err) => return Err(err),
        }
    }
}
