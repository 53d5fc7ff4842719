//! Cancellation and deadlines for a single resolution.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::ResolveError;
use crate::Result;

/// Caller-supplied cancellation signal and optional deadline.
///
/// Every network request and response body read performed by a resolver runs
/// under [`ResolveContext::run`], so cancelling the token or passing the
/// deadline aborts the in-flight request. Both surface as errors distinct
/// from network failures: [`ResolveError::Cancelled`] and
/// [`ResolveError::DeadlineExceeded`].
///
/// # Examples
///
/// ```
/// use modsrc_core::ResolveContext;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = ResolveContext::new().with_timeout(Duration::from_secs(30));
/// let token = ctx.cancellation_token();
/// token.cancel();
///
/// let err = ctx.run(async { 1 }).await.unwrap_err();
/// assert!(err.is_cancelled());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ResolveContext {
    /// Creates a context that is never cancelled and has no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a clone of the cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels the context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns an error if the context is already cancelled or past its
    /// deadline.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(ResolveError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drives `fut` to completion unless the context is cancelled or its
    /// deadline passes first, in which case `fut` is dropped.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(ResolveError::Cancelled),
            () = deadline => Err(ResolveError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}
