//! Request-scoped cancellation
//!
//! Every external call made on behalf of a request (cache, store) is bounded
//! by the request deadline. When the deadline passes the pending call is
//! dropped, which aborts its I/O, and [`Cancelled`] is reported instead.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, timeout_at};

/// The request deadline fired before the operation completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request deadline exceeded")]
pub struct Cancelled;

/// Per-request deadline threaded through core operations
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    deadline: Instant,
}

impl RequestContext {
    /// A context whose deadline is `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Run `fut` to completion unless the deadline passes first
    pub async fn bounded<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        timeout_at(self.deadline, fut).await.map_err(|_| Cancelled)
    }
}
