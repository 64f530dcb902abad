//! Per-request execution context.
//!
//! Every tool call runs under a `RequestContext` carrying correlation ids,
//! the operation name, an optional deadline and the process shutdown signal.
//! Suspension points that honour cancellation race their work against
//! [`RequestContext::cancelled`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{LncError, LncResult};

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    DeadlineExceeded,
    Shutdown,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
            CancelReason::Shutdown => write!(f, "server shutting down"),
        }
    }
}

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

define_id!(RequestId, "Identifier of a single inbound request.");
define_id!(TraceId, "Identifier shared by a request and everything it spawns.");

#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    trace_id: TraceId,
    operation: String,
    started_at: Instant,
    started_wall: chrono::DateTime<chrono::Utc>,
    deadline: Option<Instant>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl RequestContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::generate(),
            trace_id: TraceId::generate(),
            operation: operation.into(),
            started_at: Instant::now(),
            started_wall: chrono::Utc::now(),
            deadline: None,
            shutdown: None,
        }
    }

    /// Bound the context to `timeout` from its start.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(self.started_at + timeout);
        self
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_wall
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time left before the deadline. `None` when the context is unbounded.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Fail fast if the context is already cancelled.
    pub fn check(&self) -> LncResult<()> {
        if self.is_shutting_down() {
            return Err(LncError::Cancelled(CancelReason::Shutdown));
        }
        if self.is_expired() {
            return Err(LncError::Cancelled(CancelReason::DeadlineExceeded));
        }
        Ok(())
    }

    /// Resolves once the deadline passes or shutdown is signalled.
    pub async fn cancelled(&self) -> CancelReason {
        let deadline = self.deadline;
        let mut shutdown = self.shutdown.clone();

        let expired = async move {
            match deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        let stopping = async move {
            match shutdown.as_mut() {
                Some(rx) => loop {
                    if *rx.borrow_and_update() {
                        return;
                    }
                    if rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                },
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = stopping => CancelReason::Shutdown,
            _ = expired => CancelReason::DeadlineExceeded,
        }
    }

    /// Run `fut` unless the context is cancelled first.
    pub async fn run<F, T>(&self, fut: F) -> LncResult<T>
    where
        F: Future<Output = T>,
    {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.cancelled() => Err(LncError::Cancelled(reason)),
            out = fut => Ok(out),
        }
    }

    /// Span carrying the correlation fields for this request.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            trace_id = %self.trace_id,
            operation = %self.operation,
        )
    }
}
