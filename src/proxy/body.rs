//! Streaming response body with an end-to-end deadline.
//!
//! # Responsibilities
//! - Relay upstream body frames without buffering
//! - End the stream with a timeout error once the deadline passes
//! - Notice when the client goes away before the exchange completes
//!
//! # Design Decisions
//! - Dropping this body drops the upstream body, which aborts the
//!   upstream connection instead of returning it to the pool
//! - Client disconnects are normal early termination, logged at debug

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::{combinators::UnsyncBoxBody, BodyExt};
use tokio::time::{Instant, Sleep};

use crate::proxy::error::ForwardError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Tracks one upstream exchange until it completes.
///
/// Dropped while still pending means the client stopped waiting.
#[derive(Debug)]
pub struct InFlight {
    route: String,
    completed: bool,
}

impl InFlight {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            completed: false,
        }
    }

    pub fn complete(&mut self) {
        self.completed = true;
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.completed {
            tracing::debug!(
                route = %self.route,
                "Client disconnected before upstream exchange completed, aborting"
            );
        }
    }
}

/// Upstream response body bounded by a deadline.
pub struct DeadlineBody {
    inner: UnsyncBoxBody<Bytes, BoxError>,
    sleep: Pin<Box<Sleep>>,
    budget: Duration,
    in_flight: InFlight,
    finished: bool,
}

impl DeadlineBody {
    pub fn new<B>(inner: B, deadline: Instant, budget: Duration, in_flight: InFlight) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            inner: inner.map_err(Into::into).boxed_unsync(),
            sleep: Box::pin(tokio::time::sleep_until(deadline)),
            budget,
            in_flight,
            finished: false,
        }
    }
}

impl HttpBody for DeadlineBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        if this.sleep.as_mut().poll(cx).is_ready() {
            this.finished = true;
            this.in_flight.complete();
            tracing::warn!(
                route = %this.in_flight.route,
                budget_ms = this.budget.as_millis() as u64,
                "Upstream body exceeded deadline, aborting stream"
            );
            return Poll::Ready(Some(Err(Box::new(ForwardError::deadline(this.budget)))));
        }

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(None) => {
                this.finished = true;
                this.in_flight.complete();
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(err))) => {
                this.finished = true;
                this.in_flight.complete();
                tracing::warn!(route = %this.in_flight.route, error = %err, "Upstream body failed mid-stream");
                Poll::Ready(Some(Err(err)))
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
