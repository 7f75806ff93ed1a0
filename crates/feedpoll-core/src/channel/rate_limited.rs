//! Rate-limited channel decorator.

use std::time::Duration;

use super::{Channel, ChannelError, Pacer, Request, Response};

/// Wraps a channel so dispatches start at most once every `period`.
///
/// There is no upper bound on the wait; a caller that stops dispatching is
/// simply never delayed again.
#[derive(Debug)]
pub struct RateLimitedChannel<C> {
    inner: C,
    pacer: Pacer,
}

impl<C: Channel> RateLimitedChannel<C> {
    pub fn new(inner: C, period: Duration) -> Self {
        Self {
            inner,
            pacer: Pacer::new(period),
        }
    }

    pub fn period(&self) -> Duration {
        self.pacer.period()
    }

    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: Channel> Channel for RateLimitedChannel<C> {
    fn dispatch(&mut self, request: &Request) -> Result<Response, ChannelError> {
        self.pacer.pace();
        self.inner.dispatch(request)
    }
}
