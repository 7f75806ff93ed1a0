//! Credential-bound, rate-limited channel wrappers and the pool that selects
//! between them.
//!
//! A [`Client`] is the unit of identity for both rate limiting and health
//! tracking: the transport below it may be shared or replaced (a tunnel, a
//! proxy), but the pool always penalizes a `Client`.

mod pool;

use std::fmt;
use std::time::Duration;

use anyhow::Result;

use crate::channel::{Channel, ChannelError, Pacer, Request, Response};

pub use pool::{Pool, DEFAULT_COOLDOWN};

/// Action releasing whatever resources back a client (e.g. a VPN tunnel).
pub type Teardown = Box<dyn FnOnce() -> Result<()>>;

/// A channel bound to a credential key, a dispatch rate limit and an
/// optional teardown action.
pub struct Client {
    key: String,
    label: String,
    channel: Box<dyn Channel>,
    pacer: Pacer,
    teardown: Option<Teardown>,
}

impl Client {
    /// Unlimited client with the label `direct`.
    pub fn new(key: impl Into<String>, channel: impl Channel + 'static) -> Self {
        Self {
            key: key.into(),
            label: "direct".to_string(),
            channel: Box::new(channel),
            pacer: Pacer::default(),
            teardown: None,
        }
    }

    /// Minimum spacing between dispatch starts; zero disables limiting.
    pub fn with_rate_limit(mut self, period: Duration) -> Self {
        self.pacer = Pacer::new(period);
        self
    }

    /// Human-readable name used in logs (never the key).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_teardown<F>(mut self, teardown: F) -> Self
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// Credential to send along with requests made through this client.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn rate_limit(&self) -> Duration {
        self.pacer.period()
    }

    /// Whether a teardown action is still pending.
    pub fn holds_resources(&self) -> bool {
        self.teardown.is_some()
    }

    /// Wait for the rate limit, then perform `request` on the owned channel.
    pub fn dispatch(&mut self, request: &Request) -> Result<Response, ChannelError> {
        self.pacer.pace();
        self.channel.dispatch(request)
    }

    /// Run the teardown action, if any. The action is consumed, so closing
    /// twice only tears down once.
    pub fn close(&mut self) -> Result<()> {
        match self.teardown.take() {
            Some(teardown) => {
                tracing::debug!(client = %self.label, "tearing down client");
                teardown()
            }
            None => Ok(()),
        }
    }
}

impl Channel for Client {
    fn dispatch(&mut self, request: &Request) -> Result<Response, ChannelError> {
        Client::dispatch(self, request)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(client = %self.label, "teardown on drop failed: {:#}", e);
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("label", &self.label)
            .field("rate_limit", &self.pacer.period())
            .field("holds_resources", &self.teardown.is_some())
            .finish_non_exhaustive()
    }
}
