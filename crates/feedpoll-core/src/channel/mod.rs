//! Channel primitive and the decorators composed over it.
//!
//! A channel is anything that can perform one request and hand back a
//! response. Rate limiting, random fan-out and the client pool all wrap
//! `Channel` trait objects instead of knowing what transport sits below.

mod error;
mod pacer;
mod random;
mod rate_limited;
mod transport;

pub use error::{redact_url, ChannelError};
pub use pacer::Pacer;
pub use random::RandomChannel;
pub use rate_limited::RateLimitedChannel;
pub use transport::{CurlChannel, CurlOptions};

/// Capability to perform exactly one request.
pub trait Channel {
    /// Perform `request`. Any HTTP status counts as a response; use
    /// [`Response::check`] to turn 4xx/5xx into an error.
    fn dispatch(&mut self, request: &Request) -> Result<Response, ChannelError>;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn dispatch(&mut self, request: &Request) -> Result<Response, ChannelError> {
        (**self).dispatch(request)
    }
}

/// Description of a GET request: target URL plus extra headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Response returned by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u32,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Fail with [`ChannelError::Status`] for 4xx and 5xx responses.
    pub fn check(self, url: &str) -> Result<Self, ChannelError> {
        if (400..600).contains(&self.status) {
            return Err(ChannelError::Status {
                url: redact_url(url),
                status: self.status,
            });
        }
        Ok(self)
    }
}
