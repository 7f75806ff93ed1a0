//! Blocking libcurl transport.
//!
//! Uses the curl crate (libcurl) with one reused `Easy` handle per channel so
//! keep-alive connections survive between polls. Runs in the calling thread.

use std::time::Duration;

use curl::easy::{Easy, List};

use super::{Channel, ChannelError, Request, Response};

/// Per-channel transport options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Upper bound for the whole transfer.
    pub timeout: Duration,
    /// Bind outgoing connections to this interface (e.g. a WireGuard tunnel).
    pub interface: Option<String>,
    /// Route through this proxy (`http://`, `socks5h://`, ...).
    pub proxy: Option<String>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(120),
            interface: None,
            proxy: None,
        }
    }
}

impl CurlOptions {
    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.interface = Some(name.into());
        self
    }

    pub fn with_proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }
}

/// [`Channel`] backed by a libcurl easy handle.
pub struct CurlChannel {
    easy: Easy,
    options: CurlOptions,
}

impl CurlChannel {
    pub fn new(options: CurlOptions) -> Self {
        Self {
            easy: Easy::new(),
            options,
        }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }

    fn configure(&mut self, request: &Request) -> Result<(), curl::Error> {
        let easy = &mut self.easy;
        easy.reset();
        easy.url(&request.url)?;
        easy.get(true)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.timeout(self.options.timeout)?;
        if let Some(interface) = &self.options.interface {
            easy.interface(interface)?;
        }
        if let Some(proxy) = &self.options.proxy {
            easy.proxy(proxy)?;
        }

        let mut list = List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !request.headers.is_empty() {
            easy.http_headers(list)?;
        }
        Ok(())
    }
}

impl Default for CurlChannel {
    fn default() -> Self {
        Self::new(CurlOptions::default())
    }
}

impl Channel for CurlChannel {
    fn dispatch(&mut self, request: &Request) -> Result<Response, ChannelError> {
        self.configure(request)?;

        let mut body = Vec::new();
        let performed = {
            let mut transfer = self.easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()
        };
        if let Err(error) = performed {
            let os_errno = self.easy.os_errno().unwrap_or(0);
            tracing::debug!(code = error.code(), os_errno, "transfer failed");
            return Err(ChannelError::Transport { error, os_errno });
        }

        let status = self.easy.response_code()?;
        tracing::debug!(status, bytes = body.len(), "request finished");
        Ok(Response { status, body })
    }
}
