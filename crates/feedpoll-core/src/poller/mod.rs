//! The sequential driving loop.
//!
//! One iteration is `wait -> start run -> select client -> dispatch ->
//! classify -> end run`, with no overlap between iterations. Transient and
//! overload failures are logged and the loop continues; anything else is
//! returned to the caller, which is expected to terminate.

mod output;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::backoff::{Backoff, Outcome};
use crate::channel::{redact_url, Request};
use crate::client::Pool;
use crate::retry;
use crate::shutdown::ShutdownToken;

pub use output::write_output;

/// What to fetch and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    /// Header carrying the selected client's key.
    pub key_header: String,
    /// File replaced with each successful response body.
    pub output: PathBuf,
}

impl Target {
    /// Validate `url` and build a target.
    pub fn new(url: &str, key_header: &str, output: PathBuf) -> Result<Self> {
        let parsed =
            url::Url::parse(url).with_context(|| format!("invalid URL {}", redact_url(url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("unsupported URL scheme {:?}", parsed.scheme());
        }
        Ok(Self {
            url: url.to_string(),
            key_header: key_header.to_string(),
            output,
        })
    }
}

pub struct Poller {
    pool: Pool,
    target: Target,
    shutdown: ShutdownToken,
}

impl Poller {
    pub fn new(pool: Pool, target: Target) -> Self {
        Self {
            pool,
            target,
            shutdown: ShutdownToken::new(),
        }
    }

    /// Stop `run_loop` (and refuse `run_once`) once `shutdown` is requested.
    pub fn with_shutdown(mut self, shutdown: ShutdownToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Fetch the target once through a selected client and write the body.
    /// Returns the number of bytes written.
    pub fn fetch_once(&mut self) -> Result<usize> {
        let client = self.pool.select();
        let label = client.label().to_string();
        let request =
            Request::get(&self.target.url).header(&self.target.key_header, client.key());

        tracing::debug!(client = %label, "fetching feed");
        let response = client
            .dispatch(&request)
            .and_then(|r| r.check(&self.target.url))
            .with_context(|| format!("fetching via {label}"))?;

        write_output(&self.target.output, &response.body)?;
        Ok(response.body.len())
    }

    /// One loop iteration. Returns the outcome fed to `backoff`, or the error
    /// when it is fatal.
    pub fn step(&mut self, backoff: &mut Backoff) -> Result<Outcome> {
        backoff.wait();
        backoff.start_run();

        let err = match self.fetch_once() {
            Ok(bytes) => {
                backoff.end_run(Outcome::Success);
                tracing::info!(bytes, "feed updated successfully");
                return Ok(Outcome::Success);
            }
            Err(err) => err,
        };

        let kind = retry::classify(&err);
        let Some(outcome) = kind.outcome() else {
            tracing::error!("feed update failed fatally: {:#}", err);
            return Err(err);
        };
        if kind.penalizes_channel() {
            self.pool.backoff_last();
        }
        let next = backoff.end_run(outcome);
        let next_try_in = next.saturating_duration_since(Instant::now());
        tracing::error!(
            kind = ?kind,
            next_try_in_secs = next_try_in.as_secs_f64(),
            "feed update failure: {:#}",
            err
        );
        Ok(outcome)
    }

    /// Poll until a fatal error occurs or shutdown is requested. Shutdown is
    /// noticed between runs, including while waiting for the next one, and
    /// returns `Ok(())`.
    pub fn run_loop(&mut self, backoff: &mut Backoff) -> Result<()> {
        loop {
            if !self.shutdown.sleep(backoff.remaining()) {
                tracing::info!("shutdown requested, leaving poll loop");
                return Ok(());
            }
            self.step(backoff)?;
        }
    }

    /// One-shot mode: a single fetch, every error returned.
    pub fn run_once(&mut self) -> Result<usize> {
        if self.shutdown.is_requested() {
            anyhow::bail!("shutdown requested before fetching");
        }
        let bytes = self.fetch_once()?;
        tracing::info!(bytes, "feed updated successfully");
        Ok(bytes)
    }

    /// Tear down every client in the pool.
    pub fn close(&mut self) -> Result<()> {
        self.pool.close()
    }
}
