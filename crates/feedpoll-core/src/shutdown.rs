//! Cooperative shutdown for the polling loop.
//!
//! SIGINT/SIGTERM only set a flag; the loop notices it between runs (and while
//! sleeping between them), stops, and the caller closes the pool so tunnels
//! are torn down. A second signal exits immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

/// Longest uninterrupted sleep slice; bounds how late a shutdown is noticed.
const SLICE: Duration = Duration::from_millis(100);

/// Set from the signal handler; shared by every token that watches signals.
static SIGNALLED: AtomicBool = AtomicBool::new(false);

/// Shared stop request. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    requested: Arc<AtomicBool>,
    watches_signals: bool,
}

impl ShutdownToken {
    /// Token that only stops on [`ShutdownToken::request`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Install SIGINT/SIGTERM handlers and return a token that also stops
    /// when one of them arrives.
    pub fn from_signals() -> Result<Self> {
        install_handlers()?;
        Ok(Self {
            requested: Arc::new(AtomicBool::new(false)),
            watches_signals: true,
        })
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
            || (self.watches_signals && SIGNALLED.load(Ordering::Relaxed))
    }

    /// Sleep for `duration` unless shutdown is requested first.
    /// Returns `false` if the sleep was cut short (or shutdown was already requested).
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLICE));
        }
    }
}

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    if SIGNALLED.swap(true, Ordering::SeqCst) {
        // Second signal: the user wants out now.
        unsafe { libc::_exit(130) };
    }
}

#[cfg(unix)]
fn install_handlers() -> Result<()> {
    for signum in [libc::SIGINT, libc::SIGTERM] {
        let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        let previous = unsafe { libc::signal(signum, handler) };
        if previous == libc::SIG_ERR {
            return Err(std::io::Error::last_os_error().into());
        }
    }
    tracing::debug!("installed SIGINT/SIGTERM handlers");
    Ok(())
}

#[cfg(not(unix))]
fn install_handlers() -> Result<()> {
    tracing::debug!("no signal handlers on this platform");
    Ok(())
}
