//! Failure classification for the polling loop.
//!
//! This is the single place where raw transport and HTTP errors are reduced
//! to the three outcomes the run-level [`Backoff`](crate::backoff::Backoff)
//! understands. The pool and the backoff machine never look at errors.

mod classify;
mod kind;

pub use classify::{
    classify, classify_channel_error, classify_curl_error, classify_http_status, classify_io_error,
    is_reset_errno,
};
pub use kind::ErrorKind;
