//! Classify HTTP status, curl and I/O errors into [`ErrorKind`]s.

use std::io;

use super::ErrorKind;
use crate::channel::ChannelError;

/// Classify an HTTP status code from a declared HTTP-level failure.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 500 | 503 => ErrorKind::Overloaded(code),
        _ => ErrorKind::Fatal,
    }
}

/// Classify a curl error.
///
/// libcurl reports a peer reset as a receive (or, mid-upload, send) failure;
/// everything else, including timeouts and refused connections, is fatal.
/// Resets inside the TLS handshake surface under other codes and are caught
/// through the OS errno instead (see [`classify_channel_error`]).
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_recv_error() || e.is_send_error() {
        return ErrorKind::ConnectionReset;
    }
    ErrorKind::Fatal
}

/// Whether an OS error number (as reported by libcurl) is a peer reset.
/// 0 means no socket error was recorded.
pub fn is_reset_errno(os_errno: i32) -> bool {
    os_errno != 0
        && io::Error::from_raw_os_error(os_errno).kind() == io::ErrorKind::ConnectionReset
}

/// Classify a plain I/O error.
pub fn classify_io_error(e: &io::Error) -> ErrorKind {
    match e.kind() {
        io::ErrorKind::ConnectionReset => ErrorKind::ConnectionReset,
        _ => ErrorKind::Fatal,
    }
}

/// Classify a channel error (curl, I/O or HTTP status).
pub fn classify_channel_error(e: &ChannelError) -> ErrorKind {
    match e {
        ChannelError::Transport { os_errno, .. } if is_reset_errno(*os_errno) => {
            ErrorKind::ConnectionReset
        }
        ChannelError::Transport { error, .. } => classify_curl_error(error),
        ChannelError::Io(ie) => classify_io_error(ie),
        ChannelError::Status { status, .. } => classify_http_status(*status),
    }
}

/// Classify the error of a whole fetch attempt by walking its cause chain.
/// The first recognized cause decides; anything unrecognized is fatal.
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    for cause in err.chain() {
        if let Some(ce) = cause.downcast_ref::<ChannelError>() {
            return classify_channel_error(ce);
        }
        if let Some(ce) = cause.downcast_ref::<curl::Error>() {
            return classify_curl_error(ce);
        }
        if let Some(ie) = cause.downcast_ref::<io::Error>() {
            return classify_io_error(ie);
        }
    }
    ErrorKind::Fatal
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn http_429_500_503_overloaded() {
        assert_eq!(classify_http_status(429), ErrorKind::Overloaded(429));
        assert_eq!(classify_http_status(500), ErrorKind::Overloaded(500));
        assert_eq!(classify_http_status(503), ErrorKind::Overloaded(503));
    }

    #[test]
    fn other_http_statuses_fatal() {
        for code in [400, 401, 403, 404, 502, 504] {
            assert_eq!(classify_http_status(code), ErrorKind::Fatal, "HTTP {code}");
        }
    }

    #[test]
    fn curl_recv_and_send_errors_are_resets() {
        // CURLE_SEND_ERROR = 55, CURLE_RECV_ERROR = 56
        assert_eq!(classify_curl_error(&curl::Error::new(56)), ErrorKind::ConnectionReset);
        assert_eq!(classify_curl_error(&curl::Error::new(55)), ErrorKind::ConnectionReset);
    }

    #[test]
    fn curl_timeout_and_resolve_errors_fatal() {
        // CURLE_COULDNT_RESOLVE_HOST = 6, CURLE_OPERATION_TIMEDOUT = 28
        assert_eq!(classify_curl_error(&curl::Error::new(6)), ErrorKind::Fatal);
        assert_eq!(classify_curl_error(&curl::Error::new(28)), ErrorKind::Fatal);
    }

    #[cfg(unix)]
    #[test]
    fn reset_errno_wins_over_curl_code() {
        // CURLE_SSL_CONNECT_ERROR = 35: the peer reset the TLS handshake.
        let e = ChannelError::Transport {
            error: curl::Error::new(35),
            os_errno: libc::ECONNRESET,
        };
        assert_eq!(classify_channel_error(&e), ErrorKind::ConnectionReset);

        let err = anyhow::Error::from(e).context("fetching via direct");
        assert_eq!(classify(&err), ErrorKind::ConnectionReset);
    }

    #[cfg(unix)]
    #[test]
    fn other_errnos_defer_to_curl_code() {
        // CURLE_COULDNT_CONNECT = 7
        let e = ChannelError::Transport {
            error: curl::Error::new(7),
            os_errno: libc::ECONNREFUSED,
        };
        assert_eq!(classify_channel_error(&e), ErrorKind::Fatal);
        assert!(!is_reset_errno(0));
        assert!(!is_reset_errno(libc::ECONNREFUSED));
        assert!(is_reset_errno(libc::ECONNRESET));
    }

    #[test]
    fn io_connection_reset() {
        let e = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(classify_io_error(&e), ErrorKind::ConnectionReset);
        let e = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(classify_io_error(&e), ErrorKind::Fatal);
    }

    #[test]
    fn classify_walks_context_chain() {
        let err = anyhow::Error::from(ChannelError::Status {
            url: "https://api.example.com/ops".to_string(),
            status: 503,
        })
        .context("fetching operations");
        assert_eq!(classify(&err), ErrorKind::Overloaded(503));

        let err: anyhow::Result<()> =
            Err(ChannelError::from(curl::Error::new(56))).context("fetching operations");
        assert_eq!(classify(&err.unwrap_err()), ErrorKind::ConnectionReset);
    }

    #[test]
    fn unrecognized_errors_fatal() {
        let err = anyhow::anyhow!("invalid API key");
        assert_eq!(classify(&err), ErrorKind::Fatal);
    }
}
