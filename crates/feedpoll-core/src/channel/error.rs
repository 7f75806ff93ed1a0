//! Transport-level error type, kept typed so the failure classifier can
//! inspect it before everything is widened to `anyhow`.

/// Failure of a single channel dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// libcurl reported an error (connect, reset, timeout, ...). `os_errno` is
    /// the last socket error libcurl saw, or 0; it identifies a peer reset even
    /// when curl reports it under another code (e.g. during the TLS handshake).
    #[error("{error}")]
    Transport { error: curl::Error, os_errno: i32 },
    /// Non-curl I/O failure, e.g. from a channel that is not libcurl-backed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The remote answered with a 4xx or 5xx status.
    #[error("{url}: HTTP {status}")]
    Status { url: String, status: u32 },
}

impl ChannelError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u32> {
        match self {
            ChannelError::Status { status, .. } => Some(*status),
            ChannelError::Transport { .. } | ChannelError::Io(_) => None,
        }
    }
}

impl From<curl::Error> for ChannelError {
    fn from(error: curl::Error) -> Self {
        ChannelError::Transport { error, os_errno: 0 }
    }
}

/// Strip credentials, query and fragment from a URL before it ends up in logs.
/// Unparseable input is returned unchanged.
pub fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    let _ = parsed.set_username("");
    let _ = parsed.set_password(None);
    parsed.set_query(None);
    parsed.set_fragment(None);
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let e = ChannelError::Status {
            url: "https://api.example.com/ops".to_string(),
            status: 503,
        };
        assert_eq!(e.to_string(), "https://api.example.com/ops: HTTP 503");
        assert_eq!(e.status(), Some(503));
    }

    #[test]
    fn io_error_has_no_status() {
        let e = ChannelError::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert_eq!(e.status(), None);
    }

    #[test]
    fn transport_error_displays_curl_message() {
        let e = ChannelError::from(curl::Error::new(56));
        assert_eq!(e.to_string(), curl::Error::new(56).to_string());
        assert!(matches!(e, ChannelError::Transport { os_errno: 0, .. }));
    }

    #[test]
    fn redact_drops_secrets() {
        assert_eq!(
            redact_url("https://user:pw@host.test/p?apikey=1#frag"),
            "https://host.test/p"
        );
        assert_eq!(redact_url("not a url"), "not a url");
    }
}
