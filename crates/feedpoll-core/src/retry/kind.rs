use crate::backoff::Outcome;

/// High-level classification of a failed fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The connection was reset mid-request, typically by a tunnel or other
    /// intermediary. Retry soon without blaming the channel.
    ConnectionReset,
    /// The remote said it is rate limiting or overloaded (429, 500, 503).
    /// Penalize the channel and back off.
    Overloaded(u32),
    /// Will not fix itself by waiting or switching channels
    /// (configuration, authentication, parsing, local I/O, ...).
    Fatal,
}

impl ErrorKind {
    /// Outcome to feed into the run-level backoff; `None` means abort.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            ErrorKind::ConnectionReset => Some(Outcome::Retry),
            ErrorKind::Overloaded(_) => Some(Outcome::Failure),
            ErrorKind::Fatal => None,
        }
    }

    /// Whether the channel that produced the error should be backed off.
    pub fn penalizes_channel(self) -> bool {
        matches!(self, ErrorKind::Overloaded(_))
    }
}
