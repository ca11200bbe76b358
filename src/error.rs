//! Error taxonomy shared by the daemon, the wire protocol, and the CLI.

use thiserror::Error;

/// All failures a command can surface. Each variant carries a stable
/// machine-checkable code (see [`Error::code`]) used in error envelopes.
#[derive(Debug, Error)]
pub enum Error {
    /// The argument is neither a resolvable URL nor a known key.
    #[error("invalid crawl target: {0}")]
    InvalidTarget(String),

    /// A control command named a target with no job behind it.
    #[error("no crawl job for target: {0}")]
    JobNotFound(String),

    /// The requested state change is not in the transition table.
    #[error("job for {target} is {state}, cannot {action}")]
    IllegalTransition {
        target: String,
        state: &'static str,
        action: &'static str,
    },

    /// Catalog generation yielded nothing or the source was unreachable.
    #[error("scrape of {src} failed: {reason}")]
    ScrapeFailed { src: String, reason: String },

    /// A catalog lookup before any successful generation.
    #[error("catalog {0} has not been generated yet")]
    CatalogMissing(String),

    /// The catalog exists but holds no domains.
    #[error("catalog {0} is empty")]
    CatalogEmpty(String),

    /// A request or response envelope failed to parse.
    #[error("malformed envelope: {0}")]
    Decode(String),

    /// Client side: nothing is listening at the daemon address.
    #[error("no daemon reachable at {0}")]
    DaemonUnreachable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Stable code string carried on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidTarget(_) => "InvalidTarget",
            Error::JobNotFound(_) => "JobNotFound",
            Error::IllegalTransition { .. } => "IllegalTransition",
            Error::ScrapeFailed { .. } => "ScrapeFailed",
            Error::CatalogMissing(_) => "CatalogMissing",
            Error::CatalogEmpty(_) => "CatalogEmpty",
            Error::Decode(_) => "DecodeError",
            Error::DaemonUnreachable(_) => "DaemonUnreachable",
            Error::Io(_) => "IoError",
            Error::Http(_) => "HttpError",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::InvalidTarget("x".into()).code(), "InvalidTarget");
        assert_eq!(Error::CatalogMissing("reddit".into()).code(), "CatalogMissing");
        assert_eq!(Error::Decode("bad".into()).code(), "DecodeError");
    }

    #[test]
    fn test_illegal_transition_message() {
        let err = Error::IllegalTransition {
            target: "https://cnn.com/".into(),
            state: "paused",
            action: "pause",
        };
        assert!(err.to_string().contains("paused"));
        assert!(err.to_string().contains("cnn.com"));
    }
}
