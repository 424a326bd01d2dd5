//! Discord API error classification.
//!
//! Handlers return `anyhow::Result`; when one fails, `log_error` finds the
//! underlying serenity error (if any) and logs at a level that matches how
//! much it matters. Races the guard cannot fully rule out, like an
//! interaction that expired before we answered or a ticket channel deleted
//! by a concurrent close, are expected and only logged at debug.

use serenity::http::HttpError;
use tracing::{debug, error, warn};

/// Discord JSON error codes we treat specially.
pub mod codes {
    pub const UNKNOWN_CHANNEL: isize = 10003;
    pub const UNKNOWN_MESSAGE: isize = 10008;
    pub const UNKNOWN_INTERACTION: isize = 10062;
    pub const MISSING_ACCESS: isize = 50001;
    pub const MISSING_PERMISSIONS: isize = 50013;
    pub const INTERACTION_ALREADY_ACKNOWLEDGED: isize = 40060;
}

/// How much a failure matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Lost a race that is expected under duplicate delivery.
    Benign,
    /// Rate limits, network hiccups, 5xx.
    Transient,
    /// Misconfiguration or a bug; needs attention.
    Permanent,
}

/// Classify a Discord JSON error code plus HTTP status.
pub fn classify_code(code: isize, status: u16) -> Severity {
    match code {
        codes::UNKNOWN_CHANNEL
        | codes::UNKNOWN_MESSAGE
        | codes::UNKNOWN_INTERACTION
        | codes::INTERACTION_ALREADY_ACKNOWLEDGED => Severity::Benign,
        codes::MISSING_ACCESS | codes::MISSING_PERMISSIONS => Severity::Permanent,
        _ if status == 429 || status >= 500 => Severity::Transient,
        _ => Severity::Permanent,
    }
}

/// Classify a serenity error.
pub fn classify(err: &serenity::Error) -> Severity {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) => {
            classify_code(resp.error.code, resp.status_code.as_u16())
        }
        serenity::Error::Http(HttpError::Request(_)) => Severity::Transient,
        serenity::Error::Io(_) | serenity::Error::Gateway(_) => Severity::Transient,
        _ => Severity::Permanent,
    }
}

/// Classify a handler failure by the first serenity error in its chain.
pub fn severity_of(err: &anyhow::Error) -> Severity {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<serenity::Error>())
        .map_or(Severity::Permanent, classify)
}

/// Log a handler failure at the level its cause deserves.
pub fn log_error(context: &str, err: &anyhow::Error) {
    match severity_of(err) {
        Severity::Benign => debug!("{}: {:#}", context, err),
        Severity::Transient => warn!("{}: {:#}", context, err),
        Severity::Permanent => error!("{}: {:#}", context, err),
    }
}
