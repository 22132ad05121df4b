//! Save and destructive-action state machines shared by the settings and license editors.

use std::fmt;

use thiserror::Error;
use time::OffsetDateTime;

mod destructive;
mod save;

pub use destructive::{DestructiveLifecycle, DestructiveStatus, ErrorSurface};
pub use save::{RetryPolicy, SaveLifecycle, SaveStatus, SaveStatusKind, SubmitDecision};

const UNKNOWN_ERROR_TEXT: &str = "unknown error";

/// Failure of a remote request as seen by the user.
///
/// The message is whatever the backend supplied in `errorMessage`; it may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("network error: {}", MessageText(.message))]
    Network {
        message: Option<String>,
        occurred_at: OffsetDateTime,
    },
    #[error("rejected: {}", MessageText(.message))]
    Validation {
        message: Option<String>,
        occurred_at: OffsetDateTime,
    },
    #[error("{}", MessageText(.message))]
    Unknown {
        message: Option<String>,
        occurred_at: OffsetDateTime,
    },
}

impl SaveError {
    pub fn network(message: Option<String>) -> Self {
        SaveError::Network {
            message,
            occurred_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn validation(message: Option<String>) -> Self {
        SaveError::Validation {
            message,
            occurred_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn unknown(message: Option<String>) -> Self {
        SaveError::Unknown {
            message,
            occurred_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            SaveError::Network { message, .. }
            | SaveError::Validation { message, .. }
            | SaveError::Unknown { message, .. } => message.as_deref(),
        }
    }

    /// Text shown to the user: the remote message verbatim, or a fallback.
    pub fn display_message(&self) -> &str {
        self.message().unwrap_or(UNKNOWN_ERROR_TEXT)
    }

    pub fn occurred_at(&self) -> OffsetDateTime {
        match self {
            SaveError::Network { occurred_at, .. }
            | SaveError::Validation { occurred_at, .. }
            | SaveError::Unknown { occurred_at, .. } => *occurred_at,
        }
    }
}

struct MessageText<'a>(&'a Option<String>);

impl fmt::Display for MessageText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or(UNKNOWN_ERROR_TEXT))
    }
}
