use crate::ParticipantId;

use thiserror::Error;

/// Error types
///
/// Every guard that can reject an operation has its own variant so that a
/// caller (or a UI several layers up) can tell exactly which guard fired
/// without re-deriving circuit state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("riftparlay: circuit {0} already exists")]
    CircuitExists(String),

    #[error("riftparlay: circuit {0} not found")]
    CircuitMissing(String),

    #[error("riftparlay: duration {0}s is outside the allowed range")]
    InvalidDuration(u64),

    #[error("riftparlay: {1} has already entered circuit {0}")]
    AlreadyEntered(String, ParticipantId),

    #[error("riftparlay: entry proof failed verification")]
    InvalidProof,

    #[error("riftparlay: no entry for {1} in circuit {0}")]
    EntryMissing(String, ParticipantId),

    #[error("riftparlay: circuit {0} has not reached its lock time")]
    NotLocked(String),

    #[error("riftparlay: circuit {0} is locked")]
    Locked(String),

    #[error("riftparlay: circuit {0} is already settled")]
    AlreadySettled(String),

    #[error("riftparlay: votes already submitted for circuit {0}")]
    AlreadySubmitted(String),

    #[error("riftparlay: no decrypted votes submitted for circuit {0}")]
    TallyMissing(String),

    #[error("riftparlay: circuit {0} is cancelled")]
    Cancelled(String),

    #[error("riftparlay: caller is not the creator of circuit {0}")]
    NotCreator(String),
}

/// The broad class a guard violation belongs to.
///
/// Used at service boundaries to pick a transport-level status without
/// matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    TemporalGuard,
    Authorization,
    Validation,
    TerminalState,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CircuitMissing(_) | Error::EntryMissing(_, _) => ErrorKind::NotFound,
            Error::CircuitExists(_)
            | Error::AlreadyEntered(_, _)
            | Error::AlreadySettled(_)
            | Error::AlreadySubmitted(_) => ErrorKind::Conflict,
            Error::NotLocked(_) | Error::Locked(_) | Error::TallyMissing(_) => {
                ErrorKind::TemporalGuard
            }
            Error::NotCreator(_) => ErrorKind::Authorization,
            Error::InvalidDuration(_) | Error::InvalidProof => ErrorKind::Validation,
            Error::Cancelled(_) => ErrorKind::TerminalState,
        }
    }

    /// Stable machine-readable code for the fired guard.
    pub fn code(&self) -> &'static str {
        match self {
            Error::CircuitExists(_) => "circuit_exists",
            Error::CircuitMissing(_) => "circuit_missing",
            Error::InvalidDuration(_) => "invalid_duration",
            Error::AlreadyEntered(_, _) => "already_entered",
            Error::InvalidProof => "invalid_proof",
            Error::EntryMissing(_, _) => "entry_missing",
            Error::NotLocked(_) => "not_locked",
            Error::Locked(_) => "locked",
            Error::AlreadySettled(_) => "already_settled",
            Error::AlreadySubmitted(_) => "already_submitted",
            Error::TallyMissing(_) => "tally_missing",
            Error::Cancelled(_) => "cancelled",
            Error::NotCreator(_) => "not_creator",
        }
    }
}
