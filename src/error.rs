//! Crate-level error taxonomy.
//!
//! Every failure the engine reports to its callers is recoverable and
//! typed; none are fatal to the process. Persistence failures wrap
//! `PersistError` and abort the in-flight operation without a partial
//! commit.

use crate::persist::PersistError;
use crate::skills::UnlockError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The entity is absent from the store; the caller must register it
    /// first.
    #[error("not registered: {0}")]
    NotRegistered(String),

    /// Gold, skill points, hp, or materials below the requirement.
    #[error("insufficient {resource}: need {needed}, have {available}")]
    InsufficientResource {
        resource: String,
        needed: u32,
        available: u32,
    },

    /// Idempotency guard on stateful flags (stealth, class selection).
    #[error("already active: {0}")]
    AlreadyActive(&'static str),

    #[error("skill already unlocked")]
    AlreadyUnlocked,

    /// Self-target where disallowed, or a target that does not exist.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Level, floor, or hp gating failed.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error(transparent)]
    Persistence(#[from] PersistError),
}

impl From<UnlockError> for EngineError {
    fn from(err: UnlockError) -> Self {
        match err {
            UnlockError::AlreadyUnlocked => EngineError::AlreadyUnlocked,
            UnlockError::InsufficientPoints { cost, available } => {
                EngineError::InsufficientResource {
                    resource: "skill points".to_string(),
                    needed: cost,
                    available,
                }
            }
            UnlockError::MissingPrerequisite(req) => {
                EngineError::PreconditionFailed(format!("missing prerequisite: {req}"))
            }
            UnlockError::UnknownSkill(id) => EngineError::InvalidTarget(id),
        }
    }
}
