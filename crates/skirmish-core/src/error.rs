//! Error taxonomy for the combat engine.
//!
//! Errors are split by who can fail:
//! - [`EngineError`]: misuse of the inbound host API (starting a battle twice,
//!   stepping while paused) and absent collaborators.
//! - [`BehaviorError`]: a registered behavior function failed. These are
//!   caught at the registry boundary and never escape the turn loop; the
//!   registry logs them and falls back to the kind's default behavior.
//!
//! Nothing in this crate panics on malformed battle data. Configuration
//! problems (bad durations, out-of-range chances) are repaired with safe
//! defaults at the data layer instead of being surfaced as errors.

use thiserror::Error;

/// Errors returned by the inbound engine API.
///
/// These signal host-side misuse or missing wiring. They are returned
/// synchronously from the public entry points and never abort a running
/// battle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The battle has not been started or has already ended.
    #[error("battle is not active")]
    Inactive,

    /// The battle is paused; resume before stepping.
    #[error("battle is paused")]
    Paused,

    /// A turn is already being executed.
    #[error("a turn is already in progress")]
    TurnInProgress,

    /// No turn is currently in progress, so there is no action to execute.
    #[error("no turn is in progress")]
    NoTurnInProgress,

    /// `start_battle` was called while a battle is already running.
    #[error("a battle is already running")]
    AlreadyStarted,

    /// The requested speed multiplier is not one of 1, 2, or 3.
    #[error("invalid speed multiplier {0} (expected 1, 2, or 3)")]
    InvalidSpeed(u8),

    /// A required collaborator (damage model, status manager, ...) was
    /// removed and an operation that needs it was attempted.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// Errors produced by individual behavior functions.
///
/// Raised by targeting, action-decision, or passive behaviors and caught by
/// [`BehaviorTable::execute`](crate::behavior::registry::BehaviorTable::execute),
/// which logs the failure and retries the kind's default behavior once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BehaviorError {
    /// A context field the behavior requires was absent.
    #[error("required context field missing: {0}")]
    MissingData(&'static str),

    /// The behavior failed for a behavior-specific reason.
    #[error("behavior failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_display() {
        assert_eq!(EngineError::Inactive.to_string(), "battle is not active");
        assert_eq!(
            EngineError::InvalidSpeed(7).to_string(),
            "invalid speed multiplier 7 (expected 1, 2, or 3)"
        );
        assert_eq!(
            EngineError::MissingCollaborator("damage model").to_string(),
            "missing collaborator: damage model"
        );
    }

    #[test]
    fn behavior_error_display() {
        assert_eq!(
            BehaviorError::MissingData("attacker").to_string(),
            "required context field missing: attacker"
        );
        assert_eq!(
            BehaviorError::Failed("boom".into()).to_string(),
            "behavior failed: boom"
        );
    }

    #[test]
    fn errors_are_comparable() {
        assert_eq!(EngineError::Inactive, EngineError::Inactive);
        assert_ne!(EngineError::Inactive, EngineError::Paused);
    }
}
