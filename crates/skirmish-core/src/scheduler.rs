//! Pacing scheduler: a queue of delayed continuations.
//!
//! The turn loop never blocks. After each suspension point (turn started,
//! action applied, turn finished) the engine schedules the next step as a
//! [`Continuation`] with a delay, and the host drives time forward with
//! [`BattleEngine::tick`](crate::engine::BattleEngine::tick). Tests bypass
//! pacing entirely by calling the manual stepping API.
//!
//! Pausing parks the pending continuation without touching queue state;
//! resuming re-schedules exactly the parked step. The speed multiplier
//! divides delays at scheduling time only, so changing speed affects the
//! cadence of future steps, never their order or outcome.

use std::fmt;

use crate::error::EngineError;

// =============================================================================
// Continuation
// =============================================================================

/// The next step of the turn loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Begin the next turn cycle.
    StartTurn,
    /// Execute the next queued action.
    ExecuteAction,
}

impl fmt::Display for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartTurn => write!(f, "start-turn"),
            Self::ExecuteAction => write!(f, "execute-action"),
        }
    }
}

// =============================================================================
// Battle speed
// =============================================================================

/// Playback speed multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BattleSpeed {
    /// 1× pacing.
    #[default]
    Normal,
    /// 2× pacing.
    Double,
    /// 3× pacing.
    Triple,
}

impl BattleSpeed {
    /// The divisor applied to base delays.
    #[must_use]
    pub const fn multiplier(self) -> u64 {
        match self {
            Self::Normal => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }

    /// Parses a host-supplied multiplier.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSpeed`] for anything but 1, 2, or 3.
    pub fn from_multiplier(multiplier: u8) -> Result<Self, EngineError> {
        match multiplier {
            1 => Ok(Self::Normal),
            2 => Ok(Self::Double),
            3 => Ok(Self::Triple),
            other => Err(EngineError::InvalidSpeed(other)),
        }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    what: Continuation,
    remaining_ms: u64,
}

/// Holds at most one delayed continuation and advances it with elapsed time.
///
/// # Example
///
/// ```
/// use skirmish_core::scheduler::{Continuation, Scheduler};
///
/// let mut scheduler = Scheduler::new();
/// scheduler.schedule(Continuation::StartTurn, 1000);
///
/// assert_eq!(scheduler.advance(400), None);
/// assert_eq!(scheduler.advance(600), Some(Continuation::StartTurn));
/// assert!(scheduler.is_idle());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    pending: Option<Pending>,
    parked: Option<Continuation>,
    speed: BattleSpeed,
}

impl Scheduler {
    /// Creates an idle scheduler at normal speed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a continuation, replacing any pending one.
    ///
    /// The effective delay is `base_delay_ms` divided by the current speed
    /// multiplier.
    pub fn schedule(&mut self, what: Continuation, base_delay_ms: u64) {
        let delay = base_delay_ms / self.speed.multiplier();
        self.pending = Some(Pending {
            what,
            remaining_ms: delay,
        });
    }

    /// Advances time; returns the continuation if its delay elapsed.
    pub fn advance(&mut self, elapsed_ms: u64) -> Option<Continuation> {
        let pending = self.pending.as_mut()?;
        if pending.remaining_ms <= elapsed_ms {
            let what = pending.what;
            self.pending = None;
            Some(what)
        } else {
            pending.remaining_ms -= elapsed_ms;
            None
        }
    }

    /// Parks the pending continuation (pause). Queue state is untouched.
    pub fn park(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.parked = Some(pending.what);
        }
    }

    /// Takes the parked continuation so the caller can re-schedule it
    /// (resume).
    pub fn take_parked(&mut self) -> Option<Continuation> {
        self.parked.take()
    }

    /// Drops both pending and parked continuations (battle end).
    pub fn cancel(&mut self) {
        self.pending = None;
        self.parked = None;
    }

    /// Changes the speed for future schedules. The currently pending delay
    /// is left as-is.
    pub fn set_speed(&mut self, speed: BattleSpeed) {
        self.speed = speed;
    }

    /// The current speed setting.
    #[must_use]
    pub const fn speed(&self) -> BattleSpeed {
        self.speed
    }

    /// The continuation currently pending, if any.
    #[must_use]
    pub fn pending_kind(&self) -> Option<Continuation> {
        self.pending.map(|p| p.what)
    }

    /// Whether nothing is pending or parked.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.pending.is_none() && self.parked.is_none()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod speed_tests {
        use super::*;

        #[test]
        fn multipliers() {
            assert_eq!(BattleSpeed::Normal.multiplier(), 1);
            assert_eq!(BattleSpeed::Double.multiplier(), 2);
            assert_eq!(BattleSpeed::Triple.multiplier(), 3);
        }

        #[test]
        fn from_multiplier_accepts_valid_values() {
            assert_eq!(BattleSpeed::from_multiplier(1).unwrap(), BattleSpeed::Normal);
            assert_eq!(BattleSpeed::from_multiplier(3).unwrap(), BattleSpeed::Triple);
        }

        #[test]
        fn from_multiplier_rejects_others() {
            assert_eq!(
                BattleSpeed::from_multiplier(0),
                Err(EngineError::InvalidSpeed(0))
            );
            assert_eq!(
                BattleSpeed::from_multiplier(4),
                Err(EngineError::InvalidSpeed(4))
            );
        }
    }

    mod scheduling_tests {
        use super::*;

        #[test]
        fn fires_after_delay_elapses() {
            let mut scheduler = Scheduler::new();
            scheduler.schedule(Continuation::ExecuteAction, 500);

            assert_eq!(scheduler.advance(200), None);
            assert_eq!(scheduler.advance(200), None);
            assert_eq!(scheduler.advance(100), Some(Continuation::ExecuteAction));
            assert_eq!(scheduler.advance(100), None);
        }

        #[test]
        fn zero_delay_fires_immediately() {
            let mut scheduler = Scheduler::new();
            scheduler.schedule(Continuation::StartTurn, 0);
            assert_eq!(scheduler.advance(0), Some(Continuation::StartTurn));
        }

        #[test]
        fn scheduling_replaces_pending() {
            let mut scheduler = Scheduler::new();
            scheduler.schedule(Continuation::StartTurn, 1000);
            scheduler.schedule(Continuation::ExecuteAction, 100);
            assert_eq!(scheduler.advance(100), Some(Continuation::ExecuteAction));
        }

        #[test]
        fn speed_divides_future_delays() {
            let mut scheduler = Scheduler::new();
            scheduler.set_speed(BattleSpeed::Double);
            scheduler.schedule(Continuation::StartTurn, 1000);
            assert_eq!(scheduler.advance(499), None);
            assert_eq!(scheduler.advance(1), Some(Continuation::StartTurn));
        }

        #[test]
        fn speed_change_leaves_pending_delay_untouched() {
            let mut scheduler = Scheduler::new();
            scheduler.schedule(Continuation::StartTurn, 900);
            scheduler.set_speed(BattleSpeed::Triple);
            assert_eq!(scheduler.advance(300), None);
            assert_eq!(scheduler.advance(600), Some(Continuation::StartTurn));
        }
    }

    mod pause_tests {
        use super::*;

        #[test]
        fn park_and_resume_preserves_continuation() {
            let mut scheduler = Scheduler::new();
            scheduler.schedule(Continuation::ExecuteAction, 700);

            scheduler.park();
            assert_eq!(scheduler.pending_kind(), None);
            assert_eq!(scheduler.advance(10_000), None);

            let parked = scheduler.take_parked();
            assert_eq!(parked, Some(Continuation::ExecuteAction));
        }

        #[test]
        fn park_with_nothing_pending_is_noop() {
            let mut scheduler = Scheduler::new();
            scheduler.park();
            assert!(scheduler.take_parked().is_none());
        }

        #[test]
        fn cancel_clears_everything() {
            let mut scheduler = Scheduler::new();
            scheduler.schedule(Continuation::StartTurn, 100);
            scheduler.park();
            scheduler.cancel();
            assert!(scheduler.is_idle());
        }
    }
}
