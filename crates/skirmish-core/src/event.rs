//! Outbound notifications emitted to the host.
//!
//! The engine buffers [`BattleEvent`]s as it resolves a battle; the host
//! drains them with
//! [`BattleEngine::drain_events`](crate::engine::BattleEngine::drain_events)
//! and renders them however it likes (sprites, log panes, sounds). Events
//! are logical notifications, not a wire format, but every variant derives
//! serde so hosts can persist or forward them.

use serde::{Deserialize, Serialize};

use crate::character::{CharacterId, StatusId};

/// Final outcome of a battle, reported from the player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleResult {
    /// The opponent roster was eliminated.
    Victory,
    /// The player roster was eliminated.
    Defeat,
    /// Both rosters were eliminated, or the turn cap was reached.
    Draw,
}

impl std::fmt::Display for BattleResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Victory => write!(f, "victory"),
            Self::Defeat => write!(f, "defeat"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// Severity/category tag for free-text log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogCategory {
    /// Neutral information.
    Info,
    /// Something favorable happened.
    Success,
    /// An action was taken.
    Action,
    /// Something went wrong (the battle continues).
    Error,
    /// The battle's outcome.
    BattleResult,
}

impl std::fmt::Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Action => write!(f, "action"),
            Self::Error => write!(f, "error"),
            Self::BattleResult => write!(f, "battle-result"),
        }
    }
}

/// A notification emitted during battle resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BattleEvent {
    /// A new turn has begun.
    TurnStarted {
        /// The turn number (1-based).
        turn: u32,
        /// The fastest actor, acting first this turn.
        first_actor: Option<CharacterId>,
    },
    /// A character declared an action.
    CharacterAction {
        /// The acting character.
        actor: CharacterId,
        /// Ability name, or "Attack" for a basic attack.
        name: String,
        /// Whether an ability (as opposed to a basic attack) was used.
        is_ability: bool,
        /// The resolved targets.
        targets: Vec<CharacterId>,
    },
    /// A character took damage.
    CharacterDamaged {
        /// The damaged character.
        target: CharacterId,
        /// Damage dealt after clamping.
        amount: u32,
        /// The damage source, if any (status ticks have none).
        source: Option<CharacterId>,
        /// Name of the ability or status responsible, if any.
        ability: Option<String>,
        /// Health after the hit.
        hp: u32,
        /// Maximum health.
        max_hp: u32,
        /// Whether the hit was critical.
        critical: bool,
    },
    /// A character was healed.
    CharacterHealed {
        /// The healed character.
        target: CharacterId,
        /// Healing applied after clamping.
        amount: u32,
        /// The healing source, if any.
        source: Option<CharacterId>,
        /// Name of the ability or status responsible, if any.
        ability: Option<String>,
        /// Health after the heal.
        hp: u32,
        /// Maximum health.
        max_hp: u32,
        /// Whether the heal brought the character back from defeat.
        revived: bool,
    },
    /// A character was defeated.
    CharacterDefeated {
        /// The fallen character.
        character: CharacterId,
    },
    /// A passive ability fired.
    PassiveTriggered {
        /// The passive's owner.
        character: CharacterId,
        /// The passive ability's name.
        ability: String,
        /// Optional flavor message from the behavior.
        message: Option<String>,
    },
    /// A status effect was applied.
    StatusApplied {
        /// The affected character.
        character: CharacterId,
        /// The status applied.
        status: StatusId,
        /// Turns the status lasts.
        duration: u8,
        /// Stacks applied.
        stacks: u32,
    },
    /// A status effect expired or was removed.
    StatusRemoved {
        /// The affected character.
        character: CharacterId,
        /// The status removed.
        status: StatusId,
    },
    /// The current turn finished.
    TurnEnded {
        /// The turn number that just ended.
        turn: u32,
    },
    /// The battle finished.
    BattleEnded {
        /// The outcome, from the player's perspective.
        result: BattleResult,
    },
    /// A free-text log line.
    Log {
        /// Severity/category tag.
        category: LogCategory,
        /// The message.
        message: String,
    },
}
