//! Engine configuration.
//!
//! Pacing delays, the RNG seed, and the stalemate cap live here. All fields
//! have sensible defaults so a host can deserialize a partial config (every
//! field is optional in the serialized form).

use serde::{Deserialize, Serialize};

/// Configuration for a [`BattleEngine`](crate::engine::BattleEngine).
///
/// Delays are *base* values in milliseconds; the live speed multiplier
/// divides them when a continuation is scheduled. The seed drives every
/// stochastic decision in the engine (targeting rolls, weighted ability
/// selection, passive chance rolls, crit rolls), so a fixed seed and fixed
/// rosters reproduce a battle exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base delay between the end of one turn and the start of the next.
    pub turn_delay_ms: u64,
    /// Base delay between consecutive action executions within a turn.
    pub action_delay_ms: u64,
    /// Turn count at which an undecided battle is called as a draw.
    pub max_turns: u32,
    /// Seed for the engine's deterministic RNG.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            turn_delay_ms: 1400,
            action_delay_ms: 700,
            max_turns: 200,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Creates a config with the given seed and default pacing.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}
