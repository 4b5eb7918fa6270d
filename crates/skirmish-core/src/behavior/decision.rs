//! Action-decision behaviors: does an actor use an ability this turn?
//!
//! Each behavior receives the actor plus the ability slots already filtered
//! to cooldown zero, and returns the chosen slot index — or `None`, which
//! the engine resolves as a basic attack.
//!
//! The weighted-random draw shared by several policies follows one
//! algorithm: sum the weights, draw uniformly in `[0, total)`, walk the
//! list subtracting weights until the running remainder reaches zero, and
//! fall back to the last element so floating-point rounding can never walk
//! off the end.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ability::Ability;
use crate::battle::BattleState;
use crate::behavior::registry::BehaviorTable;
use crate::character::{Character, CharacterId};
use crate::error::BehaviorError;

/// Probability of using an ability under the engine-default policy.
const BASIC_ABILITY_CHANCE: f64 = 0.5;
/// Affinity override while below half health under the defensive policy.
const DEFENSIVE_PRESSED_AFFINITY: f64 = 0.9;
/// Weight multiplier for defensive abilities under the defensive policy.
const DEFENSIVE_WEIGHT_BONUS: f64 = 1.5;
/// Ally health fraction that makes the heal-first policy reach for a heal.
const HEAL_PRIORITY_THRESHOLD: f64 = 0.5;

// =============================================================================
// Kinds
// =============================================================================

/// The closed set of action-decision behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBehavior {
    /// Coin flip to use an ability, uniform choice among available (the
    /// engine default).
    #[default]
    Basic,
    /// Affinity-gated weighted-random choice by selection weight.
    Weighted,
    /// Reaches for the best healing ability whenever an ally is hurt, else
    /// falls back to the weighted policy.
    HealPriority,
    /// Prefers the highest-weight offensive ability, else falls back to the
    /// weighted policy.
    OffensePriority,
    /// Raises affinity when pressed and favors defensive abilities in the
    /// weighted draw.
    DefensePriority,
    /// Deterministically picks the highest-weight available ability.
    AlwaysAbility,
}

impl std::fmt::Display for DecisionBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Basic => "basic",
            Self::Weighted => "weighted",
            Self::HealPriority => "heal_priority",
            Self::OffensePriority => "offense_priority",
            Self::DefensePriority => "defense_priority",
            Self::AlwaysAbility => "always_ability",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Context
// =============================================================================

/// Read-only context handed to action-decision behaviors.
#[derive(Debug)]
pub struct ActionContext<'a> {
    /// The acting character.
    pub actor: &'a Character,
    /// Slot indices of abilities that are off cooldown and actively
    /// castable.
    pub available: Vec<usize>,
    /// The full battle state, for roster-aware policies.
    pub battle: &'a BattleState,
}

impl<'a> ActionContext<'a> {
    /// Builds a context for the given actor, or `None` if the actor is not
    /// in the battle.
    #[must_use]
    pub fn new(battle: &'a BattleState, actor: CharacterId) -> Option<Self> {
        let actor = battle.character(actor)?;
        Some(Self {
            actor,
            available: actor.ready_abilities(),
            battle,
        })
    }

    /// The ability in an available slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a valid index; behaviors only pass indices
    /// taken from `available`.
    #[must_use]
    pub fn ability(&self, slot: usize) -> &'a Ability {
        &self.actor.abilities()[slot].ability
    }

    /// Whether any living ally (self included) is below the given health
    /// fraction.
    #[must_use]
    pub fn any_ally_below(&self, fraction: f64) -> bool {
        self.battle
            .living(self.actor.team())
            .any(|ally| ally.hp_fraction() < fraction)
    }
}

/// Signature shared by every action-decision behavior.
pub type DecisionFn =
    fn(&ActionContext<'_>, &mut ChaCha8Rng) -> Result<Option<usize>, BehaviorError>;

// =============================================================================
// Selection helpers
// =============================================================================

/// The canonical weighted-random walk. Entries pair a slot index with its
/// weight; the last entry is the guaranteed fallback against floating-point
/// rounding.
fn weighted_pick(entries: &[(usize, f64)], rng: &mut ChaCha8Rng) -> Option<usize> {
    if entries.is_empty() {
        return None;
    }
    let total: f64 = entries.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return entries.last().map(|(slot, _)| *slot);
    }

    let mut remainder = rng.gen_range(0.0..total);
    for (slot, weight) in entries {
        remainder -= weight.max(0.0);
        if remainder <= 0.0 {
            return Some(*slot);
        }
    }
    entries.last().map(|(slot, _)| *slot)
}

fn weight_entries(ctx: &ActionContext<'_>) -> Vec<(usize, f64)> {
    ctx.available
        .iter()
        .map(|&slot| (slot, ctx.ability(slot).selection_weight))
        .collect()
}

/// Highest weight wins; ties keep the earliest slot.
fn best_by_weight(ctx: &ActionContext<'_>, slots: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &slot in slots {
        let weight = ctx.ability(slot).selection_weight;
        if best.map_or(true, |(_, best_weight)| weight > best_weight) {
            best = Some((slot, weight));
        }
    }
    best.map(|(slot, _)| slot)
}

// =============================================================================
// Behaviors
// =============================================================================

fn basic(ctx: &ActionContext<'_>, rng: &mut ChaCha8Rng) -> Result<Option<usize>, BehaviorError> {
    if ctx.available.is_empty() || !rng.gen_bool(BASIC_ABILITY_CHANCE) {
        return Ok(None);
    }
    let index = rng.gen_range(0..ctx.available.len());
    Ok(Some(ctx.available[index]))
}

fn weighted(ctx: &ActionContext<'_>, rng: &mut ChaCha8Rng) -> Result<Option<usize>, BehaviorError> {
    if ctx.available.is_empty() {
        return Ok(None);
    }
    let affinity = ctx.actor.ability_affinity().clamp(0.0, 1.0);
    if !rng.gen_bool(affinity) {
        return Ok(None);
    }
    Ok(weighted_pick(&weight_entries(ctx), rng))
}

fn heal_priority(
    ctx: &ActionContext<'_>,
    rng: &mut ChaCha8Rng,
) -> Result<Option<usize>, BehaviorError> {
    if ctx.any_ally_below(HEAL_PRIORITY_THRESHOLD) {
        let heals: Vec<usize> = ctx
            .available
            .iter()
            .copied()
            .filter(|&slot| ctx.ability(slot).is_healing())
            .collect();
        if let Some(slot) = best_by_weight(ctx, &heals) {
            return Ok(Some(slot));
        }
    }
    weighted(ctx, rng)
}

fn offense_priority(
    ctx: &ActionContext<'_>,
    rng: &mut ChaCha8Rng,
) -> Result<Option<usize>, BehaviorError> {
    let offensive: Vec<usize> = ctx
        .available
        .iter()
        .copied()
        .filter(|&slot| ctx.ability(slot).damage_type.is_offensive())
        .collect();
    if let Some(slot) = best_by_weight(ctx, &offensive) {
        return Ok(Some(slot));
    }
    weighted(ctx, rng)
}

fn defense_priority(
    ctx: &ActionContext<'_>,
    rng: &mut ChaCha8Rng,
) -> Result<Option<usize>, BehaviorError> {
    if ctx.available.is_empty() {
        return Ok(None);
    }
    let pressed = ctx.actor.hp_fraction() < 0.5;
    let affinity = if pressed {
        DEFENSIVE_PRESSED_AFFINITY
    } else {
        ctx.actor.ability_affinity().clamp(0.0, 1.0)
    };
    if !rng.gen_bool(affinity) {
        return Ok(None);
    }

    let entries: Vec<(usize, f64)> = ctx
        .available
        .iter()
        .map(|&slot| {
            let ability = ctx.ability(slot);
            let mut weight = ability.selection_weight;
            if ability.is_defensive() {
                weight *= DEFENSIVE_WEIGHT_BONUS;
            }
            (slot, weight)
        })
        .collect();
    Ok(weighted_pick(&entries, rng))
}

fn always_ability(
    ctx: &ActionContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Option<usize>, BehaviorError> {
    Ok(best_by_weight(ctx, &ctx.available))
}

/// Installs every built-in decision behavior; the coin-flip policy is the
/// default.
pub(crate) fn install(table: &mut BehaviorTable<DecisionBehavior, DecisionFn>) {
    table.register(DecisionBehavior::Basic, basic, true);
    table.register(DecisionBehavior::Weighted, weighted, false);
    table.register(DecisionBehavior::HealPriority, heal_priority, false);
    table.register(DecisionBehavior::OffensePriority, offense_priority, false);
    table.register(DecisionBehavior::DefensePriority, defense_priority, false);
    table.register(DecisionBehavior::AlwaysAbility, always_ability, false);
}

// =============================================================================
// Tests
// =============================================================================
