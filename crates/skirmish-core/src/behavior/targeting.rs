//! Targeting behaviors: pure selection functions over a roster snapshot.
//!
//! Each behavior filters the candidate pool to the relationship it cares
//! about (opposing and alive, same team and alive, self) and then selects
//! per its rule. A behavior returns [`Selection::None`] when no valid target
//! exists — callers treat that as "this action cannot proceed", never as an
//! error.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::BattleState;
use crate::behavior::registry::BehaviorTable;
use crate::character::{Character, CharacterId};
use crate::error::BehaviorError;

/// Extra targets picked up by the cluster rule beyond the primary.
const CLUSTER_EXTRAS: usize = 2;

// =============================================================================
// Kinds
// =============================================================================

/// The closed set of targeting behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingBehavior {
    /// A random living enemy (the engine default).
    #[default]
    RandomEnemy,
    /// The living enemy with the lowest current health.
    LowestHpEnemy,
    /// The living enemy with the highest current health.
    HighestHpEnemy,
    /// Every living enemy.
    AllEnemies,
    /// The living ally (self included) with the lowest current health.
    LowestHpAlly,
    /// Every living ally, self included.
    AllAllies,
    /// The actor itself.
    ThisCharacter,
    /// The living enemy with the highest attack stat.
    HighestAttackEnemy,
    /// The living enemy with the highest magic stat.
    HighestMagicEnemy,
    /// A random primary enemy plus up to two random extras.
    Cluster,
    /// A random living ally other than the actor.
    RandomAllyOther,
    /// The living ally missing the largest fraction of health.
    MostInjuredAlly,
    /// Every living character on both sides.
    Everyone,
}

impl std::fmt::Display for TargetingBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RandomEnemy => "random_enemy",
            Self::LowestHpEnemy => "lowest_hp_enemy",
            Self::HighestHpEnemy => "highest_hp_enemy",
            Self::AllEnemies => "all_enemies",
            Self::LowestHpAlly => "lowest_hp_ally",
            Self::AllAllies => "all_allies",
            Self::ThisCharacter => "this_character",
            Self::HighestAttackEnemy => "highest_attack_enemy",
            Self::HighestMagicEnemy => "highest_magic_enemy",
            Self::Cluster => "cluster",
            Self::RandomAllyOther => "random_ally_other",
            Self::MostInjuredAlly => "most_injured_ally",
            Self::Everyone => "everyone",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Context and selection
// =============================================================================

/// Read-only context handed to targeting behaviors.
///
/// The pool carries every character on both sides; behaviors filter it
/// through the team oracle (comparing team tags against the actor's) and
/// liveness before selecting.
#[derive(Debug)]
pub struct TargetingContext<'a> {
    /// The acting character.
    pub actor: &'a Character,
    /// Every character on both sides, roster order, player side first.
    pub pool: Vec<&'a Character>,
}

impl<'a> TargetingContext<'a> {
    /// Builds a context for the given actor, or `None` if the actor is not
    /// in the battle.
    #[must_use]
    pub fn new(battle: &'a BattleState, actor: CharacterId) -> Option<Self> {
        let actor = battle.character(actor)?;
        Some(Self {
            actor,
            pool: battle.all().collect(),
        })
    }

    /// Living members of the opposing team, roster order.
    #[must_use]
    pub fn living_enemies(&self) -> Vec<&'a Character> {
        self.pool
            .iter()
            .filter(|c| c.team() != self.actor.team() && c.is_alive())
            .copied()
            .collect()
    }

    /// Living members of the actor's team (self included), roster order.
    #[must_use]
    pub fn living_allies(&self) -> Vec<&'a Character> {
        self.pool
            .iter()
            .filter(|c| c.team() == self.actor.team() && c.is_alive())
            .copied()
            .collect()
    }

    /// Living allies excluding the actor.
    #[must_use]
    pub fn living_allies_other(&self) -> Vec<&'a Character> {
        self.living_allies()
            .into_iter()
            .filter(|c| c.id() != self.actor.id())
            .collect()
    }
}

/// The outcome of a targeting behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No valid target exists; the action cannot proceed as specified.
    None,
    /// One target.
    Single(CharacterId),
    /// Several targets, resolved independently during execution.
    Multi(Vec<CharacterId>),
}

impl Selection {
    /// The selected ids in order (empty for `None`).
    #[must_use]
    pub fn ids(&self) -> Vec<CharacterId> {
        match self {
            Self::None => Vec::new(),
            Self::Single(id) => vec![*id],
            Self::Multi(ids) => ids.clone(),
        }
    }

    /// Whether nothing was selected.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Signature shared by every targeting behavior.
pub type TargetingFn =
    fn(&TargetingContext<'_>, &mut ChaCha8Rng) -> Result<Selection, BehaviorError>;

// =============================================================================
// Selection helpers
// =============================================================================

fn pick_random<'a>(pool: &[&'a Character], rng: &mut ChaCha8Rng) -> Option<&'a Character> {
    if pool.is_empty() {
        None
    } else {
        Some(pool[rng.gen_range(0..pool.len())])
    }
}

/// Keeps the first extremum on ties, so roster order breaks them
/// deterministically.
fn extremal_by<'a, T: PartialOrd>(
    pool: &[&'a Character],
    key: impl Fn(&Character) -> T,
    want_max: bool,
) -> Option<&'a Character> {
    let mut best: Option<(&'a Character, T)> = None;
    for candidate in pool {
        let value = key(candidate);
        let replace = match &best {
            None => true,
            Some((_, best_value)) => {
                if want_max {
                    value > *best_value
                } else {
                    value < *best_value
                }
            }
        };
        if replace {
            best = Some((candidate, value));
        }
    }
    best.map(|(c, _)| c)
}

fn single(found: Option<&Character>) -> Selection {
    found.map_or(Selection::None, |c| Selection::Single(c.id()))
}

fn multi(pool: Vec<&Character>) -> Selection {
    if pool.is_empty() {
        Selection::None
    } else {
        Selection::Multi(pool.iter().map(|c| c.id()).collect())
    }
}

// =============================================================================
// Behaviors
// =============================================================================

fn random_enemy(
    ctx: &TargetingContext<'_>,
    rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    Ok(single(pick_random(&ctx.living_enemies(), rng)))
}

fn lowest_hp_enemy(
    ctx: &TargetingContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    Ok(single(extremal_by(
        &ctx.living_enemies(),
        Character::current_hp,
        false,
    )))
}

fn highest_hp_enemy(
    ctx: &TargetingContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    Ok(single(extremal_by(
        &ctx.living_enemies(),
        Character::current_hp,
        true,
    )))
}

fn all_enemies(
    ctx: &TargetingContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    Ok(multi(ctx.living_enemies()))
}

fn lowest_hp_ally(
    ctx: &TargetingContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    Ok(single(extremal_by(
        &ctx.living_allies(),
        Character::current_hp,
        false,
    )))
}

fn all_allies(
    ctx: &TargetingContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    Ok(multi(ctx.living_allies()))
}

fn this_character(
    ctx: &TargetingContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    if ctx.actor.is_alive() {
        Ok(Selection::Single(ctx.actor.id()))
    } else {
        Ok(Selection::None)
    }
}

fn highest_attack_enemy(
    ctx: &TargetingContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    Ok(single(extremal_by(
        &ctx.living_enemies(),
        |c| c.stats().attack,
        true,
    )))
}

fn highest_magic_enemy(
    ctx: &TargetingContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    Ok(single(extremal_by(
        &ctx.living_enemies(),
        |c| c.stats().magic,
        true,
    )))
}

fn cluster(ctx: &TargetingContext<'_>, rng: &mut ChaCha8Rng) -> Result<Selection, BehaviorError> {
    let enemies = ctx.living_enemies();
    let Some(primary) = pick_random(&enemies, rng) else {
        return Ok(Selection::None);
    };

    let mut ids = vec![primary.id()];
    let rest: Vec<&Character> = enemies
        .into_iter()
        .filter(|c| c.id() != primary.id())
        .collect();
    for extra in rest.choose_multiple(rng, CLUSTER_EXTRAS) {
        ids.push(extra.id());
    }
    Ok(Selection::Multi(ids))
}

fn random_ally_other(
    ctx: &TargetingContext<'_>,
    rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    Ok(single(pick_random(&ctx.living_allies_other(), rng)))
}

fn most_injured_ally(
    ctx: &TargetingContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    Ok(single(extremal_by(
        &ctx.living_allies(),
        Character::hp_fraction,
        false,
    )))
}

fn everyone(
    ctx: &TargetingContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<Selection, BehaviorError> {
    let living: Vec<&Character> = ctx.pool.iter().filter(|c| c.is_alive()).copied().collect();
    Ok(multi(living))
}

/// Installs every built-in targeting behavior; random-enemy is the default.
pub(crate) fn install(table: &mut BehaviorTable<TargetingBehavior, TargetingFn>) {
    table.register(TargetingBehavior::RandomEnemy, random_enemy, true);
    table.register(TargetingBehavior::LowestHpEnemy, lowest_hp_enemy, false);
    table.register(TargetingBehavior::HighestHpEnemy, highest_hp_enemy, false);
    table.register(TargetingBehavior::AllEnemies, all_enemies, false);
    table.register(TargetingBehavior::LowestHpAlly, lowest_hp_ally, false);
    table.register(TargetingBehavior::AllAllies, all_allies, false);
    table.register(TargetingBehavior::ThisCharacter, this_character, false);
    table.register(
        TargetingBehavior::HighestAttackEnemy,
        highest_attack_enemy,
        false,
    );
    table.register(
        TargetingBehavior::HighestMagicEnemy,
        highest_magic_enemy,
        false,
    );
    table.register(TargetingBehavior::Cluster, cluster, false);
    table.register(TargetingBehavior::RandomAllyOther, random_ally_other, false);
    table.register(TargetingBehavior::MostInjuredAlly, most_injured_ally, false);
    table.register(TargetingBehavior::Everyone, everyone, false);
}

// =============================================================================
// Tests
// =============================================================================
