//! Passive behaviors: trigger-driven effects attached to characters.
//!
//! Passives follow the read-only/emit split used across the engine: a
//! behavior inspects its [`PassiveContext`] and returns a
//! [`PassiveReaction`] carrying zero or more [`PassiveCommand`]s. The flow
//! controller applies the commands through its collaborators, which is where
//! second-order effects (a reflected hit triggering another passive) are
//! sequenced and depth-capped.
//!
//! Every behavior early-returns `PassiveReaction::skip()` when the trigger
//! is not one it handles or a required event field is absent. Calling a
//! passive with a trigger it ignores is always a no-op.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ability::{Ability, KillReward, PassiveData, PassiveTrigger};
use crate::battle::BattleState;
use crate::behavior::registry::BehaviorTable;
use crate::character::{status, Character, CharacterId, StatusId};
use crate::error::BehaviorError;

/// Deepest passive-originated damage chain that can still reflect.
pub const MAX_REFLECT_DEPTH: u8 = 2;
/// Incoming damage below this never produces a secondary reflection.
const SECONDARY_REFLECT_FLOOR: u32 = 5;
/// Fraction of incoming damage that reflects (as a divisor).
const REFLECT_DIVISOR: u32 = 5;
/// Health fraction below which protective instinct shields an ally.
const PROTECT_THRESHOLD: f64 = 0.4;
/// Most allies protective instinct shields per turn.
const PROTECT_MAX_ALLIES: usize = 2;

// =============================================================================
// Kinds
// =============================================================================

/// The closed set of passive behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassiveBehavior {
    /// Does nothing; the registered default.
    #[default]
    Inert,
    /// Applies regeneration to the owner at turn start.
    Regeneration,
    /// Reflects a fifth of incoming damage back at the attacker.
    DamageReflect,
    /// Chance to inflict a status on whoever damaged the owner.
    StatusWhenStruck,
    /// Chance to inflict a status on whoever the owner damaged.
    StatusOnStrike,
    /// Buffs every living ally at battle start.
    RallyingPresence,
    /// Self-buff on a qualifying trigger (critical hit dealt or kill).
    Momentum,
    /// Heals and hardens the owner the turn health crosses a threshold.
    LastStand,
    /// Shields the most wounded allies at turn start.
    ProtectiveInstinct,
    /// Strikes back at a living damage source.
    Counterattack,
    /// Chance to debuff a random enemy at turn start.
    Intimidate,
    /// Configurable reward when the owner scores a kill.
    OnKillEffect,
    /// Critical-chance buff gated on meaningful hits.
    CriticalFocus,
}

impl std::fmt::Display for PassiveBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Inert => "inert",
            Self::Regeneration => "regeneration",
            Self::DamageReflect => "damage_reflect",
            Self::StatusWhenStruck => "status_when_struck",
            Self::StatusOnStrike => "status_on_strike",
            Self::RallyingPresence => "rallying_presence",
            Self::Momentum => "momentum",
            Self::LastStand => "last_stand",
            Self::ProtectiveInstinct => "protective_instinct",
            Self::Counterattack => "counterattack",
            Self::Intimidate => "intimidate",
            Self::OnKillEffect => "on_kill_effect",
            Self::CriticalFocus => "critical_focus",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Trigger event
// =============================================================================

/// What happened to fire a trigger.
///
/// Fields are trigger-specific: damage and healing triggers fill the health
/// fields with the *affected* character's numbers; `other` is the opposite
/// party (the source for `DamageTaken`/`Healed`, the target for
/// `DamageDealt`/`HealingDone`, the victim for `Kill`). `depth` counts how
/// many passive-originated hops led here; direct action effects are depth
/// zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerEvent {
    /// The other party in the exchange, if any.
    pub other: Option<CharacterId>,
    /// Magnitude of the damage or healing.
    pub amount: u32,
    /// Whether the hit was critical.
    pub critical: bool,
    /// Affected character's health before the change.
    pub hp_before: u32,
    /// Affected character's health after the change.
    pub hp_after: u32,
    /// Affected character's maximum health.
    pub max_hp: u32,
    /// Passive-origination depth of this event.
    pub depth: u8,
}

impl TriggerEvent {
    /// An event with no exchange data (lifecycle triggers).
    #[must_use]
    pub fn lifecycle() -> Self {
        Self::default()
    }

    /// A damage or healing exchange event.
    #[must_use]
    pub fn exchange(
        other: CharacterId,
        amount: u32,
        critical: bool,
        hp_before: u32,
        hp_after: u32,
        max_hp: u32,
        depth: u8,
    ) -> Self {
        Self {
            other: Some(other),
            amount,
            critical,
            hp_before,
            hp_after,
            max_hp,
            depth,
        }
    }
}

// =============================================================================
// Context, reaction, commands
// =============================================================================

/// Read-only context handed to passive behaviors.
pub struct PassiveContext<'a> {
    /// The passive's owner.
    pub owner: &'a Character,
    /// The ability the passive is attached to.
    pub ability: &'a Ability,
    /// The passive's configuration blob.
    pub data: &'a PassiveData,
    /// The trigger being fired.
    pub trigger: PassiveTrigger,
    /// What happened.
    pub event: &'a TriggerEvent,
    /// The full battle state, for roster queries.
    pub battle: &'a BattleState,
}

/// A state change a passive wants applied.
///
/// Commands are applied by the engine through its collaborators; a passive
/// never mutates battle state itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassiveCommand {
    /// Deal damage from the passive's owner to a target.
    DealDamage {
        /// The target.
        target: CharacterId,
        /// Damage to deal.
        amount: u32,
    },
    /// Heal a target.
    Heal {
        /// The target.
        target: CharacterId,
        /// Healing to apply.
        amount: u32,
    },
    /// Apply a status to a target.
    ApplyStatus {
        /// The target.
        target: CharacterId,
        /// The status to apply.
        status: StatusId,
        /// Turns it lasts.
        duration: u8,
        /// Stacks to apply.
        stacks: u32,
    },
}

/// What a passive did in response to a trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassiveReaction {
    /// Whether the passive actually fired.
    pub executed: bool,
    /// Optional flavor message for the host's log.
    pub message: Option<String>,
    /// State changes to apply.
    pub commands: Vec<PassiveCommand>,
}

impl PassiveReaction {
    /// The trigger was not handled; nothing happened.
    #[must_use]
    pub fn skip() -> Self {
        Self::default()
    }

    /// The passive fired with the given commands and message.
    #[must_use]
    pub fn fired(message: impl Into<String>, commands: Vec<PassiveCommand>) -> Self {
        Self {
            executed: true,
            message: Some(message.into()),
            commands,
        }
    }
}

/// Signature shared by every passive behavior.
pub type PassiveFn =
    fn(&PassiveContext<'_>, &mut ChaCha8Rng) -> Result<PassiveReaction, BehaviorError>;

// =============================================================================
// Behaviors
// =============================================================================

fn inert(_ctx: &PassiveContext<'_>, _rng: &mut ChaCha8Rng) -> Result<PassiveReaction, BehaviorError> {
    Ok(PassiveReaction::skip())
}

fn regeneration(
    ctx: &PassiveContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    if ctx.trigger != PassiveTrigger::TurnStart {
        return Ok(PassiveReaction::skip());
    }
    let id = ctx.data.status_or(&status::REGENERATION);
    Ok(PassiveReaction::fired(
        format!("{}'s wounds begin to close", ctx.owner.name()),
        vec![PassiveCommand::ApplyStatus {
            target: ctx.owner.id(),
            status: id,
            duration: ctx.data.duration(),
            stacks: ctx.data.stacks(),
        }],
    ))
}

fn damage_reflect(
    ctx: &PassiveContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    if ctx.trigger != PassiveTrigger::DamageTaken {
        return Ok(PassiveReaction::skip());
    }
    let Some(source) = ctx.event.other else {
        return Ok(PassiveReaction::skip());
    };
    // Never bounce between allies, never past the depth cap, and never for
    // trickle damage on secondary bounces.
    let Some(attacker) = ctx.battle.character(source) else {
        return Ok(PassiveReaction::skip());
    };
    if attacker.team() == ctx.owner.team() || !attacker.is_alive() {
        return Ok(PassiveReaction::skip());
    }
    if ctx.event.depth >= MAX_REFLECT_DEPTH {
        return Ok(PassiveReaction::skip());
    }
    if ctx.event.depth >= 1 && ctx.event.amount < SECONDARY_REFLECT_FLOOR {
        return Ok(PassiveReaction::skip());
    }

    let amount = (ctx.event.amount / REFLECT_DIVISOR).max(1);
    Ok(PassiveReaction::fired(
        format!("{} reflects the blow", ctx.owner.name()),
        vec![PassiveCommand::DealDamage {
            target: source,
            amount,
        }],
    ))
}

fn status_when_struck(
    ctx: &PassiveContext<'_>,
    rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    if ctx.trigger != PassiveTrigger::DamageTaken {
        return Ok(PassiveReaction::skip());
    }
    let Some(source) = ctx.event.other else {
        return Ok(PassiveReaction::skip());
    };
    if ctx.battle.character(source).map_or(true, |c| !c.is_alive()) {
        return Ok(PassiveReaction::skip());
    }
    if !rng.gen_bool(ctx.data.chance_or(0.25)) {
        return Ok(PassiveReaction::skip());
    }

    let id = ctx.data.status_or(&status::POISON);
    Ok(PassiveReaction::fired(
        format!("{} lashes back with {}", ctx.owner.name(), id.display_name()),
        vec![PassiveCommand::ApplyStatus {
            target: source,
            status: id,
            duration: ctx.data.duration(),
            stacks: ctx.data.stacks(),
        }],
    ))
}

fn status_on_strike(
    ctx: &PassiveContext<'_>,
    rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    if ctx.trigger != PassiveTrigger::DamageDealt {
        return Ok(PassiveReaction::skip());
    }
    let Some(victim) = ctx.event.other else {
        return Ok(PassiveReaction::skip());
    };
    if ctx.battle.character(victim).map_or(true, |c| !c.is_alive()) {
        return Ok(PassiveReaction::skip());
    }
    if !rng.gen_bool(ctx.data.chance_or(0.2)) {
        return Ok(PassiveReaction::skip());
    }

    let id = ctx.data.status_or(&status::BURN);
    Ok(PassiveReaction::fired(
        format!("{}'s strike inflicts {}", ctx.owner.name(), id.display_name()),
        vec![PassiveCommand::ApplyStatus {
            target: victim,
            status: id,
            duration: ctx.data.duration(),
            stacks: ctx.data.stacks(),
        }],
    ))
}

fn rallying_presence(
    ctx: &PassiveContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    if ctx.trigger != PassiveTrigger::BattleStart {
        return Ok(PassiveReaction::skip());
    }
    let id = ctx.data.status_or(&status::DEFENSE_UP);
    let commands: Vec<PassiveCommand> = ctx
        .battle
        .living(ctx.owner.team())
        .map(|ally| PassiveCommand::ApplyStatus {
            target: ally.id(),
            status: id.clone(),
            duration: ctx.data.duration(),
            stacks: ctx.data.stacks(),
        })
        .collect();
    if commands.is_empty() {
        return Ok(PassiveReaction::skip());
    }
    Ok(PassiveReaction::fired(
        format!("{} rallies the team", ctx.owner.name()),
        commands,
    ))
}

fn momentum(
    ctx: &PassiveContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    let qualifying =
        ctx.data.triggers_or(&[PassiveTrigger::Kill, PassiveTrigger::DamageDealt]);
    if !qualifying.contains(&ctx.trigger) {
        return Ok(PassiveReaction::skip());
    }
    // Damage only builds momentum when it crits; a kill always does.
    if ctx.trigger == PassiveTrigger::DamageDealt && !ctx.event.critical {
        return Ok(PassiveReaction::skip());
    }

    let id = ctx.data.status_or(&status::ATTACK_UP);
    Ok(PassiveReaction::fired(
        format!("{} surges with momentum", ctx.owner.name()),
        vec![PassiveCommand::ApplyStatus {
            target: ctx.owner.id(),
            status: id,
            duration: ctx.data.duration(),
            stacks: ctx.data.stacks(),
        }],
    ))
}

fn last_stand(
    ctx: &PassiveContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    if ctx.trigger != PassiveTrigger::DamageTaken {
        return Ok(PassiveReaction::skip());
    }
    let threshold = threshold_hp(ctx.event.max_hp, ctx.data.threshold());
    // Fires only on the hit that crosses the threshold, and never once the
    // owner is already down.
    let crossed = ctx.event.hp_before > threshold
        && ctx.event.hp_after <= threshold
        && ctx.event.hp_after > 0;
    if !crossed {
        return Ok(PassiveReaction::skip());
    }

    let heal = percent_of(ctx.event.max_hp, ctx.data.percent_or(0.25)).max(1);
    Ok(PassiveReaction::fired(
        format!("{} makes a last stand", ctx.owner.name()),
        vec![
            PassiveCommand::Heal {
                target: ctx.owner.id(),
                amount: heal,
            },
            PassiveCommand::ApplyStatus {
                target: ctx.owner.id(),
                status: ctx.data.status_or(&status::DEFENSE_UP),
                duration: ctx.data.duration(),
                stacks: ctx.data.stacks(),
            },
        ],
    ))
}

fn protective_instinct(
    ctx: &PassiveContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    if ctx.trigger != PassiveTrigger::TurnStart {
        return Ok(PassiveReaction::skip());
    }
    let mut wounded: Vec<&Character> = ctx
        .battle
        .living(ctx.owner.team())
        .filter(|ally| ally.id() != ctx.owner.id() && ally.hp_fraction() < PROTECT_THRESHOLD)
        .collect();
    // Stable sort: equal health keeps roster order.
    wounded.sort_by_key(|ally| ally.current_hp());

    let commands: Vec<PassiveCommand> = wounded
        .into_iter()
        .take(PROTECT_MAX_ALLIES)
        .map(|ally| PassiveCommand::ApplyStatus {
            target: ally.id(),
            status: ctx.data.status_or(&status::SHIELD),
            duration: ctx.data.duration(),
            stacks: ctx.data.stacks(),
        })
        .collect();
    if commands.is_empty() {
        return Ok(PassiveReaction::skip());
    }
    Ok(PassiveReaction::fired(
        format!("{} shields the wounded", ctx.owner.name()),
        commands,
    ))
}

fn counterattack(
    ctx: &PassiveContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    if ctx.trigger != PassiveTrigger::DamageTaken {
        return Ok(PassiveReaction::skip());
    }
    // Counters answer direct action damage only; passive-originated hits
    // (reflections, other counters) would otherwise ping-pong forever.
    if ctx.event.depth > 0 {
        return Ok(PassiveReaction::skip());
    }
    let Some(source) = ctx.event.other else {
        return Ok(PassiveReaction::skip());
    };
    let Some(attacker) = ctx.battle.character(source) else {
        return Ok(PassiveReaction::skip());
    };
    if attacker.team() == ctx.owner.team() || !attacker.is_alive() {
        return Ok(PassiveReaction::skip());
    }

    let amount = percent_of(ctx.owner.stats().attack, ctx.data.percent_or(0.5)).max(1);
    Ok(PassiveReaction::fired(
        format!("{} counterattacks", ctx.owner.name()),
        vec![PassiveCommand::DealDamage {
            target: source,
            amount,
        }],
    ))
}

fn intimidate(
    ctx: &PassiveContext<'_>,
    rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    if ctx.trigger != PassiveTrigger::TurnStart {
        return Ok(PassiveReaction::skip());
    }
    if !rng.gen_bool(ctx.data.chance_or(0.25)) {
        return Ok(PassiveReaction::skip());
    }
    let enemies: Vec<&Character> = ctx
        .battle
        .living(ctx.owner.team().opposing())
        .collect();
    if enemies.is_empty() {
        return Ok(PassiveReaction::skip());
    }
    let victim = enemies[rng.gen_range(0..enemies.len())];

    let id = ctx.data.status_or(&status::ATTACK_DOWN);
    Ok(PassiveReaction::fired(
        format!("{} intimidates {}", ctx.owner.name(), victim.name()),
        vec![PassiveCommand::ApplyStatus {
            target: victim.id(),
            status: id,
            duration: ctx.data.duration(),
            stacks: ctx.data.stacks(),
        }],
    ))
}

fn on_kill_effect(
    ctx: &PassiveContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    if ctx.trigger != PassiveTrigger::Kill {
        return Ok(PassiveReaction::skip());
    }
    match ctx.data.effect_type.unwrap_or(KillReward::Unknown) {
        KillReward::Heal => {
            let amount = percent_of(ctx.owner.max_hp(), ctx.data.percent_or(0.15)).max(1);
            Ok(PassiveReaction::fired(
                format!("{} feeds on the kill", ctx.owner.name()),
                vec![PassiveCommand::Heal {
                    target: ctx.owner.id(),
                    amount,
                }],
            ))
        }
        KillReward::Buff => Ok(PassiveReaction::fired(
            format!("{} grows stronger", ctx.owner.name()),
            vec![PassiveCommand::ApplyStatus {
                target: ctx.owner.id(),
                status: ctx.data.status_or(&status::ATTACK_UP),
                duration: ctx.data.duration(),
                stacks: ctx.data.stacks(),
            }],
        )),
        KillReward::AoeDamage => {
            let Some(victim) = ctx.event.other else {
                return Ok(PassiveReaction::skip());
            };
            let Some(fallen) = ctx.battle.character(victim) else {
                return Ok(PassiveReaction::skip());
            };
            let amount = ctx
                .data
                .amount
                .unwrap_or_else(|| (ctx.owner.stats().attack / 2).max(1));
            let commands: Vec<PassiveCommand> = ctx
                .battle
                .living(fallen.team())
                .filter(|c| c.id() != victim)
                .map(|c| PassiveCommand::DealDamage {
                    target: c.id(),
                    amount,
                })
                .collect();
            if commands.is_empty() {
                return Ok(PassiveReaction::skip());
            }
            Ok(PassiveReaction::fired(
                format!("{}'s kill shakes the enemy line", ctx.owner.name()),
                commands,
            ))
        }
        KillReward::Unknown => Ok(PassiveReaction::skip()),
    }
}

fn critical_focus(
    ctx: &PassiveContext<'_>,
    _rng: &mut ChaCha8Rng,
) -> Result<PassiveReaction, BehaviorError> {
    let qualifying = ctx.data.triggers_or(&[PassiveTrigger::DamageDealt]);
    if !qualifying.contains(&ctx.trigger) {
        return Ok(PassiveReaction::skip());
    }
    // Damage-dealt procs only count meaningful hits, measured against the
    // target's maximum health.
    if ctx.trigger == PassiveTrigger::DamageDealt {
        let floor = percent_of(ctx.event.max_hp, ctx.data.min_damage_fraction());
        if ctx.event.amount < floor.max(1) {
            return Ok(PassiveReaction::skip());
        }
    }

    Ok(PassiveReaction::fired(
        format!("{} sharpens their focus", ctx.owner.name()),
        vec![PassiveCommand::ApplyStatus {
            target: ctx.owner.id(),
            status: ctx.data.status_or(&status::CRIT_UP),
            duration: ctx.data.duration(),
            stacks: ctx.data.stacks(),
        }],
    ))
}

fn threshold_hp(max_hp: u32, fraction: f64) -> u32 {
    percent_of(max_hp, fraction)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_of(value: u32, fraction: f64) -> u32 {
    (f64::from(value) * fraction).floor() as u32
}

/// Installs every built-in passive behavior; the inert no-op is the default.
pub(crate) fn install(table: &mut BehaviorTable<PassiveBehavior, PassiveFn>) {
    table.register(PassiveBehavior::Inert, inert, true);
    table.register(PassiveBehavior::Regeneration, regeneration, false);
    table.register(PassiveBehavior::DamageReflect, damage_reflect, false);
    table.register(PassiveBehavior::StatusWhenStruck, status_when_struck, false);
    table.register(PassiveBehavior::StatusOnStrike, status_on_strike, false);
    table.register(PassiveBehavior::RallyingPresence, rallying_presence, false);
    table.register(PassiveBehavior::Momentum, momentum, false);
    table.register(PassiveBehavior::LastStand, last_stand, false);
    table.register(
        PassiveBehavior::ProtectiveInstinct,
        protective_instinct,
        false,
    );
    table.register(PassiveBehavior::Counterattack, counterattack, false);
    table.register(PassiveBehavior::Intimidate, intimidate, false);
    table.register(PassiveBehavior::OnKillEffect, on_kill_effect, false);
    table.register(PassiveBehavior::CriticalFocus, critical_focus, false);
}

// =============================================================================
// Tests
// =============================================================================
