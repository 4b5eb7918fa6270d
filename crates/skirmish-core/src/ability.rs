//! Ability definitions and passive configuration.
//!
//! An [`Ability`] is static data: magnitude inputs, a damage type, a
//! declarative target type, cooldown, selection weight, an optional list of
//! structured [`EffectSpec`]s, and an optional [`PassiveSpec`] that attaches
//! a trigger-driven behavior to the owning character. The only mutable piece
//! of per-character ability state is the cooldown counter on
//! [`AbilitySlot`].
//!
//! Malformed configuration never aborts a battle: [`PassiveData`] accessors
//! substitute safe defaults (duration 3, stacks 1, chances clamped to
//! `[0, 1]`), and an unknown kill-reward kind deserializes to
//! [`KillReward::Unknown`], which the on-kill behavior treats as a no-op.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::character::StatusId;

/// Default status duration when a passive's configuration omits one.
pub const DEFAULT_STATUS_DURATION: u8 = 3;
/// Default status stack count when a passive's configuration omits one.
pub const DEFAULT_STATUS_STACKS: u32 = 1;

// =============================================================================
// Damage type
// =============================================================================

/// Classification of an ability's primary effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    /// Physical damage, scaling with attack.
    #[default]
    Physical,
    /// Elemental damage, scaling with magic.
    Elemental,
    /// Restores health.
    Healing,
    /// No direct magnitude; effects only.
    Utility,
}

impl DamageType {
    /// Whether this type restores health.
    #[must_use]
    pub const fn is_healing(self) -> bool {
        matches!(self, Self::Healing)
    }

    /// Whether this type deals damage.
    #[must_use]
    pub const fn is_offensive(self) -> bool {
        matches!(self, Self::Physical | Self::Elemental)
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physical => write!(f, "physical"),
            Self::Elemental => write!(f, "elemental"),
            Self::Healing => write!(f, "healing"),
            Self::Utility => write!(f, "utility"),
        }
    }
}

// =============================================================================
// Target type
// =============================================================================

/// Declarative targeting intent carried by an ability.
///
/// The behavior facade maps each variant to a concrete targeting behavior;
/// abilities never reference targeting functions directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// One enemy, chosen at random.
    #[default]
    Enemy,
    /// The enemy with the lowest current health.
    WeakestEnemy,
    /// The enemy with the highest current health.
    ToughestEnemy,
    /// Every living enemy.
    AllEnemies,
    /// The ally with the lowest current health (self included).
    WoundedAlly,
    /// Every living ally.
    AllAllies,
    /// The acting character.
    User,
    /// The enemy with the highest attack stat.
    StrongestEnemy,
    /// The enemy with the highest magic stat.
    ArcaneThreat,
    /// A primary enemy plus up to two random extras.
    Cluster,
    /// One random living ally other than the actor.
    OtherAlly,
    /// The living ally missing the largest fraction of health.
    MostInjuredAlly,
    /// Every living character on both sides.
    Everyone,
}

// =============================================================================
// Stat kind
// =============================================================================

/// Named stat for buffs and debuffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Physical attack power.
    Attack,
    /// Damage mitigation.
    Defense,
    /// Turn-order priority.
    Speed,
    /// Secondary offensive stat.
    Magic,
}

impl StatKind {
    /// The status id representing a buff (`raise == true`) or debuff of
    /// this stat.
    #[must_use]
    pub fn status(self, raise: bool) -> StatusId {
        use crate::character::status;
        match (self, raise) {
            (Self::Attack, true) => status::ATTACK_UP,
            (Self::Attack, false) => status::ATTACK_DOWN,
            (Self::Defense, true) => status::DEFENSE_UP,
            (Self::Defense, false) => status::DEFENSE_DOWN,
            (Self::Speed, true) => status::SPEED_UP,
            (Self::Speed, false) => status::SPEED_DOWN,
            (Self::Magic, true) => status::MAGIC_UP,
            (Self::Magic, false) => status::MAGIC_DOWN,
        }
    }
}

// =============================================================================
// Effect descriptors
// =============================================================================

/// A structured effect carried by an ability.
///
/// When an ability has a non-empty effect list, the engine applies each
/// effect through the [`EffectHandler`](crate::contracts::EffectHandler)
/// collaborator and infers damage-dealt versus healing-done from the
/// target's health delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectSpec {
    /// Applies a status effect with the given chance.
    ApplyStatus {
        /// The status to apply.
        status: StatusId,
        /// Turns the status lasts.
        #[serde(default = "default_duration")]
        duration: u8,
        /// Stacks to apply.
        #[serde(default = "default_stacks")]
        stacks: u32,
        /// Application probability in `[0, 1]`.
        #[serde(default = "default_chance")]
        chance: f64,
    },
    /// Raises (positive amount) or lowers (negative amount) a stat.
    StatBuff {
        /// The stat to modify.
        stat: StatKind,
        /// Magnitude; the sign selects buff versus debuff.
        amount: i32,
        /// Turns the modifier lasts.
        #[serde(default = "default_duration")]
        duration: u8,
    },
    /// Deals a fixed amount of damage.
    Damage {
        /// Damage dealt.
        power: u32,
    },
    /// Restores a fixed amount of health.
    Heal {
        /// Health restored.
        power: u32,
    },
}

fn default_duration() -> u8 {
    DEFAULT_STATUS_DURATION
}

fn default_stacks() -> u32 {
    DEFAULT_STATUS_STACKS
}

fn default_chance() -> f64 {
    1.0
}

impl EffectSpec {
    /// Whether this effect grants a defensive status (used for the
    /// defense-prioritizing decision behavior).
    #[must_use]
    pub fn is_defensive(&self) -> bool {
        match self {
            Self::ApplyStatus { status, .. } => status.is_defensive(),
            Self::StatBuff { stat, amount, .. } => {
                matches!(stat, StatKind::Defense) && *amount > 0
            }
            Self::Heal { .. } => true,
            Self::Damage { .. } => false,
        }
    }
}

// =============================================================================
// Passive triggers
// =============================================================================

/// Lifecycle events that can fire passive behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassiveTrigger {
    /// The battle has begun.
    BattleStart,
    /// The battle has ended.
    BattleEnd,
    /// A new turn is starting.
    TurnStart,
    /// The current turn is ending.
    TurnEnd,
    /// The owner dealt damage.
    DamageDealt,
    /// The owner took damage.
    DamageTaken,
    /// The owner healed someone.
    HealingDone,
    /// The owner was healed.
    Healed,
    /// The owner defeated an enemy.
    Kill,
    /// The owner was defeated.
    Defeat,
    /// The owner was revived.
    Revive,
}

impl fmt::Display for PassiveTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BattleStart => "battle_start",
            Self::BattleEnd => "battle_end",
            Self::TurnStart => "turn_start",
            Self::TurnEnd => "turn_end",
            Self::DamageDealt => "damage_dealt",
            Self::DamageTaken => "damage_taken",
            Self::HealingDone => "healing_done",
            Self::Healed => "healed",
            Self::Kill => "kill",
            Self::Defeat => "defeat",
            Self::Revive => "revive",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Kill reward
// =============================================================================

/// What the configurable on-kill passive does when its owner scores a kill.
///
/// Deserializes leniently: any unrecognized string becomes
/// [`KillReward::Unknown`], which the behavior treats as a no-op rather than
/// failing the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillReward {
    /// Heal the owner for a percentage of max health.
    Heal,
    /// Apply a self-buff status.
    Buff,
    /// Damage the rest of the defeated character's team.
    AoeDamage,
    /// Unrecognized configuration; does nothing.
    Unknown,
}

impl KillReward {
    fn as_str(self) -> &'static str {
        match self {
            Self::Heal => "heal",
            Self::Buff => "buff",
            Self::AoeDamage => "aoe_damage",
            Self::Unknown => "unknown",
        }
    }
}

impl Serialize for KillReward {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for KillReward {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "heal" => Self::Heal,
            "buff" => Self::Buff,
            "aoe_damage" => Self::AoeDamage,
            _ => Self::Unknown,
        })
    }
}

// =============================================================================
// Passive configuration
// =============================================================================

/// Free-form configuration blob for passive behaviors.
///
/// Every field is optional; the accessor methods substitute safe defaults so
/// a sparsely configured passive still behaves sensibly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassiveData {
    /// Status the passive applies, where applicable.
    pub status_id: Option<StatusId>,
    /// Proc probability in `[0, 1]`.
    pub chance: Option<f64>,
    /// Duration of applied statuses.
    pub duration: Option<u8>,
    /// Stacks of applied statuses.
    pub stacks: Option<u32>,
    /// Health-fraction threshold (last stand).
    pub threshold: Option<f64>,
    /// Magnitude as a fraction (heals, counters).
    pub percent: Option<f64>,
    /// Flat magnitude override.
    pub amount: Option<u32>,
    /// What an on-kill passive does.
    pub effect_type: Option<KillReward>,
    /// Which triggers a multi-trigger passive responds to.
    pub triggers: Option<Vec<PassiveTrigger>>,
    /// Minimum damage as a fraction of the target's max health for
    /// damage-gated passives.
    pub min_damage_fraction: Option<f64>,
}

impl PassiveData {
    /// Configured status id, or the given fallback.
    #[must_use]
    pub fn status_or(&self, fallback: &StatusId) -> StatusId {
        self.status_id.clone().unwrap_or_else(|| fallback.clone())
    }

    /// Configured chance clamped to `[0, 1]`, or the given fallback.
    #[must_use]
    pub fn chance_or(&self, fallback: f64) -> f64 {
        self.chance.unwrap_or(fallback).clamp(0.0, 1.0)
    }

    /// Configured duration, or the engine default of 3 turns.
    #[must_use]
    pub fn duration(&self) -> u8 {
        self.duration.unwrap_or(DEFAULT_STATUS_DURATION)
    }

    /// Configured stacks floored at 1, or the engine default of 1.
    #[must_use]
    pub fn stacks(&self) -> u32 {
        self.stacks.unwrap_or(DEFAULT_STATUS_STACKS).max(1)
    }

    /// Configured health threshold clamped to `(0, 1]`, default 0.3.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(0.3).clamp(0.01, 1.0)
    }

    /// Configured magnitude fraction clamped to `[0, 1]`, or the fallback.
    #[must_use]
    pub fn percent_or(&self, fallback: f64) -> f64 {
        self.percent.unwrap_or(fallback).clamp(0.0, 1.0)
    }

    /// Minimum damage fraction gate, default 0.15.
    #[must_use]
    pub fn min_damage_fraction(&self) -> f64 {
        self.min_damage_fraction.unwrap_or(0.15).clamp(0.0, 1.0)
    }

    /// Triggers the passive responds to, or the given fallback list.
    #[must_use]
    pub fn triggers_or(&self, fallback: &[PassiveTrigger]) -> Vec<PassiveTrigger> {
        self.triggers.clone().unwrap_or_else(|| fallback.to_vec())
    }
}

/// Attaches a passive behavior (with its configuration) to an ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveSpec {
    /// Which built-in passive behavior runs.
    pub behavior: crate::behavior::passive::PassiveBehavior,
    /// Behavior-specific configuration.
    #[serde(default)]
    pub data: PassiveData,
}

// =============================================================================
// Ability
// =============================================================================

/// Static definition of an ability.
///
/// Read-only during resolution; the per-character cooldown counter lives on
/// [`AbilitySlot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    /// Display name.
    pub name: String,
    /// Magnitude input for the damage/healing calculators.
    #[serde(default)]
    pub power: u32,
    /// Effect classification.
    #[serde(default)]
    pub damage_type: DamageType,
    /// Declarative targeting intent.
    #[serde(default)]
    pub target_type: TargetType,
    /// Turns of cooldown after use.
    #[serde(default)]
    pub cooldown: u8,
    /// Weight for weighted-random selection.
    #[serde(default = "default_weight")]
    pub selection_weight: f64,
    /// Structured effects applied on hit.
    #[serde(default)]
    pub effects: Vec<EffectSpec>,
    /// Passive behavior attachment; passive abilities are never actively
    /// cast.
    #[serde(default)]
    pub passive: Option<PassiveSpec>,
}

fn default_weight() -> f64 {
    1.0
}

impl Ability {
    /// Creates a physical damage ability with default targeting and weight.
    #[must_use]
    pub fn new(name: &str, power: u32) -> Self {
        Self {
            name: name.to_string(),
            power,
            damage_type: DamageType::Physical,
            target_type: TargetType::default(),
            cooldown: 0,
            selection_weight: 1.0,
            effects: Vec::new(),
            passive: None,
        }
    }

    /// Sets the damage type.
    #[must_use]
    pub fn with_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    /// Sets the target type.
    #[must_use]
    pub fn with_target(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }

    /// Sets the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: u8) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets the selection weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.selection_weight = weight;
        self
    }

    /// Adds a structured effect.
    #[must_use]
    pub fn with_effect(mut self, effect: EffectSpec) -> Self {
        self.effects.push(effect);
        self
    }

    /// Attaches a passive behavior.
    #[must_use]
    pub fn with_passive(
        mut self,
        behavior: crate::behavior::passive::PassiveBehavior,
        data: PassiveData,
    ) -> Self {
        self.passive = Some(PassiveSpec { behavior, data });
        self
    }

    /// Whether this ability restores health.
    #[must_use]
    pub fn is_healing(&self) -> bool {
        self.damage_type.is_healing()
    }

    /// Whether this ability counts as defensive for the defense-prioritizing
    /// decision behavior: healing or utility by type, or any defensive
    /// effect in its list.
    #[must_use]
    pub fn is_defensive(&self) -> bool {
        matches!(self.damage_type, DamageType::Healing | DamageType::Utility)
            || self.effects.iter().any(EffectSpec::is_defensive)
    }
}

/// An ability plus its per-character cooldown counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilitySlot {
    /// The ability definition.
    pub ability: Ability,
    /// Turns until the ability is ready again. Zero means ready.
    #[serde(default)]
    pub current_cooldown: u8,
}

impl AbilitySlot {
    /// Wraps an ability with a zeroed cooldown.
    #[must_use]
    pub fn new(ability: Ability) -> Self {
        Self {
            ability,
            current_cooldown: 0,
        }
    }

    /// Whether the ability can be used this turn.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.current_cooldown == 0
    }

    /// Starts the cooldown after the ability is used.
    pub fn put_on_cooldown(&mut self) {
        self.current_cooldown = self.ability.cooldown;
    }

    /// Decrements the cooldown by one, flooring at zero.
    pub fn tick_cooldown(&mut self) {
        self.current_cooldown = self.current_cooldown.saturating_sub(1);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::status;

    mod damage_type_tests {
        use super::*;

        #[test]
        fn classification() {
            assert!(DamageType::Healing.is_healing());
            assert!(!DamageType::Physical.is_healing());
            assert!(DamageType::Physical.is_offensive());
            assert!(DamageType::Elemental.is_offensive());
            assert!(!DamageType::Utility.is_offensive());
        }

        #[test]
        fn serde_uses_snake_case() {
            assert_eq!(serde_json::to_string(&DamageType::Elemental).unwrap(), r#""elemental""#);
        }
    }

    mod effect_spec_tests {
        use super::*;

        #[test]
        fn defensive_detection() {
            let shield = EffectSpec::ApplyStatus {
                status: status::SHIELD,
                duration: 2,
                stacks: 1,
                chance: 1.0,
            };
            assert!(shield.is_defensive());

            let poison = EffectSpec::ApplyStatus {
                status: status::POISON,
                duration: 2,
                stacks: 1,
                chance: 1.0,
            };
            assert!(!poison.is_defensive());

            assert!(EffectSpec::StatBuff {
                stat: StatKind::Defense,
                amount: 2,
                duration: 3
            }
            .is_defensive());
            assert!(!EffectSpec::StatBuff {
                stat: StatKind::Defense,
                amount: -2,
                duration: 3
            }
            .is_defensive());
            assert!(EffectSpec::Heal { power: 5 }.is_defensive());
            assert!(!EffectSpec::Damage { power: 5 }.is_defensive());
        }

        #[test]
        fn deserializes_with_defaults() {
            let effect: EffectSpec = serde_json::from_str(
                r#"{"kind": "apply_status", "status": "status_burn"}"#,
            )
            .unwrap();
            match effect {
                EffectSpec::ApplyStatus {
                    duration,
                    stacks,
                    chance,
                    ..
                } => {
                    assert_eq!(duration, DEFAULT_STATUS_DURATION);
                    assert_eq!(stacks, DEFAULT_STATUS_STACKS);
                    assert!((chance - 1.0).abs() < 1e-9);
                }
                other => panic!("expected ApplyStatus, got {other:?}"),
            }
        }
    }

    mod kill_reward_tests {
        use super::*;

        #[test]
        fn known_values_roundtrip() {
            for reward in [KillReward::Heal, KillReward::Buff, KillReward::AoeDamage] {
                let json = serde_json::to_string(&reward).unwrap();
                let back: KillReward = serde_json::from_str(&json).unwrap();
                assert_eq!(reward, back);
            }
        }

        #[test]
        fn unknown_value_is_lenient() {
            let reward: KillReward = serde_json::from_str(r#""summon_dragon""#).unwrap();
            assert_eq!(reward, KillReward::Unknown);
        }
    }

    mod passive_data_tests {
        use super::*;

        #[test]
        fn defaults_are_safe() {
            let data = PassiveData::default();
            assert_eq!(data.duration(), 3);
            assert_eq!(data.stacks(), 1);
            assert!((data.threshold() - 0.3).abs() < 1e-9);
            assert!((data.min_damage_fraction() - 0.15).abs() < 1e-9);
        }

        #[test]
        fn chance_is_clamped() {
            let data = PassiveData {
                chance: Some(4.0),
                ..PassiveData::default()
            };
            assert!((data.chance_or(0.5) - 1.0).abs() < 1e-9);
        }

        #[test]
        fn zero_stacks_floored_to_one() {
            let data = PassiveData {
                stacks: Some(0),
                ..PassiveData::default()
            };
            assert_eq!(data.stacks(), 1);
        }

        #[test]
        fn status_fallback() {
            let data = PassiveData::default();
            assert_eq!(data.status_or(&status::ATTACK_UP), status::ATTACK_UP);

            let configured = PassiveData {
                status_id: Some(status::BURN),
                ..PassiveData::default()
            };
            assert_eq!(configured.status_or(&status::ATTACK_UP), status::BURN);
        }

        #[test]
        fn trigger_list_fallback() {
            let data = PassiveData::default();
            assert_eq!(
                data.triggers_or(&[PassiveTrigger::Kill]),
                vec![PassiveTrigger::Kill]
            );
        }
    }

    mod ability_tests {
        use super::*;

        #[test]
        fn builder_sets_fields() {
            let ability = Ability::new("Fireball", 12)
                .with_type(DamageType::Elemental)
                .with_target(TargetType::AllEnemies)
                .with_cooldown(2)
                .with_weight(1.5);
            assert_eq!(ability.name, "Fireball");
            assert_eq!(ability.power, 12);
            assert_eq!(ability.damage_type, DamageType::Elemental);
            assert_eq!(ability.target_type, TargetType::AllEnemies);
            assert_eq!(ability.cooldown, 2);
            assert!((ability.selection_weight - 1.5).abs() < 1e-9);
        }

        #[test]
        fn defensive_classification() {
            let heal = Ability::new("Mend", 8).with_type(DamageType::Healing);
            assert!(heal.is_defensive());

            let guarded = Ability::new("Bulwark", 0).with_effect(EffectSpec::ApplyStatus {
                status: status::SHIELD,
                duration: 2,
                stacks: 1,
                chance: 1.0,
            });
            assert!(guarded.is_defensive());

            let strike = Ability::new("Strike", 6);
            assert!(!strike.is_defensive());
        }

        #[test]
        fn deserializes_with_defaults() {
            let ability: Ability = serde_json::from_str(r#"{"name": "Jab"}"#).unwrap();
            assert_eq!(ability.power, 0);
            assert_eq!(ability.damage_type, DamageType::Physical);
            assert_eq!(ability.target_type, TargetType::Enemy);
            assert!((ability.selection_weight - 1.0).abs() < 1e-9);
            assert!(ability.passive.is_none());
        }
    }

    mod ability_slot_tests {
        use super::*;

        #[test]
        fn cooldown_cycle() {
            let mut slot = AbilitySlot::new(Ability::new("Nova", 9).with_cooldown(2));
            assert!(slot.is_ready());

            slot.put_on_cooldown();
            assert!(!slot.is_ready());
            assert_eq!(slot.current_cooldown, 2);

            slot.tick_cooldown();
            slot.tick_cooldown();
            assert!(slot.is_ready());

            // Floors at zero
            slot.tick_cooldown();
            assert_eq!(slot.current_cooldown, 0);
        }
    }
}
