//! Collaborator contracts consumed by the flow controller.
//!
//! Magnitude calculation, status bookkeeping, and structured-effect
//! processing are external concerns: the engine consumes them through the
//! narrow traits here and fails the *specific operation* — never the battle
//! — when one is missing.
//!
//! Baseline implementations ship alongside the traits so the engine runs
//! out of the box: [`StandardDamageModel`], [`StandardHealingModel`],
//! [`StatusLedger`], and [`StandardEffectHandler`]. Hosts with richer rules
//! (type charts, buff-aware mitigation) replace them via the engine's
//! `set_*` methods.

use std::collections::HashMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::ability::{Ability, DamageType, EffectSpec};
use crate::character::{Character, CharacterId, StatusId};

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a damage magnitude calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageOutcome {
    /// Damage to deal before health clamping.
    pub amount: u32,
    /// Whether the calculator rolled a critical hit.
    pub critical: bool,
    /// The damage classification.
    pub damage_type: DamageType,
    /// Human-readable scaling descriptor.
    pub scaling: String,
}

/// Result of a healing magnitude calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct HealOutcome {
    /// Healing to apply before health clamping.
    pub amount: u32,
    /// Human-readable scaling descriptor.
    pub scaling: String,
}

/// A status effect tracked by a [`StatusManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStatus {
    /// The status id.
    pub id: StatusId,
    /// Turns remaining.
    pub duration: u8,
    /// Current stacks.
    pub stacks: u32,
}

/// Health pulses and expirations produced by a turn-start status tick.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusPulse {
    /// The status dealt damage this turn.
    Damage {
        /// The responsible status.
        status: StatusId,
        /// Damage dealt.
        amount: u32,
    },
    /// The status healed this turn.
    Heal {
        /// The responsible status.
        status: StatusId,
        /// Healing applied.
        amount: u32,
    },
    /// The status ran out and was removed.
    Expired {
        /// The expired status.
        status: StatusId,
    },
}

/// What a structured effect did, for event reporting.
///
/// Health changes are not reported here; the engine infers them from the
/// target's health delta.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectOutcome {
    /// A status was applied.
    StatusApplied {
        /// The status applied.
        status: StatusId,
        /// Turns it lasts.
        duration: u8,
        /// Stacks applied.
        stacks: u32,
    },
    /// A chance-gated status failed its roll.
    StatusResisted {
        /// The status that was resisted.
        status: StatusId,
    },
}

// =============================================================================
// Contracts
// =============================================================================

/// Computes damage magnitudes.
pub trait DamageModel {
    /// Calculates the damage of one hit. `ability` is `None` for a basic
    /// attack.
    fn calculate(
        &self,
        attacker: &Character,
        target: &Character,
        ability: Option<&Ability>,
        rng: &mut ChaCha8Rng,
    ) -> DamageOutcome;
}

/// Computes healing magnitudes.
pub trait HealingModel {
    /// Calculates the healing of one application.
    fn calculate(
        &self,
        healer: &Character,
        target: &Character,
        ability: &Ability,
        rng: &mut ChaCha8Rng,
    ) -> HealOutcome;
}

/// Tracks status effects per character and ticks them at turn start.
pub trait StatusManager {
    /// Applies (or refreshes) a status on a character.
    fn apply(&mut self, target: CharacterId, status: StatusId, duration: u8, stacks: u32);

    /// Advances a character's statuses by one turn, returning health pulses
    /// and expirations for the engine to apply and report.
    fn tick(&mut self, target: CharacterId) -> Vec<StatusPulse>;

    /// Removes every status from a character (defeat).
    fn clear(&mut self, target: CharacterId);

    /// Drops all state (new battle).
    fn reset(&mut self);

    /// The statuses currently on a character.
    fn active(&self, target: CharacterId) -> &[ActiveStatus];
}

/// Applies one structured [`EffectSpec`] from an ability's effect list.
pub trait EffectHandler {
    /// Processes an effect against a target, routing status application
    /// through the given manager. Health changes go through the target's
    /// own apply methods; the engine infers them from the health delta.
    fn process(
        &self,
        effect: &EffectSpec,
        actor: CharacterId,
        target: &mut Character,
        status: &mut dyn StatusManager,
        rng: &mut ChaCha8Rng,
    ) -> Vec<EffectOutcome>;
}

// =============================================================================
// Standard damage model
// =============================================================================

/// Baseline damage formula: stat + ability power, minus half the target's
/// defense, floored at 1, with a flat critical chance.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardDamageModel {
    /// Probability of a critical hit, in `[0, 1]`.
    pub crit_chance: f64,
    /// Damage multiplier on a critical hit.
    pub crit_multiplier: f64,
}

impl Default for StandardDamageModel {
    fn default() -> Self {
        Self {
            crit_chance: 0.1,
            crit_multiplier: 1.5,
        }
    }
}

impl DamageModel for StandardDamageModel {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn calculate(
        &self,
        attacker: &Character,
        target: &Character,
        ability: Option<&Ability>,
        rng: &mut ChaCha8Rng,
    ) -> DamageOutcome {
        let damage_type = ability.map_or(DamageType::Physical, |a| a.damage_type);
        let (base, scaling) = match damage_type {
            DamageType::Elemental => (
                attacker.stats().magic + ability.map_or(0, |a| a.power),
                "scales with MAG",
            ),
            _ => (
                attacker.stats().attack + ability.map_or(0, |a| a.power),
                "scales with ATK",
            ),
        };
        let mitigated = base.saturating_sub(target.stats().defense / 2).max(1);

        let critical = rng.gen_bool(self.crit_chance.clamp(0.0, 1.0));
        let amount = if critical {
            (f64::from(mitigated) * self.crit_multiplier).round() as u32
        } else {
            mitigated
        };

        DamageOutcome {
            amount,
            critical,
            damage_type,
            scaling: scaling.to_string(),
        }
    }
}

// =============================================================================
// Standard healing model
// =============================================================================

/// Baseline healing formula: ability power plus half the healer's magic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardHealingModel;

impl HealingModel for StandardHealingModel {
    fn calculate(
        &self,
        healer: &Character,
        _target: &Character,
        ability: &Ability,
        _rng: &mut ChaCha8Rng,
    ) -> HealOutcome {
        HealOutcome {
            amount: ability.power + healer.stats().magic / 2,
            scaling: "scales with MAG".to_string(),
        }
    }
}

// =============================================================================
// Status ledger
// =============================================================================

/// Baseline status bookkeeping.
///
/// Tracks statuses per character, refreshes duration and accumulates stacks
/// on re-application, and ticks damage-over-time / heal-over-time statuses
/// each turn. Buffs and debuffs are tracked but not fed back into the
/// baseline damage formula; hosts wanting buff-aware magnitudes supply
/// their own [`DamageModel`].
#[derive(Debug, Clone, Default)]
pub struct StatusLedger {
    entries: HashMap<CharacterId, Vec<ActiveStatus>>,
}

/// Stack cap so repeated re-application cannot overflow.
const MAX_STACKS: u32 = 99;

impl StatusLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pulse_for(status: &ActiveStatus) -> Option<StatusPulse> {
        let id = status.id.as_str();
        if id.contains("poison") {
            Some(StatusPulse::Damage {
                status: status.id.clone(),
                amount: 2 * status.stacks,
            })
        } else if id.contains("burn") {
            Some(StatusPulse::Damage {
                status: status.id.clone(),
                amount: 3 * status.stacks,
            })
        } else if id.contains("regen") {
            Some(StatusPulse::Heal {
                status: status.id.clone(),
                amount: 2 * status.stacks,
            })
        } else {
            None
        }
    }
}

impl StatusManager for StatusLedger {
    fn apply(&mut self, target: CharacterId, status: StatusId, duration: u8, stacks: u32) {
        let entries = self.entries.entry(target).or_default();
        if let Some(existing) = entries.iter_mut().find(|s| s.id == status) {
            existing.duration = existing.duration.max(duration);
            existing.stacks = existing.stacks.saturating_add(stacks).min(MAX_STACKS);
        } else {
            entries.push(ActiveStatus {
                id: status,
                duration,
                stacks,
            });
        }
    }

    fn tick(&mut self, target: CharacterId) -> Vec<StatusPulse> {
        let Some(entries) = self.entries.get_mut(&target) else {
            return Vec::new();
        };

        let mut pulses: Vec<StatusPulse> =
            entries.iter().filter_map(Self::pulse_for).collect();

        for status in entries.iter_mut() {
            status.duration = status.duration.saturating_sub(1);
        }
        for status in entries.iter().filter(|s| s.duration == 0) {
            pulses.push(StatusPulse::Expired {
                status: status.id.clone(),
            });
        }
        entries.retain(|s| s.duration > 0);
        if entries.is_empty() {
            self.entries.remove(&target);
        }

        pulses
    }

    fn clear(&mut self, target: CharacterId) {
        self.entries.remove(&target);
    }

    fn reset(&mut self) {
        self.entries.clear();
    }

    fn active(&self, target: CharacterId) -> &[ActiveStatus] {
        self.entries.get(&target).map_or(&[], Vec::as_slice)
    }
}

// =============================================================================
// Standard effect handler
// =============================================================================

/// Baseline structured-effect processing.
#[derive(Debug, Clone, Default)]
pub struct StandardEffectHandler;

impl EffectHandler for StandardEffectHandler {
    fn process(
        &self,
        effect: &EffectSpec,
        _actor: CharacterId,
        target: &mut Character,
        status: &mut dyn StatusManager,
        rng: &mut ChaCha8Rng,
    ) -> Vec<EffectOutcome> {
        match effect {
            EffectSpec::ApplyStatus {
                status: id,
                duration,
                stacks,
                chance,
            } => {
                if rng.gen_bool(chance.clamp(0.0, 1.0)) {
                    status.apply(target.id(), id.clone(), *duration, *stacks);
                    vec![EffectOutcome::StatusApplied {
                        status: id.clone(),
                        duration: *duration,
                        stacks: *stacks,
                    }]
                } else {
                    vec![EffectOutcome::StatusResisted { status: id.clone() }]
                }
            }
            EffectSpec::StatBuff {
                stat,
                amount,
                duration,
            } => {
                let id = stat.status(*amount > 0);
                let stacks = amount.unsigned_abs().max(1);
                status.apply(target.id(), id.clone(), *duration, stacks);
                vec![EffectOutcome::StatusApplied {
                    status: id,
                    duration: *duration,
                    stacks,
                }]
            }
            EffectSpec::Damage { power } => {
                target.apply_damage(*power);
                Vec::new()
            }
            EffectSpec::Heal { power } => {
                target.apply_healing(*power);
                Vec::new()
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::StatKind;
    use crate::character::{status, CharacterDef, Stats, Team};
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn fighter(attack: u32, defense: u32) -> Character {
        let def = CharacterDef::new("F", Stats::new(60, attack, defense, 5).with_magic(10));
        Character::from_def(CharacterId::new(0), &def, Team::Player)
    }

    // Traits must stay object-safe: the engine stores them boxed.
    #[test]
    fn contracts_are_object_safe() {
        fn _damage(_: Box<dyn DamageModel>) {}
        fn _healing(_: Box<dyn HealingModel>) {}
        fn _status(_: Box<dyn StatusManager>) {}
        fn _effects(_: Box<dyn EffectHandler>) {}
    }

    mod damage_model_tests {
        use super::*;

        #[test]
        fn basic_attack_scales_with_attack() {
            let model = StandardDamageModel {
                crit_chance: 0.0,
                crit_multiplier: 1.5,
            };
            let attacker = fighter(12, 0);
            let target = fighter(5, 6);
            let outcome = model.calculate(&attacker, &target, None, &mut rng());
            // 12 attack - 6/2 defense = 9
            assert_eq!(outcome.amount, 9);
            assert!(!outcome.critical);
            assert_eq!(outcome.damage_type, DamageType::Physical);
            assert_eq!(outcome.scaling, "scales with ATK");
        }

        #[test]
        fn elemental_scales_with_magic() {
            let model = StandardDamageModel {
                crit_chance: 0.0,
                crit_multiplier: 1.5,
            };
            let attacker = fighter(3, 0); // magic 10
            let target = fighter(5, 4);
            let ability = Ability::new("Spark", 6).with_type(DamageType::Elemental);
            let outcome = model.calculate(&attacker, &target, Some(&ability), &mut rng());
            // 10 magic + 6 power - 4/2 defense = 14
            assert_eq!(outcome.amount, 14);
            assert_eq!(outcome.scaling, "scales with MAG");
        }

        #[test]
        fn damage_floors_at_one() {
            let model = StandardDamageModel {
                crit_chance: 0.0,
                crit_multiplier: 1.5,
            };
            let attacker = fighter(1, 0);
            let target = fighter(5, 40);
            let outcome = model.calculate(&attacker, &target, None, &mut rng());
            assert_eq!(outcome.amount, 1);
        }

        #[test]
        fn guaranteed_crit_multiplies() {
            let model = StandardDamageModel {
                crit_chance: 1.0,
                crit_multiplier: 2.0,
            };
            let attacker = fighter(10, 0);
            let target = fighter(5, 0);
            let outcome = model.calculate(&attacker, &target, None, &mut rng());
            assert!(outcome.critical);
            assert_eq!(outcome.amount, 20);
        }
    }

    mod healing_model_tests {
        use super::*;

        #[test]
        fn heal_uses_power_plus_half_magic() {
            let model = StandardHealingModel;
            let healer = fighter(5, 0); // magic 10
            let target = fighter(5, 0);
            let ability = Ability::new("Mend", 8).with_type(DamageType::Healing);
            let outcome = model.calculate(&healer, &target, &ability, &mut rng());
            assert_eq!(outcome.amount, 13);
        }
    }

    mod status_ledger_tests {
        use super::*;

        #[test]
        fn apply_and_query() {
            let mut ledger = StatusLedger::new();
            let id = CharacterId::new(1);
            ledger.apply(id, status::POISON, 3, 1);

            let active = ledger.active(id);
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].id, status::POISON);
            assert!(ledger.active(CharacterId::new(9)).is_empty());
        }

        #[test]
        fn reapplication_refreshes_and_stacks() {
            let mut ledger = StatusLedger::new();
            let id = CharacterId::new(1);
            ledger.apply(id, status::POISON, 3, 1);
            ledger.apply(id, status::POISON, 1, 2);

            let active = ledger.active(id);
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].duration, 3); // refreshed to max
            assert_eq!(active[0].stacks, 3);
        }

        #[test]
        fn tick_produces_pulses_and_expiry() {
            let mut ledger = StatusLedger::new();
            let id = CharacterId::new(1);
            ledger.apply(id, status::POISON, 1, 2);
            ledger.apply(id, status::REGENERATION, 2, 1);

            let pulses = ledger.tick(id);
            assert!(pulses.contains(&StatusPulse::Damage {
                status: status::POISON,
                amount: 4
            }));
            assert!(pulses.contains(&StatusPulse::Heal {
                status: status::REGENERATION,
                amount: 2
            }));
            assert!(pulses.contains(&StatusPulse::Expired {
                status: status::POISON
            }));

            // Poison is gone, regeneration has one turn left
            assert_eq!(ledger.active(id).len(), 1);
            assert_eq!(ledger.active(id)[0].id, status::REGENERATION);
        }

        #[test]
        fn tick_without_statuses_is_empty() {
            let mut ledger = StatusLedger::new();
            assert!(ledger.tick(CharacterId::new(1)).is_empty());
        }

        #[test]
        fn clear_removes_everything_for_one_character() {
            let mut ledger = StatusLedger::new();
            ledger.apply(CharacterId::new(1), status::BURN, 3, 1);
            ledger.apply(CharacterId::new(2), status::BURN, 3, 1);
            ledger.clear(CharacterId::new(1));
            assert!(ledger.active(CharacterId::new(1)).is_empty());
            assert_eq!(ledger.active(CharacterId::new(2)).len(), 1);
        }

        #[test]
        fn stacks_are_capped() {
            let mut ledger = StatusLedger::new();
            let id = CharacterId::new(1);
            for _ in 0..200 {
                ledger.apply(id, status::POISON, 3, 5);
            }
            assert_eq!(ledger.active(id)[0].stacks, MAX_STACKS);
        }
    }

    mod effect_handler_tests {
        use super::*;

        #[test]
        fn guaranteed_status_applies() {
            let handler = StandardEffectHandler;
            let mut ledger = StatusLedger::new();
            let mut target = fighter(5, 0);
            let effect = EffectSpec::ApplyStatus {
                status: status::BURN,
                duration: 2,
                stacks: 1,
                chance: 1.0,
            };

            let outcomes = handler.process(
                &effect,
                CharacterId::new(9),
                &mut target,
                &mut ledger,
                &mut rng(),
            );
            assert_eq!(outcomes.len(), 1);
            assert!(matches!(outcomes[0], EffectOutcome::StatusApplied { .. }));
            assert_eq!(ledger.active(target.id()).len(), 1);
        }

        #[test]
        fn zero_chance_status_is_resisted() {
            let handler = StandardEffectHandler;
            let mut ledger = StatusLedger::new();
            let mut target = fighter(5, 0);
            let effect = EffectSpec::ApplyStatus {
                status: status::BURN,
                duration: 2,
                stacks: 1,
                chance: 0.0,
            };

            let outcomes = handler.process(
                &effect,
                CharacterId::new(9),
                &mut target,
                &mut ledger,
                &mut rng(),
            );
            assert!(matches!(outcomes[0], EffectOutcome::StatusResisted { .. }));
            assert!(ledger.active(target.id()).is_empty());
        }

        #[test]
        fn stat_buff_maps_to_status() {
            let handler = StandardEffectHandler;
            let mut ledger = StatusLedger::new();
            let mut target = fighter(5, 0);
            let effect = EffectSpec::StatBuff {
                stat: StatKind::Defense,
                amount: -3,
                duration: 2,
            };

            handler.process(
                &effect,
                CharacterId::new(9),
                &mut target,
                &mut ledger,
                &mut rng(),
            );
            let active = ledger.active(target.id());
            assert_eq!(active[0].id, status::DEFENSE_DOWN);
            assert_eq!(active[0].stacks, 3);
        }

        #[test]
        fn damage_effect_mutates_health_directly() {
            let handler = StandardEffectHandler;
            let mut ledger = StatusLedger::new();
            let mut target = fighter(5, 0);
            let before = target.current_hp();

            let outcomes = handler.process(
                &EffectSpec::Damage { power: 7 },
                CharacterId::new(9),
                &mut target,
                &mut ledger,
                &mut rng(),
            );
            assert!(outcomes.is_empty());
            assert_eq!(target.current_hp(), before - 7);
        }

        #[test]
        fn heal_effect_mutates_health_directly() {
            let handler = StandardEffectHandler;
            let mut ledger = StatusLedger::new();
            let mut target = fighter(5, 0);
            target.apply_damage(20);

            handler.process(
                &EffectSpec::Heal { power: 6 },
                CharacterId::new(9),
                &mut target,
                &mut ledger,
                &mut rng(),
            );
            assert_eq!(target.current_hp(), 46);
        }
    }
}
