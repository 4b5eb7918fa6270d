//! Factories shared by the crate-level test suites.

use crate::ability::{Ability, DamageType, PassiveData, TargetType};
use crate::behavior::decision::DecisionBehavior;
use crate::behavior::passive::PassiveBehavior;
use crate::character::{CharacterDef, Stats};
use crate::config::EngineConfig;
use crate::engine::BattleEngine;
use crate::event::BattleEvent;

/// An engine with a fixed seed so suites reproduce exactly.
pub fn seeded_engine(seed: u64) -> BattleEngine {
    BattleEngine::new(EngineConfig::with_seed(seed))
}

/// A plain melee fighter with no abilities.
pub fn fighter(name: &str, hp: u32, attack: u32, defense: u32, speed: u32) -> CharacterDef {
    CharacterDef::new(name, Stats::new(hp, attack, defense, speed))
}

/// A fighter that always opens with its strongest ability.
pub fn caster(name: &str, hp: u32, speed: u32, ability: Ability) -> CharacterDef {
    CharacterDef::new(name, Stats::new(hp, 6, 2, speed).with_magic(8))
        .with_ability(ability)
        .with_decision(DecisionBehavior::AlwaysAbility)
}

/// A single-target healing ability.
pub fn heal_ability(power: u32) -> Ability {
    Ability::new("Mend", power)
        .with_type(DamageType::Healing)
        .with_target(TargetType::WoundedAlly)
}

/// A fighter carrying one passive behavior.
pub fn passive_fighter(
    name: &str,
    hp: u32,
    attack: u32,
    speed: u32,
    behavior: PassiveBehavior,
    data: PassiveData,
) -> CharacterDef {
    let passive = Ability::new("Gift", 0).with_passive(behavior, data);
    fighter(name, hp, attack, 2, speed).with_ability(passive)
}

/// Drives one full turn through the manual stepping API. Returns `false`
/// when the battle ended mid-turn.
pub fn run_one_turn(engine: &mut BattleEngine) -> bool {
    use crate::engine::BattlePhase;

    if engine.phase() == BattlePhase::AwaitingNextTurn && engine.start_next_turn().is_err() {
        return false;
    }
    while engine.phase() == BattlePhase::TurnInProgress {
        if engine.execute_next_action().is_err() {
            return false;
        }
    }
    engine.is_active()
}

/// Collects every damage event from a drained event list.
pub fn damage_events(events: &[BattleEvent]) -> Vec<&BattleEvent> {
    events
        .iter()
        .filter(|e| matches!(e, BattleEvent::CharacterDamaged { .. }))
        .collect()
}
