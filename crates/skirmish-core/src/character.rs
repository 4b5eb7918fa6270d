//! Character types for the combat engine.
//!
//! This module provides:
//! - [`CharacterId`]: unique identifier for characters within a battle
//! - [`Team`]: side-of-battle tag used as the team-membership oracle
//! - [`Stats`]: base combat statistics
//! - [`StatusId`]: identifier for status effects tracked by the status manager
//! - [`Character`]: the mutable combat state of one roster member
//! - [`CharacterDef`]: plain-data roster input supplied by the host
//!
//! # Invariants
//!
//! `0 <= current_hp <= stats.hp` and `defeated == (current_hp == 0)` hold at
//! all times. Both are reconciled together inside [`Character::apply_damage`]
//! and [`Character::apply_healing`], which are the only mutation points for
//! health — behaviors and passives route all health changes through the
//! engine, and the engine routes them through these two methods.
//!
//! # Example
//!
//! ```
//! use skirmish_core::character::{Character, CharacterDef, CharacterId, Stats, Team};
//!
//! let def = CharacterDef::new("Brann", Stats::new(30, 8, 4, 6));
//! let mut brann = Character::from_def(CharacterId::new(0), &def, Team::Player);
//!
//! let hit = brann.apply_damage(12);
//! assert_eq!(hit.actual, 12);
//! assert!(!hit.killed);
//! assert_eq!(brann.current_hp(), 18);
//! ```

use std::borrow::Cow;
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::ability::{Ability, AbilitySlot, PassiveTrigger};
use crate::behavior::decision::DecisionBehavior;
use crate::behavior::targeting::TargetingBehavior;

/// Default per-character gate for considering abilities at all.
pub const DEFAULT_ABILITY_AFFINITY: f64 = 0.7;

// =============================================================================
// Character Id
// =============================================================================

/// Unique identifier for a character within one battle.
///
/// Ids are assigned once when the rosters are finalized at battle start and
/// stay stable for the battle's duration. Ordering follows assignment order
/// (player roster first, then opponent roster).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharacterId(u64);

impl CharacterId {
    /// Creates a new `CharacterId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharacterId({})", self.0)
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CharacterId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<CharacterId> for u64 {
    fn from(id: CharacterId) -> Self {
        id.0
    }
}

// =============================================================================
// Team
// =============================================================================

/// Side-of-battle tag.
///
/// Battle results are reported from the [`Team::Player`] perspective.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// The host player's roster.
    Player,
    /// The opposing roster.
    Opponent,
}

impl Team {
    /// Returns the other side.
    #[must_use]
    pub const fn opposing(self) -> Self {
        match self {
            Self::Player => Self::Opponent,
            Self::Opponent => Self::Player,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Opponent => write!(f, "opponent"),
        }
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Base combat statistics.
///
/// `hp` is the maximum health; the live value is
/// [`Character::current_hp`]. `magic` is the secondary offensive stat used
/// by elemental abilities and the arcane-threat targeting rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Maximum health.
    pub hp: u32,
    /// Physical attack power.
    pub attack: u32,
    /// Damage mitigation.
    pub defense: u32,
    /// Turn-order priority (higher acts first).
    pub speed: u32,
    /// Secondary (elemental) offensive stat.
    #[serde(default)]
    pub magic: u32,
}

impl Stats {
    /// Creates stats with zero magic.
    #[must_use]
    pub const fn new(hp: u32, attack: u32, defense: u32, speed: u32) -> Self {
        Self {
            hp,
            attack,
            defense,
            speed,
            magic: 0,
        }
    }

    /// Sets the secondary stat.
    #[must_use]
    pub const fn with_magic(mut self, magic: u32) -> Self {
        self.magic = magic;
        self
    }
}

// =============================================================================
// Status Id
// =============================================================================

/// Identifier for a status effect.
///
/// Status bookkeeping itself is a collaborator concern (see
/// [`StatusManager`](crate::contracts::StatusManager)); the engine only
/// passes ids around. The id vocabulary is open-ended, but the constants in
/// [`status`] cover everything the built-in behaviors apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusId(Cow<'static, str>);

impl StatusId {
    /// Creates a status id from a string.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(Cow::Owned(id.to_string()))
    }

    /// Creates a status id from a static string (const-friendly).
    #[must_use]
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable name: strips the `status_` prefix, replaces separators
    /// with spaces, and capitalizes each word.
    ///
    /// ```
    /// use skirmish_core::character::StatusId;
    ///
    /// let id = StatusId::new("status_attack_up");
    /// assert_eq!(id.display_name(), "Attack Up");
    /// ```
    #[must_use]
    pub fn display_name(&self) -> String {
        let stripped = self.0.strip_prefix("status_").unwrap_or(&self.0);
        stripped
            .split(['_', '-'])
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether this status counts as defensive for ability classification
    /// (shields, defense buffs, regeneration, evasion).
    #[must_use]
    pub fn is_defensive(&self) -> bool {
        ["defense", "shield", "regen", "evasion"]
            .iter()
            .any(|tag| self.0.contains(tag))
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StatusId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Status ids applied by the built-in passive behaviors and effect handler.
pub mod status {
    use super::StatusId;

    /// Heal-over-time.
    pub const REGENERATION: StatusId = StatusId::from_static("status_regeneration");
    /// Flat damage absorption.
    pub const SHIELD: StatusId = StatusId::from_static("status_shield");
    /// Defense raised.
    pub const DEFENSE_UP: StatusId = StatusId::from_static("status_defense_up");
    /// Defense lowered.
    pub const DEFENSE_DOWN: StatusId = StatusId::from_static("status_defense_down");
    /// Attack raised.
    pub const ATTACK_UP: StatusId = StatusId::from_static("status_attack_up");
    /// Attack lowered.
    pub const ATTACK_DOWN: StatusId = StatusId::from_static("status_attack_down");
    /// Speed raised.
    pub const SPEED_UP: StatusId = StatusId::from_static("status_speed_up");
    /// Speed lowered.
    pub const SPEED_DOWN: StatusId = StatusId::from_static("status_speed_down");
    /// Magic raised.
    pub const MAGIC_UP: StatusId = StatusId::from_static("status_magic_up");
    /// Magic lowered.
    pub const MAGIC_DOWN: StatusId = StatusId::from_static("status_magic_down");
    /// Critical-hit chance raised.
    pub const CRIT_UP: StatusId = StatusId::from_static("status_crit_up");
    /// Damage-over-time (toxic).
    pub const POISON: StatusId = StatusId::from_static("status_poison");
    /// Damage-over-time (fire).
    pub const BURN: StatusId = StatusId::from_static("status_burn");
}

// =============================================================================
// Per-turn trigger ledger
// =============================================================================

bitflags! {
    /// Once-per-cycle passive trigger flags, cleared at the start of every
    /// turn. Only lifecycle triggers are ledgered; reactive triggers
    /// (damage, healing, kills) may legitimately fire many times per turn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FiredTriggers: u8 {
        /// Battle-start passives ran for this character.
        const BATTLE_START = 1 << 0;
        /// Battle-end passives ran for this character.
        const BATTLE_END = 1 << 1;
        /// Turn-start passives ran this turn.
        const TURN_START = 1 << 2;
        /// Turn-end passives ran this turn.
        const TURN_END = 1 << 3;
    }
}

impl FiredTriggers {
    /// Returns the ledger flag for a trigger, or `None` if the trigger is
    /// not ledgered (reactive triggers fire freely).
    #[must_use]
    pub fn for_trigger(trigger: PassiveTrigger) -> Option<Self> {
        match trigger {
            PassiveTrigger::BattleStart => Some(Self::BATTLE_START),
            PassiveTrigger::BattleEnd => Some(Self::BATTLE_END),
            PassiveTrigger::TurnStart => Some(Self::TURN_START),
            PassiveTrigger::TurnEnd => Some(Self::TURN_END),
            _ => None,
        }
    }
}

// =============================================================================
// Applied damage/healing results
// =============================================================================

/// Result of applying damage to a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedDamage {
    /// Damage actually dealt after clamping to remaining health.
    pub actual: u32,
    /// Whether this hit reduced the character from alive to defeated.
    pub killed: bool,
}

/// Result of applying healing to a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedHealing {
    /// Healing actually applied after clamping to maximum health.
    pub actual: u32,
    /// Whether this healing brought the character back from defeat.
    pub revived: bool,
}

// =============================================================================
// Character
// =============================================================================

/// The mutable combat state of one roster member.
///
/// Created from a [`CharacterDef`] when a battle starts; the engine copies
/// only the fields it owns (no serialization round-trip). Health mutations go
/// through [`apply_damage`](Self::apply_damage) /
/// [`apply_healing`](Self::apply_healing) so the HP-bounds and defeat-flag
/// invariants are maintained in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    id: CharacterId,
    name: String,
    team: Team,
    stats: Stats,
    current_hp: u32,
    defeated: bool,
    abilities: Vec<AbilitySlot>,
    targeting: TargetingBehavior,
    decision: DecisionBehavior,
    ability_affinity: f64,
    #[serde(skip)]
    fired: FiredTriggers,
}

impl Character {
    /// Builds a battle-ready character from a roster definition.
    ///
    /// Copies the definition's fields into owned state: full health, no
    /// defeat flag, all ability cooldowns at zero.
    #[must_use]
    pub fn from_def(id: CharacterId, def: &CharacterDef, team: Team) -> Self {
        Self {
            id,
            name: def.name.clone(),
            team,
            stats: def.stats,
            current_hp: def.stats.hp,
            defeated: def.stats.hp == 0,
            abilities: def.abilities.iter().cloned().map(AbilitySlot::new).collect(),
            targeting: def.targeting,
            decision: def.decision,
            ability_affinity: def.ability_affinity.clamp(0.0, 1.0),
            fired: FiredTriggers::empty(),
        }
    }

    /// Returns the character's battle-scoped id.
    #[must_use]
    pub const fn id(&self) -> CharacterId {
        self.id
    }

    /// Returns the character's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the character's team tag.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Returns the base stats.
    #[must_use]
    pub const fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Returns the current health.
    #[must_use]
    pub const fn current_hp(&self) -> u32 {
        self.current_hp
    }

    /// Returns the maximum health.
    #[must_use]
    pub const fn max_hp(&self) -> u32 {
        self.stats.hp
    }

    /// Current health as a fraction of maximum (0.0 when max is zero).
    #[must_use]
    pub fn hp_fraction(&self) -> f64 {
        if self.stats.hp == 0 {
            0.0
        } else {
            f64::from(self.current_hp) / f64::from(self.stats.hp)
        }
    }

    /// Whether the character is still standing.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.defeated && self.current_hp > 0
    }

    /// Whether the character has been defeated.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Returns the character's ability slots.
    #[must_use]
    pub fn abilities(&self) -> &[AbilitySlot] {
        &self.abilities
    }

    /// Returns mutable ability slots (cooldown bookkeeping).
    pub fn abilities_mut(&mut self) -> &mut [AbilitySlot] {
        &mut self.abilities
    }

    /// Indices of active abilities that are off cooldown.
    ///
    /// Passive-only abilities are never offered for active use.
    #[must_use]
    pub fn ready_abilities(&self) -> Vec<usize> {
        self.abilities
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_ready() && slot.ability.passive.is_none())
            .map(|(index, _)| index)
            .collect()
    }

    /// Returns the ability in the given slot, if present.
    #[must_use]
    pub fn ability(&self, slot: usize) -> Option<&Ability> {
        self.abilities.get(slot).map(|s| &s.ability)
    }

    /// The targeting behavior used for basic attacks.
    #[must_use]
    pub const fn targeting(&self) -> TargetingBehavior {
        self.targeting
    }

    /// The action-decision behavior for this character.
    #[must_use]
    pub const fn decision(&self) -> DecisionBehavior {
        self.decision
    }

    /// Probability gate for considering abilities at all, in `[0, 1]`.
    #[must_use]
    pub const fn ability_affinity(&self) -> f64 {
        self.ability_affinity
    }

    /// Applies damage, clamping health at zero and reconciling the defeat
    /// flag in the same step.
    pub fn apply_damage(&mut self, amount: u32) -> AppliedDamage {
        let was_alive = self.is_alive();
        let actual = amount.min(self.current_hp);
        self.current_hp -= actual;
        if self.current_hp == 0 {
            self.defeated = true;
        }
        AppliedDamage {
            actual,
            killed: was_alive && self.defeated,
        }
    }

    /// Applies healing, clamping health at maximum. Healing a defeated
    /// character above zero health clears the defeat flag (revive).
    pub fn apply_healing(&mut self, amount: u32) -> AppliedHealing {
        let before = self.current_hp;
        self.current_hp = self.current_hp.saturating_add(amount).min(self.stats.hp);
        let actual = self.current_hp - before;
        let revived = self.defeated && self.current_hp > 0;
        if revived {
            self.defeated = false;
        }
        AppliedHealing { actual, revived }
    }

    /// Clears the per-turn trigger ledger. Called at the start of every turn.
    pub fn begin_turn(&mut self) {
        self.fired = FiredTriggers::empty();
    }

    /// Records that a ledgered trigger fired for this character.
    ///
    /// Returns `false` if the trigger already fired this cycle (the caller
    /// must not fire it again). Non-ledgered triggers always return `true`.
    pub fn mark_trigger_fired(&mut self, trigger: PassiveTrigger) -> bool {
        match FiredTriggers::for_trigger(trigger) {
            Some(flag) => {
                if self.fired.contains(flag) {
                    false
                } else {
                    self.fired.insert(flag);
                    true
                }
            }
            None => true,
        }
    }

    /// Decrements every ability cooldown by one, flooring at zero.
    pub fn tick_cooldowns(&mut self) {
        for slot in &mut self.abilities {
            slot.tick_cooldown();
        }
    }
}

// =============================================================================
// Character definition (host input)
// =============================================================================

/// Plain-data roster input supplied by the host.
///
/// The engine copies a `CharacterDef` into a [`Character`] when a battle
/// starts, so later mutation of the host's data never aliases battle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDef {
    /// Display name.
    pub name: String,
    /// Base stats.
    pub stats: Stats,
    /// Abilities, active and passive.
    #[serde(default)]
    pub abilities: Vec<Ability>,
    /// Targeting behavior for basic attacks.
    #[serde(default)]
    pub targeting: TargetingBehavior,
    /// Action-decision behavior.
    #[serde(default)]
    pub decision: DecisionBehavior,
    /// Probability gate for considering abilities (see
    /// [`DecisionBehavior::Weighted`]).
    #[serde(default = "default_affinity")]
    pub ability_affinity: f64,
}

fn default_affinity() -> f64 {
    DEFAULT_ABILITY_AFFINITY
}

impl CharacterDef {
    /// Creates a definition with no abilities and default behaviors.
    #[must_use]
    pub fn new(name: &str, stats: Stats) -> Self {
        Self {
            name: name.to_string(),
            stats,
            abilities: Vec::new(),
            targeting: TargetingBehavior::default(),
            decision: DecisionBehavior::default(),
            ability_affinity: DEFAULT_ABILITY_AFFINITY,
        }
    }

    /// Adds an ability.
    #[must_use]
    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    /// Sets the action-decision behavior.
    #[must_use]
    pub fn with_decision(mut self, decision: DecisionBehavior) -> Self {
        self.decision = decision;
        self
    }

    /// Sets the basic-attack targeting behavior.
    #[must_use]
    pub fn with_targeting(mut self, targeting: TargetingBehavior) -> Self {
        self.targeting = targeting;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_character() -> Character {
        let def = CharacterDef::new("Test", Stats::new(100, 10, 4, 5));
        Character::from_def(CharacterId::new(1), &def, Team::Player)
    }

    mod character_id_tests {
        use super::*;

        #[test]
        fn new_creates_id_with_value() {
            let id = CharacterId::new(42);
            assert_eq!(id.as_u64(), 42);
        }

        #[test]
        fn ordering() {
            let mut ids = vec![CharacterId::new(3), CharacterId::new(1), CharacterId::new(2)];
            ids.sort();
            assert_eq!(
                ids,
                vec![CharacterId::new(1), CharacterId::new(2), CharacterId::new(3)]
            );
        }

        #[test]
        fn debug_and_display_format() {
            let id = CharacterId::new(7);
            assert_eq!(format!("{:?}", id), "CharacterId(7)");
            assert_eq!(format!("{}", id), "7");
        }

        #[test]
        fn from_u64_roundtrip() {
            let id: CharacterId = 9u64.into();
            let raw: u64 = id.into();
            assert_eq!(raw, 9);
        }
    }

    mod team_tests {
        use super::*;

        #[test]
        fn opposing_flips_sides() {
            assert_eq!(Team::Player.opposing(), Team::Opponent);
            assert_eq!(Team::Opponent.opposing(), Team::Player);
        }

        #[test]
        fn display_format() {
            assert_eq!(format!("{}", Team::Player), "player");
            assert_eq!(format!("{}", Team::Opponent), "opponent");
        }
    }

    mod status_id_tests {
        use super::*;

        #[test]
        fn display_name_strips_prefix_and_capitalizes() {
            assert_eq!(StatusId::new("status_attack_up").display_name(), "Attack Up");
            assert_eq!(StatusId::new("status_poison").display_name(), "Poison");
        }

        #[test]
        fn display_name_handles_dashes_and_missing_prefix() {
            assert_eq!(StatusId::new("frost-bite").display_name(), "Frost Bite");
            assert_eq!(StatusId::new("haste").display_name(), "Haste");
        }

        #[test]
        fn defensive_classification() {
            assert!(status::SHIELD.is_defensive());
            assert!(status::DEFENSE_UP.is_defensive());
            assert!(status::REGENERATION.is_defensive());
            assert!(!status::POISON.is_defensive());
            assert!(!status::ATTACK_UP.is_defensive());
        }

        #[test]
        fn static_and_owned_equality() {
            assert_eq!(StatusId::from_static("status_burn"), StatusId::new("status_burn"));
        }

        #[test]
        fn serialization_roundtrip() {
            let id = status::REGENERATION;
            let json = serde_json::to_string(&id).unwrap();
            let back: StatusId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, back);
        }
    }

    mod trigger_ledger_tests {
        use super::*;

        #[test]
        fn lifecycle_triggers_are_ledgered() {
            assert!(FiredTriggers::for_trigger(PassiveTrigger::TurnStart).is_some());
            assert!(FiredTriggers::for_trigger(PassiveTrigger::BattleStart).is_some());
        }

        #[test]
        fn reactive_triggers_are_not_ledgered() {
            assert!(FiredTriggers::for_trigger(PassiveTrigger::DamageTaken).is_none());
            assert!(FiredTriggers::for_trigger(PassiveTrigger::Kill).is_none());
        }

        #[test]
        fn mark_fires_once_per_cycle() {
            let mut character = sample_character();
            assert!(character.mark_trigger_fired(PassiveTrigger::TurnStart));
            assert!(!character.mark_trigger_fired(PassiveTrigger::TurnStart));

            character.begin_turn();
            assert!(character.mark_trigger_fired(PassiveTrigger::TurnStart));
        }

        #[test]
        fn reactive_triggers_always_pass() {
            let mut character = sample_character();
            assert!(character.mark_trigger_fired(PassiveTrigger::DamageTaken));
            assert!(character.mark_trigger_fired(PassiveTrigger::DamageTaken));
        }
    }

    mod health_tests {
        use super::*;

        #[test]
        fn damage_reduces_hp() {
            let mut character = sample_character();
            let hit = character.apply_damage(30);
            assert_eq!(hit.actual, 30);
            assert!(!hit.killed);
            assert_eq!(character.current_hp(), 70);
            assert!(character.is_alive());
        }

        #[test]
        fn overkill_clamps_to_zero_and_defeats() {
            let mut character = sample_character();
            let hit = character.apply_damage(150);
            assert_eq!(hit.actual, 100);
            assert!(hit.killed);
            assert_eq!(character.current_hp(), 0);
            assert!(character.is_defeated());
            assert!(!character.is_alive());
        }

        #[test]
        fn killing_an_already_defeated_character_is_not_a_kill() {
            let mut character = sample_character();
            character.apply_damage(200);
            let second = character.apply_damage(10);
            assert_eq!(second.actual, 0);
            assert!(!second.killed);
        }

        #[test]
        fn exact_lethal_damage_defeats() {
            let mut character = sample_character();
            let hit = character.apply_damage(100);
            assert!(hit.killed);
            assert!(character.is_defeated());
        }

        #[test]
        fn healing_caps_at_max() {
            let mut character = sample_character();
            character.apply_damage(10);
            let heal = character.apply_healing(50);
            assert_eq!(heal.actual, 10);
            assert!(!heal.revived);
            assert_eq!(character.current_hp(), 100);
        }

        #[test]
        fn healing_from_zero_revives() {
            let mut character = sample_character();
            character.apply_damage(200);
            assert!(character.is_defeated());

            let heal = character.apply_healing(25);
            assert_eq!(heal.actual, 25);
            assert!(heal.revived);
            assert!(character.is_alive());
            assert!(!character.is_defeated());
        }

        #[test]
        fn zero_healing_does_not_revive() {
            let mut character = sample_character();
            character.apply_damage(200);
            let heal = character.apply_healing(0);
            assert!(!heal.revived);
            assert!(character.is_defeated());
        }

        #[test]
        fn hp_fraction() {
            let mut character = sample_character();
            character.apply_damage(75);
            assert!((character.hp_fraction() - 0.25).abs() < 1e-9);
        }
    }

    mod def_tests {
        use super::*;
        use crate::ability::Ability;

        #[test]
        fn from_def_starts_at_full_health() {
            let character = sample_character();
            assert_eq!(character.current_hp(), character.max_hp());
            assert!(!character.is_defeated());
        }

        #[test]
        fn affinity_is_clamped() {
            let mut def = CharacterDef::new("X", Stats::new(10, 1, 1, 1));
            def.ability_affinity = 3.0;
            let character = Character::from_def(CharacterId::new(0), &def, Team::Player);
            assert!((character.ability_affinity() - 1.0).abs() < 1e-9);
        }

        #[test]
        fn def_deserializes_with_defaults() {
            let def: CharacterDef = serde_json::from_str(
                r#"{"name": "Wisp", "stats": {"hp": 20, "attack": 3, "defense": 1, "speed": 9}}"#,
            )
            .unwrap();
            assert_eq!(def.name, "Wisp");
            assert_eq!(def.stats.magic, 0);
            assert!(def.abilities.is_empty());
            assert!((def.ability_affinity - DEFAULT_ABILITY_AFFINITY).abs() < 1e-9);
        }

        #[test]
        fn ready_abilities_skip_cooldowns_and_passives() {
            let active = Ability::new("Strike", 5);
            let mut cooling = Ability::new("Nova", 9);
            cooling.cooldown = 2;
            let def = CharacterDef::new("Mage", Stats::new(30, 5, 2, 4))
                .with_ability(active)
                .with_ability(cooling);
            let mut character = Character::from_def(CharacterId::new(0), &def, Team::Player);

            assert_eq!(character.ready_abilities(), vec![0, 1]);
            character.abilities_mut()[1].put_on_cooldown();
            assert_eq!(character.ready_abilities(), vec![0]);

            character.tick_cooldowns();
            character.tick_cooldowns();
            assert_eq!(character.ready_abilities(), vec![0, 1]);
        }
    }
}
