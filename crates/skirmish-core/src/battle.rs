//! Battle state: rosters, the turn counter, and the action queue.
//!
//! [`BattleState`] is the container the flow controller owns exclusively.
//! Behaviors and passives read it freely through shared references; all
//! mutation happens in the engine so the health and defeat invariants are
//! enforced in one place.
//!
//! Roster order is stable: characters keep their insertion position for the
//! whole battle, which is what makes equal-speed turn ordering deterministic.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::character::{Character, CharacterDef, CharacterId, Stats, Team};

// =============================================================================
// Action
// =============================================================================

/// A pre-computed hit (or heal) against one target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingHit {
    /// Magnitude computed by the damage/healing collaborator at queue time.
    pub amount: u32,
    /// Whether the calculator rolled a critical hit.
    pub critical: bool,
    /// Human-readable scaling descriptor ("scales with ATK", ...).
    pub text: String,
}

impl PendingHit {
    /// A zero-magnitude hit (utility actions, missing collaborators).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// One resolved actor/target/ability tuple scheduled for execution.
///
/// Actions are ephemeral: built during turn generation, consumed during
/// execution, never persisted across turns. `targets` and `amounts` are
/// parallel vectors; multi-target actions set `fan_out`.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// The acting character.
    pub actor: CharacterId,
    /// The actor's team at queue time.
    pub team: Team,
    /// Index into the actor's ability slots, or `None` for a basic attack.
    pub ability_slot: Option<usize>,
    /// Ability display name, `None` for a basic attack.
    pub ability_name: Option<String>,
    /// Resolved targets.
    pub targets: Vec<CharacterId>,
    /// Pre-computed per-target magnitudes, parallel to `targets`.
    pub amounts: Vec<PendingHit>,
    /// Whether this action fans out over multiple targets.
    pub fan_out: bool,
    /// Whether this action restores health instead of dealing damage.
    pub healing: bool,
}

// =============================================================================
// Battle state
// =============================================================================

/// The exclusive, mutable state of one battle.
#[derive(Debug, Clone, Default)]
pub struct BattleState {
    player: Vec<Character>,
    opponent: Vec<Character>,
    turn: u32,
    active: bool,
    paused: bool,
    queue: VecDeque<Action>,
}

impl BattleState {
    /// Builds battle state from roster definitions.
    ///
    /// Characters receive battle-scoped ids in roster order, player side
    /// first. The definitions are copied field-by-field; the caller's data
    /// is never aliased.
    #[must_use]
    pub fn new(player: &[CharacterDef], opponent: &[CharacterDef]) -> Self {
        let player: Vec<Character> = player
            .iter()
            .enumerate()
            .map(|(i, def)| Character::from_def(CharacterId::new(i as u64), def, Team::Player))
            .collect();
        let offset = player.len() as u64;
        let opponent = opponent
            .iter()
            .enumerate()
            .map(|(i, def)| {
                Character::from_def(CharacterId::new(offset + i as u64), def, Team::Opponent)
            })
            .collect();
        Self {
            player,
            opponent,
            turn: 0,
            active: true,
            paused: false,
            queue: VecDeque::new(),
        }
    }

    /// An inert state used before any battle has started.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Returns the roster for a team.
    #[must_use]
    pub fn roster(&self, team: Team) -> &[Character] {
        match team {
            Team::Player => &self.player,
            Team::Opponent => &self.opponent,
        }
    }

    /// Returns the mutable roster for a team.
    pub fn roster_mut(&mut self, team: Team) -> &mut [Character] {
        match team {
            Team::Player => &mut self.player,
            Team::Opponent => &mut self.opponent,
        }
    }

    /// Looks up a character by id on either side.
    #[must_use]
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.all().find(|c| c.id() == id)
    }

    /// Looks up a character mutably by id on either side.
    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.player
            .iter_mut()
            .chain(self.opponent.iter_mut())
            .find(|c| c.id() == id)
    }

    /// Iterates every character on both sides, player roster first.
    pub fn all(&self) -> impl Iterator<Item = &Character> {
        self.player.iter().chain(self.opponent.iter())
    }

    /// Iterates every character mutably, player roster first.
    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Character> {
        self.player.iter_mut().chain(self.opponent.iter_mut())
    }

    /// Iterates the living members of one team in roster order.
    pub fn living(&self, team: Team) -> impl Iterator<Item = &Character> {
        self.roster(team).iter().filter(|c| c.is_alive())
    }

    /// Ids of the living members of one team in roster order.
    #[must_use]
    pub fn living_ids(&self, team: Team) -> Vec<CharacterId> {
        self.living(team).map(Character::id).collect()
    }

    /// Ids of every living character, player roster first.
    #[must_use]
    pub fn living_ids_both(&self) -> Vec<CharacterId> {
        self.all().filter(|c| c.is_alive()).map(Character::id).collect()
    }

    /// Whether every member of a team is defeated.
    #[must_use]
    pub fn side_defeated(&self, team: Team) -> bool {
        self.roster(team)
            .iter()
            .all(|c| c.is_defeated() || c.current_hp() == 0)
    }

    /// The current turn number (0 before the first turn).
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Increments the turn counter at the start of a turn cycle.
    pub fn advance_turn(&mut self) {
        self.turn += 1;
    }

    /// Whether the battle is still running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Marks the battle finished.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the battle is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Sets the paused flag.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Replaces the action queue with a freshly generated turn.
    pub fn set_queue(&mut self, actions: Vec<Action>) {
        self.queue = actions.into();
    }

    /// Pops the next queued action.
    pub fn pop_action(&mut self) -> Option<Action> {
        self.queue.pop_front()
    }

    /// Peeks at the next queued action.
    #[must_use]
    pub fn peek_action(&self) -> Option<&Action> {
        self.queue.front()
    }

    /// Number of actions left in the queue.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Checks the health/defeat invariants for every character.
    ///
    /// Used by debug assertions and tests; always true if mutation went
    /// through [`Character::apply_damage`] / [`Character::apply_healing`].
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        self.all().all(|c| {
            c.current_hp() <= c.stats().hp && (c.is_defeated() == (c.current_hp() == 0))
        })
    }
}

// =============================================================================
// Placeholder roster
// =============================================================================

/// The built-in roster substituted when a side is empty at battle start.
#[must_use]
pub fn placeholder_roster() -> Vec<CharacterDef> {
    vec![
        CharacterDef::new("Training Dummy", Stats::new(40, 4, 2, 3)),
        CharacterDef::new("Training Dummy", Stats::new(40, 4, 2, 3)),
    ]
}

/// Serializable roster pair for host data loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPair {
    /// The player-side roster.
    pub player: Vec<CharacterDef>,
    /// The opponent-side roster.
    pub opponent: Vec<CharacterDef>,
}

// =============================================================================
// Tests
// =============================================================================
