//! Battle flow controller: the turn/action state machine.
//!
//! [`BattleEngine`] owns the battle state, the behavior facade, the pacing
//! scheduler, the RNG, and the collaborator handles, and sequences:
//!
//! ```text
//! NotStarted --start_battle--> TurnInProgress <--> AwaitingNextTurn --> Ended
//! ```
//!
//! Each turn: clear per-turn trigger flags, fire turn-start passives, tick
//! statuses, rebuild the action queue (descending actor speed, stable for
//! ties), then drain the queue one action per pacing step. Executing an
//! action handles died-since-queued actors (skip), dead single targets
//! (retarget or skip), multi-target fan-out, passive trigger cascades with
//! reflection-depth bookkeeping, and battle-end detection.
//!
//! Nothing here can throw past the turn loop: behavior failures stop at the
//! registry boundary, missing collaborators fail only the specific
//! operation, and a dead target is ordinary control flow. The host drives
//! pacing with [`BattleEngine::tick`] or steps manually with
//! [`BattleEngine::start_next_turn`] / [`BattleEngine::execute_next_action`].

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};

use crate::ability::{Ability, DamageType, EffectSpec, PassiveTrigger};
use crate::battle::{placeholder_roster, Action, BattleState, PendingHit};
use crate::behavior::facade::BehaviorFacade;
use crate::behavior::passive::{PassiveCommand, PassiveContext, PassiveReaction, TriggerEvent};
use crate::behavior::targeting::Selection;
use crate::character::{
    AppliedDamage, AppliedHealing, CharacterDef, CharacterId, StatusId, Team,
};
use crate::config::EngineConfig;
use crate::contracts::{
    DamageModel, EffectHandler, EffectOutcome, HealingModel, StandardDamageModel,
    StandardEffectHandler, StandardHealingModel, StatusLedger, StatusManager, StatusPulse,
};
use crate::error::EngineError;
use crate::event::{BattleEvent, BattleResult, LogCategory};
use crate::scheduler::{BattleSpeed, Continuation, Scheduler};

// =============================================================================
// Battle phase
// =============================================================================

/// Where the flow controller is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattlePhase {
    /// No battle has been started.
    NotStarted,
    /// A turn's action queue is being drained.
    TurnInProgress,
    /// Between turns, waiting for the next turn to start.
    AwaitingNextTurn,
    /// The battle has finished.
    Ended,
}

// =============================================================================
// Battle engine
// =============================================================================

/// The combat-resolution engine.
///
/// # Example
///
/// ```
/// use skirmish_core::character::{CharacterDef, Stats};
/// use skirmish_core::config::EngineConfig;
/// use skirmish_core::engine::BattleEngine;
///
/// let mut engine = BattleEngine::new(EngineConfig::with_seed(42));
/// let player = vec![CharacterDef::new("Hero", Stats::new(60, 9, 3, 6))];
/// let opponent = vec![CharacterDef::new("Bandit", Stats::new(45, 7, 2, 4))];
///
/// engine.start_battle(&player, &opponent).unwrap();
/// let result = engine.run_to_completion();
/// assert!(result.is_some());
/// ```
pub struct BattleEngine {
    config: EngineConfig,
    state: BattleState,
    phase: BattlePhase,
    facade: BehaviorFacade,
    scheduler: Scheduler,
    rng: ChaCha8Rng,
    events: Vec<BattleEvent>,
    result: Option<BattleResult>,
    damage_model: Option<Box<dyn DamageModel>>,
    healing_model: Option<Box<dyn HealingModel>>,
    status_manager: Option<Box<dyn StatusManager>>,
    effect_handler: Option<Box<dyn EffectHandler>>,
}

impl fmt::Debug for BattleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleEngine")
            .field("phase", &self.phase)
            .field("turn", &self.state.turn())
            .field("active", &self.state.is_active())
            .field("paused", &self.state.is_paused())
            .field("queued_actions", &self.state.queue_len())
            .field("buffered_events", &self.events.len())
            .finish()
    }
}

impl Default for BattleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl BattleEngine {
    /// Creates an engine with the standard collaborators and every built-in
    /// behavior installed.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            state: BattleState::idle(),
            phase: BattlePhase::NotStarted,
            facade: BehaviorFacade::default(),
            scheduler: Scheduler::new(),
            rng,
            events: Vec::new(),
            result: None,
            damage_model: Some(Box::new(StandardDamageModel::default())),
            healing_model: Some(Box::new(StandardHealingModel)),
            status_manager: Some(Box::new(StatusLedger::new())),
            effect_handler: Some(Box::new(StandardEffectHandler)),
        }
    }

    // -------------------------------------------------------------------------
    // Collaborator wiring
    // -------------------------------------------------------------------------

    /// Replaces (or with `None`, removes) the damage calculator.
    pub fn set_damage_model(&mut self, model: Option<Box<dyn DamageModel>>) {
        self.damage_model = model;
    }

    /// Replaces (or with `None`, removes) the healing processor.
    pub fn set_healing_model(&mut self, model: Option<Box<dyn HealingModel>>) {
        self.healing_model = model;
    }

    /// Replaces (or with `None`, removes) the status-effect manager.
    pub fn set_status_manager(&mut self, manager: Option<Box<dyn StatusManager>>) {
        self.status_manager = manager;
    }

    /// Replaces (or with `None`, removes) the structured-effect processor.
    pub fn set_effect_handler(&mut self, handler: Option<Box<dyn EffectHandler>>) {
        self.effect_handler = handler;
    }

    /// The behavior dispatch surface.
    #[must_use]
    pub fn facade(&self) -> &BehaviorFacade {
        &self.facade
    }

    /// The mutable behavior dispatch surface, for registering custom
    /// behaviors.
    pub fn facade_mut(&mut self) -> &mut BehaviorFacade {
        &mut self.facade
    }

    // -------------------------------------------------------------------------
    // Inbound host API
    // -------------------------------------------------------------------------

    /// Starts a battle from roster definitions.
    ///
    /// Inputs are copied into engine-owned state. An empty side is replaced
    /// with the built-in placeholder roster. Battle-start passives fire for
    /// every living character, then the first turn begins immediately.
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadyStarted`] if a battle is currently running.
    pub fn start_battle(
        &mut self,
        player: &[CharacterDef],
        opponent: &[CharacterDef],
    ) -> Result<(), EngineError> {
        if self.state.is_active() {
            return Err(EngineError::AlreadyStarted);
        }

        let player_side = if player.is_empty() {
            warn!("player roster is empty, substituting the placeholder roster");
            placeholder_roster()
        } else {
            player.to_vec()
        };
        let opponent_side = if opponent.is_empty() {
            warn!("opponent roster is empty, substituting the placeholder roster");
            placeholder_roster()
        } else {
            opponent.to_vec()
        };

        self.state = BattleState::new(&player_side, &opponent_side);
        self.phase = BattlePhase::AwaitingNextTurn;
        self.result = None;
        self.events.clear();
        self.scheduler.cancel();
        if let Some(manager) = self.status_manager.as_deref_mut() {
            manager.reset();
        }

        info!(
            player = player_side.len(),
            opponent = opponent_side.len(),
            "battle started"
        );
        self.log(
            LogCategory::Info,
            format!(
                "Battle started: {} vs {}",
                player_side.len(),
                opponent_side.len()
            ),
        );

        for id in self.state.living_ids_both() {
            self.fire_triggers(id, PassiveTrigger::BattleStart, &TriggerEvent::lifecycle());
        }
        if let Some(result) = self.check_battle_end() {
            self.end_battle(result);
            return Ok(());
        }
        self.start_next_turn()
    }

    /// Begins the next turn cycle.
    ///
    /// Increments the turn counter, clears per-turn trigger flags, fires
    /// turn-start passives, ticks statuses, rebuilds the action queue
    /// (descending speed, stable ties), announces the turn, and schedules
    /// the first action.
    ///
    /// # Errors
    ///
    /// A guarded no-op returning [`EngineError::Inactive`],
    /// [`EngineError::Paused`], or [`EngineError::TurnInProgress`] when the
    /// battle is in the wrong state.
    pub fn start_next_turn(&mut self) -> Result<(), EngineError> {
        if !self.state.is_active() {
            return Err(EngineError::Inactive);
        }
        if self.state.is_paused() {
            return Err(EngineError::Paused);
        }
        if self.phase == BattlePhase::TurnInProgress {
            return Err(EngineError::TurnInProgress);
        }

        self.state.advance_turn();
        self.phase = BattlePhase::TurnInProgress;
        let turn = self.state.turn();
        debug!(turn, "starting turn");

        for character in self.state.all_mut() {
            character.begin_turn();
        }

        for id in self.state.living_ids_both() {
            self.fire_triggers(id, PassiveTrigger::TurnStart, &TriggerEvent::lifecycle());
        }

        self.process_status_effects();

        if let Some(result) = self.check_battle_end() {
            self.end_battle(result);
            return Ok(());
        }

        self.generate_actions();
        let first_actor = self.state.peek_action().map(|action| action.actor);
        self.emit(BattleEvent::TurnStarted { turn, first_actor });
        self.log(LogCategory::Info, format!("Turn {turn} begins"));
        self.scheduler
            .schedule(Continuation::ExecuteAction, self.config.action_delay_ms);
        Ok(())
    }

    /// Executes the next queued action; finishes the turn when the queue is
    /// empty.
    ///
    /// Actors that died after being queued are skipped. A dead single
    /// target of a non-healing action is replaced with a random living
    /// opposing target (the effect is recomputed) or, if none remain, the
    /// action is skipped.
    ///
    /// # Errors
    ///
    /// A guarded no-op returning [`EngineError::Inactive`],
    /// [`EngineError::Paused`], or [`EngineError::NoTurnInProgress`] when
    /// the battle is in the wrong state.
    pub fn execute_next_action(&mut self) -> Result<(), EngineError> {
        if !self.state.is_active() {
            return Err(EngineError::Inactive);
        }
        if self.state.is_paused() {
            return Err(EngineError::Paused);
        }
        if self.phase != BattlePhase::TurnInProgress {
            return Err(EngineError::NoTurnInProgress);
        }

        loop {
            let Some(mut action) = self.state.pop_action() else {
                self.finish_turn();
                return Ok(());
            };

            // The actor died after being queued.
            if self
                .state
                .character(action.actor)
                .map_or(true, |c| !c.is_alive())
            {
                continue;
            }

            // Dead single target: damage retargets, healing proceeds (it
            // may revive).
            if !action.fan_out && !action.healing {
                let target_dead = action.targets.first().map_or(true, |t| {
                    self.state.character(*t).map_or(true, |c| !c.is_alive())
                });
                if target_dead {
                    let pool = self.state.living_ids(action.team.opposing());
                    if pool.is_empty() {
                        continue;
                    }
                    let replacement = pool[self.rng.gen_range(0..pool.len())];
                    debug!(actor = %action.actor, target = %replacement, "retargeting dead target");
                    action.targets = vec![replacement];
                    action.amounts =
                        vec![self.compute_hit(action.actor, replacement, action.ability_slot)];
                }
            }

            let name = action
                .ability_name
                .clone()
                .unwrap_or_else(|| "Attack".to_string());
            self.emit(BattleEvent::CharacterAction {
                actor: action.actor,
                name,
                is_ability: action.ability_slot.is_some(),
                targets: action.targets.clone(),
            });
            if let Some(slot) = action.ability_slot {
                if let Some(actor) = self.state.character_mut(action.actor) {
                    if let Some(held) = actor.abilities_mut().get_mut(slot) {
                        held.put_on_cooldown();
                    }
                }
            }

            self.apply_action_effect(&action);

            if let Some(result) = self.check_battle_end() {
                self.end_battle(result);
            } else {
                self.scheduler
                    .schedule(Continuation::ExecuteAction, self.config.action_delay_ms);
            }
            return Ok(());
        }
    }

    /// Advances pacing by `elapsed_ms`, running at most one scheduled step.
    pub fn tick(&mut self, elapsed_ms: u64) {
        if !self.state.is_active() || self.state.is_paused() {
            return;
        }
        if let Some(continuation) = self.scheduler.advance(elapsed_ms) {
            let step = match continuation {
                Continuation::StartTurn => self.start_next_turn(),
                Continuation::ExecuteAction => self.execute_next_action(),
            };
            if let Err(err) = step {
                debug!(%err, "scheduled step skipped");
            }
        }
    }

    /// Pauses the battle, parking the pending continuation. Queue state is
    /// untouched.
    pub fn pause_battle(&mut self) {
        if !self.state.is_active() || self.state.is_paused() {
            return;
        }
        self.state.set_paused(true);
        self.scheduler.park();
        self.log(LogCategory::Info, "Battle paused".to_string());
    }

    /// Resumes a paused battle from exactly where it left off.
    pub fn resume_battle(&mut self) {
        if !self.state.is_active() || !self.state.is_paused() {
            return;
        }
        self.state.set_paused(false);
        let next = self.scheduler.take_parked().or(match self.phase {
            BattlePhase::AwaitingNextTurn => Some(Continuation::StartTurn),
            BattlePhase::TurnInProgress => Some(Continuation::ExecuteAction),
            _ => None,
        });
        if let Some(continuation) = next {
            let delay = match continuation {
                Continuation::StartTurn => self.config.turn_delay_ms,
                Continuation::ExecuteAction => self.config.action_delay_ms,
            };
            self.scheduler.schedule(continuation, delay);
        }
        self.log(LogCategory::Info, "Battle resumed".to_string());
    }

    /// Toggles pause; returns the new paused state.
    pub fn toggle_pause(&mut self) -> bool {
        if self.state.is_paused() {
            self.resume_battle();
        } else {
            self.pause_battle();
        }
        self.state.is_paused()
    }

    /// Sets the playback speed from a host-supplied multiplier.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidSpeed`] for anything but 1, 2, or 3.
    pub fn set_speed(&mut self, multiplier: u8) -> Result<(), EngineError> {
        let speed = BattleSpeed::from_multiplier(multiplier)?;
        self.scheduler.set_speed(speed);
        Ok(())
    }

    /// Drives the state machine synchronously until the battle ends,
    /// bypassing pacing. Returns the result, or `None` if no battle was
    /// running.
    pub fn run_to_completion(&mut self) -> Option<BattleResult> {
        let mut steps: u64 = 0;
        let limit = u64::from(self.config.max_turns)
            .saturating_mul(256)
            .saturating_add(1024);
        while self.state.is_active() && !self.state.is_paused() {
            steps += 1;
            if steps > limit {
                error!("run_to_completion exceeded its step limit");
                break;
            }
            let step = match self.phase {
                BattlePhase::AwaitingNextTurn => self.start_next_turn(),
                BattlePhase::TurnInProgress => self.execute_next_action(),
                _ => break,
            };
            if step.is_err() {
                break;
            }
        }
        self.scheduler.cancel();
        self.result
    }

    /// Takes every buffered event, oldest first.
    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The battle state (read-only).
    #[must_use]
    pub fn state(&self) -> &BattleState {
        &self.state
    }

    /// Mutable state access for in-crate test setup.
    #[cfg(test)]
    pub(crate) fn state_mut_for_tests(&mut self) -> &mut BattleState {
        &mut self.state
    }

    /// The current phase of the state machine.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// The battle result, once decided.
    #[must_use]
    pub const fn result(&self) -> Option<BattleResult> {
        self.result
    }

    /// The current turn number.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.state.turn()
    }

    /// The current playback speed.
    #[must_use]
    pub const fn speed(&self) -> BattleSpeed {
        self.scheduler.speed()
    }

    /// Whether a battle is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Whether the battle is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    // -------------------------------------------------------------------------
    // Turn generation
    // -------------------------------------------------------------------------

    fn generate_actions(&mut self) {
        let mut order: Vec<(CharacterId, u32)> = self
            .state
            .all()
            .filter(|c| c.is_alive())
            .map(|c| (c.id(), c.stats().speed))
            .collect();
        // Stable sort: equal speeds keep roster insertion order.
        order.sort_by(|a, b| b.1.cmp(&a.1));

        let mut actions = Vec::new();
        for (actor_id, _) in order {
            let slot = self.facade.decide_action(&self.state, actor_id, &mut self.rng);

            let (selection, ability_name, healing) = {
                let ability = slot
                    .and_then(|s| self.state.character(actor_id).and_then(|c| c.ability(s)));
                let name = ability.map(|a| a.name.clone());
                let healing = ability.map_or(false, Ability::is_healing);
                let selection =
                    self.facade
                        .select_target(&self.state, actor_id, ability, &mut self.rng);
                (selection, name, healing)
            };

            let fan_out = matches!(selection, Selection::Multi(_));
            let targets = selection.ids();
            if targets.is_empty() {
                // No valid target: the action cannot proceed as specified.
                continue;
            }

            let Some(team) = self.state.character(actor_id).map(|c| c.team()) else {
                continue;
            };
            let mut amounts = Vec::with_capacity(targets.len());
            for target in &targets {
                amounts.push(self.compute_hit(actor_id, *target, slot));
            }

            actions.push(Action {
                actor: actor_id,
                team,
                ability_slot: slot,
                ability_name,
                targets,
                amounts,
                fan_out,
                healing,
            });
        }
        debug!(actions = actions.len(), "action queue generated");
        self.state.set_queue(actions);
    }

    /// Computes the pending magnitude of one actor-vs-target application
    /// through the external calculators. Missing calculators yield a zero
    /// hit; the application step reports the failure.
    fn compute_hit(
        &mut self,
        actor: CharacterId,
        target: CharacterId,
        slot: Option<usize>,
    ) -> PendingHit {
        let Self {
            state,
            damage_model,
            healing_model,
            rng,
            ..
        } = self;
        let (Some(attacker), Some(victim)) = (state.character(actor), state.character(target))
        else {
            return PendingHit::none();
        };
        let ability = slot.and_then(|s| attacker.ability(s));

        match ability {
            Some(a) if a.damage_type == DamageType::Healing => match healing_model.as_deref() {
                Some(model) => {
                    let outcome = model.calculate(attacker, victim, a, rng);
                    PendingHit {
                        amount: outcome.amount,
                        critical: false,
                        text: outcome.scaling,
                    }
                }
                None => PendingHit::none(),
            },
            Some(a) if a.damage_type == DamageType::Utility => PendingHit::none(),
            other => match damage_model.as_deref() {
                Some(model) => {
                    let outcome = model.calculate(attacker, victim, other, rng);
                    PendingHit {
                        amount: outcome.amount,
                        critical: outcome.critical,
                        text: outcome.scaling,
                    }
                }
                None => PendingHit::none(),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Effect application
    // -------------------------------------------------------------------------

    fn apply_action_effect(&mut self, action: &Action) {
        if action.fan_out {
            // Each sub-target resolves as an independent single-target
            // application; passives fire once per sub-target. Dead
            // sub-targets are skipped, never retargeted.
            for (index, target) in action.targets.iter().enumerate() {
                let dead = self
                    .state
                    .character(*target)
                    .map_or(true, |c| !c.is_alive());
                if dead && !action.healing {
                    continue;
                }
                let hit = action.amounts.get(index).cloned().unwrap_or_default();
                self.apply_single(action, *target, &hit);
            }
        } else if let (Some(target), Some(hit)) = (action.targets.first(), action.amounts.first())
        {
            let (target, hit) = (*target, hit.clone());
            self.apply_single(action, target, &hit);
        }
        debug_assert!(self.state.invariants_hold());
    }

    fn apply_single(&mut self, action: &Action, target: CharacterId, hit: &PendingHit) {
        // Snapshot ability data before any mutation.
        let (specs, kind, ability_name): (Vec<EffectSpec>, DamageType, Option<String>) =
            match action.ability_slot {
                Some(slot) => match self
                    .state
                    .character(action.actor)
                    .and_then(|c| c.ability(slot))
                {
                    Some(ability) => (
                        ability.effects.clone(),
                        ability.damage_type,
                        Some(ability.name.clone()),
                    ),
                    None => (Vec::new(), DamageType::Physical, action.ability_name.clone()),
                },
                None => (Vec::new(), DamageType::Physical, None),
            };

        if !specs.is_empty() {
            self.apply_effect_list(action.actor, target, &specs, ability_name);
            return;
        }

        match kind {
            DamageType::Healing => {
                if self.healing_model.is_none() {
                    self.collaborator_missing("healing processor");
                    return;
                }
                let Some((applied, hp_before, hp_after, max_hp)) =
                    self.heal_character(target, hit.amount)
                else {
                    return;
                };
                self.heal_aftermath(
                    action.actor,
                    target,
                    applied,
                    hp_before,
                    hp_after,
                    max_hp,
                    ability_name,
                    0,
                );
            }
            DamageType::Utility => {
                // No magnitude and no effect list: nothing to apply.
            }
            DamageType::Physical | DamageType::Elemental => {
                if self.damage_model.is_none() {
                    self.collaborator_missing("damage calculator");
                    return;
                }
                let Some((applied, hp_before, hp_after, max_hp)) =
                    self.damage_character(target, hit.amount)
                else {
                    return;
                };
                self.damage_aftermath(
                    action.actor,
                    target,
                    applied,
                    hit.critical,
                    hp_before,
                    hp_after,
                    max_hp,
                    ability_name,
                    0,
                );
            }
        }
    }

    /// Applies a structured effect list, then infers damage-dealt versus
    /// healing-done from the target's health delta.
    fn apply_effect_list(
        &mut self,
        actor: CharacterId,
        target: CharacterId,
        specs: &[EffectSpec],
        ability_name: Option<String>,
    ) {
        if self.effect_handler.is_none() || self.status_manager.is_none() {
            self.collaborator_missing("effect processor");
            return;
        }
        let Some((hp_before, max_hp)) = self
            .state
            .character(target)
            .map(|c| (c.current_hp(), c.max_hp()))
        else {
            return;
        };

        let outcomes: Vec<EffectOutcome> = {
            let Self {
                state,
                status_manager,
                effect_handler,
                rng,
                ..
            } = self;
            let Some(handler) = effect_handler.as_deref() else {
                return;
            };
            let Some(manager) = status_manager.as_deref_mut() else {
                return;
            };
            let Some(victim) = state.character_mut(target) else {
                return;
            };
            let mut collected = Vec::new();
            for spec in specs {
                collected.extend(handler.process(spec, actor, victim, manager, &mut *rng));
            }
            collected
        };

        for outcome in outcomes {
            match outcome {
                EffectOutcome::StatusApplied {
                    status,
                    duration,
                    stacks,
                } => {
                    self.emit(BattleEvent::StatusApplied {
                        character: target,
                        status,
                        duration,
                        stacks,
                    });
                }
                EffectOutcome::StatusResisted { status } => {
                    let name = self.character_name(target);
                    self.log(
                        LogCategory::Info,
                        format!("{name} resists {}", status.display_name()),
                    );
                }
            }
        }

        let Some(hp_after) = self.state.character(target).map(|c| c.current_hp()) else {
            return;
        };
        if hp_after < hp_before {
            let applied = AppliedDamage {
                actual: hp_before - hp_after,
                killed: hp_before > 0 && hp_after == 0,
            };
            self.damage_aftermath(
                actor, target, applied, false, hp_before, hp_after, max_hp, ability_name, 0,
            );
        } else if hp_after > hp_before {
            let applied = AppliedHealing {
                actual: hp_after - hp_before,
                revived: hp_before == 0,
            };
            self.heal_aftermath(
                actor, target, applied, hp_before, hp_after, max_hp, ability_name, 0,
            );
        }
    }

    fn damage_character(
        &mut self,
        target: CharacterId,
        amount: u32,
    ) -> Option<(AppliedDamage, u32, u32, u32)> {
        let victim = self.state.character_mut(target)?;
        let hp_before = victim.current_hp();
        let applied = victim.apply_damage(amount);
        Some((applied, hp_before, victim.current_hp(), victim.max_hp()))
    }

    fn heal_character(
        &mut self,
        target: CharacterId,
        amount: u32,
    ) -> Option<(AppliedHealing, u32, u32, u32)> {
        let patient = self.state.character_mut(target)?;
        let hp_before = patient.current_hp();
        let applied = patient.apply_healing(amount);
        Some((applied, hp_before, patient.current_hp(), patient.max_hp()))
    }

    #[allow(clippy::too_many_arguments)]
    fn damage_aftermath(
        &mut self,
        source: CharacterId,
        target: CharacterId,
        applied: AppliedDamage,
        critical: bool,
        hp_before: u32,
        hp_after: u32,
        max_hp: u32,
        ability: Option<String>,
        depth: u8,
    ) {
        self.emit(BattleEvent::CharacterDamaged {
            target,
            amount: applied.actual,
            source: Some(source),
            ability,
            hp: hp_after,
            max_hp,
            critical,
        });

        let taken = TriggerEvent::exchange(
            source,
            applied.actual,
            critical,
            hp_before,
            hp_after,
            max_hp,
            depth,
        );
        self.fire_triggers(target, PassiveTrigger::DamageTaken, &taken);

        let dealt = TriggerEvent::exchange(
            target,
            applied.actual,
            critical,
            hp_before,
            hp_after,
            max_hp,
            depth,
        );
        self.fire_triggers(source, PassiveTrigger::DamageDealt, &dealt);

        if applied.killed {
            self.handle_defeat(target, Some(source), depth);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn heal_aftermath(
        &mut self,
        source: CharacterId,
        target: CharacterId,
        applied: AppliedHealing,
        hp_before: u32,
        hp_after: u32,
        max_hp: u32,
        ability: Option<String>,
        depth: u8,
    ) {
        self.emit(BattleEvent::CharacterHealed {
            target,
            amount: applied.actual,
            source: Some(source),
            ability,
            hp: hp_after,
            max_hp,
            revived: applied.revived,
        });

        let received = TriggerEvent::exchange(
            source,
            applied.actual,
            false,
            hp_before,
            hp_after,
            max_hp,
            depth,
        );
        self.fire_triggers(target, PassiveTrigger::Healed, &received);

        let done = TriggerEvent::exchange(
            target,
            applied.actual,
            false,
            hp_before,
            hp_after,
            max_hp,
            depth,
        );
        self.fire_triggers(source, PassiveTrigger::HealingDone, &done);

        if applied.revived {
            let name = self.character_name(target);
            self.log(LogCategory::Success, format!("{name} is back on their feet"));
            self.fire_triggers(target, PassiveTrigger::Revive, &received);
        }
    }

    fn handle_defeat(&mut self, fallen: CharacterId, killer: Option<CharacterId>, depth: u8) {
        let Some(character) = self.state.character(fallen) else {
            return;
        };
        // A passive in the damage cascade may have revived them already.
        if !character.is_defeated() {
            return;
        }
        let name = character.name().to_string();

        self.emit(BattleEvent::CharacterDefeated { character: fallen });
        self.log(LogCategory::Action, format!("{name} has fallen"));
        if let Some(manager) = self.status_manager.as_deref_mut() {
            manager.clear(fallen);
        }

        let defeat = TriggerEvent {
            other: killer,
            depth,
            ..TriggerEvent::default()
        };
        self.fire_triggers(fallen, PassiveTrigger::Defeat, &defeat);

        if let Some(killer_id) = killer {
            if killer_id != fallen {
                let kill = TriggerEvent {
                    other: Some(fallen),
                    depth,
                    ..TriggerEvent::default()
                };
                self.fire_triggers(killer_id, PassiveTrigger::Kill, &kill);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Passive trigger cascade
    // -------------------------------------------------------------------------

    fn fire_triggers(&mut self, owner: CharacterId, trigger: PassiveTrigger, event: &TriggerEvent) {
        {
            let Some(character) = self.state.character_mut(owner) else {
                return;
            };
            if !character.mark_trigger_fired(trigger) {
                debug!(character = %owner, %trigger, "trigger already fired this cycle");
                return;
            }
        }

        let reactions: Vec<(String, PassiveReaction)> = {
            let Self {
                state,
                facade,
                rng,
                ..
            } = self;
            let Some(owner_ref) = state.character(owner) else {
                return;
            };
            let mut fired = Vec::new();
            for held in owner_ref.abilities() {
                let Some(spec) = held.ability.passive.as_ref() else {
                    continue;
                };
                let ctx = PassiveContext {
                    owner: owner_ref,
                    ability: &held.ability,
                    data: &spec.data,
                    trigger,
                    event,
                    battle: &*state,
                };
                if let Some(reaction) = facade.run_passive(spec.behavior, &ctx, &mut *rng) {
                    if reaction.executed {
                        fired.push((held.ability.name.clone(), reaction));
                    }
                }
            }
            fired
        };

        for (ability_name, reaction) in reactions {
            debug!(character = %owner, %trigger, ability = %ability_name, "passive fired");
            self.emit(BattleEvent::PassiveTriggered {
                character: owner,
                ability: ability_name,
                message: reaction.message.clone(),
            });
            for command in reaction.commands {
                self.apply_passive_command(owner, command, event.depth);
            }
        }
    }

    /// Applies one passive command through the collaborators. Damage and
    /// healing originating here carry `depth + 1`, which is what bounds
    /// reflection chains and keeps counterattacks to direct hits.
    fn apply_passive_command(&mut self, owner: CharacterId, command: PassiveCommand, depth: u8) {
        match command {
            PassiveCommand::DealDamage { target, amount } => {
                if self
                    .state
                    .character(target)
                    .map_or(true, |c| !c.is_alive())
                {
                    return;
                }
                let Some((applied, hp_before, hp_after, max_hp)) =
                    self.damage_character(target, amount)
                else {
                    return;
                };
                self.damage_aftermath(
                    owner,
                    target,
                    applied,
                    false,
                    hp_before,
                    hp_after,
                    max_hp,
                    None,
                    depth.saturating_add(1),
                );
            }
            PassiveCommand::Heal { target, amount } => {
                let Some((applied, hp_before, hp_after, max_hp)) =
                    self.heal_character(target, amount)
                else {
                    return;
                };
                self.heal_aftermath(
                    owner,
                    target,
                    applied,
                    hp_before,
                    hp_after,
                    max_hp,
                    None,
                    depth.saturating_add(1),
                );
            }
            PassiveCommand::ApplyStatus {
                target,
                status,
                duration,
                stacks,
            } => {
                self.apply_status_to(target, status, duration, stacks);
            }
        }
    }

    fn apply_status_to(&mut self, target: CharacterId, status: StatusId, duration: u8, stacks: u32) {
        if self
            .state
            .character(target)
            .map_or(true, |c| !c.is_alive())
        {
            return;
        }
        let Some(manager) = self.status_manager.as_deref_mut() else {
            self.collaborator_missing("status manager");
            return;
        };
        manager.apply(target, status.clone(), duration, stacks);
        self.emit(BattleEvent::StatusApplied {
            character: target,
            status,
            duration,
            stacks,
        });
    }

    // -------------------------------------------------------------------------
    // Turn bookkeeping
    // -------------------------------------------------------------------------

    /// Ticks standing status effects for every living character. Pulses go
    /// through the central health mutation points; status deaths fire the
    /// defeat flow with no killer.
    fn process_status_effects(&mut self) {
        if self.status_manager.is_none() {
            return;
        }
        for id in self.state.living_ids_both() {
            let pulses = match self.status_manager.as_deref_mut() {
                Some(manager) => manager.tick(id),
                None => return,
            };
            for pulse in pulses {
                match pulse {
                    StatusPulse::Damage { status, amount } => {
                        if self.state.character(id).map_or(true, |c| !c.is_alive()) {
                            continue;
                        }
                        let Some((applied, _, hp_after, max_hp)) =
                            self.damage_character(id, amount)
                        else {
                            continue;
                        };
                        self.emit(BattleEvent::CharacterDamaged {
                            target: id,
                            amount: applied.actual,
                            source: None,
                            ability: Some(status.display_name()),
                            hp: hp_after,
                            max_hp,
                            critical: false,
                        });
                        if applied.killed {
                            self.handle_defeat(id, None, 0);
                        }
                    }
                    StatusPulse::Heal { status, amount } => {
                        if self.state.character(id).map_or(true, |c| !c.is_alive()) {
                            continue;
                        }
                        let Some((applied, _, hp_after, max_hp)) = self.heal_character(id, amount)
                        else {
                            continue;
                        };
                        if applied.actual > 0 {
                            self.emit(BattleEvent::CharacterHealed {
                                target: id,
                                amount: applied.actual,
                                source: None,
                                ability: Some(status.display_name()),
                                hp: hp_after,
                                max_hp,
                                revived: applied.revived,
                            });
                        }
                    }
                    StatusPulse::Expired { status } => {
                        self.emit(BattleEvent::StatusRemoved {
                            character: id,
                            status,
                        });
                    }
                }
            }
        }
    }

    fn finish_turn(&mut self) {
        let turn = self.state.turn();
        debug!(turn, "finishing turn");

        for character in self.state.all_mut() {
            character.tick_cooldowns();
        }
        for id in self.state.living_ids_both() {
            self.fire_triggers(id, PassiveTrigger::TurnEnd, &TriggerEvent::lifecycle());
        }
        self.emit(BattleEvent::TurnEnded { turn });

        if let Some(result) = self.check_battle_end() {
            self.end_battle(result);
            return;
        }
        if turn >= self.config.max_turns {
            self.log(
                LogCategory::BattleResult,
                format!("Stalemate after {turn} turns"),
            );
            self.end_battle(BattleResult::Draw);
            return;
        }
        self.phase = BattlePhase::AwaitingNextTurn;
        self.scheduler
            .schedule(Continuation::StartTurn, self.config.turn_delay_ms);
    }

    fn check_battle_end(&self) -> Option<BattleResult> {
        let player_down = self.state.side_defeated(Team::Player);
        let opponent_down = self.state.side_defeated(Team::Opponent);
        match (player_down, opponent_down) {
            (true, true) => Some(BattleResult::Draw),
            (false, true) => Some(BattleResult::Victory),
            (true, false) => Some(BattleResult::Defeat),
            (false, false) => None,
        }
    }

    fn end_battle(&mut self, result: BattleResult) {
        info!(%result, "battle ended");
        self.state.set_active(false);
        self.phase = BattlePhase::Ended;
        self.scheduler.cancel();

        for id in self.state.living_ids_both() {
            self.fire_triggers(id, PassiveTrigger::BattleEnd, &TriggerEvent::lifecycle());
        }

        self.result = Some(result);
        self.emit(BattleEvent::BattleEnded { result });
        let message = match result {
            BattleResult::Victory => "Victory!",
            BattleResult::Defeat => "Defeat...",
            BattleResult::Draw => "The battle ends in a draw",
        };
        self.log(LogCategory::BattleResult, message.to_string());
    }

    // -------------------------------------------------------------------------
    // Reporting helpers
    // -------------------------------------------------------------------------

    fn character_name(&self, id: CharacterId) -> String {
        self.state
            .character(id)
            .map_or_else(|| format!("#{id}"), |c| c.name().to_string())
    }

    fn collaborator_missing(&mut self, what: &'static str) {
        error!(collaborator = what, "missing collaborator, operation skipped");
        self.log(
            LogCategory::Error,
            format!("Cannot resolve action: {what} unavailable"),
        );
    }

    fn emit(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    fn log(&mut self, category: LogCategory, message: String) {
        self.emit(BattleEvent::Log { category, message });
    }
}

// =============================================================================
// Tests
// =============================================================================
