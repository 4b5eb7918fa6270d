//! Behavior facade: the engine's single dispatch surface.
//!
//! The facade owns the [`BehaviorRegistry`] and exposes three uniform entry
//! points — [`select_target`](BehaviorFacade::select_target),
//! [`decide_action`](BehaviorFacade::decide_action), and
//! [`run_passive`](BehaviorFacade::run_passive) — so the flow controller
//! never touches behavior tables directly. It also owns the mapping from an
//! ability's declarative [`TargetType`] to the concrete targeting behavior
//! that implements it.

use rand_chacha::ChaCha8Rng;

use crate::ability::{Ability, TargetType};
use crate::battle::BattleState;
use crate::behavior::decision::ActionContext;
use crate::behavior::passive::{PassiveBehavior, PassiveContext, PassiveReaction};
use crate::behavior::registry::BehaviorRegistry;
use crate::behavior::targeting::{Selection, TargetingBehavior, TargetingContext};
use crate::character::CharacterId;

/// Thin dispatch surface over the behavior registry.
#[derive(Debug, Default)]
pub struct BehaviorFacade {
    registry: BehaviorRegistry,
}

impl BehaviorFacade {
    /// Wraps an explicitly constructed registry.
    #[must_use]
    pub fn new(registry: BehaviorRegistry) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    /// The mutable registry, for hosts registering custom behaviors.
    pub fn registry_mut(&mut self) -> &mut BehaviorRegistry {
        &mut self.registry
    }

    /// Maps a declarative target type to the behavior implementing it.
    #[must_use]
    pub const fn targeting_for_type(target_type: TargetType) -> TargetingBehavior {
        match target_type {
            TargetType::Enemy => TargetingBehavior::RandomEnemy,
            TargetType::WeakestEnemy => TargetingBehavior::LowestHpEnemy,
            TargetType::ToughestEnemy => TargetingBehavior::HighestHpEnemy,
            TargetType::AllEnemies => TargetingBehavior::AllEnemies,
            TargetType::WoundedAlly => TargetingBehavior::LowestHpAlly,
            TargetType::AllAllies => TargetingBehavior::AllAllies,
            TargetType::User => TargetingBehavior::ThisCharacter,
            TargetType::StrongestEnemy => TargetingBehavior::HighestAttackEnemy,
            TargetType::ArcaneThreat => TargetingBehavior::HighestMagicEnemy,
            TargetType::Cluster => TargetingBehavior::Cluster,
            TargetType::OtherAlly => TargetingBehavior::RandomAllyOther,
            TargetType::MostInjuredAlly => TargetingBehavior::MostInjuredAlly,
            TargetType::Everyone => TargetingBehavior::Everyone,
        }
    }

    /// Selects a target for an actor.
    ///
    /// With an ability, the ability's target type picks the behavior; for a
    /// basic attack (`ability` is `None`) the actor's own targeting behavior
    /// applies. Returns [`Selection::None`] when no valid target exists or
    /// the actor is gone.
    pub fn select_target(
        &self,
        battle: &BattleState,
        actor: CharacterId,
        ability: Option<&Ability>,
        rng: &mut ChaCha8Rng,
    ) -> Selection {
        let Some(ctx) = TargetingContext::new(battle, actor) else {
            return Selection::None;
        };
        let kind = ability.map_or(ctx.actor.targeting(), |a| {
            Self::targeting_for_type(a.target_type)
        });
        self.registry
            .targeting()
            .execute(kind, |behavior| behavior(&ctx, &mut *rng))
            .unwrap_or(Selection::None)
    }

    /// Chooses an ability slot for an actor this turn, or `None` for a
    /// basic attack.
    pub fn decide_action(
        &self,
        battle: &BattleState,
        actor: CharacterId,
        rng: &mut ChaCha8Rng,
    ) -> Option<usize> {
        let ctx = ActionContext::new(battle, actor)?;
        let kind = ctx.actor.decision();
        self.registry
            .decision()
            .execute(kind, |behavior| behavior(&ctx, &mut *rng))
            .flatten()
    }

    /// Runs a passive behavior inside the guarded boundary.
    pub fn run_passive(
        &self,
        kind: PassiveBehavior,
        ctx: &PassiveContext<'_>,
        rng: &mut ChaCha8Rng,
    ) -> Option<PassiveReaction> {
        self.registry
            .passive()
            .execute(kind, |behavior| behavior(ctx, &mut *rng))
    }
}

// =============================================================================
// Tests
// =============================================================================
