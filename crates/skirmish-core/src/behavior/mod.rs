//! Swappable combat logic: targeting, action decisions, and passives.
//!
//! Each behavior family is a closed enum of kinds mapped to plain function
//! values in a [`registry::BehaviorTable`]. The engine dispatches through
//! the [`facade::BehaviorFacade`], which resolves kinds, guards execution,
//! and falls back to per-kind defaults — so a character's logic can be
//! swapped by data without a single conditional in the flow controller.

pub mod decision;
pub mod facade;
pub mod passive;
pub mod registry;
pub mod targeting;

pub use decision::{ActionContext, DecisionBehavior};
pub use facade::BehaviorFacade;
pub use passive::{
    PassiveBehavior, PassiveCommand, PassiveContext, PassiveReaction, TriggerEvent,
};
pub use registry::{BehaviorRegistry, BehaviorTable};
pub use targeting::{Selection, TargetingBehavior, TargetingContext};
