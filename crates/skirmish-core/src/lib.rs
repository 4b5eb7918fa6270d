//! # Skirmish Core
//!
//! Combat-resolution engine for the Skirmish autobattler.
//!
//! Given two rosters of characters, the engine autonomously decides who
//! acts, what they do, whom they target, and what consequences follow, turn
//! after turn, until one side is eliminated. Rendering, audio, and animation
//! are the host's problem: the engine emits [`event::BattleEvent`]s and the
//! host draws them.
//!
//! ## Architecture
//!
//! - **Behaviors** ([`behavior`]): targeting, action-decision, and passive
//!   logic as named, swappable functions in per-kind tables with guarded
//!   execution and default fallback.
//! - **Collaborators** ([`contracts`]): damage/healing magnitude, status
//!   bookkeeping, and structured-effect processing behind narrow traits
//!   with replaceable baseline implementations.
//! - **Flow controller** ([`engine`]): the turn/action state machine that
//!   owns the battle state, the action queue, the pacing scheduler, and the
//!   deterministic RNG.
//!
//! ## Usage
//!
//! ```
//! use skirmish_core::character::{CharacterDef, Stats};
//! use skirmish_core::config::EngineConfig;
//! use skirmish_core::engine::BattleEngine;
//!
//! let mut engine = BattleEngine::new(EngineConfig::with_seed(7));
//! let heroes = vec![CharacterDef::new("Hero", Stats::new(60, 9, 3, 6))];
//! let foes = vec![CharacterDef::new("Bandit", Stats::new(45, 7, 2, 4))];
//!
//! engine.start_battle(&heroes, &foes).unwrap();
//! let result = engine.run_to_completion();
//! for event in engine.drain_events() {
//!     // render, log, or forward the event
//!     let _ = event;
//! }
//! assert!(result.is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ability;
pub mod battle;
pub mod behavior;
pub mod character;
pub mod config;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod event;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use character::{CharacterDef, CharacterId, Team};
pub use config::EngineConfig;
pub use engine::{BattleEngine, BattlePhase};
pub use event::{BattleEvent, BattleResult};
