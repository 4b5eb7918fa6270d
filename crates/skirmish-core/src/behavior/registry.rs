//! Behavior registry: per-kind function tables with guarded execution.
//!
//! Each behavior family (targeting, action decision, passive) has a closed
//! enum of kinds and a [`BehaviorTable`] mapping kinds to plain function
//! values. Lookup falls back to the kind's registered default (with a
//! warning) when an entry is missing, and [`BehaviorTable::execute`] guards
//! every call: a failing behavior is logged and retried once against the
//! default — unless the failing behavior *was* the default — so one bad
//! behavior can never halt a battle.
//!
//! The registry is an explicitly constructed value owned by the engine;
//! there is no global instance. [`BehaviorRegistry::default`] installs every
//! built-in behavior, mirroring how hosts get a fully wired engine without
//! any registration boilerplate.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use tracing::{error, warn};

use crate::behavior::decision::{self, DecisionBehavior, DecisionFn};
use crate::behavior::passive::{self, PassiveBehavior, PassiveFn};
use crate::behavior::targeting::{self, TargetingBehavior, TargetingFn};
use crate::error::BehaviorError;

// =============================================================================
// Behavior table
// =============================================================================

/// A name→function store for one behavior kind.
pub struct BehaviorTable<K, F> {
    entries: HashMap<K, F>,
    default: Option<K>,
}

impl<K, F> Default for BehaviorTable<K, F> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            default: None,
        }
    }
}

impl<K, F> BehaviorTable<K, F>
where
    K: Copy + Eq + Hash + Display,
{
    /// Creates an empty table with no default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a behavior, optionally marking it as the kind's default.
    ///
    /// Registering an existing kind replaces its function, which is how
    /// hosts override a built-in behavior.
    pub fn register(&mut self, kind: K, behavior: F, is_default: bool) {
        self.entries.insert(kind, behavior);
        if is_default {
            self.default = Some(kind);
        }
    }

    /// Looks up a behavior, falling back to the default (with a warning)
    /// when the kind has no entry. Returns the kind actually resolved
    /// alongside the function.
    #[must_use]
    pub fn resolve(&self, kind: K) -> Option<(K, &F)> {
        if let Some(behavior) = self.entries.get(&kind) {
            return Some((kind, behavior));
        }
        warn!(behavior = %kind, "unregistered behavior, falling back to default");
        let default = self.default?;
        self.entries.get(&default).map(|behavior| (default, behavior))
    }

    /// The registered default kind, if any.
    #[must_use]
    pub fn default_kind(&self) -> Option<K> {
        self.default
    }

    /// Whether a kind has a registered entry.
    #[must_use]
    pub fn contains(&self, kind: K) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Number of registered behaviors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no behaviors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs a behavior inside the guarded boundary.
    ///
    /// Resolves `kind` (default fallback included), invokes it through
    /// `call`, and on failure logs the error and retries the default once —
    /// except when the failing behavior already was the default, to avoid
    /// recursing into the same failure. Returns `None` when nothing usable
    /// succeeded.
    pub fn execute<R>(
        &self,
        kind: K,
        mut call: impl FnMut(&F) -> Result<R, BehaviorError>,
    ) -> Option<R> {
        let (resolved, behavior) = self.resolve(kind)?;
        match call(behavior) {
            Ok(result) => Some(result),
            Err(err) => {
                error!(behavior = %resolved, %err, "behavior failed");
                let default = self.default?;
                if default == resolved {
                    return None;
                }
                let fallback = self.entries.get(&default)?;
                match call(fallback) {
                    Ok(result) => Some(result),
                    Err(err) => {
                        error!(behavior = %default, %err, "default behavior failed");
                        None
                    }
                }
            }
        }
    }
}

impl<K, F> std::fmt::Debug for BehaviorTable<K, F>
where
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTable")
            .field("len", &self.entries.len())
            .field("default", &self.default)
            .finish()
    }
}

// =============================================================================
// Behavior registry
// =============================================================================

/// Bundles the three behavior tables the engine dispatches through.
#[derive(Debug)]
pub struct BehaviorRegistry {
    targeting: BehaviorTable<TargetingBehavior, TargetingFn>,
    decision: BehaviorTable<DecisionBehavior, DecisionFn>,
    passive: BehaviorTable<PassiveBehavior, PassiveFn>,
}

impl Default for BehaviorRegistry {
    /// A registry with every built-in behavior installed and per-kind
    /// defaults set (random-enemy targeting, coin-flip decisions, inert
    /// passive).
    fn default() -> Self {
        let mut registry = Self::empty();
        targeting::install(&mut registry.targeting);
        decision::install(&mut registry.decision);
        passive::install(&mut registry.passive);
        registry
    }
}

impl BehaviorRegistry {
    /// A registry with no behaviors at all (tests, fully custom hosts).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            targeting: BehaviorTable::new(),
            decision: BehaviorTable::new(),
            passive: BehaviorTable::new(),
        }
    }

    /// The targeting behavior table.
    #[must_use]
    pub fn targeting(&self) -> &BehaviorTable<TargetingBehavior, TargetingFn> {
        &self.targeting
    }

    /// The mutable targeting behavior table.
    pub fn targeting_mut(&mut self) -> &mut BehaviorTable<TargetingBehavior, TargetingFn> {
        &mut self.targeting
    }

    /// The action-decision behavior table.
    #[must_use]
    pub fn decision(&self) -> &BehaviorTable<DecisionBehavior, DecisionFn> {
        &self.decision
    }

    /// The mutable action-decision behavior table.
    pub fn decision_mut(&mut self) -> &mut BehaviorTable<DecisionBehavior, DecisionFn> {
        &mut self.decision
    }

    /// The passive behavior table.
    #[must_use]
    pub fn passive(&self) -> &BehaviorTable<PassiveBehavior, PassiveFn> {
        &self.passive
    }

    /// The mutable passive behavior table.
    pub fn passive_mut(&mut self) -> &mut BehaviorTable<PassiveBehavior, PassiveFn> {
        &mut self.passive
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // A tiny behavior family for exercising the table in isolation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestKind {
        Good,
        Bad,
        AlsoBad,
    }

    impl Display for TestKind {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    type TestFn = fn(i32) -> Result<i32, BehaviorError>;

    fn double(x: i32) -> Result<i32, BehaviorError> {
        Ok(x * 2)
    }

    fn fail(_: i32) -> Result<i32, BehaviorError> {
        Err(BehaviorError::Failed("nope".into()))
    }

    mod table_tests {
        use super::*;

        #[test]
        fn register_and_resolve() {
            let mut table: BehaviorTable<TestKind, TestFn> = BehaviorTable::new();
            table.register(TestKind::Good, double, true);

            let (kind, _) = table.resolve(TestKind::Good).unwrap();
            assert_eq!(kind, TestKind::Good);
            assert_eq!(table.default_kind(), Some(TestKind::Good));
            assert_eq!(table.len(), 1);
        }

        #[test]
        fn unknown_kind_falls_back_to_default() {
            let mut table: BehaviorTable<TestKind, TestFn> = BehaviorTable::new();
            table.register(TestKind::Good, double, true);

            let (kind, _) = table.resolve(TestKind::Bad).unwrap();
            assert_eq!(kind, TestKind::Good);
        }

        #[test]
        fn unknown_kind_without_default_yields_nothing() {
            let mut table: BehaviorTable<TestKind, TestFn> = BehaviorTable::new();
            table.register(TestKind::Good, double, false);

            assert!(table.resolve(TestKind::Bad).is_none());
        }

        #[test]
        fn reregistration_replaces() {
            let mut table: BehaviorTable<TestKind, TestFn> = BehaviorTable::new();
            table.register(TestKind::Good, fail, true);
            table.register(TestKind::Good, double, true);

            let result = table.execute(TestKind::Good, |f| f(21));
            assert_eq!(result, Some(42));
        }
    }

    mod execute_tests {
        use super::*;

        #[test]
        fn successful_execution() {
            let mut table: BehaviorTable<TestKind, TestFn> = BehaviorTable::new();
            table.register(TestKind::Good, double, true);
            assert_eq!(table.execute(TestKind::Good, |f| f(5)), Some(10));
        }

        #[test]
        fn failure_retries_default() {
            let mut table: BehaviorTable<TestKind, TestFn> = BehaviorTable::new();
            table.register(TestKind::Good, double, true);
            table.register(TestKind::Bad, fail, false);

            assert_eq!(table.execute(TestKind::Bad, |f| f(5)), Some(10));
        }

        #[test]
        fn failing_default_does_not_recurse() {
            let mut table: BehaviorTable<TestKind, TestFn> = BehaviorTable::new();
            table.register(TestKind::Bad, fail, true);

            assert_eq!(table.execute(TestKind::Bad, |f| f(5)), None);
        }

        #[test]
        fn failure_with_failing_default_yields_none() {
            let mut table: BehaviorTable<TestKind, TestFn> = BehaviorTable::new();
            table.register(TestKind::Bad, fail, true);
            table.register(TestKind::AlsoBad, fail, false);

            assert_eq!(table.execute(TestKind::AlsoBad, |f| f(5)), None);
        }

        #[test]
        fn empty_table_yields_none() {
            let table: BehaviorTable<TestKind, TestFn> = BehaviorTable::new();
            assert_eq!(table.execute(TestKind::Good, |f| f(5)), None);
        }
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn default_registry_has_all_builtins() {
            let registry = BehaviorRegistry::default();
            assert_eq!(registry.targeting().len(), 13);
            assert_eq!(registry.decision().len(), 6);
            assert_eq!(registry.passive().len(), 13);
        }

        #[test]
        fn default_registry_has_defaults_per_kind() {
            let registry = BehaviorRegistry::default();
            assert_eq!(
                registry.targeting().default_kind(),
                Some(TargetingBehavior::RandomEnemy)
            );
            assert_eq!(
                registry.decision().default_kind(),
                Some(DecisionBehavior::Basic)
            );
            assert_eq!(
                registry.passive().default_kind(),
                Some(PassiveBehavior::Inert)
            );
        }

        #[test]
        fn empty_registry_has_nothing() {
            let registry = BehaviorRegistry::empty();
            assert!(registry.targeting().is_empty());
            assert!(registry.decision().is_empty());
            assert!(registry.passive().is_empty());
        }
    }
}
