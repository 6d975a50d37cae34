//! # Stockroom Core
//!
//! Core traits and types for the Stockroom inventory engine.
//!
//! Business logic is written as reducers: pure functions
//! `(State, Action, Environment) → (State, Effects)`. Anything that touches
//! the outside world (a backend fetch, a write-through save) is returned as an
//! [`effect::Effect`] description and executed later by the runtime.
//!
//! ## Core Concepts
//!
//! - **State**: the in-memory collections a feature owns
//! - **Action**: every input to a reducer, commands and events alike
//! - **Reducer**: validates commands and applies events to state
//! - **Effect**: side effect descriptions (not execution)
//! - **Environment**: injected dependencies ([`environment::Clock`],
//!   [`environment::IdGenerator`], data sources)
//!
//! ## Example
//!
//! ```ignore
//! use stockroom_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for InventoryReducer {
//!     type State = InventoryState;
//!     type Action = InventoryAction;
//!     type Environment = InventoryEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut InventoryState,
//!         action: InventoryAction,
//!         env: &InventoryEnvironment,
//!     ) -> SmallVec<[Effect<InventoryAction>; 4]> {
//!         // Validate, apply, describe effects
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Declarative helpers for building effects
pub mod effect_macros;

/// Reducer module - The core trait for business logic
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations must not perform I/O. They:
        /// 1. Validate the action against current state
        /// 2. Update state in place
        /// 3. Return effect descriptions for the runtime to execute
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values returned from reducers. The Store runtime executes
/// them and feeds any resulting action back into the reducer.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed future produced by an [`Effect::Future`]
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Run effects one after another, each completing before the next starts
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// If it resolves to `Some(action)`, the action is fed back into the reducer.
        Future(EffectFuture<Action>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Returns `true` for `Effect::None` and for empty compositions
        #[must_use]
        pub fn is_noop(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().all(Effect::is_noop)
                },
                Effect::Future(_) => false,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// Everything a reducer needs from outside (time, identifiers) is behind a
/// trait so tests can substitute deterministic implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Source of opaque identifiers for newly created records
    ///
    /// Identifiers must be unique for the lifetime of the process. Deriving
    /// them from timestamps is not acceptable: two records created within the
    /// same tick would collide.
    pub trait IdGenerator: Send + Sync {
        /// Produce a fresh identifier
        fn next_id(&self) -> String;
    }

    /// Random UUID v4 identifiers
    #[derive(Debug, Clone, Copy, Default)]
    pub struct UuidGenerator;

    impl IdGenerator for UuidGenerator {
        fn next_id(&self) -> String {
            uuid::Uuid::new_v4().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use super::environment::{IdGenerator, UuidGenerator};

    #[test]
    fn uuid_generator_yields_distinct_ids() {
        let generator = UuidGenerator;
        let ids: std::collections::HashSet<String> = (0..1000).map(|_| generator.next_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn noop_detection() {
        assert!(Effect::<()>::None.is_noop());
        assert!(Effect::<()>::merge(vec![Effect::None, Effect::chain(vec![])]).is_noop());

        let future = Effect::<()>::Future(Box::pin(async { None }));
        assert!(!Effect::merge(vec![Effect::None, future]).is_noop());
    }

    #[test]
    fn debug_hides_future_body() {
        let effect = Effect::<u8>::chain(vec![Effect::Future(Box::pin(async { Some(1) }))]);
        assert_eq!(
            format!("{effect:?}"),
            "Effect::Sequential([Effect::Future(<future>)])"
        );
    }
}
