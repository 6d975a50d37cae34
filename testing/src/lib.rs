//! # Stockroom Testing
//!
//! Testing utilities and helpers for Stockroom reducers.
//!
//! This crate provides:
//! - Deterministic implementations of Environment traits
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use stockroom_testing::{ReducerTest, SequentialIds, test_clock};
//!
//! ReducerTest::new(InventoryReducer::new())
//!     .with_env(InventoryEnvironment::new(
//!         Arc::new(test_clock()),
//!         Arc::new(SequentialIds::new("id")),
//!         source,
//!     ))
//!     .given_state(InventoryState::default())
//!     .when_action(InventoryAction::AddCategory { name: "Tools".into() })
//!     .then_state(|state| assert_eq!(state.categories().len(), 1))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use stockroom_core::environment::{Clock, IdGenerator};


pub use reducer_test::{ReducerTest, assertions};

/// Deterministic implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use stockroom_testing::mocks::FixedClock;
    /// use stockroom_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }

    /// Predictable identifiers: `{prefix}-1`, `{prefix}-2`, ...
    ///
    /// Unlike a clock-derived scheme, successive calls never repeat, even when
    /// they happen within the same instant.
    ///
    /// # Example
    ///
    /// ```
    /// use stockroom_testing::mocks::SequentialIds;
    /// use stockroom_core::environment::IdGenerator;
    ///
    /// let ids = SequentialIds::new("item");
    /// assert_eq!(ids.next_id(), "item-1");
    /// assert_eq!(ids.next_id(), "item-2");
    /// ```
    #[derive(Debug)]
    pub struct SequentialIds {
        prefix: String,
        next: AtomicU64,
    }

    impl SequentialIds {
        /// Create a generator whose first id is `{prefix}-1`
        #[must_use]
        pub fn new(prefix: impl Into<String>) -> Self {
            Self {
                prefix: prefix.into(),
                next: AtomicU64::new(1),
            }
        }
    }

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            format!("{}-{n}", self.prefix)
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SequentialIds, test_clock};
