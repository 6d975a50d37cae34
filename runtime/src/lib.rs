//! # Stockroom Runtime
//!
//! Runtime implementation for Stockroom reducers.
//!
//! This crate provides the [`Store`]: it owns state, serializes reducer calls,
//! executes the effects reducers describe, and feeds any resulting actions back
//! into the reducer.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Handle**: Lets callers wait for the effects of one `send`
//! - **Action Broadcast**: Observers receive every action produced by effects
//!
//! ## Example
//!
//! ```ignore
//! use stockroom_runtime::Store;
//!
//! let store = Store::new(InventoryState::default(), InventoryReducer::new(), env);
//!
//! // Send an action
//! store.send(InventoryAction::LoadInventory).await?;
//!
//! // Read state
//! let items = store.state(|s| s.items().len()).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use stockroom_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{RwLock, watch};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for an action or for effects to finish
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Handle for waiting on the effects started by a single `send`
///
/// Effects run on spawned tasks, so `send()` returns before they finish.
/// Actions fed back by those effects, and any effects they produce in turn,
/// are counted against the same handle.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(InventoryAction::LoadInventory).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The load has completed and its result has been reduced
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a handle together with the tracking context used by execution
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of effects from this send still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracking context is gone, so nothing is left running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the handle counter on drop
///
/// Ensures the counter is decremented even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, Ordering, Reducer, RwLock, StoreError,
    };
    use std::future::Future;
    use std::pin::Pin;
    use stockroom_core::SmallVec;
    use tokio::sync::broadcast;

    /// Default capacity of the action broadcast channel
    const DEFAULT_BROADCAST_CAPACITY: usize = 64;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Reducer calls are serialized by the write lock, so at most one action
    /// mutates state at any moment.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every action produced by an effect is broadcast here after it has
        /// been reduced.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(
                initial_state,
                reducer,
                environment,
                DEFAULT_BROADCAST_CAPACITY,
            )
        }

        /// Create a new store with a custom action broadcast capacity
        ///
        /// Observers that fall more than `capacity` actions behind start
        /// missing actions.
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Spawns the returned effects
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            let (handle, ()) = self.send_and_inspect(action, |_| ()).await?;
            Ok(handle)
        }

        /// Send an action and inspect the resulting state under the same lock
        ///
        /// No other action can be reduced between this action and `inspect`,
        /// which makes this the way to read a command's outcome.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send_and_inspect<F, T>(
            &self,
            action: A,
            inspect: F,
        ) -> Result<(EffectHandle, T), StoreError>
        where
            F: FnOnce(&S) -> T,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejecting action, store is shutting down");
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.actions.sent").increment(1);

            let (effects, inspected) = {
                let mut state = self.state.write().await;
                let effects = self.reducer.reduce(&mut *state, action, &*self.environment);
                let inspected = inspect(&*state);
                (effects, inspected)
            };

            let (handle, tracking) = EffectHandle::new();
            self.spawn_effects(effects, &tracking);
            Ok((handle, inspected))
        }

        /// Send an action and wait for a matching action produced by its effects
        ///
        /// Subscribes before sending so a fast effect cannot be missed. When
        /// this returns, the matching action has already been reduced.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action within `timeout`
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            // Subscribe BEFORE sending to avoid race condition
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to actions produced by effects
        ///
        /// Actions passed to `send` directly are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let item_count = store.state(|s| s.items().len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Number of effects currently running across all sends
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Stop accepting actions and wait for running effects to finish
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timed out");
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Spawn each effect on its own task, tracked by `tracking`
        fn spawn_effects(&self, effects: SmallVec<[Effect<A>; 4]>, tracking: &EffectTracking) {
            for effect in effects {
                if effect.is_noop() {
                    continue;
                }

                tracking.increment();
                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                metrics::counter!("store.effects.spawned").increment(1);

                let store = self.clone();
                let done = DecrementGuard(tracking.clone());
                let pending = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                tokio::spawn(async move {
                    let _done = done;
                    let _pending = pending;
                    store.run_effect(effect).await;
                });
            }
        }

        /// Execute one effect to completion, including any feedback it causes
        fn run_effect(&self, effect: Effect<A>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
            let store = self.clone();
            Box::pin(async move {
                match effect {
                    Effect::None => {},
                    Effect::Future(future) => {
                        if let Some(action) = future.await {
                            store.feed_back(action).await;
                        } else {
                            tracing::trace!("Effect completed with no action");
                        }
                    },
                    Effect::Parallel(effects) => {
                        futures::future::join_all(
                            effects.into_iter().map(|effect| store.run_effect(effect)),
                        )
                        .await;
                    },
                    Effect::Sequential(effects) => {
                        for effect in effects {
                            store.run_effect(effect).await;
                        }
                    },
                }
            })
        }

        /// Reduce an action produced by an effect, then broadcast it
        async fn feed_back(&self, action: A) {
            let effects = {
                let mut state = self.state.write().await;
                self.reducer
                    .reduce(&mut *state, action.clone(), &*self.environment)
            };

            // No receivers is not an error
            let _ = self.action_broadcast.send(action);

            futures::future::join_all(effects.into_iter().map(|effect| self.run_effect(effect)))
                .await;
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::{SmallVec, async_effect, smallvec};

    #[derive(Debug, Clone, Default)]
    struct TestState {
        value: i32,
        log: Vec<&'static str>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Increment,
        Append(&'static str),
        ProduceEffect,
        ProduceParallelEffects,
        ProduceSequentialEffects,
        ProduceSlowEffect,
        Finished,
    }

    #[derive(Debug, Clone)]
    struct TestEnv;

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::Append(entry) => {
                    state.log.push(entry);
                    SmallVec::new()
                },
                TestAction::ProduceEffect => {
                    smallvec![async_effect! { Some(TestAction::Increment) }]
                },
                TestAction::ProduceParallelEffects => smallvec![Effect::merge(vec![
                    async_effect! { Some(TestAction::Increment) },
                    async_effect! { Some(TestAction::Increment) },
                    async_effect! { Some(TestAction::Increment) },
                ])],
                TestAction::ProduceSequentialEffects => smallvec![Effect::chain(vec![
                    async_effect! {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Some(TestAction::Append("first"))
                    },
                    async_effect! { Some(TestAction::Append("second")) },
                    async_effect! { Some(TestAction::Finished) },
                ])],
                TestAction::ProduceSlowEffect => smallvec![async_effect! {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    None
                }],
                TestAction::Finished => SmallVec::new(),
            }
        }
    }

    fn store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(TestState::default(), TestReducer, TestEnv)
    }

    #[tokio::test]
    async fn test_send_updates_state() {
        let store = store();
        let _ = store.send(TestAction::Increment).await;
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_effect_feedback_is_reduced() {
        let store = store();
        let mut handle = store.send(TestAction::ProduceEffect).await.unwrap();
        handle
            .wait_with_timeout(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_parallel_effects_all_complete() {
        let store = store();
        let mut handle = store.send(TestAction::ProduceParallelEffects).await.unwrap();
        handle.wait().await;
        assert_eq!(store.state(|s| s.value).await, 3);
    }

    #[tokio::test]
    async fn test_sequential_effects_preserve_order() {
        let store = store();
        let mut handle = store
            .send(TestAction::ProduceSequentialEffects)
            .await
            .unwrap();
        handle.wait().await;
        assert_eq!(store.state(|s| s.log.clone()).await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_send_and_inspect_sees_reduced_state() {
        let store = store();
        let (_, value) = store
            .send_and_inspect(TestAction::Increment, |s| s.value)
            .await
            .unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_send_and_wait_for_returns_terminal_action() {
        let store = store();
        let action = store
            .send_and_wait_for(
                TestAction::ProduceSequentialEffects,
                |a| matches!(a, TestAction::Finished),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(action, TestAction::Finished);
        // The terminal action is broadcast after everything before it was reduced
        assert_eq!(store.state(|s| s.log.len()).await, 2);
    }

    #[tokio::test]
    async fn test_send_and_wait_for_times_out() {
        let store = store();
        let result = store
            .send_and_wait_for(
                TestAction::Increment,
                |a| matches!(a, TestAction::Finished),
                Duration::from_millis(50),
            )
            .await;
        assert_eq!(result, Err(StoreError::Timeout));
    }

    #[tokio::test]
    async fn test_only_effect_actions_are_broadcast() {
        let store = store();
        let mut rx = store.subscribe_actions();

        let mut handle = store.send(TestAction::ProduceEffect).await.unwrap();
        handle.wait().await;

        assert_eq!(rx.recv().await.unwrap(), TestAction::Increment);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_actions() {
        let store = store();
        store.shutdown(Duration::from_secs(1)).await.unwrap();
        let result = store.send(TestAction::Increment).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }

    #[tokio::test]
    async fn test_shutdown_times_out_with_running_effects() {
        let store = store();
        let _ = store.send(TestAction::ProduceSlowEffect).await.unwrap();
        let result = store.shutdown(Duration::from_millis(20)).await;
        assert_eq!(result, Err(StoreError::ShutdownTimeout(1)));
    }

    #[tokio::test]
    async fn test_completed_handle_does_not_block() {
        let mut handle = EffectHandle::completed();
        handle
            .wait_with_timeout(Duration::from_millis(10))
            .await
            .unwrap();
    }
}
