//! Reducer logic for the inventory.
//!
//! Commands are validated against the current state. A valid command becomes
//! an event that is applied immediately, plus a write-through effect that
//! persists the change to the configured [`InventorySource`]. An invalid
//! command becomes a [`InventoryAction::CommandRejected`] event and nothing
//! else.

use crate::error::{Rejection, SourceError};
use crate::source::{InventorySource, WriteQueue, WriteTicket};
use crate::types::{
    Category, CategoryId, DEFAULT_CATEGORY_COLOR, HistoryAction, HistoryEntry, HistoryId,
    INITIAL_STOCK_PURPOSE, InventoryAction, InventoryState, Item, ItemChanges, ItemId, LoadStatus,
    Snapshot,
};
use std::sync::Arc;
use stockroom_core::{
    SmallVec, async_effect,
    effect::Effect,
    environment::{Clock, IdGenerator},
    fallible_effect,
    reducer::Reducer,
    smallvec,
};

/// Environment dependencies for the inventory reducer
#[derive(Clone)]
pub struct InventoryEnvironment {
    /// Clock for history timestamps
    pub clock: Arc<dyn Clock>,
    /// Identifiers for new categories, items and history entries
    pub ids: Arc<dyn IdGenerator>,
    /// Where collections are read from and changes written to
    pub source: Arc<dyn InventorySource>,
    /// Keeps write-throughs in the order their commands were reduced
    pub writes: Arc<WriteQueue>,
}

impl InventoryEnvironment {
    /// Creates a new `InventoryEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        source: Arc<dyn InventorySource>,
    ) -> Self {
        Self {
            clock,
            ids,
            source,
            writes: Arc::new(WriteQueue::new()),
        }
    }
}

impl std::fmt::Debug for InventoryEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryEnvironment").finish_non_exhaustive()
    }
}

/// Reducer for the inventory
#[derive(Clone, Debug)]
pub struct InventoryReducer;

impl InventoryReducer {
    /// Creates a new `InventoryReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates an `AddCategory` command
    fn validate_add_category(
        name: &str,
        env: &InventoryEnvironment,
    ) -> Result<InventoryAction, Rejection> {
        let name = non_empty(name)?;

        Ok(InventoryAction::CategoryAdded {
            category: Category {
                id: CategoryId::new(env.ids.next_id()),
                name,
                color: DEFAULT_CATEGORY_COLOR.to_string(),
            },
        })
    }

    /// Validates an `AddItem` command
    fn validate_add_item(
        state: &InventoryState,
        name: &str,
        category_id: CategoryId,
        quantity: i64,
        threshold: i64,
        env: &InventoryEnvironment,
    ) -> Result<InventoryAction, Rejection> {
        let name = non_empty(name)?;

        if state.category(&category_id).is_none() {
            return Err(Rejection::UnknownCategory(category_id));
        }

        if quantity < 0 {
            return Err(Rejection::NegativeQuantity(quantity));
        }
        let stock = u32::try_from(quantity).map_err(|_| Rejection::QuantityOutOfRange(quantity))?;
        let threshold = valid_threshold(threshold)?;

        let item = Item {
            id: ItemId::new(env.ids.next_id()),
            name,
            category: category_id,
            quantity: stock,
            threshold,
        };
        let entry = Self::entry(
            env,
            &item.id,
            HistoryAction::Add,
            quantity,
            Some(INITIAL_STOCK_PURPOSE.to_string()),
        );

        Ok(InventoryAction::ItemAdded { item, entry })
    }

    /// Validates a `RefillItem` command
    fn validate_refill_item(
        state: &InventoryState,
        id: ItemId,
        quantity: i64,
        purpose: Option<String>,
        env: &InventoryEnvironment,
    ) -> Result<InventoryAction, Rejection> {
        let Some(item) = state.item(&id) else {
            return Err(Rejection::ItemNotFound(id));
        };

        if quantity <= 0 {
            return Err(Rejection::NonPositiveQuantity(quantity));
        }

        let added = u32::try_from(quantity)
            .ok()
            .filter(|added| item.quantity.checked_add(*added).is_some())
            .ok_or(Rejection::QuantityOutOfRange(quantity))?;

        let entry = Self::entry(env, &id, HistoryAction::Refill, quantity, clean_purpose(purpose));
        Ok(InventoryAction::ItemRefilled {
            id,
            quantity: added,
            entry,
        })
    }

    /// Validates a `WithdrawItem` command
    fn validate_withdraw_item(
        state: &InventoryState,
        id: ItemId,
        quantity: i64,
        purpose: Option<String>,
        env: &InventoryEnvironment,
    ) -> Result<InventoryAction, Rejection> {
        let Some(item) = state.item(&id) else {
            return Err(Rejection::ItemNotFound(id));
        };

        if quantity <= 0 {
            return Err(Rejection::NonPositiveQuantity(quantity));
        }

        let removed = u32::try_from(quantity)
            .ok()
            .filter(|removed| *removed <= item.quantity)
            .ok_or(Rejection::InsufficientStock {
                requested: quantity,
                available: item.quantity,
            })?;

        let entry = Self::entry(env, &id, HistoryAction::Withdraw, quantity, clean_purpose(purpose));
        Ok(InventoryAction::ItemWithdrawn {
            id,
            quantity: removed,
            entry,
        })
    }

    /// Validates an `EditItem` command
    fn validate_edit_item(
        state: &InventoryState,
        id: ItemId,
        changes: ItemChanges,
        env: &InventoryEnvironment,
    ) -> Result<InventoryAction, Rejection> {
        let Some(current) = state.item(&id) else {
            return Err(Rejection::ItemNotFound(id));
        };

        if changes.is_empty() {
            return Err(Rejection::NothingToEdit);
        }

        let mut item = current.clone();
        if let Some(name) = changes.name {
            item.name = non_empty(&name)?;
        }
        if let Some(category_id) = changes.category_id {
            if state.category(&category_id).is_none() {
                return Err(Rejection::UnknownCategory(category_id));
            }
            item.category = category_id;
        }
        if let Some(threshold) = changes.threshold {
            item.threshold = valid_threshold(threshold)?;
        }

        let entry = Self::entry(env, &id, HistoryAction::Edit, 0, None);
        Ok(InventoryAction::ItemEdited { item, entry })
    }

    /// Validates a `DeleteItem` command
    fn validate_delete_item(
        state: &InventoryState,
        id: ItemId,
        env: &InventoryEnvironment,
    ) -> Result<InventoryAction, Rejection> {
        if state.item(&id).is_none() {
            return Err(Rejection::ItemNotFound(id));
        }

        let entry = Self::entry(env, &id, HistoryAction::Delete, 0, None);
        Ok(InventoryAction::ItemDeleted { id, entry })
    }

    fn entry(
        env: &InventoryEnvironment,
        item_id: &ItemId,
        action: HistoryAction,
        quantity: i64,
        purpose: Option<String>,
    ) -> HistoryEntry {
        HistoryEntry {
            id: HistoryId::new(env.ids.next_id()),
            item_id: item_id.clone(),
            action,
            quantity,
            purpose,
            created_at: env.clock.now(),
        }
    }

    /// Applies an event to state
    fn apply_event(state: &mut InventoryState, action: &InventoryAction) {
        match action {
            InventoryAction::InventoryLoaded { snapshot } => {
                state.categories.clone_from(&snapshot.categories);
                state.items.clone_from(&snapshot.items);
                state.history.clone_from(&snapshot.history);
                state.load = LoadStatus::Ready;
                state.sync_error = None;
            },
            InventoryAction::LoadFailed { error } => {
                state.load = LoadStatus::Failed(error.clone());
            },
            InventoryAction::CategoryAdded { category } => {
                state.categories.push(category.clone());
                state.last_rejection = None;
            },
            InventoryAction::ItemAdded { item, entry } => {
                state.items.push(item.clone());
                state.history.push(entry.clone());
                state.last_rejection = None;
            },
            InventoryAction::ItemRefilled {
                id,
                quantity,
                entry,
            } => {
                if let Some(item) = state.item_mut(id) {
                    item.quantity = item.quantity.saturating_add(*quantity);
                }
                state.history.push(entry.clone());
                state.last_rejection = None;
            },
            InventoryAction::ItemWithdrawn {
                id,
                quantity,
                entry,
            } => {
                if let Some(item) = state.item_mut(id) {
                    item.quantity = item.quantity.saturating_sub(*quantity);
                }
                state.history.push(entry.clone());
                state.last_rejection = None;
            },
            InventoryAction::ItemEdited { item, entry } => {
                if let Some(existing) = state.item_mut(&item.id) {
                    existing.clone_from(item);
                }
                state.history.push(entry.clone());
                state.last_rejection = None;
            },
            InventoryAction::ItemDeleted { id, entry } => {
                state.items.retain(|item| &item.id != id);
                state.history.push(entry.clone());
                state.last_rejection = None;
            },
            InventoryAction::CommandRejected { rejection } => {
                state.last_rejection = Some(rejection.clone());
            },
            InventoryAction::SyncFailed { error } => {
                state.sync_error = Some(error.clone());
            },
            // Commands are not applied to state
            InventoryAction::LoadInventory
            | InventoryAction::AddCategory { .. }
            | InventoryAction::AddItem { .. }
            | InventoryAction::RefillItem { .. }
            | InventoryAction::WithdrawItem { .. }
            | InventoryAction::EditItem { .. }
            | InventoryAction::DeleteItem { .. } => {},
        }
    }

    /// Applies the outcome of a validated command and describes its write-through
    fn commit(
        state: &mut InventoryState,
        outcome: Result<InventoryAction, Rejection>,
        env: &InventoryEnvironment,
    ) -> SmallVec<[Effect<InventoryAction>; 4]> {
        match outcome {
            Ok(event) => {
                Self::apply_event(state, &event);
                smallvec![persist(state, &event, env)]
            },
            Err(rejection) => {
                tracing::warn!(%rejection, "Command rejected");
                metrics::counter!("inventory.commands.rejected").increment(1);
                Self::apply_event(state, &InventoryAction::CommandRejected { rejection });
                SmallVec::new()
            },
        }
    }
}

impl Default for InventoryReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for InventoryReducer {
    type State = InventoryState;
    type Action = InventoryAction;
    type Environment = InventoryEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            InventoryAction::LoadInventory => {
                tracing::info!("Loading inventory");
                state.load = LoadStatus::Loading;
                state.last_rejection = None;
                smallvec![load(&env.source)]
            },

            InventoryAction::AddCategory { name } => {
                let outcome = Self::validate_add_category(&name, env);
                Self::commit(state, outcome, env)
            },

            InventoryAction::AddItem {
                name,
                category_id,
                quantity,
                threshold,
            } => {
                let outcome =
                    Self::validate_add_item(state, &name, category_id, quantity, threshold, env);
                Self::commit(state, outcome, env)
            },

            InventoryAction::RefillItem {
                id,
                quantity,
                purpose,
            } => {
                let outcome = Self::validate_refill_item(state, id, quantity, purpose, env);
                Self::commit(state, outcome, env)
            },

            InventoryAction::WithdrawItem {
                id,
                quantity,
                purpose,
            } => {
                let outcome = Self::validate_withdraw_item(state, id, quantity, purpose, env);
                Self::commit(state, outcome, env)
            },

            InventoryAction::EditItem { id, changes } => {
                let outcome = Self::validate_edit_item(state, id, changes, env);
                Self::commit(state, outcome, env)
            },

            InventoryAction::DeleteItem { id } => {
                let outcome = Self::validate_delete_item(state, id, env);
                Self::commit(state, outcome, env)
            },

            // ========== Events ==========
            InventoryAction::InventoryLoaded { .. }
            | InventoryAction::LoadFailed { .. }
            | InventoryAction::CategoryAdded { .. }
            | InventoryAction::ItemAdded { .. }
            | InventoryAction::ItemRefilled { .. }
            | InventoryAction::ItemWithdrawn { .. }
            | InventoryAction::ItemEdited { .. }
            | InventoryAction::ItemDeleted { .. }
            | InventoryAction::CommandRejected { .. }
            | InventoryAction::SyncFailed { .. } => {
                if let InventoryAction::LoadFailed { error } | InventoryAction::SyncFailed { error } =
                    &action
                {
                    tracing::warn!(%error, "Inventory source failed");
                }
                Self::apply_event(state, &action);
                SmallVec::new()
            },
        }
    }
}

fn non_empty(name: &str) -> Result<String, Rejection> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(Rejection::EmptyName)
    } else {
        Ok(trimmed.to_string())
    }
}

fn valid_threshold(threshold: i64) -> Result<u32, Rejection> {
    u32::try_from(threshold)
        .ok()
        .filter(|threshold| *threshold >= 1)
        .ok_or(Rejection::InvalidThreshold(threshold))
}

fn clean_purpose(purpose: Option<String>) -> Option<String> {
    purpose
        .map(|purpose| purpose.trim().to_string())
        .filter(|purpose| !purpose.is_empty())
}

fn sync_failed(error: &impl std::fmt::Display) -> InventoryAction {
    InventoryAction::SyncFailed {
        error: error.to_string(),
    }
}

/// Reads all three collections concurrently; any failure fails the load
fn load(source: &Arc<dyn InventorySource>) -> Effect<InventoryAction> {
    let source = Arc::clone(source);
    async_effect! {
        let result = tokio::try_join!(
            source.load_categories(),
            source.load_items(),
            source.load_history(),
        );

        Some(match result {
            Ok((categories, items, history)) => InventoryAction::InventoryLoaded {
                snapshot: Snapshot {
                    categories,
                    items,
                    history,
                },
            },
            Err(error) => InventoryAction::LoadFailed {
                error: error.to_string(),
            },
        })
    }
}

/// A single call against the data source
#[derive(Debug)]
enum Write {
    CreateCategory(Category),
    SaveItem(Item),
    DeleteItem(ItemId),
    AppendHistory(HistoryEntry),
}

impl Write {
    async fn run(&self, source: &dyn InventorySource) -> Result<(), SourceError> {
        match self {
            Self::CreateCategory(category) => source.create_category(category).await,
            Self::SaveItem(item) => source.save_item(item).await,
            Self::DeleteItem(id) => source.delete_item(id).await,
            Self::AppendHistory(entry) => source.append_history(entry).await,
        }
    }
}

/// Write-through for an event already applied to `state`
///
/// Writes run in order once every earlier command's writes are done; the
/// first failure stops the rest and is fed back as `SyncFailed`.
fn persist(
    state: &InventoryState,
    event: &InventoryAction,
    env: &InventoryEnvironment,
) -> Effect<InventoryAction> {
    let writes = match event {
        InventoryAction::CategoryAdded { category } => {
            vec![Write::CreateCategory(category.clone())]
        },
        InventoryAction::ItemAdded { item, entry } | InventoryAction::ItemEdited { item, entry } => {
            vec![Write::SaveItem(item.clone()), Write::AppendHistory(entry.clone())]
        },
        InventoryAction::ItemRefilled { id, entry, .. }
        | InventoryAction::ItemWithdrawn { id, entry, .. } => {
            // The event carries the delta; the item is saved as it now stands.
            let mut writes: Vec<Write> = state
                .item(id)
                .map(|item| Write::SaveItem(item.clone()))
                .into_iter()
                .collect();
            writes.push(Write::AppendHistory(entry.clone()));
            writes
        },
        InventoryAction::ItemDeleted { id, entry } => {
            vec![Write::DeleteItem(id.clone()), Write::AppendHistory(entry.clone())]
        },
        _ => return Effect::None,
    };

    let source = Arc::clone(&env.source);
    let ticket = env.writes.ticket();
    fallible_effect! {
        run: write_in_turn(ticket, source, writes),
        on_error: |error| sync_failed(&error)
    }
}

async fn write_in_turn(
    ticket: WriteTicket,
    source: Arc<dyn InventorySource>,
    writes: Vec<Write>,
) -> Result<(), SourceError> {
    ticket.turn().await;
    for write in &writes {
        write.run(source.as_ref()).await?;
    }
    Ok(())
}
