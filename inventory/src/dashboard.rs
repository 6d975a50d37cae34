//! Dashboard facade over the inventory store.
//!
//! [`Dashboard`] pairs the [`InventoryStore`] with the presentation
//! [`ViewState`]. Commands go through the store and report their outcome as a
//! `Result`; projections read the store through the current view.

use crate::config::Config;
use crate::error::{DashboardError, SourceError};
use crate::reducer::{InventoryEnvironment, InventoryReducer};
use crate::types::{
    CategoryId, HistoryEntry, InventoryAction, InventoryState, Item, ItemChanges, ItemId,
};
use crate::view::{self, CategoryFilter, Modal, Page, Stats, ViewState};
use std::sync::Arc;
use std::time::Duration;
use stockroom_core::environment::{SystemClock, UuidGenerator};
use stockroom_runtime::{StoreError, Store};

/// Store running the inventory reducer
pub type InventoryStore = Store<InventoryState, InventoryAction, InventoryEnvironment, InventoryReducer>;

/// Inventory store plus the dashboard's view state
pub struct Dashboard {
    store: InventoryStore,
    view: ViewState,
    timeout: Duration,
}

impl Dashboard {
    /// Create a dashboard with an empty store
    ///
    /// `timeout` bounds the batch load and how long each command waits for its
    /// write-through.
    #[must_use]
    pub fn new(env: InventoryEnvironment, timeout: Duration) -> Self {
        Self::with_store(
            Store::new(InventoryState::new(), InventoryReducer::new(), env),
            timeout,
        )
    }

    /// Create a dashboard around an existing store
    #[must_use]
    pub fn with_store(store: InventoryStore, timeout: Duration) -> Self {
        Self {
            store,
            view: ViewState::new(),
            timeout,
        }
    }

    /// Create a dashboard backed by the configured source, wall clock and
    /// UUID identifiers
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the source cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let env = InventoryEnvironment::new(
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
            config.build_source()?,
        );
        Ok(Self::new(env, config.load_timeout()))
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &InventoryStore {
        &self.store
    }

    /// Current presentation state
    #[must_use]
    pub const fn view(&self) -> &ViewState {
        &self.view
    }

    // ========== Loading ==========

    /// Read all collections from the source, replacing the store's contents
    ///
    /// # Errors
    ///
    /// - [`DashboardError::Load`]: a read failed; the store is left as it was
    /// - [`DashboardError::Store`]: the load timed out or the store is shutting down
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<(), DashboardError> {
        let outcome = self
            .store
            .send_and_wait_for(
                InventoryAction::LoadInventory,
                |action| {
                    matches!(
                        action,
                        InventoryAction::InventoryLoaded { .. } | InventoryAction::LoadFailed { .. }
                    )
                },
                self.timeout,
            )
            .await?;

        match outcome {
            InventoryAction::LoadFailed { error } => Err(DashboardError::Load(error)),
            _ => {
                tracing::info!("Inventory loaded");
                Ok(())
            },
        }
    }

    /// Retry a failed load
    ///
    /// # Errors
    ///
    /// Same as [`Dashboard::load`].
    pub async fn reload(&self) -> Result<(), DashboardError> {
        self.load().await
    }

    // ========== Commands ==========

    /// Send a command, read its outcome under the store lock, and wait for
    /// its write-through
    ///
    /// Once the command is applied the result is `Ok`. A write-through that
    /// outlasts the timeout keeps running in order behind the store and
    /// reports failure through `sync_error`.
    async fn execute<T>(
        &self,
        command: InventoryAction,
        created: impl FnOnce(&InventoryState) -> Option<T>,
    ) -> Result<T, DashboardError> {
        let (mut handle, outcome) = self
            .store
            .send_and_inspect(command, |state| match state.last_rejection() {
                Some(rejection) => Err(rejection.clone()),
                None => Ok(created(state)),
            })
            .await?;

        let created = outcome?.ok_or(DashboardError::MissingResult)?;
        if handle.wait_with_timeout(self.timeout).await.is_err() {
            tracing::warn!(
                timeout_ms = self.timeout.as_millis(),
                "Write-through still pending after command was applied"
            );
            metrics::counter!("inventory.writes.pending").increment(1);
        }
        Ok(created)
    }

    /// Create a category
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Rejected`] if the name is empty.
    pub async fn add_category(&self, name: impl Into<String>) -> Result<CategoryId, DashboardError> {
        self.execute(InventoryAction::AddCategory { name: name.into() }, |state| {
            state.categories().last().map(|category| category.id.clone())
        })
        .await
    }

    /// Create an item with its initial stock
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Rejected`] for an empty name, unknown
    /// category, negative quantity or a threshold below one.
    pub async fn add_item(
        &self,
        name: impl Into<String>,
        category_id: CategoryId,
        quantity: i64,
        threshold: i64,
    ) -> Result<ItemId, DashboardError> {
        let command = InventoryAction::AddItem {
            name: name.into(),
            category_id,
            quantity,
            threshold,
        };
        self.execute(command, |state| state.items().last().map(|item| item.id.clone()))
            .await
    }

    /// Add stock to an item
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Rejected`] for an unknown item or a
    /// non-positive quantity.
    pub async fn refill(
        &self,
        id: ItemId,
        quantity: i64,
        purpose: Option<String>,
    ) -> Result<(), DashboardError> {
        let command = InventoryAction::RefillItem {
            id,
            quantity,
            purpose,
        };
        self.execute(command, |_| Some(())).await
    }

    /// Remove stock from an item
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Rejected`] for an unknown item, a
    /// non-positive quantity, or more units than are in stock.
    pub async fn withdraw(
        &self,
        id: ItemId,
        quantity: i64,
        purpose: Option<String>,
    ) -> Result<(), DashboardError> {
        let command = InventoryAction::WithdrawItem {
            id,
            quantity,
            purpose,
        };
        self.execute(command, |_| Some(())).await
    }

    /// Change an item's name, category or threshold
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Rejected`] if the item is unknown or the
    /// changes are empty or invalid.
    pub async fn edit(&self, id: ItemId, changes: ItemChanges) -> Result<(), DashboardError> {
        self.execute(InventoryAction::EditItem { id, changes }, |_| Some(()))
            .await
    }

    /// Remove an item; its history is kept
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Rejected`] if the item is unknown.
    pub async fn delete(&self, id: ItemId) -> Result<(), DashboardError> {
        self.execute(InventoryAction::DeleteItem { id }, |_| Some(()))
            .await
    }

    fn active_item(&self) -> Result<ItemId, DashboardError> {
        self.view
            .active_item
            .clone()
            .ok_or(DashboardError::NoActiveItem)
    }

    fn close(&mut self, modal: Modal) {
        self.view = std::mem::take(&mut self.view).close_modal(modal);
    }

    /// Refill the active item and close the refill dialog
    ///
    /// # Errors
    ///
    /// [`DashboardError::NoActiveItem`] if no item is targeted, otherwise as
    /// [`Dashboard::refill`]. The dialog stays open on error.
    pub async fn refill_active(
        &mut self,
        quantity: i64,
        purpose: Option<String>,
    ) -> Result<(), DashboardError> {
        let id = self.active_item()?;
        self.refill(id, quantity, purpose).await?;
        self.close(Modal::RefillItem);
        Ok(())
    }

    /// Withdraw from the active item and close the withdraw dialog
    ///
    /// # Errors
    ///
    /// [`DashboardError::NoActiveItem`] if no item is targeted, otherwise as
    /// [`Dashboard::withdraw`]. The dialog stays open on error.
    pub async fn withdraw_active(
        &mut self,
        quantity: i64,
        purpose: Option<String>,
    ) -> Result<(), DashboardError> {
        let id = self.active_item()?;
        self.withdraw(id, quantity, purpose).await?;
        self.close(Modal::WithdrawItem);
        Ok(())
    }

    /// Delete the active item and close the confirmation dialog
    ///
    /// # Errors
    ///
    /// [`DashboardError::NoActiveItem`] if no item is targeted, otherwise as
    /// [`Dashboard::delete`]. The dialog stays open on error.
    pub async fn delete_active(&mut self) -> Result<(), DashboardError> {
        let id = self.active_item()?;
        self.delete(id).await?;
        self.close(Modal::DeleteConfirm);
        Ok(())
    }

    // ========== View state ==========

    /// Open a dialog, optionally targeting an item
    pub fn open_modal(&mut self, modal: Modal, item: Option<ItemId>) {
        self.view = std::mem::take(&mut self.view).open_modal(modal, item);
    }

    /// Close a dialog and clear the active item
    pub fn close_modal(&mut self, modal: Modal) {
        self.close(modal);
    }

    /// Set the search term
    pub fn search(&mut self, term: impl Into<String>) {
        self.view = std::mem::take(&mut self.view).with_search(term);
    }

    /// Set the category filter
    pub fn filter_category(&mut self, category: CategoryFilter) {
        self.view = std::mem::take(&mut self.view).with_category_filter(category);
    }

    /// Switch page
    pub fn navigate(&mut self, page: Page) {
        self.view = std::mem::take(&mut self.view).navigate(page);
    }

    // ========== Projections ==========

    /// Copy of the store's state
    pub async fn snapshot(&self) -> InventoryState {
        self.store.state(InventoryState::clone).await
    }

    /// Items passing the current filter
    pub async fn filtered_items(&self) -> Vec<Item> {
        self.store
            .state(|state| {
                view::filtered_items(state, &self.view.filter)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Filtered items below their threshold
    pub async fn low_stock_items(&self) -> Vec<Item> {
        self.store
            .state(|state| {
                view::low_stock_items(state, &self.view.filter)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Headline counts
    pub async fn stats(&self) -> Stats {
        self.store.state(view::stats).await
    }

    /// All history, most recent first
    pub async fn recent_history(&self) -> Vec<HistoryEntry> {
        self.store
            .state(|state| view::recent_history(state).into_iter().cloned().collect())
            .await
    }

    /// History of `id`, most recent first
    pub async fn item_history(&self, id: &ItemId) -> Vec<HistoryEntry> {
        self.store
            .state(|state| view::item_history(state, id).into_iter().cloned().collect())
            .await
    }

    /// Display name of a category
    pub async fn category_name(&self, id: &CategoryId) -> String {
        self.store
            .state(|state| view::category_name(state, id).to_string())
            .await
    }

    /// Stop accepting commands and wait for outstanding write-throughs
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if writes are still running
    /// after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("view", &self.view)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
