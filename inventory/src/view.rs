//! Derived views over the inventory.
//!
//! Everything here is a pure function of [`InventoryState`] and the
//! dashboard's [`ViewState`]. Nothing is cached; views are recomputed on
//! every read and borrow from the state.

use crate::types::{CategoryId, HistoryAction, HistoryEntry, InventoryState, Item, ItemId};
use serde::{Deserialize, Serialize};

/// Name shown for items whose category no longer resolves
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Which categories an item list shows
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CategoryFilter {
    /// Every category
    #[default]
    All,
    /// One category only
    Only(CategoryId),
}

impl CategoryFilter {
    fn matches(&self, item: &Item) -> bool {
        match self {
            Self::All => true,
            Self::Only(id) => &item.category == id,
        }
    }
}

/// Search and category criteria for the item list
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Case-insensitive substring of the item name; empty matches everything
    pub search_term: String,
    /// Category restriction
    pub category: CategoryFilter,
}

impl Filter {
    /// Whether `item` passes both criteria
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        self.category.matches(item) && name_contains(&item.name, &self.search_term)
    }
}

fn name_contains(name: &str, term: &str) -> bool {
    term.is_empty() || name.to_lowercase().contains(&term.to_lowercase())
}

/// Items passing `filter`, in insertion order
#[must_use]
pub fn filtered_items<'a>(state: &'a InventoryState, filter: &Filter) -> Vec<&'a Item> {
    state.items().iter().filter(|item| filter.matches(item)).collect()
}

/// Filtered items below their threshold, in insertion order
#[must_use]
pub fn low_stock_items<'a>(state: &'a InventoryState, filter: &Filter) -> Vec<&'a Item> {
    state
        .items()
        .iter()
        .filter(|item| filter.matches(item) && item.is_low())
        .collect()
}

/// Headline counts over the full collections
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Items currently stocked
    pub total_items: usize,
    /// Categories defined
    pub total_categories: usize,
    /// Refill entries in history
    pub total_refills: usize,
    /// Withdraw entries in history
    pub total_withdrawals: usize,
}

/// Counts shown on the dashboard header; ignores the filter
#[must_use]
pub fn stats(state: &InventoryState) -> Stats {
    let count = |action: HistoryAction| {
        state
            .history()
            .iter()
            .filter(|entry| entry.action == action)
            .count()
    };

    Stats {
        total_items: state.items().len(),
        total_categories: state.categories().len(),
        total_refills: count(HistoryAction::Refill),
        total_withdrawals: count(HistoryAction::Withdraw),
    }
}

/// All history, most recent first
#[must_use]
pub fn recent_history(state: &InventoryState) -> Vec<&HistoryEntry> {
    state.history().iter().rev().collect()
}

/// One item's history, most recent first; still answers after deletion
#[must_use]
pub fn item_history<'a>(state: &'a InventoryState, id: &ItemId) -> Vec<&'a HistoryEntry> {
    state
        .history()
        .iter()
        .rev()
        .filter(|entry| &entry.item_id == id)
        .collect()
}

/// Display name of a category, or [`UNCATEGORIZED`]
#[must_use]
pub fn category_name<'a>(state: &'a InventoryState, id: &CategoryId) -> &'a str {
    state
        .category(id)
        .map_or(UNCATEGORIZED, |category| category.name.as_str())
}

/// Dialogs the dashboard can show
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modal {
    /// New item form
    AddItem,
    /// New category form
    AddCategory,
    /// Refill form for the active item
    RefillItem,
    /// Withdraw form for the active item
    WithdrawItem,
    /// Delete confirmation for the active item
    DeleteConfirm,
    /// Low-stock alert list
    LowStock,
    /// History of the active item
    ItemHistory,
}

/// Top-level screens
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    /// Stats, low-stock banner and the item list
    #[default]
    Dashboard,
    /// Category management
    Categories,
    /// Full movement history
    History,
}

/// Presentation state of the dashboard
///
/// Transitions consume `self` and return the next state; none of them touch
/// the inventory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// Item list criteria
    pub filter: Filter,
    /// Dialogs currently open, in the order they were opened
    pub open_modals: Vec<Modal>,
    /// Item targeted by the refill, withdraw, delete and history dialogs
    pub active_item: Option<ItemId>,
    /// Screen shown
    pub page: Page,
}

impl ViewState {
    /// Initial state: dashboard page, no filter, nothing open
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `modal`, targeting `item` when given
    #[must_use]
    pub fn open_modal(mut self, modal: Modal, item: Option<ItemId>) -> Self {
        if !self.open_modals.contains(&modal) {
            self.open_modals.push(modal);
        }
        if item.is_some() {
            self.active_item = item;
        }
        self
    }

    /// Closes `modal` and clears the active item
    #[must_use]
    pub fn close_modal(mut self, modal: Modal) -> Self {
        self.open_modals.retain(|open| *open != modal);
        self.active_item = None;
        self
    }

    /// Replaces the search term
    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.filter.search_term = term.into();
        self
    }

    /// Replaces the category filter
    #[must_use]
    pub fn with_category_filter(mut self, category: CategoryFilter) -> Self {
        self.filter.category = category;
        self
    }

    /// Switches to `page`
    #[must_use]
    pub fn navigate(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    /// Whether `modal` is open
    #[must_use]
    pub fn is_open(&self, modal: Modal) -> bool {
        self.open_modals.contains(&modal)
    }
}
