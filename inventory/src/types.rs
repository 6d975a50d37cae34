//! Domain types for the inventory dashboard.
//!
//! Three collections make up the inventory: categories, items, and an
//! append-only history of stock movements. Wire names (`_id`, `itemId`,
//! `createdAt`) follow the records served by the inventory backend.

use crate::error::Rejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Color given to categories created without one
pub const DEFAULT_CATEGORY_COLOR: &str = "#6b7280";

/// Purpose recorded on the history entry of a newly added item
pub const INITIAL_STOCK_PURPOSE: &str = "Initial stock";

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an identifier issued by a generator or the backend
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the raw identifier
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

opaque_id!(
    /// Unique identifier for a category
    CategoryId
);
opaque_id!(
    /// Unique identifier for an item
    ItemId
);
opaque_id!(
    /// Unique identifier for a history entry
    HistoryId
);

/// A grouping of items with a display color
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: CategoryId,
    /// Display name
    pub name: String,
    /// Display hint, e.g. `#3b82f6`
    pub color: String,
}

/// A stocked item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Category the item belongs to
    ///
    /// The backend may embed the whole category; only its id is kept.
    #[serde(deserialize_with = "category_reference")]
    pub category: CategoryId,
    /// Units on hand
    pub quantity: u32,
    /// Units below which the item counts as low stock
    pub threshold: u32,
}

impl Item {
    /// Whether the item is below its threshold
    #[must_use]
    pub const fn is_low(&self) -> bool {
        self.quantity < self.threshold
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryReference {
    Embedded {
        #[serde(rename = "_id")]
        id: CategoryId,
    },
    Id(CategoryId),
}

fn category_reference<'de, D>(deserializer: D) -> Result<CategoryId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match CategoryReference::deserialize(deserializer)? {
        CategoryReference::Embedded { id } | CategoryReference::Id(id) => id,
    })
}

/// Kind of stock movement recorded in history
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryAction {
    /// Item created with its initial stock
    Add,
    /// Stock added
    Refill,
    /// Stock removed
    Withdraw,
    /// Item removed
    Delete,
    /// Item details changed
    Edit,
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Add => "Add",
            Self::Refill => "Refill",
            Self::Withdraw => "Withdraw",
            Self::Delete => "Delete",
            Self::Edit => "Edit",
        };
        f.pad(label)
    }
}

/// Immutable record of one inventory-affecting action
///
/// `item_id` is a weak reference: entries outlive the item they describe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: HistoryId,
    /// Item the movement applied to
    pub item_id: ItemId,
    /// What happened
    pub action: HistoryAction,
    /// Units moved; 0 for deletes and edits
    pub quantity: i64,
    /// Free-text reason given by the operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// When the movement was recorded
    pub created_at: DateTime<Utc>,
}

/// The three collections as read from a data source
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// All categories
    pub categories: Vec<Category>,
    /// All items
    pub items: Vec<Item>,
    /// All history entries, oldest first
    pub history: Vec<HistoryEntry>,
}

/// Progress of the batch read that seeds the store
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum LoadStatus {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Reads in flight
    Loading,
    /// Collections replaced with the source's data
    Ready,
    /// One of the reads failed; retry with another load
    Failed(String),
}

/// Partial update applied by [`InventoryAction::EditItem`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChanges {
    /// New display name
    pub name: Option<String>,
    /// New category
    pub category_id: Option<CategoryId>,
    /// New low-stock threshold
    pub threshold: Option<i64>,
}

impl ItemChanges {
    /// Whether no field would change
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.category_id.is_none() && self.threshold.is_none()
    }
}

/// State owned by the inventory store
///
/// Only [`crate::InventoryReducer`] mutates it; everything else reads through
/// the accessors.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InventoryState {
    pub(crate) categories: Vec<Category>,
    pub(crate) items: Vec<Item>,
    pub(crate) history: Vec<HistoryEntry>,
    pub(crate) load: LoadStatus,
    pub(crate) last_rejection: Option<Rejection>,
    pub(crate) sync_error: Option<String>,
}

impl InventoryState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state holding the given collections
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            categories: snapshot.categories,
            items: snapshot.items,
            history: snapshot.history,
            ..Self::default()
        }
    }

    /// All categories in insertion order
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// All items in insertion order
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// All history entries, oldest first
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Looks up an item
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Looks up a category
    #[must_use]
    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| &category.id == id)
    }

    /// History entries for one item, oldest first
    ///
    /// Still answers after the item has been deleted.
    pub fn history_for<'a>(
        &'a self,
        id: &ItemId,
    ) -> impl Iterator<Item = &'a HistoryEntry> + use<'a> {
        let id = id.clone();
        self.history.iter().filter(move |entry| entry.item_id == id)
    }

    /// Progress of the last batch load
    #[must_use]
    pub const fn load_status(&self) -> &LoadStatus {
        &self.load
    }

    /// Why the most recent command was rejected, if it was
    #[must_use]
    pub const fn last_rejection(&self) -> Option<&Rejection> {
        self.last_rejection.as_ref()
    }

    /// Last write-through failure reported by the data source
    #[must_use]
    pub fn sync_error(&self) -> Option<&str> {
        self.sync_error.as_deref()
    }

    pub(crate) fn item_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| &item.id == id)
    }
}

/// Actions representing commands and events for the inventory
///
/// Commands express intent and are validated by the reducer. Events record
/// what happened and are applied to state as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryAction {
    // ========== Commands ==========
    /// Command: Read all three collections from the data source
    LoadInventory,

    /// Command: Create a category
    AddCategory {
        /// Display name
        name: String,
    },

    /// Command: Create an item with its initial stock
    AddItem {
        /// Display name
        name: String,
        /// Category the item belongs to
        category_id: CategoryId,
        /// Initial units on hand
        quantity: i64,
        /// Low-stock threshold
        threshold: i64,
    },

    /// Command: Add stock to an item
    RefillItem {
        /// Item to refill
        id: ItemId,
        /// Units to add
        quantity: i64,
        /// Reason recorded in history
        purpose: Option<String>,
    },

    /// Command: Remove stock from an item
    WithdrawItem {
        /// Item to withdraw from
        id: ItemId,
        /// Units to remove
        quantity: i64,
        /// Reason recorded in history
        purpose: Option<String>,
    },

    /// Command: Change an item's name, category or threshold
    EditItem {
        /// Item to edit
        id: ItemId,
        /// Fields to change
        changes: ItemChanges,
    },

    /// Command: Remove an item
    DeleteItem {
        /// Item to remove
        id: ItemId,
    },

    // ========== Events ==========
    /// Event: The batch load finished
    InventoryLoaded {
        /// Collections read from the source
        snapshot: Snapshot,
    },

    /// Event: The batch load failed
    LoadFailed {
        /// Error message
        error: String,
    },

    /// Event: A category was created
    CategoryAdded {
        /// The new category
        category: Category,
    },

    /// Event: An item was created
    ItemAdded {
        /// The new item
        item: Item,
        /// Its `Add` history entry
        entry: HistoryEntry,
    },

    /// Event: Stock was added
    ItemRefilled {
        /// Item refilled
        id: ItemId,
        /// Units added
        quantity: u32,
        /// Its `Refill` history entry
        entry: HistoryEntry,
    },

    /// Event: Stock was removed
    ItemWithdrawn {
        /// Item withdrawn from
        id: ItemId,
        /// Units removed
        quantity: u32,
        /// Its `Withdraw` history entry
        entry: HistoryEntry,
    },

    /// Event: Item details changed
    ItemEdited {
        /// The item after the change
        item: Item,
        /// Its `Edit` history entry
        entry: HistoryEntry,
    },

    /// Event: An item was removed
    ItemDeleted {
        /// Item removed
        id: ItemId,
        /// Its `Delete` history entry
        entry: HistoryEntry,
    },

    /// Event: A command failed validation
    CommandRejected {
        /// Why it was rejected
        rejection: Rejection,
    },

    /// Event: Writing a change through to the data source failed
    SyncFailed {
        /// Error message
        error: String,
    },
}

impl InventoryAction {
    /// Whether this action is a command
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::LoadInventory
                | Self::AddCategory { .. }
                | Self::AddItem { .. }
                | Self::RefillItem { .. }
                | Self::WithdrawItem { .. }
                | Self::EditItem { .. }
                | Self::DeleteItem { .. }
        )
    }

    /// Whether this action is an event
    #[must_use]
    pub const fn is_event(&self) -> bool {
        !self.is_command()
    }
}
