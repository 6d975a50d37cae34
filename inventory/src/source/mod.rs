//! Data sources that seed and persist the inventory.
//!
//! The reducer never talks to a backend directly: it describes reads and
//! writes as effects that call an [`InventorySource`] injected through the
//! environment. Which implementation runs is decided at composition time.
//!
//! - [`MockSource`]: in-memory records, seeded with demo data
//! - [`RestSource`]: JSON over HTTP against an inventory backend
//!
//! Note: Methods return boxed futures instead of using `async fn` so the trait
//! stays dyn-compatible (object-safe).

use crate::error::SourceError;
use crate::types::{Category, HistoryEntry, Item, ItemId};
use std::future::Future;
use std::pin::Pin;

mod mock;
mod queue;
mod rest;

pub use mock::{MockSource, demo_snapshot};
pub use queue::{WriteQueue, WriteTicket};
pub use rest::RestSource;

/// Future returned by every [`InventorySource`] operation
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Read and write access to the inventory collections
pub trait InventorySource: Send + Sync {
    /// Read all categories
    fn load_categories(&self) -> SourceFuture<'_, Vec<Category>>;

    /// Read all items
    fn load_items(&self) -> SourceFuture<'_, Vec<Item>>;

    /// Read all history entries, oldest first
    fn load_history(&self) -> SourceFuture<'_, Vec<HistoryEntry>>;

    /// Store a new category
    fn create_category<'a>(&'a self, category: &'a Category) -> SourceFuture<'a, ()>;

    /// Create or replace an item
    fn save_item<'a>(&'a self, item: &'a Item) -> SourceFuture<'a, ()>;

    /// Remove an item
    fn delete_item<'a>(&'a self, id: &'a ItemId) -> SourceFuture<'a, ()>;

    /// Append a history entry
    fn append_history<'a>(&'a self, entry: &'a HistoryEntry) -> SourceFuture<'a, ()>;
}
