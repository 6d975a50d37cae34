//! Inventory tracking built on the Stockroom reducer architecture.
//!
//! The inventory is three collections (categories, items and an append-only
//! stock movement history) owned by a single [`InventoryState`]. All changes
//! go through [`InventoryReducer`], which validates each command, records a
//! history entry, and describes the write-through to the configured data
//! source as an effect. Read-only views (filtered item list, low-stock
//! alerts, headline counts, recent history) are pure functions in [`view`].
//!
//! # Quick Start
//!
//! ```no_run
//! use stockroom_inventory::{CategoryId, Config, Dashboard};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dashboard = Dashboard::from_config(&Config::from_env())?;
//! dashboard.load().await?;
//!
//! let drill = dashboard
//!     .add_item("Cordless Drill", CategoryId::new("cat3"), 2, 3)
//!     .await?;
//! dashboard.withdraw(drill, 1, Some("Site visit".into())).await?;
//!
//! for item in dashboard.low_stock_items().await {
//!     println!("{} is low: {}/{}", item.name, item.quantity, item.threshold);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dashboard;
pub mod error;
pub mod reducer;
pub mod source;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use config::{Config, SourceConfig, SourceKind};
pub use dashboard::{Dashboard, InventoryStore};
pub use error::{DashboardError, Rejection, SourceError};
pub use reducer::{InventoryEnvironment, InventoryReducer};
pub use source::{InventorySource, MockSource, RestSource};
pub use types::{
    Category, CategoryId, HistoryAction, HistoryEntry, HistoryId, InventoryAction, InventoryState,
    Item, ItemChanges, ItemId, LoadStatus, Snapshot,
};
pub use view::{CategoryFilter, Filter, Modal, Page, Stats, ViewState};
