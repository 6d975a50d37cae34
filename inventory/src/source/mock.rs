//! In-memory data source.

use super::{InventorySource, SourceFuture};
use crate::error::SourceError;
use crate::types::{
    Category, CategoryId, HistoryAction, HistoryEntry, HistoryId, Item, ItemId, Snapshot,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory inventory records
///
/// Reads return clones of the held collections; writes update them, so a
/// reload reflects every change written through. [`MockSource::set_offline`]
/// makes every call fail, which is how load failures are exercised.
#[derive(Debug, Default)]
pub struct MockSource {
    records: Mutex<Snapshot>,
    offline: AtomicBool,
}

impl MockSource {
    /// A source with no records
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A source holding the given records
    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            records: Mutex::new(snapshot),
            offline: AtomicBool::new(false),
        }
    }

    /// A source holding the demo warehouse: four categories, five items and
    /// four history entries
    #[must_use]
    pub fn seeded() -> Self {
        Self::with_snapshot(demo_snapshot())
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Copy of the records as currently held
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.records().clone()
    }

    fn records(&self) -> MutexGuard<'_, Snapshot> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_online(&self) -> Result<(), SourceError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SourceError::Unavailable("mock source is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> Result<T, SourceError> {
        self.check_online()?;
        Ok(f(&*self.records()))
    }

    fn write(&self, f: impl FnOnce(&mut Snapshot)) -> Result<(), SourceError> {
        self.check_online()?;
        f(&mut *self.records());
        Ok(())
    }
}

impl InventorySource for MockSource {
    fn load_categories(&self) -> SourceFuture<'_, Vec<Category>> {
        let result = self.read(|records| records.categories.clone());
        Box::pin(async move { result })
    }

    fn load_items(&self) -> SourceFuture<'_, Vec<Item>> {
        let result = self.read(|records| records.items.clone());
        Box::pin(async move { result })
    }

    fn load_history(&self) -> SourceFuture<'_, Vec<HistoryEntry>> {
        let result = self.read(|records| records.history.clone());
        Box::pin(async move { result })
    }

    fn create_category<'a>(&'a self, category: &'a Category) -> SourceFuture<'a, ()> {
        let result = self.write(|records| records.categories.push(category.clone()));
        Box::pin(async move { result })
    }

    fn save_item<'a>(&'a self, item: &'a Item) -> SourceFuture<'a, ()> {
        let result = self.write(|records| {
            if let Some(index) = records.items.iter().position(|existing| existing.id == item.id) {
                records.items[index] = item.clone();
            } else {
                records.items.push(item.clone());
            }
        });
        Box::pin(async move { result })
    }

    fn delete_item<'a>(&'a self, id: &'a ItemId) -> SourceFuture<'a, ()> {
        let result = self.write(|records| records.items.retain(|item| &item.id != id));
        Box::pin(async move { result })
    }

    fn append_history<'a>(&'a self, entry: &'a HistoryEntry) -> SourceFuture<'a, ()> {
        let result = self.write(|records| records.history.push(entry.clone()));
        Box::pin(async move { result })
    }
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

fn category(id: &str, name: &str, color: &str) -> Category {
    Category {
        id: CategoryId::new(id),
        name: name.to_string(),
        color: color.to_string(),
    }
}

fn item(id: &str, name: &str, category: &str, quantity: u32, threshold: u32) -> Item {
    Item {
        id: ItemId::new(id),
        name: name.to_string(),
        category: CategoryId::new(category),
        quantity,
        threshold,
    }
}

fn entry(
    id: &str,
    item_id: &str,
    action: HistoryAction,
    quantity: i64,
    purpose: &str,
    created_at: DateTime<Utc>,
) -> HistoryEntry {
    HistoryEntry {
        id: HistoryId::new(id),
        item_id: ItemId::new(item_id),
        action,
        quantity,
        purpose: Some(purpose.to_string()),
        created_at,
    }
}

/// Demo records shown when no backend is configured
#[must_use]
pub fn demo_snapshot() -> Snapshot {
    Snapshot {
        categories: vec![
            category("cat1", "Electronics", "#3b82f6"),
            category("cat2", "Office Supplies", "#10b981"),
            category("cat3", "Tools", "#f59e0b"),
            category("cat4", "Consumables", "#ef4444"),
        ],
        items: vec![
            item("item1", "Dell Monitor", "cat1", 3, 5),
            item("item2", "A4 Paper (Ream)", "cat2", 20, 10),
            item("item3", "Cordless Drill", "cat3", 2, 3),
            item("item4", "Ink Cartridge", "cat4", 8, 10),
            item("item5", "USB-C Cable", "cat1", 15, 5),
        ],
        history: vec![
            entry("h1", "item1", HistoryAction::Add, 5, "Initial stock", at(2024, 7, 20, 10, 0)),
            entry("h2", "item2", HistoryAction::Refill, 30, "Bulk order", at(2024, 7, 22, 14, 30)),
            entry("h3", "item1", HistoryAction::Withdraw, 2, "IT Dept", at(2024, 7, 24, 9, 15)),
            entry("h4", "item3", HistoryAction::Withdraw, 1, "Maintenance", at(2024, 7, 25, 11, 0)),
        ],
    }
}
