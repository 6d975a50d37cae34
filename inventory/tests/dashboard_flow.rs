//! Integration tests for the dashboard facade
//!
//! Runs commands through the real store against an in-memory source and
//! checks both the projected views and what was written through.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use stockroom_inventory::source::SourceFuture;
use stockroom_inventory::{
    Category, CategoryId, Dashboard, DashboardError, HistoryAction, HistoryEntry,
    InventoryEnvironment, InventorySource, Item, ItemChanges, ItemId, LoadStatus, MockSource,
    Modal, Rejection, Stats,
};
use stockroom_testing::{SequentialIds, test_clock};

// ============================================================================
// Test Fixtures
// ============================================================================

fn dashboard_over(source: &Arc<MockSource>) -> Dashboard {
    let shared: Arc<dyn InventorySource> = source.clone();
    let env = InventoryEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(SequentialIds::new("new")),
        shared,
    );
    Dashboard::new(env, Duration::from_secs(5))
}

async fn loaded() -> (Dashboard, Arc<MockSource>) {
    let source = Arc::new(MockSource::seeded());
    let dashboard = dashboard_over(&source);
    dashboard.load().await.unwrap();
    (dashboard, source)
}

/// In-memory source whose first item save stalls
struct SlowFirstSave {
    inner: Arc<MockSource>,
    delay: Duration,
    stalled: AtomicBool,
}

impl SlowFirstSave {
    fn new(inner: Arc<MockSource>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            stalled: AtomicBool::new(false),
        }
    }
}

impl InventorySource for SlowFirstSave {
    fn load_categories(&self) -> SourceFuture<'_, Vec<Category>> {
        self.inner.load_categories()
    }

    fn load_items(&self) -> SourceFuture<'_, Vec<Item>> {
        self.inner.load_items()
    }

    fn load_history(&self) -> SourceFuture<'_, Vec<HistoryEntry>> {
        self.inner.load_history()
    }

    fn create_category<'a>(&'a self, category: &'a Category) -> SourceFuture<'a, ()> {
        self.inner.create_category(category)
    }

    fn save_item<'a>(&'a self, item: &'a Item) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.save_item(item).await
        })
    }

    fn delete_item<'a>(&'a self, id: &'a ItemId) -> SourceFuture<'a, ()> {
        self.inner.delete_item(id)
    }

    fn append_history<'a>(&'a self, entry: &'a HistoryEntry) -> SourceFuture<'a, ()> {
        self.inner.append_history(entry)
    }
}

fn drill() -> ItemId {
    ItemId::new("item3")
}

async fn quantity_of(dashboard: &Dashboard, id: &ItemId) -> Option<u32> {
    dashboard.snapshot().await.item(id).map(|item| item.quantity)
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn load_populates_the_store() {
    let (dashboard, _source) = loaded().await;

    let state = dashboard.snapshot().await;
    assert_eq!(state.load_status(), &LoadStatus::Ready);
    assert_eq!(
        dashboard.stats().await,
        Stats {
            total_items: 5,
            total_categories: 4,
            total_refills: 1,
            total_withdrawals: 2,
        }
    );
}

#[tokio::test]
async fn failed_load_can_be_retried() {
    let source = Arc::new(MockSource::seeded());
    source.set_offline(true);
    let dashboard = dashboard_over(&source);

    let error = dashboard.load().await.unwrap_err();
    assert!(matches!(error, DashboardError::Load(ref message) if message.contains("offline")));
    assert!(matches!(
        dashboard.snapshot().await.load_status(),
        LoadStatus::Failed(_)
    ));
    assert_eq!(dashboard.stats().await.total_items, 0);

    source.set_offline(false);
    dashboard.reload().await.unwrap();

    assert_eq!(dashboard.snapshot().await.load_status(), &LoadStatus::Ready);
    assert_eq!(dashboard.stats().await.total_items, 5);
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn drill_goes_low_then_recovers() {
    let (dashboard, _source) = loaded().await;

    dashboard
        .withdraw(drill(), 1, Some("Site visit".to_string()))
        .await
        .unwrap();
    assert_eq!(quantity_of(&dashboard, &drill()).await, Some(1));
    assert!(
        dashboard
            .low_stock_items()
            .await
            .iter()
            .any(|item| item.id == drill())
    );

    dashboard.refill(drill(), 5, None).await.unwrap();
    assert_eq!(quantity_of(&dashboard, &drill()).await, Some(6));
    assert!(
        !dashboard
            .low_stock_items()
            .await
            .iter()
            .any(|item| item.id == drill())
    );

    let history = dashboard.item_history(&drill()).await;
    assert_eq!(history[0].action, HistoryAction::Refill);
    assert_eq!(history[0].quantity, 5);
    assert_eq!(history[1].action, HistoryAction::Withdraw);
    assert_eq!(history[1].quantity, 1);
    assert_eq!(history[1].purpose.as_deref(), Some("Site visit"));
}

#[tokio::test]
async fn empty_category_name_is_rejected() {
    let (dashboard, _source) = loaded().await;

    let result = dashboard.add_category("").await;

    assert_eq!(result, Err(DashboardError::Rejected(Rejection::EmptyName)));
    assert_eq!(dashboard.stats().await.total_categories, 4);
}

#[tokio::test]
async fn over_withdrawal_leaves_stock_alone() {
    let (dashboard, source) = loaded().await;

    let result = dashboard.withdraw(drill(), 3, None).await;

    assert_eq!(
        result,
        Err(DashboardError::Rejected(Rejection::InsufficientStock {
            requested: 3,
            available: 2,
        }))
    );
    assert_eq!(quantity_of(&dashboard, &drill()).await, Some(2));
    assert_eq!(source.snapshot().history.len(), 4);
}

#[tokio::test]
async fn new_records_are_written_through() {
    let (dashboard, source) = loaded().await;

    let safety = dashboard.add_category("Safety Gear").await.unwrap();
    assert_eq!(safety, CategoryId::new("new-1"));

    let goggles = dashboard
        .add_item("Safety Goggles", safety.clone(), 0, 4)
        .await
        .unwrap();
    assert_eq!(goggles, ItemId::new("new-2"));

    dashboard.refill(goggles.clone(), 10, None).await.unwrap();

    let stored = source.snapshot();
    assert!(stored.categories.iter().any(|category| category.id == safety));
    let saved = stored.items.iter().find(|item| item.id == goggles).unwrap();
    assert_eq!(saved.quantity, 10);
    assert_eq!(stored.history.len(), 6);
    assert_eq!(stored.history[4].action, HistoryAction::Add);
    assert_eq!(stored.history[5].action, HistoryAction::Refill);
}

#[tokio::test]
async fn edits_are_written_through() {
    let (dashboard, source) = loaded().await;

    dashboard
        .edit(
            drill(),
            ItemChanges {
                threshold: Some(1),
                ..ItemChanges::default()
            },
        )
        .await
        .unwrap();

    assert!(dashboard.low_stock_items().await.iter().all(|item| item.id != drill()));
    let stored = source.snapshot();
    assert_eq!(
        stored.items.iter().find(|item| item.id == drill()).unwrap().threshold,
        1
    );
    assert_eq!(stored.history.last().unwrap().action, HistoryAction::Edit);
}

#[tokio::test]
async fn delete_keeps_history_queryable() {
    let (dashboard, source) = loaded().await;
    let monitor = ItemId::new("item1");

    dashboard.delete(monitor.clone()).await.unwrap();

    assert!(dashboard.filtered_items().await.iter().all(|item| item.id != monitor));
    assert!(dashboard.low_stock_items().await.iter().all(|item| item.id != monitor));
    assert_eq!(dashboard.stats().await.total_items, 4);

    let history = dashboard.item_history(&monitor).await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].action, HistoryAction::Delete);

    assert!(source.snapshot().items.iter().all(|item| item.id != monitor));

    let again = dashboard.delete(monitor.clone()).await;
    assert_eq!(
        again,
        Err(DashboardError::Rejected(Rejection::ItemNotFound(monitor)))
    );
}

#[tokio::test]
async fn write_failure_is_reported_but_local_change_kept() {
    let (dashboard, source) = loaded().await;
    source.set_offline(true);

    dashboard.withdraw(drill(), 1, None).await.unwrap();

    let state = dashboard.snapshot().await;
    assert_eq!(state.item(&drill()).unwrap().quantity, 1);
    assert!(state.sync_error().unwrap().contains("offline"));

    source.set_offline(false);
    assert_eq!(
        source
            .snapshot()
            .items
            .iter()
            .find(|item| item.id == drill())
            .unwrap()
            .quantity,
        2
    );
}

#[tokio::test]
async fn slow_write_through_does_not_fail_an_applied_command() {
    let source = Arc::new(MockSource::seeded());
    let slow: Arc<dyn InventorySource> =
        Arc::new(SlowFirstSave::new(Arc::clone(&source), Duration::from_millis(300)));
    let env = InventoryEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(SequentialIds::new("new")),
        slow,
    );
    let mut dashboard = Dashboard::new(env, Duration::from_millis(100));
    dashboard.load().await.unwrap();

    dashboard.open_modal(Modal::RefillItem, Some(drill()));
    dashboard.refill_active(5, None).await.unwrap();
    assert!(!dashboard.view().is_open(Modal::RefillItem));
    assert_eq!(quantity_of(&dashboard, &drill()).await, Some(7));

    dashboard.withdraw(drill(), 3, None).await.unwrap();
    assert_eq!(quantity_of(&dashboard, &drill()).await, Some(4));

    dashboard.shutdown(Duration::from_secs(2)).await.unwrap();

    let stored = source.snapshot();
    let saved = stored.items.iter().find(|item| item.id == drill()).unwrap();
    assert_eq!(saved.quantity, 4);
    assert_eq!(stored.history.len(), 6);
    assert_eq!(stored.history[4].action, HistoryAction::Refill);
    assert_eq!(stored.history[5].action, HistoryAction::Withdraw);
    assert_eq!(dashboard.snapshot().await.sync_error(), None);
}

// ============================================================================
// View state
// ============================================================================

#[tokio::test]
async fn search_narrows_the_item_list() {
    let (mut dashboard, _source) = loaded().await;

    dashboard.search("DRILL");
    let names: Vec<String> = dashboard
        .filtered_items()
        .await
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(names, vec!["Cordless Drill"]);

    dashboard.search("");
    assert_eq!(dashboard.filtered_items().await.len(), 5);
}

#[tokio::test]
async fn active_item_commands_close_their_dialog() {
    let (mut dashboard, _source) = loaded().await;

    assert_eq!(
        dashboard.refill_active(1, None).await,
        Err(DashboardError::NoActiveItem)
    );

    dashboard.open_modal(Modal::RefillItem, Some(drill()));
    dashboard.refill_active(2, None).await.unwrap();
    assert!(!dashboard.view().is_open(Modal::RefillItem));
    assert_eq!(dashboard.view().active_item, None);
    assert_eq!(quantity_of(&dashboard, &drill()).await, Some(4));

    dashboard.open_modal(Modal::WithdrawItem, Some(drill()));
    let rejected = dashboard.withdraw_active(50, None).await;
    assert!(matches!(rejected, Err(DashboardError::Rejected(_))));
    assert!(dashboard.view().is_open(Modal::WithdrawItem));
    assert_eq!(dashboard.view().active_item, Some(drill()));

    dashboard.close_modal(Modal::WithdrawItem);
    dashboard.open_modal(Modal::DeleteConfirm, Some(drill()));
    dashboard.delete_active().await.unwrap();
    assert!(!dashboard.view().is_open(Modal::DeleteConfirm));
    assert_eq!(quantity_of(&dashboard, &drill()).await, None);
}

#[tokio::test]
async fn unknown_category_displays_as_uncategorized() {
    let (dashboard, _source) = loaded().await;

    assert_eq!(dashboard.category_name(&CategoryId::new("cat3")).await, "Tools");
    assert_eq!(
        dashboard.category_name(&CategoryId::new("missing")).await,
        "Uncategorized"
    );
}

#[tokio::test]
async fn shutdown_refuses_further_commands() {
    let (dashboard, _source) = loaded().await;

    dashboard.shutdown(Duration::from_secs(1)).await.unwrap();

    assert!(matches!(
        dashboard.add_category("Late").await,
        Err(DashboardError::Store(_))
    ));
}
