//! Command-line walkthrough of the inventory dashboard.
//!
//! Loads the configured source, runs a short stock-room session (a
//! withdrawal that drives an item low, a refill that recovers it, a new
//! category and item, a rejected over-withdrawal, a deletion) and prints the
//! dashboard after each step.
//!
//! # Usage
//!
//! Run against the in-memory demo inventory:
//! ```bash
//! cargo run --bin stockroom
//! ```
//!
//! Run against a backend:
//! ```bash
//! STOCKROOM_SOURCE=rest STOCKROOM_API_URL=http://localhost:5000/api \
//!   cargo run --bin stockroom
//! ```

use anyhow::Context;
use std::time::Duration;
use stockroom_inventory::{Config, Dashboard, DashboardError, Filter, ItemId, Modal, view};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        source = ?config.source.kind,
        load_timeout_secs = config.load_timeout,
        "Configuration loaded"
    );

    let mut dashboard = Dashboard::from_config(&config).context("building data source")?;

    if let Err(error) = dashboard.load().await {
        warn!(%error, "Initial load failed, retrying once");
        dashboard.reload().await.context("loading inventory")?;
    }

    println!("=== Stockroom ===");
    print_dashboard(&dashboard).await;

    let Some(drill) = find_item(&dashboard, "drill").await else {
        println!("\nNo drill in this inventory; nothing more to show.");
        return Ok(());
    };

    println!("\nWithdrawing 1 drill for a site visit...");
    dashboard.open_modal(Modal::WithdrawItem, Some(drill.clone()));
    dashboard
        .withdraw_active(1, Some("Site visit".to_string()))
        .await?;
    print_dashboard(&dashboard).await;

    println!("\nRefilling 5 drills...");
    dashboard.open_modal(Modal::RefillItem, Some(drill.clone()));
    dashboard
        .refill_active(5, Some("Supplier delivery".to_string()))
        .await?;
    print_dashboard(&dashboard).await;

    println!("\nTrying to withdraw 100 drills...");
    match dashboard.withdraw(drill.clone(), 100, None).await {
        Err(DashboardError::Rejected(rejection)) => println!("  Rejected: {rejection}"),
        other => other?,
    }

    println!("\nAdding a category and an item...");
    let safety = dashboard.add_category("Safety Gear").await?;
    let goggles = dashboard.add_item("Safety Goggles", safety, 1, 4).await?;
    print_dashboard(&dashboard).await;

    println!("\nDrill history:");
    for entry in dashboard.item_history(&drill).await {
        println!(
            "  {} {:>8} {:>4}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.action,
            entry.quantity,
            entry.purpose.as_deref().unwrap_or("")
        );
    }

    println!("\nDeleting the goggles...");
    dashboard.open_modal(Modal::DeleteConfirm, Some(goggles));
    dashboard.delete_active().await?;
    print_dashboard(&dashboard).await;

    let snapshot = dashboard.snapshot().await;
    if let Some(error) = snapshot.sync_error() {
        warn!(%error, "Some changes were not written to the source");
    }

    dashboard.shutdown(Duration::from_secs(5)).await?;
    println!("\n=== Session Complete ===");
    Ok(())
}

async fn find_item(dashboard: &Dashboard, name: &str) -> Option<ItemId> {
    let filter = Filter {
        search_term: name.to_string(),
        ..Filter::default()
    };
    let state = dashboard.snapshot().await;
    view::filtered_items(&state, &filter)
        .first()
        .map(|item| item.id.clone())
}

async fn print_dashboard(dashboard: &Dashboard) {
    let stats = dashboard.stats().await;
    println!(
        "  Items: {}  Categories: {}  Refills: {}  Withdrawals: {}",
        stats.total_items, stats.total_categories, stats.total_refills, stats.total_withdrawals
    );

    let low = dashboard.low_stock_items().await;
    if low.is_empty() {
        println!("  No low-stock items");
    } else {
        println!("  Low stock:");
        for item in low {
            let category = dashboard.category_name(&item.category).await;
            println!(
                "    {} ({category}): {}/{}",
                item.name, item.quantity, item.threshold
            );
        }
    }

    println!("  Recent activity:");
    for entry in dashboard.recent_history().await.iter().take(3) {
        println!("    {} {} x{}", entry.action, entry.item_id, entry.quantity);
    }
}
