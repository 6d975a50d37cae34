//! Integration tests for the HTTP data source against a mock backend

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stockroom_inventory::{
    Category, CategoryId, Dashboard, DashboardError, HistoryAction, InventoryEnvironment,
    InventorySource, ItemId, RestSource, SourceError,
};
use stockroom_testing::{SequentialIds, test_clock};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer) -> RestSource {
    RestSource::new(server.uri(), Duration::from_secs(2)).unwrap()
}

async fn serve_inventory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "_id": "cat3", "name": "Tools", "color": "#f59e0b" }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "_id": "item3",
                "name": "Cordless Drill",
                "category": { "_id": "cat3", "name": "Tools", "color": "#f59e0b" },
                "quantity": 2,
                "threshold": 3
            }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "_id": "h4",
                "itemId": "item3",
                "action": "Withdraw",
                "quantity": 1,
                "purpose": "Maintenance",
                "createdAt": "2024-07-25T11:00:00Z"
            }
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn reads_backend_records() {
    let server = MockServer::start().await;
    serve_inventory(&server).await;
    let source = source_for(&server);

    let items = source.load_items().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].category, CategoryId::new("cat3"));
    assert!(items[0].is_low());

    let history = source.load_history().await.unwrap();
    assert_eq!(history[0].action, HistoryAction::Withdraw);
    assert_eq!(history[0].item_id, ItemId::new("item3"));
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let error = source_for(&server).load_items().await.unwrap_err();
    assert_eq!(
        error,
        SourceError::Status {
            endpoint: "/items".to_string(),
            status: 503,
        }
    );
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let error = source_for(&server).load_categories().await.unwrap_err();
    assert!(matches!(error, SourceError::Decode { ref endpoint, .. } if endpoint == "/categories"));
}

#[tokio::test]
async fn writes_use_backend_routes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/categories"))
        .and(body_partial_json(json!({ "_id": "cat9", "name": "Cleaning" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/items/item3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server);
    source
        .create_category(&Category {
            id: CategoryId::new("cat9"),
            name: "Cleaning".to_string(),
            color: "#6b7280".to_string(),
        })
        .await
        .unwrap();
    source.delete_item(&ItemId::new("item3")).await.unwrap();
}

#[tokio::test]
async fn dashboard_over_rest_backend() {
    let server = MockServer::start().await;
    serve_inventory(&server).await;
    Mock::given(method("PUT"))
        .and(path("/items/item3"))
        .and(body_partial_json(json!({ "_id": "item3", "quantity": 1, "category": "cat3" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/history"))
        .and(body_partial_json(json!({ "itemId": "item3", "action": "Withdraw", "quantity": 1 })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let source: Arc<dyn InventorySource> = Arc::new(source_for(&server));
    let env = InventoryEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(SequentialIds::new("h")),
        source,
    );
    let dashboard = Dashboard::new(env, Duration::from_secs(5));

    dashboard.load().await.unwrap();
    dashboard
        .withdraw(ItemId::new("item3"), 1, Some("Site visit".to_string()))
        .await
        .unwrap();

    let state = dashboard.snapshot().await;
    assert_eq!(state.item(&ItemId::new("item3")).unwrap().quantity, 1);
    assert_eq!(state.sync_error(), None);
}

#[tokio::test]
async fn unreachable_backend_fails_the_load() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let source: Arc<dyn InventorySource> =
        Arc::new(RestSource::new(uri, Duration::from_millis(500)).unwrap());
    let env = InventoryEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(SequentialIds::new("h")),
        source,
    );
    let dashboard = Dashboard::new(env, Duration::from_secs(5));

    assert!(matches!(dashboard.load().await, Err(DashboardError::Load(_))));
}
