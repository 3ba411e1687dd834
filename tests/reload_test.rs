//! Hot reload and snapshot atomicity.

use std::sync::Arc;
use std::time::Duration;

use declarest::config::{load_document, ConfigWatcher};
use declarest::snapshot::Snapshot;

mod common;

fn document(greeting: &str) -> String {
    format!("paths:\n  /greeting:\n    methods:\n      get:\n        content: {greeting}\n")
}

async fn greeting(server: &common::TestServer) -> Option<String> {
    let res = common::client().get(server.url("/greeting")).send().await.ok()?;
    if res.status() != 200 {
        return None;
    }
    res.text().await.ok()
}

/// Poll until the greeting is `expected`, for up to ten seconds.
async fn serves(server: &common::TestServer, expected: &str) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while tokio::time::Instant::now() < deadline {
        if greeting(server).await.as_deref() == Some(expected) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn test_write_is_picked_up() {
    let server = common::start_server(&document("one")).await;
    let _watcher = ConfigWatcher::new(&server.document, server.handle.clone())
        .spawn(server.shutdown.subscribe())
        .unwrap();
    assert_eq!(greeting(&server).await.as_deref(), Some("one"));

    std::fs::write(&server.document, document("two")).unwrap();
    let reloaded = serves(&server, "two").await;
    assert!(reloaded, "new document was not served");
}

#[tokio::test]
async fn test_invalid_document_keeps_previous_snapshot() {
    let server = common::start_server(&document("one")).await;
    let _watcher = ConfigWatcher::new(&server.document, server.handle.clone())
        .spawn(server.shutdown.subscribe())
        .unwrap();

    std::fs::write(&server.document, "paths:\n  /{}:\n    methods: {get: {}}\n").unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(greeting(&server).await.as_deref(), Some("one"));

    std::fs::write(&server.document, document("three")).unwrap();
    let reloaded = serves(&server, "three").await;
    assert!(reloaded, "valid document after a failed one was not served");
}

#[tokio::test]
async fn test_rename_replace_is_picked_up_after_cooldown() {
    let server = common::start_server(&document("one")).await;
    let _watcher = ConfigWatcher::new(&server.document, server.handle.clone())
        .with_cooldown(Duration::from_millis(200))
        .spawn(server.shutdown.subscribe())
        .unwrap();

    let dir = server.document.parent().unwrap();
    let staged = common::write_document(dir, "staged.yaml", &document("renamed"));
    std::fs::rename(&staged, &server.document).unwrap();

    let reloaded = serves(&server, "renamed").await;
    assert!(reloaded, "renamed document was not served");

    // The watch follows the new file.
    tokio::time::sleep(Duration::from_millis(500)).await;
    std::fs::write(&server.document, document("after")).unwrap();
    let reloaded = serves(&server, "after").await;
    assert!(reloaded, "write after rename was not served");
}

#[tokio::test]
async fn test_in_flight_request_keeps_its_snapshot() {
    let slow = |greeting: &str| {
        format!(
            "paths:\n  /greeting:\n    auth:\n      bearer: {{role: any}}\n    methods:\n      get:\n        content: {greeting}\n"
        )
    };
    let gate = Arc::new(common::Gate::default());
    let server = common::start_server_with(&slow("old"), gate.clone()).await;
    let client = common::client();

    let in_flight = tokio::spawn(client.get(server.url("/greeting")).send());
    gate.entered.notified().await;

    // Publish while the request is parked inside the auth check.
    std::fs::write(&server.document, slow("new")).unwrap();
    let snapshot = Snapshot::build(load_document(&server.document).unwrap()).unwrap();
    server.handle.publish(snapshot);

    gate.open(2);
    let res = in_flight.await.unwrap().unwrap();
    assert_eq!(res.text().await.unwrap(), "old");

    let res = client.get(server.url("/greeting")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "new");
}

#[tokio::test]
async fn test_slow_request_times_out() {
    let document = "timeout: 1\npaths:\n  /slow:\n    auth:\n      bearer: {}\n    methods:\n      get: {}\n";
    let gate = Arc::new(common::Gate::default());
    let server = common::start_server_with(document, gate.clone()).await;

    let res = common::client().get(server.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), 408);
}
