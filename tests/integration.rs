use std::sync::{Arc, Mutex};
use std::time::Duration;

use xcc_client::{Event, XccClient};

/// Run with: cargo test --test integration -- --ignored
/// Requires a reachable controller; set XCC_IP (and optionally
/// XCC_USER / XCC_PASSWORD) first.
fn controller_ip() -> String {
    std::env::var("XCC_IP").unwrap_or_else(|_| "192.168.1.100".to_string())
}

fn credentials() -> (String, String) {
    (
        std::env::var("XCC_USER").unwrap_or_else(|_| "xcc".to_string()),
        std::env::var("XCC_PASSWORD").unwrap_or_else(|_| "xcc".to_string()),
    )
}

#[tokio::test]
#[ignore]
async fn connect_and_poll_real_controller() {
    let (user, password) = credentials();
    let mut client = XccClient::builder(controller_ip())
        .credentials(user, password)
        .build();

    client.connect().await.expect("connect failed");
    client.poll_cycle().await.expect("poll cycle failed");

    let snapshot = client.snapshot();
    assert!(!snapshot.is_empty(), "controller should expose entities");

    for (device, entity) in snapshot.iter() {
        let name = entity
            .spec
            .as_ref()
            .map(|s| s.friendly_name_en.as_str())
            .unwrap_or("(no descriptor)");
        println!("[{device}] {} = {} ({name})", entity.prop, entity.value);
    }
}

#[tokio::test]
#[ignore]
async fn second_cycle_fires_only_changes() {
    let (user, password) = credentials();
    let events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(vec![]));
    let events_clone = events.clone();

    let mut client = XccClient::builder(controller_ip())
        .credentials(user, password)
        .on_event(move |event| {
            events_clone.lock().unwrap().push(event.clone());
        })
        .build();

    client.connect().await.expect("connect failed");
    client.poll_cycle().await.expect("first cycle failed");
    assert!(events.lock().unwrap().is_empty());

    // Readings move slowly; a quick second cycle should be mostly quiet.
    tokio::time::sleep(Duration::from_secs(2)).await;
    client.poll_cycle().await.expect("second cycle failed");

    let captured = events.lock().unwrap();
    println!("events after second cycle: {}", captured.len());
    for event in captured.iter() {
        println!("{event:?}");
    }
}
