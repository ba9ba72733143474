//! Integration tests for GeoBroker
//!
//! These tests drive the broker, geo services and nearest finder together.

use std::time::{Duration, Instant};

use geobroker::broker::{BrokerConfig, Message};
use geobroker::geo::{
    FixedLocator, GeoBroker, GeoRequest, NearestConfig, NearestFinder, ServiceDist, ServiceHandle, ServiceWorker,
};

fn fast_config() -> BrokerConfig {
    BrokerConfig {
        peer_ttl_ms: 200,
        sweep_interval_ms: 20,
        delivery_timeout_ms: 200,
        mailbox_capacity: 4,
        pending_ttl_ms: 2_000,
    }
}

fn started_broker() -> GeoBroker {
    let broker = GeoBroker::new(fast_config());
    broker.start();
    broker
}

async fn start_fixed(broker: &GeoBroker, name: &str, x: f64, y: f64) -> ServiceHandle {
    ServiceWorker::with_name(name, broker.clone(), FixedLocator::new(x, y), Duration::from_millis(40))
        .start()
        .await
}

// =============================================================================
// Scatter-gather
// =============================================================================

#[tokio::test]
async fn test_nearest_of_five_fixed_services() {
    let broker = started_broker();
    let positions = [
        ("geo-origin", 0.0, 0.0),
        ("geo-east", 10.0, 0.0),
        ("geo-north", 0.0, 10.0),
        ("geo-middle", 5.0, 5.0),
        ("geo-far", 100.0, 100.0),
    ];
    let mut handles = Vec::new();
    for (name, x, y) in positions {
        handles.push(start_fixed(&broker, name, x, y).await);
    }

    let finder = NearestFinder::new(broker.clone(), &NearestConfig::default()).unwrap();
    let best = finder.closest(1.0, 1.0).await.unwrap().expect("a candidate");

    assert_eq!(best.service, "geo-origin");
    assert!((best.dist - 2f64.sqrt()).abs() < 1e-9);

    for handle in handles {
        handle.stop().await;
    }
    broker.shutdown().await;
}

#[tokio::test]
async fn test_nearest_with_more_services_than_pool() {
    let broker = started_broker();
    let mut handles = Vec::new();
    for i in 0..10 {
        handles.push(start_fixed(&broker, &format!("geo-{i}"), i as f64 * 10.0, 0.0).await);
    }

    let config = NearestConfig {
        pool_size: 2,
        ..Default::default()
    };
    let finder = NearestFinder::new(broker.clone(), &config).unwrap();
    let best = finder.closest(71.0, 0.0).await.unwrap().unwrap();
    assert_eq!(best.service, "geo-7");

    for handle in handles {
        handle.stop().await;
    }
    broker.shutdown().await;
}

#[tokio::test]
async fn test_nearest_survives_partial_failure() {
    let broker = started_broker();
    let good = start_fixed(&broker, "geo-good", 3.0, 4.0).await;
    // Registered but never reads its mailbox; once full, its request times out
    let _stuck = broker.register("geo-stuck").await;
    let mut fillers = Vec::new();
    for _ in 0..4 {
        fillers.push(broker.send("geo-stuck", Message::new("test", serde_json::json!(null))).await);
    }

    let finder = NearestFinder::new(broker.clone(), &NearestConfig::default()).unwrap();
    let best = finder.closest(0.0, 0.0).await.unwrap().unwrap();
    assert_eq!(best.service, "geo-good");
    assert_eq!(best.dist, 5.0);

    good.stop().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn test_no_candidate_when_nobody_registered() {
    let broker = started_broker();
    let finder = NearestFinder::new(broker.clone(), &NearestConfig::default()).unwrap();
    assert!(finder.closest(0.0, 0.0).await.unwrap().is_none());
    broker.shutdown().await;
}

// =============================================================================
// Targeted send
// =============================================================================

#[tokio::test]
async fn test_send_to_unknown_resolves_immediately() {
    let broker = started_broker();
    let started = Instant::now();

    let body = GeoRequest::GetDistance { x: 0.0, y: 0.0 }.to_body().unwrap();
    let reply = broker.send("geo-never", Message::new("test", body)).await.await.unwrap();

    assert!(reply.unwrap_err().is_not_found());
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(broker.metrics().await.pending_requests, 0);
    broker.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_requests_get_their_own_replies() {
    let broker = started_broker();
    let handle = start_fixed(&broker, "geo-a", 0.0, 0.0).await;

    let points = [(3.0, 4.0), (6.0, 8.0), (0.0, 1.0)];
    let mut tasks = Vec::new();
    for (x, y) in points {
        let broker = broker.clone();
        tasks.push(tokio::spawn(async move {
            let body = GeoRequest::GetDistance { x, y }.to_body().unwrap();
            let reply = broker.send("geo-a", Message::new("test", body)).await.await.unwrap();
            ServiceDist::decode(&reply.unwrap().unwrap()).unwrap().dist
        }));
    }

    let mut dists = Vec::new();
    for task in tasks {
        dists.push(task.await.unwrap());
    }
    assert_eq!(dists, vec![5.0, 10.0, 1.0]);
    assert_eq!(broker.metrics().await.pending_requests, 0);

    handle.stop().await;
    broker.shutdown().await;
}

// =============================================================================
// Liveness
// =============================================================================

#[tokio::test]
async fn test_idle_peer_is_evicted() {
    let broker = started_broker();
    let _mailbox = broker.register("geo-idle").await;
    assert_eq!(broker.get_services().await, vec!["geo-idle".to_string()]);

    tokio::time::sleep(Duration::from_millis(350)).await;

    assert!(broker.get_services().await.is_empty());
    let reply = broker
        .send("geo-idle", Message::new("test", serde_json::json!(null)))
        .await
        .await
        .unwrap();
    assert!(reply.unwrap_err().is_not_found());
    broker.shutdown().await;
}

#[tokio::test]
async fn test_heartbeating_service_outlives_ttl() {
    let broker = started_broker();
    let handle = start_fixed(&broker, "geo-alive", 1.0, 1.0).await;

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(broker.get_services().await, vec!["geo-alive".to_string()]);

    handle.stop().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn test_replaced_registration_is_recovered_by_worker() {
    let broker = started_broker();
    let handle = start_fixed(&broker, "geo-a", 2.0, 0.0).await;

    // Taking over the name closes the worker's mailbox; it registers again
    let mailbox = broker.register("geo-a").await;
    drop(mailbox);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let finder = NearestFinder::new(broker.clone(), &NearestConfig::default()).unwrap();
    let best = finder.closest(0.0, 0.0).await.unwrap().unwrap();
    assert_eq!(best.service, "geo-a");
    assert_eq!(best.dist, 2.0);

    handle.stop().await;
    broker.shutdown().await;
}

// =============================================================================
// Broadcast
// =============================================================================

#[tokio::test]
async fn test_update_broadcast_reaches_geo_services_only() {
    let broker = started_broker();
    let mut geo1 = broker.register("geo-1").await;
    let mut geo2 = broker.register("geo-2").await;
    let mut cli = broker.register("cli-1").await;

    let body = GeoRequest::UpdatePosition.to_body().unwrap();
    let started = broker.broadcast("^geo-.*", Message::new("cli-1", body)).await;
    assert_eq!(started, 2);

    for mailbox in [&mut geo1, &mut geo2] {
        let msg = tokio::time::timeout(Duration::from_millis(100), mailbox.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(GeoRequest::decode(msg.body.as_ref().unwrap()), Some(GeoRequest::UpdatePosition));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(cli.try_recv().is_err());
    broker.shutdown().await;
}

#[tokio::test]
async fn test_stopped_service_makes_no_further_progress() {
    let broker = started_broker();
    let handle = start_fixed(&broker, "geo-a", 0.0, 0.0).await;
    handle.stop().await;

    // Mailbox receiver is gone with the serve loop
    let body = GeoRequest::GetDistance { x: 1.0, y: 1.0 }.to_body().unwrap();
    let reply = broker.send("geo-a", Message::new("test", body)).await.await.unwrap();
    assert!(reply.unwrap_err().is_not_found());
    broker.shutdown().await;
}
