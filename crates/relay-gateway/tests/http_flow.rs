//! End-to-end router tests: gate, API key, ledger and notifier together.

mod common;

use axum::extract::ConnectInfo;
use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;

#[tokio::test]
async fn test_checkout_admits_once() {
    let relay = TestRelay::new(test_config());

    let (status, body) = relay
        .post("/api/checkout", "1.2.3.4", json!({"transactionId": "TXN-12345678", "amount": 10}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["transactionId"], "TXN-12345678");

    let (status, body) = relay
        .post("/api/checkout", "1.2.3.4", json!({"transactionId": "TXN-12345678"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "ALREADY_USED");

    assert_eq!(relay.notifier.count(), 1);
}

#[tokio::test]
async fn test_checkout_and_payment_share_the_ledger() {
    let relay = TestRelay::new(test_config());

    let (status, _) = relay
        .post("/api/checkout", "1.2.3.4", json!({"transactionId": "ORDER_0001"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = relay
        .post("/api/payment", "1.2.3.4", json!({"transactionId": " ORDER_0001 "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ALREADY_USED");
}

#[tokio::test]
async fn test_malformed_ids_rejected_without_notifying() {
    let relay = TestRelay::new(test_config());

    let cases = [
        (json!({"transactionId": "bad id"}), "CONTAINS_WHITESPACE"),
        (json!({"transactionId": "short"}), "TOO_SHORT"),
        (json!({"transactionId": "x".repeat(101)}), "TOO_LONG"),
        (json!({"transactionId": "TXN#12345678"}), "INVALID_CHARSET"),
        (json!({"transactionId": 12345678}), "EMPTY"),
        (json!({}), "EMPTY"),
    ];

    for (body, code) in cases {
        let (status, response) = relay.post("/api/payment", "1.2.3.4", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "expected {code}");
        assert_eq!(response["code"], code);
    }

    assert_eq!(relay.notifier.count(), 0);
}

#[tokio::test]
async fn test_loosely_typed_display_fields_still_admit() {
    let relay = TestRelay::new(test_config());

    let (status, body) = relay
        .post(
            "/api/checkout",
            "1.2.3.4",
            json!({"transactionId": "TXN-12345678", "amount": "49.99", "productName": 7}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactionId"], "TXN-12345678");

    let (status, _) = relay
        .post(
            "/api/payment",
            "1.2.3.4",
            json!({"transactionId": "PAY-12345678", "amount": {"value": 1}, "orderId": 99}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let sent = relay.notifier.sent.lock();
    let amount = sent[0]
        .fields
        .iter()
        .find(|f| f.name == "Amount")
        .map(|f| f.value.clone());
    assert_eq!(amount.as_deref(), Some("49.99"));
}

#[tokio::test]
async fn test_oversized_body_gets_413_envelope() {
    let mut config = test_config();
    config.http.max_body_bytes = 64;
    let relay = TestRelay::new(config);

    let padding = "x".repeat(200);
    let (status, body) = relay
        .post(
            "/api/checkout",
            "1.2.3.4",
            json!({"transactionId": "TXN-BIG-00001", "note": padding}),
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert!(!relay.service.state().ledger.contains("TXN-BIG-00001"));

    // Admin callers without the key learn nothing about their body
    let (status, _) = relay
        .admin("/api/admin/block-ip", None, json!({"ip": "x".repeat(200)}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = relay
        .admin(
            "/api/admin/block-ip",
            Some(ADMIN_KEY),
            json!({"ip": "x".repeat(200)}),
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_slow_delivery_gets_408_envelope() {
    let mut config = test_config();
    config.http.request_timeout = Duration::from_millis(50);
    let relay = TestRelay::with_notifier(config, RecordingNotifier::slow(Duration::from_secs(2)));

    let (status, body) = relay
        .post("/api/checkout", "1.2.3.4", json!({"transactionId": "TXN-SLOW-0001"}))
        .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "TIMEOUT");

    // Admission happened before the stall
    assert!(relay.service.state().ledger.contains("TXN-SLOW-0001"));
}

#[tokio::test]
async fn test_invalid_json_body() {
    let relay = TestRelay::new(test_config());
    let req = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/checkout")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, body) = relay.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_webhook_relays_without_ledger() {
    let relay = TestRelay::new(test_config());
    let payload = json!({"event": "order.refunded", "data": {"orderId": "A1"}});

    for _ in 0..2 {
        let (status, body) = relay.post("/api/webhook", "1.2.3.4", payload.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("transactionId").is_none());
    }

    assert_eq!(relay.notifier.count(), 2);
    assert_eq!(relay.service.state().ledger.len(), 0);
}

#[tokio::test]
async fn test_blocked_address_gets_403_and_keeps_id_unused() {
    let relay = TestRelay::new(test_config());

    let (status, _) = relay
        .admin("/api/admin/block-ip", Some(ADMIN_KEY), json!({"ip": "9.9.9.9"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = relay
        .post("/api/checkout", "9.9.9.9", json!({"transactionId": "TXN-87654321"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied from this IP address");
    assert_eq!(body["ip"], "9.9.9.9");

    let (status, _) = relay
        .post("/api/checkout", "1.1.1.1", json!({"transactionId": "TXN-87654321"}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_for_first_entry_is_the_client() {
    let relay = TestRelay::new(test_config());
    relay.service.state().gate.block("9.9.9.9");

    let (status, _) = relay
        .post("/api/webhook", "9.9.9.9, 10.0.0.1", json!({"event": "x"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_whitelist_mode_over_http() {
    let relay = TestRelay::new(test_config());

    let (status, body) = relay
        .admin("/api/admin/ip-mode", Some(ADMIN_KEY), json!({"mode": "whitelist"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "whitelist");

    // Empty allow list admits everyone
    let (status, _) = relay.post("/api/webhook", "1.2.3.4", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    relay
        .admin("/api/admin/allow-ip", Some(ADMIN_KEY), json!({"ip": "5.6.7.8"}))
        .await;

    let (status, _) = relay.post("/api/webhook", "1.2.3.4", json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = relay.post("/api/webhook", "5.6.7.8", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // Admin surface is not behind the gate
    let (status, body) = relay
        .admin("/api/admin/ip-status", Some(ADMIN_KEY), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowedIPs"], json!(["5.6.7.8"]));
}

#[tokio::test]
async fn test_admin_requires_key_and_mutates_nothing() {
    let relay = TestRelay::new(test_config());

    for key in [None, Some("wrong-key")] {
        let (status, body) = relay
            .admin("/api/admin/block-ip", key, json!({"ip": "9.9.9.9"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
    }

    let (status, _) = relay
        .admin("/api/admin/ip-status", Some("wrong-key"), json!({}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(relay.service.state().gate.is_allowed("9.9.9.9"));
}

#[tokio::test]
async fn test_admin_input_errors() {
    let relay = TestRelay::new(test_config());

    let (status, body) = relay
        .admin("/api/admin/block-ip", Some(ADMIN_KEY), json!({"ip": "  "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_ADDRESS");

    let (status, body) = relay
        .admin("/api/admin/ip-mode", Some(ADMIN_KEY), json!({"mode": "Whitelist"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_MODE");

    // Removing an unknown address is fine
    let (status, body) = relay
        .admin("/api/admin/remove-ip", Some(ADMIN_KEY), json!({"ip": "4.4.4.4"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blockedCount"], 0);
    assert_eq!(body["allowedCount"], 0);
}

#[tokio::test]
async fn test_allow_then_block_moves_address() {
    let relay = TestRelay::new(test_config());

    relay
        .admin("/api/admin/allow-ip", Some(ADMIN_KEY), json!({"ip": "7.7.7.7"}))
        .await;
    let (status, body) = relay
        .admin("/api/admin/block-ip", Some(ADMIN_KEY), json!({"ip": "7.7.7.7"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blockedIPs"], json!(["7.7.7.7"]));
    assert_eq!(body["allowedIPs"], json!([]));
    assert!(body["message"].as_str().unwrap().contains("7.7.7.7"));
}

#[tokio::test]
async fn test_api_key_guards_ledger_endpoints_only() {
    let mut config = test_config();
    config.auth.api_key = Some("store-key".to_string());
    let relay = TestRelay::new(config);

    let (status, _) = relay
        .post("/api/checkout", "1.2.3.4", json!({"transactionId": "TXN-00000001"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // Rejected before the ledger
    assert!(!relay.service.state().ledger.contains("TXN-00000001"));

    let req = json_request(
        Method::POST,
        "/api/checkout",
        "1.2.3.4",
        &json!({"transactionId": "TXN-00000001"}),
        &[("x-api-key", "store-key")],
    );
    let (status, _) = relay.send(req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = relay.post("/api/webhook", "1.2.3.4", json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_gate_runs_before_api_key() {
    let mut config = test_config();
    config.auth.api_key = Some("store-key".to_string());
    config.access.blocked = vec!["9.9.9.9".to_string()];
    let relay = TestRelay::new(config);

    let (status, _) = relay
        .post("/api/payment", "9.9.9.9", json!({"transactionId": "TXN-00000002"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_failed_delivery_is_502_and_id_stays_used() {
    let relay = TestRelay::with_notifier(test_config(), RecordingNotifier::failing());

    let (status, body) = relay
        .post("/api/checkout", "1.2.3.4", json!({"transactionId": "TXN-55555555"}))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "NOTIFICATION_FAILED");

    let (status, body) = relay
        .post("/api/checkout", "1.2.3.4", json!({"transactionId": "TXN-55555555"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ALREADY_USED");
}

#[tokio::test]
async fn test_health_is_never_gated() {
    let mut config = test_config();
    config.access.blocked = vec!["Unknown".to_string()];
    let relay = TestRelay::new(config);

    let req = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = relay.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_report_outcomes() {
    let relay = TestRelay::new(test_config());
    relay
        .post("/api/checkout", "1.2.3.4", json!({"transactionId": "TXN-11112222"}))
        .await;
    relay
        .post("/api/checkout", "1.2.3.4", json!({"transactionId": "nope"}))
        .await;

    let req = json_request(Method::GET, "/metrics", "1.2.3.4", &json!(null), &[]);
    let (status, body) = relay.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admissions"]["accepted"], 1);
    assert_eq!(body["admissions"]["rejected"], 1);
    assert_eq!(body["admissions"]["ledger_size"], 1);
    assert_eq!(body["notifications"]["sent"], 1);
    assert_eq!(body["access_mode"], "blacklist");
}

#[tokio::test]
async fn test_write_rate_limit_returns_429() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.writes_per_second = 1;
    config.rate_limit.burst_size = 10;
    let relay = TestRelay::new(config);

    let (status, _) = relay
        .post("/api/checkout", "3.3.3.3", json!({"transactionId": "TXN-RATE-0001"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let response = tower::ServiceExt::oneshot(
        relay.router.clone(),
        json_request(
            Method::POST,
            "/api/checkout",
            "3.3.3.3",
            &json!({"transactionId": "TXN-RATE-0002"}),
            &[],
        ),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // Reads use their own bucket
    let (status, _) = relay.post("/api/webhook", "3.3.3.3", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // The second id was never consumed
    assert!(!relay.service.state().ledger.contains("TXN-RATE-0002"));
}

#[tokio::test]
async fn test_forwarded_loopback_is_still_rate_limited() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.writes_per_second = 1;
    config.rate_limit.burst_size = 10;
    config.rate_limit.exempt = vec!["127.0.0.1".to_string()];
    let relay = TestRelay::new(config);

    let mut admitted = 0;
    for i in 0..5 {
        let (status, _) = relay
            .post(
                "/api/checkout",
                "127.0.0.1",
                json!({"transactionId": format!("TXN-SPOOF-{i:04}")}),
            )
            .await;
        if status == StatusCode::OK {
            admitted += 1;
        } else {
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        }
    }
    assert_eq!(admitted, 1);
}

#[tokio::test]
async fn test_exempt_transport_peer_is_not_limited() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.writes_per_second = 1;
    config.rate_limit.burst_size = 10;
    config.rate_limit.exempt = vec!["127.0.0.1".to_string()];
    let relay = TestRelay::new(config);
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

    for i in 0..5 {
        let mut req = json_request(
            Method::POST,
            "/api/checkout",
            "8.8.8.8",
            &json!({"transactionId": format!("TXN-LOCAL-{i:04}")}),
            &[],
        );
        req.extensions_mut().insert(ConnectInfo(peer));
        let (status, _) = relay.send(req).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let relay = TestRelay::new(test_config());
    let (status, _) = relay.post("/api/refund", "1.2.3.4", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
