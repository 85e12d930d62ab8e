//! End-to-end test against the live mock notification service.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every client
//! operation over real HTTP through `UreqTransport`. The server's delivery log
//! is inspected directly to confirm what actually went over the wire.

use std::io::{Read, Write};
use std::time::Duration;

use courier_core::{ApiError, ClientConfig, NotificationClient};
use mock_server::{Db, Delivery, UNKNOWN_RECIPIENT};
use serde_json::json;

/// Start the mock server in a background thread and return its base URL and
/// delivery log.
fn start_server() -> (String, Db) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let db = Db::default();
    let server_db = db.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_db(listener, server_db).await
        })
        .unwrap();
    });

    (format!("http://{addr}"), db)
}

fn deliveries(db: &Db) -> Vec<Delivery> {
    db.blocking_read().clone()
}

#[test]
fn every_operation_reaches_the_service() {
    let (base_url, db) = start_server();
    let config = ClientConfig::new(base_url.as_str()).with_timeout(Duration::from_secs(10));
    let client = NotificationClient::from_config(&config).unwrap();

    // Step 1: pass-through payloads.
    let batch = json!({"notifications": [{"recipientId": "r-1", "template": "welcome"}]});
    let reply = client.batch_notify(&batch).unwrap();
    assert_eq!(reply["ok"], true);

    client.publish(&json!({"channel": "orders", "message": {"id": 7}})).unwrap();
    client
        .send_email_to_recipient(&json!({"recipientId": "r-1", "template": "welcome", "variables": {"name": "Ada"}}))
        .unwrap();
    client
        .send_email_to_address(&json!({"address": "ada@example.com", "template": "invite"}))
        .unwrap();
    client.send_batch_emails(&json!([{"recipientId": "r-1"}])).unwrap();

    // Step 2: recipient identity.
    let reply = client.update_recipient("r-1", "Ada", "Lovelace").unwrap();
    assert_eq!(reply, json!({"id": "r-1", "firstName": "Ada", "lastName": "Lovelace"}));

    // Step 3: email profile.
    client.register_email("r-1", "ada@example.com").unwrap();
    let reply = client.unregister_email("r-1").unwrap();
    assert!(reply.is_null(), "204 decodes to null");

    // Step 4: push devices.
    client
        .register_push_device("r-1", "d-1", "tok-1", "ios", Some("shop"))
        .unwrap();
    client.unregister_push_device("r-1", "d-1", None).unwrap();

    // Step 5: check what the service received.
    let log = deliveries(&db);
    let seen: Vec<(&str, &str)> = log.iter().map(|d| (d.method.as_str(), d.path.as_str())).collect();
    assert_eq!(
        seen,
        vec![
            ("POST", "/notification/batch"),
            ("POST", "/provider/pubsub/channel"),
            ("POST", "/provider/email/recipient"),
            ("POST", "/provider/email/address"),
            ("POST", "/provider/email/recipient/batch"),
            ("POST", "/recipients"),
            ("POST", "/recipients/r-1/profiles/email"),
            ("DELETE", "/recipients/r-1/profiles/email"),
            ("POST", "/recipients/r-1/profiles/push/register"),
            ("POST", "/recipients/r-1/profiles/push/unregister"),
        ]
    );

    assert_eq!(log[0].body, Some(batch));
    assert_eq!(log[0].content_type.as_deref(), Some("application/json"));
    assert!(log[7].body.is_none());
    assert!(log[7].content_type.is_none());
    assert_eq!(
        log[8].body,
        Some(json!({"deviceId": "d-1", "token": "tok-1", "platform": "ios", "app": "shop"}))
    );
    assert_eq!(log[9].body, Some(json!({"deviceId": "d-1"})));
}

#[test]
fn rejected_request_carries_full_diagnostic() {
    let (base_url, db) = start_server();
    let client = NotificationClient::new(Some(base_url.as_str())).unwrap();

    let err = client
        .register_email(UNKNOWN_RECIPIENT, "ada@example.com")
        .unwrap_err();
    assert!(matches!(err, ApiError::ServiceCall { .. }));
    assert_eq!(err.status(), Some(404));

    let diagnostic = err.diagnostic().unwrap();
    assert_eq!(diagnostic.request.headers["content-type"], vec!["application/json"]);
    assert_eq!(diagnostic.request.body.as_deref(), Some(r#"{"address":"ada@example.com"}"#));
    assert_eq!(diagnostic.response.status, 404);
    let body: serde_json::Value = serde_json::from_str(&diagnostic.response.body).unwrap();
    assert_eq!(body, json!({"error": "recipient not found"}));

    let log = deliveries(&db);
    assert_eq!(log.len(), 1, "no retry");
    assert_eq!(diagnostic.response.headers["x-request-id"], vec![log[0].id.to_string()]);
}

#[test]
fn validation_failure_is_a_service_call_error() {
    let (base_url, _db) = start_server();
    let client = NotificationClient::new(Some(base_url.as_str())).unwrap();

    let err = client
        .register_push_device("r-1", "d-1", "tok-1", "palm", None)
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    let diagnostic = err.diagnostic().unwrap();
    assert!(diagnostic.response.body.contains("unsupported platform"));
}

#[test]
fn unreachable_service_is_a_generic_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = NotificationClient::new(Some(format!("http://127.0.0.1:{port}").as_str())).unwrap();

    let err = client.unregister_email("r-1").unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }));
    assert_eq!(err.to_string(), "notification service request failed");
    assert!(err.diagnostic().is_none());
}

#[test]
fn concurrent_operations_share_one_client() {
    let (base_url, db) = start_server();
    let client = NotificationClient::new(Some(base_url.as_str())).unwrap();

    std::thread::scope(|s| {
        let a = s.spawn(|| client.register_email("r-a", "a@example.com"));
        let b = s.spawn(|| client.register_push_device("r-b", "d-b", "tok-b", "android", None));
        a.join().unwrap().unwrap();
        b.join().unwrap().unwrap();
    });

    let log = deliveries(&db);
    assert_eq!(log.len(), 2);
    let email = log.iter().find(|d| d.path == "/recipients/r-a/profiles/email").unwrap();
    let push = log.iter().find(|d| d.path == "/recipients/r-b/profiles/push/register").unwrap();
    assert_eq!(email.body, Some(json!({"address": "a@example.com"})));
    assert_eq!(
        push.body,
        Some(json!({"deviceId": "d-b", "token": "tok-b", "platform": "android"}))
    );
}

#[test]
fn sub_second_timeout_still_reaches_the_service() {
    let (base_url, db) = start_server();
    let config = ClientConfig::new(base_url.as_str()).with_timeout(Duration::from_millis(900));
    let client = NotificationClient::from_config(&config).unwrap();

    let reply = client.update_recipient("r-1", "Ada", "Lovelace").unwrap();
    assert_eq!(reply["firstName"], "Ada");
    assert_eq!(deliveries(&db).len(), 1);
}

#[test]
fn binary_error_body_still_yields_diagnostic() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !received.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        let mut raw = b"HTTP/1.1 400 Bad Request\r\nContent-Length: 4\r\nConnection: close\r\n\r\n".to_vec();
        raw.extend_from_slice(&[0xff, 0xfe, 0x00, 0x41]);
        stream.write_all(&raw).unwrap();
    });

    let client = NotificationClient::new(Some(format!("http://{addr}").as_str())).unwrap();
    let err = client.unregister_email("r-1").unwrap_err();
    assert!(matches!(err, ApiError::ServiceCall { .. }));
    assert_eq!(err.status(), Some(400));
    let diagnostic = err.diagnostic().unwrap();
    assert_eq!(diagnostic.response.body, "\u{fffd}\u{fffd}\u{0}A");
    assert!(diagnostic.request.body.is_none());
}
