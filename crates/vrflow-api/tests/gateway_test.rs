// Integration tests for `GatewayClient` against a mock gateway that
// speaks the same malformed HTTP/0.9-style framing as the real device:
// raw sockets, headerless responses, connection closed after the body.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use vrflow_api::client::{FULL_PAGE_UNITS, MAX_PAGES};
use vrflow_api::{Error, GatewayClient};

// ── Mock gateway ────────────────────────────────────────────────────

/// Spawn a raw-socket gateway. The handler maps the query string (the
/// part after `?`) to a response body; `None` closes the connection
/// without sending anything.
async fn spawn_gateway<F>(handler: F) -> (std::net::SocketAddr, Arc<AtomicUsize>)
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&requests);
    tokio::spawn(async move {
        loop {
            let Ok((mut conn, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);

            let mut raw = Vec::new();
            let mut chunk = [0u8; 512];
            // Read until the blank line ending the request head.
            loop {
                let Ok(n) = conn.read(&mut chunk).await else {
                    break;
                };
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
                if raw.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }

            let request = String::from_utf8_lossy(&raw);
            let query = request
                .split_whitespace()
                .nth(1)
                .and_then(|path| path.split_once('?'))
                .map(|(_, q)| q.to_owned())
                .unwrap_or_default();

            if let Some(body) = handler(&query) {
                // HTTP/0.9-ish: a bare status fragment, no headers
                // worth the name, then the body.
                let response = format!("HTTP/1.0 200 OK\r\n\r\n{body}");
                let _ = conn.write_all(response.as_bytes()).await;
            }
            // Closing the connection is the only end-of-body signal.
        }
    });

    (addr, requests)
}

fn client_for(addr: std::net::SocketAddr) -> GatewayClient {
    GatewayClient::new(
        addr.ip().to_string(),
        "admin",
        SecretString::from(String::new()),
        Duration::from_secs(2),
    )
    .unwrap()
    .with_http_port(addr.port())
}

fn unit(oa: u8, ia: u8) -> serde_json::Value {
    json!({
        "oa": oa, "ia": ia, "grp": 0, "idx": u32::from(oa) * 100 + u32::from(ia),
        "on": 0, "mode": 1, "fan": 0, "tempSet": 24, "tempIn": 25, "alarm": 0
    })
}

fn page_body(units: &[serde_json::Value]) -> String {
    json!({ "err": 0, "unit": units }).to_string()
}

// ── Discovery / pagination ──────────────────────────────────────────

#[tokio::test]
async fn pagination_stops_on_partial_page() {
    // Pages of sizes [5, 5, 3]: 13 devices, exactly 3 requests.
    let (addr, requests) = spawn_gateway(|query| {
        let page: u8 = query.rsplit_once("p=")?.1.parse().ok()?;
        let size = match page {
            0 | 1 => 5,
            2 => 3,
            _ => 0,
        };
        let units: Vec<_> = (0..size).map(|i| unit(page + 1, i + 1)).collect();
        Some(page_body(&units))
    })
    .await;

    let devices = client_for(addr).fetch_all_devices().await.unwrap();

    assert_eq!(devices.len(), 13);
    assert_eq!(requests.load(Ordering::SeqCst), 3);
    // Arrival order is preserved.
    assert_eq!(devices[0].key(), "1_1");
    assert_eq!(devices[12].key(), "3_3");
}

#[tokio::test]
async fn pagination_safety_cutoff_on_endless_full_pages() {
    // A defective server that returns a full page for every index.
    let (addr, requests) = spawn_gateway(|query| {
        let page: u8 = query.rsplit_once("p=")?.1.parse().ok()?;
        let units: Vec<_> = (0..5).map(|i| unit(page + 1, i + 1)).collect();
        Some(page_body(&units))
    })
    .await;

    let devices = client_for(addr).fetch_all_devices().await.unwrap();

    // Pages 0..=MAX_PAGES are consumed, then the scan stops.
    let expected_pages = MAX_PAGES as usize + 1;
    assert_eq!(requests.load(Ordering::SeqCst), expected_pages);
    assert_eq!(devices.len(), expected_pages * FULL_PAGE_UNITS);
}

#[tokio::test]
async fn pagination_stops_on_empty_unit_list() {
    let (addr, requests) = spawn_gateway(|query| {
        if query.ends_with("p=0") {
            Some(page_body(&[unit(1, 1), unit(1, 2), unit(1, 3), unit(1, 4), unit(1, 5)]))
        } else {
            Some(page_body(&[]))
        }
    })
    .await;

    let devices = client_for(addr).fetch_all_devices().await.unwrap();
    assert_eq!(devices.len(), 5);
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn json_less_response_ends_scan_without_error() {
    let (addr, _) = spawn_gateway(|_| Some("garbage with no body".into())).await;

    let devices = client_for(addr).fetch_all_devices().await.unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn connection_refused_is_a_connection_error() {
    // Bind then drop to get a dead port.
    let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = probe.local_addr().unwrap();
    drop(probe);

    let err = client_for(addr).fetch_all_devices().await.unwrap_err();
    assert!(matches!(err, Error::Connection { .. }), "got {err:?}");
}

// ── Catalog metadata ────────────────────────────────────────────────

#[tokio::test]
async fn gateway_info_combines_both_queries() {
    let (addr, _) = spawn_gateway(|query| {
        if query.contains("f=24") {
            Some(json!({"brand": 2, "proto": 1}).to_string())
        } else if query.contains("f=1") {
            Some(json!({"model": "B19", "id": "zh-01", "sw": " 1.2.3 "}).to_string())
        } else {
            None
        }
    })
    .await;

    let info = client_for(addr).fetch_gateway_info().await;

    assert_eq!(info.manufacturer, "Daikin");
    assert_eq!(info.model, "B19");
    assert_eq!(info.model_id, "zh-01");
    assert_eq!(info.sw_version, "1.2.3"); // trimmed
}

#[tokio::test]
async fn gateway_info_tolerates_failed_brand_query() {
    let (addr, _) = spawn_gateway(|query| {
        if query.contains("f=1") {
            Some(json!({"model": "B27", "id": "", "sw": "2.0"}).to_string())
        } else {
            None // brand query: close without a body
        }
    })
    .await;

    let info = client_for(addr).fetch_gateway_info().await;

    assert_eq!(info.manufacturer, "Zhong Hong");
    assert_eq!(info.model, "B27");
}

#[tokio::test]
async fn gateway_info_reports_simulator_units() {
    let (addr, _) = spawn_gateway(|query| {
        if query.contains("f=24") {
            Some(json!({"brand": 255, "proto": 12}).to_string())
        } else {
            Some(json!({"model": "SIM", "id": "", "sw": ""}).to_string())
        }
    })
    .await;

    let info = client_for(addr).fetch_gateway_info().await;
    assert_eq!(info.manufacturer, "Simulator 12 units");
}

// ── Control commands ────────────────────────────────────────────────

#[tokio::test]
async fn control_success_on_err_zero() {
    let (addr, _) = spawn_gateway(|query| {
        assert!(query.contains("f=18"));
        assert!(query.contains("idx=205"));
        assert!(query.contains("on=1"));
        assert!(query.contains("mode=1"));
        assert!(query.contains("tempSet=24"));
        assert!(query.contains("fan=2"));
        Some(json!({"err": 0}).to_string())
    })
    .await;

    let ok = client_for(addr).send_control(205, 1, 1, 24, 2).await.unwrap();
    assert!(ok);
}

#[tokio::test]
async fn control_failure_on_nonzero_err() {
    let (addr, _) = spawn_gateway(|_| Some(json!({"err": 1}).to_string())).await;

    let ok = client_for(addr).send_control(1, 1, 1, 24, 0).await.unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn control_failure_on_absent_response() {
    let (addr, _) = spawn_gateway(|_| None).await;

    let ok = client_for(addr).send_control(1, 0, 0, 24, 0).await.unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn control_connection_error_surfaces() {
    let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = probe.local_addr().unwrap();
    drop(probe);

    let err = client_for(addr).send_control(1, 0, 0, 24, 0).await.unwrap_err();
    assert!(err.is_connection());
}
