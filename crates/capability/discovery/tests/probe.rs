use casa_discovery::{Scanner, ScannerConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_scanner() -> Scanner {
    Scanner::new_with_config(ScannerConfig {
        probe_timeout: Duration::from_millis(200),
        mdns_timeout: Duration::from_millis(200),
        manual_timeout: Duration::from_millis(200),
    })
}

/// Mock 服务器地址去掉 scheme，得到探测用的 `host:port`。
fn host_of(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

#[tokio::test]
async fn probe_accepts_family_identity_reply() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "esp32-smart-home",
            "name": "Smart Home Hub",
            "type": "Hub",
            "ip": "192.168.1.50"
        })))
        .mount(&server)
        .await;

    let device = fast_scanner()
        .probe_address(&host_of(&server))
        .await
        .expect("family device answers");

    assert_eq!(device.ip, "192.168.1.50");
    assert_eq!(device.name.as_deref(), Some("Smart Home Hub"));
    assert_eq!(device.kind.as_deref(), Some("Hub"));
}

#[tokio::test]
async fn probe_falls_back_to_probed_address_without_reported_ip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scan"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "esp32-smart-home" })),
        )
        .mount(&server)
        .await;
    let host = host_of(&server);

    let device = fast_scanner()
        .probe_address(&host)
        .await
        .expect("family device answers");

    assert_eq!(device.ip, host);
    assert!(device.name.is_none());
}

#[tokio::test]
async fn probe_ignores_foreign_http_device() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scan"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "office-printer", "name": "Printer" })),
        )
        .mount(&server)
        .await;

    assert!(fast_scanner().probe_address(&host_of(&server)).await.is_none());
}

#[tokio::test]
async fn probe_tolerates_non_json_reply() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scan"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>router admin</html>"))
        .mount(&server)
        .await;

    assert!(fast_scanner().probe_address(&host_of(&server)).await.is_none());
}

#[tokio::test]
async fn probe_gives_up_after_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scan"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "esp32-smart-home" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    assert!(fast_scanner().probe_address(&host_of(&server)).await.is_none());
}
