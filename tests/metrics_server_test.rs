//! Metrics Server Integration Tests
//!
//! Tests for the Prometheus metrics and health HTTP endpoint.

use std::time::Duration;

mod tests {
    use super::*;
    use spool_uploadr::metrics::server::MetricsServer;
    use spool_uploadr::uploader::LoopState;
    use tokio::sync::watch;

    #[tokio::test]
    async fn test_metrics_endpoint_returns_prometheus_format() {
        let (_state_tx, state_rx) = watch::channel(LoopState::AwaitingQuota);
        let mut server = MetricsServer::new("127.0.0.1:0", state_rx);
        let addr = server.start().await.expect("Server should start");

        spool_uploadr::metrics::record_upload_simulated();

        let response = reqwest::Client::new()
            .get(format!("http://{}/metrics", addr))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .expect("Should connect to metrics server");

        assert!(response.status().is_success());
        let content_type = response
            .headers()
            .get("content-type")
            .expect("Should have content-type")
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.contains("text/plain"));

        let body = response.text().await.unwrap();
        assert!(body.contains("spool_uploads_total"));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_health_reports_loop_state() {
        let (state_tx, state_rx) = watch::channel(LoopState::AwaitingQuota);
        let mut server = MetricsServer::new("127.0.0.1:0", state_rx);
        let addr = server.start().await.expect("Server should start");
        let client = reqwest::Client::new();

        let body: serde_json::Value = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["state"], "awaiting_quota");

        state_tx.send_replace(LoopState::Uploading);

        let body: serde_json::Value = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["state"], "uploading");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (_state_tx, state_rx) = watch::channel(LoopState::Scanning);
        let mut server = MetricsServer::new("127.0.0.1:0", state_rx);
        let addr = server.start().await.expect("Server should start");

        let response = reqwest::Client::new()
            .get(format!("http://{}/unknown", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_listener() {
        let (_state_tx, state_rx) = watch::channel(LoopState::Scanning);
        let mut server = MetricsServer::new("127.0.0.1:0", state_rx);
        let addr = server.start().await.expect("Server should start");
        server.shutdown().await;

        let result = reqwest::Client::new()
            .get(format!("http://{}/health", addr))
            .timeout(Duration::from_secs(2))
            .send()
            .await;
        assert!(result.is_err());
    }
}
