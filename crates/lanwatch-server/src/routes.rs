//! HTTP routes.

use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::ServerError;
use crate::service::ScanService;

pub const API_VERSION: &str = "1.0.0";

#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    /// Range to scan instead of the configured default.
    pub target: Option<String>,
}

/// Register every route on an actix app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(
        web::scope("/api")
            .service(trigger_scan)
            .service(recent_events),
    );
}

/// Run a scan synchronously and report the counts.
#[post("/devices/scan")]
async fn trigger_scan(
    service: web::Data<ScanService>,
    query: web::Query<ScanQuery>,
) -> Result<HttpResponse, ServerError> {
    let report = service.run(query.target.as_deref()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "discovered": report.discovered,
        "new_devices": report.new_devices,
        "updated_devices": report.updated_devices,
        "failed_devices": report.failed_devices,
    })))
}

#[get("/health")]
async fn health(service: web::Data<ScanService>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "api_version": API_VERSION,
        "subscribers": service.hub().subscriber_count(),
    }))
}

/// The replay window, in the same shape a joining WebSocket client gets.
#[get("/events/recent")]
async fn recent_events(service: web::Data<ScanService>) -> HttpResponse {
    let recent = service.hub().recent();
    let messages: Vec<&lanwatch_sync::Envelope> = recent.iter().map(|e| e.as_ref()).collect();
    HttpResponse::Ok().json(json!({ "messages": messages }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};
    use async_trait::async_trait;
    use lanwatch_core::{HardwareId, ProbeResult};
    use lanwatch_discover::{DiscoverConfig, HostProbe};
    use lanwatch_registry::MemoryRegistry;
    use lanwatch_sync::BroadcastHub;
    use serde_json::Value;

    struct OnlyFirstHost;

    #[async_trait]
    impl HostProbe for OnlyFirstHost {
        async fn probe(&self, address: Ipv4Addr) -> ProbeResult {
            if address.octets()[3] == 1 {
                ProbeResult::reachable(address, Some("gateway".into()), HardwareId::parse("aa:bb:cc:dd:ee:01"))
            } else {
                ProbeResult::unreachable(address)
            }
        }
    }

    fn service() -> web::Data<ScanService> {
        let config = DiscoverConfig {
            default_range: Some("10.7.0.0/30".to_string()),
            ..Default::default()
        };
        web::Data::from(Arc::new(ScanService::new(
            Arc::new(OnlyFirstHost),
            Arc::new(MemoryRegistry::new()),
            BroadcastHub::default(),
            &config,
        )))
    }

    #[actix_web::test]
    async fn test_scan_route() {
        let app = test::init_service(App::new().app_data(service()).configure(configure)).await;

        let req = test::TestRequest::post().uri("/api/devices/scan").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["discovered"], 1);
        assert_eq!(body["new_devices"], 1);
        assert_eq!(body["updated_devices"], 0);
    }

    #[actix_web::test]
    async fn test_scan_route_rejects_bad_target() {
        let app = test::init_service(App::new().app_data(service()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/devices/scan?target=not-a-range")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("not-a-range"));
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(App::new().app_data(service()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["api_version"], API_VERSION);
        assert_eq!(body["subscribers"], 0);
    }

    #[actix_web::test]
    async fn test_recent_events_after_scan() {
        let app = test::init_service(App::new().app_data(service()).configure(configure)).await;

        let scan = test::TestRequest::post().uri("/api/devices/scan").to_request();
        test::call_service(&app, scan).await;

        let req = test::TestRequest::get().uri("/api/events/recent").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let kinds: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["new_device", "scan_complete"]);
    }
}
