use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get},
    Json, Router,
};
use hostscope_core::{CacheCoordinator, CoordinatorStatus, IdentitySnapshot, StatsSnapshot};
use serde::Serialize;
use serde_json::{json, Value};
use std::{sync::Arc, time::Instant};
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<CacheCoordinator>,
}

#[derive(Serialize)]
struct InfoResponse {
    system: IdentitySnapshot,
    stats: StatsSnapshot,
}

/// Every snapshot is answered with 200, error payloads included
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/system", get(get_system))
        .route("/api/stats", get(get_stats))
        .route("/api/info", get(get_info))
        .route("/api/system/cache", delete(invalidate_system))
        .route("/api/cache", get(cache_status))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(trace_requests))
}

async fn trace_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;
    debug!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
    response
}

// GET /api/system
async fn get_system(State(app): State<AppState>) -> Json<IdentitySnapshot> {
    Json(app.coordinator.get_identity().await)
}

// GET /api/stats
async fn get_stats(State(app): State<AppState>) -> Json<StatsSnapshot> {
    Json(app.coordinator.get_stats().await)
}

// GET /api/info
async fn get_info(State(app): State<AppState>) -> Json<InfoResponse> {
    let (system, stats) = tokio::join!(app.coordinator.get_identity(), app.coordinator.get_stats());
    Json(InfoResponse { system, stats })
}

// DELETE /api/system/cache
async fn invalidate_system(State(app): State<AppState>) -> Json<Value> {
    app.coordinator.invalidate_identity();
    info!("identity cache invalidated");
    Json(json!({ "invalidated": true }))
}

// GET /api/cache
async fn cache_status(State(app): State<AppState>) -> Json<CoordinatorStatus> {
    Json(app.coordinator.status())
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::Method,
    };
    use hostscope_core::{
        Collector, CoordinatorConfig, Platform, Result, Stats, UNSUPPORTED_PLATFORM_MESSAGE,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeCollector {
        identity_calls: AtomicUsize,
        stats_calls: AtomicUsize,
    }

    impl Collector for FakeCollector {
        fn architecture(&self) -> String {
            self.identity_calls.fetch_add(1, Ordering::SeqCst);
            "x86_64".to_string()
        }

        fn platform(&self) -> String {
            "Linux".to_string()
        }

        fn os_name(&self) -> String {
            "Ubuntu 24.04 LTS".to_string()
        }

        fn os_version(&self) -> String {
            "24.04".to_string()
        }

        fn kernel(&self) -> Option<String> {
            Some("6.8.0-31-generic".to_string())
        }

        fn stats(&self) -> Result<Stats> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            let mut stats = Stats::default();
            stats.cpu.usage = "12.5%".to_string();
            stats.network.active = "eth0".to_string();
            Ok(stats)
        }
    }

    fn app_with(fake: &Arc<FakeCollector>) -> Router {
        let collector: Arc<dyn Collector> = fake.clone();
        let coordinator =
            CacheCoordinator::new(Platform::Linux, Some(collector), CoordinatorConfig::default());
        build_router(AppState {
            coordinator: Arc::new(coordinator),
        })
    }

    fn unsupported_app() -> Router {
        let coordinator = CacheCoordinator::new(
            Platform::from_id("sunos"),
            None,
            CoordinatorConfig::default(),
        );
        build_router(AppState {
            coordinator: Arc::new(coordinator),
        })
    }

    async fn call(app: &Router, method: Method, uri: &str) -> Response {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = unsupported_app();
        let response = call(&app, Method::GET, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_system_returns_identity() {
        let fake = Arc::new(FakeCollector::default());
        let app = app_with(&fake);

        let response = call(&app, Method::GET, "/api/system").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["osName"], "Ubuntu 24.04 LTS");
        assert_eq!(body["osVersion"], "24.04");
        assert_eq!(body["kernel"], "6.8.0-31-generic");
    }

    #[tokio::test]
    async fn test_stats_are_served_from_cache() {
        let fake = Arc::new(FakeCollector::default());
        let app = app_with(&fake);

        for _ in 0..3 {
            let body = json_body(call(&app, Method::GET, "/api/stats").await).await;
            assert_eq!(body["cpu"]["usage"], "12.5%");
            assert_eq!(body["memory"]["used"], "N/A");
        }
        assert_eq!(fake.stats_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_info_combines_both_kinds() {
        let fake = Arc::new(FakeCollector::default());
        let app = app_with(&fake);

        let body = json_body(call(&app, Method::GET, "/api/info").await).await;
        assert_eq!(body["system"]["architecture"], "x86_64");
        assert_eq!(body["stats"]["network"]["active"], "eth0");
    }

    #[tokio::test]
    async fn test_unsupported_platform_is_still_200() {
        let app = unsupported_app();

        let response = call(&app, Method::GET, "/api/system").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["error"], UNSUPPORTED_PLATFORM_MESSAGE);
        assert_eq!(body["platform"], "sunos");

        let stats = json_body(call(&app, Method::GET, "/api/stats").await).await;
        assert_eq!(stats, json!({ "error": UNSUPPORTED_PLATFORM_MESSAGE }));
    }

    #[tokio::test]
    async fn test_invalidate_forces_a_new_identity_collection() {
        let fake = Arc::new(FakeCollector::default());
        let app = app_with(&fake);

        call(&app, Method::GET, "/api/system").await;
        call(&app, Method::GET, "/api/system").await;
        assert_eq!(fake.identity_calls.load(Ordering::SeqCst), 1);

        let body = json_body(call(&app, Method::DELETE, "/api/system/cache").await).await;
        assert_eq!(body, json!({ "invalidated": true }));

        call(&app, Method::GET, "/api/system").await;
        assert_eq!(fake.identity_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_status() {
        let fake = Arc::new(FakeCollector::default());
        let app = app_with(&fake);
        call(&app, Method::GET, "/api/stats").await;

        let body = json_body(call(&app, Method::GET, "/api/cache").await).await;
        assert_eq!(body["platform"], "linux");
        assert_eq!(body["supported"], true);
        assert_eq!(body["stats"]["populated"], true);
        assert_eq!(body["stats"]["freshness"], "fresh");
        assert_eq!(body["identity"]["populated"], false);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = unsupported_app();
        let response = call(&app, Method::GET, "/api/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await, json!({ "error": "Not found" }));
    }
}
