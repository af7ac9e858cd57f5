use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use match_insight::analysis::{
    analysis_router, AnalysisRepository, CandidateWorkspace, MatchAnalysisService, ScoringOracle,
};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn with_analysis_routes<R, W, O>(
    service: Arc<MatchAnalysisService<R, W, O>>,
) -> axum::Router
where
    R: AnalysisRepository + 'static,
    W: CandidateWorkspace + 'static,
    O: ScoringOracle + 'static,
{
    analysis_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{HeuristicOracle, InMemoryAnalysisRepository, InMemoryWorkspace, SAMPLE_USER};
    use axum::body::Body;
    use axum::http::Request;
    use match_insight::config::AnalysisConfig;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn app() -> axum::Router {
        let service = MatchAnalysisService::new(
            Arc::new(InMemoryAnalysisRepository::default()),
            Arc::new(InMemoryWorkspace::sample()),
            Arc::new(HeuristicOracle),
            &AnalysisConfig::default(),
        );
        with_analysis_routes(Arc::new(service)).layer(Extension(state(true)))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let response = readiness_endpoint(Extension(state(false)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = readiness_endpoint(Extension(state(true)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_route_is_mounted_next_to_analysis_routes() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], json!("ok"));
    }

    #[tokio::test]
    async fn sample_workspace_can_be_analysed_over_http() {
        let body = json!({ "userId": SAMPLE_USER, "kind": "job-match" });
        let response = app()
            .oneshot(
                Request::post("/api/v1/jobs/job-101/analysis")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["cached"], json!(false));
        assert_eq!(payload["result"]["matchedSkills"], json!(["Rust", "Tokio", "PostgreSQL"]));
    }
}
