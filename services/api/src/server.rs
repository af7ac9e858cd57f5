use crate::cli::ServeArgs;
use crate::infra::{AppState, HeuristicOracle, InMemoryAnalysisRepository, InMemoryWorkspace};
use crate::routes::with_analysis_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use match_insight::analysis::MatchAnalysisService;
use match_insight::config::AppConfig;
use match_insight::error::AppError;
use match_insight::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let workspace = match args.workspace.take() {
        Some(path) => {
            info!(path = %path.display(), "loading workspace seed");
            InMemoryWorkspace::from_path(&path)?
        }
        None => InMemoryWorkspace::sample(),
    };

    let analysis_service = Arc::new(MatchAnalysisService::new(
        Arc::new(InMemoryAnalysisRepository::default()),
        Arc::new(workspace),
        Arc::new(HeuristicOracle),
        &config.analysis,
    ));

    let app = with_analysis_routes(analysis_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        job_match_window_hours = config.analysis.freshness.job_match.num_hours(),
        "match analysis service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
