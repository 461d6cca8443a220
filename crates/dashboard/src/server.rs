use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use interface::{ApiError, StrategyName};
use trading_api::Mutation;

use crate::controller::{Dashboard, MutationReport};
use crate::render::render;

pub fn router(dashboard: Arc<Dashboard>) -> Router {
    Router::new()
        .route("/", get(text_handler))
        .route("/health", get(health_handler))
        .route("/snapshot", get(snapshot_handler))
        .route("/actions/:action", post(action_handler))
        .route("/actions/set_cash/:amount", post(set_cash_handler))
        .route("/actions/set_strategy/:name", post(set_strategy_handler))
        .route("/actions/set_interval/:minutes", post(set_interval_handler))
        .layer(CorsLayer::permissive())
        .with_state(dashboard)
}

/// 대시보드 뷰 서버 시작
/// 마지막 스냅샷 조회와 버튼 동작(변경 요청 → 새로고침)을 HTTP로 제공합니다
pub async fn serve(dashboard: Arc<Dashboard>, port: u16) -> eyre::Result<()> {
    let app = router(dashboard);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("dashboard view server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler(State(dashboard): State<Arc<Dashboard>>) -> impl IntoResponse {
    let view = dashboard.sync().view();
    Json(serde_json::json!({
        "status": "ok",
        "polling": dashboard.sync().is_running(),
        "stale": view.is_stale(),
        "seq": view.seq,
    }))
}

async fn text_handler(State(dashboard): State<Arc<Dashboard>>) -> impl IntoResponse {
    render(&dashboard.sync().view())
}

async fn snapshot_handler(State(dashboard): State<Arc<Dashboard>>) -> impl IntoResponse {
    Json(dashboard.sync().view())
}

async fn action_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Path(action): Path<String>,
) -> Response {
    let mutation = match action.as_str() {
        "start" => Mutation::StartTrading,
        "stop" => Mutation::StopTrading,
        "reset" => Mutation::Reset,
        "tick" => Mutation::RunTick,
        other => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": format!("unknown action: {}", other) })),
            )
                .into_response()
        }
    };
    report_response(dashboard.apply(mutation).await)
}

async fn set_cash_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Path(amount): Path<f64>,
) -> Response {
    report_response(dashboard.apply(Mutation::SetCash(amount)).await)
}

async fn set_strategy_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Path(name): Path<String>,
) -> Response {
    match name.parse::<StrategyName>() {
        Ok(strategy) => report_response(dashboard.apply(Mutation::SetStrategy(strategy)).await),
        Err(e) => error_response(&e),
    }
}

async fn set_interval_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Path(minutes): Path<u32>,
) -> Response {
    report_response(dashboard.apply(Mutation::SetInterval(minutes)).await)
}

fn status_for(error: &ApiError) -> StatusCode {
    match error {
        ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ApiError::Network(_) => StatusCode::GATEWAY_TIMEOUT,
        ApiError::Server { .. } | ApiError::Decode(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(error: &ApiError) -> Response {
    (status_for(error), Json(serde_json::json!({ "error": error }))).into_response()
}

fn report_response(report: MutationReport) -> Response {
    let status = match &report.result {
        Ok(_) => StatusCode::OK,
        Err(e) => status_for(e),
    };
    let body = match &report.result {
        Ok(ack) => serde_json::json!({
            "mutation": report.mutation,
            "message": ack.message,
            "refresh": report.refresh,
        }),
        Err(e) => serde_json::json!({
            "mutation": report.mutation,
            "error": e,
            "refresh": report.refresh,
        }),
    };
    (status, Json(body)).into_response()
}
