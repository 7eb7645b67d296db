//! Axum-based HTTP server for status and manual override

use crate::classify::{Classification, Tertile, TertileWindow, format_price};
use crate::error::{PricelightError, Result};
use crate::situation::{ManualState, SituationHandle};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub situation: SituationHandle,
    pub max_price: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct OverrideBody {
    pub state: String,
}

#[derive(Debug, Serialize)]
struct WindowEntry {
    hour: chrono::DateTime<chrono::Utc>,
    price: Decimal,
    formatted: String,
    tertile: Tertile,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let situation = state.situation.current();
    let classification = Classification::from_situation(&situation, state.max_price);
    Json(serde_json::json!({
        "manual": situation.manual,
        "classification": classification,
        "relay_on": classification.relay_on(),
        "color": classification.color().to_string(),
        "current_price": situation.current_price,
        "current_price_formatted": situation.current_price.map(format_price),
        "current_hour": situation.current_hour,
        "currency": state.currency,
        "max_price": state.max_price,
        "updated_at": situation.updated_at,
        "status_line": classification.status_line(situation.current_price, &state.currency),
    }))
}

async fn set_override(
    State(state): State<AppState>,
    Json(body): Json<OverrideBody>,
) -> impl IntoResponse {
    let manual: ManualState = match body.state.parse() {
        Ok(m) => m,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            );
        }
    };
    if let Err(e) = state.situation.set_manual(manual) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": e.to_string()})),
        );
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({"ok": true, "manual": manual})),
    )
}

async fn prices(State(state): State<AppState>) -> impl IntoResponse {
    let situation = state.situation.current();
    let tertiles = TertileWindow::new(situation.window.iter().map(|p| p.price()));
    let entries: Vec<WindowEntry> = situation
        .window
        .iter()
        .map(|p| WindowEntry {
            hour: p.hour(),
            price: p.price(),
            formatted: format_price(p.price()),
            tertile: tertiles
                .as_ref()
                .map(|t| t.classify(p.price()))
                .unwrap_or(Tertile::Low),
        })
        .collect();
    Json(serde_json::json!({
        "currency": state.currency,
        "current_hour": situation.current_hour,
        "min": tertiles.map(|t| t.min),
        "max": tertiles.map(|t| t.max),
        "window": entries,
    }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/override", post(set_override))
        .route("/api/prices", get(prices))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let router = build_router(state);
    let logger = crate::logging::get_logger("web");

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PricelightError::web(format!("Cannot bind {}: {}", addr, e)))?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!("Web server listening at http://{}", local_addr));

    axum::serve(listener, router)
        .await
        .map_err(|e| PricelightError::web(format!("Server on {} stopped: {}", local_addr, e)))
}
