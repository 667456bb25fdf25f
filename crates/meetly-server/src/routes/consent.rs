//! Consent banner routes: status, decisions, preference saves, reset.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use meetly_consent::{ConsentOutcome, PreferenceUpdate};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/consent/status", get(consent_status))
        .route("/consent/accept", post(accept_all))
        .route("/consent/decline", post(decline_all))
        .route("/consent/preferences", post(save_preferences))
        .route("/consent/reset", post(reset))
}

async fn consent_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "showBanner": state.consent.show_banner(),
        "bannerDelayMs": state.config.consent.banner_delay_ms,
        "preferences": state.consent.preferences(),
        "record": state.consent.record(),
    }))
}

async fn accept_all(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let outcome = state.consent.accept_all();
    Json(outcome_response(&state, outcome))
}

async fn decline_all(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let outcome = state.consent.decline_all();
    Json(outcome_response(&state, outcome))
}

async fn save_preferences(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PreferenceUpdate>,
) -> Json<serde_json::Value> {
    let outcome = state.consent.update_preferences(update);
    Json(outcome_response(&state, outcome))
}

async fn reset(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.consent.reset();
    Json(serde_json::json!({
        "showBanner": state.consent.show_banner(),
        "preferences": state.consent.preferences(),
    }))
}

fn outcome_response(state: &AppState, outcome: ConsentOutcome) -> serde_json::Value {
    serde_json::json!({
        "outcome": outcome,
        "showBanner": state.consent.show_banner(),
        "preferences": state.consent.preferences(),
    })
}
