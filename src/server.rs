//! JSON API over the grading core and the tracked slate.

use crate::error::{GradingError, OddsError};
use crate::models::{GradeResult, Matchup, MatchupOutcome, Odds};
use crate::store::InMemoryStore;
use crate::utils::grading::grade_pick;
use crate::utils::odds_converter::{american_odds_to_probability, american_to_decimal};
use crate::utils::payout::{parlay_payout, points_awarded};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<InMemoryStore>,
    /// Wager used when a payout request names none
    pub default_wager: Decimal,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Ungradable(#[from] GradingError),
}

impl From<OddsError> for ApiError {
    fn from(e: OddsError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ungradable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        tracing::warn!(%status, error = %self, "Request rejected");

        (
            status,
            Json(ErrorBody {
                success: false,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SinglePayoutRequest {
    #[serde(default)]
    pub wager: Option<Decimal>,
    pub odds: Odds,
}

#[derive(Debug, Deserialize)]
pub struct ParlayPayoutRequest {
    #[serde(default)]
    pub wager: Option<Decimal>,
    pub odds: Vec<Odds>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutResponse {
    pub wager: Decimal,
    pub payout: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub american: Odds,
    pub decimal: Decimal,
    pub implied_probability: f64,
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn matchups(State(state): State<AppState>) -> Json<Vec<Matchup>> {
    Json(state.store.matchups().await)
}

async fn grade(Json(outcome): Json<MatchupOutcome>) -> Result<Json<GradeResult>, ApiError> {
    Ok(Json(grade_pick(&outcome)?))
}

async fn single_payout(
    State(state): State<AppState>,
    Json(request): Json<SinglePayoutRequest>,
) -> Result<Json<PayoutResponse>, ApiError> {
    let wager = request.wager.unwrap_or(state.default_wager);
    let payout = points_awarded(wager, request.odds)?;
    Ok(Json(PayoutResponse { wager, payout }))
}

async fn parlay(
    State(state): State<AppState>,
    Json(request): Json<ParlayPayoutRequest>,
) -> Result<Json<PayoutResponse>, ApiError> {
    let wager = request.wager.unwrap_or(state.default_wager);
    let payout = parlay_payout(wager, &request.odds)?;
    Ok(Json(PayoutResponse { wager, payout }))
}

async fn convert(Path(odds): Path<Odds>) -> Result<Json<ConversionResponse>, ApiError> {
    let decimal = american_to_decimal(odds)?;
    Ok(Json(ConversionResponse {
        american: odds,
        decimal,
        implied_probability: american_odds_to_probability(odds),
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/matchups", get(matchups))
        .route("/grade", post(grade))
        .route("/payout/single", post(single_payout))
        .route("/payout/parlay", post(parlay))
        .route("/convert/:odds", get(convert))
        .with_state(state)
}
