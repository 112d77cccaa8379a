//! services/api/src/web/investments.rs
//!
//! Portfolio reports over the caller's investments. Plain CRUD goes through the
//! generic ledger handlers.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use guroosh_core::{
    portfolio::{
        self, PortfolioSummary, TrendPoint, ZakatAssessment, DEFAULT_TREND_POINTS,
        MAX_TREND_POINTS, MIN_TREND_POINTS,
    },
    Investment, InvestmentCategory,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::ApiError,
    web::{extract::ValidJson, middleware::AuthUser, state::AppState},
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ZakatRequest {
    /// Categories counted as zakatable; Stock, Crypto and Gold when omitted.
    pub categories: Option<Vec<InvestmentCategory>>,
    /// Gold price per gram, used to derive the Nisab threshold.
    #[validate(range(exclusive_min = 0.0, message = "Gold price must be greater than zero"))]
    pub gold_price_per_gram: Option<f64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TrendQuery {
    /// Number of points in the series, 2 to 365.
    pub points: Option<usize>,
}

/// GET /api/investments/summary - Portfolio totals and category distribution
#[utoipa::path(
    get,
    path = "/api/investments/summary",
    responses((status = 200, description = "Totals, gain and per-category shares")),
    security(("bearer" = [])),
    tag = "investments"
)]
pub async fn summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<PortfolioSummary>, ApiError> {
    let investments = state.ledger::<Investment>().list(auth.id).await?;
    Ok(Json(portfolio::summarize(&investments)))
}

/// POST /api/investments/zakat - Zakat due on the selected categories
#[utoipa::path(
    post,
    path = "/api/investments/zakat",
    request_body(content_type = "application/json", description = "Optional `categories` and `goldPricePerGram`."),
    responses(
        (status = 200, description = "The assessment"),
        (status = 400, description = "Invalid gold price or category")
    ),
    security(("bearer" = [])),
    tag = "investments"
)]
pub async fn zakat_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<ZakatRequest>,
) -> Result<Json<ZakatAssessment>, ApiError> {
    let categories = match req.categories {
        Some(categories) if !categories.is_empty() => categories,
        _ => InvestmentCategory::DEFAULT_ZAKATABLE.to_vec(),
    };
    let investments = state.ledger::<Investment>().list(auth.id).await?;
    Ok(Json(portfolio::assess_zakat(
        &investments,
        &categories,
        req.gold_price_per_gram,
    )))
}

/// GET /api/investments/{id}/trend - Value series from purchase to today
#[utoipa::path(
    get,
    path = "/api/investments/{id}/trend",
    params(("id" = Uuid, Path, description = "Investment id"), TrendQuery),
    responses(
        (status = 200, description = "Linearly interpolated value series"),
        (status = 400, description = "Point count out of range"),
        (status = 404, description = "No such investment")
    ),
    security(("bearer" = [])),
    tag = "investments"
)]
pub async fn trend_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<Vec<TrendPoint>>, ApiError> {
    let points = query.points.unwrap_or(DEFAULT_TREND_POINTS);
    if !(MIN_TREND_POINTS..=MAX_TREND_POINTS).contains(&points) {
        return Err(ApiError::BadRequest(format!(
            "points must be between {} and {}",
            MIN_TREND_POINTS, MAX_TREND_POINTS
        )));
    }
    let investment = state.ledger::<Investment>().get(auth.id, id).await?;
    Ok(Json(portfolio::trend_series(&investment, Utc::now(), points)))
}

/// GET /api/investments/prices/{symbol} - Live market prices
#[utoipa::path(
    get,
    path = "/api/investments/prices/{symbol}",
    params(("symbol" = String, Path, description = "Ticker symbol")),
    responses((status = 501, description = "No market data provider is configured")),
    security(("bearer" = [])),
    tag = "investments"
)]
pub async fn prices_handler(Path(symbol): Path<String>) -> Result<Json<()>, ApiError> {
    Err(ApiError::NotImplemented(format!(
        "Market prices for {} are not available",
        symbol.to_uppercase()
    )))
}
