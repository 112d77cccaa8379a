//! services/api/src/web/ledger.rs
//!
//! Generic CRUD handlers shared by every ledger entry kind, plus the ledger
//! specific reports: budget progress, goal contributions and the overview.
//!
//! Handlers are instantiated per kind when the router is built, e.g.
//! `get(list_entries::<Expense>)`. Entries owned by someone else are reported
//! as missing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use guroosh_core::{
    ledger::{self, BudgetProgress, Contribution, FinanceOverview, GoalStatus},
    Budget, Expense, Goal, Income, Ledger, LedgerEntry,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::ApiError,
    web::{extract::ValidJson, middleware::AuthUser, state::AppState, MessageResponse},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DateRange {
    /// Inclusive lower bound (RFC 3339).
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC 3339).
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    fn check(&self) -> Result<(), ApiError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(ApiError::BadRequest(
                "'from' must not be after 'to'".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Refuses `entry` when another entry of the same owner clashes with it.
async fn ensure_unique<T: LedgerEntry>(ledger: &Ledger<'_, T>, entry: &T) -> Result<(), ApiError> {
    let existing = ledger.list(entry.owner_id()).await?;
    if existing.iter().any(|other| entry.conflicts_with(other)) {
        return Err(ApiError::BadRequest(format!("{} already exists", T::LABEL)));
    }
    Ok(())
}

//=========================================================================================
// Generic CRUD
//=========================================================================================

pub async fn list_entries<T: LedgerEntry>(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<T>>, ApiError> {
    range.check()?;
    let entries = state.ledger::<T>().list(auth.id).await?;
    Ok(Json(ledger::within(entries, range.from, range.to)))
}

pub async fn create_entry<T: LedgerEntry>(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(draft): ValidJson<T::Draft>,
) -> Result<(StatusCode, Json<T>), ApiError> {
    let ledger = state.ledger::<T>();
    let entry = T::from_draft(auth.id, draft, Utc::now());
    ensure_unique(&ledger, &entry).await?;
    Ok((StatusCode::CREATED, Json(ledger.insert(entry).await?)))
}

pub async fn get_entry<T: LedgerEntry>(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<T>, ApiError> {
    Ok(Json(state.ledger::<T>().get(auth.id, id).await?))
}

pub async fn update_entry<T: LedgerEntry>(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    ValidJson(patch): ValidJson<T::Patch>,
) -> Result<Json<T>, ApiError> {
    let ledger = state.ledger::<T>();
    let mut entry = ledger.get(auth.id, id).await?;
    entry.apply_patch(patch, Utc::now());
    ensure_unique(&ledger, &entry).await?;
    Ok(Json(ledger.update(entry).await?))
}

pub async fn delete_entry<T: LedgerEntry>(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.ledger::<T>().delete(auth.id, id).await?;
    Ok(MessageResponse::new(format!("{} deleted", T::LABEL)))
}

//=========================================================================================
// Reports
//=========================================================================================

/// GET /api/budgets/progress - Spending against every budget in its current period
#[utoipa::path(
    get,
    path = "/api/budgets/progress",
    responses((status = 200, description = "One entry per budget")),
    security(("bearer" = [])),
    tag = "ledger"
)]
pub async fn budget_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<BudgetProgress>>, ApiError> {
    let budgets = state.ledger::<Budget>().list(auth.id).await?;
    let expenses = state.ledger::<Expense>().list(auth.id).await?;
    let now = Utc::now();
    Ok(Json(
        budgets
            .iter()
            .map(|budget| ledger::budget_progress(budget, &expenses, now))
            .collect(),
    ))
}

/// POST /api/goals/{id}/contribute - Add money to a savings goal
#[utoipa::path(
    post,
    path = "/api/goals/{id}/contribute",
    params(("id" = Uuid, Path, description = "Goal id")),
    request_body(content_type = "application/json", description = "`amount` greater than zero."),
    responses(
        (status = 200, description = "The goal, completed once its target is reached"),
        (status = 400, description = "Invalid amount or cancelled goal"),
        (status = 404, description = "No such goal")
    ),
    security(("bearer" = [])),
    tag = "ledger"
)]
pub async fn contribute_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    ValidJson(contribution): ValidJson<Contribution>,
) -> Result<Json<Goal>, ApiError> {
    let goals = state.ledger::<Goal>();
    let mut goal = goals.get(auth.id, id).await?;
    if goal.status == GoalStatus::Cancelled {
        return Err(ApiError::BadRequest(
            "Cannot contribute to a cancelled goal".to_string(),
        ));
    }
    goal.contribute(contribution.amount, Utc::now());
    Ok(Json(goals.update(goal).await?))
}

/// GET /api/overview - Income, expenses and net over a period
#[utoipa::path(
    get,
    path = "/api/overview",
    params(DateRange),
    responses((status = 200, description = "Totals and expenses by category")),
    security(("bearer" = [])),
    tag = "ledger"
)]
pub async fn overview_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(range): Query<DateRange>,
) -> Result<Json<FinanceOverview>, ApiError> {
    range.check()?;
    let incomes = ledger::within(
        state.ledger::<Income>().list(auth.id).await?,
        range.from,
        range.to,
    );
    let expenses = ledger::within(
        state.ledger::<Expense>().list(auth.id).await?,
        range.from,
        range.to,
    );
    Ok(Json(ledger::overview(&incomes, &expenses)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn inverted_ranges_are_rejected() {
        let now = Utc::now();
        let range = DateRange {
            from: Some(now),
            to: Some(now - Duration::days(1)),
        };
        assert!(matches!(range.check(), Err(ApiError::BadRequest(_))));
        assert!(DateRange::default().check().is_ok());
    }
}
