//! Report endpoints
//!
//! Each handler forwards the path's organization id and the JSON filter to the
//! engine and answers the resulting `Outcome` as is. Negative outcomes are
//! regular `200` answers; only engine errors change the status.

use analytics::{
    BalanceFilter, BalanceSummary, CashflowFilter, CashflowSummary, ContactFilter, ContactSummary,
    DateRangeFilter, DateRangeSummary, Outcome, RoleFilter, RoleSummary,
};
use axum::{
    Json,
    extract::{Path, State},
};

use crate::{ServerError, server::ServerState};

pub async fn balance(
    State(state): State<ServerState>,
    Path(organization_id): Path<String>,
    Json(filter): Json<BalanceFilter>,
) -> Result<Json<Outcome<BalanceSummary>>, ServerError> {
    let outcome = state
        .engine
        .organization_balance(&organization_id, &filter)
        .await?;
    Ok(Json(outcome))
}

pub async fn contacts(
    State(state): State<ServerState>,
    Path(organization_id): Path<String>,
    Json(filter): Json<ContactFilter>,
) -> Result<Json<Outcome<ContactSummary>>, ServerError> {
    let outcome = state
        .engine
        .contact_movements(&organization_id, &filter)
        .await?;
    Ok(Json(outcome))
}

pub async fn roles(
    State(state): State<ServerState>,
    Path(organization_id): Path<String>,
    Json(filter): Json<RoleFilter>,
) -> Result<Json<Outcome<RoleSummary>>, ServerError> {
    let outcome = state.engine.role_spending(&organization_id, &filter).await?;
    Ok(Json(outcome))
}

pub async fn movements(
    State(state): State<ServerState>,
    Path(organization_id): Path<String>,
    Json(filter): Json<DateRangeFilter>,
) -> Result<Json<Outcome<DateRangeSummary>>, ServerError> {
    let outcome = state
        .engine
        .date_range_movements(&organization_id, &filter)
        .await?;
    Ok(Json(outcome))
}

pub async fn cashflow(
    State(state): State<ServerState>,
    Path(organization_id): Path<String>,
    Json(filter): Json<CashflowFilter>,
) -> Result<Json<Outcome<CashflowSummary>>, ServerError> {
    let outcome = state.engine.cashflow_trend(&organization_id, &filter).await?;
    Ok(Json(outcome))
}
