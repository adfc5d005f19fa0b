//! Order write and query handlers

use crate::auth::WriteAuth;
use crate::error::ApiError;
use crate::models::{
    parse_order_id, parse_price, parse_quantity, parse_side, parse_symbol, CancelResponse,
    CreateOrderRequest, ModifyOrderRequest, OrderView, SubmitResponse, SymbolQuery,
    UserOrdersResponse,
};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use matching_engine::NewOrder;

pub async fn create_order(
    State(state): State<AppState>,
    _auth: WriteAuth,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::Validation("user_id is required".to_string()));
    }
    state.rate_limiter.check_write(user_id)?;

    let new_order = NewOrder {
        user_id: user_id.to_string(),
        symbol: parse_symbol(&payload.symbol)?,
        side: parse_side(&payload.side)?,
        quantity: parse_quantity(payload.quantity)?,
        price: parse_price(&payload.price)?,
    };

    let report = state.engine.submit(new_order).await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let symbol = query
        .symbol
        .as_deref()
        .map(parse_symbol)
        .transpose()?;

    let order = state
        .engine
        .get_order(symbol.as_ref(), &order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order not found: {}", order_id)))?;
    Ok(Json(order.into()))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    _auth: WriteAuth,
    Path(id): Path<String>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<CancelResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let symbol = required_symbol(query)?;
    // The budget belongs to the order's owner, so resolve it first.
    let owner = fetch_owner(&state, &symbol, &order_id).await?;
    state.rate_limiter.check_write(&owner)?;

    let cancelled = state.engine.cancel(&symbol, &order_id).await?;
    Ok(Json(CancelResponse {
        order_id: cancelled.order_id,
        status: cancelled.status,
    }))
}

pub async fn modify_order(
    State(state): State<AppState>,
    _auth: WriteAuth,
    Path(id): Path<String>,
    Query(query): Query<SymbolQuery>,
    Json(payload): Json<ModifyOrderRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let symbol = required_symbol(query)?;
    if payload.quantity.is_none() && payload.price.is_none() {
        return Err(ApiError::Validation(
            "quantity or price is required".to_string(),
        ));
    }
    let owner = fetch_owner(&state, &symbol, &order_id).await?;
    state.rate_limiter.check_write(&owner)?;

    let quantity = payload.quantity.map(parse_quantity).transpose()?;
    let price = payload.price.as_ref().map(parse_price).transpose()?;

    let report = state
        .engine
        .modify(&symbol, &order_id, quantity, price)
        .await?;
    Ok(Json(report.into()))
}

pub async fn user_orders(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserOrdersResponse>, ApiError> {
    let orders = state.engine.list_user_orders(&user_id).await?;
    let views: Vec<OrderView> = orders.into_iter().map(Into::into).collect();
    let count = views.len();
    Ok(Json(UserOrdersResponse {
        orders: views,
        count,
    }))
}

fn required_symbol(query: SymbolQuery) -> Result<types::ids::Symbol, ApiError> {
    let raw = query
        .symbol
        .ok_or_else(|| ApiError::Validation("symbol query parameter is required".to_string()))?;
    parse_symbol(&raw)
}

/// Resolve the user owning `order_id` for rate-limit accounting.
async fn fetch_owner(
    state: &AppState,
    symbol: &types::ids::Symbol,
    order_id: &types::ids::OrderId,
) -> Result<String, ApiError> {
    let order = state
        .engine
        .get_order(Some(symbol), order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order not found: {}", order_id)))?;
    Ok(order.user_id)
}
