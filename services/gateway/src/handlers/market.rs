//! Market data and health handlers

use crate::error::ApiError;
use crate::models::{
    parse_symbol, DepthQuery, DepthResponse, MarketResponse, TradesQuery, TradesResponse,
};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::json;

const DEFAULT_TRADE_LIMIT: usize = 100;
const MAX_TRADE_LIMIT: usize = 1_000;
const DEFAULT_DEPTH_LEVELS: usize = 10;
const MAX_DEPTH_LEVELS: usize = 100;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn market_summary(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<MarketResponse>, ApiError> {
    let symbol = parse_symbol(&symbol)?;
    let summary = state.engine.market(&symbol).await?;
    Ok(Json(MarketResponse {
        symbol: summary.symbol,
        best_bid: summary.best_bid,
        best_ask: summary.best_ask,
        last_trade: summary.last_trade,
    }))
}

pub async fn market_depth(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<DepthQuery>,
) -> Result<Json<DepthResponse>, ApiError> {
    let symbol = parse_symbol(&symbol)?;
    let levels = query
        .levels
        .unwrap_or(DEFAULT_DEPTH_LEVELS)
        .min(MAX_DEPTH_LEVELS);
    let depth = state.engine.depth(&symbol, levels).await;
    Ok(Json(DepthResponse {
        symbol: depth.symbol,
        bids: depth.bids,
        asks: depth.asks,
    }))
}

pub async fn trades(
    State(state): State<AppState>,
    Query(query): Query<TradesQuery>,
) -> Result<Json<TradesResponse>, ApiError> {
    let symbol = query
        .symbol
        .as_deref()
        .map(parse_symbol)
        .transpose()?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRADE_LIMIT)
        .min(MAX_TRADE_LIMIT);

    let trades = state.engine.list_trades(symbol.as_ref(), limit).await?;
    let count = trades.len();
    Ok(Json(TradesResponse { trades, count }))
}
