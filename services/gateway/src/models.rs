//! Request and response models plus boundary validation
//!
//! Raw payload fields are parsed here so that malformed input comes back
//! as a 400 VALIDATION error instead of a framework rejection. Prices
//! are accepted as decimal strings or JSON numbers and converted to the
//! exact fixed-point type before they reach the engine.

use crate::error::ApiError;
use matching_engine::SubmitReport;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus, Side};
use types::trade::Trade;

// ── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub symbol: String,
    pub side: String,
    pub quantity: u64,
    pub price: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModifyOrderRequest {
    #[serde(default)]
    pub quantity: Option<u64>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub symbol: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DepthQuery {
    pub levels: Option<usize>,
}

// ── Responses ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub user_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            user_id: order.user_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price: order.price,
            filled_quantity: order.filled_quantity,
            remaining_quantity: order.remaining(),
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub trades: Vec<Trade>,
    pub remaining_quantity: Quantity,
}

impl From<SubmitReport> for SubmitResponse {
    fn from(report: SubmitReport) -> Self {
        Self {
            order_id: report.order.order_id,
            status: report.order.status,
            remaining_quantity: report.order.remaining(),
            trades: report.trades,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct UserOrdersResponse {
    pub orders: Vec<OrderView>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TradesResponse {
    pub trades: Vec<Trade>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MarketResponse {
    pub symbol: Symbol,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub last_trade: Option<Trade>,
}

#[derive(Debug, Serialize)]
pub struct DepthResponse {
    pub symbol: Symbol,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}

// ── Boundary parsing ────────────────────────────────────────────────

pub fn parse_symbol(raw: &str) -> Result<Symbol, ApiError> {
    Symbol::try_new(raw)
        .ok_or_else(|| ApiError::Validation(format!("invalid symbol: {:?}", raw)))
}

pub fn parse_side(raw: &str) -> Result<Side, ApiError> {
    match raw.to_ascii_uppercase().as_str() {
        "BUY" => Ok(Side::Buy),
        "SELL" => Ok(Side::Sell),
        _ => Err(ApiError::Validation(
            "side must be BUY or SELL".to_string(),
        )),
    }
}

pub fn parse_quantity(raw: u64) -> Result<Quantity, ApiError> {
    Quantity::try_new(raw)
        .ok_or_else(|| ApiError::Validation("quantity must be positive".to_string()))
}

/// Accept a price as a decimal string or a JSON number. Either way the
/// digits are parsed exactly; the engine never sees a float.
pub fn parse_price(value: &serde_json::Value) -> Result<Price, ApiError> {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => {
            return Err(ApiError::Validation(
                "price must be a decimal string or number".to_string(),
            ))
        }
    };
    let decimal = Decimal::from_str(&text)
        .map_err(|_| ApiError::Validation(format!("invalid price: {:?}", text)))?;
    Price::try_new(decimal).ok_or_else(|| {
        ApiError::Validation("price must be positive with at most 4 decimals".to_string())
    })
}

pub fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("invalid order id: {:?}", raw)))
}
