use crate::handlers::{market, orders};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(market::health))
        .route("/orders", post(orders::create_order))
        .route("/orders/user/:user_id", get(orders::user_orders))
        .route(
            "/orders/:id",
            get(orders::get_order)
                .put(orders::modify_order)
                .delete(orders::cancel_order),
        )
        .route("/trades", get(market::trades))
        .route("/market/:symbol", get(market::market_summary))
        .route("/market/:symbol/depth", get(market::market_depth))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
