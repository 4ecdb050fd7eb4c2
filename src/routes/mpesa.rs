use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::handlers::mpesa_handlers;
use crate::state::AppState;

pub fn mpesa_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(mpesa_health))
        // C2B
        .route("/stk-push", post(mpesa_handlers::initiate_stk_push))
        .route("/c2b/register", post(mpesa_handlers::register_c2b_urls))
        // B2C
        .route("/b2c", post(mpesa_handlers::send_b2c_payment))
        // Queries and bills
        .route("/transaction-status", post(mpesa_handlers::query_transaction_status))
        .route("/bill-manager", post(mpesa_handlers::pay_bill))
        // Mock listing, not backed by storage
        .route("/transactions", get(mpesa_handlers::get_transactions))
}

async fn mpesa_health(State(state): State<AppState>) -> Json<Value> {
    let mut body = state.config.get_config_info();
    body["status"] = json!("healthy");
    body["timestamp"] = json!(Utc::now().to_rfc3339());
    Json(body)
}
