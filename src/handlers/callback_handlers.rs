// handlers/callback_handlers.rs
use axum::{body::Bytes, Json};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::callback::ResultSummary;

/// Notifications the gateway can post back to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    StkResult,
    B2cResult,
    B2cTimeout,
    C2bConfirmation,
    C2bValidation,
    TransactionStatusResult,
    TransactionStatusTimeout,
    BillManagerResult,
}

impl CallbackKind {
    pub const ALL: [CallbackKind; 8] = [
        CallbackKind::StkResult,
        CallbackKind::B2cResult,
        CallbackKind::B2cTimeout,
        CallbackKind::C2bConfirmation,
        CallbackKind::C2bValidation,
        CallbackKind::TransactionStatusResult,
        CallbackKind::TransactionStatusTimeout,
        CallbackKind::BillManagerResult,
    ];

    /// Path segment under `/callback`.
    pub fn route(&self) -> &'static str {
        match self {
            CallbackKind::StkResult => "stk-callback",
            CallbackKind::B2cResult => "b2c-result",
            CallbackKind::B2cTimeout => "b2c-timeout",
            CallbackKind::C2bConfirmation => "c2b-confirmation",
            CallbackKind::C2bValidation => "c2b-validation",
            CallbackKind::TransactionStatusResult => "transaction-status-result",
            CallbackKind::TransactionStatusTimeout => "transaction-status-timeout",
            CallbackKind::BillManagerResult => "bill-manager-callback",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CallbackKind::StkResult => "STK callback",
            CallbackKind::B2cResult => "B2C result callback",
            CallbackKind::B2cTimeout => "B2C timeout callback",
            CallbackKind::C2bConfirmation => "C2B confirmation callback",
            CallbackKind::C2bValidation => "C2B validation callback",
            CallbackKind::TransactionStatusResult => "Transaction status result callback",
            CallbackKind::TransactionStatusTimeout => "Transaction status timeout callback",
            CallbackKind::BillManagerResult => "Bill manager callback",
        }
    }

    fn summarize(&self, payload: &Value) -> Option<ResultSummary> {
        match self {
            CallbackKind::StkResult => ResultSummary::from_stk(payload),
            CallbackKind::B2cResult | CallbackKind::TransactionStatusResult => {
                ResultSummary::from_result(payload)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    #[serde(rename = "ResultDesc")]
    pub result_desc: &'static str,
}

impl CallbackAck {
    pub fn accepted() -> Self {
        CallbackAck {
            result_code: 0,
            result_desc: "Success",
        }
    }
}

/// Logs whatever arrived and always accepts it.
pub async fn acknowledge(kind: CallbackKind, body: Bytes) -> Json<CallbackAck> {
    match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => {
            info!("{} received: {}", kind.label(), payload);
            if let Some(summary) = kind.summarize(&payload) {
                log_summary(kind, &summary);
            }
        }
        Err(_) if body.is_empty() => info!("{} received with empty body", kind.label()),
        Err(_) => info!(
            "{} received (non-JSON): {}",
            kind.label(),
            String::from_utf8_lossy(&body)
        ),
    }

    Json(CallbackAck::accepted())
}

fn log_summary(kind: CallbackKind, summary: &ResultSummary) {
    let reference = summary.reference.as_deref().unwrap_or("-");
    if summary.is_success() {
        info!("{} succeeded: {} ({})", kind.label(), reference, summary.result_desc);
    } else {
        warn!(
            "{} reported failure {} for {}: {}",
            kind.label(),
            summary.result_code,
            reference,
            summary.result_desc
        );
    }
}
