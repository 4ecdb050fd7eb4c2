// models/transaction.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A payment as reported to clients. Nothing stores these; the listing
/// endpoint serves a fixed sample.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub phone_number: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub status: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn sample(now: DateTime<Utc>) -> Self {
        Transaction {
            id: "1".to_string(),
            kind: "STK Push".to_string(),
            phone_number: "254728240104".to_string(),
            amount: "100".to_string(),
            reference: None,
            transaction_id: None,
            status: "Completed".to_string(),
            created_at: now,
        }
    }
}
