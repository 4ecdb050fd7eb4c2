// handlers/mpesa_handlers.rs
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use validator::Validate;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::handlers::callback_handlers::CallbackKind;
use crate::models::transaction::Transaction;
use crate::services::mpesa_service::{
    self, format_phone_number, generate_password, request_timestamp, B2CRequest,
    BillManagerRequest, C2BRegisterRequest, StkPushRequest, TransactionStatusRequest,
};
use crate::state::AppState;

const PHONE_AND_AMOUNT_REQUIRED: &str = "Phone number and amount are required";
const TRANSACTION_ID_REQUIRED: &str = "Transaction ID is required";
const BILL_FIELDS_REQUIRED: &str = "Bill reference, amount, and phone number are required";

const B2C_COMMANDS: [&str; 3] = ["BusinessPayment", "SalaryPayment", "PromotionPayment"];

/// One gateway call as the client sees it.
struct Operation {
    label: &'static str,
    path: &'static str,
    success_message: &'static str,
}

const STK_PUSH: Operation = Operation {
    label: "STK push",
    path: mpesa_service::STK_PUSH_PATH,
    success_message: "STK push sent successfully",
};

const B2C_PAYMENT: Operation = Operation {
    label: "B2C payment",
    path: mpesa_service::B2C_PATH,
    success_message: "B2C payment initiated successfully",
};

const C2B_REGISTRATION: Operation = Operation {
    label: "C2B registration",
    path: mpesa_service::C2B_REGISTER_PATH,
    success_message: "C2B URLs registered successfully",
};

const TRANSACTION_STATUS: Operation = Operation {
    label: "Transaction status query",
    path: mpesa_service::TRANSACTION_STATUS_PATH,
    success_message: "Transaction status query initiated successfully",
};

const BILL_PAYMENT: Operation = Operation {
    label: "Bill payment",
    path: mpesa_service::BILL_MANAGER_PATH,
    success_message: "Bill payment initiated successfully",
};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

// C2B Request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StkPushBody {
    #[validate(required, length(min = 1))]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "present_amount")]
    #[validate(required)]
    pub amount: Option<Value>,
    pub reference: Option<String>,
}

// B2C Request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct B2CBody {
    #[validate(required, length(min = 1))]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "present_amount")]
    #[validate(required)]
    pub amount: Option<Value>,
    /// `None` when absent, `Some(None)` when sent as `null`.
    #[serde(default, deserialize_with = "explicit_field")]
    pub reason: Option<Option<String>>,
    pub command_id: Option<String>,
    pub occasion: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatusBody {
    #[validate(required, length(min = 1))]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BillManagerBody {
    #[validate(required, length(min = 1))]
    pub bill_reference: Option<String>,
    #[serde(default, deserialize_with = "present_amount")]
    #[validate(required)]
    pub amount: Option<Value>,
    #[validate(required, length(min = 1))]
    pub phone_number: Option<String>,
}

/// Drops amounts that read as "not provided": `null`, `false`, zero and the
/// empty string. Anything else, including `true` and objects, is relayed.
fn present_amount<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = Option::<Value>::deserialize(deserializer)?;
    Ok(amount.filter(|value| match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }))
}

fn explicit_field<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// An unreadable body is treated as an empty one, so it fails validation
/// with the route's usual message.
fn read_body<T: Default>(payload: std::result::Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!("Unreadable request body: {}", rejection);
            T::default()
        }
    }
}

fn non_empty_or<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => default,
    }
}

async fn relay<P, F>(
    state: &AppState,
    operation: &Operation,
    build: F,
) -> Result<Json<ApiResponse<Value>>>
where
    P: Serialize,
    F: FnOnce(&AppConfig) -> P,
{
    match state.mpesa_service.relay(operation.path, build).await {
        Ok(data) => {
            info!("{} succeeded", operation.label);
            Ok(Json(ApiResponse {
                success: true,
                message: Some(operation.success_message.to_string()),
                data,
            }))
        }
        Err(e) => {
            error!("{} error: {}", operation.label, e);
            Err(AppError::relay(operation.label, e))
        }
    }
}

// C2B Handlers
pub async fn initiate_stk_push(
    State(state): State<AppState>,
    payload: std::result::Result<Json<StkPushBody>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>> {
    let body = read_body(payload);
    info!("Received STK push request: {:?}", body);

    body.validate()
        .map_err(|_| AppError::invalid_data(PHONE_AND_AMOUNT_REQUIRED))?;

    let phone = format_phone_number(body.phone_number.as_deref().unwrap_or_default());
    let amount = body.amount.unwrap_or_default();
    let reference = non_empty_or(body.reference.as_deref(), "Payment").to_string();

    relay(&state, &STK_PUSH, move |config| {
        let timestamp = request_timestamp(Utc::now());
        StkPushRequest {
            business_short_code: config.mpesa_short_code.clone(),
            password: generate_password(&config.mpesa_short_code, &config.mpesa_passkey, &timestamp),
            timestamp,
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount,
            party_a: phone.clone(),
            party_b: config.mpesa_short_code.clone(),
            phone_number: phone,
            callback_url: config.callback_url(CallbackKind::StkResult.route()),
            account_reference: reference.clone(),
            transaction_desc: reference,
        }
    })
    .await
}

pub async fn register_c2b_urls(State(state): State<AppState>) -> Result<Json<ApiResponse<Value>>> {
    info!("Registering C2B URLs");

    relay(&state, &C2B_REGISTRATION, |config| C2BRegisterRequest {
        short_code: config.mpesa_short_code.clone(),
        response_type: "Completed".to_string(),
        confirmation_url: config.callback_url(CallbackKind::C2bConfirmation.route()),
        validation_url: config.callback_url(CallbackKind::C2bValidation.route()),
    })
    .await
}

// B2C Handlers
pub async fn send_b2c_payment(
    State(state): State<AppState>,
    payload: std::result::Result<Json<B2CBody>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>> {
    let body = read_body(payload);
    info!("Received B2C request: {:?}", body);

    body.validate()
        .map_err(|_| AppError::invalid_data(PHONE_AND_AMOUNT_REQUIRED))?;

    let command_id = non_empty_or(body.command_id.as_deref(), B2C_COMMANDS[0]);
    if !B2C_COMMANDS.contains(&command_id) {
        return Err(AppError::invalid_data(
            "Invalid commandId. Must be: BusinessPayment, SalaryPayment, or PromotionPayment",
        ));
    }
    let command_id = command_id.to_string();

    let phone = format_phone_number(body.phone_number.as_deref().unwrap_or_default());
    let amount = body.amount.unwrap_or_default();
    let remarks = match body.reason.as_ref() {
        None => "Salary".to_string(),
        Some(reason) => non_empty_or(reason.as_deref(), "Payment").to_string(),
    };
    let occasion = body.occasion.unwrap_or_default();

    relay(&state, &B2C_PAYMENT, move |config| B2CRequest {
        initiator_name: config.mpesa_initiator_name.clone(),
        security_credential: config.mpesa_security_credential.clone(),
        command_id,
        amount,
        party_a: config.mpesa_short_code.clone(),
        party_b: phone,
        remarks,
        queue_timeout_url: config.callback_url(CallbackKind::B2cTimeout.route()),
        result_url: config.callback_url(CallbackKind::B2cResult.route()),
        occasion,
    })
    .await
}

pub async fn query_transaction_status(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TransactionStatusBody>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>> {
    let body = read_body(payload);
    info!("Received transaction status request: {:?}", body);

    body.validate()
        .map_err(|_| AppError::invalid_data(TRANSACTION_ID_REQUIRED))?;

    let transaction_id = body.transaction_id.unwrap_or_default();

    relay(&state, &TRANSACTION_STATUS, move |config| TransactionStatusRequest {
        initiator: config.mpesa_initiator_name.clone(),
        security_credential: config.mpesa_security_credential.clone(),
        command_id: "TransactionStatusQuery".to_string(),
        transaction_id,
        party_a: config.mpesa_short_code.clone(),
        identifier_type: "4".to_string(),
        result_url: config.callback_url(CallbackKind::TransactionStatusResult.route()),
        queue_timeout_url: config.callback_url(CallbackKind::TransactionStatusTimeout.route()),
        remarks: "Transaction status query".to_string(),
        occasion: String::new(),
    })
    .await
}

pub async fn pay_bill(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BillManagerBody>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>> {
    let body = read_body(payload);
    info!("Received bill payment request: {:?}", body);

    body.validate()
        .map_err(|_| AppError::invalid_data(BILL_FIELDS_REQUIRED))?;

    let bill_reference = body.bill_reference.unwrap_or_default();
    let phone = format_phone_number(body.phone_number.as_deref().unwrap_or_default());
    let amount = body.amount.unwrap_or_default();

    relay(&state, &BILL_PAYMENT, move |config| BillManagerRequest {
        external_reference: bill_reference.clone(),
        amount,
        msisdn: phone,
        account_reference: bill_reference,
        callback_url: config.callback_url(CallbackKind::BillManagerResult.route()),
    })
    .await
}

pub async fn get_transactions() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            message: None,
            data: vec![Transaction::sample(Utc::now())],
        }),
    )
}
