// services/mpesa_service.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::{header, Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::{AppError, Result};

pub const AUTH_PATH: &str = "/oauth/v1/generate?grant_type=client_credentials";
pub const STK_PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";
pub const B2C_PATH: &str = "/mpesa/b2c/v1/paymentrequest";
pub const C2B_REGISTER_PATH: &str = "/mpesa/c2b/v1/registerurl";
pub const TRANSACTION_STATUS_PATH: &str = "/mpesa/transactionstatus/v1/query";
pub const BILL_MANAGER_PATH: &str = "/mpesa/billmanager/v1/paymentrequest";

/// Daraja timestamps are East Africa Time (UTC+3).
const EAT_OFFSET_SECS: i32 = 3 * 3600;
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
}

// C2B Structs
#[derive(Debug, Serialize)]
pub struct StkPushRequest {
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "Amount")]
    pub amount: Value,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "TransactionDesc")]
    pub transaction_desc: String,
}

#[derive(Debug, Serialize)]
pub struct C2BRegisterRequest {
    #[serde(rename = "ShortCode")]
    pub short_code: String,
    #[serde(rename = "ResponseType")]
    pub response_type: String,
    #[serde(rename = "ConfirmationURL")]
    pub confirmation_url: String,
    #[serde(rename = "ValidationURL")]
    pub validation_url: String,
}

// B2C Structs
#[derive(Debug, Serialize)]
pub struct B2CRequest {
    #[serde(rename = "InitiatorName")]
    pub initiator_name: String,
    #[serde(rename = "SecurityCredential")]
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: String,
    #[serde(rename = "Amount")]
    pub amount: Value,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_timeout_url: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
    #[serde(rename = "Occasion")]
    pub occasion: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionStatusRequest {
    #[serde(rename = "Initiator")]
    pub initiator: String,
    #[serde(rename = "SecurityCredential")]
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: String,
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "IdentifierType")]
    pub identifier_type: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_timeout_url: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "Occasion")]
    pub occasion: String,
}

#[derive(Debug, Serialize)]
pub struct BillManagerRequest {
    #[serde(rename = "ExternalReference")]
    pub external_reference: String,
    #[serde(rename = "Amount")]
    pub amount: Value,
    #[serde(rename = "MSISDN")]
    pub msisdn: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
}

/// Rewrites a local `0…` number into the `254…` country-code form.
/// Anything else is passed through untouched.
pub fn format_phone_number(phone: &str) -> String {
    match phone.strip_prefix('0') {
        Some(rest) => format!("254{}", rest),
        None => phone.to_string(),
    }
}

pub fn request_timestamp(now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(EAT_OFFSET_SECS) {
        Some(eat) => now.with_timezone(&eat).format(TIMESTAMP_FORMAT).to_string(),
        None => now.format(TIMESTAMP_FORMAT).to_string(),
    }
}

pub fn generate_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    base64.encode(format!("{}{}{}", short_code, passkey, timestamp))
}

#[derive(Debug, Clone)]
pub struct MpesaService {
    config: AppConfig,
    client: Client,
}

impl MpesaService {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::HttpClientError(e.to_string()))?;

        Ok(MpesaService { config, client })
    }

    pub async fn get_access_token(&self) -> Result<String> {
        let encoded_auth = base64.encode(format!(
            "{}:{}",
            self.config.mpesa_consumer_key, self.config.mpesa_consumer_secret
        ));
        let auth_url = self.config.gateway_url(AUTH_PATH);

        info!("Requesting access token from {}", auth_url);

        let response = self
            .client
            .get(&auth_url)
            .header(header::AUTHORIZATION, format!("Basic {}", encoded_auth))
            .send()
            .await
            .map_err(|e| {
                error!("Access token request failed: {}", e);
                AppError::access_token(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Failed to get access token: {} - {}", status, body);
            return Err(AppError::access_token(format!(
                "Request failed with status code {}",
                status.as_u16()
            )));
        }

        let auth_response: AuthResponse = response.json().await.map_err(|e| {
            error!("Malformed access token response: {}", e);
            AppError::access_token(e.to_string())
        })?;

        info!("Access token obtained");
        Ok(auth_response.access_token)
    }

    /// Fetches a fresh token, builds the payload and makes the single
    /// outbound call. Returns the gateway's body on 2xx.
    pub async fn relay<P, F>(&self, path: &str, build: F) -> Result<Value>
    where
        P: Serialize,
        F: FnOnce(&AppConfig) -> P,
    {
        let access_token = self.get_access_token().await?;
        let payload = build(&self.config);
        let url = self.config.gateway_url(path);

        // Payloads carry the password and security credential; log the path only.
        info!("Calling gateway: POST {}", path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&access_token)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await?;

        read_gateway_response(path, response).await
    }
}

async fn read_gateway_response(path: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;
    let body = parse_body(&text);

    if !status.is_success() {
        error!("{} failed: {} - {}", path, status, text);
        return Err(AppError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    info!("{} response: {}", path, text);
    Ok(body.unwrap_or(Value::Null))
}

// The gateway mostly answers JSON, but proxies in front of it do not.
fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn leading_zero_becomes_country_code() {
        assert_eq!(format_phone_number("0712345678"), "254712345678");
        assert_eq!(format_phone_number("0"), "254");
        assert_eq!(format_phone_number("00712"), "2540712");
    }

    #[test]
    fn other_numbers_pass_through() {
        for phone in ["254712345678", "712345678", "+254712345678", "", " 0712"] {
            assert_eq!(format_phone_number(phone), phone);
        }
    }

    #[test]
    fn timestamp_is_east_africa_time() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 22, 5, 9).unwrap();
        assert_eq!(request_timestamp(now), "20240201010509");
    }

    #[test]
    fn password_is_base64_of_shortcode_passkey_timestamp() {
        let password = generate_password("174379", "passkey", "20240101120000");
        let decoded = base64.decode(password).unwrap();
        assert_eq!(decoded, b"174379passkey20240101120000");
    }

    #[test]
    fn stk_payload_uses_gateway_field_names() {
        let request = StkPushRequest {
            business_short_code: "174379".into(),
            password: "pw".into(),
            timestamp: "20240101120000".into(),
            transaction_type: "CustomerPayBillOnline".into(),
            amount: json!(100),
            party_a: "254712345678".into(),
            party_b: "174379".into(),
            phone_number: "254712345678".into(),
            callback_url: "https://relay.example.com/callback/stk-callback".into(),
            account_reference: "Payment".into(),
            transaction_desc: "Payment".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["BusinessShortCode"], "174379");
        assert_eq!(value["PartyA"], "254712345678");
        assert_eq!(value["CallBackURL"], "https://relay.example.com/callback/stk-callback");
        assert_eq!(value["Amount"], 100);
    }

    #[test]
    fn non_json_bodies_are_kept_as_text() {
        assert_eq!(parse_body(""), None);
        assert_eq!(parse_body("{\"a\":1}"), Some(json!({"a": 1})));
        assert_eq!(parse_body("Bad Gateway"), Some(json!("Bad Gateway")));
    }
}
