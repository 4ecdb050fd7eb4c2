// models/callback.rs
//
// Typed views over the gateway's result envelopes. Only used to pull a
// result code out for logging; unknown shapes are simply not summarized.
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: Option<String>,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,
}

/// Shared by B2C and transaction-status results.
#[derive(Debug, Deserialize)]
pub struct ResultEnvelope {
    #[serde(rename = "Result")]
    pub result: GatewayResult,
}

#[derive(Debug, Deserialize)]
pub struct GatewayResult {
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,
    #[serde(rename = "ConversationID", default)]
    pub conversation_id: Option<String>,
    #[serde(rename = "TransactionID", default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub result_code: i64,
    pub result_desc: String,
    /// Checkout request ID, conversation ID or transaction ID, whichever the envelope carries.
    pub reference: Option<String>,
}

impl ResultSummary {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    pub fn from_stk(payload: &Value) -> Option<Self> {
        let envelope = StkCallbackEnvelope::deserialize(payload).ok()?;
        let callback = envelope.body.stk_callback;
        Some(ResultSummary {
            result_code: callback.result_code,
            result_desc: callback.result_desc,
            reference: callback.checkout_request_id.or(callback.merchant_request_id),
        })
    }

    pub fn from_result(payload: &Value) -> Option<Self> {
        let envelope = ResultEnvelope::deserialize(payload).ok()?;
        let result = envelope.result;
        Some(ResultSummary {
            result_code: result.result_code,
            result_desc: result.result_desc,
            reference: result.transaction_id.or(result.conversation_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summarizes_stk_callback() {
        let payload = json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_191220191020363925",
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user"
                }
            }
        });
        let summary = ResultSummary::from_stk(&payload).unwrap();
        assert_eq!(summary.result_code, 1032);
        assert!(!summary.is_success());
        assert_eq!(summary.reference.as_deref(), Some("ws_CO_191220191020363925"));
    }

    #[test]
    fn summarizes_b2c_result() {
        let payload = json!({
            "Result": {
                "ResultType": 0,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "ConversationID": "AG_20191219_00005797af5d7d75f652",
                "TransactionID": "NLJ41HAY6Q"
            }
        });
        let summary = ResultSummary::from_result(&payload).unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.reference.as_deref(), Some("NLJ41HAY6Q"));
    }

    #[test]
    fn unknown_shapes_are_not_summarized() {
        assert!(ResultSummary::from_stk(&json!({"foo": "bar"})).is_none());
        assert!(ResultSummary::from_result(&Value::Null).is_none());
        assert!(ResultSummary::from_result(&json!({"Result": {"ResultCode": "zero"}})).is_none());
    }
}
