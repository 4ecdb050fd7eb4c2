// config.rs
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::errors::{AppError, Result};

const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpesaEnvironment {
    Sandbox,
    Production,
}

impl MpesaEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            MpesaEnvironment::Sandbox => SANDBOX_BASE_URL,
            MpesaEnvironment::Production => PRODUCTION_BASE_URL,
        }
    }
}

impl FromStr for MpesaEnvironment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(MpesaEnvironment::Sandbox),
            "production" => Ok(MpesaEnvironment::Production),
            other => Err(AppError::configuration(format!(
                "MPESA_ENVIRONMENT must be 'sandbox' or 'production', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for MpesaEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MpesaEnvironment::Sandbox => write!(f, "sandbox"),
            MpesaEnvironment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings, read once at startup and never mutated.
#[derive(Clone)]
pub struct AppConfig {
    pub mpesa_consumer_key: String,
    pub mpesa_consumer_secret: String,
    pub mpesa_short_code: String,
    pub mpesa_passkey: String,
    pub mpesa_initiator_name: String,
    pub mpesa_security_credential: String,
    pub mpesa_environment: MpesaEnvironment,
    /// Gateway root, without a trailing slash.
    pub base_url: String,
    /// Public root of the `/callback` routes, without a trailing slash.
    pub callback_url: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String> {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AppError::configuration(format!("{} must be set", name)))
        };
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mpesa_environment = match optional("MPESA_ENVIRONMENT") {
            Some(value) => value.parse()?,
            None => MpesaEnvironment::Sandbox,
        };

        let base_url = optional("MPESA_BASE_URL")
            .unwrap_or_else(|| mpesa_environment.base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        let port = match optional("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| AppError::configuration(format!("PORT must be a number, got '{}'", value)))?,
            None => 3000,
        };

        Ok(AppConfig {
            mpesa_consumer_key: required("MPESA_CONSUMER_KEY")?,
            mpesa_consumer_secret: required("MPESA_CONSUMER_SECRET")?,
            mpesa_short_code: required("MPESA_SHORT_CODE")?,
            mpesa_passkey: required("MPESA_PASSKEY")?,
            mpesa_initiator_name: required("MPESA_INITIATOR_NAME")?,
            mpesa_security_credential: required("MPESA_SECURITY_CREDENTIAL")?,
            mpesa_environment,
            base_url,
            callback_url: required("CALLBACK_URL")?.trim_end_matches('/').to_string(),
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }

    pub fn gateway_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn callback_url(&self, route: &str) -> String {
        format!("{}/{}", self.callback_url, route.trim_start_matches('/'))
    }

    pub fn is_production(&self) -> bool {
        self.mpesa_environment == MpesaEnvironment::Production
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.mpesa_environment.to_string(),
            "isProduction": self.is_production(),
            "baseUrl": self.base_url,
            "shortCode": self.mpesa_short_code,
            "initiatorName": self.mpesa_initiator_name,
            "callbackUrl": self.callback_url,
        })
    }
}

// Secrets stay out of logs even when the whole config is debug-printed.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("mpesa_short_code", &self.mpesa_short_code)
            .field("mpesa_initiator_name", &self.mpesa_initiator_name)
            .field("mpesa_environment", &self.mpesa_environment)
            .field("base_url", &self.base_url)
            .field("callback_url", &self.callback_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}
