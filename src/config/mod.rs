#[cfg(feature = "cli")]
pub mod cli;

use crate::adapters::resend::DEFAULT_RESEND_API_URL;
use crate::adapters::{PostgrestOrderStore, ResendDispatcher};
use crate::core::period::CycleSchedule;
use crate::core::render::{RenderOptions, DEFAULT_FLOOR_NUMBER, DEFAULT_TITLE, DEFAULT_ZONE_LABEL};
use crate::core::report::ReportSettings;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const ENV_RESEND_API_KEY: &str = "RESEND_API_KEY";
pub const ENV_RESEND_API_URL: &str = "RESEND_API_URL";
pub const ENV_FROM_ADDRESS: &str = "EMAIL_FROM_ADDRESS";
pub const ENV_RECIPIENTS: &str = "REPORT_RECIPIENTS";
pub const ENV_FLOOR_NUMBER: &str = "FLOOR_NUMBER";
pub const ENV_ZONE_LABEL: &str = "REPORT_ZONE_LABEL";
pub const ENV_REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT_SECONDS";

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

fn default_resend_api_url() -> String {
    DEFAULT_RESEND_API_URL.to_string()
}

fn default_floor_number() -> String {
    DEFAULT_FLOOR_NUMBER.to_string()
}

fn default_zone_label() -> String {
    DEFAULT_ZONE_LABEL.to_string()
}

fn default_request_timeout_seconds() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECONDS
}

/// Everything one report run needs from its environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub resend_api_key: String,
    #[serde(default = "default_resend_api_url")]
    pub resend_api_url: String,
    pub from_address: String,
    pub recipients: Vec<String>,
    #[serde(default = "default_floor_number")]
    pub floor_number: String,
    #[serde(default = "default_zone_label")]
    pub zone_label: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

// Keys stay out of logs.
impl std::fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_service_role_key", &"<redacted>")
            .field("resend_api_key", &"<redacted>")
            .field("resend_api_url", &self.resend_api_url)
            .field("from_address", &self.from_address)
            .field("recipients", &self.recipients)
            .field("floor_number", &self.floor_number)
            .field("zone_label", &self.zone_label)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl ReportConfig {
    /// Builds the config from a key lookup; blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| -> Result<String> {
            validate_required_field(key, &get(key)).cloned()
        };

        let recipients: Vec<String> = get(ENV_RECIPIENTS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if recipients.is_empty() {
            return Err(ReportError::MissingConfigError {
                field: ENV_RECIPIENTS.to_string(),
            });
        }

        let request_timeout_seconds = match get(ENV_REQUEST_TIMEOUT) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ReportError::InvalidConfigValueError {
                field: ENV_REQUEST_TIMEOUT.to_string(),
                value: raw.clone(),
                reason: "Expected a whole number of seconds".to_string(),
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECONDS,
        };

        Ok(Self {
            supabase_url: required(ENV_SUPABASE_URL)?,
            supabase_service_role_key: required(ENV_SUPABASE_KEY)?,
            resend_api_key: required(ENV_RESEND_API_KEY)?,
            resend_api_url: get(ENV_RESEND_API_URL).unwrap_or_else(default_resend_api_url),
            from_address: required(ENV_FROM_ADDRESS)?,
            recipients,
            floor_number: get(ENV_FLOOR_NUMBER).unwrap_or_else(default_floor_number),
            zone_label: get(ENV_ZONE_LABEL).unwrap_or_else(default_zone_label),
            request_timeout_seconds,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ReportError::ConfigError {
            message: format!("Cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn settings(&self) -> ReportSettings {
        ReportSettings {
            schedule: CycleSchedule::default(),
            render: RenderOptions {
                title: DEFAULT_TITLE.to_string(),
                floor_number: self.floor_number.clone(),
                zone_label: self.zone_label.clone(),
            },
            from_address: self.from_address.clone(),
            recipients: self.recipients.clone(),
        }
    }

    pub fn order_store(&self) -> Result<PostgrestOrderStore> {
        PostgrestOrderStore::new(
            &self.supabase_url,
            &self.supabase_service_role_key,
            self.request_timeout(),
        )
    }

    pub fn email_dispatcher(&self) -> Result<ResendDispatcher> {
        ResendDispatcher::new(&self.resend_api_url, &self.resend_api_key, self.request_timeout())
    }
}

impl Validate for ReportConfig {
    fn validate(&self) -> Result<()> {
        validate_url("supabase_url", &self.supabase_url)?;
        validate_non_empty_string("supabase_service_role_key", &self.supabase_service_role_key)?;
        validate_non_empty_string("resend_api_key", &self.resend_api_key)?;
        validate_url("resend_api_url", &self.resend_api_url)?;
        validate_email_address("from_address", &self.from_address)?;

        if self.recipients.is_empty() {
            return Err(ReportError::MissingConfigError {
                field: "recipients".to_string(),
            });
        }
        for recipient in &self.recipients {
            validate_email_address("recipients", recipient)?;
        }

        validate_non_empty_string("floor_number", &self.floor_number)?;
        validate_range("request_timeout_seconds", self.request_timeout_seconds, 1, 300)?;

        tracing::debug!("Report configuration validation passed");
        Ok(())
    }
}
