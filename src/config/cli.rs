use crate::config::ReportConfig;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::Validate;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "order-report")]
#[command(about = "Builds the daily order summary and emails it to the kitchen")]
pub struct CliArgs {
    #[arg(long, help = "Read configuration from a TOML file instead of the environment")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Report as if invoked at this RFC 3339 instant")]
    pub now: Option<String>,

    #[arg(long, help = "Print the email instead of sending it")]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliArgs {
    pub fn load_config(&self) -> Result<ReportConfig> {
        match &self.config {
            Some(path) => ReportConfig::from_toml_file(path),
            None => ReportConfig::from_env(),
        }
    }

    /// Loads and validates; either failure is a configuration error.
    pub fn validated_config(&self) -> Result<ReportConfig> {
        let config = self.load_config()?;
        config.validate()?;
        Ok(config)
    }

    pub fn invocation_time(&self) -> Result<DateTime<Utc>> {
        match &self.now {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| ReportError::InvalidConfigValueError {
                    field: "now".to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }),
            None => Ok(Utc::now()),
        }
    }
}
