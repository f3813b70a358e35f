//! Runtime configuration, read once from the environment at start-up.
//!
//! Every setting has a default so the service runs out of the box; a variable
//! that is present but unparsable aborts start-up instead of being ignored.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// How caller parameters reach a custom SQL template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamBinding {
    /// Placeholders become driver-bound `?N` parameters.
    Parameterized,
    /// Placeholders become quoted SQL literals in the statement text.
    Inline,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub public_base_url: String,
    pub exec_timeout: Duration,
    pub standard_row_limit: usize,
    pub param_binding: ParamBinding,
    pub fonts_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("REPORTS_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or("REPORTS_PORT", &lookup, 8080u16)?;
        let exec_timeout_secs = parse_or("REPORTS_EXEC_TIMEOUT_SECS", &lookup, 30u64)?;
        let standard_row_limit = parse_or("REPORTS_STANDARD_ROW_LIMIT", &lookup, 1000usize)?;
        if exec_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "REPORTS_EXEC_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        let param_binding = match lookup("REPORTS_PARAM_BINDING").as_deref() {
            None | Some("parameterized") => ParamBinding::Parameterized,
            Some("inline") => ParamBinding::Inline,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "REPORTS_PARAM_BINDING",
                    value: other.to_string(),
                })
            }
        };

        let public_base_url = lookup("REPORTS_PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://{}:{}/files", host, port));

        Ok(AppConfig {
            db_path: lookup("REPORTS_DB_PATH")
                .unwrap_or_else(|| "reports.sqlite".to_string())
                .into(),
            storage_dir: lookup("REPORTS_STORAGE_DIR")
                .unwrap_or_else(|| "./storage".to_string())
                .into(),
            fonts_dir: lookup("REPORTS_FONTS_DIR")
                .unwrap_or_else(|| "./fonts".to_string())
                .into(),
            host,
            port,
            public_base_url,
            exec_timeout: Duration::from_secs(exec_timeout_secs),
            standard_row_limit,
            param_binding,
        })
    }
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}
