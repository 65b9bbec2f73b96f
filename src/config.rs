// Adapted from https://dev.to/bdhobare/managing-application-config-in-rust-23ai
use chrono_tz::Tz;
use std::{collections::HashMap, time::Duration};
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEZONE: &str = "America/New_York";
const DEFAULT_PHONE_PREFIX: &str = "+1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_QUERY_STALE_MS: u64 = 1000;

#[derive(Clone, Debug)]
pub struct Config {
    pub reminders_api_url: Url,
    pub default_timezone: String,
    pub default_phone_prefix: String,
    pub port: u16,
    pub query_stale_time: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to parse {name} as a URL: {source}")]
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },

    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("DEFAULT_TIMEZONE is not an IANA timezone: {0}")]
    InvalidTimezone(String),
}

pub trait ConfigProvider {
    fn get_config(&self) -> &Config;
}

pub struct EnvVarProvider(Config);

impl EnvVarProvider {
    pub fn new(args: HashMap<String, String>) -> Result<Self, ConfigError> {
        let reminders_api_url = Url::parse(
            args.get("REMINDERS_API_URL")
                .map(String::as_str)
                .unwrap_or(DEFAULT_API_URL),
        )
        .map_err(|source| ConfigError::InvalidUrl {
            name: "REMINDERS_API_URL",
            source,
        })?;

        let default_timezone = args
            .get("DEFAULT_TIMEZONE")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

        if default_timezone.parse::<Tz>().is_err() {
            return Err(ConfigError::InvalidTimezone(default_timezone));
        }

        let port = parse_number(&args, "PORT", DEFAULT_PORT)?;
        let query_stale_ms = parse_number(&args, "QUERY_STALE_MS", DEFAULT_QUERY_STALE_MS)?;

        let config = Config {
            reminders_api_url,
            default_timezone,
            default_phone_prefix: args
                .get("DEFAULT_PHONE_PREFIX")
                .cloned()
                .unwrap_or_else(|| DEFAULT_PHONE_PREFIX.to_string()),
            port,
            query_stale_time: Duration::from_millis(query_stale_ms),
        };

        Ok(EnvVarProvider(config))
    }
}

fn parse_number<T: std::str::FromStr>(
    args: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match args.get(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidNumber {
            name,
            value: value.clone(),
        }),
        None => Ok(default),
    }
}

impl ConfigProvider for EnvVarProvider {
    fn get_config(&self) -> &Config {
        &self.0
    }
}
