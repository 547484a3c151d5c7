use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::api::jwt::DEFAULT_TOKEN_TTL_HOURS;

pub const DEFAULT_TABLE_NAME: &str = "pickem-main";
pub const DEFAULT_API_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    DynamoDb,
    /// Process-local store; data is lost on exit
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dynamodb" | "dynamo" => Ok(StorageBackend::DynamoDb),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => bail!("unknown storage backend '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub table_name: String,
    pub storage: StorageBackend,
    pub api_addr: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub web_dir: Option<String>,
    pub scoring_concurrency: usize,
    pub max_retries: u32,
    pub request_timeout: Duration,
    /// Points the DynamoDB client at a local endpoint
    pub dynamodb_endpoint: Option<String>,
    /// Accounts registered under these names get admin rights
    pub admin_usernames: Vec<String>,
}

impl Config {
    /// Reads the `PICKEM_*` variables. Only the JWT secret is required.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("PICKEM_JWT_SECRET")
            .context("PICKEM_JWT_SECRET must be set in environment or .env file")?;
        if jwt_secret.trim().is_empty() {
            bail!("PICKEM_JWT_SECRET must not be empty");
        }

        let scoring_concurrency: usize = parse_var("PICKEM_SCORING_CONCURRENCY", 8)?;
        if scoring_concurrency == 0 {
            bail!("PICKEM_SCORING_CONCURRENCY must be at least 1");
        }

        Ok(Self {
            table_name: env::var("PICKEM_TABLE_NAME")
                .unwrap_or_else(|_| DEFAULT_TABLE_NAME.to_string()),
            storage: parse_var("PICKEM_STORAGE", StorageBackend::DynamoDb)?,
            api_addr: env::var("PICKEM_API_ADDR").unwrap_or_else(|_| DEFAULT_API_ADDR.to_string()),
            jwt_secret,
            token_ttl_hours: parse_var("PICKEM_TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?,
            web_dir: optional_var("PICKEM_WEB_DIR"),
            scoring_concurrency,
            max_retries: parse_var("PICKEM_MAX_RETRIES", 3)?,
            request_timeout: Duration::from_secs(parse_var("PICKEM_REQUEST_TIMEOUT_SECS", 10)?),
            dynamodb_endpoint: optional_var("DYNAMODB_ENDPOINT"),
            admin_usernames: optional_var("PICKEM_ADMIN_USERNAMES")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_var(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", name, raw, e))
}
