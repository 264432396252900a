//! Process configuration, read from the environment (and `.env` when present).

use crate::errors::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    pub shop: String,
    pub access_token: String,
    pub api_version: String,
}

/// Scheduling policy of the batch loop.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Minimum delay between two backers.
    pub pacing_interval: Duration,
    /// Upper bound for every external call.
    pub call_timeout: Duration,
    pub discount_validity_days: i64,
    pub base_url: String,
    pub shop_domain: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            pacing_interval: Duration::from_millis(default_pacing_ms()),
            call_timeout: Duration::from_millis(default_timeout_ms()),
            discount_validity_days: default_validity_days(),
            base_url: default_base_url(),
            shop_domain: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` in dry-run mode.
    pub shopify: Option<ShopifyConfig>,
    pub catalog_path: PathBuf,
    pub pledge_csv_path: PathBuf,
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
    pub pipeline: PipelineSettings,
    pub dry_run: bool,
}

fn default_pacing_ms() -> u64 {
    2000
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_validity_days() -> i64 {
    90
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let dry_run = parse_or(&get, "DRY_RUN", false)?;

        let shopify = match (get("SHOPIFY_SHOP"), get("SHOPIFY_ACCESS_TOKEN")) {
            (Some(shop), Some(access_token)) => Some(ShopifyConfig {
                shop,
                access_token,
                api_version: get("SHOPIFY_API_VERSION").unwrap_or_else(|| "2023-10".to_string()),
            }),
            _ if dry_run => None,
            (None, _) => return Err(ConfigError::Missing("SHOPIFY_SHOP")),
            (Some(_), None) => return Err(ConfigError::Missing("SHOPIFY_ACCESS_TOKEN")),
        };

        let shop_domain = get("SHOP_DOMAIN")
            .or_else(|| shopify.as_ref().map(|s| format!("{}.myshopify.com", s.shop)))
            .unwrap_or_else(|| "localhost".to_string());

        let pipeline = PipelineSettings {
            pacing_interval: Duration::from_millis(parse_or(&get, "PACING_INTERVAL_MS", default_pacing_ms())?),
            call_timeout: Duration::from_millis(parse_or(&get, "TIMEOUT_MS", default_timeout_ms())?),
            discount_validity_days: parse_or(&get, "DISCOUNT_VALIDITY_DAYS", default_validity_days())?,
            base_url: get("BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(default_base_url),
            shop_domain,
        };
        if pipeline.call_timeout.is_zero() {
            return Err(ConfigError::Invalid { key: "TIMEOUT_MS", value: "0".to_string() });
        }
        if pipeline.discount_validity_days <= 0 {
            return Err(ConfigError::Invalid {
                key: "DISCOUNT_VALIDITY_DAYS",
                value: pipeline.discount_validity_days.to_string(),
            });
        }

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&get, "PORT", 3000)?,
            shopify,
            catalog_path: get("CATALOG_PATH").unwrap_or_else(|| "config/catalog.json".to_string()).into(),
            pledge_csv_path: get("PLEDGE_CSV_PATH").unwrap_or_else(|| "./data/kickstarter.csv".to_string()).into(),
            upload_dir: get("UPLOAD_DIR").unwrap_or_else(|| "./data".to_string()).into(),
            results_dir: get("RESULTS_DIR").unwrap_or_else(|| "./results".to_string()).into(),
            pipeline,
            dry_run,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
