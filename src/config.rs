use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use std::str::FromStr;

pub const DEFAULT_ALLOWED_EXTENSIONS: &str = "png,jpg,jpeg,gif,webp";
pub const DEFAULT_PRESIGNED_URL_EXPIRATION: u32 = 3600;
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_content_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    S3,
    Memory,
}

impl FromStr for StorageProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "s3" => Ok(StorageProvider::S3),
            "memory" => Ok(StorageProvider::Memory),
            other => Err(anyhow!("Unknown STORAGE_PROVIDER '{}', expected 's3' or 'memory'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_path_style: bool,
    pub presigned_url_expiration: u32,
    pub allowed_extensions: BTreeSet<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            server: ServerConfig {
                port: var("PORT", "5000")
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: var("HOST", "0.0.0.0"),
                cors_allowed_origins: split_list(&var("ALLOWED_ORIGINS", "*")),
                max_content_length: var("MAX_CONTENT_LENGTH", &DEFAULT_MAX_CONTENT_LENGTH.to_string())
                    .parse()
                    .context("MAX_CONTENT_LENGTH must be a number of bytes")?,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
                max_connections: var("DB_MAX_CONNECTIONS", "10")
                    .parse()
                    .context("DB_MAX_CONNECTIONS must be a number")?,
                min_connections: var("DB_MIN_CONNECTIONS", "1")
                    .parse()
                    .context("DB_MIN_CONNECTIONS must be a number")?,
            },
            storage: StorageConfig {
                provider: var("STORAGE_PROVIDER", "s3").parse()?,
                s3_bucket: lookup("S3_BUCKET").unwrap_or_default(),
                s3_region: var("S3_REGION", "us-east-1"),
                s3_access_key_id: lookup("AWS_ACCESS_KEY_ID"),
                s3_secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
                s3_endpoint: lookup("S3_ENDPOINT").filter(|s| !s.trim().is_empty()),
                s3_path_style: var("S3_PATH_STYLE", "false")
                    .parse()
                    .context("S3_PATH_STYLE must be 'true' or 'false'")?,
                presigned_url_expiration: var(
                    "PRESIGNED_URL_EXPIRATION",
                    &DEFAULT_PRESIGNED_URL_EXPIRATION.to_string(),
                )
                .parse()
                .context("PRESIGNED_URL_EXPIRATION must be a number of seconds")?,
                allowed_extensions: split_list(&var("ALLOWED_EXTENSIONS", DEFAULT_ALLOWED_EXTENSIONS))
                    .into_iter()
                    .map(|ext| ext.trim_start_matches('.').to_lowercase())
                    .collect(),
            },
        };

        if config.storage.provider == StorageProvider::S3 && config.storage.s3_bucket.is_empty() {
            return Err(anyhow!("S3_BUCKET must be set when STORAGE_PROVIDER is 's3'"));
        }

        Ok(config)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
