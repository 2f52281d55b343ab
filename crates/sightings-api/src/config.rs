//! Configuration management for the Sightings API
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use mundo_common::FilterDimension;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Redis connection URL
    pub redis_url: String,

    /// Keep sightings in process memory instead of Redis (development only)
    pub memory_store: bool,

    /// Secondary filter the list endpoint accepts
    pub filter_dimension: FilterDimension,

    /// Bucket receiving photo uploads
    pub upload_bucket: String,

    /// Signing region of the bucket
    pub upload_region: String,

    /// S3-compatible endpoint override, e.g. a local MinIO
    pub upload_endpoint: Option<String>,

    pub aws_access_key_id: String,

    pub aws_secret_access_key: String,

    pub aws_session_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            memory_store: env::var("MEMORY_STORE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("Invalid MEMORY_STORE (expected true/false)")?,

            filter_dimension: env::var("FILTER_DIMENSION")
                .unwrap_or_else(|_| "category".to_string())
                .parse()
                .context("Invalid FILTER_DIMENSION")?,

            upload_bucket: env::var("UPLOAD_BUCKET")
                .unwrap_or_else(|_| "mundo-uploads".to_string()),

            upload_region: env::var("UPLOAD_REGION")
                .unwrap_or_else(|_| "us-east-1".to_string()),

            upload_endpoint: env::var("UPLOAD_ENDPOINT").ok().filter(|s| !s.is_empty()),

            aws_access_key_id: env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            aws_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            aws_session_token: env::var("AWS_SESSION_TOKEN").ok().filter(|s| !s.is_empty()),
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.upload_bucket.trim().is_empty() {
            anyhow::bail!("UPLOAD_BUCKET must not be empty");
        }

        if self.aws_access_key_id.is_empty() || self.aws_secret_access_key.is_empty() {
            anyhow::bail!("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are required");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
