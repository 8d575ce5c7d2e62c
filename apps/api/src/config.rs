use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Raster drawn where a template says `[[firma]]`.
    pub signature_image_path: Option<PathBuf>,
    /// Raster drawn where a template says `[[timbre]]`.
    pub seal_image_path: Option<PathBuf>,
    pub signature_width_pt: f32,
    pub seal_width_pt: f32,
    pub audit_backend: AuditBackend,
}

/// Where audit events go: the `audit_log` table or the application log only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditBackend {
    Database,
    Log,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            signature_image_path: optional_env("SIGNATURE_IMAGE_PATH").map(PathBuf::from),
            seal_image_path: optional_env("SEAL_IMAGE_PATH").map(PathBuf::from),
            signature_width_pt: parse_width("SIGNATURE_WIDTH_PT", 120.0)?,
            seal_width_pt: parse_width("SEAL_WIDTH_PT", 80.0)?,
            audit_backend: parse_audit_backend(optional_env("AUDIT_SINK").as_deref())?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_width(key: &str, default: f32) -> Result<f32> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => {
            let width = raw
                .parse::<f32>()
                .with_context(|| format!("{key} must be a number of points"))?;
            anyhow::ensure!(width > 0.0, "{key} must be positive");
            Ok(width)
        }
    }
}

fn parse_audit_backend(raw: Option<&str>) -> Result<AuditBackend> {
    match raw.map(str::trim) {
        None | Some("db") => Ok(AuditBackend::Database),
        Some("log") => Ok(AuditBackend::Log),
        Some(other) => anyhow::bail!("AUDIT_SINK must be 'db' or 'log', got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_backend_defaults_to_database() {
        assert_eq!(parse_audit_backend(None).unwrap(), AuditBackend::Database);
        assert_eq!(parse_audit_backend(Some("log")).unwrap(), AuditBackend::Log);
        assert!(parse_audit_backend(Some("kafka")).is_err());
    }
}
