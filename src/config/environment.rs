//! Environment configuration
//!
//! Reads every runtime setting from environment variables (loaded from `.env`
//! by `dotenvy` in `main`). Required keys fail start-up with a clear message,
//! everything else has a sensible default.

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;

use crate::cache::CacheConfig;
use crate::config::database::DatabaseConfig;

/// JWT settings
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds
    pub access_ttl: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl: u64,
}

/// VNPay merchant settings
#[derive(Debug, Clone)]
pub struct VnpayConfig {
    pub tmn_code: String,
    pub hash_secret: String,
    pub pay_url: String,
    pub api_url: String,
    pub return_url: String,
    pub expire_minutes: i64,
}

/// SMTP settings. Absent when `SMTP_HOST` is not set.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub jwt: JwtConfig,
    pub vnpay: VnpayConfig,
    pub smtp: Option<SmtpConfig>,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    pub scheduler_interval_secs: u64,
    pub tax_rate: Decimal,
    pub invoice_due_days: i64,
}

impl EnvironmentConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{} must be set", key))
        };
        let or_default = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let smtp = match lookup("SMTP_HOST") {
            Some(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: parse_or(&lookup, "SMTP_PORT", 587)?,
                username: or_default("SMTP_USERNAME", ""),
                password: or_default("SMTP_PASSWORD", ""),
                from: or_default("SMTP_FROM", "EV Service Center <no-reply@evservice.local>"),
            }),
            _ => None,
        };

        Ok(Self {
            environment: or_default("ENVIRONMENT", "development"),
            port: parse_or(&lookup, "PORT", 8080)?,
            host: or_default("HOST", "0.0.0.0"),
            database: DatabaseConfig::with_url(database_url),
            cache: CacheConfig {
                redis_url: or_default("REDIS_URL", "redis://localhost:6379"),
                default_ttl: parse_or(&lookup, "CACHE_DEFAULT_TTL", 3600)?,
                key_prefix: or_default("CACHE_KEY_PREFIX", "evsc"),
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl: parse_or(&lookup, "JWT_EXPIRATION", 3600)?,
                refresh_ttl: parse_or(&lookup, "JWT_REFRESH_EXPIRATION", 7 * 24 * 3600)?,
            },
            vnpay: VnpayConfig {
                tmn_code: or_default("VNPAY_TMN_CODE", ""),
                hash_secret: or_default("VNPAY_HASH_SECRET", ""),
                pay_url: or_default(
                    "VNPAY_PAY_URL",
                    "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
                ),
                api_url: or_default(
                    "VNPAY_API_URL",
                    "https://sandbox.vnpayment.vn/merchant_webapi/api/transaction",
                ),
                return_url: or_default(
                    "VNPAY_RETURN_URL",
                    "http://localhost:8080/api/payments/vnpay/return",
                ),
                expire_minutes: parse_or(&lookup, "VNPAY_EXPIRE_MINUTES", 15)?,
            },
            smtp,
            cors_origins: or_default("CORS_ORIGINS", "")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rate_limit_requests: parse_or(&lookup, "RATE_LIMIT_REQUESTS", 30)?,
            rate_limit_window: parse_or(&lookup, "RATE_LIMIT_WINDOW", 60)?,
            scheduler_interval_secs: parse_or(&lookup, "SCHEDULER_INTERVAL_SECS", 60)?,
            tax_rate: parse_or(&lookup, "TAX_RATE", Decimal::new(10, 2))?,
            invoice_due_days: parse_or(&lookup, "INVOICE_DUE_DAYS", 7)?,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got '{}'", key, raw)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_database_url_fails() {
        let err = EnvironmentConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = EnvironmentConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://u:p@localhost/evsc"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.is_development());
        assert!(config.smtp.is_none());
        assert_eq!(config.tax_rate, Decimal::new(10, 2));
        assert_eq!(config.vnpay.expire_minutes, 15);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_invalid_number_reports_key() {
        let err = EnvironmentConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/evsc"),
            ("JWT_SECRET", "secret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_smtp_and_cors_parsed() {
        let config = EnvironmentConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/evsc"),
            ("JWT_SECRET", "secret"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "465"),
            ("CORS_ORIGINS", "http://a.test, http://b.test"),
        ]))
        .unwrap();

        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 465);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }
}
