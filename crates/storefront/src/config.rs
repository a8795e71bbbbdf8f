//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Cart and session signing secret (min 32 chars, high entropy)
//! - `ADMIN_PASSWORD` - Password for the `/admin` panel
//! - `SUPABASE_URL` - Supabase project URL
//! - `SUPABASE_SECRET_KEY` - Storage service key (falls back to `SUPABASE_SERVICE_ROLE_KEY`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SUPABASE_PRODUCTS_BUCKET` - Bucket for product media (default: products)
//! - `SUPABASE_PAYMENTS_BUCKET` - Bucket for payment proofs (default: payments)
//! - `CHECKOUT_STOCK_POLICY` - `strict` or `best-effort` (default: strict)
//! - `CATALOG_PAGE_SIZE` - Products per shop page (default: 9)
//! - `BRAND_NAME`, `TAGLINE`, `WHATSAPP_NUMBER`, `MOMO_NUMBER`, `MOMO_ACCOUNT_NAME`,
//!   `LOCATION`, `DELIVERY_INFO`, `CONTACT_EMAIL`, `INSTAGRAM_URL`, `TIKTOK_URL`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag (e.g. production)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::services::stock::StockPolicy;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ADMIN_PASSWORD_LENGTH: usize = 12;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_PAGE_SIZE: u32 = 9;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Signing secret for the cart cookie
    pub session_secret: SecretString,
    /// Password for the admin panel
    pub admin_password: SecretString,
    /// Object storage configuration
    pub storage: StorageConfig,
    /// What checkout does when stock cannot be deducted
    pub stock_policy: StockPolicy,
    /// Products per page on `/shop`
    pub page_size: u32,
    /// Shop identity shown in templates and messages
    pub brand: BrandConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Supabase Storage configuration.
///
/// Implements `Debug` manually to redact the service key.
#[derive(Clone)]
pub struct StorageConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`
    pub url: Url,
    /// Service role key (server-side only)
    pub secret_key: SecretString,
    /// Bucket for product media
    pub products_bucket: String,
    /// Bucket for payment proofs
    pub payments_bucket: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("url", &self.url.as_str())
            .field("secret_key", &"[REDACTED]")
            .field("products_bucket", &self.products_bucket)
            .field("payments_bucket", &self.payments_bucket)
            .finish()
    }
}

/// Shop identity and contact details.
#[derive(Debug, Clone)]
pub struct BrandConfig {
    pub name: String,
    pub tagline: String,
    /// International format without `+`, used for `wa.me` links
    pub whatsapp_number: String,
    pub momo_number: String,
    pub momo_account_name: String,
    pub location: String,
    pub delivery_info: String,
    pub email: String,
    pub instagram_url: String,
    pub tiktok_url: String,
    pub categories: Vec<String>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: "MJ Hair Empire".to_string(),
            tagline: "Luxury Wigs. Effortless Beauty.".to_string(),
            whatsapp_number: "233500000000".to_string(),
            momo_number: "0500000000".to_string(),
            momo_account_name: "MJ Hair Empire".to_string(),
            location: "Accra, Ghana".to_string(),
            delivery_info: "Delivery within 1-3 working days.".to_string(),
            email: "info@mjhairempire.com".to_string(),
            instagram_url: "https://instagram.com/mjhairempire".to_string(),
            tiktok_url: "https://tiktok.com/@mjhairempire".to_string(),
            categories: [
                "Straight",
                "Body Wave",
                "Curly",
                "Bob",
                "Frontal",
                "Closure",
            ]
            .map(str::to_string)
            .to_vec(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let admin_password = get_required_secret("ADMIN_PASSWORD")?;
        validate_admin_password(&admin_password, "ADMIN_PASSWORD")?;

        let storage = StorageConfig::from_env()?;
        let stock_policy = get_env_or_default("CHECKOUT_STOCK_POLICY", "strict")
            .parse::<StockPolicy>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CHECKOUT_STOCK_POLICY".to_string(), e.to_string())
            })?;
        let page_size = parse_page_size(get_optional_env("CATALOG_PAGE_SIZE").as_deref())?;
        let brand = BrandConfig::from_env();
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            admin_password,
            storage,
            stock_policy,
            page_size,
            brand,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("SUPABASE_URL")?;
        let url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;

        let secret_key = match get_optional_env("SUPABASE_SECRET_KEY") {
            Some(key) => key,
            None => get_required_env("SUPABASE_SERVICE_ROLE_KEY")
                .map_err(|_| ConfigError::MissingEnvVar("SUPABASE_SECRET_KEY".to_string()))?,
        };
        validate_secret_strength(&secret_key, "SUPABASE_SECRET_KEY")?;

        Ok(Self {
            url,
            secret_key: SecretString::from(secret_key),
            products_bucket: get_env_or_default("SUPABASE_PRODUCTS_BUCKET", "products"),
            payments_bucket: get_env_or_default("SUPABASE_PAYMENTS_BUCKET", "payments"),
        })
    }
}

impl BrandConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        let name = get_optional_env("BRAND_NAME").unwrap_or(defaults.name);
        Self {
            momo_account_name: get_optional_env("MOMO_ACCOUNT_NAME").unwrap_or_else(|| name.clone()),
            name,
            tagline: get_optional_env("TAGLINE").unwrap_or(defaults.tagline),
            whatsapp_number: get_optional_env("WHATSAPP_NUMBER")
                .map_or(defaults.whatsapp_number, |n| digits_only(&n)),
            momo_number: get_optional_env("MOMO_NUMBER").unwrap_or(defaults.momo_number),
            location: get_optional_env("LOCATION").unwrap_or(defaults.location),
            delivery_info: get_optional_env("DELIVERY_INFO").unwrap_or(defaults.delivery_info),
            email: get_optional_env("CONTACT_EMAIL").unwrap_or(defaults.email),
            instagram_url: get_optional_env("INSTAGRAM_URL").unwrap_or(defaults.instagram_url),
            tiktok_url: get_optional_env("TIKTOK_URL").unwrap_or(defaults.tiktok_url),
            categories: defaults.categories,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_page_size(value: Option<&str>) -> Result<u32, ConfigError> {
    let Some(raw) = value else {
        return Ok(DEFAULT_PAGE_SIZE);
    };
    match raw.trim().parse::<u32>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(ConfigError::InvalidEnvVar(
            "CATALOG_PAGE_SIZE".to_string(),
            format!("expected a positive integer, got '{raw}'"),
        )),
    }
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Admin passwords are typed by a person, so only length and the blocklist apply.
fn validate_admin_password(password: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = password.expose_secret();
    if value.chars().count() < MIN_ADMIN_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_ADMIN_PASSWORD_LENGTH} characters"),
        ));
    }
    check_placeholder(value, var_name)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn check_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    check_placeholder(secret, var_name)?;

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// A config suitable for unit tests; never read from the environment.
    pub fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/maison_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("k9Vq2xLm7Rt4Zp8Wn3Bc6Yh1Jd5Fs0Ga"),
            admin_password: SecretString::from("Tr0pical-Kiwi-88"),
            storage: StorageConfig {
                url: Url::parse("https://proj.supabase.co").unwrap(),
                secret_key: SecretString::from("sb_9f8e7d6c5b4a"),
                products_bucket: "products".to_string(),
                payments_bucket: "payments".to_string(),
            },
            stock_policy: StockPolicy::Strict,
            page_size: DEFAULT_PAGE_SIZE,
            brand: BrandConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-api-key-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let err = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_validate_admin_password() {
        let short = SecretString::from("kiwi");
        assert!(validate_admin_password(&short, "ADMIN_PASSWORD").is_err());

        let placeholder = SecretString::from("changeme-changeme");
        assert!(validate_admin_password(&placeholder, "ADMIN_PASSWORD").is_err());

        let ok = SecretString::from("Tr0pical-Kiwi-88");
        assert!(validate_admin_password(&ok, "ADMIN_PASSWORD").is_ok());
    }

    #[test]
    fn test_parse_page_size() {
        assert_eq!(parse_page_size(None).unwrap(), 9);
        assert_eq!(parse_page_size(Some(" 12 ")).unwrap(), 12);
        assert!(parse_page_size(Some("0")).is_err());
        assert!(parse_page_size(Some("nine")).is_err());
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("+233 50 123 4567"), "233501234567");
    }

    #[test]
    fn test_socket_addr_and_https() {
        let mut config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_https());

        config.base_url = "https://mjhairempire.com".to_string();
        assert!(config.is_https());
    }

    #[test]
    fn test_storage_config_debug_redacts_key() {
        let config = test_config();
        let debug_output = format!("{:?}", config.storage);
        assert!(debug_output.contains("proj.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sb_9f8e7d6c5b4a"));
    }
}
