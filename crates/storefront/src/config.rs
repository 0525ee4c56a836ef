//! Client configuration, resolved once before the controller starts.
//!
//! Two sources are supported and both end in the same [`ClientConfig`]:
//! local environment variables (with `.env` support), or a JSON document served
//! by a serverless config endpoint.
//!
//! # Environment Variables
//!
//! ## Required (environment source)
//! - `SUPABASE_URL` - Project URL (e.g., https://abcd.supabase.co)
//! - `SUPABASE_ANON_KEY` - Public anon API key
//! - `ARENZA_ADMIN_EMAIL` - Email of the store administrator
//!
//! ## Optional
//! - `ARENZA_CONFIG_URL` - Fetch the three values above from this endpoint instead
//! - `ARENZA_BACKEND_TIMEOUT_SECS` - Timeout for every backend call (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use arenza_core::{Email, EmailError};

const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
const REMOTE_CONFIG_TIMEOUT: Duration = Duration::from_secs(15);
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Prefixes that mark a value as an unfilled template (case-insensitive).
const PLACEHOLDER_PREFIXES: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Bootstrap failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Configuration value {0} is empty")]
    EmptyValue(&'static str),
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("Invalid admin email: {0}")]
    InvalidAdminEmail(#[from] EmailError),
    #[error("Failed to fetch remote configuration: {0}")]
    RemoteFetch(#[from] reqwest::Error),
    #[error("Remote configuration endpoint returned HTTP {0}")]
    RemoteStatus(u16),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
    #[error("Session controller already started")]
    AlreadyStarted,
}

/// Where to resolve configuration from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Environment variables and `.env`.
    Environment,
    /// A serverless endpoint returning `{"url", "anonKey", "adminEmail"}`.
    Remote(Url),
}

impl ConfigSource {
    /// `Remote` when `ARENZA_CONFIG_URL` is set, otherwise `Environment`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidEnvVar` if the URL does not parse.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let _ = dotenvy::dotenv();

        get_optional_env("ARENZA_CONFIG_URL").map_or(Ok(Self::Environment), |raw| {
            Url::parse(&raw).map(Self::Remote).map_err(|e| {
                ConfigurationError::InvalidEnvVar("ARENZA_CONFIG_URL".to_string(), e.to_string())
            })
        })
    }
}

/// Everything the client needs before `start()`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hosted backend connection settings
    pub supabase: SupabaseConfig,
    /// Sessions with exactly this email get the admin role
    pub admin_email: Email,
    /// Upper bound for every backend call
    pub backend_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Supabase project connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project base URL
    pub url: Url,
    /// Public anon key, sent as `apikey` on every request
    pub anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Body served by the remote config endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteConfig {
    #[serde(default)]
    url: String,
    #[serde(default)]
    anon_key: String,
    #[serde(default)]
    admin_email: String,
}

/// Resolve configuration from `source`.
///
/// This is the only bootstrap path; callers never branch on where the values
/// came from.
///
/// # Errors
///
/// Returns `ConfigurationError` if values are missing, empty, malformed, or
/// the remote endpoint cannot be reached.
pub async fn resolve_config(source: &ConfigSource) -> Result<ClientConfig, ConfigurationError> {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let backend_timeout = parse_timeout_secs(get_optional_env("ARENZA_BACKEND_TIMEOUT_SECS"))?;
    let sentry_dsn = get_optional_env("SENTRY_DSN");

    match source {
        ConfigSource::Environment => {
            tracing::debug!("resolving configuration from environment");
            ClientConfig::from_parts(
                &get_required_env("SUPABASE_URL")?,
                &get_required_env("SUPABASE_ANON_KEY")?,
                &get_required_env("ARENZA_ADMIN_EMAIL")?,
                backend_timeout,
                sentry_dsn,
            )
        }
        ConfigSource::Remote(endpoint) => {
            tracing::debug!(endpoint = %endpoint, "fetching remote configuration");
            let remote = fetch_remote(endpoint).await?;
            ClientConfig::from_parts(
                &remote.url,
                &remote.anon_key,
                &remote.admin_email,
                backend_timeout,
                sentry_dsn,
            )
        }
    }
}

impl ClientConfig {
    /// Validate raw values into a configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the URL or key is empty or malformed, or
    /// the admin email is invalid.
    pub fn from_parts(
        url: &str,
        anon_key: &str,
        admin_email: &str,
        backend_timeout: Duration,
        sentry_dsn: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ConfigurationError::EmptyValue("url"));
        }
        let url = Url::parse(url).map_err(|e| ConfigurationError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let anon_key = anon_key.trim();
        if anon_key.is_empty() {
            return Err(ConfigurationError::EmptyValue("anonKey"));
        }
        validate_secret_strength(anon_key, "anonKey")?;

        Ok(Self {
            supabase: SupabaseConfig {
                url,
                anon_key: SecretString::from(anon_key.to_owned()),
            },
            admin_email: Email::parse(admin_email)?,
            backend_timeout,
            sentry_dsn,
        })
    }
}

async fn fetch_remote(endpoint: &Url) -> Result<RemoteConfig, ConfigurationError> {
    let client = reqwest::Client::builder()
        .timeout(REMOTE_CONFIG_TIMEOUT)
        .build()?;

    let response = client.get(endpoint.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ConfigurationError::RemoteStatus(status.as_u16()));
    }

    Ok(response.json().await?)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigurationError> {
    std::env::var(key).map_err(|_| ConfigurationError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_timeout_secs(raw: Option<String>) -> Result<Duration, ConfigurationError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS));
    };
    let invalid = |reason: &str| {
        ConfigurationError::InvalidEnvVar(
            "ARENZA_BACKEND_TIMEOUT_SECS".to_string(),
            reason.to_string(),
        )
    };
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| invalid(&e.to_string()))?;
    if secs == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
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
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject template values and low-entropy keys.
fn validate_secret_strength(secret: &str, name: &str) -> Result<(), ConfigurationError> {
    let lower = secret.to_lowercase();

    for prefix in PLACEHOLDER_PREFIXES {
        if lower.starts_with(prefix) {
            return Err(ConfigurationError::InsecureSecret(
                name.to_string(),
                format!("appears to be a placeholder (starts with '{prefix}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigurationError::InsecureSecret(
            name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

impl SupabaseConfig {
    /// The anon key, for request headers.
    pub(crate) fn anon_key(&self) -> &str {
        self.anon_key.expose_secret()
    }
}
