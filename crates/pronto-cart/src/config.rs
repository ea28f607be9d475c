//! # Register Configuration
//!
//! Configuration for one register: which store it sells for, where the
//! backend lives, where state is kept between sessions.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PRONTO_API_URL=http://10.0.0.5:8000/api                            │
//! │     PRONTO_STORE_ID=3                                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pronto-pos/pos.toml (Linux)                              │
//! │     ~/Library/Application Support/com.pronto.pos/pos.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! id = "3"
//! name = "Sucursal Centro"
//!
//! [api]
//! base_url = "http://10.0.0.5:8000/api"
//! timeout_secs = 10
//!
//! [api.endpoints]
//! customer = "/clientes/{id}/"
//! sales = "/ventas/pedidos/"
//!
//! [api.headers]
//! X-CSRFToken = "..."
//!
//! [storage]
//! cart_key = "pos_carrito"
//! customer_key = "pos_cliente"
//!
//! [checkout]
//! require_customer = true
//! ```

use pronto_client::Endpoints;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Config Error
// =============================================================================

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Header carrying the backend's CSRF token.
pub const CSRF_HEADER: &str = "X-CSRFToken";

// =============================================================================
// Sections
// =============================================================================

/// The store this register sells for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Store identifier sent with every sale and inventory lookup.
    #[serde(default = "default_store_id")]
    pub id: String,

    #[serde(default = "default_store_name")]
    pub name: String,

    /// Symbol printed before amounts (`$`, `S/ `).
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_store_id() -> String {
    "1".to_string()
}

fn default_store_name() -> String {
    "Pronto POS".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            id: default_store_id(),
            name: default_store_name(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub endpoints: Endpoints,

    /// Headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            endpoints: Endpoints::default(),
            headers: BTreeMap::new(),
        }
    }
}

/// Where the cart and customer selection are kept between sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory for the file store. Defaults to the platform data directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_cart_key")]
    pub cart_key: String,

    #[serde(default = "default_customer_key")]
    pub customer_key: String,
}

fn default_cart_key() -> String {
    "pos_carrito".to_string()
}

fn default_customer_key() -> String {
    "pos_cliente".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            dir: None,
            cart_key: default_cart_key(),
            customer_key: default_customer_key(),
        }
    }
}

/// Checkout rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Refuse to check out without a selected customer.
    #[serde(default = "default_true")]
    pub require_customer: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            require_customer: true,
        }
    }
}

// =============================================================================
// PosConfig
// =============================================================================

/// Complete register configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PosConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,
}

impl PosConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (pos.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading register config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load register config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Register config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.store.id.trim().is_empty() {
            return Err(ConfigError::Invalid("store.id must not be empty".into()));
        }

        let url = url::Url::parse(&self.api.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.api.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.storage.cart_key.is_empty() || self.storage.customer_key.is_empty() {
            return Err(ConfigError::Invalid("storage keys must not be empty".into()));
        }

        if self.storage.cart_key == self.storage.customer_key {
            return Err(ConfigError::Invalid(
                "storage.cart_key and storage.customer_key must differ".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("PRONTO_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(token) = var("PRONTO_CSRF_TOKEN") {
            self.api.headers.insert(CSRF_HEADER.to_string(), token);
        }

        if let Some(id) = var("PRONTO_STORE_ID") {
            debug!(store_id = %id, "Overriding store ID from environment");
            self.store.id = id;
        }

        if let Some(name) = var("PRONTO_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(dir) = var("PRONTO_STORAGE_DIR") {
            self.storage.dir = Some(PathBuf::from(dir));
        }

        if let Some(timeout) = var("PRONTO_API_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring invalid PRONTO_API_TIMEOUT_SECS"),
            }
        }

        if let Some(required) = var("PRONTO_REQUIRE_CUSTOMER") {
            match required.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.checkout.require_customer = true,
                "0" | "false" | "no" => self.checkout.require_customer = false,
                _ => warn!(value = %required, "Ignoring invalid PRONTO_REQUIRE_CUSTOMER"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "pronto", "pos")
            .map(|dirs| dirs.config_dir().join("pos.toml"))
    }

    /// Directory for the file store: the configured one, else the platform
    /// data directory, else `./pronto-data`.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage
            .dir
            .clone()
            .or_else(|| {
                directories::ProjectDirs::from("com", "pronto", "pos")
                    .map(|dirs| dirs.data_dir().to_path_buf())
            })
            .unwrap_or_else(|| PathBuf::from("pronto-data"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn store_id(&self) -> &str {
        &self.store.id
    }

    pub fn api_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.api.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = PosConfig::default();
        assert_eq!(config.store.id, "1");
        assert_eq!(config.storage.cart_key, "pos_carrito");
        assert_eq!(config.storage.customer_key, "pos_cliente");
        assert!(config.checkout.require_customer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PosConfig::default();

        config.api.base_url = "ws://localhost".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        config.api.base_url = "https://pos.example.com/api".to_string();
        assert!(config.validate().is_ok());

        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.api.timeout_secs = 5;

        config.storage.customer_key = config.storage.cart_key.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: PosConfig = toml::from_str(
            r#"
            [store]
            id = "3"

            [api.endpoints]
            sales = "/ventas/pedidos/"

            [api.headers]
            X-CSRFToken = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.id, "3");
        assert_eq!(config.store.name, "Pronto POS");
        assert_eq!(config.api.endpoints.sales, "/ventas/pedidos/");
        assert_eq!(config.api.endpoints.customer, "/customers/{id}");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.headers["X-CSRFToken"], "abc");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PRONTO_API_URL", "http://10.0.0.5:8000/api"),
            ("PRONTO_STORE_ID", "7"),
            ("PRONTO_API_TIMEOUT_SECS", "not-a-number"),
            ("PRONTO_REQUIRE_CUSTOMER", "false"),
            ("PRONTO_CSRF_TOKEN", "tok-1"),
        ]);

        let mut config = PosConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://10.0.0.5:8000/api");
        assert_eq!(config.store_id(), "7");
        assert_eq!(config.api.timeout_secs, 10);
        assert!(!config.checkout.require_customer);
        assert_eq!(config.api.headers.get(CSRF_HEADER).map(String::as_str), Some("tok-1"));
    }

    #[test]
    fn test_load_and_save_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("pos.toml");

        let mut config = PosConfig::default();
        config.store.name = "Sucursal Norte".to_string();
        config.storage.dir = Some(dir.path().join("state"));
        config.save(Some(path.clone())).unwrap();

        let loaded = PosConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.store.name, "Sucursal Norte");
        assert_eq!(loaded.storage_dir(), dir.path().join("state"));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pos.toml");
        std::fs::write(&path, "[api]\nbase_url = \"ftp://nowhere\"\n").unwrap();

        assert!(PosConfig::load(Some(path.clone())).is_err());
        assert_eq!(
            PosConfig::load_or_default(Some(path)).api.base_url,
            "http://localhost:8000/api"
        );
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&PosConfig::default()).unwrap();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[checkout]"));
    }
}
