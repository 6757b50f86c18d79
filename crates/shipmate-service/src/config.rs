//! # Service Configuration
//!
//! Configuration management for the shipping service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHIPMATE_VAT_BPS=2100                                              │
//! │     SHIPMATE_FALLBACK_RATE=25.0                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/shipmate/shipmate.toml (Linux)                           │
//! │     ~/Library/Application Support/com.shipmate.shipmate/shipmate.toml  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     21 % VAT, EUR, 25.0 CZK/EUR fallback, DPD 20 kg cap                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # shipmate.toml
//! [pricing]
//! vat_bps = 2100
//! currency = "EUR"
//!
//! [exchange]
//! url = "https://www.cnb.cz/.../daily.txt"
//! fallback_rate = "25.0"
//!
//! [postal]
//! remote_url = "https://nominatim.openstreetmap.org/search"
//! prefer_remote = false
//!
//! [data]
//! rates = "data/rates.csv"
//! variants = "data/variants.csv"
//!
//! [carriers.dpd]
//! weight_cap_override_kg = 20.0
//! surcharges = { fuel_pct = "12.5", toll_per_kg = "1.90" }
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use shipmate_core::validation::validate_vat_bps;
use shipmate_core::{Carrier, CarrierSettings, VatRate};

use crate::error::{ServiceError, ServiceResult};

/// Czech National Bank daily fixing (plain text).
pub const DEFAULT_EXCHANGE_URL: &str = "https://www.cnb.cz/en/financial-markets/foreign-exchange-market/central-bank-exchange-rate-fixing/central-bank-exchange-rate-fixing/daily.txt";

/// Nominatim search endpoint used for remote postal validation.
pub const DEFAULT_POSTAL_URL: &str = "https://nominatim.openstreetmap.org/search";

// =============================================================================
// Pricing Settings
// =============================================================================

/// VAT and settlement currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    /// VAT in basis points (2100 = 21 %).
    #[serde(default = "default_vat_bps")]
    pub vat_bps: u32,

    /// Currency customer prices are quoted in.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_vat_bps() -> u32 {
    2100
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            vat_bps: default_vat_bps(),
            currency: default_currency(),
        }
    }
}

impl PricingSettings {
    pub fn vat(&self) -> VatRate {
        VatRate::from_bps(self.vat_bps)
    }
}

// =============================================================================
// Exchange Settings
// =============================================================================

/// Exchange-rate source and fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeSettings {
    /// Daily fixing URL.
    #[serde(default = "default_exchange_url")]
    pub url: String,

    /// Currency code looked up in the fixing.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// How long a fetched rate is served from cache.
    #[serde(default = "default_exchange_ttl")]
    pub ttl_secs: u64,

    /// Rate used when the source is unavailable.
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: Decimal,

    /// How long a fallback is served before the source is tried again.
    #[serde(default = "default_fallback_retry")]
    pub fallback_retry_secs: u64,

    /// Parsed rates below this are treated as a parse defect.
    #[serde(default = "default_min_plausible")]
    pub min_plausible: Decimal,

    /// Parsed rates above this are treated as a parse defect.
    #[serde(default = "default_max_plausible")]
    pub max_plausible: Decimal,

    /// Request timeout.
    #[serde(default = "default_exchange_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt.
    #[serde(default = "default_exchange_retries")]
    pub max_retries: u32,

    /// Linear backoff step between attempts.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_exchange_url() -> String {
    DEFAULT_EXCHANGE_URL.to_string()
}
fn default_exchange_ttl() -> u64 {
    86_400
}
fn default_fallback_rate() -> Decimal {
    Decimal::new(250, 1)
}
fn default_fallback_retry() -> u64 {
    300
}
fn default_min_plausible() -> Decimal {
    Decimal::from(15)
}
fn default_max_plausible() -> Decimal {
    Decimal::from(40)
}
fn default_exchange_timeout() -> u64 {
    10
}
fn default_exchange_retries() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    500
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            url: default_exchange_url(),
            currency: default_currency(),
            ttl_secs: default_exchange_ttl(),
            fallback_rate: default_fallback_rate(),
            fallback_retry_secs: default_fallback_retry(),
            min_plausible: default_min_plausible(),
            max_plausible: default_max_plausible(),
            timeout_secs: default_exchange_timeout(),
            max_retries: default_exchange_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl ExchangeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

// =============================================================================
// Postal Settings
// =============================================================================

/// Remote postal validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostalSettings {
    /// Search endpoint; `None` disables remote validation.
    #[serde(default = "default_postal_url")]
    pub remote_url: Option<String>,

    /// Ask the remote service even when the local dataset matched.
    #[serde(default)]
    pub prefer_remote: bool,

    /// How long a remote answer is cached.
    #[serde(default = "default_postal_ttl")]
    pub cache_ttl_secs: u64,

    /// Maximum cached remote answers; the oldest is evicted first.
    #[serde(default = "default_postal_capacity")]
    pub cache_capacity: usize,

    /// Retries after the first attempt.
    #[serde(default = "default_postal_retries")]
    pub max_retries: u32,

    /// Linear backoff step between attempts.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Request timeout.
    #[serde(default = "default_postal_timeout")]
    pub timeout_secs: u64,

    /// Sent with every request; public geocoders reject anonymous clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_postal_url() -> Option<String> {
    Some(DEFAULT_POSTAL_URL.to_string())
}
fn default_postal_ttl() -> u64 {
    86_400
}
fn default_postal_capacity() -> usize {
    1_000
}
fn default_postal_retries() -> u32 {
    3
}
fn default_postal_timeout() -> u64 {
    5
}
fn default_user_agent() -> String {
    concat!("shipmate/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for PostalSettings {
    fn default() -> Self {
        Self {
            remote_url: default_postal_url(),
            prefer_remote: false,
            cache_ttl_secs: default_postal_ttl(),
            cache_capacity: default_postal_capacity(),
            max_retries: default_postal_retries(),
            backoff_ms: default_backoff_ms(),
            timeout_secs: default_postal_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl PostalSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// =============================================================================
// Data Settings
// =============================================================================

/// Locations of the operator data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    #[serde(default = "default_rates_path")]
    pub rates: PathBuf,

    #[serde(default = "default_variants_path")]
    pub variants: PathBuf,

    /// Optional; pickup-point destinations are rejected without it.
    #[serde(default = "default_pickup_points_path")]
    pub pickup_points: PathBuf,

    /// Directory of `{CC}.csv` postal datasets.
    #[serde(default = "default_postal_dir")]
    pub postal_dir: PathBuf,
}

fn default_rates_path() -> PathBuf {
    PathBuf::from("data/rates.csv")
}
fn default_variants_path() -> PathBuf {
    PathBuf::from("data/variants.csv")
}
fn default_pickup_points_path() -> PathBuf {
    PathBuf::from("data/pickup_points.csv")
}
fn default_postal_dir() -> PathBuf {
    PathBuf::from("data/postal")
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            rates: default_rates_path(),
            variants: default_variants_path(),
            pickup_points: default_pickup_points_path(),
            postal_dir: default_postal_dir(),
        }
    }
}

// =============================================================================
// Carrier Settings
// =============================================================================

/// Per-carrier surcharges and weight caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarriersConfig {
    #[serde(default = "default_dpd")]
    pub dpd: CarrierSettings,

    #[serde(default = "default_gls")]
    pub gls: CarrierSettings,

    #[serde(default = "default_packeta")]
    pub packeta: CarrierSettings,
}

fn default_dpd() -> CarrierSettings {
    CarrierSettings::defaults_for(Carrier::Dpd)
}
fn default_gls() -> CarrierSettings {
    CarrierSettings::defaults_for(Carrier::Gls)
}
fn default_packeta() -> CarrierSettings {
    CarrierSettings::defaults_for(Carrier::Packeta)
}

impl Default for CarriersConfig {
    fn default() -> Self {
        Self {
            dpd: default_dpd(),
            gls: default_gls(),
            packeta: default_packeta(),
        }
    }
}

impl CarriersConfig {
    pub fn settings(&self, carrier: Carrier) -> &CarrierSettings {
        match carrier {
            Carrier::Dpd => &self.dpd,
            Carrier::Gls => &self.gls,
            Carrier::Packeta => &self.packeta,
        }
    }

    fn settings_mut(&mut self, carrier: Carrier) -> &mut CarrierSettings {
        match carrier {
            Carrier::Dpd => &mut self.dpd,
            Carrier::Gls => &mut self.gls,
            Carrier::Packeta => &mut self.packeta,
        }
    }
}

// =============================================================================
// Root Configuration
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmateConfig {
    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub exchange: ExchangeSettings,

    #[serde(default)]
    pub postal: PostalSettings,

    #[serde(default)]
    pub data: DataSettings,

    #[serde(default)]
    pub carriers: CarriersConfig,
}

impl ShipmateConfig {
    /// Loads configuration from file and environment.
    ///
    /// ## Load Order
    /// 1. Default values
    /// 2. TOML config file (explicit path, else the platform config dir)
    /// 3. `SHIPMATE_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> ServiceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading shipmate config from file");
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
            warn!("Failed to load shipmate config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ServiceResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ServiceError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Shipmate config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ServiceResult<()> {
        validate_vat_bps(self.pricing.vat_bps).map_err(|e| ServiceError::InvalidConfig(e.to_string()))?;
        validate_currency("pricing.currency", &self.pricing.currency)?;
        validate_currency("exchange.currency", &self.exchange.currency)?;
        if self.pricing.currency != self.exchange.currency {
            return Err(ServiceError::InvalidConfig(format!(
                "pricing.currency {} differs from exchange.currency {}",
                self.pricing.currency, self.exchange.currency
            )));
        }

        validate_http_url("exchange.url", &self.exchange.url)?;
        if let Some(ref url) = self.postal.remote_url {
            validate_http_url("postal.remote_url", url)?;
        }

        let exchange = &self.exchange;
        if exchange.min_plausible <= Decimal::ZERO || exchange.min_plausible >= exchange.max_plausible {
            return Err(ServiceError::InvalidConfig(format!(
                "exchange plausible range [{}, {}] is empty or not positive",
                exchange.min_plausible, exchange.max_plausible
            )));
        }
        if exchange.fallback_rate <= Decimal::ZERO {
            return Err(ServiceError::InvalidConfig(
                "exchange.fallback_rate must be positive".into(),
            ));
        }
        if exchange.ttl_secs == 0 || exchange.fallback_retry_secs == 0 {
            return Err(ServiceError::InvalidConfig(
                "exchange cache lifetimes must be greater than 0".into(),
            ));
        }

        if self.postal.cache_capacity == 0 {
            return Err(ServiceError::InvalidConfig(
                "postal.cache_capacity must be greater than 0".into(),
            ));
        }

        for carrier in Carrier::ALL {
            let settings = self.carriers.settings(carrier);
            if let Some(cap) = settings.weight_cap_override_kg {
                if !(cap.is_finite() && cap > 0.0) {
                    return Err(ServiceError::InvalidConfig(format!(
                        "carriers.{}.weight_cap_override_kg must be positive, got {cap}",
                        carrier.code()
                    )));
                }
            }
            let surcharges = &settings.surcharges;
            if surcharges.fuel_pct.is_sign_negative() || surcharges.toll_per_kg.is_sign_negative() {
                return Err(ServiceError::InvalidConfig(format!(
                    "carriers.{} surcharges must not be negative",
                    carrier.code()
                )));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // Pricing
        if let Ok(bps) = std::env::var("SHIPMATE_VAT_BPS") {
            if let Ok(b) = bps.parse::<u32>() {
                debug!(vat_bps = b, "Overriding VAT from environment");
                self.pricing.vat_bps = b;
            }
        }
        if let Ok(currency) = std::env::var("SHIPMATE_CURRENCY") {
            self.pricing.currency = currency.trim().to_uppercase();
        }

        // Exchange
        if let Ok(url) = std::env::var("SHIPMATE_EXCHANGE_URL") {
            debug!(url = %url, "Overriding exchange URL from environment");
            self.exchange.url = url;
        }
        if let Ok(rate) = std::env::var("SHIPMATE_FALLBACK_RATE") {
            match Decimal::from_str(rate.trim()) {
                Ok(r) => self.exchange.fallback_rate = r,
                Err(_) => warn!(rate = %rate, "Invalid fallback rate in environment"),
            }
        }

        // Postal
        if let Ok(url) = std::env::var("SHIPMATE_POSTAL_URL") {
            debug!(url = %url, "Overriding postal URL from environment");
            self.postal.remote_url = if url.trim().is_empty() { None } else { Some(url) };
        }
        if let Ok(prefer) = std::env::var("SHIPMATE_POSTAL_PREFER_REMOTE") {
            if let Ok(p) = prefer.parse::<bool>() {
                self.postal.prefer_remote = p;
            }
        }

        // Data files
        if let Ok(path) = std::env::var("SHIPMATE_RATES_FILE") {
            self.data.rates = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("SHIPMATE_VARIANTS_FILE") {
            self.data.variants = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("SHIPMATE_PICKUP_POINTS_FILE") {
            self.data.pickup_points = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("SHIPMATE_POSTAL_DIR") {
            self.data.postal_dir = PathBuf::from(path);
        }

        // DPD weight cap ("none" disables it)
        if let Ok(cap) = std::env::var("SHIPMATE_DPD_WEIGHT_CAP_KG") {
            let dpd = self.carriers.settings_mut(Carrier::Dpd);
            if cap.eq_ignore_ascii_case("none") {
                dpd.weight_cap_override_kg = None;
            } else if let Ok(c) = cap.parse::<f64>() {
                debug!(cap_kg = c, "Overriding DPD weight cap from environment");
                dpd.weight_cap_override_kg = Some(c);
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "shipmate", "shipmate").map(|dirs| {
            let config_dir = dirs.config_dir();
            config_dir.join("shipmate.toml")
        })
    }
}

fn validate_currency(field: &str, code: &str) -> ServiceResult<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ServiceError::InvalidConfig(format!(
            "{field} must be a 3-letter uppercase code, got: {code}"
        )));
    }
    Ok(())
}

fn validate_http_url(field: &str, raw: &str) -> ServiceResult<()> {
    let url = url::Url::parse(raw)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ServiceError::InvalidUrl(format!(
            "{field} must start with http:// or https://, got: {raw}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShipmateConfig::default();
        assert_eq!(config.pricing.vat_bps, 2100);
        assert_eq!(config.pricing.currency, "EUR");
        assert_eq!(config.exchange.fallback_rate, Decimal::new(250, 1));
        assert_eq!(config.exchange.ttl_secs, 86_400);
        assert!(!config.postal.prefer_remote);
        assert_eq!(config.carriers.dpd.weight_cap_override_kg, Some(20.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ShipmateConfig::default();

        config.pricing.vat_bps = 10_001;
        assert!(config.validate().is_err());
        config.pricing.vat_bps = 2100;

        config.pricing.currency = "eur".to_string();
        assert!(config.validate().is_err());
        config.pricing.currency = "EUR".to_string();

        config.exchange.url = "ftp://example.com/daily.txt".to_string();
        assert!(matches!(config.validate(), Err(ServiceError::InvalidUrl(_))));
        config.exchange.url = DEFAULT_EXCHANGE_URL.to_string();

        config.exchange.min_plausible = Decimal::from(50);
        assert!(config.validate().is_err());
        config.exchange.min_plausible = Decimal::from(15);

        config.carriers.dpd.weight_cap_override_kg = Some(0.0);
        assert!(config.validate().is_err());
        config.carriers.dpd.weight_cap_override_kg = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ShipmateConfig = toml::from_str(
            r#"
[pricing]
vat_bps = 2000

[postal]
prefer_remote = true

[carriers.dpd]
weight_cap_override_kg = 25.0
"#,
        )
        .unwrap();

        assert_eq!(config.pricing.vat_bps, 2000);
        assert_eq!(config.pricing.currency, "EUR");
        assert!(config.postal.prefer_remote);
        assert_eq!(config.postal.cache_capacity, 1_000);
        assert_eq!(config.carriers.dpd.weight_cap_override_kg, Some(25.0));
        // Omitted surcharges mean none, not the built-in defaults
        assert!(config.carriers.dpd.surcharges.fuel_pct.is_zero());
        assert_eq!(config.carriers.gls, CarrierSettings::defaults_for(Carrier::Gls));
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shipmate.toml");
        std::fs::write(&path, "[exchange]\nfallback_retry_secs = 60\n").unwrap();

        let config = ShipmateConfig::load(Some(path)).unwrap();
        assert_eq!(config.exchange.fallback_retry_secs, 60);
    }

    #[test]
    fn test_toml_serialization() {
        let config = ShipmateConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[pricing]"));
        assert!(toml_str.contains("[exchange]"));
        assert!(toml_str.contains("[carriers.dpd]"));

        let parsed: ShipmateConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.exchange.fallback_rate, config.exchange.fallback_rate);
        assert_eq!(parsed.carriers.dpd, config.carriers.dpd);
    }
}
