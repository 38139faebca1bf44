use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storefront: StorefrontConfig,
    pub rates: RateProviderConfig,
    pub pricing: PricingConfig,
    pub retry: RetryConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct StorefrontConfig {
    /// Shop host, e.g. `my-store.myshopify.com` (no scheme).
    pub shop_url: String,
    pub access_token: SecretString,
    /// Explicit theme id; the main theme is resolved when absent.
    pub theme_id: Option<u64>,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RateProviderConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    /// ISO currency code the provider quotes in.
    pub currency: String,
    pub timeout_secs: u64,
}

/// Pricing constants that are configuration rather than engine logic: the
/// GST default used when the theme carries none, the 24K purity baseline,
/// and the silver formula's fixed terms.
#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub gst_pct_default: Decimal,
    pub default_purity_factor: Decimal,
    pub silver_weight_multiplier: Decimal,
    pub lab_diamond_price_per_carat: Decimal,
}

#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ReportConfig {
    /// When set, the rendered HTML report is also written here.
    pub html_output_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub shop_url: Option<String>,
    pub access_token: Option<String>,
    pub theme_id: Option<u64>,
    pub rates_api_key: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storefront: StorefrontConfig {
                shop_url: String::new(),
                access_token: String::new().into(),
                theme_id: None,
                api_version: "2024-01".to_string(),
                timeout_secs: 30,
            },
            rates: RateProviderConfig {
                base_url: "https://www.goldapi.io/api".to_string(),
                api_key: None,
                currency: "INR".to_string(),
                timeout_secs: 30,
            },
            pricing: PricingConfig::default(),
            retry: RetryConfig { max_attempts: 3, base_delay_secs: 1 },
            report: ReportConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            gst_pct_default: Decimal::new(3, 0),
            default_purity_factor: Decimal::ONE,
            silver_weight_multiplier: Decimal::new(1000, 0),
            lab_diamond_price_per_carat: Decimal::new(40_000, 0),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Load configuration with precedence: programmatic overrides > `KARAT_*`
    /// environment variables > `karat.toml` > built-in defaults.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("karat.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(storefront) = patch.storefront {
            if let Some(shop_url) = storefront.shop_url {
                self.storefront.shop_url = shop_url;
            }
            if let Some(token) = storefront.access_token {
                self.storefront.access_token = token.into();
            }
            if let Some(theme_id) = storefront.theme_id {
                self.storefront.theme_id = Some(theme_id);
            }
            if let Some(api_version) = storefront.api_version {
                self.storefront.api_version = api_version;
            }
            if let Some(timeout_secs) = storefront.timeout_secs {
                self.storefront.timeout_secs = timeout_secs;
            }
        }

        if let Some(rates) = patch.rates {
            if let Some(base_url) = rates.base_url {
                self.rates.base_url = base_url;
            }
            if let Some(api_key) = rates.api_key {
                self.rates.api_key = Some(api_key.into());
            }
            if let Some(currency) = rates.currency {
                self.rates.currency = currency;
            }
            if let Some(timeout_secs) = rates.timeout_secs {
                self.rates.timeout_secs = timeout_secs;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(gst) = pricing.gst_pct_default {
                self.pricing.gst_pct_default = gst;
            }
            if let Some(factor) = pricing.default_purity_factor {
                self.pricing.default_purity_factor = factor;
            }
            if let Some(multiplier) = pricing.silver_weight_multiplier {
                self.pricing.silver_weight_multiplier = multiplier;
            }
            if let Some(rate) = pricing.lab_diamond_price_per_carat {
                self.pricing.lab_diamond_price_per_carat = rate;
            }
        }

        if let Some(retry) = patch.retry {
            if let Some(max_attempts) = retry.max_attempts {
                self.retry.max_attempts = max_attempts;
            }
            if let Some(base_delay_secs) = retry.base_delay_secs {
                self.retry.base_delay_secs = base_delay_secs;
            }
        }

        if let Some(report) = patch.report {
            if let Some(path) = report.html_output_path {
                self.report.html_output_path = Some(PathBuf::from(path));
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("KARAT_SHOP_URL") {
            self.storefront.shop_url = value;
        }
        if let Some(value) = read_env("KARAT_ACCESS_TOKEN") {
            self.storefront.access_token = value.into();
        }
        if let Some(value) = read_env("KARAT_THEME_ID") {
            self.storefront.theme_id = Some(parse_u64("KARAT_THEME_ID", &value)?);
        }
        if let Some(value) = read_env("KARAT_API_VERSION") {
            self.storefront.api_version = value;
        }
        if let Some(value) = read_env("KARAT_STOREFRONT_TIMEOUT_SECS") {
            self.storefront.timeout_secs = parse_u64("KARAT_STOREFRONT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("KARAT_RATES_BASE_URL") {
            self.rates.base_url = value;
        }
        if let Some(value) = read_env("KARAT_RATES_API_KEY") {
            self.rates.api_key = Some(value.into());
        }
        if let Some(value) = read_env("KARAT_RATES_CURRENCY") {
            self.rates.currency = value;
        }
        if let Some(value) = read_env("KARAT_RATES_TIMEOUT_SECS") {
            self.rates.timeout_secs = parse_u64("KARAT_RATES_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("KARAT_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_u32("KARAT_RETRY_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("KARAT_RETRY_BASE_DELAY_SECS") {
            self.retry.base_delay_secs = parse_u64("KARAT_RETRY_BASE_DELAY_SECS", &value)?;
        }

        if let Some(value) = read_env("KARAT_REPORT_HTML_PATH") {
            self.report.html_output_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("KARAT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("KARAT_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(shop_url) = overrides.shop_url {
            self.storefront.shop_url = shop_url;
        }
        if let Some(access_token) = overrides.access_token {
            self.storefront.access_token = access_token.into();
        }
        if let Some(theme_id) = overrides.theme_id {
            self.storefront.theme_id = Some(theme_id);
        }
        if let Some(api_key) = overrides.rates_api_key {
            self.rates.api_key = Some(api_key.into());
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_storefront(&self.storefront)?;
        validate_rates(&self.rates)?;
        validate_pricing(&self.pricing)?;
        validate_retry(&self.retry)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("karat.toml"), PathBuf::from("config/karat.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_storefront(storefront: &StorefrontConfig) -> Result<(), ConfigError> {
    let shop_url = storefront.shop_url.trim();
    if shop_url.is_empty() {
        return Err(ConfigError::Validation(
            "storefront.shop_url is required (the shop host, e.g. my-store.myshopify.com)"
                .to_string(),
        ));
    }
    if shop_url.contains("://") {
        return Err(ConfigError::Validation(
            "storefront.shop_url must be a bare host without a scheme".to_string(),
        ));
    }

    if storefront.access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "storefront.access_token is required (Admin API access token)".to_string(),
        ));
    }

    if storefront.api_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storefront.api_version must not be empty".to_string(),
        ));
    }

    if storefront.timeout_secs == 0 || storefront.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "storefront.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_rates(rates: &RateProviderConfig) -> Result<(), ConfigError> {
    if !rates.base_url.starts_with("http://") && !rates.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "rates.base_url must start with http:// or https://".to_string(),
        ));
    }

    let currency = rates.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(ConfigError::Validation(
            "rates.currency must be a three-letter ISO code".to_string(),
        ));
    }

    if rates.timeout_secs == 0 || rates.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "rates.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.gst_pct_default < Decimal::ZERO || pricing.gst_pct_default > Decimal::ONE_HUNDRED {
        return Err(ConfigError::Validation(
            "pricing.gst_pct_default must be in range 0..=100".to_string(),
        ));
    }

    if pricing.default_purity_factor <= Decimal::ZERO
        || pricing.default_purity_factor > Decimal::ONE
    {
        return Err(ConfigError::Validation(
            "pricing.default_purity_factor must be in range (0, 1]".to_string(),
        ));
    }

    if pricing.silver_weight_multiplier <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.silver_weight_multiplier must be positive".to_string(),
        ));
    }

    if pricing.lab_diamond_price_per_carat < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.lab_diamond_price_per_carat must not be negative".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry(retry: &RetryConfig) -> Result<(), ConfigError> {
    if retry.max_attempts == 0 || retry.max_attempts > 10 {
        return Err(ConfigError::Validation(
            "retry.max_attempts must be in range 1..=10".to_string(),
        ));
    }
    if retry.base_delay_secs == 0 || retry.base_delay_secs > 60 {
        return Err(ConfigError::Validation(
            "retry.base_delay_secs must be in range 1..=60".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    storefront: Option<StorefrontPatch>,
    rates: Option<RatesPatch>,
    pricing: Option<PricingPatch>,
    retry: Option<RetryPatch>,
    report: Option<ReportPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StorefrontPatch {
    shop_url: Option<String>,
    access_token: Option<String>,
    theme_id: Option<u64>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RatesPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    currency: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    gst_pct_default: Option<Decimal>,
    default_purity_factor: Option<Decimal>,
    silver_weight_multiplier: Option<Decimal>,
    lab_diamond_price_per_carat: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct RetryPatch {
    max_attempts: Option<u32>,
    base_delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportPatch {
    html_output_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn base_overrides() -> ConfigOverrides {
        ConfigOverrides {
            shop_url: Some("test-store.myshopify.com".to_string()),
            access_token: Some("shpat_test".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn defaults_carry_the_fixed_silver_terms() {
        let _guard = env_lock().lock().expect("env lock");
        let config = AppConfig::load(LoadOptions {
            overrides: base_overrides(),
            ..LoadOptions::default()
        })
        .expect("config");

        assert_eq!(config.pricing.silver_weight_multiplier, Decimal::new(1000, 0));
        assert_eq!(config.pricing.lab_diamond_price_per_carat, Decimal::new(40_000, 0));
        assert_eq!(config.pricing.gst_pct_default, Decimal::new(3, 0));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("KARAT_SHOP_URL", "env-store.myshopify.com");
        env::set_var("KARAT_ACCESS_TOKEN", "shpat_env");

        let result = (|| {
            let dir = TempDir::new().expect("tempdir");
            let path = dir.path().join("karat.toml");
            fs::write(
                &path,
                r#"
[storefront]
shop_url = "file-store.myshopify.com"
access_token = "shpat_file"

[pricing]
gst_pct_default = 5
"#,
            )
            .expect("write config");

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                ..LoadOptions::default()
            })
            .expect("config");

            assert_eq!(config.storefront.shop_url, "env-store.myshopify.com");
            assert_eq!(config.storefront.access_token.expose_secret(), "shpat_env");
            assert_eq!(config.pricing.gst_pct_default, Decimal::new(5, 0));
        })();

        clear_vars(&["KARAT_SHOP_URL", "KARAT_ACCESS_TOKEN"]);
        result
    }

    #[test]
    fn missing_shop_url_fails_validation_with_a_hint() {
        let _guard = env_lock().lock().expect("env lock");
        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                access_token: Some("shpat_test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect_err("must fail");

        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("storefront.shop_url")
        ));
    }

    #[test]
    fn shop_url_with_scheme_is_rejected() {
        let _guard = env_lock().lock().expect("env lock");
        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                shop_url: Some("https://test-store.myshopify.com".to_string()),
                access_token: Some("shpat_test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect_err("must fail");

        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("bare host")
        ));
    }

    #[test]
    fn secrets_do_not_leak_through_debug() {
        let _guard = env_lock().lock().expect("env lock");
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                rates_api_key: Some("goldapi-secret-key".to_string()),
                ..base_overrides()
            },
            ..LoadOptions::default()
        })
        .expect("config");

        let debug = format!("{config:?}");
        assert!(!debug.contains("shpat_test"));
        assert!(!debug.contains("goldapi-secret-key"));
    }
}
