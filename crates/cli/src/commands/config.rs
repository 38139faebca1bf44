use std::path::PathBuf;
use std::process::ExitCode;

use secrecy::ExposeSecret;

use karat_core::config::{AppConfig, LoadOptions};

/// Print the effective configuration (source precedence: overrides > env >
/// file > default) with secrets redacted.
pub fn run(config_path: Option<PathBuf>) -> ExitCode {
    let config = match AppConfig::load(LoadOptions { config_path, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => {
            println!("config validation failed: {error}");
            return ExitCode::from(2);
        }
    };

    let lines = [
        render("storefront.shop_url", &config.storefront.shop_url),
        render(
            "storefront.access_token",
            &redact(config.storefront.access_token.expose_secret()),
        ),
        render(
            "storefront.theme_id",
            &config
                .storefront
                .theme_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "<main theme>".to_string()),
        ),
        render("storefront.api_version", &config.storefront.api_version),
        render("rates.base_url", &config.rates.base_url),
        render(
            "rates.api_key",
            &config
                .rates
                .api_key
                .as_ref()
                .map(|key| redact(key.expose_secret()))
                .unwrap_or_else(|| "<unset>".to_string()),
        ),
        render("rates.currency", &config.rates.currency),
        render("pricing.gst_pct_default", &config.pricing.gst_pct_default.to_string()),
        render(
            "pricing.default_purity_factor",
            &config.pricing.default_purity_factor.to_string(),
        ),
        render(
            "pricing.silver_weight_multiplier",
            &config.pricing.silver_weight_multiplier.to_string(),
        ),
        render(
            "pricing.lab_diamond_price_per_carat",
            &config.pricing.lab_diamond_price_per_carat.to_string(),
        ),
        render("retry.max_attempts", &config.retry.max_attempts.to_string()),
        render("retry.base_delay_secs", &config.retry.base_delay_secs.to_string()),
        render(
            "report.html_output_path",
            &config
                .report
                .html_output_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
        ),
        render("logging.level", &config.logging.level),
        render("logging.format", &format!("{:?}", config.logging.format).to_lowercase()),
    ];

    println!("effective config:");
    for line in lines {
        println!("{line}");
    }
    ExitCode::SUCCESS
}

fn render(key: &str, value: &str) -> String {
    format!("  {key} = {value}")
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}\u{2026}(redacted)")
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn redaction_keeps_only_a_short_prefix() {
        assert_eq!(redact("shpat_abcdef123456"), "shpa\u{2026}(redacted)");
        assert_eq!(redact(""), "<unset>");
    }
}
