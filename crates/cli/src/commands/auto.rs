use anyhow::Context;

use karat_core::adapters::{CatalogStore, RateSource};
use karat_core::config::AppConfig;
use karat_core::domain::product::MaterialKind;
use karat_core::domain::rates::RateSnapshot;
use karat_core::domain::report::RunReport;
use karat_core::update::Selection;
use karat_notify::deliver;
use karat_storefront::RateProviderClient;

/// Automatic mode: fetch both live rates, reprice the full catalog, and
/// refresh the theme's displayed rates.
pub async fn run(config: &AppConfig) -> anyhow::Result<RunReport> {
    let runtime = super::runtime(config)?;
    let rate_source = RateProviderClient::new(&config.rates, config.retry)
        .context("rate provider client setup failed")?;

    let gold = rate_source.fetch(MaterialKind::Gold).await?;
    let silver = rate_source.fetch(MaterialKind::Silver).await?;

    let theme = runtime
        .store
        .get_theme_settings()
        .await
        .context("could not read theme settings")?;
    let snapshot = RateSnapshot::compose(
        &theme,
        &config.pricing,
        Some(gold.rate_per_gram),
        Some(silver.rate_per_gram),
        gold.as_of.min(silver.as_of),
    )?;

    let report = runtime.updater.run("automatic", &Selection::all(), &snapshot, None).await?;
    deliver(&runtime.emitters, &report).await;
    Ok(report)
}
