use anyhow::Context;
use chrono::Utc;

use karat_core::adapters::CatalogStore;
use karat_core::config::AppConfig;
use karat_core::domain::rates::RateSnapshot;
use karat_core::domain::report::RunReport;
use karat_core::update::Selection;
use karat_notify::deliver;

use crate::ManualArgs;

/// Manual mode: operator-supplied rates with optional include/exclude
/// handle filters. A rate left out is taken from the current theme
/// settings, so products of the other material skip idempotently instead
/// of failing.
pub async fn run(config: &AppConfig, args: ManualArgs) -> anyhow::Result<RunReport> {
    anyhow::ensure!(
        args.gold_rate.is_some() || args.silver_rate.is_some(),
        "provide at least one of --gold-rate / --silver-rate"
    );

    let runtime = super::runtime(config)?;
    let theme = runtime
        .store
        .get_theme_settings()
        .await
        .context("could not read theme settings")?;
    let snapshot = RateSnapshot::compose(
        &theme,
        &config.pricing,
        args.gold_rate,
        args.silver_rate,
        Utc::now(),
    )?;

    let selection = Selection::new(
        args.include.as_deref().map(Selection::parse_handles).unwrap_or_default(),
        args.exclude.as_deref().map(Selection::parse_handles).unwrap_or_default(),
    );

    let report = runtime.updater.run("manual", &selection, &snapshot, None).await?;
    deliver(&runtime.emitters, &report).await;
    Ok(report)
}
