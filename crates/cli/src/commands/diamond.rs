use anyhow::Context;
use chrono::Utc;

use karat_core::adapters::CatalogStore;
use karat_core::config::AppConfig;
use karat_core::domain::rates::RateSnapshot;
use karat_core::domain::report::RunReport;
use karat_core::pricing::stones::DiamondOverrideMap;
use karat_core::update::Selection;
use karat_notify::deliver;

use crate::DiamondArgs;

/// Diamond mode: reprice against new per-carat stone prices. Rates come
/// from the current theme settings; the run covers the full catalog so
/// matching theme slots can be patched, and untouched products simply
/// come out skipped.
pub async fn run(config: &AppConfig, args: DiamondArgs) -> anyhow::Result<RunReport> {
    let runtime = super::runtime(config)?;
    let theme = runtime
        .store
        .get_theme_settings()
        .await
        .context("could not read theme settings")?;

    let overrides = args.prices.as_deref().map(DiamondOverrideMap::parse);
    if let Some(map) = &overrides {
        anyhow::ensure!(!map.is_empty(), "no valid diamond prices parsed from --prices");
        tracing::info!(entries = map.len(), "using operator-supplied diamond prices");
    } else {
        anyhow::ensure!(
            !theme.diamond_slots.is_empty(),
            "theme settings define no diamond slots and --prices was not given"
        );
        tracing::info!(slots = theme.diamond_slots.len(), "using theme diamond slots");
    }

    let snapshot = RateSnapshot::compose(&theme, &config.pricing, None, None, Utc::now())?;

    let report = runtime
        .updater
        .run("diamond", &Selection::all(), &snapshot, overrides.as_ref())
        .await?;
    deliver(&runtime.emitters, &report).await;
    Ok(report)
}
