pub mod auto;
pub mod config;
pub mod diamond;
pub mod manual;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;

use karat_core::config::AppConfig;
use karat_core::update::BulkUpdater;
use karat_notify::{HtmlFileEmitter, LogEmitter, ReportEmitter};
use karat_storefront::StorefrontClient;

/// Everything a run command needs: the catalog client, the updater wired
/// with a ctrl-c stop flag, and the configured report emitters.
pub(crate) struct Runtime {
    pub store: Arc<StorefrontClient>,
    pub updater: BulkUpdater,
    pub emitters: Vec<Box<dyn ReportEmitter>>,
}

pub(crate) fn runtime(config: &AppConfig) -> anyhow::Result<Runtime> {
    let store = Arc::new(
        StorefrontClient::new(&config.storefront, config.retry)
            .context("storefront client setup failed")?,
    );
    let updater = BulkUpdater::new(store.clone()).with_stop(interrupt_flag());

    let mut emitters: Vec<Box<dyn ReportEmitter>> = vec![Box::new(LogEmitter)];
    if let Some(path) = &config.report.html_output_path {
        emitters.push(Box::new(HtmlFileEmitter::new(path.clone())));
    }

    Ok(Runtime { store, updater, emitters })
}

/// A first ctrl-c requests a cooperative stop; the in-flight product still
/// completes before the run winds down.
fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let armed = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing the in-flight product");
            armed.store(true, Ordering::Relaxed);
        }
    });
    flag
}
