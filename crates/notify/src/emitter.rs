use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{error, info};

use karat_core::domain::report::RunReport;

use crate::render;

/// Delivery boundary for finished run reports.
#[async_trait]
pub trait ReportEmitter: Send + Sync {
    async fn send(&self, report: &RunReport) -> anyhow::Result<()>;
}

/// Emits the text rendering through the process log.
pub struct LogEmitter;

#[async_trait]
impl ReportEmitter for LogEmitter {
    async fn send(&self, report: &RunReport) -> anyhow::Result<()> {
        for line in render::render_text(report).lines() {
            info!(target: "karat::report", "{line}");
        }
        Ok(())
    }
}

/// Writes the HTML rendering to a file, for a mail relay or operator to
/// pick up.
pub struct HtmlFileEmitter {
    path: PathBuf,
}

impl HtmlFileEmitter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ReportEmitter for HtmlFileEmitter {
    async fn send(&self, report: &RunReport) -> anyhow::Result<()> {
        let html = render::render_html(report)
            .with_context(|| "report template rendering failed".to_string())?;
        tokio::fs::write(&self.path, html)
            .await
            .with_context(|| format!("could not write report to {}", self.path.display()))?;
        info!(path = %self.path.display(), "report written");
        Ok(())
    }
}

/// Send the report through every configured emitter. Delivery problems are
/// logged and swallowed: the catalog writes already happened and the
/// report must never retroactively fail the run.
pub async fn deliver(emitters: &[Box<dyn ReportEmitter>], report: &RunReport) {
    for emitter in emitters {
        if let Err(failure) = emitter.send(report).await {
            error!(error = %format!("{failure:#}"), "report delivery failed");
        }
    }
}
