//! Report rendering and delivery.
//!
//! The orchestrator hands a finished `RunReport` to an emitter; what
//! happens next (log lines, a file on disk, a mail relay upstream) never
//! feeds back into the run. Price updates already committed are
//! authoritative whether or not anyone hears about them.

pub mod emitter;
pub mod render;

pub use emitter::{deliver, HtmlFileEmitter, LogEmitter, ReportEmitter};
pub use render::{render_html, render_text};
