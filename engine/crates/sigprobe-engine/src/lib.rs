//! SigProbe Engine - Concurrent dispatch and reporting
//!
//! This crate provides:
//! - `Dispatcher`: runs the probe x host cross product on a fixed worker pool
//! - `Reporter`: single writer for findings, errors, progress and summary

pub mod dispatcher;
pub mod report;
pub mod work;

pub use dispatcher::{DispatchSummary, Dispatcher};
pub use report::{render_event, ReportEvent, ReportSender, ReportStats, ReportWriter, Reporter};
pub use work::{work_item_count, work_items, WorkItem};
