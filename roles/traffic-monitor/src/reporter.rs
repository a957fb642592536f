use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use traffic_stats::{AggregationResult, PollError, Reporter};

use crate::console::ConsoleReporter;
use crate::report_store::ReportStore;

/// Prints every cycle and, when the HTTP view is enabled, keeps the latest
/// report for it.
pub struct MonitorReporter<W> {
    console: ConsoleReporter<W>,
    store: Option<Arc<ReportStore>>,
}

impl<W: Write + Send> MonitorReporter<W> {
    pub fn new(console: ConsoleReporter<W>, store: Option<Arc<ReportStore>>) -> Self {
        Self { console, store }
    }
}

impl<W: Write + Send> Reporter for MonitorReporter<W> {
    fn report(&mut self, result: AggregationResult) {
        match &self.store {
            Some(store) => {
                self.console.report(result.clone());
                store.store_report(result);
            }
            None => self.console.report(result),
        }
    }

    fn advisory(&mut self, error: &PollError, retry_in: Duration) {
        if let Some(store) = &self.store {
            store.record_failure(error);
        }
        self.console.advisory(error, retry_in);
    }
}
