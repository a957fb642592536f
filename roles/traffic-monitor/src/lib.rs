pub mod api;
pub mod args;
pub mod config;
pub mod console;
pub mod formatting;
pub mod report_store;
pub mod reporter;
pub mod shutdown;

pub use report_store::ReportStore;
pub use reporter::MonitorReporter;
