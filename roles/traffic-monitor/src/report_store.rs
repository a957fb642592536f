use serde::Serialize;
use std::sync::RwLock;
use traffic_stats::{types::unix_timestamp, AggregationResult, PollError};

/// Latest aggregation result with the time it was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficReport {
    pub cycle: u64,
    pub timestamp: u64,
    #[serde(flatten)]
    pub result: AggregationResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollStatus {
    pub reports: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
    pub last_success: Option<u64>,
    pub last_error: Option<String>,
    pub last_error_at: Option<u64>,
}

/// Shared between the poll loop and the HTTP view. Each report replaces the
/// previous one; nothing older is kept.
pub struct ReportStore {
    latest: RwLock<Option<TrafficReport>>,
    status: RwLock<PollStatus>,
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore {
    pub fn new() -> Self {
        ReportStore {
            latest: RwLock::new(None),
            status: RwLock::new(PollStatus::default()),
        }
    }

    pub fn store_report(&self, result: AggregationResult) {
        self.store_report_at(result, unix_timestamp());
    }

    fn store_report_at(&self, result: AggregationResult, timestamp: u64) {
        let cycle = match self.status.write() {
            Ok(mut status) => {
                status.reports += 1;
                status.consecutive_failures = 0;
                status.last_success = Some(timestamp);
                status.reports
            }
            Err(_) => 0,
        };
        if let Ok(mut guard) = self.latest.write() {
            *guard = Some(TrafficReport {
                cycle,
                timestamp,
                result,
            });
        }
    }

    pub fn record_failure(&self, error: &PollError) {
        if let Ok(mut status) = self.status.write() {
            status.failures += 1;
            status.consecutive_failures += 1;
            status.last_error = Some(error.to_string());
            status.last_error_at = Some(unix_timestamp());
        }
    }

    pub fn get_latest_report(&self) -> Option<TrafficReport> {
        self.latest.read().ok().and_then(|guard| guard.clone())
    }

    pub fn status(&self) -> PollStatus {
        self.status
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// True when there is no report or the latest is older than `threshold_secs`.
    pub fn is_stale(&self, threshold_secs: u64) -> bool {
        self.is_stale_at(threshold_secs, unix_timestamp())
    }

    fn is_stale_at(&self, threshold_secs: u64, now: u64) -> bool {
        match self.get_latest_report() {
            Some(report) => now.saturating_sub(report.timestamp) > threshold_secs,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_stats::{TagTotals, TransportError, TransportErrorKind};

    fn result_with_user(tag: &str, downlink: u64) -> AggregationResult {
        let mut result = AggregationResult::default();
        result.user.insert(
            tag.to_string(),
            TagTotals {
                tag: tag.to_string(),
                uplink: 0,
                downlink,
            },
        );
        result
    }

    #[test]
    fn test_store_and_retrieve_report() {
        let store = ReportStore::new();
        assert!(store.get_latest_report().is_none());

        store.store_report(result_with_user("alice", 10));
        let report = store.get_latest_report().unwrap();
        assert_eq!(report.cycle, 1);
        assert_eq!(report.result.user["alice"].downlink, 10);
    }

    #[test]
    fn test_report_replaces_previous() {
        let store = ReportStore::new();
        store.store_report(result_with_user("alice", 10));
        store.store_report(result_with_user("bob", 20));

        let report = store.get_latest_report().unwrap();
        assert_eq!(report.cycle, 2);
        assert!(!report.result.user.contains_key("alice"));
        assert_eq!(report.result.user["bob"].downlink, 20);
    }

    #[test]
    fn test_staleness_detection() {
        let store = ReportStore::new();
        assert!(store.is_stale(30), "No report should count as stale");

        store.store_report_at(AggregationResult::default(), 1_000);
        assert!(!store.is_stale_at(30, 1_020));
        assert!(store.is_stale_at(30, 1_031));
        // Clock going backwards is not stale
        assert!(!store.is_stale_at(30, 900));
    }

    #[test]
    fn test_failures_are_counted_and_reset() {
        let store = ReportStore::new();
        let error = PollError::Transport(TransportError::new(
            TransportErrorKind::Unavailable,
            "connection refused",
        ));
        store.record_failure(&error);
        store.record_failure(&error);

        let status = store.status();
        assert_eq!(status.failures, 2);
        assert_eq!(status.consecutive_failures, 2);
        assert_eq!(
            status.last_error.as_deref(),
            Some("unavailable: connection refused")
        );

        store.store_report(AggregationResult::default());
        let status = store.status();
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.failures, 2);
        assert!(status.last_success.is_some());
    }

    #[test]
    fn test_report_serializes_flat() {
        let store = ReportStore::new();
        store.store_report(result_with_user("alice", 10));
        let json = serde_json::to_value(store.get_latest_report().unwrap()).unwrap();
        assert_eq!(json["cycle"], 1);
        assert_eq!(json["user"]["alice"]["downlink"], 10);
        assert!(json["inbound"].as_object().unwrap().is_empty());
    }
}
