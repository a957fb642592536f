//! Plain-text rendering of traffic reports and fetch advisories.

use std::fmt::Write as _;
use std::io::Write;
use std::time::Duration;
use tracing::error;
use traffic_stats::{
    AggregationResult, PollError, Reporter, ResourceKind, TagTotals, TransportErrorKind,
};
use unicode_width::UnicodeWidthStr;
use v2ray_stats_client::{SysStatsResponse, KNOWN_SERVICE_NAMES};

use crate::formatting::{format_bytes, format_uptime};

const RULE_WIDTH: usize = 64;

fn section_title(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Inbound => "Inbound traffic",
        ResourceKind::Outbound => "Outbound traffic",
        ResourceKind::User => "User traffic",
    }
}

/// Render one cycle's result. Kinds without any tag are left out; when nothing
/// at all matched, a hint block replaces the tables.
pub fn render_report(result: &AggregationResult, timestamp: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out, "Traffic report  {}", timestamp);
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));

    if result.is_empty() {
        out.push_str(&render_no_data(result));
        return out;
    }

    for kind in ResourceKind::ALL {
        let per_tag = result.by_kind(kind);
        if per_tag.is_empty() {
            continue;
        }
        let rows: Vec<&TagTotals> = per_tag.values().collect();
        let (up, down) = result.kind_totals(kind);
        out.push_str(&render_table(section_title(kind), &rows, up, down));
    }
    out
}

fn render_table(title: &str, rows: &[&TagTotals], up: u64, down: u64) -> String {
    // Terminal columns, not chars: CJK and emoji tags take two cells each.
    let tag_width = rows
        .iter()
        .map(|row| row.tag.width())
        .chain(["Tag".len(), "Total".len()])
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "\n{}", title);
    let _ = writeln!(
        out,
        "  {}  {:>12}  {:>12}  {:>12}",
        pad_tag("Tag", tag_width),
        "Upload",
        "Download",
        "Total"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "  {}  {:>12}  {:>12}  {:>12}",
            pad_tag(&row.tag, tag_width),
            format_bytes(row.uplink),
            format_bytes(row.downlink),
            format_bytes(row.total())
        );
    }
    let _ = writeln!(out, "  {}", "-".repeat(tag_width + 42));
    let _ = writeln!(
        out,
        "  {}  {:>12}  {:>12}  {:>12}",
        pad_tag("Total", tag_width),
        format_bytes(up),
        format_bytes(down),
        format_bytes(up.saturating_add(down))
    );
    out
}

fn pad_tag(tag: &str, width: usize) -> String {
    let mut padded = tag.to_string();
    padded.push_str(&" ".repeat(width.saturating_sub(tag.width())));
    padded
}

fn render_no_data(result: &AggregationResult) -> String {
    let stats = &result.stats;
    let mut out = String::new();
    let _ = writeln!(out, "\n⚠️  No traffic data matched");
    let _ = writeln!(
        out,
        "  {} counters received: {} unmatched, {} not monitored, {} without traffic",
        stats.total, stats.unmatched, stats.filtered, stats.non_positive
    );
    let _ = writeln!(out, "  Check that:");
    let _ = writeln!(
        out,
        "  - the policy enables statsInboundUplink/Downlink, statsOutboundUplink/Downlink and statsUserUplink/Downlink"
    );
    let _ = writeln!(
        out,
        "  - [monitor] inbounds/outbounds list tags that exist in the proxy config"
    );
    let _ = writeln!(out, "  - some traffic has passed since the counters were last reset");
    out
}

/// Render a failed fetch. The detail is printed as received; an unknown
/// method adds the service names other builds use.
pub fn render_advisory(error: &PollError, retry_in: Duration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "❌ Failed to query stats: {}", error.detail());
    if error.transport_kind() == Some(TransportErrorKind::UnknownMethod) {
        out.push_str(&render_service_hint());
    }
    let _ = writeln!(out, "   Retrying in {}s", retry_in.as_secs());
    out
}

/// Hint printed when the configured gRPC service name is rejected.
pub fn render_service_hint() -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "   The API does not know this service name. Set [api].service_name to one of:"
    );
    for name in KNOWN_SERVICE_NAMES {
        let _ = writeln!(out, "     {}", name);
    }
    out
}

pub fn render_sys_stats(stats: &SysStatsResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Uptime:        {}", format_uptime(u64::from(stats.uptime)));
    let _ = writeln!(out, "Goroutines:    {}", stats.num_goroutine);
    let _ = writeln!(out, "GC runs:       {}", stats.num_gc);
    let _ = writeln!(out, "Alloc:         {}", format_bytes(stats.alloc));
    let _ = writeln!(out, "Total alloc:   {}", format_bytes(stats.total_alloc));
    let _ = writeln!(out, "Sys:           {}", format_bytes(stats.sys));
    let _ = writeln!(out, "Mallocs:       {}", stats.mallocs);
    let _ = writeln!(out, "Frees:         {}", stats.frees);
    let _ = writeln!(out, "Live objects:  {}", stats.live_objects);
    let _ = writeln!(
        out,
        "GC pause:      {:.3}ms",
        stats.pause_total_ns as f64 / 1_000_000.0
    );
    out
}

fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Writes every report and advisory to `W` (stdout in the binary).
pub struct ConsoleReporter<W> {
    out: W,
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            error!("Failed to write report: {}", e);
        }
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn report(&mut self, result: AggregationResult) {
        let text = render_report(&result, &local_timestamp());
        self.emit(&text);
    }

    fn advisory(&mut self, error: &PollError, retry_in: Duration) {
        let text = render_advisory(error, retry_in);
        self.emit(&text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_stats::{aggregate, MonitoredSet, RawCounter, TransportError};

    fn sample() -> AggregationResult {
        let counters = vec![
            RawCounter::new("inbound>>>mixed-in>>>traffic>>>uplink", 1024),
            RawCounter::new("outbound>>>proxy>>>traffic>>>downlink", 2048),
            RawCounter::new("user>>>alice@example.com>>>traffic>>>downlink", 1536),
        ];
        aggregate(&counters, &MonitoredSet::new(["mixed-in"], ["proxy"]))
    }

    #[test]
    fn test_report_lists_every_kind() {
        let text = render_report(&sample(), "2026-01-01 00:00:00");
        assert!(text.contains("Traffic report  2026-01-01 00:00:00"));
        assert!(text.contains("Inbound traffic"));
        assert!(text.contains("Outbound traffic"));
        assert!(text.contains("User traffic"));
        assert!(text.contains("alice@example.com"));
        assert!(text.contains("1.50 KB"));
        assert!(text.contains("2.00 KB"));
        assert!(!text.contains("No traffic data"));
    }

    #[test]
    fn test_report_skips_empty_kinds() {
        let counters = vec![RawCounter::new("user>>>bob>>>traffic>>>uplink", 10)];
        let result = aggregate(&counters, &MonitoredSet::default());
        let text = render_report(&result, "now");
        assert!(text.contains("User traffic"));
        assert!(!text.contains("Inbound traffic"));
    }

    #[test]
    fn test_table_columns_align() {
        let text = render_report(&sample(), "now");
        let header = text.lines().find(|l| l.trim_start().starts_with("Tag")).unwrap();
        let row = text.lines().find(|l| l.contains("mixed-in")).unwrap();
        assert_eq!(header.len(), row.len());
    }

    #[test]
    fn test_wide_tags_keep_columns_aligned() {
        let counters = vec![
            RawCounter::new("outbound>>>direct>>>traffic>>>uplink", 1024),
            RawCounter::new("outbound>>>🌐代理>>>traffic>>>uplink", 2048),
        ];
        let set = MonitoredSet::new(Vec::<String>::new(), ["direct", "🌐代理"]);
        let result = aggregate(&counters, &set);
        let text = render_report(&result, "now");

        let header = text.lines().find(|l| l.trim_start().starts_with("Tag")).unwrap();
        let narrow = text.lines().find(|l| l.contains("direct")).unwrap();
        let wide = text.lines().find(|l| l.contains("🌐代理")).unwrap();
        assert_eq!(header.width(), narrow.width());
        assert_eq!(header.width(), wide.width());
        assert!(header.ends_with("Total"));
        assert!(wide.ends_with("2.00 KB"));
    }

    #[test]
    fn test_empty_result_prints_hint() {
        let counters = vec![
            RawCounter::new("inbound>>>unknown>>>traffic>>>uplink", 10),
            RawCounter::new("malformed-name", 5),
        ];
        let result = aggregate(&counters, &MonitoredSet::new(["mixed-in"], ["proxy"]));
        let text = render_report(&result, "now");
        assert!(text.contains("No traffic data matched"));
        assert!(text.contains("2 counters received: 1 unmatched, 1 not monitored"));
    }

    #[test]
    fn test_unknown_method_advisory_lists_service_names() {
        let error = PollError::Transport(TransportError::new(
            TransportErrorKind::UnknownMethod,
            "unknown service v2ray.core.app.stats.command.StatsService",
        ));
        let text = render_advisory(&error, Duration::from_secs(10));
        assert!(text.contains("unknown service v2ray.core.app.stats.command.StatsService"));
        for name in KNOWN_SERVICE_NAMES {
            assert!(text.contains(name));
        }
        assert!(text.contains("Retrying in 10s"));
    }

    #[test]
    fn test_other_advisory_has_no_service_hint() {
        let error = PollError::Unclassified("connection reset".to_string());
        let text = render_advisory(&error, Duration::from_secs(10));
        assert!(text.contains("connection reset"));
        assert!(!text.contains("service_name"));
    }

    #[test]
    fn test_console_reporter_writes_output() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.report(sample());
        reporter.advisory(
            &PollError::Unclassified("boom".to_string()),
            Duration::from_secs(10),
        );
        let written = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(written.contains("Inbound traffic"));
        assert!(written.contains("boom"));
    }

    #[test]
    fn test_sys_stats_rendering() {
        let stats = SysStatsResponse {
            num_goroutine: 12,
            uptime: 3_661,
            alloc: 2048,
            ..Default::default()
        };
        let text = render_sys_stats(&stats);
        assert!(text.contains("Uptime:        1h 1m 1s"));
        assert!(text.contains("Goroutines:    12"));
        assert!(text.contains("Alloc:         2.00 KB"));
    }
}
