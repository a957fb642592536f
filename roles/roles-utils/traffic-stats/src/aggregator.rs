use tracing::trace;

use crate::name_parser;
use crate::types::{AggregationResult, Direction, MonitoredSet, RawCounter, TagTotals};

/// Build per-tag traffic totals from one snapshot.
///
/// Counters are visited in input order. Non-positive values, names that do not
/// parse and inbound/outbound tags outside `monitored` are skipped. Repeated
/// tag+direction entries are summed. Sums saturate at `u64::MAX` and each
/// saturating addition is counted in `stats.saturated`.
pub fn aggregate<'a, I>(counters: I, monitored: &MonitoredSet) -> AggregationResult
where
    I: IntoIterator<Item = &'a RawCounter>,
{
    let mut result = AggregationResult::default();

    for counter in counters {
        result.stats.total += 1;

        if counter.value <= 0 {
            result.stats.non_positive += 1;
            continue;
        }

        let Some(parsed) = name_parser::parse(&counter.name) else {
            trace!("Skipping unmatched counter {}", counter.name);
            result.stats.unmatched += 1;
            continue;
        };

        if !monitored.retains(parsed.resource_kind, parsed.tag) {
            trace!(
                "Skipping unmonitored {} tag {}",
                parsed.resource_kind,
                parsed.tag
            );
            result.stats.filtered += 1;
            continue;
        }

        let totals = result
            .by_kind_mut(parsed.resource_kind)
            .entry(parsed.tag.to_string())
            .or_insert_with(|| TagTotals::new(parsed.tag));

        let slot = match parsed.direction {
            Direction::Uplink => &mut totals.uplink,
            Direction::Downlink => &mut totals.downlink,
        };
        // value > 0 here, so the conversion is lossless
        match slot.checked_add(counter.value as u64) {
            Some(sum) => *slot = sum,
            None => {
                *slot = u64::MAX;
                result.stats.saturated += 1;
            }
        }
        result.stats.accumulated += 1;
    }

    result
}
