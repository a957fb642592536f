use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// One named counter exactly as the stats service returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCounter {
    pub name: String,
    pub value: i64,
}

impl RawCounter {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Inbound,
    Outbound,
    User,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Inbound,
        ResourceKind::Outbound,
        ResourceKind::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Inbound => "inbound",
            ResourceKind::Outbound => "outbound",
            ResourceKind::User => "user",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Uplink,
    Downlink,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Uplink => "uplink",
            Direction::Downlink => "downlink",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Components of a recognised traffic counter name. Borrows the tag from the
/// counter it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedName<'a> {
    pub resource_kind: ResourceKind,
    pub tag: &'a str,
    pub direction: Direction,
}

/// Accumulated byte counts for one tag within one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTotals {
    pub tag: String,
    pub uplink: u64,
    pub downlink: u64,
}

impl TagTotals {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            uplink: 0,
            downlink: 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.uplink.saturating_add(self.downlink)
    }
}

/// Bookkeeping for what happened to each counter of a snapshot.
///
/// `total == non_positive + unmatched + filtered + accumulated` always holds.
/// `saturated` counts accumulated counters whose addition hit `u64::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationStats {
    pub total: usize,
    pub non_positive: usize,
    pub unmatched: usize,
    pub filtered: usize,
    pub accumulated: usize,
    pub saturated: usize,
}

/// Per-kind traffic totals for one snapshot, keyed and ordered by tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub inbound: BTreeMap<String, TagTotals>,
    pub outbound: BTreeMap<String, TagTotals>,
    pub user: BTreeMap<String, TagTotals>,
    pub stats: AggregationStats,
}

impl AggregationResult {
    pub fn by_kind(&self, kind: ResourceKind) -> &BTreeMap<String, TagTotals> {
        match kind {
            ResourceKind::Inbound => &self.inbound,
            ResourceKind::Outbound => &self.outbound,
            ResourceKind::User => &self.user,
        }
    }

    pub fn by_kind_mut(&mut self, kind: ResourceKind) -> &mut BTreeMap<String, TagTotals> {
        match kind {
            ResourceKind::Inbound => &mut self.inbound,
            ResourceKind::Outbound => &mut self.outbound,
            ResourceKind::User => &mut self.user,
        }
    }

    /// True when no counter was accumulated into any kind.
    pub fn is_empty(&self) -> bool {
        self.inbound.is_empty() && self.outbound.is_empty() && self.user.is_empty()
    }

    /// Sum of (uplink, downlink) over every tag of `kind`.
    pub fn kind_totals(&self, kind: ResourceKind) -> (u64, u64) {
        self.by_kind(kind)
            .values()
            .fold((0u64, 0u64), |(up, down), totals| {
                (
                    up.saturating_add(totals.uplink),
                    down.saturating_add(totals.downlink),
                )
            })
    }
}

/// Which tags of a filtered kind are retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFilter {
    All,
    Only(HashSet<String>),
}

impl TagFilter {
    pub fn only<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagFilter::Only(tags.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, tag: &str) -> bool {
        match self {
            TagFilter::All => true,
            TagFilter::Only(tags) => tags.contains(tag),
        }
    }
}

impl Default for TagFilter {
    fn default() -> Self {
        TagFilter::Only(HashSet::new())
    }
}

/// Inbound and outbound tags selected for reporting. User counters are never
/// filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitoredSet {
    pub inbound: TagFilter,
    pub outbound: TagFilter,
}

impl MonitoredSet {
    pub fn new<I, O, S, T>(inbound: I, outbound: O) -> Self
    where
        I: IntoIterator<Item = S>,
        O: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            inbound: TagFilter::only(inbound),
            outbound: TagFilter::only(outbound),
        }
    }

    /// Retains every inbound and outbound tag.
    pub fn all() -> Self {
        Self {
            inbound: TagFilter::All,
            outbound: TagFilter::All,
        }
    }

    pub fn retains(&self, kind: ResourceKind, tag: &str) -> bool {
        match kind {
            ResourceKind::Inbound => self.inbound.contains(tag),
            ResourceKind::Outbound => self.outbound.contains(tag),
            ResourceKind::User => true,
        }
    }
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
