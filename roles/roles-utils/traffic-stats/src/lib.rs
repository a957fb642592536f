//! Traffic counter engine for v2ray-style stats services.
//!
//! Counter names such as `user>>>alice@example.com>>>traffic>>>downlink` are
//! parsed by [`name_parser`], summed per tag by [`aggregator`] and collected
//! on a fixed schedule by [`stats_poller`]. Transport and presentation stay
//! behind the [`SnapshotSource`] and [`Reporter`] traits.

pub mod aggregator;
pub mod name_parser;
pub mod reporter;
pub mod source;
pub mod state_machine;
pub mod stats_poller;
pub mod types;

pub use aggregator::aggregate;
pub use reporter::{PollError, Reporter};
pub use source::{SnapshotSource, SourceError, TransportError, TransportErrorKind};
pub use state_machine::PollState;
pub use stats_poller::{PollConfig, PollStats, StatsPoller};
pub use types::{
    AggregationResult, AggregationStats, Direction, MonitoredSet, ParsedName, RawCounter,
    ResourceKind, TagFilter, TagTotals,
};

pub use tokio_util::sync::CancellationToken;
