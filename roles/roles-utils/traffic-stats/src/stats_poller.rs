use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregator::aggregate;
use crate::reporter::{PollError, Reporter};
use crate::source::SnapshotSource;
use crate::state_machine::PollState;
use crate::types::{MonitoredSet, RawCounter};

/// Request parameters and timing for the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Server-side name filter, passed through unmodified
    pub pattern: String,
    /// Ask the server to zero counters after reading them
    pub reset: bool,
    /// Delay after a successful cycle
    pub interval: Duration,
    /// Fixed delay after a failed fetch
    pub retry_backoff: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            reset: false,
            interval: Duration::from_secs(5),
            retry_backoff: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
}

enum Phase {
    Idle,
    Fetching,
    Parsed(Vec<RawCounter>),
    Failed(PollError),
    Waiting(Duration),
    Stopped,
}

impl Phase {
    fn state(&self) -> PollState {
        match self {
            Phase::Idle => PollState::Idle,
            Phase::Fetching => PollState::Fetching,
            Phase::Parsed(_) => PollState::Parsed,
            Phase::Failed(_) => PollState::Failed,
            Phase::Waiting(_) => PollState::Waiting,
            Phase::Stopped => PollState::Stopped,
        }
    }
}

/// Sequential fetch, aggregate, report loop with a fixed retry backoff.
///
/// Each call to [`StatsPoller::step`] performs exactly one state transition,
/// so tests can drive the loop one phase at a time. [`StatsPoller::run`] steps
/// until the cancellation token stops it. Fetch failures never end the loop.
pub struct StatsPoller<S, R> {
    source: S,
    reporter: R,
    monitored: MonitoredSet,
    config: PollConfig,
    phase: Phase,
    stats: PollStats,
}

impl<S, R> StatsPoller<S, R>
where
    S: SnapshotSource,
    R: Reporter,
{
    pub fn new(source: S, reporter: R, monitored: MonitoredSet, config: PollConfig) -> Self {
        Self {
            source,
            reporter,
            monitored,
            config,
            phase: Phase::Idle,
            stats: PollStats::default(),
        }
    }

    pub fn state(&self) -> PollState {
        self.phase.state()
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Advance by one transition and return the new state.
    pub async fn step(&mut self, cancel: &CancellationToken) -> PollState {
        let previous = self.state();
        let next = match std::mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::Idle => {
                if cancel.is_cancelled() {
                    Phase::Stopped
                } else {
                    Phase::Fetching
                }
            }
            Phase::Fetching => {
                self.stats.attempts += 1;
                match self
                    .source
                    .fetch(&self.config.pattern, self.config.reset)
                    .await
                {
                    Ok(counters) => Phase::Parsed(counters),
                    Err(e) => Phase::Failed(e.into()),
                }
            }
            Phase::Parsed(counters) => {
                let result = aggregate(&counters, &self.monitored);
                self.stats.successes += 1;
                if self.stats.consecutive_failures > 0 {
                    info!(
                        "✅ Stats service reachable again after {} failed attempts",
                        self.stats.consecutive_failures
                    );
                }
                self.stats.consecutive_failures = 0;
                debug!(
                    "Aggregated snapshot: total={} accumulated={} unmatched={} filtered={} non_positive={} saturated={}",
                    result.stats.total,
                    result.stats.accumulated,
                    result.stats.unmatched,
                    result.stats.filtered,
                    result.stats.non_positive,
                    result.stats.saturated
                );
                if result.stats.saturated > 0 {
                    warn!(
                        "{} counters saturated at u64::MAX while summing",
                        result.stats.saturated
                    );
                }
                self.reporter.report(result);
                Phase::Waiting(self.config.interval)
            }
            Phase::Failed(error) => {
                self.stats.failures += 1;
                self.stats.consecutive_failures += 1;
                warn!(
                    "Fetch failed ({} in a row): {}. Retrying in {:?}",
                    self.stats.consecutive_failures, error, self.config.retry_backoff
                );
                self.reporter.advisory(&error, self.config.retry_backoff);
                Phase::Waiting(self.config.retry_backoff)
            }
            Phase::Waiting(delay) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Phase::Stopped,
                    _ = tokio::time::sleep(delay) => {
                        if cancel.is_cancelled() {
                            Phase::Stopped
                        } else {
                            Phase::Fetching
                        }
                    }
                }
            }
            Phase::Stopped => Phase::Stopped,
        };

        self.enter(previous, next);
        self.state()
    }

    /// Step until cancelled. Returns the final counters.
    pub async fn run(&mut self, cancel: &CancellationToken) -> PollStats {
        info!(
            "🔄 Polling every {:?} (retry backoff {:?})",
            self.config.interval, self.config.retry_backoff
        );
        while !self.step(cancel).await.is_terminal() {}
        info!(
            "Poll loop stopped after {} attempts ({} ok, {} failed)",
            self.stats.attempts, self.stats.successes, self.stats.failures
        );
        self.stats
    }

    fn enter(&mut self, previous: PollState, next: Phase) {
        let next_state = next.state();
        debug_assert!(
            (previous == next_state && previous.is_terminal())
                || previous.can_transition_to(next_state),
            "invalid poll transition {} → {}",
            previous,
            next_state
        );
        if previous != next_state {
            debug!("State transition: {} → {}", previous, next_state);
        }
        self.phase = next;
    }
}
