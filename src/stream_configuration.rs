//! Configuration types for chunkflow sources and sinks

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::error::{StreamError, StreamResult};

/// What an `interval` source does when the consumer falls behind the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissedTickPolicy {
    /// Fire the missed ticks back to back until caught up
    Burst,
    /// Restart the period from the late tick
    #[default]
    Delay,
    /// Drop missed ticks and wait for the next aligned one
    Skip,
}

impl From<MissedTickPolicy> for MissedTickBehavior {
    fn from(policy: MissedTickPolicy) -> Self {
        match policy {
            MissedTickPolicy::Burst => MissedTickBehavior::Burst,
            MissedTickPolicy::Delay => MissedTickBehavior::Delay,
            MissedTickPolicy::Skip => MissedTickBehavior::Skip,
        }
    }
}

/// Configuration for the `interval` source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalConfig {
    pub period: Duration,
    /// Delay before the first value; defaults to one `period`
    pub start_delay: Option<Duration>,
    #[serde(default)]
    pub missed_tick: MissedTickPolicy,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            start_delay: None,
            missed_tick: MissedTickPolicy::default(),
        }
    }
}

impl IntervalConfig {
    /// Create a configuration ticking every `period`
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    /// Set the delay before the first value
    pub fn start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// Set the missed tick policy
    pub fn missed_tick(mut self, policy: MissedTickPolicy) -> Self {
        self.missed_tick = policy;
        self
    }

    /// Delay before the first tick
    pub fn first_tick_after(&self) -> Duration {
        self.start_delay.unwrap_or(self.period)
    }

    pub fn validate(&self) -> StreamResult<()> {
        if self.period.is_zero() {
            return Err(StreamError::invalid_argument(
                "interval period must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Buffer configuration for draining a stream into memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    pub initial_capacity: usize,
    /// Upper bound on buffered chunks; `None` means unbounded
    pub max_capacity: Option<usize>,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            max_capacity: None,
        }
    }
}

impl BufferConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of slots allocated up front
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the maximum number of buffered chunks
    ///
    /// A larger `initial_capacity` is lowered to the cap.
    pub fn max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = Some(capacity);
        self.initial_capacity = self.initial_capacity.min(capacity);
        self
    }

    pub fn validate(&self) -> StreamResult<()> {
        match self.max_capacity {
            Some(max) if max < self.initial_capacity => Err(StreamError::invalid_argument(format!(
                "max_capacity ({}) is smaller than initial_capacity ({})",
                max, self.initial_capacity
            ))),
            _ => Ok(()),
        }
    }
}
