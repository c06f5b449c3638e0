// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Retry and keepalive policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff for the cloud token request.
///
/// The wait before attempt `n` (counting from zero) is `n × backoff_unit`,
/// so the first attempt runs immediately.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use intesis_lib::connection::ReconnectionPolicy;
///
/// let policy = ReconnectionPolicy::default().with_max_retries(3);
/// assert_eq!(policy.delay_for(2), Duration::from_secs(120));
/// assert!(policy.should_retry(2));
/// assert!(!policy.should_retry(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectionPolicy {
    /// Delay multiplied by the attempt number.
    pub backoff_unit: Duration,
    /// Maximum number of failed attempts (None = infinite).
    pub max_retries: Option<u32>,
}

impl ReconnectionPolicy {
    /// Default backoff unit.
    pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(60);

    /// Creates a policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backoff unit.
    #[must_use]
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Sets the maximum number of failed attempts.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets infinite retries.
    #[must_use]
    pub fn with_infinite_retries(mut self) -> Self {
        self.max_retries = None;
        self
    }

    /// Returns the wait before the given attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    /// Returns true if another attempt is allowed after `failures` failures.
    #[must_use]
    pub fn should_retry(&self, failures: u32) -> bool {
        self.max_retries.is_none_or(|max| failures < max)
    }
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self {
            backoff_unit: Self::DEFAULT_BACKOFF_UNIT,
            max_retries: None,
        }
    }
}

/// What a persistent connection does about keepalives.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use intesis_lib::connection::KeepalivePolicy;
///
/// let policy = KeepalivePolicy::Reset(Duration::from_secs(240));
/// assert_eq!(policy.interval(), Some(Duration::from_secs(240)));
/// assert!(policy.resets());
/// assert!(KeepalivePolicy::Disabled.interval().is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepalivePolicy {
    /// No keepalive task.
    Disabled,
    /// Send periodically; failures are only logged.
    LogOnly(Duration),
    /// Send periodically; tear the connection down when a send fails or
    /// nothing was received for two intervals.
    Reset(Duration),
}

impl KeepalivePolicy {
    /// Returns the send interval, if enabled.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        match self {
            Self::Disabled => None,
            Self::LogOnly(interval) | Self::Reset(interval) => Some(*interval),
        }
    }

    /// Returns true if a failed keepalive closes the connection.
    #[must_use]
    pub fn resets(&self) -> bool {
        matches!(self, Self::Reset(_))
    }

    /// Returns the silence after which a `Reset` policy gives up.
    #[must_use]
    pub fn stale_after(&self) -> Option<Duration> {
        match self {
            Self::Reset(interval) => Some(interval.saturating_mul(2)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear() {
        let policy = ReconnectionPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_secs(60));
        assert_eq!(policy.delay_for(3), Duration::from_secs(180));
    }

    #[test]
    fn default_retries_forever() {
        let policy = ReconnectionPolicy::default();
        assert!(policy.should_retry(u32::MAX - 1));
        assert!(!policy.with_max_retries(0).should_retry(0));
    }

    #[test]
    fn stale_after_two_intervals() {
        let policy = KeepalivePolicy::Reset(Duration::from_secs(30));
        assert_eq!(policy.stale_after(), Some(Duration::from_secs(60)));
        assert_eq!(KeepalivePolicy::LogOnly(Duration::from_secs(30)).stale_after(), None);
        assert!(!KeepalivePolicy::LogOnly(Duration::from_secs(30)).resets());
    }
}
