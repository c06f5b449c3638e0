// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection state machine.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::event::Notifier;

/// Connection state of one adapter.
///
/// `Disconnected -> Connecting -> Connected`, and back to `Disconnected`
/// on transport loss or an explicit stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Idle; no transport is open.
    #[default]
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// Authenticated and receiving updates.
    Connected,
}

impl ConnectionState {
    /// Returns the state as a lowercase string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct TrackerInner {
    state: ConnectionState,
    retries: u32,
    error_message: Option<String>,
}

/// Owns the connection state of one adapter and publishes its transitions.
///
/// Every transition that actually changes the state is reported once through
/// the [`Notifier`] and on the watch channel returned by [`watch`](Self::watch).
#[derive(Debug)]
pub struct ConnectionTracker {
    inner: Mutex<TrackerInner>,
    state_tx: watch::Sender<ConnectionState>,
    notifier: Notifier,
}

impl ConnectionTracker {
    /// Creates a tracker in the `Disconnected` state.
    #[must_use]
    pub fn new(notifier: Notifier) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Mutex::new(TrackerInner::default()),
            state_tx,
            notifier,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Returns true when the adapter is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns true while a connect attempt is running.
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        self.state() == ConnectionState::Connecting
    }

    /// Returns true when neither connecting nor connected.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.state() == ConnectionState::Disconnected
    }

    /// Subscribes to state transitions.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Moves from `Disconnected` to `Connecting`.
    ///
    /// Returns false, leaving the state untouched, when a connection is
    /// already open or being opened.
    pub fn begin_connect(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state != ConnectionState::Disconnected {
                return false;
            }
            inner.state = ConnectionState::Connecting;
            inner.retries = 0;
        }
        self.publish(ConnectionState::Connecting);
        true
    }

    /// Marks the handshake as complete and clears the retry counter.
    pub fn mark_connected(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            inner.retries = 0;
            if inner.state == ConnectionState::Connected {
                return false;
            }
            inner.state = ConnectionState::Connected;
        }
        self.publish(ConnectionState::Connected);
        true
    }

    /// Returns to `Disconnected`.
    ///
    /// Returns true if the state changed, so callers can notify subscribers
    /// exactly once when stop and transport loss race.
    pub fn mark_disconnected(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state == ConnectionState::Disconnected {
                return false;
            }
            inner.state = ConnectionState::Disconnected;
        }
        self.publish(ConnectionState::Disconnected);
        true
    }

    /// Returns the number of failed attempts in the current connect cycle.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.inner.lock().retries
    }

    /// Counts one failed attempt and returns the new total.
    pub fn record_retry(&self) -> u32 {
        let mut inner = self.inner.lock();
        inner.retries = inner.retries.saturating_add(1);
        inner.retries
    }

    /// Clears the failed attempt counter.
    pub fn reset_retries(&self) {
        self.inner.lock().retries = 0;
    }

    /// Returns the last error reported by the remote side or the transport.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.inner.lock().error_message.clone()
    }

    /// Records an error message.
    pub fn set_error(&self, message: impl Into<String>) {
        self.inner.lock().error_message = Some(message.into());
    }

    fn publish(&self, state: ConnectionState) {
        tracing::debug!(%state, "Connection state changed");
        self.state_tx.send_replace(state);
        self.notifier.connection_changed(&state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ControllerEvent;

    fn tracker() -> ConnectionTracker {
        ConnectionTracker::new(Notifier::new())
    }

    #[test]
    fn starts_disconnected() {
        let tracker = tracker();
        assert!(tracker.is_disconnected());
        assert!(!tracker.is_connected());
        assert_eq!(tracker.retries(), 0);
        assert!(tracker.error_message().is_none());
    }

    #[test]
    fn begin_connect_is_guarded() {
        let tracker = tracker();
        assert!(tracker.begin_connect());
        assert!(tracker.is_connecting());
        assert!(!tracker.is_disconnected());

        assert!(!tracker.begin_connect());
        tracker.mark_connected();
        assert!(!tracker.begin_connect());
        assert!(tracker.is_connected());
    }

    #[test]
    fn mark_disconnected_reports_change_once() {
        let tracker = tracker();
        tracker.begin_connect();
        assert!(tracker.mark_disconnected());
        assert!(!tracker.mark_disconnected());
    }

    #[test]
    fn connected_resets_retries() {
        let tracker = tracker();
        tracker.begin_connect();
        assert_eq!(tracker.record_retry(), 1);
        assert_eq!(tracker.record_retry(), 2);
        tracker.mark_connected();
        assert_eq!(tracker.retries(), 0);
    }

    #[tokio::test]
    async fn transitions_are_published() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let tracker = ConnectionTracker::new(notifier);
        let mut watch = tracker.watch();

        tracker.begin_connect();
        tracker.mark_connected();

        assert_eq!(
            rx.recv().await.unwrap(),
            ControllerEvent::ConnectionChanged {
                state: ConnectionState::Connecting
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            ControllerEvent::ConnectionChanged {
                state: ConnectionState::Connected
            }
        );
        assert_eq!(*watch.borrow_and_update(), ConnectionState::Connected);
    }

    #[test]
    fn display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
