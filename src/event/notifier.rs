// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Update notification bus.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::ControllerEvent;
use crate::connection::ConnectionState;
use crate::subscription::CallbackRegistry;

/// Default channel capacity for broadcast subscribers.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fans a state change out to callbacks and broadcast subscribers.
///
/// Callbacks run synchronously on the task that committed the change, so a
/// receive loop finishes notifying before it reads the next frame. Broadcast
/// subscribers get a copy of each event; a slow receiver lags instead of
/// blocking the adapter (it sees `RecvError::Lagged`).
///
/// # Examples
///
/// ```
/// use intesis_lib::event::{ControllerEvent, Notifier};
///
/// let notifier = Notifier::new();
/// let mut rx = notifier.subscribe();
/// notifier.callbacks().on_update(|device_id| println!("{device_id:?}"));
///
/// assert_eq!(notifier.subscriber_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Notifier {
    callbacks: Arc<CallbackRegistry>,
    events: broadcast::Sender<ControllerEvent>,
}

impl Notifier {
    /// Creates a notifier with the default broadcast capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a notifier buffering up to `capacity` events per receiver.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            callbacks: Arc::new(CallbackRegistry::new()),
            events,
        }
    }

    /// Returns the callback registry.
    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Subscribes to controller events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Returns the number of broadcast receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Notifies every subscriber that `device_id` (or everything) changed.
    pub(crate) fn notify(&self, device_id: Option<&str>) {
        tracing::trace!(device_id = ?device_id, "Notifying subscribers");
        self.callbacks.dispatch_update(device_id);
        // No receivers is not an error
        let _ = self.events.send(ControllerEvent::Updated {
            device_id: device_id.map(str::to_string),
        });
    }

    /// Notifies every subscriber of a connection transition.
    pub(crate) fn connection_changed(&self, state: &ConnectionState) {
        self.callbacks.dispatch_connection(state);
        let _ = self.events.send(ControllerEvent::ConnectionChanged {
            state: *state,
        });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
