// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for state update notifications.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry storing and dispatching callbacks

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::connection::ConnectionState;

/// Unique identifier for a subscription.
///
/// Returned when registering a callback and used to remove it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Callback receiving the updated device id, or `None` for a global refresh.
type UpdateCallback = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// Callback receiving the new connection state.
type ConnectionCallback = Arc<dyn Fn(&ConnectionState) + Send + Sync>;

/// Registry of update subscribers.
///
/// Dispatch invokes every callback synchronously. A callback that panics
/// is reported through `tracing` and does not stop the others. Callbacks
/// may register or remove subscriptions from inside a dispatch.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use intesis_lib::subscription::CallbackRegistry;
///
/// let registry = CallbackRegistry::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&hits);
///
/// let id = registry.on_update(move |_device_id| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// registry.dispatch_update(Some("123"));
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// assert!(registry.unsubscribe(id));
/// ```
pub struct CallbackRegistry {
    next_id: AtomicU64,
    update_callbacks: RwLock<HashMap<SubscriptionId, UpdateCallback>>,
    connection_callbacks: RwLock<HashMap<SubscriptionId, ConnectionCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            update_callbacks: RwLock::new(HashMap::new()),
            connection_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a callback for device state updates.
    pub fn on_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.update_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for connection state transitions.
    pub fn on_connection_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.connection_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.update_callbacks.write().remove(&id).is_some()
            || self.connection_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.update_callbacks.write().clear();
        self.connection_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Invokes every update callback.
    pub fn dispatch_update(&self, device_id: Option<&str>) {
        let callbacks: Vec<_> = self.update_callbacks.read().values().cloned().collect();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(device_id))).is_err() {
                tracing::error!(device_id = ?device_id, "Update callback panicked");
            }
        }
    }

    /// Invokes every connection callback.
    pub fn dispatch_connection(&self, state: &ConnectionState) {
        let callbacks: Vec<_> = self
            .connection_callbacks
            .read()
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(state))).is_err() {
                tracing::error!(state = %state, "Connection callback panicked");
            }
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.update_callbacks.read().len() + self.connection_callbacks.read().len()
    }

    /// Returns true if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn subscription_id_display() {
        let id = SubscriptionId::new(42);
        assert_eq!(id.to_string(), "Sub(42)");
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = CallbackRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.callback_count(), 0);
    }

    #[test]
    fn update_callback_receives_device_id() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let id = registry.on_update(move |device_id| {
            sink.lock().push(device_id.map(str::to_string));
        });

        registry.dispatch_update(Some("42"));
        registry.dispatch_update(None);
        assert_eq!(*seen.lock(), vec![Some("42".to_string()), None]);

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.dispatch_update(Some("42"));
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn panicking_callback_does_not_block_others() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));

        registry.on_update(|_| panic!("subscriber bug"));
        let c1 = Arc::clone(&counter);
        registry.on_update(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = Arc::clone(&counter);
        registry.on_update(move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch_update(None);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let registry = Arc::new(CallbackRegistry::new());
        let slot = Arc::new(Mutex::new(None::<SubscriptionId>));

        let reg = Arc::clone(&registry);
        let own = Arc::clone(&slot);
        let id = registry.on_update(move |_| {
            if let Some(id) = *own.lock() {
                reg.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);

        registry.dispatch_update(None);
        assert!(registry.is_empty());
    }

    #[test]
    fn connection_callbacks() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        registry.on_connection_changed(move |state| sink.lock().push(*state));
        registry.dispatch_connection(&ConnectionState::Connecting);
        registry.dispatch_connection(&ConnectionState::Connected);

        assert_eq!(
            *seen.lock(),
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );
    }

    #[test]
    fn clear_removes_everything() {
        let registry = CallbackRegistry::new();
        registry.on_update(|_| {});
        registry.on_connection_changed(|_| {});
        assert_eq!(registry.callback_count(), 2);
        registry.clear();
        assert!(registry.is_empty());
    }
}
