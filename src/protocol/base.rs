// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State shared by every adapter.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;

use crate::codec::FanMapFallback;
use crate::connection::{ConnectionTracker, TaskSupervisor};
use crate::event::Notifier;
use crate::state::DeviceTable;
use crate::types::{AttributeValue, DeviceType};

#[derive(Debug, Default)]
struct Identity {
    controller_id: Option<String>,
    name: Option<String>,
}

/// Device table, notifier, connection state and tasks of one adapter.
#[derive(Debug)]
pub struct AdapterCore {
    device_type: DeviceType,
    devices: DeviceTable,
    notifier: Notifier,
    connection: ConnectionTracker,
    tasks: TaskSupervisor,
    fan_fallback: FanMapFallback,
    identity: Mutex<Identity>,
    last_message: Mutex<Option<DateTime<Utc>>>,
}

impl AdapterCore {
    pub(crate) fn new(device_type: DeviceType, fan_fallback: FanMapFallback) -> Self {
        let notifier = Notifier::new();
        Self {
            device_type,
            devices: DeviceTable::new(),
            connection: ConnectionTracker::new(notifier.clone()),
            notifier,
            tasks: TaskSupervisor::new(),
            fan_fallback,
            identity: Mutex::new(Identity::default()),
            last_message: Mutex::new(None),
        }
    }

    /// Returns the device type served by the adapter.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Returns the device-state table.
    #[must_use]
    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    /// Returns the notification fan-out.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Returns the connection state machine.
    #[must_use]
    pub fn connection(&self) -> &ConnectionTracker {
        &self.connection
    }

    /// Returns the fan table fallback used for numeric units.
    #[must_use]
    pub fn fan_fallback(&self) -> FanMapFallback {
        self.fan_fallback
    }

    pub(crate) fn tasks(&self) -> &TaskSupervisor {
        &self.tasks
    }

    /// Returns the account or unit identifier, lowercased.
    #[must_use]
    pub fn controller_id(&self) -> Option<String> {
        self.identity
            .lock()
            .controller_id
            .as_deref()
            .map(str::to_lowercase)
    }

    /// Returns the display name of the controller.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.identity.lock().name.clone()
    }

    pub(crate) fn set_identity(&self, controller_id: impl Into<String>, name: impl Into<String>) {
        let mut identity = self.identity.lock();
        identity.controller_id = Some(controller_id.into());
        identity.name = Some(name.into());
    }

    /// Returns when the last frame arrived on the transport.
    #[must_use]
    pub fn last_message_received(&self) -> Option<DateTime<Utc>> {
        *self.last_message.lock()
    }

    pub(crate) fn touch(&self) {
        *self.last_message.lock() = Some(Utc::now());
    }

    /// Returns how long the transport has been silent.
    pub(crate) fn silent_for(&self) -> Duration {
        self.last_message_received()
            .and_then(|at| (Utc::now() - at).to_std().ok())
            .unwrap_or_default()
    }

    pub(crate) fn notify(&self, device_id: Option<&str>) {
        self.notifier.notify(device_id);
    }

    /// Handles transport loss from inside a background task.
    ///
    /// Cancels the sibling tasks and, if the adapter was not already
    /// disconnected, fires one global notification.
    pub(crate) fn connection_lost(&self, reason: &str) {
        tracing::error!(device_type = %self.device_type, reason, "Lost connection");
        self.connection.set_error(reason);
        self.tasks.cancel();
        if self.connection.mark_disconnected() {
            self.notify(None);
        }
    }

    /// Stops every task and returns to `Disconnected`.
    pub(crate) async fn teardown(&self) {
        self.tasks.shutdown().await;
        if self.connection.mark_disconnected() {
            self.notify(None);
        }
    }
}

/// Converts a JSON identifier (number or string) to the device key.
pub(crate) fn json_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders a device key back into JSON, numeric when it parses as one.
pub(crate) fn device_id_json(device_id: &str) -> Value {
    device_id
        .parse::<i64>()
        .map_or_else(|_| Value::from(device_id), Value::from)
}

/// Converts a scalar or list JSON value to an attribute value.
pub(crate) fn json_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null | Value::Object(_) => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => n.as_i64().map_or_else(
            || n.as_f64().map_or(AttributeValue::Null, AttributeValue::Decimal),
            AttributeValue::Integer,
        ),
        Value::String(s) => AttributeValue::Text(s.clone()),
        Value::Array(items) => AttributeValue::List(items.iter().map(json_id).collect()),
    }
}
