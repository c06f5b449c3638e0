// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared device-state table.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::DeviceAttributes;
use crate::codec;
use crate::types::AttributeValue;

/// Mapping from device id to its attributes.
///
/// Cloning the table is cheap and yields a handle to the same storage.
/// Reads are open to every holder; writes are crate-internal so that all
/// numeric updates go through the codec.
///
/// # Examples
///
/// ```
/// use intesis_lib::state::DeviceTable;
///
/// let table = DeviceTable::new();
/// assert!(table.is_empty());
/// assert!(table.get("123").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeviceTable {
    devices: Arc<RwLock<BTreeMap<String, DeviceAttributes>>>,
}

impl DeviceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every device.
    #[must_use]
    pub fn all(&self) -> BTreeMap<String, DeviceAttributes> {
        self.devices.read().clone()
    }

    /// Returns a snapshot of one device.
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<DeviceAttributes> {
        self.devices.read().get(device_id).cloned()
    }

    /// Returns one attribute of one device.
    #[must_use]
    pub fn attribute(&self, device_id: &str, name: &str) -> Option<AttributeValue> {
        self.devices
            .read()
            .get(device_id)
            .and_then(|attrs| attrs.get(name).cloned())
    }

    /// Returns true if the device is known.
    #[must_use]
    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.read().contains_key(device_id)
    }

    /// Returns the known device ids in order.
    #[must_use]
    pub fn device_ids(&self) -> Vec<String> {
        self.devices.read().keys().cloned().collect()
    }

    /// Returns the number of devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Returns true when no device is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Decodes a raw UID value and stores it under its canonical name.
    ///
    /// Returns true if the stored value changed.
    pub(crate) fn set_attribute(&self, device_id: &str, uid: u16, raw: i64) -> bool {
        let (name, value) = codec::decode(uid, raw);
        tracing::trace!(device_id, uid, raw, name = %name, "Storing datapoint");
        self.set_named(device_id, name.into_owned(), value)
    }

    /// Stores an already decoded value.
    ///
    /// Used for values that carry no UID (box functions, identity fields).
    pub(crate) fn set_named(
        &self,
        device_id: &str,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> bool {
        self.devices
            .write()
            .entry(device_id.to_string())
            .or_default()
            .insert(name.into(), value)
    }

    /// Creates the device with `seed` unless it already exists.
    ///
    /// Returns true if the device was created.
    pub(crate) fn ensure_device<I>(&self, device_id: &str, seed: I) -> bool
    where
        I: IntoIterator<Item = (String, AttributeValue)>,
    {
        let mut devices = self.devices.write();
        if devices.contains_key(device_id) {
            return false;
        }
        devices.insert(device_id.to_string(), seed.into_iter().collect());
        true
    }

    /// Overwrites the given attributes, creating the device if needed.
    pub(crate) fn merge<I>(&self, device_id: &str, values: I)
    where
        I: IntoIterator<Item = (String, AttributeValue)>,
    {
        let mut devices = self.devices.write();
        let attrs = devices.entry(device_id.to_string()).or_default();
        for (name, value) in values {
            attrs.insert(name, value);
        }
    }

    /// Drops every device.
    pub(crate) fn clear(&self) {
        self.devices.write().clear();
    }
}
