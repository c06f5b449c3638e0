// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device attribute map.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::AttributeValue;

/// The attributes of one device, keyed by canonical name.
///
/// An absent key means the unit does not support the attribute. A key
/// holding [`AttributeValue::Null`] means the unit supports it but has no
/// current reading.
///
/// # Examples
///
/// ```
/// use intesis_lib::state::DeviceAttributes;
/// use intesis_lib::types::AttributeValue;
///
/// let attrs = DeviceAttributes::from_iter([
///     ("name".to_string(), AttributeValue::from("Living room")),
///     ("setpoint".to_string(), AttributeValue::Null),
/// ]);
///
/// assert!(attrs.contains("setpoint"));
/// assert!(!attrs.contains("vvane"));
/// assert_eq!(attrs.get("name").and_then(AttributeValue::as_str), Some("Living room"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeviceAttributes {
    values: BTreeMap<String, AttributeValue>,
}

impl DeviceAttributes {
    /// Creates an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    /// Returns true when the unit reports `name`, even as null.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no attribute is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Stores a value and reports whether it differs from the previous one.
    pub(crate) fn insert(&mut self, name: String, value: AttributeValue) -> bool {
        self.values.insert(name, value.clone()).as_ref() != Some(&value)
    }
}

impl FromIterator<(String, AttributeValue)> for DeviceAttributes {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DeviceAttributes {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_changes() {
        let mut attrs = DeviceAttributes::new();
        assert!(attrs.insert("power".to_string(), AttributeValue::from("on")));
        assert!(!attrs.insert("power".to_string(), AttributeValue::from("on")));
        assert!(attrs.insert("power".to_string(), AttributeValue::from("off")));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn null_is_present() {
        let mut attrs = DeviceAttributes::new();
        attrs.insert("setpoint".to_string(), AttributeValue::Null);
        assert!(attrs.contains("setpoint"));
        assert!(attrs.get("setpoint").unwrap().is_null());
    }

    #[test]
    fn serializes_as_flat_object() {
        let attrs = DeviceAttributes::from_iter([
            ("mode".to_string(), AttributeValue::from("cool")),
            ("setpoint".to_string(), AttributeValue::Integer(210)),
        ]);
        assert_eq!(
            serde_json::to_string(&attrs).unwrap(),
            r#"{"mode":"cool","setpoint":210}"#
        );
    }
}
