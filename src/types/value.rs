// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute values stored in the device state table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single attribute value.
///
/// Presence of an attribute is tracked by the map that holds it; a present
/// attribute holding [`AttributeValue::Null`] means the unit supports the
/// attribute but currently has no reading for it.
///
/// # Examples
///
/// ```
/// use intesis_lib::types::AttributeValue;
///
/// let value = AttributeValue::from("cool");
/// assert_eq!(value.as_str(), Some("cool"));
///
/// let raw = AttributeValue::Integer(210);
/// assert_eq!(raw.as_i64(), Some(210));
/// assert!(AttributeValue::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Transient or missing reading.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Raw integer, including fixed-point values stored ×10.
    Integer(i64),
    /// Decimal value.
    Decimal(f64),
    /// Enumerated label or free text.
    Text(String),
    /// List of labels.
    List(Vec<String>),
}

impl AttributeValue {
    /// Returns true for [`AttributeValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the text content, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an integer.
    ///
    /// Text holding a decimal integer is accepted, since the box protocol
    /// reports every value as text.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Decimal(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the labels, if this is a list value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_integers_are_numeric() {
        let value = AttributeValue::from("210");
        assert_eq!(value.as_i64(), Some(210));
        assert_eq!(value.as_f64(), Some(210.0));
        assert_eq!(AttributeValue::from("auto").as_i64(), None);
    }

    #[test]
    fn option_conversion() {
        assert!(AttributeValue::from(None::<i64>).is_null());
        assert_eq!(AttributeValue::from(Some(5_i64)), AttributeValue::Integer(5));
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&AttributeValue::List(vec![
            "auto".to_string(),
            "swing".to_string(),
        ]))
        .unwrap();
        assert_eq!(json, r#"["auto","swing"]"#);
        assert_eq!(serde_json::to_string(&AttributeValue::Null).unwrap(), "null");
    }

    #[test]
    fn display_list() {
        let value = AttributeValue::List(vec!["low".to_string(), "high".to_string()]);
        assert_eq!(value.to_string(), "[low, high]");
    }
}
