// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value codec between wire-level codes and attribute values.
//!
//! All functions here are pure. The numeric protocols (cloud relay and
//! local HTTP API) share the UID catalog in [`catalog`]; the box protocol
//! uses the function tokens in [`ascii`].
//!
//! # Examples
//!
//! ```
//! use intesis_lib::codec::{decode, decode_temperature, encode_fixed_point};
//! use intesis_lib::types::AttributeValue;
//!
//! assert_eq!(decode_temperature(0xFFF6), -1.0);
//! assert_eq!(encode_fixed_point(21.5), 215);
//!
//! let (name, value) = decode(2, 4);
//! assert_eq!(name, "mode");
//! assert_eq!(value, AttributeValue::from("cool"));
//! ```

pub mod ascii;
pub mod catalog;
mod fan_map;

use std::borrow::Cow;

pub use fan_map::{FanMap, FanMapFallback, FanSpeeds, fan_config_for_codes, resolve_fan_map};

use catalog::{ValueTable, uid_entry};

use crate::types::AttributeValue;

/// Raw value meaning "no reading" on every protocol.
pub const NULL_SENTINEL: i64 = 32768;

/// Decodes a 16-bit two's-complement temperature in tenths of a degree.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn decode_temperature(raw: i64) -> f64 {
    let signed = (raw & 0xFFFF) as u16 as i16;
    f64::from(signed) / 10.0
}

/// Decodes an unsigned fixed-point value in tenths.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn decode_fixed_point(raw: i64) -> f64 {
    raw as f64 / 10.0
}

/// Encodes a decimal as tenths, masked to 16 bits.
///
/// Negative values wrap to their two's-complement form.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_fixed_point(value: f64) -> u16 {
    ((value * 10.0).round() as i64 & 0xFFFF) as u16
}

/// Returns the attribute name bound to a UID.
#[must_use]
pub fn attribute_name(uid: u16) -> Cow<'static, str> {
    uid_entry(uid).map_or_else(
        || Cow::Owned(format!("unknown_uid_{uid}")),
        |entry| Cow::Borrowed(entry.name),
    )
}

/// Translates a raw value through the UID's table.
///
/// The null sentinel always decodes to null. Codes missing from a table,
/// and UIDs without one, pass through as integers.
#[must_use]
pub fn resolve_enum(uid: u16, raw: i64) -> AttributeValue {
    if raw == NULL_SENTINEL {
        return AttributeValue::Null;
    }

    let Some(entry) = uid_entry(uid) else {
        return AttributeValue::Integer(raw);
    };

    match entry.values {
        ValueTable::Labels(table) => table
            .iter()
            .find(|(code, _)| *code == raw)
            .map_or(AttributeValue::Integer(raw), |(_, label)| {
                AttributeValue::from(*label)
            }),
        ValueTable::Numbers(table) => table
            .iter()
            .find(|(code, _)| *code == raw)
            .map_or(AttributeValue::Integer(raw), |(_, number)| {
                AttributeValue::Integer(*number)
            }),
        ValueTable::Raw | ValueTable::FanMaps => AttributeValue::Integer(raw),
    }
}

/// Decodes one UID/value pair into the name and value to store.
#[must_use]
pub fn decode(uid: u16, raw: i64) -> (Cow<'static, str>, AttributeValue) {
    (attribute_name(uid), resolve_enum(uid, raw))
}

/// Returns the raw code a UID's label table assigns to `label`.
#[must_use]
pub fn encode_label(uid: u16, label: &str) -> Option<i64> {
    match uid_entry(uid)?.values {
        ValueTable::Labels(table) => table
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(code, _)| *code),
        _ => None,
    }
}

/// Expands a bitmask into the labels of its set bits, in table order.
#[must_use]
pub fn expand_bitmask(mask: i64, bits: &[(i64, &str)]) -> Vec<String> {
    bits.iter()
        .filter(|(bit, _)| mask & bit != 0)
        .map(|(_, label)| (*label).to_string())
        .collect()
}

/// Formats a fault code as `"<remote code>: <description>"`.
#[must_use]
pub fn describe_error(code: i64) -> String {
    match catalog::error_entry(code) {
        Some((remote, desc)) => format!("{remote}: {desc}"),
        None => format!("{code}: Unknown"),
    }
}
