// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Function tokens of the IntesisBox ASCII protocol.

use crate::types::AttributeValue;

/// On/off function.
pub const FN_ONOFF: &str = "ONOFF";
/// Operating mode function.
pub const FN_MODE: &str = "MODE";
/// Setpoint function (×10).
pub const FN_SETPOINT: &str = "SETPTEMP";
/// Fan speed function.
pub const FN_FANSP: &str = "FANSP";
/// Vertical vane function.
pub const FN_VANEUD: &str = "VANEUD";
/// Horizontal vane function.
pub const FN_VANELR: &str = "VANELR";
/// Ambient temperature function (×10).
pub const FN_AMBTEMP: &str = "AMBTEMP";
/// Error status function.
pub const FN_ERRSTATUS: &str = "ERRSTATUS";
/// Error code function.
pub const FN_ERRCODE: &str = "ERRCODE";

/// Function token to canonical attribute name.
pub static BOX_FUNCTIONS: &[(&str, &str)] = &[
    (FN_ONOFF, "power"),
    (FN_MODE, "mode"),
    (FN_SETPOINT, "setpoint"),
    (FN_FANSP, "fan_speed"),
    (FN_VANEUD, "vvane"),
    (FN_VANELR, "hvane"),
    (FN_AMBTEMP, "temperature"),
    (FN_ERRSTATUS, "error_status"),
    (FN_ERRCODE, "error_code"),
];

/// Modes accepted by `SET,1:MODE`, as stored label and wire token.
pub static BOX_MODES: &[(&str, &str)] = &[
    ("auto", "AUTO"),
    ("heat", "HEAT"),
    ("dry", "DRY"),
    ("fan", "FAN"),
    ("cool", "COOL"),
];

/// Requests sent, in order, right after the socket opens.
pub static BOX_INIT_COMMANDS: &[&str] = &[
    "ID",
    "LIMITS:SETPTEMP",
    "LIMITS:FANSP",
    "LIMITS:MODE",
    "LIMITS:VANEUD",
    "LIMITS:VANELR",
    "GET,1:ONOFF",
    "GET,1:MODE",
    "GET,1:AMBTEMP",
    "GET,1:SETPTEMP",
];

/// Request polled by the keepalive task.
pub const BOX_KEEPALIVE_COMMAND: &str = "GET,1:AMBTEMP";

/// Request returning every function of unit 1.
pub const BOX_GET_ALL_COMMAND: &str = "GET,1:*";

/// Returns the attribute name for a function token.
///
/// Unknown functions map to their lowercased token.
#[must_use]
pub fn box_attribute_name(function: &str) -> String {
    BOX_FUNCTIONS
        .iter()
        .find(|(token, _)| *token == function)
        .map_or_else(|| function.to_ascii_lowercase(), |(_, name)| (*name).to_string())
}

/// Decodes a `CHN` value for a function.
///
/// Temperatures stay numeric; everything else is stored as a lowercase label.
#[must_use]
pub fn decode_box_value(function: &str, value: &str) -> AttributeValue {
    let value = value.trim();
    if value.parse::<i64>() == Ok(super::NULL_SENTINEL) {
        return AttributeValue::Null;
    }
    if function == FN_SETPOINT || function == FN_AMBTEMP {
        if let Ok(number) = value.parse::<i64>() {
            return AttributeValue::Integer(number);
        }
    }
    AttributeValue::Text(value.to_ascii_lowercase())
}

/// Returns the wire token for a mode label.
#[must_use]
pub fn box_mode_token(label: &str) -> Option<&'static str> {
    BOX_MODES
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, token)| *token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_names() {
        assert_eq!(box_attribute_name("VANELR"), "hvane");
        assert_eq!(box_attribute_name("ERRCODE"), "error_code");
        assert_eq!(box_attribute_name("FILTER"), "filter");
    }

    #[test]
    fn values_are_lowercased_or_numeric() {
        assert_eq!(decode_box_value("ONOFF", "ON"), AttributeValue::from("on"));
        assert_eq!(decode_box_value("SETPTEMP", "210"), AttributeValue::Integer(210));
        assert_eq!(decode_box_value("AMBTEMP", "-15"), AttributeValue::Integer(-15));
        assert_eq!(decode_box_value("FANSP", "2"), AttributeValue::from("2"));
        assert_eq!(decode_box_value("AMBTEMP", "32768"), AttributeValue::Null);
        assert_eq!(decode_box_value("ERRCODE", ""), AttributeValue::from(""));
    }

    #[test]
    fn mode_tokens() {
        assert_eq!(box_mode_token("cool"), Some("COOL"));
        assert_eq!(box_mode_token("heat+tank"), None);
    }
}
