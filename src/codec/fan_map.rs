// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan-speed map resolution.
//!
//! Units report which fan speeds they support as a bitmask (cloud, uid 67)
//! or as a list of speed codes (local datapoint 4). Either form selects one
//! of the fixed [`FAN_MAPS`](super::catalog::FAN_MAPS) tables. Box units
//! report their speeds as plain labels instead.

use serde::{Deserialize, Serialize};

use super::catalog::FAN_MAPS;
use crate::types::AttributeValue;

/// What to do when no fan table matches the reported configuration exactly.
///
/// # Examples
///
/// ```
/// use intesis_lib::codec::{resolve_fan_map, FanMapFallback};
///
/// // 0b1_1110 selects the "quiet..high" table directly
/// let map = resolve_fan_map(30, FanMapFallback::default()).unwrap();
/// assert_eq!(map.label(1), Some("quiet"));
///
/// // 0b1010 has no table; the closest superset is 14 (low/medium/high)
/// let map = resolve_fan_map(10, FanMapFallback::ClosestSuperset).unwrap();
/// assert_eq!(map.config(), 14);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanMapFallback {
    /// Use the table whose key set contains the configuration with the
    /// fewest extra speeds.
    ClosestSuperset,
    /// Use a fixed table.
    Default(u16),
}

impl Default for FanMapFallback {
    fn default() -> Self {
        Self::Default(63)
    }
}

/// A resolved numeric fan-speed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanMap {
    config: u16,
    entries: &'static [(i64, &'static str)],
}

impl FanMap {
    /// Returns the configuration value that selects this table.
    #[must_use]
    pub fn config(&self) -> u16 {
        self.config
    }

    /// Returns the label for a speed code.
    #[must_use]
    pub fn label(&self, code: i64) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
    }

    /// Returns the speed code for a label.
    #[must_use]
    pub fn code(&self, label: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(code, _)| *code)
    }

    /// Returns the labels in code order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(_, l)| (*l).to_string()).collect()
    }
}

/// Resolves a fan configuration bitmask to its table.
///
/// Returns `None` when neither an exact match nor the fallback applies.
#[must_use]
pub fn resolve_fan_map(config: u16, fallback: FanMapFallback) -> Option<FanMap> {
    let table = |key: u16| {
        FAN_MAPS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(k, entries)| FanMap {
                config: *k,
                entries: *entries,
            })
    };

    if let Some(map) = table(config) {
        return Some(map);
    }

    match fallback {
        FanMapFallback::Default(key) => table(key),
        FanMapFallback::ClosestSuperset => FAN_MAPS
            .iter()
            .filter(|(key, _)| key & config == config)
            .min_by_key(|(key, _)| ((key & !config).count_ones(), *key))
            .map(|(key, entries)| FanMap {
                config: *key,
                entries: *entries,
            }),
    }
}

/// Builds the configuration bitmask for a list of supported speed codes.
///
/// Codes outside `0..16` are ignored.
#[must_use]
pub fn fan_config_for_codes(codes: &[i64]) -> u16 {
    codes
        .iter()
        .filter_map(|code| u32::try_from(*code).ok())
        .filter(|code| *code < 16)
        .fold(0, |acc, code| acc | (1 << code))
}

/// Fan speeds supported by a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanSpeeds {
    /// Numeric codes translated through a fan table.
    Coded(FanMap),
    /// Labels used verbatim on the wire (box units).
    Labels(Vec<String>),
}

impl FanSpeeds {
    /// Returns the selectable labels.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        match self {
            Self::Coded(map) => map.labels(),
            Self::Labels(labels) => labels.clone(),
        }
    }

    /// Translates a stored `fan_speed` value into its label.
    ///
    /// Codes missing from the table come back as their decimal text.
    #[must_use]
    pub fn label_for(&self, value: &AttributeValue) -> Option<String> {
        match (self, value) {
            (_, AttributeValue::Null) => None,
            (_, AttributeValue::Text(text)) => Some(text.clone()),
            (Self::Coded(map), other) => {
                let code = other.as_i64()?;
                Some(
                    map.label(code)
                        .map_or_else(|| code.to_string(), str::to_string),
                )
            }
            (Self::Labels(_), other) => Some(other.to_string()),
        }
    }
}
