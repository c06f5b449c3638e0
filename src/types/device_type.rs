// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller families.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// The family of controller an adapter talks to.
///
/// The three cloud families share one wire protocol and differ only in the
/// handshake endpoint and the API version they announce.
///
/// # Examples
///
/// ```
/// use intesis_lib::types::DeviceType;
///
/// let kind = DeviceType::Airconwithme;
/// assert!(kind.is_cloud());
/// assert_eq!(kind.api_version(), Some("1.6.2"));
/// assert_eq!(DeviceType::IntesisBox.api_url(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeviceType {
    /// IntesisHome cloud accounts.
    #[default]
    #[serde(rename = "IntesisHome")]
    IntesisHome,
    /// airconwithme cloud accounts.
    #[serde(rename = "airconwithme")]
    Airconwithme,
    /// anywAIR cloud accounts.
    #[serde(rename = "anywair")]
    Anywair,
    /// Local HTTP API of an IntesisHome gateway.
    #[serde(rename = "intesishome_local")]
    IntesisHomeLocal,
    /// IntesisBox ASCII protocol gateway.
    #[serde(rename = "IntesisBox")]
    IntesisBox,
}

impl DeviceType {
    /// Returns the canonical name of the family.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IntesisHome => "IntesisHome",
            Self::Airconwithme => "airconwithme",
            Self::Anywair => "anywair",
            Self::IntesisHomeLocal => "intesishome_local",
            Self::IntesisBox => "IntesisBox",
        }
    }

    /// Returns the handshake endpoint for cloud families.
    #[must_use]
    pub const fn api_url(&self) -> Option<&'static str> {
        match self {
            Self::IntesisHome => Some("https://user.intesishome.com/api.php/get/control"),
            Self::Airconwithme => Some("https://user.airconwithme.com/api.php/get/control"),
            Self::Anywair => Some("https://anywair.intesishome.com/api.php/get/control"),
            Self::IntesisHomeLocal | Self::IntesisBox => None,
        }
    }

    /// Returns the API version announced during the cloud handshake.
    #[must_use]
    pub const fn api_version(&self) -> Option<&'static str> {
        match self {
            Self::IntesisHome => Some("1.2.2"),
            Self::Airconwithme => Some("1.6.2"),
            Self::Anywair => Some("2.9"),
            Self::IntesisHomeLocal | Self::IntesisBox => None,
        }
    }

    /// Returns true for the families served by the cloud relay.
    #[must_use]
    pub const fn is_cloud(&self) -> bool {
        self.api_url().is_some()
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "intesishome" => Ok(Self::IntesisHome),
            "airconwithme" => Ok(Self::Airconwithme),
            "anywair" => Ok(Self::Anywair),
            "intesishome_local" => Ok(Self::IntesisHomeLocal),
            "intesisbox" => Ok(Self::IntesisBox),
            _ => Err(ValueError::UnknownLabel {
                attribute: "device_type".to_string(),
                label: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_endpoints() {
        assert_eq!(
            DeviceType::Anywair.api_url(),
            Some("https://anywair.intesishome.com/api.php/get/control")
        );
        assert_eq!(DeviceType::IntesisHome.api_version(), Some("1.2.2"));
        assert!(!DeviceType::IntesisHomeLocal.is_cloud());
    }

    #[test]
    fn parse_round_trips_display() {
        for kind in [
            DeviceType::IntesisHome,
            DeviceType::Airconwithme,
            DeviceType::Anywair,
            DeviceType::IntesisHomeLocal,
            DeviceType::IntesisBox,
        ] {
            assert_eq!(kind.to_string().parse::<DeviceType>().unwrap(), kind);
        }
    }
}
