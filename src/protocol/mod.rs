// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol adapters for Intesis gateways.
//!
//! Three transports implement one [`Protocol`] contract and converge on the
//! same [`DeviceTable`](crate::state::DeviceTable):
//!
//! - [`CloudAdapter`]: HTTP handshake, then a persistent TCP/JSON relay
//! - [`LocalAdapter`]: session-based HTTP/JSON against the unit's `api.cgi`
//! - [`BoxAdapter`]: ASCII command lines over TCP port 3310
//!
//! The [`Adapter`] enum selects one of them at construction time.

mod base;
mod cloud;
mod framing;
mod intesisbox;
mod local;

use std::fmt;

pub use base::AdapterCore;
pub use cloud::CloudAdapter;
pub use intesisbox::BoxAdapter;
pub use local::{Datapoint, DatapointDescriptor, LocalAdapter};

use crate::codec::catalog::{CONFIG_MODE_BITS, OPERATING_MODE_BITS};
use crate::codec::{FanSpeeds, decode_temperature, expand_bitmask, resolve_fan_map};
use crate::command::Dialect;
use crate::config::ControllerConfig;
use crate::error::Result;
use crate::types::AttributeValue;

/// A command in the encoding of one protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireCommand {
    /// UID/value pair of the numeric protocols.
    Datapoint {
        /// Attribute UID.
        uid: u16,
        /// Raw 16-bit value.
        value: u16,
    },
    /// Function token and literal value of the box protocol.
    Function {
        /// Function token, e.g. `ONOFF`.
        function: &'static str,
        /// Literal value, e.g. `OFF`.
        value: String,
    },
}

impl fmt::Display for WireCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Datapoint { uid, value } => write!(f, "{uid}={value}"),
            Self::Function { function, value } => write!(f, "{function},{value}"),
        }
    }
}

/// The contract shared by the three transports.
///
/// Capability queries have defaults that read the device table; adapters
/// whose units describe themselves differently override them.
#[allow(async_fn_in_trait)]
pub trait Protocol {
    /// Returns the shared adapter state.
    fn core(&self) -> &AdapterCore;

    /// Returns the wire encoding family.
    fn dialect(&self) -> Dialect;

    /// Opens the transport and starts the background tasks.
    ///
    /// A no-op while already connected or connecting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`](crate::Error::Authentication) for
    /// rejected credentials, or a connection or protocol error.
    async fn connect(&self) -> Result<()>;

    /// Cancels the background tasks and closes the transport.
    ///
    /// Idempotent.
    async fn stop(&self);

    /// Refreshes the full state.
    ///
    /// The cloud adapter returns the one-time relay token it obtained.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh request fails.
    async fn poll_status(&self, notify: bool) -> Result<Option<String>>;

    /// Sends an encoded command to a device.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is closed or the unit rejects it.
    async fn send_command(&self, device_id: &str, command: &WireCommand) -> Result<()>;

    /// Returns the selectable modes of a device.
    fn mode_list(&self, device_id: &str) -> Option<Vec<String>> {
        let devices = self.core().devices();
        let (mask, bits) = match devices.attribute(device_id, "config_operating_mode") {
            Some(value) => (value, OPERATING_MODE_BITS),
            None => (devices.attribute(device_id, "config_mode_map")?, CONFIG_MODE_BITS),
        };
        Some(expand_bitmask(mask.as_i64()?, bits))
    }

    /// Returns the fan speeds of a device.
    fn fan_speeds(&self, device_id: &str) -> Option<FanSpeeds> {
        match self.core().devices().attribute(device_id, "config_fan_map")? {
            AttributeValue::List(labels) => Some(FanSpeeds::Labels(labels)),
            value => {
                let config = u16::try_from(value.as_i64()?).ok()?;
                resolve_fan_map(config, self.core().fan_fallback()).map(FanSpeeds::Coded)
            }
        }
    }

    /// Returns true if the vertical vane can swing.
    fn has_vertical_swing(&self, device_id: &str) -> bool {
        has_swing(self.core(), device_id, "vvane_list", "config_vertical_vanes")
    }

    /// Returns true if the horizontal vane can swing.
    fn has_horizontal_swing(&self, device_id: &str) -> bool {
        has_swing(self.core(), device_id, "hvane_list", "config_horizontal_vanes")
    }

    /// Decodes the raw outdoor temperature.
    fn decode_outdoor_temperature(&self, raw: i64) -> f64 {
        decode_temperature(raw)
    }
}

fn has_swing(core: &AdapterCore, device_id: &str, list: &str, config: &str) -> bool {
    let devices = core.devices();
    let listed = devices
        .attribute(device_id, list)
        .is_some_and(|v| v.as_list().is_some());
    let configured = devices
        .attribute(device_id, config)
        .and_then(|v| v.as_i64())
        .is_some_and(|bits| bits > 1024);
    listed || configured
}

/// One of the three adapters, selected by configuration.
#[derive(Debug, Clone)]
pub enum Adapter {
    /// Cloud relay.
    Cloud(CloudAdapter),
    /// Local HTTP API.
    Local(LocalAdapter),
    /// IntesisBox ASCII protocol.
    Box(BoxAdapter),
}

impl Adapter {
    /// Builds the adapter for a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created or the cloud
    /// device type has no endpoint.
    pub fn from_config(config: ControllerConfig) -> Result<Self> {
        Ok(match config {
            ControllerConfig::Cloud(config) => Self::Cloud(CloudAdapter::new(config)?),
            ControllerConfig::Local(config) => Self::Local(LocalAdapter::new(config)?),
            ControllerConfig::Box(config) => Self::Box(BoxAdapter::new(config)),
        })
    }
}

impl Protocol for Adapter {
    fn core(&self) -> &AdapterCore {
        match self {
            Self::Cloud(adapter) => adapter.core(),
            Self::Local(adapter) => adapter.core(),
            Self::Box(adapter) => adapter.core(),
        }
    }

    fn dialect(&self) -> Dialect {
        match self {
            Self::Cloud(adapter) => adapter.dialect(),
            Self::Local(adapter) => adapter.dialect(),
            Self::Box(adapter) => adapter.dialect(),
        }
    }

    async fn connect(&self) -> Result<()> {
        match self {
            Self::Cloud(adapter) => adapter.connect().await,
            Self::Local(adapter) => adapter.connect().await,
            Self::Box(adapter) => adapter.connect().await,
        }
    }

    async fn stop(&self) {
        match self {
            Self::Cloud(adapter) => adapter.stop().await,
            Self::Local(adapter) => adapter.stop().await,
            Self::Box(adapter) => adapter.stop().await,
        }
    }

    async fn poll_status(&self, notify: bool) -> Result<Option<String>> {
        match self {
            Self::Cloud(adapter) => adapter.poll_status(notify).await,
            Self::Local(adapter) => adapter.poll_status(notify).await,
            Self::Box(adapter) => adapter.poll_status(notify).await,
        }
    }

    async fn send_command(&self, device_id: &str, command: &WireCommand) -> Result<()> {
        match self {
            Self::Cloud(adapter) => adapter.send_command(device_id, command).await,
            Self::Local(adapter) => adapter.send_command(device_id, command).await,
            Self::Box(adapter) => adapter.send_command(device_id, command).await,
        }
    }

    fn mode_list(&self, device_id: &str) -> Option<Vec<String>> {
        match self {
            Self::Cloud(adapter) => adapter.mode_list(device_id),
            Self::Local(adapter) => adapter.mode_list(device_id),
            Self::Box(adapter) => adapter.mode_list(device_id),
        }
    }

    fn fan_speeds(&self, device_id: &str) -> Option<FanSpeeds> {
        match self {
            Self::Cloud(adapter) => adapter.fan_speeds(device_id),
            Self::Local(adapter) => adapter.fan_speeds(device_id),
            Self::Box(adapter) => adapter.fan_speeds(device_id),
        }
    }

    fn has_vertical_swing(&self, device_id: &str) -> bool {
        match self {
            Self::Cloud(adapter) => adapter.has_vertical_swing(device_id),
            Self::Local(adapter) => adapter.has_vertical_swing(device_id),
            Self::Box(adapter) => adapter.has_vertical_swing(device_id),
        }
    }

    fn has_horizontal_swing(&self, device_id: &str) -> bool {
        match self {
            Self::Cloud(adapter) => adapter.has_horizontal_swing(device_id),
            Self::Local(adapter) => adapter.has_horizontal_swing(device_id),
            Self::Box(adapter) => adapter.has_horizontal_swing(device_id),
        }
    }

    fn decode_outdoor_temperature(&self, raw: i64) -> f64 {
        match self {
            Self::Cloud(adapter) => adapter.decode_outdoor_temperature(raw),
            Self::Local(adapter) => adapter.decode_outdoor_temperature(raw),
            Self::Box(adapter) => adapter.decode_outdoor_temperature(raw),
        }
    }
}
