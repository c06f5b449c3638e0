// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Semantic commands and their translation to wire commands.
//!
//! A [`Command`] says what to change ("mode to cool"). [`Command::translate`]
//! turns it into the [`WireCommand`] of the active [`Dialect`]: a UID/value
//! pair on the numeric protocols, or a function token and literal value on
//! the box.
//!
//! # Examples
//!
//! ```
//! use intesis_lib::command::{Command, Dialect};
//! use intesis_lib::protocol::WireCommand;
//! use intesis_lib::types::PowerState;
//!
//! let wire = Command::Power(PowerState::On)
//!     .translate(Dialect::Numeric, None, None)
//!     .unwrap();
//! assert_eq!(wire, WireCommand::Datapoint { uid: 1, value: 1 });
//!
//! let wire = Command::Setpoint(21.5)
//!     .translate(Dialect::Ascii, None, None)
//!     .unwrap();
//! assert_eq!(wire.to_string(), "SETPTEMP,215");
//! ```

use crate::codec::ascii::{FN_FANSP, FN_MODE, FN_ONOFF, FN_SETPOINT, FN_VANELR, FN_VANEUD, box_mode_token};
use crate::codec::catalog::command_spec;
use crate::codec::{FanSpeeds, encode_fixed_point};
use crate::error::{Error, Result, ValueError};
use crate::protocol::WireCommand;
use crate::state::DeviceAttributes;
use crate::types::PowerState;

/// Wire encoding family of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// UID/value pairs (cloud relay and local API).
    Numeric,
    /// Function tokens and literal values (IntesisBox).
    Ascii,
}

/// A change requested by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Turn the unit on or off.
    Power(PowerState),
    /// Operating mode label (`auto`, `heat`, `dry`, `fan`, `cool`, ...).
    Mode(String),
    /// Target temperature in degrees.
    Setpoint(f64),
    /// Fan speed label.
    FanSpeed(String),
    /// Vertical vane position.
    VerticalVane(String),
    /// Horizontal vane position.
    HorizontalVane(String),
    /// Climate working mode (`comfort`, `eco`, `powerful`).
    Preset(String),
    /// Heat-pump operating mode (`heat+tank`, `cool`, ...).
    OperatingMode(String),
    /// Tank working mode.
    TankMode(String),
    /// Quiet mode.
    Quiet(bool),
    /// Tank water setpoint in degrees.
    TankSetpoint(f64),
    /// One of the range-limited heat-pump settings, in degrees.
    ThermoShift {
        /// Setting name, e.g. `thermoshift_heat_eco`.
        name: String,
        /// New value.
        value: f64,
    },
    /// Lock or unlock the remote controller.
    RemoteControlBlock(bool),
    /// Clear the current fault.
    ResetError,
    /// Ask the gateway to resynchronise with the unit.
    Resync,
}

impl Command {
    /// Returns a short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Power(_) => "power",
            Self::Mode(_) => "mode",
            Self::Setpoint(_) => "setpoint",
            Self::FanSpeed(_) => "fan_speed",
            Self::VerticalVane(_) => "vvane",
            Self::HorizontalVane(_) => "hvane",
            Self::Preset(_) => "climate_working_mode",
            Self::OperatingMode(_) => "operating_mode",
            Self::TankMode(_) => "tank",
            Self::Quiet(_) => "quiet",
            Self::TankSetpoint(_) => "tank_setpoint_temperature",
            Self::ThermoShift { .. } => "thermo_shift",
            Self::RemoteControlBlock(_) => "remote_control_block",
            Self::ResetError => "reset_error",
            Self::Resync => "resync",
        }
    }

    /// Translates the command for `dialect`.
    ///
    /// `device` is the target's current attributes, used to pick between
    /// `mode` and `operating_mode`. `fan` is the unit's fan-speed table.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::UnknownLabel`] for labels without an encoding,
    /// [`ValueError::OutOfRange`] for thermo shifts outside their range and
    /// [`Error::Unsupported`] for commands the box cannot express.
    pub fn translate(
        &self,
        dialect: Dialect,
        device: Option<&DeviceAttributes>,
        fan: Option<&FanSpeeds>,
    ) -> Result<WireCommand> {
        match dialect {
            Dialect::Numeric => self.translate_numeric(device, fan),
            Dialect::Ascii => self.translate_ascii(fan),
        }
    }

    fn translate_numeric(
        &self,
        device: Option<&DeviceAttributes>,
        fan: Option<&FanSpeeds>,
    ) -> Result<WireCommand> {
        match self {
            Self::Power(state) => labelled("power", state.as_str()),
            Self::Mode(label) => {
                // Heat pumps expose only operating_mode
                let control = match device {
                    Some(attrs) if !attrs.contains("mode") => "operating_mode",
                    _ => "mode",
                };
                labelled(control, label)
            }
            Self::Setpoint(value) => scaled("setpoint", *value),
            Self::FanSpeed(label) => {
                let code = match fan {
                    Some(FanSpeeds::Coded(map)) => map.code(label),
                    _ => None,
                }
                .ok_or_else(|| unknown("fan_speed", label))?;
                datapoint("fan_speed", code)
            }
            Self::VerticalVane(label) => labelled("vvane", label),
            Self::HorizontalVane(label) => labelled("hvane", label),
            Self::Preset(label) => labelled("climate_working_mode", label),
            Self::OperatingMode(label) => labelled("operating_mode", label),
            Self::TankMode(label) => labelled("tank", label),
            Self::Quiet(on) => labelled("quiet", on_off(*on)),
            Self::TankSetpoint(value) => scaled("tank_setpoint_temperature", *value),
            Self::ThermoShift { name, value } => thermo_shift(name, *value),
            Self::RemoteControlBlock(on) => labelled("remote_control_block", on_off(*on)),
            Self::ResetError => labelled("reset_error", "on"),
            Self::Resync => labelled("resync", "on"),
        }
    }

    fn translate_ascii(&self, fan: Option<&FanSpeeds>) -> Result<WireCommand> {
        let (function, value) = match self {
            Self::Power(state) => (FN_ONOFF, state.box_token().to_string()),
            Self::Mode(label) => {
                let token = box_mode_token(label).ok_or_else(|| unknown("mode", label))?;
                (FN_MODE, token.to_string())
            }
            Self::Setpoint(value) => (FN_SETPOINT, encode_fixed_point(*value).to_string()),
            Self::FanSpeed(label) => {
                if let Some(FanSpeeds::Labels(labels)) = fan {
                    if !labels.iter().any(|l| l.eq_ignore_ascii_case(label)) {
                        return Err(unknown("fan_speed", label).into());
                    }
                }
                (FN_FANSP, label.to_ascii_uppercase())
            }
            Self::VerticalVane(label) => (FN_VANEUD, label.to_ascii_uppercase()),
            Self::HorizontalVane(label) => (FN_VANELR, label.to_ascii_uppercase()),
            other => return Err(Error::Unsupported(format!("{} on IntesisBox", other.name()))),
        };
        Ok(WireCommand::Function { function, value })
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn unknown(attribute: &str, label: &str) -> ValueError {
    ValueError::UnknownLabel {
        attribute: attribute.to_string(),
        label: label.to_string(),
    }
}

fn spec_uid(name: &str) -> Result<u16> {
    command_spec(name)
        .map(|spec| spec.uid)
        .ok_or_else(|| Error::Unsupported(name.to_string()))
}

fn datapoint(name: &str, code: i64) -> Result<WireCommand> {
    let uid = spec_uid(name)?;
    let value = u16::try_from(code).map_err(|_| unknown(name, &code.to_string()))?;
    Ok(WireCommand::Datapoint { uid, value })
}

fn labelled(name: &str, label: &str) -> Result<WireCommand> {
    let code = command_spec(name)
        .and_then(|spec| spec.code_for(label))
        .ok_or_else(|| unknown(name, label))?;
    datapoint(name, code)
}

fn scaled(name: &str, value: f64) -> Result<WireCommand> {
    Ok(WireCommand::Datapoint {
        uid: spec_uid(name)?,
        value: encode_fixed_point(value),
    })
}

#[allow(clippy::cast_precision_loss)]
fn thermo_shift(name: &str, value: f64) -> Result<WireCommand> {
    let Some((spec, (min, max))) = command_spec(name).and_then(|s| s.range.map(|r| (s, r))) else {
        return Err(unknown("thermo_shift", name).into());
    };

    let (min, max) = (min as f64, max as f64);
    if !(min..=max).contains(&value) {
        return Err(ValueError::OutOfRange {
            name: name.to_string(),
            min,
            max,
            actual: value,
        }
        .into());
    }

    Ok(WireCommand::Datapoint {
        uid: spec.uid,
        value: encode_fixed_point(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FanMapFallback, resolve_fan_map};
    use crate::types::AttributeValue;

    fn numeric(command: &Command) -> Result<WireCommand> {
        command.translate(Dialect::Numeric, None, None)
    }

    fn dp(uid: u16, value: u16) -> WireCommand {
        WireCommand::Datapoint { uid, value }
    }

    #[test]
    fn power_and_vanes() {
        assert_eq!(numeric(&Command::Power(PowerState::Off)).unwrap(), dp(1, 0));
        assert_eq!(
            numeric(&Command::VerticalVane("manual4".into())).unwrap(),
            dp(5, 4)
        );
        assert_eq!(
            numeric(&Command::HorizontalVane("swing".into())).unwrap(),
            dp(6, 10)
        );
    }

    #[test]
    fn mode_falls_back_to_operating_mode() {
        let heat_pump: DeviceAttributes =
            [("operating_mode".to_string(), AttributeValue::from("heat"))]
                .into_iter()
                .collect();
        let wire = Command::Mode("cool".into())
            .translate(Dialect::Numeric, Some(&heat_pump), None)
            .unwrap();
        assert_eq!(wire, dp(58, 5));

        let split: DeviceAttributes = [("mode".to_string(), AttributeValue::from("heat"))]
            .into_iter()
            .collect();
        let wire = Command::Mode("cool".into())
            .translate(Dialect::Numeric, Some(&split), None)
            .unwrap();
        assert_eq!(wire, dp(2, 4));
    }

    #[test]
    fn unknown_mode_label() {
        let err = numeric(&Command::Mode("turbo".into())).unwrap_err();
        assert!(matches!(
            err,
            Error::Value(ValueError::UnknownLabel { ref attribute, .. }) if attribute == "mode"
        ));
    }

    #[test]
    fn setpoint_is_scaled() {
        assert_eq!(numeric(&Command::Setpoint(21.0)).unwrap(), dp(9, 210));
        assert_eq!(numeric(&Command::TankSetpoint(48.5)).unwrap(), dp(57, 485));
    }

    #[test]
    fn fan_speed_uses_resolved_table() {
        let fan = FanSpeeds::Coded(resolve_fan_map(30, FanMapFallback::default()).unwrap());
        let wire = Command::FanSpeed("high".into())
            .translate(Dialect::Numeric, None, Some(&fan))
            .unwrap();
        assert_eq!(wire, dp(4, 4));

        assert!(numeric(&Command::FanSpeed("high".into())).is_err());
    }

    #[test]
    fn thermo_shift_range() {
        let ok = Command::ThermoShift {
            name: "heat_thermo_shift".into(),
            value: -2.0,
        };
        assert_eq!(numeric(&ok).unwrap(), dp(55, 0xFFEC));

        let too_high = Command::ThermoShift {
            name: "thermoshift_heat_eco".into(),
            value: 6.0,
        };
        assert_eq!(
            numeric(&too_high).unwrap_err().to_string(),
            "value error: value 6 for thermoshift_heat_eco is out of range [0, 5]"
        );

        let not_a_shift = Command::ThermoShift {
            name: "power".into(),
            value: 1.0,
        };
        assert!(numeric(&not_a_shift).is_err());
    }

    #[test]
    fn heat_pump_settings() {
        assert_eq!(numeric(&Command::Preset("eco".into())).unwrap(), dp(42, 1));
        assert_eq!(numeric(&Command::TankMode("powerful".into())).unwrap(), dp(44, 2));
        assert_eq!(numeric(&Command::Quiet(true)).unwrap(), dp(34, 1));
        assert_eq!(numeric(&Command::RemoteControlBlock(true)).unwrap(), dp(12, 2));
        assert_eq!(numeric(&Command::ResetError).unwrap(), dp(54, 1));
        assert_eq!(numeric(&Command::Resync).unwrap(), dp(143, 1));
    }

    #[test]
    fn ascii_commands() {
        let ascii = |c: Command| c.translate(Dialect::Ascii, None, None).unwrap().to_string();
        assert_eq!(ascii(Command::Power(PowerState::Off)), "ONOFF,OFF");
        assert_eq!(ascii(Command::Mode("heat".into())), "MODE,HEAT");
        assert_eq!(ascii(Command::Setpoint(22.0)), "SETPTEMP,220");
        assert_eq!(ascii(Command::VerticalVane("swing".into())), "VANEUD,SWING");
        assert_eq!(ascii(Command::HorizontalVane("auto".into())), "VANELR,AUTO");
    }

    #[test]
    fn ascii_fan_speed_checks_limits() {
        let fan = FanSpeeds::Labels(vec!["auto".into(), "1".into(), "2".into()]);
        let wire = Command::FanSpeed("auto".into())
            .translate(Dialect::Ascii, None, Some(&fan))
            .unwrap();
        assert_eq!(wire.to_string(), "FANSP,AUTO");

        assert!(
            Command::FanSpeed("turbo".into())
                .translate(Dialect::Ascii, None, Some(&fan))
                .is_err()
        );
    }

    #[test]
    fn ascii_rejects_heat_pump_commands() {
        let err = Command::Preset("eco".into())
            .translate(Dialect::Ascii, None, None)
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
