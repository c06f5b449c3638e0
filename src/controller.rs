// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level handle over one Intesis controller.
//!
//! A [`Controller`] owns one protocol adapter and exposes the same getters
//! and setters whichever transport is behind it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::codec::{decode_fixed_point, decode_temperature, describe_error};
use crate::command::Command;
use crate::config::ControllerConfig;
use crate::connection::ConnectionState;
use crate::error::{Error, Result};
use crate::event::ControllerEvent;
use crate::protocol::{Adapter, Protocol};
use crate::state::DeviceAttributes;
use crate::subscription::SubscriptionId;
use crate::types::{AttributeValue, DeviceType, PowerState};

/// An Intesis controller reached through the cloud, the local API or an
/// IntesisBox.
///
/// # Examples
///
/// ```no_run
/// use intesis_lib::Controller;
/// use intesis_lib::config::LocalConfig;
///
/// #[tokio::main]
/// async fn main() -> intesis_lib::Result<()> {
///     let controller = Controller::new(LocalConfig::new("192.168.1.40", "admin", "admin"))?;
///     controller.connect().await?;
///
///     for device_id in controller.get_devices().keys() {
///         println!("{device_id}: {:?}", controller.get_temperature(device_id));
///         controller.set_mode(device_id, "heat").await?;
///     }
///
///     controller.stop().await;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Controller {
    adapter: Adapter,
}

impl Controller {
    /// Creates a controller for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created or a cloud device
    /// type has no endpoint.
    pub fn new(config: impl Into<ControllerConfig>) -> Result<Self> {
        Ok(Self::from_adapter(Adapter::from_config(config.into())?))
    }

    /// Wraps an already built adapter.
    #[must_use]
    pub fn from_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Returns the underlying adapter.
    #[must_use]
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    // ========== Lifecycle ==========

    /// Opens the connection and loads the initial state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] for rejected credentials, or a
    /// connection or protocol error.
    pub async fn connect(&self) -> Result<()> {
        self.adapter.connect().await
    }

    /// Stops every background task and closes the connection.
    pub async fn stop(&self) {
        self.adapter.stop().await;
    }

    /// Refreshes the full state.
    ///
    /// For cloud controllers the one-time relay token is returned.
    ///
    /// # Errors
    ///
    /// Returns error if the refresh fails.
    pub async fn poll_status(&self, notify: bool) -> Result<Option<String>> {
        self.adapter.poll_status(notify).await
    }

    // ========== Connection ==========

    /// Returns true once the handshake has completed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.adapter.core().connection().is_connected()
    }

    /// Returns true when neither connected nor connecting.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.adapter.core().connection().is_disconnected()
    }

    /// Returns the connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.adapter.core().connection().state()
    }

    /// Returns the failed attempts of the current connect cycle.
    #[must_use]
    pub fn connection_retries(&self) -> u32 {
        self.adapter.core().connection().retries()
    }

    /// Returns the last error reported by the remote side.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.adapter.core().connection().error_message()
    }

    /// Returns the device family.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.adapter.core().device_type()
    }

    /// Returns the lowercased controller id.
    #[must_use]
    pub fn controller_id(&self) -> Option<String> {
        self.adapter.core().controller_id()
    }

    /// Returns the controller display name.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.adapter.core().name()
    }

    /// Returns when the last message arrived.
    #[must_use]
    pub fn last_message_received(&self) -> Option<DateTime<Utc>> {
        self.adapter.core().last_message_received()
    }

    // ========== Devices ==========

    /// Returns a snapshot of every device.
    #[must_use]
    pub fn get_devices(&self) -> BTreeMap<String, DeviceAttributes> {
        self.adapter.core().devices().all()
    }

    /// Returns a snapshot of one device.
    #[must_use]
    pub fn get_device(&self, device_id: &str) -> Option<DeviceAttributes> {
        self.adapter.core().devices().get(device_id)
    }

    /// Returns one raw attribute.
    #[must_use]
    pub fn get_device_property(&self, device_id: &str, name: &str) -> Option<AttributeValue> {
        self.adapter.core().devices().attribute(device_id, name)
    }

    fn text(&self, device_id: &str, name: &str) -> Option<String> {
        self.get_device_property(device_id, name)?
            .as_str()
            .map(str::to_string)
    }

    fn integer(&self, device_id: &str, name: &str) -> Option<i64> {
        self.get_device_property(device_id, name)?.as_i64()
    }

    /// Returns the device name.
    #[must_use]
    pub fn get_device_name(&self, device_id: &str) -> Option<String> {
        self.text(device_id, "name")
    }

    /// Returns the power state.
    #[must_use]
    pub fn get_power_state(&self, device_id: &str) -> Option<PowerState> {
        self.text(device_id, "power")?.parse().ok()
    }

    /// Returns true if the unit is on.
    #[must_use]
    pub fn is_on(&self, device_id: &str) -> bool {
        self.get_power_state(device_id) == Some(PowerState::On)
    }

    /// Returns the mode, or the operating mode on units without one.
    #[must_use]
    pub fn get_mode(&self, device_id: &str) -> Option<String> {
        let devices = self.adapter.core().devices();
        let value = devices
            .attribute(device_id, "mode")
            .or_else(|| devices.attribute(device_id, "operating_mode"))?;
        value.as_str().map(str::to_string)
    }

    /// Returns the selectable modes.
    #[must_use]
    pub fn get_mode_list(&self, device_id: &str) -> Option<Vec<String>> {
        self.adapter.mode_list(device_id)
    }

    /// Returns the fan speed label.
    #[must_use]
    pub fn get_fan_speed(&self, device_id: &str) -> Option<String> {
        let value = self.get_device_property(device_id, "fan_speed")?;
        match self.adapter.fan_speeds(device_id) {
            Some(speeds) => speeds.label_for(&value),
            None if value.is_null() => None,
            None => Some(value.to_string()),
        }
    }

    /// Returns the selectable fan speeds.
    #[must_use]
    pub fn get_fan_speed_list(&self, device_id: &str) -> Option<Vec<String>> {
        self.adapter.fan_speeds(device_id).map(|speeds| speeds.labels())
    }

    /// Returns the vertical vane position.
    #[must_use]
    pub fn get_vertical_swing(&self, device_id: &str) -> Option<String> {
        self.text(device_id, "vvane")
    }

    /// Returns the horizontal vane position.
    #[must_use]
    pub fn get_horizontal_swing(&self, device_id: &str) -> Option<String> {
        self.text(device_id, "hvane")
    }

    /// Returns true if the vertical vane can swing.
    #[must_use]
    pub fn has_vertical_swing(&self, device_id: &str) -> bool {
        self.adapter.has_vertical_swing(device_id)
    }

    /// Returns true if the horizontal vane can swing.
    #[must_use]
    pub fn has_horizontal_swing(&self, device_id: &str) -> bool {
        self.adapter.has_horizontal_swing(device_id)
    }

    /// Returns true if the unit reports a setpoint.
    #[must_use]
    pub fn has_setpoint_control(&self, device_id: &str) -> bool {
        self.get_device_property(device_id, "setpoint").is_some()
    }

    /// Returns the target temperature in °C.
    #[must_use]
    pub fn get_setpoint(&self, device_id: &str) -> Option<f64> {
        self.integer(device_id, "setpoint").map(decode_fixed_point)
    }

    /// Returns the lowest settable target temperature in °C.
    #[must_use]
    pub fn get_min_setpoint(&self, device_id: &str) -> Option<f64> {
        self.integer(device_id, "setpoint_min").map(decode_fixed_point)
    }

    /// Returns the highest settable target temperature in °C.
    #[must_use]
    pub fn get_max_setpoint(&self, device_id: &str) -> Option<f64> {
        self.integer(device_id, "setpoint_max").map(decode_fixed_point)
    }

    /// Returns the ambient temperature in °C.
    #[must_use]
    pub fn get_temperature(&self, device_id: &str) -> Option<f64> {
        self.integer(device_id, "temperature").map(decode_temperature)
    }

    /// Returns the outdoor temperature in °C.
    #[must_use]
    pub fn get_outdoor_temperature(&self, device_id: &str) -> Option<f64> {
        let raw = self.integer(device_id, "outdoor_temp")?;
        Some(self.adapter.decode_outdoor_temperature(raw))
    }

    /// Returns the accumulated working hours.
    #[must_use]
    pub fn get_run_hours(&self, device_id: &str) -> Option<i64> {
        self.integer(device_id, "working_hours")
    }

    /// Returns the fault as `"<remote code>: <description>"`.
    ///
    /// Box units report a textual code, which is returned as is. An empty
    /// code means no fault.
    #[must_use]
    pub fn get_error(&self, device_id: &str) -> Option<String> {
        match self.get_device_property(device_id, "error_code")? {
            AttributeValue::Text(code) if code.is_empty() => None,
            AttributeValue::Text(code) => Some(code),
            value => value.as_i64().map(describe_error),
        }
    }

    /// Returns the wireless signal strength.
    #[must_use]
    pub fn get_rssi(&self, device_id: &str) -> Option<i64> {
        self.integer(device_id, "rssi")
    }

    /// Returns the climate working mode (comfort, eco, powerful).
    #[must_use]
    pub fn get_preset_mode(&self, device_id: &str) -> Option<String> {
        self.text(device_id, "climate_working_mode")
    }

    /// Returns the instantaneous power consumption.
    #[must_use]
    pub fn get_instant_power_consumption(&self, device_id: &str) -> Option<i64> {
        self.integer(device_id, "instant_power_consumption")
    }

    /// Returns the accumulated power consumption.
    #[must_use]
    pub fn get_total_power_consumption(&self, device_id: &str) -> Option<i64> {
        self.integer(device_id, "accumulated_power_consumption")
    }

    /// Returns the cooling consumption of heat pump units.
    #[must_use]
    pub fn get_cool_power_consumption(&self, device_id: &str) -> Option<i64> {
        self.integer(device_id, "aquarea_cool_consumption")
    }

    /// Returns the heating consumption of heat pump units.
    #[must_use]
    pub fn get_heat_power_consumption(&self, device_id: &str) -> Option<i64> {
        self.integer(device_id, "aquarea_heat_consumption")
    }

    /// Returns the tank consumption of heat pump units.
    #[must_use]
    pub fn get_tank_power_consumption(&self, device_id: &str) -> Option<i64> {
        self.integer(device_id, "aquarea_tank_consumption")
    }

    // ========== Setters ==========

    /// Translates a command for the active protocol and sends it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] for unknown devices, a value error
    /// if the command cannot be encoded, or the transport error.
    pub async fn send(&self, device_id: &str, command: Command) -> Result<()> {
        let device = self
            .get_device(device_id)
            .ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))?;
        let fan = self.adapter.fan_speeds(device_id);
        let wire = command.translate(self.adapter.dialect(), Some(&device), fan.as_ref())?;
        tracing::debug!(device_id, command = command.name(), wire = %wire, "Sending command");
        self.adapter.send_command(device_id, &wire).await
    }

    /// Turns the unit on.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_power_on(&self, device_id: &str) -> Result<()> {
        self.send(device_id, Command::Power(PowerState::On)).await
    }

    /// Turns the unit off.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_power_off(&self, device_id: &str) -> Result<()> {
        self.send(device_id, Command::Power(PowerState::Off)).await
    }

    /// Sets the mode by label.
    ///
    /// Units without a `mode` attribute receive an operating mode instead.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::UnknownLabel`](crate::ValueError::UnknownLabel)
    /// for modes the protocol cannot encode.
    pub async fn set_mode(&self, device_id: &str, mode: &str) -> Result<()> {
        self.send(device_id, Command::Mode(mode.to_string())).await
    }

    /// Switches to heating.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_mode_heat(&self, device_id: &str) -> Result<()> {
        self.set_mode(device_id, "heat").await
    }

    /// Switches to cooling.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_mode_cool(&self, device_id: &str) -> Result<()> {
        self.set_mode(device_id, "cool").await
    }

    /// Switches to fan only.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_mode_fan(&self, device_id: &str) -> Result<()> {
        self.set_mode(device_id, "fan").await
    }

    /// Switches to automatic.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_mode_auto(&self, device_id: &str) -> Result<()> {
        self.set_mode(device_id, "auto").await
    }

    /// Switches to dehumidification.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_mode_dry(&self, device_id: &str) -> Result<()> {
        self.set_mode(device_id, "dry").await
    }

    /// Sets the target temperature in °C.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_temperature(&self, device_id: &str, setpoint: f64) -> Result<()> {
        self.send(device_id, Command::Setpoint(setpoint)).await
    }

    /// Sets the fan speed by label.
    ///
    /// # Errors
    ///
    /// Returns an unknown-label error for speeds the unit does not list.
    pub async fn set_fan_speed(&self, device_id: &str, fan: &str) -> Result<()> {
        self.send(device_id, Command::FanSpeed(fan.to_string())).await
    }

    /// Sets the vertical vane position.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_vertical_vane(&self, device_id: &str, vane: &str) -> Result<()> {
        self.send(device_id, Command::VerticalVane(vane.to_string())).await
    }

    /// Sets the horizontal vane position.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_horizontal_vane(&self, device_id: &str, vane: &str) -> Result<()> {
        self.send(device_id, Command::HorizontalVane(vane.to_string())).await
    }

    /// Sets the climate working mode (comfort, eco, powerful).
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_preset_mode(&self, device_id: &str, preset: &str) -> Result<()> {
        self.send(device_id, Command::Preset(preset.to_string())).await
    }

    /// Sets the heat pump operating mode.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_operating_mode(&self, device_id: &str, mode: &str) -> Result<()> {
        self.send(device_id, Command::OperatingMode(mode.to_string())).await
    }

    /// Sets the tank working mode.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_tank_mode(&self, device_id: &str, mode: &str) -> Result<()> {
        self.send(device_id, Command::TankMode(mode.to_string())).await
    }

    /// Enables or disables quiet mode.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_quiet_mode(&self, device_id: &str, enabled: bool) -> Result<()> {
        self.send(device_id, Command::Quiet(enabled)).await
    }

    /// Sets the tank target temperature in °C.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_tank_setpoint(&self, device_id: &str, setpoint: f64) -> Result<()> {
        self.send(device_id, Command::TankSetpoint(setpoint)).await
    }

    /// Sets a thermo shift, e.g. `thermoshift_heat_eco`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::OutOfRange`](crate::ValueError::OutOfRange)
    /// outside the shift's range.
    pub async fn set_thermo_shift(&self, device_id: &str, name: &str, value: f64) -> Result<()> {
        let command = Command::ThermoShift {
            name: name.to_string(),
            value,
        };
        self.send(device_id, command).await
    }

    /// Blocks or releases the wired remote control.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn set_remote_control_block(&self, device_id: &str, blocked: bool) -> Result<()> {
        self.send(device_id, Command::RemoteControlBlock(blocked)).await
    }

    /// Clears the current fault.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn reset_error(&self, device_id: &str) -> Result<()> {
        self.send(device_id, Command::ResetError).await
    }

    /// Asks the unit to resend its full state.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn resync(&self, device_id: &str) -> Result<()> {
        self.send(device_id, Command::Resync).await
    }

    // ========== Subscriptions ==========

    /// Registers a callback fired with the updated device id, or `None`
    /// when every device (or the connection) changed.
    pub fn add_update_callback<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        self.adapter.core().notifier().callbacks().on_update(callback)
    }

    /// Registers a callback fired on connection state transitions.
    pub fn add_connection_callback<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        self.adapter
            .core()
            .notifier()
            .callbacks()
            .on_connection_changed(callback)
    }

    /// Removes a callback. Returns true if it was registered.
    pub fn remove_update_callback(&self, id: SubscriptionId) -> bool {
        self.adapter.core().notifier().callbacks().unsubscribe(id)
    }

    /// Returns a receiver of every update and connection event.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.adapter.core().notifier().subscribe()
    }
}
