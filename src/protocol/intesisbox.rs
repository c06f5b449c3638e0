// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IntesisBox adapter speaking the ASCII line protocol on TCP port 3310.
//!
//! Requests are single `\r`-terminated lines. The unit answers with `ACK`,
//! `ERR`, `ID:...`, `LIMITS:...` or `CHN,1:<function>,<value>` lines and
//! pushes `CHN` lines on its own whenever a value changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::watch;

use super::base::AdapterCore;
use super::framing::{LINE_DELIMITER, read_frame};
use super::{Protocol, WireCommand};
use crate::codec::ascii::{
    BOX_GET_ALL_COMMAND, BOX_INIT_COMMANDS, BOX_KEEPALIVE_COMMAND, FN_FANSP, FN_MODE, FN_SETPOINT, FN_VANELR,
    FN_VANEUD, box_attribute_name, decode_box_value,
};
use crate::codec::FanMapFallback;
use crate::command::Dialect;
use crate::config::BoxConfig;
use crate::connection::KeepalivePolicy;
use crate::error::{ConnectionError, Error, ProtocolError, Result};
use crate::types::{AttributeValue, DeviceType};

/// Interval of the readiness check during initialisation.
const READY_POLL: Duration = Duration::from_millis(100);

/// Kind of the last line received from the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    None,
    Ack,
    Err,
    Data,
}

/// Identity fields of an `ID` answer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BoxIdentity {
    model: String,
    mac: String,
    ip: String,
    protocol: String,
    firmware: String,
    rssi: String,
}

impl BoxIdentity {
    fn parse(payload: &str) -> Option<Self> {
        let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
        if fields.len() < 6 {
            return None;
        }
        Some(Self {
            model: fields[0].to_string(),
            mac: fields[1].to_string(),
            ip: fields[2].to_string(),
            protocol: fields[3].to_string(),
            firmware: fields[4].to_string(),
            rssi: fields[5].to_string(),
        })
    }

    fn mac_suffix(&self) -> &str {
        let start = self.mac.len().saturating_sub(4);
        self.mac.get(start..).unwrap_or(&self.mac)
    }
}

#[derive(Debug)]
struct BoxInner {
    config: BoxConfig,
    core: AdapterCore,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    replies: watch::Sender<(u64, Reply)>,
    device_id: Mutex<Option<String>>,
    awaiting_id: AtomicBool,
}

/// Adapter for IntesisBox gateways.
///
/// # Examples
///
/// ```no_run
/// use intesis_lib::config::BoxConfig;
/// use intesis_lib::protocol::{BoxAdapter, Protocol};
///
/// # async fn example() -> intesis_lib::Result<()> {
/// let adapter = BoxAdapter::new(BoxConfig::new("192.168.1.50"));
/// adapter.connect().await?;
/// println!("{:?}", adapter.core().devices().all());
/// adapter.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BoxAdapter {
    inner: Arc<BoxInner>,
}

impl BoxAdapter {
    /// Creates a disconnected adapter.
    #[must_use]
    pub fn new(config: BoxConfig) -> Self {
        let (replies, _) = watch::channel((0, Reply::None));
        Self {
            inner: Arc::new(BoxInner {
                config,
                core: AdapterCore::new(DeviceType::IntesisBox, FanMapFallback::default()),
                writer: tokio::sync::Mutex::new(None),
                replies,
                device_id: Mutex::new(None),
                awaiting_id: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the MAC-derived device id, once the unit has identified itself.
    #[must_use]
    pub fn device_id(&self) -> Option<String> {
        self.inner.device_id.lock().clone()
    }

    async fn open(&self) -> Result<()> {
        let config = &self.inner.config;
        tracing::debug!(host = %config.host(), port = config.port(), "Connecting to IntesisBox");
        let timeout = config.connect_timeout();
        let stream = tokio::time::timeout(timeout, TcpStream::connect((config.host(), config.port())))
            .await
            .map_err(|_| ConnectionError::Timeout(millis(timeout)))?
            .map_err(ConnectionError::Io)?;

        let (reader, writer) = stream.into_split();
        *self.inner.writer.lock().await = Some(writer);
        self.inner
            .core
            .tasks()
            .spawn("box-receive", receive_loop(Arc::clone(&self.inner), reader));
        Ok(())
    }

    /// Sends the init list, then waits until the unit is usable.
    async fn initialise(&self) {
        for command in BOX_INIT_COMMANDS {
            if *command == "ID" {
                self.inner.awaiting_id.store(true, Ordering::SeqCst);
            }
            if let Err(e) = self.inner.send_raw(command).await {
                tracing::warn!(command, error = %e, "Init command failed");
            }
        }

        while !self.inner.is_ready() && !self.inner.core.connection().is_disconnected() {
            tracing::debug!("Awaiting initialisation");
            tokio::time::sleep(READY_POLL).await;
        }
    }
}

impl Protocol for BoxAdapter {
    fn core(&self) -> &AdapterCore {
        &self.inner.core
    }

    fn dialect(&self) -> Dialect {
        Dialect::Ascii
    }

    async fn connect(&self) -> Result<()> {
        let core = &self.inner.core;
        if !core.connection().begin_connect() {
            tracing::debug!("Already connected");
            return Ok(());
        }
        core.tasks().reset();
        core.devices().clear();
        *self.inner.device_id.lock() = None;

        if let Err(e) = self.open().await {
            tracing::error!(host = %self.inner.config.host(), error = %e, "IntesisBox connect failed");
            core.connection().set_error(e.to_string());
            self.inner.close().await;
            return Err(e);
        }

        let init_timeout = self.inner.config.init_timeout();
        if tokio::time::timeout(init_timeout, self.initialise()).await.is_err() {
            let err = Error::from(ConnectionError::Timeout(millis(init_timeout)));
            tracing::error!(host = %self.inner.config.host(), error = %err, "IntesisBox initialisation timed out");
            core.connection().set_error(err.to_string());
            self.inner.close().await;
            return Err(err);
        }

        // Receive loop may have ended during initialisation
        if core.connection().is_disconnected() {
            self.inner.close().await;
            return Err(ConnectionError::Closed("socket closed during initialisation".to_string()).into());
        }
        core.connection().mark_connected();
        tracing::info!(host = %self.inner.config.host(), "Connected to IntesisBox");

        let keepalive = self.inner.config.keepalive();
        if keepalive.interval().is_some() {
            core.tasks()
                .spawn("box-keepalive", keepalive_loop(Arc::clone(&self.inner), keepalive));
        }
        core.notify(None);
        Ok(())
    }

    async fn stop(&self) {
        tracing::debug!(host = %self.inner.config.host(), "Stopping IntesisBox adapter");
        self.inner.close().await;
    }

    async fn poll_status(&self, _notify: bool) -> Result<Option<String>> {
        if !self.inner.core.connection().is_connected() {
            return Ok(None);
        }
        tracing::debug!("Polling status");
        match self.inner.send_raw(BOX_GET_ALL_COMMAND).await {
            Ok(_) => Ok(None),
            Err(e @ Error::CommandTimeout { .. }) => {
                tracing::warn!(error = %e, "Status poll not answered");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn send_command(&self, _device_id: &str, command: &WireCommand) -> Result<()> {
        let WireCommand::Function { function, value } = command else {
            return Err(Error::Unsupported(format!("{command} on IntesisBox")));
        };
        if !self.inner.core.connection().is_connected() {
            return Err(Error::NotConnected);
        }
        let line = format!("SET,1:{function},{value}");
        match self.inner.send_raw(&line).await? {
            Reply::Err => Err(ProtocolError::UnexpectedFormat(format!("{line} rejected with ERR")).into()),
            _ => Ok(()),
        }
    }

    fn mode_list(&self, device_id: &str) -> Option<Vec<String>> {
        self.core()
            .devices()
            .attribute(device_id, "mode_list")?
            .as_list()
            .map(<[String]>::to_vec)
    }
}

impl BoxInner {
    /// Writes one command and waits for its reply line.
    ///
    /// `SET` commands wait for `ACK` or `ERR`; `CHN` lines received in the
    /// meantime are applied but do not end the wait.
    async fn send_raw(&self, command: &str) -> Result<Reply> {
        let mut writer = self.writer.lock().await;
        let socket = writer.as_mut().ok_or(Error::NotConnected)?;

        let mut replies = self.replies.subscribe();
        replies.borrow_and_update();

        tracing::debug!(command, "Sending command");
        socket
            .write_all(format!("{command}\r").as_bytes())
            .await
            .map_err(ConnectionError::Io)?;

        let needs_ack = command.starts_with("SET,");
        let answer = async {
            loop {
                if replies.changed().await.is_err() {
                    return None;
                }
                let reply = replies.borrow_and_update().1;
                if !needs_ack || matches!(reply, Reply::Ack | Reply::Err) {
                    return Some(reply);
                }
            }
        };

        let timeout = self.config.command_timeout();
        match tokio::time::timeout(timeout, answer).await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(ConnectionError::Closed("reply channel closed".to_string()).into()),
            Err(_) => {
                tracing::warn!(command, timeout_ms = millis(timeout), "Command not acknowledged");
                Err(Error::CommandTimeout {
                    command: command.to_string(),
                    timeout_ms: millis(timeout),
                })
            }
        }
    }

    fn is_ready(&self) -> bool {
        let Some(device_id) = self.device_id.lock().clone() else {
            return false;
        };
        let devices = self.core.devices();
        devices.attribute(&device_id, "temperature").is_some()
            || devices.attribute(&device_id, "hvane_list").is_some()
    }

    async fn close(&self) {
        self.core.teardown().await;
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(error = %e, "Socket shutdown failed");
            }
        }
    }

    /// Applies one received line and wakes the pending command.
    fn handle_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.core.touch();
        tracing::debug!(line, "Received line");

        let reply = match line.split_once(':') {
            Some(("ID", payload)) => {
                self.handle_id(payload);
                Reply::Data
            }
            Some(("CHN,1", change)) => {
                self.handle_change(change);
                Reply::Data
            }
            Some(("LIMITS", limits)) => {
                if let Some((function, values)) = limits.split_once(',') {
                    self.handle_limits(function, values);
                }
                Reply::Data
            }
            Some((head, values)) if head.starts_with("LIMITS,") => {
                self.handle_limits(head.trim_start_matches("LIMITS,"), values);
                Reply::Data
            }
            _ if line == "ACK" => Reply::Ack,
            _ if line == "ERR" => Reply::Err,
            _ if self.awaiting_id.load(Ordering::SeqCst) && BoxIdentity::parse(line).is_some() => {
                self.handle_id(line);
                Reply::Data
            }
            _ => {
                tracing::warn!(line, "Dropping unrecognised line");
                Reply::Data
            }
        };

        self.replies.send_modify(|(seq, last)| {
            *seq = seq.wrapping_add(1);
            *last = reply;
        });
    }

    fn handle_id(&self, payload: &str) {
        let Some(identity) = BoxIdentity::parse(payload) else {
            tracing::warn!(payload, "Malformed ID answer");
            return;
        };
        self.awaiting_id.store(false, Ordering::SeqCst);
        tracing::debug!(
            model = %identity.model,
            ip = %identity.ip,
            protocol = %identity.protocol,
            firmware = %identity.firmware,
            "IntesisBox identified"
        );

        let device_id = identity.mac.clone();
        let suffix = identity.mac_suffix();
        self.core.set_identity(
            identity.mac.to_lowercase(),
            format!("{} ({suffix})", identity.model),
        );

        let devices = self.core.devices();
        devices.ensure_device(
            &device_id,
            [
                (
                    "name".to_string(),
                    AttributeValue::from(format!("{} {suffix}", self.core.device_type())),
                ),
                ("widgets".to_string(), AttributeValue::List(Vec::new())),
                ("model".to_string(), AttributeValue::from(identity.model.clone())),
            ],
        );
        devices.set_named(&device_id, "firmware", AttributeValue::from(identity.firmware.clone()));
        if let Ok(rssi) = identity.rssi.parse::<i64>() {
            devices.set_named(&device_id, "rssi", AttributeValue::Integer(rssi));
        }
        *self.device_id.lock() = Some(device_id);
    }

    fn handle_change(&self, change: &str) {
        let Some((function, value)) = change.split_once(',') else {
            tracing::warn!(change, "Malformed CHN line");
            return;
        };
        let Some(device_id) = self.device_id.lock().clone() else {
            tracing::debug!(function, "Change received before identification");
            return;
        };

        let name = box_attribute_name(function);
        let value = decode_box_value(function, value);
        if self.core.devices().set_named(&device_id, name, value) {
            self.core.notify(Some(&device_id));
        }
    }

    fn handle_limits(&self, function: &str, values: &str) {
        let Some(device_id) = self.device_id.lock().clone() else {
            return;
        };
        let values: Vec<String> = values
            .trim()
            .trim_start_matches(['[', '('])
            .trim_end_matches([']', ')'])
            .split(',')
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .collect();

        let devices = self.core.devices();
        match function.trim() {
            FN_SETPOINT => {
                if let [min, max] = values.as_slice()
                    && let (Ok(min), Ok(max)) = (min.parse::<i64>(), max.parse::<i64>())
                {
                    devices.set_named(&device_id, "setpoint_min", AttributeValue::Integer(min));
                    devices.set_named(&device_id, "setpoint_max", AttributeValue::Integer(max));
                }
            }
            FN_FANSP => {
                devices.set_named(&device_id, "config_fan_map", AttributeValue::List(values));
            }
            FN_MODE => {
                devices.set_named(&device_id, "mode_list", AttributeValue::List(values));
            }
            FN_VANEUD => {
                devices.set_named(&device_id, "vvane_list", AttributeValue::List(values));
            }
            FN_VANELR => {
                devices.set_named(&device_id, "hvane_list", AttributeValue::List(values));
            }
            other => tracing::debug!(function = other, "Ignoring limits"),
        }
    }
}

async fn receive_loop(inner: Arc<BoxInner>, reader: OwnedReadHalf) {
    let mut reader = BufReader::new(reader);
    let reason = loop {
        match read_frame(&mut reader, LINE_DELIMITER).await {
            Ok(Some(frame)) => inner.handle_line(&String::from_utf8_lossy(&frame)),
            Ok(None) => break "IntesisBox closed the connection".to_string(),
            Err(e) => break e.to_string(),
        }
    };
    inner.core.connection_lost(&reason);
}

async fn keepalive_loop(inner: Arc<BoxInner>, policy: KeepalivePolicy) {
    let Some(interval) = policy.interval() else {
        return;
    };

    loop {
        tokio::time::sleep(interval).await;

        if let Some(stale) = policy.stale_after()
            && inner.core.silent_for() > stale
        {
            inner.core.connection_lost("IntesisBox silent for two keepalive intervals");
            return;
        }

        if let Err(e) = inner.send_raw(BOX_KEEPALIVE_COMMAND).await {
            tracing::warn!(error = %e, "IntesisBox keepalive failed");
            if policy.resets() {
                inner.core.connection_lost("keepalive not acknowledged");
                return;
            }
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
