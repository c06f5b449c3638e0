// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cloud relay adapter (IntesisHome, airconwithme, anywair).
//!
//! Connecting is two-phase. An HTTP POST of the account credentials returns
//! the installation, the current status of every device, the relay address
//! and a one-time token. A TCP socket to the relay is then authenticated
//! with `connect_req` and carries `}}`-terminated JSON messages both ways.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use super::base::{AdapterCore, device_id_json, json_attribute, json_id};
use super::framing::{JSON_DELIMITER, read_frame};
use super::{Protocol, WireCommand};
use crate::codec::catalog::{UID_RSSI, UID_TEMPERATURE};
use crate::command::Dialect;
use crate::config::CloudConfig;
use crate::connection::{ConnectionState, KeepalivePolicy};
use crate::error::{ConnectionError, Error, ProtocolError, Result};
use crate::types::AttributeValue;

/// Handshake request body asking for both status and configuration.
const STATUS_COMMAND: &str = r#"{"status":{"hash":"x"},"config":{"hash":"x"}}"#;

/// Widget list given to devices missing from the installation.
const PLACEHOLDER_WIDGETS: &[&str] = &["42"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    error_code: Option<Value>,
    error_message: Option<String>,
    config: Option<AccountConfig>,
    status: Option<StatusBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountConfig {
    #[serde(rename = "serverIP")]
    server_ip: Option<String>,
    server_port: Option<u16>,
    token: Option<Value>,
    #[serde(default)]
    inst: Vec<Installation>,
}

#[derive(Debug, Deserialize)]
struct Installation {
    #[serde(default)]
    devices: Vec<InstalledDevice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstalledDevice {
    id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    widgets: Vec<Value>,
    model_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StatusBlock {
    #[serde(default)]
    status: Vec<StatusEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusEntry {
    device_id: Value,
    uid: u32,
    value: i64,
}

#[derive(Debug, Deserialize)]
struct RelayMessage {
    command: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone)]
struct RelayEndpoint {
    host: String,
    port: u16,
}

#[derive(Debug)]
struct CloudInner {
    config: CloudConfig,
    api_url: String,
    api_version: &'static str,
    http: Client,
    core: AdapterCore,
    relay: Mutex<Option<RelayEndpoint>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

/// Adapter for the cloud relay.
///
/// # Examples
///
/// ```no_run
/// use intesis_lib::config::CloudConfig;
/// use intesis_lib::protocol::{CloudAdapter, Protocol};
///
/// # async fn example() -> intesis_lib::Result<()> {
/// let adapter = CloudAdapter::new(CloudConfig::new("user@example.com", "secret"))?;
/// adapter.connect().await?;
/// println!("{:?}", adapter.core().devices().all());
/// adapter.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CloudAdapter {
    inner: Arc<CloudInner>,
}

impl CloudAdapter {
    /// Creates an adapter with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created, or if the device
    /// type is not served by the cloud.
    pub fn new(config: CloudConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ConnectionError::Http)?;
        Self::with_client(config, http)
    }

    /// Creates an adapter sharing an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] if the device type is not served by
    /// the cloud.
    pub fn with_client(config: CloudConfig, http: Client) -> Result<Self> {
        let api_url = config.api_url().map(str::to_string);
        let (Some(api_url), Some(api_version)) = (api_url, config.api_version()) else {
            return Err(Error::Unsupported(format!(
                "{} has no cloud endpoint",
                config.device_type()
            )));
        };

        let core = AdapterCore::new(config.device_type(), config.fan_fallback());
        core.set_identity(config.username(), config.username());

        Ok(Self {
            inner: Arc::new(CloudInner {
                config,
                api_url,
                api_version,
                http,
                core,
                relay: Mutex::new(None),
                outbound: Mutex::new(None),
            }),
        })
    }

    /// Fetches a token, retrying with linear backoff.
    async fn fetch_token(&self) -> Result<Value> {
        let policy = self.inner.config.reconnection();
        let cancel = self.inner.core.tasks().token();
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, delay_secs = delay.as_secs(), "Retrying cloud handshake");
                tokio::select! {
                    () = cancel.cancelled() => {
                        return Err(ConnectionError::Closed("stopped while retrying".to_string()).into());
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }

            let failure = match self.inner.handshake(false).await {
                Ok(Some(token)) => return Ok(token),
                Ok(None) => Error::from(ProtocolError::MissingField("config.token".to_string())),
                Err(e @ Error::Authentication(_)) => return Err(e),
                Err(e) => e,
            };

            tracing::error!(
                device_type = %self.inner.core.device_type(),
                error = %failure,
                "Cloud handshake failed"
            );
            attempt = self.inner.core.connection().record_retry();
            if !policy.should_retry(attempt) {
                return Err(failure);
            }
        }
    }

    async fn open_relay(&self, token: &Value) -> Result<()> {
        let endpoint = self
            .inner
            .relay
            .lock()
            .clone()
            .ok_or_else(|| ProtocolError::MissingField("config.serverIP".to_string()))?;

        tracing::debug!(host = %endpoint.host, port = endpoint.port, "Opening relay connection");
        let timeout = self.inner.config.timeout();
        let stream = tokio::time::timeout(
            timeout,
            TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
        )
        .await
        .map_err(|_| ConnectionError::Timeout(millis(timeout)))?
        .map_err(ConnectionError::Io)?;

        let (reader, mut writer) = stream.into_split();
        let auth = json!({"command": "connect_req", "data": {"token": token}}).to_string();
        writer
            .write_all(auth.as_bytes())
            .await
            .map_err(ConnectionError::Io)?;
        self.inner.core.touch();

        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.outbound.lock() = Some(tx);

        let tasks = self.inner.core.tasks();
        tasks.spawn("cloud-receive", receive_loop(Arc::clone(&self.inner), reader));
        tasks.spawn("cloud-send", send_queue(Arc::clone(&self.inner), writer, rx));
        let keepalive = self.inner.config.keepalive();
        if keepalive.interval().is_some() {
            tasks.spawn("cloud-keepalive", keepalive_loop(Arc::clone(&self.inner), keepalive));
        }
        Ok(())
    }

    /// Waits for `connect_rsp` to move the tracker out of `Connecting`.
    async fn await_relay_accept(&self) -> Result<()> {
        let timeout = self.inner.config.handshake_timeout();
        let mut watch = self.inner.core.connection().watch();
        let outcome = tokio::time::timeout(
            timeout,
            watch.wait_for(|state| *state != ConnectionState::Connecting),
        )
        .await;

        match outcome {
            Ok(Ok(state)) if *state == ConnectionState::Connected => Ok(()),
            Ok(_) => Err(ConnectionError::Closed("relay closed during handshake".to_string()).into()),
            Err(_) => Err(ConnectionError::Timeout(millis(timeout)).into()),
        }
    }
}

impl Protocol for CloudAdapter {
    fn core(&self) -> &AdapterCore {
        &self.inner.core
    }

    fn dialect(&self) -> Dialect {
        Dialect::Numeric
    }

    async fn connect(&self) -> Result<()> {
        let core = &self.inner.core;
        if !core.connection().begin_connect() {
            tracing::debug!("Cloud adapter already connected or connecting");
            return Ok(());
        }
        core.tasks().reset();

        let result = async {
            let token = self.fetch_token().await?;
            self.open_relay(&token).await?;
            self.await_relay_accept().await
        }
        .await;

        if let Err(e) = &result {
            tracing::error!(device_type = %core.device_type(), error = %e, "Cloud connect failed");
            if !matches!(e, Error::Authentication(_)) {
                core.connection().set_error(e.to_string());
            }
            *self.inner.outbound.lock() = None;
            core.teardown().await;
        }
        result
    }

    async fn stop(&self) {
        tracing::debug!(device_type = %self.inner.core.device_type(), "Stopping cloud adapter");
        *self.inner.outbound.lock() = None;
        self.inner.core.teardown().await;
    }

    async fn poll_status(&self, notify: bool) -> Result<Option<String>> {
        let token = self.inner.handshake(notify).await?;
        Ok(token.as_ref().map(json_id))
    }

    async fn send_command(&self, device_id: &str, command: &WireCommand) -> Result<()> {
        let WireCommand::Datapoint { uid, value } = command else {
            return Err(Error::Unsupported(format!("{command} on the cloud relay")));
        };
        let message = json!({
            "command": "set",
            "data": {
                "deviceId": device_id_json(device_id),
                "uid": uid,
                "value": value,
                "seqNo": 0,
            }
        });
        tracing::debug!(device_id, uid, value, "Queueing set command");
        self.inner.enqueue(message.to_string())
    }
}

impl CloudInner {
    /// Posts the credentials and merges the returned installation and status.
    ///
    /// Returns the relay token, if the response carried one.
    async fn handshake(&self, notify: bool) -> Result<Option<Value>> {
        let form = [
            ("username", self.config.username()),
            ("password", self.config.password()),
            ("cmd", STATUS_COMMAND),
            ("version", self.api_version),
        ];

        tracing::debug!(url = %self.api_url, "Requesting cloud status");
        let response = self
            .http
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                self.core
                    .connection()
                    .set_error(format!("Error connecting to {} API: {e}", self.core.device_type()));
                ConnectionError::Http(e)
            })?;

        if !response.status().is_success() {
            return Err(ConnectionError::Status(response.status().as_u16()).into());
        }

        // Served as text/html by some deployments
        let body = response.text().await.map_err(ConnectionError::Http)?;
        let status: StatusResponse = serde_json::from_str(&body).map_err(ProtocolError::Json)?;

        if let Some(code) = status.error_code {
            let message = status.error_message.unwrap_or_else(|| code.to_string());
            tracing::error!(code = %code, message = %message, "Cloud API rejected credentials");
            self.core.connection().set_error(message.clone());
            return Err(Error::Authentication(message));
        }

        let mut token = None;
        if let Some(config) = status.config {
            if let (Some(host), Some(port)) = (config.server_ip, config.server_port) {
                tracing::debug!(host = %host, port, "Relay endpoint received");
                *self.relay.lock() = Some(RelayEndpoint { host, port });
            }
            token = config.token;

            for device in config.inst.into_iter().flat_map(|inst| inst.devices) {
                let id = json_id(&device.id);
                let mut seed = vec![
                    (
                        "name".to_string(),
                        AttributeValue::from(device.name.unwrap_or_else(|| format!("Device {id}"))),
                    ),
                    (
                        "widgets".to_string(),
                        AttributeValue::List(device.widgets.iter().map(json_id).collect()),
                    ),
                ];
                if let Some(model) = device.model_id {
                    seed.push(("model".to_string(), json_attribute(&model)));
                }
                self.core.devices().merge(&id, seed);
            }
        }

        let mut last_device = None;
        for entry in status.status.map(|s| s.status).unwrap_or_default() {
            let device_id = json_id(&entry.device_id);
            self.ensure_known(&device_id);
            self.store_status(&device_id, entry.uid, entry.value);
            last_device = Some(device_id);
        }

        if notify {
            self.core.notify(last_device.as_deref());
        }
        Ok(token)
    }

    /// Seeds a placeholder for devices missing from the installation.
    fn ensure_known(&self, device_id: &str) {
        let seed = [
            ("name".to_string(), AttributeValue::from(format!("Device {device_id}"))),
            (
                "widgets".to_string(),
                AttributeValue::List(PLACEHOLDER_WIDGETS.iter().map(|w| (*w).to_string()).collect()),
            ),
        ];
        if self.core.devices().ensure_device(device_id, seed) {
            tracing::debug!(device_id, "Device missing from installation, using placeholder");
        }
    }

    fn store_status(&self, device_id: &str, uid: u32, value: i64) -> bool {
        match u16::try_from(uid) {
            Ok(uid) => self.core.devices().set_attribute(device_id, uid, value),
            Err(_) => self.core.devices().set_named(
                device_id,
                format!("unknown_uid_{uid}"),
                AttributeValue::Integer(value),
            ),
        }
    }

    fn enqueue(&self, message: String) -> Result<()> {
        let outbound = self.outbound.lock();
        let sender = outbound.as_ref().ok_or(Error::NotConnected)?;
        sender
            .send(message)
            .map_err(|_| ConnectionError::Closed("send queue closed".to_string()).into())
    }

    fn handle_frame(&self, frame: &[u8]) {
        self.core.touch();
        let text = String::from_utf8_lossy(frame);
        tracing::debug!(device_type = %self.core.device_type(), message = %text, "Relay message received");

        let message: RelayMessage = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed relay message");
                return;
            }
        };

        match message.command.as_str() {
            "connect_rsp" => self.handle_connect_rsp(&message.data),
            "status" => match serde_json::from_value::<StatusEntry>(message.data) {
                Ok(entry) => {
                    let device_id = json_id(&entry.device_id);
                    self.ensure_known(&device_id);
                    self.store_status(&device_id, entry.uid, entry.value);
                    if entry.uid != u32::from(UID_RSSI) {
                        self.core.notify(Some(&device_id));
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Dropping malformed status message"),
            },
            "rssi" => {
                let device_id = message.data.get("deviceId").map(json_id);
                let rssi = message.data.get("value").map(json_attribute);
                if let (Some(device_id), Some(rssi)) = (device_id, rssi)
                    && !rssi.is_null()
                    && self.core.devices().contains(&device_id)
                {
                    self.core.devices().set_named(&device_id, "rssi", rssi);
                }
            }
            other => tracing::debug!(command = other, "Ignoring relay message"),
        }
    }

    fn handle_connect_rsp(&self, data: &Value) {
        if data.get("status").and_then(Value::as_str) == Some("ok") {
            tracing::info!(device_type = %self.core.device_type(), "Relay accepted the session");
            self.core.connection().mark_connected();
            self.core.notify(None);
        } else {
            tracing::warn!(response = %data, "Relay refused the session");
            self.core.connection().set_error(format!("relay refused the session: {data}"));
            self.core.connection_lost("relay refused the session");
        }
    }

    fn relay_lost(&self, reason: &str) {
        *self.outbound.lock() = None;
        self.core.connection_lost(reason);
    }
}

async fn receive_loop(inner: Arc<CloudInner>, reader: OwnedReadHalf) {
    let mut reader = BufReader::new(reader);
    let reason = loop {
        match read_frame(&mut reader, JSON_DELIMITER).await {
            Ok(Some(frame)) => inner.handle_frame(&frame),
            Ok(None) => break "relay closed the connection".to_string(),
            Err(e) => break e.to_string(),
        }
    };
    inner.relay_lost(&reason);
}

async fn send_queue(inner: Arc<CloudInner>, mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = writer.write_all(message.as_bytes()).await {
            inner.relay_lost(&e.to_string());
            return;
        }
        tracing::debug!(message = %message, "Relay message sent");
    }
}

async fn keepalive_loop(inner: Arc<CloudInner>, policy: KeepalivePolicy) {
    let Some(interval) = policy.interval() else {
        return;
    };

    loop {
        tokio::time::sleep(interval).await;

        if let Some(stale) = policy.stale_after()
            && inner.core.silent_for() > stale
        {
            inner.relay_lost("relay silent for two keepalive intervals");
            return;
        }

        let Some(device_id) = inner.core.devices().device_ids().into_iter().next() else {
            continue;
        };
        tracing::debug!(device_id = %device_id, "Sending relay keepalive");
        let message = json!({
            "command": "get",
            "data": {"deviceId": device_id_json(&device_id), "uid": UID_TEMPERATURE}
        });
        if let Err(e) = inner.enqueue(message.to_string()) {
            tracing::warn!(error = %e, "Relay keepalive failed");
            if policy.resets() {
                inner.relay_lost("keepalive could not be sent");
                return;
            }
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
