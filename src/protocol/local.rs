// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local HTTP adapter for IntesisHome units on the LAN.
//!
//! Every request is a JSON `{command, data}` POST to the unit's `api.cgi`
//! carrying the session id obtained at login. There is no push channel;
//! a background task re-reads every datapoint at a fixed interval.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::base::{AdapterCore, json_attribute};
use super::{Protocol, WireCommand};
use crate::codec::{self, FanSpeeds, decode_fixed_point, fan_config_for_codes, resolve_fan_map};
use crate::command::Dialect;
use crate::config::LocalConfig;
use crate::error::{ConnectionError, Error, ProtocolError, Result};
use crate::types::{AttributeValue, DeviceType};

const CMD_LOGIN: &str = "login";
const CMD_GET_INFO: &str = "getinfo";
const CMD_GET_AVAILABLE_DATAPOINTS: &str = "getavailabledatapoints";
const CMD_GET_DATAPOINT_VALUE: &str = "getdatapointvalue";
const CMD_SET_DATAPOINT_VALUE: &str = "setdatapointvalue";

/// API error codes meaning the session is gone.
const SESSION_ERROR_CODES: [i64; 2] = [1, 5];

/// Login error code for rejected credentials.
const BAD_CREDENTIALS: i64 = 5;

const UID_MODE: u16 = 2;
const UID_FAN_SPEED: u16 = 4;
const UID_VVANE: u16 = 5;
const UID_HVANE: u16 = 6;

/// One datapoint advertised by `getavailabledatapoints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Attribute UID.
    pub uid: u16,
    /// Access flags as reported by the unit.
    #[serde(default)]
    pub rw: Option<String>,
    /// Value type as reported by the unit.
    #[serde(rename = "type", default)]
    pub kind: Option<i64>,
    /// Value constraints.
    #[serde(default)]
    pub descr: DatapointDescriptor,
}

/// States or range of a [`Datapoint`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatapointDescriptor {
    /// Number of enumerated states.
    #[serde(default)]
    pub num_states: Option<i64>,
    /// Enumerated raw states.
    #[serde(default)]
    pub states: Vec<i64>,
    /// Largest raw value.
    #[serde(default)]
    pub max_value: Option<i64>,
    /// Smallest raw value.
    #[serde(default)]
    pub min_value: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LocalResponse {
    success: bool,
    #[serde(default)]
    data: Value,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceInfo {
    sn: String,
    #[serde(rename = "ownSSID", default)]
    own_ssid: String,
    #[serde(default)]
    device_model: String,
    #[serde(default)]
    rssi: Value,
    #[serde(default)]
    ac_status: Value,
}

#[derive(Debug, Deserialize)]
struct DatapointValue {
    uid: u16,
    value: i64,
}

#[derive(Debug)]
struct LocalInner {
    config: LocalConfig,
    endpoint: String,
    http: Client,
    core: AdapterCore,
    session: Mutex<String>,
    device_id: Mutex<Option<String>>,
    datapoints: RwLock<BTreeMap<u16, Datapoint>>,
}

/// Adapter for the unit's local HTTP API.
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    inner: Arc<LocalInner>,
}

impl LocalAdapter {
    /// Creates an adapter with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: LocalConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ConnectionError::Http)?;
        Ok(Self::with_client(config, http))
    }

    /// Creates an adapter sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(config: LocalConfig, http: Client) -> Self {
        let core = AdapterCore::new(DeviceType::IntesisHomeLocal, config.fan_fallback());
        Self {
            inner: Arc::new(LocalInner {
                endpoint: config.endpoint(),
                config,
                http,
                core,
                session: Mutex::new(String::new()),
                device_id: Mutex::new(None),
                datapoints: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Returns the serial number of the unit, once known.
    #[must_use]
    pub fn device_id(&self) -> Option<String> {
        self.inner.device_id.lock().clone()
    }

    /// Returns the datapoints advertised by the unit, keyed by UID.
    #[must_use]
    pub fn datapoints(&self) -> BTreeMap<u16, Datapoint> {
        self.inner.datapoints.read().clone()
    }

    /// Returns true if the unit advertises the UID.
    #[must_use]
    pub fn has_datapoint(&self, uid: u16) -> bool {
        self.inner.datapoints.read().contains_key(&uid)
    }

    /// Reads one datapoint and stores the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the unit has no device id yet.
    pub async fn refresh_datapoint(&self, uid: u16) -> Result<AttributeValue> {
        let device_id = self.device_id().ok_or(Error::NotConnected)?;
        let data = self
            .inner
            .request(CMD_GET_DATAPOINT_VALUE, json!({"uid": uid}))
            .await?;
        let dpval: DatapointValue = serde_json::from_value(
            data.get("dpval")
                .cloned()
                .ok_or_else(|| ProtocolError::MissingField("dpval".to_string()))?,
        )
        .map_err(ProtocolError::Json)?;

        self.inner
            .core
            .devices()
            .set_attribute(&device_id, dpval.uid, dpval.value);
        Ok(codec::resolve_enum(dpval.uid, dpval.value))
    }

    fn datapoint_states(&self, uid: u16) -> Option<Vec<i64>> {
        self.inner
            .datapoints
            .read()
            .get(&uid)
            .map(|dp| dp.descr.states.clone())
    }
}

impl Protocol for LocalAdapter {
    fn core(&self) -> &AdapterCore {
        &self.inner.core
    }

    fn dialect(&self) -> Dialect {
        Dialect::Numeric
    }

    async fn connect(&self) -> Result<()> {
        let core = &self.inner.core;
        if !core.connection().begin_connect() {
            return Ok(());
        }
        core.tasks().reset();

        let result = async {
            self.inner.poll(false).await?;
            self.inner.refresh_values().await
        }
        .await;

        if let Err(e) = result {
            tracing::error!(host = %self.inner.config.host(), error = %e, "Local connect failed");
            if !matches!(e, Error::Authentication(_)) {
                core.connection().set_error(e.to_string());
            }
            core.teardown().await;
            return Err(e);
        }

        core.connection().mark_connected();
        tracing::info!(host = %self.inner.config.host(), "Connected to local API");
        core.tasks()
            .spawn("local-poll", poll_loop(Arc::clone(&self.inner)));
        Ok(())
    }

    async fn stop(&self) {
        tracing::debug!(host = %self.inner.config.host(), "Stopping local adapter");
        self.inner.core.teardown().await;
    }

    async fn poll_status(&self, notify: bool) -> Result<Option<String>> {
        self.inner.poll(notify).await?;
        Ok(None)
    }

    async fn send_command(&self, device_id: &str, command: &WireCommand) -> Result<()> {
        let WireCommand::Datapoint { uid, value } = command else {
            return Err(Error::Unsupported(format!("{command} on the local API")));
        };
        tracing::debug!(device_id, uid, value, "Setting datapoint");
        self.inner
            .request(CMD_SET_DATAPOINT_VALUE, json!({"uid": uid, "value": value}))
            .await?;
        Ok(())
    }

    fn mode_list(&self, _device_id: &str) -> Option<Vec<String>> {
        let states = self.datapoint_states(UID_MODE)?;
        Some(
            states
                .into_iter()
                .map(|code| codec::resolve_enum(UID_MODE, code).to_string())
                .collect(),
        )
    }

    fn fan_speeds(&self, _device_id: &str) -> Option<FanSpeeds> {
        let mut states = self.datapoint_states(UID_FAN_SPEED)?;
        states.sort_unstable();
        resolve_fan_map(fan_config_for_codes(&states), self.core().fan_fallback()).map(FanSpeeds::Coded)
    }

    fn has_vertical_swing(&self, _device_id: &str) -> bool {
        self.has_datapoint(UID_VVANE)
    }

    fn has_horizontal_swing(&self, _device_id: &str) -> bool {
        self.has_datapoint(UID_HVANE)
    }

    fn decode_outdoor_temperature(&self, raw: i64) -> f64 {
        decode_fixed_point(raw)
    }
}

impl LocalInner {
    async fn request_once(&self, command: &str, params: &Value) -> Result<std::result::Result<Value, ApiError>> {
        let mut data = Map::new();
        data.insert("sessionID".to_string(), Value::from(self.session.lock().clone()));
        if let Value::Object(params) = params {
            data.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        let payload = json!({"command": command, "data": data});

        tracing::debug!(command, endpoint = %self.endpoint, "Local API request");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(ConnectionError::Http)?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(ConnectionError::Status(response.status().as_u16()).into());
        }

        let body = response.text().await.map_err(ConnectionError::Http)?;
        let parsed: LocalResponse = serde_json::from_str(&body).map_err(ProtocolError::Json)?;
        self.core.touch();

        if parsed.success {
            return Ok(Ok(parsed.data));
        }
        Ok(Err(parsed.error.unwrap_or(ApiError {
            code: 0,
            message: "request failed without an error object".to_string(),
        })))
    }

    /// Sends a request, re-authenticating once on session expiry.
    async fn request(&self, command: &str, params: Value) -> Result<Value> {
        let mut reauthenticated = false;
        loop {
            match self.request_once(command, &params).await? {
                Ok(data) => {
                    self.core.connection().reset_retries();
                    return Ok(data);
                }
                Err(error) if SESSION_ERROR_CODES.contains(&error.code) => {
                    if reauthenticated {
                        tracing::error!(command, code = error.code, "Session rejected after re-authentication");
                        return Err(Error::Authentication(error.message));
                    }
                    tracing::debug!(command, code = error.code, "Session expired, re-authenticating");
                    reauthenticated = true;
                    self.core.connection().record_retry();
                    self.session.lock().clear();
                    self.authenticate().await?;
                }
                Err(error) => {
                    return Err(ProtocolError::Api {
                        code: error.code,
                        message: error.message,
                    }
                    .into());
                }
            }
        }
    }

    async fn authenticate(&self) -> Result<()> {
        let params = json!({
            "username": self.config.username(),
            "password": self.config.password(),
        });
        let data = match self.request_once(CMD_LOGIN, &params).await? {
            Ok(data) => data,
            Err(error) if error.code == BAD_CREDENTIALS => {
                self.core.connection().set_error(error.message.clone());
                return Err(Error::Authentication(error.message));
            }
            Err(error) => {
                return Err(ProtocolError::Api {
                    code: error.code,
                    message: error.message,
                }
                .into());
            }
        };

        let session = data
            .pointer("/id/sessionID")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::MissingField("id.sessionID".to_string()))?;
        *self.session.lock() = session.to_string();
        tracing::debug!(host = %self.config.host(), "Local session established");
        Ok(())
    }

    /// Logs in and reloads identity and datapoint metadata.
    async fn poll(&self, notify: bool) -> Result<()> {
        self.authenticate().await?;

        let data = self.request(CMD_GET_INFO, json!({})).await?;
        let info: DeviceInfo = serde_json::from_value(
            data.get("info")
                .cloned()
                .ok_or_else(|| ProtocolError::MissingField("info".to_string()))?,
        )
        .map_err(ProtocolError::Json)?;

        let device_id = info.sn.clone();
        self.core.set_identity(
            info.sn.to_lowercase(),
            format!("{} ({})", info.device_model, info.own_ssid),
        );
        *self.device_id.lock() = Some(device_id.clone());

        let devices = self.core.devices();
        devices.merge(
            &device_id,
            [
                ("name".to_string(), AttributeValue::from(info.own_ssid)),
                ("widgets".to_string(), AttributeValue::List(Vec::new())),
                ("model".to_string(), AttributeValue::from(info.device_model)),
            ],
        );

        self.load_datapoints(&device_id).await?;

        devices.set_named(&device_id, "ac_status", json_attribute(&info.ac_status));
        if !info.rssi.is_null() {
            devices.set_named(&device_id, "rssi", json_attribute(&info.rssi));
        }

        if notify {
            self.core.notify(Some(&device_id));
        }
        Ok(())
    }

    async fn load_datapoints(&self, device_id: &str) -> Result<()> {
        let data = self.request(CMD_GET_AVAILABLE_DATAPOINTS, json!({})).await?;
        let list = data
            .pointer("/dp/datapoints")
            .cloned()
            .ok_or_else(|| ProtocolError::MissingField("dp.datapoints".to_string()))?;
        let datapoints: Vec<Datapoint> = serde_json::from_value(list).map_err(ProtocolError::Json)?;
        tracing::debug!(device_id, count = datapoints.len(), "Datapoints loaded");

        let devices = self.core.devices();
        let mut table = self.datapoints.write();
        table.clear();
        for datapoint in datapoints {
            let name = codec::attribute_name(datapoint.uid);
            if devices.attribute(device_id, &name).is_none() {
                devices.set_named(device_id, name.into_owned(), AttributeValue::Null);
            }
            table.insert(datapoint.uid, datapoint);
        }
        Ok(())
    }

    /// Reads every datapoint value and fires one notification.
    async fn refresh_values(&self) -> Result<()> {
        let device_id = self.device_id.lock().clone().ok_or(Error::NotConnected)?;
        let data = self
            .request(CMD_GET_DATAPOINT_VALUE, json!({"uid": "all"}))
            .await?;
        let values = data
            .get("dpval")
            .cloned()
            .ok_or_else(|| ProtocolError::MissingField("dpval".to_string()))?;
        let values: Vec<DatapointValue> = serde_json::from_value(values).map_err(ProtocolError::Json)?;

        let devices = self.core.devices();
        let mut changed = 0_usize;
        for dp in &values {
            if devices.set_attribute(&device_id, dp.uid, dp.value) {
                changed += 1;
            }
        }
        tracing::debug!(device_id = %device_id, changed, "Datapoint values refreshed");

        self.core.notify(Some(&device_id));
        Ok(())
    }
}

async fn poll_loop(inner: Arc<LocalInner>) {
    loop {
        tokio::time::sleep(inner.config.scan_interval()).await;
        match inner.refresh_values().await {
            Ok(()) => {}
            Err(e @ (Error::Connection(_) | Error::Authentication(_))) => {
                inner.core.connection_lost(&e.to_string());
                return;
            }
            Err(e) => tracing::warn!(error = %e, "Local refresh failed"),
        }
    }
}

impl std::fmt::Display for Datapoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", codec::attribute_name(self.uid), self.uid)
    }
}
