// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller configuration.
//!
//! One builder per protocol, selected through [`ControllerConfig`]. Every
//! type derives serde so a host application can load it from its own
//! configuration file.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use intesis_lib::config::{BoxConfig, CloudConfig, ControllerConfig, LocalConfig};
//! use intesis_lib::types::DeviceType;
//!
//! let cloud = CloudConfig::new("user@example.com", "secret")
//!     .with_device_type(DeviceType::Airconwithme)
//!     .with_timeout(Duration::from_secs(5));
//! assert_eq!(cloud.api_version(), Some("1.6.2"));
//!
//! let local = LocalConfig::new("192.168.1.40", "admin", "admin");
//! assert_eq!(local.endpoint(), "http://192.168.1.40/api.cgi");
//!
//! let config: ControllerConfig = BoxConfig::new("192.168.1.41").into();
//! assert_eq!(config.device_type(), DeviceType::IntesisBox);
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use crate::codec::FanMapFallback;
use crate::connection::{KeepalivePolicy, ReconnectionPolicy};
use crate::types::DeviceType;

fn default_cloud_type() -> DeviceType {
    DeviceType::IntesisHome
}

fn default_timeout() -> Duration {
    CloudConfig::DEFAULT_TIMEOUT
}

fn default_handshake_timeout() -> Duration {
    CloudConfig::DEFAULT_HANDSHAKE_TIMEOUT
}

fn default_cloud_keepalive() -> KeepalivePolicy {
    KeepalivePolicy::LogOnly(CloudConfig::DEFAULT_KEEPALIVE_INTERVAL)
}

fn default_scan_interval() -> Duration {
    LocalConfig::DEFAULT_SCAN_INTERVAL
}

fn default_box_port() -> u16 {
    BoxConfig::DEFAULT_PORT
}

fn default_command_timeout() -> Duration {
    BoxConfig::DEFAULT_COMMAND_TIMEOUT
}

fn default_init_timeout() -> Duration {
    BoxConfig::DEFAULT_INIT_TIMEOUT
}

fn default_box_keepalive() -> KeepalivePolicy {
    KeepalivePolicy::LogOnly(BoxConfig::DEFAULT_KEEPALIVE_INTERVAL)
}

// ============================================================================
// CloudConfig
// ============================================================================

/// Configuration for a cloud account (IntesisHome, airconwithme, anywair).
#[derive(Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    username: String,
    password: String,
    #[serde(default = "default_cloud_type")]
    device_type: DeviceType,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default = "default_timeout")]
    timeout: Duration,
    #[serde(default = "default_handshake_timeout")]
    handshake_timeout: Duration,
    #[serde(default)]
    reconnection: ReconnectionPolicy,
    #[serde(default = "default_cloud_keepalive")]
    keepalive: KeepalivePolicy,
    #[serde(default)]
    fan_fallback: FanMapFallback,
}

impl CloudConfig {
    /// Default HTTP request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default bound on the relay `connect_rsp`.
    pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
    /// Default keepalive interval.
    pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(240);

    /// Creates a configuration for the IntesisHome cloud.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            device_type: default_cloud_type(),
            api_url: None,
            timeout: Self::DEFAULT_TIMEOUT,
            handshake_timeout: Self::DEFAULT_HANDSHAKE_TIMEOUT,
            reconnection: ReconnectionPolicy::default(),
            keepalive: default_cloud_keepalive(),
            fan_fallback: FanMapFallback::default(),
        }
    }

    /// Selects the cloud brand.
    #[must_use]
    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Overrides the handshake endpoint.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the HTTP and socket connect timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how long `connect` waits for the relay to accept the token.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the token-fetch backoff.
    #[must_use]
    pub fn with_reconnection(mut self, policy: ReconnectionPolicy) -> Self {
        self.reconnection = policy;
        self
    }

    /// Sets the keepalive policy.
    #[must_use]
    pub fn with_keepalive(mut self, policy: KeepalivePolicy) -> Self {
        self.keepalive = policy;
        self
    }

    /// Sets the fan table fallback.
    #[must_use]
    pub fn with_fan_fallback(mut self, fallback: FanMapFallback) -> Self {
        self.fan_fallback = fallback;
        self
    }

    /// Returns the account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Returns the cloud brand.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Returns the handshake endpoint.
    #[must_use]
    pub fn api_url(&self) -> Option<&str> {
        self.api_url.as_deref().or(self.device_type.api_url())
    }

    /// Returns the API version sent with the handshake.
    #[must_use]
    pub fn api_version(&self) -> Option<&'static str> {
        self.device_type.api_version()
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the handshake timeout.
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Returns the reconnection policy.
    #[must_use]
    pub fn reconnection(&self) -> ReconnectionPolicy {
        self.reconnection
    }

    /// Returns the keepalive policy.
    #[must_use]
    pub fn keepalive(&self) -> KeepalivePolicy {
        self.keepalive
    }

    /// Returns the fan table fallback.
    #[must_use]
    pub fn fan_fallback(&self) -> FanMapFallback {
        self.fan_fallback
    }
}

impl fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("device_type", &self.device_type)
            .field("api_url", &self.api_url())
            .field("timeout", &self.timeout)
            .field("keepalive", &self.keepalive)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// LocalConfig
// ============================================================================

/// Configuration for a unit reachable through its local `api.cgi`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    host: String,
    username: String,
    password: String,
    #[serde(default = "default_scan_interval")]
    scan_interval: Duration,
    #[serde(default = "default_timeout")]
    timeout: Duration,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    fan_fallback: FanMapFallback,
}

impl LocalConfig {
    /// Default interval between value refreshes.
    pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5);
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for the unit at `host`.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            scan_interval: Self::DEFAULT_SCAN_INTERVAL,
            timeout: Self::DEFAULT_TIMEOUT,
            base_url: None,
            fan_fallback: FanMapFallback::default(),
        }
    }

    /// Sets the interval between value refreshes.
    #[must_use]
    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides `http://<host>` as the base of the API URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the fan table fallback.
    #[must_use]
    pub fn with_fan_fallback(mut self, fallback: FanMapFallback) -> Self {
        self.fan_fallback = fallback;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Returns the refresh interval.
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        self.scan_interval
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the fan table fallback.
    #[must_use]
    pub fn fan_fallback(&self) -> FanMapFallback {
        self.fan_fallback
    }

    /// Returns the full API URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.host));
        format!("{}/api.cgi", base.trim_end_matches('/'))
    }
}

impl fmt::Debug for LocalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("scan_interval", &self.scan_interval)
            .field("endpoint", &self.endpoint())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BoxConfig
// ============================================================================

/// Configuration for an IntesisBox speaking the ASCII protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxConfig {
    host: String,
    #[serde(default = "default_box_port")]
    port: u16,
    #[serde(default = "default_timeout")]
    connect_timeout: Duration,
    #[serde(default = "default_command_timeout")]
    command_timeout: Duration,
    #[serde(default = "default_init_timeout")]
    init_timeout: Duration,
    #[serde(default = "default_box_keepalive")]
    keepalive: KeepalivePolicy,
}

impl BoxConfig {
    /// Default TCP port.
    pub const DEFAULT_PORT: u16 = 3310;
    /// Default socket connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default wait for a command's response.
    pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default bound on the startup sequence.
    pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(60);
    /// Default keepalive interval.
    pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

    /// Creates a configuration for the box at `host`.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            command_timeout: Self::DEFAULT_COMMAND_TIMEOUT,
            init_timeout: Self::DEFAULT_INIT_TIMEOUT,
            keepalive: default_box_keepalive(),
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the socket connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the wait for each command's response.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the bound on the startup sequence.
    #[must_use]
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Sets the keepalive policy.
    #[must_use]
    pub fn with_keepalive(mut self, policy: KeepalivePolicy) -> Self {
        self.keepalive = policy;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the command timeout.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Returns the startup bound.
    #[must_use]
    pub fn init_timeout(&self) -> Duration {
        self.init_timeout
    }

    /// Returns the keepalive policy.
    #[must_use]
    pub fn keepalive(&self) -> KeepalivePolicy {
        self.keepalive
    }
}

// ============================================================================
// ControllerConfig
// ============================================================================

/// Selects the protocol adapter a controller is built with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum ControllerConfig {
    /// Cloud relay.
    Cloud(CloudConfig),
    /// Local HTTP API.
    Local(LocalConfig),
    /// IntesisBox ASCII protocol.
    Box(BoxConfig),
}

impl ControllerConfig {
    /// Returns the device type the configuration targets.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        match self {
            Self::Cloud(config) => config.device_type(),
            Self::Local(_) => DeviceType::IntesisHomeLocal,
            Self::Box(_) => DeviceType::IntesisBox,
        }
    }
}

impl From<CloudConfig> for ControllerConfig {
    fn from(config: CloudConfig) -> Self {
        Self::Cloud(config)
    }
}

impl From<LocalConfig> for ControllerConfig {
    fn from(config: LocalConfig) -> Self {
        Self::Local(config)
    }
}

impl From<BoxConfig> for ControllerConfig {
    fn from(config: BoxConfig) -> Self {
        Self::Box(config)
    }
}
