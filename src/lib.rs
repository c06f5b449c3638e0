// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `intesis_lib` - A Rust library to control Intesis HVAC gateways.
//!
//! This library provides async APIs to read and drive air conditioners and
//! heat pumps behind Intesis gateways, whichever way the gateway is reached.
//!
//! # Supported Transports
//!
//! - **Cloud relay**: IntesisHome, airconwithme and anywair accounts. An
//!   HTTP handshake returns a token for a persistent push connection.
//! - **Local API**: the HTTP/JSON `api.cgi` of IntesisHome units on the LAN,
//!   polled at a fixed interval.
//! - **IntesisBox**: the ASCII line protocol on TCP port 3310.
//!
//! All three feed the same device table, keyed by device id and attribute
//! name, and accept the same setters.
//!
//! # Quick Start
//!
//! ## Cloud Account
//!
//! ```no_run
//! use intesis_lib::Controller;
//! use intesis_lib::config::CloudConfig;
//!
//! #[tokio::main]
//! async fn main() -> intesis_lib::Result<()> {
//!     let controller = Controller::new(CloudConfig::new("user@example.com", "secret"))?;
//!     controller.connect().await?;
//!
//!     for (device_id, attrs) in controller.get_devices() {
//!         println!("{device_id}: {:?} {:?}", attrs.get("name"), controller.get_temperature(&device_id));
//!     }
//!
//!     controller.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## IntesisBox
//!
//! ```no_run
//! use intesis_lib::Controller;
//! use intesis_lib::config::BoxConfig;
//!
//! #[tokio::main]
//! async fn main() -> intesis_lib::Result<()> {
//!     let controller = Controller::new(BoxConfig::new("192.168.1.50"))?;
//!     controller.connect().await?;
//!
//!     if let Some(device_id) = controller.get_devices().keys().next() {
//!         controller.set_power_on(device_id).await?;
//!         controller.set_temperature(device_id, 22.5).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Update Notifications
//!
//! ```no_run
//! use intesis_lib::Controller;
//! use intesis_lib::config::LocalConfig;
//!
//! #[tokio::main]
//! async fn main() -> intesis_lib::Result<()> {
//!     let controller = Controller::new(LocalConfig::new("192.168.1.40", "admin", "admin"))?;
//!
//!     // Synchronous callbacks
//!     controller.add_update_callback(|device_id| {
//!         println!("updated: {device_id:?}");
//!     });
//!
//!     // Or an async stream of events
//!     let mut events = controller.subscribe_events();
//!     controller.connect().await?;
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod connection;
mod controller;
pub mod error;
pub mod event;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod types;

pub use command::{Command, Dialect};
pub use config::{BoxConfig, CloudConfig, ControllerConfig, FanMapFallback, LocalConfig};
pub use connection::{ConnectionState, KeepalivePolicy, ReconnectionPolicy};
pub use controller::Controller;
pub use error::{ConnectionError, Error, ProtocolError, Result, ValueError};
pub use event::ControllerEvent;
pub use state::{DeviceAttributes, DeviceTable};
pub use subscription::{CallbackRegistry, SubscriptionId};
pub use types::{AttributeValue, DeviceType, PowerState};
