// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for controller state changes.
//!
//! The [`Notifier`] is the single fan-out point used by every adapter. It
//! invokes the registered callbacks and publishes a [`ControllerEvent`] on a
//! tokio broadcast channel for async consumers.
//!
//! # Examples
//!
//! ```
//! use intesis_lib::event::{ControllerEvent, Notifier};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let notifier = Notifier::new();
//! let mut rx = notifier.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = rx.recv().await {
//!         if let ControllerEvent::Updated { device_id } = event {
//!             println!("updated: {device_id:?}");
//!         }
//!     }
//! });
//! # }
//! ```

mod controller_event;
mod notifier;

pub use controller_event::ControllerEvent;
pub use notifier::Notifier;
