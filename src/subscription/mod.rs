// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback subscriptions for state updates.
//!
//! Every adapter owns one [`CallbackRegistry`]. Whenever the receive or poll
//! task commits a change to the state table it dispatches the affected
//! device id (or `None` for a global refresh, such as a lost connection).
//!
//! ```no_run
//! use intesis_lib::{Controller, LocalConfig};
//!
//! # async fn example() -> intesis_lib::Result<()> {
//! let controller = Controller::new(LocalConfig::new("192.168.1.40", "admin", "admin"))?;
//!
//! let sub_id = controller.add_update_callback(|device_id| {
//!     println!("update for {device_id:?}");
//! });
//!
//! controller.connect().await?;
//!
//! // Later, unsubscribe
//! controller.remove_update_callback(sub_id);
//! # Ok(())
//! # }
//! ```

mod callback;

pub use callback::{CallbackRegistry, SubscriptionId};
