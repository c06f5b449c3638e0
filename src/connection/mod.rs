// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle.
//!
//! - [`ConnectionState`] and [`ConnectionTracker`] - per-adapter state machine
//! - [`TaskSupervisor`] - receive, keepalive, send-queue and poll tasks
//! - [`ReconnectionPolicy`], [`KeepalivePolicy`] - configurable policies

mod policy;
mod state;
mod tasks;

pub use policy::{KeepalivePolicy, ReconnectionPolicy};
pub use state::{ConnectionState, ConnectionTracker};
pub use tasks::TaskSupervisor;
