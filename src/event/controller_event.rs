// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller event types.

use crate::connection::ConnectionState;

/// Events broadcast by a controller.
///
/// # Examples
///
/// ```
/// use intesis_lib::event::ControllerEvent;
///
/// let event = ControllerEvent::Updated { device_id: Some("42".to_string()) };
/// assert_eq!(event.device_id(), Some("42"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// State of one device (or of every device, when `None`) changed.
    Updated {
        /// The affected device, if the change is scoped to one.
        device_id: Option<String>,
    },

    /// The connection moved to a new state.
    ConnectionChanged {
        /// The new state.
        state: ConnectionState,
    },
}

impl ControllerEvent {
    /// Returns the device id carried by an update, if any.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Updated { device_id } => device_id.as_deref(),
            Self::ConnectionChanged { .. } => None,
        }
    }
}
