// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the adapters and the public API.
//!
//! - [`AttributeValue`] - One entry of a device's attribute map
//! - [`PowerState`] - On/Off state of a unit
//! - [`DeviceType`] - Controller family selected at construction

mod device_type;
mod power;
mod value;

pub use device_type::DeviceType;
pub use power::PowerState;
pub use value::AttributeValue;
