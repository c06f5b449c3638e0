// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state table.
//!
//! [`DeviceTable`] holds one [`DeviceAttributes`] map per device. Adapters
//! write to it from their receive or poll task; everything else reads
//! snapshots.
//!
//! # Examples
//!
//! ```
//! use intesis_lib::state::DeviceTable;
//!
//! let table = DeviceTable::new();
//! for (device_id, attrs) in table.all() {
//!     println!("{device_id}: {} attributes", attrs.len());
//! }
//! ```

mod attributes;
mod device_table;

pub use attributes::DeviceAttributes;
pub use device_table::DeviceTable;
