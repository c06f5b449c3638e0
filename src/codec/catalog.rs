// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed catalogs shared by the numeric protocols.
//!
//! Every table here is part of the wire contract of the cloud relay and the
//! local HTTP API. Entries are kept in ascending key order.

/// Value translation attached to a UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTable {
    /// Raw numeric value, stored untouched.
    Raw,
    /// Raw code to label.
    Labels(&'static [(i64, &'static str)]),
    /// Raw code to a number in another unit.
    Numbers(&'static [(i64, i64)]),
    /// The value is a configuration bitmask selecting one of [`FAN_MAPS`].
    FanMaps,
}

/// One UID binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidEntry {
    /// Numeric identifier on the wire.
    pub uid: u16,
    /// Canonical attribute name.
    pub name: &'static str,
    /// Translation applied when storing a raw value.
    pub values: ValueTable,
}

const fn raw(uid: u16, name: &'static str) -> UidEntry {
    UidEntry {
        uid,
        name,
        values: ValueTable::Raw,
    }
}

const fn labels(uid: u16, name: &'static str, table: &'static [(i64, &'static str)]) -> UidEntry {
    UidEntry {
        uid,
        name,
        values: ValueTable::Labels(table),
    }
}

const OFF_ON: &[(i64, &str)] = &[(0, "off"), (1, "on")];
const WORKING_MODES: &[(i64, &str)] = &[(0, "comfort"), (1, "eco"), (2, "powerful")];
const FLAG_85_170: &[(i64, &str)] = &[(85, "off"), (170, "on")];

const MODES: &[(i64, &str)] = &[
    (0, "auto"),
    (1, "heat"),
    (2, "dry"),
    (3, "fan"),
    (4, "cool"),
];

const VERTICAL_VANES: &[(i64, &str)] = &[
    (0, "auto/stop"),
    (1, "manual1"),
    (2, "manual2"),
    (3, "manual3"),
    (4, "manual4"),
    (5, "manual5"),
    (6, "manual6"),
    (7, "manual7"),
    (8, "manual8"),
    (9, "manual9"),
    (10, "swing"),
];

const HORIZONTAL_VANES: &[(i64, &str)] = &[
    (0, "auto/stop"),
    (1, "manual1"),
    (2, "manual2"),
    (3, "manual3"),
    (4, "manual4"),
    (5, "manual5"),
    (10, "swing"),
];

const OPERATING_MODES: &[(i64, &str)] = &[
    (0, "maintenance"),
    (1, "heat"),
    (2, "heat+tank"),
    (3, "tank"),
    (4, "cool+tank"),
    (5, "cool"),
    (6, "auto"),
    (7, "auto+tank"),
];

const HEAT_INTERVALS: &[(i64, i64)] = &[
    (1, 30),
    (2, 60),
    (3, 90),
    (4, 120),
    (5, 150),
    (6, 180),
    (7, 210),
    (8, 240),
    (9, 270),
    (10, 300),
    (11, 330),
    (12, 360),
    (13, 390),
    (14, 420),
    (15, 450),
    (16, 480),
    (17, 510),
    (18, 540),
    (19, 570),
    (20, 600),
];

const EXTERNAL_LED: &[(i64, &str)] = &[(0, "off"), (1, "on"), (2, "blinking only on change")];
const TEMP_LIMITATION: &[(i64, &str)] = &[(0, "off"), (2, "on")];

/// UID of the fan-speed configuration bitmask.
pub const UID_CONFIG_FAN_MAP: u16 = 67;

/// UID of the received signal strength report.
pub const UID_RSSI: u16 = 60002;

/// UID polled by the cloud keepalive (ambient temperature).
pub const UID_TEMPERATURE: u16 = 10;

/// The UID catalog, sorted by UID.
pub static UID_CATALOG: &[UidEntry] = &[
    labels(1, "power", OFF_ON),
    labels(2, "mode", MODES),
    raw(4, "fan_speed"),
    labels(5, "vvane", VERTICAL_VANES),
    labels(6, "hvane", HORIZONTAL_VANES),
    raw(9, "setpoint"),
    raw(10, "temperature"),
    raw(12, "remote_controller_lock"),
    raw(13, "working_hours"),
    raw(14, "alarm_status"),
    raw(15, "error_code"),
    labels(34, "quiet_mode", OFF_ON),
    raw(35, "setpoint_min"),
    raw(36, "setpoint_max"),
    raw(37, "outdoor_temp"),
    raw(38, "water_outlet_temperature"),
    raw(39, "water_inlet_temperature"),
    labels(42, "climate_working_mode", WORKING_MODES),
    labels(44, "tank_working_mode", WORKING_MODES),
    raw(45, "tank_water_temperature"),
    raw(46, "solar_status"),
    raw(48, "thermoshift_heat_eco"),
    raw(49, "thermoshift_cool_eco"),
    raw(50, "thermoshift_heat_powerful"),
    raw(51, "thermoshift_cool_powerful"),
    raw(52, "thermoshift_tank_eco"),
    raw(53, "thermoshift_tank_powerful"),
    raw(54, "error_reset"),
    raw(55, "heat_thermo_shift"),
    raw(56, "cool_water_setpoint_temperature"),
    raw(57, "tank_setpoint_temperature"),
    labels(58, "operating_mode", OPERATING_MODES),
    raw(60, "heat_8_10"),
    raw(61, "config_mode_map"),
    raw(62, "runtime_mode_restrictions"),
    raw(63, "config_horizontal_vanes"),
    raw(64, "config_vertical_vanes"),
    raw(65, "config_quiet"),
    raw(66, "config_confirm_off"),
    UidEntry {
        uid: UID_CONFIG_FAN_MAP,
        name: "config_fan_map",
        values: ValueTable::FanMaps,
    },
    raw(68, "instant_power_consumption"),
    raw(69, "accumulated_power_consumption"),
    raw(75, "config_operating_mode"),
    raw(77, "config_vanes_pulse"),
    raw(80, "aquarea_tank_consumption"),
    raw(81, "aquarea_cool_consumption"),
    raw(82, "aquarea_heat_consumption"),
    raw(83, "heat_high_water_set_temperature"),
    raw(84, "heating_off_temperature"),
    raw(87, "heater_setpoint_temperature"),
    raw(90, "water_target_temperature"),
    UidEntry {
        uid: 95,
        name: "heat_interval",
        values: ValueTable::Numbers(HEAT_INTERVALS),
    },
    raw(107, "aquarea_working_hours"),
    labels(123, "ext_thermo_control", FLAG_85_170),
    labels(124, "tank_present", FLAG_85_170),
    labels(125, "solar_priority", FLAG_85_170),
    raw(134, "heat_low_outdoor_set_temperature"),
    raw(135, "heat_high_outdoor_set_temperature"),
    raw(136, "heat_low_water_set_temperature"),
    raw(137, "farenheit_type"),
    raw(140, "extremes_protection_status"),
    raw(144, "error_code"),
    raw(148, "extremes_protection"),
    raw(149, "binary_input"),
    raw(153, "config_binary_input"),
    raw(168, "uid_binary_input_on_off"),
    raw(169, "uid_binary_input_occupancy"),
    raw(170, "uid_binary_input_window"),
    raw(181, "mainenance_w_reset"),
    raw(182, "mainenance_wo_reset"),
    raw(183, "filter_clean"),
    raw(184, "filter_due_hours"),
    raw(185, "uid_185"),
    raw(186, "uid_186"),
    raw(191, "uid_binary_input_sleep_mode"),
    labels(50000, "external_led", EXTERNAL_LED),
    labels(50001, "internal_led", OFF_ON),
    raw(50002, "internal_temperature_offset"),
    labels(50003, "temp_limitation", TEMP_LIMITATION),
    raw(50004, "cool_temperature_min"),
    raw(50005, "cool_temperature_max"),
    raw(50006, "heat_temperature_min"),
    raw(50007, "heat_temperature_min"),
    raw(UID_RSSI, "rssi"),
];

/// Looks up a UID in the catalog.
#[must_use]
pub fn uid_entry(uid: u16) -> Option<&'static UidEntry> {
    UID_CATALOG
        .binary_search_by_key(&uid, |entry| entry.uid)
        .ok()
        .map(|idx| &UID_CATALOG[idx])
}

/// Fan-speed tables keyed by configuration bitmask.
///
/// Bit `n` of a configuration value is set when speed code `n` exists in the
/// table it selects.
pub static FAN_MAPS: &[(u16, &[(i64, &str)])] = &[
    (6, &[(1, "low"), (2, "high")]),
    (7, &[(0, "auto"), (1, "low"), (2, "high")]),
    (14, &[(1, "low"), (2, "medium"), (3, "high")]),
    (15, &[(0, "auto"), (1, "low"), (2, "medium"), (3, "high")]),
    (30, &[(1, "quiet"), (2, "low"), (3, "medium"), (4, "high")]),
    (
        31,
        &[(0, "auto"), (1, "quiet"), (2, "low"), (3, "medium"), (4, "high")],
    ),
    (
        62,
        &[(1, "quiet"), (2, "low"), (3, "medium"), (4, "high"), (5, "max")],
    ),
    (
        63,
        &[
            (0, "auto"),
            (1, "quiet"),
            (2, "low"),
            (3, "medium"),
            (4, "high"),
            (5, "max"),
        ],
    ),
    (
        126,
        &[
            (1, "speed 1"),
            (2, "speed 2"),
            (3, "speed 3"),
            (4, "speed 4"),
            (5, "speed 5"),
            (6, "speed 6"),
        ],
    ),
    (
        127,
        &[
            (0, "auto"),
            (1, "speed 1"),
            (2, "speed 2"),
            (3, "speed 3"),
            (4, "speed 4"),
            (5, "speed 5"),
            (6, "speed 6"),
        ],
    ),
];

/// Mode bits of `config_mode_map`, ascending.
pub static CONFIG_MODE_BITS: &[(i64, &str)] = &[
    (1, "auto"),
    (2, "heat"),
    (4, "dry"),
    (8, "fan"),
    (16, "cool"),
];

/// Mode bits of `config_operating_mode` (heat pumps), ascending.
pub static OPERATING_MODE_BITS: &[(i64, &str)] = &[
    (1, "heat"),
    (2, "heat+tank"),
    (4, "tank"),
    (8, "cool+tank"),
    (16, "cool"),
    (32, "auto"),
    (64, "auto+tank"),
];

/// A writable setting of the numeric protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Logical setting name.
    pub name: &'static str,
    /// UID written on the wire.
    pub uid: u16,
    /// Label to raw value; empty when the setting takes a number.
    pub values: &'static [(&'static str, i64)],
    /// Inclusive range of accepted numbers, before ×10 scaling.
    pub range: Option<(i64, i64)>,
}

impl CommandSpec {
    /// Returns the raw value for a label.
    #[must_use]
    pub fn code_for(&self, label: &str) -> Option<i64> {
        self.values
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, code)| *code)
    }
}

const fn setting(name: &'static str, uid: u16, values: &'static [(&'static str, i64)]) -> CommandSpec {
    CommandSpec {
        name,
        uid,
        values,
        range: None,
    }
}

const fn ranged(name: &'static str, uid: u16, min: i64, max: i64) -> CommandSpec {
    CommandSpec {
        name,
        uid,
        values: &[],
        range: Some((min, max)),
    }
}

const VANE_CODES: &[(&str, i64)] = &[
    ("auto/stop", 0),
    ("swing", 10),
    ("manual1", 1),
    ("manual2", 2),
    ("manual3", 3),
    ("manual4", 4),
    ("manual5", 5),
];

const WORKING_MODE_CODES: &[(&str, i64)] = &[("comfort", 0), ("eco", 1), ("powerful", 2)];

/// Writable settings of the numeric protocols.
pub static COMMANDS: &[CommandSpec] = &[
    setting("power", 1, &[("off", 0), ("on", 1)]),
    setting(
        "mode",
        2,
        &[("auto", 0), ("heat", 1), ("dry", 2), ("fan", 3), ("cool", 4)],
    ),
    setting(
        "operating_mode",
        58,
        &[
            ("heat", 1),
            ("heat+tank", 2),
            ("tank", 3),
            ("cool+tank", 4),
            ("cool", 5),
            ("auto", 6),
            ("auto+tank", 7),
        ],
    ),
    setting("climate_working_mode", 42, WORKING_MODE_CODES),
    setting("fan_speed", 4, &[]),
    setting("vvane", 5, VANE_CODES),
    setting("hvane", 6, VANE_CODES),
    setting("setpoint", 9, &[]),
    setting("quiet", 34, &[("off", 0), ("on", 1)]),
    setting("tank", 44, WORKING_MODE_CODES),
    setting("reset_error", 54, &[("on", 1)]),
    setting("tank_setpoint_temperature", 57, &[]),
    ranged("thermoshift_heat_eco", 48, 0, 5),
    ranged("thermoshift_cool_eco", 49, 0, 5),
    ranged("thermoshift_heat_powerful", 50, 0, 5),
    ranged("thermoshift_cool_powerful", 51, 0, 5),
    ranged("thermoshift_tank_eco", 52, 0, 10),
    ranged("thermoshift_tank_powerful", 53, 0, 10),
    ranged("heat_thermo_shift", 55, -5, 5),
    setting("cool_water_setpoint_temperature", 56, &[]),
    ranged("heat_high_water_set_temperature", 83, 25, 55),
    ranged("heat_low_outdoor_set_temperature", 134, -15, 15),
    ranged("heat_high_outdoor_set_temperature", 135, -15, 15),
    ranged("heat_low_water_set_temperature", 136, 25, 55),
    setting("resync", 143, &[("on", 1)]),
    setting("remote_control_block", 12, &[("on", 2), ("off", 0)]),
];

/// Looks up a writable setting by name.
#[must_use]
pub fn command_spec(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// Heat-pump fault codes: raw value, remote code, description.
pub static ERROR_CATALOG: &[(i64, &str, &str)] = &[
    (0, "H00", "No abnormality detected"),
    (2, "H91", "Tank booster heater OLP abnormality"),
    (13, "F38", "Unknown"),
    (20, "H90", "Indoor / outdoor abnormal communication"),
    (36, "H99", "Indoor heat exchanger freeze prevention"),
    (38, "H72", "Tank temperature sensor abnormality"),
    (42, "H12", "Indoor / outdoor capacity unmatched"),
    (156, "H76", "Indoor - control panel communication abnormality"),
    (193, "F12", "Pressure switch activate"),
    (195, "F14", "Outdoor compressor abnormal rotation"),
    (196, "F15", "Outdoor fan motor lock abnormality"),
    (197, "F16", "Total running current protection"),
    (200, "F20", "Outdoor compressor overheating protection"),
    (202, "F22", "IPM overheating protection"),
    (203, "F23", "Outdoor DC peak detection"),
    (204, "F24", "Refrigerant cycle abnormality"),
    (205, "F27", "Pressure switch abnormality"),
    (207, "F46", "Outdoor current transformer open circuit"),
    (208, "F36", "Outdoor air temperature sensor abnormality"),
    (209, "F37", "Indoor water inlet temperature sensor abnormality"),
    (210, "F45", "Indoor water outlet temperature sensor abnormality"),
    (212, "F40", "Outdoor discharge pipe temperature sensor abnormality"),
    (214, "F41", "PFC control"),
    (215, "F42", "Outdoor heat exchanger temperature sensor abnormality"),
    (216, "F43", "Outdoor defrost temperature sensor abnormality"),
    (222, "H95", "Indoor / outdoor wrong connection"),
    (224, "H15", "Outdoor compressor temperature sensor abnormality"),
    (225, "H23", "Indoor refrigerant liquid temperature sensor abnormality"),
    (226, "H24", "Unknown"),
    (227, "H38", "Indoor / outdoor mismatch"),
    (228, "H61", "Unknown"),
    (229, "H62", "Water flow switch abnormality"),
    (230, "H63", "Refrigerant low pressure abnormality"),
    (231, "H64", "Refrigerant high pressure abnormality"),
    (232, "H42", "Compressor low pressure abnormality"),
    (233, "H98", "Outdoor high pressure overload protection"),
    (234, "F25", "Cooling / heating cycle changeover abnormality"),
    (235, "F95", "Cooling high pressure overload protection"),
    (236, "H70", "Indoor backup heater OLP abnormality"),
    (237, "F48", "Outdoor EVA outlet temperature sensor abnormality"),
    (238, "F49", "Outdoor bypass outlet temperature sensor abnormality"),
    (65535, "N/A", "Communication error between PA-IntesisHome"),
];

/// Looks up a fault code.
#[must_use]
pub fn error_entry(code: i64) -> Option<(&'static str, &'static str)> {
    ERROR_CATALOG
        .binary_search_by_key(&code, |(raw, _, _)| *raw)
        .ok()
        .map(|idx| (ERROR_CATALOG[idx].1, ERROR_CATALOG[idx].2))
}
