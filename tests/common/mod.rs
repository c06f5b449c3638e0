// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared fixtures: canned API payloads, an IntesisBox emulator and a fake
//! cloud relay.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const MOCK_HOST: &str = "1.1.1.1";
pub const MOCK_USER: &str = "admin";
pub const MOCK_PASS: &str = "password";
pub const MOCK_DEVICE_ID: &str = "mock_dev_id";
pub const MOCK_SESSION: &str = "lf1XbgHmapgwEjvpc2m8joB4KmREqkm";
pub const MOCK_TOKEN: u64 = 1_234_567_890;

pub const MOCK_VAL_RUN_HOURS: i64 = 567;

/// UID/value pairs shared by the local and cloud fixtures.
pub const MOCK_VALUES: &[(u16, i64)] = &[
    (1, 0),
    (2, 4),
    (4, 1),
    (5, 2),
    (6, 3),
    (9, 210),
    (10, 240),
    (12, 0),
    (13, MOCK_VAL_RUN_HOURS),
    (14, 0),
    (15, 0),
    (35, 180),
    (36, 300),
    (37, 260),
    (42, 1),
    (181, 0),
    (182, 0),
    (183, 0),
    (184, 0),
];

/// Extra status entries only the cloud reports.
pub const CLOUD_EXTRA_VALUES: &[(u32, i64)] = &[
    (34, 0),
    (54, 0),
    (61, 63),
    (62, 0),
    (63, 1054),
    (64, 1054),
    (65, 0),
    (66, 0),
    (67, 30),
    (50000, 1),
    (50001, 0),
    (50002, 0),
    (50003, 0),
    (50004, 240),
    (50005, 280),
    (50006, 190),
    (50007, 230),
    (50008, 1),
    (50009, 3),
    (50010, 255),
    (60002, 204),
];

// ============================================================================
// Local API payloads
// ============================================================================

pub fn local_login_ok() -> Value {
    json!({"success": true, "data": {"id": {"sessionID": MOCK_SESSION}}})
}

pub fn local_error(code: i64, message: &str) -> Value {
    json!({"success": false, "data": null, "error": {"code": code, "message": message}})
}

pub fn local_info() -> Value {
    json!({
        "success": true,
        "data": {
            "info": {
                "wlanSTAMAC": "CC:3F:1D:12:34:56",
                "ownSSID": "DEVICE_123456",
                "fwVersion": "1.4.7; 1.3.3; 1.5; 1.0.1.0",
                "acStatus": 0,
                "rssi": -53,
                "deviceModel": "MH-AC-WIFI-1",
                "sn": MOCK_DEVICE_ID,
                "lastError": 0
            }
        }
    })
}

pub fn local_datapoints() -> Value {
    let states = |states: &[i64]| json!({"numStates": states.len(), "states": states});
    let range = |min: i64, max: i64| json!({"minValue": min, "maxValue": max});
    let empty = json!({});

    let datapoints = vec![
        json!({"uid": 1, "rw": "rw", "type": 1, "descr": states(&[0, 1])}),
        json!({"uid": 2, "rw": "rw", "type": 1, "descr": states(&[0, 1, 2, 3, 4])}),
        json!({"uid": 4, "rw": "rw", "type": 1, "descr": states(&[1, 2, 3, 4])}),
        json!({"uid": 5, "rw": "rw", "type": 1, "descr": states(&[1, 2, 3, 4, 10])}),
        json!({"uid": 6, "rw": "rw", "type": 1, "descr": states(&[1, 2, 3, 4, 10])}),
        json!({"uid": 9, "rw": "rw", "type": 2, "descr": range(180, 300)}),
        json!({"uid": 10, "rw": "r", "type": 2, "descr": range(-100, 500)}),
        json!({"uid": 12, "rw": "rw", "type": 1, "descr": states(&[0, 1])}),
        json!({"uid": 13, "rw": "rw", "type": 0, "descr": empty}),
        json!({"uid": 14, "rw": "r", "type": 1, "descr": states(&[0, 1])}),
        json!({"uid": 15, "rw": "r", "type": 3, "descr": empty}),
        json!({"uid": 35, "rw": "r", "type": 2, "descr": range(180, 300)}),
        json!({"uid": 36, "rw": "r", "type": 2, "descr": range(180, 300)}),
        json!({"uid": 37, "rw": "r", "type": 2, "descr": range(-250, 430)}),
        json!({"uid": 42, "rw": "r", "type": 1, "descr": states(&[0, 1, 2])}),
        json!({"uid": 181, "rw": "rw", "type": 0, "descr": empty}),
        json!({"uid": 182, "rw": "rw", "type": 0, "descr": empty}),
        json!({"uid": 183, "rw": "rw", "type": 0, "descr": empty}),
        json!({"uid": 184, "rw": "rw", "type": 0, "descr": empty}),
    ];
    json!({"success": true, "data": {"dp": {"datapoints": datapoints}}})
}

pub fn local_values() -> Value {
    let dpval: Vec<Value> = MOCK_VALUES
        .iter()
        .map(|(uid, value)| json!({"uid": uid, "value": value, "status": 0}))
        .collect();
    json!({"success": true, "data": {"dpval": dpval}})
}

pub fn local_set_ok() -> Value {
    json!({"success": true, "data": null})
}

// ============================================================================
// Cloud API payloads
// ============================================================================

pub fn cloud_status(relay_port: u16) -> Value {
    let status: Vec<Value> = MOCK_VALUES
        .iter()
        .map(|(uid, value)| (u32::from(*uid), *value))
        .chain(CLOUD_EXTRA_VALUES.iter().copied())
        .map(|(uid, value)| json!({"deviceId": MOCK_DEVICE_ID, "uid": uid, "value": value}))
        .collect();

    json!({
        "status": {
            "hash": "7398e787639ab87c431f77b96e4a1590f16a4384",
            "status": status
        },
        "config": {
            "token": MOCK_TOKEN,
            "pushToken": "channel-0123456789",
            "serverIP": "127.0.0.1",
            "serverPort": relay_port,
            "inst": [{
                "id": 1,
                "order": 1,
                "name": "First installation",
                "devices": [{
                    "id": MOCK_DEVICE_ID,
                    "name": "MOCK DEVICE",
                    "familyId": 4864,
                    "modelId": 550,
                    "widgets": [15, 3, 5, 7, 17, 9, 13]
                }]
            }]
        }
    })
}

// ============================================================================
// Helpers
// ============================================================================

/// Polls `condition` until it holds or two seconds pass.
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ============================================================================
// IntesisBox emulator
// ============================================================================

pub const BOX_ID: &str = "IS-IR-WMP-1,001DC9A2C911,192.168.100.246,ASCII,v0.0.1,-44";
pub const BOX_DEVICE_ID: &str = "001DC9A2C911";

const BOX_READ_WRITE: &[&str] = &["ONOFF", "MODE", "SETPTEMP", "VANELR", "VANEUD", "FANSP"];

const BOX_LIMITS: &[(&str, &str)] = &[
    ("SETPTEMP", "[180,300]"),
    ("FANSP", "[AUTO,1,2,3,4]"),
    ("MODE", "[AUTO,HEAT,DRY,FAN,COOL]"),
    ("VANEUD", "[AUTO,1,2,3,SWING]"),
    ("VANELR", "[AUTO,1,2,3,SWING]"),
];

/// A single-unit IntesisBox speaking the ASCII protocol on a local port.
pub struct BoxEmulator {
    pub port: u16,
    values: Arc<Mutex<BTreeMap<String, String>>>,
    requests: Arc<AtomicUsize>,
    connections: Arc<Mutex<Vec<JoinHandle<()>>>>,
    accept: JoinHandle<()>,
}

impl BoxEmulator {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let defaults = [
            ("MODE", "AUTO"),
            ("SETPTEMP", "210"),
            ("ONOFF", "ON"),
            ("FANSP", "AUTO"),
            ("AMBTEMP", "180"),
            ("VANEUD", "AUTO"),
            ("VANELR", "AUTO"),
            ("ERRSTATUS", "OK"),
            ("ERRCODE", ""),
        ];
        let values: Arc<Mutex<BTreeMap<String, String>>> = Arc::new(Mutex::new(
            defaults
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ));
        let requests = Arc::new(AtomicUsize::new(0));
        let connections = Arc::new(Mutex::new(Vec::new()));

        let accept = {
            let values = Arc::clone(&values);
            let requests = Arc::clone(&requests);
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let values = Arc::clone(&values);
                    let requests = Arc::clone(&requests);
                    let handle = tokio::spawn(async move {
                        let (reader, mut writer) = stream.into_split();
                        let mut reader = BufReader::new(reader);
                        let mut buf = Vec::new();
                        loop {
                            buf.clear();
                            match reader.read_until(b'\r', &mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(_) => {}
                            }
                            let line = String::from_utf8_lossy(&buf).trim().to_string();
                            requests.fetch_add(1, Ordering::SeqCst);
                            let reply = Self::answer(&values, &line);
                            if writer.write_all(reply.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                    });
                    connections.lock().push(handle);
                }
            })
        };

        Self {
            port,
            values,
            requests,
            connections,
            accept,
        }
    }

    fn answer(values: &Mutex<BTreeMap<String, String>>, line: &str) -> String {
        if line == "ID" {
            return format!("{BOX_ID}\r\n");
        }
        if let Some(function) = line.strip_prefix("LIMITS:") {
            return BOX_LIMITS
                .iter()
                .find(|(f, _)| *f == function)
                .map_or_else(
                    || "ERR\r\n".to_string(),
                    |(f, limits)| format!("LIMITS:{f},{limits}\r\n"),
                );
        }
        if line == "GET,1:*" {
            return values
                .lock()
                .iter()
                .map(|(f, v)| format!("CHN,1:{f},{v}\r\n"))
                .collect();
        }
        if let Some(function) = line.strip_prefix("GET,1:") {
            return values
                .lock()
                .get(function)
                .map_or_else(|| "ERR\r\n".to_string(), |v| format!("CHN,1:{function},{v}\r\n"));
        }
        if let Some(rest) = line.strip_prefix("SET,1:") {
            let Some((function, value)) = rest.split_once(',') else {
                return "ERR\r\n".to_string();
            };
            if !BOX_READ_WRITE.contains(&function) {
                return "ERR\r\n".to_string();
            }
            let mut values = values.lock();
            if values.get(function).map(String::as_str) == Some(value) {
                return "ACK\r\n".to_string();
            }
            values.insert(function.to_string(), value.to_string());
            return format!("ACK\r\nCHN,1:{function},{value}\r\n");
        }
        "ERR\r\n".to_string()
    }

    /// Returns the emulated value of a function.
    pub fn value(&self, function: &str) -> Option<String> {
        self.values.lock().get(function).cloned()
    }

    /// Returns the number of request lines received so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Changes a value without telling connected clients.
    pub fn set(&self, function: &str, value: &str) {
        self.values
            .lock()
            .insert(function.to_string(), value.to_string());
    }

    /// Drops every open client connection.
    pub fn disconnect_all(&self) {
        for handle in self.connections.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for BoxEmulator {
    fn drop(&mut self) {
        self.accept.abort();
        self.disconnect_all();
    }
}

// ============================================================================
// Cloud relay fake
// ============================================================================

/// Accepts one relay connection, answers `connect_req` and records every
/// message the client sends.
pub struct RelayFake {
    pub port: u16,
    received: mpsc::UnboundedReceiver<Value>,
    outbound: mpsc::UnboundedSender<Option<String>>,
    task: JoinHandle<()>,
}

impl RelayFake {
    /// Starts the relay. `accept` selects the `connect_rsp` status.
    pub async fn start(accept: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (received_tx, received) = mpsc::unbounded_channel();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Option<String>>();

        let task = tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);
            let mut frame = Vec::new();

            loop {
                tokio::select! {
                    read = reader.read_until(b'}', &mut frame) => {
                        match read {
                            Ok(0) | Err(_) => return,
                            Ok(_) if !frame.ends_with(b"}}") => continue,
                            Ok(_) => {}
                        }
                        let message: Value = serde_json::from_slice(&frame).unwrap();
                        frame.clear();
                        if message["command"] == "connect_req" {
                            let status = if accept { "ok" } else { "denied" };
                            let reply = json!({"command": "connect_rsp", "data": {"status": status}});
                            writer.write_all(reply.to_string().as_bytes()).await.unwrap();
                        }
                        let _ = received_tx.send(message);
                    }
                    push = outbound_rx.recv() => {
                        match push {
                            Some(Some(message)) => writer.write_all(message.as_bytes()).await.unwrap(),
                            _ => return,
                        }
                    }
                }
            }
        });

        Self {
            port,
            received,
            outbound,
            task,
        }
    }

    /// Returns the next message sent by the client.
    pub async fn next_message(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .expect("relay message")
            .expect("relay open")
    }

    /// Waits for the client to close the relay connection.
    ///
    /// Returns the messages received before the close, or `None` if the
    /// connection is still open after two seconds.
    pub async fn closed(&mut self) -> Option<Vec<Value>> {
        let mut remaining = Vec::new();
        let drained = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(message) = self.received.recv().await {
                remaining.push(message);
            }
        })
        .await;
        drained.ok().map(|()| remaining)
    }

    /// Pushes a message to the client.
    pub fn push(&self, message: &Value) {
        self.outbound.send(Some(message.to_string())).unwrap();
    }

    /// Closes the client connection.
    pub fn close(&self) {
        let _ = self.outbound.send(None);
    }
}

impl Drop for RelayFake {
    fn drop(&mut self) {
        self.task.abort();
    }
}
