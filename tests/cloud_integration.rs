// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the cloud adapter: wiremock for the handshake and
//! a TCP fake for the relay.

mod common;

use std::time::Duration;

use common::*;
use intesis_lib::config::CloudConfig;
use intesis_lib::{
    ConnectionState, Controller, ControllerEvent, Error, KeepalivePolicy, PowerState,
    ReconnectionPolicy,
};
use serde_json::json;
use tokio::sync::broadcast;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_PATH: &str = "/api.php/get/control";

async fn handshake_server(relay_port: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("username=admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cloud_status(relay_port)))
        .mount(&server)
        .await;
    server
}

fn config(server: &MockServer) -> CloudConfig {
    CloudConfig::new(MOCK_USER, MOCK_PASS)
        .with_api_url(format!("{}{API_PATH}", server.uri()))
        .with_reconnection(ReconnectionPolicy::new().with_backoff_unit(Duration::from_millis(20)))
        .with_handshake_timeout(Duration::from_secs(2))
        .with_keepalive(KeepalivePolicy::Disabled)
}

async fn connected() -> (MockServer, RelayFake, Controller) {
    let mut relay = RelayFake::start(true).await;
    let server = handshake_server(relay.port).await;
    let controller = Controller::new(config(&server)).unwrap();
    controller.connect().await.unwrap();

    let auth = relay.next_message().await;
    assert_eq!(auth, json!({"command": "connect_req", "data": {"token": MOCK_TOKEN}}));
    (server, relay, controller)
}

async fn next_update(events: &mut broadcast::Receiver<ControllerEvent>) -> Option<String> {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("event")
            .expect("channel open");
        if let ControllerEvent::Updated { device_id } = event {
            return device_id;
        }
    }
}

// ============================================================================
// Handshake
// ============================================================================

mod handshake {
    use super::*;

    #[tokio::test]
    async fn connect_loads_installation_and_status() {
        let (_server, _relay, controller) = connected().await;
        assert!(controller.is_connected());
        assert_eq!(controller.connection_state(), ConnectionState::Connected);

        let id = MOCK_DEVICE_ID;
        assert_eq!(controller.get_devices().len(), 1);
        assert!(controller.get_device(id).unwrap().len() > 20);
        assert_eq!(controller.get_device_name(id).as_deref(), Some("MOCK DEVICE"));
        assert_eq!(controller.get_power_state(id), Some(PowerState::Off));
        assert_eq!(controller.get_mode(id).as_deref(), Some("cool"));
        assert_eq!(controller.get_fan_speed(id).as_deref(), Some("quiet"));
        assert_eq!(controller.get_vertical_swing(id).as_deref(), Some("manual2"));
        assert_eq!(controller.get_horizontal_swing(id).as_deref(), Some("manual3"));
        assert_eq!(controller.get_setpoint(id), Some(21.0));
        assert_eq!(controller.get_temperature(id), Some(24.0));
        assert_eq!(controller.get_min_setpoint(id), Some(18.0));
        assert_eq!(controller.get_max_setpoint(id), Some(30.0));
        assert_eq!(controller.get_outdoor_temperature(id), Some(26.0));
        assert_eq!(controller.get_run_hours(id), Some(MOCK_VAL_RUN_HOURS));
        assert_eq!(controller.get_error(id).as_deref(), Some("H00: No abnormality detected"));
        assert_eq!(controller.get_preset_mode(id).as_deref(), Some("eco"));
        assert_eq!(controller.get_rssi(id), Some(204));
        assert!(controller.has_vertical_swing(id));
        assert!(controller.has_horizontal_swing(id));
        assert_eq!(
            controller.get_mode_list(id).unwrap(),
            vec!["auto", "heat", "dry", "fan", "cool"]
        );
        assert_eq!(
            controller.get_fan_speed_list(id).unwrap(),
            vec!["quiet", "low", "medium", "high"]
        );
        assert!(controller.last_message_received().is_some());

        controller.stop().await;
        assert!(controller.is_disconnected());
    }

    #[tokio::test]
    async fn html_content_type_is_parsed_as_json() {
        let mut relay = RelayFake::start(true).await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(cloud_status(relay.port).to_string(), "text/html"),
            )
            .mount(&server)
            .await;

        let controller = Controller::new(config(&server)).unwrap();
        controller.connect().await.unwrap();
        relay.next_message().await;
        assert!(controller.get_device(MOCK_DEVICE_ID).is_some());
        controller.stop().await;
    }

    #[tokio::test]
    async fn rejected_credentials_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errorCode": 1,
                "errorMessage": "Incorrect user or password"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let controller = Controller::new(config(&server)).unwrap();
        let err = controller.connect().await.unwrap_err();
        assert!(matches!(err, Error::Authentication(ref msg) if msg == "Incorrect user or password"));
        assert!(controller.is_disconnected());
        assert_eq!(
            controller.error_message().as_deref(),
            Some("Incorrect user or password")
        );
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let mut relay = RelayFake::start(true).await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .with_priority(1)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cloud_status(relay.port)))
            .expect(1)
            .mount(&server)
            .await;

        let controller = Controller::new(config(&server)).unwrap();
        controller.connect().await.unwrap();
        relay.next_message().await;
        assert!(controller.is_connected());
        assert_eq!(controller.connection_retries(), 0);
        controller.stop().await;
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let config = config(&server).with_reconnection(
            ReconnectionPolicy::new()
                .with_backoff_unit(Duration::from_millis(10))
                .with_max_retries(2),
        );
        let controller = Controller::new(config).unwrap();
        let err = controller.connect().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(controller.connection_retries(), 2);
        assert!(controller.is_disconnected());
    }

    #[tokio::test]
    async fn refused_relay_session_fails_connect() {
        let relay = RelayFake::start(false).await;
        let server = handshake_server(relay.port).await;

        let controller = Controller::new(config(&server)).unwrap();
        let err = controller.connect().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(controller.is_disconnected());
    }

    #[tokio::test]
    async fn poll_status_returns_token() {
        let server = handshake_server(1).await;
        let controller = Controller::new(config(&server)).unwrap();

        let token = controller.poll_status(false).await.unwrap();
        assert_eq!(token, Some(MOCK_TOKEN.to_string()));
        assert_eq!(controller.get_devices().len(), 1);
        assert!(!controller.is_connected());
    }
}

// ============================================================================
// Relay traffic
// ============================================================================

mod relay {
    use super::*;

    #[tokio::test]
    async fn status_push_updates_device() {
        let (_server, relay, controller) = connected().await;
        let mut events = controller.subscribe_events();

        relay.push(&json!({
            "command": "status",
            "data": {"deviceId": MOCK_DEVICE_ID, "uid": 1, "value": 1}
        }));

        assert_eq!(next_update(&mut events).await.as_deref(), Some(MOCK_DEVICE_ID));
        assert!(controller.is_on(MOCK_DEVICE_ID));
        controller.stop().await;
    }

    #[tokio::test]
    async fn unknown_device_gets_placeholder() {
        let (_server, relay, controller) = connected().await;
        let mut events = controller.subscribe_events();

        relay.push(&json!({"command": "status", "data": {"deviceId": 999, "uid": 10, "value": 215}}));

        assert_eq!(next_update(&mut events).await.as_deref(), Some("999"));
        assert_eq!(controller.get_device_name("999").as_deref(), Some("Device 999"));
        assert_eq!(controller.get_temperature("999"), Some(21.5));
        controller.stop().await;
    }

    #[tokio::test]
    async fn rssi_message_updates_silently() {
        let (_server, relay, controller) = connected().await;

        relay.push(&json!({"command": "rssi", "data": {"deviceId": MOCK_DEVICE_ID, "value": 190}}));

        assert!(wait_until(|| controller.get_rssi(MOCK_DEVICE_ID) == Some(190)).await);
        controller.stop().await;
    }

    #[tokio::test]
    async fn setters_write_set_messages() {
        let (_server, mut relay, controller) = connected().await;
        let id = MOCK_DEVICE_ID;

        controller.set_power_on(id).await.unwrap();
        controller.set_fan_speed(id, "high").await.unwrap();
        controller.set_temperature(id, 22.5).await.unwrap();
        controller.set_thermo_shift(id, "heat_thermo_shift", -2.0).await.unwrap();

        let expected = [(1, 1), (4, 4), (9, 225), (55, 0xFFEC)];
        for (uid, value) in expected {
            let message = relay.next_message().await;
            assert_eq!(
                message,
                json!({"command": "set", "data": {"deviceId": id, "uid": uid, "value": value, "seqNo": 0}})
            );
        }
        controller.stop().await;
    }

    #[tokio::test]
    async fn keepalive_polls_first_device() {
        let mut relay = RelayFake::start(true).await;
        let server = handshake_server(relay.port).await;
        let config = config(&server).with_keepalive(KeepalivePolicy::LogOnly(Duration::from_millis(50)));
        let controller = Controller::new(config).unwrap();
        controller.connect().await.unwrap();

        relay.next_message().await;
        let keepalive = relay.next_message().await;
        assert_eq!(
            keepalive,
            json!({"command": "get", "data": {"deviceId": MOCK_DEVICE_ID, "uid": 10}})
        );
        controller.stop().await;
    }

    #[tokio::test]
    async fn stop_closes_relay_and_silences_keepalive() {
        let mut relay = RelayFake::start(true).await;
        let server = handshake_server(relay.port).await;
        let config = config(&server).with_keepalive(KeepalivePolicy::LogOnly(Duration::from_millis(50)));
        let controller = Controller::new(config).unwrap();
        controller.connect().await.unwrap();
        relay.next_message().await;
        assert_eq!(relay.next_message().await["command"], "get");

        controller.stop().await;
        controller.stop().await;
        assert!(controller.is_disconnected());

        // The relay sees the socket close; at most one keepalive was in flight
        let remaining = relay.closed().await.expect("relay connection closed");
        assert!(remaining.len() <= 1);
        let err = controller.set_power_on(MOCK_DEVICE_ID).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn oversized_relay_frame_drops_connection() {
        let (_server, relay, controller) = connected().await;

        // A JSON string never contains the `}}` terminator
        relay.push(&json!("a".repeat(128 * 1024)));

        assert!(wait_until(|| controller.is_disconnected()).await);
        assert!(controller.error_message().is_some_and(|msg| msg.contains("exceeds")));
    }

    #[tokio::test]
    async fn relay_loss_disconnects_and_notifies() {
        let (_server, relay, controller) = connected().await;
        let mut events = controller.subscribe_events();

        relay.close();

        assert_eq!(next_update(&mut events).await, None);
        assert!(controller.is_disconnected());
        let err = controller.set_power_on(MOCK_DEVICE_ID).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }
}
