// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `intesis_lib` library.
//!
//! The hierarchy separates the four failure classes a controller can hit:
//! rejected credentials, transport failures, malformed or unexpected
//! responses, and unacknowledged box commands. Value validation failures
//! raised by the setters have their own [`ValueError`].

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials were rejected. Never retried automatically.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Transport or network failure.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The remote side sent something malformed or unexpected.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A box command was not acknowledged in time.
    #[error("command {command:?} was not acknowledged within {timeout_ms} ms")]
    CommandTimeout {
        /// The raw command line that was sent.
        command: String,
        /// The bound that expired, in milliseconds.
        timeout_ms: u64,
    },

    /// A setter received a value it cannot encode.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The device id is not present in the state table.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The adapter has no open session or socket.
    #[error("controller is not connected")]
    NotConnected,

    /// The operation has no encoding on the active protocol.
    #[error("operation not supported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Returns true for transport failures that a caller may retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Socket operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a non-success HTTP status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Opening the connection timed out.
    #[error("connection timed out after {0} ms")]
    Timeout(u64),

    /// The peer closed the connection or the outbound channel is gone.
    #[error("connection closed: {0}")]
    Closed(String),
}

/// Errors raised while interpreting remote responses.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// The local API reported an error that is not a session expiry.
    #[error("API error {code}: {message}")]
    Api {
        /// Numeric error code from the device.
        code: i64,
        /// Human readable message from the device.
        message: String,
    },
}

/// Errors related to value validation in setters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} for {name} is out of range [{min}, {max}]")]
    OutOfRange {
        /// The setting being written.
        name: String,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
        /// The value that was provided.
        actual: f64,
    },

    /// A label has no encoding for the attribute.
    #[error("unknown {attribute} value: {label}")]
    UnknownLabel {
        /// The attribute being written.
        attribute: String,
        /// The label that was provided.
        label: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
