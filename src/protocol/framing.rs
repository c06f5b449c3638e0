// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Delimiter-framed readers for the persistent sockets.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// End of a relay JSON message.
pub(crate) const JSON_DELIMITER: &[u8] = b"}}";

/// End of a box response line.
pub(crate) const LINE_DELIMITER: &[u8] = b"\r";

/// Longest frame accepted on either socket.
pub(crate) const MAX_FRAME_LEN: usize = 64 * 1024;

/// Reads bytes up to and including `delimiter`.
///
/// Returns `Ok(None)` on a clean end of stream. A stream that ends inside a
/// frame yields `UnexpectedEof`; trailing whitespace alone is a clean end.
/// A frame growing past [`MAX_FRAME_LEN`] yields `InvalidData`.
pub(crate) async fn read_frame<R>(reader: &mut R, delimiter: &[u8]) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let Some(&last) = delimiter.last() else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty delimiter"));
    };

    let mut frame = Vec::new();
    loop {
        let (used, found) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                if frame.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a frame",
                ));
            }
            match available.iter().position(|b| *b == last) {
                Some(idx) => {
                    frame.extend_from_slice(&available[..=idx]);
                    (idx + 1, true)
                }
                None => {
                    frame.extend_from_slice(available);
                    (available.len(), false)
                }
            }
        };
        reader.consume(used);

        if frame.len() > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame exceeds {MAX_FRAME_LEN} bytes"),
            ));
        }
        if found && frame.ends_with(delimiter) {
            return Ok(Some(frame));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn splits_on_double_brace() {
        let data: &[u8] = br#"{"command":"status","data":{"uid":1}}{"command":"rssi","data":{"value":3}}"#;
        let mut reader = BufReader::new(data);

        let first = read_frame(&mut reader, JSON_DELIMITER).await.unwrap().unwrap();
        assert_eq!(first, br#"{"command":"status","data":{"uid":1}}"#);
        let second = read_frame(&mut reader, JSON_DELIMITER).await.unwrap().unwrap();
        assert!(second.starts_with(br#"{"command":"rssi""#));
        assert!(read_frame(&mut reader, JSON_DELIMITER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let mut data = vec![b'a'; MAX_FRAME_LEN + 1];
        data.extend_from_slice(b"}}");
        let mut reader = BufReader::new(data.as_slice());

        let err = read_frame(&mut reader, JSON_DELIMITER).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn frame_at_the_limit_is_accepted() {
        let mut data = vec![b' '; MAX_FRAME_LEN - 2];
        data.extend_from_slice(b"}}");
        let mut reader = BufReader::new(data.as_slice());

        let frame = read_frame(&mut reader, JSON_DELIMITER).await.unwrap().unwrap();
        assert_eq!(frame.len(), MAX_FRAME_LEN);
    }

    #[tokio::test]
    async fn single_brace_does_not_end_a_frame() {
        let data: &[u8] = br#"{"a":{"b":1},"c":2}}"#;
        let mut reader = BufReader::new(data);
        let frame = read_frame(&mut reader, JSON_DELIMITER).await.unwrap().unwrap();
        assert_eq!(frame, data);
    }

    #[tokio::test]
    async fn lines_end_at_carriage_return() {
        let data: &[u8] = b"ACK\r\nCHN,1:ONOFF,OFF\r\n";
        let mut reader = BufReader::new(data);

        assert_eq!(read_frame(&mut reader, LINE_DELIMITER).await.unwrap().unwrap(), b"ACK\r");
        assert_eq!(
            read_frame(&mut reader, LINE_DELIMITER).await.unwrap().unwrap(),
            b"\nCHN,1:ONOFF,OFF\r"
        );
        assert!(read_frame(&mut reader, LINE_DELIMITER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn truncated_frame_is_an_error() {
        let data: &[u8] = br#"{"command":"sta"#;
        let mut reader = BufReader::new(data);
        let err = read_frame(&mut reader, JSON_DELIMITER).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
