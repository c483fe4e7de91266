//! Room protocol framing and value extraction.
//!
//! Panels talk to the platform over MessagePack room-data frames shaped
//! `[code, "type", data]`. This module owns the framing plus the helpers
//! that pull typed fields out of `rmpv::Value` maps.

use serde::Serialize;
use std::io::Cursor;
use thiserror::Error;

// Room protocol codes shared with the platform transport
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Handshake = 9,
    JoinRoom = 10,
    Error = 11,
    LeaveRoom = 12,
    RoomData = 13,
}

/// Encode an outbound message as `[RoomData, type, data]`.
pub fn encode_message<T: Serialize>(
    message_type: &str,
    data: &T,
) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    let frame: (u8, &str, &T) = (Protocol::RoomData as u8, message_type, data);
    rmp_serde::to_vec(&frame)
}

#[derive(Debug)]
pub enum DecodedMessage {
    Handshake,
    Error { code: u32, message: String },
    RoomData { msg_type: String, data: Option<rmpv::Value> },
    Unknown { protocol: u8 },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("messagepack error: {0}")]
    Msgpack(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// Decode an inbound frame. Returns the typed envelope; the message payload
/// stays an `rmpv::Value` for the event parser.
pub fn decode_message(data: &[u8]) -> Result<DecodedMessage, DecodeError> {
    let mut cursor = Cursor::new(data);
    let value = rmpv::decode::read_value(&mut cursor)
        .map_err(|e| DecodeError::Msgpack(e.to_string()))?;

    let array = value
        .as_array()
        .ok_or_else(|| DecodeError::InvalidFrame("expected array".into()))?;

    let protocol = array
        .first()
        .and_then(|v| v.as_u64())
        .ok_or_else(|| DecodeError::InvalidFrame("missing protocol code".into()))?
        as u8;

    match protocol {
        9 => Ok(DecodedMessage::Handshake),
        11 => {
            let code = array.get(1).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            let message = array
                .get(2)
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error")
                .to_string();
            Ok(DecodedMessage::Error { code, message })
        }
        13 => {
            let msg_type = array
                .get(1)
                .and_then(|v| v.as_str())
                .ok_or_else(|| DecodeError::InvalidFrame("room data missing type".into()))?
                .to_string();
            let data = array.get(2).cloned();
            Ok(DecodedMessage::RoomData { msg_type, data })
        }
        other => Ok(DecodedMessage::Unknown { protocol: other }),
    }
}

/// Look up a field in an `rmpv::Value` map.
pub fn field<'a>(value: &'a rmpv::Value, key: &str) -> Option<&'a rmpv::Value> {
    value.as_map().and_then(|map| {
        map.iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    })
}

pub fn extract_string(value: &rmpv::Value, key: &str) -> Option<String> {
    field(value, key).and_then(|v| v.as_str().map(|s| s.to_string()))
}

pub fn extract_i64(value: &rmpv::Value, key: &str) -> Option<i64> {
    field(value, key).and_then(|v| v.as_i64().or_else(|| v.as_u64().map(|u| u as i64)))
}

pub fn extract_u64(value: &rmpv::Value, key: &str) -> Option<u64> {
    field(value, key).and_then(|v| v.as_u64().or_else(|| v.as_i64().map(|i| i as u64)))
}

pub fn extract_f32(value: &rmpv::Value, key: &str) -> Option<f32> {
    field(value, key).and_then(|v| {
        v.as_f64()
            .map(|f| f as f32)
            .or_else(|| v.as_i64().map(|i| i as f32))
    })
}

pub fn extract_bool(value: &rmpv::Value, key: &str) -> Option<bool> {
    field(value, key).and_then(|v| v.as_bool())
}

pub fn extract_array<'a>(value: &'a rmpv::Value, key: &str) -> Option<&'a Vec<rmpv::Value>> {
    field(value, key).and_then(|v| v.as_array())
}
