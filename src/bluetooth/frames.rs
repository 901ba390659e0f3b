//! Minew frame layouts and the dispatcher that picks one
//!
//! Every layout is identified by the first two body bytes, frame type and
//! frame version, and maps fixed byte offsets to reading fields:
//!
//! | type | version | min len | fields |
//! |------|---------|---------|--------|
//! | 0xA3 | 0x03    | 16      | battery [2], temp Q8.8 [3..5], humidity Q8.8 [5..7], id [12..18] |
//! | 0xCA | 0x1B    | 24      | voltage u16/1000 [12..14], temp Q8.8 [14..16], id [6..12] |
//! | 0xCA | 0x05    | 24      | temp Q8.8 [5..7], humidity Q8.8 [7..9], name [9..17], id [6..12] |
//!
//! Q8.8 values are signed big-endian. Device ids are the byte range reversed,
//! hex encoded and suffixed with `/2`.
use std::ops::Range;

use log::debug;

use crate::bluetooth::fixed_point::{read_u16, signed_q88_be, Endian};
use crate::models::FrameKind;

/// Suffix appended to every Minew device id
pub const DEVICE_ID_SUFFIX: &str = "/2";

/// Reading fields pulled out of a frame body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameFields {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub battery_percent: Option<u8>,
    pub battery_voltage: Option<f64>,
    pub device_id: Option<String>,
    pub name: Option<String>,
}

/// One entry of the frame table
pub struct FrameLayout {
    pub frame_type: u8,
    pub frame_version: u8,
    pub kind: FrameKind,
    /// Shorter bodies are "not this frame", not an error
    pub min_len: usize,
    decode: fn(&[u8]) -> FrameFields,
}

impl FrameLayout {
    /// Decode `body` with this layout, or None below the length guard
    pub fn decode(&self, body: &[u8]) -> Option<FrameFields> {
        if body.len() < self.min_len {
            debug!(
                "{} frame needs {} bytes, body has {}",
                self.kind,
                self.min_len,
                body.len()
            );
            return None;
        }
        Some((self.decode)(body))
    }
}

pub static FRAME_LAYOUTS: [FrameLayout; 3] = [
    FrameLayout {
        frame_type: 0xA3,
        frame_version: 0x03,
        kind: FrameKind::S3Environmental,
        min_len: 16,
        decode: decode_s3_environmental,
    },
    FrameLayout {
        frame_type: 0xCA,
        frame_version: 0x1B,
        kind: FrameKind::ConnectV3Encrypted,
        min_len: 24,
        decode: decode_connect_v3_encrypted,
    },
    FrameLayout {
        frame_type: 0xCA,
        frame_version: 0x05,
        kind: FrameKind::ConnectV3PlainTempHumidity,
        min_len: 24,
        decode: decode_connect_v3_temp_humidity,
    },
];

/// Frame type and version tags of a body
pub fn frame_tags(body: &[u8]) -> Option<(u8, u8)> {
    match body {
        [frame_type, frame_version, ..] => Some((*frame_type, *frame_version)),
        _ => None,
    }
}

/// Layout for the body's tags, if it is one we know
pub fn lookup_layout(body: &[u8]) -> Option<&'static FrameLayout> {
    let (frame_type, frame_version) = frame_tags(body)?;
    FRAME_LAYOUTS
        .iter()
        .find(|layout| layout.frame_type == frame_type && layout.frame_version == frame_version)
}

/// Classify a body by its tags
pub fn frame_kind(body: &[u8]) -> FrameKind {
    lookup_layout(body)
        .map(|layout| layout.kind)
        .unwrap_or(FrameKind::Unknown)
}

/// Decode a body with the table
///
/// Returns None for unknown tags and for bodies below the layout's minimum
/// length; the caller then falls back to the heuristic decoder.
pub fn dispatch(body: &[u8]) -> Option<(FrameKind, FrameFields)> {
    let layout = lookup_layout(body)?;
    layout.decode(body).map(|fields| (layout.kind, fields))
}

/// Reverse a byte range and hex encode it with the device id suffix
pub fn device_id(body: &[u8], range: Range<usize>) -> Option<String> {
    let mut bytes = body.get(range)?.to_vec();
    bytes.reverse();
    Some(format!("{}{}", hex::encode(bytes), DEVICE_ID_SUFFIX))
}

/// UTF-8 text with trailing NUL padding stripped; invalid text is None
pub fn text_field(body: &[u8], range: Range<usize>) -> Option<String> {
    let bytes = body.get(range)?;
    let text = std::str::from_utf8(bytes).ok()?.trim_end_matches('\0');
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn decode_s3_environmental(body: &[u8]) -> FrameFields {
    FrameFields {
        battery_percent: body.get(2).copied(),
        temperature: signed_q88_be(body, 3),
        humidity: signed_q88_be(body, 5),
        device_id: device_id(body, 12..18),
        ..Default::default()
    }
}

fn decode_connect_v3_encrypted(body: &[u8]) -> FrameFields {
    FrameFields {
        temperature: signed_q88_be(body, 14),
        battery_voltage: read_u16(body, 12, Endian::Big).map(|mv| mv as f64 / 1000.0),
        device_id: device_id(body, 6..12),
        ..Default::default()
    }
}

fn decode_connect_v3_temp_humidity(body: &[u8]) -> FrameFields {
    FrameFields {
        temperature: signed_q88_be(body, 5),
        humidity: signed_q88_be(body, 7),
        name: text_field(body, 9..17),
        device_id: device_id(body, 6..12),
        ..Default::default()
    }
}
