//! Full decode pipeline for one Minew advertisement
use log::debug;
use time::OffsetDateTime;

use crate::bluetooth::advertisement::{company_id, find_manufacturer_record, filter_vendor};
use crate::bluetooth::decryptor::{decrypt_body, KeyMaterial};
use crate::bluetooth::fallback::decode_fallback;
use crate::bluetooth::frames::{dispatch, FrameFields};
use crate::config::DecoderConfig;
use crate::error::DecodeFault;
use crate::models::{Confidence, FrameKind, Reading};

/// Stateless advertisement decoder
///
/// Holds only read-only configuration, so one instance can be shared by
/// reference across threads and tasks.
#[derive(Debug, Clone)]
pub struct Decoder {
    vendor_id: u16,
    header_len: usize,
    key: Option<KeyMaterial>,
}

impl Decoder {
    pub fn new(vendor_id: u16, header_len: usize, key: Option<KeyMaterial>) -> Self {
        Decoder {
            vendor_id,
            header_len,
            key,
        }
    }

    pub fn from_config(config: &DecoderConfig) -> Self {
        Decoder::new(config.vendor_id, config.header_len, config.aes_key.clone())
    }

    /// Decode one hex-encoded advertisement (no separators, either case)
    pub fn decode_hex(
        &self,
        line: &str,
        received_at: OffsetDateTime,
    ) -> Result<Reading, DecodeFault> {
        let bytes = hex::decode(line.trim())?;
        self.decode_bytes(&bytes, received_at)
    }

    /// Decode one raw advertisement PDU
    ///
    /// Steps: strip the transport header, find the manufacturer record, check
    /// the vendor, decrypt if flagged, then decode with the frame table or the
    /// fallback candidates. The result depends only on `raw` and
    /// `received_at`, which the caller stamps.
    pub fn decode_bytes(
        &self,
        raw: &[u8],
        received_at: OffsetDateTime,
    ) -> Result<Reading, DecodeFault> {
        if raw.len() < self.header_len {
            return Err(DecodeFault::HeaderTooShort {
                len: raw.len(),
                header_len: self.header_len,
            });
        }

        let record =
            find_manufacturer_record(raw, self.header_len).ok_or(DecodeFault::NoManufacturerData)?;

        let payload = match filter_vendor(&record, self.vendor_id) {
            Some(payload) => payload,
            None => {
                return Err(match company_id(&record) {
                    Some(company_id) => DecodeFault::VendorMismatch { company_id },
                    None => DecodeFault::NoManufacturerData,
                })
            }
        };

        let body = decrypt_body(payload.body, self.key.as_ref())?;

        let (frame_kind, confidence, fields) = match dispatch(&body) {
            Some((kind, fields)) => {
                debug!("Decoded {} frame", kind);
                (kind, Confidence::Exact, fields)
            }
            None => {
                let (_, fields) = decode_fallback(&body).ok_or(DecodeFault::NoLayoutMatched {
                    body_len: body.len(),
                })?;
                (FrameKind::Unknown, Confidence::Heuristic, fields)
            }
        };

        Ok(build_reading(fields, frame_kind, confidence, raw, received_at))
    }
}

fn build_reading(
    fields: FrameFields,
    frame_kind: FrameKind,
    confidence: Confidence,
    raw: &[u8],
    received_at: OffsetDateTime,
) -> Reading {
    Reading {
        temperature: fields.temperature,
        humidity: fields.humidity,
        battery_percent: fields.battery_percent,
        battery_voltage: fields.battery_voltage,
        device_id: fields.device_id,
        name: fields.name,
        frame_kind,
        confidence,
        source_hex: hex::encode(raw),
        received_at,
    }
}
