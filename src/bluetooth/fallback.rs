//! Best-effort decoding of bodies that match no known frame layout
//!
//! Candidates are tried in order and the first one whose offsets are in range
//! wins. No plausibility check is made on the values, so results are marked
//! heuristic and should be trusted less than a table match.
use log::debug;

use crate::bluetooth::fixed_point::{scaled_i16, scaled_u16, Endian};
use crate::bluetooth::frames::FrameFields;

/// One guess at where temperature and humidity live
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub temperature_offset: usize,
    pub humidity_offset: usize,
    pub endian: Endian,
    pub divisor: f64,
}

pub const CANDIDATES: [Candidate; 3] = [
    Candidate {
        temperature_offset: 5,
        humidity_offset: 7,
        endian: Endian::Big,
        divisor: 100.0,
    },
    Candidate {
        temperature_offset: 0,
        humidity_offset: 2,
        endian: Endian::Little,
        divisor: 100.0,
    },
    Candidate {
        temperature_offset: 0,
        humidity_offset: 2,
        endian: Endian::Big,
        divisor: 10.0,
    },
];

impl Candidate {
    /// Temperature is signed, humidity unsigned; battery follows humidity if present
    pub fn parse(&self, buf: &[u8]) -> Option<FrameFields> {
        let temperature = scaled_i16(buf, self.temperature_offset, self.endian, self.divisor)?;
        let humidity = scaled_u16(buf, self.humidity_offset, self.endian, self.divisor)?;
        let battery_percent = buf.get(self.humidity_offset + 2).copied();

        Some(FrameFields {
            temperature: Some(temperature),
            humidity: Some(humidity),
            battery_percent,
            ..Default::default()
        })
    }
}

/// Try every candidate in order; None when the buffer fits none of them
pub fn decode_fallback(buf: &[u8]) -> Option<(usize, FrameFields)> {
    let matched = CANDIDATES
        .iter()
        .enumerate()
        .find_map(|(index, candidate)| candidate.parse(buf).map(|fields| (index, fields)));

    match &matched {
        Some((index, _)) => debug!(
            "Fallback candidate {} matched {}-byte buffer",
            index + 1,
            buf.len()
        ),
        None => debug!("No fallback candidate fits {}-byte buffer", buf.len()),
    }

    matched
}
