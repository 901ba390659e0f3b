//! Fault types for advertisement decoding and configuration.
//!
//! Per-advertisement faults are plain values: the batch driver records them
//! next to the offending line and moves on. Only [`ConfigError`] is allowed
//! to stop a run.

use thiserror::Error;

/// Problems with the provisioned AES key material.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CipherError {
    /// Key text is not valid hex (odd length or a non-hex character).
    #[error("AES key is not valid hex: {0}")]
    InvalidKeyHex(#[from] hex::FromHexError),

    /// Key decoded to the wrong number of bytes for AES-128.
    #[error("AES-128 key must be 16 bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// Outcome of a single advertisement that did not produce a reading.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeFault {
    /// The input line was not a hex string.
    #[error("invalid hex input: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The input line was not UTF-8 text.
    #[error("line is not valid UTF-8 (first bad byte at {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },

    /// The advertisement is shorter than the transport header.
    #[error("advertisement has {len} bytes, header alone needs {header_len}")]
    HeaderTooShort { len: usize, header_len: usize },

    /// No manufacturer-specific (0xFF) record in the TLV stream.
    #[error("no manufacturer-specific data record")]
    NoManufacturerData,

    /// Manufacturer data belongs to another vendor.
    #[error("company id 0x{company_id:04X} is not a Minew beacon")]
    VendorMismatch { company_id: u16 },

    /// Decryption could not be performed.
    #[error("cipher fault: {0}")]
    Cipher(#[from] CipherError),

    /// Neither the frame table nor any fallback candidate parsed the body.
    #[error("no frame layout matched a {body_len}-byte body")]
    NoLayoutMatched { body_len: usize },
}

impl DecodeFault {
    /// True for outcomes that only mean "not one of our beacons".
    ///
    /// These are reported but not treated as errors.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            DecodeFault::NoManufacturerData | DecodeFault::VendorMismatch { .. }
        )
    }
}

/// Errors that abort a run before any advertisement is decoded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("invalid MINEW_AES_KEY: {0}")]
    Key(#[from] CipherError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_classification() {
        assert!(DecodeFault::NoManufacturerData.is_skip());
        assert!(DecodeFault::VendorMismatch { company_id: 0x004C }.is_skip());
        assert!(!DecodeFault::NoLayoutMatched { body_len: 3 }.is_skip());
        assert!(!DecodeFault::InvalidUtf8 { valid_up_to: 0 }.is_skip());
        assert!(!DecodeFault::Cipher(CipherError::InvalidKeyLength(17)).is_skip());
    }

    #[test]
    fn test_fault_messages() {
        let fault = DecodeFault::VendorMismatch { company_id: 0x004C };
        assert_eq!(fault.to_string(), "company id 0x004C is not a Minew beacon");

        let fault = DecodeFault::from(CipherError::InvalidKeyLength(17));
        assert!(fault.to_string().contains("must be 16 bytes, got 17"));
    }
}
