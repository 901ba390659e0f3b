//! Fixed-point helpers shared by the frame decoders and the fallback decoder
//!
//! Minew frames carry temperature and humidity as Q8.8 values: a 16-bit
//! integer whose high byte is the integer part and low byte the fraction,
//! i.e. the raw value divided by 256. The fallback decoder uses the same
//! shape with other divisors and byte orders, so that variant lives here too.

/// Scale of a Q8.8 value (2^8)
pub const Q88_SCALE: f64 = 256.0;

/// Byte order of a 2-byte field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Read two bytes starting at `offset`, or None if the range is out of bounds
fn read_pair(buf: &[u8], offset: usize) -> Option<[u8; 2]> {
    let end = offset.checked_add(2)?;
    let bytes = buf.get(offset..end)?;
    Some([bytes[0], bytes[1]])
}

/// Read a signed 16-bit integer at `offset`
pub fn read_i16(buf: &[u8], offset: usize, endian: Endian) -> Option<i16> {
    read_pair(buf, offset).map(|pair| match endian {
        Endian::Big => i16::from_be_bytes(pair),
        Endian::Little => i16::from_le_bytes(pair),
    })
}

/// Read an unsigned 16-bit integer at `offset`
pub fn read_u16(buf: &[u8], offset: usize, endian: Endian) -> Option<u16> {
    read_pair(buf, offset).map(|pair| match endian {
        Endian::Big => u16::from_be_bytes(pair),
        Endian::Little => u16::from_le_bytes(pair),
    })
}

/// Convert a raw signed Q8.8 integer to a float
pub fn q88_to_f64(raw: i16) -> f64 {
    raw as f64 / Q88_SCALE
}

/// Convert a float back to its raw signed Q8.8 integer
///
/// Values outside the representable range saturate at `i16::MIN`/`i16::MAX`.
pub fn f64_to_q88(value: f64) -> i16 {
    (value * Q88_SCALE).round() as i16
}

/// Decode a signed big-endian Q8.8 value at `offset`
pub fn signed_q88_be(buf: &[u8], offset: usize) -> Option<f64> {
    read_i16(buf, offset, Endian::Big).map(q88_to_f64)
}

/// Decode an unsigned big-endian Q8.8 value at `offset`
pub fn unsigned_q88_be(buf: &[u8], offset: usize) -> Option<f64> {
    read_u16(buf, offset, Endian::Big).map(|raw| raw as f64 / Q88_SCALE)
}

/// Encode a float as a signed big-endian Q8.8 pair
pub fn encode_signed_q88_be(value: f64) -> [u8; 2] {
    f64_to_q88(value).to_be_bytes()
}

/// Decode a scaled signed integer (generalised fixed point) at `offset`
pub fn scaled_i16(buf: &[u8], offset: usize, endian: Endian, divisor: f64) -> Option<f64> {
    read_i16(buf, offset, endian).map(|raw| raw as f64 / divisor)
}

/// Decode a scaled unsigned integer at `offset`
pub fn scaled_u16(buf: &[u8], offset: usize, endian: Endian, divisor: f64) -> Option<f64> {
    read_u16(buf, offset, endian).map(|raw| raw as f64 / divisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_q88_positive() {
        // 0x1E73 = 7795 -> 30.449...
        let buf = [0x1E, 0x73];
        let value = signed_q88_be(&buf, 0).unwrap();
        assert!((value - 7795.0 / 256.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_signed_q88_negative() {
        // 0xFF80 = -128 -> -0.5
        let buf = [0xFF, 0x80];
        assert_eq!(signed_q88_be(&buf, 0), Some(-0.5));
        // Same bytes read unsigned are 255.5
        assert_eq!(unsigned_q88_be(&buf, 0), Some(255.5));
    }

    #[test]
    fn test_out_of_range_offset_is_none() {
        let buf = [0x01, 0x02, 0x03];
        assert_eq!(read_i16(&buf, 2, Endian::Big), None);
        assert_eq!(read_u16(&buf, usize::MAX, Endian::Little), None);
        assert_eq!(signed_q88_be(&[], 0), None);
    }

    #[test]
    fn test_endianness() {
        let buf = [0x01, 0x02];
        assert_eq!(read_u16(&buf, 0, Endian::Big), Some(0x0102));
        assert_eq!(read_u16(&buf, 0, Endian::Little), Some(0x0201));
    }

    #[test]
    fn test_scaled_values() {
        let buf = [0x09, 0xC4]; // 2500 big-endian
        assert_eq!(scaled_i16(&buf, 0, Endian::Big, 100.0), Some(25.0));
        assert_eq!(scaled_u16(&buf, 0, Endian::Big, 10.0), Some(250.0));
    }

    #[test]
    fn test_encode_matches_decode() {
        let bytes = encode_signed_q88_be(-12.25);
        assert_eq!(signed_q88_be(&bytes, 0), Some(-12.25));
    }
}
