//! BLE advertising-data parsing: TLV records and the Minew vendor filter
use log::debug;

/// AD type of manufacturer-specific data
pub const AD_TYPE_MANUFACTURER: u8 = 0xFF;

/// Minew Technologies company identifier (Bluetooth SIG assigned number)
pub const MINEW_COMPANY_ID: u16 = 0x0639;

/// Bytes preceding the TLV stream in a gateway PDU: flags(1) + MAC(6) + reserved(1)
pub const PDU_HEADER_LEN: usize = 8;

/// One length-prefixed, type-tagged record of the advertising data
///
/// `length` is the record's own length byte, so `payload` spans `length - 1`
/// bytes. The payload borrows from the advertisement, nothing is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvRecord<'a> {
    pub length: u8,
    pub ad_type: u8,
    pub payload: &'a [u8],
}

/// Lazy walk over the TLV records of an advertisement
///
/// The walk ends at a zero length byte or at the first record whose declared
/// length runs past the end of the buffer. Both are treated as end of stream
/// so trailing padding and truncated tails never fail a decode.
#[derive(Debug, Clone)]
pub struct TlvWalker<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> TlvWalker<'a> {
    /// Start walking `data` at `start`
    ///
    /// Callers pass the offset explicitly since the header in front of the
    /// TLV stream depends on the transport (see [`PDU_HEADER_LEN`]).
    pub fn new(data: &'a [u8], start: usize) -> Self {
        TlvWalker {
            data,
            pos: start,
            done: false,
        }
    }
}

impl<'a> Iterator for TlvWalker<'a> {
    type Item = TlvRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let length = match self.data.get(self.pos) {
            Some(&len) if len > 0 => len,
            _ => {
                self.done = true;
                return None;
            }
        };

        // Record occupies pos..=pos+length
        let end = self.pos + length as usize + 1;
        if end > self.data.len() {
            debug!(
                "TLV record at {} declares {} bytes, only {} remain; ending walk",
                self.pos,
                length,
                self.data.len() - self.pos - 1
            );
            self.done = true;
            return None;
        }

        let record = TlvRecord {
            length,
            ad_type: self.data[self.pos + 1],
            payload: &self.data[self.pos + 2..end],
        };
        self.pos = end;
        Some(record)
    }
}

/// Vendor payload of a manufacturer-specific record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManufacturerPayload<'a> {
    pub company_id: u16,
    pub body: &'a [u8],
}

/// Find the first manufacturer-specific record in the stream
pub fn find_manufacturer_record<'a>(data: &'a [u8], start: usize) -> Option<TlvRecord<'a>> {
    TlvWalker::new(data, start).find(|record| {
        if record.ad_type != AD_TYPE_MANUFACTURER {
            debug!("Skipping AD record type 0x{:02x}", record.ad_type);
            return false;
        }
        true
    })
}

/// Company id of a manufacturer record, little-endian in the first two bytes
pub fn company_id(record: &TlvRecord<'_>) -> Option<u16> {
    match record.payload {
        [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

/// Keep a manufacturer record only if it was emitted by `vendor_id`
///
/// A mismatch is not an error, it just means the advertisement belongs to
/// another beacon family.
pub fn filter_vendor<'a>(
    record: &TlvRecord<'a>,
    vendor_id: u16,
) -> Option<ManufacturerPayload<'a>> {
    if record.ad_type != AD_TYPE_MANUFACTURER {
        return None;
    }

    let company_id = company_id(record)?;
    if company_id != vendor_id {
        debug!(
            "Company id 0x{:04x} does not match vendor 0x{:04x}",
            company_id, vendor_id
        );
        return None;
    }

    Some(ManufacturerPayload {
        company_id,
        body: &record.payload[2..],
    })
}
