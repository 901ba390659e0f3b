//! Batch decoding of newline-delimited hex advertisements
use log::{debug, warn};
use time::OffsetDateTime;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::bluetooth::decoder::Decoder;
use crate::error::DecodeFault;
use crate::models::Reading;

/// A line that did not produce a reading
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFault {
    /// 1-based line number in the source
    pub line_number: usize,
    pub line: String,
    pub fault: DecodeFault,
}

/// Result of a batch: successes in input order plus every fault
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    pub readings: Vec<Reading>,
    pub faults: Vec<BatchFault>,
}

impl BatchReport {
    /// Faults that are real errors, not just foreign beacons
    pub fn hard_faults(&self) -> impl Iterator<Item = &BatchFault> {
        self.faults.iter().filter(|f| !f.fault.is_skip())
    }
}

/// Sequential driver; one bad line never stops the batch
pub struct BatchDriver<'a> {
    decoder: &'a Decoder,
    line_number: usize,
    report: BatchReport,
}

impl<'a> BatchDriver<'a> {
    pub fn new(decoder: &'a Decoder) -> Self {
        BatchDriver {
            decoder,
            line_number: 0,
            report: BatchReport::default(),
        }
    }

    /// Decode the next line; returns the reading if one was produced
    ///
    /// Blank lines are counted but otherwise ignored.
    pub fn process_line(&mut self, line: &str) -> Option<&Reading> {
        self.line_number += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        match self.decoder.decode_hex(trimmed, OffsetDateTime::now_utc()) {
            Ok(reading) => {
                debug!(
                    "Line {}: {} reading from {}",
                    self.line_number,
                    reading.frame_kind,
                    reading.device_id.as_deref().unwrap_or("unknown device")
                );
                self.report.readings.push(reading);
                self.report.readings.last()
            }
            Err(fault) => {
                self.record_fault(trimmed.to_string(), fault);
                None
            }
        }
    }

    /// Same as [`process_line`](Self::process_line) for undecoded bytes
    ///
    /// Bytes that are not UTF-8 become an `InvalidUtf8` fault for this line.
    pub fn process_raw_line(&mut self, raw: &[u8]) -> Option<&Reading> {
        match std::str::from_utf8(raw) {
            Ok(line) => self.process_line(line),
            Err(e) => {
                self.line_number += 1;
                let line = String::from_utf8_lossy(raw).trim().to_string();
                let fault = DecodeFault::InvalidUtf8 {
                    valid_up_to: e.valid_up_to(),
                };
                self.record_fault(line, fault);
                None
            }
        }
    }

    fn record_fault(&mut self, line: String, fault: DecodeFault) {
        if fault.is_skip() {
            debug!("Line {}: skipped ({}): {}", self.line_number, fault, line);
        } else {
            warn!("Line {}: {}: {}", self.line_number, fault, line);
        }
        self.report.faults.push(BatchFault {
            line_number: self.line_number,
            line,
            fault,
        });
    }

    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    pub fn finish(self) -> BatchReport {
        self.report
    }
}

/// Decode every line of an in-memory batch
pub fn run_batch<I, S>(decoder: &Decoder, lines: I) -> BatchReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut driver = BatchDriver::new(decoder);
    for line in lines {
        driver.process_line(line.as_ref());
    }
    driver.finish()
}

/// Decode lines from an async reader as they arrive
///
/// `on_reading` sees each reading right after it is decoded, so long-running
/// sources such as stdin can be forwarded without waiting for EOF. Lines
/// that are not UTF-8 are recorded as faults; only read errors of the source
/// itself end the batch with an error.
pub async fn run_reader<R, F>(
    decoder: &Decoder,
    mut reader: R,
    mut on_reading: F,
) -> std::io::Result<BatchReport>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&Reading),
{
    let mut driver = BatchDriver::new(decoder);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        if let Some(reading) = driver.process_raw_line(line) {
            on_reading(reading);
        }
    }

    Ok(driver.finish())
}
