//! Report codec for the 90-byte command/response packet.
//!
//! Wire layout:
//!
//! | Offset | Size | Field               |
//! |--------|------|---------------------|
//! | 0      | 1    | status              |
//! | 1      | 1    | transaction id      |
//! | 2      | 2    | remaining packets (big-endian) |
//! | 4      | 1    | protocol type (0x00)|
//! | 5      | 1    | data size           |
//! | 6      | 1    | command class       |
//! | 7      | 1    | command id          |
//! | 8      | 80   | arguments           |
//! | 88     | 1    | crc                 |
//! | 89     | 1    | reserved (0x00)     |
//!
//! The CRC is the XOR of bytes 2..=87.

use crate::error::{Error, Result};
use std::fmt;

/// Total report length on the wire.
pub const REPORT_LEN: usize = 90;
/// Length of the argument buffer.
pub const ARGS_LEN: usize = 80;
/// Offset of the argument buffer.
pub const ARGS_OFFSET: usize = 8;
/// Offset of the CRC byte.
pub const CRC_OFFSET: usize = 88;
/// First byte covered by the CRC.
const CRC_START: usize = 2;

/// Transaction id used unless a model overrides it.
pub const DEFAULT_TRANSACTION_ID: u8 = 0xFF;
/// Protocol type, reserved for versioning.
pub const PROTOCOL_TYPE: u8 = 0x00;

/// Status byte of a report. Written by the device; ignored on requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// New command (requests carry this).
    None,
    Busy,
    Successful,
    Failure,
    Timeout,
    NotSupported,
    /// A status byte outside the documented set.
    Unknown(u8),
}

impl Status {
    /// Decode a status byte.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::None,
            0x01 => Self::Busy,
            0x02 => Self::Successful,
            0x03 => Self::Failure,
            0x04 => Self::Timeout,
            0x05 => Self::NotSupported,
            other => Self::Unknown(other),
        }
    }

    /// Encode to the wire byte.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Busy => 0x01,
            Self::Successful => 0x02,
            Self::Failure => 0x03,
            Self::Timeout => 0x04,
            Self::NotSupported => 0x05,
            Self::Unknown(b) => b,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Busy => write!(f, "busy"),
            Self::Successful => write!(f, "successful"),
            Self::Failure => write!(f, "failure"),
            Self::Timeout => write!(f, "timeout"),
            Self::NotSupported => write!(f, "not supported"),
            Self::Unknown(b) => write!(f, "unknown status 0x{b:02X}"),
        }
    }
}

/// A command or response packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub status: Status,
    /// Command group selector. Some models need a non-default value to reach
    /// the right internal sub-device.
    pub transaction_id: u8,
    /// Packets still to come in a multi-packet response; 0 for single packets.
    pub remaining_packets: u16,
    pub protocol_type: u8,
    /// Number of meaningful bytes in `arguments`.
    pub data_size: u8,
    pub command_class: u8,
    pub command_id: u8,
    pub arguments: [u8; ARGS_LEN],
    pub crc: u8,
}

impl Report {
    /// Create a zero-filled request for a command.
    pub fn new(command_class: u8, command_id: u8, data_size: u8) -> Self {
        Self {
            status: Status::None,
            transaction_id: DEFAULT_TRANSACTION_ID,
            remaining_packets: 0x0000,
            protocol_type: PROTOCOL_TYPE,
            data_size,
            command_class,
            command_id,
            arguments: [0u8; ARGS_LEN],
            crc: 0x00,
        }
    }

    /// Recompute and store the CRC. Returns the report for chaining.
    pub fn sealed(mut self) -> Self {
        self.crc = checksum(&self);
        self
    }

    /// Whether the stored CRC matches the report contents.
    pub fn crc_valid(&self) -> bool {
        self.crc == checksum(self)
    }

    /// The meaningful part of the argument buffer.
    pub fn args(&self) -> &[u8] {
        let len = (self.data_size as usize).min(ARGS_LEN);
        &self.arguments[..len]
    }

    /// A response correlates to a request iff packet count, class, and id
    /// all match.
    pub fn correlates_with(&self, request: &Report) -> bool {
        self.remaining_packets == request.remaining_packets
            && self.command_class == request.command_class
            && self.command_id == request.command_id
    }

    /// Serialize every field except the CRC, which is left zero.
    fn layout(&self) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; REPORT_LEN];
        buf[0] = self.status.as_byte();
        buf[1] = self.transaction_id;
        buf[2..4].copy_from_slice(&self.remaining_packets.to_be_bytes());
        buf[4] = self.protocol_type;
        buf[5] = self.data_size;
        buf[6] = self.command_class;
        buf[7] = self.command_id;
        buf[ARGS_OFFSET..CRC_OFFSET].copy_from_slice(&self.arguments);
        buf
    }
}

/// Shorthand for [`Report::new`].
pub fn new_report(command_class: u8, command_id: u8, data_size: u8) -> Report {
    Report::new(command_class, command_id, data_size)
}

/// XOR of every byte from offset 2 up to, but not including, the CRC byte.
pub fn checksum(report: &Report) -> u8 {
    report.layout()[CRC_START..CRC_OFFSET]
        .iter()
        .fold(0u8, |acc, &b| acc ^ b)
}

/// Encode a report exactly as stored. The reserved trailing byte is always 0.
pub fn encode(report: &Report) -> [u8; REPORT_LEN] {
    let mut buf = report.layout();
    buf[CRC_OFFSET] = report.crc;
    buf
}

/// Decode a report. Buffers of any length other than [`REPORT_LEN`] are
/// rejected.
pub fn decode(data: &[u8]) -> Result<Report> {
    if data.len() != REPORT_LEN {
        return Err(Error::MalformedResponse {
            expected: REPORT_LEN,
            actual: data.len(),
        });
    }

    let mut arguments = [0u8; ARGS_LEN];
    arguments.copy_from_slice(&data[ARGS_OFFSET..CRC_OFFSET]);

    Ok(Report {
        status: Status::from_byte(data[0]),
        transaction_id: data[1],
        remaining_packets: u16::from_be_bytes([data[2], data[3]]),
        protocol_type: data[4],
        data_size: data[5],
        command_class: data[6],
        command_id: data[7],
        arguments,
        crc: data[CRC_OFFSET],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small deterministic generator so checks can sweep many reports.
    fn xorshift(state: &mut u32) -> u8 {
        *state ^= *state << 13;
        *state ^= *state >> 17;
        *state ^= *state << 5;
        (*state >> 24) as u8
    }

    fn random_report(seed: &mut u32) -> Report {
        let mut report = Report::new(xorshift(seed), xorshift(seed), xorshift(seed) % 80);
        report.transaction_id = xorshift(seed);
        report.remaining_packets = u16::from_be_bytes([xorshift(seed), xorshift(seed)]);
        for b in report.arguments.iter_mut() {
            *b = xorshift(seed);
        }
        report.sealed()
    }

    #[test]
    fn new_report_defaults() {
        let report = new_report(0x03, 0x0A, 0x04);
        assert_eq!(report.status, Status::None);
        assert_eq!(report.transaction_id, 0xFF);
        assert_eq!(report.remaining_packets, 0);
        assert_eq!(report.protocol_type, 0x00);
        assert_eq!(report.data_size, 0x04);
        assert!(report.arguments.iter().all(|&b| b == 0));
    }

    #[test]
    fn encode_layout() {
        let mut report = Report::new(0x00, 0x82, 0x16);
        report.remaining_packets = 0x0102;
        report.arguments[0] = 0xAA;
        report.arguments[79] = 0xBB;
        let report = report.sealed();
        let bytes = encode(&report);

        assert_eq!(bytes.len(), REPORT_LEN);
        assert_eq!(bytes[0], 0x00); // status
        assert_eq!(bytes[1], 0xFF); // transaction id
        assert_eq!(bytes[2], 0x01); // remaining packets, high byte first
        assert_eq!(bytes[3], 0x02);
        assert_eq!(bytes[4], 0x00); // protocol type
        assert_eq!(bytes[5], 0x16); // data size
        assert_eq!(bytes[6], 0x00); // class
        assert_eq!(bytes[7], 0x82); // id
        assert_eq!(bytes[8], 0xAA);
        assert_eq!(bytes[87], 0xBB);
        assert_eq!(bytes[88], report.crc);
        assert_eq!(bytes[89], 0x00);
    }

    #[test]
    fn checksum_known_value() {
        // 0x16 ^ 0x82 = 0x94 (class 0x00 and zero args contribute nothing)
        let report = Report::new(0x00, 0x82, 0x16);
        assert_eq!(checksum(&report), 0x94);
    }

    #[test]
    fn checksum_ignores_status_and_transaction_id() {
        let base = Report::new(0x03, 0x0A, 0x04);
        let mut other = base.clone();
        other.status = Status::Successful;
        other.transaction_id = 0x3F;
        assert_eq!(checksum(&base), checksum(&other));
    }

    #[test]
    fn decoded_crc_matches_checksum() {
        let mut seed = 0x1234_5678;
        for _ in 0..256 {
            let report = random_report(&mut seed);
            let decoded = decode(&encode(&report)).unwrap();
            assert_eq!(decoded.crc, checksum(&report));
            assert_eq!(decoded, report);
        }
    }

    #[test]
    fn single_bit_flip_in_args_changes_checksum() {
        let mut seed = 0xDEAD_BEEF;
        for _ in 0..16 {
            let report = random_report(&mut seed);
            for idx in 0..ARGS_LEN {
                for bit in 0..8 {
                    let mut flipped = report.clone();
                    flipped.arguments[idx] ^= 1 << bit;
                    assert_ne!(checksum(&flipped), report.crc);
                }
            }
        }
    }

    #[test]
    fn decode_rejects_wrong_length() {
        for len in [0usize, 1, 89, 91, 64] {
            let data = vec![0u8; len];
            match decode(&data) {
                Err(Error::MalformedResponse { expected, actual }) => {
                    assert_eq!(expected, REPORT_LEN);
                    assert_eq!(actual, len);
                }
                other => panic!("expected MalformedResponse, got {other:?}"),
            }
        }
    }

    #[test]
    fn status_byte_roundtrip() {
        for byte in 0u8..=0xFF {
            assert_eq!(Status::from_byte(byte).as_byte(), byte);
        }
        assert_eq!(Status::from_byte(0x02), Status::Successful);
        assert_eq!(Status::from_byte(0x09), Status::Unknown(0x09));
    }

    #[test]
    fn correlation_requires_class_id_and_packets() {
        let request = Report::new(0x03, 0x80, 0x03);

        let mut response = request.clone();
        response.status = Status::Successful;
        assert!(response.correlates_with(&request));

        let mut wrong_id = response.clone();
        wrong_id.command_id = 0x81;
        assert!(!wrong_id.correlates_with(&request));

        let mut wrong_class = response.clone();
        wrong_class.command_class = 0x0F;
        assert!(!wrong_class.correlates_with(&request));

        let mut wrong_packets = response;
        wrong_packets.remaining_packets = 1;
        assert!(!wrong_packets.correlates_with(&request));
    }

    #[test]
    fn args_clamps_to_buffer() {
        let mut report = Report::new(0x00, 0x00, 0xFF);
        assert_eq!(report.args().len(), ARGS_LEN);
        report.data_size = 3;
        assert_eq!(report.args().len(), 3);
    }
}
