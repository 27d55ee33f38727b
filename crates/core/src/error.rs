//! Error types for chroma-kbd-core.

use crate::report::Status;
use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrong argument length or shape for an operation. Raised before any
    /// bytes reach the device.
    #[error("invalid input for {operation}: expected {expected} bytes, got {actual}")]
    InputValidation {
        operation: &'static str,
        expected: &'static str,
        actual: usize,
    },

    /// Value out of accepted range.
    #[error("value out of range: {field} = {value} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// The bus layer failed to deliver or fetch a report.
    #[error("bus error: {0}")]
    Bus(String),

    /// No reply arrived within the wait window.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Reply length does not match the fixed report size.
    #[error("malformed response: expected {expected} bytes, got {actual}")]
    MalformedResponse { expected: usize, actual: usize },

    /// Reply does not correlate to the request. Only produced by the opt-in
    /// strict conversion; `Session::execute` hands uncorrelated replies back.
    #[error("response does not match request (class 0x{class:02X}, id 0x{id:02X})")]
    ResponseMismatch { class: u8, id: u8 },

    /// The device reported a soft error in the status byte. Only produced by
    /// the opt-in strict conversion.
    #[error("device reported {status} for class 0x{class:02X}, id 0x{id:02X}")]
    DeviceStatus { status: Status, class: u8, id: u8 },

    /// Device not found during enumeration.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Permission denied opening the HID node.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The operation is not exposed for this model.
    #[error("{operation} is not supported by {model}")]
    Unsupported {
        model: &'static str,
        operation: &'static str,
    },

    /// Profile serialization/deserialization error.
    #[error("profile error: {0}")]
    Profile(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
