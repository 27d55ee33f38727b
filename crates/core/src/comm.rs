//! Caller-side communication policy: error classification and opt-in retry.
//!
//! [`Session::execute`] never retries. Callers that want to ride out a busy
//! device or a missed reply wrap their call in [`execute_with_retry`].

use crate::command::standard;
use crate::error::{Error, Result};
use crate::report::Report;
use crate::transport::{Executed, ResponseCheck, Session};
use tracing::{debug, warn};

/// Default retry budget for [`execute_with_retry`].
pub const MAX_RETRIES: u32 = 3;

/// Classification of communication errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// May succeed on retry (timeout, busy).
    Transient,
    /// Device is gone. Stop retrying.
    Disconnected,
    /// The HID node can't be opened by this user.
    PermissionDenied,
    /// Device answered with an error status or an uncorrelated reply.
    Protocol,
    /// Corrupted or unexpected data.
    InvalidResponse,
    /// Rejected before anything was sent.
    InvalidInput,
}

impl ErrorClass {
    /// Classify an error for retry decisions.
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::Timeout(_) => Self::Transient,
            Error::DeviceStatus {
                status: crate::report::Status::Busy,
                ..
            } => Self::Transient,
            Error::PermissionDenied(_) => Self::PermissionDenied,
            Error::DeviceNotFound(_) => Self::Disconnected,
            Error::DeviceStatus { .. } | Error::ResponseMismatch { .. } => Self::Protocol,
            Error::Bus(msg) => {
                let lower = msg.to_lowercase();
                if lower.contains("disconnect")
                    || lower.contains("not found")
                    || lower.contains("no such device")
                {
                    Self::Disconnected
                } else if lower.contains("permission") || lower.contains("access denied") {
                    Self::PermissionDenied
                } else if lower.contains("timeout") || lower.contains("timed out") {
                    Self::Transient
                } else {
                    Self::InvalidResponse
                }
            }
            Error::MalformedResponse { .. } | Error::Profile(_) => Self::InvalidResponse,
            Error::InputValidation { .. } | Error::OutOfRange { .. } | Error::Unsupported { .. } => {
                Self::InvalidInput
            }
        }
    }

    /// Whether this error class is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Execute, retrying while the device reports busy or the reply times out.
///
/// Waits the session's maximum wait between attempts. Any other outcome,
/// including other soft errors, is returned as-is.
pub fn execute_with_retry(
    session: &Session<'_>,
    request: &Report,
    max_retries: u32,
) -> Result<Executed> {
    let mut attempt = 0;
    loop {
        let outcome = session.execute(request);
        let retryable = match &outcome {
            Ok(executed) => executed.check == ResponseCheck::Busy,
            Err(e) => ErrorClass::classify(e).is_retryable(),
        };

        if !retryable {
            if attempt > 0 && outcome.is_ok() {
                debug!(attempt = attempt + 1, "Command finished after retry");
            }
            return outcome;
        }
        if attempt == max_retries {
            warn!(
                attempts = attempt + 1,
                class = format_args!("0x{:02X}", request.command_class),
                id = format_args!("0x{:02X}", request.command_id),
                "Giving up on command"
            );
            return outcome;
        }

        debug!(
            attempt = attempt + 1,
            max = max_retries + 1,
            "Transient failure, retrying"
        );
        std::thread::sleep(session.wait().max());
        attempt += 1;
    }
}

/// Device connection status for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Answering commands.
    Connected,
    /// Answered, but with an error status or a mismatched reply.
    Unresponsive,
    Disconnected,
    /// Needs udev rules or group membership.
    PermissionError,
    /// Communication error (transient or protocol).
    Error,
}

/// Check connectivity by asking for the firmware version.
pub fn probe(session: &Session<'_>) -> DeviceStatus {
    match session.execute(&standard::get_firmware_version()) {
        Ok(executed) if executed.is_ok() => DeviceStatus::Connected,
        Ok(_) => DeviceStatus::Unresponsive,
        Err(ref e) => match ErrorClass::classify(e) {
            ErrorClass::Disconnected => DeviceStatus::Disconnected,
            ErrorClass::PermissionDenied => DeviceStatus::PermissionError,
            _ => DeviceStatus::Error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{self, Status};
    use crate::transport::mock::{Fault, MockTransport};
    use crate::transport::WaitWindow;

    fn busy_reply(request: &Report, status: Status) -> Vec<u8> {
        let mut reply = request.clone();
        reply.status = status;
        report::encode(&reply.sealed()).to_vec()
    }

    fn fast(mock: &MockTransport) -> Session<'_> {
        Session::with_wait(mock, WaitWindow::new(0, 1).unwrap())
    }

    #[test]
    fn classify_timeout_as_transient() {
        let err = Error::Timeout("800us elapsed".into());
        assert_eq!(ErrorClass::classify(&err), ErrorClass::Transient);
        assert!(ErrorClass::classify(&err).is_retryable());
    }

    #[test]
    fn classify_permission_denied() {
        let err = Error::PermissionDenied("/dev/hidraw3".into());
        assert_eq!(ErrorClass::classify(&err), ErrorClass::PermissionDenied);
        assert!(!ErrorClass::classify(&err).is_retryable());
    }

    #[test]
    fn classify_bus_messages() {
        let err = Error::Bus("No such device".into());
        assert_eq!(ErrorClass::classify(&err), ErrorClass::Disconnected);
        let err = Error::Bus("read timed out".into());
        assert_eq!(ErrorClass::classify(&err), ErrorClass::Transient);
        let err = Error::Bus("hidapi: garbage".into());
        assert_eq!(ErrorClass::classify(&err), ErrorClass::InvalidResponse);
    }

    #[test]
    fn classify_strict_soft_errors() {
        let busy = Error::DeviceStatus {
            status: Status::Busy,
            class: 0x03,
            id: 0x0A,
        };
        assert!(ErrorClass::classify(&busy).is_retryable());

        let failed = Error::DeviceStatus {
            status: Status::Failure,
            class: 0x03,
            id: 0x0A,
        };
        assert_eq!(ErrorClass::classify(&failed), ErrorClass::Protocol);

        let input = Error::InputValidation {
            operation: "reactive effect",
            expected: "4",
            actual: 3,
        };
        assert_eq!(ErrorClass::classify(&input), ErrorClass::InvalidInput);
    }

    #[test]
    fn retry_rides_out_busy() {
        let mock = MockTransport::new();
        let request = standard::get_firmware_version();
        mock.push_reply(busy_reply(&request, Status::Busy));
        mock.push_reply(busy_reply(&request, Status::Busy));

        let executed = execute_with_retry(&fast(&mock), &request, MAX_RETRIES).unwrap();
        assert!(executed.is_ok());
        assert_eq!(mock.sent().len(), 3);
    }

    #[test]
    fn retry_stops_at_budget() {
        let mock = MockTransport::new();
        mock.set_status(Status::Busy);
        let request = standard::get_firmware_version();

        let executed = execute_with_retry(&fast(&mock), &request, 2).unwrap();
        assert_eq!(executed.check, ResponseCheck::Busy);
        assert_eq!(mock.sent().len(), 3);
    }

    #[test]
    fn retry_ignores_other_soft_errors() {
        let mock = MockTransport::new();
        mock.set_status(Status::Failure);
        let executed =
            execute_with_retry(&fast(&mock), &standard::get_device_mode(), MAX_RETRIES).unwrap();
        assert_eq!(executed.check, ResponseCheck::Failed);
        assert_eq!(mock.sent().len(), 1);
    }

    #[test]
    fn retry_on_timeout_then_give_up() {
        let mock = MockTransport::new();
        mock.set_fault(Fault::Timeout);
        let result = execute_with_retry(&fast(&mock), &standard::get_serial(), 1);
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert_eq!(mock.sent().len(), 2);
    }

    #[test]
    fn probe_states() {
        let mock = MockTransport::new();
        assert_eq!(probe(&fast(&mock)), DeviceStatus::Connected);

        mock.set_status(Status::NotSupported);
        assert_eq!(probe(&fast(&mock)), DeviceStatus::Unresponsive);

        mock.set_fault(Fault::Timeout);
        assert_eq!(probe(&fast(&mock)), DeviceStatus::Error);
    }
}
