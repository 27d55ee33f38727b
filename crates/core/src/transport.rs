//! Transport session: send a report, fetch the correlated reply, classify it.
//!
//! The bus itself is abstracted behind [`BusTransport`] so real HID devices
//! and the test mock share the same interface. [`Session::execute`] follows
//! the device's own error model: a soft error is carried in the response
//! packet, so the response is always returned and the caller inspects the
//! attached [`ResponseCheck`].

use crate::error::{Error, Result};
use crate::report::{self, Report, Status};
use std::time::Duration;
use tracing::{trace, warn};

/// Microsecond band the device needs between a request and its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitWindow {
    pub min_us: u64,
    pub max_us: u64,
}

impl WaitWindow {
    /// Timing for this keyboard family.
    pub const CHROMA_KEYBOARD: WaitWindow = WaitWindow {
        min_us: 600,
        max_us: 800,
    };

    /// `min_us` must not exceed `max_us`.
    pub fn new(min_us: u64, max_us: u64) -> Result<Self> {
        if min_us > max_us {
            return Err(Error::OutOfRange {
                field: "wait window minimum",
                value: min_us.min(u32::MAX as u64) as u32,
                min: 0,
                max: max_us.min(u32::MAX as u64) as u32,
            });
        }
        Ok(Self { min_us, max_us })
    }

    pub fn min(&self) -> Duration {
        Duration::from_micros(self.min_us)
    }

    pub fn max(&self) -> Duration {
        Duration::from_micros(self.max_us)
    }
}

impl Default for WaitWindow {
    fn default() -> Self {
        Self::CHROMA_KEYBOARD
    }
}

/// Abstraction over the raw bus.
///
/// Implementations own the platform specifics (report ids, control transfer
/// plumbing). Both calls block.
pub trait BusTransport: Send + Sync {
    /// Hand an encoded report to the device as an output report.
    fn send_output_report(&self, data: &[u8]) -> Result<()>;

    /// Send an encoded report and read the device's reply, waiting within
    /// `wait` before giving up with [`Error::Timeout`].
    fn request_input_report(&self, data: &[u8], wait: WaitWindow) -> Result<Vec<u8>>;
}

/// How a response relates to the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCheck {
    /// Correlated, and the device reported success.
    Ok,
    /// Class, id, or packet count differ from the request.
    Mismatch,
    Busy,
    Failed,
    NotSupported,
    TimedOut,
}

impl ResponseCheck {
    /// Classify a response. Correlation is checked before status, so an
    /// uncorrelated reply is a mismatch even if it claims success.
    pub fn classify(request: &Report, response: &Report) -> Self {
        if !response.correlates_with(request) {
            return Self::Mismatch;
        }
        match response.status {
            Status::Busy => Self::Busy,
            Status::Failure => Self::Failed,
            Status::NotSupported => Self::NotSupported,
            Status::Timeout => Self::TimedOut,
            Status::None | Status::Successful | Status::Unknown(_) => Self::Ok,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl std::fmt::Display for ResponseCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Mismatch => "response doesn't match request",
            Self::Busy => "device is busy",
            Self::Failed => "command failed",
            Self::NotSupported => "command not supported",
            Self::TimedOut => "command timed out",
        };
        f.write_str(s)
    }
}

/// A response together with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub response: Report,
    pub check: ResponseCheck,
}

impl Executed {
    pub fn is_ok(&self) -> bool {
        self.check.is_ok()
    }

    /// Arguments of the reply, regardless of classification.
    pub fn args(&self) -> &[u8; report::ARGS_LEN] {
        &self.response.arguments
    }

    /// Turn any soft error into a typed error.
    pub fn into_strict(self) -> Result<Report> {
        let Executed { response, check } = self;
        match check {
            ResponseCheck::Ok => Ok(response),
            ResponseCheck::Mismatch => Err(Error::ResponseMismatch {
                class: response.command_class,
                id: response.command_id,
            }),
            _ => Err(Error::DeviceStatus {
                status: response.status,
                class: response.command_class,
                id: response.command_id,
            }),
        }
    }
}

/// A command session on one device's control interface.
///
/// The session does not serialize callers. Two threads executing against
/// the same device at once can receive each other's replies; correlation is
/// the only guard. Callers sharing a device must hold one command in flight
/// at a time.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    bus: &'a dyn BusTransport,
    wait: WaitWindow,
}

impl<'a> Session<'a> {
    pub fn new(bus: &'a dyn BusTransport) -> Self {
        Self::with_wait(bus, WaitWindow::default())
    }

    pub fn with_wait(bus: &'a dyn BusTransport, wait: WaitWindow) -> Self {
        Self { bus, wait }
    }

    pub fn wait(&self) -> WaitWindow {
        self.wait
    }

    /// Encode and send without waiting for a reply.
    pub fn send(&self, request: &Report) -> Result<()> {
        let encoded = seal_and_encode(request);
        trace!(
            class = format_args!("0x{:02X}", request.command_class),
            id = format_args!("0x{:02X}", request.command_id),
            report_hex = format_args!("{:02X?}", encoded),
            "TX"
        );
        self.bus.send_output_report(&encoded)
    }

    /// Send and decode the reply. A reply of the wrong length is an error.
    pub fn send_and_receive(&self, request: &Report) -> Result<Report> {
        let encoded = seal_and_encode(request);
        trace!(
            class = format_args!("0x{:02X}", request.command_class),
            id = format_args!("0x{:02X}", request.command_id),
            report_hex = format_args!("{:02X?}", encoded),
            "TX"
        );

        let raw = self.bus.request_input_report(&encoded, self.wait)?;
        let response = match report::decode(&raw) {
            Ok(r) => r,
            Err(e) => {
                warn!(len = raw.len(), "Invalid report length");
                return Err(e);
            }
        };

        trace!(
            status = %response.status,
            class = format_args!("0x{:02X}", response.command_class),
            id = format_args!("0x{:02X}", response.command_id),
            args_hex = format_args!("{:02X?}", response.args()),
            "RX"
        );

        if !response.crc_valid() {
            warn!(
                crc = format_args!("0x{:02X}", response.crc),
                expected = format_args!("0x{:02X}", report::checksum(&response)),
                "Response checksum mismatch"
            );
        }

        Ok(response)
    }

    /// Send, receive, and classify. Soft errors never become `Err`; only a
    /// bus failure or a malformed reply does.
    pub fn execute(&self, request: &Report) -> Result<Executed> {
        let response = self.send_and_receive(request)?;
        let check = ResponseCheck::classify(request, &response);
        if !check.is_ok() {
            log_erroneous(check, &response);
        }
        Ok(Executed { response, check })
    }
}

/// CRC is always recomputed right before encoding.
fn seal_and_encode(request: &Report) -> [u8; report::REPORT_LEN] {
    report::encode(&request.clone().sealed())
}

fn log_erroneous(check: ResponseCheck, response: &Report) {
    warn!(
        check = %check,
        status = format_args!("0x{:02X}", response.status.as_byte()),
        transaction_id = format_args!("0x{:02X}", response.transaction_id),
        remaining_packets = format_args!("0x{:04X}", response.remaining_packets),
        protocol_type = format_args!("0x{:02X}", response.protocol_type),
        data_size = format_args!("0x{:02X}", response.data_size),
        class = format_args!("0x{:02X}", response.command_class),
        id = format_args!("0x{:02X}", response.command_id),
        args_hex = format_args!("{:02X?}", response.args()),
        "Erroneous response"
    );
}

/// An in-memory bus for tests.
///
/// By default it echoes each request back with a configurable status,
/// optionally overlaying argument bytes for specific commands. Scripted
/// replies take precedence and are consumed in order.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// What the mock does on the next request when nothing is scripted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Fault {
        None,
        Timeout,
        BusError,
        /// Reply with a truncated buffer.
        ShortReply,
        /// Reply with a different command id.
        Uncorrelated,
        /// Reply with a corrupted CRC.
        BadCrc,
    }

    struct State {
        sent: Vec<Report>,
        outputs: Vec<Report>,
        scripted: VecDeque<Vec<u8>>,
        status: Status,
        overlays: HashMap<(u8, u8), Vec<u8>>,
        fault: Fault,
    }

    pub struct MockTransport {
        state: Mutex<State>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(State {
                    sent: Vec::new(),
                    outputs: Vec::new(),
                    scripted: VecDeque::new(),
                    status: Status::Successful,
                    overlays: HashMap::new(),
                    fault: Fault::None,
                }),
            }
        }

        /// Status placed in echoed replies.
        pub fn set_status(&self, status: Status) {
            self.state.lock().unwrap().status = status;
        }

        pub fn set_fault(&self, fault: Fault) {
            self.state.lock().unwrap().fault = fault;
        }

        /// Argument bytes placed at the start of every echoed reply to
        /// `(class, id)`.
        pub fn on_command(&self, class: u8, id: u8, args: &[u8]) {
            self.state
                .lock()
                .unwrap()
                .overlays
                .insert((class, id), args.to_vec());
        }

        /// Queue a raw reply for the next request.
        pub fn push_reply(&self, raw: Vec<u8>) {
            self.state.lock().unwrap().scripted.push_back(raw);
        }

        /// Every request received through `request_input_report`.
        pub fn sent(&self) -> Vec<Report> {
            self.state.lock().unwrap().sent.clone()
        }

        /// Every report received through `send_output_report`.
        pub fn outputs(&self) -> Vec<Report> {
            self.state.lock().unwrap().outputs.clone()
        }

        /// Total reports received over both paths.
        pub fn request_count(&self) -> usize {
            let state = self.state.lock().unwrap();
            state.sent.len() + state.outputs.len()
        }
    }

    impl BusTransport for MockTransport {
        fn send_output_report(&self, data: &[u8]) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if state.fault == Fault::BusError {
                return Err(Error::Bus("mock: bus error".into()));
            }
            let report = report::decode(data)?;
            state.outputs.push(report);
            Ok(())
        }

        fn request_input_report(&self, data: &[u8], _wait: WaitWindow) -> Result<Vec<u8>> {
            let mut state = self.state.lock().unwrap();
            let request = report::decode(data)?;
            state.sent.push(request.clone());

            if let Some(raw) = state.scripted.pop_front() {
                return Ok(raw);
            }

            match state.fault {
                Fault::Timeout => return Err(Error::Timeout("mock: no reply".into())),
                Fault::BusError => return Err(Error::Bus("mock: bus error".into())),
                Fault::ShortReply => return Ok(data[..64].to_vec()),
                _ => {}
            }

            let mut reply = request;
            reply.status = state.status;
            if let Some(args) = state.overlays.get(&(reply.command_class, reply.command_id)) {
                reply.arguments[..args.len()].copy_from_slice(args);
            }
            if state.fault == Fault::Uncorrelated {
                reply.command_id ^= 0x01;
            }
            let mut reply = reply.sealed();
            if state.fault == Fault::BadCrc {
                reply.crc ^= 0xFF;
            }
            Ok(report::encode(&reply).to_vec())
        }
    }
}
