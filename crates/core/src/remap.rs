//! Input remapper for the vendor macro report.
//!
//! With macro keys or FN held, the keyboard sends a 16-byte report that
//! starts with `0x04` instead of a standard boot keyboard report. The
//! remapper rewrites it in place into the standard shape:
//!
//! - the FN code is removed and recorded in the latch,
//! - M1..M5 become F13..F17,
//! - every key code moves one slot to the right,
//! - the header becomes `01 00`.
//!
//! The scan starts one slot before the end, so with a full rollover the last
//! key slot is overwritten. That loss is accepted.

/// Length of the macro report.
pub const MACRO_REPORT_LEN: usize = 16;
/// First byte of the macro report.
pub const MACRO_REPORT_MARKER: u8 = 0x04;
/// Key code the keyboard uses for FN inside the macro report.
pub const FN_CODE: u8 = 0x01;
/// M1. M2..M5 follow contiguously.
pub const MACRO_KEY_FIRST: u8 = 0x20;
/// HID usage M1 is remapped to (F13). M2..M5 map to F14..F17.
pub const MACRO_KEY_REMAP_FIRST: u8 = 0x68;
/// Number of macro keys.
pub const MACRO_KEY_COUNT: u8 = 5;
/// Header of a rewritten report.
pub const REMAPPED_HEADER: [u8; 2] = [0x01, 0x00];

/// Protocol of the interface a raw report arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceProtocol {
    Keyboard,
    Mouse,
    Other,
}

impl InterfaceProtocol {
    /// From a top-level HID usage, for hosts that only expose the report
    /// descriptor (Generic Desktop keyboard or mouse).
    pub fn from_usage(usage_page: u16, usage: u16) -> Self {
        match (usage_page, usage) {
            (0x01, 0x06) => Self::Keyboard,
            (0x01, 0x02) => Self::Mouse,
            _ => Self::Other,
        }
    }
}

/// Whether FN is currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FnLatch {
    #[default]
    Released,
    Latched,
}

impl FnLatch {
    pub fn is_latched(self) -> bool {
        self == Self::Latched
    }
}

impl From<bool> for FnLatch {
    fn from(held: bool) -> Self {
        if held {
            Self::Latched
        } else {
            Self::Released
        }
    }
}

/// Outcome for one raw report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawReport {
    /// Not a macro report; forward the original bytes.
    PassThrough,
    /// The rewritten report.
    Rewritten([u8; MACRO_REPORT_LEN]),
}

/// Whether a report has the macro report shape and arrived on the keyboard
/// interface.
pub fn is_macro_report(protocol: InterfaceProtocol, data: &[u8]) -> bool {
    protocol == InterfaceProtocol::Keyboard
        && data.len() == MACRO_REPORT_LEN
        && data[0] == MACRO_REPORT_MARKER
}

/// Advance the latch over one raw report.
///
/// Reports of any other shape leave the latch untouched. For a macro report
/// the new latch is a level: latched iff FN appears in this report.
pub fn remap_raw_report(
    state: FnLatch,
    protocol: InterfaceProtocol,
    data: &[u8],
) -> (FnLatch, RawReport) {
    if !is_macro_report(protocol, data) {
        return (state, RawReport::PassThrough);
    }

    let mut out = [0u8; MACRO_REPORT_LEN];
    out.copy_from_slice(data);

    let mut found_fn = false;
    for index in (1..MACRO_REPORT_LEN - 1).rev() {
        let code = out[index];
        if code == 0 {
            continue;
        }
        let mapped = if code == FN_CODE {
            found_fn = true;
            0
        } else if (MACRO_KEY_FIRST..MACRO_KEY_FIRST + MACRO_KEY_COUNT).contains(&code) {
            code - MACRO_KEY_FIRST + MACRO_KEY_REMAP_FIRST
        } else {
            code
        };
        out[index + 1] = mapped;
    }
    out[..2].copy_from_slice(&REMAPPED_HEADER);

    (FnLatch::from(found_fn), RawReport::Rewritten(out))
}

/// Per-device remapper state.
#[derive(Debug, Default)]
pub struct Remapper {
    latch: FnLatch,
}

impl Remapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite `data` in place if it is a macro report. Returns whether the
    /// bytes changed shape.
    pub fn on_raw_report(&mut self, protocol: InterfaceProtocol, data: &mut [u8]) -> bool {
        let (latch, outcome) = remap_raw_report(self.latch, protocol, data);
        self.latch = latch;
        match outcome {
            RawReport::Rewritten(bytes) => {
                data.copy_from_slice(&bytes);
                true
            }
            RawReport::PassThrough => false,
        }
    }

    pub fn latch(&self) -> FnLatch {
        self.latch
    }

    pub fn fn_latched(&self) -> bool {
        self.latch.is_latched()
    }
}
