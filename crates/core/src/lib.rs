//! chroma-kbd-core: Razer keyboard report protocol, command builders, and
//! input remapping.
//!
//! This crate provides the cross-platform core logic for driving Razer
//! Chroma keyboards over USB HID feature reports: the 90-byte report codec,
//! the command catalogue in both wire dialects, the per-model table, and the
//! FN-layer remapping of macro-key input reports.

pub mod attributes;
pub mod comm;
pub mod command;
pub mod device;
pub mod error;
pub mod keymap;
pub mod profile;
pub mod remap;
pub mod report;
pub mod safety;
pub mod transport;

/// Razer USB Vendor ID.
pub const RAZER_VID: u16 = 0x1532;

/// Supported keyboard product IDs.
pub mod pids {
    pub const BLACKWIDOW_ULTIMATE_2012: u16 = 0x010D;
    pub const BLACKWIDOW_ULTIMATE_2013: u16 = 0x011A;
    /// Also sold as the BlackWidow Stealth.
    pub const BLACKWIDOW_ORIGINAL: u16 = 0x011B;
    pub const BLACKWIDOW_CHROMA: u16 = 0x0203;
    pub const BLADE_STEALTH: u16 = 0x0205;
    pub const TARTARUS_CHROMA: u16 = 0x0208;
    pub const BLACKWIDOW_CHROMA_TE: u16 = 0x0209;
    pub const BLACKWIDOW_ULTIMATE_2016: u16 = 0x0214;
    pub const BLACKWIDOW_X_CHROMA: u16 = 0x0216;
    pub const BLACKWIDOW_X_CHROMA_TE: u16 = 0x021A;
    pub const ORNATA_CHROMA: u16 = 0x021E;
    pub const BLADE_STEALTH_LATE_2016: u16 = 0x0220;
}
