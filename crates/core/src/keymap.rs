//! FN key translation table.
//!
//! While FN is held, selected keys act as media, brightness, and mode keys.
//! Key codes here are Linux input event codes.

use self::keys::*;
use crate::remap::InterfaceProtocol;

/// Linux input event codes used by the translation table.
pub mod keys {
    pub const KEY_KPENTER: u16 = 96;
    pub const KEY_MUTE: u16 = 113;
    pub const KEY_VOLUMEDOWN: u16 = 114;
    pub const KEY_VOLUMEUP: u16 = 115;
    pub const KEY_PAUSE: u16 = 119;
    pub const KEY_CALC: u16 = 140;
    pub const KEY_SLEEP: u16 = 142;
    pub const KEY_NEXTSONG: u16 = 163;
    pub const KEY_PLAYPAUSE: u16 = 164;
    pub const KEY_PREVIOUSSONG: u16 = 165;

    pub const KEY_F1: u16 = 59;
    pub const KEY_F2: u16 = 60;
    pub const KEY_F3: u16 = 61;
    pub const KEY_F4: u16 = 62;
    pub const KEY_F5: u16 = 63;
    pub const KEY_F6: u16 = 64;
    pub const KEY_F7: u16 = 65;
    pub const KEY_F8: u16 = 66;
    pub const KEY_F9: u16 = 67;
    pub const KEY_F10: u16 = 68;
    pub const KEY_F11: u16 = 87;
    pub const KEY_F12: u16 = 88;
    pub const KEY_F13: u16 = 183;
    pub const KEY_F17: u16 = 187;
    pub const KEY_F18: u16 = 188;
    pub const KEY_F19: u16 = 189;
    pub const KEY_F20: u16 = 190;
    pub const KEY_F24: u16 = 194;

    /// Toggles macro recording.
    pub const KEY_MACRO: u16 = KEY_F18;
    /// Toggles game mode.
    pub const KEY_GAME: u16 = KEY_F19;
    pub const KEY_BRIGHTNESS_DOWN: u16 = KEY_F20;
    pub const KEY_BRIGHTNESS_UP: u16 = KEY_F24;
}

/// Consume the key without emitting a replacement.
pub const KEY_FLAG_BLOCK: u8 = 0b0000_0001;

/// One FN translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTranslation {
    pub from: u16,
    pub to: u16,
    pub flags: u8,
}

impl KeyTranslation {
    /// Terminates a table.
    pub const SENTINEL: KeyTranslation = KeyTranslation::new(0, 0, 0);

    pub const fn new(from: u16, to: u16, flags: u8) -> Self {
        Self { from, to, flags }
    }

    pub fn is_blocked(&self) -> bool {
        self.flags & KEY_FLAG_BLOCK != 0
    }
}

/// FN layer of the BlackWidow Chroma family.
pub static CHROMA_KEYS: [KeyTranslation; 13] = [
    KeyTranslation::new(KEY_F1, KEY_MUTE, 0),
    KeyTranslation::new(KEY_F2, KEY_VOLUMEDOWN, 0),
    KeyTranslation::new(KEY_F3, KEY_VOLUMEUP, 0),
    KeyTranslation::new(KEY_F5, KEY_PREVIOUSSONG, 0),
    KeyTranslation::new(KEY_F6, KEY_PLAYPAUSE, 0),
    KeyTranslation::new(KEY_F7, KEY_NEXTSONG, 0),
    KeyTranslation::new(KEY_F9, KEY_MACRO, 0),
    KeyTranslation::new(KEY_F10, KEY_GAME, 0),
    KeyTranslation::new(KEY_F11, KEY_BRIGHTNESS_DOWN, 0),
    KeyTranslation::new(KEY_F12, KEY_BRIGHTNESS_UP, 0),
    KeyTranslation::new(KEY_PAUSE, KEY_SLEEP, 0),
    KeyTranslation::new(KEY_KPENTER, KEY_CALC, 0),
    KeyTranslation::SENTINEL,
];

/// First entry for `from`, scanning up to the sentinel.
pub fn find_translation(table: &[KeyTranslation], from: u16) -> Option<&KeyTranslation> {
    table
        .iter()
        .take_while(|entry| entry.from != 0)
        .find(|entry| entry.from == from)
}

/// What the input filter does with one key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventAction {
    /// Deliver the original event.
    Propagate,
    /// Drop the event.
    Suppress,
    /// Drop the event and emit this key code with the same value instead.
    Replace(u16),
}

/// Input event filter.
///
/// Only consults the table while FN is latched and never on the mouse
/// interface. `value` is the event value (press, release, repeat) and is
/// carried over unchanged by a replacement.
pub fn on_key_event(
    table: &[KeyTranslation],
    protocol: InterfaceProtocol,
    keycode: u16,
    _value: i32,
    fn_latched: bool,
) -> KeyEventAction {
    if protocol == InterfaceProtocol::Mouse || !fn_latched {
        return KeyEventAction::Propagate;
    }
    match find_translation(table, keycode) {
        Some(entry) if entry.is_blocked() => KeyEventAction::Suppress,
        Some(entry) => KeyEventAction::Replace(entry.to),
        None => KeyEventAction::Propagate,
    }
}

/// Map a HID keyboard usage to its Linux key code, for the keys the FN layer
/// and the macro remapper care about.
pub fn usage_to_keycode(usage: u8) -> Option<u16> {
    let code = match usage {
        0x3A..=0x43 => KEY_F1 + (usage - 0x3A) as u16,
        0x44 => KEY_F11,
        0x45 => KEY_F12,
        0x48 => KEY_PAUSE,
        0x58 => KEY_KPENTER,
        0x68..=0x73 => KEY_F13 + (usage - 0x68) as u16,
        _ => return None,
    };
    Some(code)
}

/// Short display name for a key code from [`keys`].
pub fn keycode_name(code: u16) -> Option<&'static str> {
    let name = match code {
        KEY_F1..=KEY_F10 => {
            const NAMES: [&str; 10] = [
                "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10",
            ];
            NAMES[(code - KEY_F1) as usize]
        }
        KEY_F11 => "F11",
        KEY_F12 => "F12",
        KEY_F13..=KEY_F24 => {
            const NAMES: [&str; 12] = [
                "F13", "F14", "F15", "F16", "F17", "F18", "F19", "F20", "F21", "F22", "F23",
                "F24",
            ];
            NAMES[(code - KEY_F13) as usize]
        }
        KEY_KPENTER => "KPENTER",
        KEY_MUTE => "MUTE",
        KEY_VOLUMEDOWN => "VOLUMEDOWN",
        KEY_VOLUMEUP => "VOLUMEUP",
        KEY_PAUSE => "PAUSE",
        KEY_CALC => "CALC",
        KEY_SLEEP => "SLEEP",
        KEY_NEXTSONG => "NEXTSONG",
        KEY_PLAYPAUSE => "PLAYPAUSE",
        KEY_PREVIOUSSONG => "PREVIOUSSONG",
        _ => return None,
    };
    Some(name)
}
