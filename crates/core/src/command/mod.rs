//! Command builders.
//!
//! Every builder is a pure function returning a sealed [`Report`]. Two wire
//! dialects exist for the same logical operations:
//!
//! - [`standard`]: older boards, matrix effects on class 0x03.
//! - [`extended`]: newer boards, matrix effects on class 0x0F with an
//!   explicit storage/LED header.
//!
//! Builders never pick a dialect themselves; the caller selects one from the
//! model descriptor (see [`crate::device::ModelDescriptor`]).

pub mod extended;
pub mod misc;
pub mod standard;

use crate::device::Dialect;
use crate::report::Report;
use serde::{Deserialize, Serialize};

/// Command classes.
pub mod class {
    /// Device information and mode.
    pub const DEVICE: u8 = 0x00;
    /// FN key behaviour.
    pub const MISC_KEYS: u8 = 0x02;
    /// Standard LED and matrix effects.
    pub const STANDARD_MATRIX: u8 = 0x03;
    /// Blade laptop keyboard brightness.
    pub const MISC_BLADE: u8 = 0x0E;
    /// Extended matrix effects.
    pub const EXTENDED_MATRIX: u8 = 0x0F;
}

/// Persistence target for a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Storage {
    /// Volatile, lost on power cycle.
    NoStore = 0x00,
    /// Persisted in device memory.
    VarStore = 0x01,
}

/// LED identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Led {
    Zero = 0x00,
    ScrollWheel = 0x01,
    Battery = 0x03,
    Logo = 0x04,
    Backlight = 0x05,
    Macro = 0x07,
    Game = 0x08,
    RedProfile = 0x0C,
    GreenProfile = 0x0D,
    BlueProfile = 0x0E,
}

/// An RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Read a triple from the first three bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [r, g, b, ..] => Some(Self::new(*r, *g, *b)),
            _ => None,
        }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Direction of the wave effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveDirection {
    Left,
    Right,
}

impl WaveDirection {
    /// Interpret a raw direction value the way the given dialect numbers it:
    /// standard uses 1/2, extended uses 0/1. Out-of-range values clamp.
    pub fn from_wire(dialect: Dialect, value: u8) -> Self {
        match dialect {
            Dialect::Standard if value >= 2 => Self::Right,
            Dialect::Standard => Self::Left,
            Dialect::Extended if value >= 1 => Self::Right,
            Dialect::Extended => Self::Left,
        }
    }
}

/// Colour selection for breathing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Breathing {
    Random,
    Single(Rgb),
    Dual(Rgb, Rgb),
}

/// Colour selection for starlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Starlight {
    Random,
    Single(Rgb),
    Dual(Rgb, Rgb),
}

/// A logical matrix lighting effect, independent of dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatrixEffect {
    None,
    Static { color: Rgb },
    Wave { direction: WaveDirection },
    Spectrum,
    Reactive { speed: u8, color: Rgb },
    Breathing { colors: Breathing },
    Starlight { speed: u8, colors: Starlight },
    CustomFrame,
}

impl MatrixEffect {
    /// Build the report for this effect in the given dialect.
    pub fn build(&self, dialect: Dialect, storage: Storage, led: Led) -> Report {
        match dialect {
            Dialect::Standard => self.build_standard(storage, led),
            Dialect::Extended => self.build_extended(storage, led),
        }
    }

    fn build_standard(&self, storage: Storage, led: Led) -> Report {
        use standard as s;
        match *self {
            Self::None => s::matrix_effect_none(storage, led),
            Self::Static { color } => s::matrix_effect_static(storage, led, color),
            Self::Wave { direction } => s::matrix_effect_wave(storage, led, direction),
            Self::Spectrum => s::matrix_effect_spectrum(storage, led),
            Self::Reactive { speed, color } => {
                s::matrix_effect_reactive(storage, led, speed, color)
            }
            Self::Breathing { colors } => match colors {
                Breathing::Random => s::matrix_effect_breathing_random(storage, led),
                Breathing::Single(c) => s::matrix_effect_breathing_single(storage, led, c),
                Breathing::Dual(a, b) => s::matrix_effect_breathing_dual(storage, led, a, b),
            },
            Self::Starlight { speed, colors } => match colors {
                Starlight::Random => s::matrix_effect_starlight_random(storage, led, speed),
                Starlight::Single(c) => s::matrix_effect_starlight_single(storage, led, speed, c),
                Starlight::Dual(a, b) => {
                    s::matrix_effect_starlight_dual(storage, led, speed, a, b)
                }
            },
            Self::CustomFrame => s::matrix_effect_custom_frame(),
        }
    }

    fn build_extended(&self, storage: Storage, led: Led) -> Report {
        use extended as e;
        match *self {
            Self::None => e::matrix_effect_none(storage, led),
            Self::Static { color } => e::matrix_effect_static(storage, led, color),
            Self::Wave { direction } => e::matrix_effect_wave(storage, led, direction),
            Self::Spectrum => e::matrix_effect_spectrum(storage, led),
            Self::Reactive { speed, color } => {
                e::matrix_effect_reactive(storage, led, speed, color)
            }
            Self::Breathing { colors } => match colors {
                Breathing::Random => e::matrix_effect_breathing_random(storage, led),
                Breathing::Single(c) => e::matrix_effect_breathing_single(storage, led, c),
                Breathing::Dual(a, b) => e::matrix_effect_breathing_dual(storage, led, a, b),
            },
            Self::Starlight { speed, colors } => match colors {
                Starlight::Random => e::matrix_effect_starlight_random(storage, led, speed),
                Starlight::Single(c) => e::matrix_effect_starlight_single(storage, led, speed, c),
                Starlight::Dual(a, b) => {
                    e::matrix_effect_starlight_dual(storage, led, speed, a, b)
                }
            },
            Self::CustomFrame => e::matrix_effect_custom_frame(),
        }
    }
}

/// One row of a custom frame: the row index and the colours from column 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFrame {
    pub index: u8,
    pub colors: Vec<Rgb>,
}

impl RowFrame {
    /// Inclusive index of the last column written.
    pub(crate) fn end_column(&self) -> u8 {
        self.colors.len().saturating_sub(1).min(u8::MAX as usize) as u8
    }
}

/// Copy RGB triples into `dest`, stopping when either side runs out.
pub(crate) fn write_colors(dest: &mut [u8], colors: &[Rgb]) -> usize {
    let mut written = 0;
    for (chunk, color) in dest.chunks_exact_mut(3).zip(colors) {
        chunk.copy_from_slice(&color.to_bytes());
        written += 3;
    }
    written
}

/// Clamp the way the firmware expects out-of-range parameters to be handled.
pub(crate) fn clamp_u8(value: u8, min: u8, max: u8) -> u8 {
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::checksum;

    #[test]
    fn rgb_from_slice() {
        assert_eq!(Rgb::from_slice(&[1, 2, 3, 4]), Some(Rgb::new(1, 2, 3)));
        assert_eq!(Rgb::from_slice(&[1, 2]), None);
    }

    #[test]
    fn wave_direction_per_dialect() {
        assert_eq!(WaveDirection::from_wire(Dialect::Standard, 1), WaveDirection::Left);
        assert_eq!(WaveDirection::from_wire(Dialect::Standard, 2), WaveDirection::Right);
        assert_eq!(WaveDirection::from_wire(Dialect::Standard, 0), WaveDirection::Left);
        assert_eq!(WaveDirection::from_wire(Dialect::Extended, 0), WaveDirection::Left);
        assert_eq!(WaveDirection::from_wire(Dialect::Extended, 1), WaveDirection::Right);
        assert_eq!(WaveDirection::from_wire(Dialect::Extended, 9), WaveDirection::Right);
    }

    #[test]
    fn every_effect_builds_sealed_reports_in_both_dialects() {
        let red = Rgb::new(0xFF, 0, 0);
        let blue = Rgb::new(0, 0, 0xFF);
        let effects = [
            MatrixEffect::None,
            MatrixEffect::Static { color: red },
            MatrixEffect::Wave { direction: WaveDirection::Right },
            MatrixEffect::Spectrum,
            MatrixEffect::Reactive { speed: 2, color: red },
            MatrixEffect::Breathing { colors: Breathing::Random },
            MatrixEffect::Breathing { colors: Breathing::Single(red) },
            MatrixEffect::Breathing { colors: Breathing::Dual(red, blue) },
            MatrixEffect::Starlight { speed: 1, colors: Starlight::Random },
            MatrixEffect::Starlight { speed: 1, colors: Starlight::Single(red) },
            MatrixEffect::Starlight { speed: 1, colors: Starlight::Dual(red, blue) },
            MatrixEffect::CustomFrame,
        ];

        for effect in effects {
            let std = effect.build(Dialect::Standard, Storage::VarStore, Led::Backlight);
            assert_eq!(std.command_class, class::STANDARD_MATRIX);
            assert_eq!(std.crc, checksum(&std));

            let ext = effect.build(Dialect::Extended, Storage::VarStore, Led::Backlight);
            assert_eq!(ext.command_class, class::EXTENDED_MATRIX);
            assert_eq!(ext.crc, checksum(&ext));
        }
    }

    #[test]
    fn matrix_effect_serializes_with_kind_tag() {
        let effect = MatrixEffect::Static {
            color: Rgb::new(1, 2, 3),
        };
        let json = serde_json::to_string(&effect).unwrap();
        assert!(json.contains("\"kind\":\"static\""));
        let back: MatrixEffect = serde_json::from_str(&json).unwrap();
        assert_eq!(back, effect);
    }

    #[test]
    fn write_colors_stops_at_destination_end() {
        let mut dest = [0u8; 7];
        let colors = [Rgb::new(1, 1, 1), Rgb::new(2, 2, 2), Rgb::new(3, 3, 3)];
        assert_eq!(write_colors(&mut dest, &colors), 6);
        assert_eq!(dest, [1, 1, 1, 2, 2, 2, 0]);
    }
}
