//! Standard dialect builders.
//!
//! Matrix effects live on class 0x03, command 0x0A, with the effect id in
//! `arguments[0]` (static colour is the exception: it carries the bare RGB
//! triple). The standard matrix command has no storage or LED slot; both are
//! accepted anyway so that standard and extended builders share signatures.
//!
//! Device information and mode commands (class 0x00) are shared by both
//! dialects and also live here.

use super::{class, clamp_u8, write_colors, Led, RowFrame, Rgb, Storage, WaveDirection};
use crate::report::Report;

/// Matrix effect command id.
const MATRIX_EFFECT: u8 = 0x0A;
/// Custom frame row command id.
const MATRIX_ROW: u8 = 0x0B;

mod effect_id {
    pub const NONE: u8 = 0x00;
    pub const WAVE: u8 = 0x01;
    pub const REACTIVE: u8 = 0x02;
    pub const BREATHING: u8 = 0x03;
    pub const SPECTRUM: u8 = 0x04;
    pub const CUSTOM_FRAME: u8 = 0x05;
    pub const STARLIGHT: u8 = 0x19;
}

/// Colour selector shared by breathing and starlight.
mod color_mode {
    pub const SINGLE: u8 = 0x01;
    pub const DUAL: u8 = 0x02;
    pub const RANDOM: u8 = 0x03;
}

/// Device mode: normal (hardware-driven effects).
pub const DEVICE_MODE_NORMAL: u8 = 0x00;
/// Device mode: driver (host-driven effects).
pub const DEVICE_MODE_DRIVER: u8 = 0x03;

/// Length of the serial number string.
pub const SERIAL_LEN: u8 = 0x16;

// ---------------------------------------------------------------------------
// Device information and mode (class 0x00)
// ---------------------------------------------------------------------------

pub fn set_device_mode(mode: u8, param: u8) -> Report {
    let mut report = Report::new(class::DEVICE, 0x04, 0x02);
    report.arguments[0] = mode;
    report.arguments[1] = param;
    report.sealed()
}

/// Reply: `arguments[0]` = mode, `arguments[1]` = param.
pub fn get_device_mode() -> Report {
    Report::new(class::DEVICE, 0x84, 0x02).sealed()
}

/// Reply: NUL-padded ASCII serial in `arguments[0..22]`.
pub fn get_serial() -> Report {
    Report::new(class::DEVICE, 0x82, SERIAL_LEN).sealed()
}

/// Reply: `arguments[0]` = major, `arguments[1]` = minor.
pub fn get_firmware_version() -> Report {
    Report::new(class::DEVICE, 0x81, 0x02).sealed()
}

// ---------------------------------------------------------------------------
// Single LEDs (class 0x03)
// ---------------------------------------------------------------------------

pub fn set_led_state(storage: Storage, led: Led, on: bool) -> Report {
    let mut report = Report::new(class::STANDARD_MATRIX, 0x00, 0x03);
    report.arguments[0] = storage as u8;
    report.arguments[1] = led as u8;
    report.arguments[2] = on as u8;
    report.sealed()
}

/// Reply: `arguments[2]` = state.
pub fn get_led_state(storage: Storage, led: Led) -> Report {
    let mut report = Report::new(class::STANDARD_MATRIX, 0x80, 0x03);
    report.arguments[0] = storage as u8;
    report.arguments[1] = led as u8;
    report.sealed()
}

/// LED effect: 0 static, 1 blinking, 2 pulsating, 4 spectrum. Values above 5
/// clamp to 5.
pub fn set_led_effect(storage: Storage, led: Led, effect: u8) -> Report {
    let mut report = Report::new(class::STANDARD_MATRIX, 0x02, 0x03);
    report.arguments[0] = storage as u8;
    report.arguments[1] = led as u8;
    report.arguments[2] = clamp_u8(effect, 0x00, 0x05);
    report.sealed()
}

/// Reply: `arguments[2]` = effect.
pub fn get_led_effect(storage: Storage, led: Led) -> Report {
    let mut report = Report::new(class::STANDARD_MATRIX, 0x82, 0x03);
    report.arguments[0] = storage as u8;
    report.arguments[1] = led as u8;
    report.sealed()
}

pub fn set_led_brightness(storage: Storage, led: Led, brightness: u8) -> Report {
    let mut report = Report::new(class::STANDARD_MATRIX, 0x03, 0x03);
    report.arguments[0] = storage as u8;
    report.arguments[1] = led as u8;
    report.arguments[2] = brightness;
    report.sealed()
}

/// Reply: `arguments[2]` = brightness.
pub fn get_led_brightness(storage: Storage, led: Led) -> Report {
    let mut report = Report::new(class::STANDARD_MATRIX, 0x83, 0x03);
    report.arguments[0] = storage as u8;
    report.arguments[1] = led as u8;
    report.sealed()
}

// ---------------------------------------------------------------------------
// Matrix effects (class 0x03, id 0x0A)
// ---------------------------------------------------------------------------

fn matrix_effect(effect: u8, params: &[u8]) -> Report {
    let mut report = Report::new(
        class::STANDARD_MATRIX,
        MATRIX_EFFECT,
        (params.len() + 1) as u8,
    );
    report.arguments[0] = effect;
    report.arguments[1..=params.len()].copy_from_slice(params);
    report.sealed()
}

pub fn matrix_effect_none(_storage: Storage, _led: Led) -> Report {
    matrix_effect(effect_id::NONE, &[])
}

pub fn matrix_effect_wave(_storage: Storage, _led: Led, direction: WaveDirection) -> Report {
    let direction = match direction {
        WaveDirection::Left => 0x01,
        WaveDirection::Right => 0x02,
    };
    matrix_effect(effect_id::WAVE, &[direction])
}

pub fn matrix_effect_spectrum(_storage: Storage, _led: Led) -> Report {
    matrix_effect(effect_id::SPECTRUM, &[])
}

/// Speed clamps to 1..=4.
pub fn matrix_effect_reactive(_storage: Storage, _led: Led, speed: u8, color: Rgb) -> Report {
    let [r, g, b] = color.to_bytes();
    matrix_effect(effect_id::REACTIVE, &[clamp_u8(speed, 0x01, 0x04), r, g, b])
}

/// Static colour: the RGB triple alone, `data_size` 3.
pub fn matrix_effect_static(_storage: Storage, _led: Led, color: Rgb) -> Report {
    let mut report = Report::new(class::STANDARD_MATRIX, MATRIX_EFFECT, 0x03);
    write_colors(&mut report.arguments, &[color]);
    report.sealed()
}

pub fn matrix_effect_breathing_random(_storage: Storage, _led: Led) -> Report {
    matrix_effect(effect_id::BREATHING, &[color_mode::RANDOM])
}

pub fn matrix_effect_breathing_single(_storage: Storage, _led: Led, color: Rgb) -> Report {
    let [r, g, b] = color.to_bytes();
    matrix_effect(effect_id::BREATHING, &[color_mode::SINGLE, r, g, b])
}

pub fn matrix_effect_breathing_dual(_storage: Storage, _led: Led, first: Rgb, second: Rgb) -> Report {
    let [r1, g1, b1] = first.to_bytes();
    let [r2, g2, b2] = second.to_bytes();
    matrix_effect(
        effect_id::BREATHING,
        &[color_mode::DUAL, r1, g1, b1, r2, g2, b2],
    )
}

/// Speed clamps to 1..=3.
pub fn matrix_effect_starlight_random(_storage: Storage, _led: Led, speed: u8) -> Report {
    matrix_effect(
        effect_id::STARLIGHT,
        &[color_mode::RANDOM, clamp_u8(speed, 0x01, 0x03)],
    )
}

pub fn matrix_effect_starlight_single(_storage: Storage, _led: Led, speed: u8, color: Rgb) -> Report {
    let [r, g, b] = color.to_bytes();
    matrix_effect(
        effect_id::STARLIGHT,
        &[color_mode::SINGLE, clamp_u8(speed, 0x01, 0x03), r, g, b],
    )
}

pub fn matrix_effect_starlight_dual(
    _storage: Storage,
    _led: Led,
    speed: u8,
    first: Rgb,
    second: Rgb,
) -> Report {
    let [r1, g1, b1] = first.to_bytes();
    let [r2, g2, b2] = second.to_bytes();
    matrix_effect(
        effect_id::STARLIGHT,
        &[color_mode::DUAL, clamp_u8(speed, 0x01, 0x03), r1, g1, b1, r2, g2, b2],
    )
}

/// Switch the matrix to display frames uploaded with [`set_key_row`].
pub fn matrix_effect_custom_frame() -> Report {
    matrix_effect(effect_id::CUSTOM_FRAME, &[0x00])
}

/// Upload one row of a custom frame.
///
/// Layout: `[frame id 0xFF, row, start column 0, end column, RGB...]`.
pub fn set_key_row(row: &RowFrame) -> Report {
    let end = row.end_column();
    let color_bytes = (end as usize + 1) * 3;
    let mut report = Report::new(
        class::STANDARD_MATRIX,
        MATRIX_ROW,
        (color_bytes + 4).min(crate::report::ARGS_LEN) as u8,
    );
    report.arguments[0] = 0xFF;
    report.arguments[1] = row.index;
    report.arguments[2] = 0x00;
    report.arguments[3] = end;
    write_colors(&mut report.arguments[4..], &row.colors);
    report.sealed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::checksum;

    const RED: Rgb = Rgb::new(0xFF, 0x00, 0x00);
    const BLUE: Rgb = Rgb::new(0x00, 0x00, 0xFF);

    #[test]
    fn static_red_layout() {
        let report = matrix_effect_static(Storage::VarStore, Led::Backlight, RED);
        assert_eq!(report.command_class, 0x03);
        assert_eq!(report.command_id, 0x0A);
        assert_eq!(report.data_size, 3);
        assert_eq!(&report.arguments[0..3], &[0xFF, 0x00, 0x00]);
        assert!(report.arguments[3..].iter().all(|&b| b == 0));
        assert_eq!(report.crc, checksum(&report));
    }

    #[test]
    fn reactive_layout_and_speed_clamp() {
        let report = matrix_effect_reactive(Storage::VarStore, Led::Backlight, 9, BLUE);
        assert_eq!(report.data_size, 5);
        assert_eq!(report.args(), &[0x02, 0x04, 0x00, 0x00, 0xFF]);

        let slow = matrix_effect_reactive(Storage::VarStore, Led::Backlight, 0, BLUE);
        assert_eq!(slow.arguments[1], 0x01);
    }

    #[test]
    fn breathing_sizes() {
        let random = matrix_effect_breathing_random(Storage::VarStore, Led::Backlight);
        assert_eq!(random.args(), &[0x03, 0x03]);

        let single = matrix_effect_breathing_single(Storage::VarStore, Led::Backlight, RED);
        assert_eq!(single.args(), &[0x03, 0x01, 0xFF, 0x00, 0x00]);

        let dual = matrix_effect_breathing_dual(Storage::VarStore, Led::Backlight, RED, BLUE);
        assert_eq!(dual.data_size, 8);
        assert_eq!(dual.args(), &[0x03, 0x02, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF]);
    }

    #[test]
    fn wave_directions() {
        let left = matrix_effect_wave(Storage::VarStore, Led::Backlight, WaveDirection::Left);
        assert_eq!(left.args(), &[0x01, 0x01]);
        let right = matrix_effect_wave(Storage::VarStore, Led::Backlight, WaveDirection::Right);
        assert_eq!(right.args(), &[0x01, 0x02]);
    }

    #[test]
    fn starlight_single_green_default() {
        let green = Rgb::new(0x00, 0xFF, 0x00);
        let report = matrix_effect_starlight_single(Storage::VarStore, Led::Backlight, 1, green);
        assert_eq!(report.args(), &[0x19, 0x01, 0x01, 0x00, 0xFF, 0x00]);
    }

    #[test]
    fn led_commands() {
        let report = set_led_state(Storage::VarStore, Led::Game, true);
        assert_eq!((report.command_class, report.command_id), (0x03, 0x00));
        assert_eq!(report.args(), &[0x01, 0x08, 0x01]);

        let report = set_led_effect(Storage::NoStore, Led::Macro, 7);
        assert_eq!(report.args(), &[0x00, 0x07, 0x05]);

        let report = get_led_brightness(Storage::VarStore, Led::Logo);
        assert_eq!((report.command_class, report.command_id), (0x03, 0x83));
        assert_eq!(report.args(), &[0x01, 0x04, 0x00]);
    }

    #[test]
    fn device_commands() {
        let mode = set_device_mode(DEVICE_MODE_DRIVER, 0x00);
        assert_eq!((mode.command_class, mode.command_id), (0x00, 0x04));
        assert_eq!(mode.args(), &[0x03, 0x00]);

        assert_eq!(get_serial().data_size, 0x16);
        assert_eq!(get_firmware_version().command_id, 0x81);
        assert_eq!(get_device_mode().command_id, 0x84);
    }

    #[test]
    fn key_row_layout() {
        let row = RowFrame {
            index: 3,
            colors: vec![RED; 22],
        };
        let report = set_key_row(&row);
        assert_eq!(report.command_id, 0x0B);
        assert_eq!(report.data_size, 22 * 3 + 4);
        assert_eq!(&report.arguments[0..4], &[0xFF, 3, 0, 21]);
        assert_eq!(&report.arguments[4..7], &[0xFF, 0x00, 0x00]);
        assert_eq!(&report.arguments[67..70], &[0xFF, 0x00, 0x00]);
        assert_eq!(report.arguments[70], 0);
    }
}
