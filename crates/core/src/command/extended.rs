//! Extended dialect builders.
//!
//! Matrix effects live on class 0x0F, command 0x02. The first six argument
//! bytes form a fixed header:
//!
//! ```text
//! [0] storage  [1] LED  [2] effect id  [3] effect param  [4] speed  [5] colour count
//! ```
//!
//! followed by up to two RGB triples. `data_size` covers the header plus the
//! colours actually present.

use super::{class, clamp_u8, write_colors, Led, RowFrame, Rgb, Storage, WaveDirection};
use crate::report::Report;

const MATRIX_EFFECT: u8 = 0x02;
const MATRIX_ROW: u8 = 0x03;
const MATRIX_BRIGHTNESS_SET: u8 = 0x04;
const MATRIX_BRIGHTNESS_GET: u8 = 0x84;

/// Header length before the colour triples.
const HEADER_LEN: u8 = 0x06;

mod effect_id {
    pub const NONE: u8 = 0x00;
    pub const STATIC: u8 = 0x01;
    pub const BREATHING: u8 = 0x02;
    pub const SPECTRUM: u8 = 0x03;
    pub const WAVE: u8 = 0x04;
    pub const REACTIVE: u8 = 0x05;
    pub const STARLIGHT: u8 = 0x07;
    pub const CUSTOM_FRAME: u8 = 0x08;
}

/// Default wave speed byte.
const WAVE_SPEED: u8 = 0x28;

fn effect_base(storage: Storage, led: Led, effect: u8, colors: &[Rgb]) -> Report {
    let mut report = Report::new(
        class::EXTENDED_MATRIX,
        MATRIX_EFFECT,
        HEADER_LEN + (colors.len() * 3) as u8,
    );
    report.arguments[0] = storage as u8;
    report.arguments[1] = led as u8;
    report.arguments[2] = effect;
    if !colors.is_empty() {
        report.arguments[5] = colors.len() as u8;
        write_colors(&mut report.arguments[HEADER_LEN as usize..], colors);
    }
    report
}

pub fn matrix_effect_none(storage: Storage, led: Led) -> Report {
    effect_base(storage, led, effect_id::NONE, &[]).sealed()
}

pub fn matrix_effect_static(storage: Storage, led: Led, color: Rgb) -> Report {
    effect_base(storage, led, effect_id::STATIC, &[color]).sealed()
}

pub fn matrix_effect_wave(storage: Storage, led: Led, direction: WaveDirection) -> Report {
    let mut report = effect_base(storage, led, effect_id::WAVE, &[]);
    report.arguments[3] = match direction {
        WaveDirection::Left => 0x00,
        WaveDirection::Right => 0x01,
    };
    report.arguments[4] = WAVE_SPEED;
    report.sealed()
}

pub fn matrix_effect_spectrum(storage: Storage, led: Led) -> Report {
    effect_base(storage, led, effect_id::SPECTRUM, &[]).sealed()
}

/// Speed clamps to 1..=4.
pub fn matrix_effect_reactive(storage: Storage, led: Led, speed: u8, color: Rgb) -> Report {
    let mut report = effect_base(storage, led, effect_id::REACTIVE, &[color]);
    report.arguments[4] = clamp_u8(speed, 0x01, 0x04);
    report.sealed()
}

pub fn matrix_effect_breathing_random(storage: Storage, led: Led) -> Report {
    effect_base(storage, led, effect_id::BREATHING, &[]).sealed()
}

pub fn matrix_effect_breathing_single(storage: Storage, led: Led, color: Rgb) -> Report {
    let mut report = effect_base(storage, led, effect_id::BREATHING, &[color]);
    report.arguments[3] = 0x01;
    report.sealed()
}

pub fn matrix_effect_breathing_dual(storage: Storage, led: Led, first: Rgb, second: Rgb) -> Report {
    let mut report = effect_base(storage, led, effect_id::BREATHING, &[first, second]);
    report.arguments[3] = 0x02;
    report.sealed()
}

/// Speed clamps to 1..=3.
pub fn matrix_effect_starlight_random(storage: Storage, led: Led, speed: u8) -> Report {
    let mut report = effect_base(storage, led, effect_id::STARLIGHT, &[]);
    report.arguments[4] = clamp_u8(speed, 0x01, 0x03);
    report.sealed()
}

pub fn matrix_effect_starlight_single(storage: Storage, led: Led, speed: u8, color: Rgb) -> Report {
    let mut report = effect_base(storage, led, effect_id::STARLIGHT, &[color]);
    report.arguments[4] = clamp_u8(speed, 0x01, 0x03);
    report.sealed()
}

pub fn matrix_effect_starlight_dual(
    storage: Storage,
    led: Led,
    speed: u8,
    first: Rgb,
    second: Rgb,
) -> Report {
    let mut report = effect_base(storage, led, effect_id::STARLIGHT, &[first, second]);
    report.arguments[4] = clamp_u8(speed, 0x01, 0x03);
    report.sealed()
}

/// Custom frames are always volatile and address no particular LED.
pub fn matrix_effect_custom_frame() -> Report {
    effect_base(Storage::NoStore, Led::Zero, effect_id::CUSTOM_FRAME, &[]).sealed()
}

pub fn set_matrix_brightness(storage: Storage, led: Led, brightness: u8) -> Report {
    let mut report = Report::new(class::EXTENDED_MATRIX, MATRIX_BRIGHTNESS_SET, 0x03);
    report.arguments[0] = storage as u8;
    report.arguments[1] = led as u8;
    report.arguments[2] = brightness;
    report.sealed()
}

/// Reply: `arguments[2]` = brightness.
pub fn get_matrix_brightness(storage: Storage, led: Led) -> Report {
    let mut report = Report::new(class::EXTENDED_MATRIX, MATRIX_BRIGHTNESS_GET, 0x03);
    report.arguments[0] = storage as u8;
    report.arguments[1] = led as u8;
    report.sealed()
}

/// Upload one row of a custom frame.
///
/// Layout: `[0x00, 0x00, row, start column 0, end column, RGB...]`.
pub fn set_key_row(row: &RowFrame) -> Report {
    let end = row.end_column();
    let color_bytes = (end as usize + 1) * 3;
    let mut report = Report::new(
        class::EXTENDED_MATRIX,
        MATRIX_ROW,
        (color_bytes + 5).min(crate::report::ARGS_LEN) as u8,
    );
    report.arguments[2] = row.index;
    report.arguments[3] = 0x00;
    report.arguments[4] = end;
    write_colors(&mut report.arguments[5..], &row.colors);
    report.sealed()
}
