//! Input validation for attribute writes.
//!
//! Every binary payload has a fixed set of accepted lengths. Anything else is
//! rejected here, before a report is built, so malformed input never reaches
//! the device and nothing is partially sent.
//!
//! | Payload      | Accepted lengths | Meaning                                  |
//! |--------------|------------------|------------------------------------------|
//! | static       | 3                | RGB                                      |
//! | reactive     | 4                | speed, RGB                               |
//! | breathing    | 1, 3, 6          | random / RGB / RGB RGB                   |
//! | starlight    | 1, 4, 7          | speed / speed RGB / speed RGB RGB        |
//! | device mode  | 2                | mode, param                              |
//! | key rows     | n * (3w + 1)     | row index then `w` RGB triples, per row  |
//!
//! Numeric attributes are decimal ASCII and must fit in a byte.

use crate::command::{Breathing, Rgb, RowFrame, Starlight};
use crate::error::{Error, Result};

fn check_len(operation: &'static str, expected: &'static str, buf: &[u8], ok: &[usize]) -> Result<()> {
    if ok.contains(&buf.len()) {
        Ok(())
    } else {
        Err(Error::InputValidation {
            operation,
            expected,
            actual: buf.len(),
        })
    }
}

fn rgb_at(buf: &[u8], offset: usize) -> Rgb {
    Rgb::new(buf[offset], buf[offset + 1], buf[offset + 2])
}

pub fn parse_static(buf: &[u8]) -> Result<Rgb> {
    check_len("static effect", "3", buf, &[3])?;
    Ok(rgb_at(buf, 0))
}

/// Returns `(speed, colour)`.
pub fn parse_reactive(buf: &[u8]) -> Result<(u8, Rgb)> {
    check_len("reactive effect", "4", buf, &[4])?;
    Ok((buf[0], rgb_at(buf, 1)))
}

pub fn parse_breathing(buf: &[u8]) -> Result<Breathing> {
    check_len("breathing effect", "1, 3 or 6", buf, &[1, 3, 6])?;
    Ok(match buf.len() {
        3 => Breathing::Single(rgb_at(buf, 0)),
        6 => Breathing::Dual(rgb_at(buf, 0), rgb_at(buf, 3)),
        _ => Breathing::Random,
    })
}

/// Returns `(speed, colours)`.
pub fn parse_starlight(buf: &[u8]) -> Result<(u8, Starlight)> {
    check_len("starlight effect", "1, 4 or 7", buf, &[1, 4, 7])?;
    let colors = match buf.len() {
        4 => Starlight::Single(rgb_at(buf, 1)),
        7 => Starlight::Dual(rgb_at(buf, 1), rgb_at(buf, 4)),
        _ => Starlight::Random,
    };
    Ok((buf[0], colors))
}

/// Returns `(mode, param)`.
pub fn parse_device_mode(buf: &[u8]) -> Result<(u8, u8)> {
    check_len("device mode", "2", buf, &[2])?;
    Ok((buf[0], buf[1]))
}

/// Parse decimal ASCII, surrounding whitespace allowed.
pub fn parse_decimal_u8(field: &'static str, text: &[u8]) -> Result<u8> {
    let parsed = std::str::from_utf8(text)
        .ok()
        .map(str::trim)
        .and_then(|s| s.parse::<u32>().ok());
    let value = parsed.ok_or(Error::InputValidation {
        operation: field,
        expected: "a decimal number",
        actual: text.len(),
    })?;
    u8::try_from(value).map_err(|_| Error::OutOfRange {
        field,
        value,
        min: 0,
        max: u8::MAX as u32,
    })
}

/// Bytes per row in a custom frame upload: the row index plus one RGB
/// triple per column.
pub fn row_chunk_len(row_length: u8) -> usize {
    row_length as usize * 3 + 1
}

/// Split a custom frame upload into rows.
///
/// A trailing partial chunk is an error and nothing is returned for the
/// rows before it either.
pub fn split_rows(buf: &[u8], row_length: u8) -> Result<Vec<RowFrame>> {
    let chunk = row_chunk_len(row_length);
    if buf.len() % chunk != 0 {
        return Err(Error::InputValidation {
            operation: "key row",
            expected: "a whole number of rows",
            actual: buf.len(),
        });
    }

    Ok(buf
        .chunks_exact(chunk)
        .map(|row| RowFrame {
            index: row[0],
            colors: row[1..].chunks_exact(3).map(|c| rgb_at(c, 0)).collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_input_error<T: std::fmt::Debug>(r: Result<T>) -> bool {
        matches!(r, Err(Error::InputValidation { .. }))
    }

    #[test]
    fn fixed_length_contracts() {
        for len in 0..16usize {
            let buf = vec![0x10u8; len];
            assert_eq!(parse_static(&buf).is_ok(), len == 3, "static {len}");
            assert_eq!(parse_reactive(&buf).is_ok(), len == 4, "reactive {len}");
            assert_eq!(
                parse_breathing(&buf).is_ok(),
                matches!(len, 1 | 3 | 6),
                "breathing {len}"
            );
            assert_eq!(
                parse_starlight(&buf).is_ok(),
                matches!(len, 1 | 4 | 7),
                "starlight {len}"
            );
            assert_eq!(parse_device_mode(&buf).is_ok(), len == 2, "mode {len}");
        }
        assert!(is_input_error(parse_reactive(&[1, 2, 3])));
    }

    #[test]
    fn payload_meaning() {
        assert_eq!(parse_reactive(&[2, 1, 2, 3]).unwrap(), (2, Rgb::new(1, 2, 3)));
        assert_eq!(parse_breathing(&[9]).unwrap(), Breathing::Random);
        assert_eq!(
            parse_breathing(&[1, 2, 3, 4, 5, 6]).unwrap(),
            Breathing::Dual(Rgb::new(1, 2, 3), Rgb::new(4, 5, 6))
        );
        assert_eq!(
            parse_starlight(&[3, 0, 0xFF, 0]).unwrap(),
            (3, Starlight::Single(Rgb::new(0, 0xFF, 0)))
        );
        assert_eq!(parse_starlight(&[2]).unwrap(), (2, Starlight::Random));
    }

    #[test]
    fn decimal_parsing() {
        assert_eq!(parse_decimal_u8("brightness", b"128\n").unwrap(), 128);
        assert_eq!(parse_decimal_u8("brightness", b" 0 ").unwrap(), 0);
        assert!(is_input_error(parse_decimal_u8("brightness", b"bright")));
        assert!(is_input_error(parse_decimal_u8("brightness", b"")));
        assert!(matches!(
            parse_decimal_u8("brightness", b"256"),
            Err(Error::OutOfRange { value: 256, .. })
        ));
    }

    #[test]
    fn rows_split_on_chunk_boundaries() {
        let row_length = 22;
        let chunk = row_chunk_len(row_length);
        assert_eq!(chunk, 67);

        let mut buf = Vec::new();
        for row in 0..6u8 {
            buf.push(row);
            for col in 0..row_length {
                buf.extend_from_slice(&[row, col, 0xAA]);
            }
        }
        let rows = split_rows(&buf, row_length).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[4].index, 4);
        assert_eq!(rows[4].colors.len(), 22);
        assert_eq!(rows[4].colors[7], Rgb::new(4, 7, 0xAA));
    }

    #[test]
    fn partial_trailing_row_is_rejected() {
        let buf = vec![0u8; row_chunk_len(16) * 2 + 5];
        assert!(is_input_error(split_rows(&buf, 16)));
        assert!(split_rows(&[], 16).unwrap().is_empty());
    }
}
