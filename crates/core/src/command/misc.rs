//! Miscellaneous commands outside the matrix classes.

use super::class;
use crate::report::Report;

/// Whether the F-row sends media keys without holding FN.
pub fn fn_key_toggle(on: bool) -> Report {
    let mut report = Report::new(class::MISC_KEYS, 0x06, 0x02);
    report.arguments[0] = 0x00;
    report.arguments[1] = on as u8;
    report.sealed()
}

/// Keyboard backlight on Blade laptops.
pub fn set_blade_brightness(brightness: u8) -> Report {
    let mut report = Report::new(class::MISC_BLADE, 0x04, 0x02);
    report.arguments[0] = 0x01;
    report.arguments[1] = brightness;
    report.sealed()
}

/// Reply: `arguments[1]` = brightness.
pub fn get_blade_brightness() -> Report {
    let mut report = Report::new(class::MISC_BLADE, 0x84, 0x02);
    report.arguments[0] = 0x01;
    report.sealed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_toggle_layout() {
        let report = fn_key_toggle(true);
        assert_eq!((report.command_class, report.command_id), (0x02, 0x06));
        assert_eq!(report.args(), &[0x00, 0x01]);
        assert_eq!(fn_key_toggle(false).args(), &[0x00, 0x00]);
    }

    #[test]
    fn blade_brightness_layout() {
        let set = set_blade_brightness(0x80);
        assert_eq!((set.command_class, set.command_id), (0x0E, 0x04));
        assert_eq!(set.args(), &[0x01, 0x80]);

        let get = get_blade_brightness();
        assert_eq!(get.command_id, 0x84);
        assert_eq!(get.args(), &[0x01, 0x00]);
    }
}
