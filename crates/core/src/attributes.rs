//! Attribute read/write surface.
//!
//! [`KeyboardDevice`] binds a model descriptor to a transport session. Each
//! named attribute maps to one builder plus one session call, with the
//! dialect and per-model quirks taken from the descriptor. Numeric
//! attributes are decimal ASCII; binary attributes are raw bytes of the
//! lengths checked in [`crate::safety`].

use crate::command::{
    extended, misc, standard, Led, MatrixEffect, RowFrame, Rgb, Starlight, Storage,
    WaveDirection,
};
use crate::device::{BrightnessCommand, Capability, Dialect, ModelDescriptor, StaticCommand};
use crate::error::{Error, Result};
use crate::report::Report;
use crate::safety;
use crate::transport::{Executed, Session};
use tracing::{debug, info, warn};

/// Reported by the `version` attribute.
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// LED effect value the logo LED uses for static.
const LOGO_EFFECT_STATIC: u8 = 0x00;
/// LED effect value the logo LED uses for pulsating.
const LOGO_EFFECT_PULSATE: u8 = 0x01;

/// Standard-dialect boards only take one starlight variant.
const STANDARD_STARLIGHT: MatrixEffect = MatrixEffect::Starlight {
    speed: 0x01,
    colors: Starlight::Single(Rgb::new(0x00, 0xFF, 0x00)),
};

/// The attribute that sets this effect.
pub fn effect_capability(effect: &MatrixEffect) -> Capability {
    match effect {
        MatrixEffect::None => Capability::ModeNone,
        MatrixEffect::Static { .. } => Capability::ModeStatic,
        MatrixEffect::Wave { .. } => Capability::ModeWave,
        MatrixEffect::Spectrum => Capability::ModeSpectrum,
        MatrixEffect::Reactive { .. } => Capability::ModeReactive,
        MatrixEffect::Breathing { .. } => Capability::ModeBreath,
        MatrixEffect::Starlight { .. } => Capability::ModeStarlight,
        MatrixEffect::CustomFrame => Capability::ModeCustom,
    }
}

fn with_transaction_id(report: Report, id: Option<u8>) -> Report {
    match id {
        Some(id) => Report {
            transaction_id: id,
            ..report
        }
        .sealed(),
        None => report,
    }
}

/// A keyboard's control interface.
pub struct KeyboardDevice<'a> {
    descriptor: &'static ModelDescriptor,
    session: Session<'a>,
    host_serial: Option<String>,
}

impl<'a> KeyboardDevice<'a> {
    pub fn new(descriptor: &'static ModelDescriptor, session: Session<'a>) -> Self {
        Self {
            descriptor,
            session,
            host_serial: None,
        }
    }

    /// Bind to a device and put it in normal mode.
    pub fn attach(descriptor: &'static ModelDescriptor, session: Session<'a>) -> Result<Self> {
        let device = Self::new(descriptor, session);
        let executed = device.set_device_mode(standard::DEVICE_MODE_NORMAL, 0x00)?;
        info!(
            model = descriptor.name,
            pid = format_args!("0x{:04X}", descriptor.pid),
            check = %executed.check,
            "Attached keyboard"
        );
        Ok(device)
    }

    /// Serial number for models that take it from the host platform.
    pub fn with_host_serial(mut self, serial: impl Into<String>) -> Self {
        self.host_serial = Some(serial.into());
        self
    }

    pub fn descriptor(&self) -> &'static ModelDescriptor {
        self.descriptor
    }

    pub fn session(&self) -> Session<'a> {
        self.session
    }

    /// Attributes this device exposes.
    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + 'static {
        self.descriptor.all_capabilities()
    }

    fn execute(&self, report: Report) -> Result<Executed> {
        self.session.execute(&report)
    }

    // -----------------------------------------------------------------------
    // Typed operations
    // -----------------------------------------------------------------------

    pub fn set_brightness(&self, brightness: u8) -> Result<Executed> {
        let report = match self.descriptor.brightness {
            BrightnessCommand::LogoLed => {
                standard::set_led_brightness(Storage::VarStore, Led::Logo, brightness)
            }
            BrightnessCommand::BacklightLed => {
                standard::set_led_brightness(Storage::VarStore, Led::Backlight, brightness)
            }
            BrightnessCommand::Blade => misc::set_blade_brightness(brightness),
            BrightnessCommand::ExtendedMatrix => {
                extended::set_matrix_brightness(Storage::VarStore, Led::Backlight, brightness)
            }
        };
        self.execute(report)
    }

    pub fn brightness(&self) -> Result<u8> {
        let (report, slot) = match self.descriptor.brightness {
            BrightnessCommand::LogoLed => (
                standard::get_led_brightness(Storage::VarStore, Led::Logo),
                2,
            ),
            BrightnessCommand::BacklightLed => (
                standard::get_led_brightness(Storage::VarStore, Led::Backlight),
                2,
            ),
            BrightnessCommand::Blade => (misc::get_blade_brightness(), 1),
            // firmware doesn't answer brightness reads
            BrightnessCommand::ExtendedMatrix => return Ok(0),
        };
        Ok(self.execute(report)?.args()[slot])
    }

    /// Apply a matrix effect in the model's dialect.
    pub fn set_effect(&self, effect: &MatrixEffect) -> Result<Executed> {
        let dialect = self.descriptor.dialect;
        let report = match (effect, self.descriptor.static_command, dialect) {
            (MatrixEffect::Static { .. }, StaticCommand::LogoEffect, _) => {
                standard::set_led_effect(Storage::VarStore, Led::Logo, LOGO_EFFECT_STATIC)
            }
            (MatrixEffect::Starlight { .. }, _, Dialect::Standard) => {
                STANDARD_STARLIGHT.build(dialect, Storage::VarStore, Led::Backlight)
            }
            (effect, _, dialect) => effect.build(dialect, Storage::VarStore, Led::Backlight),
        };
        debug!(
            model = self.descriptor.name,
            effect = ?effect,
            "Setting matrix effect"
        );
        self.execute(report)
    }

    /// Upload custom frame rows. Rows are sent without waiting for replies.
    pub fn set_key_rows(&self, rows: &[RowFrame]) -> Result<()> {
        for row in rows {
            let report = match self.descriptor.dialect {
                Dialect::Standard => standard::set_key_row(row),
                Dialect::Extended => extended::set_key_row(row),
            };
            let report = with_transaction_id(report, self.descriptor.row_transaction_id);
            self.session.send(&report)?;
        }
        debug!(count = rows.len(), "Uploaded key rows");
        Ok(())
    }

    pub fn serial(&self) -> Result<String> {
        if self.descriptor.serial_from_host {
            return self.host_serial.clone().ok_or(Error::Unsupported {
                model: self.descriptor.name,
                operation: "get_serial without a host serial",
            });
        }
        let executed = self.execute(standard::get_serial())?;
        let raw = &executed.args()[..standard::SERIAL_LEN as usize];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    /// `(major, minor)`.
    pub fn firmware_version(&self) -> Result<(u8, u8)> {
        let executed = self.execute(standard::get_firmware_version())?;
        Ok((executed.args()[0], executed.args()[1]))
    }

    /// `(mode, param)`.
    pub fn device_mode(&self) -> Result<(u8, u8)> {
        let executed = self.execute(standard::get_device_mode())?;
        Ok((executed.args()[0], executed.args()[1]))
    }

    pub fn set_device_mode(&self, mode: u8, param: u8) -> Result<Executed> {
        let report = with_transaction_id(
            standard::set_device_mode(mode, param),
            self.descriptor.transaction_id,
        );
        self.execute(report)
    }

    pub fn led_state(&self, led: Led) -> Result<u8> {
        let executed = self.execute(standard::get_led_state(Storage::VarStore, led))?;
        Ok(executed.args()[2])
    }

    pub fn set_led_state(&self, led: Led, on: bool) -> Result<Executed> {
        self.execute(standard::set_led_state(Storage::VarStore, led, on))
    }

    pub fn macro_effect(&self) -> Result<u8> {
        let executed = self.execute(standard::get_led_effect(Storage::VarStore, Led::Macro))?;
        Ok(executed.args()[2])
    }

    /// 0 static, 1 blinking.
    pub fn set_macro_effect(&self, effect: u8) -> Result<Executed> {
        let report = with_transaction_id(
            standard::set_led_effect(self.descriptor.macro_effect_storage, Led::Macro, effect),
            self.descriptor.transaction_id,
        );
        self.execute(report)
    }

    pub fn pulsate(&self) -> Result<u8> {
        let executed = self.execute(standard::get_led_effect(Storage::VarStore, Led::Logo))?;
        Ok(executed.args()[2])
    }

    pub fn set_pulsate(&self) -> Result<Executed> {
        self.execute(standard::set_led_effect(
            Storage::VarStore,
            Led::Logo,
            LOGO_EFFECT_PULSATE,
        ))
    }

    pub fn set_logo(&self, effect: u8) -> Result<Executed> {
        self.execute(standard::set_led_effect(Storage::VarStore, Led::Logo, effect))
    }

    pub fn set_fn_toggle(&self, on: bool) -> Result<Executed> {
        self.execute(misc::fn_key_toggle(on))
    }

    // -----------------------------------------------------------------------
    // Named attributes
    // -----------------------------------------------------------------------

    fn require(&self, capability: Capability, readable: bool) -> Result<()> {
        self.descriptor.require(capability)?;
        let access = capability.access();
        let allowed = if readable {
            access.readable()
        } else {
            access.writable()
        };
        if allowed {
            Ok(())
        } else {
            Err(Error::Unsupported {
                model: self.descriptor.name,
                operation: capability.name(),
            })
        }
    }

    /// Read an attribute, formatted as text.
    pub fn read_attribute(&self, capability: Capability) -> Result<String> {
        self.require(capability, true)?;
        let text = match capability {
            Capability::Version => format!("{DRIVER_VERSION}\n"),
            Capability::DeviceType => format!("{}\n", self.descriptor.name),
            Capability::GetSerial => format!("{}\n", self.serial()?),
            Capability::GetFirmwareVersion => {
                let (major, minor) = self.firmware_version()?;
                format!("v{major}.{minor}")
            }
            Capability::SetBrightness => format!("{}\n", self.brightness()?),
            Capability::DeviceMode => {
                let (mode, param) = self.device_mode()?;
                format!("{mode}:{param}\n")
            }
            Capability::Test => "0\n".to_string(),
            Capability::ModeGame => format!("{}\n", self.led_state(Led::Game)?),
            Capability::ModeMacro => format!("{}\n", self.led_state(Led::Macro)?),
            Capability::ModeMacroEffect => format!("{}\n", self.macro_effect()?),
            Capability::ModePulsate => format!("{}\n", self.pulsate()?),
            Capability::ProfileLedRed => format!("{}\n", self.led_state(Led::RedProfile)?),
            Capability::ProfileLedGreen => format!("{}\n", self.led_state(Led::GreenProfile)?),
            Capability::ProfileLedBlue => format!("{}\n", self.led_state(Led::BlueProfile)?),
            write_only => {
                return Err(Error::Unsupported {
                    model: self.descriptor.name,
                    operation: write_only.name(),
                })
            }
        };
        Ok(text)
    }

    /// Write an attribute. Returns the number of bytes consumed.
    ///
    /// Validation failures return an error before anything is sent. Soft
    /// errors reported by the device are logged by the session and do not
    /// fail the write.
    pub fn write_attribute(&self, capability: Capability, buf: &[u8]) -> Result<usize> {
        self.require(capability, false)?;
        let name = capability.name();
        let dialect = self.descriptor.dialect;

        match capability {
            Capability::Test => {}
            Capability::SetBrightness => {
                self.set_brightness(safety::parse_decimal_u8(name, buf)?)?;
            }
            Capability::DeviceMode => {
                let (mode, param) = safety::parse_device_mode(buf)?;
                self.set_device_mode(mode, param)?;
            }
            Capability::ModeGame => {
                self.set_led_state(Led::Game, safety::parse_decimal_u8(name, buf)? != 0)?;
            }
            Capability::ModeMacro => {
                self.set_led_state(Led::Macro, safety::parse_decimal_u8(name, buf)? != 0)?;
            }
            Capability::ModeMacroEffect => {
                self.set_macro_effect(safety::parse_decimal_u8(name, buf)?)?;
            }
            Capability::ModePulsate => {
                self.set_pulsate()?;
            }
            Capability::ProfileLedRed => {
                self.set_led_state(Led::RedProfile, safety::parse_decimal_u8(name, buf)? != 0)?;
            }
            Capability::ProfileLedGreen => {
                self.set_led_state(Led::GreenProfile, safety::parse_decimal_u8(name, buf)? != 0)?;
            }
            Capability::ProfileLedBlue => {
                self.set_led_state(Led::BlueProfile, safety::parse_decimal_u8(name, buf)? != 0)?;
            }
            Capability::ModeNone => {
                self.set_effect(&MatrixEffect::None)?;
            }
            Capability::ModeWave => {
                let raw = safety::parse_decimal_u8(name, buf)?;
                let direction = WaveDirection::from_wire(dialect, raw);
                self.set_effect(&MatrixEffect::Wave { direction })?;
            }
            Capability::ModeSpectrum => {
                self.set_effect(&MatrixEffect::Spectrum)?;
            }
            Capability::ModeReactive => {
                let (speed, color) = safety::parse_reactive(buf)?;
                self.set_effect(&MatrixEffect::Reactive { speed, color })?;
            }
            Capability::ModeStatic => {
                let color = match self.descriptor.static_command {
                    // single-colour boards ignore the payload
                    StaticCommand::LogoEffect => Rgb::default(),
                    StaticCommand::Matrix => safety::parse_static(buf)?,
                };
                self.set_effect(&MatrixEffect::Static { color })?;
            }
            Capability::ModeStarlight => {
                let effect = match dialect {
                    Dialect::Standard => STANDARD_STARLIGHT,
                    Dialect::Extended => {
                        let (speed, colors) = safety::parse_starlight(buf)?;
                        MatrixEffect::Starlight { speed, colors }
                    }
                };
                self.set_effect(&effect)?;
            }
            Capability::ModeBreath => {
                let colors = safety::parse_breathing(buf)?;
                self.set_effect(&MatrixEffect::Breathing { colors })?;
            }
            Capability::ModeCustom => {
                self.set_effect(&MatrixEffect::CustomFrame)?;
            }
            Capability::SetLogo => {
                self.set_logo(safety::parse_decimal_u8(name, buf)?)?;
            }
            Capability::SetFnToggle => {
                self.set_fn_toggle(safety::parse_decimal_u8(name, buf)? != 0)?;
            }
            Capability::SetKeyRow => {
                let row_length = self.descriptor.row_length.ok_or(Error::Unsupported {
                    model: self.descriptor.name,
                    operation: name,
                })?;
                let rows = safety::split_rows(buf, row_length).inspect_err(|e| {
                    warn!(error = %e, "Rejected key row upload");
                })?;
                self.set_key_rows(&rows)?;
            }
            read_only => {
                return Err(Error::Unsupported {
                    model: self.descriptor.name,
                    operation: read_only.name(),
                })
            }
        }
        Ok(buf.len())
    }
}
