//! Model identity table, capabilities, and device discovery.
//!
//! Every per-model quirk lives in [`MODELS`]: dialect, transaction id
//! overrides, row length, how brightness is addressed, and which attributes
//! the model exposes at all. Callers look the descriptor up once when they
//! attach and pass it to every operation.

use crate::command::Storage;
use crate::error::{Error, Result};
use crate::remap::InterfaceProtocol;
use crate::{pids, RAZER_VID};
use tracing::{debug, info};

/// Wire dialect for matrix effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Standard,
    Extended,
}

/// How a model addresses its main brightness control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessCommand {
    /// Standard LED brightness on the logo LED (non-matrix boards).
    LogoLed,
    /// Standard LED brightness on the backlight LED.
    BacklightLed,
    /// Blade laptop keyboard brightness.
    Blade,
    /// Extended matrix brightness. Reading is not supported by the firmware
    /// and reports 0.
    ExtendedMatrix,
}

/// How a model implements the static colour effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticCommand {
    /// Single-colour boards: set the logo LED effect to static.
    LogoEffect,
    /// RGB matrix boards: matrix static effect.
    Matrix,
}

/// Whether an attribute can be read, written, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn readable(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// A named operation of the attribute surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Version,
    DeviceType,
    GetSerial,
    GetFirmwareVersion,
    SetBrightness,
    DeviceMode,
    Test,
    ModeGame,
    ModeMacro,
    ModeMacroEffect,
    ModePulsate,
    ProfileLedRed,
    ProfileLedGreen,
    ProfileLedBlue,
    ModeNone,
    ModeWave,
    ModeSpectrum,
    ModeReactive,
    ModeStatic,
    ModeStarlight,
    ModeBreath,
    ModeCustom,
    SetLogo,
    SetFnToggle,
    SetKeyRow,
}

impl Capability {
    pub const ALL: &'static [Capability] = &[
        Capability::Version,
        Capability::DeviceType,
        Capability::GetSerial,
        Capability::GetFirmwareVersion,
        Capability::SetBrightness,
        Capability::DeviceMode,
        Capability::Test,
        Capability::ModeGame,
        Capability::ModeMacro,
        Capability::ModeMacroEffect,
        Capability::ModePulsate,
        Capability::ProfileLedRed,
        Capability::ProfileLedGreen,
        Capability::ProfileLedBlue,
        Capability::ModeNone,
        Capability::ModeWave,
        Capability::ModeSpectrum,
        Capability::ModeReactive,
        Capability::ModeStatic,
        Capability::ModeStarlight,
        Capability::ModeBreath,
        Capability::ModeCustom,
        Capability::SetLogo,
        Capability::SetFnToggle,
        Capability::SetKeyRow,
    ];

    /// Attribute file name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::DeviceType => "device_type",
            Self::GetSerial => "get_serial",
            Self::GetFirmwareVersion => "get_firmware_version",
            Self::SetBrightness => "set_brightness",
            Self::DeviceMode => "device_mode",
            Self::Test => "test",
            Self::ModeGame => "mode_game",
            Self::ModeMacro => "mode_macro",
            Self::ModeMacroEffect => "mode_macro_effect",
            Self::ModePulsate => "mode_pulsate",
            Self::ProfileLedRed => "profile_led_red",
            Self::ProfileLedGreen => "profile_led_green",
            Self::ProfileLedBlue => "profile_led_blue",
            Self::ModeNone => "mode_none",
            Self::ModeWave => "mode_wave",
            Self::ModeSpectrum => "mode_spectrum",
            Self::ModeReactive => "mode_reactive",
            Self::ModeStatic => "mode_static",
            Self::ModeStarlight => "mode_starlight",
            Self::ModeBreath => "mode_breath",
            Self::ModeCustom => "mode_custom",
            Self::SetLogo => "set_logo",
            Self::SetFnToggle => "set_fn_toggle",
            Self::SetKeyRow => "set_key_row",
        }
    }

    /// Look up an attribute by file name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    pub fn access(self) -> Access {
        match self {
            Self::Version | Self::DeviceType | Self::GetSerial | Self::GetFirmwareVersion => {
                Access::Read
            }
            Self::SetBrightness
            | Self::DeviceMode
            | Self::Test
            | Self::ModeGame
            | Self::ModeMacro
            | Self::ModeMacroEffect
            | Self::ModePulsate
            | Self::ProfileLedRed
            | Self::ProfileLedGreen
            | Self::ProfileLedBlue => Access::ReadWrite,
            Self::ModeNone
            | Self::ModeWave
            | Self::ModeSpectrum
            | Self::ModeReactive
            | Self::ModeStatic
            | Self::ModeStarlight
            | Self::ModeBreath
            | Self::ModeCustom
            | Self::SetLogo
            | Self::SetFnToggle
            | Self::SetKeyRow => Access::Write,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Attributes every model exposes.
pub const COMMON_CAPABILITIES: &[Capability] = &[
    Capability::Version,
    Capability::GetFirmwareVersion,
    Capability::GetSerial,
    Capability::SetBrightness,
    Capability::Test,
    Capability::DeviceType,
    Capability::DeviceMode,
];

/// Supported keyboard models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardModel {
    BlackWidowOriginal,
    BlackWidowUltimate2012,
    BlackWidowUltimate2013,
    BlackWidowUltimate2016,
    BladeStealth,
    BladeStealthLate2016,
    TartarusChroma,
    BlackWidowChroma,
    BlackWidowChromaTe,
    BlackWidowXChroma,
    BlackWidowXChromaTe,
    OrnataChroma,
}

impl KeyboardModel {
    /// Look up model from USB product ID.
    pub fn from_pid(pid: u16) -> Option<Self> {
        ModelDescriptor::for_pid(pid).map(|d| d.model)
    }

    pub fn descriptor(self) -> &'static ModelDescriptor {
        // MODELS has exactly one entry per variant.
        MODELS
            .iter()
            .find(|d| d.model == self)
            .unwrap_or(&MODELS[0])
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// USB Product ID.
    pub fn pid(self) -> u16 {
        self.descriptor().pid
    }
}

/// Everything the protocol layer needs to know about one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub model: KeyboardModel,
    pub name: &'static str,
    pub pid: u16,
    pub dialect: Dialect,
    pub brightness: BrightnessCommand,
    pub static_command: StaticCommand,
    /// LEDs per matrix row, when the model accepts custom frames.
    pub row_length: Option<u8>,
    /// Transaction id for custom-frame row writes.
    pub row_transaction_id: Option<u8>,
    /// Transaction id for device-mode and macro-LED-effect writes.
    pub transaction_id: Option<u8>,
    /// Storage target for macro LED effect writes.
    pub macro_effect_storage: Storage,
    /// The serial number comes from the host platform, not the keyboard.
    pub serial_from_host: bool,
    /// Model-specific attributes, on top of [`COMMON_CAPABILITIES`].
    pub capabilities: &'static [Capability],
}

impl ModelDescriptor {
    /// Look up a descriptor by USB product id.
    pub fn for_pid(pid: u16) -> Option<&'static ModelDescriptor> {
        MODELS.iter().find(|d| d.pid == pid)
    }

    pub fn supports(&self, capability: Capability) -> bool {
        COMMON_CAPABILITIES.contains(&capability) || self.capabilities.contains(&capability)
    }

    /// Every attribute this model exposes, common ones first.
    pub fn all_capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        COMMON_CAPABILITIES
            .iter()
            .chain(self.capabilities.iter())
            .copied()
    }

    /// Fail with [`Error::Unsupported`] unless the model exposes `capability`.
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(Error::Unsupported {
                model: self.name,
                operation: capability.name(),
            })
        }
    }
}

/// Full-size matrix row length.
pub const CHROMA_ROW_LEN: u8 = 22;
/// Blade Stealth row length.
pub const STEALTH_ROW_LEN: u8 = 16;

const SINGLE_COLOR_CAPS: &[Capability] = &[
    Capability::ModePulsate,
    Capability::ModeStatic,
    Capability::ModeGame,
    Capability::ModeMacro,
    Capability::ModeMacroEffect,
];

const ULTIMATE_2016_CAPS: &[Capability] = &[
    Capability::ModeWave,
    Capability::ModeStarlight,
    Capability::ModeNone,
    Capability::ModeReactive,
    Capability::ModeBreath,
    Capability::ModeStatic,
    Capability::ModeCustom,
    Capability::SetKeyRow,
    Capability::ModeGame,
    Capability::ModeMacro,
    Capability::ModeMacroEffect,
];

const STEALTH_CAPS: &[Capability] = &[
    Capability::ModeWave,
    Capability::ModeSpectrum,
    Capability::ModeNone,
    Capability::ModeReactive,
    Capability::ModeBreath,
    Capability::ModeStatic,
    Capability::ModeCustom,
    Capability::SetKeyRow,
    Capability::SetLogo,
    Capability::SetFnToggle,
];

const TARTARUS_CAPS: &[Capability] = &[
    Capability::ModeSpectrum,
    Capability::ModeStatic,
    Capability::ModeBreath,
    Capability::ModeNone,
    Capability::ProfileLedRed,
    Capability::ProfileLedGreen,
    Capability::ProfileLedBlue,
];

const ORNATA_CAPS: &[Capability] = &[
    Capability::ModeWave,
    Capability::ModeSpectrum,
    Capability::ModeStarlight,
    Capability::ModeNone,
    Capability::ModeReactive,
    Capability::ModeBreath,
    Capability::ModeStatic,
    Capability::ModeCustom,
    Capability::SetKeyRow,
    Capability::ModeGame,
    Capability::ModeMacro,
    Capability::ModeMacroEffect,
];

const CHROMA_CAPS: &[Capability] = &[
    Capability::ModeWave,
    Capability::ModeSpectrum,
    Capability::ModeNone,
    Capability::ModeReactive,
    Capability::ModeBreath,
    Capability::ModeStatic,
    Capability::ModeCustom,
    Capability::SetKeyRow,
    Capability::ModeGame,
    Capability::ModeMacro,
    Capability::ModeMacroEffect,
];

const fn single_color(model: KeyboardModel, name: &'static str, pid: u16) -> ModelDescriptor {
    ModelDescriptor {
        model,
        name,
        pid,
        dialect: Dialect::Standard,
        brightness: BrightnessCommand::LogoLed,
        static_command: StaticCommand::LogoEffect,
        row_length: None,
        row_transaction_id: None,
        transaction_id: None,
        macro_effect_storage: Storage::VarStore,
        serial_from_host: false,
        capabilities: SINGLE_COLOR_CAPS,
    }
}

const fn chroma(model: KeyboardModel, name: &'static str, pid: u16) -> ModelDescriptor {
    ModelDescriptor {
        model,
        name,
        pid,
        dialect: Dialect::Standard,
        brightness: BrightnessCommand::BacklightLed,
        static_command: StaticCommand::Matrix,
        row_length: Some(CHROMA_ROW_LEN),
        row_transaction_id: None,
        transaction_id: None,
        macro_effect_storage: Storage::VarStore,
        serial_from_host: false,
        capabilities: CHROMA_CAPS,
    }
}

const fn stealth(model: KeyboardModel, name: &'static str, pid: u16) -> ModelDescriptor {
    ModelDescriptor {
        model,
        name,
        pid,
        dialect: Dialect::Standard,
        brightness: BrightnessCommand::Blade,
        static_command: StaticCommand::Matrix,
        row_length: Some(STEALTH_ROW_LEN),
        row_transaction_id: Some(0x80),
        transaction_id: None,
        macro_effect_storage: Storage::VarStore,
        serial_from_host: true,
        capabilities: STEALTH_CAPS,
    }
}

/// The model identity table. Exhaustive: one entry per [`KeyboardModel`].
pub static MODELS: [ModelDescriptor; 12] = [
    single_color(
        KeyboardModel::BlackWidowOriginal,
        "Razer BlackWidow Original",
        pids::BLACKWIDOW_ORIGINAL,
    ),
    single_color(
        KeyboardModel::BlackWidowUltimate2012,
        "Razer BlackWidow Ultimate 2012",
        pids::BLACKWIDOW_ULTIMATE_2012,
    ),
    single_color(
        KeyboardModel::BlackWidowUltimate2013,
        "Razer BlackWidow Ultimate 2013",
        pids::BLACKWIDOW_ULTIMATE_2013,
    ),
    ModelDescriptor {
        row_transaction_id: Some(0x80),
        capabilities: ULTIMATE_2016_CAPS,
        ..chroma(
            KeyboardModel::BlackWidowUltimate2016,
            "Razer BlackWidow Ultimate 2016",
            pids::BLACKWIDOW_ULTIMATE_2016,
        )
    },
    stealth(
        KeyboardModel::BladeStealth,
        "Razer Blade Stealth",
        pids::BLADE_STEALTH,
    ),
    stealth(
        KeyboardModel::BladeStealthLate2016,
        "New Razer Blade Stealth (Late 2016)",
        pids::BLADE_STEALTH_LATE_2016,
    ),
    ModelDescriptor {
        row_length: None,
        capabilities: TARTARUS_CAPS,
        ..chroma(
            KeyboardModel::TartarusChroma,
            "Razer Tartarus Chroma",
            pids::TARTARUS_CHROMA,
        )
    },
    chroma(
        KeyboardModel::BlackWidowChroma,
        "Razer BlackWidow Chroma",
        pids::BLACKWIDOW_CHROMA,
    ),
    chroma(
        KeyboardModel::BlackWidowChromaTe,
        "Razer BlackWidow Chroma Tournament Edition",
        pids::BLACKWIDOW_CHROMA_TE,
    ),
    chroma(
        KeyboardModel::BlackWidowXChroma,
        "Razer BlackWidow X Chroma",
        pids::BLACKWIDOW_X_CHROMA,
    ),
    chroma(
        KeyboardModel::BlackWidowXChromaTe,
        "Razer BlackWidow X Chroma Tournament Edition",
        pids::BLACKWIDOW_X_CHROMA_TE,
    ),
    ModelDescriptor {
        dialect: Dialect::Extended,
        brightness: BrightnessCommand::ExtendedMatrix,
        transaction_id: Some(0x3F),
        macro_effect_storage: Storage::NoStore,
        capabilities: ORNATA_CAPS,
        ..chroma(
            KeyboardModel::OrnataChroma,
            "Razer Ornata Chroma",
            pids::ORNATA_CHROMA,
        )
    },
];

/// Information about a discovered keyboard interface.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub descriptor: &'static ModelDescriptor,
    pub vid: u16,
    pub pid: u16,
    pub interface_number: i32,
    /// Protocol of the interface, from its top-level HID usage.
    pub protocol: InterfaceProtocol,
    pub path: String,
    pub serial: Option<String>,
}

/// Discover every HID interface of a supported keyboard.
///
/// A keyboard shows up once per USB interface; callers pick the control
/// interface for commands and the keyboard interface for input reports.
pub fn discover_devices() -> Result<Vec<DeviceInfo>> {
    debug!("Starting HID device enumeration");
    let api = hidapi::HidApi::new().map_err(|e| Error::Bus(e.to_string()))?;

    let mut devices = Vec::new();
    for info in api.device_list() {
        if info.vendor_id() != RAZER_VID {
            continue;
        }

        if let Some(descriptor) = ModelDescriptor::for_pid(info.product_id()) {
            info!(
                model = descriptor.name,
                vid = format_args!("0x{:04X}", info.vendor_id()),
                pid = format_args!("0x{:04X}", info.product_id()),
                interface = info.interface_number(),
                path = %info.path().to_string_lossy(),
                "Found Razer keyboard interface"
            );
            devices.push(DeviceInfo {
                descriptor,
                vid: info.vendor_id(),
                pid: info.product_id(),
                interface_number: info.interface_number(),
                protocol: InterfaceProtocol::from_usage(info.usage_page(), info.usage()),
                path: info.path().to_string_lossy().into_owned(),
                serial: info.serial_number().map(|s| s.to_string()),
            });
        }
    }

    debug!(count = devices.len(), "Device enumeration complete");
    Ok(devices)
}
