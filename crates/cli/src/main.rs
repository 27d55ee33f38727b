//! chroma-kbd CLI: command-line lighting and macro key tool for Razer keyboards.

use anyhow::{anyhow, bail, Context, Result};
use chroma_kbd_core::attributes::{effect_capability, KeyboardDevice};
use chroma_kbd_core::comm;
use chroma_kbd_core::command::{Breathing, MatrixEffect, Rgb, Starlight, WaveDirection};
use chroma_kbd_core::device::{self, Capability, DeviceInfo, ModelDescriptor};
use chroma_kbd_core::error::Error as CoreError;
use chroma_kbd_core::keymap::{self, KeyEventAction, CHROMA_KEYS};
use chroma_kbd_core::profile::{self, Profile};
use chroma_kbd_core::remap::{InterfaceProtocol, Remapper};
use chroma_kbd_core::report::{Report, ARGS_LEN, REPORT_LEN};
use chroma_kbd_core::transport::{BusTransport, Session, WaitWindow};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::CString;
use std::sync::Mutex;
use tracing::{debug, info};

/// USB interface that accepts control feature reports.
const CONTROL_INTERFACE: i32 = 2;
/// hidapi wants the report id in front of feature report data.
const REPORT_ID: u8 = 0x00;
/// Host serial for laptop keyboards.
const DMI_SERIAL_PATH: &str = "/sys/class/dmi/id/product_serial";
/// Poll interval for `watch`.
const WATCH_READ_TIMEOUT_MS: i32 = 1000;

/// Feature-report bus over a hidapi handle.
struct CliHidTransport {
    device: Mutex<hidapi::HidDevice>,
}

impl CliHidTransport {
    fn open(api: &hidapi::HidApi, info: &DeviceInfo) -> Result<Self> {
        let device = open_path(api, info)?;
        Ok(Self {
            device: Mutex::new(device),
        })
    }

    fn lock(&self) -> chroma_kbd_core::error::Result<std::sync::MutexGuard<'_, hidapi::HidDevice>> {
        self.device
            .lock()
            .map_err(|_| CoreError::Bus("device handle poisoned".to_string()))
    }
}

fn hid_error(op: &str, e: hidapi::HidError) -> CoreError {
    let msg = format!("{op}: {e}");
    if msg.to_lowercase().contains("permission") {
        CoreError::PermissionDenied(msg)
    } else {
        CoreError::Bus(msg)
    }
}

fn with_report_id(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len() + 1);
    buf.push(REPORT_ID);
    buf.extend_from_slice(data);
    buf
}

impl BusTransport for CliHidTransport {
    fn send_output_report(&self, data: &[u8]) -> chroma_kbd_core::error::Result<()> {
        self.lock()?
            .send_feature_report(&with_report_id(data))
            .map_err(|e| hid_error("send_feature_report", e))
    }

    fn request_input_report(
        &self,
        data: &[u8],
        wait: WaitWindow,
    ) -> chroma_kbd_core::error::Result<Vec<u8>> {
        let device = self.lock()?;
        device
            .send_feature_report(&with_report_id(data))
            .map_err(|e| hid_error("send_feature_report", e))?;

        std::thread::sleep(wait.min());

        let mut response = [0u8; REPORT_LEN + 1];
        response[0] = REPORT_ID;
        let n = device
            .get_feature_report(&mut response)
            .map_err(|e| hid_error("get_feature_report", e))?;

        if n == 0 {
            return Err(CoreError::Timeout(format!(
                "no feature report within {}us",
                wait.max_us
            )));
        }
        // the report id byte comes back in front of the payload
        Ok(response[1..n].to_vec())
    }
}

fn open_path(api: &hidapi::HidApi, info: &DeviceInfo) -> Result<hidapi::HidDevice> {
    let path = CString::new(info.path.clone()).context("HID path contains a NUL byte")?;
    api.open_path(&path).map_err(|e| {
        anyhow!(
            "open HID device (VID=0x{:04X} PID=0x{:04X} interface {}): {e}",
            info.vid,
            info.pid,
            info.interface_number
        )
    })
}

/// The control interface of the first keyboard, or its first interface
/// when the platform doesn't report interface numbers.
fn control_interface(devices: &[DeviceInfo]) -> Result<&DeviceInfo> {
    devices
        .iter()
        .find(|d| d.interface_number == CONTROL_INTERFACE)
        .or_else(|| devices.first())
        .ok_or_else(|| {
            anyhow::Error::from(CoreError::DeviceNotFound(
                "no supported Razer keyboard".to_string(),
            ))
        })
}

fn host_serial() -> Option<String> {
    std::fs::read_to_string(DMI_SERIAL_PATH)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_wait(s: &str) -> std::result::Result<WaitWindow, String> {
    let (min, max) = s
        .split_once(':')
        .ok_or_else(|| "expected MIN:MAX in microseconds".to_string())?;
    let min = min.trim().parse::<u64>().map_err(|e| format!("min: {e}"))?;
    let max = max.trim().parse::<u64>().map_err(|e| format!("max: {e}"))?;
    WaitWindow::new(min, max).map_err(|e| e.to_string())
}

fn parse_byte(s: &str) -> std::result::Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("{s}: {e}"))
}

/// Two ASCII hex digits to a byte.
fn hex_byte(pair: &[u8]) -> Option<u8> {
    match pair {
        [hi, lo] => {
            let hi = (*hi as char).to_digit(16)?;
            let lo = (*lo as char).to_digit(16)?;
            u8::try_from(hi << 4 | lo).ok()
        }
        _ => None,
    }
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let is_separator = |c: char| c.is_ascii_whitespace() || c == ':';
    if let Some(bad) = s.chars().find(|&c| !c.is_ascii_hexdigit() && !is_separator(c)) {
        bail!("invalid hex digit '{bad}'");
    }
    let digits: Vec<u8> = s.bytes().filter(|&b| !is_separator(b as char)).collect();
    if digits.len() % 2 != 0 {
        bail!("hex payload has an odd number of digits");
    }
    digits
        .chunks_exact(2)
        .map(|pair| hex_byte(pair).ok_or_else(|| anyhow!("invalid hex byte")))
        .collect()
}

fn parse_color(s: &str) -> std::result::Result<Rgb, String> {
    let hex = s.trim_start_matches('#').as_bytes();
    if hex.len() != 6 || !hex.iter().all(u8::is_ascii_hexdigit) {
        return Err(format!("{s}: expected RRGGBB"));
    }
    let channels: Vec<u8> = hex.chunks_exact(2).filter_map(hex_byte).collect();
    match channels.as_slice() {
        [r, g, b] => Ok(Rgb::new(*r, *g, *b)),
        _ => Err(format!("{s}: expected RRGGBB")),
    }
}

#[derive(Parser)]
#[command(
    name = "chroma-kbd",
    version,
    about = "Lighting control and macro key remapping for Razer Chroma keyboards"
)]
struct Cli {
    /// Reply wait window in microseconds, as MIN:MAX.
    #[arg(long, global = true, value_parser = parse_wait)]
    wait_us: Option<WaitWindow>,

    /// Retry budget for `raw` while the device reports busy.
    #[arg(long, global = true, default_value_t = comm::MAX_RETRIES)]
    retries: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected Razer keyboard interfaces.
    ListDevices {
        /// Also ask each keyboard for its firmware version.
        #[arg(long)]
        probe: bool,
    },
    /// List the attributes the keyboard exposes.
    Attributes,
    /// Read an attribute.
    Read {
        /// Attribute name, e.g. get_firmware_version.
        attribute: String,
    },
    /// Write an attribute.
    Write {
        /// Attribute name, e.g. mode_static.
        attribute: String,
        /// Decimal text, or raw bytes with --hex.
        value: Option<String>,
        /// Treat VALUE as hex bytes (e.g. FF0000).
        #[arg(long)]
        hex: bool,
    },
    /// Apply a lighting effect.
    Effect {
        #[command(subcommand)]
        effect: EffectCmd,
    },
    /// Send one raw command and print the reply.
    Raw {
        /// Command class (decimal or 0x-prefixed hex).
        #[arg(value_parser = parse_byte)]
        class: u8,
        /// Command id.
        #[arg(value_parser = parse_byte)]
        id: u8,
        /// Argument bytes as hex.
        #[arg(long, default_value = "")]
        args: String,
        /// Data size; defaults to the argument length.
        #[arg(long)]
        size: Option<u8>,
    },
    /// Save a lighting profile.
    SaveProfile {
        /// Profile name.
        #[arg(long, default_value = "Default")]
        name: String,
        /// Backlight brightness, 0-255.
        #[arg(long, default_value_t = 255)]
        brightness: u8,
        /// Turn on the game mode LED.
        #[arg(long)]
        game_mode: bool,
        /// Turn on the macro LED.
        #[arg(long)]
        macro_led: bool,
        #[command(subcommand)]
        effect: EffectCmd,
    },
    /// Apply the saved profile to the keyboard.
    ApplyProfile,
    /// Put the keyboard back in normal device mode.
    Reset,
    /// Print the saved profile.
    ShowProfile,
    /// Print key presses with the FN layer applied.
    Watch,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Left,
    Right,
}

#[derive(Subcommand)]
enum EffectCmd {
    /// Lights off.
    None,
    /// One colour.
    Static {
        #[arg(value_parser = parse_color)]
        color: Rgb,
    },
    Wave {
        #[arg(value_enum)]
        direction: Direction,
    },
    Spectrum,
    /// Keys light up when pressed.
    Reactive {
        /// 1 (short) to 3 (long).
        speed: u8,
        #[arg(value_parser = parse_color)]
        color: Rgb,
    },
    /// Zero colours for random, one or two to alternate.
    Breathing {
        #[arg(value_parser = parse_color, num_args = 0..=2)]
        colors: Vec<Rgb>,
    },
    /// Zero colours for random, one or two to alternate.
    Starlight {
        speed: u8,
        #[arg(value_parser = parse_color, num_args = 0..=2)]
        colors: Vec<Rgb>,
    },
    /// Show the uploaded custom frame.
    Custom,
}

impl EffectCmd {
    fn to_effect(&self) -> MatrixEffect {
        match self {
            Self::None => MatrixEffect::None,
            Self::Static { color } => MatrixEffect::Static { color: *color },
            Self::Wave { direction } => MatrixEffect::Wave {
                direction: match direction {
                    Direction::Left => WaveDirection::Left,
                    Direction::Right => WaveDirection::Right,
                },
            },
            Self::Spectrum => MatrixEffect::Spectrum,
            Self::Reactive { speed, color } => MatrixEffect::Reactive {
                speed: *speed,
                color: *color,
            },
            Self::Breathing { colors } => MatrixEffect::Breathing {
                colors: match colors.as_slice() {
                    [one] => Breathing::Single(*one),
                    [a, b, ..] => Breathing::Dual(*a, *b),
                    [] => Breathing::Random,
                },
            },
            Self::Starlight { speed, colors } => MatrixEffect::Starlight {
                speed: *speed,
                colors: match colors.as_slice() {
                    [one] => Starlight::Single(*one),
                    [a, b, ..] => Starlight::Dual(*a, *b),
                    [] => Starlight::Random,
                },
            },
            Self::Custom => MatrixEffect::CustomFrame,
        }
    }
}

/// Bind a handle to an opened keyboard. Only `reset` touches the device
/// mode; other commands leave whatever mode an earlier command set.
fn bind_keyboard<'a>(
    descriptor: &'static ModelDescriptor,
    session: Session<'a>,
    reset: bool,
    host_serial: Option<String>,
) -> Result<KeyboardDevice<'a>> {
    let keyboard = if reset {
        KeyboardDevice::attach(descriptor, session)?
    } else {
        KeyboardDevice::new(descriptor, session)
    };
    Ok(match (descriptor.serial_from_host, host_serial) {
        (true, Some(serial)) => keyboard.with_host_serial(serial),
        _ => keyboard,
    })
}

/// Open the first keyboard's control interface and run `op`.
fn with_keyboard<T>(
    wait: WaitWindow,
    reset: bool,
    op: impl FnOnce(&KeyboardDevice<'_>) -> Result<T>,
) -> Result<T> {
    let devices = device::discover_devices()?;
    let info = control_interface(&devices)?;
    let api = hidapi::HidApi::new().map_err(|e| anyhow!("hidapi init: {e}"))?;
    let transport = CliHidTransport::open(&api, info)?;

    let keyboard = bind_keyboard(
        info.descriptor,
        Session::with_wait(&transport, wait),
        reset,
        host_serial(),
    )?;
    op(&keyboard)
}

fn list_devices(wait: WaitWindow, probe: bool) -> Result<()> {
    let devices = device::discover_devices()?;
    if devices.is_empty() {
        println!("No Razer keyboards found.");
        println!("Ensure the keyboard is connected and udev rules are set up.");
        return Ok(());
    }

    let api = if probe {
        Some(hidapi::HidApi::new().map_err(|e| anyhow!("hidapi init: {e}"))?)
    } else {
        None
    };

    for dev in &devices {
        let mut line = format!(
            "{} (VID: 0x{:04X}, PID: 0x{:04X}, interface: {}, path: {})",
            dev.descriptor.name, dev.vid, dev.pid, dev.interface_number, dev.path
        );
        if let (Some(api), true) = (&api, dev.interface_number == CONTROL_INTERFACE) {
            let status = match CliHidTransport::open(api, dev) {
                Ok(transport) => format!("{:?}", comm::probe(&Session::with_wait(&transport, wait))),
                Err(e) => format!("unavailable: {e}"),
            };
            line.push_str(&format!(" [{status}]"));
        }
        println!("{line}");
    }
    Ok(())
}

fn lookup_attribute(name: &str) -> Result<Capability> {
    Capability::from_name(name).ok_or_else(|| anyhow!("Unknown attribute '{name}'"))
}

fn raw_command(
    wait: WaitWindow,
    retries: u32,
    class: u8,
    id: u8,
    args: &str,
    size: Option<u8>,
) -> Result<()> {
    let args = parse_hex(args)?;
    if args.len() > ARGS_LEN {
        bail!("at most {ARGS_LEN} argument bytes, got {}", args.len());
    }
    // bounded by ARGS_LEN above
    let data_size = size.unwrap_or(args.len() as u8);
    let mut request = Report::new(class, id, data_size);
    request.arguments[..args.len()].copy_from_slice(&args);

    with_keyboard(wait, false, |keyboard| {
        let executed = comm::execute_with_retry(&keyboard.session(), &request.sealed(), retries)?;
        println!("{}: {:02X?}", executed.check, executed.response.args());
        Ok(())
    })
}

fn watch() -> Result<()> {
    let devices = device::discover_devices()?;
    let info = devices
        .iter()
        .find(|d| d.protocol == InterfaceProtocol::Keyboard)
        .ok_or_else(|| CoreError::DeviceNotFound("no keyboard input interface".to_string()))?;
    let api = hidapi::HidApi::new().map_err(|e| anyhow!("hidapi init: {e}"))?;
    let device = open_path(&api, info)?;
    info!(model = info.descriptor.name, path = %info.path, "Watching key presses");

    let mut remapper = Remapper::new();
    let mut previous: Vec<u8> = Vec::new();
    let mut buf = [0u8; 64];
    loop {
        let n = device
            .read_timeout(&mut buf, WATCH_READ_TIMEOUT_MS)
            .map_err(|e| anyhow!("read_timeout: {e}"))?;
        if n < 3 {
            continue;
        }
        let data = &mut buf[..n];
        if remapper.on_raw_report(info.protocol, data) {
            debug!(latch = ?remapper.latch(), "Remapped macro report");
        }

        // boot and remapped reports both carry key usages from byte 2
        let pressed: Vec<u8> = data[2..].iter().copied().filter(|&u| u != 0).collect();
        if pressed == previous {
            continue;
        }
        for &usage in pressed.iter().filter(|u| !previous.contains(u)) {
            let Some(code) = keymap::usage_to_keycode(usage) else {
                println!("usage 0x{usage:02X}");
                continue;
            };
            let name = keymap::keycode_name(code).unwrap_or("?");
            match keymap::on_key_event(&CHROMA_KEYS, info.protocol, code, 1, remapper.fn_latched()) {
                KeyEventAction::Propagate => println!("{name}"),
                KeyEventAction::Suppress => println!("{name} (blocked)"),
                KeyEventAction::Replace(to) => {
                    println!("FN+{name} -> {}", keymap::keycode_name(to).unwrap_or("?"))
                }
            }
        }
        previous = pressed;
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let wait = cli.wait_us.unwrap_or_default();

    match cli.command {
        Commands::ListDevices { probe } => list_devices(wait, probe)?,
        Commands::Attributes => {
            with_keyboard(wait, false, |keyboard| {
                println!("{}:", keyboard.descriptor().name);
                for cap in keyboard.capabilities() {
                    let access = cap.access();
                    let mode = match (access.readable(), access.writable()) {
                        (true, true) => "rw",
                        (true, false) => "r-",
                        _ => "-w",
                    };
                    println!("  {mode} {cap}");
                }
                Ok(())
            })?;
        }
        Commands::Read { attribute } => {
            let cap = lookup_attribute(&attribute)?;
            let text = with_keyboard(wait, false, |keyboard| Ok(keyboard.read_attribute(cap)?))?;
            println!("{}", text.trim_end());
        }
        Commands::Write {
            attribute,
            value,
            hex,
        } => {
            let cap = lookup_attribute(&attribute)?;
            let payload = match (value, hex) {
                (Some(v), true) => parse_hex(&v)?,
                (Some(v), false) => v.into_bytes(),
                (None, _) => Vec::new(),
            };
            let written = with_keyboard(wait, false, |keyboard| Ok(keyboard.write_attribute(cap, &payload)?))?;
            println!("Wrote {written} bytes to {cap}");
        }
        Commands::Effect { effect } => {
            let effect = effect.to_effect();
            with_keyboard(wait, false, |keyboard| {
                keyboard.descriptor().require(effect_capability(&effect))?;
                let executed = keyboard.set_effect(&effect)?;
                println!("{}: {}", effect_capability(&effect), executed.check);
                Ok(())
            })?;
        }
        Commands::Raw {
            class,
            id,
            args,
            size,
        } => raw_command(wait, cli.retries, class, id, &args, size)?,
        Commands::SaveProfile {
            name,
            brightness,
            game_mode,
            macro_led,
            effect,
        } => {
            let profile = Profile {
                name,
                brightness,
                effect: effect.to_effect(),
                game_mode,
                macro_led,
            };
            profile::save_profile(&profile)?;
            println!("Profile saved to {}", profile::profile_path()?.display());
        }
        Commands::ApplyProfile => {
            let profile = profile::load_profile()?;
            let applied = with_keyboard(wait, false, |keyboard| Ok(profile::apply_profile(keyboard, &profile)?))?;
            println!("Applied profile '{}':", profile.name);
            for cap in applied {
                println!("  {cap}");
            }
        }
        Commands::ShowProfile => {
            let profile = profile::load_profile()?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Reset => {
            let (mode, param) = with_keyboard(wait, true, |keyboard| Ok(keyboard.device_mode()?))?;
            println!("Device mode is now {mode}:{param}");
        }
        Commands::Watch => watch()?,
    }

    Ok(())
}
