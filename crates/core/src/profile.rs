//! Saved lighting profiles.

use crate::attributes::{effect_capability, KeyboardDevice};
use crate::command::{Led, MatrixEffect};
use crate::device::Capability;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Overrides the profile location.
pub const CONFIG_ENV: &str = "CHROMA_KBD_CONFIG";

/// A saved keyboard lighting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile display name.
    pub name: String,
    /// Backlight brightness, 0-255.
    pub brightness: u8,
    /// Matrix effect.
    pub effect: MatrixEffect,
    #[serde(default)]
    pub game_mode: bool,
    #[serde(default)]
    pub macro_led: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "Default".into(),
            brightness: 0xFF,
            effect: MatrixEffect::Spectrum,
            game_mode: false,
            macro_led: false,
        }
    }
}

/// `$CHROMA_KBD_CONFIG`, else `$XDG_CONFIG_HOME/chroma-kbd/profile.json`,
/// else `$HOME/.config/chroma-kbd/profile.json`.
pub fn profile_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or_else(|| Error::Profile("neither XDG_CONFIG_HOME nor HOME is set".to_string()))?;
    Ok(base.join("chroma-kbd").join("profile.json"))
}

/// Write a profile as pretty JSON, creating parent directories.
pub fn save_profile_to(profile: &Profile, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Profile(format!("creating {}: {e}", parent.display())))?;
    }
    let json = serde_json::to_string_pretty(profile)
        .map_err(|e| Error::Profile(format!("serializing profile: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| Error::Profile(format!("writing {}: {e}", path.display())))?;
    info!(name = %profile.name, path = %path.display(), "Saved profile");
    Ok(())
}

pub fn load_profile_from(path: &Path) -> Result<Profile> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| Error::Profile(format!("reading {}: {e}", path.display())))?;
    serde_json::from_str(&json)
        .map_err(|e| Error::Profile(format!("parsing {}: {e}", path.display())))
}

/// Save to [`profile_path`].
pub fn save_profile(profile: &Profile) -> Result<()> {
    save_profile_to(profile, &profile_path()?)
}

/// Load from [`profile_path`].
pub fn load_profile() -> Result<Profile> {
    load_profile_from(&profile_path()?)
}

/// Push a profile to a device.
///
/// Settings the model doesn't expose are skipped. Returns the attributes
/// that were written.
pub fn apply_profile(device: &KeyboardDevice<'_>, profile: &Profile) -> Result<Vec<Capability>> {
    let descriptor = device.descriptor();
    let mut applied = Vec::new();

    device.set_brightness(profile.brightness)?;
    applied.push(Capability::SetBrightness);

    let effect_cap = effect_capability(&profile.effect);
    if descriptor.supports(effect_cap) {
        device.set_effect(&profile.effect)?;
        applied.push(effect_cap);
    } else {
        debug!(model = descriptor.name, attribute = %effect_cap, "Skipping unsupported effect");
    }

    for (cap, led, on) in [
        (Capability::ModeGame, Led::Game, profile.game_mode),
        (Capability::ModeMacro, Led::Macro, profile.macro_led),
    ] {
        if descriptor.supports(cap) {
            device.set_led_state(led, on)?;
            applied.push(cap);
        } else {
            debug!(model = descriptor.name, attribute = %cap, "Skipping unsupported setting");
        }
    }

    info!(name = %profile.name, model = descriptor.name, "Applied profile");
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Breathing, Rgb};
    use crate::device::KeyboardModel;
    use crate::transport::mock::MockTransport;
    use crate::transport::Session;

    #[test]
    fn profile_json_shape() {
        let profile = Profile {
            name: "Night".into(),
            brightness: 40,
            effect: MatrixEffect::Breathing {
                colors: Breathing::Single(Rgb::new(0x20, 0, 0x40)),
            },
            game_mode: true,
            macro_led: false,
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"kind\":\"breathing\""));
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn missing_flags_default_to_off() {
        let json = r#"{"name":"x","brightness":1,"effect":{"kind":"spectrum"}}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert!(!profile.game_mode);
        assert_eq!(profile.effect, MatrixEffect::Spectrum);
    }

    #[test]
    fn save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("chroma-kbd-test-{}", std::process::id()));
        let path = dir.join("nested").join("profile.json");
        let profile = Profile::default();
        save_profile_to(&profile, &path).unwrap();
        assert_eq!(load_profile_from(&path).unwrap(), profile);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_is_profile_error() {
        let path = std::env::temp_dir().join("chroma-kbd-does-not-exist.json");
        assert!(matches!(load_profile_from(&path), Err(Error::Profile(_))));
    }

    #[test]
    fn apply_skips_unsupported_settings() {
        let mock = MockTransport::new();
        let device = KeyboardDevice::new(
            KeyboardModel::TartarusChroma.descriptor(),
            Session::new(&mock),
        );
        let profile = Profile {
            effect: MatrixEffect::Wave {
                direction: crate::command::WaveDirection::Left,
            },
            game_mode: true,
            ..Profile::default()
        };
        let applied = apply_profile(&device, &profile).unwrap();
        assert_eq!(applied, vec![Capability::SetBrightness]);
        assert_eq!(mock.sent().len(), 1);
    }

    #[test]
    fn apply_full_profile() {
        let mock = MockTransport::new();
        let device = KeyboardDevice::new(
            KeyboardModel::BlackWidowChroma.descriptor(),
            Session::new(&mock),
        );
        let applied = apply_profile(&device, &Profile::default()).unwrap();
        assert_eq!(
            applied,
            vec![
                Capability::SetBrightness,
                Capability::ModeSpectrum,
                Capability::ModeGame,
                Capability::ModeMacro,
            ]
        );
        let sent = mock.sent();
        assert_eq!(sent[1].args(), &[0x04]);
        assert_eq!(sent[2].args(), &[0x01, 0x08, 0x00]);
    }
}
