use anyhow::{anyhow, Context, Result};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use tracing::{debug, info};

use crate::config::HotkeyConfig;

/// Builds the chord described by `config` without registering it
///
/// # Errors
/// Returns error on an unknown modifier or key name, or when no modifier is
/// given (a bare key would swallow normal typing)
pub fn chord_from_config(config: &HotkeyConfig) -> Result<HotKey> {
    let modifiers = parse_modifiers(&config.modifiers)?;
    if modifiers.is_empty() {
        return Err(anyhow!("hotkey needs at least one modifier"));
    }
    let code = parse_key(&config.key)?;
    Ok(HotKey::new(Some(modifiers), code))
}

/// Human-readable form of a hotkey config, e.g. `Command+Shift+L`
#[must_use]
pub fn describe(config: &HotkeyConfig) -> String {
    let mut parts: Vec<&str> = config.modifiers.iter().map(String::as_str).collect();
    parts.push(&config.key);
    parts.join("+")
}

/// Owns the registration of the conversion hotkey
pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    hotkey: HotKey,
}

impl HotkeyManager {
    /// Create and register global hotkey from config
    ///
    /// # Errors
    /// Returns error if the chord is invalid or the OS refuses the registration
    pub fn new(config: &HotkeyConfig) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("failed to create hotkey manager")?;
        let hotkey = chord_from_config(config)?;

        manager
            .register(hotkey)
            .context("failed to register hotkey")?;

        info!("registered hotkey: {}", describe(config));

        Ok(Self { manager, hotkey })
    }

    /// True for a key-down of our chord; releases and foreign ids are ignored
    #[must_use]
    pub fn handle_event(&self, event: &GlobalHotKeyEvent) -> bool {
        if event.id != self.hotkey.id() {
            return false;
        }

        match event.state {
            HotKeyState::Pressed => {
                debug!("conversion hotkey pressed");
                true
            }
            HotKeyState::Released => false,
        }
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        if let Err(e) = self.manager.unregister(self.hotkey) {
            tracing::error!("failed to unregister hotkey: {}", e);
        }
    }
}

fn parse_modifiers(modifiers: &[String]) -> Result<Modifiers> {
    let mut result = Modifiers::empty();
    for modifier in modifiers {
        match modifier.as_str() {
            "Control" | "Ctrl" => result |= Modifiers::CONTROL,
            "Option" | "Alt" => result |= Modifiers::ALT,
            "Command" | "Cmd" | "Super" => result |= Modifiers::SUPER,
            "Shift" => result |= Modifiers::SHIFT,
            _ => return Err(anyhow!("unknown modifier: {}", modifier)),
        }
    }
    Ok(result)
}

fn parse_key(key: &str) -> Result<Code> {
    let code = match key.to_ascii_uppercase().as_str() {
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "SPACE" => Code::Space,
        _ => return Err(anyhow!("unsupported key: {}", key)),
    };
    Ok(code)
}
