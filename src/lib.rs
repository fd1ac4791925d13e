//! Layout Fix - macOS menu bar utility that converts text typed in the wrong
//! keyboard layout (ЙЦУКЕН vs QWERTY) in place
//!
//! The library exports the conversion core and OS wrappers for testing.

/// macOS main loop
#[cfg(target_os = "macos")]
pub mod app;
/// Configuration management
pub mod config;
/// Input handling (hotkey, clipboard, synthetic keystrokes)
pub mod input;
/// Script detection and transliteration tables
pub mod layout;
/// Start-at-login registration
pub mod login_item;
/// macOS permission checks
pub mod permissions;
/// Selection capture/replace sequence
pub mod sequencer;
/// Application settings and change notification
pub mod settings;
/// Logging setup
pub mod telemetry;
/// Menu bar status item
pub mod tray;
