/// System clipboard access
pub mod clipboard;
/// Global hotkey registration
pub mod hotkey;
/// Synthetic keystrokes
pub mod keyboard;

pub use clipboard::{Clipboard, ClipboardError};
pub use keyboard::{Keyboard, KeystrokeError};
