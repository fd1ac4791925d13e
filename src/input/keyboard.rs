use thiserror::Error;

/// Virtual key code of `C` on the ANSI layout (`kVK_ANSI_C`)
pub const KEY_C: u16 = 0x08;
/// Virtual key code of `V` on the ANSI layout (`kVK_ANSI_V`)
pub const KEY_V: u16 = 0x09;
/// Virtual key code of Backspace (`kVK_Delete`)
pub const KEY_DELETE: u16 = 0x33;

/// Generate preview of text for logging (pure, testable)
///
/// Keeps the first 47 characters and appends "..." when the text is longer
/// than 50 characters, so previews never split a code point.
#[must_use]
pub fn generate_text_preview(text: &str) -> String {
    if text.chars().count() > 50 {
        let head: String = text.chars().take(47).collect();
        format!("{head}...")
    } else {
        text.to_owned()
    }
}

/// Synthetic keystroke errors
#[derive(Debug, Error)]
pub enum KeystrokeError {
    /// Failed to create `CGEvent` source
    #[error("failed to create CGEvent source")]
    EventSourceCreation,

    /// Failed to create keyboard `CGEvent`
    #[error("failed to create keyboard CGEvent")]
    EventCreation,
}

/// Synthetic keyboard input posted to the focused application
///
/// Implementations post events and return immediately; the receiving app
/// handles them asynchronously, so callers wait between steps.
#[cfg_attr(test, mockall::automock)]
pub trait Keyboard: Send + Sync {
    /// Command+C
    ///
    /// # Errors
    /// Returns error if the events cannot be created
    fn copy(&self) -> Result<(), KeystrokeError>;

    /// Command+V
    ///
    /// # Errors
    /// Returns error if the events cannot be created
    fn paste(&self) -> Result<(), KeystrokeError>;

    /// Backspace, removing the current selection
    ///
    /// # Errors
    /// Returns error if the events cannot be created
    fn delete_selection(&self) -> Result<(), KeystrokeError>;

    /// One keystroke carrying `c` as its Unicode payload, independent of the
    /// active keyboard layout
    ///
    /// # Errors
    /// Returns error if the events cannot be created
    fn type_char(&self, c: char) -> Result<(), KeystrokeError>;
}

#[cfg(target_os = "macos")]
pub use self::macos::CgKeyboard;

#[cfg(target_os = "macos")]
mod macos {
    use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
    use tracing::{debug, error};

    use super::{Keyboard, KeystrokeError, KEY_C, KEY_DELETE, KEY_V};

    /// Keyboard backed by `CGEventPost` at the HID tap
    ///
    /// Requires Accessibility permission. `post()` reports nothing, so a target
    /// app with secure input enabled drops events silently.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct CgKeyboard;

    impl CgKeyboard {
        /// Creates a keyboard posting to the HID event tap
        #[must_use]
        pub const fn new() -> Self {
            Self
        }

        fn source() -> Result<CGEventSource, KeystrokeError> {
            CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|()| {
                error!("CGEventSource creation failed - Accessibility permission may have been revoked");
                KeystrokeError::EventSourceCreation
            })
        }

        fn key_event(
            source: &CGEventSource,
            keycode: CGKeyCode,
            keydown: bool,
        ) -> Result<CGEvent, KeystrokeError> {
            CGEvent::new_keyboard_event(source.clone(), keycode, keydown)
                .map_err(|()| KeystrokeError::EventCreation)
        }

        /// Key down + key up carrying `c`, with no modifiers
        ///
        /// The hotkey chord is usually still held while typing, so the flags are
        /// cleared explicitly; keycode 0 with Command would become Cmd+A.
        pub(super) fn unicode_events(c: char) -> Result<(CGEvent, CGEvent), KeystrokeError> {
            let source = Self::source()?;
            // Keycode 0 is a placeholder; the Unicode payload overrides it.
            let down = Self::key_event(&source, 0, true)?;
            let up = Self::key_event(&source, 0, false)?;
            down.set_flags(CGEventFlags::CGEventFlagNull);
            up.set_flags(CGEventFlags::CGEventFlagNull);

            // set_string_from_utf16_unchecked is not marked unsafe in core-graphics.
            // The slice must be valid UTF-16, which encode_utf16 on a char guarantees.
            let mut buf = [0_u16; 2];
            let utf16 = c.encode_utf16(&mut buf);
            down.set_string_from_utf16_unchecked(utf16);
            up.set_string_from_utf16_unchecked(utf16);
            Ok((down, up))
        }

        /// Posts key down + key up for `keycode` with `flags` held
        fn chord(keycode: CGKeyCode, flags: CGEventFlags) -> Result<(), KeystrokeError> {
            let source = Self::source()?;
            let down = Self::key_event(&source, keycode, true)?;
            let up = Self::key_event(&source, keycode, false)?;
            down.set_flags(flags);
            up.set_flags(flags);
            down.post(CGEventTapLocation::HID);
            up.post(CGEventTapLocation::HID);
            debug!(keycode, ?flags, "posted key chord");
            Ok(())
        }
    }

    impl Keyboard for CgKeyboard {
        fn copy(&self) -> Result<(), KeystrokeError> {
            Self::chord(KEY_C, CGEventFlags::CGEventFlagCommand)
        }

        fn paste(&self) -> Result<(), KeystrokeError> {
            Self::chord(KEY_V, CGEventFlags::CGEventFlagCommand)
        }

        fn delete_selection(&self) -> Result<(), KeystrokeError> {
            Self::chord(KEY_DELETE, CGEventFlags::CGEventFlagNull)
        }

        fn type_char(&self, c: char) -> Result<(), KeystrokeError> {
            let (down, up) = Self::unicode_events(c)?;
            down.post(CGEventTapLocation::HID);
            up.post(CGEventTapLocation::HID);
            Ok(())
        }
    }
}
