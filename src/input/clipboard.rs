use thiserror::Error;

/// Clipboard access errors
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Pasteboard refused the new string
    #[error("pasteboard rejected string write")]
    WriteRejected,
}

/// Plain-text view of the system clipboard
///
/// Only the string flavor is read and written; other flavors (images, rich
/// text) are dropped by `clear` and not restored.
#[cfg_attr(test, mockall::automock)]
pub trait Clipboard: Send + Sync {
    /// Current string content, `None` when the clipboard holds no text
    ///
    /// # Errors
    /// Returns error if the backend cannot be reached
    fn read_text(&self) -> Result<Option<String>, ClipboardError>;

    /// Replaces the clipboard with `text`
    ///
    /// # Errors
    /// Returns error if the backend rejects the write
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;

    /// Empties the clipboard
    ///
    /// # Errors
    /// Returns error if the backend cannot be reached
    fn clear(&self) -> Result<(), ClipboardError>;
}

/// Puts `snapshot` back, or empties the clipboard if there was nothing to keep
///
/// # Errors
/// Returns error if the clipboard write fails
pub fn restore<C: Clipboard + ?Sized>(
    clipboard: &C,
    snapshot: Option<&str>,
) -> Result<(), ClipboardError> {
    match snapshot {
        Some(text) => clipboard.write_text(text),
        None => clipboard.clear(),
    }
}

#[cfg(target_os = "macos")]
pub use self::macos::MacPasteboard;

#[cfg(target_os = "macos")]
mod macos {
    use objc2_app_kit::{NSPasteboard, NSPasteboardTypeString};
    use objc2_foundation::NSString;
    use tracing::debug;

    use super::{Clipboard, ClipboardError};

    /// `NSPasteboard.generalPasteboard` string access
    ///
    /// Holds no Objective-C references, so it can move to the blocking worker;
    /// the general pasteboard is looked up on every call.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct MacPasteboard;

    impl MacPasteboard {
        /// Creates a handle to the general pasteboard
        #[must_use]
        pub const fn new() -> Self {
            Self
        }
    }

    #[allow(unsafe_code, unused_unsafe)]
    impl Clipboard for MacPasteboard {
        fn read_text(&self) -> Result<Option<String>, ClipboardError> {
            // SAFETY: generalPasteboard is always valid; NSPasteboardTypeString is a
            // framework constant initialised before main.
            let text = unsafe {
                let pasteboard = NSPasteboard::generalPasteboard();
                pasteboard.stringForType(NSPasteboardTypeString)
            };
            let text = text.map(|s| s.to_string());
            debug!(has_text = text.is_some(), "pasteboard read");
            Ok(text)
        }

        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            let string = NSString::from_str(text);
            // SAFETY: see read_text
            let accepted = unsafe {
                let pasteboard = NSPasteboard::generalPasteboard();
                pasteboard.clearContents();
                pasteboard.setString_forType(&string, NSPasteboardTypeString)
            };
            if accepted {
                debug!(text_len = text.len(), "pasteboard written");
                Ok(())
            } else {
                Err(ClipboardError::WriteRejected)
            }
        }

        fn clear(&self) -> Result<(), ClipboardError> {
            // SAFETY: see read_text
            unsafe {
                NSPasteboard::generalPasteboard().clearContents();
            }
            debug!("pasteboard cleared");
            Ok(())
        }
    }
}
