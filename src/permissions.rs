use anyhow::{Context, Result};
use std::process::Command;

/// System Settings pane for Privacy & Security → Accessibility
pub const ACCESSIBILITY_PANE_URL: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";

/// Check accessibility permission (for copy/paste keystrokes), prompting if missing
///
/// Returns whether the process is trusted right now. A freshly granted
/// permission usually needs an app restart before it takes effect.
#[must_use]
pub fn check_accessibility_permission() -> bool {
    tracing::info!("checking accessibility permission");

    #[cfg(target_os = "macos")]
    {
        let trusted = macos::is_trusted_with_prompt();
        if trusted {
            tracing::info!("accessibility permission granted");
        } else {
            tracing::warn!("accessibility permission not granted");
        }
        trusted
    }

    #[cfg(not(target_os = "macos"))]
    {
        tracing::warn!("accessibility check is only available on macOS");
        false
    }
}

/// Check that synthetic keyboard events can be created
///
/// # Errors
/// Returns error if the event source cannot be created (macOS only)
pub fn check_event_posting() -> Result<()> {
    tracing::info!("checking keyboard event posting");

    #[cfg(target_os = "macos")]
    {
        use core_graphics::event::CGEvent;
        use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|()| {
            anyhow::anyhow!(
                "cannot create keyboard events\n\n\
                Enable in: System Settings → Privacy & Security → Accessibility\n"
            )
        })?;

        CGEvent::new_keyboard_event(source, 0, true)
            .map_err(|()| anyhow::anyhow!("failed to create CGEvent"))?;

        tracing::info!("keyboard event posting available");
    }

    Ok(())
}

/// Open the Accessibility pane of System Settings
///
/// # Errors
/// Returns error if `open` cannot be spawned
pub fn open_accessibility_settings() -> Result<()> {
    Command::new("open")
        .arg(ACCESSIBILITY_PANE_URL)
        .spawn()
        .context("failed to open System Settings")?;
    Ok(())
}

/// Startup permission flow: never fails, only guides the user
///
/// If the process is not trusted, the Accessibility pane is opened and the
/// app keeps running; conversions will do nothing until access is granted.
pub fn request_all_permissions() {
    tracing::info!("requesting all permissions");

    if !check_accessibility_permission() {
        if let Err(e) = open_accessibility_settings() {
            tracing::warn!(error = %e, "could not open accessibility settings");
        }
    }

    if let Err(e) = check_event_posting() {
        tracing::warn!(error = %e, "keyboard events unavailable");
    }

    tracing::info!("all permissions checked");
}

#[cfg(target_os = "macos")]
mod macos {
    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
    use core_foundation::string::CFString;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
    }

    /// `AXIsProcessTrustedWithOptions` with `kAXTrustedCheckOptionPrompt = true`
    #[allow(unsafe_code)]
    pub fn is_trusted_with_prompt() -> bool {
        let key = CFString::from_static_string("AXTrustedCheckOptionPrompt");
        let options = CFDictionary::from_CFType_pairs(&[(key, CFBoolean::true_value())]);
        // SAFETY: options is a valid CFDictionary kept alive for the call
        unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()) }
    }
}
