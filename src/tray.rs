use crate::settings::SettingsChange;

/// Menu item id: login item toggle
pub const MENU_START_AT_LOGIN: &str = "start-at-login";
/// Menu item id: hide the status item
pub const MENU_HIDE_ICON: &str = "hide-menu-bar-icon";
/// Menu item id: open the config file
pub const MENU_OPEN_SETTINGS: &str = "open-settings";
/// Menu item id: re-read the config file
pub const MENU_RELOAD_SETTINGS: &str = "reload-settings";
/// Menu item id: exit the app
pub const MENU_QUIT: &str = "quit";

/// Something the user picked in the status menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    /// Flip the login item
    ToggleStartAtLogin,
    /// Remove the status item until the config turns it back on
    HideIcon,
    /// Open `~/.layout-fix.toml` in the default editor
    OpenSettings,
    /// Re-read `~/.layout-fix.toml`
    ReloadSettings,
    /// Leave the main loop
    Quit,
}

impl TrayCommand {
    /// The settings change this command requests, given the current login state
    #[must_use]
    pub const fn settings_change(self, start_at_login: bool) -> Option<SettingsChange> {
        match self {
            Self::ToggleStartAtLogin => Some(SettingsChange::StartAtLogin(!start_at_login)),
            Self::HideIcon => Some(SettingsChange::MenuBarIcon(false)),
            Self::OpenSettings | Self::ReloadSettings | Self::Quit => None,
        }
    }
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_menu_event(id: &str) -> Option<TrayCommand> {
    match id {
        MENU_START_AT_LOGIN => Some(TrayCommand::ToggleStartAtLogin),
        MENU_HIDE_ICON => Some(TrayCommand::HideIcon),
        MENU_OPEN_SETTINGS => Some(TrayCommand::OpenSettings),
        MENU_RELOAD_SETTINGS => Some(TrayCommand::ReloadSettings),
        MENU_QUIT => Some(TrayCommand::Quit),
        _ => None,
    }
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn get_status_text(busy: bool, hotkey: &str) -> String {
    if busy {
        "Layout Fix - Converting...".to_owned()
    } else {
        format!("Layout Fix - Ready ({hotkey})")
    }
}

#[cfg(target_os = "macos")]
pub use self::macos::TrayManager;

#[cfg(target_os = "macos")]
mod macos {
    use anyhow::{Context, Result};
    use tray_icon::menu::{CheckMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem};
    use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

    use super::{
        get_status_text, parse_menu_event, TrayCommand, MENU_HIDE_ICON, MENU_OPEN_SETTINGS,
        MENU_QUIT, MENU_RELOAD_SETTINGS, MENU_START_AT_LOGIN,
    };
    use crate::settings::Settings;

    /// Status bar item; dropping it removes the icon
    pub struct TrayManager {
        tray: TrayIcon,
        idle_icon: Icon,
        busy_icon: Icon,
        busy: bool,
        hotkey: String,
        settings: Settings,
    }

    impl TrayManager {
        /// Creates the status item
        ///
        /// # Errors
        /// Returns error if an icon cannot be loaded or the item cannot be built
        pub fn new(settings: Settings, hotkey: &str) -> Result<Self> {
            let idle_icon = load_icon(false)?;
            let busy_icon = load_icon(true)?;
            let tray = build_tray(&idle_icon, false, hotkey, settings)?;

            Ok(Self {
                tray,
                idle_icon,
                busy_icon,
                busy: false,
                hotkey: hotkey.to_owned(),
                settings,
            })
        }

        /// Swap icon and status line when the conversion state changed
        ///
        /// # Errors
        /// Returns error if the status item cannot be rebuilt
        pub fn update_busy(&mut self, busy: bool) -> Result<()> {
            if busy == self.busy {
                return Ok(());
            }
            tracing::debug!("tray state change: busy {} -> {}", self.busy, busy);

            // Rebuild entire tray with new state (set_icon() does not refresh reliably on macOS)
            let icon = if busy { &self.busy_icon } else { &self.idle_icon };
            self.tray = build_tray(icon, busy, &self.hotkey, self.settings)?;
            self.busy = busy;
            Ok(())
        }

        /// Refresh check marks after a settings change
        ///
        /// # Errors
        /// Returns error if the menu cannot be built
        pub fn update_menu(&mut self, settings: Settings) -> Result<()> {
            self.settings = settings;
            let menu = build_menu(self.busy, &self.hotkey, settings)?;
            self.tray.set_menu(Some(Box::new(menu)));
            Ok(())
        }

        /// Next pending menu command, if any
        pub fn poll_events() -> Option<TrayCommand> {
            if let Ok(event) = MenuEvent::receiver().try_recv() {
                let id = event.id.0.as_str();
                tracing::debug!("tray menu event received: id={:?}", id);
                return parse_menu_event(id);
            }

            None
        }
    }

    fn build_tray(icon: &Icon, busy: bool, hotkey: &str, settings: Settings) -> Result<TrayIcon> {
        let menu = build_menu(busy, hotkey, settings)?;

        TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip("Layout Fix")
            .with_icon(icon.clone())
            .build()
            .context("failed to build tray icon")
    }

    fn build_menu(busy: bool, hotkey: &str, settings: Settings) -> Result<Menu> {
        let menu = Menu::new();

        let status = MenuItem::new(get_status_text(busy, hotkey), false, None);
        menu.append(&status).context("failed to append status item")?;
        menu.append(&PredefinedMenuItem::separator())
            .context("failed to append separator")?;

        let login = CheckMenuItem::with_id(
            MENU_START_AT_LOGIN,
            "Start at Login",
            true,
            settings.start_at_login,
            None,
        );
        menu.append(&login).context("failed to append login item")?;

        let hide = MenuItem::with_id(MENU_HIDE_ICON, "Hide Menu Bar Icon", true, None);
        menu.append(&hide).context("failed to append hide item")?;

        menu.append(&PredefinedMenuItem::separator())
            .context("failed to append separator")?;

        let open = MenuItem::with_id(MENU_OPEN_SETTINGS, "Open Settings...", true, None);
        menu.append(&open).context("failed to append open settings item")?;

        let reload = MenuItem::with_id(MENU_RELOAD_SETTINGS, "Reload Settings", true, None);
        menu.append(&reload)
            .context("failed to append reload settings item")?;

        menu.append(&PredefinedMenuItem::separator())
            .context("failed to append separator")?;

        let quit = MenuItem::with_id(MENU_QUIT, "Quit Layout Fix", true, None);
        menu.append(&quit).context("failed to append quit item")?;

        Ok(menu)
    }

    fn load_icon(busy: bool) -> Result<Icon> {
        let icon_filename = if busy {
            "icon-busy-32.png"
        } else {
            "icon-32.png"
        };

        // Installed app: <bundle>/Contents/MacOS/layout-fix → <bundle>/Contents/Resources/
        let icon_path = std::env::current_exe()
            .ok()
            .and_then(|exe_path| exe_path.parent().map(std::path::Path::to_path_buf))
            .and_then(|macos_dir| macos_dir.parent().map(std::path::Path::to_path_buf))
            .map(|contents_dir| contents_dir.join("Resources").join(icon_filename))
            .filter(|path| path.exists())
            .unwrap_or_else(|| {
                // Fallback to source tree (for development)
                std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                    .join("assets")
                    .join(icon_filename)
            });

        tracing::debug!("loading icon {:?}", icon_path);

        let image = image::open(&icon_path)
            .with_context(|| {
                format!(
                    "failed to load {icon_filename} from {}",
                    icon_path.display()
                )
            })?
            .into_rgba8();

        let (width, height) = image.dimensions();
        let rgba = image.into_raw();

        Icon::from_rgba(rgba, width, height).context("failed to create icon from RGBA data")
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_load_icon_idle() {
            assert!(load_icon(false).is_ok(), "Should load idle icon");
        }

        #[test]
        fn test_load_icon_busy() {
            assert!(load_icon(true).is_ok(), "Should load busy icon");
        }

        #[test]
        #[ignore = "Requires main thread for macOS menu creation"]
        fn test_build_tray_both_states() {
            let settings = Settings {
                start_at_login: true,
                show_menu_bar_icon: true,
            };
            let icon = load_icon(false).unwrap();
            assert!(build_tray(&icon, false, "Command+Shift+L", settings).is_ok());
            assert!(build_tray(&icon, true, "Command+Shift+L", settings).is_ok());
        }
    }
}
