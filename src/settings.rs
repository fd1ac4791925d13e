use tokio::sync::watch;
use tracing::info;

use crate::config::AppConfig;

/// User-facing toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Login item registered
    pub start_at_login: bool,
    /// Status bar icon visible
    pub show_menu_bar_icon: bool,
}

impl From<AppConfig> for Settings {
    fn from(app: AppConfig) -> Self {
        Self {
            start_at_login: app.start_at_login,
            show_menu_bar_icon: app.show_menu_bar_icon,
        }
    }
}

impl From<Settings> for AppConfig {
    fn from(settings: Settings) -> Self {
        Self {
            start_at_login: settings.start_at_login,
            show_menu_bar_icon: settings.show_menu_bar_icon,
        }
    }
}

/// A requested change, from the menu or a config reload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    /// Turn the login item on or off
    StartAtLogin(bool),
    /// Show or hide the status bar icon
    MenuBarIcon(bool),
    /// Take every value from a reloaded config
    Replace(Settings),
}

impl Settings {
    /// Settings after `change`
    #[must_use]
    pub const fn with(self, change: SettingsChange) -> Self {
        match change {
            SettingsChange::StartAtLogin(on) => Self {
                start_at_login: on,
                ..self
            },
            SettingsChange::MenuBarIcon(on) => Self {
                show_menu_bar_icon: on,
                ..self
            },
            SettingsChange::Replace(settings) => settings,
        }
    }
}

/// Current settings plus change notification
///
/// Producers call [`SettingsStore::apply`]; the one consumer that performs OS
/// side effects (login item, status item) holds a receiver from
/// [`SettingsStore::subscribe`] and reacts when it reports a change.
#[derive(Debug)]
pub struct SettingsStore {
    tx: watch::Sender<Settings>,
}

impl SettingsStore {
    /// Creates a store holding `initial`
    #[must_use]
    pub fn new(initial: Settings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Snapshot of the current settings
    #[must_use]
    pub fn current(&self) -> Settings {
        *self.tx.borrow()
    }

    /// Receiver that sees every later change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Applies `change`; subscribers are notified only if a value actually changed
    ///
    /// Returns true if the settings changed.
    pub fn apply(&self, change: SettingsChange) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            let next = current.with(change);
            if next == *current {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            info!(?change, "settings changed");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: Settings = Settings {
        start_at_login: true,
        show_menu_bar_icon: true,
    };

    #[test]
    fn test_with_single_toggle() {
        let next = DEFAULTS.with(SettingsChange::MenuBarIcon(false));
        assert!(!next.show_menu_bar_icon);
        assert!(next.start_at_login);

        let next = DEFAULTS.with(SettingsChange::StartAtLogin(false));
        assert!(!next.start_at_login);
        assert!(next.show_menu_bar_icon);
    }

    #[test]
    fn test_with_replace() {
        let other = Settings {
            start_at_login: false,
            show_menu_bar_icon: false,
        };
        assert_eq!(DEFAULTS.with(SettingsChange::Replace(other)), other);
    }

    #[test]
    fn test_apply_notifies_subscribers() {
        let store = SettingsStore::new(DEFAULTS);
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        assert!(store.apply(SettingsChange::StartAtLogin(false)));
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().start_at_login);
        assert!(!rx.has_changed().unwrap());
        assert!(!store.current().start_at_login);
    }

    #[test]
    fn test_noop_change_is_silent() {
        let store = SettingsStore::new(DEFAULTS);
        let rx = store.subscribe();

        assert!(!store.apply(SettingsChange::MenuBarIcon(true)));
        assert!(!store.apply(SettingsChange::Replace(DEFAULTS)));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_app_config_conversion() {
        let app = AppConfig {
            start_at_login: false,
            show_menu_bar_icon: true,
        };
        let settings = Settings::from(app);
        assert_eq!(AppConfig::from(settings), app);
    }
}
