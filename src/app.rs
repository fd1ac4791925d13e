//! macOS main loop: hotkey, status menu, settings side effects

use anyhow::{Context, Result};
use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop};
use global_hotkey::GlobalHotKeyEvent;
use objc2::MainThreadMarker;
use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::input::clipboard::MacPasteboard;
use crate::input::hotkey::{self, HotkeyManager};
use crate::input::keyboard::CgKeyboard;
use crate::input::{Clipboard, Keyboard};
use crate::layout::LayoutTables;
use crate::login_item::{self, LoginItem};
use crate::permissions;
use crate::sequencer::{Outcome, SelectionSequencer};
use crate::settings::{Settings, SettingsChange, SettingsStore};
use crate::tray::{TrayCommand, TrayManager};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(1);

type MacSequencer = SelectionSequencer<MacPasteboard, CgKeyboard>;

/// Everything the loop owns besides the hotkey registration
struct App {
    config: Config,
    config_path: PathBuf,
    config_mtime: Option<SystemTime>,
    sequencer: Arc<MacSequencer>,
    store: SettingsStore,
    login: Option<LoginItem>,
    tray: Option<TrayManager>,
    hotkey_label: String,
}

/// Runs until Quit or Ctrl+C
///
/// # Errors
/// Returns error if the layout table cannot be loaded or the hotkey cannot be registered
pub async fn run(config: Config, config_path: PathBuf) -> Result<()> {
    configure_accessory_app();
    permissions::request_all_permissions();

    let table_path = config.table_path()?;
    let tables =
        LayoutTables::load(table_path.as_deref()).context("failed to load layout table")?;
    info!(table = tables.name(), "layout table ready");

    let sequencer = Arc::new(SelectionSequencer::new(
        MacPasteboard::new(),
        CgKeyboard::new(),
        tables,
        config.sequence.timings(),
        config.sequence.insert_mode,
    ));

    let hotkey_manager = HotkeyManager::new(&config.hotkey)?;
    let hotkey_label = hotkey::describe(&config.hotkey);

    let login = match LoginItem::for_current_exe() {
        Ok(login) => Some(login),
        Err(e) => {
            warn!(error = %e, "login item unavailable");
            None
        }
    };

    let settings = login_item::initial_settings(login.as_ref(), Settings::from(config.app));
    let mut app = App {
        config_mtime: Config::modified_at(&config_path),
        config,
        config_path,
        sequencer,
        store: SettingsStore::new(settings),
        login,
        tray: None,
        hotkey_label,
    };
    app.apply_tray(settings);
    let mut settings_rx = app.store.subscribe();

    info!("event loop starting (press Ctrl+C to exit)");

    let receiver = GlobalHotKeyEvent::receiver();
    let mut last_config_check = Instant::now();
    loop {
        while let Ok(event) = receiver.try_recv() {
            if hotkey_manager.handle_event(&event) {
                spawn_conversion(&app.sequencer);
            }
        }

        if let Some(tray) = app.tray.as_mut() {
            if let Err(e) = tray.update_busy(app.sequencer.is_busy()) {
                warn!(error = %e, "failed to refresh tray state");
            }
        }

        while let Some(command) = TrayManager::poll_events() {
            if command == TrayCommand::Quit {
                info!("quit selected");
                return Ok(());
            }
            app.handle_command(command);
        }

        if last_config_check.elapsed() >= CONFIG_POLL_INTERVAL {
            last_config_check = Instant::now();
            let mtime = Config::modified_at(&app.config_path);
            if mtime != app.config_mtime {
                debug!("config file changed on disk");
                app.reload_config();
            }
        }

        if settings_rx.has_changed().unwrap_or(false) {
            let settings = *settings_rx.borrow_and_update();
            app.apply_side_effects(settings);
        }

        pump_run_loop();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                return Ok(());
            }
            () = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }
}

impl App {
    fn handle_command(&mut self, command: TrayCommand) {
        match command {
            TrayCommand::OpenSettings => open_in_editor(&self.config_path),
            TrayCommand::ReloadSettings => self.reload_config(),
            TrayCommand::Quit => {}
            TrayCommand::ToggleStartAtLogin | TrayCommand::HideIcon => {
                let current = self.store.current();
                if let Some(change) = command.settings_change(current.start_at_login) {
                    if self.store.apply(change) {
                        self.persist(self.store.current());
                    }
                }
            }
        }
    }

    /// Login item and status item follow a changed `settings`
    fn apply_side_effects(&mut self, settings: Settings) {
        if let Some(login) = &self.login {
            if login.is_enabled() != settings.start_at_login {
                login.apply_best_effort(settings.start_at_login);
            }
        }
        self.apply_tray(settings);
    }

    fn apply_tray(&mut self, settings: Settings) {
        match (settings.show_menu_bar_icon, self.tray.as_mut()) {
            (true, Some(tray)) => {
                if let Err(e) = tray.update_menu(settings) {
                    warn!(error = %e, "failed to refresh tray menu");
                }
            }
            (true, None) => match TrayManager::new(settings, &self.hotkey_label) {
                Ok(tray) => {
                    info!("menu bar icon shown");
                    self.tray = Some(tray);
                }
                Err(e) => error!(error = %e, "failed to create menu bar icon"),
            },
            (false, Some(_)) => {
                self.tray = None;
                info!("menu bar icon hidden; set show_menu_bar_icon = true to restore");
            }
            (false, None) => {}
        }
    }

    /// Writes menu-originated changes back so they survive a restart
    fn persist(&mut self, settings: Settings) {
        self.config.app = settings.into();
        match self.config.save_to(&self.config_path) {
            Ok(()) => self.config_mtime = Config::modified_at(&self.config_path),
            Err(e) => warn!(error = %e, "failed to save settings"),
        }
    }

    fn reload_config(&mut self) {
        self.config_mtime = Config::modified_at(&self.config_path);
        let config = match Config::load_from(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "config reload failed, keeping current settings");
                return;
            }
        };

        if config.hotkey != self.config.hotkey
            || config.sequence != self.config.sequence
            || config.layout != self.config.layout
        {
            warn!("hotkey, sequence and layout changes take effect after restart");
        }

        self.store
            .apply(SettingsChange::Replace(Settings::from(config.app)));
        self.config = config;
        info!("config reloaded");
    }
}

fn spawn_conversion<C, K>(sequencer: &Arc<SelectionSequencer<C, K>>)
where
    C: Clipboard + 'static,
    K: Keyboard + 'static,
{
    let sequencer = Arc::clone(sequencer);
    tokio::task::spawn_blocking(move || match sequencer.run() {
        Ok(Outcome::Replaced { direction, .. }) => info!(?direction, "selection replaced"),
        Ok(Outcome::NothingSelected) => debug!("nothing selected"),
        Ok(Outcome::Busy) => debug!("previous conversion still running"),
        Err(e) => error!(error = %e, "conversion failed"),
    });
}

fn open_in_editor(path: &Path) {
    if let Err(e) = Command::new("open").arg("-t").arg(path).spawn() {
        warn!(error = %e, path = %path.display(), "failed to open settings file");
    }
}

/// No Dock icon, no app menu: status item only
#[allow(unsafe_code, unused_unsafe)]
fn configure_accessory_app() {
    let Some(mtm) = MainThreadMarker::new() else {
        warn!("not on the main thread, skipping activation policy");
        return;
    };
    let app = NSApplication::sharedApplication(mtm);
    // SAFETY: called on the main thread with a valid policy value
    unsafe {
        app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);
    }
}

/// Lets AppKit deliver status item and hotkey events between polls
#[allow(unsafe_code)]
fn pump_run_loop() {
    // SAFETY: kCFRunLoopDefaultMode is an immutable framework constant
    let mode = unsafe { kCFRunLoopDefaultMode };
    let _ = CFRunLoop::run_in_mode(mode, Duration::ZERO, true);
}
