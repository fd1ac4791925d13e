use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::settings::Settings;

/// launchd label, also the plist file stem
pub const AGENT_LABEL: &str = "com.layoutfix.agent";

/// Per-user LaunchAgent that starts the app at login
#[derive(Debug, Clone)]
pub struct LoginItem {
    plist_path: PathBuf,
    program: PathBuf,
}

impl LoginItem {
    /// Login item for the running executable in `~/Library/LaunchAgents`
    ///
    /// # Errors
    /// Returns error if HOME is unset or the executable path is unknown
    pub fn for_current_exe() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        let agents_dir = PathBuf::from(home).join("Library").join("LaunchAgents");
        let program = std::env::current_exe().context("failed to resolve executable path")?;
        Ok(Self::new(&agents_dir, program))
    }

    /// Login item whose plist lives in `agents_dir`
    #[must_use]
    pub fn new(agents_dir: &Path, program: PathBuf) -> Self {
        Self {
            plist_path: agents_dir.join(format!("{AGENT_LABEL}.plist")),
            program,
        }
    }

    /// Path of the LaunchAgent plist
    #[must_use]
    pub fn plist_path(&self) -> &Path {
        &self.plist_path
    }

    /// True if the LaunchAgent plist is installed
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.plist_path.exists()
    }

    /// Installs or removes the LaunchAgent plist
    ///
    /// # Errors
    /// Returns error if the plist cannot be written or removed
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        if enabled {
            if let Some(parent) = self.plist_path.parent() {
                fs::create_dir_all(parent).context("failed to create LaunchAgents directory")?;
            }
            fs::write(&self.plist_path, self.plist())
                .with_context(|| format!("failed to write {}", self.plist_path.display()))?;
            info!(path = %self.plist_path.display(), "login item enabled");
        } else if self.plist_path.exists() {
            fs::remove_file(&self.plist_path)
                .with_context(|| format!("failed to remove {}", self.plist_path.display()))?;
            info!(path = %self.plist_path.display(), "login item disabled");
        } else {
            debug!("login item already disabled");
        }
        Ok(())
    }

    /// Like [`Self::set_enabled`], but a failure is only logged
    pub fn apply_best_effort(&self, enabled: bool) {
        if let Err(e) = self.set_enabled(enabled) {
            warn!(error = %e, enabled, "login item update failed");
        }
    }

    fn plist(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{program}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>ProcessType</key>
    <string>Interactive</string>
</dict>
</plist>
"#,
            label = AGENT_LABEL,
            program = xml_escape(&self.program.to_string_lossy()),
        )
    }
}

/// Settings the app starts with
///
/// The login toggle mirrors what is installed right now; nothing is written.
/// Only a later settings change installs or removes the agent.
#[must_use]
pub fn initial_settings(login: Option<&LoginItem>, configured: Settings) -> Settings {
    let Some(login) = login else {
        return configured;
    };
    let installed = login.is_enabled();
    if installed != configured.start_at_login {
        debug!(
            installed,
            configured = configured.start_at_login,
            "login toggle follows installed agent"
        );
    }
    Settings {
        start_at_login: installed,
        ..configured
    }
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
