//! Selection capture/replace sequence
//!
//! Copies the focused app's selection through the clipboard, converts it with
//! the layout tables and types or pastes the result back, leaving the clipboard
//! as it was. Everything here is blocking and paced by fixed delays because
//! the receiving app processes synthetic events asynchronously.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::input::clipboard::{self, Clipboard, ClipboardError};
use crate::input::keyboard::{generate_text_preview, Keyboard, KeystrokeError};
use crate::layout::{Direction, LayoutTables};

/// How converted text goes back into the focused field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertMode {
    /// Put the result on the clipboard and paste over the selection
    #[default]
    Paste,
    /// Delete the selection, then type one Unicode keystroke per character
    Keystrokes,
}

/// Fixed waits between the steps of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceTimings {
    /// After Command+C, before reading the clipboard
    pub copy_delay: Duration,
    /// Before inserting the converted text
    pub paste_delay: Duration,
    /// After inserting, before restoring the clipboard
    pub restore_delay: Duration,
}

/// Failures inside one run
#[derive(Debug, Error)]
pub enum SequenceError {
    /// Clipboard read or write failed
    #[error("clipboard step failed: {0}")]
    Clipboard(#[from] ClipboardError),

    /// Synthetic keystroke could not be posted
    #[error("keystroke step failed: {0}")]
    Keystroke(#[from] KeystrokeError),
}

/// Result of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Selection was replaced
    Replaced {
        /// Text read from the selection
        original: String,
        /// Text inserted in its place
        replaced: String,
        /// Map that was applied
        direction: Direction,
    },
    /// Copy produced no text; nothing was inserted
    NothingSelected,
    /// Another run was still in flight; this one did nothing
    Busy,
}

/// Single-slot guard: holding it means a run is in flight
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs the copy, convert, insert, restore sequence against a clipboard and keyboard
pub struct SelectionSequencer<C, K> {
    clipboard: C,
    keyboard: K,
    tables: LayoutTables,
    timings: SequenceTimings,
    mode: InsertMode,
    in_flight: AtomicBool,
}

impl<C: Clipboard, K: Keyboard> SelectionSequencer<C, K> {
    /// Creates a sequencer; nothing touches the OS until [`Self::run`]
    pub const fn new(
        clipboard: C,
        keyboard: K,
        tables: LayoutTables,
        timings: SequenceTimings,
        mode: InsertMode,
    ) -> Self {
        Self {
            clipboard,
            keyboard,
            tables,
            timings,
            mode,
            in_flight: AtomicBool::new(false),
        }
    }

    /// True while a run holds the guard
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Converts the current selection in place
    ///
    /// Returns [`Outcome::Busy`] without side effects if another run is in
    /// flight. The clipboard snapshot taken at the start is put back on every
    /// path that got past the snapshot, including errors; a failing restore is
    /// logged and the earlier error wins.
    ///
    /// # Errors
    /// Returns error if a clipboard access or keystroke post fails
    pub fn run(&self) -> Result<Outcome, SequenceError> {
        let Some(_guard) = InFlight::try_acquire(&self.in_flight) else {
            debug!("conversion already in flight, ignoring trigger");
            return Ok(Outcome::Busy);
        };

        let snapshot = self.clipboard.read_text()?;
        debug!(has_snapshot = snapshot.is_some(), "clipboard snapshot taken");

        let result = self.capture_and_replace();

        if !matches!(result, Ok(Outcome::NothingSelected)) {
            std::thread::sleep(self.timings.restore_delay);
        }
        let restored = clipboard::restore(&self.clipboard, snapshot.as_deref());

        match (result, restored) {
            (Ok(outcome), Ok(())) => {
                debug!("clipboard restored");
                Ok(outcome)
            }
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), restored) => {
                if let Err(restore_err) = restored {
                    warn!(error = %restore_err, "clipboard restore failed after error");
                }
                Err(e)
            }
        }
    }

    fn capture_and_replace(&self) -> Result<Outcome, SequenceError> {
        // Cleared first so a copy with no selection reads back as empty
        // instead of returning whatever was on the clipboard before.
        self.clipboard.clear()?;
        self.keyboard.copy()?;
        std::thread::sleep(self.timings.copy_delay);

        let selected = match self.clipboard.read_text()? {
            Some(text) if !text.is_empty() => text,
            _ => {
                info!("no text selected, nothing to convert");
                return Ok(Outcome::NothingSelected);
            }
        };

        let (direction, converted) = self.tables.convert(&selected);
        info!(
            ?direction,
            chars = selected.chars().count(),
            original = %generate_text_preview(&selected),
            converted = %generate_text_preview(&converted),
            "selection converted"
        );

        self.insert(&converted)?;

        Ok(Outcome::Replaced {
            original: selected,
            replaced: converted,
            direction,
        })
    }

    fn insert(&self, text: &str) -> Result<(), SequenceError> {
        match self.mode {
            InsertMode::Paste => {
                self.clipboard.write_text(text)?;
                std::thread::sleep(self.timings.paste_delay);
                self.keyboard.paste()?;
            }
            InsertMode::Keystrokes => {
                self.keyboard.delete_selection()?;
                std::thread::sleep(self.timings.paste_delay);
                for c in text.chars() {
                    self.keyboard.type_char(c)?;
                }
            }
        }
        debug!(mode = ?self.mode, "replacement inserted");
        Ok(())
    }
}
