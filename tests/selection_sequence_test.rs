//! Integration tests for the selection capture/replace sequence
//!
//! These drive `SelectionSequencer` against an in-memory "focused text field"
//! that reacts to copy, paste, delete and Unicode keystrokes the way a Cocoa
//! text view does, so the full flow is checked without macOS:
//! - conversion in both directions
//! - both insertion modes
//! - clipboard restoration, including empty selections and empty clipboards
//!
//! Tests against the real pasteboard and a real focused app are #[ignore]d.
//! Run with: cargo test --test selection_sequence_test -- --ignored

use std::ops::Range;
use std::sync::{Arc, Mutex};

use layout_fix::input::{Clipboard, ClipboardError, Keyboard, KeystrokeError};
use layout_fix::layout::{Direction, LayoutTables};
use layout_fix::sequencer::{InsertMode, Outcome, SelectionSequencer, SequenceTimings};

/// Text field with a selection (char indices) plus the system clipboard
#[derive(Debug)]
struct Desktop {
    text: Vec<char>,
    selection: Range<usize>,
    clipboard: Option<String>,
    events: Vec<&'static str>,
}

impl Desktop {
    fn new(text: &str, selection: Range<usize>, clipboard: Option<&str>) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            text: text.chars().collect(),
            selection,
            clipboard: clipboard.map(str::to_owned),
            events: Vec::new(),
        }))
    }

    fn text(&self) -> String {
        self.text.iter().collect()
    }

    fn replace_selection(&mut self, replacement: &str) {
        let inserted: Vec<char> = replacement.chars().collect();
        let start = self.selection.start;
        let len = inserted.len();
        self.text.splice(self.selection.clone(), inserted);
        self.selection = start + len..start + len;
    }
}

struct FakeClipboard(Arc<Mutex<Desktop>>);

impl Clipboard for FakeClipboard {
    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        Ok(self.0.lock().unwrap().clipboard.clone())
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.0.lock().unwrap().clipboard = Some(text.to_owned());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClipboardError> {
        self.0.lock().unwrap().clipboard = None;
        Ok(())
    }
}

struct FakeKeyboard(Arc<Mutex<Desktop>>);

impl Keyboard for FakeKeyboard {
    fn copy(&self) -> Result<(), KeystrokeError> {
        let mut desktop = self.0.lock().unwrap();
        desktop.events.push("copy");
        // Copy with an empty selection leaves the clipboard untouched.
        if !desktop.selection.is_empty() {
            let selected: String = desktop.text[desktop.selection.clone()].iter().collect();
            desktop.clipboard = Some(selected);
        }
        Ok(())
    }

    fn paste(&self) -> Result<(), KeystrokeError> {
        let mut desktop = self.0.lock().unwrap();
        desktop.events.push("paste");
        let pasted = desktop.clipboard.clone().unwrap_or_default();
        desktop.replace_selection(&pasted);
        Ok(())
    }

    fn delete_selection(&self) -> Result<(), KeystrokeError> {
        let mut desktop = self.0.lock().unwrap();
        desktop.events.push("delete");
        desktop.replace_selection("");
        Ok(())
    }

    fn type_char(&self, c: char) -> Result<(), KeystrokeError> {
        let mut desktop = self.0.lock().unwrap();
        desktop.events.push("type");
        desktop.replace_selection(&c.to_string());
        Ok(())
    }
}

fn sequencer(
    desktop: &Arc<Mutex<Desktop>>,
    mode: InsertMode,
) -> SelectionSequencer<FakeClipboard, FakeKeyboard> {
    SelectionSequencer::new(
        FakeClipboard(Arc::clone(desktop)),
        FakeKeyboard(Arc::clone(desktop)),
        LayoutTables::builtin().expect("built-in table"),
        SequenceTimings::default(),
        mode,
    )
}

/// Expected output derived from the table, one character at a time
fn derive(text: &str, direction: Direction) -> String {
    let tables = LayoutTables::builtin().expect("built-in table");
    let map = tables.map(direction);
    text.chars()
        .map(|c| map.get(c).map_or_else(|| c.to_string(), str::to_owned))
        .collect()
}

#[test]
fn test_cyrillic_selection_replaced_by_paste() {
    let desktop = Desktop::new("привет", 0..6, Some("clipboard before"));

    let outcome = sequencer(&desktop, InsertMode::Paste).run().unwrap();

    let expected = derive("привет", Direction::SourceToTarget);
    assert_eq!(expected, "ghbdtn");
    assert_eq!(
        outcome,
        Outcome::Replaced {
            original: "привет".to_owned(),
            replaced: expected.clone(),
            direction: Direction::SourceToTarget,
        }
    );

    let desktop = desktop.lock().unwrap();
    assert_eq!(desktop.text(), expected);
    assert_eq!(desktop.clipboard.as_deref(), Some("clipboard before"));
    assert_eq!(desktop.events, vec!["copy", "paste"]);
}

#[test]
fn test_latin_selection_replaced_by_keystrokes() {
    let desktop = Desktop::new("ghbdtn", 0..6, Some("keep me"));

    let outcome = sequencer(&desktop, InsertMode::Keystrokes).run().unwrap();
    assert!(matches!(
        outcome,
        Outcome::Replaced {
            direction: Direction::TargetToSource,
            ..
        }
    ));

    let desktop = desktop.lock().unwrap();
    assert_eq!(desktop.text(), "привет");
    assert_eq!(desktop.clipboard.as_deref(), Some("keep me"));
    assert_eq!(desktop.events[..2], ["copy", "delete"]);
    assert_eq!(desktop.events.iter().filter(|e| **e == "type").count(), 6);
}

#[test]
fn test_partial_selection_keeps_surrounding_text() {
    // "Hello руддщ world" with only "руддщ" selected
    let desktop = Desktop::new("Hello руддщ world", 6..11, None);

    sequencer(&desktop, InsertMode::Paste).run().unwrap();

    let desktop = desktop.lock().unwrap();
    assert_eq!(desktop.text(), "Hello hello world");
}

#[test]
fn test_both_modes_produce_same_text() {
    let text = "Ghbdtn, vbh! 2024";
    let paste = Desktop::new(text, 0..text.chars().count(), None);
    let keys = Desktop::new(text, 0..text.chars().count(), None);

    sequencer(&paste, InsertMode::Paste).run().unwrap();
    sequencer(&keys, InsertMode::Keystrokes).run().unwrap();

    let paste_text = paste.lock().unwrap().text();
    assert_eq!(paste_text, keys.lock().unwrap().text());
    assert_eq!(paste_text, derive(text, Direction::TargetToSource));
}

#[test]
fn test_nothing_selected_is_a_noop() {
    let desktop = Desktop::new("ghbdtn", 3..3, Some("stale clipboard"));

    let outcome = sequencer(&desktop, InsertMode::Paste).run().unwrap();
    assert_eq!(outcome, Outcome::NothingSelected);

    let desktop = desktop.lock().unwrap();
    // The stale clipboard must not be converted and pasted.
    assert_eq!(desktop.text(), "ghbdtn");
    assert_eq!(desktop.clipboard.as_deref(), Some("stale clipboard"));
    assert_eq!(desktop.events, vec!["copy"]);
}

#[test]
fn test_empty_clipboard_stays_empty() {
    let desktop = Desktop::new("привет", 0..6, None);

    sequencer(&desktop, InsertMode::Paste).run().unwrap();

    assert!(desktop.lock().unwrap().clipboard.is_none());
}

#[test]
fn test_clipboard_restored_for_every_selection() {
    for (text, selection) in [
        ("привет", 0..6),
        ("ghbdtn", 0..6),
        ("12345", 0..5),
        ("abc", 1..1),
        ("Съешь же ещё этих", 0..17),
    ] {
        for mode in [InsertMode::Paste, InsertMode::Keystrokes] {
            let desktop = Desktop::new(text, selection.clone(), Some("original"));
            sequencer(&desktop, mode).run().unwrap();
            assert_eq!(
                desktop.lock().unwrap().clipboard.as_deref(),
                Some("original"),
                "text {text:?}, mode {mode:?}"
            );
        }
    }
}

#[test]
fn test_second_run_converts_back() {
    let desktop = Desktop::new("руддщ", 0..5, None);
    let sequencer = sequencer(&desktop, InsertMode::Paste);

    sequencer.run().unwrap();
    desktop.lock().unwrap().selection = 0..5;
    sequencer.run().unwrap();

    assert_eq!(desktop.lock().unwrap().text(), "руддщ");
}

#[test]
fn test_sequencer_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SelectionSequencer<FakeClipboard, FakeKeyboard>>();
}

#[test]
#[ignore = "requires Accessibility permissions and a selection in the focused app"]
#[cfg(target_os = "macos")]
fn test_convert_real_selection() {
    use layout_fix::input::clipboard::MacPasteboard;
    use layout_fix::input::keyboard::CgKeyboard;

    // Select some text in TextEdit within 3 seconds.
    std::thread::sleep(std::time::Duration::from_secs(3));

    let before = MacPasteboard::new().read_text().unwrap();
    let sequencer = SelectionSequencer::new(
        MacPasteboard::new(),
        CgKeyboard::new(),
        LayoutTables::builtin().unwrap(),
        layout_fix::config::SequenceConfig::default().timings(),
        InsertMode::Paste,
    );

    let outcome = sequencer.run().unwrap();
    assert_ne!(outcome, Outcome::Busy);
    assert_eq!(MacPasteboard::new().read_text().unwrap(), before);
}
