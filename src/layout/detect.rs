use std::collections::HashSet;

/// Which map a piece of text should be run through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Text contains source-script letters (e.g. Cyrillic typed on ЙЦУКЕН)
    SourceToTarget,
    /// Everything else, including empty and symbol-only text
    TargetToSource,
}

/// Binary script classifier over a fixed letter set
///
/// Any single source letter makes the whole text "source". Mixed-script and
/// symbol-only input is routed deterministically by that rule, even when a
/// human would pick the other direction.
#[derive(Debug, Clone)]
pub struct ScriptDetector {
    letters: HashSet<char>,
}

impl ScriptDetector {
    /// Creates a detector for the given source letters
    pub fn new(letters: impl IntoIterator<Item = char>) -> Self {
        Self {
            letters: letters.into_iter().collect(),
        }
    }

    /// Returns true if `text` has at least one source-script letter
    #[must_use]
    pub fn contains_source(&self, text: &str) -> bool {
        text.chars().any(|c| self.letters.contains(&c))
    }

    /// Picks the conversion direction for `text`
    #[must_use]
    pub fn detect(&self, text: &str) -> Direction {
        if self.contains_source(text) {
            Direction::SourceToTarget
        } else {
            Direction::TargetToSource
        }
    }

    /// Number of letters in the source set
    #[must_use]
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    /// True when the source set is empty (every input classifies as target)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }
}
