use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::detect::{Direction, ScriptDetector};

/// Table shipped inside the binary
const BUILTIN_TABLE: &str = include_str!("../../layouts/ru-en.toml");

/// Layout table loading errors
#[derive(Debug, Error)]
pub enum TableError {
    /// Table file could not be read
    #[error("failed to read layout table {path}: {source}")]
    Read {
        /// Path of the table file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Table file is not valid TOML or misses a section
    #[error("failed to parse layout table: {0}")]
    Parse(#[from] toml::de::Error),

    /// A map key is not exactly one character
    #[error("{map} map key {key:?} must be a single character")]
    MultiCharKey {
        /// `forward` or `reverse`
        map: &'static str,
        /// Offending key
        key: String,
    },

    /// A map has no entries
    #[error("{0} map is empty")]
    EmptyMap(&'static str),
}

#[derive(Debug, Deserialize)]
struct TableFile {
    name: String,
    source_letters: Option<String>,
    forward: BTreeMap<String, String>,
    reverse: BTreeMap<String, String>,
}

/// Immutable single-character substitution map
#[derive(Debug, Clone, Default)]
pub struct TransliterationMap {
    entries: HashMap<char, String>,
}

impl TransliterationMap {
    fn from_entries(map: &'static str, raw: BTreeMap<String, String>) -> Result<Self, TableError> {
        if raw.is_empty() {
            return Err(TableError::EmptyMap(map));
        }

        let mut entries = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    entries.insert(c, value);
                }
                _ => return Err(TableError::MultiCharKey { map, key }),
            }
        }
        Ok(Self { entries })
    }

    /// Replacement for `c`, if mapped
    #[must_use]
    pub fn get(&self, c: char) -> Option<&str> {
        self.entries.get(&c).map(String::as_str)
    }

    /// Replaces every mapped character and passes the rest through
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match self.entries.get(&c) {
                Some(replacement) => out.push_str(replacement),
                None => out.push(c),
            }
        }
        out
    }

    /// Iterates over all `(key, replacement)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (char, &str)> {
        self.entries.iter().map(|(c, s)| (*c, s.as_str()))
    }

    /// Number of mapped characters
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is mapped
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replacements reached from more than one key, with their (sorted) keys
    ///
    /// Any entry here has no unique inverse, so the reverse map can recover
    /// at most one of the keys.
    #[must_use]
    pub fn collisions(&self) -> BTreeMap<&str, Vec<char>> {
        let mut by_value: BTreeMap<&str, Vec<char>> = BTreeMap::new();
        for (c, value) in &self.entries {
            by_value.entry(value.as_str()).or_default().push(*c);
        }
        by_value.retain(|_, keys| keys.len() > 1);
        for keys in by_value.values_mut() {
            keys.sort_unstable();
        }
        by_value
    }
}

/// A pair of maps plus the detector that chooses between them
#[derive(Debug, Clone)]
pub struct LayoutTables {
    name: String,
    detector: ScriptDetector,
    forward: TransliterationMap,
    reverse: TransliterationMap,
}

impl LayoutTables {
    /// The ЙЦУКЕН/QWERTY table compiled into the binary
    ///
    /// # Errors
    /// Returns error only if the embedded table is malformed
    pub fn builtin() -> Result<Self, TableError> {
        Self::from_toml_str(BUILTIN_TABLE)
    }

    /// Loads a user table, or the built-in one when `path` is `None`
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a valid table
    pub fn load(path: Option<&Path>) -> Result<Self, TableError> {
        let Some(path) = path else {
            debug!("using built-in layout table");
            return Self::builtin();
        };

        let contents = fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let tables = Self::from_toml_str(&contents)?;
        info!(
            path = %path.display(),
            name = %tables.name,
            forward = tables.forward.len(),
            reverse = tables.reverse.len(),
            "layout table loaded"
        );
        Ok(tables)
    }

    /// Parses a table from TOML text
    ///
    /// Without `source_letters`, the detector uses the alphabetic keys of the
    /// forward map.
    ///
    /// # Errors
    /// Returns error on invalid TOML, empty maps or multi-character keys
    pub fn from_toml_str(contents: &str) -> Result<Self, TableError> {
        let file: TableFile = toml::from_str(contents)?;
        let forward = TransliterationMap::from_entries("forward", file.forward)?;
        let reverse = TransliterationMap::from_entries("reverse", file.reverse)?;

        let detector = match file.source_letters {
            Some(letters) => ScriptDetector::new(letters.chars()),
            None => ScriptDetector::new(
                forward
                    .iter()
                    .map(|(c, _)| c)
                    .filter(|c| c.is_alphabetic()),
            ),
        };

        Ok(Self {
            name: file.name,
            detector,
            forward,
            reverse,
        })
    }

    /// Table name from the file
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Script detector for this table
    #[must_use]
    pub const fn detector(&self) -> &ScriptDetector {
        &self.detector
    }

    /// Map for the given direction
    #[must_use]
    pub const fn map(&self, direction: Direction) -> &TransliterationMap {
        match direction {
            Direction::SourceToTarget => &self.forward,
            Direction::TargetToSource => &self.reverse,
        }
    }

    /// Detects the script of `text` and converts it through the matching map
    #[must_use]
    pub fn convert(&self, text: &str) -> (Direction, String) {
        let direction = self.detector.detect(text);
        (direction, self.map(direction).apply(text))
    }
}
