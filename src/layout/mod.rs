/// Source/target script classification
pub mod detect;
/// Transliteration maps and table loading
pub mod table;

pub use detect::{Direction, ScriptDetector};
pub use table::{LayoutTables, TableError, TransliterationMap};
