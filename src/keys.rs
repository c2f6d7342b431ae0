//! Canonical key symbols and key combinations.
//!
//! Raw key identifiers differ per platform backend: left and right modifier
//! variants are distinct keys, and casing is inconsistent. [`normalize`]
//! collapses each modifier family into a single canonical symbol and
//! lower-cases everything else, so the recorder, the matcher, and persisted
//! script files all speak the same vocabulary.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ClickScriptError, Result};

/// The canonical modifier symbols, in render order.
const MODIFIERS: [&str; 4] = ["alt", "ctrl", "shift", "super"];

/// Map a raw key identifier to its canonical symbol.
///
/// Deterministic and total: left/right variants of control, alt, shift, and
/// the OS/command key collapse to one symbol per family; all other
/// identifiers pass through lower-cased. Unknown names are not an error --
/// they pass through verbatim (lower-cased) and are treated as opaque
/// symbols downstream.
pub fn normalize(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    match lower.as_str() {
        "ctrl" | "control" | "controlleft" | "controlright" | "ctrl_l" | "ctrl_r" | "lcontrol"
        | "rcontrol" => "ctrl".to_string(),
        "alt" | "altgr" | "altleft" | "altright" | "alt_l" | "alt_r" | "option" | "loption"
        | "roption" => "alt".to_string(),
        "shift" | "shiftleft" | "shiftright" | "shift_l" | "shift_r" | "lshift" | "rshift" => {
            "shift".to_string()
        }
        "super" | "meta" | "metaleft" | "metaright" | "cmd" | "command" | "win" | "windows"
        | "lwin" | "rwin" => "super".to_string(),
        _ => lower,
    }
}

/// Whether a canonical symbol belongs to one of the modifier families.
pub fn is_modifier(symbol: &str) -> bool {
    MODIFIERS.contains(&symbol)
}

/// Sort key giving modifiers precedence over regular keys, alphabetical
/// within each group. This is the stable render order used for display
/// and serialization.
fn render_rank(symbol: &str) -> (u8, &str) {
    (u8::from(!is_modifier(symbol)), symbol)
}

/// A set of canonical key symbols, e.g. `{ctrl, alt, p}`.
///
/// Unordered for matching purposes, but held internally in the stable render
/// order (modifiers alphabetically, then regular keys alphabetically) so
/// equality, hashing, display, and serialization are all order-independent
/// of how the combination was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeyCombination {
    symbols: Vec<String>,
}

impl KeyCombination {
    /// Create an empty combination (unbound).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a combination from raw key identifiers, normalizing each.
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut combo = Self::new();
        for key in raw {
            combo.insert(key.as_ref());
        }
        combo
    }

    /// Parse a `+`-separated combination string such as `"ctrl+alt+p"`.
    pub fn parse(text: &str) -> Result<Self> {
        let combo = Self::from_raw(text.split('+').filter(|part| !part.trim().is_empty()));
        if combo.is_empty() {
            return Err(ClickScriptError::invalid_keybind(text, "no keys given"));
        }
        Ok(combo)
    }

    /// Normalize and insert a raw key. Returns false if the symbol was
    /// already present.
    pub fn insert(&mut self, raw: &str) -> bool {
        let symbol = normalize(raw);
        if symbol.is_empty() {
            return false;
        }
        match self
            .symbols
            .binary_search_by(|existing| render_rank(existing).cmp(&render_rank(&symbol)))
        {
            Ok(_) => false,
            Err(index) => {
                self.symbols.insert(index, symbol);
                true
            }
        }
    }

    /// Whether the combination contains a canonical symbol.
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// An empty combination means "unbound"; it is never registered with
    /// the dispatcher.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of symbols in the combination.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// The symbols in stable render order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// True when every symbol of this combination is currently pressed.
    /// An empty combination is never satisfied.
    pub fn is_satisfied_by(&self, pressed: &HashSet<String>) -> bool {
        !self.is_empty() && self.symbols.iter().all(|s| pressed.contains(s))
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, symbol) in self.symbols.iter().enumerate() {
            if index > 0 {
                write!(f, "+")?;
            }
            let mut chars = symbol.chars();
            if let Some(first) = chars.next() {
                write!(f, "{}{}", first.to_uppercase(), chars.as_str())?;
            }
        }
        Ok(())
    }
}

impl From<Vec<String>> for KeyCombination {
    fn from(raw: Vec<String>) -> Self {
        Self::from_raw(raw)
    }
}

impl From<KeyCombination> for Vec<String> {
    fn from(combo: KeyCombination) -> Self {
        combo.symbols
    }
}
