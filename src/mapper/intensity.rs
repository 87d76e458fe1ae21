//! Intensity modifier extraction
//!
//! Scans a lowercased command for modifier phrases. Groups are checked in
//! a fixed priority order and the first group with a hit wins; modifiers
//! never stack.

use serde::{Deserialize, Serialize};

/// The modifier phrase group found in a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// "remove", "without", "eliminate", "no ..."
    Remove,
    /// "slight", "little", "bit"
    Slight,
    /// "more", "much"
    More,
    /// "very", "super", "extreme"
    Extreme,
    /// "less", "reduce", "lower", "decrease"
    Reduce,
    /// No modifier phrase
    Neutral,
}

/// Phrase groups in priority order
const MODIFIER_PHRASES: &[(Modifier, &[&str])] = &[
    (Modifier::Remove, &["remove", "without", "eliminate"]),
    (Modifier::Slight, &["slight", "little", "bit"]),
    (Modifier::More, &["more", "much"]),
    (Modifier::Extreme, &["very", "super", "extreme"]),
    (Modifier::Reduce, &["less", "reduce", "lower", "decrease"]),
];

impl Modifier {
    /// Extract the modifier from a lowercased command
    pub fn extract(text: &str) -> Self {
        for (modifier, phrases) in MODIFIER_PHRASES {
            let mut hit = phrases.iter().any(|p| text.contains(p));
            // "no" only counts as a whole word, otherwise "piano" would remove things
            if *modifier == Modifier::Remove {
                hit = hit || contains_word(text, "no");
            }
            if hit {
                return *modifier;
            }
        }
        Modifier::Neutral
    }

    /// Multiplier applied to the base intensity
    pub fn multiplier(self) -> f32 {
        match self {
            Modifier::Remove => -2.0,
            Modifier::Slight => 0.5,
            Modifier::More => 1.5,
            Modifier::Extreme => 2.0,
            Modifier::Reduce => -1.0,
            Modifier::Neutral => 1.0,
        }
    }

    /// True for removal and reduction intent
    pub fn is_negative(self) -> bool {
        self.multiplier() < 0.0
    }
}

/// Whole-word match, splitting on anything that isn't alphanumeric
pub(crate) fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}
