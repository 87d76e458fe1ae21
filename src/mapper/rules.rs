//! Keyword rule tables
//!
//! Each category is a static table: a keyword list that gates the category,
//! presets tried in priority order (at most one fires), and add-ons that are
//! checked on their own phrases after the preset. Keeping the tables as data
//! makes every rule auditable and testable on its own.

use super::changes::{ChangeEntry, ChangeTag};
use super::intensity::Modifier;
use super::params::AudioParameters;
use tracing::debug;

// ============================================================================
// Rule building blocks
// ============================================================================

/// Predicate over a lowercased command and its modifier
#[derive(Debug, Clone, Copy)]
pub struct Condition {
    /// Any of these substrings must appear; empty matches every command
    phrases: &'static [&'static str],
    /// Modifier the command must carry
    modifier: Option<Modifier>,
    /// Modifier the command must not carry
    excluded: Option<Modifier>,
}

impl Condition {
    pub const fn any(phrases: &'static [&'static str]) -> Self {
        Self {
            phrases,
            modifier: None,
            excluded: None,
        }
    }

    /// Matches every command that reached the rule
    pub const fn always() -> Self {
        Self::any(&[])
    }

    pub const fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    pub const fn unless_modifier(mut self, modifier: Modifier) -> Self {
        self.excluded = Some(modifier);
        self
    }

    pub fn matches(&self, text: &str, modifier: Modifier) -> bool {
        if self.modifier.is_some_and(|m| m != modifier) {
            return false;
        }
        if self.excluded == Some(modifier) {
            return false;
        }
        self.phrases.is_empty() || self.phrases.iter().any(|p| text.contains(p))
    }
}

/// Reverb preset values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbPreset {
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub width: f32,
}

/// Compressor preset values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorPreset {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub makeup_gain_db: f32,
}

/// A single parameter edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Patch {
    HighShelf { freq: f32, gain_db: f32 },
    MidPeak { freq: f32, gain_db: f32, q: f32 },
    LowShelf { freq: f32, gain_db: f32 },
    /// Enable the reverb with a room preset
    Reverb(ReverbPreset),
    /// Disable the reverb and zero wet level and room size
    ReverbOff,
    /// Enable the reverb with an explicit wet/dry balance
    DryMix { wet: f32, dry: f32 },
    EnableReverb,
    /// Enable the compressor with a dynamics preset
    Compressor(CompressorPreset),
    /// Disable the compressor at unity ratio
    CompressorOff,
    EnableCompressor,
}

impl Patch {
    fn apply(&self, params: &mut AudioParameters) {
        match *self {
            Patch::HighShelf { freq, gain_db } => {
                params.eq.high_shelf_freq = freq;
                params.eq.high_shelf_gain = gain_db;
            }
            Patch::MidPeak { freq, gain_db, q } => {
                params.eq.mid_freq = freq;
                params.eq.mid_gain = gain_db;
                params.eq.mid_q = q;
            }
            Patch::LowShelf { freq, gain_db } => {
                params.eq.low_shelf_freq = freq;
                params.eq.low_shelf_gain = gain_db;
            }
            Patch::Reverb(preset) => {
                let reverb = &mut params.reverb;
                reverb.enabled = true;
                reverb.room_size = preset.room_size;
                reverb.damping = preset.damping;
                reverb.wet_level = preset.wet_level;
                reverb.width = preset.width;
            }
            Patch::ReverbOff => {
                params.reverb.enabled = false;
                params.reverb.wet_level = 0.0;
                params.reverb.room_size = 0.0;
            }
            Patch::DryMix { wet, dry } => {
                params.reverb.enabled = true;
                params.reverb.wet_level = wet;
                params.reverb.dry_level = dry;
            }
            Patch::EnableReverb => params.reverb.enabled = true,
            Patch::Compressor(preset) => {
                let comp = &mut params.compressor;
                comp.enabled = true;
                comp.threshold_db = preset.threshold_db;
                comp.ratio = preset.ratio.max(1.0);
                comp.attack_ms = preset.attack_ms;
                comp.release_ms = preset.release_ms;
                comp.makeup_gain_db = preset.makeup_gain_db;
            }
            Patch::CompressorOff => {
                params.compressor.enabled = false;
                params.compressor.ratio = 1.0;
            }
            Patch::EnableCompressor => params.compressor.enabled = true,
        }
    }
}

/// Cross-category guard checked before a rule fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Guard {
    /// Skip when `owner` already set the mid band below `below_hz`
    MidBandFree { owner: ChangeTag, below_hz: f32 },
}

/// One row of a category table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub when: Condition,
    pub patches: &'static [Patch],
    /// Change-log lines, one per entry
    pub changes: &'static [&'static str],
    pub guard: Option<Guard>,
}

impl Rule {
    const fn new(
        name: &'static str,
        when: Condition,
        patches: &'static [Patch],
        changes: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            when,
            patches,
            changes,
            guard: None,
        }
    }

    const fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }
}

/// The rule table of one category
#[derive(Debug, Clone, Copy)]
pub struct CategoryRules {
    pub tag: ChangeTag,
    /// Vocabulary gating the presets
    pub keywords: &'static [&'static str],
    /// Tried in order, first match wins
    pub presets: &'static [Rule],
    /// Checked independently after the presets
    pub add_ons: &'static [Rule],
}

// ============================================================================
// Evaluation
// ============================================================================

/// Running state of one mapping pass
pub(crate) struct Evaluation<'a> {
    text: &'a str,
    modifier: Modifier,
    /// Category and frequency of the last mid-band write
    mid_claim: Option<(ChangeTag, f32)>,
    pub(crate) params: AudioParameters,
    pub(crate) changes: Vec<ChangeEntry>,
}

impl<'a> Evaluation<'a> {
    pub(crate) fn new(text: &'a str, modifier: Modifier) -> Self {
        Self {
            text,
            modifier,
            mid_claim: None,
            params: AudioParameters::default(),
            changes: Vec::new(),
        }
    }

    fn guard_allows(&self, guard: Option<Guard>) -> bool {
        match guard {
            None => true,
            Some(Guard::MidBandFree { owner, below_hz }) => !matches!(
                self.mid_claim,
                Some((tag, freq)) if tag == owner && freq < below_hz
            ),
        }
    }

    /// Fire a rule if its condition and guard allow; returns whether it fired
    fn try_fire(&mut self, tag: ChangeTag, rule: &Rule) -> bool {
        if !rule.when.matches(self.text, self.modifier) {
            return false;
        }
        if !self.guard_allows(rule.guard) {
            debug!(category = %tag, rule = rule.name, "rule blocked by guard");
            return false;
        }

        for patch in rule.patches {
            patch.apply(&mut self.params);
            if let Patch::MidPeak { freq, .. } = patch {
                self.mid_claim = Some((tag, *freq));
            }
        }
        self.changes
            .extend(rule.changes.iter().map(|d| ChangeEntry::new(*d, tag)));

        debug!(category = %tag, rule = rule.name, "rule fired");
        true
    }
}

impl CategoryRules {
    /// True when the command mentions any of this category's keywords
    pub fn is_mentioned(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k))
    }

    pub(crate) fn evaluate(&self, eval: &mut Evaluation<'_>) {
        if self.is_mentioned(eval.text) {
            for rule in self.presets {
                if eval.try_fire(self.tag, rule) {
                    break;
                }
            }
        }

        for rule in self.add_ons {
            eval.try_fire(self.tag, rule);
        }
    }
}

// ============================================================================
// Tables
// ============================================================================

pub const BRIGHTNESS: CategoryRules = CategoryRules {
    tag: ChangeTag::Brightness,
    keywords: &[
        "bright", "brighter", "brightness", "sparkle", "sparkly", "air", "airy", "airiness",
        "crisp", "crispy", "highs", "high end", "treble", "presence", "shine", "shiny", "clear",
        "clearer", "clarity", "detail", "detailed", "dark", "darker", "dull",
    ],
    presets: &[
        Rule::new(
            "darken",
            Condition::any(&["dark", "dull"]),
            &[Patch::HighShelf { freq: 8000.0, gain_db: -3.0 }],
            &["High Shelf 8kHz -3.0dB"],
        ),
        Rule::new(
            "air",
            Condition::any(&["more air", "airy", "airiness"]),
            &[Patch::HighShelf { freq: 10000.0, gain_db: 4.0 }],
            &["High Shelf 10kHz +4.0dB"],
        ),
        Rule::new(
            "sparkle",
            Condition::any(&["sparkle", "sparkly"]),
            &[Patch::HighShelf { freq: 12000.0, gain_db: 3.0 }],
            &["High Shelf 12kHz +3.0dB"],
        ),
        Rule::new(
            "bright",
            Condition::any(&["bright"]),
            &[Patch::HighShelf { freq: 8000.0, gain_db: 2.5 }],
            &["High Shelf 8kHz +2.5dB"],
        ),
    ],
    add_ons: &[Rule::new(
        "clarity",
        Condition::any(&["clarity", "clear"]),
        &[Patch::MidPeak { freq: 2500.0, gain_db: 2.0, q: 1.5 }],
        &["Peak 2.5kHz +2.0dB Q:1.5"],
    )],
};

pub const WARMTH: CategoryRules = CategoryRules {
    tag: ChangeTag::Warmth,
    keywords: &[
        "warm", "warmer", "warmth", "smooth", "smoother", "body", "full", "fuller", "thick",
        "thicker", "round", "rounder", "mellow", "soft", "softer", "sweet",
    ],
    presets: &[
        Rule::new(
            "warm",
            Condition::any(&["warm"]),
            &[
                Patch::MidPeak { freq: 800.0, gain_db: 2.0, q: 1.0 },
                Patch::HighShelf { freq: 10000.0, gain_db: -1.5 },
            ],
            &["Peak 800Hz +2.0dB", "High Shelf 10kHz -1.5dB"],
        ),
        Rule::new(
            "body",
            Condition::any(&["body", "full"]),
            &[Patch::MidPeak { freq: 300.0, gain_db: 3.0, q: 1.5 }],
            &["Peak 300Hz +3.0dB"],
        ),
        Rule::new(
            "smooth",
            Condition::any(&["smooth"]),
            &[Patch::HighShelf { freq: 5000.0, gain_db: -2.0 }],
            &["High Shelf 5kHz -2.0dB"],
        ),
    ],
    add_ons: &[],
};

pub const REVERB: CategoryRules = CategoryRules {
    tag: ChangeTag::Reverb,
    keywords: &[
        "reverb", "verb", "room", "space", "spacious", "hall", "ambience", "ambient", "distance",
        "distant", "echo", "echoes", "wet", "wetness", "atmosphere", "atmospheric",
    ],
    presets: &[
        Rule::new(
            "remove",
            Condition::always().with_modifier(Modifier::Remove),
            &[Patch::ReverbOff],
            &["Reverb Off"],
        ),
        Rule::new(
            "room",
            Condition::any(&["room", "space", "spacious"]),
            &[Patch::Reverb(ReverbPreset {
                room_size: 0.4,
                damping: 0.3,
                wet_level: 0.15,
                width: 0.8,
            })],
            &["Room Reverb: Wet 15%, Room 40%, Damping 30%"],
        ),
        Rule::new(
            "hall",
            Condition::any(&["hall"]),
            &[Patch::Reverb(ReverbPreset {
                room_size: 0.8,
                damping: 0.5,
                wet_level: 0.25,
                width: 1.0,
            })],
            &["Hall Reverb: Wet 25%, Room 80%, Damping 50%"],
        ),
        Rule::new(
            "ambience",
            Condition::any(&["ambience", "ambient"]),
            &[Patch::Reverb(ReverbPreset {
                room_size: 0.3,
                damping: 0.4,
                wet_level: 0.1,
                width: 0.9,
            })],
            &["Ambience: Wet 10%, Room 30%, Damping 40%"],
        ),
        Rule::new(
            "enable",
            Condition::always(),
            &[Patch::EnableReverb],
            &["Reverb On"],
        ),
    ],
    add_ons: &[Rule::new(
        "dry",
        Condition::any(&["dry", "close", "upfront"]).unless_modifier(Modifier::Remove),
        &[Patch::DryMix { wet: 0.05, dry: 0.95 }],
        &["Dry Mix: Wet 5%"],
    )],
};

pub const COMPRESSOR: CategoryRules = CategoryRules {
    tag: ChangeTag::Compressor,
    keywords: &[
        "punch", "punchy", "tight", "tighter", "glue", "glued", "cohesion", "consistent",
        "control", "controlled", "compression", "compress", "even", "level", "leveled",
    ],
    presets: &[
        Rule::new(
            "remove",
            Condition::always().with_modifier(Modifier::Remove),
            &[Patch::CompressorOff],
            &["Compressor Off"],
        ),
        Rule::new(
            "punch",
            Condition::any(&["punch"]),
            &[Patch::Compressor(CompressorPreset {
                threshold_db: -12.0,
                ratio: 4.0,
                attack_ms: 3.0,
                release_ms: 60.0,
                makeup_gain_db: 2.0,
            })],
            &["Compressor: Ratio 4:1, Attack 3ms, Release 60ms, +2dB makeup"],
        ),
        Rule::new(
            "glue",
            Condition::any(&["glue", "tight"]),
            &[Patch::Compressor(CompressorPreset {
                threshold_db: -8.0,
                ratio: 2.5,
                attack_ms: 10.0,
                release_ms: 100.0,
                makeup_gain_db: 1.0,
            })],
            &["Compressor: Ratio 2.5:1, Attack 10ms, Release 100ms"],
        ),
        Rule::new(
            "level",
            Condition::any(&["level", "even"]),
            &[Patch::Compressor(CompressorPreset {
                threshold_db: -10.0,
                ratio: 3.0,
                attack_ms: 20.0,
                release_ms: 150.0,
                makeup_gain_db: 1.5,
            })],
            &["Compressor: Ratio 3:1, Attack 20ms, Release 150ms"],
        ),
        Rule::new(
            "enable",
            Condition::always(),
            &[Patch::EnableCompressor],
            &["Compressor On"],
        ),
    ],
    add_ons: &[],
};

const LOW_END: &[&str] = &["bass", "low end", "lows"];

pub const BASS: CategoryRules = CategoryRules {
    tag: ChangeTag::Bass,
    keywords: &[
        "bass", "low end", "lows", "low", "deeper", "deep", "boom", "boomy", "thump", "thumpy",
        "kick", "punch", "weight", "heavy", "thick",
    ],
    presets: &[
        Rule::new(
            "remove",
            Condition::any(LOW_END).with_modifier(Modifier::Remove),
            &[Patch::LowShelf { freq: 100.0, gain_db: -6.0 }],
            &["Low Shelf 100Hz -6.0dB"],
        ),
        Rule::new(
            "boom",
            Condition::any(&["boom"]),
            &[Patch::LowShelf { freq: 150.0, gain_db: -3.0 }],
            &["Low Shelf 150Hz -3.0dB"],
        ),
        Rule::new(
            "reduce",
            Condition::any(LOW_END).with_modifier(Modifier::Reduce),
            &[Patch::LowShelf { freq: 100.0, gain_db: -3.0 }],
            &["Low Shelf 100Hz -3.0dB"],
        ),
        Rule::new(
            "boost",
            Condition::any(&["more bass", "low end", "lows"]),
            &[Patch::LowShelf { freq: 100.0, gain_db: 4.0 }],
            &["Low Shelf 100Hz +4.0dB"],
        ),
        Rule::new(
            "deep",
            Condition::any(&["deep"]),
            &[Patch::LowShelf { freq: 60.0, gain_db: 3.0 }],
            &["Low Shelf 60Hz +3.0dB"],
        ),
    ],
    add_ons: &[],
};

pub const PRESENCE: CategoryRules = CategoryRules {
    tag: ChangeTag::Presence,
    keywords: &[
        "presence", "forward", "upfront", "cut", "cut through", "vocal", "vocals", "mid",
        "mids", "midrange", "snap", "snappy",
    ],
    presets: &[Rule::new(
        "presence",
        Condition::any(&["presence", "forward", "vocal"]),
        &[Patch::MidPeak { freq: 3000.0, gain_db: 3.0, q: 2.0 }],
        &["Peak 3kHz +3.0dB Q:2.0"],
    )
    .guarded(Guard::MidBandFree {
        owner: ChangeTag::Warmth,
        below_hz: 2000.0,
    })],
    add_ons: &[],
};

/// All categories in evaluation order
pub const DEFAULT_RULES: &[CategoryRules] =
    &[BRIGHTNESS, WARMTH, REVERB, COMPRESSOR, BASS, PRESENCE];
