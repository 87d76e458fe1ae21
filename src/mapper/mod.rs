//! Natural-language command mapping
//!
//! Turns a free-form description of the desired sound into
//! [`AudioParameters`] plus a list of human-readable changes.
//!
//! # Example
//! ```
//! use sonara::mapper::KeywordMapper;
//!
//! let mapper = KeywordMapper::new();
//! let mapping = mapper.map("add punchy compression", 1.0);
//! assert!(mapping.params.compressor.enabled);
//! assert_eq!(mapping.params.compressor.ratio, 4.0);
//! ```

pub mod changes;
pub mod intensity;
pub mod params;
pub mod rules;

pub use changes::{ChangeEntry, ChangeLog, ChangeTag, DEFAULT_CHANGE_LOG_CAPACITY};
pub use intensity::Modifier;
pub use params::{AudioParameters, CompressorParameters, EqParameters, ReverbParameters};
pub use rules::{CategoryRules, DEFAULT_RULES};

use rules::Evaluation;
use tracing::debug;

/// Result of mapping one command
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub params: AudioParameters,
    /// Changes in the order the rules fired
    pub changes: Vec<ChangeEntry>,
    pub modifier: Modifier,
}

impl Mapping {
    /// Effective intensity the parameters were scaled with
    ///
    /// Stays at the default 1.0 when no rule fired.
    pub fn intensity(&self) -> f32 {
        self.params.intensity
    }
}

/// Rule-based text to parameter mapper
///
/// Stateless: every call starts from the default parameters, so the result
/// only depends on the text and the base intensity.
#[derive(Debug, Clone, Copy)]
pub struct KeywordMapper {
    categories: &'static [CategoryRules],
}

impl Default for KeywordMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordMapper {
    pub fn new() -> Self {
        Self::with_rules(DEFAULT_RULES)
    }

    /// Use a custom set of category tables, evaluated in slice order
    pub fn with_rules(categories: &'static [CategoryRules]) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &'static [CategoryRules] {
        self.categories
    }

    /// Map a command onto parameters
    pub fn map(&self, text: &str, base_intensity: f32) -> Mapping {
        let lower = text.to_lowercase();
        let modifier = Modifier::extract(&lower);
        let intensity = modifier.multiplier() * base_intensity;

        let mut eval = Evaluation::new(&lower, modifier);
        for category in self.categories {
            category.evaluate(&mut eval);
        }

        // Nothing fired: the result stays exactly the default parameter set
        let mut params = eval.params;
        if !eval.changes.is_empty() {
            params.apply_intensity(intensity);
        }

        debug!(
            ?modifier,
            intensity,
            changes = eval.changes.len(),
            "mapped command"
        );

        Mapping {
            params,
            changes: eval.changes,
            modifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn descriptions(mapping: &Mapping) -> Vec<&str> {
        mapping
            .changes
            .iter()
            .map(|c| c.description.as_str())
            .collect()
    }

    #[test]
    fn test_warmer() {
        let mapping = KeywordMapper::new().map("make it warmer", 1.0);
        let eq = mapping.params.eq;

        assert_eq!(
            descriptions(&mapping),
            vec!["Peak 800Hz +2.0dB", "High Shelf 10kHz -1.5dB"]
        );
        assert_relative_eq!(eq.mid_freq, 800.0);
        assert_relative_eq!(eq.mid_gain, 2.0);
        assert_relative_eq!(eq.high_shelf_freq, 10000.0);
        assert_relative_eq!(eq.high_shelf_gain, -1.5);
        assert!(!mapping.params.compressor.enabled);
        assert!(!mapping.params.reverb.enabled);
    }

    #[test]
    fn test_punchy_compression() {
        let mapping = KeywordMapper::new().map("add punchy compression", 1.0);
        let comp = mapping.params.compressor;

        assert!(comp.enabled);
        assert_relative_eq!(comp.threshold_db, -12.0);
        assert_relative_eq!(comp.ratio, 4.0);
        assert_relative_eq!(comp.attack_ms, 3.0);
        assert_relative_eq!(comp.release_ms, 60.0);
        assert_relative_eq!(comp.makeup_gain_db, 2.0);
    }

    #[test]
    fn test_very_bright_and_spacious() {
        let mapping = KeywordMapper::new().map("very bright and spacious", 1.0);
        let params = mapping.params;

        assert_eq!(mapping.modifier, Modifier::Extreme);
        assert_relative_eq!(params.intensity, 2.0);
        assert_relative_eq!(params.eq.high_shelf_gain, 5.0);
        assert_relative_eq!(params.reverb.room_size, 0.8);
        assert_relative_eq!(params.reverb.wet_level, 0.3);
        assert!(params.reverb.enabled);
    }

    #[test]
    fn test_removal_is_absolute() {
        let mapper = KeywordMapper::new();
        let hall = mapper.map("add hall reverb", 1.0);
        assert!(hall.params.reverb.enabled);

        let removed = mapper.map("remove the reverb", 1.0);
        assert!(!removed.params.reverb.enabled);
        assert_eq!(removed.params.reverb.wet_level, 0.0);
        assert_eq!(removed.params.reverb.room_size, 0.0);
    }

    #[test_case("hello there", 1.0 ; "greeting")]
    #[test_case("", 1.0 ; "empty")]
    #[test_case("render the piano track", 1.0 ; "unrelated words")]
    #[test_case("hello there", 0.5 ; "greeting at half intensity")]
    #[test_case("a little hello", 2.0 ; "modifier without keyword")]
    fn test_no_keyword_is_neutral(text: &str, base_intensity: f32) {
        let mapping = KeywordMapper::new().map(text, base_intensity);
        assert_eq!(mapping.params, AudioParameters::default());
        assert!(mapping.changes.is_empty());
    }

    #[test_case("remove the bass", -6.0 ; "remove")]
    #[test_case("less bass", -3.0 ; "reduce")]
    #[test_case("more bass", 6.0 ; "boost scaled by more")]
    #[test_case("less boomy", -3.0 ; "boom before reduction")]
    #[test_case("deeper", 3.0 ; "deep")]
    fn test_bass_presets(text: &str, expected_gain: f32) {
        let mapping = KeywordMapper::new().map(text, 1.0);
        assert_relative_eq!(mapping.params.eq.low_shelf_gain, expected_gain);
    }

    #[test]
    fn test_ratio_never_below_one() {
        let mapper = KeywordMapper::new();
        for text in ["punchy", "a little glue", "remove compression", "even it out"] {
            for base in [0.0, 0.25, 0.5, 1.0, 2.0] {
                let ratio = mapper.map(text, base).params.compressor.ratio;
                assert!(ratio >= 1.0, "{} at {} gave ratio {}", text, base, ratio);
            }
        }
    }

    #[test]
    fn test_dry_override_keeps_reverb_on() {
        let mapping = KeywordMapper::new().map("dry and close", 1.0);
        let reverb = mapping.params.reverb;
        assert!(reverb.enabled);
        assert_relative_eq!(reverb.wet_level, 0.05);
        assert_relative_eq!(reverb.dry_level, 0.95);
    }

    #[test]
    fn test_base_intensity_multiplies_modifier() {
        let mapping = KeywordMapper::new().map("a bit brighter", 2.0);
        // slight (0.5) x base (2.0)
        assert_relative_eq!(mapping.intensity(), 1.0);
        assert_relative_eq!(mapping.params.eq.high_shelf_gain, 2.5);
    }
}
