//! Parameter value object shared by the mapper and the effect chain

use serde::{Deserialize, Serialize};

/// Equalizer band settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqParameters {
    /// High shelf corner frequency in Hz
    pub high_shelf_freq: f32,
    /// High shelf gain in dB
    pub high_shelf_gain: f32,
    /// Mid peak center frequency in Hz
    pub mid_freq: f32,
    /// Mid peak gain in dB
    pub mid_gain: f32,
    /// Mid peak quality factor (> 0)
    pub mid_q: f32,
    /// Low shelf corner frequency in Hz
    pub low_shelf_freq: f32,
    /// Low shelf gain in dB
    pub low_shelf_gain: f32,
}

impl Default for EqParameters {
    fn default() -> Self {
        Self {
            high_shelf_freq: 10000.0,
            high_shelf_gain: 0.0,
            mid_freq: 2000.0,
            mid_gain: 0.0,
            mid_q: 1.0,
            low_shelf_freq: 100.0,
            low_shelf_gain: 0.0,
        }
    }
}

/// Compressor settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParameters {
    pub threshold_db: f32,
    /// Compression ratio N:1, never below 1.0
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub makeup_gain_db: f32,
    pub enabled: bool,
}

impl Default for CompressorParameters {
    fn default() -> Self {
        Self {
            threshold_db: 0.0,
            ratio: 1.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            makeup_gain_db: 0.0,
            enabled: false,
        }
    }
}

/// Reverb settings, all normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbParameters {
    pub room_size: f32,
    pub damping: f32,
    pub width: f32,
    pub wet_level: f32,
    pub dry_level: f32,
    pub enabled: bool,
}

impl Default for ReverbParameters {
    fn default() -> Self {
        Self {
            room_size: 0.0,
            damping: 0.0,
            width: 1.0,
            wet_level: 0.0,
            dry_level: 1.0,
            enabled: false,
        }
    }
}

/// The complete parameter set produced by the mapper and consumed by the chain
///
/// The default value is the flat, disabled state: every EQ band at 0 dB,
/// compressor and reverb switched off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioParameters {
    pub eq: EqParameters,
    pub compressor: CompressorParameters,
    pub reverb: ReverbParameters,
    /// Effective intensity the parameters were scaled with
    pub intensity: f32,
}

impl Default for AudioParameters {
    fn default() -> Self {
        Self {
            eq: EqParameters::default(),
            compressor: CompressorParameters::default(),
            reverb: ReverbParameters::default(),
            intensity: 1.0,
        }
    }
}

impl AudioParameters {
    /// Scale gain-like and wet/room-like fields by the effective intensity
    ///
    /// Only positive intensities scale anything. The ratio can grow but never
    /// drops below its unscaled value, and normalized reverb fields stay in
    /// [0, 1].
    pub fn apply_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
        if intensity <= 0.0 {
            return;
        }

        self.eq.high_shelf_gain *= intensity;
        self.eq.mid_gain *= intensity;
        self.eq.low_shelf_gain *= intensity;

        self.reverb.wet_level = (self.reverb.wet_level * intensity).clamp(0.0, 1.0);
        self.reverb.room_size = (self.reverb.room_size * intensity).clamp(0.0, 1.0);

        let ratio = self.compressor.ratio;
        self.compressor.ratio = (ratio * intensity).max(ratio);
    }

    /// True when nothing would be audible: flat EQ, both processors off
    pub fn is_neutral(&self) -> bool {
        let eq = &self.eq;
        eq.high_shelf_gain == 0.0
            && eq.mid_gain == 0.0
            && eq.low_shelf_gain == 0.0
            && !self.compressor.enabled
            && !self.reverb.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_neutral() {
        let params = AudioParameters::default();
        assert!(params.is_neutral());
        assert_eq!(params.compressor.ratio, 1.0);
        assert_eq!(params.reverb.dry_level, 1.0);
        assert_eq!(params.eq.mid_q, 1.0);
    }

    #[test]
    fn test_intensity_scales_gains_and_clamps_reverb() {
        let mut params = AudioParameters::default();
        params.eq.high_shelf_gain = 2.5;
        params.reverb.room_size = 0.8;
        params.reverb.wet_level = 0.25;
        params.compressor.ratio = 4.0;

        params.apply_intensity(2.0);

        assert_relative_eq!(params.eq.high_shelf_gain, 5.0);
        assert_relative_eq!(params.reverb.room_size, 1.0);
        assert_relative_eq!(params.reverb.wet_level, 0.5);
        assert_relative_eq!(params.compressor.ratio, 8.0);
        assert_relative_eq!(params.intensity, 2.0);
    }

    #[test]
    fn test_fractional_intensity_keeps_ratio() {
        let mut params = AudioParameters::default();
        params.compressor.ratio = 4.0;
        params.compressor.makeup_gain_db = 2.0;
        params.eq.low_shelf_gain = 4.0;

        params.apply_intensity(0.5);

        assert_relative_eq!(params.compressor.ratio, 4.0);
        assert_relative_eq!(params.compressor.makeup_gain_db, 2.0);
        assert_relative_eq!(params.eq.low_shelf_gain, 2.0);
    }

    #[test]
    fn test_negative_intensity_is_inert() {
        let mut params = AudioParameters::default();
        params.eq.low_shelf_gain = -3.0;

        params.apply_intensity(-1.0);

        assert_relative_eq!(params.eq.low_shelf_gain, -3.0);
        assert_relative_eq!(params.intensity, -1.0);
    }

    #[test]
    fn test_serde_fills_missing_fields() {
        let params: AudioParameters =
            serde_json::from_str(r#"{"eq":{"mid_gain":2.0}}"#).unwrap();
        assert_eq!(params.eq.mid_gain, 2.0);
        assert_eq!(params.eq.mid_freq, 2000.0);
        assert_eq!(params.compressor, CompressorParameters::default());
    }
}
