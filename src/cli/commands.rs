//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use serde::Serialize;
use tracing::info;

use crate::config::SonaraConfig;
use crate::engine::Orchestrator;
use crate::error::Result;
use crate::mapper::{AudioParameters, ChangeEntry, KeywordMapper};

#[derive(Serialize)]
struct MapReport<'a> {
    text: &'a str,
    parameters: AudioParameters,
    changes: &'a [ChangeEntry],
}

/// Map a command and print the resulting parameters.
pub fn map(config: &SonaraConfig, text: &str, intensity: Option<f32>, json: bool) -> Result<()> {
    let mut engine = Orchestrator::with_config(config);
    if let Some(intensity) = intensity {
        engine.set_intensity(intensity);
    }

    let changes = engine.process_text_input(text);
    let parameters = engine.current_parameters();

    if json {
        let report = MapReport {
            text,
            parameters,
            changes: &changes,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_changes(&changes);
    print_parameters(&parameters);
    Ok(())
}

/// Rewrite a command with the configured rewriter, then map it.
pub fn rewrite(config: &SonaraConfig, text: &str) -> Result<()> {
    let mut engine = Orchestrator::with_config(config);
    if !engine.controller().has_rewriter() {
        println!("No rewriter configured (set SONARA_GEMINI_API_KEY); mapping the text as is.");
    }

    info!("Rewriting: {}", text);
    let changes = engine.process_text_input_rewritten(text);

    print_changes(&changes);
    print_parameters(&engine.current_parameters());
    Ok(())
}

/// Print every category with its vocabulary.
pub fn keywords() -> Result<()> {
    for category in KeywordMapper::new().categories() {
        println!("{}:", category.tag);
        println!("  {}", category.keywords.join(", "));
        let rules: Vec<&str> = category
            .presets
            .iter()
            .chain(category.add_ons)
            .map(|r| r.name)
            .collect();
        println!("  rules: {}", rules.join(", "));
    }
    Ok(())
}

fn print_changes(changes: &[ChangeEntry]) {
    if changes.is_empty() {
        println!("No changes.");
        return;
    }
    println!("Changes:");
    for change in changes {
        println!("  [{}] {}", change.tag, change.description);
    }
}

fn print_parameters(params: &AudioParameters) {
    let eq = &params.eq;
    let comp = &params.compressor;
    let reverb = &params.reverb;

    println!("Intensity: {:.2}", params.intensity);
    println!(
        "EQ: high shelf {} Hz {:+.1} dB | peak {} Hz {:+.1} dB Q {:.1} | low shelf {} Hz {:+.1} dB",
        eq.high_shelf_freq,
        eq.high_shelf_gain,
        eq.mid_freq,
        eq.mid_gain,
        eq.mid_q,
        eq.low_shelf_freq,
        eq.low_shelf_gain
    );
    if comp.enabled {
        println!(
            "Compressor: {:.1} dB, {:.1}:1, attack {} ms, release {} ms, makeup {:+.1} dB",
            comp.threshold_db, comp.ratio, comp.attack_ms, comp.release_ms, comp.makeup_gain_db
        );
    } else {
        println!("Compressor: off");
    }
    if reverb.enabled {
        println!(
            "Reverb: room {:.2}, damping {:.2}, width {:.2}, wet {:.2}, dry {:.2}",
            reverb.room_size, reverb.damping, reverb.width, reverb.wet_level, reverb.dry_level
        );
    } else {
        println!("Reverb: off");
    }
}
