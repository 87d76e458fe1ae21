//! Engine Tests
//!
//! Control-side behavior: rewriter fallback, asynchronous commands,
//! configuration loading and the thread split.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sonara::config::SonaraConfig;
use sonara::engine::{AudioBuffer, Orchestrator};
use sonara::error::SonaraError;
use sonara::mapper::{ChangeEntry, ChangeTag};
use sonara::rewrite::{parse_response, rewrite_or_fallback, GeminiRewriter, MockRewriter};

fn dispatch_until_done(engine: &mut Orchestrator, expected: usize) -> usize {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut total = 0;
    while total < expected && Instant::now() < deadline {
        total += engine.dispatch_pending();
        std::thread::sleep(Duration::from_millis(5));
    }
    total
}

// === Rewriter fallback ===

#[test]
fn test_invalid_sentinel_falls_back_to_original() {
    let body = r#"{"candidates":[{"content":{"parts":[{"text":"[INVALID]"}]}}]}"#;
    let err = parse_response(body).unwrap_err();
    assert!(matches!(err, SonaraError::InvalidRewrite));

    let mut engine = Orchestrator::new().with_rewriter(Arc::new(MockRewriter::failing(err)));
    let changes = engine.process_text_input_rewritten("more reverb");

    assert_eq!(changes[0].tag, ChangeTag::System);
    assert!(changes[1..].iter().all(|c| c.tag == ChangeTag::Reverb));
    assert!(engine.current_parameters().reverb.enabled);
}

#[test]
fn test_unconfigured_gemini_falls_back() {
    let rewriter = GeminiRewriter::new(Default::default());
    let outcome = rewrite_or_fallback(&rewriter, "brighter");

    assert!(!outcome.success);
    assert_eq!(outcome.text, "brighter");
}

#[test]
fn test_rewritten_without_rewriter_logs_fallback() {
    let mut engine = Orchestrator::new();
    let changes = engine.process_text_input_rewritten("punchy");

    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].tag, ChangeTag::System);
    assert_eq!(engine.change_log(), changes);
}

// === Asynchronous commands ===

#[test]
fn test_async_commands_apply_in_submission_order() {
    let mut engine = Orchestrator::new().with_rewriter(Arc::new(MockRewriter::echo()));
    let seen: Arc<Mutex<Vec<Vec<ChangeEntry>>>> = Arc::new(Mutex::new(Vec::new()));

    for text in ["add hall reverb", "remove the reverb"] {
        let seen = Arc::clone(&seen);
        engine.process_text_input_async(
            text,
            Box::new(move |changes| seen.lock().unwrap().push(changes.to_vec())),
        );
    }
    assert_eq!(engine.controller().pending(), 2);

    assert_eq!(dispatch_until_done(&mut engine, 2), 2);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0][0].description, "Hall Reverb: Wet 25%, Room 80%, Damping 50%");
    assert_eq!(seen[1][0].description, "Reverb Off");
    assert!(!engine.current_parameters().reverb.enabled);
}

#[test]
fn test_async_failure_still_maps_original() {
    let rewriter = MockRewriter::failing(SonaraError::RewriteFailed {
        reason: "timeout".to_string(),
    });
    let mut engine = Orchestrator::new().with_rewriter(Arc::new(rewriter));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    engine.process_text_input_async(
        "make it warmer",
        Box::new(move |changes| sink.lock().unwrap().extend_from_slice(changes)),
    );
    assert_eq!(dispatch_until_done(&mut engine, 1), 1);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].tag, ChangeTag::System);
    assert_eq!(seen[1].description, "Peak 800Hz +2.0dB");
}

// === Thread split ===

#[test]
fn test_parameters_cross_to_audio_thread() {
    let (mut controller, mut processor) = Orchestrator::new().into_parts();
    controller.process_text_input("add punchy compression");

    let handle = std::thread::spawn(move || {
        let mut block = AudioBuffer::sine(440.0, 0.9, 2, 512, 44100.0);
        processor.process_block(&mut block);
        (processor.applied_generation(), block.is_finite())
    });

    assert_eq!(handle.join().unwrap(), (Some(1), true));
}

// === Configuration ===

#[test]
fn test_config_file_drives_engine() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "sample_rate": 48000.0, "change_log_capacity": 2, "default_intensity": 0.5 }}"#
    )
    .unwrap();

    let config = SonaraConfig::load(file.path()).unwrap();
    assert_eq!(config.sample_rate, 48000.0);
    assert_eq!(config.block_size, 512);

    let mut engine = Orchestrator::with_config(&config);
    assert_eq!(engine.intensity(), 0.5);
    assert_eq!(engine.processor().chain().spec().sample_rate, 48000.0);

    // Three entries into a log of two keeps the newest pair
    let changes = engine.process_text_input("warm and spacious");
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1].tag, ChangeTag::Reverb);
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "default_intensity": 3.0 }}"#).unwrap();

    let err = SonaraConfig::load(file.path()).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PARAMETER");
}
