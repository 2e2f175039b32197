/*!
 * Integration tests for application lifecycle
 */

use anyhow::Result;
use serde_json::json;

use subsplit::app_config::Config;
use subsplit::app_controller::Controller;
use subsplit::segment::TextSegment;
use subsplit::subtitle_writer::{DISPLAY_OUTPUTS, DUBBING_OUTPUTS};

use crate::common;

fn story_words() -> serde_json::Value {
    json!([
        {"text": "Hello", "start": 0.0, "end": 0.4},
        {"text": "world.", "start": 0.5, "end": 0.9},
        {"text": "See", "start": 2.0, "end": 2.3},
        {"text": "you", "start": 2.3, "end": 2.5},
        {"text": "tomorrow.", "start": 2.5, "end": 3.4}
    ])
}

#[test]
fn test_controller_initialization_withDefaultConfig_shouldSucceed() -> Result<()> {
    let controller = Controller::new_for_test()?;
    assert_eq!(controller.config().source_language, "en");
    Ok(())
}

#[test]
fn test_controller_withInvalidLanguage_shouldFail() {
    let config = Config {
        source_language: "klingon".to_string(),
        ..Config::default()
    };
    assert!(Controller::with_config(config).is_err());
}

#[tokio::test]
async fn test_runAlign_plainTranslations_shouldWriteEverySubtitleFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let words = common::write_json_file(temp_dir.path(), "words.json", &story_words())?;
    let translations = common::write_json_file(
        temp_dir.path(),
        "translations.json",
        &json!(["Bonjour le monde.", "À demain."]),
    )?;
    let output_dir = temp_dir.path().join("out");

    let controller = Controller::new_for_test()?;
    let summary = controller.run_align(&words, &translations, None, Some(output_dir.clone())).await?;

    assert_eq!(summary.total_segments, 2);
    assert_eq!(summary.skipped_segments, 0);
    for (name, _) in DISPLAY_OUTPUTS.iter().chain(DUBBING_OUTPUTS.iter()) {
        assert!(output_dir.join(name).exists(), "{} was not written", name);
    }
    assert!(output_dir.join("report.json").exists());

    let source = std::fs::read_to_string(output_dir.join("src.srt"))?;
    // Short first cue is stretched to the minimum duration
    assert!(source.starts_with("1\n00:00:00,000 --> 00:00:01,000\nHello world.\n"));
    assert!(source.contains("2\n00:00:02,000 --> 00:00:03,400\nSee you tomorrow.\n"));

    let translated = std::fs::read_to_string(output_dir.join("trans.srt"))?;
    assert!(translated.contains("Bonjour le monde."));
    assert!(translated.contains("À demain."));
    Ok(())
}

#[tokio::test]
async fn test_runAlign_pairedTranslations_shouldKeepGivenSegments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let words = common::write_json_file(temp_dir.path(), "words.json", &story_words())?;
    let translations = common::write_json_file(
        temp_dir.path(),
        "pairs.json",
        &json!([
            {"source": "Hello world. See you", "translation": "Bonjour le monde. À"},
            {"source": "tomorrow.", "translation": "demain."}
        ]),
    )?;

    let controller = Controller::new_for_test()?;
    let summary = controller
        .run_align(&words, &translations, None, Some(temp_dir.path().to_path_buf()))
        .await?;

    assert_eq!(summary.total_segments, 2);
    let source = std::fs::read_to_string(temp_dir.path().join("src.srt"))?;
    assert!(source.contains("Hello world. See you"));
    assert!(source.contains("00:00:02,500 --> 00:00:03,400\ntomorrow."));

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(temp_dir.path().join("report.json"))?)?;
    assert_eq!(report["stats"]["aligned"], 2);
    Ok(())
}

#[tokio::test]
async fn test_runAlign_translationCountMismatch_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let words = common::write_json_file(temp_dir.path(), "words.json", &story_words())?;
    let translations = common::write_json_file(temp_dir.path(), "translations.json", &json!(["Un.", "Deux.", "Trois."]))?;

    let controller = Controller::new_for_test()?;
    let result = controller.run_align(&words, &translations, None, None).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("src.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_runAlign_plainTranslations_shouldPairWithSplitOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let words = common::write_json_file(temp_dir.path(), "words.json", &story_words())?;
    // Boundaries that re-segmenting the transcript would never produce
    common::write_json_file(
        temp_dir.path(),
        "words.segments.json",
        &json!([
            {"index": 0, "source_text": "Hello world. See you"},
            {"index": 1, "source_text": "tomorrow."}
        ]),
    )?;
    let translations = common::write_json_file(temp_dir.path(), "translations.json", &json!(["Bonjour. À", "demain."]))?;

    let controller = Controller::new_for_test()?;
    controller.run_align(&words, &translations, None, None).await?;

    let source = std::fs::read_to_string(temp_dir.path().join("src_trans.srt"))?;
    assert!(source.contains("Hello world. See you\nBonjour. À"));
    assert!(source.contains("tomorrow.\ndemain."));
    Ok(())
}

#[tokio::test]
async fn test_runAlign_afterRunSplit_shouldUseWrittenSegments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let words = common::write_json_file(temp_dir.path(), "words.json", &story_words())?;
    let controller = Controller::new_for_test()?;

    let segments_path = controller.run_split(&words, Some(temp_dir.path().join("custom.json"))).await?;
    let translations = common::write_json_file(temp_dir.path(), "t.json", &json!(["Bonjour le monde.", "À demain."]))?;
    let summary = controller.run_align(&words, &translations, Some(segments_path), None).await?;

    assert_eq!(summary.total_segments, 2);
    let translated = std::fs::read_to_string(temp_dir.path().join("trans.srt"))?;
    assert!(translated.contains("00:00:02,000 --> 00:00:03,400\nÀ demain."));
    Ok(())
}

#[tokio::test]
async fn test_runAlign_oracleWithoutSegmentsFile_shouldRefuseToGuess() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let words = common::write_json_file(temp_dir.path(), "words.json", &story_words())?;
    let translations = common::write_json_file(temp_dir.path(), "t.json", &json!(["Un.", "Deux."]))?;
    // Default configuration consults the Ollama oracle
    let controller = Controller::with_config(Config::default())?;

    let result = controller.run_align(&words, &translations, None, None).await;

    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("segments"), "unexpected error: {}", message);
    assert!(!temp_dir.path().join("src.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_runAlign_segmentsOutOfOrder_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let words = common::write_json_file(temp_dir.path(), "words.json", &story_words())?;
    let segments = common::write_json_file(
        temp_dir.path(),
        "segments.json",
        &json!([
            {"index": 1, "source_text": "See you tomorrow."},
            {"index": 0, "source_text": "Hello world."}
        ]),
    )?;
    let translations = common::write_json_file(temp_dir.path(), "t.json", &json!(["À demain.", "Bonjour."]))?;

    let controller = Controller::new_for_test()?;
    let result = controller.run_align(&words, &translations, Some(segments), None).await;

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_runSplit_shouldWriteSegmentsNextToInput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let words = common::write_json_file(temp_dir.path(), "episode.json", &story_words())?;

    let controller = Controller::new_for_test()?;
    let output = controller.run_split(&words, None).await?;

    assert_eq!(output, temp_dir.path().join("episode.segments.json"));
    let segments: Vec<TextSegment> = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    let texts: Vec<&str> = segments.iter().map(|s| s.source_text.as_str()).collect();
    assert_eq!(texts, vec!["Hello world.", "See you tomorrow."]);
    assert!(segments.iter().all(|s| s.translated_text.is_empty()));
    Ok(())
}

#[test]
fn test_runSplit_missingWordsFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::new_for_test()?;

    let result = tokio_test::block_on(async { controller.run_split(&temp_dir.path().join("missing.json"), None).await });

    assert!(result.is_err());
    Ok(())
}
