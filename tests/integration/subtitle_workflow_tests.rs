/*!
 * End-to-end subtitle file workflows: parse, translate, render, save
 */

use std::fs;
use std::sync::Arc;
use anyhow::Result;

use subai::app_config::Config;
use subai::app_controller::{Controller, JobInput};
use subai::file_utils::FileManager;
use subai::providers::mock::MockChatModel;
use subai::subtitle_processor::{OutputFormat, SubtitleCollection};
use crate::common;

fn controller(model: MockChatModel) -> Controller {
    let mut config = Config::default();
    config.translation.summarize_context = false;
    Controller::with_model(config, Arc::new(model)).with_progress(false)
}

#[tokio::test]
async fn test_run_withSrtOutput_shouldWriteTranslationAboveSource() -> Result<()> {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir()?;
    let input_path = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let output_path = FileManager::generate_output_path(&input_path, "zh", OutputFormat::Srt);

    let output = controller(MockChatModel::working())
        .run(JobInput {
            subtitle_path: input_path,
            output_path: output_path.clone(),
            output_format: "srt".to_string(),
            ..Default::default()
        })
        .await;

    assert!(output.success, "{}", output.message);
    let written = fs::read_to_string(&output_path)?;
    assert!(written.starts_with("1\n00:00:01,000 --> 00:00:02,000\n[zh] Hello.\nHello.\n\n"));
    assert!(written.ends_with("4\n00:00:09,500 --> 00:00:11,000\n[zh] Goodbye.\nGoodbye.\n\n"));
    Ok(())
}

#[tokio::test]
async fn test_run_withAssOutput_shouldWriteStyledDialogue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_path = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let output_path = temp_dir.path().join("movie.zh.ass");

    let output = controller(MockChatModel::working())
        .run(JobInput {
            subtitle_path: input_path,
            output_path: output_path.clone(),
            output_format: "ASS".to_string(),
            ..Default::default()
        })
        .await;

    assert!(output.success, "{}", output.message);
    let written = fs::read_to_string(&output_path)?;
    assert!(written.starts_with("[Script Info]"));
    assert!(written.contains("[Events]"));
    assert!(written.contains(
        "Dialogue: 0,0:00:01.00,0:00:02.00,Chinese,,0,0,0,,\
         {\\rChinese}[zh] Hello.\\N{\\rEnglish}Hello.\n"
    ));
    assert_eq!(written.matches("Dialogue:").count(), 4);
    Ok(())
}

#[tokio::test]
async fn test_run_withUnknownFormat_shouldFallBackToSrt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_path = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let output_path = temp_dir.path().join("out.txt");

    let output = controller(MockChatModel::working())
        .run(JobInput {
            subtitle_path: input_path,
            output_path: output_path.clone(),
            output_format: "vtt".to_string(),
            ..Default::default()
        })
        .await;

    assert!(output.success);
    assert!(fs::read_to_string(&output_path)?.starts_with("1\n00:00:01,000 --> "));
    Ok(())
}

#[tokio::test]
async fn test_run_withEmptySubtitle_shouldWriteEmptyDocument() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_path = common::create_test_file(temp_dir.path(), "empty.srt", "")?;
    let srt_path = temp_dir.path().join("empty.zh.srt");
    let ass_path = temp_dir.path().join("empty.zh.ass");
    let model = MockChatModel::working();

    let srt = controller(model.clone())
        .run(JobInput {
            subtitle_path: input_path.clone(),
            output_path: srt_path.clone(),
            output_format: "srt".to_string(),
            ..Default::default()
        })
        .await;
    let ass = controller(model.clone())
        .run(JobInput {
            subtitle_path: input_path,
            output_path: ass_path.clone(),
            output_format: "ass".to_string(),
            ..Default::default()
        })
        .await;

    assert!(srt.success && ass.success);
    assert_eq!(model.call_count(), 0);
    assert_eq!(fs::read_to_string(&srt_path)?, "");
    let ass_doc = fs::read_to_string(&ass_path)?;
    assert!(ass_doc.contains("[Events]"));
    assert!(!ass_doc.contains("Dialogue:"));
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingInput_shouldReportFailure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_path = temp_dir.path().join("out.srt");

    let output = controller(MockChatModel::working())
        .run(JobInput {
            subtitle_path: temp_dir.path().join("missing.srt"),
            output_path: output_path.clone(),
            ..Default::default()
        })
        .await;

    assert!(!output.success);
    assert!(output.subtitle.is_none());
    assert!(!output_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withMalformedAss_shouldReportParseError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_path = common::create_test_file(
        temp_dir.path(),
        "broken.ass",
        "[Events]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,Hi\n",
    )?;

    let output = controller(MockChatModel::working())
        .run(JobInput {
            subtitle_path: input_path,
            output_path: temp_dir.path().join("out.srt"),
            ..Default::default()
        })
        .await;

    assert!(!output.success);
    assert!(output.message.contains("Failed to parse subtitle file"), "{}", output.message);
    Ok(())
}

#[tokio::test]
async fn test_run_withUnwritableOutput_shouldReportSaveError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_path = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;

    // The output path is an existing directory
    let output = controller(MockChatModel::working())
        .run(JobInput {
            subtitle_path: input_path,
            output_path: temp_dir.path().to_path_buf(),
            ..Default::default()
        })
        .await;

    assert!(!output.success);
    assert!(output.message.contains("Failed to save output"), "{}", output.message);
    Ok(())
}

#[tokio::test]
async fn test_writtenSrt_shouldParseBackToSameTiming() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_path = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let output_path = temp_dir.path().join("movie.zh.srt");

    let output = controller(MockChatModel::working())
        .run(JobInput {
            subtitle_path: input_path.clone(),
            output_path: output_path.clone(),
            ..Default::default()
        })
        .await;
    assert!(output.success);

    let original = SubtitleCollection::parse_file(&input_path)?;
    let reparsed = SubtitleCollection::parse_file(&output_path)?;

    assert_eq!(reparsed.len(), original.len());
    for (a, b) in original.items.iter().zip(&reparsed.items) {
        assert_eq!(a.start_at, b.start_at);
        assert_eq!(a.end_at, b.end_at);
        assert_eq!(b.text, format!("[zh] {}\n{}", a.text, a.text));
    }
    Ok(())
}
