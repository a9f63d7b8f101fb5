/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;

use subai::app_config::{Config, ContextFailurePolicy, LogLevel, MismatchPolicy};
use subai::subtitle_processor::OutputFormat;
use crate::common;

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("subai.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.provider.model, "gpt-3.5-turbo");
    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.translation.context_char_limit, 20_000);
    Ok(())
}

#[test]
fn test_loadOrCreate_withPartialFile_shouldKeepGivenValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "subai.json",
        r#"{
            "target_language": "ja",
            "output_format": "ass",
            "log_level": "debug",
            "translation": {
                "max_gap_seconds": 1.5,
                "mismatch_policy": "discard_batch",
                "context_failure_policy": "abort"
            }
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.target_language, "ja");
    assert_eq!(config.output_format, OutputFormat::Ass);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.translation.max_gap_seconds, 1.5);
    assert_eq!(config.translation.max_attempts, 3);
    assert_eq!(config.translation.mismatch_policy, MismatchPolicy::DiscardBatch);
    assert_eq!(config.translation.context_failure_policy, ContextFailurePolicy::Abort);
    Ok(())
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

#[test]
fn test_validate_withUnknownLanguage_shouldFail() {
    let mut config = Config::default();
    config.provider.api_key = "sk-test".to_string();
    config.target_language = "klingon".to_string();

    assert!(config.validate().is_err());
}
