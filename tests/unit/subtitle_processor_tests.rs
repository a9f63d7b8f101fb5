/*!
 * Tests for subtitle parsing and bilingual rendering
 */

use std::time::Duration;
use anyhow::Result;

use subai::errors::SubtitleError;
use subai::subtitle_processor::{
    escape_ass_text, format_ass_time, format_srt_time, render, OutputFormat, SubtitleCollection,
    SubtitleItem,
};
use crate::common;

#[test]
fn test_parseFile_withSrt_shouldReadAllCues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;

    let collection = SubtitleCollection::parse_file(&path)?;

    assert_eq!(collection.len(), 4);
    assert_eq!(collection.items[1].text, "How are you?");
    assert_eq!(collection.items[3].start_at, Duration::from_millis(9500));
    assert_eq!(collection.items.iter().map(|i| i.index).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    Ok(())
}

#[test]
fn test_parseFile_withUnsortedCues_shouldSortAndRenumber() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "unsorted.srt",
        "5\n00:00:10,000 --> 00:00:11,000\nLater\n\n9\n00:00:01,000 --> 00:00:02,000\nEarlier\n",
    )?;

    let collection = SubtitleCollection::parse_file(&path)?;

    assert_eq!(collection.items[0].text, "Earlier");
    assert_eq!(collection.items[0].index, 1);
    assert_eq!(collection.items[1].index, 2);
    Ok(())
}

#[test]
fn test_parseFile_withVttExtension_shouldUseVttParser() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "clip.vtt",
        "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nFirst\n\n00:00:03.000 --> 00:00:04.000\nSecond\n",
    )?;

    let collection = SubtitleCollection::parse_file(&path)?;

    assert_eq!(collection.len(), 2);
    assert_eq!(collection.items[1].text, "Second");
    Ok(())
}

#[test]
fn test_parseFile_withAssWithoutExtension_shouldSniffContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "episode",
        "[Script Info]\nScriptType: v4.00+\n\n[Events]\nFormat: Layer, Start, End, Style, Text\n\
         Dialogue: 0,0:00:02.00,0:00:03.00,Default,Hi\\Nthere\n",
    )?;

    let collection = SubtitleCollection::parse_file(&path)?;

    assert_eq!(collection.len(), 1);
    assert_eq!(collection.items[0].text, "Hi\nthere");
    Ok(())
}

#[test]
fn test_parseFile_withEmptyFile_shouldReturnEmptyCollection() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "empty.srt", "")?;

    let collection = SubtitleCollection::parse_file(&path)?;

    assert!(collection.is_empty());
    assert_eq!(collection.render(OutputFormat::Srt), "");
    Ok(())
}

#[test]
fn test_parseFile_withMissingFile_shouldReturnIoError() {
    let result = SubtitleCollection::parse_file("/definitely/not/here.srt");
    assert!(matches!(result, Err(SubtitleError::Io(_))));
}

#[test]
fn test_render_srtScenario_shouldMatchExactBlock() {
    let mut item =
        SubtitleItem::new(1, Duration::from_millis(1000), Duration::from_millis(2500), "Hello");
    item.translated = Some("你好".to_string());

    assert_eq!(
        render(&[item], OutputFormat::Srt),
        "1\n00:00:01,000 --> 00:00:02,500\n你好\nHello\n\n"
    );
}

#[test]
fn test_formatTimes_shouldUseFormatSpecificLayouts() {
    let d = Duration::from_millis(36_610_127);
    assert_eq!(format_srt_time(d), "10:10:10,127");
    assert_eq!(format_ass_time(d), "10:10:10.12");
}

#[test]
fn test_escapeAssText_shouldEscapeBracesBackslashesAndNewlines() {
    assert_eq!(escape_ass_text("{a}\\b\nc"), "\\{a\\}\\\\b\\Nc");
}
