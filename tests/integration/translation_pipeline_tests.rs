/*!
 * Grouping, summarization, batch translation and merging with mock models
 */

use std::sync::Arc;
use anyhow::Result;

use subai::app_config::{MismatchPolicy, TranslationSettings};
use subai::providers::mock::{MockChatModel, MockReply};
use subai::providers::{ChatMessage, ChatModel};
use subai::subtitle_processor::{render, OutputFormat, SubtitleCollection};
use subai::translation::{
    group_by_time, BatchTranslator, CancellationToken, ContextSummarizer, TokenUsageStats,
    TranslationContext, TranslationMerger,
};
use crate::common;

fn translator(model: &MockChatModel, settings: &TranslationSettings) -> BatchTranslator {
    let model: Arc<dyn ChatModel> = Arc::new(model.clone());
    BatchTranslator::new(model, settings, "English".to_string(), "Chinese".to_string())
}

fn sample_items() -> Result<Vec<subai::subtitle_processor::SubtitleItem>> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "sample.srt")?;
    Ok(SubtitleCollection::parse_file(path)?.items)
}

#[tokio::test]
async fn test_pipeline_withValidPlaceholders_shouldMergeExactStrings() -> Result<()> {
    let mut items = sample_items()?;
    let groups = group_by_time(&items, 3.0);
    let model = MockChatModel::scripted(vec![
        MockReply::submit(&["p0", "p1", "p2"]),
        MockReply::submit(&["p3"]),
    ]);

    let batch = translator(&model, &TranslationSettings::default())
        .translate(&groups, &TranslationContext::empty(), &CancellationToken::new(), &|_, _| {})
        .await?;
    TranslationMerger::merge(&mut items, &batch.translations);

    assert_eq!(batch.translations.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    let translated: Vec<&str> = items.iter().filter_map(|i| i.translated.as_deref()).collect();
    assert_eq!(translated, vec!["p0", "p1", "p2", "p3"]);
    assert_eq!(batch.stats.accepted_via_tool_call, 2);
    assert_eq!(model.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_withPersistentShortArray_shouldFallBackForMissingLine() -> Result<()> {
    let mut items = sample_items()?;
    let groups = group_by_time(&items, 3.0);
    let short = MockReply::submit(&["甲", "乙"]);
    let model = MockChatModel::scripted(vec![
        short.clone(),
        short.clone(),
        short,
        MockReply::submit(&["丁"]),
    ]);

    let batch = translator(&model, &TranslationSettings::default())
        .translate(&groups, &TranslationContext::empty(), &CancellationToken::new(), &|_, _| {})
        .await?;
    TranslationMerger::merge(&mut items, &batch.translations);

    let translated: Vec<&str> = items.iter().filter_map(|i| i.translated.as_deref()).collect();
    assert_eq!(translated, vec!["甲", "乙", "Fine, thanks.", "丁"]);
    assert_eq!(batch.stats.exhausted_groups, 1);
    assert_eq!(batch.stats.fallback_lines, 1);
    assert_eq!(batch.stats.retries, 2);
    assert_eq!(model.call_count(), 4);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_withDiscardPolicy_shouldUseSourceForWholeGroup() -> Result<()> {
    let items = sample_items()?;
    let groups = group_by_time(&items, 3.0);
    let short = MockReply::submit(&["甲", "乙"]);
    let model = MockChatModel::scripted(vec![
        short.clone(),
        short.clone(),
        short,
        MockReply::submit(&["丁"]),
    ]);
    let settings = TranslationSettings {
        mismatch_policy: MismatchPolicy::DiscardBatch,
        ..Default::default()
    };

    let batch = translator(&model, &settings)
        .translate(&groups, &TranslationContext::empty(), &CancellationToken::new(), &|_, _| {})
        .await?;

    assert_eq!(batch.translations[&0], "Hello.");
    assert_eq!(batch.translations[&2], "Fine, thanks.");
    assert_eq!(batch.translations[&3], "丁");
    assert_eq!(batch.stats.fallback_lines, 3);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_withCorrectionOnRetry_shouldShowViolationToModel() -> Result<()> {
    let items = sample_items()?;
    let groups = group_by_time(&items, 3.0);
    let model = MockChatModel::scripted(vec![
        MockReply::submit(&["only one"]),
        MockReply::submit(&["a", "b", "c"]),
        MockReply::submit(&["d"]),
    ]);

    let batch = translator(&model, &TranslationSettings::default())
        .translate(&groups, &TranslationContext::empty(), &CancellationToken::new(), &|_, _| {})
        .await?;

    assert_eq!(batch.stats.fallback_lines, 0);
    let second_attempt = &model.calls()[1].messages;
    let last = second_attempt.last().map(ChatMessage::content).unwrap_or_default();
    assert!(last.contains("expected exactly 3 translations but received 1"), "{}", last);
    // The retry is sent from scratch only for the next group
    assert_eq!(model.calls()[2].messages.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_withSummary_shouldPutContextIntoEveryGroupPrompt() -> Result<()> {
    common::init_test_logger();
    let items = sample_items()?;
    let groups = group_by_time(&items, 3.0);
    let model = MockChatModel::working().with_summary("Two friends meet at a station.");
    let mut usage = TokenUsageStats::new("mock-model".to_string());

    let context = ContextSummarizer::new(Arc::new(model.clone()), 20_000)
        .summarize("sample.srt", &items, &mut usage)
        .await?;
    let batch = translator(&model, &TranslationSettings::default())
        .translate(&groups, &context, &CancellationToken::new(), &|_, _| {})
        .await?;

    assert_eq!(batch.translations.len(), 4);
    let calls = model.calls();
    assert!(calls[0].tool_names.is_empty());
    assert!(calls[0].messages[1].content().contains("Filename: sample.srt"));
    for call in &calls[1..] {
        assert!(call.messages[0].content().contains("Two friends meet at a station."));
    }
    Ok(())
}

#[tokio::test]
async fn test_pipeline_withNoItems_shouldBeNoOp() -> Result<()> {
    let mut items = Vec::new();
    let groups = group_by_time(&items, 3.0);
    let model = MockChatModel::working();

    let batch = translator(&model, &TranslationSettings::default())
        .translate(&groups, &TranslationContext::empty(), &CancellationToken::new(), &|_, _| {})
        .await?;

    assert!(groups.is_empty());
    assert_eq!(TranslationMerger::merge(&mut items, &batch.translations), 0);
    assert_eq!(model.call_count(), 0);
    assert_eq!(render(&items, OutputFormat::Srt), "");
    Ok(())
}
