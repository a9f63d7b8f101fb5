/*!
 * Controller lifecycle: configuration, summarization policies and cancellation
 */

use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;

use subai::app_config::{Config, ContextFailurePolicy};
use subai::app_controller::{Controller, JobInput};
use subai::providers::mock::{MockChatModel, MockReply};
use crate::common;

fn job(dir: &std::path::Path) -> Result<JobInput> {
    Ok(JobInput {
        subtitle_path: common::create_test_subtitle(dir, "movie.srt")?,
        output_path: dir.join("movie.zh.srt"),
        output_format: "srt".to_string(),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_run_withSummary_shouldCallModelOncePerGroupPlusSummary() -> Result<()> {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir()?;
    let model = MockChatModel::working();

    let output = Controller::with_model(Config::default(), Arc::new(model.clone()))
        .with_progress(false)
        .run(job(temp_dir.path())?)
        .await;

    assert!(output.success, "{}", output.message);
    assert!(output.message.contains("subtitle translated successfully"));
    assert!(output.message.contains("(0 of 4 lines fell back to source text)"));
    assert_eq!(model.call_count(), 3);
    let stats = output.stats.unwrap();
    assert_eq!(stats.total_groups, 2);
    assert_eq!(stats.completed_groups, 2);
    Ok(())
}

#[tokio::test]
async fn test_run_withFailingSummaryAndDegrade_shouldTranslateWithoutContext() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let model = MockChatModel::scripted(vec![
        MockReply::Fail { status_code: 400, message: "bad request".to_string() },
        MockReply::submit(&["甲", "乙", "丙"]),
        MockReply::submit(&["丁"]),
    ]);

    let output = Controller::with_model(Config::default(), Arc::new(model.clone()))
        .with_progress(false)
        .run(job(temp_dir.path())?)
        .await;

    assert!(output.success, "{}", output.message);
    assert!(!model.calls()[1].messages[0].content().contains("Context:"));
    Ok(())
}

#[tokio::test]
async fn test_run_withFailingSummaryAndAbort_shouldFailJob() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = Config::default();
    config.translation.context_failure_policy = ContextFailurePolicy::Abort;
    let model = MockChatModel::failing();

    let input = job(temp_dir.path())?;
    let output_path = input.output_path.clone();
    let output = Controller::with_model(config, Arc::new(model.clone()))
        .with_progress(false)
        .run(input)
        .await;

    assert!(!output.success);
    assert_eq!(model.call_count(), 1);
    assert!(!output_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withTransportErrorOnFirstAttempt_shouldFailJob() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = Config::default();
    config.translation.summarize_context = false;

    let output = Controller::with_model(config, Arc::new(MockChatModel::failing()))
        .with_progress(false)
        .run(job(temp_dir.path())?)
        .await;

    assert!(!output.success);
    assert!(output.message.contains("Simulated provider failure"), "{}", output.message);
    Ok(())
}

#[tokio::test]
async fn test_run_whenCancelledBeforeStart_shouldNotCallModel() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let model = MockChatModel::working();
    let controller =
        Controller::with_model(Config::default(), Arc::new(model.clone())).with_progress(false);
    controller.cancellation_token().cancel();

    let output = controller.run(job(temp_dir.path())?).await;

    assert!(!output.success);
    assert!(output.message.contains("cancelled after 0 of 2 groups"), "{}", output.message);
    assert_eq!(model.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_whenCancelledMidJob_shouldStopAndKeepNoOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = Config::default();
    config.translation.summarize_context = false;
    let model =
        MockChatModel::scripted(vec![MockReply::submit(&["甲", "乙", "丙"]), MockReply::Hang]);
    let controller = Controller::with_model(config, Arc::new(model.clone())).with_progress(false);

    let token = controller.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let input = job(temp_dir.path())?;
    let output_path = input.output_path.clone();
    let output = tokio::time::timeout(Duration::from_secs(10), controller.run(input)).await?;

    assert!(!output.success);
    assert!(output.message.contains("cancelled after 1 of 2 groups"), "{}", output.message);
    assert_eq!(model.call_count(), 2);
    assert!(!output_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withoutInjectedModelOrKey_shouldReportConfigError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    let output = Controller::with_config(Config::default())
        .with_progress(false)
        .run(job(temp_dir.path())?)
        .await;

    assert!(!output.success);
    assert!(output.message.contains("API key"), "{}", output.message);
    Ok(())
}
