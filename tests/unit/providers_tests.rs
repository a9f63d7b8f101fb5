/*!
 * Tests for the chat model providers
 */

use subai::app_config::ProviderConfig;
use subai::providers::mock::{MockChatModel, MockReply};
use subai::providers::openai::OpenAI;
use subai::providers::{ChatMessage, ChatModel};
use subai::translation::verification::submit_translation_tool;

#[test]
fn test_openAI_newWithConfig_shouldUseConfiguredModel() {
    let config = ProviderConfig {
        model: "gpt-4o-mini".to_string(),
        api_key: "sk-test".to_string(),
        endpoint: "http://localhost:1234/v1/".to_string(),
        ..Default::default()
    };

    let client = OpenAI::new_with_config(&config);

    assert_eq!(client.model_name(), "gpt-4o-mini");
    assert_eq!(client.completions_url(), "http://localhost:1234/v1/chat/completions");
}

#[tokio::test]
async fn test_mockModel_shouldRecordOfferedTools() {
    let model = MockChatModel::working();
    let messages = vec![ChatMessage::system("translate"), ChatMessage::user(r#"["Hi"]"#)];

    let response = model.generate(&messages, &[submit_translation_tool()]).await.unwrap();

    assert_eq!(response.tool_calls[0].name, "submit_translation");
    assert_eq!(model.calls()[0].tool_names, vec!["submit_translation".to_string()]);
}

#[tokio::test]
async fn test_scriptedModel_shouldConsumeRepliesInOrder() {
    let model = MockChatModel::scripted(vec![
        MockReply::Text("first".to_string()),
        MockReply::submit(&["second"]),
    ]);

    let first = model.generate(&[], &[]).await.unwrap();
    let second = model.generate(&[], &[]).await.unwrap();

    assert_eq!(first.content, "first");
    assert!(second.tool_calls[0].arguments.contains("second"));
    assert_eq!(model.remaining_replies(), 0);
}
