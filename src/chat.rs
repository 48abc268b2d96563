use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use crate::prefs::LearningStyle;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// One turn of the conversation, tagged by sender.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// Preferences and page material as they stood when a call was issued. Only
/// the first turn of a session injects this into the message list; later
/// turns carry the history instead, so mid-conversation preference or
/// content changes never reframe an ongoing session.
#[derive(Debug, Clone)]
pub struct StudyContext {
    pub learning_style: LearningStyle,
    pub enhancement_type: String,
    pub material: String,
}

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one conversation turn. Never fails from the caller's point of
    /// view: any error ends up as an apology string that goes straight into
    /// the transcript.
    pub async fn send(
        &self,
        user_message: &str,
        history: &[ChatMessage],
        context: &StudyContext,
    ) -> String {
        let messages = build_messages(history, user_message, context);
        match self.complete(messages).await {
            Ok(reply) => reply,
            Err(e) => format!("Sorry, I wasn't able to process that message. Error: {}", e),
        }
    }

    async fn complete(&self, messages: Vec<ApiMessage>) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
        };

        let response = self.client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat API error {}: {}", status, text));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let choice = completion
            .choices
            .first()
            .ok_or_else(|| anyhow!("chat API returned no choices"))?;

        Ok(choice.message.content.trim().to_string())
    }
}

/// Build the outgoing message list: every prior turn role-mapped in order,
/// a single system-context message when (and only when) the history is
/// empty, then the new user message.
fn build_messages(
    history: &[ChatMessage],
    user_message: &str,
    context: &StudyContext,
) -> Vec<ApiMessage> {
    let mut messages: Vec<ApiMessage> = history
        .iter()
        .map(|turn| ApiMessage {
            role: match turn.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            }
            .to_string(),
            content: turn.content.clone(),
        })
        .collect();

    if history.is_empty() {
        messages.push(ApiMessage {
            role: "system".to_string(),
            content: format!(
                "The student has a {} learning style and prefers responses enhanced with {}. \
                 They are trying to learn the following material: {}",
                context.learning_style.as_str(),
                context.enhancement_type,
                context.material
            ),
        });
    }

    messages.push(ApiMessage {
        role: "user".to_string(),
        content: user_message.to_string(),
    });

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use wiremock::matchers::{method, path};

    fn study_context() -> StudyContext {
        StudyContext {
            learning_style: LearningStyle::Spatial,
            enhancement_type: "Spatial Representations".to_string(),
            material: "Photosynthesis converts light into chemical energy.".to_string(),
        }
    }

    #[test]
    fn test_first_turn_is_system_then_user() {
        let messages = build_messages(&[], "What is this page about?", &study_context());

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(
            messages[0].content,
            "The student has a spatial learning style and prefers responses enhanced with \
             Spatial Representations. They are trying to learn the following material: \
             Photosynthesis converts light into chemical energy."
        );
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "What is this page about?");
    }

    #[test]
    fn test_later_turns_carry_history_and_no_system() {
        let history = vec![
            ChatMessage { role: ChatRole::User, content: "First question".to_string() },
            ChatMessage { role: ChatRole::Assistant, content: "First answer".to_string() },
            ChatMessage { role: ChatRole::User, content: "Second question".to_string() },
        ];

        let messages = build_messages(&history, "Third question", &study_context());

        assert_eq!(messages.len(), 4);
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["user", "assistant", "user", "user"]);
        assert_eq!(messages[3].content, "Third question");
    }

    #[tokio::test]
    async fn test_send_returns_trimmed_first_choice() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"content": "  Light becomes stored sugar.  "}},
                    {"message": {"content": "ignored second choice"}}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = ChatClient::new(&mock_server.uri(), "test-key", DEFAULT_MODEL);
        let reply = client.send("Explain it", &[], &study_context()).await;
        assert_eq!(reply, "Light becomes stored sugar.");
    }

    #[tokio::test]
    async fn test_send_fails_soft_on_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let client = ChatClient::new(&mock_server.uri(), "test-key", DEFAULT_MODEL);
        let reply = client.send("Explain it", &[], &study_context()).await;
        assert!(
            reply.starts_with("Sorry, I wasn't able to process that message. Error: "),
            "unexpected reply: {}",
            reply
        );
    }

    #[tokio::test]
    async fn test_send_fails_soft_on_empty_choices() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&mock_server)
            .await;

        let client = ChatClient::new(&mock_server.uri(), "test-key", DEFAULT_MODEL);
        let reply = client.send("Explain it", &[], &study_context()).await;
        assert!(reply.starts_with("Sorry, I wasn't able to process that message. Error: "));
    }
}
