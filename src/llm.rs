use crate::{context::Context, log_internal, trigger::TriggerKind};
use anyhow::Result;
use std::time::Duration;

/// Discord rejects messages longer than this.
const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// LLM generation settings
pub struct LlmSettings<'a> {
    pub model_name: &'a str,
    pub system: &'a str,
    pub context_size: usize,
    pub temperature: f32,
}

/// One judgement request against the chat endpoint.
///
/// Built from a memory snapshot taken at decision time; the transcript is owned and never
/// re-derived, so messages arriving mid-flight cannot change what the model sees.
#[derive(serde::Serialize)]
pub struct JudgementRequest {
    /// LLM model name
    model: String,
    /// Whether to stream one token at a time, or return entire response in one go
    stream: bool,
    /// System prompt plus the formatted judgement prompt.
    messages: Vec<ChatMessage>,
    /// Context size
    num_ctx: usize,
    /// LLM temperature
    temperature: f32,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ChatMessage {
    role: ChatMessageRole,
    content: String,
}

#[allow(non_camel_case_types)] // Serialized literally; case matters
#[derive(serde::Serialize, serde::Deserialize)]
enum ChatMessageRole {
    system,
    user,
    assistant,
}

#[derive(serde::Deserialize)]
struct JudgementResponse {
    message: ChatMessage,
}

impl JudgementRequest {
    pub fn new(
        settings: &LlmSettings<'_>,
        target_name: &str,
        kind: TriggerKind,
        transcript: &str,
    ) -> Self {
        let prompt = format!(
            "TARGET USER: {}\n\
             TRIGGER TYPE: {}\n\
             RECENT HISTORY:\n{}\n\n\
             Weigh the most recent messages most heavily. \
             Identify their chud-like behavior and roast them.",
            target_name,
            kind.reason(),
            transcript,
        );

        let messages = vec![
            ChatMessage {
                role: ChatMessageRole::system,
                content: settings.system.to_owned(),
            },
            ChatMessage {
                role: ChatMessageRole::user,
                content: prompt,
            },
        ];

        Self {
            model: settings.model_name.to_owned(),
            stream: false,
            messages,
            num_ctx: settings.context_size,
            temperature: settings.temperature,
        }
    }

    /// Post the request and return the generated verdict.
    ///
    /// No retry: a network error or timeout surfaces to the caller, which aborts the run.
    pub async fn post(&self, ctx: &Context<'_>) -> Result<String> {
        let (url, timeout) = {
            let cfg = ctx.cfg.read().await;
            (
                cfg.llm_general.chat_url.clone(),
                cfg.llm_general.request_timeout_seconds,
            )
        };

        log_internal!("Sending judgement request to {}... ", url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;
        let response = client
            .post(&url)
            .json(self)
            .send()
            .await?
            .json::<JudgementResponse>()
            .await?;
        log_internal!("Sending judgement request to {}... done", url);

        Ok(clamp_to_message_limit(response.message.content))
    }
}

/// Cut an overlong verdict down to something Discord will accept, on a char boundary.
fn clamp_to_message_limit(mut text: String) -> String {
    if text.len() <= DISCORD_MESSAGE_LIMIT {
        return text;
    }

    let mut end = DISCORD_MESSAGE_LIMIT - 3;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text.push_str("...");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LlmSettings<'static> {
        LlmSettings {
            model_name: "test-model",
            system: "be mean",
            context_size: 2048,
            temperature: 0.8,
        }
    }

    #[test]
    fn prompt_carries_target_reason_and_transcript() {
        let request = JudgementRequest::new(
            &settings(),
            "Ann",
            TriggerKind::Manual,
            "Ann: I hate Python and everyone who uses it.",
        );

        let prompt = &request.messages[1].content;
        assert!(prompt.contains("TARGET USER: Ann"));
        assert!(prompt.contains("TRIGGER TYPE: MANUAL OVERRIDE"));
        assert!(prompt.contains("Ann: I hate Python and everyone who uses it."));
        assert!(prompt.contains("Weigh the most recent messages most heavily."));
    }

    #[test]
    fn random_trigger_uses_its_own_reason_tag() {
        let request = JudgementRequest::new(
            &settings(),
            "Bob",
            TriggerKind::Random,
            crate::memory::EMPTY_SNAPSHOT,
        );

        let prompt = &request.messages[1].content;
        assert!(prompt.contains("TRIGGER TYPE: RANDOM DETECTION"));
        assert!(prompt.contains(crate::memory::EMPTY_SNAPSHOT));
    }

    #[test]
    fn system_prompt_leads_the_conversation() {
        let request = JudgementRequest::new(&settings(), "Ann", TriggerKind::Manual, "history");
        assert_eq!(request.messages[0].content, "be mean");
        assert!(matches!(request.messages[0].role, ChatMessageRole::system));
    }

    #[test]
    fn response_parses_from_chat_endpoint_json() {
        let raw = r#"{
            "model": "test-model",
            "message": {
                "role": "assistant",
                "content": "Ann is a big fat chud who never ships code"
            },
            "done": true
        }"#;

        let response: JudgementResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            response.message.content,
            "Ann is a big fat chud who never ships code"
        );
    }

    #[test]
    fn short_verdicts_pass_through_unclamped() {
        let text = "u are a chud".to_owned();
        assert_eq!(clamp_to_message_limit(text.clone()), text);
    }

    #[test]
    fn overlong_verdicts_are_clamped_on_a_char_boundary() {
        // Multi-byte chars right at the cut point must not split.
        let text = "é".repeat(1500);
        let clamped = clamp_to_message_limit(text);
        assert!(clamped.len() <= DISCORD_MESSAGE_LIMIT);
        assert!(clamped.ends_with("..."));
        assert!(clamped.is_char_boundary(clamped.len() - 3));
    }
}
