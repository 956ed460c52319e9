use rig::completion::Prompt;
use rig::providers::openai;
use serde::Deserialize;
use tracing::warn;

use crate::config::Config;

const CHAT_PREAMBLE: &str = "You are TrailMate, a friendly hiking assistant. \
Answer questions about hiking, trails, gear, safety and outdoor planning concisely. \
If the user's trail data is provided, use it. Never invent trail facts you were not given.";

const FALLBACK_REPLY: &str = "I'm your hiking assistant! I can recommend gear, check what you \
already own, analyze your trail, check the weather, build a hiking plan or find gear rental \
shops nearby. What would you like to do?";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatArgs {
    #[serde(default)]
    pub message: String,
}

/// One-shot completion with the given preamble. `None` when no model is
/// configured or the call fails.
pub async fn complete(config: &Config, preamble: &str, prompt: &str) -> Option<String> {
    let api_key = config.openai_api_key.as_deref()?;
    let client = openai::Client::from_url(api_key, &config.openai_base_url);
    let agent = client
        .agent(&config.openai_model)
        .preamble(preamble)
        .build();

    match agent.prompt(prompt).await {
        Ok(response) => Some(response),
        Err(err) => {
            warn!(error = %err, "Chat completion failed");
            None
        }
    }
}

pub fn chat_prompt(message: &str, trail_summary: Option<&str>) -> String {
    match trail_summary {
        Some(summary) => format!("My latest trail: {summary}\n\n{message}"),
        None => message.to_string(),
    }
}

pub async fn chat_tool(config: &Config, message: &str, trail_summary: Option<&str>) -> String {
    let message = message.trim();
    if message.is_empty() {
        return FALLBACK_REPLY.to_string();
    }
    complete(config, CHAT_PREAMBLE, &chat_prompt(message, trail_summary))
        .await
        .filter(|reply| !reply.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_trail_when_known() {
        let prompt = chat_prompt("Is it safe?", Some("Distance: 5.0 km"));
        assert_eq!(prompt, "My latest trail: Distance: 5.0 km\n\nIs it safe?");
        assert_eq!(chat_prompt("Hi", None), "Hi");
    }

    #[tokio::test]
    async fn falls_back_without_a_model() {
        let config = Config::from_lookup(|_| None);
        let reply = chat_tool(&config, "hello there", None).await;
        assert_eq!(reply, FALLBACK_REPLY);
    }
}
