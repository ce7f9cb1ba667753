//! External LLM provider calls.
//!
//! OpenAI and Groq share the chat-completions format. Anthropic uses the
//! Messages API with the system prompt as a top-level field.

use lessonmap_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::types::{ChatMessage, LLMProvider, SamplingParams};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Run one non-streaming completion against the given provider.
pub async fn complete(
    client: &Client,
    provider: LLMProvider,
    messages: &[ChatMessage],
    model: &str,
    api_key: &str,
    params: SamplingParams,
) -> Result<String> {
    match provider {
        LLMProvider::OpenAI => {
            complete_openai_compat(client, OPENAI_URL, messages, model, api_key, params).await
        }
        LLMProvider::Groq => {
            complete_openai_compat(client, GROQ_URL, messages, model, api_key, params).await
        }
        LLMProvider::Anthropic => {
            complete_anthropic(client, messages, model, api_key, params).await
        }
    }
}

/// Complete via OpenAI-compatible APIs (OpenAI, Groq).
async fn complete_openai_compat(
    client: &Client,
    url: &str,
    messages: &[ChatMessage],
    model: &str,
    api_key: &str,
    params: SamplingParams,
) -> Result<String> {
    let body = openai_body(messages, model, params);

    debug!("Requesting completion from {} with model {}", url, model);

    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

    let parsed = read_json(response).await?;
    parse_openai_response(&parsed)
}

/// Complete via Anthropic's Messages API.
async fn complete_anthropic(
    client: &Client,
    messages: &[ChatMessage],
    model: &str,
    api_key: &str,
    params: SamplingParams,
) -> Result<String> {
    let body = anthropic_body(messages, model, params);

    debug!("Requesting completion from Anthropic with model {}", model);

    let response = client
        .post(ANTHROPIC_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

    let parsed = read_json(response).await?;
    parse_anthropic_response(&parsed)
}

async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("LLM API error {}: {}", status, body);
        return Err(Error::Generation(format!("API error {}: {}", status, body)));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| Error::Generation(format!("Invalid API response: {}", e)))
}

fn openai_body(messages: &[ChatMessage], model: &str, params: SamplingParams) -> Value {
    let msgs: Vec<Value> = messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();
    json!({
        "model": model,
        "messages": msgs,
        "temperature": params.temperature,
        "top_p": params.top_p,
        "max_tokens": params.max_tokens,
    })
}

fn anthropic_body(messages: &[ChatMessage], model: &str, params: SamplingParams) -> Value {
    // Separate system message from conversation
    let system_msg: Option<&str> = messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str());

    let conv_msgs: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": model,
        "messages": conv_msgs,
        "temperature": params.temperature,
        "top_p": params.top_p,
        "max_tokens": params.max_tokens,
    });
    if let Some(sys) = system_msg {
        body["system"] = json!(sys);
    }
    body
}

/// Text of the first choice of a chat-completions response.
pub fn parse_openai_response(parsed: &Value) -> Result<String> {
    parsed["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Generation("Response has no message content".into()))
}

/// Concatenated text blocks of a Messages API response.
pub fn parse_anthropic_response(parsed: &Value) -> Result<String> {
    if parsed["type"].as_str() == Some("error") {
        let msg = parsed["error"]["message"].as_str().unwrap_or("Unknown error");
        return Err(Error::Generation(msg.to_string()));
    }
    let blocks = parsed["content"]
        .as_array()
        .ok_or_else(|| Error::Generation("Response has no content blocks".into()))?;
    Ok(blocks
        .iter()
        .filter(|b| b["type"].as_str() == Some("text"))
        .filter_map(|b| b["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}
