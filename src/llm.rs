use anyhow::{anyhow, bail, Context, Result};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use std::env;
use tracing::{debug, info};

use crate::environment::get_env_var_or;
use crate::TARGET_LLM_REQUEST;

const DEFAULT_OLLAMA_HOST: &str = "http://localhost";
const DEFAULT_OLLAMA_PORT: u16 = 11434;

#[derive(Clone, Debug)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

/// One prompt addressed to one model.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub temperature: f32,
}

/// Anything that can answer a classification prompt with raw text.
///
/// Errors are transient from the caller's point of view: the classifier retries
/// or degrades to a fallback, it never surfaces them to its own callers.
#[async_trait]
pub trait ClassificationBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String>;
}

impl LLMClient {
    pub fn ollama(host: &str, port: u16) -> Self {
        info!(target: TARGET_LLM_REQUEST, "Connecting to Ollama at {}:{}", host, port);
        LLMClient::Ollama(Ollama::new(host.to_string(), port))
    }

    pub fn openai(api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("OpenAI API key is empty");
        }
        let config = OpenAIConfig::new().with_api_key(api_key);
        Ok(LLMClient::OpenAI(OpenAIClient::with_config(config)))
    }

    /// Builds a client from `LLM_TYPE` (`ollama` or `openai`), `OLLAMA_HOST`,
    /// `OLLAMA_PORT` and `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        match env::var("LLM_TYPE")
            .unwrap_or_else(|_| "ollama".to_string())
            .to_lowercase()
            .as_str()
        {
            "openai" => {
                let api_key = env::var("OPENAI_API_KEY")
                    .context("OPENAI_API_KEY environment variable must be set when LLM_TYPE=openai")?;
                Self::openai(&api_key)
            }
            "ollama" => {
                let host =
                    env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
                let port = get_env_var_or("OLLAMA_PORT", DEFAULT_OLLAMA_PORT);
                Ok(Self::ollama(&host, port))
            }
            other => Err(anyhow!("Unsupported LLM_TYPE '{}'", other)),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            LLMClient::Ollama(_) => "Ollama",
            LLMClient::OpenAI(_) => "OpenAI API",
        }
    }
}

#[async_trait]
impl ClassificationBackend for LLMClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        generate_llm_response(self, request).await
    }
}

/// Sends a single prompt and returns the raw response text.
///
/// No retries and no timeout here: both are owned by the caller, which knows
/// whether it is serving a live classification or a benchmark sample.
pub async fn generate_llm_response(
    client: &LLMClient,
    request: CompletionRequest<'_>,
) -> Result<String> {
    debug!(target: TARGET_LLM_REQUEST, "[{}] Sending LLM request: {}", request.model, request.prompt);

    let response_text = match client {
        LLMClient::Ollama(ollama) => {
            let mut generation =
                GenerationRequest::new(request.model.to_string(), request.prompt.to_string());
            generation.options =
                Some(GenerationOptions::default().temperature(request.temperature));
            ollama
                .generate(generation)
                .await
                .map_err(|e| anyhow!("Ollama error: {}", e))?
                .response
        }
        LLMClient::OpenAI(openai) => {
            let message = ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt)
                .build()?;
            let messages: Vec<ChatCompletionRequestMessage> = vec![message.into()];
            let chat_request = CreateChatCompletionRequestArgs::default()
                .model(request.model)
                .temperature(request.temperature)
                .messages(messages)
                .build()?;
            let response = openai
                .chat()
                .create(chat_request)
                .await
                .map_err(|e| anyhow!("OpenAI error: {}", e))?;
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default()
        }
    };

    if response_text.trim().is_empty() {
        bail!("empty response from model {}", request.model);
    }

    debug!(target: TARGET_LLM_REQUEST, "[{}] LLM response received: {}", request.model, response_text);
    Ok(response_text)
}
