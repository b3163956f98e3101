//! Downstream explanation: send extracted text to an LLM.
//!
//! The extraction pipeline never calls this; hosts that want an explanation
//! pass the extracted text here. Prompt wording lives in [`crate::prompts`].
//!
//! ## Retry Strategy
//!
//! Rate limits and 503s are transient. Each retry waits
//! `retry_backoff_ms * 2^(attempt - 1)`, so the defaults wait
//! 1 s → 2 s → 4 s before giving up.

use crate::config::ExplainConfig;
use crate::error::ScanError;
use crate::prompts::{medical_prompt, TRUNCATION_MARKER};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// A successful explanation.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub text: String,
    /// Calls made, including the successful one.
    pub attempts: u32,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Ask the configured model to explain `text` as a prescription or label.
pub async fn explain_text(text: &str, config: &ExplainConfig) -> Result<Explanation, ScanError> {
    if text.trim().is_empty() {
        return Err(ScanError::EmptyPrompt);
    }

    let prompt = truncate_prompt(medical_prompt(text), config.max_prompt_chars);
    let provider = resolve_provider(config)?;
    info!("Requesting explanation ({} chars)", prompt.chars().count());
    send_with_retry(&provider, &prompt, config).await
}

/// Cut `prompt` to `max_chars` characters plus the truncation marker.
pub fn truncate_prompt(prompt: String, max_chars: usize) -> String {
    match prompt.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            warn!("Prompt truncated due to length");
            let mut cut = prompt[..byte_idx].to_string();
            cut.push_str(TRUNCATION_MARKER);
            cut
        }
        None => prompt,
    }
}

/// One model reply, as far as the retry loop cares.
#[derive(Debug, Clone)]
struct ChatReply {
    content: String,
    prompt_tokens: usize,
    completion_tokens: usize,
}

async fn send_with_retry(
    provider: &Arc<dyn LLMProvider>,
    prompt: &str,
    config: &ExplainConfig,
) -> Result<Explanation, ScanError> {
    let messages = vec![ChatMessage::user(prompt)];
    let options = build_options(config);

    let (messages, options) = (&messages, &options);
    retry_chat(config, || async move {
        provider
            .chat(messages, Some(options))
            .await
            .map(|response| ChatReply {
                content: response.content,
                prompt_tokens: response.prompt_tokens,
                completion_tokens: response.completion_tokens,
            })
            .map_err(|e| e.to_string())
    })
    .await
}

/// Delay before retry number `attempt` (1-based): `base_ms * 2^(attempt - 1)`.
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Call `chat` until it yields non-empty content or the retries run out.
async fn retry_chat<F, Fut>(config: &ExplainConfig, mut chat: F) -> Result<Explanation, ScanError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ChatReply, String>>,
{
    let mut last_err = String::from("Unknown error");

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_delay_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Explanation: retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match chat().await {
            Ok(reply) if !reply.content.trim().is_empty() => {
                debug!(
                    "Explanation: {} input tokens, {} output tokens",
                    reply.prompt_tokens, reply.completion_tokens
                );
                return Ok(Explanation {
                    text: reply.content,
                    attempts: attempt + 1,
                    input_tokens: reply.prompt_tokens,
                    output_tokens: reply.completion_tokens,
                });
            }
            Ok(_) => {
                warn!("Explanation: attempt {} returned empty response", attempt + 1);
                last_err = "Empty response from model".to_string();
            }
            Err(e) => {
                warn!("Explanation: attempt {} failed: {}", attempt + 1, e);
                last_err = e;
            }
        }
    }

    Err(ScanError::LlmApiError {
        attempts: config.max_retries.saturating_add(1),
        message: last_err,
    })
}

fn build_options(config: &ExplainConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ScanError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ScanError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`, used as-is.
/// 2. `config.provider_name` with `config.model` (or the default model).
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 4. Gemini, when `GEMINI_API_KEY` is set.
/// 5. [`ProviderFactory::from_env`] auto-detection.
pub fn resolve_provider(config: &ExplainConfig) -> Result<Arc<dyn LLMProvider>, ScanError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            return create_provider("gemini", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ScanError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY or EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
