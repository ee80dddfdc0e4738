//! Model interaction: stream a completion for one page prompt.
//!
//! The orchestrator talks to the model only through [`CompletionStreamer`],
//! an injected value rather than a process-wide client. Production runs use
//! [`LlmStreamer`] over an `edgequake_llm` provider; tests substitute a
//! streamer that replays scripted fragments.
//!
//! No retries happen here. A failed stream surfaces as a
//! [`CompletionError`] and aborts the run.

use crate::config::{RunConfig, DEFAULT_MODEL, DEFAULT_PROVIDER};
use crate::error::{CompletionError, PageByPageError};
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A lazy, finite, single-use sequence of response fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

/// Produces a streamed completion for a prompt.
///
/// Implementations must yield fragments in order; concatenating every
/// fragment gives the full response.
pub trait CompletionStreamer: Send + Sync {
    fn stream(&self, prompt: &str) -> FragmentStream;
}

/// [`CompletionStreamer`] over an `edgequake_llm` provider.
///
/// The request is only sent when the returned stream is first polled.
#[derive(Clone)]
pub struct LlmStreamer {
    provider: Arc<dyn LLMProvider>,
}

impl LlmStreamer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Build a streamer from the provider settings in `config`.
    pub fn from_config(config: &RunConfig) -> Result<Self, PageByPageError> {
        resolve_provider(config).map(Self::new)
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }
}

impl CompletionStreamer for LlmStreamer {
    fn stream(&self, prompt: &str) -> FragmentStream {
        let provider = Arc::clone(&self.provider);
        let prompt = prompt.to_owned();

        let fragments = stream::once(async move {
            debug!("Sending {} byte prompt to {}", prompt.len(), provider.name());
            provider
                .stream(&prompt)
                .await
                .map(|s| s.map_err(|e| CompletionError::new(e.to_string())))
                .map_err(|e| CompletionError::new(e.to_string()))
        })
        .try_flatten();

        Box::pin(fragments)
    }
}

/// Drain `fragments`, forwarding each to `observe` before appending it to
/// the accumulated response.
///
/// Returns the full response and the number of fragments received.
pub async fn accumulate<F>(
    mut fragments: FragmentStream,
    mut observe: F,
) -> Result<(String, usize), CompletionError>
where
    F: FnMut(&str),
{
    let mut response = String::new();
    let mut count = 0;

    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        observe(&fragment);
        response.push_str(&fragment);
        count += 1;
    }

    Ok((response, count))
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`, or
///    [`DEFAULT_MODEL`].
/// 3. **Environment pair** `PAGEBYPAGE_PROVIDER` + `PAGEBYPAGE_MODEL`, when
///    both are set and non-empty.
/// 4. **Local default**: [`DEFAULT_PROVIDER`] with [`DEFAULT_MODEL`].
pub fn resolve_provider(config: &RunConfig) -> Result<Arc<dyn LLMProvider>, PageByPageError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("PAGEBYPAGE_PROVIDER"),
        std::env::var("PAGEBYPAGE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    create_provider(DEFAULT_PROVIDER, model)
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, PageByPageError> {
    info!("Using provider {} with model {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PageByPageError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
