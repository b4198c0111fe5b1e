use async_trait::async_trait;

use crate::error::Result;

/// Text-in/text-out access to the language model.
///
/// `instruction` is the fixed role preamble of the calling stage; `prompt`
/// is the per-call user message. Implementations make exactly one request
/// per call.
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn complete(&self, instruction: &str, prompt: &str) -> Result<String>;
}

#[cfg(feature = "rig")]
pub use rig_backend::RigModelService;

#[cfg(feature = "rig")]
mod rig_backend {
    use std::time::Duration;

    use async_trait::async_trait;
    use rig::{client::CompletionClient, completion::Prompt, providers::openrouter};
    use tracing::debug;

    use super::ModelService;
    use crate::config::PipelineConfig;
    use crate::error::{FlowError, Result};

    /// [`ModelService`] backed by an OpenRouter model through `rig`.
    ///
    /// Each call builds an agent whose preamble is the stage instruction and
    /// prompts it once, bounded by the configured request timeout.
    pub struct RigModelService {
        client: openrouter::Client,
        model: String,
        request_timeout: Duration,
    }

    impl RigModelService {
        pub fn new(config: &PipelineConfig) -> Self {
            Self {
                client: openrouter::Client::new(&config.api_key),
                model: config.model.clone(),
                request_timeout: config.request_timeout,
            }
        }
    }

    #[async_trait]
    impl ModelService for RigModelService {
        async fn complete(&self, instruction: &str, prompt: &str) -> Result<String> {
            let agent = self.client.agent(&self.model).preamble(instruction).build();

            debug!(model = %self.model, prompt_len = prompt.len(), "Calling model");

            match tokio::time::timeout(self.request_timeout, agent.prompt(prompt)).await {
                Ok(Ok(reply)) => Ok(reply),
                Ok(Err(e)) => Err(FlowError::Model(e.to_string())),
                Err(_) => Err(FlowError::Timeout(self.request_timeout)),
            }
        }
    }
}
