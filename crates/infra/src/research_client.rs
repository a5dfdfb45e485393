use std::time::Duration;

use deepguard_domain::ports::BoxFuture;
use deepguard_domain::ports::research::{
    ResearchCompletion, ResearchError, ResearchPrompt, ThreatResearch,
};
use serde::Deserialize;
use serde_json::json;

use crate::config::AppConfig;

/// Client for an OpenAI-compatible `chat/completions` endpoint with web
/// search (Perplexity by default).
#[derive(Clone)]
pub struct ChatCompletionsResearchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsResearchClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// `Ok(None)` when no API key is configured.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, reqwest::Error> {
        if !config.research_enabled() {
            return Ok(None);
        }
        Self::new(
            config.research_base_url.clone(),
            config.research_api_key.trim(),
            config.research_model.clone(),
            config.research_timeout(),
        )
        .map(Some)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ThreatResearch for ChatCompletionsResearchClient {
    fn complete(
        &self,
        prompt: &ResearchPrompt,
    ) -> BoxFuture<'_, Result<ResearchCompletion, ResearchError>> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
        });
        Box::pin(async move {
            let url = endpoint_url(&self.base_url, "chat/completions");
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .header("accept", "application/json")
                .json(&payload)
                .send()
                .await
                .map_err(|err| {
                    if err.is_timeout() {
                        ResearchError::Timeout
                    } else {
                        ResearchError::Transport(err.to_string())
                    }
                })?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ResearchError::Upstream {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response
                .json::<CompletionBody>()
                .await
                .map_err(|err| ResearchError::InvalidResponse(err.to_string()))?;
            let content = body
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| ResearchError::InvalidResponse("no completion choices".into()))?;

            Ok(ResearchCompletion {
                content,
                model: body.model.unwrap_or_else(|| self.model.clone()),
            })
        })
    }
}

fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
