use std::time::Duration;

use super::{AnalysisResult, SourceError, SourceKind, USER_AGENT};
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://openrouter.ai/api/v1";

pub const DEFAULT_MODEL: &str = "perplexity/sonar-pro";

/// Prompt asking for a literature overview of `query`.
pub fn research_prompt(query: &str) -> String {
    format!(
        "Search for recent academic papers and research on: {query}

Focus on:
1. Key papers from the last 3 years
2. Seminal/foundational papers in this area
3. Authors and research groups working on this topic
4. Main theoretical results and methods

Provide specific paper titles, authors, and years when possible."
    )
}

/// Prompt asking for a structured theoretical analysis of `problem`.
pub fn theory_prompt(problem: &str) -> String {
    format!(
        r"You are a theoretical machine learning researcher. Analyze the following research problem and provide a comprehensive theoretical framework.

Research Problem: {problem}

Provide analysis in the following structure:

1. **Problem Formulation**
   - Mathematical model
   - Key assumptions (A1, A2, A3...)
   - Loss function definition

2. **Identifiability Analysis**
   - Under what conditions is the solution unique?
   - What are the symmetries/degeneracies?
   - Coercivity conditions

3. **Convergence Analysis**
   - Consistency: Does estimator converge to truth?
   - Rate: How fast? (parametric n^{{-1/2}} or nonparametric n^{{-s/(2s+d)}})
   - Dependencies: On dimension d, smoothness s, sample size n

4. **Lower Bounds**
   - Information-theoretic limits (Fano, Le Cam)
   - Fisher information / CRLB
   - Minimax optimality

5. **Key References**
   - Foundational papers
   - Recent advances
   - Related problems

Be precise with mathematical notation. Use LaTeX formatting."
    )
}

/// LLM-backed aggregator reached through an OpenAI-compatible chat endpoint.
pub struct AiSummaryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl AiSummaryClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .build()?,
            base_url: BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send `prompt` and return the raw reply text.
    pub async fn try_analyze(&self, prompt: &str) -> Result<AnalysisResult, SourceError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::MissingKey("OPENROUTER_API_KEY not set".into()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SourceError::Api(format!(
                "chat completion returned {}: {}",
                status,
                super::truncate_chars(&text, 240)
            )));
        }
        let body: ChatResponse = resp.json().await?;
        let content = body
            .choices
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        Ok(AnalysisResult {
            body: content,
            source: SourceKind::AiSummary,
            model: self.model.clone(),
        })
    }

    /// Like [`try_analyze`](Self::try_analyze), but any failure is logged and
    /// turned into an empty result. Without a key no request is made.
    pub async fn analyze(&self, prompt: &str) -> AnalysisResult {
        if !self.is_configured() {
            tracing::warn!("OPENROUTER_API_KEY not set, skipping AI summary");
            return AnalysisResult::empty(&self.model);
        }
        match self.try_analyze(prompt).await {
            Ok(result) => {
                tracing::info!("AI summary received ({} chars)", result.body.chars().count());
                result
            }
            Err(e) => {
                tracing::warn!("AI summary failed: {}", e);
                AnalysisResult::empty(&self.model)
            }
        }
    }
}
