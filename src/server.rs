use std::path::PathBuf;
use std::sync::Arc;

use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*, tool,
    tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::apis::ai_summary::{self, AiSummaryClient};
use crate::config::{self, Config};
use crate::search::{self, SearchReport};
use crate::theory::{self, TheoryRequest};

// ── Parameter structs ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchPapersParams {
    #[schemars(description = "Search query string")]
    query: String,
    #[schemars(description = "Maximum results per source (default 10, max 100)")]
    max_results: Option<u32>,
    #[schemars(description = "arXiv categories to restrict to (default [\"stat.ML\", \"math.ST\", \"cs.LG\"])")]
    categories: Option<Vec<String>>,
    #[schemars(description = "Also request an AI literature summary (default true)")]
    include_summary: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GenerateTheoryParams {
    #[schemars(description = "Research problem description")]
    problem: String,
    #[schemars(description = "Topic name used for the default output directory")]
    topic: Option<String>,
    #[schemars(description = "Output directory (default experiments/<topic>/theory)")]
    output_dir: Option<String>,
    #[schemars(description = "Maximum papers per source (default 15, max 100)")]
    max_results: Option<u32>,
}

// ── Server ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PaperTheoryServer {
    tool_router: ToolRouter<Self>,
    config: Arc<Config>,
    ai: Arc<AiSummaryClient>,
}

#[tool_router]
impl PaperTheoryServer {
    pub fn create(config: Config) -> anyhow::Result<Self> {
        let ai = config.build_ai_summary()?;
        tracing::info!(
            "AI summary {}",
            if ai.is_configured() { "enabled" } else { "disabled" }
        );
        Ok(Self {
            tool_router: Self::tool_router(),
            config: Arc::new(config),
            ai: Arc::new(ai),
        })
    }

    #[tool(description = "List paper sources and whether their credentials are configured")]
    async fn list_sources(&self) -> Result<CallToolResult, McpError> {
        let statuses = self.config.source_status();
        let json = serde_json::to_string_pretty(&statuses)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Search arXiv and Semantic Scholar. Returns {query, timestamp, papers, aiSummary} as JSON, papers in source order.")]
    async fn search_papers(
        &self,
        Parameters(params): Parameters<SearchPapersParams>,
    ) -> Result<CallToolResult, McpError> {
        let max = params.max_results.unwrap_or(10).min(100);
        let categories = params
            .categories
            .unwrap_or_else(|| config::default_categories(config::DEFAULT_SEARCH_CATEGORIES));
        let sources = self
            .config
            .build_sources(&categories)
            .map_err(|e| McpError::internal_error(format!("{}", e), None))?;

        let papers = search::aggregate(&sources, &params.query, max).await;
        let summary = if params.include_summary.unwrap_or(true) {
            self.ai.analyze(&ai_summary::research_prompt(&params.query)).await.body
        } else {
            String::new()
        };

        let report = SearchReport::new(&params.query, papers, summary);
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| McpError::internal_error(format!("{}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Search theory papers, generate theoretical_analysis.tex and related_papers.bib, and return their paths")]
    async fn generate_theory(
        &self,
        Parameters(params): Parameters<GenerateTheoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let output_dir = match params.output_dir {
            Some(dir) => PathBuf::from(dir),
            None => theory::default_output_dir(params.topic.as_deref().unwrap_or("default")),
        };
        let sources = self
            .config
            .build_sources(&config::default_categories(config::THEORY_CATEGORIES))
            .map_err(|e| McpError::internal_error(format!("{}", e), None))?;

        let req = TheoryRequest {
            problem: &params.problem,
            max_results: params.max_results.unwrap_or(theory::DEFAULT_MAX_RESULTS).min(100),
            output_dir: &output_dir,
            generated: chrono::Local::now().date_naive(),
            author: &self.config.author,
            fallback_year: &self.config.fallback_year,
        };
        let outcome = theory::generate(&sources, &self.ai, &req)
            .await
            .map_err(|e| McpError::internal_error(format!("Output failed: {}", e), None))?;

        let summary = serde_json::json!({
            "document": outcome.paths.document,
            "bibliography": outcome.paths.bibliography,
            "papers": outcome.papers.len(),
            "usedPlaceholder": outcome.used_placeholder,
        });
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| McpError::internal_error(format!("{}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for PaperTheoryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Search arXiv and Semantic Scholar for papers, optionally summarized by an \
                 LLM aggregator, and render a BibTeX bibliography plus a LaTeX \
                 theoretical-analysis skeleton."
                    .into(),
            ),
        }
    }
}
