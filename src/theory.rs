use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::apis::ai_summary::{self, AiSummaryClient};
use crate::apis::{Paper, PaperSource};
use crate::document::{self, DocumentInput, OutputError, OutputPaths};
use crate::search;

pub const DEFAULT_MAX_RESULTS: u32 = 15;

pub fn default_output_dir(topic: &str) -> PathBuf {
    Path::new("experiments").join(topic).join("theory")
}

#[derive(Debug, Clone)]
pub struct TheoryRequest<'a> {
    pub problem: &'a str,
    pub max_results: u32,
    pub output_dir: &'a Path,
    pub generated: NaiveDate,
    pub author: &'a str,
    pub fallback_year: &'a str,
}

#[derive(Debug)]
pub struct TheoryOutcome {
    pub papers: Vec<Paper>,
    pub used_placeholder: bool,
    pub paths: OutputPaths,
}

/// Search for related papers, ask for an analysis of the problem, and
/// write the document and bibliography. Only output I/O can fail.
pub async fn generate(
    sources: &[Arc<dyn PaperSource>],
    ai: &AiSummaryClient,
    req: &TheoryRequest<'_>,
) -> Result<TheoryOutcome, OutputError> {
    tracing::info!("Searching for relevant theory papers...");
    let papers = search::aggregate(sources, req.problem, req.max_results).await;
    tracing::info!("Found {} papers", papers.len());

    tracing::info!("Generating theoretical analysis...");
    let analysis = ai.analyze(&ai_summary::theory_prompt(req.problem)).await;
    let used_placeholder = analysis.is_empty();
    if used_placeholder {
        tracing::warn!("Could not generate AI analysis, using template");
    }

    let input = DocumentInput {
        problem: req.problem,
        analysis: &analysis.body,
        papers: &papers,
        generated: req.generated,
        author: req.author,
    };
    let paths = document::write_outputs(req.output_dir, &input, req.fallback_year)?;
    tracing::info!("Theory document written to {}", paths.document.display());

    Ok(TheoryOutcome {
        papers,
        used_placeholder,
        paths,
    })
}
