use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

mod apis;
mod bibtex;
mod config;
mod document;
mod search;
mod server;
mod theory;

use apis::Paper;
use config::Config;
use search::SearchReport;

/// Search arXiv / Semantic Scholar and generate bibliographies and theory documents
#[derive(Parser)]
#[command(name = "paper-theory", version, about, long_about = None)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search all paper sources and print or save the results
    Search {
        /// Search query
        query: String,
        /// Max results per source
        #[arg(long, default_value_t = 10)]
        max_results: u32,
        /// arXiv categories to search
        #[arg(long, num_args = 1.., default_values = config::DEFAULT_SEARCH_CATEGORIES)]
        arxiv_cats: Vec<String>,
        /// Output BibTeX file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        /// Skip the AI summary
        #[arg(long)]
        no_summary: bool,
    },
    /// Search theory papers and generate theoretical_analysis.tex
    Theory {
        /// Research problem description
        problem: String,
        /// Topic name for the default output directory
        #[arg(short, long, default_value = "default")]
        topic: String,
        /// Output directory (default: experiments/<topic>/theory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Max results per source
        #[arg(long, default_value_t = theory::DEFAULT_MAX_RESULTS)]
        max_results: u32,
        /// Only search papers, no theory generation
        #[arg(long)]
        search_only: bool,
        /// Author printed in the document
        #[arg(long)]
        author: Option<String>,
    },
    /// Run as an MCP server on stdio
    Serve,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn print_listing(papers: &[Paper]) {
    for (i, paper) in papers.iter().take(10).enumerate() {
        println!("{}. [{}] {}", i + 1, paper.source, paper.title);
        println!("   Authors: {}", paper.authors.join(", "));
        println!("   URL: {}", paper.url);
        println!();
    }
}

async fn run_search(
    config: &Config,
    query: &str,
    max_results: u32,
    arxiv_cats: &[String],
    output: Option<PathBuf>,
    json: bool,
    no_summary: bool,
) -> anyhow::Result<()> {
    let sources = config.build_sources(arxiv_cats)?;
    let papers = search::aggregate(&sources, query, max_results).await;

    let summary = if no_summary {
        String::new()
    } else {
        let ai = config.build_ai_summary()?;
        ai.analyze(&apis::ai_summary::research_prompt(query)).await.body
    };

    if json {
        let report = SearchReport::new(query, papers.clone(), summary);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Total papers found: {}\n", papers.len());
        print_listing(&papers);
        if !summary.is_empty() {
            println!("AI Summary:\n");
            println!("{}", summary);
        }
    }

    if let Some(path) = output {
        let bib = bibtex::render_bibliography(&papers, &config.fallback_year);
        std::fs::write(&path, bib)
            .with_context(|| format!("Failed to write BibTeX to {}", path.display()))?;
        tracing::info!("BibTeX saved to {}", path.display());
    }
    Ok(())
}

async fn run_theory(
    config: &Config,
    problem: &str,
    topic: &str,
    output: Option<PathBuf>,
    max_results: u32,
    search_only: bool,
) -> anyhow::Result<()> {
    let categories = config::default_categories(config::THEORY_CATEGORIES);
    let sources = config.build_sources(&categories)?;

    if search_only {
        let papers = search::aggregate(&sources, problem, max_results).await;
        for (i, p) in papers.iter().take(10).enumerate() {
            println!("{}. {}", i + 1, apis::truncate_chars(&p.title, 60));
        }
        return Ok(());
    }

    let output_dir = output.unwrap_or_else(|| theory::default_output_dir(topic));
    let ai = config.build_ai_summary()?;
    let req = theory::TheoryRequest {
        problem,
        max_results,
        output_dir: &output_dir,
        generated: chrono::Local::now().date_naive(),
        author: &config.author,
        fallback_year: &config.fallback_year,
    };
    let outcome = theory::generate(&sources, &ai, &req).await?;

    println!("LaTeX: {}", outcome.paths.document.display());
    println!("BibTeX: {}", outcome.paths.bibliography.display());
    println!(
        "To compile: cd {} && pdflatex {}",
        output_dir.display(),
        document::DOCUMENT_FILE
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::from_env();

    match cli.command {
        Command::Search {
            query,
            max_results,
            arxiv_cats,
            output,
            json,
            no_summary,
        } => {
            run_search(&config, &query, max_results, &arxiv_cats, output, json, no_summary).await
        }
        Command::Theory {
            problem,
            topic,
            output,
            max_results,
            search_only,
            author,
        } => {
            if let Some(author) = author {
                config.author = author;
            }
            run_theory(&config, &problem, &topic, output, max_results, search_only).await
        }
        Command::Serve => {
            tracing::info!("Starting paper-theory MCP server");
            let server = server::PaperTheoryServer::create(config)?;
            let service = server.serve(stdio()).await?;
            service.waiting().await?;
            Ok(())
        }
    }
}
