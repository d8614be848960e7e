use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::apis::Paper;
use crate::bibtex;

pub const DOCUMENT_FILE: &str = "theoretical_analysis.tex";
pub const BIBLIOGRAPHY_FILE: &str = "related_papers.bib";

/// Papers listed in the Related Work section.
pub const RELATED_WORK_LIMIT: usize = 10;

const PREAMBLE: &str = r"\documentclass[11pt]{article}
\usepackage{amsmath,amssymb,amsthm}
\usepackage[margin=1in]{geometry}
\usepackage{hyperref}
\usepackage{tcolorbox}

\newtheorem{theorem}{Theorem}[section]
\newtheorem{proposition}[theorem]{Proposition}
\newtheorem{lemma}[theorem]{Lemma}
\newtheorem{definition}[theorem]{Definition}
\newtheorem{remark}[theorem]{Remark}
\newtheorem{assumption}{Assumption}
";

const RULE: &str = "% ============================================================================";

const FISHER_TEMPLATE: &str = r"\section{Fisher Information and CRLB}

\subsection{Fisher Information Matrix}

For a parametric model $p(X; \theta)$, the Fisher information is:
\begin{equation}
I(\theta) = \mathbb{E}\left[\nabla_\theta \log p(X; \theta) \nabla_\theta \log p(X; \theta)^\top\right]
\end{equation}

\subsection{Cram\'er-Rao Lower Bound}

For any unbiased estimator $\hat{\theta}$:
\begin{equation}
\mathrm{Var}(\hat{\theta}) \geq I(\theta)^{-1}
\end{equation}

\subsection{Practical Computation}

For the specific problem at hand, the Fisher information can be computed as:

\begin{tcolorbox}[colback=yellow!5!white,colframe=yellow!75!black,title=TODO: Problem-Specific Fisher]
Replace with actual Fisher information computation for your problem:
\begin{itemize}
    \item Model: $p(X; \theta) = ...$
    \item Score: $\nabla_\theta \log p = ...$
    \item Fisher: $I(\theta) = ...$
    \item CRLB: $\mathrm{Var}(\hat{\theta}) \geq ...$
\end{itemize}
\end{tcolorbox}
";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything the document depends on. The date is an input so repeated
/// renders of the same input are byte-identical.
#[derive(Debug, Clone)]
pub struct DocumentInput<'a> {
    pub problem: &'a str,
    pub analysis: &'a str,
    pub papers: &'a [Paper],
    pub generated: NaiveDate,
    pub author: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub document: PathBuf,
    pub bibliography: PathBuf,
}

/// Escape the characters that break the surrounding LaTeX when they appear
/// in titles or the problem statement.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '_' => out.push_str(r"\_"),
            '&' => out.push_str(r"\&"),
            _ => out.push(c),
        }
    }
    out
}

/// Section skeleton used when no analysis text is available.
pub fn placeholder_analysis() -> String {
    let mut s = String::new();
    s.push_str("\\section{Problem Formulation}\n\n% TODO: Fill in problem-specific formulation\n\n");
    s.push_str("\\section{Identifiability}\n\n% TODO: Establish identifiability conditions\n\n");
    s.push_str("\\section{Convergence Analysis}\n\n% TODO: Derive convergence rates\n\n");
    s.push_str(FISHER_TEMPLATE);
    s
}

fn related_work_items(papers: &[Paper]) -> String {
    let mut items = String::new();
    for p in papers.iter().take(RELATED_WORK_LIMIT) {
        let authors = if p.authors.is_empty() {
            "Unknown".to_string()
        } else {
            p.authors.iter().take(2).cloned().collect::<Vec<_>>().join(", ")
        };
        items.push_str(&format!(
            "    \\item \\textbf{{{}}} by {}. \\url{{{}}}\n",
            escape_latex(&p.title),
            escape_latex(&authors),
            p.url
        ));
    }
    items
}

/// Render the full document. An empty `analysis` is replaced by
/// [`placeholder_analysis`].
pub fn render_document(input: &DocumentInput<'_>) -> String {
    let problem = escape_latex(input.problem);
    let analysis = if input.analysis.trim().is_empty() {
        placeholder_analysis()
    } else {
        input.analysis.to_string()
    };

    let mut doc = format!(
        "{RULE}\n% Theoretical Analysis - Auto-generated\n% Generated: {}\n{RULE}\n\n",
        input.generated.format("%Y-%m-%d")
    );
    doc.push_str(PREAMBLE);
    doc.push_str(&format!(
        "\n\\title{{\\textbf{{Theoretical Analysis}}\\\\[0.5em]\n\\large {problem}}}\n"
    ));
    doc.push_str(&format!("\\author{{{}}}\n", escape_latex(input.author)));
    doc.push_str("\\date{\\today}\n\n\\begin{document}\n\\maketitle\n\n");
    doc.push_str("\\begin{abstract}\n");
    doc.push_str("This document presents a comprehensive theoretical analysis for the research problem:\n");
    doc.push_str(&format!("\\emph{{{problem}}}.\n"));
    doc.push_str(
        "We establish identifiability conditions, convergence rates, and information-theoretic lower bounds.\n",
    );
    doc.push_str("\\end{abstract}\n\n\\tableofcontents\n\\newpage\n\n");

    doc.push_str(&format!("{RULE}\n% AI-Generated Analysis\n{RULE}\n\n"));
    doc.push_str(&format!("{analysis}\n\n"));

    doc.push_str(&format!("{RULE}\n% Related Work\n{RULE}\n\n"));
    doc.push_str("\\section{Related Work}\n\n");
    doc.push_str("The following papers are relevant to this theoretical analysis:\n\n");
    doc.push_str("\\begin{enumerate}\n");
    doc.push_str(&related_work_items(input.papers));
    doc.push_str("\\end{enumerate}\n\n");
    doc.push_str("\\bibliographystyle{plain}\n\\bibliography{related_papers}\n\n\\end{document}\n");
    doc
}

fn write_file(path: PathBuf, contents: &str) -> Result<PathBuf, OutputError> {
    std::fs::write(&path, contents).map_err(|source| OutputError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::debug!("wrote {} bytes to {}", contents.len(), path.display());
    Ok(path)
}

/// Write the bibliography and then the document into `output_dir`, creating
/// it if needed. Existing files are overwritten.
pub fn write_outputs(
    output_dir: &Path,
    input: &DocumentInput<'_>,
    fallback_year: &str,
) -> Result<OutputPaths, OutputError> {
    std::fs::create_dir_all(output_dir).map_err(|source| OutputError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let bibliography = write_file(
        output_dir.join(BIBLIOGRAPHY_FILE),
        &bibtex::render_bibliography(input.papers, fallback_year),
    )?;
    let document = write_file(output_dir.join(DOCUMENT_FILE), &render_document(input))?;

    Ok(OutputPaths { document, bibliography })
}
