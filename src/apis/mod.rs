pub mod ai_summary;
pub mod arxiv;
pub mod semantic_scholar;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_AUTHORS: usize = 3;
pub const MAX_ABSTRACT_CHARS: usize = 500;
pub const MAX_CATEGORIES: usize = 3;

/// Title used when an upstream record carries none.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

pub(crate) const USER_AGENT: &str = concat!("paper-theory/", env!("CARGO_PKG_VERSION"));

/// Which adapter produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "arXiv")]
    Arxiv,
    SemanticScholar,
    #[serde(rename = "AISummary")]
    AiSummary,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Arxiv => "arXiv",
            SourceKind::SemanticScholar => "SemanticScholar",
            SourceKind::AiSummary => "AISummary",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical paper record shared by every source.
///
/// Built only through [`Paper::new`] and the `with_*` setters, which apply
/// the display limits (3 authors, 3 categories, 500 abstract chars).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub year: Option<u32>,
    pub date: Option<String>,
    pub url: String,
    pub pdf_url: String,
    pub categories: Vec<String>,
    pub arxiv_id: Option<String>,
    pub citation_count: Option<u32>,
    pub source: SourceKind,
}

impl Paper {
    pub fn new(source: SourceKind, title: &str) -> Self {
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        Self {
            title: if title.is_empty() { UNKNOWN_TITLE.to_string() } else { title },
            authors: Vec::new(),
            abstract_text: String::new(),
            year: None,
            date: None,
            url: String::new(),
            pdf_url: String::new(),
            categories: Vec::new(),
            arxiv_id: None,
            citation_count: None,
            source,
        }
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors
            .into_iter()
            .map(Into::<String>::into)
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .take(MAX_AUTHORS)
            .collect();
        self
    }

    pub fn with_abstract(mut self, text: &str) -> Self {
        self.abstract_text = truncate_chars(text.trim(), MAX_ABSTRACT_CHARS);
        self
    }

    pub fn with_year(mut self, year: Option<u32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_date(mut self, date: &str) -> Self {
        let date = truncate_chars(date.trim(), 10);
        self.date = if date.is_empty() { None } else { Some(date) };
        self
    }

    pub fn with_links(mut self, url: impl Into<String>, pdf_url: impl Into<String>) -> Self {
        self.url = url.into();
        self.pdf_url = pdf_url.into();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories
            .into_iter()
            .map(Into::<String>::into)
            .filter(|c| !c.is_empty())
            .take(MAX_CATEGORIES)
            .collect();
        self
    }

    pub fn with_arxiv_id(mut self, id: impl Into<String>) -> Self {
        self.arxiv_id = Some(id.into());
        self
    }

    pub fn with_citation_count(mut self, count: Option<u32>) -> Self {
        self.citation_count = count;
        self
    }

    /// Year as printed in citation keys and bibliography entries: the
    /// explicit year, else the first four characters of `date`, else
    /// `fallback`.
    pub fn year_label(&self, fallback: &str) -> String {
        if let Some(year) = self.year {
            return year.to_string();
        }
        match self.date.as_deref() {
            Some(date) if !date.is_empty() => truncate_chars(date, 4),
            _ => fallback.to_string(),
        }
    }
}

/// Free-text analysis returned by the AI summary source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub body: String,
    pub source: SourceKind,
    pub model: String,
}

impl AnalysisResult {
    pub fn empty(model: &str) -> Self {
        Self {
            body: String::new(),
            source: SourceKind::AiSummary,
            model: model.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Missing API key: {0}")]
    MissingKey(String),
}

#[async_trait]
pub trait PaperSource: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> SourceKind;
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Paper>, SourceError>;
}

/// Hard cut at `max` characters, never inside a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_title_uses_placeholder() {
        let p = Paper::new(SourceKind::SemanticScholar, "  \n ");
        assert_eq!(p.title, UNKNOWN_TITLE);
    }

    #[test]
    fn test_limits_applied() {
        let long = "é".repeat(800);
        let p = Paper::new(SourceKind::Arxiv, "Title")
            .with_authors(["A One", "B Two", "C Three", "D Four"])
            .with_categories(["math.ST", "stat.ML", "cs.LG", "math.OC"])
            .with_abstract(&long);
        assert_eq!(p.authors, vec!["A One", "B Two", "C Three"]);
        assert_eq!(p.categories.len(), 3);
        assert_eq!(p.abstract_text.chars().count(), MAX_ABSTRACT_CHARS);
    }

    #[test]
    fn test_blank_authors_do_not_take_slots() {
        let p = Paper::new(SourceKind::Arxiv, "Title").with_authors(["", "A", "  ", "B", "C", "D"]);
        assert_eq!(p.authors, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_title_newlines_collapsed() {
        let p = Paper::new(SourceKind::Arxiv, "Sparse\n  Regression\nin High Dimensions");
        assert_eq!(p.title, "Sparse Regression in High Dimensions");
    }

    #[test]
    fn test_year_label_fallbacks() {
        let base = Paper::new(SourceKind::Arxiv, "T");
        assert_eq!(base.clone().with_year(Some(2021)).year_label("2024"), "2021");
        assert_eq!(base.clone().with_date("2019-03-04T00:00:00Z").year_label("2024"), "2019");
        assert_eq!(base.year_label("2024"), "2024");
    }

    #[test]
    fn test_source_kind_serializes_as_tag() {
        let json = serde_json::to_string(&SourceKind::Arxiv).unwrap();
        assert_eq!(json, "\"arXiv\"");
        let json = serde_json::to_string(&SourceKind::AiSummary).unwrap();
        assert_eq!(json, "\"AISummary\"");
    }
}
