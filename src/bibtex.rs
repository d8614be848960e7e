use std::fmt;

use crate::apis::Paper;

pub const DEFAULT_FALLBACK_YEAR: &str = "2024";

/// One `@article` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub key: String,
    pub entry_type: String,
    pub fields: Vec<(String, String)>,
}

impl BibEntry {
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entry_type: entry_type.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field; output order follows insertion order.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn from_paper(paper: &Paper, fallback_year: &str) -> Self {
        let authors = if paper.authors.is_empty() {
            "Unknown".to_string()
        } else {
            paper.authors.join(" and ")
        };
        Self::new(citation_key(paper, fallback_year), "article")
            .field("title", paper.title.as_str())
            .field("author", authors)
            .field("year", paper.year_label(fallback_year))
            .field("url", paper.url.as_str())
            .field("note", format!("Source: {}", paper.source))
    }
}

impl fmt::Display for BibEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}{{{}", self.entry_type, self.key)?;
        for (name, value) in &self.fields {
            write!(f, ",\n    {} = {{{}}}", name, value)?;
        }
        write!(f, "\n}}")
    }
}

/// Derive the citation key for `paper` as `{author}{year}{titleword}`.
///
/// Collisions are not resolved: two papers by the same first-author surname,
/// in the same year, whose titles start with the same word share a key.
pub fn citation_key(paper: &Paper, fallback_year: &str) -> String {
    let author = paper
        .authors
        .first()
        .and_then(|a| a.split_whitespace().last())
        .unwrap_or("unknown")
        .to_lowercase();
    let title_word = paper
        .title
        .split_whitespace()
        .next()
        .unwrap_or("paper")
        .to_lowercase();
    format!("{}{}{}", author, paper.year_label(fallback_year), title_word)
}

/// Serialize papers in order, one blank line between entries. Field values
/// are written as-is.
pub fn render_bibliography(papers: &[Paper], fallback_year: &str) -> String {
    papers
        .iter()
        .map(|p| BibEntry::from_paper(p, fallback_year).to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}
