use std::sync::Arc;
use std::time::Duration;

use crate::apis::{self, ai_summary, PaperSource, SourceError};
use crate::bibtex::DEFAULT_FALLBACK_YEAR;

/// arXiv categories searched by the `search` command when none are given.
pub const DEFAULT_SEARCH_CATEGORIES: &[&str] = &["stat.ML", "math.ST", "cs.LG"];

/// arXiv categories used when looking for theory papers.
pub const THEORY_CATEGORIES: &[&str] = &["math.ST", "stat.TH", "stat.ML", "math.OC", "cs.LG"];

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub semantic_scholar_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub model: String,
    pub enabled_source_names: Vec<String>,
    pub source_timeout: Duration,
    pub summary_timeout: Duration,
    pub fallback_year: String,
    pub author: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            semantic_scholar_api_key: None,
            openrouter_api_key: None,
            model: ai_summary::DEFAULT_MODEL.to_string(),
            enabled_source_names: Vec::new(),
            source_timeout: Duration::from_secs(30),
            summary_timeout: Duration::from_secs(60),
            fallback_year: DEFAULT_FALLBACK_YEAR.to_string(),
            author: "Research Assistant".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let secs = |name: &str, default: Duration| {
            get(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        let defaults = Self::default();

        Self {
            semantic_scholar_api_key: get("SEMANTIC_SCHOLAR_KEY")
                .or_else(|| get("SEMANTIC_SCHOLAR_API_KEY")),
            openrouter_api_key: get("OPENROUTER_API_KEY"),
            model: get("PAPER_THEORY_MODEL").unwrap_or(defaults.model),
            enabled_source_names: get("PAPER_THEORY_SOURCES")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            source_timeout: secs("PAPER_THEORY_SOURCE_TIMEOUT_SECS", defaults.source_timeout),
            summary_timeout: secs("PAPER_THEORY_SUMMARY_TIMEOUT_SECS", defaults.summary_timeout),
            fallback_year: get("PAPER_THEORY_FALLBACK_YEAR").unwrap_or(defaults.fallback_year),
            author: get("PAPER_THEORY_AUTHOR").unwrap_or(defaults.author),
        }
    }

    fn should_enable(&self, name: &str) -> bool {
        self.enabled_source_names.is_empty() || self.enabled_source_names.iter().any(|n| n == name)
    }

    /// Build the paper sources in priority order: arXiv, then Semantic
    /// Scholar.
    pub fn build_sources(&self, arxiv_categories: &[String]) -> Result<Vec<Arc<dyn PaperSource>>, SourceError> {
        let mut sources: Vec<Arc<dyn PaperSource>> = Vec::new();
        if self.should_enable("arxiv") {
            sources.push(Arc::new(apis::arxiv::ArxivClient::new(
                arxiv_categories.to_vec(),
                self.source_timeout,
            )?));
        }
        if self.should_enable("semantic_scholar") {
            sources.push(Arc::new(apis::semantic_scholar::SemanticScholarClient::new(
                self.semantic_scholar_api_key.clone(),
                self.source_timeout,
            )?));
        }
        Ok(sources)
    }

    pub fn build_ai_summary(&self) -> Result<ai_summary::AiSummaryClient, SourceError> {
        ai_summary::AiSummaryClient::new(
            self.openrouter_api_key.clone(),
            self.model.clone(),
            self.summary_timeout,
        )
    }

    /// Return a list of source status descriptions.
    pub fn source_status(&self) -> Vec<SourceStatus> {
        let mut statuses = vec![
            SourceStatus {
                name: "arxiv".into(),
                enabled: true,
                note: "No API key required".into(),
            },
            SourceStatus {
                name: "semantic_scholar".into(),
                enabled: true,
                note: if self.semantic_scholar_api_key.is_some() {
                    "API key set".into()
                } else {
                    "No API key (rate limited)".into()
                },
            },
        ];
        for s in &mut statuses {
            if !self.should_enable(&s.name) {
                s.enabled = false;
                s.note = "Disabled by PAPER_THEORY_SOURCES filter".into();
            }
        }
        statuses.push(SourceStatus {
            name: "ai_summary".into(),
            enabled: self.openrouter_api_key.is_some(),
            note: if self.openrouter_api_key.is_some() {
                format!("Using {}", self.model)
            } else {
                "Disabled: OPENROUTER_API_KEY not set".into()
            },
        });
        statuses
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub enabled: bool,
    pub note: String,
}

pub fn default_categories(categories: &[&str]) -> Vec<String> {
    categories.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::SourceKind;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert_eq!(c.source_timeout, Duration::from_secs(30));
        assert_eq!(c.summary_timeout, Duration::from_secs(60));
        assert_eq!(c.fallback_year, "2024");
        assert_eq!(c.model, "perplexity/sonar-pro");
        assert!(c.openrouter_api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let c = config(&[
            ("SEMANTIC_SCHOLAR_API_KEY", "s2"),
            ("OPENROUTER_API_KEY", "or"),
            ("PAPER_THEORY_SOURCE_TIMEOUT_SECS", "5"),
            ("PAPER_THEORY_SUMMARY_TIMEOUT_SECS", "not-a-number"),
            ("PAPER_THEORY_FALLBACK_YEAR", "2030"),
        ]);
        assert_eq!(c.semantic_scholar_api_key.as_deref(), Some("s2"));
        assert_eq!(c.openrouter_api_key.as_deref(), Some("or"));
        assert_eq!(c.source_timeout, Duration::from_secs(5));
        assert_eq!(c.summary_timeout, Duration::from_secs(60));
        assert_eq!(c.fallback_year, "2030");
    }

    #[test]
    fn test_blank_key_is_unset() {
        let c = config(&[("OPENROUTER_API_KEY", "   ")]);
        assert!(c.openrouter_api_key.is_none());
    }

    #[test]
    fn test_build_sources_priority_order() {
        let sources = config(&[]).build_sources(&default_categories(DEFAULT_SEARCH_CATEGORIES)).unwrap();
        let kinds: Vec<SourceKind> = sources.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![SourceKind::Arxiv, SourceKind::SemanticScholar]);
    }

    #[test]
    fn test_source_filter() {
        let c = config(&[("PAPER_THEORY_SOURCES", "Semantic_Scholar")]);
        let sources = c.build_sources(&[]).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "semantic_scholar");

        let status = c.source_status();
        assert!(!status.iter().find(|s| s.name == "arxiv").unwrap().enabled);
        assert!(!status.iter().find(|s| s.name == "ai_summary").unwrap().enabled);
    }
}
