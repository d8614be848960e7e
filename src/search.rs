use std::sync::Arc;

use chrono::{DateTime, Local};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::apis::{Paper, PaperSource};

/// Query every source and concatenate their results.
///
/// Sources run concurrently, but the output follows the order of `sources`
/// and each source's own order. Nothing is deduplicated or capped here. A
/// failing source is logged and contributes no papers.
pub async fn aggregate(
    sources: &[Arc<dyn PaperSource>],
    query: &str,
    per_source_limit: u32,
) -> Vec<Paper> {
    let searches = sources.iter().map(|source| async move {
        tracing::info!("Searching {}...", source.kind());
        (source, source.search(query, per_source_limit).await)
    });

    let mut all_results = Vec::new();
    for (source, outcome) in join_all(searches).await {
        match outcome {
            Ok(papers) => {
                tracing::info!("{}: found {} papers", source.kind(), papers.len());
                all_results.extend(papers);
            }
            Err(e) => tracing::warn!("{} search error: {}", source.kind(), e),
        }
    }
    all_results
}

/// Machine-readable result of one search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport {
    pub query: String,
    pub timestamp: DateTime<Local>,
    pub papers: Vec<Paper>,
    pub ai_summary: String,
}

impl SearchReport {
    pub fn new(query: &str, papers: Vec<Paper>, ai_summary: String) -> Self {
        Self {
            query: query.to_string(),
            timestamp: Local::now(),
            papers,
            ai_summary,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::apis::{SourceError, SourceKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// In-memory source returning canned titles, optionally after a delay.
    pub(crate) struct FakeSource {
        pub kind: SourceKind,
        pub titles: Vec<&'static str>,
        pub delay: Duration,
        pub fail: bool,
        pub calls: AtomicU32,
    }

    impl FakeSource {
        pub(crate) fn new(kind: SourceKind, titles: Vec<&'static str>) -> Self {
            Self { kind, titles, delay: Duration::ZERO, fail: false, calls: AtomicU32::new(0) }
        }

        pub(crate) fn failing(kind: SourceKind) -> Self {
            Self { fail: true, ..Self::new(kind, vec![]) }
        }
    }

    #[async_trait]
    impl PaperSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn search(&self, _query: &str, max_results: u32) -> Result<Vec<Paper>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(SourceError::Parse("unexpected response shape".into()));
            }
            Ok(self
                .titles
                .iter()
                .take(max_results as usize)
                .map(|t| Paper::new(self.kind, t).with_authors(["Ann Author"]))
                .collect())
        }
    }

    fn titles(papers: &[Paper]) -> Vec<&str> {
        papers.iter().map(|p| p.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_aggregate_preserves_source_order() {
        let mut slow = FakeSource::new(SourceKind::Arxiv, vec!["a1", "a2"]);
        slow.delay = Duration::from_millis(50);
        let fast = FakeSource::new(SourceKind::SemanticScholar, vec!["s1"]);
        let sources: Vec<Arc<dyn PaperSource>> = vec![Arc::new(slow), Arc::new(fast)];

        let papers = aggregate(&sources, "q", 10).await;
        assert_eq!(titles(&papers), vec!["a1", "a2", "s1"]);
    }

    #[tokio::test]
    async fn test_aggregate_equals_concatenation() {
        let a: Arc<dyn PaperSource> = Arc::new(FakeSource::new(SourceKind::Arxiv, vec!["x", "y", "z"]));
        let b: Arc<dyn PaperSource> = Arc::new(FakeSource::new(SourceKind::SemanticScholar, vec!["x", "w"]));

        let mut expected = a.search("q", 2).await.unwrap();
        expected.extend(b.search("q", 2).await.unwrap());

        let papers = aggregate(&[a, b], "q", 2).await;
        assert_eq!(papers, expected);
        // same title from two sources stays twice
        assert_eq!(titles(&papers), vec!["x", "y", "x", "w"]);
    }

    #[tokio::test]
    async fn test_failing_source_is_skipped() {
        let failing = Arc::new(FakeSource::failing(SourceKind::Arxiv));
        let ok = Arc::new(FakeSource::new(SourceKind::SemanticScholar, vec!["s1"]));
        let sources: Vec<Arc<dyn PaperSource>> = vec![failing.clone(), ok.clone()];

        let papers = aggregate(&sources, "q", 5).await;
        assert_eq!(titles(&papers), vec!["s1"]);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_sources_no_papers() {
        assert!(aggregate(&[], "q", 5).await.is_empty());
    }

    #[test]
    fn test_report_json_shape() {
        let report = SearchReport::new(
            "sparse regression",
            vec![Paper::new(SourceKind::Arxiv, "T")],
            String::new(),
        );
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["query"], "sparse regression");
        assert_eq!(v["aiSummary"], "");
        assert_eq!(v["papers"][0]["source"], "arXiv");
        assert!(v["papers"][0].get("pdfUrl").is_some());
        assert!(v["timestamp"].as_str().unwrap().contains('T'));
    }
}
