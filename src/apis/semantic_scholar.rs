use std::time::Duration;

use super::{Paper, PaperSource, SourceError, SourceKind, USER_AGENT};
use async_trait::async_trait;
use serde::Deserialize;

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

const FIELDS: &str = "title,authors,abstract,year,citationCount,url,openAccessPdf";

pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .build()?,
            base_url: BASE_URL.to_string(),
            api_key,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }
}

#[derive(Deserialize)]
struct S2SearchResponse {
    data: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    title: Option<String>,
    authors: Option<Vec<S2Author>>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<u32>,
    citation_count: Option<u32>,
    url: Option<String>,
    open_access_pdf: Option<S2Pdf>,
}

#[derive(Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Deserialize)]
struct S2Pdf {
    url: Option<String>,
}

fn s2_to_paper(p: S2Paper) -> Paper {
    let authors = p
        .authors
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| a.name);
    Paper::new(SourceKind::SemanticScholar, p.title.as_deref().unwrap_or(""))
        .with_authors(authors)
        .with_abstract(p.abstract_text.as_deref().unwrap_or(""))
        .with_year(p.year)
        .with_links(
            p.url.unwrap_or_default(),
            p.open_access_pdf.and_then(|pdf| pdf.url).unwrap_or_default(),
        )
        .with_citation_count(p.citation_count)
}

/// Records that do not match the expected shape are skipped one by one.
fn parse_search_response(text: &str) -> Result<Vec<Paper>, SourceError> {
    let body: S2SearchResponse = serde_json::from_str(text)
        .map_err(|e| SourceError::Parse(format!("Semantic Scholar response: {}", e)))?;
    let papers = body
        .data
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| match serde_json::from_value::<S2Paper>(v) {
            Ok(p) => Some(s2_to_paper(p)),
            Err(e) => {
                tracing::warn!("Skipping Semantic Scholar record {}: {}", i, e);
                None
            }
        })
        .collect();
    Ok(papers)
}

#[async_trait]
impl PaperSource for SemanticScholarClient {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::SemanticScholar
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Paper>, SourceError> {
        let url = format!("{}/paper/search", self.base_url);
        let limit = max_results.min(100).to_string();
        let resp = self
            .add_auth(self.client.get(&url).query(&[
                ("query", query),
                ("limit", limit.as_str()),
                ("fields", FIELDS),
            ]))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Api(format!(
                "Semantic Scholar returned {}",
                resp.status()
            )));
        }
        let text = resp.text().await?;
        parse_search_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const SAMPLE_RESPONSE: &str = r#"{
      "total": 2,
      "data": [
        {
          "paperId": "abc",
          "title": "Regularization Paths for Generalized Linear Models",
          "authors": [
            {"authorId": "1", "name": "Jerome Friedman"},
            {"authorId": "2", "name": "Trevor Hastie"},
            {"authorId": "3", "name": "Rob Tibshirani"},
            {"authorId": "4", "name": "Someone Else"}
          ],
          "abstract": null,
          "year": 2010,
          "citationCount": 15000,
          "url": "https://www.semanticscholar.org/paper/abc",
          "openAccessPdf": {"url": "https://example.org/glmnet.pdf"}
        },
        {
          "paperId": "def",
          "title": null,
          "authors": [],
          "year": null,
          "openAccessPdf": null
        }
      ]
    }"#;

    fn client(server: &mockito::Server, key: Option<&str>) -> SemanticScholarClient {
        SemanticScholarClient::new(key.map(String::from), Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_search_maps_records() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "sparse regression".into()),
                Matcher::UrlEncoded("limit".into(), "10".into()),
                Matcher::UrlEncoded("fields".into(), FIELDS.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SAMPLE_RESPONSE)
            .create_async()
            .await;

        let papers = client(&server, None).search("sparse regression", 10).await.unwrap();
        mock.assert_async().await;

        assert_eq!(papers.len(), 2);
        let p = &papers[0];
        assert_eq!(p.authors, vec!["Jerome Friedman", "Trevor Hastie", "Rob Tibshirani"]);
        assert_eq!(p.abstract_text, "");
        assert_eq!(p.year, Some(2010));
        assert_eq!(p.citation_count, Some(15000));
        assert_eq!(p.pdf_url, "https://example.org/glmnet.pdf");
        assert_eq!(p.source, SourceKind::SemanticScholar);

        let q = &papers[1];
        assert_eq!(q.title, crate::apis::UNKNOWN_TITLE);
        assert!(q.url.is_empty());
        assert!(q.pdf_url.is_empty());
    }

    #[tokio::test]
    async fn test_bad_record_skipped_good_record_kept() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"data": [
                    {"title": "Good paper", "authors": [{"name": "Ann Lee"}], "year": 2020},
                    {"title": "Bad", "year": "2021"}
                ]}"#,
            )
            .create_async()
            .await;

        let papers = client(&server, None).search("q", 10).await.unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Good paper");
        assert_eq!(papers[0].year, Some(2020));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = client(&server, None).search("q", 10).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_null_author_names_do_not_take_slots() {
        let papers = parse_search_response(
            r#"{"data": [{"title": "T", "authors": [
                {"name": null}, {"name": "A One"}, {"name": ""}, {"name": "B Two"},
                {"name": "C Three"}, {"name": "D Four"}
            ]}]}"#,
        )
        .unwrap();
        assert_eq!(papers[0].authors, vec!["A One", "B Two", "C Three"]);
    }

    #[tokio::test]
    async fn test_api_key_header_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_body(r#"{"total": 0, "data": []}"#)
            .create_async()
            .await;

        let papers = client(&server, Some("secret")).search("q", 3).await.unwrap();
        mock.assert_async().await;
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"message": "Too Many Requests"}"#)
            .create_async()
            .await;

        let err = client(&server, None).search("q", 3).await.unwrap_err();
        assert!(matches!(err, SourceError::Api(_)));
    }
}
