use std::time::Duration;

use super::{Paper, PaperSource, SourceError, SourceKind, USER_AGENT};
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const BASE_URL: &str = "https://export.arxiv.org/api/query";
const ABS_URL: &str = "https://arxiv.org/abs";
const PDF_URL: &str = "https://arxiv.org/pdf";

pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    categories: Vec<String>,
}

impl ArxivClient {
    pub fn new(categories: Vec<String>, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .build()?,
            base_url: BASE_URL.to_string(),
            categories,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Arxiv
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Paper>, SourceError> {
        let search_query = build_search_query(query, &self.categories);
        let max = max_results.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Api(format!("arXiv returned {}", resp.status())));
        }
        parse_atom_feed(&resp.text().await?)
    }
}

/// `all:{term}`, optionally restricted with `AND (cat:a OR cat:b ...)`.
pub fn build_search_query(term: &str, categories: &[String]) -> String {
    let mut q = format!("all:{}", term);
    if !categories.is_empty() {
        let cats: Vec<String> = categories.iter().map(|c| format!("cat:{}", c)).collect();
        q.push_str(&format!(" AND ({})", cats.join(" OR ")));
    }
    q
}

#[derive(Default)]
struct EntryFields {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    categories: Vec<String>,
}

impl EntryFields {
    /// Entries without an id cannot be linked and are dropped.
    fn into_paper(self) -> Option<Paper> {
        let arxiv_id = self.id.trim().rsplit('/').next().unwrap_or("").to_string();
        if arxiv_id.is_empty() {
            return None;
        }
        Some(
            Paper::new(SourceKind::Arxiv, &self.title)
                .with_authors(self.authors)
                .with_abstract(&self.summary)
                .with_date(&self.published)
                .with_links(
                    format!("{}/{}", ABS_URL, arxiv_id),
                    format!("{}/{}", PDF_URL, arxiv_id),
                )
                .with_categories(self.categories)
                .with_arxiv_id(arxiv_id),
        )
    }
}

fn category_term(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"term")
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

pub(crate) fn parse_atom_feed(xml: &str) -> Result<Vec<Paper>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut papers = Vec::new();
    let mut entry: Option<EntryFields> = None;
    let mut current_tag = String::new();
    let mut in_author = false;
    let mut author_name = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "entry" {
                    entry = Some(EntryFields::default());
                } else if let Some(fields) = entry.as_mut() {
                    match tag.as_str() {
                        "author" => {
                            in_author = true;
                            author_name.clear();
                        }
                        "category" => fields.categories.extend(category_term(&e)),
                        _ => {}
                    }
                    current_tag = tag;
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(fields) = entry.as_mut() {
                    if e.name().as_ref() == b"category" {
                        fields.categories.extend(category_term(&e));
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(fields) = entry.as_mut() {
                    let text = match e.unescape() {
                        Ok(text) => text.to_string(),
                        Err(err) => {
                            tracing::debug!("keeping raw text, unescape failed: {}", err);
                            String::from_utf8_lossy(&e).to_string()
                        }
                    };
                    match current_tag.as_str() {
                        "title" => fields.title.push_str(&text),
                        "summary" => fields.summary.push_str(&text),
                        "id" => fields.id.push_str(&text),
                        "published" => fields.published.push_str(&text),
                        "name" if in_author => author_name.push_str(&text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "entry" {
                    if let Some(paper) = entry.take().and_then(EntryFields::into_paper) {
                        papers.push(paper);
                    }
                } else if tag == "author" && in_author {
                    in_author = false;
                    if let Some(fields) = entry.as_mut() {
                        if !author_name.trim().is_empty() {
                            fields.authors.push(author_name.trim().to_string());
                        }
                    }
                }
                if tag == current_tag {
                    current_tag.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }
    Ok(papers)
}
