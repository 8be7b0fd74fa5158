use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use url::Url;

use crate::{
    content::{ContentCandidate, ContentStatus, UserId},
    suggest::RawEmbedding,
};

use super::{BackendError, ContentIndex, NearestQuery, UserLibrary};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MATCH_FUNCTION: &str = "rest/v1/rpc/match_content_suggestions";

/// Client for a PostgREST endpoint exposing the `bookmarks`, `newsletters`
/// and `content_suggestions` tables.
pub struct RestBackend {
    base: Url,
    api_key: Option<String>,
}

impl RestBackend {
    pub fn new(addr: &str, api_key: Option<String>) -> Result<Self, BackendError> {
        let addr = addr.strip_suffix('/').unwrap_or(addr);
        let base = Url::parse(&format!("{addr}/"))?;

        Ok(Self { base, api_key })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, BackendError> {
        let mut url = self.base.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        let request = request.timeout(REQUEST_TIMEOUT);
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let url = self.url(path, query)?;
        log::debug!("GET {url}");

        let resp = self
            .authorize(reqwest::blocking::Client::new().get(url))
            .send()?;
        handle_response(resp)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, BackendError> {
        let url = self.url(path, &[])?;
        log::debug!("POST {url}");

        let resp = self
            .authorize(reqwest::blocking::Client::new().post(url))
            .json(body)
            .send()?;
        handle_response(resp)
    }

    fn embeddings(
        &self,
        table: &str,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<RawEmbedding>, BackendError> {
        let rows: Vec<EmbeddingRow> = self.get(
            &format!("rest/v1/{table}"),
            &[
                ("select", "embedding".to_string()),
                ("user_id", format!("eq.{user}")),
                ("embedding", "not.is.null".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )?;

        Ok(rows.into_iter().filter_map(|row| row.embedding).collect())
    }
}

fn handle_response<T: DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T, BackendError> {
    let status = response.status();
    let text = response.text()?;

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str::<T>(&text).map_err(|err| {
        log::error!("{err}. tried to parse: {text:?}");
        err.into()
    })
}

/// PostgREST `not.in` filter value, every url quoted.
fn not_in_filter(urls: &[String]) -> String {
    let quoted: Vec<String> = urls
        .iter()
        .map(|url| format!("\"{}\"", url.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();

    format!("not.in.({})", quoted.join(","))
}

#[derive(Deserialize)]
struct EmbeddingRow {
    #[serde(default)]
    embedding: Option<RawEmbedding>,
}

#[derive(Deserialize)]
struct UrlRow {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct SubjectRow {
    #[serde(default)]
    subject: Option<String>,
}

/// Row of `content_suggestions` or of the match function, nullable columns included.
#[derive(Deserialize)]
struct ContentRow {
    id: Value,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    similarity: Option<f32>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    status: Option<ContentStatus>,
}

impl From<ContentRow> for ContentCandidate {
    fn from(row: ContentRow) -> Self {
        let id = match row.id {
            Value::String(id) => id,
            other => other.to_string(),
        };

        ContentCandidate {
            id,
            url: row.url.unwrap_or_default(),
            title: row.title.unwrap_or_default(),
            author: row.author,
            summary: row.summary,
            similarity: row.similarity,
            image_url: row.image_url,
            created_at: row.created_at.unwrap_or_default(),
            status: row.status.unwrap_or_default(),
        }
    }
}

impl UserLibrary for RestBackend {
    fn bookmark_embeddings(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<RawEmbedding>, BackendError> {
        self.embeddings("bookmarks", user, limit)
    }

    fn newsletter_embeddings(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<RawEmbedding>, BackendError> {
        self.embeddings("newsletters", user, limit)
    }

    fn bookmarked_urls(&self, user: &UserId) -> Result<Vec<String>, BackendError> {
        let rows: Vec<UrlRow> = self.get(
            "rest/v1/bookmarks",
            &[
                ("select", "url".to_string()),
                ("user_id", format!("eq.{user}")),
            ],
        )?;

        Ok(rows.into_iter().filter_map(|row| row.url).collect())
    }

    fn newsletter_subjects(&self, user: &UserId) -> Result<Vec<String>, BackendError> {
        let rows: Vec<SubjectRow> = self.get(
            "rest/v1/newsletters",
            &[
                ("select", "subject".to_string()),
                ("user_id", format!("eq.{user}")),
            ],
        )?;

        Ok(rows.into_iter().filter_map(|row| row.subject).collect())
    }
}

impl ContentIndex for RestBackend {
    fn query_nearest(&self, query: &NearestQuery<'_>) -> Result<Vec<ContentCandidate>, BackendError> {
        let rows: Vec<ContentRow> = self.post(
            MATCH_FUNCTION,
            &json!({
                "query_embedding": query.embedding,
                "match_threshold": query.threshold,
                "match_count": query.count,
                "exclude_urls": query.exclude_urls,
            }),
        )?;

        Ok(rows.into_iter().map(ContentCandidate::from).collect())
    }

    fn recent_processed(
        &self,
        count: usize,
        exclude_urls: &[String],
    ) -> Result<Vec<ContentCandidate>, BackendError> {
        let mut query = vec![
            ("status", "eq.processed".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", count.to_string()),
        ];
        if !exclude_urls.is_empty() {
            query.push(("url", not_in_filter(exclude_urls)));
        }

        let rows: Vec<ContentRow> = self.get("rest/v1/content_suggestions", &query)?;
        Ok(rows.into_iter().map(ContentCandidate::from).collect())
    }
}
