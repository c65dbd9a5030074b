use reqwest::header::{HeaderMap, ACCEPT, CONTENT_RANGE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{decode, ensure_success, Backend, BackendError, BackendResult, Query};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// One table under `/rest/v1`.
#[derive(Clone, Debug)]
pub struct TableClient {
    backend: Backend,
    table: String,
}

impl TableClient {
    pub(crate) fn new(backend: Backend, table: &str) -> Self { Self { backend, table: table.to_string() } }

    pub fn name(&self) -> &str { &self.table }

    fn url(&self) -> String { format!("{}/rest/v1/{}", self.backend.base_url(), self.table) }

    #[tracing::instrument(skip(self, query), fields(table = %self.table))]
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> BackendResult<Vec<T>> {
        let resp = self
            .backend
            .privileged(Method::GET, &self.url())
            .query(query.params())
            .send()
            .await?;
        decode(resp).await
    }

    /// First matching row, if any.
    pub async fn select_first<T: DeserializeOwned>(&self, query: &Query) -> BackendResult<Option<T>> {
        let rows: Vec<T> = self.select(&query.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row and return it as stored.
    #[tracing::instrument(skip(self, row), fields(table = %self.table))]
    pub async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(&self, row: &B) -> BackendResult<T> {
        let resp = self
            .backend
            .privileged(Method::POST, &self.url())
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(row)
            .send()
            .await?;
        decode(resp).await
    }

    /// Patch every row matching `filter`; returns the updated rows.
    #[tracing::instrument(skip(self, filter, patch), fields(table = %self.table))]
    pub async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(&self, filter: &Query, patch: &B) -> BackendResult<Vec<T>> {
        let resp = self
            .backend
            .privileged(Method::PATCH, &self.url())
            .query(filter.params())
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        decode(resp).await
    }

    /// Insert or merge on the `on_conflict` columns.
    #[tracing::instrument(skip(self, row), fields(table = %self.table))]
    pub async fn upsert<B: Serialize + ?Sized, T: DeserializeOwned>(&self, on_conflict: &str, row: &B) -> BackendResult<T> {
        let resp = self
            .backend
            .privileged(Method::POST, &self.url())
            .query(Query::new().on_conflict(on_conflict).params())
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(row)
            .send()
            .await?;
        decode(resp).await
    }

    #[tracing::instrument(skip(self, filter), fields(table = %self.table))]
    pub async fn delete(&self, filter: &Query) -> BackendResult<()> {
        let resp = self
            .backend
            .privileged(Method::DELETE, &self.url())
            .query(filter.params())
            .send()
            .await?;
        ensure_success(resp).await.map(|_| ())
    }

    /// Exact row count without transferring rows.
    #[tracing::instrument(skip(self, filter), fields(table = %self.table))]
    pub async fn count(&self, filter: &Query) -> BackendResult<u64> {
        let resp = self
            .backend
            .privileged(Method::HEAD, &self.url())
            .query(filter.clone().select("*").params())
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        total_from_headers(resp.headers())
            .ok_or_else(|| BackendError::Decode(format!("missing count for table {}", self.table)))
    }
}

fn total_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers.get(CONTENT_RANGE).and_then(|v| v.to_str().ok()).and_then(parse_content_range)
}

/// Total from `0-24/3573` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}
