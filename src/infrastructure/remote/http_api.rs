use crate::application::ports::remote_api::{RemoteDataApi, RemoteError, SelectQuery};
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Row-oriented client for the hosted data API. Filters, projection,
/// ordering and limits travel as query parameters; upserts express their
/// conflict key through `on_conflict` plus a merge-duplicates preference
/// header.
pub struct HttpDataApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpDataApi {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    fn classify_send_error(err: reqwest::Error) -> RemoteError {
        // Transport-level failures are always worth retrying.
        RemoteError::transient(err.to_string())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::from_status(status.as_u16(), body))
    }

}

#[async_trait]
impl RemoteDataApi for HttpDataApi {
    async fn select(&self, table: &str, query: SelectQuery) -> Result<Vec<Value>, RemoteError> {
        let mut params = query.filters.clone();
        if let Some(columns) = &query.columns {
            params.push(("select".to_string(), columns.clone()));
        }
        if let Some((column, descending)) = &query.order {
            let direction = if *descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{column}.{direction}")));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        let request = self
            .authed(self.client.get(self.table_url(table)))
            .query(&params);
        let response = request.send().await.map_err(Self::classify_send_error)?;
        let response = Self::check_status(response).await?;

        // A garbled body usually means a proxy or captive portal got in the
        // way, so treat it like a transport fault.
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| RemoteError::transient(e.to_string()))
    }

    async fn insert(&self, table: &str, rows: Value) -> Result<(), RemoteError> {
        let request = self
            .authed(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(&rows);
        let response = request.send().await.map_err(Self::classify_send_error)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Value,
        on_conflict: &str,
    ) -> Result<(), RemoteError> {
        let request = self
            .authed(self.client.post(self.table_url(table)))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&rows);
        let response = request.send().await.map_err(Self::classify_send_error)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        filters: Vec<(String, String)>,
        patch: Value,
    ) -> Result<(), RemoteError> {
        let request = self
            .authed(self.client.patch(self.table_url(table)))
            .query(&filters)
            .header("Prefer", "return=minimal")
            .json(&patch);
        let response = request.send().await.map_err(Self::classify_send_error)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn delete(
        &self,
        table: &str,
        filters: Vec<(String, String)>,
    ) -> Result<(), RemoteError> {
        let request = self
            .authed(self.client.delete(self.table_url(table)))
            .query(&filters);
        let response = request.send().await.map_err(Self::classify_send_error)?;
        Self::check_status(response).await?;
        Ok(())
    }
}
