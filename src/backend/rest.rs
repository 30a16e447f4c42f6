use crate::backend::client::BackendClient;
use crate::backend::query::{filters_to_query, Filter, SelectQuery};
use crate::config::AppConfig;
use crate::errors::{BackendError, BackendResult};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

/// REST implementation of `BackendClient` against the hosted database's
/// PostgREST endpoint (`{url}/rest/v1/{table}`).
pub struct RestBackendClient {
    client: Client,
    base_url: String,
    anon_key: String,
    schema: String,
}

impl RestBackendClient {
    pub fn new(config: &AppConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            anon_key: config.anon_key.clone(),
            schema: config.schema.clone(),
        })
    }

    fn table_url(&self, table: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/rest/v1/{}", self.base_url, table)
        } else {
            format!("{}/rest/v1/{}?{}", self.base_url, table, query)
        }
    }

    /// Attach key, bearer token and schema profile headers
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept-Profile", &self.schema)
            .header("Content-Profile", &self.schema)
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = self.authorize(request).send().await.map_err(map_transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to get error details".to_string());
        let message = extract_message(&body);
        error!("Backend returned {}: {}", status, message);
        Err(map_status(status, message))
    }

    async fn rows(&self, response: Response) -> BackendResult<Vec<Value>> {
        let text = response.text().await.map_err(map_transport_error)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&text)? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            single => Ok(vec![single]),
        }
    }
}

#[async_trait]
impl BackendClient for RestBackendClient {
    async fn select(&self, query: &SelectQuery) -> BackendResult<Vec<Value>> {
        let url = self.table_url(&query.table, &query.to_query_string());
        debug!("GET {}", url);
        let response = self.send(self.client.get(&url)).await?;
        self.rows(response).await
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> BackendResult<u64> {
        let mut parts = vec!["select=%2A".to_string()];
        parts.extend(filters_to_query(filters));
        let url = self.table_url(table, &parts.join("&"));
        debug!("HEAD {}", url);
        let response = self
            .send(self.client.head(&url).header("Prefer", "count=exact"))
            .await?;

        response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| BackendError::Query("Missing Content-Range in count response".to_string()))
    }

    async fn insert(&self, table: &str, rows: Value) -> BackendResult<Vec<Value>> {
        let url = self.table_url(table, "");
        debug!("POST {}", url);
        let request = self
            .client
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&rows);
        let response = self.send(request).await?;
        self.rows(response).await
    }

    async fn update(&self, table: &str, filters: &[Filter], changes: Value) -> BackendResult<Vec<Value>> {
        let url = self.table_url(table, &filters_to_query(filters).join("&"));
        debug!("PATCH {}", url);
        let request = self
            .client
            .patch(&url)
            .header("Prefer", "return=representation")
            .json(&changes);
        let response = self.send(request).await?;
        self.rows(response).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<Vec<Value>> {
        let url = self.table_url(table, &filters_to_query(filters).join("&"));
        debug!("DELETE {}", url);
        let request = self
            .client
            .delete(&url)
            .header("Prefer", "return=representation");
        let response = self.send(request).await?;
        self.rows(response).await
    }
}

fn map_transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(err.to_string())
    } else if err.is_connect() {
        BackendError::Connection(err.to_string())
    } else {
        BackendError::Http(err)
    }
}

fn map_status(status: StatusCode, message: String) -> BackendError {
    match status {
        StatusCode::CONFLICT => BackendError::Conflict(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendError::Timeout(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => BackendError::Connection(message),
        _ => BackendError::Server { status: status.as_u16(), message },
    }
}

/// Pull the human-readable `message` out of an error body, falling back to
/// the raw text.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// `Content-Range: 0-24/120` or `*/120` → 120
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/').and_then(|(_, total)| total.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/120"), Some(120));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
    }

    #[test]
    fn test_extract_message() {
        let body = r#"{"code":"23503","message":"update or delete on table \"donation_types\" violates foreign key constraint"}"#;
        assert!(extract_message(body).starts_with("update or delete on table"));
        assert_eq!(extract_message("plain failure"), "plain failure");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_status(StatusCode::CONFLICT, "fk".into()), BackendError::Conflict(_)));
        assert!(map_status(StatusCode::GATEWAY_TIMEOUT, "upstream".into()).is_transient());
        assert!(map_status(StatusCode::SERVICE_UNAVAILABLE, "down".into()).is_transient());
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, "bad".into()),
            BackendError::Server { status: 400, .. }
        ));
    }

    #[test]
    fn test_not_found_keeps_server_message() {
        let message = "relation \"public.donation_typez\" does not exist";
        let err = map_status(StatusCode::NOT_FOUND, message.to_string());
        assert!(matches!(err, BackendError::Server { status: 404, .. }));
        assert_eq!(err.to_string(), format!("Server returned error 404: {}", message));
    }

    #[test]
    fn test_table_url() {
        let config = AppConfig::new("https://example.supabase.co", "anon");
        let client = RestBackendClient::new(&config).unwrap();
        assert_eq!(
            client.table_url("donations", "select=%2A"),
            "https://example.supabase.co/rest/v1/donations?select=%2A"
        );
        assert_eq!(client.table_url("churches", ""), "https://example.supabase.co/rest/v1/churches");
    }
}
