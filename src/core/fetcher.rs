use crate::core::ConfigProvider;
use crate::domain::model::Record;
use crate::utils::error::{EtlError, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PAGES: usize = 10_000;

const CURSOR_PARAM: &str = "after";

/// HubSpot CRM v3 的資源路徑
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Objects(&'a str),
    Properties(&'a str),
    Pipelines(&'a str),
    Owners,
}

impl Endpoint<'_> {
    pub fn path(&self) -> String {
        match self {
            Endpoint::Objects(kind) => format!("/crm/v3/objects/{}", kind),
            Endpoint::Properties(kind) => format!("/crm/v3/properties/{}", kind),
            Endpoint::Pipelines(kind) => format!("/crm/v3/pipelines/{}", kind),
            Endpoint::Owners => "/crm/v3/owners".to_string(),
        }
    }
}

/// 有序的查詢參數；同一個 key 可重複（清單參數逐一送出）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.pairs.push((key.to_string(), value.into()));
    }

    pub fn push_all(&mut self, key: &str, values: &[String]) {
        for value in values {
            self.push(key, value.clone());
        }
    }

    /// 取代所有同名參數
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.pairs.retain(|(k, _)| k != key);
        self.push(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

#[derive(Debug, Deserialize)]
struct Page {
    results: Vec<Value>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    after: String,
}

impl Page {
    fn next_cursor(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .map(|n| n.after.as_str())
    }
}

/// 以 cursor 分頁的 HubSpot 擷取器
pub struct HubSpotClient {
    client: Client,
    base_url: String,
    access_token: String,
    max_pages: usize,
}

impl HubSpotClient {
    pub fn new(
        base_url: &str,
        access_token: &str,
        timeout: Duration,
        max_pages: usize,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            max_pages,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.base_url(),
            config.access_token(),
            config.request_timeout(),
            config.max_pages(),
        )
    }

    pub fn url(&self, endpoint: Endpoint<'_>) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// 依序取回所有頁面；任一頁失敗即放棄已取得的資料並回傳錯誤
    pub async fn fetch_all(
        &self,
        endpoint: Endpoint<'_>,
        params: &QueryParams,
    ) -> Result<Vec<Record>> {
        let url = self.url(endpoint);
        let mut query = params.clone();
        let mut records = Vec::new();
        let mut pages = 0usize;

        loop {
            if pages >= self.max_pages {
                tracing::error!(
                    "🛑 {}: page limit of {} reached while the server still reports more data",
                    url,
                    self.max_pages
                );
                return Err(EtlError::PaginationLimitExceeded {
                    max_pages: self.max_pages,
                });
            }
            pages += 1;

            let page = self.fetch_page(&url, &query).await?;
            let page_size = page.results.len();

            for item in &page.results {
                match item {
                    Value::Object(obj) => records.push(Record::new(obj.clone())),
                    other => tracing::warn!("Skipping non-object result from {}: {}", url, other),
                }
            }

            tracing::debug!(
                "📄 {}: page {} returned {} results ({} total)",
                url,
                pages,
                page_size,
                records.len()
            );

            match page.next_cursor() {
                Some(cursor) => query.set(CURSOR_PARAM, cursor),
                None => break,
            }
        }

        tracing::info!("📡 Fetched {} records from {} in {} page(s)", records.len(), url, pages);
        Ok(records)
    }

    async fn fetch_page(&self, url: &str, query: &QueryParams) -> Result<Page> {
        tracing::debug!("Making API request to: {} {:?}", url, query.as_pairs());

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(CONTENT_TYPE, "application/json")
            .query(query.as_pairs())
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        status.canonical_reason().unwrap_or("unknown error").to_string()
                    } else {
                        body
                    }
                });
            return Err(EtlError::RemoteError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Page>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Objects("contacts").path(), "/crm/v3/objects/contacts");
        assert_eq!(Endpoint::Properties("deals").path(), "/crm/v3/properties/deals");
        assert_eq!(Endpoint::Pipelines("tickets").path(), "/crm/v3/pipelines/tickets");
        assert_eq!(Endpoint::Owners.path(), "/crm/v3/owners");
    }

    #[test]
    fn test_query_params_set_replaces_cursor() {
        let mut query = QueryParams::new();
        query.push("limit", "50");
        query.set("after", "abc");
        query.set("after", "def");

        assert_eq!(query.get("after"), Some("def"));
        assert_eq!(query.get_all("after").len(), 1);
        assert_eq!(query.as_pairs()[0], ("limit".to_string(), "50".to_string()));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            HubSpotClient::new("http://localhost:1234/", "t", Duration::from_secs(1), 5).unwrap();
        assert_eq!(client.url(Endpoint::Owners), "http://localhost:1234/crm/v3/owners");
    }

    #[test]
    fn test_page_cursor_parsing() {
        let page: Page = serde_json::from_str(
            r#"{"results":[{"id":"1"}],"paging":{"next":{"after":"2","link":"x"}}}"#,
        )
        .unwrap();
        assert_eq!(page.next_cursor(), Some("2"));

        let last: Page = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert_eq!(last.next_cursor(), None);
    }
}
