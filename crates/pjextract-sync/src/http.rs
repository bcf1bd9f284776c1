//! HTTP client for the lawyer-panel process listing of each PJe instance.

use async_trait::async_trait;
use pjextract_core::{AuthSession, Category, InstanceId, PageFetchError, PageSource, ProcessRecord, Settings};
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderName, HeaderValue, REFERER};
use serde::Deserialize;
use tracing::debug;

const ACCEPT_JSON: &str = "application/json, text/plain, */*";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36 Edg/139.0.0.0";
const XSRF_HEADER: HeaderName = HeaderName::from_static("x-xsrf-token");

/// Client for `GET /pje-comum-api/api/paineladvogado/{panel}/processos`.
pub struct PanelClient {
    client: reqwest::Client,
    settings: Settings,
}

#[derive(Deserialize)]
struct PageResponse {
    #[serde(default)]
    resultado: Option<Vec<ProcessRecord>>,
}

impl PanelClient {
    /// Create a client using the request timeout and hosts of `settings`.
    pub fn new(settings: Settings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

#[async_trait]
impl PageSource for PanelClient {
    async fn fetch_page(
        &self,
        session: &AuthSession,
        instance: InstanceId,
        category: Category,
        page: u32,
    ) -> Result<Vec<ProcessRecord>, PageFetchError> {
        let url = self.settings.processes_url(instance, &session.panel_id);
        let query = page_query(&self.settings, category, page, chrono::Utc::now().timestamp_millis());
        let headers = session_headers(session, &self.settings.referer(instance))?;

        debug!(%instance, %category, page, url = %url, "requesting page");
        let resp = self
            .client
            .get(&url)
            .query(&query)
            .headers(headers)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PageFetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await.map_err(transport)?;
        parse_page(&body)
    }
}

/// Query parameters of one page request. `now_millis` busts caches.
pub fn page_query(settings: &Settings, category: Category, page: u32, now_millis: i64) -> Vec<(&'static str, String)> {
    vec![
        ("pagina", page.to_string()),
        ("tamanhoPagina", settings.page_size.to_string()),
        ("tipoPainelAdvogado", category.remote_code().to_string()),
        ("ordenacaoCrescente", "false".to_string()),
        ("data", now_millis.to_string()),
    ]
}

/// Headers carrying the browser session to the API.
pub fn session_headers(session: &AuthSession, referer: &str) -> Result<HeaderMap, PageFetchError> {
    let value = |v: &str| {
        HeaderValue::from_str(v)
            .map_err(|_| PageFetchError::Transport("session value is not a valid header".into()))
    };

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
    headers.insert(COOKIE, value(&session.cookie_header)?);
    headers.insert(XSRF_HEADER, value(&session.csrf_token)?);
    headers.insert(REFERER, value(referer)?);
    Ok(headers)
}

/// Records of a 200 body. A missing or null `resultado` reads as an empty page.
pub fn parse_page(body: &str) -> Result<Vec<ProcessRecord>, PageFetchError> {
    let page: PageResponse = serde_json::from_str(body)?;
    Ok(page.resultado.unwrap_or_default())
}

fn transport(e: reqwest::Error) -> PageFetchError {
    PageFetchError::Transport(e.to_string())
}
