//! HTTP client used by the search gateway

use super::user_agent::{accept_html, accept_json, accept_language, generate_user_agent};
use crate::config::OutgoingSettings;
use crate::error::{Result, SearchError};
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// HTTP client wrapper with provider-friendly defaults
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
    extra_headers: HashMap<String, String>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> anyhow::Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(settings: &OutgoingSettings) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::try_from_secs_f64(settings.request_timeout)?)
            .cookie_store(true)
            .gzip(true)
            .brotli(true);

        // SSL verification
        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        // Proxy settings
        if let Some(ref proxy_url) = settings.proxies.all {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        } else {
            if let Some(ref http) = settings.proxies.http {
                builder = builder.proxy(reqwest::Proxy::http(http)?);
            }
            if let Some(ref https) = settings.proxies.https {
                builder = builder.proxy(reqwest::Proxy::https(https)?);
            }
        }

        let mut user_agent = generate_user_agent();
        if let Some(ref suffix) = settings.useragent_suffix {
            user_agent = format!("{} {}", user_agent, suffix);
        }

        Ok(Self {
            client: builder.build()?,
            user_agent,
            extra_headers: settings.extra_headers.clone(),
        })
    }

    /// GET a page and return its body
    ///
    /// `language` is the preferred response language, empty for no preference.
    pub async fn get_text(
        &self,
        url: &str,
        params: &[(&str, String)],
        language: &str,
    ) -> Result<String> {
        let request = self
            .client
            .get(url)
            .query(params)
            .header("Accept", accept_html());
        self.send(url, self.decorate(request, language)).await
    }

    /// GET a JSON document
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
        referer: &str,
        language: &str,
    ) -> Result<serde_json::Value> {
        let request = self
            .client
            .get(url)
            .query(params)
            .header("Accept", accept_json())
            .header("Referer", referer);
        let text = self.send(url, self.decorate(request, language)).await?;

        serde_json::from_str(&text)
            .map_err(|e| SearchError::Gateway(format!("invalid JSON from {}: {}", url, e)))
    }

    /// POST a form and return the response body
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        language: &str,
    ) -> Result<String> {
        let request = self
            .client
            .post(url)
            .form(form)
            .header("Accept", accept_html());
        self.send(url, self.decorate(request, language)).await
    }

    /// Headers shared by every provider request
    fn decorate(&self, mut request: RequestBuilder, language: &str) -> RequestBuilder {
        request = request
            .header("User-Agent", &self.user_agent)
            .header("Accept-Language", accept_language(language))
            .header("DNT", "1");

        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }
        request
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<String> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Gateway(format!("request to {} timed out", url))
            } else {
                SearchError::Gateway(format!("request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        debug!("{} answered {}", url, status);

        if status.as_u16() == 429 {
            return Err(SearchError::Gateway(
                "rate limited by the search provider (HTTP 429)".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(SearchError::Gateway(format!("HTTP error: {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| SearchError::Gateway(format!("reading response from {} failed: {}", url, e)))
    }

    /// Get current user agent
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
