//! DuckDuckGo gateway
//!
//! Text results are scraped from the JavaScript-free HTML endpoint. Images,
//! news and videos come from the JSON endpoints behind the main site, which
//! only answer when given the `vqd` token embedded in a regular results page.

use super::{RawRecord, SearchGateway};
use crate::config::DuckDuckGoSettings;
use crate::error::{Result, SearchError};
use crate::network::HttpClient;
use crate::query::{QueryDescriptor, ResultKind, SafeSearch, TimeRange, TimeWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Pages requested from the HTML endpoint for one search
const HTML_PAGE_LIMIT: usize = 3;

/// Pages requested from a JSON endpoint for one search
const JSON_PAGE_LIMIT: usize = 5;

type Params = Vec<(&'static str, String)>;

static VQD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"vqd=["']?([\d-]+)["']?"#).expect("invalid vqd regex"));

/// DuckDuckGo search gateway
pub struct DuckDuckGo {
    client: HttpClient,
    base_url: String,
    html_url: String,
}

impl DuckDuckGo {
    pub fn new(client: HttpClient, settings: &DuckDuckGoSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            html_url: settings.html_url.clone(),
        }
    }

    async fn search_text(&self, query: &QueryDescriptor) -> Result<Vec<RawRecord>> {
        let max = query.max_results as usize;
        let mut form: Params = vec![
            ("q", query.provider_keywords()),
            ("b", String::new()),
            ("kl", query.region.code().to_string()),
            ("kp", strictness(query.safety).to_string()),
        ];
        if let Some(df) = date_filter(query.time_window) {
            form.push(("df", df));
        }

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut offset = 0;

        for page in 0..HTML_PAGE_LIMIT {
            let mut page_form = form.clone();
            if page > 0 {
                page_form.push(("s", offset.to_string()));
                page_form.push(("dc", (offset + 1).to_string()));
            }

            let html = match self
                .client
                .post_form(&self.html_url, &page_form, query.region.language())
                .await
            {
                Ok(html) => html,
                Err(e) if page > 0 => {
                    warn!("DuckDuckGo page {} failed, keeping {} results: {}", page + 1, records.len(), e);
                    break;
                }
                Err(e) => return Err(e),
            };

            let hits = parse_html_results(&html)?;
            if hits.is_empty() {
                break;
            }
            offset += hits.len();

            let before = records.len();
            for hit in hits {
                let href = hit
                    .get("href")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if seen.insert(href) {
                    records.push(hit);
                }
            }

            if records.len() >= max || records.len() == before {
                break;
            }
        }

        records.truncate(max);
        Ok(records)
    }

    async fn search_images(&self, query: &QueryDescriptor) -> Result<Vec<RawRecord>> {
        let keywords = query.provider_keywords();
        let vqd = self.vqd(&keywords, query.region.language()).await?;
        let params: Params = vec![
            ("l", query.region.code().to_string()),
            ("o", "json".to_string()),
            ("q", keywords),
            ("vqd", vqd),
            ("f", image_filter(query.time_window)),
            ("p", media_strictness(query.safety).to_string()),
        ];

        self.search_json("i.js", params, query, "image", image_record).await
    }

    async fn search_news(&self, query: &QueryDescriptor) -> Result<Vec<RawRecord>> {
        let keywords = query.provider_keywords();
        let vqd = self.vqd(&keywords, query.region.language()).await?;
        let mut params: Params = vec![
            ("l", query.region.code().to_string()),
            ("o", "json".to_string()),
            ("noamp", "1".to_string()),
            ("q", keywords),
            ("vqd", vqd),
            ("p", strictness(query.safety).to_string()),
        ];
        if let Some(df) = date_filter(query.time_window) {
            params.push(("df", df));
        }

        self.search_json("news.js", params, query, "url", news_record).await
    }

    async fn search_videos(&self, query: &QueryDescriptor) -> Result<Vec<RawRecord>> {
        let keywords = query.provider_keywords();
        let vqd = self.vqd(&keywords, query.region.language()).await?;
        let params: Params = vec![
            ("l", query.region.code().to_string()),
            ("o", "json".to_string()),
            ("q", keywords),
            ("vqd", vqd),
            ("f", video_filter(query.time_window)),
            ("p", media_strictness(query.safety).to_string()),
        ];

        self.search_json("v.js", params, query, "content", video_record).await
    }

    /// Token required by the JSON endpoints
    async fn vqd(&self, keywords: &str, language: &str) -> Result<String> {
        let page = self
            .client
            .get_text(
                &format!("{}/", self.base_url),
                &[("q", keywords.to_string())],
                language,
            )
            .await?;

        extract_vqd(&page)
            .ok_or_else(|| SearchError::Gateway("DuckDuckGo did not return a vqd token".to_string()))
    }

    /// Collect results from a paginated JSON endpoint
    ///
    /// Records sharing the same `dedupe_key` value are kept once.
    async fn search_json(
        &self,
        endpoint: &str,
        mut params: Params,
        query: &QueryDescriptor,
        dedupe_key: &str,
        map: fn(&RawRecord) -> RawRecord,
    ) -> Result<Vec<RawRecord>> {
        let max = query.max_results as usize;
        let language = query.region.language();
        let url = format!("{}/{}", self.base_url, endpoint);
        let referer = format!("{}/", self.base_url);
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for page in 0..JSON_PAGE_LIMIT {
            let body = match self.client.get_json(&url, &params, &referer, language).await {
                Ok(body) => body,
                Err(e) if page > 0 => {
                    warn!("{} page {} failed, keeping {} results: {}", endpoint, page + 1, records.len(), e);
                    break;
                }
                Err(e) => return Err(e),
            };

            let Some(hits) = body.get("results").and_then(Value::as_array) else {
                break;
            };

            for hit in hits.iter().filter_map(Value::as_object) {
                let record = map(hit);
                let key = record
                    .get(dedupe_key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if key.is_empty() || seen.insert(key) {
                    records.push(record);
                }
            }

            if records.len() >= max {
                break;
            }

            match body.get("next").and_then(Value::as_str).and_then(next_offset) {
                Some(offset) => set_param(&mut params, "s", offset),
                None => break,
            }
        }

        debug!("{} returned {} results", endpoint, records.len());
        records.truncate(max);
        Ok(records)
    }
}

#[async_trait]
impl SearchGateway for DuckDuckGo {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &QueryDescriptor) -> Result<Vec<RawRecord>> {
        debug!("DuckDuckGo {} search for '{}'", query.kind, query.provider_keywords());

        match query.kind {
            ResultKind::Text => self.search_text(query).await,
            ResultKind::Image => self.search_images(query).await,
            ResultKind::News => self.search_news(query).await,
            ResultKind::Video => self.search_videos(query).await,
        }
    }
}

/// `kp` / `p` value of the HTML and news endpoints
fn strictness(safety: SafeSearch) -> &'static str {
    match safety {
        SafeSearch::Strict => "1",
        SafeSearch::Moderate => "-1",
        SafeSearch::Off => "-2",
    }
}

/// Image and video endpoints only know on and off
fn media_strictness(safety: SafeSearch) -> &'static str {
    match safety {
        SafeSearch::Off => "-1",
        SafeSearch::Moderate | SafeSearch::Strict => "1",
    }
}

fn range_code(range: TimeRange) -> &'static str {
    match range {
        TimeRange::Day => "d",
        TimeRange::Week => "w",
        TimeRange::Month => "m",
        TimeRange::Year => "y",
    }
}

/// `df` value for text and news searches
fn date_filter(window: Option<TimeWindow>) -> Option<String> {
    match window? {
        TimeWindow::Relative(range) => Some(range_code(range).to_string()),
        TimeWindow::Explicit { start, end } => Some(format!("{}..{}", start, end)),
    }
}

/// `f` value for image searches: time, size, color, type, layout, license
fn image_filter(window: Option<TimeWindow>) -> String {
    let time = match window {
        Some(TimeWindow::Relative(range)) => {
            let name = match range {
                TimeRange::Day => "Day",
                TimeRange::Week => "Week",
                TimeRange::Month => "Month",
                TimeRange::Year => "Year",
            };
            format!("time:{}", name)
        }
        Some(window @ TimeWindow::Explicit { .. }) => {
            warn!("Image search has no date ranges, ignoring {}", window);
            String::new()
        }
        None => String::new(),
    };

    format!("{},,,,,", time)
}

/// `f` value for video searches: published, duration, license
fn video_filter(window: Option<TimeWindow>) -> String {
    let published = match window {
        Some(TimeWindow::Relative(TimeRange::Year)) => {
            warn!("Video search has no yearly filter, searching without a time limit");
            String::new()
        }
        Some(TimeWindow::Relative(range)) => format!("publishedAfter:{}", range_code(range)),
        Some(window @ TimeWindow::Explicit { .. }) => {
            warn!("Video search has no date ranges, ignoring {}", window);
            String::new()
        }
        None => String::new(),
    };

    format!("{},,", published)
}

fn set_param(params: &mut Params, name: &'static str, value: String) {
    match params.iter_mut().find(|(key, _)| *key == name) {
        Some(param) => param.1 = value,
        None => params.push((name, value)),
    }
}

/// Offset carried by a `next` cursor such as `i.js?q=rust&s=100&...`
fn next_offset(next: &str) -> Option<String> {
    let query = next.split_once('?').map_or(next, |(_, query)| query);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "s")
        .map(|(_, value)| value.into_owned())
}

fn extract_vqd(page: &str) -> Option<String> {
    VQD_PATTERN
        .captures(page)
        .map(|captures| captures[1].to_string())
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SearchError::Gateway(format!("invalid selector {}: {:?}", css, e)))
}

/// Parse a page of the HTML endpoint into `title` / `href` / `body` records
pub(crate) fn parse_html_results(html: &str) -> Result<Vec<RawRecord>> {
    let document = Html::parse_document(html);
    let result_selector = selector("div.result:not(.result--ad)")?;
    let title_selector = selector("a.result__a")?;
    let snippet_selector = selector(".result__snippet")?;

    let mut records = Vec::new();

    for element in document.select(&result_selector) {
        let Some(anchor) = element.select(&title_selector).next() else {
            continue;
        };

        let title = collapse_whitespace(&anchor.text().collect::<String>());
        if title.is_empty() {
            continue;
        }

        let Some(href) = anchor.value().attr("href").and_then(unwrap_redirect) else {
            continue;
        };

        let body = element
            .select(&snippet_selector)
            .next()
            .map(|snippet| collapse_whitespace(&snippet.text().collect::<String>()))
            .unwrap_or_default();

        let mut record = RawRecord::new();
        record.insert("title".to_string(), Value::String(title));
        record.insert("href".to_string(), Value::String(href));
        record.insert("body".to_string(), Value::String(body));
        records.push(record);
    }

    debug!("Parsed {} DuckDuckGo HTML results", records.len());
    Ok(records)
}

/// Destination of a result link
///
/// The HTML endpoint wraps targets as `//duckduckgo.com/l/?uddg=<encoded>`.
/// Ad clicks (`/y.js`) have no usable destination and yield `None`.
fn unwrap_redirect(href: &str) -> Option<String> {
    let full = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&full).ok()?;
    let internal = parsed
        .host_str()
        .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"));

    if !internal {
        return Some(full);
    }

    if parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        None
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain text of a snippet that may carry `<b>` markup or entities
fn strip_html(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return collapse_whitespace(text);
    }
    let fragment = Html::parse_fragment(text);
    collapse_whitespace(&fragment.root_element().text().collect::<String>())
}

fn copy_field(from: &RawRecord, to: &mut RawRecord, source: &str, target: &str) {
    let Some(value) = from.get(source) else {
        return;
    };
    let value = match value {
        Value::String(text) => Value::String(strip_html(text)),
        other => other.clone(),
    };
    to.insert(target.to_string(), value);
}

fn image_record(hit: &RawRecord) -> RawRecord {
    let mut record = RawRecord::new();
    for key in ["title", "image", "thumbnail", "url", "height", "width", "source"] {
        copy_field(hit, &mut record, key, key);
    }
    record
}

fn news_record(hit: &RawRecord) -> RawRecord {
    let mut record = RawRecord::new();
    copy_field(hit, &mut record, "title", "title");
    copy_field(hit, &mut record, "excerpt", "body");
    for key in ["url", "image", "source"] {
        copy_field(hit, &mut record, key, key);
    }

    let published = hit
        .get("date")
        .and_then(Value::as_i64)
        .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0));
    if let Some(published) = published {
        record.insert("date".to_string(), Value::String(published.to_rfc3339()));
    }

    record
}

fn video_record(hit: &RawRecord) -> RawRecord {
    let mut record = hit.clone();
    for key in ["title", "description"] {
        copy_field(hit, &mut record, key, key);
    }
    record
}
