//! Query building module
//!
//! Turns the raw strings collected by the search form into a validated
//! [`QueryDescriptor`]. Validation happens here so that nothing malformed
//! ever reaches the search gateway:
//! - unknown region / safe search / result type values are rejected
//! - an explicit date range needs both ends and `start <= end`
//! - `max_results` must lie in `1..=50`

use crate::config::SearchSettings;
use crate::error::{Result, SearchError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Upper bound for the number of results a single search may request
pub const MAX_RESULTS_LIMIT: u32 = 50;

/// Search region
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// The instance's primary locale (Japan)
    #[default]
    PrimaryLocale,
    /// No region preference
    Global,
}

impl Region {
    /// Region code understood by DuckDuckGo
    pub fn code(&self) -> &'static str {
        match self {
            Self::PrimaryLocale => "jp-jp",
            Self::Global => "wt-wt",
        }
    }

    /// Preferred response language, empty when there is none
    pub fn language(&self) -> &'static str {
        match self {
            Self::PrimaryLocale => "ja",
            Self::Global => "",
        }
    }
}

impl FromStr for Region {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "jp-jp" | "primary" | "primary_locale" | "primary-locale" => Ok(Self::PrimaryLocale),
            "wt-wt" | "global" => Ok(Self::Global),
            _ => Err(SearchError::invalid("region", s)),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Safe search level
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    #[default]
    Off,
    Moderate,
    Strict,
}

impl SafeSearch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Moderate => "moderate",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for SafeSearch {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "0" => Ok(Self::Off),
            "moderate" | "1" => Ok(Self::Moderate),
            // The first UI offered "on" for the strict level
            "strict" | "on" | "2" => Ok(Self::Strict),
            _ => Err(SearchError::invalid("safesearch", s)),
        }
    }
}

impl fmt::Display for SafeSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of search, which also fixes the shape of its results
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    #[default]
    Text,
    Image,
    News,
    Video,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::News => "news",
            Self::Video => "video",
        }
    }

    /// Human readable label for the UI
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Image => "Images",
            Self::News => "News",
            Self::Video => "Videos",
        }
    }

    pub fn all() -> &'static [ResultKind] {
        &[Self::Text, Self::Image, Self::News, Self::Video]
    }
}

impl FromStr for ResultKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "web" | "テキスト" => Ok(Self::Text),
            "image" | "images" | "画像" => Ok(Self::Image),
            "news" | "ニュース" => Ok(Self::News),
            "video" | "videos" | "動画" => Ok(Self::Video),
            _ => Err(SearchError::invalid("result type", s)),
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative time range filter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl FromStr for TimeRange {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "d" => Ok(Self::Day),
            "week" | "w" => Ok(Self::Week),
            "month" | "m" => Ok(Self::Month),
            "year" | "y" => Ok(Self::Year),
            _ => Err(SearchError::invalid("time range", s)),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time constraint applied to a search
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Relative(TimeRange),
    /// Inclusive date range, `start <= end` is guaranteed by [`TimeWindow::explicit`]
    Explicit { start: NaiveDate, end: NaiveDate },
}

impl TimeWindow {
    /// Build an explicit range, rejecting `start > end`
    pub fn explicit(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SearchError::InvalidRange { start, end });
        }
        Ok(Self::Explicit { start, end })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relative(range) => write!(f, "{}", range),
            Self::Explicit { start, end } => write!(f, "{}..{}", start, end),
        }
    }
}

/// Validated, normalized search request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryDescriptor {
    /// Main keyword as typed by the user
    pub keyword: String,
    /// Extra keywords every result must mention
    #[serde(default)]
    pub and_keywords: Vec<String>,
    /// Keywords results must not mention
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    pub region: Region,
    pub safety: SafeSearch,
    /// `None` means unrestricted
    pub time_window: Option<TimeWindow>,
    pub kind: ResultKind,
    /// Always within `1..=MAX_RESULTS_LIMIT`
    pub max_results: u32,
}

impl QueryDescriptor {
    /// Create a descriptor with default options
    pub fn simple(keyword: impl Into<String>, kind: ResultKind) -> Self {
        Self {
            keyword: keyword.into(),
            and_keywords: vec![],
            exclude_keywords: vec![],
            region: Region::default(),
            safety: SafeSearch::default(),
            time_window: None,
            kind,
            max_results: MAX_RESULTS_LIMIT,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_safety(mut self, safety: SafeSearch) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Set the result count, clamped into the allowed range
    pub fn with_max_results(mut self, max: u32) -> Self {
        self.max_results = max.clamp(1, MAX_RESULTS_LIMIT);
        self
    }

    /// Keyword string sent to the provider: `keyword and1 and2 -not1`
    pub fn provider_keywords(&self) -> String {
        let mut parts = vec![self.keyword.clone()];
        parts.extend(self.and_keywords.iter().cloned());
        parts.extend(self.exclude_keywords.iter().map(|k| format!("-{}", k)));
        parts.join(" ")
    }
}

/// Raw parameters as submitted by the search form
///
/// Every field is an optional string so that bad input turns into a
/// readable [`SearchError`] instead of an extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryParams {
    pub q: Option<String>,
    #[serde(rename = "and")]
    pub and_keywords: Option<String>,
    #[serde(rename = "not")]
    pub exclude_keywords: Option<String>,
    pub kind: Option<String>,
    pub region: Option<String>,
    pub safesearch: Option<String>,
    pub time_range: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub max_results: Option<String>,
}

/// Treat blank form fields as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn split_keywords(value: &Option<String>) -> Vec<String> {
    present(value)
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn parse_date(name: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| SearchError::invalid(name, value))
}

/// Build a [`QueryDescriptor`] from form parameters
///
/// Missing fields fall back to `defaults`. An explicit date range wins over
/// a relative one when both are supplied.
pub fn build_query(params: &QueryParams, defaults: &SearchSettings) -> Result<QueryDescriptor> {
    let keyword = present(&params.q)
        .ok_or_else(|| SearchError::invalid("keyword", "(empty)"))?
        .to_string();

    let region = match present(&params.region) {
        Some(v) => v.parse()?,
        None => defaults.region,
    };
    let safety = match present(&params.safesearch) {
        Some(v) => v.parse()?,
        None => defaults.safesearch,
    };
    let kind = match present(&params.kind) {
        Some(v) => v.parse()?,
        None => defaults.kind,
    };

    let max_results = match present(&params.max_results) {
        Some(v) => {
            let n: u32 = v
                .parse()
                .map_err(|_| SearchError::invalid("max_results", v))?;
            if !(1..=MAX_RESULTS_LIMIT).contains(&n) {
                return Err(SearchError::invalid("max_results", v));
            }
            n
        }
        None => defaults.max_results,
    };

    let time_window = match (present(&params.start), present(&params.end)) {
        (Some(start), Some(end)) => Some(TimeWindow::explicit(
            parse_date("start date", start)?,
            parse_date("end date", end)?,
        )?),
        (Some(start), None) => {
            let value = format!("missing (start is {})", start);
            return Err(SearchError::invalid("end date", value));
        }
        (None, Some(end)) => {
            let value = format!("missing (end is {})", end);
            return Err(SearchError::invalid("start date", value));
        }
        (None, None) => match present(&params.time_range) {
            Some(v) => Some(TimeWindow::Relative(v.parse()?)),
            None => None,
        },
    };

    let descriptor = QueryDescriptor {
        keyword,
        and_keywords: split_keywords(&params.and_keywords),
        exclude_keywords: split_keywords(&params.exclude_keywords),
        region,
        safety,
        time_window,
        kind,
        max_results,
    };

    debug!(?descriptor, "Built query");
    Ok(descriptor)
}
