//! Result type definitions

use crate::error::{Result, SearchError};
use crate::query::ResultKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Placeholder used when a missing optional value is matched against filter terms
pub const MISSING_CELL: &str = "None";

/// A link that is either an absolute http(s) URL or empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Link(String);

/// Non-empty link text that is not an absolute http(s) URL
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not an absolute http(s) URL: {0}")]
pub struct InvalidLink(pub String);

impl Link {
    /// The empty link
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Parse a link; blank input yields the empty link
    pub fn parse(raw: &str) -> std::result::Result<Self, InvalidLink> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::empty());
        }

        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
                Ok(Self(raw.to_string()))
            }
            _ => Err(InvalidLink(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parsed form of the link, `None` when empty
    pub fn url(&self) -> Option<Url> {
        Url::parse(&self.0).ok()
    }
}

impl TryFrom<String> for Link {
    type Error = InvalidLink;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Link> for String {
    fn from(link: Link) -> Self {
        link.0
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Web page or news article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub title: String,
    pub body: String,
    pub link: Link,
}

/// Image hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub title: String,
    /// Direct URL of the image
    pub image_link: Link,
    /// Page the image was found on
    pub source_link: Link,
}

/// Video hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub title: String,
    /// Best available thumbnail, empty when the provider sent none
    pub thumbnail_link: Link,
    /// Player or page URL as sent by the provider
    pub content_link: String,
    pub duration: Option<String>,
}

/// A single normalized search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResultRecord {
    Text(TextRecord),
    Image(ImageRecord),
    News(TextRecord),
    Video(VideoRecord),
}

/// One cell of a result row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell<'a> {
    Text(&'a str),
    Link(&'a Link),
    Missing,
}

impl<'a> Cell<'a> {
    /// Text compared against filter terms
    pub fn as_filter_text(&self) -> &'a str {
        match *self {
            Self::Text(s) => s,
            Self::Link(link) => link.as_str(),
            Self::Missing => MISSING_CELL,
        }
    }

    /// Text written to exported files
    pub fn as_export_text(&self) -> &'a str {
        match *self {
            Self::Text(s) => s,
            Self::Link(link) => link.as_str(),
            Self::Missing => "",
        }
    }
}

/// Declared column display names for a result type
pub fn columns(kind: ResultKind) -> &'static [&'static str] {
    match kind {
        ResultKind::Text | ResultKind::News => &["Title", "Body", "URL"],
        ResultKind::Image => &["Title", "Image URL", "Source URL"],
        ResultKind::Video => &["Title", "Thumbnail URL", "Content URL", "Duration"],
    }
}

impl ResultRecord {
    /// Result type this record belongs to
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::Text(_) => ResultKind::Text,
            Self::Image(_) => ResultKind::Image,
            Self::News(_) => ResultKind::News,
            Self::Video(_) => ResultKind::Video,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Text(r) | Self::News(r) => &r.title,
            Self::Image(r) => &r.title,
            Self::Video(r) => &r.title,
        }
    }

    /// Cells in the order given by [`columns`]
    pub fn cells(&self) -> Vec<Cell<'_>> {
        match self {
            Self::Text(r) | Self::News(r) => vec![
                Cell::Text(&r.title),
                Cell::Text(&r.body),
                Cell::Link(&r.link),
            ],
            Self::Image(r) => vec![
                Cell::Text(&r.title),
                Cell::Link(&r.image_link),
                Cell::Link(&r.source_link),
            ],
            Self::Video(r) => vec![
                Cell::Text(&r.title),
                Cell::Link(&r.thumbnail_link),
                Cell::Text(&r.content_link),
                r.duration.as_deref().map_or(Cell::Missing, Cell::Text),
            ],
        }
    }

    /// Rebuild a record from exported cells
    pub fn from_row(kind: ResultKind, row: &[String]) -> Result<Self> {
        let expected = columns(kind).len();
        if row.len() != expected {
            return Err(SearchError::Import(format!(
                "expected {} columns, found {}",
                expected,
                row.len()
            )));
        }

        let link = |i: usize| Link::parse(&row[i]).map_err(|e| SearchError::Import(e.to_string()));

        let record = match kind {
            ResultKind::Text | ResultKind::News => {
                let text = TextRecord {
                    title: row[0].clone(),
                    body: row[1].clone(),
                    link: link(2)?,
                };
                if kind == ResultKind::News {
                    Self::News(text)
                } else {
                    Self::Text(text)
                }
            }
            ResultKind::Image => Self::Image(ImageRecord {
                title: row[0].clone(),
                image_link: link(1)?,
                source_link: link(2)?,
            }),
            ResultKind::Video => Self::Video(VideoRecord {
                title: row[0].clone(),
                thumbnail_link: link(1)?,
                content_link: row[2].clone(),
                duration: Some(row[3].clone()).filter(|d| !d.is_empty()),
            }),
        };

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_empty_vs_invalid() {
        assert!(Link::parse("").unwrap().is_empty());
        assert!(Link::parse("   ").unwrap().is_empty());
        assert!(Link::parse("not a url").is_err());
        assert!(Link::parse("ftp://example.com/file").is_err());
        assert!(Link::parse("/relative/path").is_err());

        let link = Link::parse("https://example.com/a?b=c").unwrap();
        assert_eq!(link.as_str(), "https://example.com/a?b=c");
        assert_eq!(link.url().unwrap().host_str(), Some("example.com"));
    }

    #[test]
    fn test_link_deserialize_rejects_invalid() {
        let ok: Link = serde_json::from_str("\"http://example.com\"").unwrap();
        assert_eq!(ok.as_str(), "http://example.com");
        assert!(serde_json::from_str::<Link>("\"javascript:alert(1)\"").is_err());
    }

    #[test]
    fn test_video_cells_missing_duration() {
        let record = ResultRecord::Video(VideoRecord {
            title: "clip".to_string(),
            thumbnail_link: Link::empty(),
            content_link: "https://www.youtube.com/watch?v=x".to_string(),
            duration: None,
        });

        let cells = record.cells();
        assert_eq!(cells.len(), columns(ResultKind::Video).len());
        assert_eq!(cells[3].as_filter_text(), MISSING_CELL);
        assert_eq!(cells[3].as_export_text(), "");
    }

    #[test]
    fn test_from_row_checks_width() {
        let row = vec!["title".to_string(), "body".to_string()];
        assert!(ResultRecord::from_row(ResultKind::Text, &row).is_err());
    }

    #[test]
    fn test_from_row_news() {
        let row = vec![
            "title".to_string(),
            "body".to_string(),
            "https://news.example.com/1".to_string(),
        ];
        let record = ResultRecord::from_row(ResultKind::News, &row).unwrap();
        assert_eq!(record.kind(), ResultKind::News);
        assert_eq!(record.title(), "title");
    }
}
