//! Conversion of raw provider records into typed results
//!
//! Providers send loosely shaped JSON objects whose fields vary between
//! result types and even between individual hits. Each typed field is filled
//! from an ordered list of [`Extractor`]s; the first one yielding a non-empty
//! value wins. Only a missing `title` makes a record unusable, everything
//! else degrades to an empty or absent value.

use super::table::ResultTable;
use super::types::{ImageRecord, Link, ResultRecord, TextRecord, VideoRecord};
use crate::error::SearchError;
use crate::gateway::RawRecord;
use crate::query::ResultKind;
use serde_json::Value;
use tracing::{debug, warn};

/// Thumbnail sizes in order of preference
pub const THUMBNAIL_SIZES: &[&str] = &["large", "medium", "small", "motion"];

/// Where a single field value may come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// A top-level scalar field
    Field(&'static str),
    /// A nested map of size name to URL, probed in the given order
    Sized {
        map: &'static str,
        sizes: &'static [&'static str],
    },
}

/// Link of a web page or news article
pub const LINK_CANDIDATES: &[Extractor] = &[Extractor::Field("href"), Extractor::Field("url")];

/// Snippet of a web page or news article
pub const BODY_CANDIDATES: &[Extractor] = &[Extractor::Field("body")];

/// Direct link of an image hit
pub const IMAGE_CANDIDATES: &[Extractor] = &[
    Extractor::Field("image"),
    Extractor::Sized {
        map: "images",
        sizes: THUMBNAIL_SIZES,
    },
    Extractor::Field("thumbnail"),
];

/// Page an image was found on
pub const IMAGE_SOURCE_CANDIDATES: &[Extractor] = &[Extractor::Field("url")];

/// Thumbnail of a video hit
pub const VIDEO_THUMBNAIL_CANDIDATES: &[Extractor] = &[Extractor::Sized {
    map: "images",
    sizes: THUMBNAIL_SIZES,
}];

/// Player or page link of a video hit
pub const VIDEO_CONTENT_CANDIDATES: &[Extractor] =
    &[Extractor::Field("content"), Extractor::Field("embed_url")];

pub const VIDEO_DURATION_CANDIDATES: &[Extractor] = &[Extractor::Field("duration")];

impl Extractor {
    /// Value for this extractor, `None` when absent or blank
    pub fn extract(&self, raw: &RawRecord) -> Option<String> {
        match self {
            Self::Field(name) => raw.get(*name).and_then(scalar_text),
            Self::Sized { map, sizes } => {
                let map = raw.get(*map)?.as_object()?;
                sizes
                    .iter()
                    .find_map(|size| map.get(*size).and_then(scalar_text))
            }
        }
    }
}

/// First non-empty value produced by `chain`
pub fn first_present(raw: &RawRecord, chain: &[Extractor]) -> Option<String> {
    chain.iter().find_map(|extractor| extractor.extract(raw))
}

/// Text form of a scalar JSON value; null, arrays and objects count as absent
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Outcome of normalizing one batch
#[derive(Debug)]
pub struct Normalized {
    pub table: ResultTable,
    /// One [`SearchError::MalformedRecord`] per dropped record
    pub skipped: Vec<SearchError>,
}

/// Convert a batch of raw records into a [`ResultTable`]
pub fn normalize(kind: ResultKind, raw: Vec<RawRecord>) -> Normalized {
    let mut table = ResultTable::new(kind);
    let mut skipped = Vec::new();

    for (index, record) in raw.iter().enumerate() {
        match normalize_record(kind, index, record) {
            Ok(normalized) => table.push(normalized),
            Err(e) => {
                warn!("Skipping result: {}", e);
                skipped.push(e);
            }
        }
    }

    debug!(
        "Normalized {} {} results ({} skipped)",
        table.len(),
        kind,
        skipped.len()
    );

    Normalized { table, skipped }
}

/// Normalize a single record
pub fn normalize_record(
    kind: ResultKind,
    index: usize,
    raw: &RawRecord,
) -> Result<ResultRecord, SearchError> {
    let title = match raw.get("title") {
        Some(Value::Null) | None => {
            return Err(SearchError::MalformedRecord {
                index,
                reason: "missing title".to_string(),
            })
        }
        Some(Value::String(s)) => s.clone(),
        Some(value) => scalar_text(value).ok_or_else(|| SearchError::MalformedRecord {
            index,
            reason: "title is not text".to_string(),
        })?,
    };

    let field = |chain: &[Extractor]| first_present(raw, chain).unwrap_or_default();
    let link = |chain: &[Extractor]| link_field(index, raw, chain);

    let record = match kind {
        ResultKind::Text | ResultKind::News => {
            let page = TextRecord {
                title,
                body: field(BODY_CANDIDATES),
                link: link(LINK_CANDIDATES),
            };
            if kind == ResultKind::News {
                ResultRecord::News(page)
            } else {
                ResultRecord::Text(page)
            }
        }
        ResultKind::Image => ResultRecord::Image(ImageRecord {
            title,
            image_link: link(IMAGE_CANDIDATES),
            source_link: link(IMAGE_SOURCE_CANDIDATES),
        }),
        ResultKind::Video => ResultRecord::Video(VideoRecord {
            title,
            thumbnail_link: link(VIDEO_THUMBNAIL_CANDIDATES),
            content_link: field(VIDEO_CONTENT_CANDIDATES),
            duration: first_present(raw, VIDEO_DURATION_CANDIDATES),
        }),
    };

    Ok(record)
}

/// Link value for `chain`; unusable URLs degrade to the empty link
fn link_field(index: usize, raw: &RawRecord, chain: &[Extractor]) -> Link {
    match first_present(raw, chain) {
        Some(value) => Link::parse(&value).unwrap_or_else(|e| {
            warn!("Result #{}: dropping link, {}", index, e);
            Link::empty()
        }),
        None => Link::empty(),
    }
}
