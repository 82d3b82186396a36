//! Accept-header negotiation for versioned vendor media types.
//!
//! Requests may ask for `application/vnd.landable.v3+json` (optionally with a
//! parameter segment, `application/vnd.landable.v3.summary+json`) or a plain
//! mime type such as `application/json`. Plain types fall back to
//! [`API_VERSION`](crate::API_VERSION).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::API_VERSION;

static VENDOR_MEDIA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^application/vnd\.(?P<ns>[a-z0-9_-]+)(?:\.v(?P<version>\d+))?(?:\.(?P<param>[a-z0-9_-]+))?(?:\+(?P<format>[a-z0-9]+))?$",
    )
    .expect("vendor media pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaFormat {
    Json,
    Xml,
    Html,
    Text,
    /// Nothing in the header mapped to a format we know.
    Unknown,
}

impl MediaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Html => "html",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_extension(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "xml" => Self::Xml,
            "html" => Self::Html,
            "text" | "txt" => Self::Text,
            _ => Self::Unknown,
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/json" | "*/*" | "application/*" => Some(Self::Json),
            "application/xml" | "text/xml" => Some(Self::Xml),
            "text/html" => Some(Self::Html),
            "text/plain" => Some(Self::Text),
            _ => None,
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The representation a request asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiMedia {
    pub format: MediaFormat,
    pub version: u32,
    pub param: Option<String>,
}

impl Default for ApiMedia {
    fn default() -> Self {
        Self {
            format: MediaFormat::Json,
            version: API_VERSION,
            param: None,
        }
    }
}

impl ApiMedia {
    /// Parse an `Accept` header.
    ///
    /// Vendor ranges only count when they name `namespace`. Requested versions
    /// are passed through without checking they exist.
    pub fn negotiate(accept: Option<&str>, namespace: &str) -> Self {
        let Some(accept) = accept.map(str::trim).filter(|a| !a.is_empty()) else {
            return Self::default();
        };

        media_ranges(accept)
            .iter()
            .find_map(|range| Self::from_range(range, namespace))
            .unwrap_or_else(Self::unknown)
    }

    /// Like [`ApiMedia::negotiate`], but a lower-ranked range in `format`
    /// beats a higher-ranked one the caller cannot produce.
    pub fn negotiate_preferring(accept: Option<&str>, namespace: &str, format: MediaFormat) -> Self {
        let Some(accept) = accept.map(str::trim).filter(|a| !a.is_empty()) else {
            return Self::default();
        };

        let candidates: Vec<Self> = media_ranges(accept)
            .iter()
            .filter_map(|range| Self::from_range(range, namespace))
            .collect();

        candidates
            .iter()
            .find(|media| media.format == format)
            .or_else(|| candidates.first())
            .cloned()
            .unwrap_or_else(Self::unknown)
    }

    /// Interpret one media range. Vendor ranges for other namespaces, and
    /// versions too large to represent, are not recognised.
    fn from_range(range: &str, namespace: &str) -> Option<Self> {
        if let Some(caps) = VENDOR_MEDIA.captures(range) {
            if &caps["ns"] != namespace {
                return None;
            }
            let version = match caps.name("version") {
                Some(v) => v.as_str().parse().ok()?,
                None => API_VERSION,
            };
            let format = caps
                .name("format")
                .map(|f| MediaFormat::from_extension(f.as_str()))
                .unwrap_or(MediaFormat::Json);
            return Some(Self {
                format,
                version,
                param: caps.name("param").map(|p| p.as_str().to_string()),
            });
        }

        MediaFormat::from_mime(range).map(|format| Self {
            format,
            ..Self::default()
        })
    }

    fn unknown() -> Self {
        Self {
            format: MediaFormat::Unknown,
            ..Self::default()
        }
    }
}

/// Media ranges of an Accept header, lower-cased and stripped of parameters,
/// ordered by descending quality. Ties keep header order.
fn media_ranges(accept: &str) -> Vec<String> {
    let mut ranges: Vec<(f32, String)> = accept
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let mime = pieces.next()?.trim().to_ascii_lowercase();
            if mime.is_empty() {
                return None;
            }
            let quality = pieces
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then_some((quality, mime))
        })
        .collect();

    ranges.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranges.into_iter().map(|(_, mime)| mime).collect()
}
