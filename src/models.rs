//! Data models for blog posts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The content API sends `null` for empty text fields.
pub(crate) fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One entry of the listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A full post as shown on its own page.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDetail {
    pub uid: String,
    pub first_publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner: Banner,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default, deserialize_with = "null_to_default")]
    pub heading: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub body: Vec<RichTextNode>,
}

/// A single rich-text fragment, in the shape the content API emits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub oembed: Option<Embed>,
}

impl RichTextNode {
    pub fn paragraph(text: &str) -> Self {
        Self::text(NodeKind::Paragraph, text)
    }

    pub fn text(kind: NodeKind, text: &str) -> Self {
        RichTextNode {
            kind,
            text: Some(text.to_string()),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Other,
}

impl NodeKind {
    /// Heading level 1-6, if this is a heading.
    pub fn heading_level(self) -> Option<u8> {
        match self {
            NodeKind::Heading1 => Some(1),
            NodeKind::Heading2 => Some(2),
            NodeKind::Heading3 => Some(3),
            NodeKind::Heading4 => Some(4),
            NodeKind::Heading5 => Some(5),
            NodeKind::Heading6 => Some(6),
            _ => None,
        }
    }
}

/// Inline markup over `start..end`, counted in UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: Option<SpanData>,
}

impl Span {
    pub fn new(start: usize, end: usize, kind: SpanKind) -> Self {
        Span {
            start,
            end,
            kind,
            data: None,
        }
    }

    pub fn hyperlink(start: usize, end: usize, url: &str) -> Self {
        Span {
            start,
            end,
            kind: SpanKind::Hyperlink,
            data: Some(SpanData {
                url: Some(url.to_string()),
                ..SpanData::default()
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Where the listing continues. `next_page` is `None` once every page is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    pub next_page: Option<String>,
    pub page: u32,
}

impl PaginationCursor {
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq)]
pub struct PostPage {
    pub cursor: PaginationCursor,
    pub summaries: Vec<PostSummary>,
}
