//! Rendering of rich-text fragments to HTML and Markdown

use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::debug;

use crate::markdown::{escape_markdown, format_markdown_link};
use crate::models::{NodeKind, RichTextNode, Span, SpanKind};

/// How inline spans and plain text are written for one output format.
trait InlineMarkup {
    fn open(&self, span: &Span) -> String;
    fn close(&self, span: &Span) -> String;
    fn text(&self, raw: &str) -> String;
}

struct Html;

impl InlineMarkup for Html {
    fn open(&self, span: &Span) -> String {
        match span.kind {
            SpanKind::Strong => String::from("<strong>"),
            SpanKind::Em => String::from("<em>"),
            SpanKind::Hyperlink => {
                let data = span.data.as_ref();
                let url = data.and_then(|d| d.url.as_deref()).unwrap_or("#");
                match data.and_then(|d| d.target.as_deref()) {
                    Some(target) => format!(
                        "<a href=\"{}\" target=\"{}\" rel=\"noopener\">",
                        encode_double_quoted_attribute(url),
                        encode_double_quoted_attribute(target)
                    ),
                    None => format!("<a href=\"{}\">", encode_double_quoted_attribute(url)),
                }
            }
            SpanKind::Label => {
                let label = span
                    .data
                    .as_ref()
                    .and_then(|d| d.label.as_deref())
                    .unwrap_or_default();
                format!("<span class=\"{}\">", encode_double_quoted_attribute(label))
            }
            SpanKind::Other => String::from("<span>"),
        }
    }

    fn close(&self, span: &Span) -> String {
        match span.kind {
            SpanKind::Strong => String::from("</strong>"),
            SpanKind::Em => String::from("</em>"),
            SpanKind::Hyperlink => String::from("</a>"),
            SpanKind::Label | SpanKind::Other => String::from("</span>"),
        }
    }

    fn text(&self, raw: &str) -> String {
        encode_text(raw).replace('\n', "<br />")
    }
}

struct Markdown {
    single_line: bool,
}

const MARKDOWN_BLOCK: Markdown = Markdown { single_line: false };
const MARKDOWN_LINE: Markdown = Markdown { single_line: true };

impl InlineMarkup for Markdown {
    fn open(&self, span: &Span) -> String {
        match span.kind {
            SpanKind::Strong => String::from("**"),
            SpanKind::Em => String::from("_"),
            SpanKind::Hyperlink => String::from("["),
            SpanKind::Label | SpanKind::Other => String::new(),
        }
    }

    fn close(&self, span: &Span) -> String {
        match span.kind {
            SpanKind::Strong => String::from("**"),
            SpanKind::Em => String::from("_"),
            SpanKind::Hyperlink => {
                let url = span
                    .data
                    .as_ref()
                    .and_then(|d| d.url.as_deref())
                    .unwrap_or_default();
                format!("]({url})")
            }
            SpanKind::Label | SpanKind::Other => String::new(),
        }
    }

    fn text(&self, raw: &str) -> String {
        escape_markdown(raw, self.single_line)
    }
}

/// Apply `spans` to `text`. Span offsets are UTF-16 code units; spans that
/// overlap without nesting are closed and reopened so tags stay balanced.
fn render_inline(text: &str, spans: &[Span], markup: &dyn InlineMarkup) -> String {
    let mut order: Vec<&Span> = spans.iter().filter(|s| s.start < s.end).collect();
    order.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::new();
    let mut pending = String::new();
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;
    let mut pos = 0;

    let flush = |pending: &mut String, out: &mut String| {
        if !pending.is_empty() {
            out.push_str(&markup.text(pending));
            pending.clear();
        }
    };

    for c in text.chars() {
        let closing = open.iter().any(|s| s.end <= pos);
        let opening = order.get(next).is_some_and(|s| s.start <= pos);
        if closing || opening {
            flush(&mut pending, &mut out);
            close_ended(&mut open, pos, markup, &mut out);
            while let Some(span) = order.get(next).filter(|s| s.start <= pos) {
                if span.end > pos {
                    out.push_str(&markup.open(span));
                    open.push(*span);
                }
                next += 1;
            }
        }
        pending.push(c);
        pos += c.len_utf16();
    }

    flush(&mut pending, &mut out);
    while let Some(span) = open.pop() {
        out.push_str(&markup.close(span));
    }
    out
}

/// Close every open span ending at or before `pos`, reopening the ones
/// above it on the stack that are still running.
fn close_ended(open: &mut Vec<&Span>, pos: usize, markup: &dyn InlineMarkup, out: &mut String) {
    let Some(lowest) = open.iter().position(|s| s.end <= pos) else {
        return;
    };
    let popped: Vec<&Span> = open.drain(lowest..).collect();
    for span in popped.iter().rev() {
        out.push_str(&markup.close(span));
    }
    for span in popped {
        if span.end > pos {
            out.push_str(&markup.open(span));
            open.push(span);
        }
    }
}

fn inline(node: &RichTextNode, markup: &dyn InlineMarkup) -> String {
    render_inline(node.text.as_deref().unwrap_or_default(), &node.spans, markup)
}

/// Render fragments to HTML. Consecutive list items are grouped into one list.
pub fn as_html(nodes: &[RichTextNode]) -> String {
    let mut html = String::new();
    let mut list: Option<NodeKind> = None;

    for node in nodes {
        let is_item = matches!(node.kind, NodeKind::ListItem | NodeKind::OrderedListItem);
        if list.is_some() && list != Some(node.kind) {
            html.push_str(list_tag(list, true));
            list = None;
        }
        if is_item && list.is_none() {
            list = Some(node.kind);
            html.push_str(list_tag(list, false));
        }

        match node.kind {
            NodeKind::Paragraph => html.push_str(&format!("<p>{}</p>", inline(node, &Html))),
            NodeKind::Preformatted => {
                html.push_str(&format!("<pre>{}</pre>", inline(node, &Html)))
            }
            NodeKind::ListItem | NodeKind::OrderedListItem => {
                html.push_str(&format!("<li>{}</li>", inline(node, &Html)))
            }
            NodeKind::Image => {
                let src = node.url.as_deref().unwrap_or_default();
                let alt = node.alt.as_deref().unwrap_or_default();
                html.push_str(&format!(
                    "<p class=\"block-img\"><img src=\"{}\" alt=\"{}\" /></p>",
                    encode_double_quoted_attribute(src),
                    encode_double_quoted_attribute(alt)
                ));
            }
            NodeKind::Embed => {
                if let Some(embed) = &node.oembed {
                    let url = embed.embed_url.as_deref().unwrap_or_default();
                    html.push_str(&format!(
                        "<div data-oembed=\"{}\">{}</div>",
                        encode_double_quoted_attribute(url),
                        embed.html.as_deref().unwrap_or_default()
                    ));
                }
            }
            NodeKind::Other => match node.text {
                Some(_) => html.push_str(&format!("<p>{}</p>", inline(node, &Html))),
                None => debug!("skipping rich-text node without text"),
            },
            heading => {
                let level = heading.heading_level().unwrap_or(2);
                html.push_str(&format!("<h{level}>{}</h{level}>", inline(node, &Html)));
            }
        }
    }

    if list.is_some() {
        html.push_str(list_tag(list, true));
    }
    html
}

fn list_tag(kind: Option<NodeKind>, closing: bool) -> &'static str {
    match (kind, closing) {
        (Some(NodeKind::OrderedListItem), false) => "<ol>",
        (Some(NodeKind::OrderedListItem), true) => "</ol>",
        (_, false) => "<ul>",
        (_, true) => "</ul>",
    }
}

/// Render fragments to Markdown, one block per paragraph.
pub fn as_markdown(nodes: &[RichTextNode]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut item = String::new();
    let mut ordinal = 0;

    for node in nodes {
        let is_item = matches!(node.kind, NodeKind::ListItem | NodeKind::OrderedListItem);
        if !is_item && !item.is_empty() {
            blocks.push(item.trim_end().to_string());
            item.clear();
        }
        if node.kind != NodeKind::OrderedListItem {
            ordinal = 0;
        }

        match node.kind {
            NodeKind::ListItem => {
                item.push_str(&format!("- {}\n", inline(node, &MARKDOWN_LINE)));
            }
            NodeKind::OrderedListItem => {
                ordinal += 1;
                item.push_str(&format!("{ordinal}. {}\n", inline(node, &MARKDOWN_LINE)));
            }
            NodeKind::Preformatted => blocks.push(format!(
                "```\n{}\n```",
                node.text.as_deref().unwrap_or_default()
            )),
            NodeKind::Image => {
                let src = node.url.as_deref().unwrap_or_default();
                let alt = node.alt.as_deref().unwrap_or("Image");
                blocks.push(format!("![{}]({src})", escape_markdown(alt, true)));
            }
            NodeKind::Embed => {
                if let Some(embed) = &node.oembed {
                    if let Some(url) = embed.embed_url.as_deref() {
                        let mut link = String::new();
                        format_markdown_link(&mut link, url, embed.title.as_deref().unwrap_or(""));
                        blocks.push(link);
                    }
                }
            }
            NodeKind::Paragraph | NodeKind::Other => {
                if node.text.is_some() {
                    blocks.push(inline(node, &MARKDOWN_BLOCK));
                }
            }
            heading => {
                let level = heading.heading_level().unwrap_or(2) as usize;
                blocks.push(format!("{} {}", "#".repeat(level), inline(node, &MARKDOWN_LINE)));
            }
        }
    }

    if !item.is_empty() {
        blocks.push(item.trim_end().to_string());
    }
    blocks.join("\n\n")
}
