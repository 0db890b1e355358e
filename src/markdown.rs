//! Markdown generation from post data

use crate::models::PostDetail;
use crate::read_time::estimate_read_time;
use crate::richtext::as_markdown;
use crate::utils::{escape_toml_string, page_file_stem};

/// Format a link as Markdown, adding spacing if needed
/// - If link text equals URL (or is empty), uses angle bracket syntax: <URL>
/// - Otherwise uses full Markdown syntax: [text](URL)
/// - Adds space before link if text buffer doesn't end with whitespace
pub fn format_markdown_link(text: &mut String, href: &str, link_text: &str) {
    if !text.is_empty() && !text.ends_with(|c: char| c.is_whitespace()) {
        text.push(' ');
    }
    if link_text.is_empty() || link_text == href {
        text.push('<');
        text.push_str(href);
        text.push('>');
    } else {
        text.push('[');
        text.push_str(link_text);
        text.push_str("](");
        text.push_str(href);
        text.push(')');
    }
}

/// Backslash-escape characters Markdown would read as markup. With
/// `single_line`, newlines become spaces so headings and list items stay on
/// one line.
pub fn escape_markdown(text: &str, single_line: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut line_start = true;
    for c in text.chars() {
        let c = if single_line && c == '\n' { ' ' } else { c };
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '|' => escaped.push('\\'),
            '#' | '-' | '+' if line_start => escaped.push('\\'),
            _ => {}
        }
        escaped.push(c);
        line_start = c == '\n';
    }
    escaped
}

/// File name for an exported post: "YYYY-MM-DD-uid.md", or "uid.md" when
/// the post has no publication date.
pub fn markdown_file_name(post: &PostDetail) -> String {
    let stem = page_file_stem(&post.uid);
    match &post.first_publication_date {
        Some(date) => format!("{}-{}.md", date.format("%Y-%m-%d"), stem),
        None => format!("{stem}.md"),
    }
}

/// Generate markdown with TOML front matter from a post
pub fn generate_markdown(post: &PostDetail) -> String {
    let mut markdown = String::new();

    markdown.push_str("+++\n");

    let title = if !post.title.is_empty() {
        escape_toml_string(&post.title)
    } else {
        escape_toml_string(&post.uid)
    };
    markdown.push_str(&format!("title = \"{}\"\n", title));

    match &post.first_publication_date {
        Some(date) => markdown.push_str(&format!(
            "date = \"{}\"\n",
            date.format("%Y-%m-%dT%H:%M:%SZ")
        )),
        None => markdown.push_str("date = \"\"\n"),
    }

    markdown.push_str("draft = false\n");
    markdown.push_str(&format!(
        "description = \"{}\"\n",
        escape_toml_string(&post.subtitle)
    ));

    if !post.author.is_empty() {
        markdown.push_str(&format!(
            "author = \"{}\"\n",
            escape_toml_string(&post.author)
        ));
    }
    markdown.push_str(&format!(
        "readingTime = {}\n",
        estimate_read_time(&post.content)
    ));

    match &post.banner.url {
        Some(url) => {
            markdown.push_str(&format!("cover.image = \"{}\"\n", escape_toml_string(url)));
            markdown.push_str("cover.hidden = false\n");
        }
        None => markdown.push_str("cover.hidden = true\n"),
    }
    markdown.push_str("+++\n\n");

    for block in &post.content {
        if !block.heading.is_empty() {
            markdown.push_str(&format!("## {}\n\n", escape_markdown(&block.heading, true)));
        }
        let body = as_markdown(&block.body);
        if !body.is_empty() {
            markdown.push_str(&body);
            markdown.push_str("\n\n");
        }
    }

    format!("{}\n", markdown.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Banner, ContentBlock, RichTextNode};
    use crate::utils::parse_publication_date;

    fn post() -> PostDetail {
        PostDetail {
            uid: "como-utilizar-hooks".to_string(),
            first_publication_date: parse_publication_date("2021-03-15T19:25:28+0000"),
            title: "Como utilizar \"Hooks\"".to_string(),
            subtitle: "Pensando em sincronização".to_string(),
            author: "Joseph Oliveira".to_string(),
            banner: Banner {
                url: Some("https://images.prismic.io/banner.png".to_string()),
                alt: None,
            },
            content: vec![
                ContentBlock {
                    heading: "Proin et varius".to_string(),
                    body: vec![
                        RichTextNode::paragraph("Lorem ipsum dolor"),
                        RichTextNode::paragraph("Nullam dolor sapien"),
                    ],
                },
                ContentBlock {
                    heading: "Cras laoreet".to_string(),
                    body: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn test_generate_markdown_front_matter() {
        let md = generate_markdown(&post());
        assert!(md.starts_with("+++\ntitle = \"Como utilizar \\\"Hooks\\\"\"\n"));
        assert!(md.contains("date = \"2021-03-15T19:25:28Z\"\n"));
        assert!(md.contains("description = \"Pensando em sincronização\"\n"));
        assert!(md.contains("author = \"Joseph Oliveira\"\n"));
        assert!(md.contains("readingTime = 1\n"));
        assert!(md.contains("cover.image = \"https://images.prismic.io/banner.png\"\n"));
    }

    #[test]
    fn test_generate_markdown_body() {
        let md = generate_markdown(&post());
        assert!(md.contains(
            "+++\n\n## Proin et varius\n\nLorem ipsum dolor\n\nNullam dolor sapien\n\n## Cras laoreet\n"
        ));
        assert!(md.ends_with("## Cras laoreet\n"));
    }

    #[test]
    fn test_generate_markdown_missing_fields() {
        let mut post = post();
        post.title.clear();
        post.author.clear();
        post.first_publication_date = None;
        post.banner = Banner::default();
        post.content.clear();

        let md = generate_markdown(&post);
        assert!(md.contains("title = \"como-utilizar-hooks\"\n"));
        assert!(md.contains("date = \"\"\n"));
        assert!(!md.contains("author ="));
        assert!(md.contains("readingTime = 0\n"));
        assert!(md.ends_with("cover.hidden = true\n+++\n"));
    }

    #[test]
    fn test_generate_markdown_escapes_heading() {
        let mut post = post();
        post.content[0].heading = "Use *args* e\n# não_isso".to_string();
        let md = generate_markdown(&post);
        assert!(md.contains("## Use \\*args\\* e # não\\_isso\n\n"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a [b](c) `d`", false), "a \\[b\\](c) \\`d\\`");
        assert_eq!(escape_markdown("# x\n- y", false), "\\# x\n\\- y");
        assert_eq!(escape_markdown("a-b #1", false), "a-b #1");
        assert_eq!(escape_markdown("one\ntwo", true), "one two");
    }

    #[test]
    fn test_markdown_file_name() {
        let mut post = post();
        assert_eq!(markdown_file_name(&post), "2021-03-15-como-utilizar-hooks.md");
        post.first_publication_date = None;
        assert_eq!(markdown_file_name(&post), "como-utilizar-hooks.md");
    }

    // Tests for format_markdown_link()
    #[test]
    fn test_format_markdown_link_url_equals_text() {
        let mut text = String::from("Watch:");
        format_markdown_link(&mut text, "https://youtu.be/x", "https://youtu.be/x");
        assert_eq!(text, "Watch: <https://youtu.be/x>");
    }

    #[test]
    fn test_format_markdown_link_different_text() {
        let mut text = String::new();
        format_markdown_link(&mut text, "https://youtu.be/x", "Demo");
        assert_eq!(text, "[Demo](https://youtu.be/x)");
    }

    #[test]
    fn test_format_markdown_link_no_double_space() {
        let mut text = String::from("See ");
        format_markdown_link(&mut text, "https://youtu.be/x", "");
        assert_eq!(text, "See <https://youtu.be/x>");
    }
}
