//! HTML views: the listing page and the post page

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::listing::Listing;
use crate::models::{PostDetail, PostSummary};
use crate::read_time::estimate_read_time;
use crate::richtext::as_html;
use crate::utils::{format_publication_date, page_file_stem, Locale};

const SITE_NAME: &str = "spacetraveling";
const LOAD_MORE_LABEL: &str = "Carregar mais posts";
const LOADING_LABEL: &str = "Carregando...";

/// Link to a post page, relative to the site root.
pub fn post_href(uid: &str) -> String {
    format!("post/{}.html", page_file_stem(uid))
}

/// Listing page `number`, relative to the site root. Page 1 is the index.
pub fn listing_page_href(number: usize) -> String {
    if number <= 1 {
        "index.html".to_string()
    } else {
        format!("page/{number}.html")
    }
}

/// Wrap `body` in a full HTML document. `root` is the relative path back to
/// the site root ("" for the index, "../" for post pages).
fn document(locale: Locale, title: &str, root: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"{lang}\">\n\
         <head>\n\
         <meta charset=\"utf-8\" />\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n\
         <title>{title}</title>\n\
         <link rel=\"stylesheet\" href=\"{root}styles.css\" />\n\
         </head>\n\
         <body>\n\
         <header class=\"header\"><a href=\"{root}index.html\"><img src=\"{root}logo.svg\" alt=\"logo\" /></a></header>\n\
         {body}\n\
         </body>\n\
         </html>\n",
        lang = locale.tag(),
        title = encode_text(title),
        root = root,
        body = body,
    )
}

fn summary_item(post: &PostSummary, locale: Locale, root: &str) -> String {
    format!(
        "<a class=\"post\" href=\"{href}\">\
         <h1>{title}</h1>\
         <h2>{subtitle}</h2>\
         <div class=\"info\"><time>{date}</time><span class=\"author\">{author}</span></div>\
         </a>",
        href = encode_double_quoted_attribute(&format!("{root}{}", post_href(&post.uid))),
        title = encode_text(&post.title),
        subtitle = encode_text(&post.subtitle),
        date = format_publication_date(post.first_publication_date.as_ref(), locale),
        author = encode_text(&post.author),
    )
}

/// The "load more" control, present only while a next page exists.
///
/// With `next_href` it is a link to the listing page that holds the next
/// batch; without one it is a button carrying the cursor URL.
fn load_more_control(listing: &Listing, next_href: Option<&str>) -> String {
    let Some(next) = &listing.cursor().next_page else {
        return String::new();
    };
    let next = encode_double_quoted_attribute(next);
    if listing.is_loading() {
        return format!(
            "<button type=\"button\" class=\"load-more\" data-next-page=\"{next}\" disabled>{LOADING_LABEL}</button>"
        );
    }
    match next_href {
        Some(href) => format!(
            "<a class=\"load-more\" href=\"{}\" data-next-page=\"{next}\">{LOAD_MORE_LABEL}</a>",
            encode_double_quoted_attribute(href)
        ),
        None => format!(
            "<button type=\"button\" class=\"load-more\" data-next-page=\"{next}\">{LOAD_MORE_LABEL}</button>"
        ),
    }
}

/// Render the listing page for everything accumulated so far.
///
/// `root` is the relative path back to the site root and `next_href` the
/// page the "load more" control links to.
pub fn render_listing(
    listing: &Listing,
    locale: Locale,
    root: &str,
    next_href: Option<&str>,
) -> String {
    let items: Vec<String> = listing
        .posts()
        .iter()
        .map(|post| summary_item(post, locale, root))
        .collect();

    let body = format!(
        "<main class=\"container\">\n{}\n{}\n</main>",
        items.join("\n"),
        load_more_control(listing, next_href)
    );
    document(locale, SITE_NAME, root, &body)
}

/// Render a post page, including the estimated read time.
pub fn render_post(post: &PostDetail, locale: Locale) -> String {
    let banner = match &post.banner.url {
        Some(url) => format!(
            "<img class=\"banner\" src=\"{}\" alt=\"{}\" />\n",
            encode_double_quoted_attribute(url),
            encode_double_quoted_attribute(post.banner.alt.as_deref().unwrap_or("imagem banner"))
        ),
        None => String::new(),
    };

    let articles: Vec<String> = post
        .content
        .iter()
        .map(|block| {
            format!(
                "<article><h2>{}</h2><div class=\"post-content\">{}</div></article>",
                encode_text(&block.heading),
                as_html(&block.body)
            )
        })
        .collect();

    let body = format!(
        "{banner}<main class=\"container\">\n\
         <div class=\"post\">\n\
         <h1>{title}</h1>\n\
         <ul class=\"info\"><li><time>{date}</time></li><li>{author}</li><li>{minutes} min</li></ul>\n\
         </div>\n\
         {articles}\n\
         </main>",
        title = encode_text(&post.title),
        date = format_publication_date(post.first_publication_date.as_ref(), locale),
        author = encode_text(&post.author),
        minutes = estimate_read_time(&post.content),
        articles = articles.join("\n"),
    );
    document(locale, &post.title, "../", &body)
}

/// Page served for identifiers the content source does not know.
pub fn render_not_found(locale: Locale) -> String {
    document(
        locale,
        SITE_NAME,
        "",
        "<main class=\"container\"><h1>Post não encontrado</h1><a href=\"index.html\">Voltar</a></main>",
    )
}

/// One line per listing entry, for terminal output.
pub fn summary_line(post: &PostSummary, locale: Locale) -> String {
    format!(
        "{} | {} | {} — {}",
        format_publication_date(post.first_publication_date.as_ref(), locale),
        post.author,
        post.title,
        post.subtitle
    )
}
