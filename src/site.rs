//! Static site generation and Markdown export

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use tracing::{debug, info, warn};

use crate::config::SiteConfig;
use crate::error::{BlogError, Result};
use crate::listing::{Listing, LoadOutcome};
use crate::markdown::{generate_markdown, markdown_file_name};
use crate::render::{listing_page_href, render_listing, render_not_found, render_post};
use crate::source::ContentSource;
use crate::utils::page_file_stem;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Summaries across all listing pages.
    pub listed: usize,
    /// Listing pages written, `index.html` included.
    pub listing_pages: usize,
    /// Post pages written.
    pub pages: usize,
    /// Identifiers the source listed but could not return.
    pub missing: Vec<String>,
    /// Stale post pages removed.
    pub pruned: usize,
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    debug!("writing {}", path.display());
    fs::write(path, contents)?;
    Ok(())
}

/// Build the listing pages, `404.html` and one `post/<uid>.html` per document.
///
/// `index.html` shows the first page. Each "load more" link leads to
/// `page/<n>.html`, which shows everything accumulated after loading page
/// `n`, so the last listing page holds every post.
pub async fn build_site<S>(source: &S, config: &SiteConfig) -> Result<BuildReport>
where
    S: ContentSource + ?Sized,
{
    let out = &config.output_dir;
    let post_dir = out.join("post");
    fs::create_dir_all(&post_dir)?;
    info!("building site from {} into {}", source.name(), out.display());

    let mut report = BuildReport::default();

    let first = source
        .query_first_page(&config.document_type, config.page_size)
        .await?;
    let mut listing = Listing::new(first);
    report.listing_pages = write_listing_pages(source, &mut listing, config).await?;
    report.listed = listing.posts().len();
    write_file(&out.join("404.html"), &render_not_found(config.locale))?;

    let uids = source.query_all_identifiers(&config.document_type).await?;
    let mut kept = HashSet::new();
    for uid in &uids {
        match source.get_by_identifier(&config.document_type, uid).await {
            Ok(post) => {
                let stem = page_file_stem(&post.uid);
                write_file(
                    &post_dir.join(format!("{stem}.html")),
                    &render_post(&post, config.locale),
                )?;
                kept.insert(stem);
                report.pages += 1;
            }
            Err(e) if e.is_not_found() => {
                warn!("{e}, skipping");
                report.missing.push(uid.clone());
            }
            Err(e) => return Err(e),
        }
    }

    report.pruned = prune_stale_pages(&post_dir, &kept)?;
    info!(
        "built {} post pages ({} listed, {} pruned)",
        report.pages, report.listed, report.pruned
    );
    Ok(report)
}

/// Write `index.html` and `page/<n>.html`, loading one more page of the
/// listing between writes. Returns the number of listing pages written.
async fn write_listing_pages<S>(
    source: &S,
    listing: &mut Listing,
    config: &SiteConfig,
) -> Result<usize>
where
    S: ContentSource + ?Sized,
{
    let out = &config.output_dir;
    let page_dir = out.join("page");
    fs::create_dir_all(&page_dir)?;

    let mut number = 1;
    let mut kept = HashSet::new();
    loop {
        let root = if number == 1 { "" } else { "../" };
        let next_href = listing
            .has_more()
            .then(|| format!("{root}{}", listing_page_href(number + 1)));
        let html = render_listing(listing, config.locale, root, next_href.as_deref());
        write_file(&out.join(listing_page_href(number)), &html)?;
        if number > 1 {
            kept.insert(number.to_string());
        }

        match listing.load_more(source).await? {
            LoadOutcome::Appended(_) => number += 1,
            LoadOutcome::Exhausted | LoadOutcome::Busy | LoadOutcome::Stale => break,
        }
    }

    let pruned = prune_stale_pages(&page_dir, &kept)?;
    debug!("wrote {number} listing pages, pruned {pruned}");
    Ok(number)
}

/// Remove `*.html` files in `dir` whose stem is not in `keep`.
pub fn prune_stale_pages(dir: &Path, keep: &HashSet<String>) -> Result<usize> {
    let pattern = format!("{}/*.html", Pattern::escape(&dir.to_string_lossy()));
    let entries = glob(&pattern).map_err(|e| BlogError::Config(e.to_string()))?;

    let mut removed = 0;
    for entry in entries {
        let path: PathBuf = entry.map_err(|e| BlogError::Io(e.into()))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if !keep.contains(stem) {
            info!("removing stale page {}", path.display());
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Write every post as Markdown into `dir`. Returns the number of files written.
pub async fn export_markdown<S>(source: &S, config: &SiteConfig, dir: &Path) -> Result<usize>
where
    S: ContentSource + ?Sized,
{
    fs::create_dir_all(dir)?;
    let uids = source.query_all_identifiers(&config.document_type).await?;

    let mut written = 0;
    for uid in &uids {
        let post = match source.get_by_identifier(&config.document_type, uid).await {
            Ok(post) => post,
            Err(e) if e.is_not_found() => {
                warn!("{e}, skipping");
                continue;
            }
            Err(e) => return Err(e),
        };
        write_file(&dir.join(markdown_file_name(&post)), &generate_markdown(&post))?;
        written += 1;
    }

    info!("exported {written} posts to {}", dir.display());
    Ok(written)
}
