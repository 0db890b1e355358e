//! Content-source seam: what the rest of the crate needs from the CMS.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PostDetail, PostPage};

/// Fetches one listing page from a cursor URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<PostPage>;
}

/// Queries against the headless content API.
#[async_trait]
pub trait ContentSource: PageFetcher {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// First page of summaries for `document_type`, `page_size` per page.
    async fn query_first_page(&self, document_type: &str, page_size: u32) -> Result<PostPage>;

    /// Every uid of `document_type`, across all pages.
    async fn query_all_identifiers(&self, document_type: &str) -> Result<Vec<String>>;

    /// The full document; `BlogError::NotFound` for an unknown uid.
    async fn get_by_identifier(&self, document_type: &str, uid: &str) -> Result<PostDetail>;
}
