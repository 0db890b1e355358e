//! Blog front-end over a headless content API: paginated listing, post pages
//! with read time, static HTML generation and Markdown export.

pub mod config;
pub mod error;
pub mod listing;
pub mod markdown;
pub mod models;
pub mod prismic;
pub mod read_time;
pub mod render;
pub mod richtext;
pub mod site;
pub mod source;
pub mod utils;

// Re-export main types and functions for convenient access
pub use config::SiteConfig;
pub use error::{BlogError, Result};
pub use listing::{Listing, LoadOutcome};
pub use models::{ContentBlock, PaginationCursor, PostDetail, PostPage, PostSummary};
pub use prismic::PrismicClient;
pub use read_time::estimate_read_time;
pub use source::{ContentSource, PageFetcher};
pub use utils::format_publication_date;
