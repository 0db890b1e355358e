//! Listing state with incremental "load more" pagination

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{PaginationCursor, PostPage, PostSummary};
use crate::source::PageFetcher;

/// Summaries shown so far plus the cursor to the next page.
///
/// The list only ever grows at the end, in the order pages arrive from the
/// API. At most one page fetch is outstanding at a time.
#[derive(Debug, Clone)]
pub struct Listing {
    posts: Vec<PostSummary>,
    cursor: PaginationCursor,
    in_flight: Option<u64>,
    next_token: u64,
}

/// Permission to fetch one page, handed out by [`Listing::begin_load`].
#[derive(Debug, PartialEq, Eq)]
pub struct LoadTicket {
    token: u64,
    url: String,
}

impl LoadTicket {
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum LoadStart {
    Ready(LoadTicket),
    /// No cursor: every page is already loaded.
    Exhausted,
    /// Another fetch has not resolved yet.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Appended(usize),
    Exhausted,
    Busy,
    /// The ticket no longer matches the outstanding fetch; nothing applied.
    Stale,
}

impl Listing {
    pub fn new(initial: PostPage) -> Self {
        Listing {
            posts: initial.summaries,
            cursor: initial.cursor,
            in_flight: None,
            next_token: 0,
        }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    pub fn current_page(&self) -> u32 {
        self.cursor.page
    }

    pub fn has_more(&self) -> bool {
        self.cursor.has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the "load more" control should be offered and enabled.
    pub fn can_load_more(&self) -> bool {
        self.has_more() && !self.is_loading()
    }

    /// Mark a fetch as outstanding and return the URL to fetch.
    pub fn begin_load(&mut self) -> LoadStart {
        let Some(url) = self.cursor.next_page.clone() else {
            return LoadStart::Exhausted;
        };
        if self.in_flight.is_some() {
            return LoadStart::Busy;
        }

        let token = self.next_token;
        self.next_token += 1;
        self.in_flight = Some(token);
        LoadStart::Ready(LoadTicket { token, url })
    }

    /// Apply the result of the fetch started with `ticket`.
    ///
    /// On error the list and cursor are left as they were and the error is
    /// returned so the caller can report it and offer a retry.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        fetched: Result<PostPage>,
    ) -> Result<LoadOutcome> {
        if self.in_flight != Some(ticket.token) {
            warn!("ignoring stale page response for {}", ticket.url);
            return Ok(LoadOutcome::Stale);
        }
        self.in_flight = None;

        let page = fetched?;
        let count = page.summaries.len();
        self.posts.extend(page.summaries);
        self.cursor = page.cursor;
        debug!(
            "appended {count} posts, now on page {} ({} total)",
            self.cursor.page,
            self.posts.len()
        );
        Ok(LoadOutcome::Appended(count))
    }

    /// Give up on the fetch started with `ticket` without touching the list.
    /// Returns false if the ticket was already stale.
    pub fn cancel_load(&mut self, ticket: LoadTicket) -> bool {
        if self.in_flight != Some(ticket.token) {
            return false;
        }
        debug!("cancelled page fetch for {}", ticket.url);
        self.in_flight = None;
        true
    }

    /// Fetch the next page, if any, and append it.
    ///
    /// Dropping the returned future before it completes cancels the fetch, so
    /// the listing does not stay busy.
    pub async fn load_more<F>(&mut self, fetcher: &F) -> Result<LoadOutcome>
    where
        F: PageFetcher + ?Sized,
    {
        let ticket = match self.begin_load() {
            LoadStart::Ready(ticket) => ticket,
            LoadStart::Exhausted => return Ok(LoadOutcome::Exhausted),
            LoadStart::Busy => return Ok(LoadOutcome::Busy),
        };
        let url = ticket.url.clone();
        let mut pending = PendingLoad {
            listing: self,
            ticket: Some(ticket),
        };
        let fetched = fetcher.fetch_page(&url).await;
        let ticket = pending.ticket.take();
        match ticket {
            Some(ticket) => pending.listing.finish_load(ticket, fetched),
            None => Ok(LoadOutcome::Stale),
        }
    }

    /// Keep loading until the cursor runs out. Returns how many posts were added.
    pub async fn load_all<F>(&mut self, fetcher: &F) -> Result<usize>
    where
        F: PageFetcher + ?Sized,
    {
        let mut added = 0;
        loop {
            match self.load_more(fetcher).await? {
                LoadOutcome::Appended(count) => added += count,
                LoadOutcome::Exhausted | LoadOutcome::Busy | LoadOutcome::Stale => {
                    return Ok(added)
                }
            }
        }
    }
}

/// Cancels the outstanding fetch if `load_more` is dropped mid-await.
struct PendingLoad<'a> {
    listing: &'a mut Listing,
    ticket: Option<LoadTicket>,
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.listing.cancel_load(ticket);
        }
    }
}
