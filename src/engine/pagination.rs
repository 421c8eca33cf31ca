//! Pagination engine
//!
//! Turns a "fetch one page" callback into a single lazy, forward-only
//! sequence of items. Two continuation styles are supported:
//!
//! - page-based: `?page=N&per_page=M`, continuing while `page < total_pages`,
//!   or, for endpoints whose `total_pages` is always zero, while pages come
//!   back full
//! - cursor-based: `?cursor=...`, continuing while a non-empty cursor is
//!   returned
//!
//! Exactly one round trip is made per page, and cancellation is checked
//! before each one.

use crate::api::envelope::ResultInfo;
use crate::engine::metrics::Metrics;
use crate::error::{Error, ListError, ListFailure};
use futures::future::BoxFuture;
use futures::Stream;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

/// Page size used when the caller does not pick one
pub const DEFAULT_PER_PAGE: u32 = 50;

/// What to ask the server for next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    Page { page: u32, per_page: u32 },
    Cursor { cursor: Option<String>, per_page: u32 },
}

impl PageRequest {
    pub fn per_page(&self) -> u32 {
        match self {
            Self::Page { per_page, .. } | Self::Cursor { per_page, .. } => *per_page,
        }
    }

    /// Query parameters for this request
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Page { page, per_page } => vec![
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
            Self::Cursor { cursor, per_page } => {
                let mut query = vec![("per_page", per_page.to_string())];
                if let Some(cursor) = cursor {
                    query.push(("cursor", cursor.clone()));
                }
                query
            }
        }
    }
}

/// Continuation metadata returned with a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageInfo {
    Numbered {
        page: u32,
        per_page: u32,
        count: u32,
        total_count: u64,
        total_pages: u32,
    },
    Cursor {
        count: u32,
        per_page: u32,
        cursor: Option<String>,
    },
}

impl PageInfo {
    /// Read page-based metadata; absent fields count as zero
    pub fn numbered(info: &ResultInfo) -> Self {
        Self::Numbered {
            page: info.page.unwrap_or(0),
            per_page: info.per_page.unwrap_or(0),
            count: info.count.unwrap_or(0),
            total_count: info.total_count.unwrap_or(0),
            total_pages: info.total_pages.unwrap_or(0),
        }
    }

    pub fn cursor(info: &ResultInfo) -> Self {
        Self::Cursor {
            count: info.count.unwrap_or(0),
            per_page: info.per_page.unwrap_or(0),
            cursor: info.cursor.clone(),
        }
    }
}

/// One fetched page and what it cost
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: Option<PageInfo>,
    pub metrics: Metrics,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, info: Option<PageInfo>) -> Self {
        Self {
            items,
            info,
            metrics: Metrics::ZERO,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Whether an endpoint's `total_pages` can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotalPages {
    #[default]
    Reliable,
    /// `total_pages`/`total_count` are always reported as zero; infer the end
    /// from a short page instead
    Unreliable,
}

/// A fully drained listing
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub metrics: Metrics,
}

pub type FetchFuture<'a, T> = BoxFuture<'a, Result<Page<T>, Error>>;

type FetchPage<'a, T> = Box<dyn FnMut(PageRequest) -> FetchFuture<'a, T> + Send + 'a>;

enum Continuation {
    Page { next: u32, totals: TotalPages },
    Cursor { next: Option<String> },
}

/// Lazy sequence of items spread across pages
///
/// Not restartable: once it returns `None` or an error, it stays finished.
pub struct Paginated<'a, T> {
    continuation: Continuation,
    per_page: u32,
    cancel: CancellationToken,
    fetch: FetchPage<'a, T>,
    buffer: VecDeque<T>,
    yielded: Vec<T>,
    metrics: Metrics,
    pages_fetched: u32,
    done: bool,
}

impl<'a, T> Paginated<'a, T> {
    /// Page-number traversal starting at page 1
    pub fn page_based<F>(
        per_page: u32,
        totals: TotalPages,
        cancel: CancellationToken,
        fetch: F,
    ) -> Self
    where
        F: FnMut(PageRequest) -> FetchFuture<'a, T> + Send + 'a,
    {
        Self::new(Continuation::Page { next: 1, totals }, per_page, cancel, Box::new(fetch))
    }

    /// Cursor traversal starting without a cursor
    pub fn cursor_based<F>(per_page: u32, cancel: CancellationToken, fetch: F) -> Self
    where
        F: FnMut(PageRequest) -> FetchFuture<'a, T> + Send + 'a,
    {
        Self::new(Continuation::Cursor { next: None }, per_page, cancel, Box::new(fetch))
    }

    fn new(
        continuation: Continuation,
        per_page: u32,
        cancel: CancellationToken,
        fetch: FetchPage<'a, T>,
    ) -> Self {
        Self {
            continuation,
            per_page: per_page.max(1),
            cancel,
            fetch,
            buffer: VecDeque::new(),
            yielded: Vec::new(),
            metrics: Metrics::ZERO,
            pages_fetched: 0,
            done: false,
        }
    }

    /// Metrics accrued by the pages fetched so far
    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    fn request(&self) -> PageRequest {
        match &self.continuation {
            Continuation::Page { next, .. } => PageRequest::Page {
                page: *next,
                per_page: self.per_page,
            },
            Continuation::Cursor { next } => PageRequest::Cursor {
                cursor: next.clone(),
                per_page: self.per_page,
            },
        }
    }

    /// Fetch the next page into the buffer
    ///
    /// Returns `Ok(false)` once the listing is exhausted.
    async fn fetch_next(&mut self) -> Result<bool, ListError<T>> {
        if self.done {
            return Ok(false);
        }

        if self.cancel.is_cancelled() {
            tracing::debug!("Listing cancelled after {} pages", self.pages_fetched);
            self.done = true;
            return Err(ListError::Cancelled);
        }

        let request = self.request();
        tracing::debug!("Fetching page: {:?}", request);

        let page = match (self.fetch)(request).await {
            Ok(page) => page,
            Err(cause) => {
                self.done = true;
                let data = std::mem::take(&mut self.yielded);
                tracing::warn!(
                    "Listing failed after {} pages and {} items: {}",
                    self.pages_fetched,
                    data.len(),
                    cause
                );
                return Err(ListError::Partial(ListFailure {
                    message: format!(
                        "Listing failed after {} items: {}",
                        data.len(),
                        cause
                    ),
                    data,
                    metrics: self.metrics,
                    cause,
                }));
            }
        };

        self.pages_fetched += 1;
        self.metrics = self.metrics.merge(page.metrics);

        let count = page.items.len();
        let more = self.advance(count, page.info);
        self.done = !more;
        self.buffer.extend(page.items);

        Ok(true)
    }

    /// Move the continuation forward; returns whether another page may exist
    fn advance(&mut self, count: usize, info: Option<PageInfo>) -> bool {
        let per_page = self.per_page;
        match &mut self.continuation {
            Continuation::Page { next, totals } => {
                if count == 0 {
                    return false;
                }
                let current = *next;
                *next += 1;
                match totals {
                    TotalPages::Reliable => {
                        let total_pages = match info {
                            Some(PageInfo::Numbered { total_pages, .. }) => total_pages,
                            _ => 0,
                        };
                        current < total_pages
                    }
                    TotalPages::Unreliable => count >= per_page as usize,
                }
            }
            Continuation::Cursor { next } => {
                let cursor = match info {
                    Some(PageInfo::Cursor { cursor, .. }) => cursor,
                    _ => None,
                };
                match cursor {
                    Some(cursor) if !cursor.is_empty() => {
                        if next.as_deref() == Some(cursor.as_str()) {
                            tracing::warn!("Server repeated cursor {}, stopping", cursor);
                            return false;
                        }
                        *next = Some(cursor);
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    /// Drain every remaining page
    pub async fn collect(mut self) -> Result<Listing<T>, ListError<T>> {
        loop {
            self.yielded.extend(self.buffer.drain(..));
            if !self.fetch_next().await? {
                break;
            }
        }
        Ok(Listing {
            items: self.yielded,
            metrics: self.metrics,
        })
    }
}

impl<'a, T: Clone> Paginated<'a, T> {
    /// Next item, fetching a new page when the current one is used up
    ///
    /// A clone of every returned item is retained until the listing ends so
    /// that a later failure can hand back everything already yielded. Memory
    /// therefore grows with the whole listing; for very long listings prefer
    /// bounded processing (a filter or prefix per call) over draining it all.
    pub async fn next(&mut self) -> Option<Result<T, ListError<T>>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                self.yielded.push(item.clone());
                return Some(Ok(item));
            }
            match self.fetch_next().await {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<'a, T: Clone + Send + 'a> Paginated<'a, T> {
    /// Adapt into a [`futures::Stream`]
    ///
    /// Retains yielded items the same way as [`Paginated::next`].
    pub fn into_stream(self) -> impl Stream<Item = Result<T, ListError<T>>> + Send + 'a {
        futures::stream::unfold(self, |mut pages| async move {
            pages.next().await.map(|item| (item, pages))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{FutureExt, StreamExt};
    use std::sync::{Arc, Mutex};

    /// Scripted page source recording every request it receives
    #[derive(Clone, Default)]
    struct Script {
        pages: Arc<Mutex<VecDeque<Result<Page<u32>, Error>>>>,
        requests: Arc<Mutex<Vec<PageRequest>>>,
    }

    impl Script {
        fn new(pages: Vec<Result<Page<u32>, Error>>) -> Self {
            Self {
                pages: Arc::new(Mutex::new(pages.into())),
                requests: Arc::default(),
            }
        }

        fn fetcher(&self) -> impl FnMut(PageRequest) -> FetchFuture<'static, u32> + Send {
            let script = self.clone();
            move |request| {
                let script = script.clone();
                async move {
                    script.requests.lock().unwrap().push(request);
                    script
                        .pages
                        .lock()
                        .unwrap()
                        .pop_front()
                        .expect("fetched more pages than scripted")
                }
                .boxed()
            }
        }

        fn requests(&self) -> Vec<PageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn numbered(items: std::ops::Range<u32>, page: u32, total_pages: u32) -> Result<Page<u32>, Error> {
        let items: Vec<u32> = items.collect();
        let info = PageInfo::Numbered {
            page,
            per_page: 100,
            count: items.len() as u32,
            total_count: 0,
            total_pages,
        };
        Ok(Page::new(items, Some(info)).with_metrics(Metrics::class_a(1)))
    }

    fn cursor_page(items: std::ops::Range<u32>, cursor: Option<&str>) -> Result<Page<u32>, Error> {
        let items: Vec<u32> = items.collect();
        let info = PageInfo::Cursor {
            count: items.len() as u32,
            per_page: 10,
            cursor: cursor.map(str::to_string),
        };
        Ok(Page::new(items, Some(info)).with_metrics(Metrics::class_a(1)))
    }

    #[tokio::test]
    async fn test_reliable_totals_stop_at_last_page() {
        let script = Script::new(vec![
            numbered(0..2, 1, 3),
            numbered(2..4, 2, 3),
            numbered(4..5, 3, 3),
        ]);
        let pages = Paginated::page_based(
            2,
            TotalPages::Reliable,
            CancellationToken::new(),
            script.fetcher(),
        );

        let listing = pages.collect().await.unwrap();
        assert_eq!(listing.items, vec![0, 1, 2, 3, 4]);
        assert_eq!(listing.metrics, Metrics::class_a(3));
        assert_eq!(
            script.requests(),
            vec![
                PageRequest::Page { page: 1, per_page: 2 },
                PageRequest::Page { page: 2, per_page: 2 },
                PageRequest::Page { page: 3, per_page: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_unreliable_totals_full_page_fetches_again() {
        let script = Script::new(vec![numbered(0..100, 1, 0), numbered(100..137, 2, 0)]);
        let pages = Paginated::page_based(
            100,
            TotalPages::Unreliable,
            CancellationToken::new(),
            script.fetcher(),
        );

        let listing = pages.collect().await.unwrap();
        assert_eq!(listing.items.len(), 137);
        assert_eq!(script.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_unreliable_totals_short_page_stops() {
        let script = Script::new(vec![numbered(0..37, 1, 0)]);
        let mut pages = Paginated::page_based(
            100,
            TotalPages::Unreliable,
            CancellationToken::new(),
            script.fetcher(),
        );

        let mut seen = 0;
        while let Some(item) = pages.next().await {
            item.unwrap();
            seen += 1;
        }
        assert_eq!(seen, 37);
        assert_eq!(pages.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_reliable_zero_total_pages_stops() {
        let script = Script::new(vec![numbered(0..5, 1, 0)]);
        let pages = Paginated::page_based(
            5,
            TotalPages::Reliable,
            CancellationToken::new(),
            script.fetcher(),
        );
        assert_eq!(pages.collect().await.unwrap().items.len(), 5);
        assert_eq!(script.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_numbered_page_ends_listing() {
        let script = Script::new(vec![numbered(0..0, 1, 9)]);
        let pages = Paginated::page_based(
            10,
            TotalPages::Reliable,
            CancellationToken::new(),
            script.fetcher(),
        );
        let listing = pages.collect().await.unwrap();
        assert!(listing.items.is_empty());
        assert_eq!(listing.metrics, Metrics::class_a(1));
    }

    #[tokio::test]
    async fn test_empty_cursor_page_with_cursor_continues() {
        let script = Script::new(vec![cursor_page(0..0, Some("next")), cursor_page(1..3, None)]);
        let pages = Paginated::cursor_based(2, CancellationToken::new(), script.fetcher());

        let listing = pages.collect().await.unwrap();
        assert_eq!(listing.items, vec![1, 2]);
        assert_eq!(listing.metrics, Metrics::class_a(2));
        assert_eq!(
            script.requests(),
            vec![
                PageRequest::Cursor { cursor: None, per_page: 2 },
                PageRequest::Cursor { cursor: Some("next".to_string()), per_page: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_cursor_page_without_cursor_ends_listing() {
        let script = Script::new(vec![cursor_page(0..0, None)]);
        let pages = Paginated::cursor_based(2, CancellationToken::new(), script.fetcher());
        assert!(pages.collect().await.unwrap().items.is_empty());
        assert_eq!(script.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cursor_passed_to_next_fetch() {
        let script = Script::new(vec![cursor_page(0..3, Some("abc")), cursor_page(3..4, None)]);
        let pages = Paginated::cursor_based(3, CancellationToken::new(), script.fetcher());

        let listing = pages.collect().await.unwrap();
        assert_eq!(listing.items, vec![0, 1, 2, 3]);
        assert_eq!(
            script.requests(),
            vec![
                PageRequest::Cursor { cursor: None, per_page: 3 },
                PageRequest::Cursor { cursor: Some("abc".to_string()), per_page: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_cursor_ends_listing() {
        let script = Script::new(vec![cursor_page(0..2, Some(""))]);
        let pages = Paginated::cursor_based(2, CancellationToken::new(), script.fetcher());
        assert_eq!(pages.collect().await.unwrap().items, vec![0, 1]);
        assert_eq!(script.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_cursor_stops() {
        let script = Script::new(vec![cursor_page(0..2, Some("same")), cursor_page(2..4, Some("same"))]);
        let pages = Paginated::cursor_based(2, CancellationToken::new(), script.fetcher());
        assert_eq!(pages.collect().await.unwrap().items, vec![0, 1, 2, 3]);
        assert_eq!(script.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_earlier_pages() {
        let script = Script::new(vec![
            numbered(0..10, 1, 3),
            Err(Error::transport("connection reset")),
        ]);
        let mut pages = Paginated::page_based(
            10,
            TotalPages::Reliable,
            CancellationToken::new(),
            script.fetcher(),
        );

        let mut ok = Vec::new();
        let err = loop {
            match pages.next().await {
                Some(Ok(item)) => ok.push(item),
                Some(Err(err)) => break err,
                None => panic!("listing should fail"),
            }
        };

        assert_eq!(ok.len(), 10);
        match err {
            ListError::Partial(failure) => {
                assert_eq!(failure.data, (0..10).collect::<Vec<_>>());
                assert_eq!(failure.metrics, Metrics::class_a(1));
                assert!(matches!(failure.cause, Error::Transport { .. }));
            }
            ListError::Cancelled => panic!("expected partial failure"),
        }
        assert!(pages.next().await.is_none());
    }

    #[tokio::test]
    async fn test_collect_failure_on_third_page_keeps_first_two() {
        let script = Script::new(vec![
            numbered(0..2, 1, 5),
            numbered(2..4, 2, 5),
            Err(Error::transport("connection reset")),
        ]);
        let pages = Paginated::page_based(2, TotalPages::Reliable, CancellationToken::new(), script.fetcher());

        match pages.collect().await.unwrap_err() {
            ListError::Partial(failure) => {
                assert_eq!(failure.data, vec![0, 1, 2, 3]);
                assert_eq!(failure.metrics, Metrics::class_a(2));
                assert_eq!(failure.message, "Listing failed after 4 items: Transport error: connection reset");
            }
            ListError::Cancelled => panic!("expected partial failure"),
        }
        assert_eq!(script.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_failure_on_first_page_has_no_data() {
        let script = Script::new(vec![Err(Error::transport("down"))]);
        let pages = Paginated::cursor_based(10, CancellationToken::new(), script.fetcher());
        let err = pages.collect().await.unwrap_err();
        assert!(err.data().is_empty());
        assert!(err.metrics().is_zero());
    }

    #[tokio::test]
    async fn test_cancel_before_second_fetch() {
        let script = Script::new(vec![numbered(0..2, 1, 5), numbered(2..4, 2, 5)]);
        let cancel = CancellationToken::new();
        let mut pages = Paginated::page_based(2, TotalPages::Reliable, cancel.clone(), script.fetcher());

        assert_eq!(pages.next().await.unwrap().unwrap(), 0);
        assert_eq!(pages.next().await.unwrap().unwrap(), 1);
        cancel.cancel();

        let err = pages.next().await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(err.metrics().is_zero());
        assert_eq!(script.requests().len(), 1);

        // A cancelled listing stays finished
        assert!(pages.next().await.is_none());
        assert_eq!(script.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_first_fetch() {
        let script = Script::new(vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pages = Paginated::cursor_based(2, cancel, script.fetcher());
        assert!(pages.collect().await.unwrap_err().is_cancelled());
        assert!(script.requests().is_empty());
    }

    #[tokio::test]
    async fn test_into_stream() {
        let script = Script::new(vec![cursor_page(0..2, Some("next")), cursor_page(2..3, None)]);
        let stream = Paginated::cursor_based(2, CancellationToken::new(), script.fetcher()).into_stream();
        let items: Vec<u32> = stream.map(|item| item.unwrap()).collect().await;
        assert_eq!(items, vec![0, 1, 2]);
    }

    #[test]
    fn test_request_query() {
        let page = PageRequest::Page { page: 2, per_page: 25 };
        assert_eq!(
            page.query(),
            vec![("page", "2".to_string()), ("per_page", "25".to_string())]
        );
        let cursor = PageRequest::Cursor { cursor: None, per_page: 25 };
        assert_eq!(cursor.query(), vec![("per_page", "25".to_string())]);
    }
}
