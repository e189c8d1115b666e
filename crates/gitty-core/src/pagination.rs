//! Lazy pagination over backend list endpoints.
//!
//! Backends page their list endpoints in one of two ways: numbered pages
//! with a reported total, or an opaque cursor carried from one page to the
//! next. Both collapse onto [`Paginator`], which pulls one page per call and
//! stops for good on an empty page or a missing continuation.

use std::future::Future;

/// Request position for the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageToken {
    /// 1-based page index.
    Number(u32),
    /// Opaque cursor; `None` requests the first page.
    Cursor(Option<String>),
}

impl PageToken {
    /// First page of a page-number endpoint.
    pub const FIRST_PAGE: Self = Self::Number(1);

    /// First page of a cursor endpoint.
    pub const START: Self = Self::Cursor(None);

    /// Page index, or 1 for cursor tokens.
    #[must_use]
    pub const fn page_number(&self) -> u32 {
        match self {
            Self::Number(n) => *n,
            Self::Cursor(_) => 1,
        }
    }

    /// Cursor value, or `None` for numbered tokens and the first cursor page.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        match self {
            Self::Cursor(c) => c.as_deref(),
            Self::Number(_) => None,
        }
    }
}

/// One fetched page plus where to continue.
#[derive(Debug)]
pub struct Page<T> {
    /// Normalized items on this page.
    pub items: Vec<T>,

    /// Continuation; `None` means the backend reported no further pages.
    pub next: Option<PageToken>,
}

impl<T> Page<T> {
    /// Page from a page-number endpoint.
    ///
    /// Continues to `page + 1` unless the backend reported a total and
    /// `page` has reached it. Unknown totals continue until an empty page.
    #[must_use]
    pub fn numbered(items: Vec<T>, page: u32, total_pages: Option<u32>) -> Self {
        let next = match total_pages {
            Some(total) if page >= total => None,
            _ => Some(PageToken::Number(page.saturating_add(1))),
        };
        Self { items, next }
    }

    /// Page from a cursor endpoint.
    #[must_use]
    pub fn cursor(items: Vec<T>, next: Option<String>) -> Self {
        Self {
            items,
            next: next.map(|c| PageToken::Cursor(Some(c))),
        }
    }

    /// Page with no continuation, for unpaginated endpoints.
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Pull-based driver over a page-fetch function.
///
/// The fetch function is called once per page, strictly in order. After
/// [`next_page`](Self::next_page) has returned `Ok(None)` or an error, no
/// further requests are made.
pub struct Paginator<F> {
    fetch: F,
    next: Option<PageToken>,
    requests: usize,
}

impl<F> Paginator<F> {
    /// Create a paginator starting at `first`.
    pub const fn new(first: PageToken, fetch: F) -> Self {
        Self {
            fetch,
            next: Some(first),
            requests: 0,
        }
    }

    /// Number of fetches performed so far.
    #[must_use]
    pub const fn requests(&self) -> usize {
        self.requests
    }

    /// Whether the driver has stopped.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}

impl<F, Fut, T, E> Paginator<F>
where
    F: FnMut(PageToken) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once the sequence has ended.
    ///
    /// # Errors
    /// Propagates the fetch function's error; the driver is exhausted afterwards.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>, E> {
        let Some(token) = self.next.take() else {
            return Ok(None);
        };

        self.requests += 1;
        tracing::trace!(?token, request = self.requests, "fetching page");
        let page = (self.fetch)(token).await?;

        if page.items.is_empty() {
            return Ok(None);
        }

        self.next = page.next;
        Ok(Some(page.items))
    }

    /// Drain every remaining page, concatenated in order.
    ///
    /// # Errors
    /// Propagates the first fetch error.
    pub async fn collect_all(mut self) -> Result<Vec<T>, E> {
        let mut all = Vec::new();
        while let Some(items) = self.next_page().await? {
            all.extend(items);
        }
        Ok(all)
    }
}
