//! Cursor pagination over Admin API list endpoints.
//!
//! Each response may carry a `Link` header naming the adjacent pages; the
//! cursor is the `page_info` query parameter of the `rel="next"` URL:
//!
//! ```text
//! <https://shop.myshopify.com/admin/api/2024-01/orders.json?limit=250&page_info=PREV>; rel="previous",
//! <https://shop.myshopify.com/admin/api/2024-01/orders.json?limit=250&page_info=NEXT>; rel="next"
//! ```

use std::marker::PhantomData;

use crate::client::ShopifyAdminClient;
use crate::error::ShopifyError;
use crate::types::ResourcePage;

/// Upper bound on pages per sequence; a cycling cursor fails instead of
/// looping forever.
pub const MAX_PAGES: usize = 200;

/// Returns the `page_info` cursor of the `rel="next"` link, if any.
#[must_use]
pub fn next_page_cursor(link_header: Option<&str>) -> Option<String> {
    link_header?
        .split(',')
        .find(|directive| directive.split(';').skip(1).any(is_next_relation))
        .and_then(|directive| {
            let target = directive.split(';').next()?.trim();
            let target = target.strip_prefix('<')?.strip_suffix('>')?;
            let url = reqwest::Url::parse(target).ok()?;
            url.query_pairs()
                .find(|(key, _)| key == "page_info")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|cursor| !cursor.is_empty())
}

fn is_next_relation(param: &str) -> bool {
    param
        .trim()
        .strip_prefix("rel=")
        .is_some_and(|value| value.trim_matches('"') == "next")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    First,
    After(String),
    Exhausted,
}

/// A lazy, restartable walk over every page of one resource.
///
/// Nothing is fetched until [`next_page`](Self::next_page) is awaited.
/// Pages already yielded are not cached; [`restart`](Self::restart) rewinds
/// to the first page and fetches again.
pub struct PageSequence<'a, P> {
    client: &'a ShopifyAdminClient,
    position: Position,
    pages_fetched: usize,
    _page: PhantomData<fn() -> P>,
}

impl<'a, P: ResourcePage> PageSequence<'a, P> {
    pub(crate) fn new(client: &'a ShopifyAdminClient) -> Self {
        Self {
            client,
            position: Position::First,
            pages_fetched: 0,
            _page: PhantomData,
        }
    }

    /// Fetch the next page, or `None` once the last page has been yielded.
    ///
    /// A failed fetch leaves the position unchanged, so awaiting again
    /// retries the same page.
    ///
    /// # Errors
    ///
    /// Propagates transport and status errors from the client, and returns
    /// [`ShopifyError::PaginationLimit`] once [`MAX_PAGES`] pages have been
    /// yielded and the server still reports another.
    pub async fn next_page(&mut self) -> Result<Option<Vec<P::Item>>, ShopifyError> {
        let cursor = match &self.position {
            Position::Exhausted => return Ok(None),
            Position::First => None,
            Position::After(cursor) => Some(cursor.clone()),
        };

        if self.pages_fetched >= MAX_PAGES {
            return Err(ShopifyError::PaginationLimit {
                domain: self.client.shop_domain().to_owned(),
                resource: P::RESOURCE,
                max_pages: MAX_PAGES,
            });
        }

        if self.pages_fetched > 0 {
            self.client.pause_between_pages().await;
        }

        let (page, link_header) = self.client.fetch_page::<P>(cursor.as_deref()).await?;
        self.pages_fetched += 1;
        self.position = match next_page_cursor(link_header.as_deref()) {
            Some(next) => Position::After(next),
            None => Position::Exhausted,
        };

        Ok(Some(page.into_items()))
    }

    /// Rewind to the first page.
    pub fn restart(&mut self) {
        self.position = Position::First;
        self.pages_fetched = 0;
    }

    /// Pages yielded since construction or the last restart.
    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Drain the remaining pages into one `Vec`.
    ///
    /// # Errors
    ///
    /// Same as [`next_page`](Self::next_page).
    pub async fn collect_all(mut self) -> Result<Vec<P::Item>, ShopifyError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }
}
