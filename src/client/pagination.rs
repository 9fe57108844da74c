//! Pagination helpers for API requests
//!
//! Listing endpoints return one page at a time plus an opaque continuation
//! token. `drain_pages` loops a fetch closure until the token runs out.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Hard ceiling on pages drained per listing. A well-formed API never gets
/// close; a token loop would otherwise spin forever.
pub const MAX_PAGES: usize = 10_000;

/// One page of a listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page, in API order
    pub items: Vec<T>,

    /// Continuation token; None on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// Create a terminal page (no continuation).
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }

    /// Create a page with a continuation token.
    pub fn with_token(items: Vec<T>, token: impl Into<String>) -> Self {
        Self {
            items,
            next_page_token: Some(token.into()),
        }
    }
}

/// Drain a paginated listing to completion.
///
/// Calls `fetch` with `None`, then with each returned token, concatenating
/// items in page order until the API stops returning a token.
pub async fn drain_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut all = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(token.take()).await?;
        all.extend(page.items);
        pages += 1;

        match page.next_page_token {
            Some(next) => {
                if pages >= MAX_PAGES {
                    return Err(ApiError::InvalidResponse(format!(
                        "pagination did not terminate after {} pages",
                        MAX_PAGES
                    ))
                    .into());
                }
                token = Some(next);
            }
            None => break,
        }
    }

    log::debug!("Drained {} items across {} pages", all.len(), pages);
    Ok(all)
}
