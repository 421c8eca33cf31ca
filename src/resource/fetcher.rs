//! Resource Fetcher
//!
//! Glue between the resource APIs and the pagination engine: builds the
//! per-page request for a list endpoint and turns each response envelope
//! into a [`Page`].

use crate::api::client::Session;
use crate::api::envelope::Envelope;
use crate::engine::metrics::Metrics;
use crate::engine::pagination::{FetchFuture, Page, PageInfo, PageRequest, Paginated, TotalPages};
use crate::error::Error;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a list endpoint paginates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Numbered(TotalPages),
    Cursor,
}

/// Description of one list endpoint
pub struct ListRequest<R, T> {
    pub path: String,
    /// Filter parameters sent with every page
    pub filters: Vec<(&'static str, String)>,
    pub style: ListStyle,
    /// Billable cost of one page request
    pub cost: Metrics,
    /// Pull the items out of the `result` field
    pub extract: fn(R) -> Vec<T>,
}

impl<T> ListRequest<Vec<T>, T> {
    /// Endpoint whose `result` is the item array itself
    pub fn new(path: String, style: ListStyle) -> Self {
        Self {
            path,
            filters: Vec::new(),
            style,
            cost: Metrics::ZERO,
            extract: std::convert::identity,
        }
    }
}

impl<R, T> ListRequest<R, T> {
    pub fn filter(mut self, key: &'static str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.filters.push((key, value.to_string()));
        }
        self
    }

    pub fn cost(mut self, cost: Metrics) -> Self {
        self.cost = cost;
        self
    }
}

/// Start a lazy listing of `request` on `session`
pub fn list<R, T>(
    session: &Arc<Session>,
    request: ListRequest<R, T>,
    cancel: CancellationToken,
) -> Paginated<'static, T>
where
    R: DeserializeOwned + Send + 'static,
    T: Send + 'static,
{
    let ListRequest {
        path,
        filters,
        style,
        cost,
        extract,
    } = request;
    let per_page = session.per_page();
    let session = session.clone();

    let fetch = move |page: PageRequest| -> FetchFuture<'static, T> {
        let session = session.clone();
        let path = path.clone();
        let mut query = filters.clone();
        query.extend(page.query());

        async move {
            let envelope: Envelope<R> = session.http.get(&path, &query).await?;
            let (result, info) = envelope.into_parts()?;
            let items = result.map(extract).unwrap_or_default();
            let info = info.map(|info| match style {
                ListStyle::Numbered(_) => PageInfo::numbered(&info),
                ListStyle::Cursor => PageInfo::cursor(&info),
            });
            Ok(Page::new(items, info).with_metrics(cost))
        }
        .boxed()
    };

    match style {
        ListStyle::Numbered(totals) => Paginated::page_based(per_page, totals, cancel, fetch),
        ListStyle::Cursor => Paginated::cursor_based(per_page, cancel, fetch),
    }
}

/// Reject an empty identifier before it reaches a URL
pub fn require_id<'a>(kind: &str, value: &'a str) -> Result<&'a str, Error> {
    if value.trim().is_empty() {
        return Err(Error::config(format!("{} must not be empty", kind)));
    }
    Ok(value)
}

/// Percent-encode a single path segment (object keys may contain '/')
pub fn encode_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
