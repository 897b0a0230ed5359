//! Pagination handling for GitHub API.
//!
//! GitHub pages collections through the `Link` response header. Most
//! endpoints advertise `page=N` links (and a `rel="last"` link giving the
//! total); enumeration endpoints such as `/users` advertise an opaque
//! `since=N` cursor instead, with no known total.

use crate::client::{GitHubClient, RestRequest};
use crate::errors::GitHubResult;
use crate::materialize::ApiValue;
use crate::observability::{ProgressGuard, ProgressUpdate};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

/// Pagination links parsed from Link header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginationLinks {
    /// URL for the next page.
    pub next: Option<String>,
    /// URL for the previous page.
    pub prev: Option<String>,
    /// URL for the first page.
    pub first: Option<String>,
    /// URL for the last page.
    pub last: Option<String>,
}

impl PaginationLinks {
    /// Parses pagination links from the Link header (RFC 8288).
    ///
    /// URLs are located by their `<...>` delimiters before parameters are
    /// read, so commas inside a query string stay part of the URL.
    pub fn from_header(header_value: &str) -> Self {
        let mut links = Self::default();
        let mut rest = header_value;

        while let Some(open) = rest.find('<') {
            let after_open = &rest[open + 1..];
            let Some(close) = after_open.find('>') else {
                break;
            };
            let url = &after_open[..close];
            let tail = &after_open[close + 1..];
            let params_end = tail.find('<').unwrap_or(tail.len());
            let params = &tail[..params_end];
            rest = &tail[params_end..];

            let rels = params
                .split(';')
                .map(|segment| segment.trim().trim_end_matches(',').trim())
                .filter_map(|segment| segment.strip_prefix("rel="))
                .flat_map(|value| value.trim_matches('"').split_whitespace());

            for rel in rels {
                let slot = match rel {
                    "next" => &mut links.next,
                    "prev" => &mut links.prev,
                    "first" => &mut links.first,
                    "last" => &mut links.last,
                    _ => continue,
                };
                *slot = Some(url.to_string());
            }
        }

        links
    }

    /// Parses pagination links from response headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get("link")
            .and_then(|v| v.to_str().ok())
            .map(Self::from_header)
            .unwrap_or_default()
    }
}

/// Extracts a numeric query parameter from a URL.
pub fn query_number(url: &str, name: &str) -> Option<u64> {
    url::Url::parse(url).ok().and_then(|u| {
        u.query_pairs()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.parse().ok())
    })
}

/// Where the next page lives, recomputed from each response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    /// Absolute URL of the next page.
    pub next_link: Option<String>,
    /// Page number of the next page.
    pub next_page_number: u64,
    /// Total pages; 0 when the endpoint pages by `since` cursor.
    pub num_pages: u64,
    /// Opaque `since` cursor of the next page.
    pub since: u64,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            next_link: None,
            next_page_number: 1,
            num_pages: 1,
            since: 0,
        }
    }
}

impl PaginationCursor {
    /// Builds the cursor from parsed Link header entries.
    pub fn from_links(links: &PaginationLinks) -> Self {
        let mut cursor = Self::default();

        if let Some(next) = &links.next {
            if let Some(page) = query_number(next, "page") {
                cursor.next_link = Some(next.clone());
                cursor.next_page_number = page;
            } else if let Some(since) = query_number(next, "since") {
                cursor.next_link = Some(next.clone());
                cursor.since = since;
                cursor.num_pages = 0;
            } else {
                cursor.next_link = Some(next.clone());
            }
        }

        if cursor.num_pages != 0 {
            if let Some(last) = links.last.as_deref().and_then(|l| query_number(l, "page")) {
                cursor.num_pages = last;
            }
        }

        cursor
    }

    /// Returns true when the total page count is unknown.
    pub fn is_unbounded(&self) -> bool {
        self.num_pages == 0
    }

    /// Returns true when there is nothing left to fetch.
    pub fn is_exhausted(&self) -> bool {
        self.next_link.as_deref().map_or(true, |l| l.trim().is_empty())
    }
}

/// A response body together with the metadata the pagination layer needs.
#[derive(Debug, Clone)]
pub struct ExtendedResult {
    /// Materialized body.
    pub result: ApiValue,
    /// HTTP status code.
    pub status_code: u16,
    /// `X-GitHub-Request-Id`.
    pub request_id: Option<String>,
    /// Link-derived cursor.
    pub cursor: PaginationCursor,
    /// Raw `Link` header.
    pub link: Option<String>,
    /// `Last-Modified`.
    pub last_modified: Option<String>,
    /// `If-None-Match`.
    pub if_none_match: Option<String>,
    /// `If-Modified-Since`.
    pub if_modified_since: Option<String>,
    /// `ETag`.
    pub etag: Option<String>,
    /// `X-RateLimit-Limit`.
    pub rate_limit: Option<u32>,
    /// `X-RateLimit-Remaining`.
    pub rate_limit_remaining: Option<u32>,
    /// `X-RateLimit-Reset` as a timestamp.
    pub rate_limit_reset: Option<DateTime<Utc>>,
}

impl ExtendedResult {
    /// Packages a body with the headers it arrived with.
    pub fn from_parts(result: ApiValue, status_code: u16, headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        let number = |name: &str| header(name).and_then(|v| v.parse::<u32>().ok());

        let links = PaginationLinks::from_headers(headers);

        Self {
            result,
            status_code,
            request_id: header("x-github-request-id"),
            cursor: PaginationCursor::from_links(&links),
            link: header("link"),
            last_modified: header("last-modified"),
            if_none_match: header("if-none-match"),
            if_modified_since: header("if-modified-since"),
            etag: header("etag"),
            rate_limit: number("x-ratelimit-limit"),
            rate_limit_remaining: number("x-ratelimit-remaining"),
            rate_limit_reset: header("x-ratelimit-reset")
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        }
    }

    /// Next page URL, if any.
    pub fn next_link(&self) -> Option<&str> {
        self.cursor.next_link.as_deref()
    }
}

/// Fetches every page of a collection, in order, one request at a time.
///
/// With `single_page` only the first page is fetched. Errors abort the loop
/// and propagate; nothing fetched so far is returned.
pub(crate) async fn collect_pages(
    client: &GitHubClient,
    request: RestRequest,
    single_page: bool,
) -> GitHubResult<Vec<ApiValue>> {
    let description = request.description.clone();
    let threshold = client.config().multi_request_progress_threshold;
    let mut progress = ProgressGuard::new(client.progress(), &description, threshold > 0);

    let mut items = Vec::new();
    let mut request = request;
    let mut iteration: u64 = 0;

    loop {
        iteration += 1;
        if iteration > 1 {
            request.description = format!("{} (getting additional results)", description);
        }

        let page = client.invoke_extended(&request).await?;
        items.extend(page.result.into_items());

        let cursor = page.cursor;
        if single_page || cursor.is_exhausted() {
            break;
        }

        if threshold > 0 && (cursor.is_unbounded() || cursor.num_pages >= u64::from(threshold)) {
            progress.update(progress_for(&cursor, iteration));
        }

        tracing::debug!(
            page = cursor.next_page_number,
            pages = cursor.num_pages,
            fetched = items.len(),
            "Following next link"
        );

        request.uri_fragment = cursor.next_link.unwrap_or_default();
    }

    progress.complete();
    Ok(items)
}

fn progress_for(cursor: &PaginationCursor, iteration: u64) -> ProgressUpdate {
    if cursor.is_unbounded() {
        ProgressUpdate {
            status: format!("Getting additional results [page {} of (unknown)]", iteration + 1),
            percent_complete: ((iteration * 10) % 100) as u8,
        }
    } else {
        let percent = (cursor.next_page_number.saturating_sub(1) * 100) / cursor.num_pages.max(1);
        ProgressUpdate {
            status: format!(
                "Getting additional results [page {}/{}]",
                cursor.next_page_number, cursor.num_pages
            ),
            percent_complete: percent.min(100) as u8,
        }
    }
}
