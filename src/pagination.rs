//! Page/limit resolution, clamping, and the pagination-link synthesizer.
//!
//! Page and limit resolve through the shared precedence chain and clamp
//! against a configured maximum. The link synthesizer combines the current
//! URL, the total match count, and every reverse serializer into absolute
//! first/prev/next/last URLs that replay the caller's filter, sort,
//! selection and presentation state.

use axum::http::header::HeaderMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::{DEFAULT_LIMIT, DEFAULT_MAXIMUM_LIMIT, DEFAULT_PAGE, LimitCeiling};
use crate::errors::ApiError;
use crate::query::QueryCompiler;
use crate::request::RequestContext;
use crate::schema::EntitySchema;

/// The resolved pagination window handed to the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaginationSpec {
    /// 1-based page number.
    pub page: u64,
    /// Records per page, already clamped.
    pub limit: u64,
}

/// Absolute pagination URLs. `first`/`prev` are absent on the first page,
/// `next`/`last` on the last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaginationUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

impl PaginationUrls {
    /// Present links with their `rel` names, in header order.
    #[must_use]
    pub fn rels(&self) -> Vec<(&'static str, &str)> {
        [
            ("first", &self.first),
            ("prev", &self.prev),
            ("next", &self.next),
            ("last", &self.last),
        ]
        .into_iter()
        .filter_map(|(rel, url)| url.as_deref().map(|url| (rel, url)))
        .collect()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first.is_none() && self.prev.is_none() && self.next.is_none() && self.last.is_none()
    }
}

impl QueryCompiler {
    /// Resolve the page number: request parameter, per-entity override,
    /// global default, route fallback, then page 1.
    #[must_use]
    pub fn parse_page(&self, req: &RequestContext, schema: &EntitySchema) -> u64 {
        let name = &self.config().parameters.page;
        positive(req.param(name))
            .or_else(|| schema.overrides.default_page.filter(|page| *page >= 1))
            .or_else(|| self.config().default_page.filter(|page| *page >= 1))
            .or_else(|| req.options.page.filter(|page| *page >= 1))
            .unwrap_or(DEFAULT_PAGE)
    }

    /// Resolve the page size through the same chain, then clamp it against
    /// the maximum limit.
    #[must_use]
    pub fn parse_limit(&self, req: &RequestContext, schema: &EntitySchema) -> u64 {
        let name = &self.config().parameters.limit;
        let limit = positive(req.param(name))
            .or_else(|| schema.overrides.default_limit.filter(|limit| *limit >= 1))
            .or_else(|| self.config().default_limit.filter(|limit| *limit >= 1))
            .or_else(|| req.options.limit.filter(|limit| *limit >= 1))
            .unwrap_or(DEFAULT_LIMIT);
        clamp(limit, self.maximum_limit(schema))
    }

    /// The effective limit ceiling: per-entity override, global
    /// configuration, then the hard default of 100.
    #[must_use]
    pub fn maximum_limit(&self, schema: &EntitySchema) -> LimitCeiling {
        schema
            .overrides
            .maximum_limit
            .filter(|ceiling| ceiling.is_valid())
            .or_else(|| self.config().maximum_limit.filter(|ceiling| ceiling.is_valid()))
            .unwrap_or(LimitCeiling::Capped(DEFAULT_MAXIMUM_LIMIT))
    }

    /// The effective populate-limit ceiling; falls back to the limit
    /// ceiling when neither layer configures one.
    #[must_use]
    pub fn maximum_populate_limit(&self, schema: &EntitySchema) -> LimitCeiling {
        schema
            .overrides
            .maximum_populate_limit
            .filter(|ceiling| ceiling.is_valid())
            .or_else(|| {
                self.config()
                    .maximum_populate_limit
                    .filter(|ceiling| ceiling.is_valid())
            })
            .unwrap_or_else(|| self.maximum_limit(schema))
    }

    /// Resolve the per-association record limit. Defaults to the resolved
    /// page limit and clamps against the populate-limit ceiling.
    #[must_use]
    pub fn parse_populate_limit(&self, req: &RequestContext, schema: &EntitySchema) -> u64 {
        let name = &self.config().parameters.populate_limit;
        let limit = positive(req.param(name))
            .or_else(|| {
                schema
                    .overrides
                    .default_populate_limit
                    .filter(|limit| *limit >= 1)
            })
            .or_else(|| self.config().default_populate_limit.filter(|limit| *limit >= 1))
            .unwrap_or_else(|| self.parse_limit(req, schema));
        clamp(limit, self.maximum_populate_limit(schema))
    }

    /// `page=N` with the resolved page, or nothing when the client never
    /// sent the parameter.
    #[must_use]
    pub fn page_fragment(&self, req: &RequestContext, schema: &EntitySchema) -> String {
        let name = &self.config().parameters.page;
        if req.has_param(name) {
            format!("{name}={}", self.parse_page(req, schema))
        } else {
            String::new()
        }
    }

    /// `limit=N` with the resolved (clamped) limit, or nothing.
    #[must_use]
    pub fn limit_fragment(&self, req: &RequestContext, schema: &EntitySchema) -> String {
        let name = &self.config().parameters.limit;
        if req.has_param(name) {
            format!("{name}={}", self.parse_limit(req, schema))
        } else {
            String::new()
        }
    }

    /// `populateLimit=N` with the resolved (clamped) populate limit, or
    /// nothing.
    #[must_use]
    pub fn populate_limit_fragment(&self, req: &RequestContext, schema: &EntitySchema) -> String {
        let name = &self.config().parameters.populate_limit;
        if req.has_param(name) {
            format!("{name}={}", self.parse_populate_limit(req, schema))
        } else {
            String::new()
        }
    }

    /// Synthesize the first/prev/next/last links for a result set.
    ///
    /// Every non-empty fragment — limit, sort, populate, populate limit,
    /// criteria, fields, pretty, envelope, jsonp — is replayed on each link;
    /// links to page 1 omit the page parameter entirely. No links are
    /// produced for an empty result set.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] when criteria serialization does
    /// (a malformed route-supplied blacklist).
    pub fn pagination_urls(
        &self,
        req: &RequestContext,
        schema: &EntitySchema,
        count: u64,
    ) -> Result<PaginationUrls, ApiError> {
        let mut urls = PaginationUrls::default();
        if count == 0 {
            return Ok(urls);
        }

        let limit = self.parse_limit(req, schema);
        let page = self.parse_page(req, schema);
        let last_page = count.div_ceil(limit);
        let prev_page = page.saturating_sub(1).max(1);
        let next_page = (page + 1).min(last_page);

        let fragments: Vec<String> = [
            self.limit_fragment(req, schema),
            self.sort_fragment(req, schema),
            self.populate_fragment(req, schema),
            self.populate_limit_fragment(req, schema),
            self.criteria_fragment(req, schema, false)?,
            self.fields_fragment(req, schema),
            self.pretty_fragment(req),
            self.envelope_fragment(req),
            self.jsonp_fragment(req),
        ]
        .into_iter()
        .filter(|fragment| !fragment.is_empty())
        .collect();
        let tail = fragments.join("&");

        let current = req.current_url();
        let page_name = &self.config().parameters.page;
        let first_url = if tail.is_empty() {
            current.clone()
        } else {
            format!("{current}?{tail}")
        };
        let paged_url = |target: u64| {
            if tail.is_empty() {
                format!("{current}?{page_name}={target}")
            } else {
                format!("{current}?{page_name}={target}&{tail}")
            }
        };

        if page != 1 {
            urls.first = Some(first_url.clone());
            urls.prev = Some(if prev_page == 1 {
                first_url
            } else {
                paged_url(prev_page)
            });
        }
        if page != last_page {
            urls.next = Some(paged_url(next_page));
            urls.last = Some(paged_url(last_page));
        }
        Ok(urls)
    }
}

/// Render the pagination descriptor as response headers: `X-Total-Count`
/// plus a `Link` header carrying every synthesized rel.
#[must_use]
pub fn pagination_headers(count: u64, urls: &PaginationUrls) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = count.to_string().parse() {
        headers.insert("X-Total-Count", value);
    }
    let links: Vec<String> = urls
        .rels()
        .into_iter()
        .map(|(rel, url)| format!("<{url}>; rel=\"{rel}\""))
        .collect();
    if !links.is_empty() {
        if let Ok(value) = links.join(", ").parse() {
            headers.insert("Link", value);
        }
    }
    headers
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value >= 1)
}

const fn clamp(limit: u64, ceiling: LimitCeiling) -> u64 {
    match ceiling.cap() {
        Some(max) if limit > max => max,
        _ => limit,
    }
}
