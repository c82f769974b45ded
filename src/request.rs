//! The request surface the compiler reads.
//!
//! [`RequestContext`] is a transport-neutral snapshot of one request: the
//! decoded query pairs, the route parameters, the resolved route options and
//! the request URL (kept for pagination-link building). Handlers build one
//! from whatever framework they run in and hand it to the compiler.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;
use utoipa::{IntoParams, ToSchema};

use crate::coerce::try_parse_json;

/// Route-level options resolved ahead of the request: which entity the route
/// targets, route-supplied defaults (the fourth precedence tier), and the
/// customizable blacklists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteOptions {
    /// Entity name the route is bound to.
    pub entity: Option<String>,
    /// Pinned record identifier (e.g. from a nested route).
    pub id: Option<String>,
    /// Default criteria payloads, written in the same grammar as the query
    /// string; lowest precedence, overridden by anything the client sends.
    pub where_defaults: Vec<(String, String)>,
    pub sort: Option<String>,
    pub fields: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// JSONP switch when the global configuration does not decide.
    pub jsonp: Option<bool>,
    /// Replaces the default `["id"]` blacklist for criteria parsing.
    pub criteria_blacklist: Option<Vec<String>>,
    /// Replaces the default `["id"]` blacklist for body-value parsing.
    pub values_blacklist: Option<Vec<String>>,
    /// Default body values, filled in where the request body is silent.
    pub values_defaults: Vec<(String, JsonValue)>,
}

/// A request snapshot: URL, decoded query pairs, route parameters, options
/// and (for write operations) the parsed body.
#[derive(Debug, Clone)]
pub struct RequestContext {
    url: Url,
    query: Vec<(String, String)>,
    route_params: Vec<(String, String)>,
    pub options: RouteOptions,
    body: Option<JsonValue>,
}

impl RequestContext {
    /// Build a context from an already-parsed URL.
    ///
    /// Query pairs are percent-decoded; a key that repeats folds into one
    /// comma-joined value, which is exactly how the criteria grammar treats
    /// multi-value parameters.
    #[must_use]
    pub fn from_url(url: Url) -> Self {
        let mut query: Vec<(String, String)> = Vec::new();
        for (name, value) in url.query_pairs() {
            if let Some((_, existing)) = query.iter_mut().find(|(existing, _)| *existing == name) {
                existing.push(',');
                existing.push_str(&value);
            } else {
                query.push((name.into_owned(), value.into_owned()));
            }
        }
        Self {
            url,
            query,
            route_params: Vec::new(),
            options: RouteOptions::default(),
            body: None,
        }
    }

    /// Parse an absolute URL string into a context.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error for anything `url` rejects.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Ok(Self::from_url(Url::parse(raw)?))
    }

    #[must_use]
    pub fn with_route_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a body from raw text, accepting only a non-empty JSON object
    /// or array; anything else leaves the body unset.
    #[must_use]
    pub fn with_body_str(mut self, raw: &str) -> Self {
        self.body = try_parse_json(raw);
        self
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Parameter lookup with route parameters taking precedence over the
    /// query string.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.route_param(name).or_else(|| self.query_param(name))
    }

    /// Whether the client supplied the parameter at all — the distinction
    /// every reverse serializer preserves.
    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    /// Candidate filter parameters: query pairs first, then route parameters
    /// that the query did not already name.
    #[must_use]
    pub fn filter_params(&self) -> Vec<(String, String)> {
        let mut params = self.query.clone();
        for (name, value) in &self.route_params {
            if !params.iter().any(|(existing, _)| existing == name) {
                params.push((name.clone(), value.clone()));
            }
        }
        params
    }

    #[must_use]
    pub const fn body(&self) -> Option<&JsonValue> {
        self.body.as_ref()
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The absolute request URL without its query string, the base every
    /// pagination link starts from.
    #[must_use]
    pub fn current_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.to_string()
    }
}

/// The recognized collection query parameters, under their default names.
///
/// This is the documentation surface for generated API docs; the compiler
/// itself reads [`RequestContext`] so that renamed parameters keep working.
/// Any attribute name of the target entity is additionally accepted as a
/// criteria key (`?age=>=18`, `?name=Max`), which a typed struct cannot
/// express.
#[derive(Debug, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Page number, 1-based.
    #[param(example = 2)]
    pub page: Option<u64>,
    /// Records per page, clamped against the configured maximum.
    #[param(example = 30)]
    pub limit: Option<u64>,
    /// Comma-separated sort fields; a leading `-` sorts descending.
    #[param(example = "-createdAt,name")]
    pub sort: Option<String>,
    /// Comma-separated field selection; a leading `-` excludes instead.
    #[param(example = "-password")]
    pub fields: Option<String>,
    /// `true`/`false`, or a comma-separated association list.
    #[param(example = "posts,profile")]
    pub populate: Option<String>,
    /// Records per populated association, clamped like `limit`.
    #[param(example = 10)]
    pub populate_limit: Option<u64>,
    /// Pretty-print toggle (when enabled in configuration).
    pub pretty: Option<String>,
    /// Envelope toggle.
    pub envelope: Option<String>,
    /// JSONP callback function name.
    pub callback: Option<String>,
}
