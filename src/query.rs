//! The compiler itself and the assembled query descriptor.
//!
//! [`QueryCompiler`] captures the immutable configuration snapshot once and
//! exposes every parser and reverse serializer as methods; the individual
//! parameter families live in their own modules. [`ListQuery`] is the full
//! structured output handed to the record store.

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::config::ApiConfig;
use crate::criteria::FilterExpression;
use crate::errors::ApiError;
use crate::fields::FieldSelection;
use crate::pagination::PaginationSpec;
use crate::populate::PopulateSpec;
use crate::request::RequestContext;
use crate::schema::EntitySchema;
use crate::sort::SortDescriptor;

/// The full structured descriptor for one collection request.
///
/// This is the interface to the record store: the compiler never executes
/// anything, it only describes what to fetch.
#[derive(Debug, Clone, Serialize)]
pub struct ListQuery {
    #[serde(rename = "where")]
    pub filter: FilterExpression,
    pub sort: SortDescriptor,
    pub select: FieldSelection,
    pub populate: Vec<PopulateSpec>,
    pub pagination: PaginationSpec,
}

/// The query-parameter compiler.
///
/// Construct it once at startup with the configuration snapshot; it is
/// purely functional over `(request, schema)` afterwards and safe to share
/// across any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    config: ApiConfig,
}

impl QueryCompiler {
    #[must_use]
    pub const fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Compile everything a collection request carries into one descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] when a route-supplied blacklist
    /// is malformed; client payloads never error.
    pub fn compile(
        &self,
        req: &RequestContext,
        schema: &EntitySchema,
    ) -> Result<ListQuery, ApiError> {
        Ok(ListQuery {
            filter: self.parse_criteria(req, schema)?,
            sort: self.parse_sort(req, schema),
            select: self.parse_fields(req, schema),
            populate: self.populate_specs(req, schema),
            pagination: PaginationSpec {
                page: self.parse_page(req, schema),
                limit: self.parse_limit(req, schema),
            },
        })
    }

    /// The record identifier for single-record operations: the pinned route
    /// option, then the `id` parameter, then a parameter named after the
    /// real primary key. Blank values do not count.
    #[must_use]
    pub fn parse_pk(&self, req: &RequestContext, schema: &EntitySchema) -> Option<String> {
        req.options
            .id
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| req.param("id"))
            .filter(|value| !value.trim().is_empty())
            .or_else(|| req.param(&schema.primary_key))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
    }

    /// Like [`QueryCompiler::parse_pk`], for operations that cannot proceed
    /// without an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingIdentifier`] (HTTP 400) when no
    /// identifier is present anywhere.
    pub fn parse_required_pk(
        &self,
        req: &RequestContext,
        schema: &EntitySchema,
    ) -> Result<String, ApiError> {
        self.parse_pk(req, schema)
            .ok_or_else(ApiError::missing_identifier)
    }

    /// Extract the writable values from a request body.
    ///
    /// Route-level defaults fill in missing keys, blacklisted keys (the
    /// identifier and every reserved parameter name) are removed, string
    /// values are trimmed. An array body yields one value map per element,
    /// so multi-entity creates flow through the same path as single ones.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] when the route-supplied values
    /// blacklist is malformed.
    pub fn parse_values(
        &self,
        req: &RequestContext,
        schema: &EntitySchema,
    ) -> Result<Vec<JsonMap<String, JsonValue>>, ApiError> {
        let blacklist = self.values_blacklist(req, schema)?;

        let bodies: Vec<JsonValue> = match req.body() {
            Some(JsonValue::Array(items)) => items.clone(),
            Some(value) => vec![value.clone()],
            None => vec![JsonValue::Object(JsonMap::new())],
        };

        let mut all_values = Vec::with_capacity(bodies.len());
        for body in bodies {
            let mut merged = match body {
                JsonValue::Object(map) => map,
                _ => JsonMap::new(),
            };
            for (name, value) in &req.options.values_defaults {
                if !merged.contains_key(name) {
                    merged.insert(name.clone(), value.clone());
                }
            }

            let mut values = JsonMap::new();
            for (name, value) in merged {
                if blacklist.iter().any(|blocked| *blocked == name) {
                    continue;
                }
                let value = match value {
                    JsonValue::String(text) => JsonValue::String(text.trim().to_string()),
                    other => other,
                };
                values.insert(name, value);
            }
            all_values.push(values);
        }
        Ok(all_values)
    }

    /// Parameter names that must never act as criteria fields: the
    /// presentation parameters (when active) and the five core parameters.
    fn reserved_parameter_names(&self, req: &RequestContext) -> Vec<String> {
        let parameters = &self.config.parameters;
        let mut names = Vec::with_capacity(8);
        if self.parse_pretty(req).is_some() {
            names.push(parameters.pretty.clone());
        }
        names.push(parameters.envelope.clone());
        if self.jsonp_supported(req) {
            names.push(parameters.jsonp.clone());
        }
        names.push(parameters.page.clone());
        names.push(parameters.limit.clone());
        names.push(parameters.populate.clone());
        names.push(parameters.populate_limit.clone());
        names.push(parameters.sort.clone());
        names.push(parameters.fields.clone());
        names
    }

    pub(crate) fn criteria_blacklist(
        &self,
        req: &RequestContext,
        schema: &EntitySchema,
    ) -> Result<Vec<String>, ApiError> {
        let mut blacklist = resolve_blacklist(req.options.criteria_blacklist.as_deref(), "criteria")?;
        blacklist.push(schema.primary_key.clone());
        blacklist.extend(self.reserved_parameter_names(req));
        Ok(blacklist)
    }

    fn values_blacklist(
        &self,
        req: &RequestContext,
        schema: &EntitySchema,
    ) -> Result<Vec<String>, ApiError> {
        let mut blacklist = resolve_blacklist(req.options.values_blacklist.as_deref(), "values")?;
        blacklist.push(schema.primary_key.clone());
        blacklist.extend(self.reserved_parameter_names(req));
        Ok(blacklist)
    }
}

/// Validate a caller-supplied blacklist, defaulting to `["id"]`.
fn resolve_blacklist(supplied: Option<&[String]>, kind: &str) -> Result<Vec<String>, ApiError> {
    let Some(supplied) = supplied else {
        return Ok(vec!["id".to_string()]);
    };
    if supplied.iter().any(|name| name.trim().is_empty()) {
        return Err(ApiError::configuration(format!(
            "Invalid {kind} blacklist. Should be a list of non-empty parameter names."
        )));
    }
    Ok(supplied.to_vec())
}
