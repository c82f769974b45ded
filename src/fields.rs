//! Field-selection parsing and its reverse serializer.
//!
//! The `fields` parameter is a comma-separated inclusion list, or an
//! exclusion list when the first character is `-`. Either form normalizes to
//! an explicit inclusion list against the entity's selectable attributes;
//! a list that ends up covering every attribute collapses back to "all
//! fields", which is what makes the reverse serialization symmetric.

use serde::ser::{Serialize, Serializer};

use crate::query::QueryCompiler;
use crate::request::RequestContext;
use crate::schema::EntitySchema;

/// Which fields of each record the response should carry.
///
/// `All` is the canonical empty state — it serializes as `false`, never as
/// the full field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    All,
    /// Ordered, deduplicated inclusion list.
    Only(Vec<String>),
}

impl FieldSelection {
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl Serialize for FieldSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_bool(false),
            Self::Only(fields) => fields.serialize(serializer),
        }
    }
}

impl QueryCompiler {
    /// Resolve and parse the field selection for a request.
    ///
    /// Precedence: request parameter, per-entity override, global default,
    /// route-supplied fallback, then all fields.
    #[must_use]
    pub fn parse_fields(&self, req: &RequestContext, schema: &EntitySchema) -> FieldSelection {
        let name = &self.config().parameters.fields;
        let raw = nonempty(req.param(name))
            .or_else(|| nonempty(schema.overrides.default_fields.as_deref()))
            .or_else(|| nonempty(self.config().default_fields.as_deref()))
            .or_else(|| nonempty(req.options.fields.as_deref()));

        let master = schema.selectable_fields();
        let Some(raw) = raw else {
            return FieldSelection::All;
        };
        if master.is_empty() {
            return FieldSelection::All;
        }

        let exclude = raw.starts_with('-');
        let mut raw = raw;
        while raw.starts_with(['-', '+']) {
            raw = raw[1..].trim_start();
        }

        let mut selected: Vec<String> = if exclude { master.clone() } else { Vec::new() };
        for part in raw.split(',') {
            let part = part.trim();
            let field = if part == "id" {
                schema.primary_key.as_str()
            } else {
                part
            };
            if exclude {
                if let Some(position) = selected.iter().position(|existing| existing == field) {
                    selected.remove(position);
                }
            } else if master.iter().any(|known| known == field)
                && !selected.iter().any(|existing| existing == field)
            {
                selected.push(field.to_string());
            }
        }

        // Selecting nothing, or everything, both mean "all fields"
        if selected.is_empty() || selected.len() == master.len() {
            FieldSelection::All
        } else {
            FieldSelection::Only(selected)
        }
    }

    /// Render the field selection back into its query fragment, choosing
    /// whichever of the inclusion or `-`-exclusion spelling is shorter.
    #[must_use]
    pub fn fields_fragment(&self, req: &RequestContext, schema: &EntitySchema) -> String {
        let name = &self.config().parameters.fields;
        let FieldSelection::Only(selected) = self.parse_fields(req, schema) else {
            return String::new();
        };
        if !req.has_param(name) {
            return String::new();
        }

        let master = schema.selectable_fields();
        let rendered = if selected.len() * 2 > master.len() {
            let excluded: Vec<&str> = master
                .iter()
                .filter(|field| !selected.iter().any(|kept| kept == *field))
                .map(String::as_str)
                .collect();
            format!("-{}", excluded.join(","))
        } else {
            selected.join(",")
        };
        format!("{name}={rendered}")
    }
}

fn nonempty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}
