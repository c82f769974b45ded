//! Sort parameter parsing and its reverse serializer.
//!
//! A sort expression is a comma-separated field list; a leading `-` sorts
//! descending, a leading `+` (or nothing) ascending. `id` always maps to the
//! entity's real primary-key attribute, and unknown fields drop silently.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::config::DEFAULT_SORT;
use crate::query::QueryCompiler;
use crate::request::RequestContext;
use crate::schema::EntitySchema;

/// Sort direction. Serializes as `1` (ascending) / `0` (descending) in the
/// structured descriptor handed to the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl Serialize for SortDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            Self::Asc => 1,
            Self::Desc => 0,
        })
    }
}

/// Ordered mapping from field name to direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortDescriptor {
    entries: Vec<(String, SortDirection)>,
}

impl SortDescriptor {
    /// Insert or replace a field, keeping first-seen position.
    pub fn insert(&mut self, field: impl Into<String>, direction: SortDirection) {
        let field = field.into();
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| *key == field) {
            entry.1 = direction;
        } else {
            self.entries.push((field, direction));
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<SortDirection> {
        self.entries
            .iter()
            .find(|(key, _)| key == field)
            .map(|(_, direction)| *direction)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.entries
            .iter()
            .map(|(field, direction)| (field.as_str(), *direction))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SortDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, direction) in &self.entries {
            map.serialize_entry(field, direction)?;
        }
        map.end()
    }
}

impl QueryCompiler {
    /// Resolve and parse the sort expression for a request.
    ///
    /// Precedence: request parameter, per-entity override, global default,
    /// route-supplied fallback, then `"id"`.
    #[must_use]
    pub fn parse_sort(&self, req: &RequestContext, schema: &EntitySchema) -> SortDescriptor {
        let name = &self.config().parameters.sort;
        let raw = nonempty(req.param(name))
            .or_else(|| nonempty(schema.overrides.default_sort.as_deref()))
            .or_else(|| nonempty(self.config().default_sort.as_deref()))
            .or_else(|| nonempty(req.options.sort.as_deref()))
            .unwrap_or(DEFAULT_SORT);

        let mut descriptor = SortDescriptor::default();
        for part in raw.split(',') {
            let part = part.trim();
            let direction = if part.starts_with('-') {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            let mut field = part;
            while field.starts_with(['-', '+']) {
                field = field[1..].trim_start();
            }
            let field = if field == "id" {
                schema.primary_key.as_str()
            } else {
                field
            };
            if schema.has_attribute(field) {
                descriptor.insert(field, direction);
            }
        }
        descriptor
    }

    /// Render the sort back into its query fragment, or nothing when the
    /// client never sent the parameter.
    #[must_use]
    pub fn sort_fragment(&self, req: &RequestContext, schema: &EntitySchema) -> String {
        let name = &self.config().parameters.sort;
        if !req.has_param(name) {
            return String::new();
        }
        let descriptor = self.parse_sort(req, schema);
        if descriptor.is_empty() {
            return String::new();
        }
        let rendered: Vec<String> = descriptor
            .iter()
            .map(|(field, direction)| match direction {
                SortDirection::Asc => field.to_string(),
                SortDirection::Desc => format!("-{field}"),
            })
            .collect();
        format!("{name}={}", rendered.join(","))
    }
}

fn nonempty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}
