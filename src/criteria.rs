//! The criteria (filter) grammar: parsing and the paired reverse serializer.
//!
//! Each filter value is `<modifier><payload>` where the optional modifier
//! selects the comparison operator:
//!
//! | literal                | meaning                                   |
//! |------------------------|-------------------------------------------|
//! | (none), `=`, `==`      | equals (comma list means "any of")        |
//! | `!`, `!=`              | not equals (comma list supported)         |
//! | `<`, `<=`, `>`, `>=`   | comparisons                               |
//! | `=>`                   | starts with                               |
//! | `=<`                   | ends with                                 |
//! | `@`, `=@`              | contains                                  |
//! | `%`, `=%`, `*`, `=*`   | like (`%`/`*` as wildcard)                |
//! | `><`                   | between, two comma-separated bounds       |
//!
//! A payload that begins with a modifier but means it literally is escaped
//! with a leading backslash: `\@domain.com` searches for the exact string
//! `@domain.com` instead of applying the contains operator.
//!
//! Parsing is deliberately permissive — query strings live in bookmarks and
//! must not 500 on garbage. Unknown fields drop, unparseable dates stay
//! strings, and an unrecognized modifier is literal equality.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::coerce::{Value, coerce_value};
use crate::errors::ApiError;
use crate::query::QueryCompiler;
use crate::request::RequestContext;
use crate::schema::{AttributeType, EntitySchema};

/// A comparison operator selected by a modifier token.
///
/// Equality is the absence of an operator, and `between` normalizes into a
/// two-bound [`Criterion::Between`] at parse time, so neither appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Not,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    StartsWith,
    EndsWith,
    Contains,
    Like,
}

impl Operator {
    /// The modifier literal the reverse serializer emits.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::StartsWith => "=>",
            Self::EndsWith => "=<",
            Self::Contains => "@",
            Self::Like => "%",
        }
    }

    /// The key used in the structured form handed to the record store.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Contains => "contains",
            Self::Like => "like",
        }
    }
}

/// One field's constraint inside a [`FilterExpression`].
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Implicit equality against one value.
    Value(Value),
    /// Implicit equality against any of several values (deduplicated).
    Values(Vec<Value>),
    /// One explicit operator and its payload.
    Where(Operator, Value),
    /// Not-equals against several values (deduplicated).
    NotAny(Vec<Value>),
    /// Inclusive range bounds produced by the `><` modifier.
    Between {
        min: Option<Value>,
        max: Option<Value>,
    },
}

impl Criterion {
    /// Render back to the modifier grammar (without URL encoding).
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Value(value) => value.to_string(),
            Self::Values(items) => join_values(items),
            Self::Where(operator, value) => format!("{}{value}", operator.token()),
            Self::NotAny(items) => format!("!{}", join_values(items)),
            Self::Between {
                min: Some(min),
                max: Some(max),
            } => format!("><{min},{max}"),
            Self::Between {
                min: Some(min),
                max: None,
            } => format!(">={min}"),
            Self::Between {
                min: None,
                max: Some(max),
            } => format!("<={max}"),
            Self::Between {
                min: None,
                max: None,
            } => String::new(),
        }
    }
}

fn join_values(items: &[Value]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl Serialize for Criterion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => value.serialize(serializer),
            Self::Values(items) => items.serialize(serializer),
            Self::Where(operator, value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(operator.key(), value)?;
                map.end()
            }
            Self::NotAny(items) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(Operator::Not.key(), items)?;
                map.end()
            }
            Self::Between { min, max } => {
                let len = usize::from(min.is_some()) + usize::from(max.is_some());
                let mut map = serializer.serialize_map(Some(len))?;
                if let Some(min) = min {
                    map.serialize_entry(">=", min)?;
                }
                if let Some(max) = max {
                    map.serialize_entry("<=", max)?;
                }
                map.end()
            }
        }
    }
}

/// The normalized filter handed to the record store: an ordered mapping from
/// field name to constraint, every field a known non-relational attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    entries: Vec<(String, Criterion)>,
}

impl FilterExpression {
    /// Insert or replace a field's constraint, keeping first-seen position.
    pub fn insert(&mut self, name: impl Into<String>, criterion: Criterion) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| *key == name) {
            entry.1 = criterion;
        } else {
            self.entries.push((name, criterion));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Criterion> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, criterion)| criterion)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.entries
            .iter()
            .map(|(name, criterion)| (name.as_str(), criterion))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the whole expression back into query-string fragments joined
    /// with `&`, the exact syntax a client would have sent.
    ///
    /// Values are percent-encoded unless `decode` is set (used when the
    /// output lands somewhere encoding already happened upstream). A field
    /// whose value renders empty appears as the bare field name.
    #[must_use]
    pub fn to_query_string(&self, decode: bool) -> String {
        let mut fragments = Vec::with_capacity(self.entries.len());
        for (name, criterion) in &self.entries {
            let rendered = criterion.render();
            let rendered = rendered.trim();
            if rendered.is_empty() {
                fragments.push(name.clone());
            } else if decode {
                fragments.push(format!("{name}={rendered}"));
            } else {
                fragments.push(format!(
                    "{name}={}",
                    url_escape::encode_component(rendered)
                ));
            }
        }
        fragments.join("&")
    }
}

impl Serialize for FilterExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, criterion) in &self.entries {
            map.serialize_entry(name, criterion)?;
        }
        map.end()
    }
}

/// How a matched modifier steers the rest of parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    /// `=`/`==`: token stripped, payload treated as plain equality.
    Equals,
    Op(Operator),
    /// `><`: expands into the two-bound range.
    Between,
}

/// Longest-match modifier lookup: two-character tokens must win before their
/// one-character prefixes so `>=` is never parsed as `>` plus a literal `=`.
const TWO_CHAR_MODIFIERS: [(&str, Modifier); 10] = [
    ("==", Modifier::Equals),
    ("=<", Modifier::Op(Operator::EndsWith)),
    ("=>", Modifier::Op(Operator::StartsWith)),
    ("=%", Modifier::Op(Operator::Like)),
    ("=*", Modifier::Op(Operator::Like)),
    ("=@", Modifier::Op(Operator::Contains)),
    ("!=", Modifier::Op(Operator::Not)),
    ("<=", Modifier::Op(Operator::LessThanOrEqual)),
    (">=", Modifier::Op(Operator::GreaterThanOrEqual)),
    ("><", Modifier::Between),
];

const ONE_CHAR_MODIFIERS: [(&str, Modifier); 7] = [
    ("=", Modifier::Equals),
    ("!", Modifier::Op(Operator::Not)),
    ("@", Modifier::Op(Operator::Contains)),
    ("%", Modifier::Op(Operator::Like)),
    ("*", Modifier::Op(Operator::Like)),
    ("<", Modifier::Op(Operator::LessThan)),
    (">", Modifier::Op(Operator::GreaterThan)),
];

fn match_modifier(payload: &str) -> Option<(Modifier, usize)> {
    for (token, modifier) in TWO_CHAR_MODIFIERS {
        if payload.starts_with(token) {
            return Some((modifier, token.len()));
        }
    }
    for (token, modifier) in ONE_CHAR_MODIFIERS {
        if payload.starts_with(token) {
            return Some((modifier, token.len()));
        }
    }
    None
}

/// Rewrite unescaped `*` wildcards to the record store's `%` token. An
/// escaped `\*` keeps both characters; `%` is never rewritten.
fn normalize_wildcards(payload: &str) -> String {
    let mut normalized = String::with_capacity(payload.len());
    let mut previous: Option<char> = None;
    for character in payload.chars() {
        if character == '*' && previous != Some('\\') {
            normalized.push('%');
        } else {
            normalized.push(character);
        }
        previous = Some(character);
    }
    normalized
}

/// Parse one trimmed payload against the attribute's declared type.
///
/// Returns `None` only when nothing useful remains (a between range that
/// lost both bounds).
fn parse_criterion(raw: &str, kind: AttributeType) -> Option<Criterion> {
    let mut payload = raw;
    let mut operator: Option<Operator> = None;
    let mut between = false;

    if let Some((modifier, length)) = match_modifier(payload) {
        payload = payload[length..].trim();
        match modifier {
            Modifier::Equals => {}
            Modifier::Op(matched) => operator = Some(matched),
            Modifier::Between => between = true,
        }
    } else if let Some(rest) = payload.strip_prefix('\\') {
        // Escaped literal: strip the backslash, keep the modifier characters
        // as payload, never re-apply the modifier. A backslash before
        // anything else is not an escape and stays put.
        let rest = rest.trim_start();
        if match_modifier(rest).is_some() {
            payload = rest;
        }
    }

    let normalized;
    if operator == Some(Operator::Like) && !payload.is_empty() {
        normalized = normalize_wildcards(payload);
        payload = &normalized;
    }

    let listable = between || matches!(operator, None | Some(Operator::Not));
    if listable && payload.contains(',') {
        let mut items: Vec<Value> = Vec::new();
        for part in payload.split(',') {
            let value = coerce_value(part.trim(), kind);
            if !items.contains(&value) {
                items.push(value);
            }
        }
        if between {
            return Some(Criterion::Between {
                min: items.first().cloned(),
                max: items.get(1).cloned(),
            });
        }
        if operator == Some(Operator::Not) {
            return Some(Criterion::NotAny(items));
        }
        return Some(Criterion::Values(items));
    }

    let mut value = coerce_value(payload, kind);
    if operator == Some(Operator::Like) && value.is_null() {
        // An empty like payload matches everything
        value = Value::str("%");
    }
    if between {
        // A comma-free between payload bounds the range on both sides;
        // anything that coerced away from a string has no usable bounds.
        return match value {
            Value::Str(_) => Some(Criterion::Between {
                min: Some(value.clone()),
                max: Some(value),
            }),
            _ => None,
        };
    }
    match operator {
        None => Some(Criterion::Value(value)),
        Some(operator) => Some(Criterion::Where(operator, value)),
    }
}

impl QueryCompiler {
    /// Parse the criteria embedded in a request into a [`FilterExpression`].
    ///
    /// Candidate fields are collected in precedence order — route-level
    /// `where` defaults, then the implicit primary-key equality from the
    /// resolved identifier, then the request's own filter parameters (with
    /// all reserved parameter names blacklisted away) — and every candidate
    /// must name a known, non-relational attribute to be admitted.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] when a route-supplied blacklist
    /// is malformed. Malformed filter *payloads* never error.
    pub fn parse_criteria(
        &self,
        req: &RequestContext,
        schema: &EntitySchema,
    ) -> Result<FilterExpression, ApiError> {
        let blacklist = self.criteria_blacklist(req, schema)?;

        let mut candidates: Vec<(String, String)> = Vec::new();
        for (name, value) in &req.options.where_defaults {
            upsert(&mut candidates, name.trim().to_string(), value.clone());
        }
        if let Some(pk) = self.parse_pk(req, schema) {
            upsert(&mut candidates, schema.primary_key.clone(), pk);
        }
        for (name, value) in req.filter_params() {
            if blacklist.iter().any(|blocked| *blocked == name) {
                continue;
            }
            upsert(&mut candidates, name, value);
        }

        let mut expression = FilterExpression::default();
        for (name, raw) in candidates {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let Some(attribute) = schema.attribute(name) else {
                continue;
            };
            if attribute.is_collection() {
                continue;
            }
            if let Some(criterion) = parse_criterion(raw.trim(), attribute.kind) {
                expression.insert(name, criterion);
            }
        }
        Ok(expression)
    }

    /// The criteria reverse serializer: parse, then render back into the
    /// exact query fragments the client would have sent.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`QueryCompiler::parse_criteria`].
    pub fn criteria_fragment(
        &self,
        req: &RequestContext,
        schema: &EntitySchema,
        decode: bool,
    ) -> Result<String, ApiError> {
        Ok(self.parse_criteria(req, schema)?.to_query_string(decode))
    }
}

fn upsert(candidates: &mut Vec<(String, String)>, name: String, value: String) {
    if let Some(entry) = candidates.iter_mut().find(|(key, _)| *key == name) {
        entry.1 = value;
    } else {
        candidates.push((name, value));
    }
}
