//! The immutable configuration snapshot consulted by every parser.
//!
//! The original system kept this in module-level mutable state set once at
//! boot. Here it is an explicitly constructed value the compiler captures at
//! construction time and never mutates, which satisfies the same "set once,
//! read everywhere" need without ambient globals. How the snapshot is loaded
//! is the operator's business — everything derives `Deserialize` with
//! defaults so any source works.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Hard default page when no layer supplies one.
pub const DEFAULT_PAGE: u64 = 1;
/// Hard default page size when no layer supplies one.
pub const DEFAULT_LIMIT: u64 = 30;
/// Hard default ceiling applied to `limit` and `populateLimit`.
pub const DEFAULT_MAXIMUM_LIMIT: u64 = 100;
/// Hard default sort expression; `id` maps to the entity's primary key.
pub const DEFAULT_SORT: &str = "id";

/// An upper bound for page sizes.
///
/// Configured as a number, or as `false` for "no clamping at all" — the
/// serialized form mirrors that convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitCeiling {
    /// Inclusive upper bound, expected to be >= 1.
    Capped(u64),
    /// No clamping.
    Unlimited,
}

impl LimitCeiling {
    /// The bound to clamp against, if any. A zero cap counts as unset.
    #[must_use]
    pub const fn cap(self) -> Option<u64> {
        match self {
            Self::Capped(max) if max >= 1 => Some(max),
            Self::Capped(_) | Self::Unlimited => None,
        }
    }

    /// Whether this ceiling carries a usable value for precedence resolution.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Unlimited | Self::Capped(1..))
    }
}

impl Serialize for LimitCeiling {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Capped(max) => serializer.serialize_u64(*max),
            Self::Unlimited => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for LimitCeiling {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CeilingVisitor;

        impl de::Visitor<'_> for CeilingVisitor {
            type Value = LimitCeiling;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a positive integer or `false`")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(LimitCeiling::Capped(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                u64::try_from(value)
                    .map(LimitCeiling::Capped)
                    .map_err(|_| E::custom("maximum limit must not be negative"))
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
                if value {
                    Err(E::custom("use a number for a bounded maximum limit"))
                } else {
                    Ok(LimitCeiling::Unlimited)
                }
            }
        }

        deserializer.deserialize_any(CeilingVisitor)
    }
}

/// A default populate setting: a toggle, a comma-separated string, or an
/// explicit alias list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PopulateDefault {
    /// `true` expands every association, `false` none.
    Toggle(bool),
    /// Explicit alias list.
    List(Vec<String>),
    /// Comma-separated alias string.
    Csv(String),
}

/// The query-string key for each recognized parameter.
///
/// Operators can rename any of them without code changes; criteria field
/// admission blacklists whatever names are configured here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParameterNames {
    pub page: String,
    pub limit: String,
    pub sort: String,
    pub fields: String,
    pub populate: String,
    pub populate_limit: String,
    pub pretty: String,
    pub envelope: String,
    /// The JSONP callback parameter.
    pub jsonp: String,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            page: "page".to_string(),
            limit: "limit".to_string(),
            sort: "sort".to_string(),
            fields: "fields".to_string(),
            populate: "populate".to_string(),
            populate_limit: "populateLimit".to_string(),
            pretty: "pretty".to_string(),
            envelope: "envelope".to_string(),
            jsonp: "callback".to_string(),
        }
    }
}

/// Global configuration defaults.
///
/// Every field is optional on purpose: an unset field lets resolution fall
/// through to the route-supplied fallback and finally the hard default, so
/// "not configured" and "configured to the default value" stay distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiConfig {
    pub parameters: ParameterNames,
    pub default_page: Option<u64>,
    pub default_limit: Option<u64>,
    pub maximum_limit: Option<LimitCeiling>,
    pub default_sort: Option<String>,
    pub default_fields: Option<String>,
    pub default_populate: Option<PopulateDefault>,
    pub default_populate_limit: Option<u64>,
    pub maximum_populate_limit: Option<LimitCeiling>,
    /// Enables the `pretty` parameter at all; off by default.
    pub pretty: bool,
    /// Envelope setting when the request does not say.
    pub default_envelope: bool,
    /// JSONP support; `None` defers to the route options.
    pub jsonp: Option<bool>,
}

/// Per-entity override block, the middle precedence tier.
///
/// An entity only defines what it wants to override; everything else falls
/// through to the global configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityOverrides {
    pub default_page: Option<u64>,
    pub default_limit: Option<u64>,
    pub maximum_limit: Option<LimitCeiling>,
    pub default_sort: Option<String>,
    pub default_fields: Option<String>,
    pub default_populate: Option<PopulateDefault>,
    pub default_populate_limit: Option<u64>,
    pub maximum_populate_limit: Option<LimitCeiling>,
}
