//! Association-expansion (populate) parsing and its reverse serializer.
//!
//! The `populate` parameter accepts boolean-ish strings (`true`/`1` expands
//! every association, `false`/`0` none) or a comma-separated alias list,
//! with optional surrounding brackets (`[posts,author]`). The resolved
//! setting intersects with the entity's declared associations, each carrying
//! the resolved populate limit.

use serde::Serialize;

use crate::config::PopulateDefault;
use crate::query::QueryCompiler;
use crate::request::RequestContext;
use crate::schema::EntitySchema;

/// The resolved populate setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Populate {
    /// No expansion (the hard default).
    Off,
    /// Expand every declared association.
    All,
    /// Expand only the named aliases (deduplicated, blanks removed).
    Aliases(Vec<String>),
}

/// One association to expand, as handed to the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulateSpec {
    pub alias: String,
    /// Records per populated collection, clamped like `limit`.
    pub limit: u64,
}

impl QueryCompiler {
    /// Resolve and parse the populate setting for a request.
    ///
    /// Precedence: request parameter, per-entity override, global default,
    /// then off.
    #[must_use]
    pub fn parse_populate(&self, req: &RequestContext, schema: &EntitySchema) -> Populate {
        let name = &self.config().parameters.populate;
        if let Some(raw) = req.param(name) {
            let raw = raw.trim();
            return match raw {
                "false" | "0" => Populate::Off,
                // A bare `populate` parameter means "everything"
                "true" | "1" | "" => Populate::All,
                _ => Populate::Aliases(alias_list(&raw.replace(['[', ']'], ""))),
            };
        }
        schema
            .overrides
            .default_populate
            .as_ref()
            .or(self.config().default_populate.as_ref())
            .map_or(Populate::Off, from_default)
    }

    /// Resolve the populate setting into per-association expansion specs.
    ///
    /// Aliases that match no declared association drop silently; every spec
    /// carries the resolved populate limit.
    #[must_use]
    pub fn populate_specs(&self, req: &RequestContext, schema: &EntitySchema) -> Vec<PopulateSpec> {
        let populate = self.parse_populate(req, schema);
        if populate == Populate::Off {
            return Vec::new();
        }
        let limit = self.parse_populate_limit(req, schema);
        schema
            .associations
            .iter()
            .filter(|association| match &populate {
                Populate::Off => false,
                Populate::All => true,
                Populate::Aliases(aliases) => aliases.iter().any(|alias| *alias == association.alias),
            })
            .map(|association| PopulateSpec {
                alias: association.alias.clone(),
                limit,
            })
            .collect()
    }

    /// Render the populate setting back into its query fragment, or nothing
    /// when the client never sent the parameter.
    #[must_use]
    pub fn populate_fragment(&self, req: &RequestContext, schema: &EntitySchema) -> String {
        let name = &self.config().parameters.populate;
        if !req.has_param(name) {
            return String::new();
        }
        match self.parse_populate(req, schema) {
            Populate::All => name.clone(),
            Populate::Off => format!("{name}=0"),
            Populate::Aliases(aliases) => format!("{name}={}", aliases.join(",")),
        }
    }
}

fn from_default(default: &PopulateDefault) -> Populate {
    match default {
        PopulateDefault::Toggle(true) => Populate::All,
        PopulateDefault::Toggle(false) => Populate::Off,
        PopulateDefault::Csv(raw) => Populate::Aliases(alias_list(raw)),
        PopulateDefault::List(aliases) => Populate::Aliases(alias_list(&aliases.join(","))),
    }
}

fn alias_list(raw: &str) -> Vec<String> {
    let mut aliases: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if !part.is_empty() && !aliases.iter().any(|existing| existing == part) {
            aliases.push(part.to_string());
        }
    }
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, EntityOverrides};
    use crate::schema::{AssociationArity, AttributeType};

    fn compiler() -> QueryCompiler {
        QueryCompiler::new(ApiConfig::default())
    }

    fn schema() -> EntitySchema {
        EntitySchema::new("user", "id")
            .attr("name", AttributeType::String)
            .assoc("posts", AssociationArity::Many)
            .assoc("profile", AssociationArity::One)
    }

    fn req(query: &str) -> RequestContext {
        RequestContext::parse(&format!("http://api.test/users?{query}")).unwrap()
    }

    #[test]
    fn test_boolean_ish_strings() {
        assert_eq!(compiler().parse_populate(&req("populate=true"), &schema()), Populate::All);
        assert_eq!(compiler().parse_populate(&req("populate=1"), &schema()), Populate::All);
        assert_eq!(compiler().parse_populate(&req("populate"), &schema()), Populate::All);
        assert_eq!(compiler().parse_populate(&req("populate=false"), &schema()), Populate::Off);
        assert_eq!(compiler().parse_populate(&req("populate=0"), &schema()), Populate::Off);
    }

    #[test]
    fn test_alias_lists_with_and_without_brackets() {
        let expected = Populate::Aliases(vec!["posts".to_string(), "profile".to_string()]);
        assert_eq!(
            compiler().parse_populate(&req("populate=posts,profile"), &schema()),
            expected
        );
        assert_eq!(
            compiler().parse_populate(&req("populate=%5Bposts,profile%5D"), &schema()),
            expected
        );
    }

    #[test]
    fn test_aliases_deduplicate_and_drop_blanks() {
        assert_eq!(
            compiler().parse_populate(&req("populate=posts,,posts"), &schema()),
            Populate::Aliases(vec!["posts".to_string()])
        );
    }

    #[test]
    fn test_default_is_off() {
        assert_eq!(compiler().parse_populate(&req(""), &schema()), Populate::Off);
    }

    #[test]
    fn test_precedence_entity_override() {
        let schema = schema().with_overrides(EntityOverrides {
            default_populate: Some(PopulateDefault::Csv("profile".to_string())),
            ..EntityOverrides::default()
        });
        assert_eq!(
            compiler().parse_populate(&req(""), &schema),
            Populate::Aliases(vec!["profile".to_string()])
        );
    }

    #[test]
    fn test_specs_intersect_with_declared_associations() {
        let specs = compiler().populate_specs(&req("populate=posts,bogus"), &schema());
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].alias, "posts");
        assert_eq!(specs[0].limit, 30);
    }

    #[test]
    fn test_specs_expand_everything_on_all() {
        let specs = compiler().populate_specs(&req("populate=true"), &schema());
        let aliases: Vec<&str> = specs.iter().map(|spec| spec.alias.as_str()).collect();
        assert_eq!(aliases, vec!["posts", "profile"]);
    }

    #[test]
    fn test_specs_carry_the_populate_limit() {
        let specs = compiler().populate_specs(&req("populate=posts&populateLimit=5"), &schema());
        assert_eq!(specs[0].limit, 5);
    }

    #[test]
    fn test_fragments() {
        assert_eq!(compiler().populate_fragment(&req("populate=true"), &schema()), "populate");
        assert_eq!(compiler().populate_fragment(&req("populate=0"), &schema()), "populate=0");
        assert_eq!(
            compiler().populate_fragment(&req("populate=posts,profile"), &schema()),
            "populate=posts,profile"
        );
        assert_eq!(compiler().populate_fragment(&req(""), &schema()), "");
    }
}
