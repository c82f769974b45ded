//! # listquery
//!
//! A query-parameter compiler for REST collection endpoints. Clients express
//! a rich filter language directly in the URL — equality, negation, ranges,
//! prefix/suffix/substring/wildcard matching, between-ranges — alongside
//! sorting, field selection, association expansion and pagination, without a
//! query-builder client library:
//!
//! ```text
//! GET /users?age=>=18&name==>Ma&status=1,2,3&sort=-createdAt&fields=-password&page=2
//! ```
//!
//! The compiler parses all of that into structured descriptors, and every
//! parser has a paired reverse serializer that renders the descriptor back
//! into the exact query fragment the client sent — which is what makes the
//! synthesized `first`/`prev`/`next`/`last` pagination links replay the
//! caller's complete filter state.
//!
//! ## Usage
//!
//! ```rust
//! use listquery::{ApiConfig, AttributeType, EntitySchema, QueryCompiler, RequestContext};
//!
//! let compiler = QueryCompiler::new(ApiConfig::default());
//! let schema = EntitySchema::new("user", "userId")
//!     .attr("name", AttributeType::String)
//!     .attr("age", AttributeType::Number);
//!
//! let req = RequestContext::parse("http://api.test/users?age=%3E%3D18&sort=-id").unwrap();
//! let query = compiler.compile(&req, &schema).unwrap();
//! assert_eq!(query.pagination.limit, 30);
//!
//! let links = compiler.pagination_urls(&req, &schema, 95).unwrap();
//! assert!(links.next.unwrap().contains("age=%3E%3D18"));
//! ```
//!
//! The compiler never talks to storage: [`ListQuery`] is the interface to
//! the record store, and the [`condition`] module translates it into
//! Sea-ORM building blocks for backends that want them.

pub mod coerce;
pub mod condition;
pub mod config;
pub mod criteria;
pub mod errors;
pub mod fields;
pub mod pagination;
pub mod populate;
pub mod presentation;
pub mod query;
pub mod request;
pub mod schema;
pub mod sort;

pub use coerce::Value;
pub use config::{ApiConfig, EntityOverrides, LimitCeiling, ParameterNames, PopulateDefault};
pub use criteria::{Criterion, FilterExpression, Operator};
pub use errors::ApiError;
pub use fields::FieldSelection;
pub use pagination::{PaginationSpec, PaginationUrls, pagination_headers};
pub use populate::{Populate, PopulateSpec};
pub use query::{ListQuery, QueryCompiler};
pub use request::{ListParams, RequestContext, RouteOptions};
pub use schema::{
    Association, AssociationArity, Attribute, AttributeType, EntitySchema, SchemaRegistry,
};
pub use sort::{SortDescriptor, SortDirection};
