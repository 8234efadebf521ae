//! Compilation of CRM operations into GraphQL documents.
//!
//! The Twenty GraphQL API addresses each object collection by name, so every query and mutation
//! is built as text. All of that string building lives in this crate:
//!
//! * [`compile_filter`] turns field/operator/value conditions and `and`/`or` groups into filter
//!   argument syntax
//! * [`compile_list_query`] and [`compile_get_query`] build paginated connection queries
//! * [`compile_mutation`] builds create, update and delete mutations, resolving object names to
//!   mutation tokens with [`mutation_token`]
//!
//! Every function is pure. Each returns a [`CompiledOperation`] carrying the document text and
//! the key of its result in the response `data`.

pub mod error;
mod filter;
mod mutation;
mod naming;
mod query;
mod render;

pub use error::QueryError;
pub use filter::{Filter, FilterCondition, FilterOperator, compile_filter};
pub use mutation::{MutationKind, compile_mutation};
pub use naming::mutation_token;
pub use query::{
    CompiledOperation, ListQuery, OrderBy, OrderDirection, compile_get_query, compile_list_query,
    compile_object_schema_query, compile_objects_query, compile_search_query,
};
pub use render::render_value;
