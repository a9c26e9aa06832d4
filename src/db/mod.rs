//! Database module: schema, row models and the query layer.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL and column widths
//! - `store.rs`: pooled connection and typed queries

pub mod models;
pub mod schema;
pub mod store;

pub use models::{DbKey, DbSession, DbUser};
pub use schema::AUTH_INIT;
pub use store::{AuthStorage, Database};
