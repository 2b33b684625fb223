//! # get: name the query, get the data
//!
//! Queries are written as identifiers. `UserByEmail`, `PostsFromUser` and
//! `AllUsers` are parsed into an intent, compiled once into a [`plan::QueryPlan`]
//! and executed through a pluggable [`adapter::Adapter`].
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use get::prelude::*;
//!
//! let engine = Engine::with_config(FileConfig::load(path)?.into_config()?);
//!
//! let user = engine
//!     .query("UserByEmail")?
//!     .expect("query identifier")
//!     .arg("a@example.com")
//!     .run()?;
//! ```
//!
//! ## Verbs
//!
//! | Identifier          | Verb         | Resolves to                                 |
//! |---------------------|--------------|---------------------------------------------|
//! | `UserByEmail`       | `By`         | first user whose `email` matches            |
//! | `UsersByStatus`     | `By`         | every user whose `status` matches           |
//! | `UserById`          | `By`         | primary-key lookup                          |
//! | `UserBy`            | `By`         | first user matching a map of conditions     |
//! | `PostsFromUser`     | `From`       | walk from a user through `via` relations    |
//! | `UsersJoinedWithPosts` | `JoinedWith` | users joined with their posts         |
//! | `AllUsers`          | `All`        | every user, no arguments                    |

pub mod adapter;
pub mod builders;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod executor;
pub mod inflect;
pub mod parser;
pub mod plan;

pub mod prelude {
    pub use crate::adapter::memory::{MemoryAdapterFactory, MemoryStore};
    pub use crate::adapter::{
        Adapter, AdapterError, AdapterErrorKind, AdapterFactory, AdapterResult, RawResult, Record,
        RecordSet, StoreHandle,
    };
    pub use crate::config::{Config, FileConfig};
    pub use crate::engine::{Engine, Query};
    pub use crate::entity::{Entity, EntityCollection, EntityType, Output};
    pub use crate::error::*;
    pub use crate::parser::{ParsedIdentifier, Verb};
    pub use crate::plan::{Action, ActionName, Invocation, Options, PlanKind, QueryPlan};
}

/// Parse an identifier into its query intent.
///
/// Returns `Ok(None)` for identifiers that are not queries.
///
/// # Example
///
/// ```
/// use get::parse;
///
/// let intent = parse("UserByEmail").unwrap().unwrap();
/// assert_eq!(intent.result_entity, "User");
/// assert_eq!(intent.key.as_deref(), Some("email"));
/// assert!(parse("UserRepository").unwrap().is_none());
/// ```
pub fn parse(identifier: &str) -> error::GetResult<Option<parser::ParsedIdentifier>> {
    parser::parse(identifier)
}
