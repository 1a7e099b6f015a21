//! # cypher-bolt — a Cypher query builder and Bolt transport client
//!
//! Compose Cypher queries as a typed AST rather than string-templating them,
//! then run them over a pooled, routed Bolt connection to Neo4j or Memgraph.
//!
//! ## Design principles
//!
//! 1. **Parameter-safe by construction**: every literal that enters a query
//!    through [`qb::expr::Expression::literal`] is interned into the query's
//!    [`qb::value::ParameterTable`] and rendered as a `$pN` reference, never
//!    spliced into the Cypher text.
//! 2. **Deterministic rendering**: clause order is canonical regardless of
//!    the order they were attached in, so the same logical query always
//!    produces the same text (§4.4).
//! 3. **Routing is data, not global state**: a [`bolt::router::ModelRouting`]
//!    is a value a collaborator owns; [`bolt::router::connected_to`] scopes
//!    which physical database it resolves against for the current task.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use cypher_bolt::prelude::*;
//!
//! # async fn example() -> cypher_bolt::Result<()> {
//! let (cypher, params) = Query::new()
//!     .match_clause(vec![node().label("Person").alias("p").into()])?
//!     .where_clause(Expression::prop("p", "name").eq(Expression::literal("Ada")))
//!     .return_(vec![Expression::var("p")], false)
//!     .build();
//!
//! let config = DriverConfig::from_file("db.toml")?;
//! let registry = PoolRegistry::new();
//! let router = Router::new(registry, config, 10);
//! let routing = ModelRouting::new().route("writing", "default");
//! let conn = RoutedConnection::new(&router, routing);
//!
//! let session = conn.session()?;
//! let rows = session.execute(&cypher, params, "example").await?;
//! for row in &rows.rows {
//!     println!("{:?}", row.values);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bolt;
pub mod config;
pub mod error;
pub mod qb;
pub mod url;

pub use error::{Error, Result};

/// The crate's common entry points, for a `use cypher_bolt::prelude::*;` glob
/// import.
pub mod prelude {
    pub use crate::bolt::{connected_to, ModelRouting, PoolRegistry, RoutedConnection, Router, Session};
    pub use crate::config::DriverConfig;
    pub use crate::qb::{node, path, rel, Expression, Query};
    pub use crate::qb::value::Value;
    pub use crate::url::Endpoint;
    pub use crate::{Error, Result};
}
