//! Bolt transport: handshake, PackStream wire encoding, chunked framing,
//! pooled connections, routing, and the session surface built on top of
//! them (§4.5–§4.14).

pub mod connection;
pub mod framing;
pub mod message;
pub mod packstream;
pub mod pool;
pub mod router;
pub mod session;
pub mod stream;
pub mod telemetry;

pub use connection::{Connection, ConnectionState};
pub use pool::{Checkout, Pool};
pub use router::{connected_to, current_route, ModelRouting, PoolRegistry, RoleTarget, RouteContext, Router};
pub use session::{as_node, as_path, as_relationship, Row, Rows, RoutedConnection, Session, TxSession};
pub use stream::Stream;
