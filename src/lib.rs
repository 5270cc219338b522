//! Bolt protocol client core for Neo4j.
//!
//! * A hand-rolled [PackStream][packstream] codec and chunked message framing
//! * The Bolt state machine for protocol versions 1 through 5.6, with
//!   per-version message vocabularies negotiated at handshake time
//! * A [deadpool][deadpool]-managed connection pool with circuit-breaker
//!   guarded connects, RESET health checks and exponential-backoff retries
//! * A per-test [`SandboxPool`]: every lease wraps its connection in a
//!   transaction that is rolled back on release, so concurrent tests stay
//!   invisible to each other and clean up after themselves
//!
//! [packstream]: https://neo4j.com/docs/bolt/current/packstream/
//! [deadpool]: https://docs.rs/deadpool
//!
//! # Examples
//!
//! Run a query against a pooled client:
//!
//! ```no_run
//! use boltcore::{config, BoltMap, Graph};
//!
//! #[tokio::main]
//! async fn main() -> boltcore::Result<()> {
//!     let config = config()
//!         .uri("bolt://127.0.0.1:7687")?
//!         .basic_auth("neo4j", "neo")
//!         .build()?;
//!     let graph = Graph::connect(config).await?;
//!
//!     graph.run("CREATE (:Person {name: $name})",
//!         [("name".into(), "alice".into())].into_iter().collect(),
//!     ).await?;
//!
//!     let mut rows = graph.execute("MATCH (p:Person) RETURN p.name", BoltMap::new()).await?;
//!     while let Some(row) = rows.next().await? {
//!         println!("{:?}", row.get(0));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Isolate a test in a sandbox:
//!
//! ```no_run
//! use boltcore::{config, BoltMap, SandboxPool};
//!
//! #[tokio::main]
//! async fn main() -> boltcore::Result<()> {
//!     let config = config()
//!         .uri("bolt://127.0.0.1:7687")?
//!         .basic_auth("neo4j", "neo")
//!         .build()?;
//!     let pool = SandboxPool::connect(config).await?;
//!
//!     let sandbox = pool.acquire().await?;
//!     sandbox.run("CREATE (:T {k: 'a'})", BoltMap::new()).await?;
//!     // visible inside the lease...
//!     let rows = sandbox.fetch("MATCH (n:T) RETURN count(n)", BoltMap::new()).await?;
//!     println!("{:?}", rows[0].get(0));
//!     // ...and rolled back here
//!     sandbox.release().await?;
//!     Ok(())
//! }
//! ```

mod breaker;
mod config;
mod connection;
mod convert;
mod errors;
mod graph;
pub mod messages;
mod ownership;
mod pool;
mod retry;
mod sandbox;
mod state;
mod stream;
mod txn;
mod types;
mod version;

pub use crate::breaker::{BreakerState, CircuitBreaker, CircuitRegistry};
pub use crate::config::{config, BackoffConfig, BasicAuth, Config, ConfigBuilder, TlsMode};
pub use crate::connection::{Connection, RunResult, ServerHints};
pub use crate::errors::{Error, Result, ServerError, ServerErrorKind};
pub use crate::graph::Graph;
pub use crate::messages::{BoltRequest, BoltResponse, RequestKind};
pub use crate::ownership::{current_owner, with_owner, OwnerToken};
pub use crate::pool::{create_pool, ConnectionManager, ConnectionPool, ManagedConnection};
pub use crate::retry::{with_retry, with_retry_using};
pub use crate::sandbox::{AcquireOptions, Sandbox, SandboxMode, SandboxPool};
pub use crate::state::State;
pub use crate::stream::{DetachedRecordStream, RecordStream};
pub use crate::txn::{TransactionHandle, Txn};
pub use crate::types::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNode, BoltNull, BoltPath,
    BoltRelation, BoltString, BoltType, BoltUnboundedRelation,
};
pub use crate::version::Version;
