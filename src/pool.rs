use std::sync::Arc;
use std::time::Duration;

use deadpool::managed::{Manager, Metrics, Object, Pool, RecycleResult};
use log::{debug, info, trace};

use crate::breaker::CircuitRegistry;
use crate::config::{BackoffConfig, Config};
use crate::connection::{Connection, ConnectionInfo};
use crate::errors::{Error, Result};

pub type ConnectionPool = Pool<ConnectionManager>;
pub type ManagedConnection = Object<ConnectionManager>;

pub struct ConnectionManager {
    info: ConnectionInfo,
    endpoint: String,
    circuits: Arc<CircuitRegistry>,
    idle_interval: Duration,
    ping_timeout: Duration,
    backoff: Option<BackoffConfig>,
}

impl ConnectionManager {
    pub fn new(config: &Config) -> Result<Self> {
        let info = ConnectionInfo::new(config)?;
        Ok(ConnectionManager {
            info,
            endpoint: config.endpoint(),
            circuits: Arc::new(CircuitRegistry::new()),
            idle_interval: config.idle_interval,
            ping_timeout: config.ping_timeout,
            backoff: config.backoff.clone(),
        })
    }

    pub fn backoff(&self) -> Option<&BackoffConfig> {
        self.backoff.as_ref()
    }

    /// The breaker registry guarding this manager's endpoint, for callers
    /// that want to inspect or share the circuit state.
    pub fn circuits(&self) -> Arc<CircuitRegistry> {
        Arc::clone(&self.circuits)
    }
}

impl Manager for ConnectionManager {
    type Type = Connection;
    type Error = Error;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        trace!("creating new connection to {}", self.endpoint);
        self.circuits.check(&self.endpoint)?;
        match Connection::new(&self.info).await {
            Ok(connection) => {
                self.circuits.record_success(&self.endpoint);
                Ok(connection)
            }
            Err(e) => {
                self.circuits.record_error(&self.endpoint, &e);
                Err(e)
            }
        }
    }

    async fn recycle(&self, obj: &mut Self::Type, metrics: &Metrics) -> RecycleResult<Self::Error> {
        if !obj.is_open() {
            debug!("dropping a defunct connection instead of recycling it");
            return Err(Error::ConnectionClosed.into());
        }
        // a connection that sat in the pool may have been closed by the
        // server; a cheap RESET ping finds out before anyone uses it
        if metrics.last_used() >= self.idle_interval {
            trace!("pinging idle connection before reuse");
            obj.ping(self.ping_timeout).await?;
        }
        Ok(())
    }
}

/// Permanently removes a connection from the pool: GOODBYE best-effort
/// (skipped when the socket is already dead), then close.
pub(crate) async fn retire(connection: ManagedConnection) {
    let mut connection = ManagedConnection::take(connection);
    connection.goodbye().await;
}

pub fn create_pool(config: &Config) -> Result<ConnectionPool> {
    let mgr = ConnectionManager::new(config)?;
    info!(
        "creating connection pool for {} with max size {}",
        mgr.endpoint, config.pool_size
    );
    ConnectionPool::builder(mgr)
        .max_size(config.pool_size)
        .build()
        .map_err(|_| Error::InvalidConfig("pool could not be built"))
}
