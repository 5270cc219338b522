use crate::{
    config::{BackoffConfig, Config},
    errors::Result,
    pool::{create_pool, ConnectionPool, ManagedConnection},
    retry::with_retry_using,
    stream::{DetachedRecordStream, RecordStream},
    txn::Txn,
    types::BoltMap,
};

/// A pooled Bolt client.
///
/// Cloning is cheap; internal resources are reference-counted.
#[derive(Clone)]
pub struct Graph {
    db: Option<String>,
    fetch_size: usize,
    backoff: Option<BackoffConfig>,
    pool: ConnectionPool,
}

impl Graph {
    /// Connects to the server with the configurations provided, checking
    /// out one connection to fail fast on unreachable or unauthorized
    /// targets.
    pub async fn connect(config: Config) -> Result<Self> {
        let graph = Graph {
            db: config.db.clone(),
            fetch_size: config.fetch_size,
            backoff: config.backoff.clone(),
            pool: create_pool(&config)?,
        };
        let _ = graph.pool.get().await?;
        Ok(graph)
    }

    async fn checkout(&self) -> Result<ManagedConnection> {
        Ok(self.pool.get().await?)
    }

    /// Runs a statement and discards its records, retrying transient
    /// connection trouble with the configured backoff.
    pub async fn run(&self, query: &str, parameters: BoltMap) -> Result<()> {
        let backoff = self.backoff.clone().unwrap_or_default();
        with_retry_using(&backoff, || {
            let parameters = parameters.clone();
            async move {
                let mut connection = self.checkout().await?;
                let result = connection.run(query, parameters, self.extra()).await?;
                connection.discard(-1, result.qid).await?;
                Ok(())
            }
        })
        .await
    }

    /// Runs a statement and returns a stream over its raw records. The
    /// stream holds a pooled connection until dropped.
    pub async fn execute(&self, query: &str, parameters: BoltMap) -> Result<DetachedRecordStream> {
        let backoff = self.backoff.clone().unwrap_or_default();
        with_retry_using(&backoff, || {
            let parameters = parameters.clone();
            async move {
                let mut connection = self.checkout().await?;
                let result = connection.run(query, parameters, self.extra()).await?;
                let stream = RecordStream::new(result.qid, result.fields, self.fetch_size);
                Ok(DetachedRecordStream::new(stream, connection))
            }
        })
        .await
    }

    /// Starts an explicit transaction on a dedicated connection.
    ///
    /// Transactions are not retried on failure.
    pub async fn start_txn(&self) -> Result<Txn> {
        self.start_txn_on(self.db.clone()).await
    }

    /// Starts an explicit transaction against the given database.
    pub async fn start_txn_on(&self, db: impl Into<Option<String>>) -> Result<Txn> {
        let connection = self.checkout().await?;
        Txn::new(db.into(), self.fetch_size, connection).await
    }

    fn extra(&self) -> BoltMap {
        let mut extra = BoltMap::new();
        if let Some(db) = self.db.as_deref() {
            extra.put("db".into(), db.into());
        }
        extra
    }
}
