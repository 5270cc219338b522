//! A per-test ownership sandbox: every acquired lease wraps its pooled
//! connection in a transaction that is rolled back on release, so
//! concurrent tests never see each other's writes and leave no data
//! behind. Nested transactions inside a lease collapse into depth
//! bookkeeping on the connection and never reach the server.

use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::warn;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::{
    config::Config,
    connection::Connection,
    errors::{Error, Result},
    ownership::{current_owner, with_owner, OwnerToken, OwnershipRegistry},
    pool::{create_pool, ConnectionPool, ManagedConnection},
    types::{BoltList, BoltMap},
};

/// How unowned requests are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxMode {
    /// Callers must hold or inherit a lease; everything else fails with
    /// [`Error::NotOwned`].
    Manual,
    /// Unowned requests implicitly check a connection out per operation,
    /// without any isolation.
    Auto,
    /// Every request routes to this owner's connection.
    Shared(OwnerToken),
}

#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    /// Switches the pool into `Shared` mode with the new lease as owner.
    pub shared: bool,
    /// Overrides the pool-wide ownership timeout for this lease.
    pub ownership_timeout: Option<Duration>,
}

type SharedConnection = Arc<Mutex<Option<ManagedConnection>>>;

enum CheckinReason {
    Release,
    Timeout,
}

/// A connection pool with the sandbox layered on top.
#[derive(Clone)]
pub struct SandboxPool {
    inner: Arc<SandboxInner>,
}

struct SandboxInner {
    pool: ConnectionPool,
    fetch_size: usize,
    ownership_timeout: Duration,
    mode: StdMutex<SandboxMode>,
    registry: OwnershipRegistry<SharedConnection>,
}

impl SandboxPool {
    /// Builds the pool and verifies the target is reachable.
    pub async fn connect(config: Config) -> Result<SandboxPool> {
        let pool = create_pool(&config)?;
        let _ = pool.get().await?;
        Ok(SandboxPool {
            inner: Arc::new(SandboxInner {
                pool,
                fetch_size: config.fetch_size,
                ownership_timeout: config.ownership_timeout,
                mode: StdMutex::new(SandboxMode::Manual),
                registry: OwnershipRegistry::new(),
            }),
        })
    }

    pub fn mode(&self) -> SandboxMode {
        *self.inner.mode.lock().unwrap()
    }

    pub fn set_mode(&self, mode: SandboxMode) {
        *self.inner.mode.lock().unwrap() = mode;
    }

    /// Checks out a connection, opens the sandbox transaction on it and
    /// registers the lease. The BEGIN completes before this returns.
    pub async fn acquire(&self) -> Result<Sandbox> {
        self.acquire_with(AcquireOptions::default()).await
    }

    pub async fn acquire_with(&self, options: AcquireOptions) -> Result<Sandbox> {
        let mut connection = self.inner.pool.get().await?;
        if let Err(e) = connection.begin(BoltMap::new()).await {
            if e.is_connection_error() {
                // integrity unknown, the pool must not see it again
                crate::pool::retire(connection).await;
            }
            return Err(e);
        }

        let token = OwnerToken::next();
        let shared: SharedConnection = Arc::new(Mutex::new(Some(connection)));
        self.inner.registry.register(token, Arc::clone(&shared));
        if options.shared {
            self.set_mode(SandboxMode::Shared(token));
        }

        let deadline = options
            .ownership_timeout
            .unwrap_or(self.inner.ownership_timeout);
        let watchdog = tokio::spawn({
            let inner = Arc::clone(&self.inner);
            let shared = Arc::clone(&shared);
            async move {
                tokio::time::sleep(deadline).await;
                if inner.registry.contains(token) {
                    warn!("a sandbox lease outlived its ownership timeout, rolling it back");
                    if let Err(e) =
                        SandboxInner::checkin(&inner, token, &shared, CheckinReason::Timeout).await
                    {
                        warn!("forced checkin failed: {e}");
                    }
                }
            }
        });

        Ok(Sandbox {
            token,
            shared,
            inner: Arc::clone(&self.inner),
            watchdog: Some(watchdog),
            released: false,
        })
    }

    /// Releases a lease: the sandbox transaction rolls back and the
    /// connection returns to the pool. Equivalent to dropping the
    /// sandbox, but surfaces errors and completes before returning.
    pub async fn release(&self, sandbox: Sandbox) -> Result<()> {
        sandbox.release().await
    }

    /// Grants `child` the right to route requests through `owner`'s
    /// connection. Mint child identities with [`SandboxPool::make_token`]
    /// and carry them via [`crate::with_owner`].
    pub fn allow(&self, owner: OwnerToken, child: OwnerToken) -> Result<()> {
        self.inner.registry.allow(owner, child)
    }

    pub fn make_token(&self) -> OwnerToken {
        OwnerToken::next()
    }

    /// Runs a statement on whatever connection the caller may use (its
    /// lease, an inherited one, or per the pool mode) and discards the
    /// records.
    pub async fn run(&self, query: &str, parameters: BoltMap) -> Result<()> {
        match self.lease().await? {
            Lease::Shared(shared) => {
                let mut guard = shared.lock().await;
                let connection = guard.as_mut().ok_or(Error::NotOwned)?;
                run_inner(connection, query, parameters).await
            }
            Lease::Pooled(mut connection) => run_inner(&mut connection, query, parameters).await,
        }
    }

    /// As [`run`](SandboxPool::run), collecting all records.
    pub async fn fetch(&self, query: &str, parameters: BoltMap) -> Result<Vec<BoltList>> {
        let fetch_size = self.inner.fetch_size;
        match self.lease().await? {
            Lease::Shared(shared) => {
                let mut guard = shared.lock().await;
                let connection = guard.as_mut().ok_or(Error::NotOwned)?;
                fetch_inner(connection, fetch_size, query, parameters).await
            }
            Lease::Pooled(mut connection) => {
                fetch_inner(&mut connection, fetch_size, query, parameters).await
            }
        }
    }

    async fn lease(&self) -> Result<Lease> {
        let mode = self.mode();
        if let SandboxMode::Shared(owner) = mode {
            return self
                .inner
                .registry
                .resolve(owner)
                .map(Lease::Shared)
                .ok_or(Error::NotOwned);
        }
        if let Some(caller) = current_owner() {
            if let Some(shared) = self.inner.registry.resolve(caller) {
                return Ok(Lease::Shared(shared));
            }
        }
        match mode {
            SandboxMode::Manual => Err(Error::NotOwned),
            SandboxMode::Auto => Ok(Lease::Pooled(self.inner.pool.get().await?)),
            SandboxMode::Shared(_) => unreachable!("handled above"),
        }
    }
}

enum Lease {
    Shared(SharedConnection),
    Pooled(ManagedConnection),
}

impl SandboxInner {
    async fn checkin(
        inner: &Arc<SandboxInner>,
        token: OwnerToken,
        shared: &SharedConnection,
        reason: CheckinReason,
    ) -> Result<()> {
        inner.registry.unregister(token);
        {
            let mut mode = inner.mode.lock().unwrap();
            if *mode == SandboxMode::Shared(token) {
                *mode = SandboxMode::Manual;
            }
        }

        let mut guard = shared.lock().await;
        let Some(mut connection) = guard.take() else {
            return Ok(());
        };
        if let CheckinReason::Timeout = reason {
            warn!("rolling back a lease held past its ownership timeout");
        }

        // unwind whatever depth the test left open; the outermost level
        // sends the actual ROLLBACK
        let rolled_back = async {
            while connection.tx_depth() > 0 {
                connection.rollback().await?;
            }
            Ok::<_, Error>(())
        }
        .await;

        match rolled_back {
            Ok(()) => Ok(()),
            Err(e) => {
                // a failed rollback leaves the connection's state
                // uncertain, so the pool gets a fresh one instead
                crate::pool::retire(connection).await;
                Err(e)
            }
        }
    }
}

/// One acquired lease: a pooled connection wrapped in an open
/// transaction. All statements run inside that transaction; releasing
/// (or dropping) the sandbox rolls everything back.
pub struct Sandbox {
    token: OwnerToken,
    shared: SharedConnection,
    inner: Arc<SandboxInner>,
    watchdog: Option<JoinHandle<()>>,
    released: bool,
}

impl Sandbox {
    pub fn token(&self) -> OwnerToken {
        self.token
    }

    /// Runs `fut` with this sandbox's identity as the ambient owner, so
    /// everything awaited inside routes to this lease.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        with_owner(self.token, fut).await
    }

    pub async fn run(&self, query: &str, parameters: BoltMap) -> Result<()> {
        let mut guard = self.shared.lock().await;
        let connection = guard.as_mut().ok_or(Error::NotOwned)?;
        run_inner(connection, query, parameters).await
    }

    pub async fn fetch(&self, query: &str, parameters: BoltMap) -> Result<Vec<BoltList>> {
        let mut guard = self.shared.lock().await;
        let connection = guard.as_mut().ok_or(Error::NotOwned)?;
        fetch_inner(connection, self.inner.fetch_size, query, parameters).await
    }

    /// Nested transaction control. Inside a sandbox these only move the
    /// connection's depth counter; no BEGIN/COMMIT/ROLLBACK reaches the
    /// server while the sandbox owns the outermost transaction.
    pub async fn begin(&self) -> Result<()> {
        let mut guard = self.shared.lock().await;
        let connection = guard.as_mut().ok_or(Error::NotOwned)?;
        connection.begin(BoltMap::new()).await
    }

    pub async fn commit(&self) -> Result<()> {
        let mut guard = self.shared.lock().await;
        let connection = guard.as_mut().ok_or(Error::NotOwned)?;
        connection.commit().await.map(|_| ())
    }

    pub async fn rollback(&self) -> Result<()> {
        let mut guard = self.shared.lock().await;
        let connection = guard.as_mut().ok_or(Error::NotOwned)?;
        connection.rollback().await
    }

    /// Runs `f` inside a nested transaction level: commit on success,
    /// rollback on error. Inside the sandbox both collapse to depth
    /// arithmetic.
    pub async fn transaction<T, Fut, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.begin().await?;
        match f().await {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                self.rollback().await?;
                Err(e)
            }
        }
    }

    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
        SandboxInner::checkin(&self.inner, self.token, &self.shared, CheckinReason::Release).await
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
        let inner = Arc::clone(&self.inner);
        let shared = Arc::clone(&self.shared);
        let token = self.token;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) =
                    SandboxInner::checkin(&inner, token, &shared, CheckinReason::Release).await
                {
                    warn!("rolling back a dropped sandbox failed: {e}");
                }
            });
        } else {
            // without a runtime the pooled object's own drop returns it;
            // the recycle RESET discards the open transaction
            inner.registry.unregister(token);
        }
    }
}

async fn run_inner(connection: &mut Connection, query: &str, parameters: BoltMap) -> Result<()> {
    let result = connection.run(query, parameters, BoltMap::new()).await?;
    connection.discard(-1, result.qid).await?;
    Ok(())
}

async fn fetch_inner(
    connection: &mut Connection,
    fetch_size: usize,
    query: &str,
    parameters: BoltMap,
) -> Result<Vec<BoltList>> {
    let result = connection.run(query, parameters, BoltMap::new()).await?;
    let mut records = Vec::new();
    loop {
        let (batch, summary) = connection.pull(fetch_size as i64, result.qid).await?;
        records.extend(batch);
        if !summary.has_more() {
            return Ok(records);
        }
    }
}
