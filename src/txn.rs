use crate::{
    errors::Result,
    messages::Begin,
    pool::ManagedConnection,
    stream::RecordStream,
    types::BoltMap,
};

/// A handle controlling an explicit transaction, created by
/// [`crate::Graph::start_txn`].
///
/// The handle reserves a pooled connection for its lifetime. Dropping it
/// without calling [`commit`](Txn::commit) leaves the open transaction to
/// be rolled back by the pool's RESET when the connection is reused.
pub struct Txn {
    db: Option<String>,
    fetch_size: usize,
    connection: ManagedConnection,
    bookmark: Option<String>,
}

impl Txn {
    pub(crate) async fn new(
        db: Option<String>,
        fetch_size: usize,
        mut connection: ManagedConnection,
    ) -> Result<Self> {
        let extra = Begin::builder()
            .with_db(db.clone())
            .into_extra(connection.version());
        connection.begin(extra).await?;
        Ok(Txn {
            db,
            fetch_size,
            connection,
            bookmark: None,
        })
    }

    /// Runs a statement and discards its records.
    pub async fn run(&mut self, query: &str, parameters: BoltMap) -> Result<()> {
        let extra = self.extra();
        let result = self.connection.run(query, parameters, extra).await?;
        self.connection.discard(-1, result.qid).await?;
        Ok(())
    }

    /// Runs several statements back to back on the same connection.
    pub async fn run_queries<'a>(
        &mut self,
        queries: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        for query in queries {
            self.run(query, BoltMap::new()).await?;
        }
        Ok(())
    }

    /// Runs a statement and returns a stream over its records.
    pub async fn execute(&mut self, query: &str, parameters: BoltMap) -> Result<RecordStream> {
        let extra = self.extra();
        let result = self.connection.run(query, parameters, extra).await?;
        Ok(RecordStream::new(
            result.qid,
            result.fields,
            self.fetch_size,
        ))
    }

    /// Commits the transaction in progress, returning the bookmark the
    /// server handed out, if any.
    pub async fn commit(mut self) -> Result<Option<String>> {
        self.bookmark = self.connection.commit().await?;
        Ok(self.bookmark)
    }

    /// Aborts the transaction in progress.
    pub async fn rollback(mut self) -> Result<()> {
        self.connection.rollback().await
    }

    pub fn handle(&mut self) -> &mut impl TransactionHandle {
        self
    }

    pub fn last_bookmark(&self) -> Option<&str> {
        self.bookmark.as_deref()
    }

    fn extra(&self) -> BoltMap {
        let mut extra = BoltMap::new();
        if let Some(db) = self.db.as_deref() {
            extra.put("db".into(), db.into());
        }
        extra
    }
}

const _: () = {
    const fn assert_send<T: ?Sized + Send>() {}
    assert_send::<Txn>();
};

pub trait TransactionHandle: private::Handle {}

impl TransactionHandle for Txn {}
impl TransactionHandle for ManagedConnection {}
impl TransactionHandle for crate::connection::Connection {}
impl<T: TransactionHandle> TransactionHandle for &mut T {}

pub(crate) mod private {
    use crate::{connection::Connection, pool::ManagedConnection, txn::Txn};

    pub trait Handle {
        fn connection(&mut self) -> &mut Connection;
    }

    impl Handle for Txn {
        fn connection(&mut self) -> &mut Connection {
            &mut self.connection
        }
    }

    impl Handle for ManagedConnection {
        fn connection(&mut self) -> &mut Connection {
            self
        }
    }

    impl Handle for Connection {
        fn connection(&mut self) -> &mut Connection {
            self
        }
    }

    impl<T: Handle> Handle for &mut T {
        fn connection(&mut self) -> &mut Connection {
            (**self).connection()
        }
    }
}
