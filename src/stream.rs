use std::collections::VecDeque;

use futures::{stream::try_unfold, TryStream};

use crate::{
    errors::{Error, Result},
    pool::ManagedConnection,
    txn::TransactionHandle,
    types::BoltList,
};

/// A stream of raw records produced by one RUN. Needs a connection handle
/// to pull batches; records are delivered positionally against the
/// `fields` the RUN announced.
#[must_use = "Results must be streamed through with `next` in order to execute the query"]
pub struct RecordStream {
    qid: i64,
    fields: Vec<String>,
    fetch_size: usize,
    state: StreamState,
    buffer: VecDeque<BoltList>,
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum StreamState {
    Ready,
    Complete,
}

impl RecordStream {
    pub(crate) fn new(qid: i64, fields: Vec<String>, fetch_size: usize) -> Self {
        RecordStream {
            qid,
            fields,
            fetch_size,
            state: StreamState::Ready,
            buffer: VecDeque::new(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the next record, fetching another batch from the server
    /// whenever the buffer runs dry.
    pub async fn next(&mut self, mut handle: impl TransactionHandle) -> Result<Option<BoltList>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            match self.state {
                StreamState::Ready => {
                    let connection = handle.connection();
                    let (records, summary) =
                        connection.pull(self.fetch_size as i64, self.qid).await?;
                    self.buffer.extend(records);
                    if !summary.has_more() {
                        self.state = StreamState::Complete;
                    }
                }
                StreamState::Complete => return Ok(None),
            }
        }
    }

    /// Adapts this stream to a [`futures::TryStream`] of records.
    pub fn into_stream(
        self,
        handle: impl TransactionHandle,
    ) -> impl TryStream<Ok = BoltList, Error = Error> {
        try_unfold((self, handle), |(mut stream, mut handle)| async move {
            match stream.next(&mut handle).await {
                Ok(Some(record)) => Ok(Some((record, (stream, handle)))),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }
}

/// A [`RecordStream`] that owns its pooled connection; the connection
/// returns to the pool when the stream is dropped.
#[must_use = "Results must be streamed through with `next` in order to execute the query"]
pub struct DetachedRecordStream {
    stream: RecordStream,
    connection: ManagedConnection,
}

impl DetachedRecordStream {
    pub(crate) fn new(stream: RecordStream, connection: ManagedConnection) -> Self {
        DetachedRecordStream { stream, connection }
    }

    pub fn fields(&self) -> &[String] {
        self.stream.fields()
    }

    pub async fn next(&mut self) -> Result<Option<BoltList>> {
        self.stream.next(&mut self.connection).await
    }

    pub fn into_stream(self) -> impl TryStream<Ok = BoltList, Error = Error> {
        self.stream.into_stream(self.connection)
    }
}
