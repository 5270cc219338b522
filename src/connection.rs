use std::mem;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use log::{debug, trace, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, BufStream},
    net::TcpStream,
    time::timeout,
};
use tokio_rustls::TlsConnector;
use url::Host;

use crate::{
    config::{BasicAuth, Config, TlsMode},
    errors::{Error, Result},
    messages::{BoltRequest, BoltResponse, Hello, Init, Success},
    state::State,
    types::{BoltList, BoltMap},
    version::{Version, BOLT_MAGIC},
};
use stream::ConnectionStream;

pub(crate) const MAX_CHUNK_SIZE: usize = 65_535 - mem::size_of::<u16>();

/// A single Bolt connection: the socket, the negotiated version and the
/// client half of the protocol state machine.
#[derive(Debug)]
pub struct Connection {
    version: Version,
    stream: BufStream<ConnectionStream>,
    state: State,
    tx_depth: u32,
    recv_timeout: Duration,
    hints: ServerHints,
}

/// Summary of a successful RUN: the announced columns and the query id
/// to address the stream with.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub fields: Vec<String>,
    pub qid: i64,
}

/// Hints the server volunteers in the HELLO/INIT success metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerHints {
    pub server: Option<String>,
    pub connection_id: Option<String>,
    pub recv_timeout: Option<Duration>,
    pub telemetry_enabled: Option<bool>,
    pub ssr_enabled: Option<bool>,
    pub hints: BoltMap,
}

impl ServerHints {
    fn from_success(success: &Success) -> ServerHints {
        let nested: BoltMap = success.get("hints").unwrap_or_default();
        let get_bool = |key: &str| nested.get::<bool>(key).or_else(|| success.get(key));
        let recv_timeout = nested
            .get::<i64>("connection.recv_timeout_seconds")
            .or_else(|| success.get("connection.recv_timeout_seconds"))
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(secs as u64));
        ServerHints {
            server: success.get("server"),
            connection_id: success.get("connection_id"),
            recv_timeout,
            telemetry_enabled: get_bool("telemetry.enabled"),
            ssr_enabled: get_bool("ssr.enabled"),
            hints: nested,
        }
    }
}

impl Connection {
    pub(crate) async fn new(info: &ConnectionInfo) -> Result<Connection> {
        if info.debug_connect {
            debug!(
                "connecting to {:?} port {} (tls: {:?}, timeout: {:?}, recv_timeout: {:?})",
                info.host, info.port, info.tls, info.connect_timeout, info.recv_timeout
            );
        }
        timeout(info.connect_timeout, Self::dial(info))
            .await
            .map_err(|_| Error::Timeout("connect"))?
    }

    async fn dial(info: &ConnectionInfo) -> Result<Connection> {
        // IP literals were classified at config time, so no DNS lookup
        // happens for them here.
        let stream = match &info.host {
            Host::Domain(domain) => TcpStream::connect((&**domain, info.port)).await?,
            Host::Ipv4(ip) => TcpStream::connect((*ip, info.port)).await?,
            Host::Ipv6(ip) => TcpStream::connect((*ip, info.port)).await?,
        };
        stream.set_nodelay(true)?;

        let stream = match &info.tls {
            TlsMode::Disabled => ConnectionStream::from(stream),
            tls => ConnectionStream::from(tls::connect(stream, &info.host, tls).await?),
        };
        Self::setup(stream, info).await
    }

    /// Runs the version handshake and the per-version auth exchange on an
    /// already connected transport.
    pub(crate) async fn setup(stream: ConnectionStream, info: &ConnectionInfo) -> Result<Connection> {
        let mut stream = BufStream::new(stream);
        stream.write_all(&BOLT_MAGIC).await?;
        stream.write_all(&Version::supported_versions()).await?;
        stream.flush().await?;

        let mut response = [0u8; 4];
        stream.read_exact(&mut response).await?;
        let version = Version::parse(response)?;

        let mut connection = Connection {
            version,
            stream,
            state: State::Authenticating,
            tx_depth: 0,
            recv_timeout: info.recv_timeout,
            hints: ServerHints::default(),
        };
        connection.authenticate(info).await?;
        connection.state = State::Ready;
        Ok(connection)
    }

    async fn authenticate(&mut self, info: &ConnectionInfo) -> Result<()> {
        let auth = info.auth.as_ref();
        let request = if !self.version.supports_hello() {
            let (principal, credentials) = auth
                .map(|a| (a.username.as_str(), a.password.as_str()))
                .unwrap_or(("", ""));
            BoltRequest::Init(Init::new((&*info.user_agent).into(), principal, credentials))
        } else {
            let mut builder = Hello::builder(&*info.user_agent)
                .with_routing(info.routing.clone())
                .with_notification_filter(
                    info.notifications_minimum_severity.clone(),
                    info.notifications_disabled_classifications.clone(),
                );
            if let Some(auth) = auth {
                builder = builder.with_auth(&auth.username, &auth.password);
            }
            BoltRequest::Hello(builder.build(self.version))
        };

        let success = self.expect_success(request, "HELLO").await?;
        self.hints = ServerHints::from_success(&success);
        if let Some(recv_timeout) = self.hints.recv_timeout {
            self.recv_timeout = recv_timeout;
        }

        if self.version.supports_logon() {
            if let Some(BasicAuth { username, password }) = auth {
                self.expect_success(BoltRequest::logon(username, password), "LOGON")
                    .await?;
            }
        }
        Ok(())
    }

    async fn expect_success(
        &mut self,
        request: BoltRequest,
        msg: &'static str,
    ) -> Result<Success> {
        match self.send_recv(request).await? {
            BoltResponse::Success(success) => Ok(success),
            BoltResponse::Failure(failure) => {
                self.state = State::Failed;
                Err(failure.into_error())
            }
            response => Err(response.into_error(msg)),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn hints(&self) -> &ServerHints {
        &self.hints
    }

    pub fn tx_depth(&self) -> u32 {
        self.tx_depth
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Submits a statement. On success the connection moves to the
    /// streaming state and the stream must be drained with [`pull`] or
    /// [`discard`] before anything else runs.
    ///
    /// [`pull`]: Connection::pull
    /// [`discard`]: Connection::discard
    pub async fn run(
        &mut self,
        query: &str,
        parameters: BoltMap,
        extra: BoltMap,
    ) -> Result<RunResult> {
        let request = BoltRequest::run(query, parameters, extra);
        match self.send_recv(request).await? {
            BoltResponse::Success(success) => {
                self.state = self.state.after_run();
                Ok(RunResult {
                    fields: success.fields(),
                    qid: success.qid(),
                })
            }
            response => Err(self.recover(response, "RUN").await),
        }
    }

    /// Fetches one batch of records. The response sequence is consumed
    /// until its terminal SUCCESS, which reports whether the stream has
    /// more batches.
    pub async fn pull(&mut self, n: i64, qid: i64) -> Result<(Vec<BoltList>, Success)> {
        let request = if self.version.supports_flow_control() {
            BoltRequest::pull(n, qid)?
        } else {
            BoltRequest::pull_all()
        };
        self.send(request).await?;
        let mut records = Vec::new();
        loop {
            match self.recv().await? {
                BoltResponse::Record(record) => records.push(record.data),
                BoltResponse::Success(success) => {
                    self.state = if success.has_more() {
                        self.state
                    } else {
                        self.state.after_drain()
                    };
                    return Ok((records, success));
                }
                response => return Err(self.recover(response, "PULL").await),
            }
        }
    }

    /// Drops up to `n` records server-side without delivering them.
    pub async fn discard(&mut self, n: i64, qid: i64) -> Result<Success> {
        let request = if self.version.supports_flow_control() {
            BoltRequest::discard(n, qid)?
        } else {
            BoltRequest::discard_all()
        };
        self.send(request).await?;
        loop {
            match self.recv().await? {
                // discarded rows are not delivered, drop any stragglers
                BoltResponse::Record(_) => continue,
                BoltResponse::Success(success) => {
                    self.state = if success.has_more() {
                        self.state
                    } else {
                        self.state.after_drain()
                    };
                    return Ok(success);
                }
                response => return Err(self.recover(response, "DISCARD").await),
            }
        }
    }

    /// Opens an explicit transaction, or—when one is already open—just
    /// deepens the bookkeeping. Neo4j has no savepoints, so nested BEGINs
    /// must never reach the wire.
    pub async fn begin(&mut self, extra: BoltMap) -> Result<()> {
        if self.state.in_transaction() {
            self.tx_depth += 1;
            trace!("nested begin, tx_depth now {}", self.tx_depth);
            return Ok(());
        }
        match self.send_recv(BoltRequest::begin(extra)).await? {
            BoltResponse::Success(_) => {
                self.state = State::TxReady;
                self.tx_depth = 1;
                Ok(())
            }
            response => Err(self.recover(response, "BEGIN").await),
        }
    }

    /// Closes the current transaction level. Only the outermost level
    /// exchanges a real COMMIT; inner levels decrement the depth.
    pub async fn commit(&mut self) -> Result<Option<String>> {
        match self.tx_depth {
            0 => Err(Error::NotInTransaction),
            1 => match self.send_recv(BoltRequest::commit()).await? {
                BoltResponse::Success(success) => {
                    self.state = State::Ready;
                    self.tx_depth = 0;
                    Ok(success.bookmark())
                }
                response => Err(self.recover(response, "COMMIT").await),
            },
            _ => {
                self.tx_depth -= 1;
                trace!("nested commit, tx_depth now {}", self.tx_depth);
                Ok(None)
            }
        }
    }

    /// As [`commit`](Connection::commit), with ROLLBACK on the wire.
    pub async fn rollback(&mut self) -> Result<()> {
        match self.tx_depth {
            0 => Err(Error::NotInTransaction),
            1 => match self.send_recv(BoltRequest::rollback()).await? {
                BoltResponse::Success(_) => {
                    self.state = State::Ready;
                    self.tx_depth = 0;
                    Ok(())
                }
                response => Err(self.recover(response, "ROLLBACK").await),
            },
            _ => {
                self.tx_depth -= 1;
                trace!("nested rollback, tx_depth now {}", self.tx_depth);
                Ok(())
            }
        }
    }

    /// Returns the connection to READY, discarding any queued responses.
    /// A RESET that fails leaves the connection Defunct.
    pub async fn reset(&mut self) -> Result<()> {
        self.state = State::Interrupted;
        self.tx_depth = 0;
        if let Err(e) = self.send(BoltRequest::reset()).await {
            self.state = State::Defunct;
            return Err(e);
        }
        loop {
            match self.recv().await {
                Ok(BoltResponse::Success(_)) => {
                    self.state = State::Ready;
                    return Ok(());
                }
                Ok(BoltResponse::Failure(failure)) => {
                    self.state = State::Defunct;
                    return Err(failure.into_error());
                }
                // queued records and IGNOREDs drain away
                Ok(_) => continue,
                Err(e) => {
                    self.state = State::Defunct;
                    return Err(e);
                }
            }
        }
    }

    /// Acknowledges a failure the v1-v3 way. On v4+ connections the
    /// request is rewritten to RESET before encoding.
    pub async fn ack_failure(&mut self) -> Result<()> {
        match self.send_recv(BoltRequest::ack_failure()).await? {
            BoltResponse::Success(_) => {
                self.state = State::Ready;
                Ok(())
            }
            response => {
                self.state = State::Defunct;
                Err(response.into_error("ACK_FAILURE"))
            }
        }
    }

    /// Re-authenticates an unauthenticated session (v5.1+).
    pub async fn logon(&mut self, username: &str, password: &str) -> Result<()> {
        self.expect_success(BoltRequest::logon(username, password), "LOGON")
            .await?;
        self.state = State::Ready;
        Ok(())
    }

    /// Drops the session's authentication without closing the socket
    /// (v5.1+). A LOGON must follow before anything else runs.
    pub async fn logoff(&mut self) -> Result<()> {
        match self.send_recv(BoltRequest::logoff()).await? {
            BoltResponse::Success(_) => {
                self.state = State::Authenticating;
                Ok(())
            }
            response => Err(self.recover(response, "LOGOFF").await),
        }
    }

    /// A RESET with a short read deadline, used to validate idle pooled
    /// connections. Any failure means the socket is not worth keeping.
    pub async fn ping(&mut self, deadline: Duration) -> Result<()> {
        let recv_timeout = mem::replace(&mut self.recv_timeout, deadline);
        let result = self.reset().await;
        self.recv_timeout = recv_timeout;
        result
    }

    /// Best-effort goodbye before closing. The server may have hung up
    /// already, so write failures only get logged. Skipped entirely for
    /// connections that already went Defunct.
    pub async fn goodbye(&mut self) {
        if self.version.supports_hello() && self.state.is_open() {
            if let Err(e) = self.send(BoltRequest::goodbye()).await {
                debug!("GOODBYE failed, closing anyway: {e}");
            }
        }
        self.state = State::Defunct;
        let _ = self.stream.shutdown().await;
    }

    /// Asks for a routing table (v4.3+). The SUCCESS metadata is handed
    /// back verbatim; caching is the caller's business.
    pub async fn route(
        &mut self,
        routing: BoltMap,
        bookmarks: Vec<String>,
        db: Option<String>,
    ) -> Result<BoltMap> {
        let bookmarks: BoltList = bookmarks.into_iter().map(Into::into).collect();
        let request = BoltRequest::route(routing, bookmarks, db);
        match self.send_recv(request).await? {
            BoltResponse::Success(success) => Ok(success.metadata().clone()),
            response => Err(self.recover(response, "ROUTE").await),
        }
    }

    /// Reports a driver API metric (v5.4+). Quietly does nothing when the
    /// version or the server hints say it is unwanted, and failures are
    /// never surfaced.
    pub async fn telemetry(&mut self, api: i64) -> Result<()> {
        if !self.version.supports_telemetry() || self.hints.telemetry_enabled == Some(false) {
            return Ok(());
        }
        match self.send_recv(BoltRequest::telemetry(api)).await {
            Ok(BoltResponse::Success(_)) => Ok(()),
            Ok(response) => {
                debug!("TELEMETRY was not accepted: {response:?}");
                let _ = self.recover(response, "TELEMETRY").await;
                Ok(())
            }
            Err(e) if e.is_connection_error() => Err(e),
            Err(e) => {
                debug!("TELEMETRY failed: {e}");
                Ok(())
            }
        }
    }

    /// Shared failure path: park the machine in Failed, classify the
    /// response, then RESET so the connection is usable again before the
    /// error surfaces. A failing RESET leaves the connection Defunct.
    async fn recover(&mut self, response: BoltResponse, msg: &'static str) -> Error {
        self.state = State::Failed;
        let error = response.into_error(msg);
        if let Err(reset_err) = self.reset().await {
            warn!("RESET after failed {msg} did not recover the connection: {reset_err}");
        }
        error
    }

    pub async fn send_recv(&mut self, message: BoltRequest) -> Result<BoltResponse> {
        self.send(message).await?;
        self.recv().await
    }

    pub async fn send(&mut self, message: BoltRequest) -> Result<()> {
        let message = message.normalize(self.version);
        let kind = message.kind();
        if !self.state.accepts(kind) {
            return Err(match self.state {
                State::Defunct => Error::ConnectionClosed,
                State::Failed | State::Interrupted => Error::ServerInFailedState(kind.name()),
                state => Error::UnexpectedMessage(format!(
                    "{} is not allowed in the {state:?} state",
                    kind.name()
                )),
            });
        }
        trace!("sending {} in {:?}", kind.name(), self.state);
        let bytes = message.into_bytes(self.version)?;
        self.send_bytes(bytes).await
    }

    pub async fn recv(&mut self) -> Result<BoltResponse> {
        if !self.state.is_open() {
            return Err(Error::ConnectionClosed);
        }
        let bytes = match timeout(self.recv_timeout, self.recv_bytes()).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                self.state = State::Defunct;
                return Err(e);
            }
            Err(_) => {
                self.state = State::Defunct;
                return Err(Error::Timeout("recv"));
            }
        };
        let response = BoltResponse::parse(self.version, bytes)?;
        if let BoltResponse::Failure(_) = &response {
            self.state = State::Failed;
        }
        Ok(response)
    }

    async fn send_bytes(&mut self, bytes: Bytes) -> Result<()> {
        let framed = enchunk(bytes)?;
        if let Err(e) = async {
            self.stream.write_all(&framed).await?;
            self.stream.flush().await
        }
        .await
        {
            self.state = State::Defunct;
            return Err(e.into());
        }
        Ok(())
    }

    async fn recv_bytes(&mut self) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        let mut chunk_size = 0;
        // leading 0x0000 are noop padding between messages
        while chunk_size == 0 {
            chunk_size = self.read_chunk_size().await?;
        }

        while chunk_size > 0 {
            self.read_chunk(chunk_size, &mut bytes).await?;
            chunk_size = self.read_chunk_size().await?;
        }

        Ok(bytes.freeze())
    }

    async fn read_chunk_size(&mut self) -> Result<usize> {
        Ok(usize::from(self.stream.read_u16().await?))
    }

    async fn read_chunk(&mut self, chunk_size: usize, buf: &mut BytesMut) -> Result<()> {
        let pos = buf.len();
        buf.resize(pos + chunk_size, 0);
        self.stream.read_exact(&mut buf[pos..]).await?;
        Ok(())
    }
}

/// Splits a message into `u16`-length-prefixed chunks and closes it with
/// the `0x0000` end marker.
pub(crate) fn enchunk(bytes: Bytes) -> Result<Bytes> {
    let mut framed =
        BytesMut::with_capacity(bytes.len() + 2 * (bytes.len() / MAX_CHUNK_SIZE + 2));
    for chunk in bytes.chunks(MAX_CHUNK_SIZE) {
        write_chunk(&mut framed, chunk)?;
    }
    framed.extend_from_slice(&[0, 0]);
    Ok(framed.freeze())
}

fn write_chunk(framed: &mut BytesMut, chunk: &[u8]) -> Result<()> {
    if chunk.len() > MAX_CHUNK_SIZE {
        return Err(Error::ChunkOverflow {
            got: chunk.len(),
            max: MAX_CHUNK_SIZE,
        });
    }
    framed.extend_from_slice(&(chunk.len() as u16).to_be_bytes());
    framed.extend_from_slice(chunk);
    Ok(())
}

/// Everything needed to dial and authenticate one connection, resolved
/// once per pool from the [`Config`].
#[derive(Debug, Clone)]
pub(crate) struct ConnectionInfo {
    pub(crate) host: Host<Arc<str>>,
    pub(crate) port: u16,
    pub(crate) auth: Option<BasicAuth>,
    pub(crate) tls: TlsMode,
    pub(crate) user_agent: Arc<str>,
    pub(crate) routing: Option<BoltMap>,
    pub(crate) connect_timeout: Duration,
    pub(crate) recv_timeout: Duration,
    pub(crate) notifications_minimum_severity: Option<String>,
    pub(crate) notifications_disabled_classifications: Vec<String>,
    pub(crate) debug_connect: bool,
}

impl ConnectionInfo {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        // `Host::parse` keeps IP literals numeric, so they never hit DNS
        let host = match Host::parse(&config.hostname)? {
            Host::Domain(s) => Host::Domain(Arc::from(s.as_str())),
            Host::Ipv4(ip) => Host::Ipv4(ip),
            Host::Ipv6(ip) => Host::Ipv6(ip),
        };
        Ok(ConnectionInfo {
            host,
            port: config.port,
            auth: config.auth.clone(),
            tls: config.tls.clone(),
            user_agent: Arc::from(crate::messages::USER_AGENT),
            routing: config.routing_context.clone(),
            connect_timeout: config.connect_timeout,
            recv_timeout: config.recv_timeout,
            notifications_minimum_severity: config.notifications_minimum_severity.clone(),
            notifications_disabled_classifications: config
                .notifications_disabled_classifications
                .clone(),
            debug_connect: config.debug_connect,
        })
    }
}

mod tls {
    use super::*;
    use rustls::client::danger::{
        HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
    };
    use rustls::crypto::CryptoProvider;
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
    use tokio_rustls::client::TlsStream;

    pub(super) async fn connect(
        stream: TcpStream,
        host: &Host<Arc<str>>,
        mode: &TlsMode,
    ) -> Result<TlsStream<TcpStream>> {
        let config = client_config(mode)?;
        let connector = TlsConnector::from(Arc::new(config));
        let server_name = match host {
            Host::Domain(domain) => ServerName::try_from(domain.to_string())
                .map_err(|_| Error::InvalidDnsName(domain.to_string()))?,
            Host::Ipv4(ip) => ServerName::IpAddress(IpAddr::V4(*ip).into()),
            Host::Ipv6(ip) => ServerName::IpAddress(IpAddr::V6(*ip).into()),
        };
        Ok(connector.connect(server_name, stream).await?)
    }

    fn client_config(mode: &TlsMode) -> Result<ClientConfig> {
        match mode {
            TlsMode::Disabled => unreachable!("plain TCP takes the other branch"),
            TlsMode::TrustSystemRoots => {
                let mut roots = RootCertStore::empty();
                let native = rustls_native_certs::load_native_certs();
                for error in &native.errors {
                    warn!("skipping a native root certificate: {error}");
                }
                for cert in native.certs {
                    let _ = roots.add(cert);
                }
                Ok(ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth())
            }
            TlsMode::CustomCa(path) => {
                let mut roots = RootCertStore::empty();
                let pem = std::fs::read(path)?;
                for cert in rustls_pemfile::certs(&mut &pem[..]) {
                    let _ = roots.add(cert?);
                }
                Ok(ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth())
            }
            TlsMode::TrustAnyCertificate => Ok(ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(SkipServerVerification::new())
                .with_no_client_auth()),
        }
    }

    #[derive(Debug)]
    struct SkipServerVerification(CryptoProvider);

    impl SkipServerVerification {
        fn new() -> Arc<Self> {
            Arc::new(Self(rustls::crypto::ring::default_provider()))
        }
    }

    impl ServerCertVerifier for SkipServerVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> std::result::Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls12_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls13_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }
}

mod stream {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::{
        io::{AsyncRead, AsyncWrite, ReadBuf},
        net::TcpStream,
    };
    use tokio_rustls::client::TlsStream;

    /// All the transports a connection can sit on. Every variant is
    /// `Unpin`, so the poll impls project with `Pin::new`.
    #[derive(Debug)]
    pub(crate) enum ConnectionStream {
        Unencrypted { stream: TcpStream },
        Encrypted { stream: Box<TlsStream<TcpStream>> },
        #[cfg(test)]
        Local { stream: tokio::io::DuplexStream },
    }

    impl From<TcpStream> for ConnectionStream {
        fn from(stream: TcpStream) -> Self {
            ConnectionStream::Unencrypted { stream }
        }
    }

    impl From<TlsStream<TcpStream>> for ConnectionStream {
        fn from(stream: TlsStream<TcpStream>) -> Self {
            ConnectionStream::Encrypted {
                stream: Box::new(stream),
            }
        }
    }

    #[cfg(test)]
    impl From<tokio::io::DuplexStream> for ConnectionStream {
        fn from(stream: tokio::io::DuplexStream) -> Self {
            ConnectionStream::Local { stream }
        }
    }

    impl AsyncRead for ConnectionStream {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            match self.get_mut() {
                ConnectionStream::Unencrypted { stream } => Pin::new(stream).poll_read(cx, buf),
                ConnectionStream::Encrypted { stream } => Pin::new(stream).poll_read(cx, buf),
                #[cfg(test)]
                ConnectionStream::Local { stream } => Pin::new(stream).poll_read(cx, buf),
            }
        }
    }

    impl AsyncWrite for ConnectionStream {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            match self.get_mut() {
                ConnectionStream::Unencrypted { stream } => Pin::new(stream).poll_write(cx, buf),
                ConnectionStream::Encrypted { stream } => Pin::new(stream).poll_write(cx, buf),
                #[cfg(test)]
                ConnectionStream::Local { stream } => Pin::new(stream).poll_write(cx, buf),
            }
        }

        fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            match self.get_mut() {
                ConnectionStream::Unencrypted { stream } => Pin::new(stream).poll_flush(cx),
                ConnectionStream::Encrypted { stream } => Pin::new(stream).poll_flush(cx),
                #[cfg(test)]
                ConnectionStream::Local { stream } => Pin::new(stream).poll_flush(cx),
            }
        }

        fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            match self.get_mut() {
                ConnectionStream::Unencrypted { stream } => Pin::new(stream).poll_shutdown(cx),
                ConnectionStream::Encrypted { stream } => Pin::new(stream).poll_shutdown(cx),
                #[cfg(test)]
                ConnectionStream::Local { stream } => Pin::new(stream).poll_shutdown(cx),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testkit::{pair, read_message, send_raw, send_success, signature};
    use super::*;
    use crate::messages::{Failure, Ignored, Record};
    use crate::types::wire::BoltWireFormat;
    use crate::types::BoltType;

    fn success_map(entries: &[(&str, BoltType)]) -> BoltMap {
        entries
            .iter()
            .map(|(k, v)| (BoltString::from(*k), v.clone()))
            .collect()
    }

    use crate::types::BoltString;

    #[tokio::test]
    async fn handshake_negotiates_the_best_version() {
        let (client, mut server) = tokio::io::duplex(1 << 16);
        let info = ConnectionInfo {
            host: Host::Domain(Arc::from("localhost")),
            port: 7687,
            auth: Some(BasicAuth::new("neo4j", "secret")),
            tls: TlsMode::Disabled,
            user_agent: Arc::from("boltcore-test"),
            routing: None,
            connect_timeout: Duration::from_secs(5),
            recv_timeout: Duration::from_secs(5),
            notifications_minimum_severity: None,
            notifications_disabled_classifications: Vec::new(),
            debug_connect: false,
        };

        let server_task = tokio::spawn(async move {
            let mut handshake = [0u8; 20];
            server.read_exact(&mut handshake).await.unwrap();
            assert_eq!(&handshake[..4], &BOLT_MAGIC);
            assert_eq!(&handshake[4..8], &[0x00, 0x04, 0x06, 0x05]);
            server.write_all(&[0, 4, 6, 5]).await.unwrap();

            let hello = read_message(&mut server).await;
            assert_eq!(signature(&hello), 0x01);
            let mut hints = BoltMap::new();
            hints.put("connection.recv_timeout_seconds".into(), BoltType::from(2));
            hints.put("telemetry.enabled".into(), BoltType::from(true));
            let mut metadata = BoltMap::new();
            metadata.put("server".into(), "Neo4j/5.6.0".into());
            metadata.put("connection_id".into(), "bolt-7".into());
            metadata.put("hints".into(), BoltType::Map(hints));
            send_success(&mut server, metadata).await;

            let logon = read_message(&mut server).await;
            assert_eq!(signature(&logon), 0x6A);
            send_success(&mut server, BoltMap::new()).await;
            server
        });

        let connection = Connection::setup(client.into(), &info).await.unwrap();
        assert_eq!(connection.version(), Version::V5_6);
        assert_eq!(connection.state(), State::Ready);
        assert_eq!(connection.hints().server.as_deref(), Some("Neo4j/5.6.0"));
        assert_eq!(connection.hints().telemetry_enabled, Some(true));
        assert_eq!(connection.recv_timeout, Duration::from_secs(2));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn rejected_handshake_surfaces_as_error() {
        let (client, mut server) = tokio::io::duplex(1 << 16);
        let info = ConnectionInfo {
            host: Host::Domain(Arc::from("localhost")),
            port: 7687,
            auth: None,
            tls: TlsMode::Disabled,
            user_agent: Arc::from("boltcore-test"),
            routing: None,
            connect_timeout: Duration::from_secs(5),
            recv_timeout: Duration::from_secs(5),
            notifications_minimum_severity: None,
            notifications_disabled_classifications: Vec::new(),
            debug_connect: false,
        };

        tokio::spawn(async move {
            let mut handshake = [0u8; 20];
            server.read_exact(&mut handshake).await.unwrap();
            server.write_all(&[0, 0, 0, 0]).await.unwrap();
        });

        assert!(matches!(
            Connection::setup(client.into(), &info).await,
            Err(Error::HandshakeRejected)
        ));
    }

    #[tokio::test]
    async fn nested_transactions_stay_off_the_wire() {
        let (mut connection, mut server) = pair(Version::V5);

        let server_task = tokio::spawn(async move {
            let mut signatures = Vec::new();
            // exactly two messages reach the server: BEGIN and COMMIT
            for _ in 0..2 {
                let message = read_message(&mut server).await;
                signatures.push(signature(&message));
                send_success(&mut server, BoltMap::new()).await;
            }
            signatures
        });

        connection.begin(BoltMap::new()).await.unwrap();
        connection.begin(BoltMap::new()).await.unwrap();
        connection.begin(BoltMap::new()).await.unwrap();
        assert_eq!(connection.tx_depth(), 3);
        assert_eq!(connection.state(), State::TxReady);

        connection.commit().await.unwrap();
        connection.commit().await.unwrap();
        assert_eq!(connection.tx_depth(), 1);

        // the outermost commit is the one that talks to the server
        connection.commit().await.unwrap();
        assert_eq!(connection.tx_depth(), 0);
        assert_eq!(connection.state(), State::Ready);

        assert_eq!(server_task.await.unwrap(), vec![0x11, 0x12]);
        assert!(matches!(
            connection.commit().await,
            Err(Error::NotInTransaction)
        ));
    }

    #[tokio::test]
    async fn run_failure_resets_and_recovers() {
        let (mut connection, mut server) = pair(Version::V4_4);

        let server_task = tokio::spawn(async move {
            let run = read_message(&mut server).await;
            assert_eq!(signature(&run), 0x10);
            let mut metadata = BoltMap::new();
            metadata.put(
                "code".into(),
                "Neo.ClientError.Statement.SyntaxError".into(),
            );
            metadata.put("message".into(), "bad cypher".into());
            let failure = Failure::new(metadata).into_bytes(Version::V4_4).unwrap();
            send_raw(&mut server, failure).await;

            let reset = read_message(&mut server).await;
            assert_eq!(signature(&reset), 0x0F);
            send_success(&mut server, BoltMap::new()).await;
        });

        let err = connection
            .run("MATCH (n RETURN n", BoltMap::new(), BoltMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Server(_)));
        // RESET already ran, the connection is usable again
        assert_eq!(connection.state(), State::Ready);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn ignored_response_reports_the_failed_state() {
        let (mut connection, mut server) = pair(Version::V4_4);

        let server_task = tokio::spawn(async move {
            let _run = read_message(&mut server).await;
            let ignored = Ignored.into_bytes(Version::V4_4).unwrap();
            send_raw(&mut server, ignored).await;
            let reset = read_message(&mut server).await;
            assert_eq!(signature(&reset), 0x0F);
            send_success(&mut server, BoltMap::new()).await;
        });

        let err = connection
            .run("RETURN 1", BoltMap::new(), BoltMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServerInFailedState("RUN")));
        assert_eq!(connection.state(), State::Ready);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn pull_streams_records_until_the_summary() {
        let (mut connection, mut server) = pair(Version::V4_4);

        let server_task = tokio::spawn(async move {
            let run = read_message(&mut server).await;
            assert_eq!(signature(&run), 0x10);
            send_success(
                &mut server,
                success_map(&[
                    ("fields", BoltType::from(vec!["n"])),
                    ("qid", BoltType::from(0)),
                ]),
            )
            .await;

            let pull = read_message(&mut server).await;
            assert_eq!(signature(&pull), 0x3F);
            for i in 0..2 {
                let record = Record::new([BoltType::from(i)].into_iter().collect())
                    .into_bytes(Version::V4_4)
                    .unwrap();
                send_raw(&mut server, record).await;
            }
            send_success(&mut server, success_map(&[("has_more", BoltType::from(true))])).await;

            let pull = read_message(&mut server).await;
            assert_eq!(signature(&pull), 0x3F);
            let record = Record::new([BoltType::from(2)].into_iter().collect())
                .into_bytes(Version::V4_4)
                .unwrap();
            send_raw(&mut server, record).await;
            send_success(&mut server, BoltMap::new()).await;
        });

        let result = connection
            .run("RETURN 1 AS n", BoltMap::new(), BoltMap::new())
            .await
            .unwrap();
        assert_eq!(result.fields, vec!["n"]);
        assert_eq!(connection.state(), State::Streaming);

        let (records, summary) = connection.pull(2, result.qid).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(summary.has_more());
        assert_eq!(connection.state(), State::Streaming);

        let (records, summary) = connection.pull(2, result.qid).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!summary.has_more());
        assert_eq!(connection.state(), State::Ready);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn large_messages_split_into_chunks_and_reassemble() {
        let payload = Bytes::from(vec![0x42u8; 150_000]);
        let framed = enchunk(payload.clone()).unwrap();

        // 65_533 + 65_533 + 18_934 payload bytes in three chunks
        assert_eq!(&framed[..2], &(MAX_CHUNK_SIZE as u16).to_be_bytes());
        assert_eq!(framed.len(), 150_000 + 3 * 2 + 2);
        assert_eq!(&framed[framed.len() - 2..], &[0, 0]);

        let (mut connection, mut server) = pair(Version::V4_4);
        let server_task =
            tokio::spawn(async move { read_message(&mut server).await });
        connection.send_bytes(payload.clone()).await.unwrap();
        assert_eq!(server_task.await.unwrap(), payload);
    }

    #[tokio::test]
    async fn ping_timeout_marks_the_connection_defunct() {
        let (mut connection, server) = pair(Version::V4_4);
        // the server never answers
        let err = connection.ping(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout("recv")));
        assert_eq!(connection.state(), State::Defunct);
        assert!(matches!(
            connection.run("RETURN 1", BoltMap::new(), BoltMap::new()).await,
            Err(Error::ConnectionClosed)
        ));
        drop(server);
    }

    #[tokio::test]
    async fn reset_drains_queued_responses() {
        let (mut connection, mut server) = pair(Version::V4_4);

        let server_task = tokio::spawn(async move {
            let reset = read_message(&mut server).await;
            assert_eq!(signature(&reset), 0x0F);
            // stale records and an IGNORED are still queued before the
            // RESET's own SUCCESS
            let record = Record::new([BoltType::from(1)].into_iter().collect())
                .into_bytes(Version::V4_4)
                .unwrap();
            send_raw(&mut server, record).await;
            let ignored = Ignored.into_bytes(Version::V4_4).unwrap();
            send_raw(&mut server, ignored).await;
            send_success(&mut server, BoltMap::new()).await;
        });

        connection.reset().await.unwrap();
        assert_eq!(connection.state(), State::Ready);
        server_task.await.unwrap();
    }
}
