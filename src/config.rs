use std::path::PathBuf;
use std::time::Duration;

use backon::ExponentialBuilder;
use url::Url;

use crate::errors::{Error, Result};
use crate::types::BoltMap;

const DEFAULT_PORT: u16 = 7687;
const DEFAULT_POOL_SIZE: usize = 16;
const DEFAULT_FETCH_SIZE: usize = 200;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_OWNERSHIP_TIMEOUT: Duration = Duration::from_secs(120);

/// Username and password for the `basic` auth scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        BasicAuth {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// How the TCP stream is wrapped.
///
/// `TrustAnyCertificate` skips certificate verification entirely and
/// exists for test rigs talking to servers with throwaway certs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    #[default]
    Disabled,
    TrustSystemRoots,
    TrustAnyCertificate,
    CustomCa(PathBuf),
}

/// Exponential backoff settings used by [`crate::with_retry`] and
/// the pool when creating connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    pub base: Duration,
    pub max: Duration,
    pub max_retries: usize,
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig {
            base: Duration::from_millis(100),
            max: Duration::from_secs(5),
            max_retries: 3,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    pub(crate) fn to_exponential_builder(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.base)
            .with_max_delay(self.max)
            .with_max_times(self.max_retries);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// The configuration used to connect, see [`crate::Graph::connect`].
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) hostname: String,
    pub(crate) port: u16,
    pub(crate) auth: Option<BasicAuth>,
    pub(crate) tls: TlsMode,
    pub(crate) routing_context: Option<BoltMap>,
    pub(crate) db: Option<String>,
    pub(crate) fetch_size: usize,
    pub(crate) pool_size: usize,
    pub(crate) connect_timeout: Duration,
    pub(crate) recv_timeout: Duration,
    pub(crate) ping_timeout: Duration,
    pub(crate) idle_interval: Duration,
    pub(crate) ownership_timeout: Duration,
    pub(crate) backoff: Option<BackoffConfig>,
    pub(crate) notifications_minimum_severity: Option<String>,
    pub(crate) notifications_disabled_classifications: Vec<String>,
    pub(crate) debug_connect: bool,
}

impl Config {
    pub(crate) fn endpoint(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

/// Returns a builder with every tunable at its default.
pub fn config() -> ConfigBuilder {
    ConfigBuilder::default()
}

/// A builder to override default configurations and build the [`Config`].
pub struct ConfigBuilder {
    hostname: Option<String>,
    port: u16,
    auth: Option<BasicAuth>,
    tls: TlsMode,
    routing_context: Option<BoltMap>,
    db: Option<String>,
    fetch_size: usize,
    pool_size: usize,
    connect_timeout: Duration,
    recv_timeout: Duration,
    ping_timeout: Duration,
    idle_interval: Duration,
    ownership_timeout: Duration,
    backoff: Option<BackoffConfig>,
    notifications_minimum_severity: Option<String>,
    notifications_disabled_classifications: Vec<String>,
    debug_connect: bool,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        ConfigBuilder {
            hostname: None,
            port: DEFAULT_PORT,
            auth: None,
            tls: TlsMode::default(),
            routing_context: None,
            db: None,
            fetch_size: DEFAULT_FETCH_SIZE,
            pool_size: DEFAULT_POOL_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            ownership_timeout: DEFAULT_OWNERSHIP_TIMEOUT,
            backoff: Some(BackoffConfig::default()),
            notifications_minimum_severity: None,
            notifications_disabled_classifications: Vec::new(),
            debug_connect: false,
        }
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `bolt://host:port` style URI into hostname, port and TLS
    /// mode. `bolt+s` turns on verified TLS, `bolt+ssc` accepts any
    /// certificate. A bare `host:port` works too.
    pub fn uri(mut self, uri: &str) -> Result<Self> {
        let url = match Url::parse(uri) {
            Ok(url) if url.has_host() => url,
            // missing scheme
            Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("bolt://{uri}"))?
            }
            Err(err) => return Err(Error::UrlParseError(err)),
        };

        self.tls = match url.scheme() {
            "bolt" | "neo4j" | "" => TlsMode::Disabled,
            "bolt+s" | "neo4j+s" => TlsMode::TrustSystemRoots,
            "bolt+ssc" | "neo4j+ssc" => TlsMode::TrustAnyCertificate,
            otherwise => return Err(Error::UnsupportedScheme(otherwise.to_owned())),
        };
        self.hostname = url.host_str().map(ToOwned::to_owned);
        self.port = url.port().unwrap_or(DEFAULT_PORT);
        Ok(self)
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn ssl(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    pub fn routing_context(mut self, context: impl Into<Option<BoltMap>>) -> Self {
        self.routing_context = context.into();
        self
    }

    /// The database statements run against when none is given per call.
    pub fn db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    /// Number of records a stream fetches per PULL.
    ///
    /// Defaults to 200 if not set.
    pub fn fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    /// The maximum number of connections in the connection pool.
    ///
    /// Defaults to 16 if not set.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// How long a TCP connect attempt may take, handshake included.
    pub fn timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// The per-message read deadline. The server can lower this via the
    /// `connection.recv_timeout_seconds` hint.
    pub fn recv_timeout(mut self, recv_timeout: Duration) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }

    /// The shorter deadline used when validating idle connections, so a
    /// dead socket is noticed quickly.
    pub fn ping_timeout(mut self, ping_timeout: Duration) -> Self {
        self.ping_timeout = ping_timeout;
        self
    }

    /// How long a pooled connection may sit unused before it is pinged
    /// on checkout.
    pub fn idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    /// How long a sandbox may hold a connection lease before it is
    /// forcibly released.
    pub fn ownership_timeout(mut self, ownership_timeout: Duration) -> Self {
        self.ownership_timeout = ownership_timeout;
        self
    }

    pub fn backoff(mut self, backoff: impl Into<Option<BackoffConfig>>) -> Self {
        self.backoff = backoff.into();
        self
    }

    pub fn notifications_minimum_severity(mut self, severity: impl Into<String>) -> Self {
        self.notifications_minimum_severity = Some(severity.into());
        self
    }

    pub fn notifications_disabled_classifications(mut self, classifications: Vec<String>) -> Self {
        self.notifications_disabled_classifications = classifications;
        self
    }

    /// Logs the resolved connect parameters before dialing.
    pub fn debug_connect(mut self, debug_connect: bool) -> Self {
        self.debug_connect = debug_connect;
        self
    }

    pub fn build(self) -> Result<Config> {
        let hostname = match self.hostname {
            Some(hostname) if !hostname.is_empty() => hostname,
            _ => return Err(Error::InvalidConfig("hostname is required")),
        };
        if self.port == 0 {
            return Err(Error::InvalidConfig("port must be non-zero"));
        }
        if self.fetch_size == 0 {
            return Err(Error::InvalidConfig("fetch_size must be non-zero"));
        }
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool_size must be non-zero"));
        }
        Ok(Config {
            hostname,
            port: self.port,
            auth: self.auth,
            tls: self.tls,
            routing_context: self.routing_context,
            db: self.db,
            fetch_size: self.fetch_size,
            pool_size: self.pool_size,
            connect_timeout: self.connect_timeout,
            recv_timeout: self.recv_timeout,
            ping_timeout: self.ping_timeout,
            idle_interval: self.idle_interval,
            ownership_timeout: self.ownership_timeout,
            backoff: self.backoff,
            notifications_minimum_severity: self.notifications_minimum_severity,
            notifications_disabled_classifications: self.notifications_disabled_classifications,
            debug_connect: self.debug_connect,
        })
    }
}
