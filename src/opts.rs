//! Connection and pool options.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_rustls::rustls::ClientConfig;

use crate::auth::{DialogHandler, PluginOverride};
use crate::consts::DEFAULT_MAX_ALLOWED_PACKET;
use crate::error::{Error, Result};

/// Upper bound on `connect_timeout` (one year).
const MAX_CONNECT_TIMEOUT: u64 = 31_536_000;

/// Options for a single connection.
#[derive(Clone)]
pub struct ConnectOpts {
    pub host: String,
    pub port: u16,
    /// Path to a Unix domain socket; takes precedence over host/port and
    /// marks the channel secure.
    pub unix_socket: Option<String>,
    pub user: Option<String>,
    pub(crate) password: Vec<u8>,
    pub database: Option<String>,
    /// Client charset name; must be known to [`crate::consts::charset_id`].
    pub charset: String,
    pub sql_mode: Option<String>,
    pub init_command: Option<String>,
    pub autocommit: Option<bool>,
    /// Extra capability bits OR-ed into the handshake.
    pub client_flag: u32,
    pub connect_timeout: Duration,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    /// Enables the LOCAL_FILES capability and LOAD LOCAL servicing.
    pub local_infile: bool,
    /// Client-side cap, used only to limit LOAD LOCAL chunk sizes.
    pub max_allowed_packet: usize,
    /// TLS context; presence forces the mid-handshake TLS upgrade.
    pub ssl: Option<Arc<ClientConfig>>,
    /// Preloaded RSA public key (PEM) for sha256_password/caching_sha2.
    pub server_public_key: Option<Vec<u8>>,
    /// Sent as a connection attribute.
    pub program_name: Option<String>,
    /// Decode text columns to strings; raw bytes when false.
    pub use_unicode: bool,
    /// Prefix escaped byte literals with `_binary`.
    pub binary_prefix: bool,
    /// Prompt callback for the `dialog` auth plug-in.
    pub dialog_handler: Option<DialogHandler>,
    /// Per-plugin scramble overrides, keyed by plug-in name.
    pub auth_plugin_map: HashMap<String, PluginOverride>,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            unix_socket: None,
            user: None,
            password: Vec::new(),
            database: None,
            charset: "utf8mb4".to_string(),
            sql_mode: None,
            init_command: None,
            autocommit: None,
            client_flag: 0,
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            write_timeout: None,
            local_infile: false,
            max_allowed_packet: DEFAULT_MAX_ALLOWED_PACKET,
            ssl: None,
            server_public_key: None,
            program_name: None,
            use_unicode: true,
            binary_prefix: true,
            dialog_handler: None,
            auth_plugin_map: HashMap::new(),
        }
    }
}

impl ConnectOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn unix_socket(mut self, path: impl Into<String>) -> Self {
        self.unix_socket = Some(path.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Password as text. Stored and sent as bytes.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into().into_bytes();
        self
    }

    pub fn password_bytes(mut self, password: impl Into<Vec<u8>>) -> Self {
        self.password = password.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn sql_mode(mut self, sql_mode: impl Into<String>) -> Self {
        self.sql_mode = Some(sql_mode.into());
        self
    }

    pub fn init_command(mut self, init_command: impl Into<String>) -> Self {
        self.init_command = Some(init_command.into());
        self
    }

    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = Some(autocommit);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn local_infile(mut self, enabled: bool) -> Self {
        self.local_infile = enabled;
        self
    }

    pub fn ssl(mut self, config: Arc<ClientConfig>) -> Self {
        self.ssl = Some(config);
        self
    }

    pub fn program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    pub fn server_public_key(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.server_public_key = Some(pem.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let secs = self.connect_timeout.as_secs();
        if secs < 1 || secs > MAX_CONNECT_TIMEOUT {
            return Err(Error::Interface(format!(
                "connect_timeout should be between 1 and {MAX_CONNECT_TIMEOUT} seconds"
            )));
        }
        if crate::consts::charset_id(&self.charset).is_none() {
            return Err(Error::Interface(format!(
                "unknown charset {:?}",
                self.charset
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectOpts")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("unix_socket", &self.unix_socket)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("autocommit", &self.autocommit)
            .field("local_infile", &self.local_infile)
            .field("ssl", &self.ssl.is_some())
            .finish_non_exhaustive()
    }
}

/// Options for the connection pool.
#[derive(Debug, Clone)]
pub struct PoolOpts {
    /// Number of connections kept ready.
    pub minsize: usize,
    /// Ceiling on free + used + in-progress connections.
    pub maxsize: usize,
    /// Close free connections idle longer than this; `None` disables.
    pub pool_recycle: Option<Duration>,
    /// Log acquire/release churn.
    pub echo: bool,
}

impl Default for PoolOpts {
    fn default() -> Self {
        Self {
            minsize: 1,
            maxsize: 10,
            pool_recycle: None,
            echo: false,
        }
    }
}

impl PoolOpts {
    pub fn new(minsize: usize, maxsize: usize) -> Self {
        Self {
            minsize,
            maxsize,
            ..Self::default()
        }
    }

    pub fn pool_recycle(mut self, recycle: Duration) -> Self {
        self.pool_recycle = Some(recycle);
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.maxsize == 0 {
            return Err(Error::Interface(
                "maxsize is expected to be greater than zero".into(),
            ));
        }
        if self.minsize > self.maxsize {
            return Err(Error::Interface("minsize is greater than maxsize".into()));
        }
        Ok(())
    }
}
