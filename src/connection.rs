//! The session: owns the transport and drives handshake, authentication,
//! command dispatch, result reading and shutdown.

use std::sync::Arc;
use std::time::Instant;

use bytes::{BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use rustls_pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;
use tokio_util::codec::{Framed, FramedParts};
use tracing::{debug, warn};

use crate::auth::{
    caching_sha2, ed25519_scramble, plugins, scramble_caching_sha2, scramble_native_password,
    scramble_old_password, sha2_rsa_encrypt,
};
use crate::consts::capabilities::*;
use crate::consts::status::*;
use crate::consts::{charset_id, cr, er, Command};
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::opts::ConnectOpts;
use crate::protocol::{
    EofPacket, ErrPacket, Greeting, HandshakeResponse, OkPacket, Packet, PacketCodec, SslRequest,
};
use crate::resultset::{decode_row, FieldDescriptor, ResultSet, Row};
use crate::value::{self, Value};

/// Duplex byte stream a session can run over: TCP, Unix socket, or TLS.
pub(crate) trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> Transport for T {}

type FramedStream = Framed<Box<dyn Transport>, PacketCodec>;

const MAX_PACKET_SIZE_DECL: u32 = 1 << 24;

/// One MySQL session. Single-consumer: no two logical operations may be in
/// flight at the same time.
pub struct Connection {
    framed: Option<FramedStream>,
    opts: ConnectOpts,
    secure: bool,
    capabilities: u32,
    server_capabilities: u32,
    server_version: String,
    thread_id: u32,
    server_status: u16,
    charset_id: u8,
    salt: Vec<u8>,
    auth_plugin: String,
    server_public_key: Option<Vec<u8>>,
    last_usage: Instant,
    result: Option<ResultSet>,
    /// A command was sent and its response is not fully read yet. Stays set
    /// when the caller abandons the exchange mid-flight.
    in_command: bool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.opts.host)
            .field("thread_id", &self.thread_id)
            .field("connected", &self.framed.is_some())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Open a transport, perform the handshake and the post-connect setup.
    pub async fn connect(opts: ConnectOpts) -> Result<Self> {
        opts.validate()?;
        let timeout = opts.connect_timeout;
        match tokio::time::timeout(timeout, Self::connect_inner(opts)).await {
            Ok(conn) => conn,
            Err(_) => Err(Error::operational(
                cr::CR_CONNECTION_ERROR,
                format!("Connect timed out after {}s", timeout.as_secs()),
            )),
        }
    }

    async fn connect_inner(opts: ConnectOpts) -> Result<Self> {
        let (stream, secure): (Box<dyn Transport>, bool) = match &opts.unix_socket {
            Some(path) => {
                let stream = tokio::net::UnixStream::connect(path).await.map_err(|e| {
                    Error::operational(
                        cr::CR_CONNECTION_ERROR,
                        format!("Can't connect to MySQL server through socket '{path}' ({e})"),
                    )
                })?;
                (Box::new(stream), true)
            }
            None => {
                let stream = Self::open_tcp(&opts.host, opts.port).await?;
                (Box::new(stream), false)
            }
        };
        Self::setup(stream, opts, secure).await
    }

    async fn open_tcp(host: &str, port: u16) -> Result<TcpStream> {
        let addrs = lookup_host((host, port)).await.map_err(|e| {
            Error::operational(
                cr::CR_CONNECTION_ERROR,
                format!("Can't resolve MySQL host '{host}' ({e})"),
            )
        })?;

        let mut last_err = None;
        for addr in addrs {
            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()
            } else {
                TcpSocket::new_v6()
            };
            let socket = match socket {
                Ok(s) => s,
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            };
            let _ = socket.set_keepalive(true);
            match socket.connect(addr).await {
                Ok(stream) => {
                    let _ = stream.set_nodelay(true);
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(Error::operational(
            cr::CR_CONNECTION_ERROR,
            format!(
                "Can't connect to MySQL server on '{host}:{port}' ({})",
                last_err.map_or_else(|| "no addresses".to_string(), |e| e.to_string())
            ),
        ))
    }

    /// Handshake and post-connect over an already-open transport.
    pub(crate) async fn setup(
        stream: Box<dyn Transport>,
        opts: ConnectOpts,
        secure: bool,
    ) -> Result<Self> {
        let mut conn = Self {
            framed: Some(Framed::new(stream, PacketCodec::new())),
            opts,
            secure,
            capabilities: 0,
            server_capabilities: 0,
            server_version: String::new(),
            thread_id: 0,
            server_status: 0,
            charset_id: 0,
            salt: Vec::new(),
            auth_plugin: String::new(),
            server_public_key: None,
            last_usage: Instant::now(),
            result: None,
            in_command: false,
        };

        if let Err(e) = conn.handshake().await {
            conn.close();
            return Err(e);
        }

        if let Some(sql_mode) = conn.opts.sql_mode.clone() {
            conn.query(&format!("SET sql_mode={sql_mode}"), false).await?;
        }
        if let Some(init) = conn.opts.init_command.clone() {
            conn.query(&init, false).await?;
            conn.commit().await?;
        }
        if let Some(autocommit) = conn.opts.autocommit {
            conn.set_autocommit(autocommit).await?;
        }

        debug!(
            host = %conn.opts.host,
            server_version = %conn.server_version,
            thread_id = conn.thread_id,
            "connected"
        );
        Ok(conn)
    }

    async fn handshake(&mut self) -> Result<()> {
        let mut packet = self.read_packet().await?;
        let greeting = Greeting::parse(&mut packet)?;

        self.server_version = greeting.server_version.clone();
        self.server_capabilities = greeting.capabilities;
        self.thread_id = greeting.thread_id;
        self.server_status = greeting.status_flags;
        self.salt = greeting.salt.clone();
        self.auth_plugin = if greeting.auth_plugin.is_empty() {
            plugins::NATIVE_PASSWORD.to_string()
        } else {
            greeting.auth_plugin.clone()
        };
        self.charset_id = charset_id(&self.opts.charset)
            .ok_or_else(|| Error::Interface(format!("unknown charset {:?}", self.opts.charset)))?;

        let mut caps = DEFAULT_CAPABILITIES | CLIENT_MULTI_STATEMENTS | self.opts.client_flag;
        if self.opts.database.is_some() {
            caps |= CLIENT_CONNECT_WITH_DB;
        }
        if self.opts.local_infile {
            caps |= CLIENT_LOCAL_FILES;
        }
        if greeting.server_major_version() >= 5 {
            caps |= CLIENT_MULTI_RESULTS;
        }
        if self.opts.ssl.is_some() {
            if self.server_capabilities & CLIENT_SSL == 0 {
                return Err(Error::operational(
                    cr::CR_CONNECTION_ERROR,
                    "SSL is not enabled on the server",
                ));
            }
            caps |= CLIENT_SSL;
        }
        self.capabilities = caps;

        if let Some(tls) = self.opts.ssl.clone() {
            let request = SslRequest {
                capabilities: caps,
                max_packet_size: MAX_PACKET_SIZE_DECL,
                charset_id: self.charset_id,
            };
            self.write_packet(request.encode()).await?;
            self.upgrade_tls(tls).await?;
        }

        let user = self.opts.user.clone().unwrap_or_default();
        let auth_response = self.initial_auth_response();
        let attrs = self.connect_attrs();
        let payload = HandshakeResponse {
            capabilities: caps,
            max_packet_size: MAX_PACKET_SIZE_DECL,
            charset_id: self.charset_id,
            user: user.as_bytes(),
            auth_response: &auth_response,
            database: self.opts.database.as_deref(),
            auth_plugin: &self.auth_plugin,
            connect_attrs: &attrs,
        }
        .encode();
        self.write_packet(payload).await?;

        let first = self.read_packet().await?;
        self.finish_auth(first).await
    }

    fn connect_attrs(&self) -> Vec<(String, String)> {
        let mut attrs = vec![
            ("_client_name".to_string(), "minerva".to_string()),
            (
                "_client_version".to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
            ),
            ("_pid".to_string(), std::process::id().to_string()),
        ];
        if let Some(name) = &self.opts.program_name {
            attrs.push(("program_name".to_string(), name.clone()));
        }
        attrs
    }

    /// The auth data embedded in the handshake response, per the plug-in the
    /// server announced.
    fn initial_auth_response(&self) -> Vec<u8> {
        let password = &self.opts.password;
        if let Some(handler) = self.opts.auth_plugin_map.get(self.auth_plugin.as_str()) {
            return handler(password, &self.salt);
        }
        match self.auth_plugin.as_str() {
            plugins::NATIVE_PASSWORD => scramble_native_password(password, &self.salt),
            plugins::CACHING_SHA2_PASSWORD => scramble_caching_sha2(password, &self.salt),
            plugins::SHA256_PASSWORD => {
                if self.secure {
                    let mut data = password.clone();
                    data.push(0);
                    data
                } else if !password.is_empty() {
                    // request the server's RSA public key
                    vec![1]
                } else {
                    Vec::new()
                }
            }
            plugins::CLEAR_PASSWORD => {
                let mut data = password.clone();
                data.push(0);
                data
            }
            plugins::ED25519 => ed25519_scramble(password, &self.salt),
            plugins::OLD_PASSWORD => {
                let mut data = scramble_old_password(password, &self.salt);
                if !data.is_empty() {
                    data.push(0);
                }
                data
            }
            // the server will issue an auth switch for anything else
            _ => Vec::new(),
        }
    }

    /// Drive the post-response authentication exchange to an OK packet.
    async fn finish_auth(&mut self, mut packet: Packet) -> Result<()> {
        loop {
            if packet.is_ok() {
                let ok = OkPacket::parse(&mut packet)?;
                self.server_status = ok.server_status;
                return Ok(());
            }

            if packet.is_auth_switch() {
                packet.advance(1);
                let plugin = match packet.read_null_terminated() {
                    Some(name) => String::from_utf8_lossy(&name).into_owned(),
                    None => String::from_utf8_lossy(&packet.read_rest()).into_owned(),
                };
                debug!(plugin = %plugin, "auth switch requested");
                self.auth_plugin = plugin.clone();
                if plugin == plugins::DIALOG {
                    packet = self.dialog_auth(packet).await?;
                    continue;
                }
                let mut salt = packet.read_rest().to_vec();
                while salt.last() == Some(&0) {
                    salt.pop();
                }
                if !salt.is_empty() {
                    self.salt = salt;
                }
                packet = self.auth_switch_response(&plugin).await?;
                continue;
            }

            if packet.is_extra_auth_data() {
                packet = match self.auth_plugin.clone().as_str() {
                    plugins::CACHING_SHA2_PASSWORD => self.caching_sha2_continue(packet).await?,
                    plugins::SHA256_PASSWORD => self.sha256_continue(packet).await?,
                    other => {
                        return Err(Error::internal(format!(
                            "Unexpected extra auth data for plugin '{other}'"
                        )))
                    }
                };
                continue;
            }

            return Err(Error::internal(
                "Unexpected packet during authentication".to_string(),
            ));
        }
    }

    /// Re-scramble for the plug-in named by an auth switch and send it.
    async fn auth_switch_response(&mut self, plugin: &str) -> Result<Packet> {
        let password = self.opts.password.clone();

        if let Some(handler) = self.opts.auth_plugin_map.get(plugin).cloned() {
            let data = handler(&password, &self.salt);
            self.write_packet(data.into()).await?;
            return self.read_packet().await;
        }

        let data: Vec<u8> = match plugin {
            plugins::NATIVE_PASSWORD => scramble_native_password(&password, &self.salt),
            plugins::CACHING_SHA2_PASSWORD => scramble_caching_sha2(&password, &self.salt),
            plugins::ED25519 => ed25519_scramble(&password, &self.salt),
            plugins::CLEAR_PASSWORD => {
                let mut d = password.clone();
                d.push(0);
                d
            }
            plugins::OLD_PASSWORD => {
                let mut d = scramble_old_password(&password, &self.salt);
                if !d.is_empty() {
                    d.push(0);
                }
                d
            }
            plugins::SHA256_PASSWORD => return self.sha256_switch().await,
            other => {
                return Err(Error::operational(
                    cr::CR_AUTH_PLUGIN_ERR,
                    format!("Authentication plugin '{other}' is not supported"),
                ))
            }
        };
        self.write_packet(data.into()).await?;
        self.read_packet().await
    }

    fn known_public_key(&self) -> Option<Vec<u8>> {
        self.opts
            .server_public_key
            .clone()
            .or_else(|| self.server_public_key.clone())
    }

    /// sha256_password after an auth switch: clear text over a secure
    /// channel, RSA key exchange otherwise.
    async fn sha256_switch(&mut self) -> Result<Packet> {
        let password = self.opts.password.clone();
        if self.secure {
            let mut data = password;
            data.push(0);
            self.write_packet(data.into()).await?;
            return self.read_packet().await;
        }

        let key = match self.known_public_key() {
            Some(key) => key,
            None if !password.is_empty() => {
                self.write_packet(Bytes::from_static(&[1])).await?;
                let mut packet = self.read_packet().await?;
                if !packet.is_extra_auth_data() {
                    return Err(Error::operational(
                        cr::CR_AUTH_PLUGIN_ERR,
                        "sha256_password: couldn't receive server's public key",
                    ));
                }
                packet.advance(1);
                let key = packet.read_rest().to_vec();
                self.server_public_key = Some(key.clone());
                key
            }
            None => Vec::new(),
        };

        let data = if password.is_empty() {
            Vec::new()
        } else {
            sha2_rsa_encrypt(&password, &self.salt, &key)?
        };
        self.write_packet(data.into()).await?;
        self.read_packet().await
    }

    /// sha256_password in the initial flow: the extra-auth-data packet
    /// carries the RSA key we asked for with the 0x01 response.
    async fn sha256_continue(&mut self, mut packet: Packet) -> Result<Packet> {
        packet.advance(1);
        let key = packet.read_rest().to_vec();
        self.server_public_key = Some(key.clone());

        let password = self.opts.password.clone();
        let data = if password.is_empty() {
            Vec::new()
        } else {
            sha2_rsa_encrypt(&password, &self.salt, &key)?
        };
        self.write_packet(data.into()).await?;
        self.read_packet().await
    }

    /// caching_sha2_password fast-auth result and, if demanded, full auth.
    async fn caching_sha2_continue(&mut self, mut packet: Packet) -> Result<Packet> {
        packet.advance(1);
        let n = packet.read_u8()?;
        match n {
            caching_sha2::FAST_AUTH_SUCCESS => self.read_packet().await,
            caching_sha2::PERFORM_FULL_AUTH => {
                let password = self.opts.password.clone();
                if self.secure {
                    let mut data = password;
                    data.push(0);
                    self.write_packet(data.into()).await?;
                    return self.read_packet().await;
                }

                let key = match self.known_public_key() {
                    Some(key) => key,
                    None => {
                        self.write_packet(Bytes::from_static(&[caching_sha2::REQUEST_PUBLIC_KEY]))
                            .await?;
                        let mut reply = self.read_packet().await?;
                        if !reply.is_extra_auth_data() {
                            return Err(Error::operational(
                                cr::CR_AUTH_PLUGIN_ERR,
                                "caching sha2: unknown packet for public key",
                            ));
                        }
                        reply.advance(1);
                        let key = reply.read_rest().to_vec();
                        self.server_public_key = Some(key.clone());
                        key
                    }
                };
                let data = sha2_rsa_encrypt(&password, &self.salt, &key)?;
                self.write_packet(data.into()).await?;
                self.read_packet().await
            }
            other => Err(Error::operational(
                cr::CR_AUTH_PLUGIN_ERR,
                format!("caching sha2: unknown result for fast auth: {other}"),
            )),
        }
    }

    /// Interactive `dialog` plug-in: answer prompt frames until the server
    /// accepts or the last-question bit is set.
    async fn dialog_auth(&mut self, mut packet: Packet) -> Result<Packet> {
        loop {
            let flag = packet.read_u8().unwrap_or(0);
            let last = flag & 0x01 != 0;
            let echo = flag & 0x06 == 0x02;
            let prompt = packet.read_rest();

            let mut reply = if prompt.as_ref() == b"Password: " {
                self.opts.password.clone()
            } else if let Some(handler) = &self.opts.dialog_handler {
                handler(echo, &prompt)
            } else {
                return Err(Error::operational(
                    cr::CR_AUTH_PLUGIN_ERR,
                    format!(
                        "dialog auth: no handler for prompt {:?}",
                        String::from_utf8_lossy(&prompt)
                    ),
                ));
            };
            reply.push(0);
            self.write_packet(reply.into()).await?;

            packet = self.read_packet().await?;
            if packet.is_ok() || last {
                return Ok(packet);
            }
        }
    }

    /// Mid-stream TLS upgrade: take the raw socket out of the framed
    /// transport and reopen the stream with TLS on top of it.
    async fn upgrade_tls(&mut self, config: Arc<ClientConfig>) -> Result<()> {
        let framed = self
            .framed
            .take()
            .ok_or_else(|| Error::Interface("Connection closed".into()))?;
        let parts = framed.into_parts();
        if !parts.read_buf.is_empty() {
            return Err(Error::internal(
                "Unexpected data in the read buffer before TLS upgrade",
            ));
        }

        let server_name = ServerName::try_from(self.opts.host.clone())
            .map_err(|_| Error::Interface(format!("invalid TLS hostname {:?}", self.opts.host)))?;
        let connector = TlsConnector::from(config);
        let tls = connector.connect(server_name, parts.io).await.map_err(|e| {
            Error::operational(cr::CR_CONNECTION_ERROR, format!("TLS handshake failed: {e}"))
        })?;

        let new_parts: FramedParts<Box<dyn Transport>, PacketCodec> =
            FramedParts::new::<Bytes>(Box::new(tls), parts.codec);
        self.framed = Some(Framed::from_parts(new_parts));
        self.secure = true;
        debug!("transport upgraded to TLS");
        Ok(())
    }

    // -- packet I/O ------------------------------------------------------

    async fn write_packet(&mut self, payload: Bytes) -> Result<()> {
        let write_timeout = self.opts.write_timeout;
        let framed = self
            .framed
            .as_mut()
            .ok_or_else(|| Error::Interface("Connection closed".into()))?;
        let result = match write_timeout {
            Some(limit) => match tokio::time::timeout(limit, framed.send(payload)).await {
                Ok(res) => res,
                Err(_) => Err(Error::server_lost("(write timed out)")),
            },
            None => framed.send(payload).await,
        };
        if result.is_err() {
            self.framed = None;
        }
        result
    }

    /// Read one logical packet. Server ERR packets are decoded and surfaced
    /// as classified errors; transport failures poison the session.
    pub(crate) async fn read_packet(&mut self) -> Result<Packet> {
        let read_timeout = self.opts.read_timeout;
        let framed = self
            .framed
            .as_mut()
            .ok_or_else(|| Error::Interface("Connection closed".into()))?;
        let item = match read_timeout {
            Some(limit) => match tokio::time::timeout(limit, framed.next()).await {
                Ok(item) => item,
                Err(_) => {
                    self.framed = None;
                    return Err(Error::server_lost("(read timed out)"));
                }
            },
            None => framed.next().await,
        };

        let packet = match item {
            Some(Ok(packet)) => packet,
            Some(Err(e)) => {
                self.framed = None;
                return Err(e);
            }
            None => {
                self.framed = None;
                return Err(Error::server_lost("during query"));
            }
        };

        if packet.is_err() {
            // an ERR packet terminates the response; the protocol position
            // is clean again
            self.in_command = false;
            let mut packet = packet;
            let err = ErrPacket::parse(&mut packet)?;
            return Err(err.into_error());
        }
        Ok(packet)
    }

    async fn read_ok(&mut self) -> Result<OkPacket> {
        let mut packet = self.read_packet().await?;
        if !packet.is_ok() {
            return Err(Error::operational(
                cr::CR_COMMANDS_OUT_OF_SYNC,
                "Command out of sync: expected OK packet",
            ));
        }
        let ok = OkPacket::parse(&mut packet)?;
        self.server_status = ok.server_status;
        self.in_command = false;
        Ok(ok)
    }

    // -- command dispatch ------------------------------------------------

    /// Send a command frame. Resets the sequence id; any prior response is
    /// drained first.
    pub async fn execute_command(&mut self, command: Command, body: &[u8]) -> Result<()> {
        if self.framed.is_none() {
            return Err(Error::Interface("Connection closed".into()));
        }

        if self.result.as_ref().is_some_and(|r| r.unbuffered_active) {
            warn!("previous unbuffered result was left incomplete, draining");
            self.drain_unbuffered().await?;
        }
        while self.result.as_ref().is_some_and(|r| r.has_next) {
            self.next_result(false).await?;
        }
        self.result = None;

        if let Some(framed) = self.framed.as_mut() {
            framed.codec_mut().reset_seq();
        }
        let mut payload = BytesMut::with_capacity(body.len() + 1);
        payload.put_u8(command as u8);
        payload.extend_from_slice(body);
        self.write_packet(payload.freeze()).await?;
        self.in_command = true;
        self.last_usage = Instant::now();
        Ok(())
    }

    /// Run a text-protocol query and return the affected-row count (or the
    /// not-yet-known sentinel in unbuffered mode).
    pub async fn query(&mut self, sql: &str, unbuffered: bool) -> Result<u64> {
        self.execute_command(Command::Query, sql.as_bytes()).await?;
        self.read_query_result(unbuffered).await
    }

    /// Read the next result set of a multi-statement response.
    pub async fn next_result(&mut self, unbuffered: bool) -> Result<u64> {
        self.read_query_result(unbuffered).await
    }

    async fn read_query_result(&mut self, unbuffered: bool) -> Result<u64> {
        let mut result = ResultSet::default();
        let mut packet = self.read_packet().await?;

        if packet.is_ok() {
            let ok = OkPacket::parse(&mut packet)?;
            self.apply_ok(&mut result, ok);
        } else if packet.is_local_infile() {
            packet.advance(1);
            let filename = String::from_utf8_lossy(&packet.read_rest()).into_owned();
            if !self.opts.local_infile {
                return Err(Error::Interface(
                    "Received LOAD LOCAL packet but local_infile option is disabled".into(),
                ));
            }
            let local = self.send_local_file(&filename).await;
            // the server's OK must be drained even when the local read failed
            let ok = self.read_ok().await?;
            self.apply_ok_parts(&mut result, ok);
            local?;
        } else {
            let field_count = packet
                .read_lenenc_int()?
                .ok_or_else(|| Error::internal("NULL column count in result header"))?
                as usize;

            let mut fields = Vec::with_capacity(field_count);
            for _ in 0..field_count {
                let mut field_packet = self.read_packet().await?;
                fields.push(FieldDescriptor::parse(&mut field_packet)?);
            }
            let terminator = self.read_packet().await?;
            if !terminator.is_eof() {
                return Err(Error::internal("Protocol error, expecting EOF"));
            }

            result.plans = fields
                .iter()
                .map(|f| f.decode_as_text(self.opts.use_unicode))
                .collect();
            result.fields = fields;

            if unbuffered {
                // row count is unknown until the stream is drained
                result.affected_rows = u64::MAX;
                result.unbuffered_active = true;
            } else {
                loop {
                    let mut row_packet = self.read_packet().await?;
                    if row_packet.is_eof() {
                        let eof = EofPacket::parse(&mut row_packet)?;
                        result.warning_count = eof.warning_count;
                        result.server_status = eof.server_status;
                        result.has_next = eof.has_next();
                        self.server_status = eof.server_status;
                        break;
                    }
                    result
                        .rows
                        .push(decode_row(&mut row_packet, &result.fields, &result.plans)?);
                }
                result.affected_rows = result.rows.len() as u64;
            }
        }

        let affected = result.affected_rows;
        self.result = Some(result);
        self.in_command = false;
        self.last_usage = Instant::now();
        Ok(affected)
    }

    fn apply_ok(&mut self, result: &mut ResultSet, ok: OkPacket) {
        self.server_status = ok.server_status;
        self.apply_ok_parts(result, ok);
    }

    fn apply_ok_parts(&mut self, result: &mut ResultSet, ok: OkPacket) {
        result.affected_rows = ok.affected_rows;
        result.insert_id = ok.insert_id;
        result.server_status = ok.server_status;
        result.warning_count = ok.warning_count;
        result.has_next = ok.has_next();
        result.message = ok.message;
    }

    /// Stream a local file back to the server in LOAD LOCAL chunks, always
    /// terminated by an empty frame.
    async fn send_local_file(&mut self, filename: &str) -> Result<()> {
        let chunk_size = self.opts.max_allowed_packet.min(16 * 1024);
        let mut local_err = None;

        match tokio::fs::File::open(filename).await {
            Ok(mut file) => {
                let mut buf = vec![0u8; chunk_size];
                loop {
                    match file.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => self.write_packet(Bytes::copy_from_slice(&buf[..n])).await?,
                        Err(e) => {
                            local_err = Some(Error::operational(
                                er::FILE_NOT_FOUND,
                                format!("Error reading file '{filename}' ({e})"),
                            ));
                            break;
                        }
                    }
                }
            }
            Err(_) => {
                local_err = Some(Error::operational(
                    er::FILE_NOT_FOUND,
                    format!("Can't find file '{filename}'"),
                ));
            }
        }

        self.write_packet(Bytes::new()).await?;
        match local_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Fetch one row of a live unbuffered result; `None` once the stream is
    /// drained.
    pub async fn read_next_row(&mut self) -> Result<Option<Row>> {
        if !self.result.as_ref().is_some_and(|r| r.unbuffered_active) {
            return Ok(None);
        }
        let mut packet = self.read_packet().await?;
        if packet.is_eof() {
            let eof = EofPacket::parse(&mut packet)?;
            self.server_status = eof.server_status;
            if let Some(result) = &mut self.result {
                result.unbuffered_active = false;
                result.has_next = eof.has_next();
                result.server_status = eof.server_status;
                result.warning_count = eof.warning_count;
            }
            return Ok(None);
        }

        let Some(result) = self.result.as_mut() else {
            return Ok(None);
        };
        let row = decode_row(&mut packet, &result.fields, &result.plans)?;
        Ok(Some(row))
    }

    async fn drain_unbuffered(&mut self) -> Result<()> {
        while self.read_next_row().await?.is_some() {}
        Ok(())
    }

    // -- session operations ----------------------------------------------

    pub async fn ping(&mut self, reconnect: bool) -> Result<()> {
        if self.framed.is_none() {
            if !reconnect {
                return Err(Error::Interface("Connection closed".into()));
            }
            self.reconnect().await?;
            return self.ping_once().await;
        }

        match self.ping_once().await {
            Ok(()) => Ok(()),
            Err(_) if reconnect => {
                self.reconnect().await?;
                self.ping_once().await
            }
            Err(e) => Err(e),
        }
    }

    async fn ping_once(&mut self) -> Result<()> {
        self.execute_command(Command::Ping, &[]).await?;
        self.read_ok().await?;
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<()> {
        let opts = self.opts.clone();
        *self = Self::connect(opts).await?;
        Ok(())
    }

    pub async fn select_db(&mut self, database: &str) -> Result<()> {
        self.execute_command(Command::InitDb, database.as_bytes())
            .await?;
        self.read_ok().await?;
        self.opts.database = Some(database.to_string());
        Ok(())
    }

    /// COM_PROCESS_KILL for the given server thread.
    pub async fn kill(&mut self, thread_id: u32) -> Result<()> {
        self.execute_command(Command::ProcessKill, &thread_id.to_le_bytes())
            .await?;
        self.read_ok().await?;
        Ok(())
    }

    pub async fn begin(&mut self) -> Result<()> {
        self.query("BEGIN", false).await?;
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.query("COMMIT", false).await?;
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.query("ROLLBACK", false).await?;
        Ok(())
    }

    pub async fn set_autocommit(&mut self, autocommit: bool) -> Result<()> {
        let value = if autocommit { 1 } else { 0 };
        self.query(&format!("SET AUTOCOMMIT = {value}"), false)
            .await?;
        Ok(())
    }

    pub fn get_autocommit(&self) -> bool {
        self.server_status & SERVER_STATUS_AUTOCOMMIT != 0
    }

    /// Change the session charset; reads exactly one reply packet.
    pub async fn set_charset(&mut self, charset: &str) -> Result<()> {
        let id = charset_id(charset)
            .ok_or_else(|| Error::Interface(format!("unknown charset {charset:?}")))?;
        self.execute_command(Command::Query, format!("SET NAMES {charset}").as_bytes())
            .await?;
        self.read_ok().await?;
        self.opts.charset = charset.to_string();
        self.charset_id = id;
        Ok(())
    }

    pub async fn show_warnings(&mut self) -> Result<Vec<Row>> {
        self.query("SHOW WARNINGS", false).await?;
        Ok(self
            .result
            .as_mut()
            .map(|r| std::mem::take(&mut r.rows))
            .unwrap_or_default())
    }

    /// Escape a value under the session's current escape mode.
    pub fn escape(&self, value: &Value) -> Result<String> {
        value::escape(
            value,
            self.server_status & SERVER_STATUS_NO_BACKSLASH_ESCAPES != 0,
            self.opts.binary_prefix,
        )
    }

    pub fn escape_string(&self, s: &str) -> String {
        value::escape_string(
            s,
            self.server_status & SERVER_STATUS_NO_BACKSLASH_ESCAPES != 0,
        )
    }

    // -- shutdown --------------------------------------------------------

    /// Send COM_QUIT, then drop the transport.
    pub async fn ensure_closed(&mut self) -> Result<()> {
        let farewell = match self.framed.as_mut() {
            Some(framed) => {
                framed.codec_mut().reset_seq();
                framed.send(Bytes::from_static(&[Command::Quit as u8])).await
            }
            None => Ok(()),
        };
        self.close();
        farewell
    }

    /// Drop the transport without a farewell.
    pub fn close(&mut self) {
        if self.framed.take().is_some() {
            debug!(thread_id = self.thread_id, "connection closed");
        }
        self.result = None;
        self.in_command = false;
    }

    // -- accessors -------------------------------------------------------

    pub fn connected(&self) -> bool {
        self.framed.is_some()
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    pub fn thread_id(&self) -> u32 {
        self.thread_id
    }

    pub fn server_status(&self) -> u16 {
        self.server_status
    }

    pub fn capabilities(&self) -> u32 {
        self.capabilities
    }

    pub fn charset(&self) -> &str {
        &self.opts.charset
    }

    pub fn affected_rows(&self) -> u64 {
        self.result.as_ref().map_or(0, |r| r.affected_rows)
    }

    pub fn insert_id(&self) -> u64 {
        self.result.as_ref().map_or(0, |r| r.insert_id)
    }

    /// Whether the session is inside a transaction.
    pub fn get_transaction_status(&self) -> bool {
        self.server_status & SERVER_STATUS_IN_TRANS != 0
    }

    pub fn has_next(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.has_next)
    }

    pub fn result(&self) -> Option<&ResultSet> {
        self.result.as_ref()
    }

    pub(crate) fn result_mut(&mut self) -> Option<&mut ResultSet> {
        self.result.as_mut()
    }

    /// An undrained response is pending; the protocol position would be
    /// unknown to a new user of this session.
    pub(crate) fn pending_result(&self) -> bool {
        self.in_command
            || self
                .result
                .as_ref()
                .is_some_and(|r| r.unbuffered_active || r.has_next)
    }

    pub(crate) fn last_usage(&self) -> Instant {
        self.last_usage
    }

    pub fn cursor(&mut self) -> Cursor<'_> {
        Cursor::new(self, false)
    }

    /// Streaming cursor: rows are fetched one frame at a time.
    pub fn unbuffered_cursor(&mut self) -> Cursor<'_> {
        Cursor::new(self, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{scramble_caching_sha2, scramble_native_password};
    use crate::consts::MAX_PACKET_SIZE;
    use crate::test_util::*;
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

    fn opts() -> ConnectOpts {
        ConnectOpts::new().user("tester").password("secret")
    }

    async fn connect_over(client: DuplexStream, opts: ConnectOpts) -> Result<Connection> {
        Connection::setup(Box::new(client), opts, false).await
    }

    /// Parse the client handshake response: (capabilities, user, auth data).
    fn split_response(payload: &[u8]) -> (u32, Vec<u8>, Vec<u8>) {
        let caps = u32::from_le_bytes(payload[..4].try_into().unwrap());
        let rest = &payload[32..];
        let nul = rest.iter().position(|&b| b == 0).unwrap();
        let user = rest[..nul].to_vec();
        let auth_len = rest[nul + 1] as usize;
        let auth = rest[nul + 2..nul + 2 + auth_len].to_vec();
        (caps, user, auth)
    }

    #[tokio::test]
    async fn handshake_negotiates_native_auth() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            server
                .write_all(&frame(0, &greeting_payload(7, "mysql_native_password")))
                .await
                .unwrap();
            let (seq, response) = read_frame(&mut server).await.unwrap();
            assert_eq!(seq, 1);
            let (caps, user, auth) = split_response(&response);
            assert_ne!(caps & CLIENT_PROTOCOL_41, 0);
            assert_ne!(caps & CLIENT_MULTI_STATEMENTS, 0);
            assert_eq!(user, b"tester");
            assert_eq!(auth, scramble_native_password(b"secret", TEST_SALT));
            server
                .write_all(&frame(2, &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT)))
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let conn = connect_over(client, opts()).await.unwrap();
        assert!(conn.connected());
        assert_eq!(conn.server_version(), "8.0.99-mock");
        assert_eq!(conn.thread_id(), 7);
        assert!(conn.get_autocommit());
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn caching_sha2_fast_auth() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            server
                .write_all(&frame(0, &greeting_payload(1, "caching_sha2_password")))
                .await
                .unwrap();
            let (_, response) = read_frame(&mut server).await.unwrap();
            let (_, _, auth) = split_response(&response);
            assert_eq!(auth, scramble_caching_sha2(b"secret", TEST_SALT));
            // fast auth succeeded, then OK
            server.write_all(&frame(2, &[0x01, 0x03])).await.unwrap();
            server
                .write_all(&frame(3, &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT)))
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let conn = connect_over(client, opts()).await.unwrap();
        assert!(conn.connected());
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn auth_switch_rescrambles_with_new_salt() {
        let new_salt = b"ABCDEFGHIJKLMNOPQRST";
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            server
                .write_all(&frame(0, &greeting_payload(1, "caching_sha2_password")))
                .await
                .unwrap();
            let _ = read_frame(&mut server).await.unwrap();

            let mut switch = vec![0xFEu8];
            switch.extend_from_slice(b"mysql_native_password\0");
            switch.extend_from_slice(new_salt);
            switch.push(0);
            server.write_all(&frame(2, &switch)).await.unwrap();

            let (seq, reply) = read_frame(&mut server).await.unwrap();
            assert_eq!(seq, 3);
            assert_eq!(reply, scramble_native_password(b"secret", new_salt));
            server
                .write_all(&frame(4, &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT)))
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let conn = connect_over(client, opts()).await.unwrap();
        assert!(conn.connected());
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn buffered_select_decodes_rows() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let (seq, command) = read_frame(&mut server).await.unwrap();
            assert_eq!(seq, 0);
            assert_eq!(command[0], 0x03);
            assert_eq!(&command[1..], b"SELECT 1");
            write_int_resultset(&mut server, 1, "one", &["1"], SERVER_STATUS_AUTOCOMMIT)
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let mut conn = connect_over(client, opts()).await.unwrap();
        let affected = conn.query("SELECT 1", false).await.unwrap();
        assert_eq!(affected, 1);
        assert_eq!(conn.affected_rows(), 1);
        assert_eq!(conn.insert_id(), 0);

        let result = conn.result().unwrap();
        assert_eq!(result.field_count(), 1);
        assert_eq!(result.fields[0].name, "one");
        assert_eq!(result.rows, vec![vec![Value::Int(1)]]);
        assert!(!result.has_next);
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn cursor_pages_through_rows() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let _ = read_frame(&mut server).await.unwrap();
            write_int_resultset(
                &mut server,
                1,
                "n",
                &["1", "2", "3"],
                SERVER_STATUS_AUTOCOMMIT,
            )
            .await
            .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let mut conn = connect_over(client, opts()).await.unwrap();
        let mut cursor = conn.cursor();
        let count = cursor.execute("SELECT n FROM t").await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(cursor.rowcount(), 3);
        assert_eq!(cursor.description().len(), 1);

        let first = cursor.fetch_one().await.unwrap().unwrap();
        assert_eq!(first, vec![Value::Int(1)]);
        assert_eq!(cursor.rownumber(), 1);
        let rest = cursor.fetch_all().await.unwrap();
        assert_eq!(rest, vec![vec![Value::Int(2)], vec![Value::Int(3)]]);
        assert!(cursor.fetch_one().await.unwrap().is_none());
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn multi_resultset_chain() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let _ = read_frame(&mut server).await.unwrap();
            let next = write_int_resultset(
                &mut server,
                1,
                "a",
                &["1"],
                SERVER_STATUS_AUTOCOMMIT | SERVER_MORE_RESULTS_EXISTS,
            )
            .await
            .unwrap();
            write_int_resultset(&mut server, next, "b", &["2"], SERVER_STATUS_AUTOCOMMIT)
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let mut conn = connect_over(client, opts()).await.unwrap();
        conn.query("SELECT 1; SELECT 2", false).await.unwrap();
        assert_eq!(conn.result().unwrap().rows, vec![vec![Value::Int(1)]]);
        assert!(conn.has_next());

        conn.next_result(false).await.unwrap();
        assert_eq!(conn.result().unwrap().rows, vec![vec![Value::Int(2)]]);
        assert!(!conn.has_next());
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn unbuffered_rows_stream_one_at_a_time() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let _ = read_frame(&mut server).await.unwrap();
            write_int_resultset(
                &mut server,
                1,
                "n",
                &["10", "20", "30"],
                SERVER_STATUS_AUTOCOMMIT,
            )
            .await
            .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let mut conn = connect_over(client, opts()).await.unwrap();
        let sentinel = conn.query("SELECT n FROM big", true).await.unwrap();
        assert_eq!(sentinel, u64::MAX);
        assert_eq!(conn.affected_rows(), u64::MAX);

        let mut seen = Vec::new();
        while let Some(row) = conn.read_next_row().await.unwrap() {
            seen.push(row);
        }
        assert_eq!(
            seen,
            vec![
                vec![Value::Int(10)],
                vec![Value::Int(20)],
                vec![Value::Int(30)]
            ]
        );
        assert!(!conn.result().unwrap().unbuffered_active);
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn abandoned_stream_is_drained_before_next_command() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let _ = read_frame(&mut server).await.unwrap();
            write_int_resultset(
                &mut server,
                1,
                "n",
                &["1", "2", "3"],
                SERVER_STATUS_AUTOCOMMIT,
            )
            .await
            .unwrap();
            // the next command arrives only after the client drained the stream
            let (seq, command) = read_frame(&mut server).await.unwrap();
            assert_eq!(seq, 0);
            assert_eq!(&command[1..], b"COMMIT");
            server
                .write_all(&frame(1, &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT)))
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let mut conn = connect_over(client, opts()).await.unwrap();
        conn.query("SELECT n FROM big", true).await.unwrap();
        let _ = conn.read_next_row().await.unwrap();
        // two rows and the EOF still on the wire
        conn.commit().await.unwrap();
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn err_packet_is_classified_and_session_survives() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let _ = read_frame(&mut server).await.unwrap();
            server
                .write_all(&frame(
                    1,
                    &err_payload(1064, "42000", "You have an error in your SQL syntax"),
                ))
                .await
                .unwrap();
            let _ = read_frame(&mut server).await.unwrap();
            write_int_resultset(&mut server, 1, "one", &["1"], SERVER_STATUS_AUTOCOMMIT)
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let mut conn = connect_over(client, opts()).await.unwrap();
        let err = conn.query("SELEKT 1", false).await.unwrap_err();
        match &err {
            Error::Programming(e) => {
                assert_eq!(e.code, 1064);
                assert_eq!(e.sql_state.as_deref(), Some("42000"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(conn.connected());

        let affected = conn.query("SELECT 1", false).await.unwrap();
        assert_eq!(affected, 1);
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn load_local_streams_file_and_reads_final_ok() {
        let path = std::env::temp_dir().join(format!("minerva-infile-{}.csv", std::process::id()));
        let contents = b"1,alpha\n2,beta\n".repeat(100);
        std::fs::write(&path, &contents).unwrap();
        let path_string = path.to_string_lossy().into_owned();

        let (client, mut server) = duplex(1 << 16);
        let expected = contents.clone();
        let request_path = path_string.clone();
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let _ = read_frame(&mut server).await.unwrap();

            let mut request = vec![0xFBu8];
            request.extend_from_slice(request_path.as_bytes());
            server.write_all(&frame(1, &request)).await.unwrap();

            let mut received = Vec::new();
            let final_seq = loop {
                let (seq, chunk) = read_frame(&mut server).await.unwrap();
                if chunk.is_empty() {
                    break seq;
                }
                received.extend_from_slice(&chunk);
            };
            assert_eq!(received, expected);
            server
                .write_all(&frame(
                    final_seq.wrapping_add(1),
                    &ok_payload(2, 0, SERVER_STATUS_AUTOCOMMIT),
                ))
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let mut conn = connect_over(client, opts().local_infile(true)).await.unwrap();
        let affected = conn
            .query(&format!("LOAD DATA LOCAL INFILE '{path_string}' INTO TABLE t"), false)
            .await
            .unwrap();
        assert_eq!(affected, 2);
        drop(conn);
        script.await.unwrap();
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn load_local_rejected_when_disabled() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let _ = read_frame(&mut server).await.unwrap();
            server
                .write_all(&frame(1, b"\xFB/etc/passwd"))
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let mut conn = connect_over(client, opts()).await.unwrap();
        let err = conn.query("LOAD DATA LOCAL ...", false).await.unwrap_err();
        assert!(matches!(err, Error::Interface(_)));
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_command_is_fragmented() {
        let sql_len = MAX_PACKET_SIZE + 4;
        let (client, mut server) = duplex(1 << 20);
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let (seq, first) = read_frame(&mut server).await.unwrap();
            assert_eq!(seq, 0);
            assert_eq!(first.len(), MAX_PACKET_SIZE);
            assert_eq!(first[0], 0x03);
            let (seq, second) = read_frame(&mut server).await.unwrap();
            assert_eq!(seq, 1);
            assert_eq!(second.len(), 5);
            server
                .write_all(&frame(2, &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT)))
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let mut conn = connect_over(client, opts()).await.unwrap();
        let sql = format!("/*{}*/", "x".repeat(sql_len - 4));
        assert_eq!(sql.len(), sql_len);
        let affected = conn.query(&sql, false).await.unwrap();
        assert_eq!(affected, 0);
        drop(conn);
        script.await.unwrap();
    }

    #[tokio::test]
    async fn ensure_closed_sends_quit() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let (seq, farewell) = read_frame(&mut server).await.unwrap();
            assert_eq!(seq, 0);
            assert_eq!(farewell, vec![0x01]);
        });

        let mut conn = connect_over(client, opts()).await.unwrap();
        conn.ensure_closed().await.unwrap();
        assert!(!conn.connected());
        let err = conn.query("SELECT 1", false).await.unwrap_err();
        assert!(matches!(err, Error::Interface(_)));
        script.await.unwrap();
    }

    #[tokio::test]
    async fn ping_roundtrip() {
        let (client, mut server) = duplex(1 << 16);
        let script = tokio::spawn(async move {
            serve_handshake(&mut server, 1).await.unwrap();
            let (_, command) = read_frame(&mut server).await.unwrap();
            assert_eq!(command, vec![0x0e]);
            server
                .write_all(&frame(1, &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT)))
                .await
                .unwrap();
            let _ = read_frame(&mut server).await;
        });

        let mut conn = connect_over(client, opts()).await.unwrap();
        conn.ping(false).await.unwrap();
        drop(conn);
        script.await.unwrap();
    }
}
