use bytes::{BufMut, Bytes, BytesMut};

use crate::consts::capabilities::*;
use crate::error::{Error, Result};

use super::packet::{put_lenenc_int, put_lenenc_str, Packet};

/// Initial handshake packet (server -> client), protocol version 10.
#[derive(Debug, Clone)]
pub struct Greeting {
    pub protocol_version: u8,
    pub server_version: String,
    pub thread_id: u32,
    /// Both salt parts combined, trailing NUL stripped.
    pub salt: Vec<u8>,
    pub capabilities: u32,
    pub charset_id: u8,
    pub status_flags: u16,
    pub auth_plugin: String,
}

impl Greeting {
    pub fn parse(packet: &mut Packet) -> Result<Self> {
        let protocol_version = packet.read_u8()?;
        let server_version = packet
            .read_null_terminated()
            .ok_or_else(|| Error::internal("Malformed handshake: unterminated server version"))?;
        let server_version = String::from_utf8_lossy(&server_version).into_owned();
        let thread_id = packet.read_u32()?;

        let mut salt = packet.read_bytes(8)?.to_vec();
        packet.advance(1); // filler

        let caps_low = packet.read_u16()? as u32;
        let mut capabilities = caps_low;
        let mut charset_id = 0;
        let mut status_flags = 0;
        let mut auth_plugin = String::new();

        if packet.remaining() > 0 {
            charset_id = packet.read_u8()?;
            status_flags = packet.read_u16()?;
            let caps_high = packet.read_u16()? as u32;
            capabilities |= caps_high << 16;
            let salt_len = packet.read_u8()? as usize;
            packet.advance(10); // reserved

            if capabilities & CLIENT_SECURE_CONNECTION != 0 {
                // 12 scramble bytes plus a NUL, or more for long-salt servers
                let take = std::cmp::max(13, salt_len.saturating_sub(8));
                let part2 = packet.read_bytes(take.min(packet.remaining()))?;
                let end = part2.iter().position(|&b| b == 0).unwrap_or(part2.len());
                salt.extend_from_slice(&part2[..end]);
            }

            if capabilities & CLIENT_PLUGIN_AUTH != 0 && packet.remaining() > 0 {
                // NUL-terminated, but some servers omit the terminator
                let name = match packet.read_null_terminated() {
                    Some(name) => name,
                    None => packet.read_rest(),
                };
                auth_plugin = String::from_utf8_lossy(&name).into_owned();
            }
        }

        Ok(Self {
            protocol_version,
            server_version,
            thread_id,
            salt,
            capabilities,
            charset_id,
            status_flags,
            auth_plugin,
        })
    }

    /// Leading numeric component of the server version, 0 when unparsable.
    pub fn server_major_version(&self) -> u64 {
        self.server_version
            .split('.')
            .next()
            .and_then(|s| {
                let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            })
            .unwrap_or(0)
    }
}

/// Short capabilities-only handshake response announcing the TLS upgrade.
#[derive(Debug, Clone)]
pub struct SslRequest {
    pub capabilities: u32,
    pub max_packet_size: u32,
    pub charset_id: u8,
}

impl SslRequest {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(32);
        buf.put_u32_le(self.capabilities);
        buf.put_u32_le(self.max_packet_size);
        buf.put_u8(self.charset_id);
        buf.extend_from_slice(&[0u8; 23]);
        buf.freeze()
    }
}

/// Handshake response packet (client -> server).
#[derive(Debug, Clone)]
pub struct HandshakeResponse<'a> {
    pub capabilities: u32,
    pub max_packet_size: u32,
    pub charset_id: u8,
    pub user: &'a [u8],
    pub auth_response: &'a [u8],
    pub database: Option<&'a str>,
    pub auth_plugin: &'a str,
    pub connect_attrs: &'a [(String, String)],
}

impl HandshakeResponse<'_> {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        buf.put_u32_le(self.capabilities);
        buf.put_u32_le(self.max_packet_size);
        buf.put_u8(self.charset_id);
        buf.extend_from_slice(&[0u8; 23]);

        buf.extend_from_slice(self.user);
        buf.put_u8(0);

        if self.capabilities & CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
            put_lenenc_str(&mut buf, self.auth_response);
        } else if self.capabilities & CLIENT_SECURE_CONNECTION != 0 {
            buf.put_u8(self.auth_response.len() as u8);
            buf.extend_from_slice(self.auth_response);
        } else {
            buf.extend_from_slice(self.auth_response);
            buf.put_u8(0);
        }

        if self.capabilities & CLIENT_CONNECT_WITH_DB != 0 {
            if let Some(db) = self.database {
                buf.extend_from_slice(db.as_bytes());
            }
            buf.put_u8(0);
        }

        if self.capabilities & CLIENT_PLUGIN_AUTH != 0 {
            buf.extend_from_slice(self.auth_plugin.as_bytes());
            buf.put_u8(0);
        }

        if self.capabilities & CLIENT_CONNECT_ATTRS != 0 {
            let mut attrs = BytesMut::new();
            for (key, value) in self.connect_attrs {
                put_lenenc_str(&mut attrs, key.as_bytes());
                put_lenenc_str(&mut attrs, value.as_bytes());
            }
            put_lenenc_int(&mut buf, attrs.len() as u64);
            buf.extend_from_slice(&attrs);
        }

        buf.freeze()
    }
}
