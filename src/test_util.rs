//! In-process mock server pieces shared by the unit tests: raw frame I/O
//! plus a scripted TCP server speaking just enough of the protocol.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::consts::capabilities::*;
use crate::consts::status::*;
use crate::consts::{field_types, BINARY_CHARSET_ID};
use crate::protocol::packet::{put_lenenc_int, put_lenenc_str};

pub const TEST_SALT: &[u8; 20] = b"0123456789abcdefghij";

pub fn frame(seq: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 4);
    let len = payload.len();
    buf.push((len & 0xFF) as u8);
    buf.push(((len >> 8) & 0xFF) as u8);
    buf.push(((len >> 16) & 0xFF) as u8);
    buf.push(seq);
    buf.extend_from_slice(payload);
    buf
}

pub async fn read_frame<S>(stream: &mut S) -> std::io::Result<(u8, Vec<u8>)>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    let len = header[0] as usize | (header[1] as usize) << 8 | (header[2] as usize) << 16;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    Ok((header[3], payload))
}

pub fn server_caps() -> u32 {
    CLIENT_LONG_PASSWORD
        | CLIENT_LONG_FLAG
        | CLIENT_CONNECT_WITH_DB
        | CLIENT_LOCAL_FILES
        | CLIENT_PROTOCOL_41
        | CLIENT_TRANSACTIONS
        | CLIENT_SECURE_CONNECTION
        | CLIENT_MULTI_STATEMENTS
        | CLIENT_MULTI_RESULTS
        | CLIENT_PLUGIN_AUTH
        | CLIENT_CONNECT_ATTRS
        | CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA
}

pub fn greeting_payload(thread_id: u32, auth_plugin: &str) -> Vec<u8> {
    let caps = server_caps();
    let mut buf = BytesMut::new();
    buf.put_u8(10);
    buf.extend_from_slice(b"8.0.99-mock\0");
    buf.put_u32_le(thread_id);
    buf.extend_from_slice(&TEST_SALT[..8]);
    buf.put_u8(0);
    buf.put_u16_le((caps & 0xFFFF) as u16);
    buf.put_u8(45);
    buf.put_u16_le(SERVER_STATUS_AUTOCOMMIT);
    buf.put_u16_le((caps >> 16) as u16);
    buf.put_u8(21);
    buf.extend_from_slice(&[0u8; 10]);
    buf.extend_from_slice(&TEST_SALT[8..]);
    buf.put_u8(0);
    buf.extend_from_slice(auth_plugin.as_bytes());
    buf.put_u8(0);
    buf.to_vec()
}

pub fn ok_payload(affected_rows: u64, insert_id: u64, status: u16) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(0x00);
    put_lenenc_int(&mut buf, affected_rows);
    put_lenenc_int(&mut buf, insert_id);
    buf.put_u16_le(status);
    buf.put_u16_le(0);
    buf.to_vec()
}

pub fn eof_payload(status: u16) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(0xFE);
    buf.put_u16_le(0);
    buf.put_u16_le(status);
    buf.to_vec()
}

pub fn err_payload(code: u16, sql_state: &str, message: &str) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(0xFF);
    buf.put_u16_le(code);
    buf.put_u8(b'#');
    buf.extend_from_slice(sql_state.as_bytes());
    buf.extend_from_slice(message.as_bytes());
    buf.to_vec()
}

pub fn column_payload(name: &str, type_code: u8, charsetnr: u16) -> Vec<u8> {
    let mut buf = BytesMut::new();
    put_lenenc_str(&mut buf, b"def");
    put_lenenc_str(&mut buf, b"mock");
    put_lenenc_str(&mut buf, b"t");
    put_lenenc_str(&mut buf, b"t");
    put_lenenc_str(&mut buf, name.as_bytes());
    put_lenenc_str(&mut buf, name.as_bytes());
    buf.put_u8(0x0c);
    buf.put_u16_le(charsetnr);
    buf.put_u32_le(21);
    buf.put_u8(type_code);
    buf.put_u16_le(0);
    buf.put_u8(0);
    buf.put_u16_le(0);
    buf.to_vec()
}

pub fn row_payload(cells: &[Option<&str>]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    for cell in cells {
        match cell {
            Some(text) => put_lenenc_str(&mut buf, text.as_bytes()),
            None => buf.put_u8(0xFB),
        }
    }
    buf.to_vec()
}

/// Greeting, handshake response, OK.
pub async fn serve_handshake<S>(stream: &mut S, thread_id: u32) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(&frame(0, &greeting_payload(thread_id, "mysql_native_password")))
        .await?;
    let (_, response) = read_frame(stream).await?;
    stream
        .write_all(&frame(2, &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT)))
        .await?;
    Ok(response)
}

/// One integer result set: a single BIGINT column with the given rows. The
/// terminating EOF carries `status`.
pub async fn write_int_resultset<S>(
    stream: &mut S,
    first_seq: u8,
    name: &str,
    values: &[&str],
    status: u16,
) -> std::io::Result<u8>
where
    S: AsyncWrite + Unpin,
{
    let mut seq = first_seq;
    let mut send = Vec::new();
    send.push(vec![1u8]);
    send.push(column_payload(name, field_types::LONGLONG, BINARY_CHARSET_ID));
    send.push(eof_payload(SERVER_STATUS_AUTOCOMMIT));
    for value in values {
        send.push(row_payload(&[Some(value)]));
    }
    send.push(eof_payload(status));
    for payload in send {
        stream.write_all(&frame(seq, &payload)).await?;
        seq = seq.wrapping_add(1);
    }
    Ok(seq)
}

/// Answer commands until quit or disconnect: PING with OK, `SELECT 1`-style
/// queries with a one-row result, BEGIN/COMMIT/ROLLBACK with transaction
/// status flips, everything else with a plain OK.
pub async fn handle_commands<S>(stream: &mut S) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut in_trans = false;
    loop {
        let (_, payload) = match read_frame(stream).await {
            Ok(f) => f,
            Err(_) => return Ok(()),
        };
        let Some(&opcode) = payload.first() else {
            continue;
        };
        let trans_bit = if in_trans { SERVER_STATUS_IN_TRANS } else { 0 };
        match opcode {
            0x01 => return Ok(()),
            0x0e => {
                stream
                    .write_all(&frame(1, &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT | trans_bit)))
                    .await?;
            }
            0x03 => {
                let sql = String::from_utf8_lossy(&payload[1..]).trim().to_uppercase();
                if sql.starts_with("SELECT") {
                    write_int_resultset(
                        stream,
                        1,
                        "1",
                        &["1"],
                        SERVER_STATUS_AUTOCOMMIT | trans_bit,
                    )
                    .await?;
                } else if sql.starts_with("BEGIN") || sql.starts_with("START TRANSACTION") {
                    in_trans = true;
                    stream
                        .write_all(&frame(
                            1,
                            &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT | SERVER_STATUS_IN_TRANS),
                        ))
                        .await?;
                } else if sql.starts_with("COMMIT") || sql.starts_with("ROLLBACK") {
                    in_trans = false;
                    stream
                        .write_all(&frame(1, &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT)))
                        .await?;
                } else {
                    stream
                        .write_all(&frame(1, &ok_payload(0, 0, SERVER_STATUS_AUTOCOMMIT | trans_bit)))
                        .await?;
                }
            }
            _ => {
                stream
                    .write_all(&frame(1, &err_payload(1064, "42000", "unsupported command")))
                    .await?;
            }
        }
    }
}

/// Scripted server on an ephemeral port; each connection gets a fresh
/// thread id so tests can tell sessions apart.
pub async fn spawn_server() -> SocketAddr {
    static NEXT_THREAD_ID: AtomicU32 = AtomicU32::new(1);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server addr");
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let thread_id = NEXT_THREAD_ID.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                if serve_handshake(&mut stream, thread_id).await.is_ok() {
                    let _ = handle_commands(&mut stream).await;
                }
            });
        }
    });
    addr
}
