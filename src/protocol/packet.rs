use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::consts::status::SERVER_MORE_RESULTS_EXISTS;
use crate::error::{Error, Result};

/// One logical protocol message, possibly stitched from several frames by
/// the codec. Carries a read cursor so callers can consume the payload with
/// the typed accessors.
#[derive(Debug, Clone)]
pub struct Packet {
    pub sequence_id: u8,
    payload: Bytes,
    pos: usize,
}

impl Packet {
    pub fn new(sequence_id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            sequence_id,
            payload: payload.into(),
            pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.payload.len() - self.pos
    }

    pub fn first_byte(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// The whole payload, regardless of the cursor.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.payload.len());
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.remaining() < n {
            return Err(Error::internal(format!(
                "Packet underflow: wanted {n} bytes, {} left",
                self.remaining()
            )));
        }
        let slice = &self.payload[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Low 16 bits first, then one extra byte.
    pub fn read_u24(&mut self) -> Result<u32> {
        let b = self.take(3)?;
        Ok(b[0] as u32 | (b[1] as u32) << 8 | (b[2] as u32) << 16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        if self.remaining() < n {
            return Err(Error::internal(format!(
                "Packet underflow: wanted {n} bytes, {} left",
                self.remaining()
            )));
        }
        let out = self.payload.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(out)
    }

    /// A NUL-terminated byte run; `None` when no NUL is present.
    pub fn read_null_terminated(&mut self) -> Option<Bytes> {
        let rest = &self.payload[self.pos..];
        let nul = rest.iter().position(|&b| b == 0)?;
        let out = self.payload.slice(self.pos..self.pos + nul);
        self.pos += nul + 1;
        Some(out)
    }

    /// Length-encoded integer; `Ok(None)` is the NULL marker (0xFB).
    pub fn read_lenenc_int(&mut self) -> Result<Option<u64>> {
        let first = self.read_u8()?;
        let value = match first {
            0xFB => return Ok(None),
            0xFC => self.read_u16()? as u64,
            0xFD => self.read_u24()? as u64,
            0xFE => self.read_u64()?,
            literal => literal as u64,
        };
        Ok(Some(value))
    }

    /// Length-encoded string; `Ok(None)` when the length is NULL.
    pub fn read_lenenc_str(&mut self) -> Result<Option<Bytes>> {
        match self.read_lenenc_int()? {
            None => Ok(None),
            Some(len) => Ok(Some(self.read_bytes(len as usize)?)),
        }
    }

    /// Everything from the cursor to the end of the payload.
    pub fn read_rest(&mut self) -> Bytes {
        let out = self.payload.slice(self.pos..);
        self.pos = self.payload.len();
        out
    }

    // Packet-kind predicates. The first byte decides, except for the
    // 0xFE ambiguity: short packets are EOF, long ones AuthSwitchRequest.

    pub fn is_ok(&self) -> bool {
        self.first_byte() == Some(0x00) && self.len() >= 7
    }

    pub fn is_eof(&self) -> bool {
        self.first_byte() == Some(0xFE) && self.len() < 9
    }

    pub fn is_auth_switch(&self) -> bool {
        self.first_byte() == Some(0xFE) && self.len() >= 9
    }

    pub fn is_err(&self) -> bool {
        self.first_byte() == Some(0xFF)
    }

    pub fn is_local_infile(&self) -> bool {
        self.first_byte() == Some(0xFB)
    }

    pub fn is_extra_auth_data(&self) -> bool {
        self.first_byte() == Some(0x01)
    }

    pub fn is_resultset_header(&self) -> bool {
        matches!(self.first_byte(), Some(b) if (1..=250).contains(&b))
    }
}

/// Encode a length-encoded integer, shortest form first.
pub fn put_lenenc_int(buf: &mut BytesMut, value: u64) {
    if value < 0xFB {
        buf.put_u8(value as u8);
    } else if value < 65536 {
        buf.put_u8(0xFC);
        buf.put_u16_le(value as u16);
    } else if value < 16777216 {
        buf.put_u8(0xFD);
        buf.put_u8((value & 0xFF) as u8);
        buf.put_u8(((value >> 8) & 0xFF) as u8);
        buf.put_u8(((value >> 16) & 0xFF) as u8);
    } else {
        buf.put_u8(0xFE);
        buf.put_u64_le(value);
    }
}

/// Encode a length-encoded string (length prefix + raw bytes).
pub fn put_lenenc_str(buf: &mut BytesMut, data: &[u8]) {
    put_lenenc_int(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Decoded OK packet
#[derive(Debug, Clone, Default)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub insert_id: u64,
    pub server_status: u16,
    pub warning_count: u16,
    pub message: Option<String>,
}

impl OkPacket {
    pub fn parse(packet: &mut Packet) -> Result<Self> {
        packet.advance(1); // 0x00 header
        let affected_rows = packet.read_lenenc_int()?.unwrap_or(0);
        let insert_id = packet.read_lenenc_int()?.unwrap_or(0);
        let server_status = packet.read_u16()?;
        let warning_count = packet.read_u16()?;
        let message = if packet.remaining() > 0 {
            Some(String::from_utf8_lossy(&packet.read_rest()).into_owned())
        } else {
            None
        };
        Ok(Self {
            affected_rows,
            insert_id,
            server_status,
            warning_count,
            message,
        })
    }

    pub fn has_next(&self) -> bool {
        self.server_status & SERVER_MORE_RESULTS_EXISTS != 0
    }
}

/// Decoded EOF packet (protocol 4.1 form)
#[derive(Debug, Clone, Default)]
pub struct EofPacket {
    pub warning_count: u16,
    pub server_status: u16,
}

impl EofPacket {
    pub fn parse(packet: &mut Packet) -> Result<Self> {
        packet.advance(1); // 0xFE header
        let warning_count = packet.read_u16()?;
        let server_status = packet.read_u16()?;
        Ok(Self {
            warning_count,
            server_status,
        })
    }

    pub fn has_next(&self) -> bool {
        self.server_status & SERVER_MORE_RESULTS_EXISTS != 0
    }
}

/// Decoded ERR packet
#[derive(Debug, Clone)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: Option<String>,
    pub message: String,
}

impl ErrPacket {
    pub fn parse(packet: &mut Packet) -> Result<Self> {
        packet.advance(1); // 0xFF header
        let error_code = packet.read_u16()?;
        let mut rest = packet.read_rest();
        let sql_state = if rest.first() == Some(&b'#') && rest.len() >= 6 {
            let state = String::from_utf8_lossy(&rest[1..6]).into_owned();
            rest.advance(6);
            Some(state)
        } else {
            None
        };
        Ok(Self {
            error_code,
            sql_state,
            message: String::from_utf8_lossy(&rest).into_owned(),
        })
    }

    pub fn into_error(self) -> Error {
        Error::from_server(self.error_code, self.sql_state, self.message)
    }
}
