use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::consts::{cr, MAX_PACKET_SIZE, PACKET_HEADER_SIZE};
use crate::error::{Error, Result};

use super::packet::Packet;

/// MySQL packet codec for use with tokio Framed.
///
/// Owns the per-exchange sequence id. Decoding stitches payloads split at
/// the 0xFFFFFF boundary into one logical [`Packet`] and enforces the
/// sequence discipline; encoding fragments oversized payloads and appends
/// the trailing empty frame when the last fragment is full-size.
#[derive(Debug, Default)]
pub struct PacketCodec {
    next_seq: u8,
    partial: Option<BytesMut>,
}

impl PacketCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sequence id restarts at 0 for every command the client sends.
    pub fn reset_seq(&mut self) {
        self.next_seq = 0;
    }

    pub fn seq(&self) -> u8 {
        self.next_seq
    }

    fn check_seq(&mut self, received: u8) -> Result<()> {
        if received == self.next_seq {
            self.next_seq = self.next_seq.wrapping_add(1);
            return Ok(());
        }
        // Some servers send a final ERR with a reset sequence id when they
        // shut a session down mid-exchange. Treat that as a disconnect
        // rather than a protocol violation.
        if received == 0 && self.next_seq != 0 {
            return Err(Error::operational(
                cr::CR_SERVER_LOST,
                "Lost connection to MySQL server during query",
            ));
        }
        Err(Error::internal(format!(
            "Packet sequence number wrong - got {received} expected {}",
            self.next_seq
        )))
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        loop {
            if src.len() < PACKET_HEADER_SIZE {
                return Ok(None);
            }

            // 3-byte little-endian length, 1-byte sequence
            let len = src[0] as usize | (src[1] as usize) << 8 | (src[2] as usize) << 16;
            if src.len() < PACKET_HEADER_SIZE + len {
                src.reserve(PACKET_HEADER_SIZE + len - src.len());
                return Ok(None);
            }

            let seq = src[3];
            self.check_seq(seq)?;
            src.advance(PACKET_HEADER_SIZE);
            let frame = src.split_to(len);

            match self.partial.take() {
                Some(mut pending) => {
                    pending.extend_from_slice(&frame);
                    if len == MAX_PACKET_SIZE {
                        self.partial = Some(pending);
                        continue;
                    }
                    return Ok(Some(Packet::new(seq, pending.freeze())));
                }
                None => {
                    if len == MAX_PACKET_SIZE {
                        self.partial = Some(frame);
                        continue;
                    }
                    return Ok(Some(Packet::new(seq, frame.freeze())));
                }
            }
        }
    }
}

/// Encode a logical payload, fragmenting by the 16MB rule.
impl Encoder<Bytes> for PacketCodec {
    type Error = Error;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(payload.len() + PACKET_HEADER_SIZE);

        let mut put_frame = |chunk: &[u8], dst: &mut BytesMut| {
            let len = chunk.len();
            dst.put_u8((len & 0xFF) as u8);
            dst.put_u8(((len >> 8) & 0xFF) as u8);
            dst.put_u8(((len >> 16) & 0xFF) as u8);
            dst.put_u8(self.next_seq);
            self.next_seq = self.next_seq.wrapping_add(1);
            dst.extend_from_slice(chunk);
        };

        if payload.is_empty() {
            put_frame(&[], dst);
            return Ok(());
        }
        for chunk in payload.chunks(MAX_PACKET_SIZE) {
            put_frame(chunk, dst);
        }
        // A payload that is an exact multiple of the maximum size needs an
        // empty frame so the peer knows the packet ended.
        if payload.len() % MAX_PACKET_SIZE == 0 {
            put_frame(&[], dst);
        }
        Ok(())
    }
}
