pub mod codec;
pub mod handshake;
pub mod packet;

pub use codec::PacketCodec;
pub use handshake::{Greeting, HandshakeResponse, SslRequest};
pub use packet::{put_lenenc_int, put_lenenc_str, EofPacket, ErrPacket, OkPacket, Packet};
