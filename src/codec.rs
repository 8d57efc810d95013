//! Length-prefixed framing for the serving-process wire protocol.
//!
//! ```text
//! [u32 BE length] [payload: length bytes]
//! ```
//!
//! Both directions use the same layout. The decoder buffers partial reads, so
//! a frame is only yielded once every declared byte has arrived.

use std::io;

use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};

use crate::config::DEFAULT_MAX_FRAME_LENGTH;
use crate::errors::BridgeError;

pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Codec for `[u32 BE length][payload]` frames with a ceiling on the
/// declared length.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_length: usize,
}

impl FrameCodec {
    pub fn new(max_frame_length: usize) -> Self {
        Self { max_frame_length }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = BridgeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, BridgeError> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let length = BigEndian::read_u32(&src[..LENGTH_PREFIX_SIZE]) as usize;
        if length > self.max_frame_length {
            return Err(BridgeError::Protocol(format!(
                "frame of {} bytes exceeds the {} byte limit",
                length, self.max_frame_length
            )));
        }

        let total = LENGTH_PREFIX_SIZE + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(src.split_to(length).freeze()))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, BridgeError> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => Err(truncated_frame(buf)),
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = BridgeError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), BridgeError> {
        if payload.len() > self.max_frame_length {
            return Err(BridgeError::Protocol(format!(
                "refusing to send {} bytes, limit is {}",
                payload.len(),
                self.max_frame_length
            )));
        }
        let length = u32::try_from(payload.len()).map_err(|_| {
            BridgeError::Protocol(format!(
                "payload of {} bytes does not fit a u32 length prefix",
                payload.len()
            ))
        })?;

        dst.reserve(LENGTH_PREFIX_SIZE + payload.len());
        dst.put_u32(length);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

fn truncated_frame(buf: &BytesMut) -> BridgeError {
    let message = if buf.len() < LENGTH_PREFIX_SIZE {
        format!(
            "connection closed after {} of {} length prefix bytes",
            buf.len(),
            LENGTH_PREFIX_SIZE
        )
    } else {
        let declared = BigEndian::read_u32(&buf[..LENGTH_PREFIX_SIZE]);
        format!(
            "connection closed after {} of {} payload bytes",
            buf.len() - LENGTH_PREFIX_SIZE,
            declared
        )
    };
    BridgeError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, message))
}

/// Writes one frame and flushes it.
pub async fn write_frame<T>(conn: &mut Framed<T, FrameCodec>, payload: Bytes) -> Result<(), BridgeError>
where
    T: AsyncWrite + Unpin,
{
    conn.send(payload).await
}

/// Reads one complete frame.
///
/// A peer that hangs up before starting a new frame yields
/// [`BridgeError::PeerClosed`]; one that hangs up mid-frame yields
/// [`BridgeError::Io`].
pub async fn read_frame<T>(conn: &mut Framed<T, FrameCodec>) -> Result<Bytes, BridgeError>
where
    T: AsyncRead + Unpin,
{
    match conn.next().await {
        Some(frame) => frame,
        None => Err(BridgeError::PeerClosed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt};

    #[test]
    fn encode_writes_big_endian_prefix() {
        let mut codec = FrameCodec::default();
        let mut dst = BytesMut::new();
        codec.encode(Bytes::from_static(b"hello"), &mut dst).unwrap();
        assert_eq!(&dst[..], &[0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o']);

        let mut dst = BytesMut::new();
        codec.encode(Bytes::from(vec![7u8; 258]), &mut dst).unwrap();
        assert_eq!(&dst[..4], &[0, 0, 1, 2]);
    }

    #[test]
    fn decode_waits_for_every_declared_byte() {
        let mut codec = FrameCodec::default();
        let mut encoded = BytesMut::new();
        codec.encode(Bytes::from_static(b"{\"k\":1}"), &mut encoded).unwrap();

        let mut src = BytesMut::new();
        for (i, byte) in encoded.iter().enumerate() {
            src.put_u8(*byte);
            let decoded = codec.decode(&mut src).unwrap();
            if i < encoded.len() - 1 {
                assert!(decoded.is_none());
            } else {
                assert_eq!(decoded.unwrap(), Bytes::from_static(b"{\"k\":1}"));
            }
        }
        assert!(src.is_empty());
    }

    #[test]
    fn decode_handles_back_to_back_frames() {
        let mut codec = FrameCodec::default();
        let mut src = BytesMut::new();
        codec.encode(Bytes::from_static(b"first"), &mut src).unwrap();
        codec.encode(Bytes::new(), &mut src).unwrap();
        codec.encode(Bytes::from_static(b"third"), &mut src).unwrap();

        assert_eq!(codec.decode(&mut src).unwrap().unwrap(), "first");
        assert_eq!(codec.decode(&mut src).unwrap().unwrap(), "");
        assert_eq!(codec.decode(&mut src).unwrap().unwrap(), "third");
        assert!(codec.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn oversized_length_rejected_before_payload_arrives() {
        let mut codec = FrameCodec::new(8);
        let mut src = BytesMut::new();
        src.put_u32(9);
        assert!(matches!(codec.decode(&mut src), Err(BridgeError::Protocol(_))));
    }

    #[test]
    fn oversized_payload_rejected_on_encode() {
        let mut codec = FrameCodec::new(4);
        let mut dst = BytesMut::new();
        let result = codec.encode(Bytes::from_static(b"too long"), &mut dst);
        assert!(matches!(result, Err(BridgeError::Protocol(_))));
        assert!(dst.is_empty());
    }

    #[tokio::test]
    async fn frame_round_trips_over_a_stream() {
        let (client, server) = duplex(16);
        let mut client = Framed::new(client, FrameCodec::default());
        let mut server = Framed::new(server, FrameCodec::default());

        // Larger than the duplex buffer, so the reader sees partial chunks.
        let payload = Bytes::from((0..=255u8).cycle().take(4096).collect::<Vec<u8>>());
        let expected = payload.clone();
        let writer = tokio::spawn(async move { write_frame(&mut client, payload).await });

        let received = read_frame(&mut server).await.unwrap();
        writer.await.unwrap().unwrap();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn truncated_payload_is_an_io_error() {
        let (client, mut server) = duplex(64);
        let mut client = Framed::new(client, FrameCodec::default());

        server.write_all(&10u32.to_be_bytes()).await.unwrap();
        server.write_all(b"ab").await.unwrap();
        drop(server);

        match read_frame(&mut client).await {
            Err(BridgeError::Io(err)) => {
                assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
                assert!(err.to_string().contains("2 of 10"));
            }
            other => panic!("expected truncation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn truncated_prefix_is_an_io_error() {
        let (client, mut server) = duplex(64);
        let mut client = Framed::new(client, FrameCodec::default());

        server.write_all(&[0, 0]).await.unwrap();
        drop(server);

        assert!(matches!(read_frame(&mut client).await, Err(BridgeError::Io(_))));
    }

    #[tokio::test]
    async fn clean_close_is_peer_closed() {
        let (client, server) = duplex(64);
        let mut client = Framed::new(client, FrameCodec::default());
        drop(server);

        let err = read_frame(&mut client).await.unwrap_err();
        assert!(err.is_peer_closed());
    }
}
