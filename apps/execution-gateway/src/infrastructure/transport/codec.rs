//! Length-prefixed multipart codec.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{Multipart, TransportError};

/// Default per-frame limit (1 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Frames accepted in one message.
pub const MAX_FRAMES_PER_MESSAGE: usize = 16;

const LEN_PREFIX: usize = 4;

/// Encodes and decodes multipart messages on a byte stream.
#[derive(Debug, Clone, Copy)]
pub struct MultipartCodec {
    max_frame_size: usize,
}

impl MultipartCodec {
    /// Create a codec with a per-frame limit.
    #[must_use]
    pub const fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Per-frame limit.
    #[must_use]
    pub const fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn check_count(count: usize) -> Result<(), TransportError> {
        if count > MAX_FRAMES_PER_MESSAGE {
            return Err(TransportError::TooManyFrames {
                count,
                max: MAX_FRAMES_PER_MESSAGE,
            });
        }
        Ok(())
    }

    fn check_size(&self, size: usize) -> Result<(), TransportError> {
        if size > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

impl Default for MultipartCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

fn read_prefix(src: &BytesMut, offset: usize) -> Option<usize> {
    let prefix = src.get(offset..offset + LEN_PREFIX)?;
    Some(u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize)
}

impl Decoder for MultipartCodec {
    type Item = Multipart;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Multipart>, TransportError> {
        let Some(count) = read_prefix(src, 0) else {
            return Ok(None);
        };
        Self::check_count(count)?;

        // Walk the length prefixes until the whole message is buffered.
        let mut end = LEN_PREFIX;
        for _ in 0..count {
            let Some(size) = read_prefix(src, end) else {
                src.reserve(end + LEN_PREFIX - src.len());
                return Ok(None);
            };
            self.check_size(size)?;
            end += LEN_PREFIX + size;
            if src.len() < end {
                src.reserve(end - src.len());
                return Ok(None);
            }
        }

        let mut message = src.split_to(end);
        message.advance(LEN_PREFIX);
        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            let size = message.get_u32() as usize;
            frames.push(message.split_to(size).freeze());
        }
        Ok(Some(frames))
    }
}

impl Encoder<Multipart> for MultipartCodec {
    type Error = TransportError;

    fn encode(&mut self, frames: Multipart, dst: &mut BytesMut) -> Result<(), TransportError> {
        Self::check_count(frames.len())?;
        for frame in &frames {
            self.check_size(frame.len())?;
        }

        let total: usize = frames.iter().map(|f| LEN_PREFIX + f.len()).sum();
        dst.reserve(LEN_PREFIX + total);
        dst.put_u32(frames.len() as u32);
        for frame in &frames {
            dst.put_u32(frame.len() as u32);
            dst.put_slice(frame);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use proptest::prelude::*;

    fn encode_to_bytes(
        codec: &mut MultipartCodec,
        frames: Multipart,
    ) -> Result<Bytes, TransportError> {
        let mut buf = BytesMut::new();
        codec.encode(frames, &mut buf)?;
        Ok(buf.freeze())
    }

    fn frames(parts: &[&'static [u8]]) -> Multipart {
        parts.iter().copied().map(Bytes::from_static).collect()
    }

    #[test]
    fn decodes_what_it_encodes() {
        let mut codec = MultipartCodec::default();
        let message = frames(&[b"peer", b"Command", b"", b"body"]);
        let encoded = encode_to_bytes(&mut codec, message.clone()).unwrap();
        let mut buf = BytesMut::from(encoded.as_ref());

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(message));
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_the_whole_message() {
        let mut codec = MultipartCodec::default();
        let encoded = encode_to_bytes(&mut codec, frames(&[b"abc", b"defgh"])).unwrap();

        let mut buf = BytesMut::new();
        for byte in &encoded[..encoded.len() - 1] {
            buf.put_u8(*byte);
            assert_eq!(codec.decode(&mut buf).unwrap(), None);
        }
        buf.put_u8(encoded[encoded.len() - 1]);
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(frames(&[b"abc", b"defgh"]))
        );
    }

    #[test]
    fn two_messages_in_one_read() {
        let mut codec = MultipartCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(frames(&[b"one"]), &mut buf).unwrap();
        codec.encode(frames(&[b"two", b"2"]), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(frames(&[b"one"])));
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(frames(&[b"two", b"2"]))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn oversized_frame_is_an_error() {
        let mut codec = MultipartCodec::new(4);
        let mut buf = BytesMut::new();
        buf.put_u32(1);
        buf.put_u32(5);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::FrameTooLarge { size: 5, max: 4 })
        ));
        assert!(matches!(
            codec.encode(frames(&[b"12345"]), &mut BytesMut::new()),
            Err(TransportError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn too_many_frames_is_an_error() {
        let mut codec = MultipartCodec::default();
        let mut buf = BytesMut::new();
        buf.put_u32(MAX_FRAMES_PER_MESSAGE as u32 + 1);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::TooManyFrames { .. })
        ));
    }

    proptest! {
        #[test]
        fn arbitrary_split_points_decode_once(
            parts in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..6),
            split in 0usize..512,
        ) {
            let mut codec = MultipartCodec::default();
            let message: Multipart = parts.into_iter().map(Bytes::from).collect();
            let encoded = encode_to_bytes(&mut codec, message.clone()).unwrap();
            let split = split.min(encoded.len());

            let mut buf = BytesMut::from(&encoded[..split]);
            let first = codec.decode(&mut buf).unwrap();
            buf.extend_from_slice(&encoded[split..]);
            let decoded = match first {
                Some(frames) => frames,
                None => codec.decode(&mut buf).unwrap().unwrap(),
            };

            prop_assert_eq!(decoded, message);
            prop_assert!(buf.is_empty());
        }
    }
}
