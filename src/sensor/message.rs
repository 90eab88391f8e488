//! Frame extraction and validation
//!
//! Frames are `[marker(2)] [length(2)] [payload...] [checksum(2)]`, all
//! big-endian, with the checksum being the 16-bit sum of every byte before it.

use crate::sensor::FrameError;

/// A validated frame borrowed from a receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Find the first frame starting with `header` and validate `length` bytes from there
    pub fn extract(buffer: &'a [u8], header: &[u8], length: usize) -> Result<Self, FrameError> {
        let start = find(buffer, header).ok_or_else(|| FrameError::MissingHeader {
            header: hex::encode(header),
            length: buffer.len(),
        })?;

        let available = buffer.len() - start;
        if available < length {
            return Err(FrameError::Truncated {
                expected: length,
                received: available,
            });
        }

        let frame = Self {
            bytes: &buffer[start..start + length],
        };
        let expected = frame.computed_checksum();
        let received = frame.checksum();
        if expected != received {
            return Err(FrameError::Checksum { expected, received });
        }
        Ok(frame)
    }

    /// Everything between the 4-byte header and the checksum
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[4..self.bytes.len() - 2]
    }

    /// Checksum as transmitted
    pub fn checksum(&self) -> u16 {
        let n = self.bytes.len();
        u16::from_be_bytes([self.bytes[n - 2], self.bytes[n - 1]])
    }

    /// Payload as big-endian 16-bit words
    pub fn words(&self) -> Vec<u16> {
        self.payload()
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect()
    }

    fn computed_checksum(&self) -> u16 {
        checksum(&self.bytes[..self.bytes.len() - 2])
    }
}

/// 16-bit wrapping sum of all bytes
pub fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &[u8] = b"BM\x00\x04";

    fn frame_bytes(payload: &[u8]) -> Vec<u8> {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(payload);
        let sum = checksum(&bytes);
        bytes.extend_from_slice(&sum.to_be_bytes());
        bytes
    }

    #[test]
    fn test_extract_valid_frame() {
        let bytes = frame_bytes(b"..");
        assert_eq!(bytes, b"BM\x00\x04..\x00\xef");

        let frame = Frame::extract(&bytes, HEADER, 8).unwrap();
        assert_eq!(frame.payload(), b"..");
        assert_eq!(frame.words(), vec![0x2e2e]);
        assert_eq!(frame.checksum(), 0x00ef);
    }

    #[test]
    fn test_extract_skips_leading_garbage() {
        let mut buffer = b"\x01\x02garbage".to_vec();
        buffer.extend(frame_bytes(b"\x00\x07"));
        buffer.extend(b"tail");

        let frame = Frame::extract(&buffer, HEADER, 8).unwrap();
        assert_eq!(frame.words(), vec![7]);
    }

    #[test]
    fn test_missing_header() {
        let result = Frame::extract(b"123", HEADER, 8);
        assert!(matches!(result, Err(FrameError::MissingHeader { length: 3, .. })));
    }

    #[test]
    fn test_truncated_frame() {
        let bytes = frame_bytes(b"..");
        let result = Frame::extract(&bytes[..6], HEADER, 8);
        assert_eq!(
            result,
            Err(FrameError::Truncated {
                expected: 8,
                received: 6
            })
        );
    }

    #[test]
    fn test_bad_checksum() {
        let mut bytes = frame_bytes(b"..");
        bytes[7] = 0xff;
        let result = Frame::extract(&bytes, HEADER, 8);
        assert_eq!(
            result,
            Err(FrameError::Checksum {
                expected: 0x00ef,
                received: 0x00ff
            })
        );
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[0xff; 300]), (0xffu32 * 300 % 0x10000) as u16);
    }
}
