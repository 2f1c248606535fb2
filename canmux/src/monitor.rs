//! Host monitoring link framing
//!
//! Every bus frame the stack observes is mirrored to the host over the
//! serial line. The wire format per frame, before stuffing, is
//!
//! ```text
//! [id_raw: u32][len: u8][payload: len bytes][timestamp_ns: u64][crc32: u32]
//! ```
//!
//! with all multi-byte fields little-endian and the extended-addressing flag
//! packed into bit 31 of `id_raw`. The CRC-32 covers every preceding byte of
//! the record. The record is COBS-stuffed and terminated with a single
//! `0x00` delimiter, so the host can resynchronize on the raw byte stream at
//! any point.
//!
//! [`Deframer`] implements the symmetric inbound path: accumulate bytes to
//! the next delimiter, unstuff, verify length and checksum, and only then
//! surface the frame. A record that fails any check is discarded whole.

use canmux_driver::frame::{CanId, Data, Frame};
use canmux_driver::time::Instant;

use crate::cobs;
use crate::crc::Crc32;
use crate::ring::Producer;

const ID_LEN: usize = 4;
const LEN_LEN: usize = 1;
const TIMESTAMP_LEN: usize = 8;

/// Record bytes that are not payload
const OVERHEAD: usize = ID_LEN + LEN_LEN + TIMESTAMP_LEN + Crc32::LENGTH;

/// Largest raw record: full 8-byte payload plus the fixed fields
pub const MAX_RECORD_LEN: usize = OVERHEAD + Data::MAX;

/// Largest on-wire frame: stuffed record plus the delimiter
pub const MAX_FRAME_LEN: usize = cobs::max_encoded_len(MAX_RECORD_LEN) + 1;

/// Serializes one frame into `out`, returning the total length including the
/// trailing delimiter. `out` must hold at least [`MAX_FRAME_LEN`] bytes.
pub fn encode_frame(frame: &Frame, out: &mut [u8]) -> usize {
    let mut record = [0u8; MAX_RECORD_LEN];
    let mut at = 0;

    record[at..at + ID_LEN].copy_from_slice(&frame.id.into_raw().to_le_bytes());
    at += ID_LEN;
    record[at] = frame.data.length() as u8;
    at += LEN_LEN;
    record[at..at + frame.data.length()].copy_from_slice(&frame.data);
    at += frame.data.length();

    let timestamp_ns = frame.timestamp.as_micros().wrapping_mul(1_000);
    record[at..at + TIMESTAMP_LEN].copy_from_slice(&timestamp_ns.to_le_bytes());
    at += TIMESTAMP_LEN;

    let crc = Crc32::compute(&record[..at]);
    record[at..at + Crc32::LENGTH].copy_from_slice(&crc.to_le_bytes());
    at += Crc32::LENGTH;

    let encoded = cobs::encode(&record[..at], out);
    out[encoded] = 0x00;
    encoded + 1
}

/// Encodes one frame and pushes it into the host TX queue all-or-nothing.
///
/// A full queue drops the frame; monitoring is best-effort and never stalls
/// the bus side.
pub fn forward(frame: &Frame, host_tx: &mut Producer<'_, u8>) -> bool {
    let mut wire = [0u8; MAX_FRAME_LEN];
    let length = encode_frame(frame, &mut wire);
    let pushed = host_tx.push_all(&wire[..length]);
    if !pushed {
        warn!("monitor: host queue full, frame dropped");
    }
    pushed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeframeError {
    /// Stuffed span could not be unstuffed
    Cobs(cobs::DecodeError),
    /// Span longer than any valid record, or record size inconsistent with
    /// its length field
    Length,
    /// Trailing CRC-32 did not match the record contents
    Checksum,
    /// Identifier field outside the valid standard/extended range
    Id,
}

impl From<cobs::DecodeError> for DeframeError {
    fn from(value: cobs::DecodeError) -> Self {
        Self::Cobs(value)
    }
}

/// Inbound monitoring-link parser
///
/// Feed it the raw serial bytes one at a time; a completed, verified record
/// is surfaced as a [`Frame`] when its delimiter arrives. Spans between
/// consecutive delimiters are handled independently, so a malformed span
/// costs exactly the frames it covered.
pub struct Deframer {
    buf: [u8; MAX_FRAME_LEN],
    len: usize,
    overflow: bool,
}

impl Deframer {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_FRAME_LEN],
            len: 0,
            overflow: false,
        }
    }

    /// Consumes one byte from the stream.
    ///
    /// Returns `None` while a span is still accumulating (and for empty
    /// spans, which delimiter-based framing produces legitimately).
    pub fn push(&mut self, byte: u8) -> Option<Result<Frame, DeframeError>> {
        if byte != 0x00 {
            if self.len < self.buf.len() {
                self.buf[self.len] = byte;
                self.len += 1;
            } else {
                // Discard the rest of the span; report at the delimiter.
                self.overflow = true;
            }
            return None;
        }

        let len = core::mem::take(&mut self.len);
        if core::mem::take(&mut self.overflow) {
            return Some(Err(DeframeError::Length));
        }
        if len == 0 {
            return None;
        }

        let mut record = [0u8; MAX_FRAME_LEN];
        let result = match cobs::decode(&self.buf[..len], &mut record) {
            Ok(decoded) => parse_record(&record[..decoded]),
            Err(error) => Err(error.into()),
        };
        Some(result)
    }
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_record(record: &[u8]) -> Result<Frame, DeframeError> {
    if record.len() < OVERHEAD || record.len() > MAX_RECORD_LEN {
        return Err(DeframeError::Length);
    }

    let crc_at = record.len() - Crc32::LENGTH;
    let expected = u32::from_le_bytes(unwrap!(record[crc_at..].try_into()));
    if Crc32::compute(&record[..crc_at]) != expected {
        return Err(DeframeError::Checksum);
    }

    let raw_id = u32::from_le_bytes(unwrap!(record[..ID_LEN].try_into()));
    let payload_len = usize::from(record[ID_LEN]);
    if record.len() != OVERHEAD + payload_len || payload_len > Data::MAX {
        return Err(DeframeError::Length);
    }

    let id = CanId::from_raw(raw_id).ok_or(DeframeError::Id)?;
    let payload_at = ID_LEN + LEN_LEN;
    let data = unwrap!(Data::new(&record[payload_at..payload_at + payload_len]));

    let timestamp_at = payload_at + payload_len;
    let timestamp_ns =
        u64::from_le_bytes(unwrap!(record[timestamp_at..timestamp_at + TIMESTAMP_LEN].try_into()));

    Ok(Frame::new(id, data, Instant::from_micros(timestamp_ns / 1_000)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame() -> Frame {
        let id = CanId::new_extended(2000).unwrap();
        let data = Data::new(&[0x01, 0x02, 0x00, 0x04]).unwrap();
        Frame::new(id, data, Instant::from_micros(123_456))
    }

    fn feed(deframer: &mut Deframer, bytes: &[u8]) -> Option<Result<Frame, DeframeError>> {
        let mut last = None;
        for &byte in bytes {
            if let Some(result) = deframer.push(byte) {
                last = Some(result);
            }
        }
        last
    }

    #[test]
    fn test_encode_is_delimited_and_zero_free() {
        let mut wire = [0u8; MAX_FRAME_LEN];
        let length = encode_frame(&test_frame(), &mut wire);
        assert_eq!(wire[length - 1], 0x00);
        assert!(wire[..length - 1].iter().all(|&byte| byte != 0));
    }

    #[test]
    fn test_encode_deframe_round_trip() {
        let frame = test_frame();
        let mut wire = [0u8; MAX_FRAME_LEN];
        let length = encode_frame(&frame, &mut wire);

        let mut deframer = Deframer::new();
        assert_eq!(feed(&mut deframer, &wire[..length]), Some(Ok(frame)));
    }

    #[test]
    fn test_record_layout() {
        let frame = test_frame();
        let mut wire = [0u8; MAX_FRAME_LEN];
        let length = encode_frame(&frame, &mut wire);

        let mut record = [0u8; MAX_FRAME_LEN];
        let decoded = cobs::decode(&wire[..length - 1], &mut record).unwrap();
        assert_eq!(decoded, OVERHEAD + 4);

        assert_eq!(
            u32::from_le_bytes(record[..4].try_into().unwrap()),
            2000 | 1 << 31
        );
        assert_eq!(record[4], 4);
        assert_eq!(&record[5..9], &[0x01, 0x02, 0x00, 0x04]);
        assert_eq!(
            u64::from_le_bytes(record[9..17].try_into().unwrap()),
            123_456_000
        );
        let crc = u32::from_le_bytes(record[17..21].try_into().unwrap());
        assert_eq!(crc, Crc32::compute(&record[..17]));
    }

    #[test]
    fn test_corrupted_byte_rejected() {
        let frame = test_frame();
        let mut wire = [0u8; MAX_FRAME_LEN];
        let length = encode_frame(&frame, &mut wire);
        wire[2] ^= 0x40;

        let mut deframer = Deframer::new();
        assert_eq!(
            feed(&mut deframer, &wire[..length]),
            Some(Err(DeframeError::Checksum))
        );
    }

    #[test]
    fn test_resync_after_garbage() {
        let frame = test_frame();
        let mut wire = [0u8; MAX_FRAME_LEN];
        let length = encode_frame(&frame, &mut wire);

        let mut deframer = Deframer::new();
        // Tail of a frame whose start was lost, then a whole good frame.
        assert!(matches!(feed(&mut deframer, &[0xaa, 0xbb, 0x00]), Some(Err(_))));
        assert_eq!(feed(&mut deframer, &wire[..length]), Some(Ok(frame)));
    }

    #[test]
    fn test_oversized_span_discarded() {
        let mut deframer = Deframer::new();
        for _ in 0..MAX_FRAME_LEN + 10 {
            assert_eq!(deframer.push(0x55), None);
        }
        assert_eq!(deframer.push(0x00), Some(Err(DeframeError::Length)));

        let frame = test_frame();
        let mut wire = [0u8; MAX_FRAME_LEN];
        let length = encode_frame(&frame, &mut wire);
        assert_eq!(feed(&mut deframer, &wire[..length]), Some(Ok(frame)));
    }

    #[test]
    fn test_empty_spans_ignored() {
        let mut deframer = Deframer::new();
        assert_eq!(deframer.push(0x00), None);
        assert_eq!(deframer.push(0x00), None);
    }

    #[test]
    fn test_forward_drops_on_full_queue() {
        use crate::ring::RingBuffer;

        let mut queue = RingBuffer::<u8, 8>::new();
        let (mut producer, consumer) = queue.split();
        assert!(!forward(&test_frame(), &mut producer));
        assert!(consumer.is_empty());
    }
}
