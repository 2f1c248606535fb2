//! Consistent Overhead Byte Stuffing frame codec
//!
//! The codec turns an arbitrary byte record, which may contain zero bytes,
//! into a representation free of zero bytes, so that a single trailing `0x00`
//! can serve as an unambiguous frame delimiter on a stream with no other
//! message boundaries. The delimiter itself is the caller's business: the
//! encoder does not append it and the decoder expects it already stripped.
//!
//! The codec is checksum-agnostic. Integrity verification is layered on top
//! by the monitoring link (see [`crate::monitor`]).

/// Marker byte closing a maximum-length run: the following byte is data, not
/// a group code, even though 254 bytes were copied.
const RUN_CONTINUES: u8 = 0xff;

/// Worst-case encoded size for an input of `len` bytes, excluding the
/// delimiter: one overhead byte per started 254-byte run, at least one.
pub const fn max_encoded_len(len: usize) -> usize {
    len + len / 254 + 1
}

/// Stuffed span could not be unstuffed: a group code claimed more bytes than
/// remain, or a stray zero byte appeared inside the span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodeError;

/// Encodes `input` into `output`, returning the encoded length.
///
/// The output contains no zero byte. `output` must hold at least
/// [`max_encoded_len`]`(input.len())` bytes.
pub fn encode(input: &[u8], output: &mut [u8]) -> usize {
    let mut read = 0;
    let mut write = 1;
    let mut code_at = 0;
    let mut code: u8 = 1;

    while read < input.len() {
        if input[read] == 0 {
            output[code_at] = code;
            code = 1;
            code_at = write;
            write += 1;
            read += 1;
        } else {
            output[write] = input[read];
            write += 1;
            read += 1;
            code += 1;
            if code == RUN_CONTINUES {
                output[code_at] = code;
                code = 1;
                code_at = write;
                write += 1;
            }
        }
    }
    output[code_at] = code;
    write
}

/// Decodes a stuffed span (without its delimiter) into `output`, returning
/// the decoded length.
///
/// `output` must hold at least `input.len()` bytes. The decoded length is
/// never larger than the input length.
pub fn decode(input: &[u8], output: &mut [u8]) -> Result<usize, DecodeError> {
    let mut read = 0;
    let mut write = 0;

    while read < input.len() {
        let code = input[read];
        if code == 0 {
            return Err(DecodeError);
        }
        read += 1;

        let group = usize::from(code) - 1;
        if read + group > input.len() {
            return Err(DecodeError);
        }
        output[write..write + group].copy_from_slice(&input[read..read + group]);
        read += group;
        write += group;

        if code != RUN_CONTINUES && read != input.len() {
            output[write] = 0;
            write += 1;
        }
    }
    Ok(write)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_TEST_LEN: usize = 600;

    fn round_trip(input: &[u8]) {
        let mut encoded = [0u8; max_encoded_len(MAX_TEST_LEN)];
        let mut decoded = [0u8; max_encoded_len(MAX_TEST_LEN)];

        let encoded_len = encode(input, &mut encoded);
        assert!(encoded_len <= max_encoded_len(input.len()));
        assert!(encoded[..encoded_len].iter().all(|&byte| byte != 0));

        let decoded_len = decode(&encoded[..encoded_len], &mut decoded).unwrap();
        assert_eq!(&decoded[..decoded_len], input);
    }

    #[test]
    fn test_round_trip_basic() {
        round_trip(&[]);
        round_trip(&[0x00]);
        round_trip(&[0x01]);
        round_trip(&[0x00, 0x00]);
        round_trip(&[0x11, 0x22, 0x00, 0x33]);
        round_trip(&[0x11, 0x00, 0x00, 0x00]);
        round_trip(&[0x00, 0x11, 0x00]);
    }

    #[test]
    fn test_round_trip_run_length_boundaries() {
        let mut input = [0xabu8; MAX_TEST_LEN];
        for len in [253, 254, 255, 256, 507, 508, 509] {
            round_trip(&input[..len]);
        }
        // A zero right after a force-closed maximum run
        input[254] = 0;
        round_trip(&input[..256]);
    }

    #[test]
    fn test_round_trip_exhaustive_short() {
        for len in 0..16 {
            let input: heapless::Vec<u8, 16> = (0..len).map(|i| (i % 3) as u8).collect();
            round_trip(&input);
        }
    }

    #[test]
    fn test_known_encodings() {
        let mut output = [0u8; 16];

        let len = encode(&[], &mut output);
        assert_eq!(&output[..len], &[0x01]);

        let len = encode(&[0x00], &mut output);
        assert_eq!(&output[..len], &[0x01, 0x01]);

        let len = encode(&[0x11, 0x22, 0x00, 0x33], &mut output);
        assert_eq!(&output[..len], &[0x03, 0x11, 0x22, 0x02, 0x33]);
    }

    #[test]
    fn test_decode_truncated_group_fails() {
        let mut output = [0u8; 16];
        assert_eq!(decode(&[0x05, 0x11, 0x22], &mut output), Err(DecodeError));
        assert_eq!(decode(&[0x02], &mut output), Err(DecodeError));
    }

    #[test]
    fn test_decode_lone_code_one_is_legal() {
        let mut output = [0u8; 16];
        assert_eq!(decode(&[0x01], &mut output), Ok(0));
    }

    #[test]
    fn test_decode_embedded_zero_fails() {
        let mut output = [0u8; 16];
        assert_eq!(decode(&[0x02, 0x11, 0x00], &mut output), Err(DecodeError));
    }
}
