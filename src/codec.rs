//! Pure bit-level codec for CAN payloads.
//!
//! Handles both DBC byte orders. Intel (`@1`) fields are concatenated
//! LSB-first from the start bit upward. Motorola (`@0`) fields are read
//! through a byte-mirrored view of the frame at a translated start bit, the
//! "Motorola forward" convention used by existing DBC tooling. The frame
//! byte count always comes from the payload itself so CAN FD frames up to
//! 64 bytes work unchanged.

use crate::types::errors::CodecError;
use crate::types::signal::ByteOrder;

/// Maximum width of a signal field in bits.
pub const MAX_BIT_LENGTH: u16 = 64;

/// Extracts `length` bits starting at `start_bit` from `data`.
pub fn extract(
    data: &[u8],
    start_bit: u16,
    length: u16,
    byte_order: ByteOrder,
) -> Result<u64, CodecError> {
    let start = checked_start(data.len(), start_bit, length, byte_order)?;

    let mut out: u64 = 0;
    for i in 0..length as usize {
        let bit = start + i;
        let byte = match byte_order {
            ByteOrder::Intel => bit / 8,
            // mirrored view: byte i reads data[N - 1 - i]
            ByteOrder::Motorola => data.len() - 1 - bit / 8,
        };
        if (data[byte] >> (bit % 8)) & 1 == 1 {
            out |= 1u64 << i;
        }
    }
    Ok(out)
}

/// ORs the low `length` bits of `value` into `buf` at `start_bit`.
///
/// The mirror image of [`extract`]: a full repack pre-zeroes `buf`, partial
/// writes rely on the field bits being clear. `value` is masked to the
/// field width first.
pub fn pack_into(
    buf: &mut [u8],
    value: u64,
    start_bit: u16,
    length: u16,
    byte_order: ByteOrder,
) -> Result<(), CodecError> {
    let start = checked_start(buf.len(), start_bit, length, byte_order)?;
    let value = value & field_mask(length);

    for i in 0..length as usize {
        if (value >> i) & 1 == 1 {
            let bit = start + i;
            let byte = match byte_order {
                ByteOrder::Intel => bit / 8,
                ByteOrder::Motorola => buf.len() - 1 - bit / 8,
            };
            buf[byte] |= 1u8 << (bit % 8);
        }
    }
    Ok(())
}

/// All-ones mask covering a field of `length` bits.
pub(crate) fn field_mask(length: u16) -> u64 {
    if length >= 64 {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

/// Validates the field geometry and returns the little-endian start bit.
///
/// For Motorola the DBC start bit is translated onto the mirrored frame:
/// `start_le = 8*N - length - 8*(start/8) - ((8*(start/8 + 1) - start - 1) % 8)`.
fn checked_start(
    byte_count: usize,
    start_bit: u16,
    length: u16,
    byte_order: ByteOrder,
) -> Result<usize, CodecError> {
    if length == 0 || length > MAX_BIT_LENGTH {
        return Err(CodecError::InvalidSignal { length });
    }
    let frame_bits = byte_count * 8;
    let out_of_range = CodecError::SignalOutOfRange {
        start_bit,
        length,
        frame_bits,
    };

    match byte_order {
        ByteOrder::Intel => {
            let end = start_bit as usize + length as usize;
            if end > frame_bits {
                return Err(out_of_range);
            }
            Ok(start_bit as usize)
        }
        ByteOrder::Motorola => {
            let start_byte = (start_bit / 8) as isize;
            let inner = (8 * (start_byte + 1) - start_bit as isize - 1) % 8;
            let translated = frame_bits as isize - length as isize - 8 * start_byte - inner;
            if translated < 0 || translated as usize + length as usize > frame_bits {
                return Err(out_of_range);
            }
            Ok(translated as usize)
        }
    }
}

/// Renders `bytes` as lowercase space-separated hex, e.g. `"0a ff 03"`.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Parses hex byte tokens split by `sep`; empty tokens are skipped.
pub fn hex_decode(text: &str, sep: char) -> Result<Vec<u8>, CodecError> {
    let mut bytes: Vec<u8> = Vec::new();
    for token in text.split(sep) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let byte = u8::from_str_radix(token, 16).map_err(|_| CodecError::InvalidHexByte {
            token: token.to_string(),
        })?;
        bytes.push(byte);
    }
    Ok(bytes)
}
