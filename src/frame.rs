//! Frame build/parse: sync preamble, length field, interleaved RS codeword.

use crate::bits::{self};
use crate::error::WatermarkError;
use crate::rs;

pub const PAYLOAD_BYTES: usize = 16;
pub const RS_PARITY_BYTES: usize = 32;
pub const INTERLEAVE_DEPTH: usize = 8;
pub const SYNC_BITS: usize = 64;
pub const LENGTH_BITS: usize = 16;
pub const CODEWORD_BITS: usize = 8 * (PAYLOAD_BYTES + RS_PARITY_BYTES);
pub const FRAME_PERIOD_BITS: usize = SYNC_BITS + LENGTH_BITS + CODEWORD_BITS;

/// 64-bit sync preamble, MSB first in each byte.
pub const SYNC: [u8; 8] = [0xAD, 0x52, 0xE6, 0x63, 0x9A, 0x72, 0xB4, 0xCB];

const SYNC_STRONG_THRESHOLD: usize = 55; // 85% of 64
const SYNC_WEAK_THRESHOLD: usize = 38; // 60% of 64

pub struct ParsedFrame {
    pub key: [u8; PAYLOAD_BYTES],
    pub key_hash: [u8; 32],
    pub errors: usize,
}

/// Build the 464-bit frame for a 16-byte signature key.
pub fn build(key: &[u8; PAYLOAD_BYTES]) -> Vec<u8> {
    let codeword = rs::encode(key, RS_PARITY_BYTES);
    let codeword_bits = bits::bytes_to_bits(&codeword);
    let interleaved = bits::interleave(&codeword_bits, INTERLEAVE_DEPTH);

    let mut frame = bits::bytes_to_bits(&SYNC);
    frame.extend(length_bits(PAYLOAD_BYTES as u16));
    frame.extend(interleaved);

    debug_assert_eq!(frame.len(), FRAME_PERIOD_BITS);
    frame
}

fn length_bits(len: u16) -> Vec<u8> {
    (0..LENGTH_BITS).map(|i| ((len >> (LENGTH_BITS - 1 - i)) & 1) as u8).collect()
}

fn bits_to_u16(bits: &[u8]) -> u16 {
    bits.iter().fold(0u16, |acc, &b| (acc << 1) | b as u16)
}

/// Slide the sync pattern across `v`, returning the best-matching start
/// index if it clears at least the weak (60%) threshold.
fn find_sync(v: &[u8]) -> Option<usize> {
    if v.len() < SYNC_BITS {
        return None;
    }
    let sync_bits = bits::bytes_to_bits(&SYNC);

    let mut best_idx = None;
    let mut best_score = 0usize;

    for start in 0..=(v.len() - SYNC_BITS) {
        let window = &v[start..start + SYNC_BITS];
        let score = window
            .iter()
            .zip(sync_bits.iter())
            .filter(|(a, b)| a == b)
            .count();

        if score >= SYNC_STRONG_THRESHOLD {
            return Some(start);
        }
        if score > best_score {
            best_score = score;
            best_idx = Some(start);
        }
    }

    if best_score >= SYNC_WEAK_THRESHOLD {
        best_idx
    } else {
        None
    }
}

/// Parse a candidate bit vector into a recovered signature key.
pub fn parse(v: &[u8]) -> Result<ParsedFrame, WatermarkError> {
    let sync_start = find_sync(v).ok_or(WatermarkError::NoSync)?;

    let length_start = sync_start + SYNC_BITS;
    let length_end = length_start + LENGTH_BITS;
    if v.len() < length_end {
        return Err(WatermarkError::NoSync);
    }
    let length = bits_to_u16(&v[length_start..length_end]);

    let codeword_bits_len = 8 * (length as usize + RS_PARITY_BYTES);
    let codeword_start = length_end;
    let codeword_end = codeword_start + codeword_bits_len;
    if codeword_end > v.len() {
        return Err(WatermarkError::UnsupportedLength { got: length });
    }
    if length != PAYLOAD_BYTES as u16 {
        return Err(WatermarkError::UnsupportedLength { got: length });
    }

    let codeword_bits = &v[codeword_start..codeword_end];
    let deinterleaved = bits::deinterleave(codeword_bits, INTERLEAVE_DEPTH);
    let codeword_bytes = bits::bits_to_bytes(&deinterleaved);

    let decoded = rs::decode(&codeword_bytes, RS_PARITY_BYTES);
    if !decoded.corrected {
        return Err(WatermarkError::UncorrectableCodeword { errors: decoded.errors });
    }
    if decoded.data.len() != PAYLOAD_BYTES {
        return Err(WatermarkError::WrongPayloadSize { got: decoded.data.len() });
    }

    let mut key = [0u8; PAYLOAD_BYTES];
    key.copy_from_slice(&decoded.data);

    use sha2::{Digest, Sha256};
    let key_hash: [u8; 32] = Sha256::digest(key).into();

    Ok(ParsedFrame {
        key,
        key_hash,
        errors: decoded.errors,
    })
}
