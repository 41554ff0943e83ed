//! Byte/bit packing (MSB first) and a row/column block interleaver.

/// Unpack bytes into bits, MSB first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &b in bytes {
        for i in (0..8).rev() {
            bits.push((b >> i) & 1);
        }
    }
    bits
}

/// Pack bits into bytes, MSB first, zero-padding the final byte.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity((bits.len() + 7) / 8);
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            if bit != 0 {
                byte |= 1 << (7 - i);
            }
        }
        bytes.push(byte);
    }
    bytes
}

/// Interleave `bits` as a `depth x ceil(n/depth)` matrix filled row-major
/// (trailing zero padded), emitted column-major, truncated back to `n`.
pub fn interleave(bits: &[u8], depth: usize) -> Vec<u8> {
    assert!(depth >= 1);
    let n = bits.len();
    let cols = (n + depth - 1) / depth;
    let padded_len = depth * cols;

    let mut matrix = vec![0u8; padded_len];
    matrix[..n].copy_from_slice(bits);

    let mut out = Vec::with_capacity(padded_len);
    for c in 0..cols {
        for r in 0..depth {
            out.push(matrix[r * cols + c]);
        }
    }
    out.truncate(n);
    out
}

/// Exact inverse of [`interleave`].
pub fn deinterleave(bits: &[u8], depth: usize) -> Vec<u8> {
    assert!(depth >= 1);
    let n = bits.len();
    let cols = (n + depth - 1) / depth;
    let padded_len = depth * cols;

    let mut padded = vec![0u8; padded_len];
    padded[..n].copy_from_slice(bits);

    let mut matrix = vec![0u8; padded_len];
    let mut idx = 0;
    for c in 0..cols {
        for r in 0..depth {
            matrix[r * cols + c] = padded[idx];
            idx += 1;
        }
    }

    matrix.truncate(n);
    matrix
}
