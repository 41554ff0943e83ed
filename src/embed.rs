//! Spread-spectrum embedder: sums secret-keyed PN carriers into the stereo
//! buffer, one carrier slot per frame-period position, with per-block
//! energy-adaptive gain.

use crate::pn::CarrierBank;
use crate::wav::StereoBuffer;

pub const DEFAULT_EMBED_STRENGTH: f64 = 0.007;

fn adaptive_gain(base: f64, block_energy: f64) -> f64 {
    base * (4.0 * block_energy).clamp(0.1, 0.6)
}

fn block_energy(left: &[f32], right: &[f32]) -> f64 {
    let n = left.len() as f64;
    let sum_sq: f64 = left
        .iter()
        .zip(right.iter())
        .map(|(&l, &r)| {
            let mid = (l as f64 + r as f64) / 2.0;
            mid * mid
        })
        .sum();
    (sum_sq / n).sqrt()
}

/// Sum `bits`' watermark into `buf` in place. If `removal_bits` is present,
/// the prior watermark for that bitstream is subtracted in the same pass
/// (re-signing path), so a single call can both remove and add a mark.
pub fn embed(
    buf: &mut StereoBuffer,
    bank: &CarrierBank,
    bits: &[u8],
    removal_bits: Option<&[u8]>,
    gamma0: f64,
    samples_per_bit: usize,
) {
    let total = buf.left.len();
    let period = bits.len();
    let mut block = 0usize;

    while block * samples_per_bit + samples_per_bit <= total {
        let start = block * samples_per_bit;
        let end = start + samples_per_bit;
        let position = block % period;

        let energy = block_energy(&buf.left[start..end], &buf.right[start..end]);
        let gamma = adaptive_gain(gamma0, energy);
        let carrier = bank.get(position);

        let sign = if bits[position] != 0 { 1.0 } else { -1.0 };
        let removal_sign = removal_bits.map(|r| if r[position] != 0 { 1.0 } else { -1.0 });

        for i in 0..samples_per_bit {
            let mut delta = carrier[i] * sign * gamma;
            if let Some(rsign) = removal_sign {
                delta -= carrier[i] * rsign * gamma;
            }
            buf.left[start + i] += delta as f32;
            buf.right[start + i] += delta as f32;
        }

        block += 1;
    }
}
