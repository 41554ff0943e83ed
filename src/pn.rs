//! Keyed pseudo-noise carrier bank: deterministic, secret-and-position-seeded
//! waveforms used as the spread-spectrum carriers for every frame bit slot.

use crate::frame::FRAME_PERIOD_BITS;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;
const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

fn fnv1a64(s: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for b in s.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        Xorshift64 { state: if seed == 0 { GOLDEN_GAMMA } else { seed } }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform double in [0, 1).
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }
}

fn seed_for_position(secret: &str, position: usize) -> u64 {
    let h = fnv1a64(secret);
    let mixed = h ^ (position as u64).wrapping_mul(GOLDEN_GAMMA);
    if mixed == 0 {
        GOLDEN_GAMMA
    } else {
        mixed
    }
}

/// Boxcar mean with half-width `half`, clamped at the ends (denominator is
/// the actual included sample count, not `2*half+1`).
fn boxcar_mean(x: &[f64], half: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = vec![0.0f64; n];
    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        let sum: f64 = x[lo..hi].iter().sum();
        out[i] = sum / (hi - lo) as f64;
    }
    out
}

fn hann_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos()))
        .collect()
}

/// Build a single carrier for `(secret, position)`, `len` samples long.
pub fn build_carrier(secret: &str, position: usize, len: usize) -> Vec<f64> {
    let mut rng = Xorshift64::new(seed_for_position(secret, position));

    let raw: Vec<f64> = (0..len).map(|_| 2.0 * rng.next_f64() - 1.0).collect();
    let smoothed = boxcar_mean(&raw, 32);
    let baseline = boxcar_mean(&smoothed, 256);
    let mut dc_removed: Vec<f64> = smoothed.iter().zip(baseline.iter()).map(|(s, b)| s - b).collect();

    let mean_square: f64 = dc_removed.iter().map(|v| v * v).sum::<f64>() / len as f64;
    let norm = mean_square.sqrt();
    if norm >= 1e-10 {
        for v in dc_removed.iter_mut() {
            *v /= norm;
        }
    }

    let window = hann_window(len);
    dc_removed.iter().zip(window.iter()).map(|(v, w)| v * w).collect()
}

/// The full bank of `frame_period` carriers for one `(secret, samples_per_bit)` pair.
pub struct CarrierBank {
    carriers: Vec<Vec<f64>>,
}

impl CarrierBank {
    pub fn build(secret: &str, samples_per_bit: usize) -> Self {
        let carriers = (0..FRAME_PERIOD_BITS)
            .map(|p| build_carrier(secret, p, samples_per_bit))
            .collect();
        CarrierBank { carriers }
    }

    pub fn get(&self, position: usize) -> &[f64] {
        &self.carriers[position % FRAME_PERIOD_BITS]
    }
}
