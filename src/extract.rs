//! Correlator: scores every block against its position-matching PN carrier.

use crate::pn::CarrierBank;
use crate::wav::StereoBuffer;

pub struct ExtractResult {
    pub correlations: Vec<f64>,
    pub mean_confidence: f64,
    pub band_agreement: f64,
    pub blocks_analyzed: usize,
}

const ENERGY_FLOOR: f64 = 1e-20;
const ACTIVE_BLOCK_THRESHOLD: f64 = 1e-9;

/// Correlate every full block of `buf` against the position-matching carrier
/// in `bank`. `period` is the frame period in bits (carriers repeat modulo it).
pub fn extract(buf: &StereoBuffer, bank: &CarrierBank, samples_per_bit: usize, period: usize) -> ExtractResult {
    let total = buf.left.len();
    let mut correlations = Vec::new();
    let mut confidences = Vec::new();
    let mut active_blocks = 0usize;

    let mut block = 0usize;
    while block * samples_per_bit + samples_per_bit <= total {
        let start = block * samples_per_bit;
        let end = start + samples_per_bit;
        let position = block % period;
        let carrier = bank.get(position);

        let mid: Vec<f64> = buf.left[start..end]
            .iter()
            .zip(buf.right[start..end].iter())
            .map(|(&l, &r)| (l as f64 + r as f64) / 2.0)
            .collect();

        let raw: f64 = mid.iter().zip(carrier.iter()).map(|(m, c)| m * c).sum();
        let energy: f64 = mid.iter().map(|m| m * m).sum();
        let carrier_energy: f64 = carrier.iter().map(|c| c * c).sum();

        let correlation = if energy > ENERGY_FLOOR { raw / energy.sqrt() } else { 0.0 };
        let confidence = if energy > ENERGY_FLOOR && carrier_energy > ENERGY_FLOOR {
            (raw.abs() / (energy * carrier_energy).sqrt()).min(1.0)
        } else {
            0.0
        };

        if energy > ACTIVE_BLOCK_THRESHOLD {
            active_blocks += 1;
        }

        correlations.push(correlation);
        confidences.push(confidence);
        block += 1;
    }

    let blocks_analyzed = correlations.len();
    let mean_confidence = if blocks_analyzed > 0 {
        confidences.iter().sum::<f64>() / blocks_analyzed as f64
    } else {
        0.0
    };
    let band_agreement = if blocks_analyzed > 0 {
        active_blocks as f64 / blocks_analyzed as f64
    } else {
        1.0
    };

    ExtractResult {
        correlations,
        mean_confidence,
        band_agreement,
        blocks_analyzed,
    }
}
