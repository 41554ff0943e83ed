//! Position-folded soft voting and the detect confidence score.

/// Fold correlations modulo `period` and hard-decide by sign.
///
/// With fewer than two full periods, each position is decided from its own
/// (single) correlation; with two or more, same-position correlations across
/// repetitions are summed first so audio-derived noise averages toward zero
/// while the phase-coherent watermark adds constructively.
pub fn soft_vote(correlations: &[f64], period: usize) -> Vec<u8> {
    let repeats = correlations.len() / period;

    if repeats < 2 {
        return correlations.iter().take(period).map(|&c| if c >= 0.0 { 1 } else { 0 }).collect();
    }

    let mut folded = vec![0.0f64; period];
    for r in 0..repeats {
        for p in 0..period {
            folded[p] += correlations[r * period + p];
        }
    }

    folded.iter().map(|&s| if s >= 0.0 { 1 } else { 0 }).collect()
}

pub struct ConfidenceInputs {
    pub mean_confidence: f64,
    pub band_agreement: f64,
    pub rs_errors: usize,
    pub rs_corrected: bool,
    pub lookup_hit: bool,
}

/// Weighted 0-100 confidence blend per spec 4.7.
pub fn confidence_score(inputs: &ConfidenceInputs) -> u8 {
    let rs_term = (1.0 - inputs.rs_errors as f64 / 32.0).max(0.0);
    let score = 100.0
        * (0.35 * inputs.mean_confidence
            + 0.20 * inputs.band_agreement
            + 0.20 * rs_term
            + 0.15 * if inputs.rs_corrected { 1.0 } else { 0.0 }
            + 0.10 * if inputs.lookup_hit { 1.0 } else { 0.0 });

    score.round().clamp(0.0, 100.0) as u8
}
