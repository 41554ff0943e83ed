//! Systematic Reed-Solomon codec over [`crate::gf`]'s GF(2^8), generator
//! polynomial rooted at alpha^0 (first consecutive root 0), matching the
//! conventional (non-CCSDS) convention: `generator = prod_{i=0}^{nsym-1} (x - alpha^i)`.

use crate::gf::GF;

pub struct RsDecode {
    pub data: Vec<u8>,
    pub corrected: bool,
    pub errors: usize,
}

fn generator_poly(nsym: usize) -> Vec<u8> {
    let mut gen = vec![1u8];
    for i in 0..nsym {
        gen = GF.poly_mul(&gen, &[1, GF.exp_at(i as i32)]);
    }
    gen
}

/// Systematic encode: returns `data || parity`, `parity.len() == nsym`.
pub fn encode(data: &[u8], nsym: usize) -> Vec<u8> {
    let gen = generator_poly(nsym);
    let mut scratch = data.to_vec();
    scratch.extend(std::iter::repeat(0u8).take(nsym));

    for i in 0..data.len() {
        let coef = scratch[i];
        if coef == 0 {
            continue;
        }
        for (j, &g) in gen.iter().enumerate().skip(1) {
            scratch[i + j] ^= GF.mul(g, coef);
        }
    }

    let mut out = data.to_vec();
    out.extend_from_slice(&scratch[data.len()..]);
    out
}

fn calc_syndromes(msg: &[u8], nsym: usize) -> Vec<u8> {
    (0..nsym).map(|i| GF.poly_eval(msg, GF.exp_at(i as i32))).collect()
}

fn find_error_locator(synd: &[u8], nsym: usize) -> Option<Vec<u8>> {
    let mut err_loc = vec![1u8];
    let mut old_loc = vec![1u8];

    for i in 0..nsym {
        let k = i;
        let mut delta = synd[k];
        for j in 1..err_loc.len() {
            delta ^= GF.mul(err_loc[err_loc.len() - 1 - j], synd[k - j]);
        }
        old_loc.push(0);
        if delta != 0 {
            if old_loc.len() > err_loc.len() {
                let new_loc = GF.poly_scale(&old_loc, delta);
                old_loc = GF.poly_scale(&err_loc, GF.inv(delta));
                err_loc = new_loc;
            }
            err_loc = GF.poly_add(&err_loc, &GF.poly_scale(&old_loc, delta));
        }
    }

    while err_loc.first() == Some(&0) && err_loc.len() > 1 {
        err_loc.remove(0);
    }

    let errs = err_loc.len() - 1;
    if errs > nsym {
        return None;
    }
    Some(err_loc)
}

fn find_errors(err_loc_rev: &[u8], nmess: usize) -> Vec<usize> {
    let mut pos = Vec::new();
    for i in 0..nmess {
        if GF.poly_eval(err_loc_rev, GF.exp_at(i as i32)) == 0 {
            pos.push(nmess - 1 - i);
        }
    }
    pos
}

fn find_error_evaluator(synd_rev: &[u8], err_loc: &[u8], nsym: usize) -> Vec<u8> {
    let product = GF.poly_mul(synd_rev, err_loc);
    let mut divisor = vec![0u8; nsym + 2];
    divisor[0] = 1;
    let (_, remainder) = poly_div(&product, &divisor);
    remainder
}

fn poly_div(dividend: &[u8], divisor: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut msg_out = dividend.to_vec();
    let sep = divisor.len() - 1;
    for i in 0..dividend.len().saturating_sub(sep) {
        let coef = msg_out[i];
        if coef == 0 {
            continue;
        }
        for j in 1..divisor.len() {
            if divisor[j] != 0 {
                msg_out[i + j] ^= GF.mul(divisor[j], coef);
            }
        }
    }
    let split = dividend.len().saturating_sub(sep).min(msg_out.len());
    let quotient = msg_out[..split].to_vec();
    let remainder = msg_out[split..].to_vec();
    (quotient, remainder)
}

fn correct_errata(msg: &[u8], synd: &[u8], err_pos: &[usize]) -> Option<Vec<u8>> {
    let coef_pos: Vec<usize> = err_pos.iter().map(|&p| msg.len() - 1 - p).collect();

    let mut err_loc = vec![1u8];
    for &p in &coef_pos {
        let term = [1u8, GF.exp_at(p as i32)];
        err_loc = GF.poly_mul(&err_loc, &term);
    }

    let mut synd_rev = synd.to_vec();
    synd_rev.reverse();
    let mut err_eval = find_error_evaluator(&synd_rev, &err_loc, err_loc.len() - 1);
    err_eval.reverse();

    let xs: Vec<u8> = coef_pos.iter().map(|&p| GF.exp_at(p as i32)).collect();

    let mut e = vec![0u8; msg.len()];
    for (i, &xi) in xs.iter().enumerate() {
        let xi_inv = GF.inv(xi);
        let mut err_loc_prime = 1u8;
        for (j, &xj) in xs.iter().enumerate() {
            if j != i {
                err_loc_prime = GF.mul(err_loc_prime, 1 ^ GF.mul(xi_inv, xj));
            }
        }
        if err_loc_prime == 0 {
            return None;
        }
        let mut err_eval_rev = err_eval.clone();
        err_eval_rev.reverse();
        let y = GF.poly_eval(&err_eval_rev, xi_inv);
        let y = GF.mul(xi, y);
        e[err_pos[i]] = GF.div(y, err_loc_prime);
    }

    Some(GF.poly_add(msg, &e))
}

/// Decode `msg` (data || parity, total length `data_len + nsym`) in place.
///
/// Returns the corrected data prefix. `corrected` is false only when the
/// codeword has more errors than `nsym` can correct; in that case `data` is
/// the uncorrected prefix, per spec's guard policy.
pub fn decode(msg: &[u8], nsym: usize) -> RsDecode {
    let data_len = msg.len() - nsym;
    let synd = calc_syndromes(msg, nsym);

    if synd.iter().all(|&s| s == 0) {
        return RsDecode {
            data: msg[..data_len].to_vec(),
            corrected: true,
            errors: 0,
        };
    }

    let err_loc = match find_error_locator(&synd, nsym) {
        Some(loc) => loc,
        None => {
            return RsDecode {
                data: msg[..data_len].to_vec(),
                corrected: false,
                errors: 0,
            }
        }
    };

    let num_errs = err_loc.len() - 1;
    if num_errs == 0 || num_errs > nsym {
        return RsDecode {
            data: msg[..data_len].to_vec(),
            corrected: false,
            errors: num_errs,
        };
    }

    let mut err_loc_rev = err_loc.clone();
    err_loc_rev.reverse();
    let err_pos = find_errors(&err_loc_rev, msg.len());
    if err_pos.len() != num_errs {
        return RsDecode {
            data: msg[..data_len].to_vec(),
            corrected: false,
            errors: num_errs,
        };
    }

    let mut synd_full = vec![0u8];
    synd_full.extend_from_slice(&synd);

    let corrected_msg = match correct_errata(msg, &synd_full, &err_pos) {
        Some(m) => m,
        None => {
            return RsDecode {
                data: msg[..data_len].to_vec(),
                corrected: false,
                errors: num_errs,
            }
        }
    };

    let verify = calc_syndromes(&corrected_msg, nsym);
    if !verify.iter().all(|&s| s == 0) {
        return RsDecode {
            data: msg[..data_len].to_vec(),
            corrected: false,
            errors: num_errs,
        };
    }

    RsDecode {
        data: corrected_msg[..data_len].to_vec(),
        corrected: true,
        errors: num_errs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip_no_errors() {
        let data: Vec<u8> = (0..16u8).collect();
        let codeword = encode(&data, 32);
        assert_eq!(codeword.len(), 48);
        let decoded = decode(&codeword, 32);
        assert!(decoded.corrected);
        assert_eq!(decoded.errors, 0);
        assert_eq!(decoded.data, data);
    }

    #[test]
    fn decode_corrects_introduced_errors() {
        let data: Vec<u8> = (0..16u8).map(|i| i.wrapping_mul(17)).collect();
        let mut codeword = encode(&data, 32);
        codeword[0] ^= 0xff;
        codeword[5] ^= 0x11;
        codeword[10] ^= 0x03;
        let decoded = decode(&codeword, 32);
        assert!(decoded.corrected);
        assert_eq!(decoded.errors, 3);
        assert_eq!(decoded.data, data);
    }

    #[test]
    fn decode_corrects_up_to_sixteen_errors() {
        let data: Vec<u8> = (0..16u8).map(|i| i.wrapping_mul(31).wrapping_add(7)).collect();
        let mut codeword = encode(&data, 32);
        for i in 0..16 {
            codeword[i] ^= 0xaa;
        }
        let decoded = decode(&codeword, 32);
        assert!(decoded.corrected);
        assert_eq!(decoded.errors, 16);
        assert_eq!(decoded.data, data);
    }

    #[test]
    fn decode_reports_uncorrectable_past_capacity() {
        let data: Vec<u8> = (0..16u8).collect();
        let mut codeword = encode(&data, 32);
        for i in 0..20 {
            codeword[i] ^= 0xff;
        }
        let decoded = decode(&codeword, 32);
        assert!(!decoded.corrected);
    }

    proptest::proptest! {
        #[test]
        fn decode_recovers_any_data_under_half_capacity_errors(
            data in proptest::collection::vec(0u8..=255u8, 16),
            error_positions in proptest::collection::hash_set(0usize..48, 0..=16),
        ) {
            let codeword = encode(&data, 32);
            let mut corrupted = codeword.clone();
            for &pos in &error_positions {
                corrupted[pos] ^= 0xa5;
            }
            let decoded = decode(&corrupted, 32);
            proptest::prop_assert!(decoded.corrected);
            proptest::prop_assert_eq!(decoded.errors, error_positions.len());
            proptest::prop_assert_eq!(decoded.data, data);
        }
    }
}
