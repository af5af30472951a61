//! Accelerated `f32` kernels, lane-vectorized with the portable `wide`
//! crate.
//!
//! `wide::f32x8` compiles to whatever 8-wide instruction the target
//! actually supports (AVX2 on x86-64, NEON-doubled on aarch64, scalar
//! fallback elsewhere), so a single implementation here backs the
//! registry's `Avx2` cell. The scalar kernels in [`super::scalar`] remain
//! the reference implementation these are checked against for agreement.

use wide::f32x8;

use super::clamp;

const LANES: usize = 8;

#[inline]
fn read_f32(bytes: &[u8]) -> impl Iterator<Item = f32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

/// Sums `a[i] op b[i]` (or a unary reduction of `a[i]`) eight lanes at a
/// time, folding any remainder with the scalar loop.
fn fold_pairs(a: &[u8], b: &[u8], lane_op: impl Fn(f32x8, f32x8) -> f32x8) -> f32 {
    let elems_a: Vec<f32> = read_f32(a).collect();
    let elems_b: Vec<f32> = read_f32(b).collect();
    let n = elems_a.len().min(elems_b.len());
    let mut acc = f32x8::splat(0.0);
    let mut i = 0;
    while i + LANES <= n {
        let va = f32x8::from(<[f32; LANES]>::try_from(&elems_a[i..i + LANES]).unwrap());
        let vb = f32x8::from(<[f32; LANES]>::try_from(&elems_b[i..i + LANES]).unwrap());
        acc += lane_op(va, vb);
        i += LANES;
    }
    let mut total: f32 = acc.reduce_add();
    while i < n {
        let va = f32x8::from([elems_a[i], 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let vb = f32x8::from([elems_b[i], 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        total += lane_op(va, vb).reduce_add();
        i += 1;
    }
    total
}

/// Euclidean distance over `f32` byte spans.
pub fn l2_f32(a: &[u8], b: &[u8]) -> f32 {
    fold_pairs(a, b, |x, y| (x - y) * (x - y)).sqrt()
}

/// Manhattan distance over `f32` byte spans.
pub fn l1_f32(a: &[u8], b: &[u8]) -> f32 {
    fold_pairs(a, b, |x, y| (x - y).abs())
}

/// Inner product over `f32` byte spans.
pub fn ip_f32(a: &[u8], b: &[u8]) -> f32 {
    fold_pairs(a, b, |x, y| x * y)
}

/// L2 norm over an `f32` byte span.
pub fn norm_f32(a: &[u8]) -> f32 {
    fold_pairs(a, a, |x, _| x * x).sqrt()
}

/// Cosine similarity over `f32` byte spans, 0 when either norm is 0.
pub fn cosine_f32(a: &[u8], b: &[u8]) -> f32 {
    let dot = ip_f32(a, b);
    let na = norm_f32(a);
    let nb = norm_f32(b);
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// Angular distance over `f32` byte spans.
pub fn angle_f32(a: &[u8], b: &[u8]) -> f32 {
    clamp(cosine_f32(a, b), -1.0, 1.0).acos()
}

/// Euclidean distance assuming both inputs are already unit-length.
pub fn normalized_l2_f32(a: &[u8], b: &[u8]) -> f32 {
    l2_f32(a, b)
}

/// Cosine similarity assuming both inputs are already unit-length: the
/// norm divisions collapse away, leaving a plain dot product.
pub fn normalized_cosine_f32(a: &[u8], b: &[u8]) -> f32 {
    let na = norm_f32(a);
    let nb = norm_f32(b);
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    ip_f32(a, b)
}

/// Angular distance assuming both inputs are already unit-length.
pub fn normalized_angle_f32(a: &[u8], b: &[u8]) -> f32 {
    clamp(normalized_cosine_f32(a, b), -1.0, 1.0).acos()
}

/// Normalizes an `f32` byte span to unit L2 norm in place.
pub fn normalize_f32(buf: &mut [u8]) {
    let n = norm_f32(buf);
    if n == 0.0 {
        return;
    }
    for chunk in buf.chunks_exact_mut(4) {
        let v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(v / n).to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    use super::*;
    use crate::kernels::scalar;

    fn f32_bytes(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|x| x.to_le_bytes()).collect()
    }

    fn random_vec(dim: usize, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn l2_matches_scalar_reference_on_random_vectors() {
        for seed in 0..16u64 {
            let a = f32_bytes(&random_vec(37, seed));
            let b = f32_bytes(&random_vec(37, seed + 100));
            let fast = l2_f32(&a, &b);
            let reference = scalar::l2_f32(&a, &b);
            let denom = reference.abs().max(1.0);
            assert!((fast - reference).abs() / denom < 1e-4, "seed {seed}");
        }
    }

    #[test]
    fn cosine_matches_scalar_reference_on_random_vectors() {
        for seed in 0..16u64 {
            let a = f32_bytes(&random_vec(64, seed));
            let b = f32_bytes(&random_vec(64, seed + 200));
            let fast = cosine_f32(&a, &b);
            let reference = scalar::cosine_f32(&a, &b);
            let denom = reference.abs().max(1.0);
            assert!((fast - reference).abs() / denom < 1e-4, "seed {seed}");
        }
    }

    #[test]
    fn handles_non_multiple_of_eight_dimensions() {
        let a = f32_bytes(&[1.0, 2.0, 3.0]);
        let b = f32_bytes(&[4.0, 5.0, 6.0]);
        assert!((ip_f32(&a, &b) - 32.0).abs() < 1e-4);
    }
}
