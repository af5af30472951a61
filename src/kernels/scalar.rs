//! Portable scalar reference kernels.
//!
//! These are always registered under [`crate::types::SimdLevel::Scalar`]
//! and are what the vector-space factory resolves as the verification
//! kernel: every accelerated kernel is checked against these for
//! random-vector agreement, so correctness here matters more than speed.

use half::f16;

use super::clamp;

#[inline]
fn iter_u8(bytes: &[u8]) -> impl Iterator<Item = f32> + '_ {
    bytes.iter().map(|&b| f32::from(b))
}

#[inline]
fn iter_f16(bytes: &[u8]) -> impl Iterator<Item = f32> + '_ {
    bytes
        .chunks_exact(2)
        .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
}

#[inline]
fn iter_f32(bytes: &[u8]) -> impl Iterator<Item = f32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

macro_rules! numeric_kernels {
    ($suffix:ident, $iter:path) => {
        mod $suffix {
            use super::*;

            pub fn l1(a: &[u8], b: &[u8]) -> f32 {
                $iter(a).zip($iter(b)).map(|(x, y)| (x - y).abs()).sum()
            }

            pub fn l2(a: &[u8], b: &[u8]) -> f32 {
                $iter(a)
                    .zip($iter(b))
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f32>()
                    .sqrt()
            }

            pub fn ip(a: &[u8], b: &[u8]) -> f32 {
                $iter(a).zip($iter(b)).map(|(x, y)| x * y).sum()
            }

            pub fn norm(a: &[u8]) -> f32 {
                $iter(a).map(|x| x * x).sum::<f32>().sqrt()
            }

            pub fn cosine(a: &[u8], b: &[u8]) -> f32 {
                let dot: f32 = $iter(a).zip($iter(b)).map(|(x, y)| x * y).sum();
                let na = norm(a);
                let nb = norm(b);
                if na == 0.0 || nb == 0.0 {
                    return 0.0;
                }
                dot / (na * nb)
            }

            pub fn angle(a: &[u8], b: &[u8]) -> f32 {
                clamp(cosine(a, b), -1.0, 1.0).acos()
            }

            pub fn normalized_l2(a: &[u8], b: &[u8]) -> f32 {
                l2(a, b)
            }

            pub fn normalized_cosine(a: &[u8], b: &[u8]) -> f32 {
                // Inputs are already unit length: cosine collapses to dot.
                let dot: f32 = $iter(a).zip($iter(b)).map(|(x, y)| x * y).sum();
                if norm(a) == 0.0 || norm(b) == 0.0 {
                    return 0.0;
                }
                dot
            }

            pub fn normalized_angle(a: &[u8], b: &[u8]) -> f32 {
                clamp(normalized_cosine(a, b), -1.0, 1.0).acos()
            }
        }
    };
}

numeric_kernels!(u8_impl, iter_u8);
numeric_kernels!(f16_impl, iter_f16);
numeric_kernels!(f32_impl, iter_f32);

pub use f16_impl::{
    angle as angle_f16, cosine as cosine_f16, ip as ip_f16, l1 as l1_f16, l2 as l2_f16,
    norm as norm_f16, normalized_angle as normalized_angle_f16,
    normalized_cosine as normalized_cosine_f16, normalized_l2 as normalized_l2_f16,
};
pub use f32_impl::{
    angle as angle_f32, cosine as cosine_f32, ip as ip_f32, l1 as l1_f32, l2 as l2_f32,
    norm as norm_f32, normalized_angle as normalized_angle_f32,
    normalized_cosine as normalized_cosine_f32, normalized_l2 as normalized_l2_f32,
};
pub use u8_impl::{ip as ip_u8, l1 as l1_u8, l2 as l2_u8, norm as norm_u8};

/// Normalizes a `f32` byte span to unit L2 norm in place.
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

/// Normalizes a `f16` byte span to unit L2 norm in place.
pub fn normalize_f16(buf: &mut [u8]) {
    let n = norm_f16(buf);
    if n == 0.0 {
        return;
    }
    for chunk in buf.chunks_exact_mut(2) {
        let v = f16::from_le_bytes([chunk[0], chunk[1]]).to_f32();
        chunk.copy_from_slice(&f16::from_f32(v / n).to_le_bytes());
    }
}

/// Hamming distance over a bit-packed `u8` byte span: population count of
/// the bitwise XOR.
pub fn hamming_u8(a: &[u8], b: &[u8]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x ^ y).count_ones())
        .sum::<u32>() as f32
}

/// Jaccard similarity over a bit-packed `u8` byte span: population count of
/// the bitwise AND over the bitwise OR, 0 when the union is empty.
pub fn jaccard_u8(a: &[u8], b: &[u8]) -> f32 {
    let mut intersection: u32 = 0;
    let mut union: u32 = 0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        intersection += (x & y).count_ones();
        union += (x | y).count_ones();
    }
    if union == 0 {
        return 0.0;
    }
    intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|x| x.to_le_bytes()).collect()
    }

    #[test]
    fn l2_matches_known_distance() {
        let a = f32_bytes(&[0.0, 0.0, 0.0]);
        let b = f32_bytes(&[3.0, 4.0, 0.0]);
        assert!((l2_f32(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_identical_vectors_is_one() {
        let a = f32_bytes(&[1.0, 2.0, 3.0]);
        assert!((cosine_f32(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_norm_is_zero() {
        let a = f32_bytes(&[0.0, 0.0, 0.0]);
        let b = f32_bytes(&[1.0, 2.0, 3.0]);
        assert_eq!(cosine_f32(&a, &b), 0.0);
    }

    #[test]
    fn angle_is_bounded() {
        let a = f32_bytes(&[1.0, 0.0]);
        let b = f32_bytes(&[-1.0, 0.0]);
        let angle = angle_f32(&a, &b);
        assert!((angle - std::f32::consts::PI).abs() < 1e-4);
    }

    #[test]
    fn jaccard_empty_union_is_zero() {
        let a = [0u8, 0u8];
        let b = [0u8, 0u8];
        assert_eq!(jaccard_u8(&a, &b), 0.0);
    }

    #[test]
    fn jaccard_identical_is_one() {
        let a = [0b1010_1010u8];
        assert_eq!(jaccard_u8(&a, &a), 1.0);
    }

    #[test]
    fn hamming_counts_differing_bits() {
        let a = [0b0000_0000u8];
        let b = [0b0000_1111u8];
        assert_eq!(hamming_u8(&a, &b), 4.0);
    }

    #[test]
    fn normalize_f32_produces_unit_norm() {
        let mut buf = f32_bytes(&[3.0, 4.0]);
        normalize_f32(&mut buf);
        assert!((norm_f32(&buf) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn normalize_f32_zero_vector_is_noop() {
        let mut buf = f32_bytes(&[0.0, 0.0]);
        normalize_f32(&mut buf);
        assert_eq!(norm_f32(&buf), 0.0);
    }
}
