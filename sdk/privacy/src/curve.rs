//! BN254 point encodings
//!
//! Coordinates travel as 32-byte big-endian words. The point at infinity is
//! encoded as all-zero coordinates, which is never a point on the curve.
//!
//! ```text
//! G1: [x, y]
//! G2: [x.c0, x.c1, y.c0, y.c1]
//! ```

use ark_bn254::{Fq, Fq2, G1Affine, G2Affine};
use ark_ff::{BigInteger, PrimeField, Zero};

use crate::error::{PrivacyError, Result};

pub type Word = [u8; 32];

pub fn fq_to_bytes(value: &Fq) -> Word {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Strict decoding: values at or above the modulus are rejected
pub fn fq_from_bytes(bytes: &Word) -> Result<Fq> {
    let value = Fq::from_be_bytes_mod_order(bytes);
    if fq_to_bytes(&value) != *bytes {
        return Err(PrivacyError::InvalidPoint(
            "coordinate not reduced modulo the base field".into(),
        ));
    }
    Ok(value)
}

pub fn g1_to_words(point: &G1Affine) -> [Word; 2] {
    if point.infinity {
        return [[0u8; 32]; 2];
    }
    [fq_to_bytes(&point.x), fq_to_bytes(&point.y)]
}

pub fn g1_from_words(words: &[Word; 2]) -> Result<G1Affine> {
    let x = fq_from_bytes(&words[0])?;
    let y = fq_from_bytes(&words[1])?;
    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(PrivacyError::InvalidPoint("G1 point not on curve".into()));
    }
    Ok(point)
}

pub fn g2_to_words(point: &G2Affine) -> [Word; 4] {
    if point.infinity {
        return [[0u8; 32]; 4];
    }
    [
        fq_to_bytes(&point.x.c0),
        fq_to_bytes(&point.x.c1),
        fq_to_bytes(&point.y.c0),
        fq_to_bytes(&point.y.c1),
    ]
}

pub fn g2_from_words(words: &[Word; 4]) -> Result<G2Affine> {
    let x = Fq2::new(fq_from_bytes(&words[0])?, fq_from_bytes(&words[1])?);
    let y = Fq2::new(fq_from_bytes(&words[2])?, fq_from_bytes(&words[3])?);
    if x.is_zero() && y.is_zero() {
        return Ok(G2Affine::identity());
    }
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrivacyError::InvalidPoint("G2 point not in subgroup".into()));
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{Fr, G1Projective, G2Projective};
    use ark_ec::{AffineRepr, CurveGroup};

    #[test]
    fn test_g1_round_trip() {
        let p = (G1Projective::from(G1Affine::generator()) * Fr::from(12345u64)).into_affine();
        assert_eq!(g1_from_words(&g1_to_words(&p)).unwrap(), p);
        assert_eq!(
            g1_from_words(&g1_to_words(&G1Affine::identity())).unwrap(),
            G1Affine::identity()
        );
    }

    #[test]
    fn test_g2_round_trip() {
        let p = (G2Projective::from(G2Affine::generator()) * Fr::from(777u64)).into_affine();
        assert_eq!(g2_from_words(&g2_to_words(&p)).unwrap(), p);
    }

    #[test]
    fn test_off_curve_rejected() {
        let mut words = g1_to_words(&G1Affine::generator());
        words[1][31] ^= 1;
        assert!(g1_from_words(&words).is_err());
    }

    #[test]
    fn test_unreduced_coordinate_rejected() {
        assert!(fq_from_bytes(&[0xFFu8; 32]).is_err());
    }
}
