//! Domain-separated expansion of a seed into pseudorandom bytes.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use crate::error::ExpandError;
use crate::seed::Seed;

/// Deterministic `(seed, nonce) -> bytes` stream.
///
/// Implementations must be pure: the same seed and nonce always fill `out`
/// with the same bytes, and must not touch the trigger pin.
pub trait Expander {
    fn expand(&self, seed: &Seed, nonce: u8, out: &mut [u8]) -> Result<(), ExpandError>;
}

/// Kyber's PRF: `SHAKE-256(seed || nonce)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Shake256Prf;

impl Expander for Shake256Prf {
    fn expand(&self, seed: &Seed, nonce: u8, out: &mut [u8]) -> Result<(), ExpandError> {
        let mut hasher = Shake256::default();
        hasher.update(seed.as_bytes());
        hasher.update(&[nonce]);
        hasher.finalize_xof().read(out);
        Ok(())
    }
}

impl<E: Expander + ?Sized> Expander for &E {
    fn expand(&self, seed: &Seed, nonce: u8, out: &mut [u8]) -> Result<(), ExpandError> {
        (**self).expand(seed, nonce, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_nonce_same_stream() {
        let seed = Seed::from_bytes([0x42; 32]);
        let mut a = [0u8; 192];
        let mut b = [0u8; 192];
        Shake256Prf.expand(&seed, 3, &mut a).unwrap();
        Shake256Prf.expand(&seed, 3, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nonces_are_separated() {
        let seed = Seed::from_bytes([0u8; 32]);
        let mut a = [0u8; 128];
        let mut b = [0u8; 128];
        Shake256Prf.expand(&seed, 0, &mut a).unwrap();
        Shake256Prf.expand(&seed, 1, &mut b).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_shorter_output_is_prefix() {
        let seed = Seed::from_bytes([9u8; 32]);
        let mut short = [0u8; 128];
        let mut long = [0u8; 192];
        Shake256Prf.expand(&seed, 1, &mut short).unwrap();
        Shake256Prf.expand(&seed, 1, &mut long).unwrap();
        assert_eq!(short[..], long[..128]);
    }
}
