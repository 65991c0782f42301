//! Seeds and the entropy sources they are drawn from.

use core::fmt;

use rand_core::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ConfigError, HarnessError};
use crate::params::SYMBYTES;

/// Secret input every noise term of a run is derived from.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SYMBYTES]);

impl Seed {
    pub const fn from_bytes(bytes: [u8; SYMBYTES]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let array: [u8; SYMBYTES] = bytes.try_into().map_err(|_| ConfigError::SeedLength {
            expected: SYMBYTES,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Parse a seed from hex, upper or lower case.
    pub fn from_hex(text: &str) -> Result<Self, ConfigError> {
        let mut bytes = [0u8; SYMBYTES];
        let text = text.trim();
        if text.len() != 2 * SYMBYTES {
            return Err(ConfigError::SeedLength {
                expected: SYMBYTES,
                actual: text.len() / 2,
            });
        }
        hex::decode_to_slice(text, &mut bytes).map_err(|_| ConfigError::SeedHex)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SYMBYTES] {
        &self.0
    }

    /// Draw a fresh seed from `source`.
    pub fn acquire<E: EntropySource + ?Sized>(source: &mut E) -> Result<Self, HarnessError> {
        let mut bytes = [0u8; SYMBYTES];
        source.fill(&mut bytes)?;
        let seed = Self(bytes);
        bytes.zeroize();
        Ok(seed)
    }
}

/// Uppercase hex, two characters per byte.
impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Supplier of unpredictable bytes.
pub trait EntropySource {
    /// Fill `buf` completely or fail with [`HarnessError::EntropyUnavailable`].
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), HarnessError>;
}

/// Adapts any `rand_core` generator, hardware RNG drivers included.
pub struct RngEntropy<R> {
    rng: R,
}

impl<R: RngCore> RngEntropy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: RngCore> EntropySource for RngEntropy<R> {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), HarnessError> {
        self.rng.try_fill_bytes(buf).map_err(|err| {
            log::error!("entropy source failed: {}", err);
            HarnessError::EntropyUnavailable
        })
    }
}

/// Hands out the same seed on every draw; for replaying a captured run.
pub struct FixedEntropy(Seed);

impl FixedEntropy {
    pub fn new(seed: Seed) -> Self {
        Self(seed)
    }
}

impl EntropySource for FixedEntropy {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), HarnessError> {
        let seed = self.0.as_bytes();
        if buf.len() != seed.len() {
            return Err(ConfigError::SeedLength {
                expected: seed.len(),
                actual: buf.len(),
            }
            .into());
        }
        buf.copy_from_slice(seed);
        Ok(())
    }
}
