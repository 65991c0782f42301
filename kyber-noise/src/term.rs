//! Noise term descriptors and their up-front validation.

use crate::error::ConfigError;
use crate::params::N;

/// One named, nonce-indexed noise polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseTermSpec {
    pub name: &'static str,
    /// Domain-separation index fed to the expander.
    pub nonce: u8,
    /// CBD parameter η.
    pub distribution_width: u8,
}

impl NoiseTermSpec {
    pub const fn new(name: &'static str, nonce: u8, distribution_width: u8) -> Self {
        Self {
            name,
            nonce,
            distribution_width,
        }
    }

    /// Bytes of pseudorandom input this term consumes: `η * N / 4`.
    pub const fn buffer_len(&self) -> usize {
        self.distribution_width as usize * N / 4
    }
}

/// Check that `len` is the buffer size a term of width `width` needs.
pub fn check_buffer_len(term: &'static str, width: u8, len: usize) -> Result<(), ConfigError> {
    let expected = width as usize * N / 4;
    if len != expected {
        return Err(ConfigError::BufferSize {
            term,
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Validate an ordered term list.
///
/// Rejects empty lists, empty names, zero widths and repeated nonces. Which
/// widths are usable depends on the sampler and the scratch space, so the
/// pipeline checks those itself.
pub fn validate_terms(terms: &[NoiseTermSpec]) -> Result<(), ConfigError> {
    if terms.is_empty() {
        return Err(ConfigError::NoTerms);
    }
    for (index, term) in terms.iter().enumerate() {
        if term.name.is_empty() {
            return Err(ConfigError::EmptyTermName { index });
        }
        if term.distribution_width == 0 {
            return Err(ConfigError::UnsupportedWidth {
                term: term.name,
                width: 0,
            });
        }
        if let Some(first) = terms[..index].iter().find(|t| t.nonce == term.nonce) {
            return Err(ConfigError::DuplicateNonce {
                term: term.name,
                first: first.name,
                nonce: term.nonce,
            });
        }
    }
    Ok(())
}
