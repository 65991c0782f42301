//! Error types for the noise pipeline.
//!
//! Configuration problems are always detected before a trigger window opens.
//! Expansion and sampling failures are reported against the term that raised
//! them, after the trigger pin has been driven low again.

use thiserror::Error;

/// Invalid harness configuration, detected before any trigger activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("seed must be {expected} bytes, got {actual}")]
    SeedLength { expected: usize, actual: usize },

    #[error("seed is not valid hex")]
    SeedHex,

    #[error("no noise terms given")]
    NoTerms,

    #[error("noise term at position {index} has an empty name")]
    EmptyTermName { index: usize },

    #[error("term {term}: distribution width {width} is not supported")]
    UnsupportedWidth { term: &'static str, width: u8 },

    #[error("term {term}: buffer of {actual} bytes, expected {expected}")]
    BufferSize {
        term: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("term {term}: needs a {needed} byte buffer, scratch space holds {capacity}")]
    BufferTooLarge {
        term: &'static str,
        needed: usize,
        capacity: usize,
    },

    #[error("term {term}: nonce {nonce} already used by term {first}")]
    DuplicateNonce {
        term: &'static str,
        first: &'static str,
        nonce: u8,
    },

    #[error("row width must be at least one coefficient")]
    RowWidth,

    #[error("trigger pin: {0}")]
    Trigger(#[from] TriggerError),
}

/// Misuse of the trigger controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("pin has not been configured")]
    NotConfigured,

    #[error("pin was already configured")]
    AlreadyConfigured,

    #[error("pin is not at its inactive level")]
    NotIdle,
}

/// The expander could not produce the requested stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expander failed on nonce {nonce}")]
pub struct ExpandError {
    pub nonce: u8,
}

/// The sampler could not map a buffer to a polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("width {0} is not supported by the sampler")]
    Width(u8),

    #[error("input buffer of {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },

    #[error("coefficient {value} at index {index} outside [-{width}, {width}]")]
    OutOfRange { index: usize, value: i16, width: u8 },
}

/// Top-level pipeline error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("entropy source unavailable")]
    EntropyUnavailable,

    #[error("term {term}: expansion failure: {source}")]
    Expansion {
        term: &'static str,
        source: ExpandError,
    },

    #[error("term {term}: sampling failure: {source}")]
    Sampling {
        term: &'static str,
        source: SampleError,
    },
}

impl HarnessError {
    /// Name of the term that failed, if the failure belongs to one.
    pub fn term(&self) -> Option<&'static str> {
        match self {
            HarnessError::Expansion { term, .. } | HarnessError::Sampling { term, .. } => {
                Some(term)
            }
            HarnessError::Configuration(ConfigError::UnsupportedWidth { term, .. })
            | HarnessError::Configuration(ConfigError::BufferSize { term, .. })
            | HarnessError::Configuration(ConfigError::BufferTooLarge { term, .. })
            | HarnessError::Configuration(ConfigError::DuplicateNonce { term, .. }) => Some(term),
            _ => None,
        }
    }
}
