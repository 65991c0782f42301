//! Scheme parameters and harness configuration.

use alloc::vec::Vec;

use crate::error::ConfigError;
use crate::term::NoiseTermSpec;

/// Polynomial degree.
pub const N: usize = 256;

/// Seed length in bytes.
pub const SYMBYTES: usize = 32;

/// Distribution widths the bundled sampler understands.
pub const SUPPORTED_WIDTHS: [u8; 2] = [2, 3];

/// Largest noise buffer any supported width needs (η = 3).
pub const MAX_NOISE_BYTES: usize = 3 * N / 4;

/// Default number of coefficients per report row.
pub const DEFAULT_ROW_WIDTH: usize = 16;

/// Kyber parameter sets; only the noise widths matter here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KyberVariant {
    #[default]
    Kyber512,
    Kyber768,
    Kyber1024,
}

impl KyberVariant {
    pub fn eta1(self) -> u8 {
        match self {
            KyberVariant::Kyber512 => 3,
            KyberVariant::Kyber768 | KyberVariant::Kyber1024 => 2,
        }
    }

    pub fn eta2(self) -> u8 {
        2
    }

    pub fn name(self) -> &'static str {
        match self {
            KyberVariant::Kyber512 => "kyber512",
            KyberVariant::Kyber768 => "kyber768",
            KyberVariant::Kyber1024 => "kyber1024",
        }
    }
}

/// How distribution widths are assigned to the five reference terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TermLayout {
    /// `s` and `e` at η1, `r`, `e1` and `e2` at η2.
    #[default]
    Split,
    /// Every term at η1.
    Uniform,
}

/// Term names of the reference layout, in nonce order.
pub const TERM_NAMES: [&str; 5] = ["s", "e", "r", "e1", "e2"];

/// The five reference noise terms for a variant and layout.
pub fn noise_terms(variant: KyberVariant, layout: TermLayout) -> Vec<NoiseTermSpec> {
    TERM_NAMES
        .iter()
        .enumerate()
        .map(|(nonce, &name)| {
            let width = match layout {
                TermLayout::Split if nonce >= 2 => variant.eta2(),
                _ => variant.eta1(),
            };
            NoiseTermSpec::new(name, nonce as u8, width)
        })
        .collect()
}

/// Everything a harness run needs besides its hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    pub variant: KyberVariant,
    pub layout: TermLayout,
    /// Coefficients per report row.
    pub row_width: usize,
    /// Check |c| <= η after each trigger window closes.
    pub check_coefficients: bool,
}

impl HarnessConfig {
    pub fn terms(&self) -> Vec<NoiseTermSpec> {
        noise_terms(self.variant, self.layout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_width == 0 {
            return Err(ConfigError::RowWidth);
        }
        Ok(())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            variant: KyberVariant::default(),
            layout: TermLayout::default(),
            row_width: DEFAULT_ROW_WIDTH,
            check_coefficients: true,
        }
    }
}
