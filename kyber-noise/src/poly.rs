use core::ops::Index;

use crate::error::SampleError;
use crate::params::N;

/// A noise polynomial: `N` small signed coefficients.
#[derive(Clone, PartialEq, Eq)]
pub struct NoisePolynomial {
    coeffs: [i16; N],
}

impl NoisePolynomial {
    pub fn from_coeffs(coeffs: [i16; N]) -> Self {
        Self { coeffs }
    }

    pub fn coeffs(&self) -> &[i16; N] {
        &self.coeffs
    }

    pub fn len(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check every coefficient lies in `[-width, width]`.
    pub fn check_range(&self, width: u8) -> Result<(), SampleError> {
        let bound = width as i16;
        match self
            .coeffs
            .iter()
            .enumerate()
            .find(|(_, c)| !(-bound..=bound).contains(*c))
        {
            Some((index, &value)) => Err(SampleError::OutOfRange {
                index,
                value,
                width,
            }),
            None => Ok(()),
        }
    }
}

impl Index<usize> for NoisePolynomial {
    type Output = i16;

    fn index(&self, index: usize) -> &i16 {
        &self.coeffs[index]
    }
}

impl core::fmt::Debug for NoisePolynomial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.coeffs.iter()).finish()
    }
}
