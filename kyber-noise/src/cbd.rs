//! Centered binomial sampling.
//!
//! Each coefficient is `a - b` where `a` and `b` are sums of η uniform bits
//! taken from the input buffer, so an η-wide sampler consumes `2η` bits per
//! coefficient and `η * N / 4` bytes per polynomial.

use crate::error::SampleError;
use crate::params::{N, SUPPORTED_WIDTHS};
use crate::poly::NoisePolynomial;

/// Maps a pseudorandom buffer to a CBD(η) polynomial.
pub trait Sampler {
    /// Whether `width` can be sampled. Checked before any trigger window.
    fn supports(&self, width: u8) -> bool;

    /// Bytes of input consumed for `width`; the pipeline hands over exactly
    /// `width * N / 4` and rejects samplers that disagree.
    fn input_len(&self, width: u8) -> usize {
        width as usize * N / 4
    }

    fn sample(&self, buf: &[u8], width: u8) -> Result<NoisePolynomial, SampleError>;
}

/// Bit-sliced CBD for η = 2 and η = 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct CbdSampler;

impl Sampler for CbdSampler {
    fn supports(&self, width: u8) -> bool {
        SUPPORTED_WIDTHS.contains(&width)
    }

    fn sample(&self, buf: &[u8], width: u8) -> Result<NoisePolynomial, SampleError> {
        let mut coeffs = [0i16; N];
        match width {
            2 => cbd2(&mut coeffs, expect_len(buf, 2)?),
            3 => cbd3(&mut coeffs, expect_len(buf, 3)?),
            other => return Err(SampleError::Width(other)),
        }
        Ok(NoisePolynomial::from_coeffs(coeffs))
    }
}

impl<S: Sampler + ?Sized> Sampler for &S {
    fn supports(&self, width: u8) -> bool {
        (**self).supports(width)
    }

    fn input_len(&self, width: u8) -> usize {
        (**self).input_len(width)
    }

    fn sample(&self, buf: &[u8], width: u8) -> Result<NoisePolynomial, SampleError> {
        (**self).sample(buf, width)
    }
}

fn expect_len(buf: &[u8], width: usize) -> Result<&[u8], SampleError> {
    let expected = width * N / 4;
    if buf.len() != expected {
        return Err(SampleError::Length {
            expected,
            actual: buf.len(),
        });
    }
    Ok(buf)
}

/// 128 bytes -> 256 coefficients in [-2, 2].
fn cbd2(r: &mut [i16; N], buf: &[u8]) {
    for (i, chunk) in buf.chunks_exact(4).enumerate() {
        let t = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let d = (t & 0x5555_5555) + ((t >> 1) & 0x5555_5555);
        for j in 0..8 {
            let a = ((d >> (4 * j)) & 3) as i16;
            let b = ((d >> (4 * j + 2)) & 3) as i16;
            r[8 * i + j] = a - b;
        }
    }
}

/// 192 bytes -> 256 coefficients in [-3, 3].
fn cbd3(r: &mut [i16; N], buf: &[u8]) {
    for (i, chunk) in buf.chunks_exact(3).enumerate() {
        let t = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], 0]);
        let d = (t & 0x0024_9249) + ((t >> 1) & 0x0024_9249) + ((t >> 2) & 0x0024_9249);
        for j in 0..4 {
            let a = ((d >> (6 * j)) & 7) as i16;
            let b = ((d >> (6 * j + 3)) & 7) as i16;
            r[4 * i + j] = a - b;
        }
    }
}
