//! Reusable scratch memory for the noise pipeline
//!
//! Holds one pseudorandom buffer sized for the widest supported term so a run
//! never allocates between trigger windows. Every term gets the buffer
//! zero-filled before the expander overwrites it, and the whole workspace is
//! wiped after each run so no noise material outlives its report.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::params::MAX_NOISE_BYTES;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct NoiseWorkspace {
    /// Expander output for the current term
    noise_buffer: [u8; MAX_NOISE_BYTES],
}

impl NoiseWorkspace {
    pub fn new() -> Self {
        Self {
            noise_buffer: [0u8; MAX_NOISE_BYTES],
        }
    }

    /// Largest buffer this workspace can hand out.
    pub const fn capacity(&self) -> usize {
        MAX_NOISE_BYTES
    }

    /// Zeroed slice of exactly `len` bytes, or `None` if it does not fit.
    pub fn noise_buffer(&mut self, len: usize) -> Option<&mut [u8]> {
        let buffer = self.noise_buffer.get_mut(..len)?;
        buffer.fill(0);
        Some(buffer)
    }

    /// Wipe all buffers.
    pub fn clear(&mut self) {
        self.noise_buffer.zeroize();
    }
}

impl Default for NoiseWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_slices() {
        let mut workspace = NoiseWorkspace::new();
        assert_eq!(workspace.noise_buffer(128).map(|b| b.len()), Some(128));
        assert_eq!(workspace.noise_buffer(192).map(|b| b.len()), Some(192));
        assert!(workspace.noise_buffer(193).is_none());
    }

    #[test]
    fn test_buffer_is_overwritten_between_terms() {
        let mut workspace = NoiseWorkspace::new();
        workspace.noise_buffer(192).unwrap().fill(0xAA);
        let reused = workspace.noise_buffer(128).unwrap();
        assert!(reused.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_workspace_clear() {
        let mut workspace = NoiseWorkspace::new();
        workspace.noise_buffer(192).unwrap().fill(0x42);

        workspace.clear();

        assert!(workspace.noise_buffer.iter().all(|&b| b == 0));
    }
}
