use bitvec::prelude::*;

/// Inclusive bit-range access on an instruction word.
///
/// Bit numbers are architectural (bit 0 is the least significant bit), so
/// none of this depends on the byte order the word was read in.
pub trait Bits: Copy {
    /// Bits `hi..=lo`, shifted down to bit 0.
    fn bits(self, hi: u32, lo: u32) -> u32;
    /// A single bit as 0 or 1.
    fn bit(self, n: u32) -> u32;
    /// Replicate bit `n` into every bit above it.
    fn sign_extend_from(self, n: u32) -> u32;
}

impl Bits for u32 {
    #[inline]
    fn bits(self, hi: u32, lo: u32) -> u32 {
        debug_assert!(hi >= lo && hi < 32, "bad bit range {hi}:{lo}");
        self.view_bits::<Lsb0>()[lo as usize..=hi as usize].load_le::<u32>()
    }

    #[inline]
    fn bit(self, n: u32) -> u32 {
        debug_assert!(n < 32);
        self.view_bits::<Lsb0>()[n as usize] as u32
    }

    #[inline]
    fn sign_extend_from(self, n: u32) -> u32 {
        debug_assert!(n < 32);
        // A signed load sign-extends from the top of the loaded region.
        self.view_bits::<Lsb0>()[..=n as usize].load_le::<i32>() as u32
    }
}
