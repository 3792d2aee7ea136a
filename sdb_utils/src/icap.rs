//! ICAPE2 configuration-port commands for Xilinx 7-series devices (UG470, "IPROG Using ICAPE2")
//!
//! The ICAP data port takes every byte bit-reversed relative to the order these words appear in
//! the configuration user guide, so words must go through [`bit_swap`] before being written.

/// Dummy pad word
pub const DUMMY: u32 = 0xFFFF_FFFF;
/// Synchronisation word
pub const SYNC: u32 = 0xAA99_5566;
/// Type 1 NOOP
pub const NOOP: u32 = 0x2000_0000;
/// Type 1 write, one word, to the WBSTAR register
pub const WRITE_WBSTAR: u32 = 0x3002_0001;
/// Type 1 write, one word, to the CMD register
pub const WRITE_CMD: u32 = 0x3000_8001;
/// CMD value that triggers IPROG, reloading the bitstream from WBSTAR
pub const IPROG: u32 = 0x0000_000F;

/// Reverse the bit order within each byte of `word`, keeping the byte order
#[must_use]
pub const fn bit_swap(word: u32) -> u32 {
    u32::from_be_bytes([
        word.to_be_bytes()[0].reverse_bits(),
        word.to_be_bytes()[1].reverse_bits(),
        word.to_be_bytes()[2].reverse_bits(),
        word.to_be_bytes()[3].reverse_bits(),
    ])
}

/// The IPROG sequence booting the image stored at `warm_boot` in flash, already bit-swapped
#[must_use]
pub const fn iprog_sequence(warm_boot: u32) -> [u32; 8] {
    [
        bit_swap(DUMMY),
        bit_swap(SYNC),
        bit_swap(NOOP),
        bit_swap(WRITE_WBSTAR),
        bit_swap(warm_boot),
        bit_swap(WRITE_CMD),
        bit_swap(IPROG),
        bit_swap(NOOP),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_swap() {
        assert_eq!(bit_swap(SYNC), 0x5599_AA66);
        assert_eq!(bit_swap(0x0000_0001), 0x0000_0080);
        assert_eq!(bit_swap(DUMMY), DUMMY);
        for word in [0u32, 0x1234_5678, 0xDEAD_BEEF, 0x3002_0001] {
            assert_eq!(bit_swap(bit_swap(word)), word);
        }
    }

    #[test]
    fn test_iprog_sequence() {
        let seq = iprog_sequence(0);
        assert_eq!(seq[0], 0xFFFF_FFFF);
        assert_eq!(seq[1], 0x5599_AA66);
        assert_eq!(seq[2], 0x0400_0000);
        assert_eq!(seq[3], 0x0C40_0080);
        assert_eq!(seq[4], 0);
        assert_eq!(seq[5], 0x0C00_0180);
        assert_eq!(seq[6], 0x0000_00F0);
        assert_eq!(seq[7], 0x0400_0000);
    }
}
