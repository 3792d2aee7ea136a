//! Mock transport implementations used in testing the interface

use super::{
    Error,
    Transport,
    TransportResult,
};
use std::collections::{
    HashMap,
    HashSet,
};

/// A bus that mocks reads and writes, useful for testing.
/// Unwritten addresses read as zero, every write is logged in order.
#[derive(Debug, Default)]
pub struct Mock {
    memory: HashMap<u32, u32>,
    writes: Vec<(u32, u32)>,
    faults: HashSet<u32>,
}

impl Mock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `bytes` in memory at `addr` as big-endian words, zero padding the last one
    pub fn load(&mut self, addr: u32, bytes: &[u8]) {
        for (i, chunk) in (0u32..).zip(bytes.chunks(4)) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.memory
                .insert(addr.wrapping_add(4 * i), u32::from_be_bytes(word));
        }
    }

    /// Set the word at `addr` without logging a write
    pub fn set(&mut self, addr: u32, value: u32) {
        self.memory.insert(addr, value);
    }

    /// Make every access to `addr` fail with a bus error
    pub fn fault(&mut self, addr: u32) {
        self.faults.insert(addr);
    }

    /// The current word at `addr`
    #[must_use]
    pub fn peek(&self, addr: u32) -> u32 {
        self.memory.get(&addr).copied().unwrap_or(0)
    }

    /// Every `(addr, value)` written so far, in order
    #[must_use]
    pub fn writes(&self) -> &[(u32, u32)] {
        &self.writes
    }
}

impl Transport for Mock {
    fn read32(&mut self, addr: u32) -> TransportResult<u32> {
        if self.faults.contains(&addr) {
            return Err(Error::Bus { addr });
        }
        Ok(self.peek(addr))
    }

    fn write32(&mut self, addr: u32, value: u32) -> TransportResult<()> {
        if self.faults.contains(&addr) {
            return Err(Error::Bus { addr });
        }
        self.memory.insert(addr, value);
        self.writes.push((addr, value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Completion;
    use paste::paste;

    macro_rules! test_rw_num {
        ($num:ty, $v:literal) => {
            paste! {
                #[test]
                #[allow(clippy::float_cmp)]
                fn [<test_rw_$num>]() {
                    let mut transport = Mock::new();
                    let num: $num = $v;
                    transport.write(0x40, &num).unwrap();
                    let read_num: $num = transport.read(0x40).unwrap();
                    assert_eq!(read_num, num);
                }
            }
        };
    }

    test_rw_num!(u32, 0xDEAD_BEEF);
    test_rw_num!(i32, -0x0DEA_DBEE);
    test_rw_num!(f32, 1.618);

    #[test]
    fn test_unwritten_reads_zero() {
        let mut transport = Mock::new();
        assert_eq!(transport.read32(0x1234).unwrap(), 0);
    }

    #[test]
    fn test_load() {
        let mut transport = Mock::new();
        transport.load(0x100, b"SDB-\x01\x02");
        assert_eq!(transport.read32(0x100).unwrap(), 0x5344_422D);
        assert_eq!(transport.read32(0x104).unwrap(), 0x0102_0000);
        assert!(transport.writes().is_empty());
    }

    #[test]
    fn test_fault() {
        let mut transport = Mock::new();
        transport.fault(0x8);
        assert!(matches!(
            transport.read32(0x8),
            Err(Error::Bus { addr: 0x8 })
        ));
        assert!(transport.write32(0x8, 1).is_err());
    }

    #[test]
    fn test_block_write_fifo() {
        let mut transport = Mock::new();
        transport
            .block_write(0x8, &[1, 2, 3], 0, Completion::Acknowledged)
            .unwrap();
        assert_eq!(transport.writes(), &[(0x8, 1), (0x8, 2), (0x8, 3)]);
        assert_eq!(transport.peek(0x8), 3);
    }

    #[test]
    fn test_block_write_linear() {
        let mut transport = Mock::new();
        transport
            .block_write(0x100, &[1, 2, 3], 4, Completion::Acknowledged)
            .unwrap();
        assert_eq!(transport.writes(), &[(0x100, 1), (0x104, 2), (0x108, 3)]);
    }

    #[test]
    fn test_block_write_completion() {
        let mut transport = Mock::new();
        transport.fault(0x104);
        assert!(transport
            .block_write(0x100, &[1, 2, 3], 4, Completion::Acknowledged)
            .is_err());
        let mut transport = Mock::new();
        transport.fault(0x104);
        transport
            .block_write(0x100, &[1, 2, 3], 4, Completion::Silent)
            .unwrap();
        assert_eq!(transport.writes(), &[(0x100, 1), (0x108, 3)]);
    }
}
