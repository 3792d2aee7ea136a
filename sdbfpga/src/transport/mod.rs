//! Defines the register bus that every sdbfpga transport must implement

pub mod filemem;
pub mod mock;

use thiserror::Error;
use tracing::debug;

/// Types that implement this trait can be serialized such that they can be written to a 32-bit
/// bus register
pub trait Serialize {
    type Chunk;
    fn serialize(&self) -> Self::Chunk;
}

/// Types that implement this trait can be deserialized such that they can be read from a 32-bit
/// bus register
pub trait Deserialize: Sized {
    type Chunk;
    /// # Errors
    /// Returns an error if the chunk doesn't represent a valid `Self`
    fn deserialize(chunk: Self::Chunk) -> TransportResult<Self>;
}

/// Registers that live at a fixed byte offset from the base address of their core
pub trait RegisterOffset {
    const OFFSET: u32;
}

macro_rules! ser_num {
    ($num:ty) => {
        impl Serialize for $num {
            type Chunk = [u8; core::mem::size_of::<$num>()];
            fn serialize(&self) -> Self::Chunk {
                self.to_be_bytes()
            }
        }
    };
}

macro_rules! deser_num {
    ($num:ty) => {
        impl Deserialize for $num {
            type Chunk = [u8; core::mem::size_of::<$num>()];
            fn deserialize(chunk: Self::Chunk) -> TransportResult<Self> {
                Ok(<$num>::from_be_bytes(chunk))
            }
        }
    };
}

// The bus only moves whole words
ser_num!(u32);
ser_num!(i32);
ser_num!(f32);

deser_num!(u32);
deser_num!(i32);
deser_num!(f32);

#[derive(Error, Debug)]
pub enum Error {
    #[error("Internal system IO error")]
    Io(#[from] std::io::Error),
    #[error("Bus error while accessing {addr:#010x}")]
    Bus { addr: u32 },
    #[error("Line {line} of the memory file is not an `@0xADDRESS: 0xVALUE` pair")]
    FileFormat { line: usize },
    #[error("Register (un)packing failed")]
    Packing(#[from] packed_struct::PackingError),
}

pub type TransportResult<T> = Result<T, Error>;

/// Whether a block write waits for the device to acknowledge every word
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Every word must be acknowledged, failures are reported
    #[default]
    Acknowledged,
    /// Fire and forget, for writes that may take the device (and its bus) down with them
    Silent,
}

/// The trait that is implemented for register bus transport mechanisms.
/// The methods of this trait *assume* that the bus is already connected.
pub trait Transport {
    /// Read the 32-bit word at byte address `addr`
    /// # Errors
    /// Returns an error if the bus access fails
    fn read32(&mut self, addr: u32) -> TransportResult<u32>;

    /// Write the 32-bit `value` at byte address `addr`
    /// # Errors
    /// Returns an error if the bus access fails
    fn write32(&mut self, addr: u32, value: u32) -> TransportResult<()>;

    /// Write `words` starting at `addr`, stepping the address by `increment` bytes between words.
    /// An increment of 0 streams every word into the same FIFO register, 4 writes linear memory.
    ///
    /// Transports that can batch the transfer should override this. With
    /// [`Completion::Silent`], failed words are logged and skipped rather than reported.
    /// # Errors
    /// Returns an error if an acknowledged write fails
    #[allow(clippy::cast_possible_truncation)]
    fn block_write(
        &mut self,
        addr: u32,
        words: &[u32],
        increment: u32,
        completion: Completion,
    ) -> TransportResult<()> {
        for (i, &word) in words.iter().enumerate() {
            let target = addr.wrapping_add(increment.wrapping_mul(i as u32));
            match (self.write32(target, word), completion) {
                (Ok(()), _) => {}
                (Err(e), Completion::Acknowledged) => return Err(e),
                (Err(e), Completion::Silent) => {
                    debug!(addr = target, error = %e, "Ignoring failed silent write");
                }
            }
        }
        Ok(())
    }

    /// Generically read a `Deserializable` word `T` at `addr`
    /// # Example
    /// ```
    /// # use sdbfpga::transport::{mock::Mock, Transport};
    /// let mut transport = Mock::new();
    /// transport.write32(0x100, 0x4049_0FDB).unwrap();
    /// let pi: f32 = transport.read(0x100).unwrap();
    /// assert!((pi - std::f32::consts::PI).abs() < 1e-6);
    /// ```
    /// # Errors
    /// Returns an error on bus errors or if the word doesn't deserialize
    fn read<T>(&mut self, addr: u32) -> TransportResult<T>
    where
        T: Deserialize<Chunk = [u8; 4]>,
    {
        T::deserialize(self.read32(addr)?.to_be_bytes())
    }

    /// Generically write a `Serializable` word `T` at `addr`
    /// # Example
    /// ```
    /// # use sdbfpga::transport::{mock::Mock, Transport};
    /// let mut transport = Mock::new();
    /// transport.write(0x100, &-2i32).unwrap();
    /// assert_eq!(transport.read32(0x100).unwrap(), 0xFFFF_FFFE);
    /// ```
    /// # Errors
    /// Returns an error on bus errors
    fn write<T>(&mut self, addr: u32, data: &T) -> TransportResult<()>
    where
        T: Serialize<Chunk = [u8; 4]>,
    {
        self.write32(addr, u32::from_be_bytes(data.serialize()))
    }

    /// Read register `R` of the core mapped at `base`
    /// # Errors
    /// Returns an error on bus errors or if the register doesn't unpack
    fn read_reg<R>(&mut self, base: u32) -> TransportResult<R>
    where
        R: Deserialize<Chunk = [u8; 4]> + RegisterOffset,
    {
        self.read(base.wrapping_add(R::OFFSET))
    }

    /// Write register `R` of the core mapped at `base`
    /// # Errors
    /// Returns an error on bus errors
    fn write_reg<R>(&mut self, base: u32, reg: &R) -> TransportResult<()>
    where
        R: Serialize<Chunk = [u8; 4]> + RegisterOffset,
    {
        self.write(base.wrapping_add(R::OFFSET), reg)
    }
}
