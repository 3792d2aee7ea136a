//! Loading new software into the LM32 soft-CPU of a White Rabbit node.
//!
//! The CPU is held through the syscon register while its block RAM is overwritten, then
//! released to boot the new image.
use super::{
    with_transport,
    LockError,
    SdbCore,
};
use crate::{
    sdb::SdbTree,
    transport::{
        self,
        Completion,
        Transport,
    },
};
use indicatif::ProgressBar;
use sdb_utils::{
    firmware::FirmwareImage,
    sdb::vendor,
};
use std::sync::{
    Arc,
    Mutex,
    Weak,
};
use thiserror::Error;
use tracing::{
    debug,
    info,
    warn,
};

/// Device ID of the `WB4-BlockRAM` the CPU runs from
pub const RAM_DEVICE_ID: u32 = 0x66cf_eb52;
/// Device ID of `WR-Periph-Syscon`
pub const SYSCON_DEVICE_ID: u32 = 0xff07_fc47;
/// Where the syscon reset register sits on the standard WR node
pub const DEFAULT_SYSCON: u32 = 0x0003_0400;
/// Syscon value that holds the CPU in reset
pub const HOLD: u32 = 0x1dea_dbee;
/// Syscon value that lets the CPU run
pub const RELEASE: u32 = 0x0dea_dbee;
/// Words per block write
pub const DEFAULT_PACKET_WORDS: usize = 256;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] transport::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("No LM32 block RAM on the bus")]
    NotFound,
    #[error("Address {0:#x} does not fit on the 32-bit bus")]
    AddressRange(u64),
    #[error("Refusing to load an empty image")]
    EmptyImage,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Absolute address of the syscon reset register
    pub syscon: u32,
    pub packet_words: usize,
    pub progress: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            syscon: DEFAULT_SYSCON,
            packet_words: DEFAULT_PACKET_WORDS,
            progress: false,
        }
    }
}

/// The LM32 and the RAM it boots from
#[derive(Debug)]
pub struct SoftCpu<T> {
    transport: Weak<Mutex<T>>,
    ram_base: u32,
    config: LoaderConfig,
}

impl<T> SdbCore for SoftCpu<T> {
    const VENDOR_ID: u64 = vendor::CERN;
    const DEVICE_ID: u32 = RAM_DEVICE_ID;
    const NAME: &'static str = "WB4-BlockRAM";
}

fn bus_address(address: u64) -> Result<u32, Error> {
    u32::try_from(address).map_err(|_| Error::AddressRange(address))
}

impl<T> SoftCpu<T>
where
    T: Transport,
{
    #[must_use]
    pub fn new(transport: &Arc<Mutex<T>>, ram_base: u32) -> Self {
        Self {
            transport: Arc::downgrade(transport),
            ram_base,
            config: LoaderConfig::default(),
        }
    }

    /// Builds a [`SoftCpu`] from the block RAM at the highest address in `tree`. The syscon is
    /// taken from the tree too when it is listed.
    /// # Errors
    /// Returns an error if there is no block RAM or it's out of reach of the bus
    pub fn from_sdb(transport: &Arc<Mutex<T>>, tree: &SdbTree) -> Result<Self, Error> {
        let ram = Self::locate(tree)
            .into_iter()
            .max_by_key(|f| f.address)
            .ok_or(Error::NotFound)?;
        let mut cpu = Self::new(transport, bus_address(ram.address)?);
        if let Some(syscon) = tree.find_product(vendor::CERN, SYSCON_DEVICE_ID).first() {
            cpu.config.syscon = bus_address(syscon.address)?;
        }
        debug!(
            "RAM at {:#010x} ({}), syscon at {:#010x}",
            cpu.ram_base, ram.bus_path, cpu.config.syscon
        );
        Ok(cpu)
    }

    #[must_use]
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn ram_base(&self) -> u32 {
        self.ram_base
    }

    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Hold the CPU
    /// # Errors
    /// Returns an error on transport errors
    pub fn hold(&self) -> Result<(), Error> {
        let syscon = self.config.syscon;
        with_transport(&self.transport, |t| Ok(t.write32(syscon, HOLD)?))
    }

    /// Let the CPU run
    /// # Errors
    /// Returns an error on transport errors
    pub fn release(&self) -> Result<(), Error> {
        let syscon = self.config.syscon;
        with_transport(&self.transport, |t| Ok(t.write32(syscon, RELEASE)?))
    }

    /// Hold the CPU, overwrite its RAM with `image` and release it. Returns the number of
    /// packets written.
    ///
    /// If a write fails the CPU stays held, so it never runs a partial image.
    /// # Errors
    /// Returns an error on empty images or transport errors
    pub fn load<I>(&self, image: &I) -> Result<usize, Error>
    where
        I: FirmwareImage + ?Sized,
    {
        if image.is_empty() {
            return Err(Error::EmptyImage);
        }
        let packets = image.packets(self.config.packet_words.max(1));
        let (ram_base, config) = (self.ram_base, self.config);
        info!(
            "Loading {} words ({}) at {ram_base:#010x}",
            image.words().len(),
            image.md5_string()
        );
        with_transport(&self.transport, |t| {
            t.write32(config.syscon, HOLD)?;
            let bar = if config.progress {
                ProgressBar::new(packets.len() as u64)
            } else {
                ProgressBar::hidden()
            };
            bar.set_message("Loading LM32 RAM");
            let mut addr = ram_base;
            for (i, packet) in packets.iter().enumerate() {
                t.block_write(addr, packet, 4, Completion::Acknowledged)
                    .map_err(|e| {
                        warn!("Packet {i} failed, the CPU is still held");
                        e
                    })?;
                addr = addr.wrapping_add(4 * u32::try_from(packet.len()).unwrap_or(u32::MAX));
                bar.inc(1);
            }
            bar.finish();
            t.write32(config.syscon, RELEASE)?;
            Ok(packets.len())
        })
    }
}
