//! Prelude (helpful reexports) for this package

pub use crate::{
    cores::{
        lm32::SoftCpu,
        spiflash::{
            FlashConfig,
            Mode,
            SpiFlash,
        },
        SdbCore,
    },
    sdb::SdbTree,
    transport::{
        filemem::FileMem,
        Transport,
    },
};
pub use sdb_utils::firmware::{
    mcs::read_mcs_file,
    read_bin_file,
    ram::read_ram_file,
    FirmwareImage,
};
