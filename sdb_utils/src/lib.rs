//! # SDB Utilities
//!
//! This small library contains the data formats shared by the `sdbfpga` tools: the 64-byte
//! [Self-Describing Bus](https://ohwr.org/project/fpga-config-space/wikis/home) record codec,
//! the firmware image formats that get streamed into the SPI flash programmer, and the ICAPE2
//! command words used to warm-reboot a Xilinx 7-series FPGA.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod firmware;
pub mod icap;
pub mod packet;
pub mod sdb;
