//! # sdbfpga
//!
//! Monitor and control of Wishbone FPGA designs that describe themselves with the
//! [Self-Describing Bus](https://ohwr.org/project/fpga-config-space/wikis/home).
//!
//! The register bus is abstracted by the [`transport::Transport`] trait. On top of it, the
//! [`sdb`] module discovers and parses the tree of SDB tables the gateware carries, and the
//! drivers in [`cores`] locate their hardware through that tree: the White Rabbit SPI flash
//! updater and the LM32 soft-CPU loader.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cores;
pub mod poll;
pub mod prelude;
pub mod sdb;
pub mod transport;
