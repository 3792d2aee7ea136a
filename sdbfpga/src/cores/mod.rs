//! Drivers for the Wishbone cores that are located through the SDB tree

pub mod lm32;
pub mod spiflash;

use crate::sdb::{
    Found,
    SdbTree,
};
use std::sync::{
    Mutex,
    Weak,
};
use thiserror::Error;

/// Cores identified on the bus by the product in their SDB record
pub trait SdbCore {
    const VENDOR_ID: u64;
    const DEVICE_ID: u32;
    /// The product name the gateware reports, for diagnostics
    const NAME: &'static str;

    /// Every instance of this core in `tree`, in pre-order
    #[must_use]
    fn locate(tree: &SdbTree) -> Vec<Found> {
        tree.find_product(Self::VENDOR_ID, Self::DEVICE_ID)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LockError {
    #[error("The transport this core was created from has been dropped")]
    Detached,
    #[error("Another user of the transport panicked while holding it")]
    Poisoned,
}

/// Run `f` with exclusive access to the transport behind `transport`. The lock is held for the
/// whole call, so nothing else can touch the bus in the middle of a sequence.
pub(crate) fn with_transport<T, R, E, F>(transport: &Weak<Mutex<T>>, f: F) -> Result<R, E>
where
    F: FnOnce(&mut T) -> Result<R, E>,
    E: From<LockError>,
{
    let tarc = transport.upgrade().ok_or(LockError::Detached)?;
    let mut transport = tarc.lock().map_err(|_| LockError::Poisoned)?;
    f(&mut transport)
}
