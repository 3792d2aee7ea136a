//! Drive the White Rabbit SPI flash updater on a bus stored in a memory file.
//!
//! ```text
//! cargo run --example spiflash_update -- bus.mem cido
//! cargo run --example spiflash_update -- bus.mem update gateware.mcs
//! ```
//! Set `RUST_LOG=debug` to follow the session phase by phase.

use anyhow::{
    anyhow,
    bail,
};
use sdbfpga::prelude::*;
use std::sync::{
    Arc,
    Mutex,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (path, mode) = match args.as_slice() {
        [path, mode, ..] => (path, mode.parse::<Mode>().map_err(|e| anyhow!(e))?),
        _ => bail!("Usage: spiflash_update <memory file> <update|cido|vo> [image]"),
    };

    let bus = Arc::new(Mutex::new(FileMem::open(path)?));
    let tree = SdbTree::discover(&mut *bus.lock().map_err(|_| anyhow!("Poisoned bus"))?, None)?;
    let mut flash = SpiFlash::from_sdb(&bus, &tree)?.with_config(FlashConfig {
        progress: true,
        ..FlashConfig::default()
    });

    let report = match mode {
        Mode::CheckIdOnly => flash.check_id()?,
        Mode::VerifyOnly => flash.verify()?,
        Mode::Update => {
            let Some(image) = args.get(2) else {
                bail!("Update mode needs an image");
            };
            let image: Box<dyn FirmwareImage> =
                if image.ends_with(".mcs") || image.ends_with(".mcs.gz") {
                    Box::new(read_mcs_file(image)?)
                } else {
                    Box::new(read_bin_file(image)?)
                };
            flash.update(image.as_ref())?
        }
    };
    println!("{} finished: {}", report.mode, report.status.describe());
    if report.rebooted {
        println!("The FPGA is rebooting into the new image");
    }
    Ok(())
}
