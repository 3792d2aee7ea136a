//! List the SDB tree of a bus stored in a memory file, or find a product on it.
//!
//! ```text
//! cargo run --example sdb_ls -- bus.mem
//! cargo run --example sdb_ls -- bus.mem --full
//! cargo run --example sdb_ls -- bus.mem --find 0x7501:0xae5f
//! ```

use anyhow::{
    bail,
    Context,
};
use sdbfpga::prelude::*;
use tracing_subscriber::EnvFilter;

fn parse_hex(s: &str) -> anyhow::Result<u64> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(digits, 16).with_context(|| format!("`{s}` is not a hex number"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("Usage: sdb_ls <memory file> [--full | --find VENDOR:DEVICE]");
    };
    let mut bus = FileMem::open(&path)?;
    let tree = SdbTree::discover(&mut bus, None)?;

    match args.next().as_deref() {
        None => print!("{tree}"),
        Some("--full") => print!("{tree:#}"),
        Some("--find") => {
            let query = args.next().context("--find needs a VENDOR:DEVICE pair")?;
            let (vendor, device) = query
                .split_once(':')
                .context("--find needs a VENDOR:DEVICE pair")?;
            let device = u32::try_from(parse_hex(device)?)?;
            let found = tree.find_product(parse_hex(vendor)?, device);
            if found.is_empty() {
                bail!("{query} is not on the bus");
            }
            for f in found {
                println!("{:<14} {:#010x}", f.bus_path, f.address);
            }
        }
        Some(other) => bail!("Unknown option `{other}`"),
    }
    Ok(())
}
