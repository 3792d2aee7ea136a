//! Discovery of the Self-Describing Bus (SDB) directory tree mapped on a register bus.
//!
//! The root table is located with [`scan`], then [`SdbTree::parse`] walks it, following every
//! bridge into the nested table of its sub-bus. Nodes live in an arena, indexed by [`NodeId`] in
//! pre-order, and every node remembers the address translation applied by the bridges above it
//! so records can be resolved to absolute bus addresses.
use crate::transport::{
    self,
    Transport,
};
use kstring::KString;
use sdb_utils::sdb::{
    self as codec,
    Interconnect,
    Record,
    RECORD_SIZE,
    SDB_MAGIC,
};
use std::fmt::{
    self,
    Display,
};
use thiserror::Error;
use tracing::{
    debug,
    trace,
};

/// Mask [`scan`] starts from when looking for the root table
pub const DEFAULT_SCAN_MASK: u32 = 0x1000_0000;
/// [`scan`] gives up once the mask has been shifted down to this granularity
pub const MIN_SCAN_MASK: u32 = 0x100;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] transport::Error),
    #[error("Malformed SDB record at {addr:#010x}")]
    Protocol {
        addr: u64,
        #[source]
        source: codec::Error,
    },
    #[error("No SDB magic at {addr:#010x} (found {found:#010x})")]
    BadMagic { addr: u64, found: u32 },
    #[error("Expected an interconnect header at {addr:#010x}")]
    NotInterconnect { addr: u64 },
    #[error("Bridge at {addr:#010x} points back to the table of an enclosing bus")]
    BridgeLoop { addr: u64 },
    #[error("Address {addr:#x} does not fit on the 32-bit bus")]
    AddressRange { addr: u64 },
    #[error("Could not find an SDB root before the scan mask reached {mask:#x}")]
    NotFound { mask: u32 },
}

fn bus_addr(addr: u64) -> Result<u32, Error> {
    u32::try_from(addr).map_err(|_| Error::AddressRange { addr })
}

/// Find the root SDB table by searching for its magic.
///
/// For every mask, starting at `start_mask`, the addresses `mask * 15` down to `mask` are checked
/// in steps of `mask`. If none holds the magic the mask is shifted right by four bits, until it
/// reaches [`MIN_SCAN_MASK`]. This only finds roots aligned to one of the scanned granularities,
/// the address maps SDB generators produce in practice.
/// # Errors
/// Returns an error on bus errors or if no root was found
pub fn scan<T>(transport: &mut T, start_mask: u32) -> Result<u32, Error>
where
    T: Transport + ?Sized,
{
    let mut mask = start_mask;
    while mask > MIN_SCAN_MASK {
        for i in (0..=14u32).rev() {
            let Some(addr) = mask.checked_mul(i + 1) else {
                continue;
            };
            let value = transport.read32(addr)?;
            trace!("@{addr:#010x} > {value:#010x}");
            if value == SDB_MAGIC {
                debug!("Found SDB root at {addr:#010x}");
                return Ok(addr);
            }
        }
        mask >>= 4;
    }
    Err(Error::NotFound { mask })
}

/// Read and decode the 64-byte record at `addr`, one word (four byte lanes, MSB first) at a time
/// # Errors
/// Returns an error on bus errors or malformed records
pub fn read_record<T>(transport: &mut T, addr: u64) -> Result<Record, Error>
where
    T: Transport + ?Sized,
{
    let mut bytes = [0u8; RECORD_SIZE];
    for (lane, word_addr) in bytes.chunks_exact_mut(4).zip((addr..).step_by(4)) {
        lane.copy_from_slice(&transport.read32(bus_addr(word_addr)?)?.to_be_bytes());
    }
    Record::decode(&bytes).map_err(|source| Error::Protocol { addr, source })
}

/// Handle of a node in an [`SdbTree`]. The root is always the first node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A record of a table, with the table of the sub-bus behind it if it's a parsed bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub record: Record,
    pub child: Option<NodeId>,
}

/// One table of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdbNode {
    pub interconnect: Interconnect,
    /// Records 1.. of the table, in bus order
    pub entries: Vec<Entry>,
    /// Address of the table itself
    pub base: u64,
    /// Translation of addresses in this table into root bus addresses
    pub offset: u64,
    /// Nesting depth, 0 at the root
    pub level: usize,
    /// Bus path of the bridge leading here, e.g. `"2."`, empty at the root
    pub bus_path_prefix: String,
    pub parent: Option<NodeId>,
}

impl SdbNode {
    /// Root bus address of a record of this table. Integration records have no address range
    /// of their own and resolve to the start of the bus.
    #[must_use]
    pub fn address_of(&self, record: &Record) -> Option<u64> {
        match record {
            Record::Integration(_) => Some(self.offset),
            _ => record
                .component()
                .map(|c| self.offset.wrapping_add(c.addr_first)),
        }
    }

    /// Dotted bus path of entry `index` (1-based, the header being record 0)
    #[must_use]
    pub fn bus_path(&self, index: usize) -> String {
        format!("{}{index}", self.bus_path_prefix)
    }
}

/// A record matching a product lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub record: Record,
    pub address: u64,
    pub bus_path: String,
}

/// One line of a bus listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub bus_path: String,
    pub vendor_id: u64,
    pub device_id: u32,
    pub address: u64,
    pub name: KString,
}

/// The parsed SDB directory of a bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdbTree {
    nodes: Vec<SdbNode>,
}

impl SdbTree {
    /// Parse the SDB table at `base` and, within `max_depth` levels of bridges (`None` for no
    /// limit), the tables of every sub-bus
    /// # Errors
    /// Returns an error on bus errors or malformed tables
    pub fn parse<T>(transport: &mut T, base: u32, max_depth: Option<usize>) -> Result<Self, Error>
    where
        T: Transport + ?Sized,
    {
        let mut tree = Self { nodes: vec![] };
        tree.parse_node(
            transport,
            u64::from(base),
            0,
            String::new(),
            None,
            max_depth,
        )?;
        Ok(tree)
    }

    /// [`scan`] for the root table, then [`SdbTree::parse`] it
    /// # Errors
    /// Returns an error if no root is found or the tree fails to parse
    pub fn discover<T>(transport: &mut T, max_depth: Option<usize>) -> Result<Self, Error>
    where
        T: Transport + ?Sized,
    {
        let base = scan(transport, DEFAULT_SCAN_MASK)?;
        Self::parse(transport, base, max_depth)
    }

    fn parse_node<T>(
        &mut self,
        transport: &mut T,
        base: u64,
        offset: u64,
        bus_path_prefix: String,
        parent: Option<NodeId>,
        depth: Option<usize>,
    ) -> Result<NodeId, Error>
    where
        T: Transport + ?Sized,
    {
        let found = transport.read32(bus_addr(base)?)?;
        if found != SDB_MAGIC {
            return Err(Error::BadMagic { addr: base, found });
        }
        let Record::Interconnect(interconnect) = read_record(transport, base)? else {
            return Err(Error::NotInterconnect { addr: base });
        };
        let level = parent.map_or(0, |p| self.nodes[p.0].level + 1);
        debug!(
            "Interconnect {}0 at {base:#010x} (offset {offset:#x}) with {} records",
            bus_path_prefix, interconnect.record_count
        );

        let id = NodeId(self.nodes.len());
        self.nodes.push(SdbNode {
            interconnect,
            entries: Vec::with_capacity(usize::from(interconnect.record_count)),
            base,
            offset,
            level,
            bus_path_prefix: bus_path_prefix.clone(),
            parent,
        });

        for i in 1..u64::from(interconnect.record_count) {
            let addr = base + RECORD_SIZE as u64 * i;
            let record = read_record(transport, addr)?;
            trace!("Record {bus_path_prefix}{i} at {addr:#010x}: {:?}", record.record_type());
            let child = match (record.as_bridge(), depth) {
                (Some(bridge), depth) if depth != Some(0) => {
                    if self.ancestry(id).any(|n| n.base == bridge.child) {
                        return Err(Error::BridgeLoop { addr });
                    }
                    let child_offset = offset
                        .checked_add(bridge.component.addr_first)
                        .ok_or(Error::AddressRange {
                            addr: bridge.component.addr_first,
                        })?;
                    Some(self.parse_node(
                        transport,
                        bridge.child,
                        child_offset,
                        format!("{bus_path_prefix}{i}."),
                        Some(id),
                        depth.map(|d| d - 1),
                    )?)
                }
                _ => None,
            };
            self.nodes[id.0].entries.push(Entry { record, child });
        }
        Ok(id)
    }

    /// The node and all the nodes above it, innermost first
    fn ancestry(&self, id: NodeId) -> impl Iterator<Item = &SdbNode> {
        std::iter::successors(Some(&self.nodes[id.0]), |n| {
            n.parent.map(|p| &self.nodes[p.0])
        })
    }

    #[must_use]
    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn root(&self) -> &SdbNode {
        &self.nodes[0]
    }

    /// # Panics
    /// Panics if `id` belongs to a different tree
    #[must_use]
    pub fn node(&self, id: NodeId) -> &SdbNode {
        &self.nodes[id.0]
    }

    /// Every node, in pre-order
    #[must_use]
    pub fn nodes(&self) -> &[SdbNode] {
        &self.nodes
    }

    /// Call `f` with every entry (and its node and 1-based index) in pre-order
    fn visit<'a, F>(&'a self, id: NodeId, f: &mut F)
    where
        F: FnMut(&'a SdbNode, usize, &'a Entry),
    {
        let node = &self.nodes[id.0];
        for (i, entry) in node.entries.iter().enumerate() {
            f(node, i + 1, entry);
            if let Some(child) = entry.child {
                self.visit(child, f);
            }
        }
    }

    /// Every product-bearing record that matches `vendor_id` and `device_id`, in pre-order.
    /// No match is an empty list.
    #[must_use]
    pub fn find_product(&self, vendor_id: u64, device_id: u32) -> Vec<Found> {
        let mut found = vec![];
        self.visit(self.root_id(), &mut |node, index, entry| {
            let Some(product) = entry.record.product() else {
                return;
            };
            if product.vendor_id != vendor_id || product.device_id != device_id {
                return;
            }
            if let Some(address) = node.address_of(&entry.record) {
                debug!(
                    "Found {} at {address:#010x} ({})",
                    product.name(),
                    node.bus_path(index)
                );
                found.push(Found {
                    record: entry.record,
                    address,
                    bus_path: node.bus_path(index),
                });
            }
        });
        found
    }

    /// The flat listing of every product-bearing record, in pre-order
    #[must_use]
    pub fn listing(&self) -> Vec<Listing> {
        let mut lines = vec![];
        self.visit(self.root_id(), &mut |node, index, entry| {
            if let (Some(product), Some(address)) =
                (entry.record.product(), node.address_of(&entry.record))
            {
                lines.push(Listing {
                    bus_path: node.bus_path(index),
                    vendor_id: product.vendor_id,
                    device_id: product.device_id,
                    address,
                    name: product.name(),
                });
            }
        });
        lines
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        let node = &self.nodes[id.0];
        let pad = " ".repeat(node.level * 3);
        if node.level > 0 {
            let up = " ".repeat(node.level * 3 - 3);
            writeln!(f, "{up}|")?;
            writeln!(f, "{up}+++|")?;
        }
        writeln!(
            f,
            "{pad}+=== Interconnect {}0 (@{:#010x})",
            node.bus_path_prefix, node.base
        )?;
        writeln!(f, "{pad}|")?;
        indented(f, &pad, &Record::Interconnect(node.interconnect))?;
        for (i, entry) in node.entries.iter().enumerate() {
            writeln!(f, "{pad}|")?;
            writeln!(f, "{pad}+--- Device {}", node.bus_path(i + 1))?;
            indented(f, &pad, &entry.record)?;
            if let Some(child) = entry.child {
                self.fmt_node(f, child)?;
            }
        }
        Ok(())
    }
}

fn indented(f: &mut fmt::Formatter<'_>, pad: &str, item: &impl Display) -> fmt::Result {
    for line in item.to_string().lines() {
        writeln!(f, "{pad}|   {line}")?;
    }
    Ok(())
}

impl Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<14} {:016x}:{:08x}  {:>16x}  {}",
            self.bus_path, self.vendor_id, self.device_id, self.address, self.name
        )
    }
}

/// `{}` renders the one-line-per-product listing, `{:#}` dumps every record of every table
impl Display for SdbTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return self.fmt_node(f, self.root_id());
        }
        writeln!(
            f,
            "{:<14} {:>16} {:<8}  {:>16}  Description",
            "BusPath", "VendorID", "ProdID", "BaseAddr (Hex)"
        )?;
        for line in self.listing() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transport::mock::Mock;
    use sdb_utils::sdb::{
        vendor,
        Bridge,
        Component,
        Device,
        Integration,
        Product,
        BUS_WISHBONE,
        NAME_LEN,
    };

    pub(crate) fn product(vendor_id: u64, device_id: u32, name: &str) -> Product {
        let mut padded = [b' '; NAME_LEN];
        padded[..name.len()].copy_from_slice(name.as_bytes());
        Product {
            vendor_id,
            device_id,
            version: 1,
            date: 0x2015_0101,
            name: padded,
        }
    }

    pub(crate) fn crossbar(records: u16, addr_end: u64) -> Record {
        Record::Interconnect(Interconnect {
            magic: SDB_MAGIC,
            record_count: records,
            version: 1,
            bus_type: BUS_WISHBONE,
            component: Component {
                addr_first: 0,
                addr_end,
                product: product(vendor::GSI, 0xe6a5_42c9, "WB4-Crossbar-GSI"),
            },
        })
    }

    pub(crate) fn device(addr_first: u64, vendor_id: u64, device_id: u32, name: &str) -> Record {
        Record::Device(Device {
            abi_class: 0,
            abi_major: 1,
            abi_minor: 0,
            bus_specific: 0x0000_0007,
            component: Component {
                addr_first,
                addr_end: addr_first + 0xFF,
                product: product(vendor_id, device_id, name),
            },
        })
    }

    pub(crate) fn bridge(child: u64, addr_first: u64) -> Record {
        Record::Bridge(Bridge {
            child,
            component: Component {
                addr_first,
                addr_end: addr_first + 0xFFFF,
                product: product(vendor::GSI, 0xe6a5_42c9, "WB4-Bridge-GSI"),
            },
        })
    }

    /// Lay out `records` as a table at `base`
    pub(crate) fn plant(mock: &mut Mock, base: u32, records: &[Record]) {
        for (i, record) in (0u32..).zip(records) {
            mock.load(base + 64 * i, &record.encode());
        }
    }

    #[test]
    fn test_scan_every_candidate_address() {
        let mut mask = DEFAULT_SCAN_MASK;
        while mask > MIN_SCAN_MASK {
            for i in 0..=14 {
                let addr = mask * (i + 1);
                let mut mock = Mock::new();
                mock.set(addr, SDB_MAGIC);
                assert_eq!(scan(&mut mock, DEFAULT_SCAN_MASK).unwrap(), addr);
            }
            mask >>= 4;
        }
    }

    #[test]
    fn test_scan_order() {
        // Both are candidates, the higher address first
        let mut mock = Mock::new();
        mock.set(0x0E00_0000, SDB_MAGIC);
        mock.set(0x2000_0000, SDB_MAGIC);
        assert_eq!(scan(&mut mock, DEFAULT_SCAN_MASK).unwrap(), 0x2000_0000);
    }

    #[test]
    fn test_scan_not_found() {
        let mut mock = Mock::new();
        // Too fine grained to be scanned
        mock.set(0x0000_0300, SDB_MAGIC);
        assert!(matches!(
            scan(&mut mock, DEFAULT_SCAN_MASK),
            Err(Error::NotFound { mask: 0x100 })
        ));
    }

    #[test]
    fn test_scan_bus_error() {
        let mut mock = Mock::new();
        mock.fault(0xF000_0000);
        assert!(matches!(
            scan(&mut mock, DEFAULT_SCAN_MASK),
            Err(Error::Transport(transport::Error::Bus { addr: 0xF000_0000 }))
        ));
    }

    #[test]
    fn test_read_record_word_lanes() {
        let mut mock = Mock::new();
        let record = device(0x100, vendor::CERN, 0x66cf_eb52, "WB4-BlockRAM");
        plant(&mut mock, 0x40, &[record]);
        assert_eq!(read_record(&mut mock, 0x40).unwrap(), record);
    }

    fn two_level() -> Mock {
        let mut mock = Mock::new();
        plant(
            &mut mock,
            0x0,
            &[
                crossbar(4, 0x000F_FFFF),
                device(0x0000_1000, vendor::CERN, 0x1111, "root-dev"),
                bridge(0x0002_0000, 0x0002_0000),
                device(0x0000_2000, vendor::CERN, 0x2222, "root-dev-2"),
            ],
        );
        plant(
            &mut mock,
            0x0002_0000,
            &[
                crossbar(3, 0xFFFF),
                device(0x0000_0400, vendor::CERN, 0x1111, "child-dev"),
                device(0x0000_0800, vendor::SEVEN_SOLUTIONS, 0xae5f, "child-flash"),
            ],
        );
        mock
    }

    #[test]
    fn test_parse_two_level() {
        let mut mock = two_level();
        let tree = SdbTree::parse(&mut mock, 0, None).unwrap();
        assert_eq!(tree.nodes().len(), 2);
        assert_eq!(tree.root().entries.len(), 3);
        let child_id = tree.root().entries[1].child.unwrap();
        let child = tree.node(child_id);
        assert_eq!(child.level, 1);
        assert_eq!(child.base, 0x2_0000);
        assert_eq!(child.offset, 0x2_0000);
        assert_eq!(child.bus_path_prefix, "2.");
        assert_eq!(child.parent, Some(tree.root_id()));

        let flash = tree.find_product(vendor::SEVEN_SOLUTIONS, 0xae5f);
        assert_eq!(flash.len(), 1);
        assert_eq!(flash[0].address, 0x2_0000 + 0x800);
        assert_eq!(flash[0].bus_path, "2.2");
    }

    #[test]
    fn test_find_product_preorder() {
        let mut mock = two_level();
        let tree = SdbTree::parse(&mut mock, 0, None).unwrap();
        let found: Vec<_> = tree
            .find_product(vendor::CERN, 0x1111)
            .into_iter()
            .map(|f| (f.bus_path, f.address))
            .collect();
        assert_eq!(
            found,
            vec![("1".to_owned(), 0x1000), ("2.1".to_owned(), 0x2_0400)]
        );
    }

    #[test]
    fn test_find_product_empty() {
        let mut mock = two_level();
        let tree = SdbTree::parse(&mut mock, 0, None).unwrap();
        assert!(tree.find_product(0xDEAD, 0xBEEF).is_empty());
    }

    #[test]
    fn test_offsets_compose() {
        let mut mock = Mock::new();
        plant(
            &mut mock,
            0x0,
            &[crossbar(2, 0xFFFF_FFFF), bridge(0x0010_0000, 0x0010_0000)],
        );
        plant(
            &mut mock,
            0x0010_0000,
            &[crossbar(2, 0xF_FFFF), bridge(0x0011_0000, 0x0001_0000)],
        );
        plant(
            &mut mock,
            0x0011_0000,
            &[
                crossbar(2, 0xFFFF),
                device(0x40, vendor::SEVEN_SOLUTIONS, 0xae5f, "deep"),
            ],
        );
        let tree = SdbTree::parse(&mut mock, 0, None).unwrap();
        assert_eq!(tree.nodes().len(), 3);
        assert_eq!(tree.nodes()[2].level, 2);
        assert_eq!(tree.nodes()[2].offset, 0x0011_0000);
        let found = tree.find_product(vendor::SEVEN_SOLUTIONS, 0xae5f);
        assert_eq!(found[0].address, 0x0011_0040);
        assert_eq!(found[0].bus_path, "1.1.1");
    }

    #[test]
    fn test_max_depth() {
        let mut mock = two_level();
        let flat = SdbTree::parse(&mut mock, 0, Some(0)).unwrap();
        assert_eq!(flat.nodes().len(), 1);
        assert!(flat.root().entries[1].child.is_none());
        // The bridge itself is still listed
        assert_eq!(flat.listing().len(), 3);
        let one = SdbTree::parse(&mut mock, 0, Some(1)).unwrap();
        assert_eq!(one.nodes().len(), 2);
    }

    #[test]
    fn test_bad_magic() {
        let mut mock = Mock::new();
        mock.set(0x100, 0x1234_5678);
        assert!(matches!(
            SdbTree::parse(&mut mock, 0x100, None),
            Err(Error::BadMagic {
                addr: 0x100,
                found: 0x1234_5678
            })
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let mut mock = two_level();
        // Corrupt the tag byte of record 3 of the root table
        let tag_word = 3 * 64 + 60;
        mock.set(tag_word, (mock.peek(tag_word) & 0xFFFF_FF00) | 0x42);
        assert!(matches!(
            SdbTree::parse(&mut mock, 0, None),
            Err(Error::Protocol {
                addr: 0xC0,
                source: codec::Error::UnknownType(0x42)
            })
        ));
    }

    #[test]
    fn test_bridge_loop() {
        let mut mock = Mock::new();
        plant(&mut mock, 0x0, &[crossbar(2, 0xFFFF), bridge(0x0, 0x0)]);
        assert!(matches!(
            SdbTree::parse(&mut mock, 0, None),
            Err(Error::BridgeLoop { addr: 0x40 })
        ));
    }

    #[test]
    fn test_integration_record() {
        let mut mock = Mock::new();
        let integration = Record::Integration(Integration {
            reserved: [0; 24],
            product: product(vendor::SEVEN_SOLUTIONS, 0x1234, "WR-LEN"),
        });
        plant(&mut mock, 0x1000, &[crossbar(2, 0xFFFF), integration]);
        let tree = SdbTree::parse(&mut mock, 0x1000, None).unwrap();
        let found = tree.find_product(vendor::SEVEN_SOLUTIONS, 0x1234);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address, 0);
        assert_eq!(found[0].record, integration);
    }

    #[test]
    fn test_end_to_end() {
        let mut mock = Mock::new();
        let flash = device(0x0006_0000, vendor::SEVEN_SOLUTIONS, 0xae5f, "WR-SPI-Flash");
        plant(&mut mock, 0x0E00_0000, &[crossbar(2, 0x00FF_FFFF), flash]);
        assert_eq!(scan(&mut mock, DEFAULT_SCAN_MASK).unwrap(), 0x0E00_0000);
        let tree = SdbTree::discover(&mut mock, None).unwrap();
        assert_eq!(tree.root().base, 0x0E00_0000);
        assert_eq!(
            tree.find_product(0x7501, 0xae5f),
            vec![Found {
                record: flash,
                address: 0x0006_0000,
                bus_path: "1".to_owned(),
            }]
        );
    }

    #[test]
    fn test_listing_display() {
        let mut mock = two_level();
        let tree = SdbTree::parse(&mut mock, 0, None).unwrap();
        let listing = tree.listing();
        assert_eq!(
            listing.iter().map(|l| l.bus_path.as_str()).collect::<Vec<_>>(),
            vec!["1", "2", "2.1", "2.2", "3"]
        );
        let brief = tree.to_string();
        assert!(brief.starts_with("BusPath"));
        assert!(brief.contains(
            "2.2            0000000000007501:0000ae5f             20800  child-flash"
        ));
        let full = format!("{tree:#}");
        assert!(full.contains("+=== Interconnect 0 (@0x00000000)"));
        assert!(full.contains("   +=== Interconnect 2.0 (@0x00020000)"));
        assert!(full.contains("   +--- Device 2.2"));
    }
}
