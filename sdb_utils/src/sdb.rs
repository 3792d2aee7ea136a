//! Codec for the 64-byte records of the Self-Describing Bus (SDB) directory format, as laid out by
//! version 1.1 of `sdb.h`. Every multi-byte field is big-endian and the last byte of every record
//! is the type tag that selects how the other 63 bytes are interpreted.
use kstring::KString;
use nom::{
    bytes::complete::take,
    combinator::{
        map,
        map_res,
    },
    number::complete::{
        be_u16,
        be_u32,
        be_u64,
        be_u8,
    },
    IResult,
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fmt::{
    self,
    Display,
};
use thiserror::Error;

/// "SDB-", the first word of every interconnect header
pub const SDB_MAGIC: u32 = 0x5344_422D;
/// Every SDB record is exactly this many bytes
pub const RECORD_SIZE: usize = 64;
/// Length of the space-padded product name
pub const NAME_LEN: usize = 19;

/// `sdb_bus_type` of a Wishbone crossbar
pub const BUS_WISHBONE: u8 = 0x00;
/// `sdb_bus_type` of a plain data bus
pub const BUS_DATA: u8 = 0x01;

/// Vendor IDs that show up on the boards we talk to
pub mod vendor {
    pub const GSI: u64 = 0x0651;
    pub const SEVEN_SOLUTIONS: u64 = 0x7501;
    pub const CERN: u64 = 0xCE42;

    /// Short human name of a known vendor
    #[must_use]
    pub fn name(vendor_id: u64) -> Option<&'static str> {
        match vendor_id {
            GSI => Some("GSI"),
            SEVEN_SOLUTIONS => Some("7S"),
            CERN => Some("CERN"),
            _ => None,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown SDB record type {0:#04x}")]
    UnknownType(u8),
    #[error("Interconnect header without the SDB magic (found {0:#010x})")]
    BadMagic(u32),
    #[error("Record body did not match the layout of its type")]
    Layout,
}

/// The type tag stored in the last byte of a record
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum RecordType {
    Interconnect = 0x00,
    Device = 0x01,
    Bridge = 0x02,
    Integration = 0x80,
    RepoUrl = 0x81,
    Synthesis = 0x82,
    Empty = 0xFF,
}

/// Identity of a product: 40 bytes on the wire, the last of which is the record tag
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Product {
    pub vendor_id: u64,
    pub device_id: u32,
    pub version: u32,
    /// BCD encoded, `0xYYYYMMDD`
    pub date: u32,
    pub name: [u8; NAME_LEN],
}

impl Product {
    /// The product name without its space/NUL padding
    #[must_use]
    pub fn name(&self) -> KString {
        KString::from_string(text(&self.name))
    }
}

/// An address range on the bus plus the product that decodes it
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Component {
    pub addr_first: u64,
    pub addr_end: u64,
    pub product: Product,
}

/// The header that prefixes every SDB table and describes the crossbar itself
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Interconnect {
    pub magic: u32,
    /// Length of the table, including this header
    pub record_count: u16,
    pub version: u8,
    pub bus_type: u8,
    pub component: Component,
}

/// A device on the bus. `abi_class` 0 is a custom device
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Device {
    pub abi_class: u16,
    pub abi_major: u8,
    pub abi_minor: u8,
    pub bus_specific: u32,
    pub component: Component,
}

/// A bridge embedding a nested bus, whose own table lives at `child`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Bridge {
    pub child: u64,
    pub component: Component,
}

/// Meta-data describing the aggregate product of the whole bus
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Integration {
    pub reserved: [u8; 24],
    pub product: Product,
}

/// Top module repository url, informative only
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    pub url: [u8; 63],
}

impl RepoUrl {
    #[must_use]
    pub fn url(&self) -> String {
        text(&self.url)
    }
}

/// Synthesis details of the running gateware, informative only
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub name: [u8; 16],
    pub commit_id: [u8; 16],
    pub tool_name: [u8; 8],
    pub tool_version: u32,
    pub date: u32,
    pub user_name: [u8; 15],
}

/// One decoded SDB record
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Record {
    Interconnect(Interconnect),
    Device(Device),
    Bridge(Bridge),
    Integration(Integration),
    RepoUrl(RepoUrl),
    Synthesis(Synthesis),
    Empty([u8; 63]),
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == ' ' || c == '\0')
        .to_owned()
}

fn array<const N: usize>(input: &[u8]) -> IResult<&[u8], [u8; N]> {
    map_res(take(N), |b: &[u8]| <[u8; N]>::try_from(b))(input)
}

fn product(input: &[u8]) -> IResult<&[u8], Product> {
    let (input, vendor_id) = be_u64(input)?;
    let (input, device_id) = be_u32(input)?;
    let (input, version) = be_u32(input)?;
    let (input, date) = be_u32(input)?;
    let (input, name) = array::<NAME_LEN>(input)?;
    Ok((
        input,
        Product {
            vendor_id,
            device_id,
            version,
            date,
            name,
        },
    ))
}

fn component(input: &[u8]) -> IResult<&[u8], Component> {
    let (input, addr_first) = be_u64(input)?;
    let (input, addr_end) = be_u64(input)?;
    let (input, product) = product(input)?;
    Ok((
        input,
        Component {
            addr_first,
            addr_end,
            product,
        },
    ))
}

fn interconnect(input: &[u8]) -> IResult<&[u8], Interconnect> {
    let (input, magic) = be_u32(input)?;
    let (input, record_count) = be_u16(input)?;
    let (input, version) = be_u8(input)?;
    let (input, bus_type) = be_u8(input)?;
    let (input, component) = component(input)?;
    Ok((
        input,
        Interconnect {
            magic,
            record_count,
            version,
            bus_type,
            component,
        },
    ))
}

fn device(input: &[u8]) -> IResult<&[u8], Device> {
    let (input, abi_class) = be_u16(input)?;
    let (input, abi_major) = be_u8(input)?;
    let (input, abi_minor) = be_u8(input)?;
    let (input, bus_specific) = be_u32(input)?;
    let (input, component) = component(input)?;
    Ok((
        input,
        Device {
            abi_class,
            abi_major,
            abi_minor,
            bus_specific,
            component,
        },
    ))
}

fn bridge(input: &[u8]) -> IResult<&[u8], Bridge> {
    let (input, child) = be_u64(input)?;
    let (input, component) = component(input)?;
    Ok((input, Bridge { child, component }))
}

fn integration(input: &[u8]) -> IResult<&[u8], Integration> {
    let (input, reserved) = array::<24>(input)?;
    let (input, product) = product(input)?;
    Ok((input, Integration { reserved, product }))
}

fn synthesis(input: &[u8]) -> IResult<&[u8], Synthesis> {
    let (input, name) = array::<16>(input)?;
    let (input, commit_id) = array::<16>(input)?;
    let (input, tool_name) = array::<8>(input)?;
    let (input, tool_version) = be_u32(input)?;
    let (input, date) = be_u32(input)?;
    let (input, user_name) = array::<15>(input)?;
    Ok((
        input,
        Synthesis {
            name,
            commit_id,
            tool_name,
            tool_version,
            date,
            user_name,
        },
    ))
}

fn pack_product(bytes: &mut Vec<u8>, product: &Product) {
    bytes.extend_from_slice(&product.vendor_id.to_be_bytes());
    bytes.extend_from_slice(&product.device_id.to_be_bytes());
    bytes.extend_from_slice(&product.version.to_be_bytes());
    bytes.extend_from_slice(&product.date.to_be_bytes());
    bytes.extend_from_slice(&product.name);
}

fn pack_component(bytes: &mut Vec<u8>, component: &Component) {
    bytes.extend_from_slice(&component.addr_first.to_be_bytes());
    bytes.extend_from_slice(&component.addr_end.to_be_bytes());
    pack_product(bytes, &component.product);
}

impl Record {
    /// Decode a record from its 64 wire bytes, selecting the variant from the trailing tag
    /// # Errors
    /// Returns an error on unknown tags or on interconnect headers missing the SDB magic
    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Result<Self, Error> {
        let tag = bytes[RECORD_SIZE - 1];
        let kind = RecordType::from_u8(tag).ok_or(Error::UnknownType(tag))?;
        // The tag itself is not part of any layout
        let body = &bytes[..RECORD_SIZE - 1];
        let parsed: IResult<&[u8], Record> = match kind {
            RecordType::Interconnect => map(interconnect, Record::Interconnect)(body),
            RecordType::Device => map(device, Record::Device)(body),
            RecordType::Bridge => map(bridge, Record::Bridge)(body),
            RecordType::Integration => map(integration, Record::Integration)(body),
            RecordType::RepoUrl => map(array::<63>, |url| Record::RepoUrl(RepoUrl { url }))(body),
            RecordType::Synthesis => map(synthesis, Record::Synthesis)(body),
            RecordType::Empty => map(array::<63>, Record::Empty)(body),
        };
        let (remaining, record) = parsed.map_err(|_| Error::Layout)?;
        if !remaining.is_empty() {
            return Err(Error::Layout);
        }
        if let Record::Interconnect(ic) = &record {
            if ic.magic != SDB_MAGIC {
                return Err(Error::BadMagic(ic.magic));
            }
        }
        Ok(record)
    }

    /// Encode this record back into its 64 wire bytes
    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = Vec::with_capacity(RECORD_SIZE);
        match self {
            Record::Interconnect(ic) => {
                bytes.extend_from_slice(&ic.magic.to_be_bytes());
                bytes.extend_from_slice(&ic.record_count.to_be_bytes());
                bytes.push(ic.version);
                bytes.push(ic.bus_type);
                pack_component(&mut bytes, &ic.component);
            }
            Record::Device(dev) => {
                bytes.extend_from_slice(&dev.abi_class.to_be_bytes());
                bytes.push(dev.abi_major);
                bytes.push(dev.abi_minor);
                bytes.extend_from_slice(&dev.bus_specific.to_be_bytes());
                pack_component(&mut bytes, &dev.component);
            }
            Record::Bridge(br) => {
                bytes.extend_from_slice(&br.child.to_be_bytes());
                pack_component(&mut bytes, &br.component);
            }
            Record::Integration(int) => {
                bytes.extend_from_slice(&int.reserved);
                pack_product(&mut bytes, &int.product);
            }
            Record::RepoUrl(repo) => bytes.extend_from_slice(&repo.url),
            Record::Synthesis(syn) => {
                bytes.extend_from_slice(&syn.name);
                bytes.extend_from_slice(&syn.commit_id);
                bytes.extend_from_slice(&syn.tool_name);
                bytes.extend_from_slice(&syn.tool_version.to_be_bytes());
                bytes.extend_from_slice(&syn.date.to_be_bytes());
                bytes.extend_from_slice(&syn.user_name);
            }
            Record::Empty(reserved) => bytes.extend_from_slice(reserved),
        }
        bytes.push(self.record_type() as u8);
        let mut out = [0u8; RECORD_SIZE];
        out.copy_from_slice(&bytes);
        out
    }

    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::Interconnect(_) => RecordType::Interconnect,
            Record::Device(_) => RecordType::Device,
            Record::Bridge(_) => RecordType::Bridge,
            Record::Integration(_) => RecordType::Integration,
            Record::RepoUrl(_) => RecordType::RepoUrl,
            Record::Synthesis(_) => RecordType::Synthesis,
            Record::Empty(_) => RecordType::Empty,
        }
    }

    /// The address range this record decodes, if it has one
    #[must_use]
    pub fn component(&self) -> Option<&Component> {
        match self {
            Record::Interconnect(Interconnect { component, .. })
            | Record::Device(Device { component, .. })
            | Record::Bridge(Bridge { component, .. }) => Some(component),
            _ => None,
        }
    }

    /// The product identity carried by this record. Padding and informative records have none
    #[must_use]
    pub fn product(&self) -> Option<&Product> {
        match self {
            Record::Integration(int) => Some(&int.product),
            _ => self.component().map(|c| &c.product),
        }
    }

    #[must_use]
    pub fn is_component(&self) -> bool {
        self.component().is_some()
    }

    #[must_use]
    pub fn as_bridge(&self) -> Option<&Bridge> {
        match self {
            Record::Bridge(br) => Some(br),
            _ => None,
        }
    }
}

// Human readable dumps, one `name : value` line per field

fn field(f: &mut fmt::Formatter<'_>, name: &str, value: impl Display) -> fmt::Result {
    writeln!(f, "{name:<15}: {value}")
}

impl Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match vendor::name(self.vendor_id) {
            Some(v) => field(f, "vendor_id", format_args!("{:#018x} ({v})", self.vendor_id))?,
            None => field(f, "vendor_id", format_args!("{:#018x}", self.vendor_id))?,
        }
        field(f, "device_id", format_args!("{:#010x}", self.device_id))?;
        field(f, "version", format_args!("{:#010x}", self.version))?;
        field(f, "date", format_args!("{:#010x}", self.date))?;
        field(f, "name", self.name())
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        field(f, "addr_first", format_args!("{:#018x}", self.addr_first))?;
        field(f, "addr_end", format_args!("{:#018x}", self.addr_end))?;
        write!(f, "{}", self.product)
    }
}

impl Display for Interconnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        field(f, "sdb_magic", format_args!("{:#010x}", self.magic))?;
        field(f, "sdb_records", format_args!("{:#06x}", self.record_count))?;
        field(f, "sdb_version", format_args!("{:#04x}", self.version))?;
        field(f, "sdb_bus_type", format_args!("{:#04x}", self.bus_type))?;
        write!(f, "{}", self.component)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?}:", self.record_type())?;
        match self {
            Record::Interconnect(ic) => write!(f, "{ic}"),
            Record::Device(dev) => {
                field(f, "abi_class", format_args!("{:#06x}", dev.abi_class))?;
                field(f, "abi_ver_major", format_args!("{:#04x}", dev.abi_major))?;
                field(f, "abi_ver_minor", format_args!("{:#04x}", dev.abi_minor))?;
                field(f, "bus_specific", format_args!("{:#010x}", dev.bus_specific))?;
                write!(f, "{}", dev.component)
            }
            Record::Bridge(br) => {
                field(f, "sdb_child", format_args!("{:#018x}", br.child))?;
                write!(f, "{}", br.component)
            }
            Record::Integration(int) => write!(f, "{}", int.product),
            Record::RepoUrl(repo) => field(f, "repo_url", repo.url()),
            Record::Synthesis(syn) => {
                field(f, "syn_name", text(&syn.name))?;
                field(f, "commit_id", text(&syn.commit_id))?;
                field(f, "tool_name", text(&syn.tool_name))?;
                field(f, "tool_version", format_args!("{:#010x}", syn.tool_version))?;
                field(f, "date", format_args!("{:#010x}", syn.date))?;
                field(f, "user_name", text(&syn.user_name))
            }
            Record::Empty(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> [u8; NAME_LEN] {
        let mut n = [b' '; NAME_LEN];
        n[..s.len()].copy_from_slice(s.as_bytes());
        n
    }

    fn spi_flash_product() -> Product {
        Product {
            vendor_id: vendor::SEVEN_SOLUTIONS,
            device_id: 0xae5f,
            version: 1,
            date: 0x2015_0629,
            name: name("WR-SPI-Flash-Update"),
        }
    }

    #[test]
    fn test_decode_device_bytes() {
        let mut bytes = [0u8; RECORD_SIZE];
        // abi class, major, minor, bus specific
        bytes[..8].copy_from_slice(&[0x00, 0x00, 0x01, 0x02, 0x00, 0x00, 0x00, 0x07]);
        // addr_first / addr_end
        bytes[8..16].copy_from_slice(&0x0006_0000u64.to_be_bytes());
        bytes[16..24].copy_from_slice(&0x0006_00FFu64.to_be_bytes());
        // product
        bytes[24..32].copy_from_slice(&0x7501u64.to_be_bytes());
        bytes[32..36].copy_from_slice(&0xae5fu32.to_be_bytes());
        bytes[36..40].copy_from_slice(&1u32.to_be_bytes());
        bytes[40..44].copy_from_slice(&0x2015_0629u32.to_be_bytes());
        bytes[44..63].copy_from_slice(b"WR-SPI-Flash-Update");
        bytes[63] = 0x01;

        let record = Record::decode(&bytes).unwrap();
        let Record::Device(dev) = record else {
            panic!("Expected a device, got {record:?}");
        };
        assert_eq!(dev.abi_major, 1);
        assert_eq!(dev.abi_minor, 2);
        assert_eq!(dev.bus_specific, 7);
        assert_eq!(dev.component.addr_first, 0x6_0000);
        assert_eq!(dev.component.addr_end, 0x6_00FF);
        assert_eq!(dev.component.product, spi_flash_product());
        assert_eq!(record.encode(), bytes);
    }

    #[test]
    fn test_interconnect_roundtrip() {
        let record = Record::Interconnect(Interconnect {
            magic: SDB_MAGIC,
            record_count: 12,
            version: 1,
            bus_type: BUS_WISHBONE,
            component: Component {
                addr_first: 0,
                addr_end: 0x000F_FFFF,
                product: Product {
                    vendor_id: vendor::CERN,
                    device_id: 0xe6a5_42c9,
                    version: 1,
                    date: 0x2012_0305,
                    name: name("WB4-Crossbar-GSI"),
                },
            },
        });
        let bytes = record.encode();
        assert_eq!(&bytes[..4], b"SDB-");
        assert_eq!(bytes[63], 0x00);
        assert_eq!(Record::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut url = [b' '; 63];
        url[..23].copy_from_slice(b"git://ohwr.org/wr-cores");
        let repo = Record::RepoUrl(RepoUrl { url });
        assert_eq!(Record::decode(&repo.encode()).unwrap(), repo);

        let syn = Record::Synthesis(Synthesis {
            name: *b"wr_len_top      ",
            commit_id: [0xAB; 16],
            tool_name: *b"ISE     ",
            tool_version: 0x0000_0147,
            date: 0x2016_0101,
            user_name: *b"brat           ",
        });
        assert_eq!(Record::decode(&syn.encode()).unwrap(), syn);

        let int = Record::Integration(Integration {
            reserved: [0; 24],
            product: spi_flash_product(),
        });
        assert_eq!(Record::decode(&int.encode()).unwrap(), int);
        assert_eq!(int.product(), Some(&spi_flash_product()));
        assert!(!int.is_component());
    }

    #[test]
    fn test_empty_record() {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[63] = 0xFF;
        let record = Record::decode(&bytes).unwrap();
        assert_eq!(record.record_type(), RecordType::Empty);
        assert!(record.product().is_none());
        assert_eq!(record.encode(), bytes);
    }

    #[test]
    fn test_unknown_type() {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[63] = 0x42;
        assert_eq!(Record::decode(&bytes), Err(Error::UnknownType(0x42)));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[..4].copy_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
        bytes[63] = 0x00;
        assert_eq!(Record::decode(&bytes), Err(Error::BadMagic(0xDEAD_BEEF)));
    }

    #[test]
    fn test_bridge_accessors() {
        let record = Record::Bridge(Bridge {
            child: 0x0002_0000,
            component: Component {
                addr_first: 0x0002_0000,
                addr_end: 0x0003_FFFF,
                product: Product {
                    vendor_id: vendor::GSI,
                    device_id: 0xe6a5_42c9,
                    version: 1,
                    date: 0x2012_0305,
                    name: name("WB4-Crossbar-GSI"),
                },
            },
        });
        assert_eq!(record.as_bridge().map(|b| b.child), Some(0x2_0000));
        assert_eq!(record.component().map(|c| c.addr_first), Some(0x2_0000));
        assert!(record.is_component());
        assert_eq!(record.product().unwrap().name(), "WB4-Crossbar-GSI");
    }

    #[test]
    fn test_display_annotates_vendor() {
        let dump = spi_flash_product().to_string();
        assert!(dump.contains("vendor_id      : 0x0000000000007501 (7S)"));
        assert!(dump.contains("name           : WR-SPI-Flash-Update"));
    }
}
