//! Parsing of the Intel-HEX style `.mcs` PROM files produced by the Xilinx tools.
//!
//! Each line is `:` + byte count + 16-bit address + record type + data + checksum, all in hex.
//! Only data records (type 0) contribute to the image; their payloads are concatenated in file
//! order, addresses and extended-address records are ignored. The last line (the end-of-file
//! record) is never interpreted.
use super::{
    gunzip,
    Error,
    FirmwareImage,
    ParseError,
};
use crate::packet::words_from_bytes;
use nom::{
    bytes::complete::{
        tag,
        take_while_m_n,
    },
    combinator::{
        eof,
        map_res,
    },
    multi::many0,
    sequence::terminated,
    IResult,
};
use std::{
    ffi::OsString,
    path::Path,
    str::from_utf8,
};

/// Record type carrying image bytes
pub const DATA_RECORD: u8 = 0x00;

#[derive(Debug, PartialEq, Eq)]
pub struct File {
    pub words: Vec<u32>,
    pub md5: [u8; 16],
    pub filename: Option<OsString>,
    /// Number of data records that went into `words`
    pub data_records: usize,
}

impl FirmwareImage for File {
    fn words(&self) -> &[u32] {
        &self.words
    }

    fn md5(&self) -> &[u8; 16] {
        &self.md5
    }
}

/// One decoded line, before its checksum is validated
#[derive(Debug, PartialEq, Eq)]
struct HexRecord {
    count: u8,
    address: u16,
    kind: u8,
    /// Payload followed by the checksum byte
    bytes: Vec<u8>,
}

fn hex_byte(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()), |s| {
        u8::from_str_radix(s, 16)
    })(input)
}

fn hex_record(input: &str) -> IResult<&str, HexRecord> {
    let (remaining, _) = tag(":")(input)?;
    let (remaining, count) = hex_byte(remaining)?;
    let (remaining, addr_hi) = hex_byte(remaining)?;
    let (remaining, addr_lo) = hex_byte(remaining)?;
    let (remaining, kind) = hex_byte(remaining)?;
    let (remaining, bytes) = terminated(many0(hex_byte), eof)(remaining)?;
    Ok((
        remaining,
        HexRecord {
            count,
            address: u16::from_be_bytes([addr_hi, addr_lo]),
            kind,
            bytes,
        },
    ))
}

impl HexRecord {
    /// Check length and checksum, returning the payload
    fn validate(mut self, line: usize) -> Result<Self, ParseError> {
        let Some(expected) = self.bytes.pop() else {
            return Err(ParseError::Length {
                line,
                declared: self.count.into(),
                found: 0,
            });
        };
        if self.bytes.len() != usize::from(self.count) {
            return Err(ParseError::Length {
                line,
                declared: self.count.into(),
                found: self.bytes.len(),
            });
        }
        let [hi, lo] = self.address.to_be_bytes();
        let header = self
            .count
            .wrapping_add(hi)
            .wrapping_add(lo)
            .wrapping_add(self.kind);
        let sum = self
            .bytes
            .iter()
            .fold(header, |acc, &b| acc.wrapping_add(b));
        let computed = sum.wrapping_neg();
        if computed != expected {
            return Err(ParseError::Checksum {
                line,
                expected,
                computed,
            });
        }
        Ok(self)
    }
}

/// Extract the concatenated data bytes of an MCS file, returning them with the number of data
/// records seen
/// # Errors
/// Returns an error on malformed lines, length mismatches or bad checksums
pub fn parse(contents: &[u8]) -> Result<(Vec<u8>, usize), Error> {
    let text = from_utf8(contents).map_err(ParseError::from)?;
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end()))
        .filter(|(_, l)| !l.is_empty())
        .collect();
    let mut data = vec![];
    let mut data_records = 0;
    // The final line is the end-of-file record
    for &(line, raw) in lines.iter().take(lines.len().saturating_sub(1)) {
        let (_, record) = hex_record(raw).map_err(|_| Error::ParseMatch(line))?;
        let record = record.validate(line)?;
        if record.kind == DATA_RECORD {
            data.extend_from_slice(&record.bytes);
            data_records += 1;
        }
    }
    Ok((data, data_records))
}

impl File {
    /// Build an image from the raw (possibly gzip compressed) contents of an MCS file
    /// # Errors
    /// Returns an error on invalid MCS contents
    pub fn from_bytes(contents: Vec<u8>) -> Result<Self, Error> {
        let md5 = md5::compute(&contents);
        let contents = gunzip(contents)?;
        let (data, data_records) = parse(&contents)?;
        Ok(Self {
            words: words_from_bytes(&data),
            md5: md5.into(),
            filename: None,
            data_records,
        })
    }
}

/// Reads a Xilinx MCS PROM file
/// # Errors
/// Returns an error on unreadable or invalid MCS files
pub fn read_mcs_file<T>(filename: T) -> Result<File, Error>
where
    T: AsRef<Path>,
{
    let contents = std::fs::read(filename.as_ref())?;
    let mut file = File::from_bytes(contents)?;
    file.filename = filename.as_ref().file_name().map(ToOwned::to_owned);
    Ok(file)
}
