//! Firmware images that get streamed over the bus, either into the SPI flash programmer or into
//! the RAM of a soft CPU
use crate::packet::{
    packetize,
    words_from_bytes,
    Packet,
};
use flate2::bufread::GzDecoder;
use std::{
    ffi::OsString,
    io::Read,
    path::Path,
};
use thiserror::Error;

pub mod mcs;
pub mod ram;

/// Leading bytes of a gzip stream (magic plus the deflate method)
pub const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Line {0} failed to match the record grammar")]
    ParseMatch(usize),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid UTF8 while parsing a string")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Invalid integer")]
    Integer(#[from] std::num::ParseIntError),
    #[error("Line {line} declares {declared} data bytes but carries {found}")]
    Length {
        line: usize,
        declared: usize,
        found: usize,
    },
    #[error("Checksum mismatch on line {line}: record says {expected:#04x}, data sums to {computed:#04x}")]
    Checksum { line: usize, expected: u8, computed: u8 },
}

/// Anything that can be written word by word to the bus must implement [`FirmwareImage`]
pub trait FirmwareImage {
    /// The image as big-endian 32-bit words, in the order they are written
    fn words(&self) -> &[u32];

    /// Hash of the file the image was read from, used to identify what was programmed
    fn md5(&self) -> &[u8; 16];

    /// Get a string representation of the MD5 hash
    fn md5_string(&self) -> String {
        self.md5().iter().map(|&v| format!("{v:02x}")).collect()
    }

    /// Split the image into packets of `packet_words` words
    fn packets(&self, packet_words: usize) -> Vec<Packet> {
        packetize(self.words(), packet_words)
    }

    fn is_empty(&self) -> bool {
        self.words().is_empty()
    }
}

/// A raw binary image, packed as-is into big-endian words
#[derive(Debug, PartialEq, Eq)]
pub struct Binary {
    pub words: Vec<u32>,
    pub md5: [u8; 16],
    pub filename: Option<OsString>,
}

impl Binary {
    #[must_use]
    pub fn from_bytes(contents: &[u8]) -> Self {
        Self {
            words: words_from_bytes(contents),
            md5: md5::compute(contents).into(),
            filename: None,
        }
    }
}

impl FirmwareImage for Binary {
    fn words(&self) -> &[u32] {
        &self.words
    }

    fn md5(&self) -> &[u8; 16] {
        &self.md5
    }
}

/// Reads a raw binary image (like a `.bin` written by `write_cfgmem`)
/// # Errors
/// Returns an error if the file can't be read or fails to decompress
pub fn read_bin_file<T>(filename: T) -> Result<Binary, Error>
where
    T: AsRef<Path>,
{
    let contents = std::fs::read(filename.as_ref())?;
    let mut image = Binary::from_bytes(&gunzip(contents)?);
    image.filename = filename.as_ref().file_name().map(ToOwned::to_owned);
    Ok(image)
}

/// Decompress `contents` if it is a gzip stream, otherwise hand it back untouched
pub(crate) fn gunzip(contents: Vec<u8>) -> Result<Vec<u8>, Error> {
    if contents.starts_with(&GZIP_MAGIC) {
        let mut z = GzDecoder::new(&contents[..]);
        let mut decompressed = vec![];
        z.read_to_end(&mut decompressed)?;
        Ok(decompressed)
    } else {
        Ok(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{
        write::GzEncoder,
        Compression,
    };
    use std::io::Write;

    #[test]
    fn test_binary_image() {
        let image = Binary::from_bytes(&[0xAA, 0x99, 0x55, 0x66, 0x20]);
        assert_eq!(image.words(), &[0xAA99_5566, 0x20EE_EEEE]);
        assert_eq!(image.packets(1).len(), 2);
        assert!(!image.is_empty());
    }

    #[test]
    fn test_md5_string() {
        let image = Binary::from_bytes(b"");
        assert_eq!(image.md5_string(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_gunzip() {
        let mut z = GzEncoder::new(Vec::new(), Compression::default());
        z.write_all(b"hello flash").unwrap();
        let compressed = z.finish().unwrap();
        assert!(compressed.starts_with(&GZIP_MAGIC));
        assert_eq!(gunzip(compressed).unwrap(), b"hello flash");
        assert_eq!(gunzip(b"plain".to_vec()).unwrap(), b"plain");
    }
}
