//! Parsing of the `.ram` images produced by the LM32 software build (`genraminit`).
//!
//! Every line ends with one 32-bit word written as 8 hex digits; anything before it (the
//! `write` keyword and the word address) is ignored, words are taken in line order.
use super::{
    gunzip,
    Error,
    FirmwareImage,
    ParseError,
};
use std::{
    ffi::OsString,
    path::Path,
    str::from_utf8,
};

const WORD_DIGITS: usize = 8;

#[derive(Debug, PartialEq, Eq)]
pub struct File {
    pub words: Vec<u32>,
    pub md5: [u8; 16],
    pub filename: Option<OsString>,
}

impl FirmwareImage for File {
    fn words(&self) -> &[u32] {
        &self.words
    }

    fn md5(&self) -> &[u8; 16] {
        &self.md5
    }
}

/// Extract the words of a `.ram` image
/// # Errors
/// Returns an error if a line is too short or doesn't end in a hex word
pub fn parse(contents: &[u8]) -> Result<Vec<u32>, Error> {
    let text = from_utf8(contents).map_err(ParseError::from)?;
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end()))
        .filter(|(_, l)| !l.is_empty())
        .map(|(line, l)| -> Result<u32, Error> {
            let digits = l
                .len()
                .checked_sub(WORD_DIGITS)
                .and_then(|start| l.get(start..))
                .ok_or(Error::ParseMatch(line))?;
            Ok(u32::from_str_radix(digits, 16).map_err(ParseError::from)?)
        })
        .collect()
}

impl File {
    /// Build an image from the raw (possibly gzip compressed) contents of a `.ram` file
    /// # Errors
    /// Returns an error on invalid contents
    pub fn from_bytes(contents: Vec<u8>) -> Result<Self, Error> {
        let md5 = md5::compute(&contents);
        let words = parse(&gunzip(contents)?)?;
        Ok(Self {
            words,
            md5: md5.into(),
            filename: None,
        })
    }
}

/// Reads an LM32 `.ram` image
/// # Errors
/// Returns an error on unreadable or invalid files
pub fn read_ram_file<T>(filename: T) -> Result<File, Error>
where
    T: AsRef<Path>,
{
    let contents = std::fs::read(filename.as_ref())?;
    let mut file = File::from_bytes(contents)?;
    file.filename = filename.as_ref().file_name().map(ToOwned::to_owned);
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ram() {
        let image = "write 0 98000000\nwrite 1 D0000000\nwrite 2 78010000\n";
        assert_eq!(
            parse(image.as_bytes()).unwrap(),
            vec![0x9800_0000, 0xD000_0000, 0x7801_0000]
        );
    }

    #[test]
    fn test_bare_words_and_crlf() {
        let image = "deadbeef\r\n\r\n0000002a\r\n";
        let file = File::from_bytes(image.as_bytes().to_vec()).unwrap();
        assert_eq!(file.words, vec![0xDEAD_BEEF, 0x2A]);
    }

    #[test]
    fn test_short_line() {
        assert!(matches!(
            parse(b"write 0 98000000\nbeef\n"),
            Err(Error::ParseMatch(2))
        ));
    }

    #[test]
    fn test_not_hex() {
        assert!(matches!(
            parse(b"write 0 9800000z\n"),
            Err(Error::Parse(ParseError::Integer(_)))
        ));
    }

    #[test]
    fn test_read_ram_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrc.ram");
        std::fs::write(&path, "write 0 98000000\n").unwrap();
        let file = read_ram_file(&path).unwrap();
        assert_eq!(file.filename, Some(OsString::from("wrc.ram")));
        assert_eq!(file.words, vec![0x9800_0000]);
    }
}
