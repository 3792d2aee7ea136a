//! A bus backed by a plain text file, for developing tools without hardware.
//!
//! The file holds one `@0xAAAAAAAA: 0xVVVVVVVV` pair per line. Addresses that aren't listed read
//! as zero; writes update the pair in place (or add it) and the file is rewritten immediately.
use super::{
    Error,
    Transport,
    TransportResult,
};
use nom::{
    bytes::complete::{
        tag,
        tag_no_case,
        take_while_m_n,
    },
    character::complete::space0,
    combinator::{
        all_consuming,
        map_res,
    },
    sequence::{
        preceded,
        terminated,
    },
    IResult,
};
use std::{
    collections::BTreeMap,
    fmt::Write as _,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::trace;

#[derive(Debug)]
pub struct FileMem {
    path: PathBuf,
    memory: BTreeMap<u32, u32>,
}

fn hex_word(input: &str) -> IResult<&str, u32> {
    map_res(
        preceded(
            tag_no_case("0x"),
            take_while_m_n(1, 8, |c: char| c.is_ascii_hexdigit()),
        ),
        |s| u32::from_str_radix(s, 16),
    )(input)
}

fn pair(input: &str) -> IResult<&str, (u32, u32)> {
    let (remaining, addr) = preceded(tag("@"), hex_word)(input)?;
    let (remaining, _) = terminated(tag(":"), space0)(remaining)?;
    let (remaining, value) = all_consuming(terminated(hex_word, space0))(remaining)?;
    Ok((remaining, (addr, value)))
}

impl FileMem {
    /// Open the memory file at `path`, creating an empty one if it doesn't exist
    /// # Errors
    /// Returns an error if the file can't be read or contains malformed lines
    pub fn open<P>(path: P) -> TransportResult<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_path_buf();
        let memory = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Self::parse(&contents)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, memory })
    }

    fn parse(contents: &str) -> TransportResult<BTreeMap<u32, u32>> {
        contents
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| {
                pair(l.trim())
                    .map(|(_, p)| p)
                    .map_err(|_| Error::FileFormat { line: i + 1 })
            })
            .collect()
    }

    fn persist(&self) -> TransportResult<()> {
        let mut contents = String::new();
        for (addr, value) in &self.memory {
            // Infallible for String
            let _ = writeln!(contents, "@0x{addr:08X}: 0x{value:08x}");
        }
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for FileMem {
    fn read32(&mut self, addr: u32) -> TransportResult<u32> {
        let value = self.memory.get(&addr).copied().unwrap_or(0);
        trace!("R: @{addr:#010X}: {value:#010x}");
        Ok(value)
    }

    fn write32(&mut self, addr: u32, value: u32) -> TransportResult<()> {
        trace!("W: @{addr:#010X}: {value:#010x}");
        self.memory.insert(addr, value);
        self.persist()
    }
}
