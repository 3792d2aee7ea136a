//! Remote programming of the configuration SPI flash through the Seven Solutions
//! `WR-SPI-Flash-Update` core.
//!
//! The core runs the flash protocol itself; the host selects a mode, streams the image into the
//! core's FIFO and polls its status register. A session always goes
//! `Reset -> ModeSelect`, then check-id and verify runs go straight to `DoneWait` while updates
//! go through `EraseWait -> ProgramStream -> DoneWait` and finally warm-reboot the FPGA into the
//! new image through ICAPE2.
//!
//! Timeouts are counted in whole polling intervals, so the real time spent waiting is the budget
//! plus however long the bus round-trips take.
use super::{
    with_transport,
    LockError,
    SdbCore,
};
use crate::{
    poll::{
        Poll,
        Sleep,
        ThreadSleep,
        Wait,
    },
    sdb::SdbTree,
    transport::{
        self,
        Completion,
        Deserialize,
        RegisterOffset,
        Serialize,
        Transport,
        TransportResult,
    },
};
use indicatif::ProgressBar;
use num_derive::{
    FromPrimitive,
    ToPrimitive,
};
use num_traits::ToPrimitive as _;
use packed_struct::prelude::*;
use sdb_utils::{
    firmware::FirmwareImage,
    icap::iprog_sequence,
    packet::{
        Packet,
        FIFO_WORD_SIZE,
        PACKET_WORDS,
    },
    sdb::vendor,
};
use sdbfpga_derive::{
    offset,
    RegisterSerde,
};
use std::{
    cmp::Ordering,
    fmt::{
        self,
        Display,
    },
    str::FromStr,
    sync::{
        Arc,
        Mutex,
        Weak,
    },
    time::Duration,
};
use thiserror::Error;
use tracing::{
    debug,
    info,
    warn,
};

/// Device ID of the `WR-SPI-Flash-Update` core
pub const DEVICE_ID: u32 = 0xae5f;

/// Data register, the write side of the programming FIFO
pub const DATA: u32 = 0x8;
/// ICAPE2 input register
pub const ICAP_IN: u32 = 0x10;
/// ICAPE2 output register
pub const ICAP_OUT: u32 = 0x14;
/// ICAPE2 control register
pub const ICAP_CTRL: u32 = 0x18;
/// Number of words the core pulled out of its FIFO so far
pub const RECEIVED_WORDS: u32 = 0x1C;
/// The bits of the status register that flag an error
pub const ERROR_MASK: u32 = 0xF8;

#[offset(0x0)]
#[derive(PackedStruct, RegisterSerde, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "4")]
pub struct Control {
    #[packed_field(bits = "29")]
    pub verify_only: bool,
    #[packed_field(bits = "30")]
    pub check_id_only: bool,
    #[packed_field(bits = "31")]
    pub reset_enable: bool,
}

#[offset(0x4)]
#[derive(PackedStruct, RegisterSerde, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "4")]
pub struct Status {
    #[packed_field(bits = "0..=15", endian = "msb")]
    pub reserved: u16,
    #[packed_field(bits = "16")]
    pub program_switch_word_ok: bool,
    #[packed_field(bits = "17")]
    pub verify_ok: bool,
    #[packed_field(bits = "18")]
    pub program_ok: bool,
    #[packed_field(bits = "19")]
    pub erase_ok: bool,
    #[packed_field(bits = "20")]
    pub erase_switch_word_ok: bool,
    #[packed_field(bits = "21")]
    pub check_id_ok: bool,
    #[packed_field(bits = "22")]
    pub initialize_ok: bool,
    #[packed_field(bits = "23")]
    pub started: bool,
    #[packed_field(bits = "24")]
    pub err_crc: bool,
    #[packed_field(bits = "25")]
    pub err_timeout: bool,
    #[packed_field(bits = "26")]
    pub err_program: bool,
    #[packed_field(bits = "27")]
    pub err_erase: bool,
    #[packed_field(bits = "28")]
    pub err_idcode: bool,
    #[packed_field(bits = "29")]
    pub err: bool,
    #[packed_field(bits = "30")]
    pub done: bool,
    #[packed_field(bits = "31")]
    pub ready_busy: bool,
}

#[offset(0xC)]
#[derive(PackedStruct, RegisterSerde, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "4")]
pub struct FifoStatus {
    /// Active low FIFO reset
    #[packed_field(bits = "0")]
    pub reset_n: bool,
    #[packed_field(bits = "22")]
    pub write_full: bool,
    #[packed_field(bits = "23")]
    pub read_empty: bool,
    /// Words waiting in the FIFO
    #[packed_field(bits = "24..=31")]
    pub write_count: u8,
}

/// Status register bit names, LSB first
const STATUS_NAMES: [&str; 16] = [
    "READY_BUSY",
    "DONE",
    "ERR",
    "ERR_IDCODE",
    "ERR_ERASE",
    "ERR_PROGRAM",
    "ERR_TIMEOUT",
    "ERR_CRC",
    "STARTED",
    "InitializeOK",
    "CheckIDOK",
    "EraseSwitchWordOK",
    "EraseOK",
    "ProgramOK",
    "VerifyOK",
    "ProgramSwitchWordOK",
];

/// Render a raw status word as `REG_SR=0x........ : NAME, NAME`
#[must_use]
pub fn describe_status(raw: u32) -> String {
    let names: Vec<&str> = STATUS_NAMES
        .iter()
        .enumerate()
        .filter(|(bit, _)| raw & (1 << bit) != 0)
        .map(|(_, name)| *name)
        .collect();
    format!("REG_SR={raw:#010x} : {}", names.join(", "))
}

impl Status {
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        // Every bit is mapped, so unpacking can't fail
        Self::unpack(&raw.to_be_bytes()).unwrap_or_default()
    }

    #[must_use]
    pub fn raw(&self) -> u32 {
        u32::from_be_bytes(self.serialize())
    }

    /// Only the error flags of this snapshot
    #[must_use]
    pub fn errors(&self) -> Self {
        Self::from_raw(self.raw() & ERROR_MASK)
    }

    /// This snapshot as `REG_SR=0x........ : NAME, NAME`
    #[must_use]
    pub fn describe(&self) -> String {
        describe_status(self.raw())
    }
}

/// The operation the core runs once out of reset. The discriminant is the control word.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ToPrimitive, FromPrimitive)]
pub enum Mode {
    /// Erase, program and verify the flash
    Update = 0x1,
    /// Only read back and check the flash ID code
    CheckIdOnly = 0x3,
    /// Only verify the current flash contents
    VerifyOnly = 0x5,
}

impl From<Mode> for Control {
    fn from(mode: Mode) -> Self {
        Self {
            verify_only: mode == Mode::VerifyOnly,
            check_id_only: mode == Mode::CheckIdOnly,
            reset_enable: true,
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update" => Ok(Mode::Update),
            "cido" => Ok(Mode::CheckIdOnly),
            "vo" => Ok(Mode::VerifyOnly),
            _ => Err(format!(
                "Unknown mode `{s}`, expected one of `update`, `cido` or `vo`"
            )),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Update => write!(f, "UPDATE"),
            Mode::CheckIdOnly => write!(f, "Check ID Only"),
            Mode::VerifyOnly => write!(f, "Verify Only"),
        }
    }
}

/// Steps of a programming session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Reset,
    ModeSelect,
    EraseWait,
    ProgramStream,
    DoneWait,
    Reboot,
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Reset => "reset",
            Phase::ModeSelect => "mode select",
            Phase::EraseWait => "erase",
            Phase::ProgramStream => "programming",
            Phase::DoneWait => "done wait",
            Phase::Reboot => "reboot",
        };
        write!(f, "{name}")
    }
}

/// Timing and behavior of a programming session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FlashConfig {
    /// Interval between status polls while erasing and waiting for DONE
    pub poll_interval: Duration,
    /// Polls to wait for the erase to finish
    pub erase_timeout_polls: usize,
    /// Idle polls to wait for DONE. Any status change starts the count over.
    pub end_timeout_polls: usize,
    /// Pause after every packet and between polls of a full FIFO
    pub fifo_poll_interval: Duration,
    /// Consecutive polls of a full FIFO before giving up on the stream
    pub program_timeout_polls: usize,
    /// Flash address of the image the FPGA reboots into
    pub warm_boot_address: u32,
    /// Reboot the FPGA into the new image after a successful update
    pub reboot: bool,
    /// Draw a progress bar while streaming the image
    pub progress: bool,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            erase_timeout_polls: 50,
            end_timeout_polls: 10,
            fifo_poll_interval: Duration::from_millis(1),
            program_timeout_polls: 10_000,
            warm_boot_address: 0,
            reboot: true,
            progress: false,
        }
    }
}

/// What the session had done when it failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub phase: Phase,
    /// The last status read from the core
    pub status: Status,
    pub packets_written: usize,
    pub words_written: usize,
    pub expected_words: usize,
    /// The core's received word counter, if it could still be read
    pub received_words: Option<u32>,
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}; {} packets ({}/{} words) written",
            self.status.describe(),
            self.packets_written, self.words_written, self.expected_words
        )?;
        if let Some(rwc) = self.received_words {
            write!(f, ", received words={rwc} ({rwc:#010x})")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport failure: {source}")]
    Transport {
        source: transport::Error,
        /// Set when the failure interrupted a session
        diagnostics: Option<Box<Diagnostics>>,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("No WR-SPI-Flash-Update core on the bus")]
    NotFound,
    #[error("Core address {0:#x} does not fit on the 32-bit bus")]
    AddressRange(u64),
    #[error("An update needs a non-empty image")]
    EmptyImage,
    #[error("Packet {index} holds {words} words, more than the FIFO takes at once")]
    OversizedPacket { index: usize, words: usize },
    #[error("Timeout in {} after {polls} polls ({diagnostics})", .diagnostics.phase)]
    Timeout {
        polls: usize,
        diagnostics: Box<Diagnostics>,
    },
    #[error("An error was detected {} ({diagnostics})", .diagnostics.status.errors().describe())]
    Device { diagnostics: Box<Diagnostics> },
    #[error("Overflowing packets ({index} > {packets})")]
    Overflow {
        index: usize,
        packets: usize,
        diagnostics: Box<Diagnostics>,
    },
}

impl Error {
    /// The session state captured when a running session failed
    #[must_use]
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Error::Timeout { diagnostics, .. }
            | Error::Device { diagnostics }
            | Error::Overflow { diagnostics, .. } => Some(diagnostics),
            Error::Transport { diagnostics, .. } => diagnostics.as_deref(),
            _ => None,
        }
    }
}

impl From<transport::Error> for Error {
    fn from(source: transport::Error) -> Self {
        Error::Transport {
            source,
            diagnostics: None,
        }
    }
}

/// Summary of a successful session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub mode: Mode,
    /// Status when the core reported DONE
    pub status: Status,
    pub packets_written: usize,
    pub words_written: usize,
    pub rebooted: bool,
}

/// The `WR-SPI-Flash-Update` core
#[derive(Debug)]
pub struct SpiFlash<T, S = ThreadSleep> {
    /// Upwards pointer to the shared transport
    transport: Weak<Mutex<T>>,
    base: u32,
    config: FlashConfig,
    sleep: S,
}

impl<T, S> SdbCore for SpiFlash<T, S> {
    const VENDOR_ID: u64 = vendor::SEVEN_SOLUTIONS;
    const DEVICE_ID: u32 = DEVICE_ID;
    const NAME: &'static str = "WR-SPI-Flash-Update";
}

impl<T> SpiFlash<T>
where
    T: Transport,
{
    #[must_use]
    pub fn new(transport: &Arc<Mutex<T>>, base: u32) -> Self {
        Self {
            transport: Arc::downgrade(transport),
            base,
            config: FlashConfig::default(),
            sleep: ThreadSleep,
        }
    }

    /// Builds a [`SpiFlash`] for the first flash core in `tree`
    /// # Errors
    /// Returns an error if there is no flash core or it's out of reach of the bus
    pub fn from_sdb(transport: &Arc<Mutex<T>>, tree: &SdbTree) -> Result<Self, Error> {
        let found = Self::locate(tree);
        let first = found.first().ok_or(Error::NotFound)?;
        if found.len() > 1 {
            warn!(
                "{} flash cores on the bus, using the one at {}",
                found.len(),
                first.bus_path
            );
        }
        let base = u32::try_from(first.address).map_err(|_| Error::AddressRange(first.address))?;
        debug!("{} at {base:#010x} ({})", Self::NAME, first.bus_path);
        Ok(Self::new(transport, base))
    }
}

impl<T, S> SpiFlash<T, S>
where
    T: Transport,
    S: Sleep,
{
    #[must_use]
    pub fn with_config(mut self, config: FlashConfig) -> Self {
        self.config = config;
        self
    }

    /// Swap how the session waits between polls
    #[must_use]
    pub fn with_sleep<S2>(self, sleep: S2) -> SpiFlash<T, S2>
    where
        S2: Sleep,
    {
        SpiFlash {
            transport: self.transport,
            base: self.base,
            config: self.config,
            sleep,
        }
    }

    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[must_use]
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    #[must_use]
    pub fn sleeper(&self) -> &S {
        &self.sleep
    }

    /// Have the core check the flash ID code
    /// # Errors
    /// Returns an error on transport errors, timeouts or if the core flags an error
    pub fn check_id(&mut self) -> Result<Report, Error> {
        self.run(Mode::CheckIdOnly, &[])
    }

    /// Have the core verify the current flash contents
    /// # Errors
    /// Returns an error on transport errors, timeouts or if the core flags an error
    pub fn verify(&mut self) -> Result<Report, Error> {
        self.run(Mode::VerifyOnly, &[])
    }

    /// Erase the flash, program `image` and reboot into it
    /// # Errors
    /// Returns an error on empty images, transport errors, timeouts or if the core flags an
    /// error. A failed update leaves the flash partially written.
    pub fn update<I>(&mut self, image: &I) -> Result<Report, Error>
    where
        I: FirmwareImage + ?Sized,
    {
        info!(
            "Updating flash at {:#010x} with image {}",
            self.base,
            image.md5_string()
        );
        let packets = image.packets(PACKET_WORDS);
        self.update_packets(&packets)
    }

    /// [`SpiFlash::update`] with an image that was already split into packets
    /// # Errors
    /// See [`SpiFlash::update`]
    pub fn update_packets(&mut self, packets: &[Packet]) -> Result<Report, Error> {
        self.run(Mode::Update, packets)
    }

    /// Run a full session in `mode`. Only updates use `packets`.
    /// # Errors
    /// Returns an error if any phase fails
    pub fn run(&mut self, mode: Mode, packets: &[Packet]) -> Result<Report, Error> {
        if mode == Mode::Update {
            if packets.iter().all(|p| p.is_empty()) {
                return Err(Error::EmptyImage);
            }
            if let Some((index, p)) = packets
                .iter()
                .enumerate()
                .find(|(_, p)| p.len() > PACKET_WORDS)
            {
                return Err(Error::OversizedPacket {
                    index,
                    words: p.len(),
                });
            }
        }
        let (base, config) = (self.base, &self.config);
        let sleep = &mut self.sleep;
        with_transport(&self.transport, |transport| {
            Session {
                transport,
                sleep,
                base,
                config,
                mode,
                packets,
                phase: Phase::Reset,
                status: Status::default(),
                packets_written: 0,
                words_written: 0,
            }
            .run()
        })
    }

    /// Read the status register
    /// # Errors
    /// Returns an error on transport errors
    pub fn status(&self) -> Result<Status, Error> {
        let base = self.base;
        with_transport(&self.transport, |t| Ok(t.read_reg(base)?))
    }

    /// Read the number of words the core has received since the last FIFO reset
    /// # Errors
    /// Returns an error on transport errors
    pub fn received_words(&self) -> Result<u32, Error> {
        let base = self.base;
        with_transport(&self.transport, |t| Ok(t.read32(base + RECEIVED_WORDS)?))
    }

    /// Warm-reboot the FPGA into the image at the configured warm boot address
    /// # Errors
    /// Returns an error if the transport can't be locked
    pub fn reboot(&self) -> Result<(), Error> {
        let (base, warm_boot) = (self.base, self.config.warm_boot_address);
        with_transport(&self.transport, |t| Ok(iprog(t, base, warm_boot)?))
    }
}

/// Send the ICAPE2 IPROG sequence. The FPGA reconfigures immediately, so the writes are silent.
fn iprog<T>(transport: &mut T, base: u32, warm_boot: u32) -> TransportResult<()>
where
    T: Transport + ?Sized,
{
    transport.block_write(
        base + ICAP_IN,
        &iprog_sequence(warm_boot),
        0,
        Completion::Silent,
    )
}

/// How the program stream ended
enum StreamEnd {
    AllSent,
    ProgramOk,
    DeviceError,
    Overflow,
}

/// One programming run, owning the bus for its duration
struct Session<'a, T: ?Sized, S: ?Sized> {
    transport: &'a mut T,
    sleep: &'a mut S,
    base: u32,
    config: &'a FlashConfig,
    mode: Mode,
    packets: &'a [Packet],
    phase: Phase,
    status: Status,
    packets_written: usize,
    words_written: usize,
}

impl<'a, T, S> Session<'a, T, S>
where
    T: Transport + ?Sized,
    S: Sleep + ?Sized,
{
    fn enter(&mut self, phase: Phase) {
        debug!("Entering {phase}");
        self.phase = phase;
    }

    /// Run every phase. Bus failures carry the session state like any other failure.
    fn run(mut self) -> Result<Report, Error> {
        match self.phases() {
            Err(Error::Transport {
                source,
                diagnostics: None,
            }) => {
                warn!("Bus failure in {}: {source}", self.phase);
                Err(Error::Transport {
                    source,
                    diagnostics: Some(self.diagnostics()),
                })
            }
            res => res,
        }
    }

    fn phases(&mut self) -> Result<Report, Error> {
        info!("{} mode", self.mode);
        self.enter(Phase::Reset);
        self.transport.write_reg(self.base, &Control::default())?;
        self.transport
            .write_reg(self.base, &FifoStatus::default())?;
        self.transport.write_reg(
            self.base,
            &FifoStatus {
                reset_n: true,
                ..FifoStatus::default()
            },
        )?;

        self.enter(Phase::ModeSelect);
        debug!("Control word {:#x}", self.mode.to_u32().unwrap_or_default());
        self.transport
            .write_reg(self.base, &Control::from(self.mode))?;

        if self.mode == Mode::Update {
            self.erase()?;
            self.program()?;
        }
        let status = self.done()?;
        info!("DONE {}", status.describe());

        let rebooted =
            self.mode == Mode::Update && status.program_switch_word_ok && self.config.reboot;
        if rebooted {
            self.enter(Phase::Reboot);
            info!("Rebooting");
            iprog(&mut *self.transport, self.base, self.config.warm_boot_address)?;
        }
        Ok(Report {
            mode: self.mode,
            status,
            packets_written: self.packets_written,
            words_written: self.words_written,
            rebooted,
        })
    }

    fn erase(&mut self) -> Result<(), Error> {
        self.enter(Phase::EraseWait);
        info!("Erasing");
        let wait = Wait::new(self.config.poll_interval, self.config.erase_timeout_polls);
        let (transport, base, status) = (&mut *self.transport, self.base, &mut self.status);
        let outcome = wait.until(&mut *self.sleep, || -> Result<Poll<Status>, Error> {
            let sr: Status = transport.read_reg(base)?;
            if sr != *status {
                debug!("{}", sr.describe());
            }
            *status = sr;
            Ok(if sr.err || sr.erase_ok {
                Poll::Ready(sr)
            } else {
                Poll::Pending
            })
        })?;
        match outcome {
            None => Err(self.timeout(wait)),
            Some(sr) if sr.err => Err(self.device_error()),
            Some(_) => {
                debug!("Erase OK");
                Ok(())
            }
        }
    }

    fn program(&mut self) -> Result<(), Error> {
        self.enter(Phase::ProgramStream);
        info!("Programming {} packets", self.packets.len());
        let bar = if self.config.progress {
            ProgressBar::new(self.packets.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_message("Programming flash");

        let wait = Wait::new(
            self.config.fifo_poll_interval,
            self.config.program_timeout_polls,
        );
        let (transport, base, packets) = (&mut *self.transport, self.base, self.packets);
        let (status, written, words) = (
            &mut self.status,
            &mut self.packets_written,
            &mut self.words_written,
        );
        let outcome = wait.until(&mut *self.sleep, || -> Result<Poll<StreamEnd>, Error> {
            let sr: Status = transport.read_reg(base)?;
            *status = sr;
            if sr.err {
                return Ok(Poll::Ready(StreamEnd::DeviceError));
            }
            if sr.program_ok {
                return Ok(Poll::Ready(StreamEnd::ProgramOk));
            }
            // A packet only goes out once half the FIFO is free
            let fifo: FifoStatus = transport.read_reg(base)?;
            if usize::from(fifo.write_count) >= FIFO_WORD_SIZE - PACKET_WORDS {
                return Ok(Poll::Pending);
            }
            match (*written).cmp(&packets.len()) {
                Ordering::Less => {
                    let packet = &packets[*written];
                    transport.block_write(base + DATA, packet, 0, Completion::Acknowledged)?;
                    *written += 1;
                    *words += packet.len();
                    bar.inc(1);
                    Ok(Poll::Progress)
                }
                Ordering::Equal => Ok(Poll::Ready(StreamEnd::AllSent)),
                Ordering::Greater => Ok(Poll::Ready(StreamEnd::Overflow)),
            }
        })?;
        bar.finish();

        match outcome {
            None => Err(self.timeout(wait)),
            Some(StreamEnd::DeviceError) => Err(self.device_error()),
            Some(StreamEnd::Overflow) => Err(Error::Overflow {
                index: self.packets_written,
                packets: self.packets.len(),
                diagnostics: self.diagnostics(),
            }),
            Some(StreamEnd::ProgramOk) => {
                if self.packets_written < self.packets.len() {
                    warn!(
                        "Core reported ProgramOK after {} of {} packets",
                        self.packets_written,
                        self.packets.len()
                    );
                }
                Ok(())
            }
            Some(StreamEnd::AllSent) => {
                debug!(
                    "Packets written: {} ({} words)",
                    self.packets_written, self.words_written
                );
                Ok(())
            }
        }
    }

    fn done(&mut self) -> Result<Status, Error> {
        self.enter(Phase::DoneWait);
        debug!("Waiting DONE... {}", self.status.describe());
        let wait = Wait::new(self.config.poll_interval, self.config.end_timeout_polls);
        let (transport, base, status) = (&mut *self.transport, self.base, &mut self.status);
        let mut last = None;
        let outcome = wait.until(&mut *self.sleep, || -> Result<Poll<Status>, Error> {
            let sr: Status = transport.read_reg(base)?;
            *status = sr;
            if sr.done {
                return Ok(Poll::Ready(sr));
            }
            Ok(match last.replace(sr) {
                Some(prev) if prev != sr => {
                    debug!("{}", sr.describe());
                    Poll::Progress
                }
                _ => Poll::Pending,
            })
        })?;
        match outcome {
            None => Err(self.timeout(wait)),
            Some(sr) if sr.err => Err(self.device_error()),
            Some(sr) => Ok(sr),
        }
    }

    fn diagnostics(&mut self) -> Box<Diagnostics> {
        let received_words = match self.transport.read32(self.base + RECEIVED_WORDS) {
            Ok(rwc) => Some(rwc),
            Err(e) => {
                warn!("Could not read the received word counter: {e}");
                None
            }
        };
        let diagnostics = Diagnostics {
            phase: self.phase,
            status: self.status,
            packets_written: self.packets_written,
            words_written: self.words_written,
            expected_words: self.packets.iter().map(|p| p.len()).sum(),
            received_words,
        };
        warn!("Session failed: {diagnostics}");
        Box::new(diagnostics)
    }

    fn timeout(&mut self, wait: Wait) -> Error {
        Error::Timeout {
            polls: wait.max_polls,
            diagnostics: self.diagnostics(),
        }
    }

    fn device_error(&mut self) -> Error {
        Error::Device {
            diagnostics: self.diagnostics(),
        }
    }
}
