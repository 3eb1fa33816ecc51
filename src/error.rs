use snafu::Snafu;

/// The public Error type for this library.
#[derive(Debug, Snafu)]
pub struct Error(pub(crate) LibError);

/// The public Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// The internal Result type for this library.
pub(crate) type LibResult<T> = std::result::Result<T, LibError>;

/// Faults reported by the event parser. Each variant is one diagnosable condition; the containing
/// [`LibError::Event`] adds the byte offset and status context around it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventErrorKind {
    /// The delta-time VLQ was truncated or exceeded 4 bytes.
    InvalidDeltaTime,
    /// Input ended immediately after the delta-time, before any status/data byte.
    NoDataFollowingDeltaTime,
    /// Neither the seen byte nor the inherited running status resolved to a usable status byte.
    InvalidStatusByte,
    /// A channel event data byte had its high bit set.
    ChannelInvalidDataByte,
    /// Input ended partway through a channel event's data bytes.
    ChannelLengthExceedsInput,
    /// Input ended while reading a meta/sysex event's type byte or length VLQ.
    SysexOrMetaOverflowInHeader,
    /// The VLQ length field of a meta/sysex event was malformed.
    SysexOrMetaInvalidVlqLength,
    /// Fewer payload bytes were available than the declared length.
    SysexOrMetaLengthExceedsInput,
}

impl std::fmt::Display for EventErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Chunk-header-level faults.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ChunkErrorKind {
    /// Fewer than 8 bytes remained to read a chunk header.
    TooShort,
    /// The 4-byte id contained a byte outside printable ASCII (32-126).
    NonAsciiId,
    /// The declared length does not leave 8 bytes of headroom in a signed 32-bit field.
    LengthExceedsMax,
}

impl std::fmt::Display for ChunkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// MThd-level faults.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HeaderErrorKind {
    /// The chunk id was not `MThd`.
    WrongId,
    /// `length` was below the minimum of 6.
    LengthBelowMin,
    /// `length` exceeded the chunk header's own cap.
    LengthAboveMax,
    /// `format == 0` but `ntrks > 1`.
    FormatNtrksMismatch,
    /// The SMPTE time-code byte was not one of -24, -25, -29, -30.
    BadSmpteTimeCode,
}

impl std::fmt::Display for HeaderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// The internal Error type for this library.
#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub(crate) enum LibError {
    #[snafu(display("{}: error while reading bytes: {}", site, source))]
    Io {
        site: String,
        source: crate::byte_source::ByteError,
    },

    #[snafu(display("{}: error while writing bytes: {}", site, source))]
    Write {
        site: String,
        source: std::io::Error,
    },

    #[snafu(display("{}: The MIDI file is invalid: {}", site, description))]
    InvalidFile { site: String, description: String },

    #[snafu(display(
        "{}: event error at byte {} (status {:#04X}, running-status {:#04X}): {}",
        site,
        consumed,
        effective_status,
        inherited_rs,
        kind
    ))]
    Event {
        site: String,
        kind: EventErrorKind,
        consumed: u64,
        effective_status: u8,
        inherited_rs: u8,
    },

    #[snafu(display("{}: chunk header error: {}", site, kind))]
    Chunk { site: String, kind: ChunkErrorKind },

    #[snafu(display("{}: MThd error: {}", site, kind))]
    Header { site: String, kind: HeaderErrorKind },

    #[snafu(display("{}: track chunk ended without an End-of-Track event", site))]
    MissingEndOfTrack { site: String },

    #[snafu(display("{} unknown error", site))]
    Other { site: String },
}

impl From<LibError> for Error {
    fn from(e: LibError) -> Self {
        Error(e)
    }
}

macro_rules! site {
    () => {
        format!("{}:{}", file!(), line!())
    };
}

macro_rules! io {
    () => {
        crate::error::Io { site: site!() }
    };
}

macro_rules! wr {
    () => {
        crate::error::Write { site: site!() }
    };
}

macro_rules! invalid_file_s {
    () => {
        crate::error::InvalidFile {
            site: site!(),
            description: "[no description]",
        }
    };
    ($msg:expr) => {
        crate::error::InvalidFile {
            site: site!(),
            description: $msg,
        }
    };
    ($fmt:expr, $($arg:expr),+) => {
        crate::error::InvalidFile {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
    };
}

macro_rules! invalid_file_e {
    () => {
        invalid_file_s!().build()
    };
    ($msg:expr) => {
        invalid_file_s!($msg).build()
    };
    ($fmt:expr, $($arg:expr),+) => {
        invalid_file_s!($fmt, $($arg),+).build()
    };
}

macro_rules! invalid_file_r {
    () => {
        Err(invalid_file_e!())
    };
    ($msg:expr) => {
        Err(invalid_file_e!($msg))
    };
    ($fmt:expr, $($arg:expr),+) => {
        Err(invalid_file_e!($fmt, $($arg),+))
    };
}

macro_rules! invalid_file {
    () => {
        return invalid_file_r!();
    };
    ($msg:expr) => {
        return invalid_file_r!($msg)
    };
    ($fmt:expr, $($arg:expr),+) => {
        return invalid_file_r!($fmt, $($arg),+)
    };
}

/// Builds and returns a [`LibError::Event`], capturing the call site automatically.
macro_rules! event_err {
    ($kind:expr, $consumed:expr, $eff:expr, $rs:expr) => {
        crate::error::Event {
            site: site!(),
            kind: $kind,
            consumed: $consumed,
            effective_status: $eff,
            inherited_rs: $rs,
        }
        .build()
    };
}

/// Builds and returns a [`LibError::Chunk`], capturing the call site automatically.
macro_rules! chunk_err {
    ($kind:expr) => {
        crate::error::Chunk {
            site: site!(),
            kind: $kind,
        }
        .build()
    };
}

/// Builds and returns a [`LibError::Header`], capturing the call site automatically.
macro_rules! header_err {
    ($kind:expr) => {
        crate::error::Header {
            site: site!(),
            kind: $kind,
        }
        .build()
    };
}

#[test]
fn site_test() {
    let line = line!() + 1;
    let site = site!();
    assert!(site.contains("error.rs"));
    assert!(site.contains(format!("{}", line).as_str()));
}

#[test]
fn invalid_file_macros_test_no_message() {
    fn foo() -> LibResult<u64> {
        invalid_file!();
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("The MIDI file is invalid"));
}

#[test]
fn invalid_file_macros_test_message() {
    fn foo() -> LibResult<u64> {
        let flerbin = String::from("flerbin");
        invalid_file!(flerbin);
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("flerbin"));
}

#[test]
fn invalid_file_macros_test_fmt() {
    fn foo() -> LibResult<u64> {
        invalid_file!("hello {}, {}", "world", String::from("foo"));
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("hello world, foo"));
}

#[test]
fn event_err_carries_diagnostics() {
    let e: LibError = event_err!(EventErrorKind::InvalidStatusByte, 4, 0xF1, 0x90);
    match &e {
        LibError::Event {
            kind,
            consumed,
            effective_status,
            inherited_rs,
            ..
        } => {
            assert_eq!(*kind, EventErrorKind::InvalidStatusByte);
            assert_eq!(*consumed, 4);
            assert_eq!(*effective_status, 0xF1);
            assert_eq!(*inherited_rs, 0x90);
        }
        _ => panic!("wrong variant"),
    }
}
