//! Chunk header classification, grounded in
//! `original_source/generic_chunk_low_level.h`/`.cpp`: a chunk id of `MThd` or `MTrk` is
//! recognized by name; anything else is `Unknown`, accepted so long as its first 4 bytes are
//! printable ASCII (32-126). The length field must leave room for a future 8-byte chunk header
//! within a signed 32-bit field.

use crate::byte_source::ByteSource;
use crate::error::{ChunkErrorKind, LibResult};
use snafu::ResultExt;

/// The largest length a chunk header may declare: `i32::MAX - 8`.
pub(crate) const LENGTH_MAX: u32 = (i32::MAX - 8) as u32;

/// A chunk header's id, classified the way `original_source` classifies it: the two recognized
/// tags by name, everything else as `Unknown` (carrying its raw 4 bytes for round-tripping).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum ChunkId {
    MThd,
    MTrk,
    Unknown([u8; 4]),
}

impl ChunkId {
    fn classify(tag: [u8; 4]) -> Self {
        match &tag {
            b"MThd" => ChunkId::MThd,
            b"MTrk" => ChunkId::MTrk,
            _ => ChunkId::Unknown(tag),
        }
    }

    pub(crate) fn tag(&self) -> [u8; 4] {
        match self {
            ChunkId::MThd => *b"MThd",
            ChunkId::MTrk => *b"MTrk",
            ChunkId::Unknown(tag) => *tag,
        }
    }
}

/// A decoded chunk header: its id and the declared length of the body that follows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ChunkHeader {
    pub id: ChunkId,
    pub length: u32,
}

/// Reads and validates an 8-byte chunk header (4-byte id, 4-byte BE length). Running out of input
/// anywhere in those 8 bytes is reported as `ChunkErrorKind::TooShort` rather than a generic I/O
/// error, per `spec.md` §4.7/§7's "input shorter than 8 bytes" fault.
pub(crate) fn read_chunk_header<S: ByteSource>(src: &mut S) -> LibResult<ChunkHeader> {
    let tag = src.read4().map_err(|_| chunk_err!(ChunkErrorKind::TooShort))?;

    if !is_printable_ascii(&tag) && !matches!(ChunkId::classify(tag), ChunkId::MThd | ChunkId::MTrk)
    {
        return Err(chunk_err!(ChunkErrorKind::NonAsciiId));
    }

    let length = src
        .read_u32()
        .map_err(|_| chunk_err!(ChunkErrorKind::TooShort))?;
    if length > LENGTH_MAX {
        return Err(chunk_err!(ChunkErrorKind::LengthExceedsMax));
    }

    Ok(ChunkHeader {
        id: ChunkId::classify(tag),
        length,
    })
}

fn is_printable_ascii(tag: &[u8; 4]) -> bool {
    tag.iter().all(|&b| (32..127).contains(&b))
}

pub(crate) fn write_chunk_header<W: std::io::Write>(
    w: &mut W,
    id: &ChunkId,
    length: u32,
) -> LibResult<()> {
    w.write_all(&id.tag()).context(wr!())?;
    w.write_all(&length.to_be_bytes()).context(wr!())?;
    Ok(())
}
