//! The `MThd` header chunk: format, track count, division, and any vendor-extension bytes beyond
//! the six required fields. Grounded in `original_source/include/mthd_t.h`; the SMPTE branch of
//! `Division` is fully modeled here (frame rate and subframe resolution), not stubbed out.

use crate::chunk::{self, ChunkId};
use crate::error::{self, HeaderErrorKind, LibResult};
use snafu::ResultExt;
use std::io::Write;

/// The smallest legal `MThd` chunk length: the six fixed fields (format, ntrks, division), no
/// extension bytes.
pub const MIN_LENGTH: u32 = 6;

/// The largest length an `MThd` chunk may declare, shared with the generic chunk-header cap
/// (`2^31 - 9`).
pub const MAX_LENGTH: u32 = chunk::LENGTH_MAX;

/// `<format>`: whether the file is a single track, several simultaneous tracks, or several
/// independent patterns.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Format {
    /// 0: a single multi-channel track.
    Single = 0,
    /// 1: one or more simultaneous tracks, played together.
    Multi = 1,
    /// 2: one or more sequentially independent single-track patterns.
    Sequential = 2,
}

impl Default for Format {
    fn default() -> Self {
        Format::Multi
    }
}

impl Format {
    fn from_u16(value: u16) -> LibResult<Self> {
        match value {
            0 => Ok(Format::Single),
            1 => Ok(Format::Multi),
            2 => Ok(Format::Sequential),
            _ => error::Other { site: site!() }.fail(),
        }
    }

    fn to_u16(self) -> u16 {
        self as u16
    }
}

// Ticks per quarter note, the metrical-time form of <division>: [1, 32767].
clamp!(QuarterNoteDivision, u16, 1, 32767, 1024, pub);

/// The four SMPTE/MIDI time code frame rates `<division>`'s high byte may specify, stored in
/// two's complement as one of `-24`, `-25`, `-29`, or `-30`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FrameRate {
    N24,
    N25,
    N29,
    N30,
}

impl FrameRate {
    fn from_i8(value: i8) -> Option<Self> {
        match value {
            -24 => Some(FrameRate::N24),
            -25 => Some(FrameRate::N25),
            -29 => Some(FrameRate::N29),
            -30 => Some(FrameRate::N30),
            _ => None,
        }
    }

    fn to_i8(self) -> i8 {
        match self {
            FrameRate::N24 => -24,
            FrameRate::N25 => -25,
            FrameRate::N29 => -29,
            FrameRate::N30 => -30,
        }
    }
}

/// The SMPTE form of `<division>`: a frame rate plus the resolution (subframes) within a frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SmpteDivision {
    pub frame_rate: FrameRate,
    pub subframes: u8,
}

/// `<division>`: the meaning of a delta-time tick, either metrical (ticks per quarter note) or
/// time-code-based (SMPTE frame rate and subframe resolution).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Division {
    QuarterNote(QuarterNoteDivision),
    Smpte(SmpteDivision),
}

impl Default for Division {
    fn default() -> Self {
        Division::QuarterNote(QuarterNoteDivision::default())
    }
}

const DIVISION_SMPTE_BIT: u16 = 0b1000_0000_0000_0000;

impl Division {
    fn from_u16(value: u16) -> LibResult<Self> {
        if value & DIVISION_SMPTE_BIT == 0 {
            Ok(Division::QuarterNote(QuarterNoteDivision::new(value)))
        } else {
            let bytes = value.to_be_bytes();
            let time_code = bytes[0] as i8;
            let subframes = bytes[1];
            let frame_rate = FrameRate::from_i8(time_code).context(error::Header {
                site: site!(),
                kind: HeaderErrorKind::BadSmpteTimeCode,
            })?;
            Ok(Division::Smpte(SmpteDivision {
                frame_rate,
                subframes,
            }))
        }
    }

    fn to_u16(self) -> u16 {
        match self {
            Division::QuarterNote(tpq) => tpq.get(),
            Division::Smpte(smpte) => {
                let high = smpte.frame_rate.to_i8() as u8;
                u16::from_be_bytes([high, smpte.subframes])
            }
        }
    }
}

/// The `MThd` chunk: format, track count, division, and any bytes beyond the six required ones
/// (vendor extensions some writers append; preserved verbatim for round-tripping).
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Mthd {
    format: Format,
    ntrks: u16,
    division: Division,
    extra: Vec<u8>,
}

impl Mthd {
    pub fn new(format: Format, ntrks: u16, division: Division) -> Self {
        let mut mthd = Self {
            format,
            ntrks: 0,
            division,
            extra: Vec::new(),
        };
        mthd.set_ntrks(ntrks);
        mthd
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Sets the format. Rejected silently (format left unchanged) if this would set `format = 0`
    /// while `ntrks > 1`, since format 0 may only ever describe a single track.
    pub fn set_format(&mut self, format: Format) {
        if format == Format::Single && self.ntrks > 1 {
            return;
        }
        self.format = format;
    }

    pub fn ntrks(&self) -> u16 {
        self.ntrks
    }

    /// Sets the track count, lifting `format` from `Single` to `Multi` if `ntrks > 1` would
    /// otherwise violate the format-0-implies-at-most-one-track invariant.
    pub fn set_ntrks(&mut self, ntrks: u16) {
        self.ntrks = ntrks;
        if ntrks > 1 && self.format == Format::Single {
            self.format = Format::Multi;
        }
    }

    pub fn division(&self) -> Division {
        self.division
    }

    pub fn set_division(&mut self, division: Division) {
        self.division = division;
    }

    /// Any bytes stored in the chunk beyond the six required format/ntrks/division bytes.
    pub fn extra_bytes(&self) -> &[u8] {
        &self.extra
    }

    /// The chunk's declared `length` field: `6 + extra_bytes().len()`.
    pub fn length(&self) -> u32 {
        MIN_LENGTH + self.extra.len() as u32
    }

    /// Resizes [`Self::extra_bytes`] so that [`Self::length`] becomes `length`, clamped to
    /// `[MIN_LENGTH, MAX_LENGTH]`. Growing preserves existing extra bytes and zero-fills the new
    /// ones; shrinking truncates from the end.
    pub fn set_length(&mut self, length: u32) {
        let clamped = length.clamp(MIN_LENGTH, MAX_LENGTH);
        self.extra.resize((clamped - MIN_LENGTH) as usize, 0);
    }

    /// Parses an `MThd` chunk, including its 8-byte chunk header.
    pub(crate) fn read<S: crate::byte_source::ByteSource>(src: &mut S) -> LibResult<Self> {
        let header = chunk::read_chunk_header(src)?;
        if header.id != ChunkId::MThd {
            return Err(header_err!(HeaderErrorKind::WrongId));
        }
        if header.length < MIN_LENGTH {
            return Err(header_err!(HeaderErrorKind::LengthBelowMin));
        }
        if header.length > MAX_LENGTH {
            return Err(header_err!(HeaderErrorKind::LengthAboveMax));
        }
        let format = Format::from_u16(src.read_u16().context(io!())?)?;
        let ntrks = src.read_u16().context(io!())?;
        if format == Format::Single && ntrks > 1 {
            return Err(header_err!(HeaderErrorKind::FormatNtrksMismatch));
        }
        let division = Division::from_u16(src.read_u16().context(io!())?)?;
        let extra = src.read_n((header.length - MIN_LENGTH) as usize).context(io!())?;
        Ok(Self {
            format,
            ntrks,
            division,
            extra,
        })
    }

    /// Writes this `MThd` chunk, including its 8-byte chunk header.
    pub(crate) fn write<W: Write>(&self, w: &mut W) -> LibResult<()> {
        chunk::write_chunk_header(w, &ChunkId::MThd, self.length())?;
        w.write_all(&self.format.to_u16().to_be_bytes()).context(wr!())?;
        w.write_all(&self.ntrks.to_be_bytes()).context(wr!())?;
        w.write_all(&self.division.to_u16().to_be_bytes()).context(wr!())?;
        w.write_all(&self.extra).context(wr!())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_source::SliceSource;

    #[test]
    fn default_header_serializes_to_spec_example() {
        // format=1, ntrks=2, division=tpq(120): `4D 54 68 64 00 00 00 06 00 01 00 02 00 78`.
        let mthd = Mthd::new(Format::Multi, 2, Division::QuarterNote(QuarterNoteDivision::new(120)));
        let mut out = Vec::new();
        mthd.write(&mut out).unwrap();
        assert_eq!(
            &[0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x02, 0x00, 0x78],
            out.as_slice()
        );
    }

    #[test]
    fn set_ntrks_above_one_lifts_format_from_single() {
        let mut mthd = Mthd::new(Format::Single, 1, Division::default());
        mthd.set_ntrks(5);
        assert_eq!(Format::Multi, mthd.format());
        assert_eq!(5, mthd.ntrks());

        // Now reverting to Single is silently rejected since ntrks is still > 1.
        mthd.set_format(Format::Single);
        assert_eq!(Format::Multi, mthd.format());
    }

    #[test]
    fn read_round_trips_write() {
        let mthd = Mthd::new(Format::Multi, 3, Division::QuarterNote(QuarterNoteDivision::new(480)));
        let mut bytes = Vec::new();
        mthd.write(&mut bytes).unwrap();
        let mut src = SliceSource::new(&bytes);
        let reparsed = Mthd::read(&mut src).unwrap();
        assert_eq!(mthd, reparsed);
    }

    #[test]
    fn smpte_division_round_trips() {
        let div = Division::Smpte(SmpteDivision {
            frame_rate: FrameRate::N25,
            subframes: 40,
        });
        let mthd = Mthd::new(Format::Multi, 1, div);
        let mut bytes = Vec::new();
        mthd.write(&mut bytes).unwrap();
        let mut src = SliceSource::new(&bytes);
        let reparsed = Mthd::read(&mut src).unwrap();
        assert_eq!(div, reparsed.division());
    }

    #[test]
    fn bad_smpte_time_code_errors() {
        // 0xE1 = -31 as i8, not one of the four allowed frame rates.
        let bytes = *b"MThd\x00\x00\x00\x06\x00\x01\x00\x01\xE1\x28";
        let mut src = SliceSource::new(&bytes);
        let err = Mthd::read(&mut src).unwrap_err();
        match err {
            crate::error::LibError::Header { kind, .. } => {
                assert_eq!(HeaderErrorKind::BadSmpteTimeCode, kind)
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn length_below_min_errors() {
        let bytes = *b"MThd\x00\x00\x00\x04\x00\x01";
        let mut src = SliceSource::new(&bytes);
        let err = Mthd::read(&mut src).unwrap_err();
        match err {
            crate::error::LibError::Header { kind, .. } => {
                assert_eq!(HeaderErrorKind::LengthBelowMin, kind)
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn wrong_id_errors() {
        let bytes = *b"MTrk\x00\x00\x00\x06\x00\x01\x00\x01\x00\x60";
        let mut src = SliceSource::new(&bytes);
        let err = Mthd::read(&mut src).unwrap_err();
        match err {
            crate::error::LibError::Header { kind, .. } => assert_eq!(HeaderErrorKind::WrongId, kind),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn extending_length_zero_fills_and_preserves() {
        let mut mthd = Mthd::new(Format::Multi, 1, Division::default());
        mthd.set_length(8);
        assert_eq!(&[0, 0], mthd.extra_bytes());
        mthd.set_length(MIN_LENGTH);
        assert!(mthd.extra_bytes().is_empty());
    }
}
