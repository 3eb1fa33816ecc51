//! The top-level SMF container (the aggregate of C7/C8/C9): an `MThd` chunk followed by zero or
//! more body chunks in file order. `original_source/include/smf_t.h` stores a flat chunk list and
//! requires the first chunk to be `MThd`; this module mirrors that shape directly, adding
//! [`BodyChunk::Unknown`] so that chunks other than `MTrk` survive a read/write round trip
//! byte-for-byte rather than being silently dropped.

use crate::byte_source::{ByteSource, ReaderSource, SliceSource};
use crate::chunk::{self, ChunkId};
use crate::config::ParseOptions;
use crate::error::{LibResult, Result};
use crate::mthd::Mthd;
use crate::track::Track;
use log::{debug, info};
use snafu::ResultExt;
use std::io::{Read, Write};
use std::path::Path;

/// One chunk following the `MThd` header: a parsed `MTrk` track, or any other chunk preserved
/// verbatim so that files carrying vendor extensions round-trip exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyChunk {
    Track(Track),
    Unknown { id: [u8; 4], bytes: Vec<u8> },
}

/// A complete Standard MIDI File: one `MThd` header and an ordered sequence of body chunks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmfFile {
    header: Mthd,
    chunks: Vec<BodyChunk>,
}

impl SmfFile {
    pub fn new(header: Mthd) -> Self {
        Self {
            header,
            chunks: Vec::new(),
        }
    }

    pub fn header(&self) -> &Mthd {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Mthd {
        &mut self.header
    }

    /// Every chunk following the header, in file order, including non-track chunks.
    pub fn chunks(&self) -> impl Iterator<Item = &BodyChunk> {
        self.chunks.iter()
    }

    pub fn push_track(&mut self, track: Track) {
        self.chunks.push(BodyChunk::Track(track));
    }

    pub fn push_unknown_chunk(&mut self, id: [u8; 4], bytes: Vec<u8>) {
        self.chunks.push(BodyChunk::Unknown { id, bytes });
    }

    /// Just the parsed tracks, in file order, skipping any preserved unknown chunks.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.chunks.iter().filter_map(|c| match c {
            BodyChunk::Track(t) => Some(t),
            BodyChunk::Unknown { .. } => None,
        })
    }

    pub fn tracks_len(&self) -> usize {
        self.tracks().count()
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks().nth(index)
    }

    /// Parses a complete SMF from `r`, using the default [`ParseOptions`].
    pub fn read<R: Read>(r: R) -> Result<Self> {
        Self::read_with_options(r, &ParseOptions::default())
    }

    pub fn read_with_options<R: Read>(r: R, opts: &ParseOptions) -> Result<Self> {
        let mut src = ReaderSource::new(r.bytes()).context(io!())?;
        Self::read_inner(&mut src, opts).map_err(Into::into)
    }

    /// Parses a complete SMF from the file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_options(path, &ParseOptions::default())
    }

    pub fn load_with_options<P: AsRef<Path>>(path: P, opts: &ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("loading {}", path.display());
        let mut src = ReaderSource::new_file(path).context(io!())?;
        Self::read_inner(&mut src, opts).map_err(Into::into)
    }

    /// Parses a complete SMF from an in-memory byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_slice_with_options(bytes, &ParseOptions::default())
    }

    pub fn from_slice_with_options(bytes: &[u8], opts: &ParseOptions) -> Result<Self> {
        let mut src = SliceSource::new(bytes);
        Self::read_inner(&mut src, opts).map_err(Into::into)
    }

    fn read_inner<S: ByteSource>(src: &mut S, opts: &ParseOptions) -> LibResult<Self> {
        let header = Mthd::read(src)?;
        debug!(
            "read MThd: format={:?} ntrks={} division={:?}",
            header.format(),
            header.ntrks(),
            header.division()
        );
        let mut chunks = Vec::new();
        while !src.is_end() {
            let chunk_header = chunk::read_chunk_header(src)?;
            match chunk_header.id {
                ChunkId::MTrk => {
                    let track = Track::parse(src, chunk_header.length, opts)?;
                    chunks.push(BodyChunk::Track(track));
                }
                ChunkId::MThd => {
                    invalid_file!("a second MThd chunk appeared after the first");
                }
                ChunkId::Unknown(id) => {
                    let bytes = src.read_n(chunk_header.length as usize).context(io!())?;
                    debug!(
                        "preserving unknown chunk {:?} ({} bytes)",
                        String::from_utf8_lossy(&id),
                        bytes.len()
                    );
                    chunks.push(BodyChunk::Unknown { id, bytes });
                }
            }
        }
        if header.ntrks() as usize != chunks.iter().filter(|c| matches!(c, BodyChunk::Track(_))).count() {
            debug!(
                "MThd declared ntrks={} but {} MTrk chunks were found; keeping what was parsed",
                header.ntrks(),
                chunks.len()
            );
        }
        Ok(Self { header, chunks })
    }

    /// Writes this file's `MThd` header followed by every chunk, in order.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        self.write_inner(w).map_err(Into::into)
    }

    fn write_inner<W: Write>(&self, w: &mut W) -> LibResult<()> {
        self.header.write(w)?;
        for chunk in &self.chunks {
            match chunk {
                BodyChunk::Track(track) => track.write(w)?,
                BodyChunk::Unknown { id, bytes } => {
                    chunk::write_chunk_header(w, &ChunkId::Unknown(*id), bytes.len() as u32)?;
                    w.write_all(bytes).context(wr!())?;
                }
            }
        }
        Ok(())
    }

    /// Serializes this file and writes it to `path`, creating or truncating it.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut f = std::fs::File::create(path).context(wr!())?;
        self.write(&mut f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mthd::{Division, Format, QuarterNoteDivision};
    use crate::track::TrackEvent;

    fn sample_file() -> SmfFile {
        let mut file = SmfFile::new(Mthd::new(Format::Multi, 1, Division::QuarterNote(QuarterNoteDivision::new(96))));
        let mut track = Track::new();
        track.push(TrackEvent::channel_event(0, 0x90, 0, 60, Some(64)));
        track.push(TrackEvent::end_of_track(0));
        file.push_track(track);
        file
    }

    #[test]
    fn write_then_read_round_trips() {
        let file = sample_file();
        let mut bytes = Vec::new();
        file.write(&mut bytes).unwrap();
        let reparsed = SmfFile::from_slice(&bytes).unwrap();
        assert_eq!(file, reparsed);
    }

    #[test]
    fn preserves_unknown_chunks_between_tracks() {
        let mut file = sample_file();
        file.push_unknown_chunk(*b"XFIH", vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let mut track2 = Track::new();
        track2.push(TrackEvent::end_of_track(0));
        file.push_track(track2);

        let mut bytes = Vec::new();
        file.write(&mut bytes).unwrap();
        let reparsed = SmfFile::from_slice(&bytes).unwrap();

        assert_eq!(3, reparsed.chunks().count());
        assert_eq!(2, reparsed.tracks_len());
        let unknown = reparsed
            .chunks()
            .find_map(|c| match c {
                BodyChunk::Unknown { id, bytes } if id == b"XFIH" => Some(bytes.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(vec![0xDE, 0xAD, 0xBE, 0xEF], unknown);
    }

    #[test]
    fn tracks_accessor_skips_unknown_chunks() {
        let mut file = sample_file();
        file.push_unknown_chunk(*b"copy", b"c 2024".to_vec());
        assert_eq!(1, file.tracks_len());
        assert!(file.track(0).is_some());
        assert!(file.track(1).is_none());
    }
}
