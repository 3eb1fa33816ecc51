//! The MTrk container: an ordered sequence of [`TrackEvent`]s, each one the delta-time plus
//! the status/data bytes produced by [`crate::event_parser`]. `original_source/include/smf_t.h`
//! stores a track as an opaque byte blob of pre-parsed `mtrk_event_t`s; this crate instead keeps
//! parsed, typed events and regenerates the wire bytes on write, since `crate::event`'s typed
//! views are only meaningful once an event has already been split out of the stream.
//!
//! Every track must end with an End-of-Track meta event (type `0x2F`); the parser enforces this
//! and the missing case is reported as [`crate::error::LibError::MissingEndOfTrack`].

use crate::byte_source::ByteSource;
use crate::chunk::{self, ChunkId};
use crate::config::ParseOptions;
use crate::delta_time::DeltaTime;
use crate::error::LibResult;
use crate::event::{ChannelEventView, EventBytes, MetaView, SysexView};
use crate::event_parser;
use crate::scribe::{Scribe, ScribeSettings};
use crate::status::StatusByteType;
use log::{debug, trace};
use snafu::ResultExt;
use std::io::Write;

/// Meta-event type byte for End-of-Track.
const END_OF_TRACK_TYPE: u8 = 0x2F;

/// A single `<delta-time> <event>` pair, as it sits inside a track. This is the crate's "event
/// container" (spec C5): the delta-time and the status/data bytes are kept as two fields rather
/// than one concatenated buffer, but together they own the full, well-formed byte sequence of the
/// event — [`TrackEvent::to_bytes`] reconstructs it, and equality is byte-for-byte over that
/// reconstructed sequence.
#[derive(Clone, Debug)]
pub struct TrackEvent {
    delta_time: DeltaTime,
    bytes: EventBytes,
}

impl PartialEq for TrackEvent {
    fn eq(&self, other: &Self) -> bool {
        self.delta_time.ticks() == other.delta_time.ticks() && self.bytes == other.bytes
    }
}

impl Eq for TrackEvent {}

impl TrackEvent {
    pub(crate) fn new(delta_time: DeltaTime, bytes: EventBytes) -> Self {
        Self { delta_time, bytes }
    }

    /// A channel voice/mode event. `status_nibble` is clamped to `[0x8, 0xE]`, `channel` to
    /// `[0, 15]`, and the data bytes to `[0, 0x7F]`, so a caller can never construct a
    /// structurally invalid channel event.
    pub fn channel_event(delta_time: u32, status_nibble: u8, channel: u8, p1: u8, p2: Option<u8>) -> Self {
        let status_nibble = status_nibble.clamp(0x80, 0xE0) & 0xF0;
        let channel = channel & 0x0F;
        let p1 = p1 & 0x7F;
        let p2 = p2.map(|b| b & 0x7F);
        Self::new(
            DeltaTime::new(delta_time),
            EventBytes::channel_event(status_nibble, channel, p1, p2),
        )
    }

    /// A meta-event (`0xFF <type> <vlq-length> <payload>`).
    pub fn meta(delta_time: u32, type_byte: u8, payload: &[u8]) -> Self {
        Self::new(DeltaTime::new(delta_time), EventBytes::meta(type_byte & 0x7F, payload))
    }

    /// A sysex event (`0xF0` or `0xF7`, followed by a VLQ length and payload).
    pub fn sysex(delta_time: u32, status: u8, payload: &[u8]) -> Self {
        debug_assert!(status == 0xF0 || status == 0xF7);
        Self::new(DeltaTime::new(delta_time), EventBytes::sysex(status, payload))
    }

    /// The canonical End-of-Track meta event.
    pub fn end_of_track(delta_time: u32) -> Self {
        Self::meta(delta_time, END_OF_TRACK_TYPE, &[])
    }

    pub fn delta_time(&self) -> u32 {
        self.delta_time.ticks()
    }

    pub fn set_delta_time(&mut self, ticks: u32) {
        self.delta_time = DeltaTime::new(ticks);
    }

    pub fn status_byte(&self) -> u8 {
        self.bytes.status_byte()
    }

    pub(crate) fn kind(&self) -> StatusByteType {
        self.bytes.kind()
    }

    pub fn as_channel_event(&self) -> Option<ChannelEventView> {
        self.bytes.as_channel_event()
    }

    pub fn as_meta(&self) -> Option<MetaView> {
        self.bytes.as_meta()
    }

    pub fn as_sysex(&self) -> Option<SysexView> {
        self.bytes.as_sysex()
    }

    /// The payload bytes of a meta/sysex event; empty for a channel event.
    pub fn payload(&self) -> &[u8] {
        self.bytes.payload()
    }

    /// The payload of a meta event decoded as text (UTF-8 where possible, raw bytes otherwise).
    /// `None` for channel and sysex events, where a text interpretation doesn't apply.
    pub fn text_payload(&self) -> Option<crate::text::Text> {
        self.as_meta()?;
        Some(crate::text::Text::from(self.payload().to_vec()))
    }

    /// True for the `FF 2F 00` End-of-Track meta event required to terminate every track.
    pub fn is_end_of_track(&self) -> bool {
        matches!(self.as_meta(), Some(MetaView { type_byte, length: 0 }) if type_byte == END_OF_TRACK_TYPE)
    }

    /// The running-status value this event leaves behind for the next event in the track.
    pub(crate) fn running_status_after(&self, inherited_rs: u8) -> u8 {
        crate::status::update_rs(self.status_byte(), inherited_rs)
    }

    /// The full, canonical wire bytes of this event: delta-time VLQ followed by the status/data
    /// bytes, with the status byte always explicit (running-status compression, if any, is
    /// applied by the track writer, not stored in the event itself).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.delta_time.encode_delta_time();
        out.extend_from_slice(self.bytes.as_bytes());
        out
    }
}

/// An MTrk chunk: an ordered sequence of events, the last of which must be End-of-Track.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Track {
    events: Vec<TrackEvent>,
}

impl Track {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn events_len(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> impl Iterator<Item = &TrackEvent> {
        self.events.iter()
    }

    pub fn push(&mut self, event: TrackEvent) {
        self.events.push(event);
    }

    /// Parses an MTrk chunk body (the `length` bytes following the chunk header), threading
    /// running status event to event and stopping at End-of-Track.
    pub(crate) fn parse<S: ByteSource>(
        src: &mut S,
        chunk_length: u32,
        opts: &ParseOptions,
    ) -> LibResult<Self> {
        src.set_size_limit(chunk_length as u64);
        let mut events = Vec::new();
        let mut running_status = 0u8;
        let result = (|| -> LibResult<()> {
            loop {
                if src.is_end() {
                    return Err(crate::error::MissingEndOfTrack { site: site!() }.build());
                }
                let (dt, bytes, new_rs) = event_parser::parse_event(src, running_status, opts)?;
                running_status = new_rs;
                let event = TrackEvent::new(dt, bytes);
                trace!("parsed event at offset {}: {:?}", src.position(), event);
                let is_eot = event.is_end_of_track();
                events.push(event);
                if is_eot {
                    debug!("end-of-track event reached after {} events", events.len());
                    break;
                }
            }
            Ok(())
        })();
        src.clear_size_limit();
        result?;
        Ok(Self { events })
    }

    /// Writes this track as a complete `MTrk` chunk: the 8-byte chunk header followed by the
    /// event bytes. Running status is re-applied on write (a repeated channel status byte is
    /// omitted), since every parsed event stores its status explicitly but canonical MIDI files
    /// are expected to compress it back out.
    pub(crate) fn write<W: Write>(&self, w: &mut W) -> LibResult<()> {
        let mut body = Vec::new();
        {
            let mut scribe = Scribe::new(&mut body, ScribeSettings { running_status: true });
            for event in &self.events {
                scribe.write_all(&event.delta_time.encode_delta_time()).context(wr!())?;
                write_event_bytes(&mut scribe, event)?;
            }
        }
        chunk::write_chunk_header(w, &ChunkId::MTrk, body.len() as u32)?;
        w.write_all(&body).context(wr!())?;
        Ok(())
    }
}

/// Writes one event's status/data bytes through `scribe`, letting it suppress a repeated channel
/// status byte (running status) but always emitting the status byte for meta/sysex events (which
/// clear running status on the wire, so they are never eligible for compression).
fn write_event_bytes<W: Write>(scribe: &mut Scribe<W>, event: &TrackEvent) -> LibResult<()> {
    let raw = event.bytes.as_bytes();
    match event.kind() {
        StatusByteType::Channel => {
            scribe.write_status_byte(raw[0])?;
            scribe.write_all(&raw[1..]).context(wr!())?;
        }
        _ => {
            scribe.set_running_status(0);
            scribe.write_all(raw).context(wr!())?;
        }
    }
    Ok(())
}
