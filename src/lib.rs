/*!
Reads and writes Standard MIDI Files (SMF).

This crate parses the `MThd`/`MTrk` chunk structure of a `.mid` file into typed, checked values —
[`file::SmfFile`] is the entry point for both directions:

```no_run
use midi_file::file::SmfFile;

let smf = SmfFile::load("song.mid")?;
println!("{} tracks", smf.tracks_len());
smf.save("song-copy.mid")?;
# Ok::<(), midi_file::Error>(())
```

Parsing runs over an abstract byte source so the same parser code works over an in-memory slice or
a streaming [`std::io::Read`]. Channel events, meta-events, and sysex events are all represented as
one compact event-bytes container, decoded into typed views ([`ChannelEventView`], [`MetaView`],
[`SysexView`]) on demand.

A meta or sysex event whose declared payload length exceeds [`ParseOptions`]'s configured cap is
not rejected outright: the payload is clamped to the cap and read rather than truncating the whole
event. See [`config`] for details.
*/

#![allow(dead_code)]

#[macro_use]
mod error;
#[macro_use]
mod clamp;
#[macro_use]
mod macros;

mod byte_source;
mod chunk;
pub mod config;
mod delta_time;
mod event;
mod event_parser;
pub mod file;
pub mod mthd;
mod scribe;
mod small_bytes;
mod status;
pub mod text;
pub mod track;
mod vlq;

pub use config::{ParseOptions, DEFAULT_MAX_EVENT_PAYLOAD_LEN};
pub use error::{Error, Result};
pub use event::{ChannelEventView, MetaView, SysexView};
pub use file::{BodyChunk, SmfFile};
pub use mthd::{Division, Format, FrameRate, Mthd, QuarterNoteDivision, SmpteDivision};
pub use status::StatusByteType;
pub use text::Text;
pub use track::{Track, TrackEvent};
