//! The event container: an owned byte sequence (status byte onward, excluding the delta-time,
//! which [`crate::track`] stores alongside it) together with typed views derived on demand.
//!
//! `original_source/include/mtrk_event_t.h` stores the delta-time inline in the same byte buffer
//! as the event and favors UB-risking `replace_unsafe` constructors for speed. This crate keeps
//! the "store raw bytes, derive views on demand" design but leans on `SmallBytes` plus ordinary
//! safe construction instead: the delta-time lives on `TrackEvent` (see `crate::track`), and every
//! constructor here validates its inputs and returns a typed, checked value.

use crate::small_bytes::SmallBytes;
use crate::status::{self, StatusByteType};
use crate::vlq;

/// A decoded view of a channel voice/mode event: `status_nibble | channel`, followed by one or two
/// data bytes (Program Change and Channel Pressure carry only `p1`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ChannelEventView {
    pub status_nibble: u8,
    pub channel: u8,
    pub p1: u8,
    pub p2: Option<u8>,
}

/// A decoded view of a meta-event's header: its type byte and declared payload length. The
/// payload itself is retrieved from [`EventBytes::payload`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct MetaView {
    pub type_byte: u8,
    pub length: u32,
}

/// A decoded view of a sysex event's header: `0xF0` or `0xF7`, and its declared payload length.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SysexView {
    pub status: u8,
    pub length: u32,
}

/// The status byte followed by whatever data/length/payload bytes the event requires. Does not
/// include the delta-time.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct EventBytes {
    bytes: SmallBytes,
}

impl EventBytes {
    fn from_bytes(bytes: SmallBytes) -> Self {
        Self { bytes }
    }

    pub(crate) fn status_byte(&self) -> u8 {
        self.bytes.as_slice().first().copied().unwrap_or(0)
    }

    pub(crate) fn kind(&self) -> StatusByteType {
        status::classify(self.status_byte())
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub(crate) fn channel_event(status_nibble: u8, channel: u8, p1: u8, p2: Option<u8>) -> Self {
        debug_assert_eq!(status_nibble & 0x0F, 0);
        debug_assert!(channel <= 0x0F);
        let status = status_nibble | channel;
        let mut bytes = SmallBytes::new();
        bytes.push_back(status);
        bytes.push_back(p1);
        if let Some(p2) = p2 {
            bytes.push_back(p2);
        }
        Self::from_bytes(bytes)
    }

    pub(crate) fn meta(type_byte: u8, payload: &[u8]) -> Self {
        let mut bytes = SmallBytes::new();
        bytes.push_back(0xFF);
        bytes.push_back(type_byte);
        for b in vlq::encode(payload.len() as u32) {
            bytes.push_back(b);
        }
        for &b in payload {
            bytes.push_back(b);
        }
        Self::from_bytes(bytes)
    }

    pub(crate) fn sysex(status: u8, payload: &[u8]) -> Self {
        debug_assert!(status == 0xF0 || status == 0xF7);
        let mut bytes = SmallBytes::new();
        bytes.push_back(status);
        for b in vlq::encode(payload.len() as u32) {
            bytes.push_back(b);
        }
        for &b in payload {
            bytes.push_back(b);
        }
        Self::from_bytes(bytes)
    }

    pub(crate) fn as_channel_event(&self) -> Option<ChannelEventView> {
        if self.kind() != StatusByteType::Channel {
            return None;
        }
        let slice = self.bytes.as_slice();
        let status = slice[0];
        let status_nibble = status & 0xF0;
        let channel = status & 0x0F;
        let n = status::channel_data_byte_count(status);
        let p1 = *slice.get(1)?;
        let p2 = if n == 2 { Some(*slice.get(2)?) } else { None };
        Some(ChannelEventView {
            status_nibble,
            channel,
            p1,
            p2,
        })
    }

    pub(crate) fn as_meta(&self) -> Option<MetaView> {
        if self.kind() != StatusByteType::Meta {
            return None;
        }
        let slice = self.bytes.as_slice();
        let type_byte = *slice.get(1)?;
        let len_bytes = &slice[2..];
        let field = vlq::decode_field(len_bytes.get(..len_field_len(len_bytes)?)?).ok()?;
        Some(MetaView {
            type_byte,
            length: field.value,
        })
    }

    pub(crate) fn as_sysex(&self) -> Option<SysexView> {
        let k = self.kind();
        if k != StatusByteType::SysexF0 && k != StatusByteType::SysexF7 {
            return None;
        }
        let slice = self.bytes.as_slice();
        let status = slice[0];
        let len_bytes = &slice[1..];
        let field = vlq::decode_field(len_bytes.get(..len_field_len(len_bytes)?)?).ok()?;
        Some(SysexView {
            status,
            length: field.value,
        })
    }

    /// The payload bytes for a meta or sysex event (empty for channel events).
    pub(crate) fn payload(&self) -> &[u8] {
        let slice = self.bytes.as_slice();
        match self.kind() {
            StatusByteType::Meta => {
                let header_len = 2 + len_field_len(&slice[2..]).unwrap_or(0);
                &slice[header_len.min(slice.len())..]
            }
            StatusByteType::SysexF0 | StatusByteType::SysexF7 => {
                let header_len = 1 + len_field_len(&slice[1..]).unwrap_or(0);
                &slice[header_len.min(slice.len())..]
            }
            _ => &[],
        }
    }
}

/// Scans `bytes` for the length (in bytes) of the VLQ field it begins with, without allocating.
fn len_field_len(bytes: &[u8]) -> Option<usize> {
    for (i, &b) in bytes.iter().enumerate().take(4) {
        if b & vlq::CONTINUE == 0 {
            return Some(i + 1);
        }
    }
    if bytes.len() >= 4 {
        Some(4)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_event_round_trips_two_data_bytes() {
        let ev = EventBytes::channel_event(0x90, 0x03, 0x40, Some(0x60));
        let view = ev.as_channel_event().unwrap();
        assert_eq!(0x90, view.status_nibble);
        assert_eq!(0x03, view.channel);
        assert_eq!(0x40, view.p1);
        assert_eq!(Some(0x60), view.p2);
    }

    #[test]
    fn channel_event_round_trips_one_data_byte() {
        let ev = EventBytes::channel_event(0xC0, 0x00, 0x05, None);
        let view = ev.as_channel_event().unwrap();
        assert_eq!(0xC0, view.status_nibble);
        assert_eq!(None, view.p2);
    }

    #[test]
    fn meta_event_round_trips() {
        let ev = EventBytes::meta(0x2F, &[]);
        let view = ev.as_meta().unwrap();
        assert_eq!(0x2F, view.type_byte);
        assert_eq!(0, view.length);
        assert!(ev.payload().is_empty());
    }

    #[test]
    fn meta_event_with_payload() {
        let ev = EventBytes::meta(0x01, b"hello");
        let view = ev.as_meta().unwrap();
        assert_eq!(5, view.length);
        assert_eq!(b"hello", ev.payload());
    }

    #[test]
    fn sysex_event_round_trips() {
        let ev = EventBytes::sysex(0xF0, &[0x43, 0x12, 0x00, 0x07]);
        let view = ev.as_sysex().unwrap();
        assert_eq!(0xF0, view.status);
        assert_eq!(4, view.length);
        assert_eq!(&[0x43, 0x12, 0x00, 0x07], ev.payload());
    }

    #[test]
    fn channel_event_is_not_a_meta_view() {
        let ev = EventBytes::channel_event(0x90, 0x00, 0x40, Some(0x60));
        assert!(ev.as_meta().is_none());
        assert!(ev.as_sysex().is_none());
    }
}
