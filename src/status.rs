//! Status byte classification and running-status bookkeeping. Ported 1:1 from
//! `original_source/midi_status_byte.h`/`.cpp`: a channel status byte sets running status, a
//! meta/sysex status byte clears it, and a data byte under a live channel running status is an
//! implicit continuation of the previous channel event.

/// The classification of a status byte, mirroring `status_byte_type` in the original C++.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StatusByteType {
    /// 0x80-0xEF: a channel voice/mode message.
    Channel,
    /// 0xF0: the start of a sysex message.
    SysexF0,
    /// 0xF7: a sysex continuation packet, or an "escape" sysex event.
    SysexF7,
    /// 0xFF: a meta-event.
    Meta,
    /// High bit clear: this is a data byte, not a status byte at all.
    Invalid,
    /// A status byte (high bit set) that is none of the above, e.g. 0xF1 (MIDI Time Code).
    Unrecognized,
}

/// `is_status_byte`: true for any byte with the high bit set, channel, sysex, meta, or otherwise.
pub(crate) fn is_status_byte(b: u8) -> bool {
    b & 0x80 == 0x80
}

/// `is_data_byte`: true for any byte with the high bit clear.
pub(crate) fn is_data_byte(b: u8) -> bool {
    b & 0x80 == 0x00
}

/// `is_channel_status_byte`: true for 0x80-0xEF.
pub(crate) fn is_channel_status_byte(b: u8) -> bool {
    let high_nibble = b & 0xF0;
    high_nibble >= 0x80 && high_nibble != 0xF0
}

/// `is_sysex_status_byte`: true for 0xF0 or 0xF7.
pub(crate) fn is_sysex_status_byte(b: u8) -> bool {
    b == 0xF0 || b == 0xF7
}

/// `is_meta_status_byte`: true for 0xFF.
pub(crate) fn is_meta_status_byte(b: u8) -> bool {
    b == 0xFF
}

/// `is_sysex_or_meta_status_byte`.
pub(crate) fn is_sysex_or_meta_status_byte(b: u8) -> bool {
    is_sysex_status_byte(b) || is_meta_status_byte(b)
}

/// `is_unrecognized_status_byte`: a status byte that is neither channel, sysex, nor meta, e.g.
/// 0xF1 (MIDI Time Code Quarter Frame) or 0xF8 (Timing Clock) encountered in a file.
pub(crate) fn is_unrecognized_status_byte(b: u8) -> bool {
    is_status_byte(b) && !is_channel_status_byte(b) && !is_sysex_or_meta_status_byte(b)
}

/// `classify_status_byte(unsigned char)`.
pub fn classify(b: u8) -> StatusByteType {
    if is_channel_status_byte(b) {
        StatusByteType::Channel
    } else if is_meta_status_byte(b) {
        StatusByteType::Meta
    } else if is_sysex_status_byte(b) {
        if b == 0xF0 {
            StatusByteType::SysexF0
        } else {
            StatusByteType::SysexF7
        }
    } else if is_unrecognized_status_byte(b) {
        StatusByteType::Unrecognized
    } else {
        StatusByteType::Invalid
    }
}

/// `get_status_byte(s, rs)`: the status byte that applies to an event whose first seen byte is `s`,
/// given inherited running status `rs`. If `s` is itself a status byte, `s` wins outright (even an
/// unrecognized one, e.g. 0xF1) — running status never overrides an explicit status byte. If `s`
/// is a data byte, the event continues under `rs` provided `rs` is a channel status byte; otherwise
/// there is no valid status byte and `0x00` is returned.
pub(crate) fn effective_status(seen_byte: u8, running_status: u8) -> u8 {
    if is_status_byte(seen_byte) {
        seen_byte
    } else if is_channel_status_byte(running_status) {
        running_status
    } else {
        0x00
    }
}

/// `get_running_status_byte(s, rs)`: the running-status value an event with (effective) status
/// byte `s` imparts to the rest of the stream. A channel event's own status byte becomes the new
/// running status; a data byte continuing a channel running status leaves it unchanged; anything
/// else (meta, sysex, or an invalid byte) clears running status to `0x00`.
pub(crate) fn update_rs(event_status: u8, prior_rs: u8) -> u8 {
    if is_channel_status_byte(event_status) {
        event_status
    } else if is_data_byte(event_status) && is_channel_status_byte(prior_rs) {
        prior_rs
    } else {
        0x00
    }
}

/// `channel_status_byte_n_data_bytes`: Program Change (0xC_) and Channel Pressure (0xD_) carry one
/// data byte; every other channel message carries two. Non-channel status bytes carry zero.
pub(crate) fn channel_data_byte_count(status: u8) -> u8 {
    if is_channel_status_byte(status) {
        let high_nibble = status & 0xF0;
        if high_nibble == 0xC0 || high_nibble == 0xD0 {
            1
        } else {
            2
        }
    } else {
        0
    }
}
