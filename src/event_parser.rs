//! The MTrk event parser: delta-time, status resolution (with running status), and dispatch to
//! channel/meta/sysex decoding. Grounded directly in
//! `original_source/include/make_mtrk_event.h`'s `make_mtrk_event3`, which is the most complete of
//! the three parser families in the original source — the other two are not carried forward.

use crate::byte_source::ByteSource;
use crate::config::ParseOptions;
use crate::delta_time::DeltaTime;
use crate::error::{EventErrorKind, LibResult};
use crate::event::EventBytes;
use crate::status;
use crate::vlq;

/// Parses one `<delta-time> <event>` pair, threading running status through. Returns the decoded
/// delta-time, the event bytes, and the running-status value in effect after this event.
pub(crate) fn parse_event<S: ByteSource>(
    src: &mut S,
    running_status: u8,
    opts: &ParseOptions,
) -> LibResult<(DeltaTime, EventBytes, u8)> {
    let dt = DeltaTime::read(src).context_io()?;
    if !dt.is_valid() {
        return Err(event_err!(
            EventErrorKind::InvalidDeltaTime,
            src.position(),
            0,
            running_status
        ));
    }

    let last = match src.read().context_io()? {
        Some(b) => b,
        None => {
            return Err(event_err!(
                EventErrorKind::NoDataFollowingDeltaTime,
                src.position(),
                0,
                running_status
            ))
        }
    };
    let s = status::effective_status(last, running_status);

    if status::is_channel_status_byte(s) {
        parse_channel_event(src, dt, last, s, running_status)
    } else if status::is_meta_status_byte(s) {
        parse_meta_event(src, dt, s, running_status, opts)
    } else if status::is_sysex_status_byte(s) {
        parse_sysex_event(src, dt, s, running_status, opts)
    } else {
        Err(event_err!(
            EventErrorKind::InvalidStatusByte,
            src.position(),
            s,
            running_status
        ))
    }
}

fn parse_channel_event<S: ByteSource>(
    src: &mut S,
    dt: DeltaTime,
    last: u8,
    s: u8,
    rs: u8,
) -> LibResult<(DeltaTime, EventBytes, u8)> {
    let status_nibble = s & 0xF0;
    let channel = s & 0x0F;
    let n = status::channel_data_byte_count(s);

    let p1 = if status::is_data_byte(last) {
        // `last` was a data byte continuing the inherited running status.
        last
    } else {
        read_data_byte(src, s, rs)?
    };
    let p2 = if n == 2 {
        Some(read_data_byte(src, s, rs)?)
    } else {
        None
    };

    let new_rs = status::update_rs(s, rs);
    Ok((
        dt,
        EventBytes::channel_event(status_nibble, channel, p1, p2),
        new_rs,
    ))
}

fn read_data_byte<S: ByteSource>(src: &mut S, s: u8, rs: u8) -> LibResult<u8> {
    let b = match src.read().context_io()? {
        Some(b) => b,
        None => {
            return Err(event_err!(
                EventErrorKind::ChannelLengthExceedsInput,
                src.position(),
                s,
                rs
            ))
        }
    };
    if !status::is_data_byte(b) {
        return Err(event_err!(
            EventErrorKind::ChannelInvalidDataByte,
            src.position(),
            s,
            rs
        ));
    }
    Ok(b)
}

fn parse_meta_event<S: ByteSource>(
    src: &mut S,
    dt: DeltaTime,
    s: u8,
    rs: u8,
    opts: &ParseOptions,
) -> LibResult<(DeltaTime, EventBytes, u8)> {
    let type_byte = match src.read().context_io()? {
        Some(b) => b,
        None => {
            return Err(event_err!(
                EventErrorKind::SysexOrMetaOverflowInHeader,
                src.position(),
                s,
                rs
            ))
        }
    };
    let declared_len = read_payload_len(src, s, rs)?;
    let clamped_len = declared_len.min(opts.max_event_payload_len());
    let payload = read_payload(src, clamped_len, s, rs)?;
    let new_rs = status::update_rs(s, rs);
    Ok((dt, EventBytes::meta(type_byte, &payload), new_rs))
}

fn parse_sysex_event<S: ByteSource>(
    src: &mut S,
    dt: DeltaTime,
    s: u8,
    rs: u8,
    opts: &ParseOptions,
) -> LibResult<(DeltaTime, EventBytes, u8)> {
    let declared_len = read_payload_len(src, s, rs)?;
    let clamped_len = declared_len.min(opts.max_event_payload_len());
    let payload = read_payload(src, clamped_len, s, rs)?;
    let new_rs = status::update_rs(s, rs);
    Ok((dt, EventBytes::sysex(s, &payload), new_rs))
}

/// Reads the VLQ length field common to meta and sysex events. Missing the field entirely is
/// `SysexOrMetaOverflowInHeader`; a field that runs out of input (or exceeds 4 bytes) before
/// terminating is `SysexOrMetaInvalidVlqLength`.
fn read_payload_len<S: ByteSource>(src: &mut S, s: u8, rs: u8) -> LibResult<u32> {
    let mut bytes = Vec::with_capacity(4);
    for _ in 0..4 {
        match src.read().context_io()? {
            None => {
                let kind = if bytes.is_empty() {
                    EventErrorKind::SysexOrMetaOverflowInHeader
                } else {
                    EventErrorKind::SysexOrMetaInvalidVlqLength
                };
                return Err(event_err!(kind, src.position(), s, rs));
            }
            Some(b) => {
                let continues = b & vlq::CONTINUE != 0;
                bytes.push(b);
                if !continues {
                    let field = vlq::decode_field(&bytes)
                        .expect("1-4 non-empty bytes always decode");
                    return Ok(field.value);
                }
            }
        }
    }
    Err(event_err!(
        EventErrorKind::SysexOrMetaInvalidVlqLength,
        src.position(),
        s,
        rs
    ))
}

fn read_payload<S: ByteSource>(src: &mut S, len: u32, s: u8, rs: u8) -> LibResult<Vec<u8>> {
    let mut payload = Vec::with_capacity(len as usize);
    for _ in 0..len {
        match src.read().context_io()? {
            Some(b) => payload.push(b),
            None => {
                return Err(event_err!(
                    EventErrorKind::SysexOrMetaLengthExceedsInput,
                    src.position(),
                    s,
                    rs
                ))
            }
        }
    }
    Ok(payload)
}

/// Adapts a [`crate::byte_source::ByteResult`] into this module's [`LibResult`], since every I/O
/// fault below the event grammar is a plain `LibError::Io` regardless of which field was being
/// read when it happened.
trait IntoLibResult<T> {
    fn context_io(self) -> LibResult<T>;
}

impl<T> IntoLibResult<T> for crate::byte_source::ByteResult<T> {
    fn context_io(self) -> LibResult<T> {
        use snafu::ResultExt;
        self.context(crate::error::Io { site: site!() })
    }
}
