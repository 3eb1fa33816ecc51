//! Parse-time configuration. The distilled event grammar hardcodes a payload cap for meta and
//! sysex events (`original_source/include/make_mtrk_event.h` pre-allocates a buffer capped at
//! 1,000,000 bytes); this crate exposes that cap as a configurable knob. A declared length above
//! the cap is silently clamped down to the cap before reading, matching the original's
//! pre-allocation behavior: the event's payload is truncated rather than rejected, and a
//! corrupt declared length only becomes a parse error if fewer bytes than the (clamped) length
//! remain in the input.

/// Options controlling how lenient the parser is and how large a single meta/sysex payload may be.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParseOptions {
    /// The maximum number of payload bytes accepted for a single meta or sysex event. A VLQ length
    /// field larger than this is clamped down to the cap before the payload is read.
    max_event_payload_len: u32,
}

/// The default payload cap: 1 MiB, resolving the Open Question in `spec.md` §9 about whether to
/// follow the 1,000,000-byte or 256-byte limit found in the two original C++ make-functions.
pub const DEFAULT_MAX_EVENT_PAYLOAD_LEN: u32 = 1_048_576;

impl ParseOptions {
    pub fn new(max_event_payload_len: u32) -> Self {
        Self {
            max_event_payload_len,
        }
    }

    pub fn max_event_payload_len(&self) -> u32 {
        self.max_event_payload_len
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_event_payload_len: DEFAULT_MAX_EVENT_PAYLOAD_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_cap() {
        assert_eq!(DEFAULT_MAX_EVENT_PAYLOAD_LEN, ParseOptions::default().max_event_payload_len());
    }

    #[test]
    fn custom_cap_is_honored() {
        let opts = ParseOptions::new(16);
        assert_eq!(16, opts.max_event_payload_len());
    }
}
