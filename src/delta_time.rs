//! The delta-time preceding every MTrk event. A delta-time is stored as a VLQ and measures elapsed
//! ticks since the previous event in the same track (ticks per quarter note, or per SMPTE
//! subframe, as declared in the MThd chunk).

use crate::byte_source::{ByteResult, ByteSource};
use crate::vlq;

/// A decoded delta-time together with whether its encoding was canonical.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) struct DeltaTime {
    ticks: u32,
    valid: bool,
}

impl DeltaTime {
    pub(crate) fn new(ticks: u32) -> Self {
        Self { ticks, valid: true }
    }

    pub(crate) fn ticks(&self) -> u32 {
        self.ticks
    }

    /// False if the source bytes were a non-canonical (overlong) VLQ encoding.
    pub(crate) fn is_valid(&self) -> bool {
        self.valid
    }

    /// The canonical re-encoding of this delta-time, discarding any non-canonical padding it was
    /// originally read with.
    pub(crate) fn to_nearest_valid(&self) -> Self {
        Self {
            ticks: self.ticks,
            valid: true,
        }
    }

    /// Reads up to 4 bytes of a delta-time VLQ, stopping at the first byte whose continuation bit
    /// is clear. Unlike [`ByteSource::read_vlq_bytes`], running out of input mid-field is not an
    /// I/O error here: it simply yields an invalid (truncated) delta-time, matching
    /// `original_source/include/midi_delta_time.h`'s `read_delta_time`.
    pub(crate) fn read<S: ByteSource>(src: &mut S) -> ByteResult<Self> {
        let mut bytes = Vec::with_capacity(4);
        for _ in 0..4 {
            match src.read()? {
                None => break,
                Some(b) => {
                    let continues = b & vlq::CONTINUE != 0;
                    bytes.push(b);
                    if !continues {
                        break;
                    }
                }
            }
        }
        if bytes.is_empty() {
            // No bytes at all before end-of-input: a VLQ field needs at least one byte to be
            // valid, matching `vlq::decode_field`'s `Empty` case.
            return Ok(Self {
                ticks: 0,
                valid: false,
            });
        }
        let field = vlq::decode_field(&bytes).unwrap_or(vlq::VlqField {
            value: 0,
            byte_len: bytes.len() as u8,
            valid: false,
        });
        Ok(Self {
            ticks: field.value,
            valid: field.valid,
        })
    }

    pub(crate) fn encode_delta_time(&self) -> Vec<u8> {
        vlq::encode(self.ticks)
    }
}

impl From<u32> for DeltaTime {
    fn from(ticks: u32) -> Self {
        Self::new(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_source::SliceSource;

    #[test]
    fn reads_canonical_delta_time() {
        let bytes = [0x81, 0x00];
        let mut src = SliceSource::new(&bytes);
        let dt = DeltaTime::read(&mut src).unwrap();
        assert_eq!(0x80, dt.ticks());
        assert!(dt.is_valid());
    }

    #[test]
    fn reads_non_canonical_delta_time_value() {
        let bytes = [0x80, 0x00];
        let mut src = SliceSource::new(&bytes);
        let dt = DeltaTime::read(&mut src).unwrap();
        assert_eq!(0, dt.ticks());
        assert!(dt.is_valid());
    }

    #[test]
    fn truncated_delta_time_is_invalid() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF];
        let mut src = SliceSource::new(&bytes);
        let dt = DeltaTime::read(&mut src).unwrap();
        assert!(!dt.is_valid());
        let fixed = dt.to_nearest_valid();
        assert!(fixed.is_valid());
        assert_eq!(dt.ticks(), fixed.ticks());
    }

    #[test]
    fn encode_round_trips() {
        let dt = DeltaTime::new(120_000);
        let encoded = dt.encode_delta_time();
        let mut src = SliceSource::new(&encoded);
        let decoded = DeltaTime::read(&mut src).unwrap();
        assert_eq!(dt.ticks(), decoded.ticks());
        assert!(decoded.is_valid());
    }
}
