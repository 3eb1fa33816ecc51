//! A polymorphic abstraction over "a sequence of bytes with 3-byte lookahead", so that the event,
//! chunk, header, and track parsers can run identically over an in-memory slice or a streaming
//! [`Read`]. [`SliceSource`] backs every colocated unit test; [`ReaderSource`] backs
//! [`crate::file::SmfFile::read`]/`load`.

use crate::vlq::{decode_slice, VlqError, CONTINUE};
use log::trace;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::fs::File;
use std::io::{BufReader, Bytes, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::str::{from_utf8, Utf8Error};

#[derive(Debug, Snafu)]
pub(crate) enum ByteError {
    #[snafu(display("io error around byte {}: {}", position, source))]
    Io {
        position: u64,
        source: std::io::Error,
    },

    #[snafu(display("unexpected end reached around byte {}", position))]
    End { position: u64 },

    #[snafu(display(
        "expected string but found non-utf8 encoded bytes around {}: {}",
        position,
        source
    ))]
    Str { position: u64, source: Utf8Error },

    #[snafu(display(
        "expected tag '{}' but found '{}' near position {}",
        expected,
        found,
        position
    ))]
    Tag {
        expected: String,
        found: String,
        position: u64,
    },

    #[snafu(display("too many bytes while reading vlq around {}", position))]
    VlqTooBig { position: u64 },

    #[snafu(display("problem decoding vlq around {}: {}", position, source))]
    VlqDecode { position: u64, source: VlqError },

    #[snafu(display(
        "incorrect byte value around {}: expected '{:#X}', found '{:#X}'",
        position,
        expected,
        found,
    ))]
    ReadExpect {
        expected: u8,
        found: u8,
        position: u64,
    },

    #[snafu(display("unable to open '{}': {}", path.display(), source,))]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub(crate) type ByteResult<T> = std::result::Result<T, ByteError>;

const BYTE_SIZE: usize = 8;
const KB: usize = BYTE_SIZE * 1024;
const MB: usize = KB * 1024;

/// A bounded source of bytes with 3-byte lookahead and an optional size limit, used so the track
/// parser can confine a sub-parser to exactly the bytes declared in a chunk's length field.
///
/// Implementors track a running `position` starting at the first byte returned by `read`.
pub(crate) trait ByteSource {
    /// Reads and consumes one byte, or `Ok(None)` at the end (or size limit).
    fn read(&mut self) -> ByteResult<Option<u8>>;

    /// The most recently consumed byte, if any.
    fn current(&self) -> Option<u8>;

    /// The next byte without consuming it.
    fn peek(&self) -> Option<u8>;

    /// The byte after `peek()`, without consuming anything.
    fn peek2(&self) -> Option<u8>;

    /// The byte after `peek2()`, without consuming anything.
    fn peek3(&self) -> Option<u8>;

    /// The position of `current()`, i.e. the 0-based index of the last byte read.
    fn position(&self) -> u64;

    /// True once a `read` would return `Ok(None)`, accounting for any size limit.
    fn is_end(&self) -> bool;

    /// Confines `is_end`/`read` to `size` more bytes past the current position.
    fn set_size_limit(&mut self, size: u64);

    /// Removes any limit set by `set_size_limit`.
    fn clear_size_limit(&mut self);

    /// Reads a byte, erroring with [`ByteError::End`] at the end rather than returning `None`.
    fn read_or_die(&mut self) -> ByteResult<u8> {
        self.read()?.context(End {
            position: self.position(),
        })
    }

    /// Peeks a byte, erroring with [`ByteError::End`] at the end rather than returning `None`.
    fn peek_or_die(&self) -> ByteResult<u8> {
        self.peek().context(End {
            position: self.position(),
        })
    }

    fn read2(&mut self) -> ByteResult<[u8; 2]> {
        let mut retval = [0u8; 2];
        retval[0] = self.read_or_die()?;
        retval[1] = self.read_or_die()?;
        Ok(retval)
    }

    fn read4(&mut self) -> ByteResult<[u8; 4]> {
        let mut retval = [0u8; 4];
        retval[0] = self.read_or_die()?;
        retval[1] = self.read_or_die()?;
        retval[2] = self.read_or_die()?;
        retval[3] = self.read_or_die()?;
        Ok(retval)
    }

    fn read_u16(&mut self) -> ByteResult<u16> {
        let bytes = self.read2()?;
        Ok(u16::from_be_bytes(bytes))
    }

    fn read_u32(&mut self) -> ByteResult<u32> {
        let bytes = self.read4()?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Reads the raw bytes of a variable-length quantity, up to 4 bytes, without decoding them.
    fn read_vlq_bytes(&mut self) -> ByteResult<Vec<u8>> {
        let mut retval = Vec::new();
        let mut current_byte = CONTINUE;
        let mut byte_count = 0u8;
        while current_byte & CONTINUE == CONTINUE {
            ensure!(
                byte_count <= 4,
                VlqTooBig {
                    position: self.position()
                }
            );
            current_byte = self.read_or_die()?;
            retval.push(current_byte);
            byte_count += 1;
        }
        Ok(retval)
    }

    fn read_vlq_u32(&mut self) -> ByteResult<u32> {
        let bytes = self.read_vlq_bytes()?;
        let decoded = decode_slice(&bytes).context(VlqDecode {
            position: self.position(),
        })?;
        trace!("decoded vlq value {} from {} bytes", decoded, bytes.len());
        Ok(decoded)
    }

    fn expect_tag(&mut self, expected_tag: &str) -> ByteResult<()> {
        let tag_bytes = self.read4()?;
        let actual_tag = from_utf8(&tag_bytes).context(Str {
            position: self.position(),
        })?;
        ensure!(
            expected_tag == actual_tag,
            Tag {
                expected: expected_tag,
                found: actual_tag,
                position: self.position()
            }
        );
        Ok(())
    }

    /// True if `current()` followed by `peek()`/`peek2()`/`peek3()` spells `expected_tag`.
    fn is_tag(&self, expected_tag: &str) -> bool {
        let mut tag_bytes = [0u8; 4];
        tag_bytes[0] = match self.current() {
            None => return false,
            Some(val) => val,
        };
        tag_bytes[1] = match self.peek() {
            None => return false,
            Some(val) => val,
        };
        tag_bytes[2] = match self.peek2() {
            None => return false,
            Some(val) => val,
        };
        tag_bytes[3] = match self.peek3() {
            None => return false,
            Some(val) => val,
        };
        match from_utf8(&tag_bytes) {
            Ok(found) => expected_tag == found,
            Err(_) => false,
        }
    }

    fn read_expect(&mut self, expected: u8) -> ByteResult<()> {
        let found = self.read_or_die()?;
        ensure!(
            expected == found,
            ReadExpect {
                expected,
                found,
                position: self.position()
            }
        );
        Ok(())
    }

    fn read_n(&mut self, num_bytes: usize) -> ByteResult<Vec<u8>> {
        let mut bytes = Vec::with_capacity(num_bytes);
        for _ in 0..num_bytes {
            bytes.push(self.read_or_die()?)
        }
        debug_assert_eq!(num_bytes, bytes.len());
        Ok(bytes)
    }
}

/// A zero-copy [`ByteSource`] over an in-memory slice.
pub(crate) struct SliceSource<'a> {
    bytes: &'a [u8],
    cursor: usize,
    position: Option<u64>,
    position_limit: Option<u64>,
}

impl<'a> SliceSource<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            cursor: 0,
            position: None,
            position_limit: None,
        }
    }

    fn at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }
}

impl<'a> ByteSource for SliceSource<'a> {
    fn read(&mut self) -> ByteResult<Option<u8>> {
        if let (Some(limit), Some(position)) = (self.position_limit, self.position) {
            if position >= limit {
                return Ok(None);
            }
        }
        let val = self.at(self.cursor);
        if val.is_some() {
            self.position = Some(self.position.map_or(0, |p| p + 1));
            self.cursor += 1;
        }
        trace!(
            "read {:#x} at position {}",
            val.unwrap_or(0),
            self.position.unwrap_or(0)
        );
        Ok(val)
    }

    fn current(&self) -> Option<u8> {
        if self.cursor == 0 {
            None
        } else {
            self.at(self.cursor - 1)
        }
    }

    fn peek(&self) -> Option<u8> {
        self.at(self.cursor)
    }

    fn peek2(&self) -> Option<u8> {
        self.at(self.cursor + 1)
    }

    fn peek3(&self) -> Option<u8> {
        self.at(self.cursor + 2)
    }

    fn position(&self) -> u64 {
        self.position.unwrap_or(0)
    }

    fn is_end(&self) -> bool {
        if let Some(limit) = self.position_limit {
            if let Some(position) = self.position {
                if position >= limit {
                    return true;
                }
            }
        }
        self.cursor >= self.bytes.len()
    }

    fn set_size_limit(&mut self, size: u64) {
        self.position_limit = Some(self.position.unwrap_or(0) + size)
    }

    fn clear_size_limit(&mut self) {
        self.position_limit = None
    }
}

/// A streaming [`ByteSource`] over any [`Read`], with 3-byte lookahead populated eagerly at
/// construction time.
pub(crate) struct ReaderSource<R: Read> {
    iter: Bytes<R>,
    position: Option<u64>,
    current: Option<u8>,
    peek1: Option<u8>,
    peek2: Option<u8>,
    peek3: Option<u8>,
    position_limit: Option<u64>,
}

impl ReaderSource<BufReader<File>> {
    pub(crate) fn new_file<P: AsRef<Path>>(path: P) -> ByteResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).context(FileOpen { path })?;
        let buf = BufReader::with_capacity(MB, f);
        Self::new(buf.bytes())
    }
}

impl<R: Read> ReaderSource<R> {
    pub(crate) fn new(mut iter: Bytes<R>) -> ByteResult<Self> {
        let peek1 = Self::next_impl(&mut iter, 0)?;
        let peek2 = Self::next_impl(&mut iter, 0)?;
        let peek3 = Self::next_impl(&mut iter, 0)?;
        Ok(Self {
            iter,
            position: None,
            current: None,
            peek1,
            peek2,
            peek3,
            position_limit: None,
        })
    }

    fn next_impl(iter: &mut Bytes<R>, position: u64) -> ByteResult<Option<u8>> {
        match iter.next() {
            None => Ok(None),
            Some(result) => match result {
                Ok(val) => Ok(Some(val)),
                Err(ref e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
                Err(e) => Err(e).context(Io { position }),
            },
        }
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read(&mut self) -> ByteResult<Option<u8>> {
        if let Some(position_limit) = self.position_limit {
            if let Some(position) = self.position {
                if position >= position_limit {
                    return Ok(None);
                }
            }
        }
        if self.current.is_none() {
            self.position = Some(0);
        } else {
            self.position = Some(self.position.unwrap_or(0) + 1);
        }
        let return_val = self.peek1;
        self.current = self.peek1;
        self.peek1 = self.peek2;
        self.peek2 = self.peek3;
        let next_result = match self.iter.next() {
            None => {
                self.peek3 = None;
                trace!(
                    "read {:#x} at position {}",
                    return_val.unwrap_or(0),
                    self.position.unwrap_or(0)
                );
                return Ok(return_val);
            }
            Some(r) => r,
        };

        let e = match next_result {
            Ok(ok) => {
                self.peek3 = Some(ok);
                trace!(
                    "read {:#x} at position {}",
                    return_val.unwrap_or(0),
                    self.position.unwrap_or(0)
                );
                return Ok(return_val);
            }
            Err(e) => {
                if e.kind() == ErrorKind::UnexpectedEof {
                    self.peek3 = None;
                    trace!(
                        "read {:#x} at position {}",
                        return_val.unwrap_or(0),
                        self.position.unwrap_or(0)
                    );
                    return Ok(return_val);
                }
                e
            }
        };
        Err(e).context(Io {
            position: self.position.unwrap_or(0),
        })
    }

    fn current(&self) -> Option<u8> {
        self.current
    }

    fn peek(&self) -> Option<u8> {
        self.peek1
    }

    fn peek2(&self) -> Option<u8> {
        self.peek2
    }

    fn peek3(&self) -> Option<u8> {
        self.peek3
    }

    fn position(&self) -> u64 {
        self.position.unwrap_or(0)
    }

    fn is_end(&self) -> bool {
        if let Some(limit) = self.position_limit {
            debug_assert!(self.position.is_some());
            debug_assert!(self.position.unwrap_or(0) <= limit);
            if self.position.unwrap_or(0) >= limit {
                return true;
            }
        }
        self.current.is_none()
    }

    fn set_size_limit(&mut self, size: u64) {
        self.position_limit = Some(self.position.unwrap_or(0) + size)
    }

    fn clear_size_limit(&mut self) {
        self.position_limit = None
    }
}
