//! MPEG video sequence header codec.
//!
//! Only the first 7 bytes after the `00 00 01 B3` start code are touched:
//!
//! ```text
//! byte0    byte1    byte2    byte3
//! wwwwwwww wwwwhhhh hhhhhhhh aaaarrrr
//! ```
//!
//! `w` horizontal size, `h` vertical size, `a` aspect ratio information and
//! `r` the frame rate code, which is carried over untouched. Bytes 4..7 hold
//! the bit rate and are never modified.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::aspect::AspectRatio;

/// Number of header bytes read and written back
pub const HEADER_LEN: usize = 7;

/// The only resolution whose headers are rewritten (PAL SD)
pub const TARGET_WIDTH: u16 = 720;
pub const TARGET_HEIGHT: u16 = 576;

/// Raw sequence header window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceHeader {
    bytes: [u8; HEADER_LEN],
}

/// What happened to one sequence header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOutcome {
    Rewritten { from: u8, to: AspectRatio },
    AlreadyTargeted,
    UnsupportedResolution { width: u16, height: u16 },
    /// Fewer than `HEADER_LEN` bytes left in the store
    Truncated,
}

impl HeaderOutcome {
    pub fn is_modified(&self) -> bool {
        matches!(self, HeaderOutcome::Rewritten { .. })
    }
}

impl SequenceHeader {
    pub fn from_bytes(bytes: [u8; HEADER_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; HEADER_LEN] {
        &self.bytes
    }

    pub fn width(&self) -> u16 {
        (u16::from(self.bytes[0]) << 4) | (u16::from(self.bytes[1]) >> 4)
    }

    pub fn height(&self) -> u16 {
        (u16::from(self.bytes[1] & 0x0f) << 8) | u16::from(self.bytes[2])
    }

    pub fn aspect_code(&self) -> u8 {
        (self.bytes[3] >> 4) & 0x0f
    }

    /// Copy of this header with the aspect nibble replaced
    pub fn with_aspect(&self, ratio: AspectRatio) -> Self {
        let mut bytes = self.bytes;
        bytes[3] = (bytes[3] & 0x0f) | (ratio.code() << 4);
        Self { bytes }
    }

    /// Decide whether this header needs rewriting to `target`.
    ///
    /// Returns the replacement header alongside the outcome when it does.
    pub fn retarget(&self, target: AspectRatio) -> (HeaderOutcome, Option<SequenceHeader>) {
        let (width, height) = (self.width(), self.height());
        if width != TARGET_WIDTH || height != TARGET_HEIGHT {
            return (HeaderOutcome::UnsupportedResolution { width, height }, None);
        }

        let current = self.aspect_code();
        if current == target.code() {
            return (HeaderOutcome::AlreadyTargeted, None);
        }

        (
            HeaderOutcome::Rewritten {
                from: current,
                to: target,
            },
            Some(self.with_aspect(target)),
        )
    }

    /// Read a header window at `offset`; `None` if the store ends first
    pub fn read_at<S: Read + Seek>(store: &mut S, offset: u64) -> io::Result<Option<Self>> {
        store.seek(SeekFrom::Start(offset))?;

        let mut buf = Vec::with_capacity(HEADER_LEN);
        store.by_ref().take(HEADER_LEN as u64).read_to_end(&mut buf)?;

        Ok(<[u8; HEADER_LEN]>::try_from(buf.as_slice())
            .ok()
            .map(Self::from_bytes))
    }

    pub fn write_at<S: Write + Seek>(&self, store: &mut S, offset: u64) -> io::Result<()> {
        store.seek(SeekFrom::Start(offset))?;
        store.write_all(&self.bytes)
    }
}

/// Rewrite the aspect ratio of the header at `offset` if it is a 720x576
/// header carrying a different ratio. The full window is written back.
pub fn decode_and_maybe_rewrite<S: Read + Write + Seek>(
    store: &mut S,
    offset: u64,
    target: AspectRatio,
) -> io::Result<HeaderOutcome> {
    let Some(header) = SequenceHeader::read_at(store, offset)? else {
        return Ok(HeaderOutcome::Truncated);
    };

    let (outcome, replacement) = header.retarget(target);
    if let Some(replacement) = replacement {
        replacement.write_at(store, offset)?;
    }
    Ok(outcome)
}
