//! Descriptor image
//!
//! ``` text
//! v1: | magic = 1 | length | fs_count | hs_count | fs descriptors | hs descriptors |
//! v2: | magic = 3 | length | flags | count (one per flag) .. | descriptors (one set per flag) .. |
//! ```
//!
//! All header fields are 32-bit little endian words. Per-speed descriptors always appear in
//! ascending speed order.

use std::collections::BTreeMap;

use arrayref::array_ref;
use log::debug;

use crate::{Error, Format, Speed, Stream, DESCRIPTORS_MAGIC, DESCRIPTORS_MAGIC_V2};

const WORD: usize = 4;

/// Size of the v1 header
pub const V1_HEAD_SIZE: usize = 4 * WORD;
/// Size of the fixed part of the v2 header; one count word per speed follows it
pub const V2_HEAD_SIZE: usize = 3 * WORD;

/// Size of the header of an image that contains `speeds` descriptor sets
pub fn head_size(format: Format, speeds: usize) -> usize {
    match format {
        Format::V1 => V1_HEAD_SIZE,
        Format::V2 => V2_HEAD_SIZE + speeds * WORD,
    }
}

/// Serializes the per-speed descriptor `streams` into an image of the given `format`
///
/// The size of the image is computed up front and the buffer is allocated once; nothing is
/// returned unless the whole image was written.
pub fn encode(streams: &BTreeMap<Speed, Stream>, format: Format) -> Result<Vec<u8>, Error> {
    if streams.is_empty() {
        return Err(Error::NoDescriptors);
    }

    if let Some(speed) = streams.keys().find(|speed| !format.supports(**speed)) {
        return Err(Error::SpeedNotSupported {
            speed: *speed,
            format,
        });
    }

    let size = head_size(format, streams.len())
        + streams.values().map(Stream::size).sum::<usize>();
    debug!(
        "{} descriptor image: {} speed(s), {} bytes",
        format,
        streams.len(),
        size
    );

    let mut buf = crate::alloc(size)?;
    let count = |speed: Speed| streams.get(&speed).map(|s| s.count() as u32).unwrap_or(0);

    match format {
        Format::V1 => {
            crate::push_u32(&mut buf, DESCRIPTORS_MAGIC);
            crate::push_u32(&mut buf, size as u32);
            crate::push_u32(&mut buf, count(Speed::Full));
            crate::push_u32(&mut buf, count(Speed::High));
        }

        Format::V2 => {
            let flags = streams.keys().fold(0, |flags, speed| flags | speed.flag());

            crate::push_u32(&mut buf, DESCRIPTORS_MAGIC_V2);
            crate::push_u32(&mut buf, size as u32);
            crate::push_u32(&mut buf, flags);
            for stream in streams.values() {
                crate::push_u32(&mut buf, stream.count() as u32);
            }
        }
    }

    // `BTreeMap` iterates in ascending speed order
    for (speed, stream) in streams {
        debug!(
            "{}: {} descriptors, {} bytes",
            speed,
            stream.count(),
            stream.size()
        );
        stream.write(&mut buf);
    }

    debug_assert_eq!(buf.len(), size);

    Ok(buf)
}

/// Decoded descriptor image header
#[derive(Clone, Debug, PartialEq)]
pub struct Head {
    pub format: Format,
    /// Total length of the image, header included
    pub length: u32,
    /// `FUNCTIONFS_HAS_*_DESC` flags (v2 only)
    pub flags: Option<u32>,
    /// Number of descriptors of each speed, in image order
    ///
    /// A v1 header always reports full-speed and high-speed counts, even when they are 0
    pub counts: Vec<(Speed, u32)>,
}

impl Head {
    /// Parses the header of the descriptor image `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let word = |offset: usize| -> Result<u32, Error> {
            if bytes.len() < offset + WORD {
                return Err(Error::Truncated);
            }
            Ok(u32::from_le_bytes(*array_ref!(bytes, offset, WORD)))
        };

        let magic = word(0)?;
        let length = word(WORD)?;
        if length as usize != bytes.len() {
            return Err(Error::LengthMismatch {
                header: length,
                actual: bytes.len(),
            });
        }

        match magic {
            DESCRIPTORS_MAGIC => Ok(Head {
                format: Format::V1,
                length,
                flags: None,
                counts: vec![(Speed::Full, word(2 * WORD)?), (Speed::High, word(3 * WORD)?)],
            }),

            DESCRIPTORS_MAGIC_V2 => {
                let flags = word(2 * WORD)?;
                let mut counts = vec![];
                let mut offset = V2_HEAD_SIZE;
                for speed in Speed::ALL.iter().copied() {
                    if flags & speed.flag() != 0 {
                        counts.push((speed, word(offset)?));
                        offset += WORD;
                    }
                }

                Ok(Head {
                    format: Format::V2,
                    length,
                    flags: Some(flags),
                    counts,
                })
            }

            magic => Err(Error::BadMagic(magic)),
        }
    }

    /// Descriptor count of `speed`, if the header has a slot for it
    pub fn count(&self, speed: Speed) -> Option<u32> {
        self.counts
            .iter()
            .find(|(s, _)| *s == speed)
            .map(|(_, count)| *count)
    }

    /// Size of this header on the wire
    pub fn size(&self) -> usize {
        match self.format {
            Format::V1 => V1_HEAD_SIZE,
            Format::V2 => V2_HEAD_SIZE + self.counts.len() * WORD,
        }
    }
}
