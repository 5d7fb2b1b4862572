//! Simple building-block data with a known encoding.
//! Restricted integers, the variable-length quantity codec and the header fields.

use crate::prelude::*;
use std::fmt;

/// Slightly restricted integers.
macro_rules! restricted_int {
    {$(#[$attr:meta])* $name:ident : $inner:tt => $bits:expr} => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default)]
        #[repr(transparent)]
        #[allow(non_camel_case_types)]
        pub struct $name($inner);
        impl From<$name> for $inner {
            #[inline]
            fn from(restricted: $name) -> $inner {restricted.0}
        }
        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
        impl $name {
            const MASK: $inner = (1 << $bits) - 1;

            /// The maximum value that this restricted integer can hold.
            #[inline]
            pub const fn max_value() -> $name {
                $name (Self::MASK)
            }

            /// Creates a restricted int from its non-restricted counterpart by masking off the
            /// extra bits.
            #[inline]
            pub const fn new(raw: $inner) -> $name {
                $name (raw & Self::MASK)
            }

            /// Returns `Some` if the raw integer is within range of the restricted integer, and
            /// `None` otherwise.
            #[inline]
            pub fn try_from(raw: $inner) -> Option<$name> {
                if raw <= Self::MASK {
                    Some($name(raw))
                }else{
                    None
                }
            }

            /// Get the inner integer out of the wrapper.
            /// The inner integer is guaranteed to be in range of the restricted wrapper.
            #[inline]
            pub fn as_int(self) -> $inner {
                Into::into(self)
            }

            /// Validate an argument of a public call, producing a validation error naming the
            /// call and the field if it is out of range.
            pub(crate) fn check(
                raw: impl Into<i64>,
                call: &'static str,
                field: &'static str,
            ) -> Result<$name> {
                let raw = raw.into();
                if raw < 0 || raw > Self::MASK as i64 {
                    return Err(Error::invalid(
                        call,
                        field,
                        raw,
                        concat!("expected ", stringify!($name)),
                    ));
                }
                Ok($name(raw as $inner))
            }
        }
        impl PartialEq<$inner> for $name {
            fn eq(&self, rhs: &$inner) -> bool {
                self.as_int() == *rhs
            }
        }
        impl PartialOrd<$inner> for $name {
            fn partial_cmp(&self, rhs: &$inner) -> Option<std::cmp::Ordering> {
                Some(self.as_int().cmp(rhs))
            }
        }
    };
}
restricted_int! {
    /// A 15-bit integer type.
    ///
    /// Wraps the `u16` type and ensures that the top bit is always zero.
    u15: u16 => 15
}
restricted_int! {
    /// A 7-bit integer type.
    ///
    /// Wraps the `u8` type and ensures that the top bit is always zero.
    u7: u8 => 7
}
restricted_int! {
    /// A 4-bit integer type.
    ///
    /// Wraps the `u8` type and ensures that the top 4 bits are always zero.
    u4: u8 => 4
}
restricted_int! {
    /// A 24-bit integer type.
    ///
    /// Wraps the `u32` type and ensures that the top 8 bits are always zero.
    u24: u32 => 24
}
restricted_int! {
    /// Referred to in the MIDI spec as "variable length int".
    u28: u32 => 28
}

impl u28 {
    pub(crate) fn write_varlen(&self, out: &mut Vec<u8>) {
        let int = self.as_int();
        let mut skipping = true;
        for i in (0..4).rev() {
            let byte = ((int >> (i * 7)) & 0x7F) as u8;
            if skipping && byte == 0 && i != 0 {
                //Skip these leading zeros
            } else {
                //Write down this u7
                skipping = false;
                let byte = if i == 0 {
                    //Last byte
                    byte
                } else {
                    //Leading byte
                    byte | 0x80
                };
                out.push(byte);
            }
        }
    }
}

/// The MIDI variable-length quantity format.
///
/// Integers are packed into 1 to 4 bytes, 7 bits of payload per byte, most significant byte
/// first.
/// Every byte except for the last one has its top bit set.
pub mod varlen {
    use super::*;

    /// The largest integer that can be encoded, `0x0FFFFFFF`.
    pub const MAX: u32 = 0x0FFF_FFFF;

    /// Encode an integer into its variable-length representation.
    ///
    /// Integers above [`MAX`](constant.MAX.html) are rejected rather than truncated.
    pub fn encode(int: u32) -> Result<Vec<u8>> {
        let int = u28::try_from(int).ok_or(Error::VarlenOverflow(int))?;
        let mut out = Vec::with_capacity(4);
        int.write_varlen(&mut out);
        Ok(out)
    }

    /// Decode a variable-length integer from the start of `raw`.
    ///
    /// Returns the integer along with the amount of bytes it spanned.
    pub fn decode(raw: &[u8]) -> Result<(u32, usize)> {
        let mut int: u32 = 0;
        for (i, &byte) in raw.iter().take(4).enumerate() {
            int <<= 7;
            int |= (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok((int, i + 1));
            }
        }
        if raw.len() < 4 {
            Err(Error::VarlenTruncated)
        } else {
            Err(Error::VarlenTooLong)
        }
    }

    /// The amount of bytes `int` takes up when encoded.
    pub fn encoded_len(int: u28) -> usize {
        match int.as_int() {
            0..=0x7F => 1,
            0x80..=0x3FFF => 2,
            0x4000..=0x1F_FFFF => 3,
            _ => 4,
        }
    }
}

/// Write a slice represented as a varlen `u28` as its length and then the raw bytes.
pub(crate) fn write_varlen_slice(slice: &[u8], out: &mut Vec<u8>) -> Option<()> {
    let len = u32::try_from(slice.len()).ok().and_then(u28::try_from)?;
    len.write_varlen(out);
    out.extend_from_slice(slice);
    Some(())
}

/// The order in which tracks should be laid out when playing back this SMF file.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Format {
    /// This file should have a single track only.
    ///
    /// Encoding a score with more than one track as `Format::SingleTrack` fails.
    SingleTrack,
    /// This file has several tracks that should be played simultaneously.
    ///
    /// Usually the first track controls tempo and other song metadata.
    Parallel,
    /// This file has several tracks, each one a separate song.
    ///
    /// The tracks should be played sequentially, as completely separate MIDI tracks packaged
    /// within a single SMF file.
    Sequential,
}
impl Format {
    /// The format used when none is configured: single-track files for a single track, and
    /// parallel tracks otherwise.
    pub fn for_track_count(track_count: usize) -> Format {
        if track_count > 1 {
            Format::Parallel
        } else {
            Format::SingleTrack
        }
    }

    pub(crate) fn encode(&self) -> [u8; 2] {
        let code: u16 = match self {
            Format::SingleTrack => 0,
            Format::Parallel => 1,
            Format::Sequential => 2,
        };
        code.to_be_bytes()
    }
}

/// The timing for an SMF file.
/// This can be in ticks/beat or ticks/second.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Timing {
    /// Specifies ticks/beat as a 15-bit integer.
    ///
    /// The length of a beat is not standard, so in order to fully describe the length of a MIDI
    /// tick a tempo event should be present.
    Metrical(u15),
    /// Specifies ticks/second by dividing a second into frames and then into subframes.
    /// Therefore the length of of a tick is `1/fps/subframe`.
    Timecode(Fps, u8),
}
impl Timing {
    /// Ticks-per-quarter-note timing. Zero ticks per beat is rejected.
    pub fn metrical(ticks_per_beat: u16) -> Result<Timing> {
        let ppq = u15::check(ticks_per_beat, "Timing::metrical", "ticks_per_beat")?;
        ensure!(
            ppq.as_int() > 0,
            Error::invalid("Timing::metrical", "ticks_per_beat", 0, "must be positive")
        );
        Ok(Timing::Metrical(ppq))
    }

    /// Timecode timing from a frame rate (`24`, `25`, `29` or `30`) and a nonzero amount of
    /// ticks per frame.
    pub fn timecode(fps: u8, ticks_per_frame: u8) -> Result<Timing> {
        const CALL: &str = "Timing::timecode";
        let fps = Fps::from_int(fps)
            .ok_or_else(|| Error::invalid(CALL, "fps", fps, "expected 24, 25, 29 or 30"))?;
        ensure!(
            ticks_per_frame > 0,
            Error::invalid(CALL, "ticks_per_frame", 0, "must be positive")
        );
        Ok(Timing::Timecode(fps, ticks_per_frame))
    }

    /// Whether the division field describes a nonzero tick length.
    pub fn is_valid(&self) -> bool {
        match self {
            Timing::Metrical(ppq) => ppq.as_int() > 0,
            Timing::Timecode(_, ticks_per_frame) => *ticks_per_frame > 0,
        }
    }

    pub(crate) fn encode(&self) -> [u8; 2] {
        match self {
            Timing::Metrical(ticksperbeat) => ticksperbeat.as_int().to_be_bytes(),
            Timing::Timecode(framespersec, ticksperframe) => {
                [(-(framespersec.as_int() as i8)) as u8, *ticksperframe]
            }
        }
    }
}
impl Default for Timing {
    fn default() -> Timing {
        Timing::Metrical(u15::new(480))
    }
}

/// One of the four FPS values available for SMPTE times, as defined by the MIDI standard.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Fps {
    /// 24 frames per second.
    Fps24,
    /// 25 frames per second.
    Fps25,
    /// Actually `29.97 = 30 / 1.001` frames per second.
    ///
    /// Quite an exotic value because of interesting historical reasons.
    Fps29,
    /// 30 frames per second.
    Fps30,
}
impl Fps {
    /// Converts an integer representing the semantic fps to an `Fps` value (ie. `24` -> `Fps24`).
    #[inline]
    pub fn from_int(raw: u8) -> Option<Fps> {
        Some(match raw {
            24 => Fps::Fps24,
            25 => Fps::Fps25,
            29 => Fps::Fps29,
            30 => Fps::Fps30,
            _ => return None,
        })
    }

    /// Get the integral approximate fps out.
    #[inline]
    pub fn as_int(self) -> u8 {
        match self {
            Fps::Fps24 => 24,
            Fps::Fps25 => 25,
            Fps::Fps29 => 29,
            Fps::Fps30 => 30,
        }
    }
}
