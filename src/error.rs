use thiserror::Error;

/// Represents an error while building, encoding or saving a Standard Midi File.
///
/// Errors fall into three broad categories:
///
/// - Validation errors, raised by the call that introduces an invalid value (a pitch above 127,
///   a reference to a track that does not exist, etc...). The score is never modified when a
///   validation error is returned.
/// - Encode errors, raised while serializing a score whose contents cannot be represented in a
///   Standard Midi File. Validation normally prevents these, so they signal a broken invariant.
///   Nothing is written when an encode error is returned.
/// - I/O errors, surfaced verbatim from the underlying writer or filesystem.
///
/// No error is fatal: every failure is returned to the caller, and the score stays usable.
#[derive(Error, Debug)]
pub enum Error {
    /// A value passed to `call` is outside of the range the MIDI format can represent.
    #[error("invalid {field} in {call}: {value} ({reason})")]
    Validation {
        /// The operation that was called, such as `add_note`.
        call: &'static str,
        /// The offending argument.
        field: &'static str,
        /// The rejected value.
        value: i64,
        /// Which constraint was violated.
        reason: &'static str,
    },

    /// A track index passed to `call` does not refer to an existing track.
    #[error("invalid track index in {call}: {index} (score has {count} tracks)")]
    TrackIndex {
        call: &'static str,
        index: usize,
        count: usize,
    },

    /// The track count would not fit in the 16-bit header field.
    #[error("too many tracks: a standard midi file holds at most 65535 tracks")]
    TooManyTracks,

    /// A text payload is too long for its variable-length size prefix.
    #[error("text passed to {call} is too long: {len} bytes exceeds the 28-bit length range")]
    TextTooLong { call: &'static str, len: usize },

    /// An integer above `0x0FFFFFFF` cannot be represented as a variable-length quantity.
    #[error("varlen integer out of range: {0:#x} exceeds 28 bits")]
    VarlenOverflow(u32),

    /// The input ended in the middle of a variable-length quantity.
    #[error("unexpected eof while reading varlen int")]
    VarlenTruncated,

    /// A variable-length quantity spans more than 4 bytes.
    #[error("varlen integer larger than 4 bytes")]
    VarlenTooLong,

    /// The score cannot be encoded.
    #[error("cannot encode event {event} of track {track}: {reason}")]
    Encode {
        track: usize,
        event: usize,
        reason: &'static str,
    },

    /// The underlying writer or filesystem failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
impl Error {
    /// Whether this error was raised while validating the arguments of a call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. }
                | Error::TrackIndex { .. }
                | Error::TooManyTracks
                | Error::TextTooLong { .. }
        )
    }

    /// Whether this error originates from the underlying writer or filesystem.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    pub(crate) fn invalid(
        call: &'static str,
        field: &'static str,
        value: impl Into<i64>,
        reason: &'static str,
    ) -> Error {
        let value = value.into();
        log::warn!("rejected {} = {} in {}: {}", field, value, call, reason);
        Error::Validation {
            call,
            field,
            value,
            reason,
        }
    }
}

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
