//! # Overview
//!
//! `smfwrite` builds multi-track Standard Midi Files (SMF, `.mid` files) from musical intent:
//! notes, tempo changes, time signatures and track names placed at absolute tick positions.
//! The output is byte-exact and deterministic.
//!
//! Usage is as simple as:
//!
//! ```rust
//! use smfwrite::Score;
//!
//! let mut score = Score::new();
//! score.add_bpm(0, 0, 120.0).unwrap();
//! score.add_note(0, 0, 0, 480, 60, 127).unwrap();
//!
//! let bytes = score.to_bytes().unwrap();
//! assert_eq!(&bytes[0..4], b"MThd");
//! ```
//!
//! The [`Score`](struct.Score.html) struct is the main type in the crate.
//! Track `0` exists as soon as a score is created, more tracks are appended with
//! [`Score::add_track`](struct.Score.html#method.add_track).
//!
//! # Absolute ticks
//!
//! Every event is placed at an absolute tick, counted from the start of the file in units of
//! the file's ticks-per-quarter-note resolution (480 by default, see
//! [`ScoreOptions`](struct.ScoreOptions.html)).
//! Events may be added in any order: when the score is encoded each track is sorted by tick and
//! converted into delta-times.
//!
//! Events that share a tick are ordered deterministically: note-offs first, then program
//! changes, then note-ons, then meta events, keeping insertion order within each group.
//! This way a note that ends exactly where another note on the same key begins never produces
//! overlapping-note artifacts.
//!
//! # Writing Standard Midi Files
//!
//! Saving SMF files is done through the `Score::save` method:
//!
//! ```rust,no_run
//! # use smfwrite::Score;
//! let mut score = Score::new();
//! score.add_track_name(0, "Piano").unwrap();
//! score.add_note(0, 0, 0, 480, 60, 100).unwrap();
//! score.save("piano.mid").unwrap();
//! ```
//!
//! The file is written to a temporary file next to the destination and then moved into place,
//! so a failed save never leaves a partially written file behind.
//!
//! SMF files can also be written to an arbitrary writer:
//!
//! ```rust
//! # use smfwrite::Score;
//! # let score = Score::new();
//! let mut in_memory = Vec::new();
//! score.write(&mut in_memory).unwrap();
//!
//! println!("midi file fits in {} bytes!", in_memory.len());
//! ```
//!
//! # Errors
//!
//! Invalid arguments (a pitch above 127, a channel above 15, a tempo of 0 BPM...) are rejected
//! by the call that introduces them, and leave the score untouched.
//! See [`Error`](enum.Error.html) for the full taxonomy.
//!
//! # About features
//!
//! - The `parallel` feature
//!
//!   Encodes track chunks on the `rayon` thread pool.
//!   Chunks are concatenated in track order, so the output is identical to serial encoding.

macro_rules! bail {
    ($err:expr) => {{
        return Err($err.into());
    }};
}
macro_rules! ensure {
    ($cond:expr, $err:expr) => {{
        if !$cond {
            bail!($err)
        }
    }};
}

/// All of the errors this crate produces.
mod error;

mod prelude {
    pub(crate) use crate::{
        error::{Error, Result},
        primitive::{u24, u28, u4, u7},
    };
    pub(crate) use log::{debug, trace, warn};
    pub(crate) use std::{
        convert::TryFrom,
        result::Result as StdResult,
        io::{self, Write},
        path::Path,
    };
}

mod event;
mod io;
mod primitive;
mod score;
mod smf;
mod track;

pub use crate::{
    error::{Error, Result},
    event::{Event, EventKind, MetaMessage, MidiMessage, TimeSignature},
    io::write_atomic,
    primitive::{varlen, Format, Fps, Timing},
    score::{Score, ScoreOptions},
    smf::{write, Header},
    track::{Track, TrackEvent},
};

/// Exotically-sized integers used by the MIDI standard.
pub mod num {
    pub use crate::primitive::{u15, u24, u28, u4, u7};
}

#[cfg(test)]
mod test;
