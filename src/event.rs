//! All sort of events and their encoders.

use crate::{prelude::*, primitive::write_varlen_slice};

/// A single timestamped event inside a track.
///
/// Unlike the events stored in a `.mid` file, which carry a delta-time relative to the
/// previous event, these carry an absolute tick counted from the start of the file.
/// Delta-times are computed when the track is encoded.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Event {
    /// The absolute tick at which this event fires.
    pub tick: u32,
    /// The type of event along with event-specific data.
    pub kind: EventKind,
}
impl Event {
    #[inline]
    pub fn new(tick: u32, kind: EventKind) -> Event {
        Event { tick, kind }
    }

    pub(crate) fn midi(tick: u32, channel: u4, message: MidiMessage) -> Event {
        Event::new(tick, EventKind::Midi { channel, message })
    }

    pub(crate) fn meta(tick: u32, meta: MetaMessage) -> Event {
        Event::new(tick, EventKind::Meta(meta))
    }
}

/// Represents the different kinds of events a track can hold.
///
/// It notably does *not* include the timing of the event; the `Event` struct is responsible
/// for this.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum EventKind {
    /// A message associated to a MIDI channel carrying musical data.
    Midi {
        /// The MIDI channel that this event is associated with.
        channel: u4,
        /// The MIDI message type and associated data.
        message: MidiMessage,
    },
    /// A meta-message, giving extra information for correct playback, like tempo or track name.
    Meta(MetaMessage),
}
impl EventKind {
    /// Where this event goes relative to other events sharing the same tick.
    ///
    /// Note-offs go first so that a note ending exactly where another one starts on the same
    /// key never overlaps it, then program changes so that notes starting on that tick already
    /// use the new program, then note-ons, then meta events.
    #[inline]
    pub(crate) fn tick_rank(&self) -> u8 {
        match self {
            EventKind::Midi {
                message: MidiMessage::NoteOff { .. },
                ..
            } => 0,
            EventKind::Midi {
                message: MidiMessage::ProgramChange { .. },
                ..
            } => 1,
            EventKind::Midi {
                message: MidiMessage::NoteOn { .. },
                ..
            } => 2,
            EventKind::Meta(_) => 3,
        }
    }

    /// Writes a single event to the given output buffer, without its delta-time.
    ///
    /// `running_status` keeps track of the last MIDI status, in order to make proper use of
    /// running status. It should be shared between consecutive calls, and should initially be set
    /// to `None`.
    /// Resetting it to `None` before every call disables running status altogether.
    pub(crate) fn write(
        &self,
        running_status: &mut Option<u8>,
        out: &mut Vec<u8>,
    ) -> StdResult<(), &'static str> {
        //Running Status rules:
        // - MIDI Messages (0x80 ..= 0xEF) alter and use running status
        // - Meta Messages (0xFF) cancel and cannot use running status
        match self {
            EventKind::Midi { channel, message } => {
                let status = message.status_nibble() << 4 | channel.as_int();
                if Some(status) != *running_status {
                    //Explicitly write status
                    out.push(status);
                    *running_status = Some(status);
                }
                message.write(out);
            }
            EventKind::Meta(meta) => {
                *running_status = None;
                out.push(0xFF);
                meta.write(out)?;
            }
        }
        Ok(())
    }
}

/// Represents a MIDI message, associated to a MIDI channel.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum MidiMessage {
    /// Stop playing a note.
    NoteOff {
        /// The MIDI key to stop playing.
        key: u7,
        /// The velocity with which to stop playing it.
        vel: u7,
    },
    /// Start playing a note.
    NoteOn {
        /// The key to start playing.
        key: u7,
        /// The velocity (strength) with which to press it.
        vel: u7,
    },
    /// Change the program (also known as instrument) for a channel.
    ProgramChange {
        /// The new program (instrument) to use for the channel.
        program: u7,
    },
}
impl MidiMessage {
    /// Get the raw status nibble for this MIDI message type.
    pub(crate) fn status_nibble(&self) -> u8 {
        match self {
            MidiMessage::NoteOff { .. } => 0x8,
            MidiMessage::NoteOn { .. } => 0x9,
            MidiMessage::ProgramChange { .. } => 0xC,
        }
    }
    /// Write the data part of this message, not including the status.
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        match self {
            MidiMessage::NoteOff { key, vel } | MidiMessage::NoteOn { key, vel } => {
                out.extend_from_slice(&[key.as_int(), vel.as_int()])
            }
            MidiMessage::ProgramChange { program } => out.push(program.as_int()),
        }
    }
}

/// A "meta message", as defined by the SMF spec.
/// These events carry metadata about the track, such as tempo, time signature or name.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum MetaMessage {
    /// Information about the name of the track.
    TrackName(Vec<u8>),
    /// Obligatory at track end.
    ///
    /// Never stored in a track: it is appended automatically when the track is encoded.
    EndOfTrack,
    /// Amount of microseconds per beat (quarter note).
    Tempo(u24),
    /// Numerator, denominator and metronome information.
    TimeSignature(TimeSignature),
}
impl MetaMessage {
    /// The meta-message identifier byte, following the `0xFF` status.
    pub fn type_byte(&self) -> u8 {
        match self {
            MetaMessage::TrackName(_) => 0x03,
            MetaMessage::EndOfTrack => 0x2F,
            MetaMessage::Tempo(_) => 0x51,
            MetaMessage::TimeSignature(_) => 0x58,
        }
    }

    /// Build a tempo message from a beats-per-minute value.
    ///
    /// The tempo is stored as `round(60_000_000 / bpm)` microseconds per quarter note, which
    /// must fit in 24 bits and be nonzero.
    pub fn tempo_from_bpm(bpm: f64) -> Option<MetaMessage> {
        const MICROS_PER_MINUTE: f64 = 60_000_000.0;
        if !bpm.is_finite() || bpm <= 0.0 {
            return None;
        }
        let micros = (MICROS_PER_MINUTE / bpm).round();
        if micros < 1.0 || micros > u24::max_value().as_int() as f64 {
            return None;
        }
        Some(MetaMessage::Tempo(u24::new(micros as u32)))
    }

    fn write(&self, out: &mut Vec<u8>) -> StdResult<(), &'static str> {
        out.push(self.type_byte());
        let mut write_data = |data: &[u8]| {
            write_varlen_slice(data, out).ok_or("meta message data exceeds 28 bits")
        };
        match self {
            MetaMessage::TrackName(data) => write_data(data),
            MetaMessage::EndOfTrack => write_data(&[]),
            MetaMessage::Tempo(microsperbeat) => {
                write_data(&microsperbeat.as_int().to_be_bytes()[1..])
            }
            MetaMessage::TimeSignature(sig) => write_data(&sig.encode()),
        }
    }
}

/// A time signature, as laid out in the time signature meta-message.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct TimeSignature {
    numerator: u8,
    denominator_pow: u8,
    clocks_per_click: u8,
    thirty_seconds_per_quarter: u8,
}
impl TimeSignature {
    /// MIDI clocks per metronome click used unless configured otherwise.
    pub const DEFAULT_CLOCKS_PER_CLICK: u8 = 24;
    /// Notated 32nd notes per MIDI quarter note used unless configured otherwise.
    pub const DEFAULT_THIRTY_SECONDS_PER_QUARTER: u8 = 8;

    /// Create a time signature such as `3/4` or `6/8`.
    ///
    /// The numerator must be in `1..=255`, the denominator must be a power of two (1, 2, 4,
    /// 8...).
    pub fn new(numerator: u32, denominator: u32) -> Result<TimeSignature> {
        TimeSignature::checked("TimeSignature::new", numerator, denominator)
    }

    pub(crate) fn checked(
        call: &'static str,
        numerator: u32,
        denominator: u32,
    ) -> Result<TimeSignature> {
        ensure!(
            (1..=255).contains(&numerator),
            Error::invalid(call, "numerator", numerator, "expected 1..=255")
        );
        ensure!(
            denominator.is_power_of_two(),
            Error::invalid(call, "denominator", denominator, "expected a power of two")
        );
        Ok(TimeSignature {
            numerator: numerator as u8,
            denominator_pow: denominator.trailing_zeros() as u8,
            clocks_per_click: Self::DEFAULT_CLOCKS_PER_CLICK,
            thirty_seconds_per_quarter: Self::DEFAULT_THIRTY_SECONDS_PER_QUARTER,
        })
    }

    /// Replace the metronome fields.
    pub fn with_metronome(self, clocks_per_click: u8, thirty_seconds_per_quarter: u8) -> Self {
        TimeSignature {
            clocks_per_click,
            thirty_seconds_per_quarter,
            ..self
        }
    }

    #[inline]
    pub fn numerator(&self) -> u8 {
        self.numerator
    }

    /// The denominator as a note value, such as `4` for quarter notes.
    #[inline]
    pub fn denominator(&self) -> u32 {
        1 << self.denominator_pow
    }

    /// The denominator as it is stored in the file, a power of two exponent.
    #[inline]
    pub fn denominator_pow(&self) -> u8 {
        self.denominator_pow
    }

    #[inline]
    pub fn clocks_per_click(&self) -> u8 {
        self.clocks_per_click
    }

    #[inline]
    pub fn thirty_seconds_per_quarter(&self) -> u8 {
        self.thirty_seconds_per_quarter
    }

    pub(crate) fn encode(&self) -> [u8; 4] {
        [
            self.numerator,
            self.denominator_pow,
            self.clocks_per_click,
            self.thirty_seconds_per_quarter,
        ]
    }
}
