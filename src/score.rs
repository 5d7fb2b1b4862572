//! The top-level handle used to build a file.

use crate::{
    event::{Event, MetaMessage, MidiMessage, TimeSignature},
    io::write_atomic,
    prelude::*,
    primitive::{varlen, Format, Timing},
    smf::{self, Header},
    track::Track,
};

/// Settings fixed at the time a [`Score`](struct.Score.html) is created.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct ScoreOptions {
    /// The time resolution of every tick in the file.
    ///
    /// Defaults to 480 ticks per quarter note.
    pub timing: Timing,
    /// The file format written into the header.
    ///
    /// If `None`, single-track files are written as `Format::SingleTrack` and files with more
    /// than one track as `Format::Parallel`.
    pub format: Option<Format>,
    /// Whether to omit repeated status bytes of consecutive channel messages.
    ///
    /// Disabled by default, so that every channel message carries its own status byte.
    pub running_status: bool,
}
impl Default for ScoreOptions {
    fn default() -> ScoreOptions {
        ScoreOptions {
            timing: Timing::default(),
            format: None,
            running_status: false,
        }
    }
}

/// A multi-track Standard Midi File under construction.
///
/// Track `0` exists as soon as the score is created.
/// Events are appended to tracks through the `add_*` methods, placed at absolute ticks, in
/// any order.
///
/// Every method validates its arguments before touching the score: if an error is returned the
/// score is left exactly as it was.
///
/// Saving does not consume the score, so more events can be added after a save and the
/// score saved again.
///
/// A `Score` is a plain owned value. It can be moved to another thread, but mutating it from
/// several threads requires external synchronization such as a `Mutex`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Score {
    options: ScoreOptions,
    tracks: Vec<Track>,
}
impl Default for Score {
    fn default() -> Score {
        Score::new()
    }
}
impl Score {
    /// Create a score with the default options, holding a single empty track.
    pub fn new() -> Score {
        Score::with_options(ScoreOptions::default())
    }

    /// Create a score holding a single empty track.
    pub fn with_options(options: ScoreOptions) -> Score {
        Score {
            options,
            tracks: vec![Track::new()],
        }
    }

    #[inline]
    pub fn options(&self) -> &ScoreOptions {
        &self.options
    }

    /// The header that will be written for the current contents of the score.
    pub fn header(&self) -> Header {
        let format = self
            .options
            .format
            .unwrap_or_else(|| Format::for_track_count(self.tracks.len()));
        Header::new(format, self.options.timing)
    }

    #[inline]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Append a new empty track, returning its index.
    ///
    /// A file can hold at most 65535 tracks.
    pub fn add_track(&mut self) -> Result<usize> {
        ensure!(self.tracks.len() < u16::MAX as usize, Error::TooManyTracks);
        self.tracks.push(Track::new());
        Ok(self.tracks.len() - 1)
    }

    /// Set the default channel (`0..=15`) of a track.
    ///
    /// The default channel is used by [`add_channel_note`](#method.add_channel_note) and
    /// [`set_program`](#method.set_program).
    pub fn set_channel(&mut self, track: usize, channel: u8) -> Result<()> {
        const CALL: &str = "set_channel";
        let channel = u4::check(channel, CALL, "channel")?;
        self.track_mut(CALL, track)?.set_channel(channel);
        Ok(())
    }

    /// Add a note on the given channel, starting at `start` and lasting `duration` ticks.
    ///
    /// This produces two events: a note-on at `start` and a note-off with velocity 0 at
    /// `start + duration`.
    pub fn add_note(
        &mut self,
        track: usize,
        channel: u8,
        start: u32,
        duration: u32,
        pitch: u8,
        velocity: u8,
    ) -> Result<()> {
        self.note("add_note", track, channel, start, duration, pitch, velocity, 0)
    }

    /// Same as [`add_note`](#method.add_note), but with an explicit note-off velocity.
    #[allow(clippy::too_many_arguments)]
    pub fn add_note_with_release(
        &mut self,
        track: usize,
        channel: u8,
        start: u32,
        duration: u32,
        pitch: u8,
        velocity: u8,
        release_velocity: u8,
    ) -> Result<()> {
        self.note(
            "add_note_with_release",
            track,
            channel,
            start,
            duration,
            pitch,
            velocity,
            release_velocity,
        )
    }

    /// Same as [`add_note`](#method.add_note), on the default channel of the track.
    pub fn add_channel_note(
        &mut self,
        track: usize,
        start: u32,
        duration: u32,
        pitch: u8,
        velocity: u8,
    ) -> Result<()> {
        const CALL: &str = "add_channel_note";
        let channel = self.track_ref(CALL, track)?.channel().as_int();
        self.note(CALL, track, channel, start, duration, pitch, velocity, 0)
    }

    /// Change the program (instrument) of the track's default channel at the given tick.
    pub fn set_program(&mut self, track: usize, tick: u32, program: u8) -> Result<()> {
        const CALL: &str = "set_program";
        let tick = check_tick(CALL, "tick", tick)?;
        let program = u7::check(program, CALL, "program")?;
        let track = self.track_mut(CALL, track)?;
        let channel = track.channel();
        track.push(Event::midi(
            tick,
            channel,
            MidiMessage::ProgramChange { program },
        ));
        Ok(())
    }

    /// Set the tempo, in beats (quarter notes) per minute, from the given tick onwards.
    ///
    /// The tempo is stored as `round(60_000_000 / bpm)` microseconds per quarter note.
    /// Tempos that are not positive, or too slow to be represented (below about 3.58 BPM), are
    /// rejected.
    pub fn add_bpm(&mut self, track: usize, tick: u32, bpm: f64) -> Result<()> {
        const CALL: &str = "add_bpm";
        let tick = check_tick(CALL, "tick", tick)?;
        //Only the integral part of the bpm is reported
        let tempo = MetaMessage::tempo_from_bpm(bpm).ok_or_else(|| {
            Error::invalid(
                CALL,
                "bpm",
                bpm as i64,
                "expected a positive tempo that fits in 24 bits",
            )
        })?;
        self.track_mut(CALL, track)?.push(Event::meta(tick, tempo));
        Ok(())
    }

    /// Set the time signature from the given tick onwards.
    ///
    /// The numerator must be in `1..=255` and the denominator must be a power of two (`4` for
    /// quarter notes, `8` for eighth notes...).
    /// The metronome fields are set to 24 MIDI clocks per click and 8 32nd notes per quarter.
    pub fn add_time_signature(
        &mut self,
        track: usize,
        tick: u32,
        numerator: u32,
        denominator: u32,
    ) -> Result<()> {
        const CALL: &str = "add_time_signature";
        let sig = TimeSignature::checked(CALL, numerator, denominator)?;
        self.time_signature(CALL, track, tick, sig)
    }

    /// Set the time signature from the given tick onwards, with custom metronome fields.
    pub fn insert_time_signature(
        &mut self,
        track: usize,
        tick: u32,
        sig: TimeSignature,
    ) -> Result<()> {
        self.time_signature("insert_time_signature", track, tick, sig)
    }

    /// Name a track, placing the name event at tick `0`.
    pub fn add_track_name(&mut self, track: usize, name: &str) -> Result<()> {
        self.track_name("add_track_name", track, name, 0)
    }

    /// Name a track, placing the name event at the given tick.
    ///
    /// Every call appends a separate name event, and [`Track::name`](struct.Track.html#method.name)
    /// reports the latest one.
    pub fn add_track_name_at(&mut self, track: usize, name: &str, tick: u32) -> Result<()> {
        self.track_name("add_track_name_at", track, name, tick)
    }

    /// Encode the score and write it into the given generic writer.
    ///
    /// If the score cannot be encoded nothing is written.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        smf::write(&self.header(), &self.tracks, self.options.running_status, out)
    }

    /// Encode the score into an in-memory `.mid` file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        smf::encode(&self.header(), &self.tracks, self.options.running_status)
    }

    /// Encode the score and save it at the given path.
    ///
    /// Either the complete file is written, or the call fails and any previous file at `path`
    /// is left untouched.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fn save_impl(score: &Score, path: &Path) -> Result<()> {
            let bytes = score.to_bytes()?;
            write_atomic(path, &bytes)?;
            debug!(
                "saved {} ({} bytes, {} tracks)",
                path.display(),
                bytes.len(),
                score.tracks.len()
            );
            Ok(())
        }
        save_impl(self, path.as_ref())
    }

    #[allow(clippy::too_many_arguments)]
    fn note(
        &mut self,
        call: &'static str,
        track: usize,
        channel: u8,
        start: u32,
        duration: u32,
        pitch: u8,
        velocity: u8,
        release_velocity: u8,
    ) -> Result<()> {
        let channel = u4::check(channel, call, "channel")?;
        let key = u7::check(pitch, call, "pitch")?;
        let vel = u7::check(velocity, call, "velocity")?;
        let release = u7::check(release_velocity, call, "release_velocity")?;
        let start = check_tick(call, "start_tick", start)?;
        ensure!(
            duration > 0,
            Error::invalid(call, "duration_ticks", duration, "expected a positive duration")
        );
        let end = start.checked_add(duration).unwrap_or(u32::MAX);
        let end = check_tick(call, "duration_ticks", end)?;
        let track = self.track_mut(call, track)?;
        track.push(Event::midi(start, channel, MidiMessage::NoteOn { key, vel }));
        track.push(Event::midi(
            end,
            channel,
            MidiMessage::NoteOff { key, vel: release },
        ));
        Ok(())
    }

    fn time_signature(
        &mut self,
        call: &'static str,
        track: usize,
        tick: u32,
        sig: TimeSignature,
    ) -> Result<()> {
        let tick = check_tick(call, "tick", tick)?;
        self.track_mut(call, track)?
            .push(Event::meta(tick, MetaMessage::TimeSignature(sig)));
        Ok(())
    }

    fn track_name(
        &mut self,
        call: &'static str,
        track: usize,
        name: &str,
        tick: u32,
    ) -> Result<()> {
        let tick = check_tick(call, "tick", tick)?;
        ensure!(
            name.len() <= varlen::MAX as usize,
            Error::TextTooLong {
                call,
                len: name.len(),
            }
        );
        let track = self.track_mut(call, track)?;
        track.push(Event::meta(
            tick,
            MetaMessage::TrackName(name.as_bytes().to_vec()),
        ));
        track.set_name(name);
        Ok(())
    }

    fn track_ref(&self, call: &'static str, index: usize) -> Result<&Track> {
        let count = self.tracks.len();
        self.tracks
            .get(index)
            .ok_or_else(|| track_index_err(call, index, count))
    }

    fn track_mut(&mut self, call: &'static str, index: usize) -> Result<&mut Track> {
        let count = self.tracks.len();
        self.tracks
            .get_mut(index)
            .ok_or_else(|| track_index_err(call, index, count))
    }
}

fn track_index_err(call: &'static str, index: usize, count: usize) -> Error {
    warn!("rejected track index {} in {} ({} tracks)", index, call, count);
    Error::TrackIndex { call, index, count }
}

/// Absolute ticks are capped to the varlen range, so that no delta-time can overflow it.
fn check_tick(call: &'static str, field: &'static str, tick: u32) -> Result<u32> {
    ensure!(
        tick <= varlen::MAX,
        Error::invalid(call, field, tick, "tick exceeds 0x0FFFFFFF")
    );
    Ok(tick)
}
