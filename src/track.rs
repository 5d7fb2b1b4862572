//! A single logical track and its conversion into an ordered event stream.

use crate::{
    event::{Event, EventKind, MetaMessage},
    prelude::*,
};

/// Appended after the last event of every track when it is encoded.
static END_OF_TRACK: EventKind = EventKind::Meta(MetaMessage::EndOfTrack);

/// A collection of timestamped events belonging to one MIDI track.
///
/// Events are kept in the order they were added; [`Track::ordered`](#method.ordered) sorts them
/// by time.
/// Tracks are created and mutated through a [`Score`](struct.Score.html).
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Track {
    channel: u4,
    name: Option<String>,
    events: Vec<Event>,
}
impl Track {
    pub(crate) fn new() -> Track {
        Track::default()
    }

    /// The default channel of this track, used by the score methods that take no explicit
    /// channel.
    #[inline]
    pub fn channel(&self) -> u4 {
        self.channel
    }

    /// The most recently added track name, if any.
    ///
    /// Every call to `add_track_name` also appends its own track name event, so a track can
    /// contain several of them.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// All events in this track, in insertion order.
    #[inline]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The tick of the latest event in this track, or `0` for an empty track.
    ///
    /// This is where the end of track marker is placed.
    pub fn end_tick(&self) -> u32 {
        self.events.iter().map(|ev| ev.tick).max().unwrap_or(0)
    }

    /// All events sorted by ascending tick.
    ///
    /// Events sharing a tick are ordered note-offs first, then program changes, then note-ons,
    /// then meta events.
    /// Within each of these groups events keep their insertion order.
    pub fn ordered(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.events.iter().collect();
        //Must be stable
        events.sort_by_key(|ev| (ev.tick, ev.kind.tick_rank()));
        events
    }

    /// The ordered events with their delta-times, followed by the end of track marker.
    pub fn stream(&self) -> Vec<TrackEvent> {
        let ordered = self.ordered();
        let mut stream = Vec::with_capacity(ordered.len() + 1);
        let mut last_tick = 0;
        for ev in ordered {
            stream.push(TrackEvent {
                tick: ev.tick,
                delta: ev.tick - last_tick,
                kind: &ev.kind,
            });
            last_tick = ev.tick;
        }
        stream.push(TrackEvent {
            tick: last_tick,
            delta: 0,
            kind: &END_OF_TRACK,
        });
        stream
    }

    pub(crate) fn set_channel(&mut self, channel: u4) {
        self.channel = channel;
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_owned());
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// An event of an ordered track stream, as it will be laid out in the file.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TrackEvent<'a> {
    /// The absolute tick of the event.
    pub tick: u32,
    /// How many MIDI ticks after the previous event should this event fire.
    pub delta: u32,
    /// The type of event along with event-specific data.
    pub kind: &'a EventKind,
}
