use crate::{
    num::u15, varlen, Error, Format, Fps, Score, ScoreOptions, TimeSignature, Timing,
};
use pretty_assertions::assert_eq;
use std::fs;

const PPQ: u32 = 480;

/// Split an encoded file into its header body and track bodies.
fn chunks(file: &[u8]) -> (Vec<u8>, Vec<Vec<u8>>) {
    let mut raw = file;
    let mut header = None;
    let mut tracks = Vec::new();
    while !raw.is_empty() {
        let id = &raw[0..4];
        let len = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]) as usize;
        let body = raw[8..8 + len].to_vec();
        match id {
            b"MThd" => header = Some(body),
            b"MTrk" => tracks.push(body),
            _ => panic!("unexpected chunk {:?}", id),
        }
        raw = &raw[8 + len..];
    }
    (header.expect("no header chunk"), tracks)
}

/// Split a track body into `(absolute tick, event bytes)` pairs.
///
/// Only understands the events this crate writes, without running status.
fn events(mut body: &[u8]) -> Vec<(u32, Vec<u8>)> {
    let mut tick = 0;
    let mut out = Vec::new();
    while !body.is_empty() {
        let (delta, used) = varlen::decode(body).unwrap();
        tick += delta;
        body = &body[used..];
        let len = match body[0] {
            0xFF => {
                let (len, used) = varlen::decode(&body[2..]).unwrap();
                2 + used + len as usize
            }
            0xC0..=0xCF => 2,
            _ => 3,
        };
        out.push((tick, body[..len].to_vec()));
        body = &body[len..];
    }
    out
}

fn track_count(header: &[u8]) -> u16 {
    u16::from_be_bytes([header[2], header[3]])
}

mod scenario {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tempo_at_120_bpm() {
        let mut score = Score::new();
        score.add_bpm(0, 0, 120.0).unwrap();
        let (_, tracks) = chunks(&score.to_bytes().unwrap());
        assert_eq!(
            tracks[0],
            [0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, 0x00, 0xFF, 0x2F, 0x00]
        );
        //500000 microseconds per quarter note
        assert_eq!(u32::from_be_bytes([0, 0x07, 0xA1, 0x20]), 500_000);
    }

    #[test]
    fn single_note_file() {
        let mut score = Score::new();
        score.add_note(0, 0, 0, 480, 60, 127).unwrap();
        let bytes = score.to_bytes().unwrap();
        assert_eq!(
            bytes,
            [
                b'M', b'T', b'h', b'd', 0, 0, 0, 6, //
                0, 0, 0, 1, 0x01, 0xE0, //
                b'M', b'T', b'r', b'k', 0, 0, 0, 13, //
                0x00, 0x90, 0x3C, 0x7F, //
                0x83, 0x60, 0x80, 0x3C, 0x00, //
                0x00, 0xFF, 0x2F, 0x00,
            ]
            .to_vec()
        );
    }

    #[test]
    fn three_four_time_signature() {
        let mut score = Score::new();
        score.add_time_signature(0, 0, 3, 4).unwrap();
        let (_, tracks) = chunks(&score.to_bytes().unwrap());
        assert_eq!(
            events(&tracks[0])[0],
            (0, vec![0xFF, 0x58, 0x04, 0x03, 0x02, 0x18, 0x08])
        );
    }

    #[test]
    fn track_name_meta() {
        let mut score = Score::new();
        score.add_track_name(0, "Lead").unwrap();
        let (_, tracks) = chunks(&score.to_bytes().unwrap());
        assert_eq!(
            tracks[0],
            [0x00, 0xFF, 0x03, 0x04, b'L', b'e', b'a', b'd', 0x00, 0xFF, 0x2F, 0x00]
        );
    }
}

mod ordering {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn note_off_precedes_note_on_regardless_of_call_order() {
        //The second note is added first, so its note-on is inserted before the note-off
        let mut score = Score::new();
        score.add_note(0, 0, PPQ, PPQ, 60, 100).unwrap();
        score.add_note(0, 0, 0, PPQ, 60, 100).unwrap();
        let (_, tracks) = chunks(&score.to_bytes().unwrap());
        assert_eq!(
            events(&tracks[0]),
            vec![
                (0, vec![0x90, 60, 100]),
                (PPQ, vec![0x80, 60, 0]),
                (PPQ, vec![0x90, 60, 100]),
                (2 * PPQ, vec![0x80, 60, 0]),
                (2 * PPQ, vec![0xFF, 0x2F, 0x00]),
            ]
        );
    }

    #[test]
    fn meta_events_follow_notes_at_the_same_tick() {
        let mut score = Score::new();
        score.add_track_name(0, "first").unwrap();
        score.add_bpm(0, 0, 120.0).unwrap();
        score.add_note(0, 0, 0, 10, 64, 90).unwrap();
        let evs = events(&chunks(&score.to_bytes().unwrap()).1[0]);
        assert_eq!(evs[0], (0, vec![0x90, 64, 90]));
        assert_eq!(&evs[1].1[..2], &[0xFF, 0x03][..]);
        assert_eq!(&evs[2].1[..2], &[0xFF, 0x51][..]);
    }

    #[test]
    fn unsorted_calls_produce_ascending_ticks() {
        let mut score = Score::new();
        for &(start, pitch) in &[(1440, 67), (0, 60), (960, 64), (480, 62)] {
            score.add_note(0, 1, start, 240, pitch, 80).unwrap();
        }
        let evs = events(&chunks(&score.to_bytes().unwrap()).1[0]);
        let ticks: Vec<u32> = evs.iter().map(|(tick, _)| *tick).collect();
        let mut sorted = ticks.clone();
        sorted.sort();
        assert_eq!(ticks, sorted);
        assert_eq!(evs.len(), 9);
        //End of track sits at the last note-off
        assert_eq!(evs[8], (1680, vec![0xFF, 0x2F, 0x00]));
    }
}

mod structure {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_track_ends_with_end_of_track() {
        let mut score = Score::new();
        score.add_track().unwrap();
        score.add_track().unwrap();
        score.add_note(1, 0, 0, 100, 60, 100).unwrap();
        score.add_bpm(2, 960, 90.0).unwrap();
        let (_, tracks) = chunks(&score.to_bytes().unwrap());
        assert_eq!(tracks.len(), 3);
        for body in &tracks {
            assert!(body.ends_with(&[0xFF, 0x2F, 0x00]));
            let eot_count = events(body)
                .iter()
                .filter(|(_, ev)| ev[..2] == [0xFF, 0x2F])
                .count();
            assert_eq!(eot_count, 1);
        }
        //An empty track is just the end of track marker
        assert_eq!(tracks[0], [0x00, 0xFF, 0x2F, 0x00]);
    }

    #[test]
    fn header_track_count_matches_add_track_calls() {
        let mut score = Score::new();
        for expected in 1..=5 {
            assert_eq!(score.add_track().unwrap(), expected);
        }
        let (header, tracks) = chunks(&score.to_bytes().unwrap());
        assert_eq!(track_count(&header), 6);
        assert_eq!(tracks.len(), 6);
        assert_eq!(score.track_count(), 6);
    }

    #[test]
    fn automatic_format() {
        let mut score = Score::new();
        assert_eq!(chunks(&score.to_bytes().unwrap()).0, [0, 0, 0, 1, 0x01, 0xE0]);
        score.add_track().unwrap();
        assert_eq!(chunks(&score.to_bytes().unwrap()).0, [0, 1, 0, 2, 0x01, 0xE0]);
        assert_eq!(score.header().format, Format::Parallel);
    }

    #[test]
    fn configured_header() {
        let score = Score::with_options(ScoreOptions {
            timing: Timing::Metrical(u15::new(96)),
            format: Some(Format::Parallel),
            ..ScoreOptions::default()
        });
        assert_eq!(chunks(&score.to_bytes().unwrap()).0, [0, 1, 0, 1, 0, 96]);

        let score = Score::with_options(ScoreOptions {
            timing: Timing::Timecode(Fps::Fps30, 80),
            format: Some(Format::Sequential),
            ..ScoreOptions::default()
        });
        assert_eq!(chunks(&score.to_bytes().unwrap()).0, [0, 2, 0, 1, 0xE2, 80]);
    }

    #[test]
    fn zero_division_is_not_encoded() {
        for &timing in &[Timing::Metrical(u15::new(0)), Timing::Timecode(Fps::Fps25, 0)] {
            let mut score = Score::with_options(ScoreOptions {
                timing,
                ..ScoreOptions::default()
            });
            score.add_note(0, 0, 0, 10, 60, 100).unwrap();
            match score.to_bytes() {
                Err(Error::Encode { track: 0, .. }) => {}
                other => panic!("expected encode error, got {:?}", other),
            }
            let mut out = Vec::new();
            assert!(score.write(&mut out).is_err());
            assert!(out.is_empty());
        }
    }

    #[test]
    fn deterministic_output() {
        let mut score = Score::new();
        let lead = score.add_track().unwrap();
        score.add_bpm(0, 0, 133.0).unwrap();
        score.add_time_signature(0, 0, 7, 8).unwrap();
        score.add_track_name(lead, "Lead").unwrap();
        for i in 0..64 {
            score
                .add_note(lead, 2, i * 120, 240, 48 + (i % 24) as u8, 90)
                .unwrap();
        }
        let first = score.to_bytes().unwrap();
        let second = score.to_bytes().unwrap();
        assert_eq!(first, second);
        let mut written = Vec::new();
        score.clone().write(&mut written).unwrap();
        assert_eq!(first, written);
    }

    #[test]
    fn running_status_omits_repeated_status() {
        let options = ScoreOptions {
            running_status: true,
            ..ScoreOptions::default()
        };
        let mut score = Score::with_options(options);
        score.add_note(0, 0, 0, 480, 60, 100).unwrap();
        score.add_note(0, 0, 0, 480, 64, 100).unwrap();
        let (_, tracks) = chunks(&score.to_bytes().unwrap());
        assert_eq!(
            tracks[0],
            [
                0x00, 0x90, 60, 100, //
                0x00, 64, 100, //
                0x83, 0x60, 0x80, 60, 0, //
                0x00, 64, 0, //
                0x00, 0xFF, 0x2F, 0x00,
            ]
        );
    }

    #[test]
    fn large_delta_times() {
        let mut score = Score::new();
        score.add_note(0, 0, 0x0FFF_FF00, 0xFF, 60, 100).unwrap();
        let evs = events(&chunks(&score.to_bytes().unwrap()).1[0]);
        assert_eq!(evs[0].0, 0x0FFF_FF00);
        assert_eq!(evs[1].0, varlen::MAX);
        let (_, tracks) = chunks(&score.to_bytes().unwrap());
        assert!(tracks[0].starts_with(&[0xFF, 0xFF, 0xFE, 0x00, 0x90]));
    }
}

mod channels {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_channel_and_program() {
        let mut score = Score::new();
        let drums = score.add_track().unwrap();
        score.set_channel(drums, 9).unwrap();
        score.set_program(drums, 0, 0).unwrap();
        score.add_channel_note(drums, 0, 120, 36, 110).unwrap();
        assert_eq!(score.track(drums).unwrap().channel().as_int(), 9);
        let evs = events(&chunks(&score.to_bytes().unwrap()).1[drums]);
        assert_eq!(
            evs,
            vec![
                (0, vec![0xC9, 0]),
                (0, vec![0x99, 36, 110]),
                (120, vec![0x89, 36, 0]),
                (120, vec![0xFF, 0x2F, 0x00]),
            ]
        );
    }

    #[test]
    fn release_velocity() {
        let mut score = Score::new();
        score
            .add_note_with_release(0, 15, 0, 96, 72, 100, 64)
            .unwrap();
        let evs = events(&chunks(&score.to_bytes().unwrap()).1[0]);
        assert_eq!(evs[1], (96, vec![0x8F, 72, 64]));
    }

    #[test]
    fn custom_metronome() {
        let mut score = Score::new();
        let sig = TimeSignature::new(6, 8).unwrap().with_metronome(36, 8);
        score.insert_time_signature(0, 0, sig).unwrap();
        let evs = events(&chunks(&score.to_bytes().unwrap()).1[0]);
        assert_eq!(evs[0].1, [0xFF, 0x58, 0x04, 6, 3, 36, 8]);
    }
}

mod validation {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_invalid(result: crate::Result<()>, call: &str, field: &str) {
        match result {
            Err(Error::Validation {
                call: c, field: f, ..
            }) => {
                assert_eq!(c, call);
                assert_eq!(f, field);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn velocity_out_of_range_leaves_track_untouched() {
        let mut score = Score::new();
        let before = score.clone();
        assert_invalid(
            score.add_note(0, 0, 0, 480, 60, 200),
            "add_note",
            "velocity",
        );
        assert_eq!(score, before);
        assert!(score.track(0).unwrap().is_empty());
    }

    #[test]
    fn note_fields() {
        let mut score = Score::new();
        assert_invalid(score.add_note(0, 16, 0, 1, 60, 1), "add_note", "channel");
        assert_invalid(score.add_note(0, 0, 0, 1, 128, 1), "add_note", "pitch");
        assert_invalid(score.add_note(0, 0, 0, 0, 60, 1), "add_note", "duration_ticks");
        assert_invalid(
            score.add_note(0, 0, 0x1000_0000, 1, 60, 1),
            "add_note",
            "start_tick",
        );
        assert_invalid(
            score.add_note(0, 0, 0x0FFF_FFFF, 1, 60, 1),
            "add_note",
            "duration_ticks",
        );
        assert_invalid(
            score.add_note(0, 0, 10, u32::MAX, 60, 1),
            "add_note",
            "duration_ticks",
        );
        assert_invalid(
            score.add_note_with_release(0, 0, 0, 1, 60, 1, 128),
            "add_note_with_release",
            "release_velocity",
        );
        assert!(score.track(0).unwrap().is_empty());
    }

    #[test]
    fn meta_fields() {
        let mut score = Score::new();
        assert_invalid(score.add_bpm(0, 0, 0.0), "add_bpm", "bpm");
        assert_invalid(score.add_bpm(0, 0, -120.0), "add_bpm", "bpm");
        assert_invalid(score.add_bpm(0, 0, f64::INFINITY), "add_bpm", "bpm");
        assert_invalid(
            score.add_time_signature(0, 0, 0, 4),
            "add_time_signature",
            "numerator",
        );
        assert_invalid(
            score.add_time_signature(0, 0, 256, 4),
            "add_time_signature",
            "numerator",
        );
        assert_invalid(
            score.add_time_signature(0, 0, 3, 3),
            "add_time_signature",
            "denominator",
        );
        assert_invalid(score.set_channel(0, 16), "set_channel", "channel");
        assert_invalid(score.set_program(0, 0, 128), "set_program", "program");
        assert_invalid(
            score.add_track_name_at(0, "late", 0x1000_0000),
            "add_track_name_at",
            "tick",
        );
        assert!(score.track(0).unwrap().is_empty());
    }

    #[test]
    fn track_index() {
        let mut score = Score::new();
        let err = score.add_note(1, 0, 0, 1, 60, 1).unwrap_err();
        assert!(err.is_validation());
        match err {
            Error::TrackIndex { call, index, count } => {
                assert_eq!((call, index, count), ("add_note", 1, 1));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(score.add_bpm(3, 0, 120.0).is_err());
        assert!(score.set_channel(1, 0).is_err());
        assert!(score.add_channel_note(1, 0, 1, 60, 1).is_err());
        score.add_track().unwrap();
        score.add_note(1, 0, 0, 1, 60, 1).unwrap();
    }

    #[test]
    fn error_messages_name_the_call() {
        let mut score = Score::new();
        let err = score.add_note(0, 0, 0, 480, 60, 200).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid velocity in add_note: 200 (expected u7)"
        );
    }
}

mod names {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_name_is_kept() {
        let mut score = Score::new();
        score.add_track_name(0, "Draft").unwrap();
        score.add_track_name_at(0, "Final", 960).unwrap();
        let track = score.track(0).unwrap();
        assert_eq!(track.name(), Some("Final"));
        assert_eq!(track.len(), 2);
        let evs = events(&chunks(&score.to_bytes().unwrap()).1[0]);
        assert_eq!(evs[0].1, b"\xFF\x03\x05Draft".to_vec());
        assert_eq!(evs[1], (960, b"\xFF\x03\x05Final".to_vec()));
        assert_eq!(evs[2], (960, vec![0xFF, 0x2F, 0x00]));
    }

    #[test]
    fn utf8_names_are_written_as_bytes() {
        let mut score = Score::new();
        score.add_track_name(0, "Ünïcode").unwrap();
        let evs = events(&chunks(&score.to_bytes().unwrap()).1[0]);
        let name = "Ünïcode".as_bytes();
        assert_eq!(evs[0].1[2] as usize, name.len());
        assert_eq!(&evs[0].1[3..], name);
    }
}

mod save {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_the_encoded_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twinkle.mid");
        let mut score = Score::new();
        score.add_bpm(0, 0, 120.0).unwrap();
        for (beat, pitch) in [60, 60, 67, 67, 69, 69, 67].iter().enumerate() {
            score
                .add_note(0, 0, beat as u32 * PPQ, PPQ, *pitch, 120)
                .unwrap();
        }
        score.save(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), score.to_bytes().unwrap());
        //Only the destination remains in the directory
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn score_stays_usable_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grow.mid");
        let mut score = Score::new();
        score.add_note(0, 0, 0, PPQ, 60, 100).unwrap();
        score.save(&path).unwrap();
        let first = fs::read(&path).unwrap();
        score.add_note(0, 0, PPQ, PPQ, 62, 100).unwrap();
        score.save(&path).unwrap();
        let second = fs::read(&path).unwrap();
        assert!(second.len() > first.len());
        assert_eq!(second, score.to_bytes().unwrap());
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.mid");
        let err = Score::new().save(&path).unwrap_err();
        assert!(err.is_io());
        assert!(!path.exists());
    }

    #[test]
    fn failed_encode_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.mid");
        fs::write(&path, b"previous").unwrap();
        let mut score = Score::with_options(ScoreOptions {
            format: Some(Format::SingleTrack),
            ..ScoreOptions::default()
        });
        score.add_track().unwrap();
        match score.save(&path) {
            Err(Error::Encode { track: 1, .. }) => {}
            other => panic!("expected encode error, got {:?}", other),
        }
        assert_eq!(fs::read(&path).unwrap(), b"previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    fn mode(path: &std::path::Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    #[test]
    fn new_file_mode_matches_plain_write() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.mid");
        let saved = dir.path().join("saved.mid");
        fs::write(&plain, b"").unwrap();
        Score::new().save(&saved).unwrap();
        assert_eq!(mode(&saved), mode(&plain));
    }

    #[cfg(unix)]
    #[test]
    fn replaced_file_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.mid");
        fs::write(&path, b"previous").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        Score::new().save(&path).unwrap();
        assert_eq!(mode(&path), 0o640);
        assert_eq!(fs::read(&path).unwrap(), Score::new().to_bytes().unwrap());
    }
}

/// Several tracks in the arrangement of a small song.
#[test]
fn multiple_tracks() {
    let mut score = Score::new();
    score.add_bpm(0, 0, 120.0).unwrap();
    score.add_time_signature(0, 0, 4, 4).unwrap();
    let parts = [(60, 120), (62, 100), (64, 80), (65, 60)];
    for (i, &(pitch, velocity)) in parts.iter().enumerate() {
        let track = score.add_track().unwrap();
        score.set_channel(track, (i % 2) as u8).unwrap();
        score
            .add_channel_note(track, i as u32 * PPQ, PPQ, pitch, velocity)
            .unwrap();
    }
    let (header, tracks) = chunks(&score.to_bytes().unwrap());
    assert_eq!(header, [0, 1, 0, 5, 0x01, 0xE0]);
    assert_eq!(
        events(&tracks[4]),
        vec![
            (3 * PPQ, vec![0x91, 65, 60]),
            (4 * PPQ, vec![0x81, 65, 0]),
            (4 * PPQ, vec![0xFF, 0x2F, 0x00]),
        ]
    );
}
