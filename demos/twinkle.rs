//! Writes a handful of small melodic files into an output directory.
//!
//! Usage: `cargo run --example twinkle [output-dir]`

use smfwrite::Score;
use std::{env, error::Error, fs, path::PathBuf};

const TPQ: u32 = 480;
const VELOCITY: u8 = 120;

const SONGS: &[(&str, fn() -> Result<Score, Box<dyn Error>>)] = &[
    ("twinkle_star.mid", twinkle_star),
    ("chords.mid", chords),
    ("multiple_tracks.mid", multiple_tracks),
];

fn letter_to_pitch(letter: char) -> Option<u8> {
    Some(match letter {
        'C' => 60,
        'D' => 62,
        'E' => 64,
        'F' => 65,
        'G' => 67,
        'A' => 69,
        'B' => 71,
        _ => return None,
    })
}

fn twinkle_star() -> Result<Score, Box<dyn Error>> {
    let notes = "CCGGAAG_FFEEDDC_GGFFEED_GGFFEED_CCGGAAG_FFEEDDC_";
    let mut score = Score::new();
    score.add_track_name(0, "Twinkle Twinkle Little Star")?;
    score.add_bpm(0, 0, 120.0)?;
    score.set_program(0, 0, 0)?;
    for (beat, letter) in notes.chars().enumerate() {
        let tick = beat as u32 * TPQ;
        //Underscores are rests
        if let Some(pitch) = letter_to_pitch(letter) {
            score.add_note(0, 0, tick, TPQ, pitch, VELOCITY)?;
        }
        match beat {
            8 => score.add_bpm(0, tick, 80.0)?,
            16 => score.add_bpm(0, tick, 180.0)?,
            _ => {}
        }
    }
    Ok(score)
}

fn chords() -> Result<Score, Box<dyn Error>> {
    //(start beat, length in beats, pitch)
    let notes = [
        (0, 3, 60),
        (0, 3, 64),
        (0, 3, 67),
        (0, 3, 71),
        (4, 4, 60),
        (5, 4, 64),
        (6, 4, 67),
        (7, 4, 71),
    ];
    let mut score = Score::new();
    score.add_bpm(0, 0, 120.0)?;
    score.add_time_signature(0, 0, 4, 4)?;
    for &(start, len, pitch) in notes.iter() {
        score.add_note(0, 0, start * TPQ, len * TPQ, pitch, VELOCITY)?;
    }
    Ok(score)
}

fn multiple_tracks() -> Result<Score, Box<dyn Error>> {
    let mut score = Score::new();
    score.add_bpm(0, 0, 120.0)?;
    for i in 0..4u32 {
        let track = if i == 0 { 0 } else { score.add_track()? };
        score.set_channel(track, (i % 2) as u8)?;
        score.add_track_name(track, &format!("Voice {}", i + 1))?;
        score.add_channel_note(track, i * TPQ, TPQ, [60, 62, 64, 65][i as usize], VELOCITY)?;
    }
    Ok(score)
}

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = PathBuf::from(env::args().nth(1).unwrap_or_else(|| "output".to_string()));
    fs::create_dir_all(&out_dir)?;
    for (name, song) in SONGS {
        let path = out_dir.join(name);
        let score = song()?;
        score.save(&path)?;
        eprintln!(
            "wrote {} ({} tracks, {} bytes)",
            path.display(),
            score.track_count(),
            score.to_bytes()?.len()
        );
    }
    Ok(())
}
