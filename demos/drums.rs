//! Renders drum patterns written as step strings into percussion tracks.
//!
//! Every character of a pattern is a 16th note: `x` is a hit, `.` is a rest and `|` marks a bar
//! line without taking any time.
//!
//! Usage: `cargo run --example drums [output-dir]`

use smfwrite::Score;
use std::{env, error::Error, fs, path::PathBuf};

const TPQ: u32 = 480;
const TICKS_PER_16TH: u32 = TPQ / 4;
const DRUM_CHANNEL: u8 = 9;
const VELOCITY: u8 = 120;

//General Midi percussion keys
const KICK: u8 = 35;
const SNARE_RIM: u8 = 37;
const SNARE: u8 = 38;
const HIHAT_CLOSED: u8 = 42;
const HIHAT_OPEN: u8 = 46;
const CRASH: u8 = 49;
const TOM5: u8 = 50;
const RIDE: u8 = 51;
const RIDE_BELL: u8 = 53;
const COWBELL: u8 = 56;
const TOM2: u8 = 43;
const TOM3: u8 = 45;
const TOM4: u8 = 47;

const AMEN: &[(&str, u8)] = &[
    ("................|................|................|..........x.....|", CRASH),
    ("x.x.x.x.x.x.x.x.|x.x.x.x.x.x.x.x.|x.x.x.x.x.x.x.x.|x.x.x.x.x...x.x.|", RIDE),
    ("....x.......x...|....x.......x...|....x.........x.|....x.........x.|", SNARE),
    (".......x.x.....x|.......x.x.....x|.......x.x......|.x.....x.x......|", SNARE_RIM),
    ("x.........xx....|x.........xx....|x.x.......x.....|..xx......x.....|", KICK),
];

const DISCO: &[(&str, u8)] = &[
    ("|x...............|................|................|................|x...............|", CRASH),
    ("|................|................|x...x...x...x...|................|................|", RIDE),
    ("|................|................|..x...x...x...x.|................|................|", RIDE_BELL),
    ("|....xx.xxx.xxx.x|xx.xxx.xxx.xxx.x|................|................|................|", HIHAT_CLOSED),
    ("|......x...x...x.|..x...x...x...x.|................|................|................|", HIHAT_OPEN),
    ("|................|................|................|xxx.............|................|", TOM5),
    ("|................|................|................|...xxx..........|................|", TOM4),
    ("|................|................|................|......xxx.......|................|", TOM3),
    ("|................|................|................|.........xxx....|................|", TOM2),
    ("|x...x...x...x...|x...x...x...x...|x...x...x...x...|x...x...x...x...|x...............|", COWBELL),
    ("|....x.......x..x|....x.......xxxx|...x..x....x..x.|............xxxx|................|", SNARE),
    ("|x.....x...x..x..|x.....x...x..x..|x.....x...x..x..|x...x...x...x...|x...............|", KICK),
];

fn drum_score(name: &str, bpm: f64, patterns: &[(&str, u8)]) -> Result<Score, Box<dyn Error>> {
    let mut score = Score::new();
    score.add_track_name(0, name)?;
    score.add_bpm(0, 0, bpm)?;
    score.add_time_signature(0, 0, 4, 4)?;
    score.set_channel(0, DRUM_CHANNEL)?;
    for &(pattern, key) in patterns {
        let steps = pattern.chars().filter(|&c| c != '|');
        for (step, c) in steps.enumerate() {
            if c == 'x' {
                let tick = step as u32 * TICKS_PER_16TH;
                score.add_channel_note(0, tick, TICKS_PER_16TH, key, VELOCITY)?;
            }
        }
    }
    Ok(score)
}

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = PathBuf::from(env::args().nth(1).unwrap_or_else(|| "output".to_string()));
    fs::create_dir_all(&out_dir)?;
    let beats = [
        ("drums_amen.mid", "Amen", 170.0, AMEN),
        ("drums_disco.mid", "Disco", 125.0, DISCO),
    ];
    for &(file, name, bpm, patterns) in beats.iter() {
        let path = out_dir.join(file);
        let score = drum_score(name, bpm, patterns)?;
        score.save(&path)?;
        eprintln!(
            "wrote {} ({} events)",
            path.display(),
            score.track(0).map_or(0, |track| track.len())
        );
    }
    Ok(())
}
