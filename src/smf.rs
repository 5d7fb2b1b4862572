//! Specific to the SMF packaging of MIDI streams.

use crate::{
    prelude::*,
    primitive::{Format, Timing},
    track::Track,
};

/// Encode a whole file: the header chunk followed by one track chunk per track, in order.
///
/// Every chunk is fully encoded before anything is returned, so an error never leaves a
/// truncated file behind.
///
/// This function will produce `Encode` errors if the file cannot be represented, like for
/// example if there are more than 65535 tracks, chunk sizes are over 4GB, a single-track
/// format is requested for several tracks, or the timing has zero ticks per beat or frame.
///
/// Track chunks are encoded on multiple threads if the `parallel` feature is enabled.
pub(crate) fn encode(header: &Header, tracks: &[Track], running_status: bool) -> Result<Vec<u8>> {
    ensure!(
        header.format != Format::SingleTrack || tracks.len() <= 1,
        Error::Encode {
            track: 1,
            event: 0,
            reason: "single-track format file has multiple tracks",
        }
    );
    ensure!(
        header.timing.is_valid(),
        Error::Encode {
            track: 0,
            event: 0,
            reason: "header division describes zero-length ticks",
        }
    );
    let header_chunk = Chunk::encode_header(header, tracks.len())?;

    #[cfg(feature = "parallel")]
    let track_chunks = {
        use rayon::prelude::*;

        //Write out the tracks in parallel into several different buffers
        tracks
            .par_iter()
            .enumerate()
            .map(|(i, track)| Chunk::encode_track(i, track, running_status))
            .collect::<Result<Vec<_>>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let track_chunks = tracks
        .iter()
        .enumerate()
        .map(|(i, track)| Chunk::encode_track(i, track, running_status))
        .collect::<Result<Vec<_>>>()?;

    //Lay the tracks down sequentially and in order
    let len = header_chunk.len() + track_chunks.iter().map(Vec::len).sum::<usize>();
    let mut file = Vec::with_capacity(len);
    file.extend_from_slice(&header_chunk);
    for chunk in track_chunks {
        file.extend_from_slice(&chunk);
    }
    debug!(
        "encoded {} tracks into {} bytes ({:?}, {:?})",
        tracks.len(),
        file.len(),
        header.format,
        header.timing
    );
    Ok(file)
}

/// Encode and write the MIDI file into the given generic writer.
///
/// Errors from the underlying writer are returned as `Error::Io`.
/// If the file cannot be encoded nothing is written.
pub fn write<W: Write>(
    header: &Header,
    tracks: &[Track],
    running_status: bool,
    out: &mut W,
) -> Result<()> {
    let file = encode(header, tracks, running_status)?;
    out.write_all(&file)?;
    Ok(())
}

struct Chunk;
impl Chunk {
    /// Encode a header chunk.
    fn encode_header(header: &Header, track_count: usize) -> Result<[u8; 4 + 4 + 6]> {
        let mut header_chunk = [0; 4 + 4 + 6];
        let track_count = u16::try_from(track_count).map_err(|_| Error::TooManyTracks)?;
        let header = header.encode(track_count);
        header_chunk[0..4].copy_from_slice(&b"MThd"[..]);
        header_chunk[4..8].copy_from_slice(&(header.len() as u32).to_be_bytes()[..]);
        header_chunk[8..].copy_from_slice(&header[..]);
        Ok(header_chunk)
    }

    /// Encode a track chunk.
    ///
    /// Errors name the track index and the position of the offending event in the ordered
    /// stream (see `Track::stream`).
    fn encode_track(index: usize, track: &Track, running_status: bool) -> Result<Vec<u8>> {
        let stream = track.stream();
        let mut out = Vec::with_capacity(8 + stream.len() * 4);
        out.extend_from_slice(b"MTrk\0\0\0\0");
        let mut status = None;
        for (i, ev) in stream.iter().enumerate() {
            let encode_err = |reason: &'static str| Error::Encode {
                track: index,
                event: i,
                reason,
            };
            let delta =
                u28::try_from(ev.delta).ok_or_else(|| encode_err("delta-time exceeds 28 bits"))?;
            delta.write_varlen(&mut out);
            if !running_status {
                status = None;
            }
            ev.kind.write(&mut status, &mut out).map_err(encode_err)?;
        }
        let len = u32::try_from(out.len() - 8).map_err(|_| Error::Encode {
            track: index,
            event: stream.len() - 1,
            reason: "midi chunk size exceeds 32 bit range",
        })?;
        out[4..8].copy_from_slice(&len.to_be_bytes());
        trace!(
            "encoded track {}: {} events, {} byte body",
            index,
            stream.len(),
            len
        );
        Ok(out)
    }
}

/// A MIDI file header.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Header {
    pub format: Format,
    pub timing: Timing,
}
impl Header {
    pub fn new(format: Format, timing: Timing) -> Header {
        Header { format, timing }
    }

    fn encode(&self, track_count: u16) -> [u8; 6] {
        let mut bytes = [0; 6];
        bytes[0..2].copy_from_slice(&self.format.encode()[..]);
        bytes[2..4].copy_from_slice(&track_count.to_be_bytes()[..]);
        bytes[4..6].copy_from_slice(&self.timing.encode()[..]);
        bytes
    }
}
