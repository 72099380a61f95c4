//! Minimal Standard MIDI File (format 0) writer
//!
//! Just enough SMF to hand transcribed note events to a DAW: one track,
//! fixed tempo, note on/off pairs. At equal ticks, note-off events are
//! emitted before note-on so zero-gap repeats of the same pitch do not
//! cancel each other.

use std::path::Path;
use stemforge_common::{Error, NoteEvent, Result};

/// Ticks per quarter note in every file we write
pub const TICKS_PER_BEAT: u32 = 480;
/// Tempo used when the source tempo is unknown
pub const DEFAULT_BPM: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    // Off sorts before On at equal ticks
    NoteOff,
    NoteOn,
}

/// Write `notes` as a single-track SMF at the given tempo
pub fn write_midi_file(path: &Path, notes: &[NoteEvent], bpm: f64) -> Result<()> {
    let bpm = if bpm > 0.0 { bpm } else { DEFAULT_BPM };
    let track = render_track(notes, bpm);

    let mut file = Vec::with_capacity(14 + 8 + track.len());
    file.extend_from_slice(b"MThd");
    file.extend_from_slice(&6u32.to_be_bytes());
    file.extend_from_slice(&0u16.to_be_bytes()); // format 0
    file.extend_from_slice(&1u16.to_be_bytes()); // one track
    file.extend_from_slice(&(TICKS_PER_BEAT as u16).to_be_bytes());
    file.extend_from_slice(b"MTrk");
    file.extend_from_slice(&(track.len() as u32).to_be_bytes());
    file.extend_from_slice(&track);

    std::fs::write(path, file).map_err(Error::Io)
}

fn render_track(notes: &[NoteEvent], bpm: f64) -> Vec<u8> {
    let mut track = Vec::new();

    // Tempo meta: microseconds per quarter note
    let us_per_beat = (60_000_000.0 / bpm).round() as u32;
    track.push(0x00);
    track.extend_from_slice(&[0xFF, 0x51, 0x03]);
    track.extend_from_slice(&us_per_beat.to_be_bytes()[1..]);

    // 4/4 time signature
    track.push(0x00);
    track.extend_from_slice(&[0xFF, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08]);

    // (tick, kind, pitch, velocity)
    let mut events: Vec<(u32, EventKind, u8, u8)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        events.push((tick_at(note.start, bpm), EventKind::NoteOn, note.pitch, note.velocity));
        events.push((tick_at(note.end(), bpm), EventKind::NoteOff, note.pitch, 0));
    }
    events.sort();

    let mut cursor = 0u32;
    for (tick, kind, pitch, velocity) in events {
        write_varlen(&mut track, tick - cursor);
        cursor = tick;
        let status = match kind {
            EventKind::NoteOn => 0x90,
            EventKind::NoteOff => 0x80,
        };
        track.extend_from_slice(&[status, pitch, velocity]);
    }

    // End of track
    track.push(0x00);
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);
    track
}

fn tick_at(seconds: f64, bpm: f64) -> u32 {
    (seconds * bpm / 60.0 * TICKS_PER_BEAT as f64).round() as u32
}

/// MIDI variable-length quantity: 7 bits per byte, high bit set on all
/// but the last byte
fn write_varlen(out: &mut Vec<u8>, mut value: u32) {
    let mut buffer = [0u8; 4];
    let mut index = 3;
    buffer[index] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        index -= 1;
        buffer[index] = ((value & 0x7F) | 0x80) as u8;
        value >>= 7;
    }
    out.extend_from_slice(&buffer[index..]);
}
