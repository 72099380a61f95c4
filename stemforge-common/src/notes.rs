//! Note event domain types and the note-merge algorithm
//!
//! A note event is one discrete transcribed note: pitch, onset time,
//! duration, velocity. Composite synthesis merges two independently
//! transcribed sequences into one deliverable track.

use serde::{Deserialize, Serialize};

/// Two onsets of the same pitch closer than this are the same musical event.
///
/// Independent transcriptions of the same attack rarely land on the same
/// millisecond; 30 ms is under the threshold where humans hear two attacks.
pub const DUPLICATE_WINDOW_SECONDS: f64 = 0.030;

/// One transcribed note event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI pitch number (0-127)
    pub pitch: u8,
    /// Onset time in seconds from track start
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
    /// MIDI velocity (0-127)
    pub velocity: u8,
}

impl NoteEvent {
    pub fn new(pitch: u8, start: f64, duration: f64, velocity: u8) -> Self {
        Self {
            pitch,
            start,
            duration,
            velocity,
        }
    }

    /// End time in seconds
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Merge two independently transcribed note sequences into one.
///
/// Events from the two sources are duplicates of the same musical event when
/// their pitches are equal and their onsets differ by no more than
/// [`DUPLICATE_WINDOW_SECONDS`]. A duplicate pair collapses into one event:
/// earlier onset, longer duration, louder velocity. Everything else is kept
/// unchanged, so chords and genuine polyphony survive the merge.
///
/// Each source event pairs at most once (closest onset wins), which keeps
/// the result set independent of argument order.
pub fn merge_note_events(a: &[NoteEvent], b: &[NoteEvent]) -> Vec<NoteEvent> {
    // Candidate duplicate pairs, resolved globally closest-first so the
    // pairing does not depend on which source is passed first.
    let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
    for (i, ea) in a.iter().enumerate() {
        for (j, eb) in b.iter().enumerate() {
            if ea.pitch != eb.pitch {
                continue;
            }
            let delta = (eb.start - ea.start).abs();
            if delta <= DUPLICATE_WINDOW_SECONDS {
                candidates.push((i, j, delta));
            }
        }
    }
    candidates.sort_by(|x, y| {
        let kx = (x.2, a[x.0].start.min(b[x.1].start), a[x.0].pitch);
        let ky = (y.2, a[y.0].start.min(b[y.1].start), a[y.0].pitch);
        kx.partial_cmp(&ky).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut paired_a = vec![false; a.len()];
    let mut paired_b = vec![false; b.len()];
    let mut merged = Vec::with_capacity(a.len() + b.len());

    for (i, j, _) in candidates {
        if paired_a[i] || paired_b[j] {
            continue;
        }
        paired_a[i] = true;
        paired_b[j] = true;
        let (ea, eb) = (&a[i], &b[j]);
        merged.push(NoteEvent {
            pitch: ea.pitch,
            start: ea.start.min(eb.start),
            duration: ea.duration.max(eb.duration),
            velocity: ea.velocity.max(eb.velocity),
        });
    }

    for (i, ea) in a.iter().enumerate() {
        if !paired_a[i] {
            merged.push(*ea);
        }
    }
    for (j, eb) in b.iter().enumerate() {
        if !paired_b[j] {
            merged.push(*eb);
        }
    }

    merged.sort_by(|x, y| {
        x.start
            .partial_cmp(&y.start)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| x.pitch.cmp(&y.pitch))
    });

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_attack_collapses_keeping_longer_duration() {
        let a = vec![NoteEvent::new(60, 0.000, 0.50, 80)];
        let b = vec![NoteEvent::new(60, 0.010, 0.80, 64)];

        let merged = merge_note_events(&a, &b);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].pitch, 60);
        assert_eq!(merged[0].start, 0.000);
        assert_eq!(merged[0].duration, 0.80);
        assert_eq!(merged[0].velocity, 80);
    }

    #[test]
    fn distinct_pitches_form_a_chord_and_are_not_collapsed() {
        let a = vec![NoteEvent::new(60, 0.0, 0.5, 90)];
        let b = vec![NoteEvent::new(64, 0.0, 0.5, 90)];

        let merged = merge_note_events(&a, &b);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].pitch, 60);
        assert_eq!(merged[1].pitch, 64);
    }

    #[test]
    fn onsets_outside_the_tolerance_window_stay_separate() {
        let a = vec![NoteEvent::new(60, 0.000, 0.5, 90)];
        let b = vec![NoteEvent::new(60, 0.031, 0.5, 90)];

        let merged = merge_note_events(&a, &b);

        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn onset_exactly_at_the_window_boundary_collapses() {
        let a = vec![NoteEvent::new(60, 0.000, 0.5, 90)];
        let b = vec![NoteEvent::new(60, 0.030, 0.7, 90)];

        let merged = merge_note_events(&a, &b);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].duration, 0.7);
    }

    #[test]
    fn merge_is_commutative_on_the_result_set() {
        let a = vec![
            NoteEvent::new(60, 0.000, 0.50, 80),
            NoteEvent::new(64, 0.000, 0.50, 70),
            NoteEvent::new(67, 1.000, 0.25, 90),
        ];
        let b = vec![
            NoteEvent::new(60, 0.010, 0.80, 64),
            NoteEvent::new(72, 2.000, 1.00, 100),
        ];

        let ab = merge_note_events(&a, &b);
        let ba = merge_note_events(&b, &a);

        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 4);
    }

    #[test]
    fn each_source_event_pairs_at_most_once() {
        // Two same-pitch events in A within the window of one event in B:
        // only the closest pairs; the other survives unchanged.
        let a = vec![
            NoteEvent::new(60, 0.000, 0.5, 80),
            NoteEvent::new(60, 0.020, 0.5, 80),
        ];
        let b = vec![NoteEvent::new(60, 0.018, 0.9, 90)];

        let merged = merge_note_events(&a, &b);

        assert_eq!(merged.len(), 2);
        let collapsed = merged.iter().find(|e| e.duration == 0.9).unwrap();
        assert_eq!(collapsed.start, 0.018);
        assert_eq!(collapsed.velocity, 90);
    }

    #[test]
    fn empty_sources_pass_through() {
        let a = vec![NoteEvent::new(60, 0.0, 0.5, 80)];
        assert_eq!(merge_note_events(&a, &[]), a);
        assert_eq!(merge_note_events(&[], &a), a);
        assert!(merge_note_events(&[], &[]).is_empty());
    }

    #[test]
    fn output_is_ordered_by_onset() {
        let a = vec![
            NoteEvent::new(67, 2.0, 0.5, 80),
            NoteEvent::new(60, 0.0, 0.5, 80),
        ];
        let b = vec![NoteEvent::new(64, 1.0, 0.5, 80)];

        let merged = merge_note_events(&a, &b);

        let starts: Vec<f64> = merged.iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0]);
    }
}
