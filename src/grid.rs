//! # Beat Grid
//!
//! Walks the tempo map one quarter note (PPQ ticks) at a time and produces a
//! [`Beat`] for every step: its time, whether it opens a measure, and whether
//! the tempo changed on it.
//!
//! ## Extent
//! The grid covers the furthest note-on plus one full measure. Files without
//! notes use their duration instead (converted to ticks at the initial
//! tempo). The scan is capped at `ceil(max_tick / ppq) + 4` beats, so a file
//! with nothing in it still gets beats 0 through 4.
//!
//! ## Example
//! ```rust
//! use beatgrid::grid::{generate_beat_grid, TempoMark};
//! use beatgrid::midi::{ParsedMidi, TrackNotes};
//!
//! let midi = ParsedMidi {
//!     ppq: 480,
//!     tracks: vec![TrackNotes { name: None, note_ticks: vec![1920] }],
//!     ..Default::default()
//! };
//! let beats = generate_beat_grid(&midi);
//!
//! assert_eq!(beats[1].time_ms, 500);
//! assert!(beats[4].is_downbeat);
//! assert_eq!(beats[0].tempo, TempoMark::Changed(120));
//! ```

use serde::Serialize;
use tracing::debug;

use crate::api::convert_parsed;
use crate::midi::ParsedMidi;
use crate::tempo_map::{
    effective_ppq, seconds_to_ticks, tempo_at, ticks_to_seconds, time_signature_at, TempoChange,
    TimeSignatureChange, DEFAULT_BPM,
};

/// Trailing beats allowed past the last note before the scan gives up.
const TRAILING_BEATS: u64 = 4;

/// Tempo annotation on a beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TempoMark {
    /// Tempo differs from the previous beat (always the case for beat 0)
    Changed(u32),
    /// Same tempo as the previous beat
    Unchanged,
}

impl TempoMark {
    /// BPM for the table column; 0 means unchanged
    pub fn as_column(&self) -> u32 {
        match self {
            TempoMark::Changed(bpm) => *bpm,
            TempoMark::Unchanged => 0,
        }
    }
}

/// A single grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Beat {
    pub tick: u64,
    pub time_ms: u64,
    pub is_downbeat: bool,
    pub tempo: TempoMark,
}

/// Build the beat grid for a parsed MIDI file.
///
/// Never fails and never returns an empty list. Same beats as
/// [`convert_parsed`], without the rest of the result.
pub fn generate_beat_grid(midi: &ParsedMidi) -> Vec<Beat> {
    convert_parsed(midi).beats
}

/// Furthest tick the grid has to reach before the trailing measure.
pub fn grid_extent(midi: &ParsedMidi, ppq: u16, tempos: &[TempoChange]) -> u64 {
    if let Some(tick) = midi.max_note_tick() {
        return tick;
    }
    match (midi.duration_seconds, tempos.first()) {
        (Some(seconds), Some(initial)) => seconds_to_ticks(seconds, initial.bpm, ppq),
        _ => 0,
    }
}

/// Grid over already-normalized tempo and time-signature lists.
pub fn beat_grid_for(
    ppq: u16,
    tempos: &[TempoChange],
    signatures: &[TimeSignatureChange],
    max_tick: u64,
) -> Vec<Beat> {
    let ppq = effective_ppq(ppq);
    let step = u64::from(ppq);
    let last_index = max_tick.div_ceil(step).saturating_add(TRAILING_BEATS);

    let mut beats = Vec::new();
    let mut previous_bpm: Option<f64> = None;

    for i in 0..=last_index {
        let Some(tick) = i.checked_mul(step) else {
            break;
        };
        let signature = time_signature_at(tick, signatures)
            .copied()
            .unwrap_or(TimeSignatureChange::new(0, 4, 4));
        let numerator = u64::from(signature.numerator.max(1));

        if tick > max_tick.saturating_add(numerator * step) {
            break;
        }

        let seconds = ticks_to_seconds(tick, tempos, ppq);
        let position = ((tick - signature.tick) / step) % numerator;

        let bpm = tempo_at(tick, tempos).map_or(DEFAULT_BPM, |t| t.bpm);
        let tempo = if previous_bpm == Some(bpm) {
            TempoMark::Unchanged
        } else {
            TempoMark::Changed(bpm.round() as u32)
        };
        previous_bpm = Some(bpm);

        beats.push(Beat {
            tick,
            time_ms: (seconds * 1000.0).round() as u64,
            is_downbeat: position == 0,
            tempo,
        });
    }

    debug!(ppq, max_tick, beats = beats.len(), "generated beat grid");
    beats
}
