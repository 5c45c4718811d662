//! # MIDI Input
//!
//! The [`ParsedMidi`] struct is the only thing the beat grid reads from a MIDI
//! file. [`decode`] fills it from Standard MIDI File bytes using `midly`;
//! callers with their own decoder can build it by hand.
//!
//! ## What gets extracted
//! - PPQ from the header (`Timing::Metrical`); SMPTE files fall back to 480
//! - every `Tempo` meta event, as BPM, at its absolute tick
//! - every `TimeSignature` meta event (denominator is stored as `2^power`)
//! - format 2 (sequential) files: tempo and time signatures from the first
//!   track only, since the other tracks run on their own timelines
//! - note-on ticks per track (velocity 0 counts as a note-off and is skipped)
//! - the time of the last event in the file, in seconds

use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::BeatGridError;
use crate::tempo_map::{
    normalize_tempos, ticks_to_seconds, TempoChange, TimeSignatureChange, DEFAULT_PPQ,
};

/// Note-on positions of a single track.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackNotes {
    pub name: Option<String>,
    pub note_ticks: Vec<u64>,
}

/// Everything the beat grid needs from a MIDI file.
///
/// Tempo and time-signature lists are raw: they may be unsorted, empty, or
/// miss tick 0. The grid normalizes them itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedMidi {
    pub ppq: u16,
    pub tempos: Vec<TempoChange>,
    pub time_signatures: Vec<TimeSignatureChange>,
    pub tracks: Vec<TrackNotes>,
    pub duration_seconds: Option<f64>,
}

impl ParsedMidi {
    /// Furthest note-on tick across all tracks
    pub fn max_note_tick(&self) -> Option<u64> {
        self.tracks
            .iter()
            .flat_map(|track| track.note_ticks.iter().copied())
            .max()
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|track| track.note_ticks.len()).sum()
    }
}

/// Decode Standard MIDI File bytes.
///
/// # Errors
/// - [`BeatGridError::NoInput`] for an empty slice
/// - [`BeatGridError::Decode`] when `midly` rejects the data
pub fn decode(bytes: &[u8]) -> Result<ParsedMidi, BeatGridError> {
    if bytes.is_empty() {
        return Err(BeatGridError::NoInput);
    }

    let smf = Smf::parse(bytes).map_err(|e| BeatGridError::Decode(e.to_string()))?;

    let ppq = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        // No tempo-relative ticks in SMPTE files
        Timing::Timecode(_, _) => DEFAULT_PPQ,
    };

    let mut tempos = Vec::new();
    let mut time_signatures = Vec::new();
    let mut tracks = Vec::with_capacity(smf.tracks.len());
    let mut last_tick: Option<u64> = None;
    let sequential = smf.header.format == Format::Sequential;
    let mut skipped_meta = 0usize;

    for (index, track) in smf.tracks.iter().enumerate() {
        let conductor = !sequential || index == 0;
        let mut current_tick: u64 = 0;
        let mut notes = TrackNotes::default();

        for event in track {
            current_tick += u64::from(event.delta.as_int());

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(_))
                | TrackEventKind::Meta(MetaMessage::TimeSignature(..))
                    if !conductor =>
                {
                    skipped_meta += 1;
                }
                TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                    let bpm = 60_000_000.0 / f64::from(us_per_quarter.as_int());
                    tempos.push(TempoChange::new(current_tick, bpm));
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, denominator_power, _, _)) => {
                    // Powers past 31 cannot be represented; leave them as 0 so normalization drops them
                    let denominator = 1u32.checked_shl(u32::from(denominator_power)).unwrap_or(0);
                    time_signatures.push(TimeSignatureChange::new(
                        current_tick,
                        u32::from(numerator),
                        denominator,
                    ));
                }
                TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                    notes.name = Some(String::from_utf8_lossy(name).into_owned());
                }
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { vel, .. },
                    ..
                } if vel.as_int() > 0 => {
                    notes.note_ticks.push(current_tick);
                }
                _ => {}
            }

            last_tick = Some(last_tick.map_or(current_tick, |t| t.max(current_tick)));
        }

        tracks.push(notes);
    }

    if skipped_meta > 0 {
        warn!(
            skipped = skipped_meta,
            "sequential MIDI file: ignoring tempo and time signatures after the first track"
        );
    }

    let duration_seconds =
        last_tick.map(|tick| ticks_to_seconds(tick, &normalize_tempos(tempos.clone()), ppq));

    let parsed = ParsedMidi {
        ppq,
        tempos,
        time_signatures,
        tracks,
        duration_seconds,
    };

    debug!(
        ppq = parsed.ppq,
        tracks = parsed.tracks.len(),
        notes = parsed.note_count(),
        tempo_events = parsed.tempos.len(),
        time_signature_events = parsed.time_signatures.len(),
        "decoded MIDI file"
    );

    Ok(parsed)
}
