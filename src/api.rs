//! # Public API
//!
//! Main entry points for the beatgrid library.
//!
//! ## Conversion Functions
//!
//! - [`convert()`] - MIDI bytes to a [`ConversionResult`]
//! - [`convert_parsed()`] - Same, from an already decoded [`ParsedMidi`]
//! - [`export()`] - MIDI bytes straight to the XML plugin descriptor
//!
//! ## Typical Usage
//!
//! ```rust,no_run
//! use beatgrid::{convert, package, ExportConfig};
//!
//! let bytes = std::fs::read("song.mid").unwrap();
//! let result = convert(&bytes)?;
//! println!("{} beats, {} tempo changes", result.beats.len(), result.tempos.len());
//!
//! let xml = package(&result.beats, &ExportConfig::default())?;
//! # Ok::<(), beatgrid::BeatGridError>(())
//! ```

use serde::Serialize;

use crate::{
    beat_grid_for, decode, effective_ppq, grid_extent, normalize_tempos,
    normalize_time_signatures, package, Beat, BeatGridError, ExportConfig, ParsedMidi,
    TempoChange, TimeSignatureChange,
};

/// Everything one conversion produced.
///
/// Returned by value; nothing is cached between calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub ppq: u16,
    pub tempos: Vec<TempoChange>,
    pub time_signatures: Vec<TimeSignatureChange>,
    pub beats: Vec<Beat>,
    pub track_count: usize,
    pub note_count: usize,
}

/// Convert Standard MIDI File bytes into a beat grid.
///
/// # Pipeline
/// 1. Decode the file with `midly`
/// 2. Normalize the tempo and time-signature maps
/// 3. Generate the beat grid
///
/// # Errors
/// [`BeatGridError::NoInput`] for empty input and [`BeatGridError::Decode`]
/// for anything that is not a MIDI file. A valid file never fails past
/// decoding.
pub fn convert(bytes: &[u8]) -> Result<ConversionResult, BeatGridError> {
    let midi = decode(bytes)?;
    Ok(convert_parsed(&midi))
}

/// Convert an already decoded file.
///
/// # Example
/// ```rust
/// use beatgrid::{convert_parsed, ParsedMidi};
///
/// let result = convert_parsed(&ParsedMidi::default());
/// assert_eq!(result.ppq, 480);
/// assert_eq!(result.beats.len(), 5);
/// ```
pub fn convert_parsed(midi: &ParsedMidi) -> ConversionResult {
    let ppq = effective_ppq(midi.ppq);
    let tempos = normalize_tempos(midi.tempos.clone());
    let time_signatures = normalize_time_signatures(midi.time_signatures.clone());
    let max_tick = grid_extent(midi, ppq, &tempos);
    let beats = beat_grid_for(ppq, &tempos, &time_signatures, max_tick);

    ConversionResult {
        ppq,
        tempos,
        time_signatures,
        beats,
        track_count: midi.tracks.len(),
        note_count: midi.note_count(),
    }
}

/// Convert and package in one step.
pub fn export(bytes: &[u8], config: &ExportConfig) -> Result<String, BeatGridError> {
    let result = convert(bytes)?;
    package(&result.beats, config)
}
