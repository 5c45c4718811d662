pub mod api;
pub mod config;
pub mod error;
pub mod grid;
pub mod midi;
pub mod plugin;
pub mod table;
pub mod tempo_map;

pub use api::{convert, convert_parsed, export, ConversionResult};
pub use config::{ExportConfig, LineEnding};
pub use error::*;
pub use grid::{beat_grid_for, generate_beat_grid, grid_extent, Beat, TempoMark};
pub use midi::{decode, ParsedMidi, TrackNotes};
pub use plugin::{extract_script, package};
pub use table::{format_seconds, render_preview, render_rows, BeatRow};
pub use tempo_map::{
    effective_ppq, normalize_tempos, normalize_time_signatures, ticks_to_seconds, TempoChange,
    TimeSignatureChange,
};
